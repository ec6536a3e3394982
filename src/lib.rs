//! Bar-chart race renderer for per-country GDP tables.
//!
//! A run loads a wide CSV (one column per year), reshapes it into `(entity, year, value)`
//! observations for a fixed list of countries, draws one frame per year with `vello_cpu`
//! (bars, flag icons, value labels) and streams the frames into the system `ffmpeg`.
//!
//! - Load a [`Race`] from a CSV and a [`RaceConfig`]
//! - Prepare icons with [`Race::prepare_icons`] and build a [`CpuRenderer`]
//! - Render one year with [`render_frame`] or the whole plan with [`render_to_mp4`]
#![forbid(unsafe_code)]

pub mod anim;
pub mod assets;
pub mod config;
pub mod data;
pub mod encode_ffmpeg;
pub mod foundation;
pub mod pipeline;
pub mod render;

pub use anim::AnimationPlan;
pub use assets::icons::IconStore;
pub use config::{ChartStyle, EntityRegistry, EntityStyle, RaceConfig};
pub use data::reshape::Observation;
pub use encode_ffmpeg::{EncodeConfig, FfmpegEncoder, is_ffmpeg_on_path};
pub use foundation::core::{Canvas, Fps, Rgba8};
pub use foundation::error::{RaceError, RaceResult};
pub use pipeline::{
    Race, RenderStats, RenderToMp4Opts, render_frame, render_frames_to_dir, render_to_mp4,
    write_png,
};
pub use render::{
    FrameRGBA,
    cpu::CpuRenderer,
    frame::{Frame, FrameLayout},
};
