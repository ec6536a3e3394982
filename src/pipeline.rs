use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    anim::AnimationPlan,
    assets::icons::IconStore,
    config::{EntityRegistry, RaceConfig},
    data::{
        load::load_table,
        reshape::{Observation, distinct_entities, distinct_years, reshape},
    },
    encode_ffmpeg::{EncodeConfig, FfmpegEncoder, ensure_parent_dir},
    foundation::error::RaceResult,
    render::{
        FrameRGBA,
        cpu::CpuRenderer,
        frame::{Frame, FrameLayout},
    },
};

/// Loaded, validated input for one race: config, registry and long-form observations.
#[derive(Clone, Debug)]
pub struct Race {
    pub config: RaceConfig,
    pub registry: EntityRegistry,
    pub observations: Vec<Observation>,
}

impl Race {
    /// Load and reshape `csv`, then check that every entity present has a registry entry.
    ///
    /// An unparseable file fails here, before anything is rendered.
    #[tracing::instrument(skip_all, fields(csv = %csv.display()))]
    pub fn load(csv: &Path, config: RaceConfig) -> RaceResult<Self> {
        config.validate()?;
        let table = load_table(csv)?;
        let observations = reshape(&table, &config.entity_column, &config.countries)?;
        Self::from_observations(config, observations)
    }

    pub fn from_observations(
        config: RaceConfig,
        observations: Vec<Observation>,
    ) -> RaceResult<Self> {
        let registry = config.registry()?;
        registry.ensure_covers(distinct_entities(&observations))?;
        tracing::info!(
            observations = observations.len(),
            entities = distinct_entities(&observations).len(),
            years = distinct_years(&observations).len(),
            "loaded race data"
        );
        Ok(Self {
            config,
            registry,
            observations,
        })
    }

    pub fn years(&self) -> Vec<i32> {
        distinct_years(&self.observations)
    }

    pub fn plan(&self) -> RaceResult<AnimationPlan> {
        AnimationPlan::new(
            self.years(),
            self.config.repeat_frames,
            self.config.interval(),
        )
    }

    /// Decode every icon the observations need, resolving relative paths against `root`.
    pub fn prepare_icons(&self, root: &Path) -> RaceResult<IconStore> {
        IconStore::prepare(
            &self.registry,
            distinct_entities(&self.observations),
            root,
            self.config.style.icon_size,
        )
    }
}

/// Select, lay out and rasterize one year.
pub fn render_frame(
    race: &Race,
    year: i32,
    renderer: &mut CpuRenderer,
    icons: &IconStore,
) -> RaceResult<FrameRGBA> {
    let frame = Frame::select(year, &race.observations)?;
    let layout = FrameLayout::compute(&frame, &race.config, &race.registry)?;
    renderer.render(&layout, icons)
}

#[derive(Clone, Debug)]
pub struct RenderToMp4Opts {
    pub overwrite: bool,
}

impl Default for RenderToMp4Opts {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_total: u64,
    pub frames_rendered: u64,
    /// Steps that repeat the previous year and reuse its pixels.
    pub frames_elided: u64,
}

/// Render every animation step in order and stream the frames into `ffmpeg`.
///
/// `ffmpeg` must be on `PATH`; the encoder checks before any frame is rendered. Frames are
/// flattened over the chart background. On error the partial video is deleted.
pub fn render_to_mp4(
    race: &Race,
    out_path: impl Into<PathBuf>,
    opts: RenderToMp4Opts,
    renderer: &mut CpuRenderer,
    icons: &IconStore,
) -> RaceResult<RenderStats> {
    let plan = race.plan()?;
    let out_path = out_path.into();
    tracing::info!(
        steps = plan.len(),
        years = plan.distinct_years(),
        fps = %race.config.fps,
        preview = ?plan.nominal_duration(),
        video_secs = race.config.fps.frames_to_secs(plan.len() as u64),
        out = %out_path.display(),
        "rendering race"
    );

    let cfg = EncodeConfig {
        width: race.config.canvas.width,
        height: race.config.canvas.height,
        fps: race.config.fps,
        out_path,
        overwrite: opts.overwrite,
    };
    let mut enc = FfmpegEncoder::new(cfg, race.config.style.background)?;

    let stats = for_each_step(race, &plan, renderer, icons, |_, frame| {
        enc.encode_frame(frame)
    })?;
    enc.finish()?;
    Ok(stats)
}

/// Render the same step sequence as numbered PNGs (`frame_0000.png`, ...).
pub fn render_frames_to_dir(
    race: &Race,
    out_dir: &Path,
    renderer: &mut CpuRenderer,
    icons: &IconStore,
) -> RaceResult<RenderStats> {
    let plan = race.plan()?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create output dir '{}'", out_dir.display()))?;
    tracing::info!(steps = plan.len(), out_dir = %out_dir.display(), "rendering frames");

    for_each_step(race, &plan, renderer, icons, |idx, frame| {
        write_png(&out_dir.join(format!("frame_{idx:04}.png")), frame)
    })
}

/// Write a frame as a straight-alpha RGBA PNG.
pub fn write_png(path: &Path, frame: &FrameRGBA) -> RaceResult<()> {
    ensure_parent_dir(path)?;
    let data = if frame.premultiplied {
        unpremultiply(&frame.data)
    } else {
        frame.data.clone()
    };
    image::save_buffer_with_format(
        path,
        &data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

fn for_each_step(
    race: &Race,
    plan: &AnimationPlan,
    renderer: &mut CpuRenderer,
    icons: &IconStore,
    mut sink: impl FnMut(usize, &FrameRGBA) -> RaceResult<()>,
) -> RaceResult<RenderStats> {
    let mut stats = RenderStats::default();
    let mut last: Option<(i32, FrameRGBA)> = None;

    for (idx, &year) in plan.steps().iter().enumerate() {
        let frame = match last.take() {
            Some((prev, frame)) if prev == year => {
                stats.frames_elided += 1;
                frame
            }
            _ => {
                stats.frames_rendered += 1;
                render_frame(race, year, renderer, icons)?
            }
        };
        tracing::debug!(step = idx, year, "frame ready");
        sink(idx, &frame)?;
        stats.frames_total += 1;
        last = Some((year, frame));
    }
    Ok(stats)
}

fn unpremultiply(src: &[u8]) -> Vec<u8> {
    let mut out = src.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}
