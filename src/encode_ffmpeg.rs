use std::{
    io::Write as _,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    foundation::{
        core::{Fps, Rgba8},
        error::{RaceError, RaceResult},
    },
    render::FrameRGBA,
};

/// Output settings for one MP4: H.264 in yuv420p at a rational frame rate.
#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    pub out_path: PathBuf,
    pub overwrite: bool,
}

impl EncodeConfig {
    pub fn validate(&self) -> RaceResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RaceError::validation("video size must be non-zero"));
        }
        // yuv420p subsamples chroma 2x2.
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(RaceError::validation(format!(
                "video size {}x{} must be even in both dimensions",
                self.width, self.height
            )));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        Ok(())
    }

    /// Arguments after `ffmpeg`, output path last.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let size = format!("{}x{}", self.width, self.height);
        let rate = self.fps.to_ffmpeg_rate();
        let overwrite = if self.overwrite { "-y" } else { "-n" };
        let mut args: Vec<String> = [
            overwrite, "-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgba", "-s", &size,
            "-r", &rate, "-i", "pipe:0", "-an", "-c:v", "libx264", "-pix_fmt", "yuv420p",
            "-movflags", "+faststart",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        args.push(self.out_path.to_string_lossy().into_owned());
        args
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

pub fn ensure_parent_dir(path: &Path) -> RaceResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create output dir '{}'", dir.display()))?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Streams opaque RGBA frames into an `ffmpeg` child process.
///
/// Dropping the encoder without calling [`FfmpegEncoder::finish`] kills `ffmpeg`, reaps it
/// and deletes the partially written output file. A failed `finish` deletes it as well.
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    background: Rgba8,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    opaque: Vec<u8>,
    frames: u64,
}

impl FfmpegEncoder {
    /// Spawn `ffmpeg`; frames are composited over `background` before they are written.
    pub fn new(cfg: EncodeConfig, background: Rgba8) -> RaceResult<Self> {
        cfg.validate()?;
        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(RaceError::validation(format!(
                "'{}' exists and overwriting is disabled",
                cfg.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(RaceError::encode("ffmpeg not found on PATH"));
        }
        ensure_parent_dir(&cfg.out_path)?;

        tracing::debug!(out = %cfg.out_path.display(), fps = %cfg.fps, "spawning ffmpeg");
        let mut child = Command::new("ffmpeg")
            .args(cfg.ffmpeg_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RaceError::encode(format!("spawn ffmpeg: {e}")))?;
        let stdin = child.stdin.take();

        let mut enc = Self {
            opaque: Vec::with_capacity(cfg.width as usize * cfg.height as usize * 4),
            cfg,
            background,
            child: Some(child),
            stdin,
            frames: 0,
        };
        if enc.stdin.is_none() {
            enc.abort();
            return Err(RaceError::encode("ffmpeg stdin is not piped"));
        }
        Ok(enc)
    }

    pub fn encode_frame(&mut self, frame: &FrameRGBA) -> RaceResult<()> {
        if (frame.width, frame.height) != (self.cfg.width, self.cfg.height) {
            return Err(RaceError::validation(format!(
                "frame is {}x{}, video is {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }
        flatten_premul(frame, self.background, &mut self.opaque)?;

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RaceError::encode("ffmpeg input already closed"))?;
        stdin
            .write_all(&self.opaque)
            .map_err(|e| RaceError::encode(format!("write frame {} to ffmpeg: {e}", self.frames)))?;
        self.frames += 1;
        Ok(())
    }

    /// Close ffmpeg's input and wait for it; a non-zero exit carries ffmpeg's stderr.
    pub fn finish(mut self) -> RaceResult<()> {
        drop(self.stdin.take());
        let Some(child) = self.child.take() else {
            return Err(RaceError::encode("ffmpeg already reaped"));
        };

        let output = match child.wait_with_output() {
            Ok(output) => output,
            Err(e) => {
                self.remove_output();
                return Err(RaceError::encode(format!("wait for ffmpeg: {e}")));
            }
        };
        if !output.status.success() {
            self.remove_output();
            return Err(RaceError::encode(format!(
                "ffmpeg failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tracing::info!(frames = self.frames, out = %self.cfg.out_path.display(), "video written");
        Ok(())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return;
        };
        // Already exited is fine; wait still reaps it.
        let _ = child.kill();
        let _ = child.wait();
        self.remove_output();
        tracing::warn!(
            frames = self.frames,
            out = %self.cfg.out_path.display(),
            "encoding aborted, partial output removed"
        );
    }

    fn remove_output(&self) {
        match std::fs::remove_file(&self.cfg.out_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                out = %self.cfg.out_path.display(),
                error = %e,
                "could not remove partial output"
            ),
        }
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Composite a premultiplied frame over an opaque `background` into `out`.
fn flatten_premul(frame: &FrameRGBA, background: Rgba8, out: &mut Vec<u8>) -> RaceResult<()> {
    if !frame.premultiplied {
        return Err(RaceError::validation(
            "encoder expects premultiplied frames",
        ));
    }
    if frame.data.len() != frame.width as usize * frame.height as usize * 4 {
        return Err(RaceError::validation(format!(
            "frame holds {} bytes, expected {}x{}x4",
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }

    out.clear();
    let bg = [background.r, background.g, background.b];
    for px in frame.data.chunks_exact(4) {
        let inv = 255 - u16::from(px[3]);
        for (c, bg) in px[..3].iter().zip(bg) {
            let under = (u16::from(bg) * inv + 127) / 255;
            out.push((u16::from(*c) + under).min(255) as u8);
        }
        out.push(255);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(width: u32, height: u32, fps: Fps) -> EncodeConfig {
        EncodeConfig {
            width,
            height,
            fps,
            out_path: PathBuf::from("target/gdp.mp4"),
            overwrite: false,
        }
    }

    #[test]
    fn odd_or_empty_sizes_and_zero_rates_are_rejected() {
        let fps = Fps::default();
        assert!(config(0, 10, fps).validate().is_err());
        assert!(config(11, 10, fps).validate().is_err());
        assert!(config(10, 10, Fps { num: 0, den: 1 }).validate().is_err());
        config(900, 1600, fps).validate().unwrap();
    }

    #[test]
    fn args_carry_rational_rate_and_overwrite_flag() {
        let args = config(900, 1600, Fps::default()).ffmpeg_args();
        assert_eq!(args[0], "-n");
        let r = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[r + 1], "9/5");
        let s = args.iter().position(|a| a == "-s").unwrap();
        assert_eq!(args[s + 1], "900x1600");
        assert_eq!(args.last().map(String::as_str), Some("target/gdp.mp4"));
    }

    #[test]
    fn translucent_pixels_take_the_background() {
        let frame = FrameRGBA {
            width: 2,
            height: 1,
            data: vec![128, 0, 0, 128, 0, 0, 0, 0],
            premultiplied: true,
        };
        let mut out = Vec::new();
        flatten_premul(&frame, Rgba8::opaque(0, 0, 200), &mut out).unwrap();
        assert_eq!(out, vec![128, 0, 100, 255, 0, 0, 200, 255]);
    }

    #[test]
    fn straight_alpha_frames_are_rejected() {
        let frame = FrameRGBA {
            width: 1,
            height: 1,
            data: vec![255, 0, 0, 128],
            premultiplied: false,
        };
        let err = flatten_premul(&frame, Rgba8::BLACK, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, RaceError::Validation(_)));

        let short = FrameRGBA {
            width: 2,
            height: 1,
            data: vec![0; 4],
            premultiplied: true,
        };
        assert!(flatten_premul(&short, Rgba8::BLACK, &mut Vec::new()).is_err());
    }
}
