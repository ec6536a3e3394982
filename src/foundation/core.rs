use std::str::FromStr;

use crate::foundation::error::{RaceError, RaceResult};

pub use kurbo::{Point, Rect, Size};

/// Output frame rate as a rational number (`num / den` frames per second).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> RaceResult<Self> {
        if den == 0 {
            return Err(RaceError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(RaceError::validation("Fps num must be > 0"));
        }
        let g = gcd(num, den);
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// `num/den` form understood by ffmpeg's `-r`.
    pub fn to_ffmpeg_rate(self) -> String {
        if self.den == 1 {
            self.num.to_string()
        } else {
            format!("{}/{}", self.num, self.den)
        }
    }
}

impl Default for Fps {
    fn default() -> Self {
        // 1.8 fps
        Self { num: 9, den: 5 }
    }
}

impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Accepts `30`, `30000/1001` or a short decimal such as `1.8`.
impl FromStr for Fps {
    type Err = RaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || RaceError::validation(format!("invalid fps \"{s}\""));

        if let Some((num, den)) = s.split_once('/') {
            let num = num.trim().parse::<u32>().map_err(|_| bad())?;
            let den = den.trim().parse::<u32>().map_err(|_| bad())?;
            return Self::new(num, den);
        }

        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
        if frac_part.len() > 6 || !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        let int = if int_part.is_empty() {
            0
        } else {
            int_part.parse::<u32>().map_err(|_| bad())?
        };
        let den = 10u32.pow(frac_part.len() as u32);
        let frac = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse::<u32>().map_err(|_| bad())?
        };
        let num = int
            .checked_mul(den)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(bad)?;
        Self::new(num, den)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        // 9x16 inches at 100 dpi.
        Self {
            width: 900,
            height: 1600,
        }
    }
}

impl Canvas {
    pub fn validate(self) -> RaceResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RaceError::validation("canvas width/height must be non-zero"));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(RaceError::validation(format!(
                "canvas {}x{} exceeds {}x{}",
                self.width,
                self.height,
                u16::MAX,
                u16::MAX
            )));
        }
        Ok(())
    }

    pub fn size(self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_premul(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_parses_decimal_and_rational_forms() {
        assert_eq!("1.8".parse::<Fps>().unwrap(), Fps { num: 9, den: 5 });
        assert_eq!("30".parse::<Fps>().unwrap(), Fps { num: 30, den: 1 });
        assert_eq!(
            "30000/1001".parse::<Fps>().unwrap(),
            Fps {
                num: 30000,
                den: 1001
            }
        );
        assert_eq!("0.5".parse::<Fps>().unwrap(), Fps { num: 1, den: 2 });
        assert!("0".parse::<Fps>().is_err());
        assert!("abc".parse::<Fps>().is_err());
        assert!("1/0".parse::<Fps>().is_err());
        assert!("-2".parse::<Fps>().is_err());
    }

    #[test]
    fn fps_ffmpeg_rate_and_durations() {
        let fps = Fps::default();
        assert_eq!(fps.to_ffmpeg_rate(), "9/5");
        assert!((fps.as_f64() - 1.8).abs() < 1e-12);
        assert!((fps.frames_to_secs(9) - 5.0).abs() < 1e-12);
        assert_eq!(Fps::new(60, 2).unwrap().to_ffmpeg_rate(), "30");
    }

    #[test]
    fn canvas_validation_limits() {
        assert!(Canvas::default().validate().is_ok());
        assert!(
            Canvas {
                width: 0,
                height: 10
            }
            .validate()
            .is_err()
        );
        assert!(
            Canvas {
                width: 70_000,
                height: 10
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn premul_half_alpha() {
        let c = Rgba8 {
            r: 255,
            g: 0,
            b: 100,
            a: 128,
        };
        assert_eq!(c.to_premul(), [128, 0, 50, 128]);
        assert_eq!(Rgba8::WHITE.to_premul(), [255, 255, 255, 255]);
    }
}
