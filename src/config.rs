pub mod color;

use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::foundation::{
    core::{Canvas, Fps, Rgba8},
    error::{RaceError, RaceResult},
};

/// Display color and icon for one entity.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EntityStyle {
    pub name: String,
    pub color: Rgba8,
    /// Icon image path, relative paths resolve against the assets root.
    pub icon: PathBuf,
}

/// Entity name -> [`EntityStyle`] lookup. Built once, never mutated.
#[derive(Clone, Debug, Default)]
pub struct EntityRegistry {
    entries: Vec<EntityStyle>,
    by_name: HashMap<String, usize>,
}

impl EntityRegistry {
    pub fn new(entries: Vec<EntityStyle>) -> RaceResult<Self> {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (idx, e) in entries.iter().enumerate() {
            if by_name.insert(e.name.clone(), idx).is_some() {
                return Err(RaceError::validation(format!(
                    "entity '{}' is registered twice",
                    e.name
                )));
            }
        }
        Ok(Self { entries, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&EntityStyle> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn require(&self, name: &str) -> RaceResult<&EntityStyle> {
        self.get(name).ok_or_else(|| {
            RaceError::registry(format!("entity '{name}' has no registered color or icon"))
        })
    }

    /// Fails listing every entity in `names` without a registry entry.
    pub fn ensure_covers<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> RaceResult<()> {
        let missing: Vec<&str> = names
            .into_iter()
            .filter(|n| self.get(n).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RaceError::registry(format!(
                "no registered color or icon for: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IconSize {
    pub width: u32,
    pub height: u32,
}

/// Plot area margins as fractions of the canvas.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Visual parameters of a frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    pub background: Rgba8,
    pub text_color: Rgba8,
    pub outline_color: Rgba8,
    pub margins: Margins,
    /// Bar thickness as a fraction of one entity slot.
    pub bar_thickness: f64,
    pub icon_size: IconSize,
    /// Gap between bar end and icon, as a fraction of the year's maximum.
    pub icon_gap: f64,
    /// Label anchor distance back from the bar end, as a fraction of the year's maximum.
    pub label_inset: f64,
    /// Axis headroom above the year's maximum.
    pub headroom: f64,
    pub title_px: f32,
    pub label_px: f32,
    pub category_px: f32,
    pub outline_px: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            background: Rgba8::BLACK,
            text_color: Rgba8::WHITE,
            outline_color: Rgba8::BLACK,
            margins: Margins {
                left: 0.2,
                right: 0.1,
                top: 0.08,
                bottom: 0.05,
            },
            bar_thickness: 0.8,
            // 50x30 at zoom 0.8
            icon_size: IconSize {
                width: 40,
                height: 24,
            },
            icon_gap: 0.001,
            label_inset: 0.077,
            headroom: 0.1,
            title_px: 22.0,
            label_px: 14.0,
            category_px: 14.0,
            outline_px: 1.0,
        }
    }
}

impl ChartStyle {
    pub fn validate(&self) -> RaceResult<()> {
        let m = self.margins;
        for (name, v) in [
            ("left", m.left),
            ("right", m.right),
            ("top", m.top),
            ("bottom", m.bottom),
        ] {
            if !(0.0..1.0).contains(&v) {
                return Err(RaceError::validation(format!(
                    "margin {name} must be in [0, 1), got {v}"
                )));
            }
        }
        if m.left + m.right >= 1.0 || m.top + m.bottom >= 1.0 {
            return Err(RaceError::validation("margins leave no plot area"));
        }
        if !(self.bar_thickness > 0.0 && self.bar_thickness <= 1.0) {
            return Err(RaceError::validation("bar_thickness must be in (0, 1]"));
        }
        if self.icon_size.width == 0 || self.icon_size.height == 0 {
            return Err(RaceError::validation("icon_size must be non-zero"));
        }
        if !(self.headroom.is_finite() && self.headroom >= 0.0) {
            return Err(RaceError::validation("headroom must be finite and >= 0"));
        }
        for (name, px) in [
            ("title_px", self.title_px),
            ("label_px", self.label_px),
            ("category_px", self.category_px),
        ] {
            if !px.is_finite() || px <= 0.0 {
                return Err(RaceError::validation(format!(
                    "{name} must be finite and > 0"
                )));
            }
        }
        Ok(())
    }
}

/// Everything needed to turn a GDP table into a bar-chart race.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Header of the column holding entity names.
    pub entity_column: String,
    /// Entities of interest, in the order ties are broken.
    pub countries: Vec<String>,
    pub registry: Vec<EntityStyle>,
    pub canvas: Canvas,
    pub fps: Fps,
    /// Extra copies of the final year appended to the animation.
    pub repeat_frames: u32,
    /// On-screen interval between steps for previews.
    pub interval_ms: u64,
    /// Values are divided by this before labelling.
    pub value_scale: f64,
    /// Title template; `{year}` is substituted.
    pub title: String,
    pub style: ChartStyle,
    /// TrueType/OpenType font for labels. The system font database is searched when unset.
    pub font: Option<PathBuf>,
    /// When false, frames carry bars and icons only and no font is loaded.
    pub draw_text: bool,
}

const DEFAULT_COUNTRIES: [(&str, &str, &str); 10] = [
    ("Germany", "orange", "flags/germany.png"),
    ("Italy", "green", "flags/italy.png"),
    ("United Kingdom", "red", "flags/uk.png"),
    ("France", "purple", "flags/france.png"),
    ("Japan", "white", "flags/japan.png"),
    ("Spain", "yellow", "flags/spain.png"),
    ("Australia", "#00BFFF", "flags/australia.png"),
    ("Canada", "cyan", "flags/canada.png"),
    ("China", "grey", "flags/china.png"),
    ("United States", "blue", "flags/usa.png"),
];

impl Default for RaceConfig {
    fn default() -> Self {
        let registry = DEFAULT_COUNTRIES
            .iter()
            .map(|(name, color, icon)| EntityStyle {
                name: (*name).to_string(),
                color: color::parse_color(color).unwrap_or(Rgba8::WHITE),
                icon: PathBuf::from(icon),
            })
            .collect();

        Self {
            entity_column: "Country Name".to_string(),
            countries: DEFAULT_COUNTRIES
                .iter()
                .map(|(name, _, _)| (*name).to_string())
                .collect(),
            registry,
            canvas: Canvas::default(),
            fps: Fps::default(),
            repeat_frames: 8,
            interval_ms: 100,
            value_scale: 1e9,
            title: "GDP in {year} (Billions)".to_string(),
            style: ChartStyle::default(),
            font: None,
            draw_text: true,
        }
    }
}

impl RaceConfig {
    /// Read a JSON config; missing fields take their defaults.
    pub fn load(path: &Path) -> RaceResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| RaceError::validation(format!("config '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> RaceResult<()> {
        self.canvas.validate()?;
        Fps::new(self.fps.num, self.fps.den)?;
        self.style.validate()?;
        if self.entity_column.trim().is_empty() {
            return Err(RaceError::validation("entity_column must be non-empty"));
        }
        if !(self.value_scale.is_finite() && self.value_scale > 0.0) {
            return Err(RaceError::validation("value_scale must be finite and > 0"));
        }
        Ok(())
    }

    pub fn registry(&self) -> RaceResult<EntityRegistry> {
        EntityRegistry::new(self.registry.clone())
    }

    pub fn title_for(&self, year: i32) -> String {
        self.title.replace("{year}", &year.to_string())
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}
