//! Per-year frame selection and chart geometry.
//!
//! Everything here is pure: the same year, observations and config always produce the same
//! [`FrameLayout`], which the rasterizer then draws from scratch.

use crate::{
    config::{EntityRegistry, RaceConfig},
    data::reshape::Observation,
    foundation::{
        core::{Point, Rect, Rgba8},
        error::{RaceError, RaceResult},
    },
};

/// One year's observations, sorted ascending by value.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub year: i32,
    pub rows: Vec<Observation>,
}

impl Frame {
    /// Select `year` from `observations`. Equal values keep their input order.
    pub fn select(year: i32, observations: &[Observation]) -> RaceResult<Self> {
        let mut rows: Vec<Observation> = observations
            .iter()
            .filter(|o| o.year == year)
            .cloned()
            .collect();
        if rows.is_empty() {
            return Err(RaceError::render(format!("no observations for year {year}")));
        }
        rows.sort_by(|a, b| a.value.total_cmp(&b.value));
        Ok(Self { year, rows })
    }

    pub fn max_value(&self) -> f64 {
        self.rows
            .iter()
            .map(|o| o.value)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Upper end of the value axis with 10% headroom.
    pub fn axis_bound(&self) -> f64 {
        axis_bound(self.max_value(), 0.1)
    }
}

/// `max + headroom * |max|`: never below `max`, strictly above it when `max > 0`.
pub fn axis_bound(max: f64, headroom: f64) -> f64 {
    max + headroom * max.abs()
}

/// Geometry of one bar and its decorations, in canvas pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct BarLayout {
    pub entity: String,
    pub value: f64,
    pub color: Rgba8,
    pub rect: Rect,
    /// Top-left corner of the icon.
    pub icon_origin: Point,
    pub label: String,
    /// Left edge, vertical center of the value label.
    pub label_anchor: Point,
    /// Right edge, vertical center of the category (entity name) label.
    pub category_anchor: Point,
}

/// Everything the rasterizer needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameLayout {
    pub year: i32,
    pub title: String,
    /// Horizontal center, vertical center of the title.
    pub title_anchor: Point,
    pub plot: Rect,
    pub axis_bound: f64,
    /// Bottom (smallest value) to top.
    pub bars: Vec<BarLayout>,
}

impl FrameLayout {
    pub fn compute(
        frame: &Frame,
        cfg: &RaceConfig,
        registry: &EntityRegistry,
    ) -> RaceResult<Self> {
        let style = &cfg.style;
        let size = cfg.canvas.size();
        let plot = Rect::new(
            size.width * style.margins.left,
            size.height * style.margins.top,
            size.width * (1.0 - style.margins.right),
            size.height * (1.0 - style.margins.bottom),
        );

        let max = frame.max_value();
        let bound = axis_bound(max, style.headroom);
        let span = if bound > 0.0 { bound } else { 1.0 };
        let to_x = |v: f64| plot.x0 + (v.max(0.0) / span).min(1.0) * plot.width();

        let slot = plot.height() / frame.rows.len() as f64;
        let thickness = slot * style.bar_thickness;
        let icon_h = f64::from(style.icon_size.height);

        let mut bars = Vec::with_capacity(frame.rows.len());
        for (i, row) in frame.rows.iter().enumerate() {
            let entity = registry.require(&row.entity)?;
            let cy = plot.y1 - (i as f64 + 0.5) * slot;
            let x_end = to_x(row.value);

            bars.push(BarLayout {
                entity: row.entity.clone(),
                value: row.value,
                color: entity.color,
                rect: Rect::new(plot.x0, cy - thickness / 2.0, x_end, cy + thickness / 2.0),
                icon_origin: Point::new(
                    x_end + (style.icon_gap * max.abs() / span) * plot.width(),
                    cy - icon_h / 2.0,
                ),
                label: format_value(row.value, cfg.value_scale),
                label_anchor: Point::new(to_x(row.value - style.label_inset * max), cy),
                category_anchor: Point::new(plot.x0 - 8.0, cy),
            });
        }

        Ok(Self {
            year: frame.year,
            title: cfg.title_for(frame.year),
            title_anchor: Point::new(size.width / 2.0, plot.y0 / 2.0),
            plot,
            axis_bound: bound,
            bars,
        })
    }
}

/// `2.1e12` with scale `1e9` -> `"2100$"`.
pub fn format_value(value: f64, scale: f64) -> String {
    format!("{:.0}$", value / scale)
}
