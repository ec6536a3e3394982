use std::{collections::HashMap, sync::Arc};

use crate::{
    assets::{
        PreparedImage,
        icons::IconStore,
        text::{TextBrushRgba8, TextLayoutEngine, load_label_font},
    },
    config::{ChartStyle, RaceConfig},
    foundation::{
        core::{Canvas, Point, Rect, Rgba8},
        error::{RaceError, RaceResult},
    },
    render::{FrameRGBA, frame::FrameLayout},
};

/// Rasterizes [`FrameLayout`]s with `vello_cpu`, redrawing every frame from scratch.
pub struct CpuRenderer {
    canvas: Canvas,
    style: ChartStyle,
    text: Option<TextPainter>,
    icon_cache: HashMap<String, vello_cpu::Image>,
}

struct TextPainter {
    engine: TextLayoutEngine,
    font: vello_cpu::peniko::FontData,
}

#[derive(Clone, Copy)]
enum HAlign {
    Left,
    Center,
    Right,
}

impl CpuRenderer {
    /// Build a renderer, loading the label font from `cfg` or the system font database.
    ///
    /// Fails when no font is available. With `draw_text` off no font is loaded.
    pub fn new(cfg: &RaceConfig) -> RaceResult<Self> {
        if !cfg.draw_text {
            return Self::without_text(cfg);
        }
        let engine = load_label_font(cfg.font.as_deref())?;
        tracing::info!(family = engine.family_name(), "loaded label font");
        Self::with_text_engine(cfg, Some(engine))
    }

    /// Bars and icons only: no value labels, category labels or title.
    pub fn without_text(cfg: &RaceConfig) -> RaceResult<Self> {
        Self::with_text_engine(cfg, None)
    }

    pub fn with_text_engine(cfg: &RaceConfig, engine: Option<TextLayoutEngine>) -> RaceResult<Self> {
        cfg.canvas.validate()?;
        let text = engine.map(|engine| {
            let font = vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(engine.font_bytes().to_vec()),
                engine.font_index(),
            );
            TextPainter { engine, font }
        });
        Ok(Self {
            canvas: cfg.canvas,
            style: cfg.style.clone(),
            text,
            icon_cache: HashMap::new(),
        })
    }

    #[tracing::instrument(skip_all, fields(year = layout.year))]
    pub fn render(&mut self, layout: &FrameLayout, icons: &IconStore) -> RaceResult<FrameRGBA> {
        let (w, h) = canvas_u16(self.canvas)?;
        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(to_color(self.style.background));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, f64::from(w), f64::from(h)));

        for bar in &layout.bars {
            if bar.rect.width() > 0.0 {
                ctx.set_paint(to_color(bar.color));
                ctx.fill_rect(&rect_to_cpu(bar.rect));
            }
        }

        for bar in &layout.bars {
            let icon = icons.get(&bar.entity)?;
            let paint = self.icon_paint_for(&bar.entity, icon)?;
            ctx.set_transform(vello_cpu::kurbo::Affine::translate((
                bar.icon_origin.x.round(),
                bar.icon_origin.y.round(),
            )));
            ctx.set_paint(paint);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(icon.width),
                f64::from(icon.height),
            ));
        }

        if let Some(text) = self.text.as_mut() {
            let style = &self.style;
            for bar in &layout.bars {
                text.draw(
                    &mut ctx,
                    &bar.label,
                    style.label_px,
                    bar.label_anchor,
                    HAlign::Left,
                    style.text_color,
                    Some((style.outline_color, style.outline_px)),
                )?;
                text.draw(
                    &mut ctx,
                    &bar.entity,
                    style.category_px,
                    bar.category_anchor,
                    HAlign::Right,
                    style.text_color,
                    None,
                )?;
            }
            text.draw(
                &mut ctx,
                &layout.title,
                style.title_px,
                layout.title_anchor,
                HAlign::Center,
                style.text_color,
                None,
            )?;
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        clear_pixmap(&mut pixmap, self.style.background.to_premul());
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn icon_paint_for(
        &mut self,
        entity: &str,
        icon: &PreparedImage,
    ) -> RaceResult<vello_cpu::Image> {
        if let Some(paint) = self.icon_cache.get(entity) {
            return Ok(paint.clone());
        }

        let pixmap =
            image_premul_bytes_to_pixmap(icon.rgba8_premul.as_slice(), icon.width, icon.height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.icon_cache.insert(entity.to_string(), paint.clone());
        Ok(paint)
    }
}

impl TextPainter {
    /// Draw `text` vertically centered on `anchor`, optionally with an outline halo.
    #[allow(clippy::too_many_arguments)]
    fn draw(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        size_px: f32,
        anchor: Point,
        align: HAlign,
        color: Rgba8,
        outline: Option<(Rgba8, f64)>,
    ) -> RaceResult<()> {
        let layout = self
            .engine
            .layout_line(text, size_px, TextBrushRgba8::from(color))?;
        let width = f64::from(layout.width());
        let height = f64::from(layout.height());
        let x = match align {
            HAlign::Left => anchor.x,
            HAlign::Center => anchor.x - width / 2.0,
            HAlign::Right => anchor.x - width,
        };
        let origin = Point::new(x.round(), (anchor.y - height / 2.0).round());

        if let Some((outline_color, px)) = outline
            && px > 0.0
        {
            for (dx, dy) in [
                (-1.0, -1.0),
                (0.0, -1.0),
                (1.0, -1.0),
                (-1.0, 0.0),
                (1.0, 0.0),
                (-1.0, 1.0),
                (0.0, 1.0),
                (1.0, 1.0),
            ] {
                let at = Point::new(origin.x + dx * px, origin.y + dy * px);
                self.fill_layout(ctx, &layout, at, Some(outline_color));
            }
        }
        self.fill_layout(ctx, &layout, origin, None);
        Ok(())
    }

    fn fill_layout(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        layout: &parley::Layout<TextBrushRgba8>,
        origin: Point,
        color_override: Option<Rgba8>,
    ) {
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((origin.x, origin.y)));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                let c = color_override.unwrap_or(Rgba8 {
                    r: brush.r,
                    g: brush.g,
                    b: brush.b,
                    a: brush.a,
                });
                ctx.set_paint(to_color(c));

                let mut pen_x = run.offset();
                let baseline = run.baseline();
                let glyphs = run.glyphs().map(|g| {
                    let glyph = vello_cpu::Glyph {
                        id: g.id,
                        x: pen_x + g.x,
                        y: baseline - g.y,
                    };
                    pen_x += g.advance;
                    glyph
                });
                ctx.glyph_run(&self.font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }
}

fn canvas_u16(canvas: Canvas) -> RaceResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| RaceError::render("canvas width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| RaceError::render("canvas height exceeds u16"))?;
    Ok((w, h))
}

fn to_color(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    let data = pixmap.data_as_u8_slice_mut();
    for px in data.chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> RaceResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| RaceError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| RaceError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(RaceError::render("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}
