use std::{borrow::Cow, path::Path};

use anyhow::Context as _;

use crate::foundation::{
    core::Rgba8,
    error::{RaceError, RaceResult},
};

/// Families tried, in order, before the database's generic sans-serif.
const PREFERRED_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Arial",
    "Helvetica",
];

/// RGBA8 brush color used by Parley text layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Rgba8> for TextBrushRgba8 {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Build the label engine from the configured font, else from the system font database.
///
/// No usable font is an error: labels and the title are part of every frame.
pub fn load_label_font(configured: Option<&Path>) -> RaceResult<TextLayoutEngine> {
    if let Some(path) = configured {
        return TextLayoutEngine::from_font_file(path);
    }
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    engine_from_font_db(&db)
}

/// Pick a sans-serif face from `db`, falling back to its first face.
pub fn engine_from_font_db(db: &usvg::fontdb::Database) -> RaceResult<TextLayoutEngine> {
    use usvg::fontdb::{Family, Query};

    let query = |family: Family<'_>| {
        db.query(&Query {
            families: &[family],
            ..Query::default()
        })
    };
    let id = PREFERRED_FAMILIES
        .iter()
        .find_map(|name| query(Family::Name(name)))
        .or_else(|| query(Family::SansSerif))
        .or_else(|| db.faces().next().map(|face| face.id))
        .ok_or_else(|| {
            RaceError::render(
                "no usable font found on this system; set `font` in the config or pass --font",
            )
        })?;

    let (bytes, index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| RaceError::render("system font data could not be read"))?;
    if let Some(face) = db.face(id) {
        tracing::debug!(
            family = face.families.first().map(|(name, _)| name.as_str()),
            index,
            "resolved system font"
        );
    }
    TextLayoutEngine::from_face(bytes, index)
}

/// Shapes single-line labels with one registered font.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
    font_bytes: Vec<u8>,
    font_index: u32,
}

impl std::fmt::Debug for TextLayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextLayoutEngine")
            .field("family_name", &self.family_name)
            .field("font_bytes_len", &self.font_bytes.len())
            .field("font_index", &self.font_index)
            .finish()
    }
}

impl TextLayoutEngine {
    pub fn from_font_file(path: &Path) -> RaceResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        Self::from_font_bytes(bytes)
    }

    pub fn from_font_bytes(font_bytes: Vec<u8>) -> RaceResult<Self> {
        Self::from_face(font_bytes, 0)
    }

    /// Use face `index` of a font file or collection.
    pub fn from_face(font_bytes: Vec<u8>, font_index: u32) -> RaceResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.clone()), None);
        let family_id = families
            .iter()
            .find(|(_, fonts)| fonts.iter().any(|f| f.index() == font_index))
            .or_else(|| families.first())
            .map(|(id, _)| *id)
            .ok_or_else(|| RaceError::render("no font families registered from font bytes"))?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| RaceError::render("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font_bytes,
            font_index,
        })
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub fn font_bytes(&self) -> &[u8] {
        &self.font_bytes
    }

    pub fn font_index(&self) -> u32 {
        self.font_index
    }

    /// Shape `text` on a single line.
    pub fn layout_line(
        &mut self,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> RaceResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(RaceError::validation("text size_px must be finite and > 0"));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn system_engine() -> Option<TextLayoutEngine> {
        match load_label_font(None) {
            Ok(engine) => Some(engine),
            Err(e) => {
                eprintln!("skipping: {e}");
                None
            }
        }
    }

    #[test]
    fn empty_font_database_is_a_render_error() {
        let db = usvg::fontdb::Database::new();
        let err = engine_from_font_db(&db).unwrap_err();
        assert!(matches!(err, RaceError::Render(_)));
        assert!(err.to_string().contains("--font"));
    }

    #[test]
    fn fonts_outside_well_known_paths_are_found() {
        let Some(engine) = system_engine() else {
            return;
        };
        let dir = PathBuf::from("target")
            .join("text_fonts")
            .join("unusual-font-dir");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Relocated.ttf"), engine.font_bytes()).unwrap();

        let mut db = usvg::fontdb::Database::new();
        db.load_fonts_dir(&dir);
        let found = engine_from_font_db(&db).unwrap();
        assert_eq!(found.font_bytes(), engine.font_bytes());
        assert!(!found.family_name().is_empty());
    }

    #[test]
    fn missing_configured_font_is_an_error() {
        assert!(load_label_font(Some(Path::new("target/no/such/font.ttf"))).is_err());
    }

    #[test]
    fn garbage_font_bytes_are_rejected() {
        assert!(TextLayoutEngine::from_font_bytes(b"not a font".to_vec()).is_err());
    }

    #[test]
    fn lays_out_with_system_font_when_available() {
        let Some(mut engine) = system_engine() else {
            return;
        };
        assert!(!engine.family_name().is_empty());

        let short = engine
            .layout_line("12$", 14.0, Rgba8::WHITE.into())
            .unwrap();
        let long = engine
            .layout_line("12345678$", 14.0, Rgba8::WHITE.into())
            .unwrap();
        assert!(short.width() > 0.0);
        assert!(long.width() > short.width());
        assert!(short.height() > 0.0);
        assert!(engine.layout_line("x", 0.0, Rgba8::WHITE.into()).is_err());
    }
}
