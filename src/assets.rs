pub mod decode;
pub mod icons;
pub mod text;

use std::sync::Arc;

/// Raster image ready for drawing.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}
