//! QR rasterization for statement PDFs.
//!
//! `qrcode` is used for the module matrix only; the raster is produced here
//! as a plain 8-bit grayscale buffer so the PDF layer can embed it without
//! pulling a full image pipeline through the QR crate.

use qrcode::{
    Color,
    QrCode,
    types::QrError as QrEncodeError,
};

/// Target edge length of the rendered raster in pixels. The actual size is
/// the nearest whole-module multiple at or below this.
pub const QR_TARGET_PX: u32 = 200;

/// Quiet zone around the symbol, in modules, as the QR spec asks for.
const QUIET_ZONE_MODULES: u32 = 4;

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("QR encoding failed: {0}")]
    Encode(#[from] QrEncodeError),
}

/// A square grayscale raster. `pixels` is row-major, one byte per pixel,
/// 0x00 dark and 0xFF light.
#[derive(Debug, Clone)]
pub struct QrRaster {
    pub size_px: u32,
    pub pixels: Vec<u8>,
}

/// Render `data` into a QR raster with a quiet zone, integer-scaled to
/// roughly [`QR_TARGET_PX`].
pub fn rasterize(data: &str) -> Result<QrRaster, QrError> {
    let code = QrCode::new(data.as_bytes())?;
    let width = code.width() as u32;
    let colors = code.to_colors();

    let modules = width + 2 * QUIET_ZONE_MODULES;
    let scale = (QR_TARGET_PX / modules).max(1);
    let size_px = modules * scale;

    let mut pixels = vec![0xFF_u8; (size_px * size_px) as usize];
    for y in 0..width {
        for x in 0..width {
            if colors[(y * width + x) as usize] != Color::Dark {
                continue;
            }
            let px0 = (QUIET_ZONE_MODULES + x) * scale;
            let py0 = (QUIET_ZONE_MODULES + y) * scale;
            for dy in 0..scale {
                let row = (py0 + dy) * size_px;
                for dx in 0..scale {
                    pixels[(row + px0 + dx) as usize] = 0x00;
                }
            }
        }
    }

    Ok(QrRaster { size_px, pixels })
}
