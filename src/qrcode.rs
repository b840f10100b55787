//! PNG-encoded QR codes for short URLs. Deliberately thin: the spec
//! treats this as decoration, not a module worth its own abstraction.

use image::{ImageBuffer, Rgba};
use qrcode::QrCode;

const DEFAULT_SIZE: u32 = 256;
const MIN_SIZE: u32 = 64;
const MAX_SIZE: u32 = 1024;

#[derive(Debug)]
pub struct QrError(String);

impl std::fmt::Display for QrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "qr code generation failed: {}", self.0)
    }
}

impl std::error::Error for QrError {}

/// Renders `data` as a QR code PNG at `size`x`size` pixels (clamped to
/// [64, 1024]) using the given foreground/background colors.
pub fn render_png(
    data: &str,
    size: Option<u32>,
    fg_color: Option<[u8; 3]>,
    bg_color: Option<[u8; 3]>,
) -> Result<Vec<u8>, QrError> {
    let size = size.unwrap_or(DEFAULT_SIZE).clamp(MIN_SIZE, MAX_SIZE);
    let fg = fg_color.unwrap_or([0, 0, 0]);
    let bg = bg_color.unwrap_or([255, 255, 255]);

    let code = QrCode::new(data.as_bytes()).map_err(|e| QrError(e.to_string()))?;
    let modules = code.width() as u32;
    let scale = (size / modules).max(1);
    let rendered_size = modules * scale;

    let mut buffer: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(rendered_size, rendered_size);

    for (x, y, pixel) in buffer.enumerate_pixels_mut() {
        let module_x = (x / scale).min(modules - 1) as usize;
        let module_y = (y / scale).min(modules - 1) as usize;
        let is_dark = code[(module_x, module_y)] == qrcode::Color::Dark;
        let color = if is_dark { fg } else { bg };
        *pixel = Rgba([color[0], color[1], color[2], 255]);
    }

    let mut png_bytes = Vec::new();
    {
        let mut cursor = std::io::Cursor::new(&mut png_bytes);
        buffer
            .write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|e| QrError(e.to_string()))?;
    }
    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_valid_png_bytes() {
        let png = render_png("https://example.com/abc123", None, None, None).unwrap();
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn honours_custom_size_within_bounds() {
        let png = render_png("https://example.com", Some(512), None, None).unwrap();
        assert!(!png.is_empty());
    }

    #[test]
    fn clamps_out_of_range_size() {
        let tiny = render_png("https://example.com", Some(1), None, None).unwrap();
        let huge = render_png("https://example.com", Some(99999), None, None).unwrap();
        assert!(!tiny.is_empty());
        assert!(!huge.is_empty());
    }
}
