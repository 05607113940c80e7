//! Image encoding: `DynamicImage` → PNG bytes, optionally base64-wrapped.
//!
//! PNG is lossless. JPEG artefacts around glyph edges measurably hurt both
//! Tesseract and Cloud Vision on small print, and page-units are short-lived,
//! so file size does not matter here.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded {}x{} image → {} PNG bytes", img.width(), img.height(), buf.len());
    Ok(buf)
}

/// Encode an image as base64 PNG, the form JSON image APIs expect.
pub fn encode_base64_png(img: &DynamicImage) -> Result<String, image::ImageError> {
    Ok(STANDARD.encode(encode_png(img)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 0, 0])));
        let png = encode_png(&img).expect("encode should succeed");
        assert!(png.starts_with(b"\x89PNG"));

        let b64 = encode_base64_png(&img).unwrap();
        let decoded = STANDARD.decode(&b64).expect("valid base64");
        assert_eq!(decoded, png);
    }

    #[test]
    fn png_round_trips_dimensions() {
        let img = DynamicImage::new_rgb8(7, 3);
        let png = encode_png(&img).unwrap();
        let back = image::load_from_memory(&png).unwrap();
        assert_eq!((back.width(), back.height()), (7, 3));
    }
}
