//! Web preparation of generated images before upload.

use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageResult, Rgb, RgbImage};

/// Longest side kept after optimization
pub const MAX_DIMENSION: u32 = 2048;

/// Flatten transparency onto white, shrink anything larger than
/// [`MAX_DIMENSION`], and re-encode as a compressed PNG.
///
/// Input that cannot be decoded or re-encoded is returned unchanged.
pub fn optimize_png(bytes: Vec<u8>) -> Vec<u8> {
    match reencode(&bytes) {
        Ok(out) => {
            tracing::debug!(before = bytes.len(), after = out.len(), "Optimized image");
            out
        }
        Err(e) => {
            tracing::warn!(error = %e, "Image optimization failed, uploading original bytes");
            bytes
        }
    }
}

fn reencode(bytes: &[u8]) -> ImageResult<Vec<u8>> {
    let mut img = image::load_from_memory(bytes)?;

    if img.color().has_alpha() {
        img = DynamicImage::ImageRgb8(flatten_on_white(&img));
    }

    if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        img = img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3);
    }

    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, PngFilter::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(out)
}

fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
