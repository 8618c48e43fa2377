// src/services/image_processor.rs
use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, GenericImageView, ImageFormat as ImgFormat, Rgb, RgbImage};

use crate::errors::GarimpoError;

/// Longest side sent to the try-on API.
pub const MAX_TRYON_DIMENSION: u32 = 1024;
/// Longest side of persisted history thumbnails.
pub const THUMBNAIL_DIMENSION: u32 = 200;
const THUMBNAIL_JPEG_QUALITY: u8 = 70;

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Rejects non-image uploads before any request is built.
    pub fn validate_image(&self, data: &[u8]) -> Result<(u32, u32), GarimpoError> {
        let img = image::load_from_memory(data)
            .map_err(|e| GarimpoError::InvalidInput(format!("not a valid image file: {}", e)))?;

        let (width, height) = img.dimensions();
        if width > 4096 || height > 4096 {
            return Err(GarimpoError::InvalidInput(
                "image dimensions exceed 4096x4096".to_string(),
            ));
        }
        Ok((width, height))
    }

    /// Canonical encoding for the try-on API: longest side capped at 1024,
    /// transparency flattened onto a white fill (the generation model does
    /// not accept alpha), re-encoded as PNG.
    pub fn canonical_png(&self, data: &[u8]) -> Result<Vec<u8>, GarimpoError> {
        let img = image::load_from_memory(data)
            .map_err(|e| GarimpoError::InvalidInput(format!("not a valid image file: {}", e)))?;

        let img = cap_longest_side(img, MAX_TRYON_DIMENSION);
        let flattened = flatten_onto_white(&img);

        let mut output = Vec::new();
        DynamicImage::ImageRgb8(flattened)
            .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Png)
            .map_err(|e| GarimpoError::ImageProcessing(format!("PNG encode failed: {}", e)))?;
        Ok(output)
    }

    /// Compressed preview stored in history blobs: small bound, lower
    /// quality, data-URL form. The full-resolution original is not kept.
    pub fn thumbnail_data_url(&self, data: &[u8]) -> Result<String, GarimpoError> {
        let img = image::load_from_memory(data)
            .map_err(|e| GarimpoError::InvalidInput(format!("not a valid image file: {}", e)))?;

        let img = cap_longest_side(img, THUMBNAIL_DIMENSION);
        let flattened = flatten_onto_white(&img);

        let mut output = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut output);
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, THUMBNAIL_JPEG_QUALITY);
        encoder
            .encode_image(&flattened)
            .map_err(|e| GarimpoError::ImageProcessing(format!("JPEG encode failed: {}", e)))?;

        Ok(format!(
            "data:image/jpeg;base64,{}",
            general_purpose::STANDARD.encode(&output)
        ))
    }
}

fn cap_longest_side(img: DynamicImage, max_size: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_size && height <= max_size {
        return img;
    }
    let ratio = max_size as f32 / width.max(height) as f32;
    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);
    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as f32 / 255.0;
        let blend = |src: u8| (src as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        canvas.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(img: RgbaImage) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), ImgFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn rejects_non_image_bytes() {
        let processor = ImageProcessor::new();
        assert!(matches!(
            processor.validate_image(b"definitely not an image"),
            Err(GarimpoError::InvalidInput(_))
        ));
    }

    #[test]
    fn canonical_png_caps_longest_side() {
        let processor = ImageProcessor::new();
        let big = RgbaImage::from_pixel(2048, 512, Rgba([10, 20, 30, 255]));
        let encoded = processor.canonical_png(&png_bytes(big)).unwrap();
        let decoded = image::load_from_memory(&encoded).unwrap();
        assert_eq!(decoded.dimensions().0, MAX_TRYON_DIMENSION);
        assert!(decoded.dimensions().1 <= MAX_TRYON_DIMENSION);
    }

    #[test]
    fn canonical_png_flattens_transparency_to_white() {
        let processor = ImageProcessor::new();
        let transparent = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        let encoded = processor.canonical_png(&png_bytes(transparent)).unwrap();
        let decoded = image::load_from_memory(&encoded).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn thumbnail_is_a_small_jpeg_data_url() {
        let processor = ImageProcessor::new();
        let img = RgbaImage::from_pixel(800, 600, Rgba([120, 80, 40, 255]));
        let url = processor.thumbnail_data_url(&png_bytes(img)).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let payload = url.strip_prefix("data:image/jpeg;base64,").unwrap();
        let bytes = general_purpose::STANDARD.decode(payload).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(decoded.dimensions().0 <= THUMBNAIL_DIMENSION);
        assert!(decoded.dimensions().1 <= THUMBNAIL_DIMENSION);
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 32, Rgba([0, 0, 0, 255])));
        let capped = cap_longest_side(img, MAX_TRYON_DIMENSION);
        assert_eq!(capped.dimensions(), (64, 32));
    }
}
