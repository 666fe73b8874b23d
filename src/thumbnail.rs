//! Thumbnail generation for uploaded images.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;

/// Thumbnails fit within a square of this many pixels, aspect ratio preserved.
pub const THUMBNAIL_SIZE: u32 = 200;

const JPEG_QUALITY: u8 = 80;

#[derive(Debug)]
pub enum ThumbnailError {
    Image(image::ImageError),
    Task,
}

impl std::fmt::Display for ThumbnailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThumbnailError::Image(e) => write!(f, "Image processing failed: {}", e),
            ThumbnailError::Task => write!(f, "Thumbnail task failed"),
        }
    }
}

impl std::error::Error for ThumbnailError {}

impl From<image::ImageError> for ThumbnailError {
    fn from(e: image::ImageError) -> Self {
        ThumbnailError::Image(e)
    }
}

/// Decode, downscale and re-encode as JPEG. Blocking.
fn render(data: &[u8]) -> Result<Vec<u8>, ThumbnailError> {
    let img = image::load_from_memory(data)?;
    let thumb = if img.width() > THUMBNAIL_SIZE || img.height() > THUMBNAIL_SIZE {
        img.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE).to_rgb8()
    } else {
        img.to_rgb8()
    };

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&thumb)?;
    Ok(out.into_inner())
}

/// Produce a JPEG thumbnail on the blocking pool.
pub async fn generate_thumbnail(data: Vec<u8>) -> Result<Vec<u8>, ThumbnailError> {
    tokio::task::spawn_blocking(move || render(&data))
        .await
        .map_err(|_| ThumbnailError::Task)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn test_thumbnail_bounded_and_jpeg() {
        let thumb = generate_thumbnail(png(400, 300)).await.unwrap();

        assert_eq!(image::guess_format(&thumb).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!(decoded.width(), 200);
        assert_eq!(decoded.height(), 150);
    }

    #[tokio::test]
    async fn test_small_image_not_upscaled() {
        let thumb = generate_thumbnail(png(50, 40)).await.unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (50, 40));
    }

    #[tokio::test]
    async fn test_garbage_rejected() {
        let err = generate_thumbnail(b"not an image".to_vec()).await.unwrap_err();
        assert!(matches!(err, ThumbnailError::Image(_)));
    }
}
