//! Image transformation: decode, resize-to-fill, optional grayscale, JPEG.

use std::io::Cursor;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// The blocking transform task panicked or was cancelled.
    #[error("Transform task aborted: {0}")]
    Aborted(String),

    #[error("{0}")]
    Other(String),
}

/// Turn source bytes into artifact bytes.
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(&self, bytes: Vec<u8>) -> Result<Vec<u8>, TransformError>;
}

/// Default output box, matching the thumbnails the service has always produced.
pub const DEFAULT_WIDTH: u32 = 200;
pub const DEFAULT_HEIGHT: u32 = 200;

/// Resize to cover a fixed box (cropping the overflow) and encode as JPEG.
#[derive(Debug, Clone, Copy)]
pub struct ResizeTransformer {
    pub width: u32,
    pub height: u32,
    pub grayscale: bool,
}

impl Default for ResizeTransformer {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            grayscale: false,
        }
    }
}

impl ResizeTransformer {
    fn apply(&self, bytes: &[u8]) -> Result<Vec<u8>, TransformError> {
        let source = image::load_from_memory(bytes).map_err(TransformError::Decode)?;
        let resized = source.resize_to_fill(self.width, self.height, FilterType::Lanczos3);

        // JPEG has no alpha channel.
        let output = if self.grayscale {
            DynamicImage::ImageLuma8(resized.to_luma8())
        } else {
            DynamicImage::ImageRgb8(resized.to_rgb8())
        };

        let mut buf = Cursor::new(Vec::new());
        output
            .write_to(&mut buf, ImageFormat::Jpeg)
            .map_err(TransformError::Encode)?;
        Ok(buf.into_inner())
    }
}

#[async_trait]
impl Transformer for ResizeTransformer {
    async fn transform(&self, bytes: Vec<u8>) -> Result<Vec<u8>, TransformError> {
        let this = *self;
        tokio::task::spawn_blocking(move || this.apply(&bytes))
            .await
            .map_err(|e| TransformError::Aborted(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use image::{GenericImageView, Rgba, RgbaImage};

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 90, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn resizes_to_box_and_encodes_jpeg() {
        let out = ResizeTransformer::default()
            .transform(png(400, 300))
            .await
            .unwrap();

        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (200, 200));
    }

    #[tokio::test]
    async fn grayscale_output_has_single_channel() {
        let transformer = ResizeTransformer {
            width: 64,
            height: 32,
            grayscale: true,
        };
        let out = transformer.transform(png(100, 100)).await.unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (64, 32));
        assert_eq!(decoded.color(), image::ColorType::L8);
    }

    #[tokio::test]
    async fn garbage_bytes_fail_to_decode() {
        let err = ResizeTransformer::default()
            .transform(b"definitely not an image".to_vec())
            .await
            .unwrap_err();
        assert_matches!(err, TransformError::Decode(_));
    }
}
