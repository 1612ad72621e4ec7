use image::{GenericImageView, Rgba, RgbaImage};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("Failed to load image: {0}")]
    LoadFailed(#[from] image::ImageError),
    #[error("Image has no pixels")]
    Empty,
}

/// A decoded animation frame, shared cheaply between the cache and every
/// visual that currently displays it.
#[derive(Debug, Clone)]
pub struct FrameTexture {
    image: Arc<RgbaImage>,
    label: Arc<str>,
}

impl FrameTexture {
    pub fn from_bytes(bytes: &[u8], label: &str) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes)?;
        Self::from_image(&img, label)
    }

    pub fn from_image(img: &image::DynamicImage, label: &str) -> Result<Self, TextureError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(TextureError::Empty);
        }
        debug!("Decoded frame {} ({}x{})", label, width, height);
        Ok(Self {
            image: Arc::new(img.to_rgba8()),
            label: Arc::from(label),
        })
    }

    /// Built-in fallback sprite: a two-tone checkerboard in 16px cells.
    pub fn placeholder(width: u32, height: u32) -> Self {
        let light = Rgba([0xcc, 0xcc, 0xcc, 0xff]);
        let dark = Rgba([0x55, 0x55, 0x55, 0xff]);
        let image = RgbaImage::from_fn(width.max(1), height.max(1), |x, y| {
            if (x / 16 + y / 16) % 2 == 0 {
                light
            } else {
                dark
            }
        });
        Self {
            image: Arc::new(image),
            label: Arc::from("placeholder"),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// True when both handles point at the same decoded pixels.
    pub fn same_as(&self, other: &FrameTexture) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}
