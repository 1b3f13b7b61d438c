// src/thumbnail/backend.rs
//!
//! Image backends
//!
//! The connector only ever asks three things of an image library: how big
//! an image is, to cut a square thumbnail out of it, and to scale it in
//! place. `ImageBackend` is that capability; `RasterBackend` implements it
//! with the `image` crate and `DisabledBackend` refuses everything.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageBackendError {
    #[error("Image support is disabled")]
    Disabled,

    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: String,
        source: image::ImageError,
    },

    #[error("Failed to write image {path}: {source}")]
    Encode {
        path: String,
        source: image::ImageError,
    },

    #[error("Invalid target size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

pub trait ImageBackend: Send + Sync {
    /// Whether the backend can do anything at all
    fn is_available(&self) -> bool;

    /// Width and height in pixels
    fn measure(&self, path: &Path) -> Result<(u32, u32), ImageBackendError>;

    /// Crop `source` to a centred square, scale it to `size`² and save it
    /// as PNG at `target`.
    fn crop_resize_save(&self, source: &Path, target: &Path, size: u32) -> Result<(), ImageBackendError>;

    /// Scale `path` to exactly `width`x`height`, overwriting it in its own format
    fn resize(&self, path: &Path, width: u32, height: u32) -> Result<(), ImageBackendError>;
}

/// Largest centred square inside a `width`x`height` image, as (x, y, side)
pub fn centred_square(width: u32, height: u32) -> (u32, u32, u32) {
    if width > height {
        ((width - height) / 2, 0, height)
    } else {
        (0, (height - width) / 2, width)
    }
}

/// Backend over the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterBackend;

impl RasterBackend {
    fn open(path: &Path) -> Result<DynamicImage, ImageBackendError> {
        image::open(path).map_err(|source| ImageBackendError::Decode {
            path: path.display().to_string(),
            source,
        })
    }
}

impl ImageBackend for RasterBackend {
    fn is_available(&self) -> bool {
        true
    }

    fn measure(&self, path: &Path) -> Result<(u32, u32), ImageBackendError> {
        image::image_dimensions(path).map_err(|source| ImageBackendError::Decode {
            path: path.display().to_string(),
            source,
        })
    }

    fn crop_resize_save(&self, source: &Path, target: &Path, size: u32) -> Result<(), ImageBackendError> {
        if size == 0 {
            return Err(ImageBackendError::InvalidSize {
                width: size,
                height: size,
            });
        }

        let img = Self::open(source)?;
        let (x, y, side) = centred_square(img.width(), img.height());
        let square = if img.width() == img.height() {
            img
        } else {
            img.crop_imm(x, y, side, side)
        };

        square
            .resize_exact(size, size, FilterType::Triangle)
            .save_with_format(target, ImageFormat::Png)
            .map_err(|source| ImageBackendError::Encode {
                path: target.display().to_string(),
                source,
            })
    }

    fn resize(&self, path: &Path, width: u32, height: u32) -> Result<(), ImageBackendError> {
        if width == 0 || height == 0 {
            return Err(ImageBackendError::InvalidSize { width, height });
        }

        Self::open(path)?
            .resize_exact(width, height, FilterType::Triangle)
            .save(path)
            .map_err(|source| ImageBackendError::Encode {
                path: path.display().to_string(),
                source,
            })
    }
}

/// Backend used when image support is switched off (`imgLib: "none"`)
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledBackend;

impl ImageBackend for DisabledBackend {
    fn is_available(&self) -> bool {
        false
    }

    fn measure(&self, _path: &Path) -> Result<(u32, u32), ImageBackendError> {
        Err(ImageBackendError::Disabled)
    }

    fn crop_resize_save(&self, _source: &Path, _target: &Path, _size: u32) -> Result<(), ImageBackendError> {
        Err(ImageBackendError::Disabled)
    }

    fn resize(&self, _path: &Path, _width: u32, _height: u32) -> Result<(), ImageBackendError> {
        Err(ImageBackendError::Disabled)
    }
}
