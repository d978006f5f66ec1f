//! Bounded image decoding for widget rasters

use crate::AppError;
use app_fs::{FolderSource, ImageEntry};
use image::imageops::FilterType;
use image::{GenericImageView, ImageReader, Limits};
use std::io::Cursor;

/// Default decoder target box
pub const TARGET_WIDTH: u32 = 600;
pub const TARGET_HEIGHT: u32 = 600;

/// Largest source width or height accepted for decoding
pub const MAX_SOURCE_DIMENSION: u32 = 16_384;

/// Decoder allocation ceiling for the full-resolution pass
pub const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

/// A decoded, size-bounded RGBA8 raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Sample factor applied to the source dimensions
    pub sample_size: u32,
    pub data: Vec<u8>,
}

/// Power-of-two sample factor for a `width` x `height` source.
///
/// Doubles while *half* of each source dimension, divided by the factor, still
/// covers the requested size. The result therefore keeps the raster at roughly
/// twice the target box rather than fitting it tightly.
pub fn calculate_sample_size(width: u32, height: u32, req_width: u32, req_height: u32) -> u32 {
    let req_width = req_width.max(1);
    let req_height = req_height.max(1);
    let mut sample_size = 1;

    if height > req_height || width > req_width {
        let half_height = height / 2;
        let half_width = width / 2;
        while half_height / sample_size >= req_height && half_width / sample_size >= req_width {
            sample_size *= 2;
        }
    }

    sample_size
}

/// Two-pass decoder: read dimensions, pick a sample factor, decode.
#[derive(Debug, Clone, Copy)]
pub struct BoundedDecoder {
    target_width: u32,
    target_height: u32,
}

impl BoundedDecoder {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width: target_width.max(1),
            target_height: target_height.max(1),
        }
    }

    pub fn target(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Decode one gallery entry.
    ///
    /// Any failure (unreadable source, unknown format, zero dimensions,
    /// corrupt pixel data) is reported as [`AppError::Undecodable`].
    pub fn decode(&self, source: &dyn FolderSource, entry: &ImageEntry) -> Result<DecodedImage, AppError> {
        let data = source
            .read(&entry.uri)
            .map_err(|e| AppError::Undecodable(format!("{}: {}", entry.display_name, e)))?;

        self.decode_bytes(&data)
            .map_err(|e| match e {
                AppError::Undecodable(msg) => AppError::Undecodable(format!("{}: {}", entry.display_name, msg)),
                other => other,
            })
    }

    /// Decode an in-memory encoded image
    pub fn decode_bytes(&self, data: &[u8]) -> Result<DecodedImage, AppError> {
        // Pass 1: bounds only
        let (width, height) = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| AppError::Undecodable(e.to_string()))?
            .into_dimensions()?;

        if width == 0 || height == 0 {
            return Err(AppError::Undecodable(format!("empty bounds {}x{}", width, height)));
        }

        if width > MAX_SOURCE_DIMENSION || height > MAX_SOURCE_DIMENSION {
            return Err(AppError::Undecodable(format!("bounds {}x{} exceed decode limits", width, height)));
        }

        let sample_size = calculate_sample_size(width, height, self.target_width, self.target_height);

        // Pass 2: pixels, subsampled
        let mut reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| AppError::Undecodable(e.to_string()))?;
        reader.limits(decode_limits());
        let img = reader.decode()?;

        let img = if sample_size > 1 {
            let (w, h) = img.dimensions();
            img.resize_exact(
                (w / sample_size).max(1),
                (h / sample_size).max(1),
                FilterType::Triangle,
            )
        } else {
            img
        };

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        tracing::trace!("Decoded {}x{} (sample size {})", width, height, sample_size);

        Ok(DecodedImage {
            width,
            height,
            sample_size,
            data: rgba.into_raw(),
        })
    }
}

impl Default for BoundedDecoder {
    fn default() -> Self {
        Self::new(TARGET_WIDTH, TARGET_HEIGHT)
    }
}
