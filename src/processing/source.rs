use std::path::Path;

use image::{DynamicImage, ImageReader, RgbaImage};
use tracing::debug;

use crate::error::{ReduceError, Result};

/// Immutable RGBA8 bitmap handed to the reducers.
///
/// Pixels are stored row-major and tightly packed (4 bytes per pixel,
/// straight alpha). Both dimensions are non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pixels: RgbaImage,
}

impl SourceImage {
    pub fn new(pixels: RgbaImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ReduceError::invalid(
                "image",
                format!(
                    "dimensions must be non-zero, got {}x{}",
                    pixels.width(),
                    pixels.height()
                ),
            ));
        }
        Ok(Self { pixels })
    }

    pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        Self::new(image.to_rgba8())
    }

    /// Wraps decoder output whose rows may carry trailing padding.
    ///
    /// `bytes_per_row` is the decoder's stride and must cover at least
    /// `width * 4` bytes.
    pub fn from_raw(width: u32, height: u32, bytes_per_row: usize, bytes: &[u8]) -> Result<Self> {
        let packed_row = width as usize * 4;
        if bytes_per_row < packed_row {
            return Err(ReduceError::invalid(
                "bytes_per_row",
                format!("stride {bytes_per_row} is smaller than a {width}-pixel row"),
            ));
        }
        let required = match height as usize {
            0 => 0,
            rows => bytes_per_row * (rows - 1) + packed_row,
        };
        if bytes.len() < required {
            return Err(ReduceError::invalid(
                "bytes",
                format!(
                    "buffer holds {} bytes, {width}x{height} at stride {bytes_per_row} needs {required}",
                    bytes.len()
                ),
            ));
        }
        let data = if bytes_per_row == packed_row {
            bytes[..required].to_vec()
        } else {
            let mut data = Vec::with_capacity(packed_row * height as usize);
            for row in bytes.chunks(bytes_per_row).take(height as usize) {
                data.extend_from_slice(&row[..packed_row]);
            }
            data
        };
        let pixels = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            ReduceError::invalid("bytes", "buffer does not match image dimensions")
        })?;
        Self::new(pixels)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = ImageReader::open(path)
            .map_err(image::ImageError::IoError)?
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .decode()?;
        debug!(
            path = %path.display(),
            width = decoded.width(),
            height = decoded.height(),
            "decoded source image"
        );
        Self::from_dynamic(&decoded)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// RGBA8 value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the image. Use [`SourceImage::get_pixel`]
    /// for a checked lookup.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    /// RGBA8 value at `(x, y)`, or `None` outside the image.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixels.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Tightly packed RGBA8 bytes, the layout uploaded to the device.
    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// One row of pixels as RGBA8 quadruples.
    pub(crate) fn row(&self, y: u32) -> &[[u8; 4]] {
        let start = y as usize * self.width() as usize;
        let all: &[[u8; 4]] = bytemuck::cast_slice(self.as_bytes());
        &all[start..start + self.width() as usize]
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }
}
