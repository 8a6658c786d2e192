use image::imageops;

use crate::error::{ReduceError, Result};
use crate::processing::color::Color;
use crate::processing::source::SourceImage;

/// Sentinel for an unset `top`/`left` edge. Any real hit is smaller.
pub const UNSET_MIN: u32 = u32::MAX;
/// Sentinel for an unset `bottom`/`right` edge. Any real hit is at least as large.
pub const UNSET_MAX: u32 = 0;

/// What counts as background when scanning for content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanningParameters {
    background: Color,
    tolerance: u8,
}

impl ScanningParameters {
    /// `tolerance` is the largest per-channel difference (in 8-bit units) still
    /// treated as background; `0` means exact match.
    pub fn new(background: Color, tolerance: u8) -> Result<Self> {
        if !background.is_normalized() {
            return Err(ReduceError::invalid(
                "background",
                format!("components must lie in [0, 1], got {background:?}"),
            ));
        }
        Ok(Self {
            background,
            tolerance,
        })
    }

    pub fn exact(background: Color) -> Result<Self> {
        Self::new(background, 0)
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn tolerance(&self) -> u8 {
        self.tolerance
    }

    /// Background quantized to the 8-bit layout of the source pixels.
    pub fn background_rgba8(&self) -> [u8; 4] {
        self.background.to_rgba8()
    }

    pub(crate) fn matcher(&self) -> ContentMatcher {
        ContentMatcher {
            background: self.background_rgba8(),
            tolerance: self.tolerance,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ContentMatcher {
    background: [u8; 4],
    tolerance: u8,
}

impl ContentMatcher {
    #[inline]
    pub(crate) fn is_content(&self, pixel: [u8; 4]) -> bool {
        pixel
            .iter()
            .zip(self.background)
            .any(|(&p, b)| p.abs_diff(b) > self.tolerance)
    }
}

/// Bounding box of every non-background pixel.
///
/// Starts from the sentinels (`top = left = u32::MAX`, `bottom = right = 0`)
/// and keeps them when no content exists; see [`EdgeExtents::is_empty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeExtents {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl Default for EdgeExtents {
    fn default() -> Self {
        Self {
            top: UNSET_MIN,
            left: UNSET_MIN,
            bottom: UNSET_MAX,
            right: UNSET_MAX,
        }
    }
}

impl EdgeExtents {
    /// Min/max reduction over the per-column and per-row scan results.
    ///
    /// Slots that saw no content still hold their sentinel and are dominated
    /// by any real hit.
    pub fn reduce(
        column_top: &[u32],
        column_bottom: &[u32],
        row_left: &[u32],
        row_right: &[u32],
    ) -> Self {
        let defaults = Self::default();
        Self {
            top: column_top.iter().copied().fold(defaults.top, u32::min),
            bottom: column_bottom.iter().copied().fold(defaults.bottom, u32::max),
            left: row_left.iter().copied().fold(defaults.left, u32::min),
            right: row_right.iter().copied().fold(defaults.right, u32::max),
        }
    }

    /// True when the scan found no content pixel.
    pub fn is_empty(&self) -> bool {
        self.top > self.bottom || self.left > self.right
    }

    pub fn width(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            self.right - self.left + 1
        }
    }

    pub fn height(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            self.bottom - self.top + 1
        }
    }

    /// `(x, y, width, height)` of the content, or `None` when empty.
    pub fn as_rect(&self) -> Option<(u32, u32, u32, u32)> {
        (!self.is_empty()).then(|| (self.left, self.top, self.width(), self.height()))
    }

    /// Copies the content region out of `image`.
    pub fn crop(&self, image: &SourceImage) -> Option<SourceImage> {
        let (x, y, width, height) = self.as_rect()?;
        if x + width > image.width() || y + height > image.height() {
            return None;
        }
        let cropped = imageops::crop_imm(image.as_rgba(), x, y, width, height).to_image();
        SourceImage::new(cropped).ok()
    }
}
