use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use image::Rgba;
use thiserror::Error;

/// RGBA color with every component in `[0, 1]`.
///
/// Matches the `vec4<f32>` layout the pixellation kernel writes, so readback
/// buffers can be cast straight into `&[Color]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(rgba: [u8; 4]) -> Self {
        Self::from_channel_means(rgba.map(f64::from))
    }

    /// Builds a color from per-channel means expressed in 8-bit units.
    ///
    /// Integer means convert to exactly the same value as [`Color::from_rgba8`].
    pub fn from_channel_means(means: [f64; 4]) -> Self {
        let [r, g, b, a] = means.map(|m| (m as f32) / 255.0);
        Self { r, g, b, a }
    }

    /// Average of a block given its per-channel 8-bit sums and pixel count.
    pub fn from_block_sums(sums: [u64; 4], count: u64) -> Self {
        let count = count as f64;
        Self::from_channel_means(sums.map(|s| s as f64 / count))
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        self.to_array()
            .map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// True when every component is finite and inside `[0, 1]`.
    pub fn is_normalized(&self) -> bool {
        self.to_array()
            .iter()
            .all(|c| c.is_finite() && (0.0..=1.0).contains(c))
    }
}

impl From<Rgba<u8>> for Color {
    fn from(pixel: Rgba<u8>) -> Self {
        Self::from_rgba8(pixel.0)
    }
}

impl From<Color> for Rgba<u8> {
    fn from(color: Color) -> Self {
        Rgba(color.to_rgba8())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba8();
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}', expected R,G,B[,A] with 0-255 components or #rrggbb[aa]")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    /// Accepts `R,G,B`, `R,G,B,A` (8-bit components) or `#rrggbb` / `#rrggbbaa`.
    /// Alpha defaults to opaque.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(raw.to_string());
        let trimmed = raw.trim();
        let mut rgba = [0, 0, 0, 255];
        if let Some(hex) = trimmed.strip_prefix('#') {
            if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
                return Err(err());
            }
            for (slot, idx) in rgba.iter_mut().zip((0..hex.len()).step_by(2)) {
                *slot = u8::from_str_radix(&hex[idx..idx + 2], 16).map_err(|_| err())?;
            }
        } else {
            let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
            if !matches!(parts.len(), 3 | 4) {
                return Err(err());
            }
            for (slot, part) in rgba.iter_mut().zip(parts) {
                *slot = part.parse().map_err(|_| err())?;
            }
        }
        Ok(Self::from_rgba8(rgba))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_means_match_direct_conversion() {
        for value in [0u8, 1, 7, 128, 254, 255] {
            let direct = Color::from_rgba8([value; 4]);
            let mean = Color::from_channel_means([f64::from(value); 4]);
            assert_eq!(direct, mean);
        }
    }

    #[test]
    fn rgba8_survives_normalization() {
        let rgba = [12, 200, 33, 90];
        assert_eq!(Color::from_rgba8(rgba).to_rgba8(), rgba);
    }

    #[test]
    fn parses_component_lists_and_hex() {
        let c: Color = "255, 0, 128".parse().unwrap();
        assert_eq!(c.to_rgba8(), [255, 0, 128, 255]);
        let c: Color = "#10203040".parse().unwrap();
        assert_eq!(c.to_rgba8(), [0x10, 0x20, 0x30, 0x40]);
        assert!("1,2".parse::<Color>().is_err());
        assert!("300,0,0".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
    }

    #[test]
    fn parse_error_names_the_input() {
        let err = "red".parse::<Color>().unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("invalid color 'red'"), "{message}");
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn block_sums_of_uniform_pixels_are_exact() {
        let value = 201u64;
        let count = 5000 * 3000;
        let color = Color::from_block_sums([value * count; 4], count);
        assert_eq!(color, Color::from_rgba8([201; 4]));
    }

    #[test]
    fn normalized_check_rejects_out_of_range() {
        assert!(Color::WHITE.is_normalized());
        assert!(!Color::new(1.5, 0.0, 0.0, 1.0).is_normalized());
        assert!(!Color::new(f32::NAN, 0.0, 0.0, 1.0).is_normalized());
    }
}
