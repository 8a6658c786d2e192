use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::gpu::{GpuOptions, PowerPreference};
use crate::processing::color::Color;
use crate::processing::extents::ScanningParameters;
use crate::processing::grid::BlockSize;
use crate::reducer::{Backend, ReducerConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Reduction backend: `auto`, `gpu` or `cpu`.
    pub backend: Backend,
    /// Adapter preference when selecting a GPU.
    pub power_preference: PowerPreference,
    /// Longest time to wait for a single compute dispatch.
    #[serde(with = "humantime_serde")]
    pub dispatch_timeout: Duration,
    /// Defaults for the pixellation pass.
    pub pixellate: PixellateOptions,
    /// Defaults for the edge scan.
    pub edges: EdgeOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Reads `path` when given, otherwise starts from the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_yaml_file(path)
                .with_context(|| format!("loading config from {}", path.display())),
            None => Ok(Self::default()),
        }
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.dispatch_timeout > Duration::ZERO,
            "dispatch-timeout must be positive"
        );
        self.edges
            .scanning_parameters()
            .context("invalid edges configuration")?;
        Ok(self)
    }

    pub fn reducer_config(&self) -> ReducerConfig {
        ReducerConfig {
            backend: self.backend,
            gpu: GpuOptions {
                power_preference: self.power_preference,
                dispatch_timeout: self.dispatch_timeout,
            },
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            power_preference: PowerPreference::default(),
            dispatch_timeout: GpuOptions::default_dispatch_timeout(),
            pixellate: PixellateOptions::default(),
            edges: EdgeOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PixellateOptions {
    pub block_size: BlockSize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EdgeOptions {
    /// `[r, g, b]`, `[r, g, b, a]` or `"#rrggbb[aa]"`.
    #[serde(deserialize_with = "deserialize_color")]
    pub background: Color,
    /// Per-channel difference still counted as background.
    pub tolerance: u8,
}

impl EdgeOptions {
    pub fn scanning_parameters(&self) -> Result<ScanningParameters> {
        Ok(ScanningParameters::new(self.background, self.tolerance)?)
    }
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self {
            background: Color::BLACK,
            tolerance: 0,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawColor {
    Components(Vec<u8>),
    Text(String),
}

fn deserialize_color<'de, D>(deserializer: D) -> Result<Color, D::Error>
where
    D: Deserializer<'de>,
{
    match RawColor::deserialize(deserializer)? {
        RawColor::Components(parts) => match parts.as_slice() {
            &[r, g, b] => Ok(Color::from_rgba8([r, g, b, 255])),
            &[r, g, b, a] => Ok(Color::from_rgba8([r, g, b, a])),
            _ => Err(de::Error::invalid_length(
                parts.len(),
                &"3 or 4 color components",
            )),
        },
        RawColor::Text(raw) => raw.parse().map_err(de::Error::custom),
    }
}
