use std::fmt;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::gpu::{GpuContext, GpuOptions};
use crate::processing::cpu;
use crate::processing::extents::{EdgeExtents, ScanningParameters};
use crate::processing::grid::BlockSize;
use crate::processing::pixellation::Pixellation;
use crate::processing::source::SourceImage;

/// Which implementation runs the reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// GPU when one can be initialized, CPU otherwise. A call that fails on
    /// the device is retried on the CPU.
    #[default]
    Auto,
    Gpu,
    Cpu,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Auto => "auto",
            Backend::Gpu => "gpu",
            Backend::Cpu => "cpu",
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReducerConfig {
    pub backend: Backend,
    pub gpu: GpuOptions,
}

#[derive(Debug)]
enum Engine {
    Gpu(GpuContext),
    Cpu,
}

/// Entry point for pixellation and edge finding.
///
/// Owns whatever one-time setup the chosen backend needs; construct it once
/// and pass it to every call site.
#[derive(Debug)]
pub struct Reducer {
    engine: Engine,
    cpu_fallback: bool,
}

impl Reducer {
    pub fn new(config: &ReducerConfig) -> Result<Self> {
        let engine = match config.backend {
            Backend::Cpu => Engine::Cpu,
            Backend::Gpu => Engine::Gpu(GpuContext::new(&config.gpu)?),
            Backend::Auto => match GpuContext::new(&config.gpu) {
                Ok(ctx) => Engine::Gpu(ctx),
                Err(err) => {
                    warn!("gpu reduction unavailable, using cpu: {err}");
                    Engine::Cpu
                }
            },
        };
        Ok(Self {
            engine,
            cpu_fallback: config.backend == Backend::Auto,
        })
    }

    pub fn cpu() -> Self {
        Self {
            engine: Engine::Cpu,
            cpu_fallback: false,
        }
    }

    /// GPU-only reducer around an existing context; device failures are
    /// returned to the caller.
    pub fn with_context(ctx: GpuContext) -> Self {
        Self {
            engine: Engine::Gpu(ctx),
            cpu_fallback: false,
        }
    }

    /// The backend actually in use; never [`Backend::Auto`].
    pub fn active_backend(&self) -> Backend {
        match self.engine {
            Engine::Gpu(_) => Backend::Gpu,
            Engine::Cpu => Backend::Cpu,
        }
    }

    pub fn pixellate(&self, image: &SourceImage, block_size: BlockSize) -> Result<Pixellation> {
        debug!(
            backend = %self.active_backend(),
            width = image.width(),
            height = image.height(),
            block = block_size.get(),
            "pixellate"
        );
        match &self.engine {
            Engine::Gpu(ctx) => self.or_cpu(ctx.pixellate(image, block_size), "pixellate", || {
                cpu::pixellate(image, block_size)
            }),
            Engine::Cpu => Ok(cpu::pixellate(image, block_size)),
        }
    }

    pub fn find_edges(&self, image: &SourceImage, params: &ScanningParameters) -> Result<EdgeExtents> {
        debug!(
            backend = %self.active_backend(),
            width = image.width(),
            height = image.height(),
            background = %params.background(),
            tolerance = params.tolerance(),
            "find edges"
        );
        match &self.engine {
            Engine::Gpu(ctx) => self.or_cpu(ctx.find_edges(image, params), "find edges", || {
                cpu::find_edges(image, params)
            }),
            Engine::Cpu => Ok(cpu::find_edges(image, params)),
        }
    }

    fn or_cpu<T>(&self, gpu: Result<T>, operation: &str, cpu: impl FnOnce() -> T) -> Result<T> {
        match gpu {
            Err(err) if self.cpu_fallback && err.is_device_failure() => {
                warn!("gpu {operation} failed, retrying on cpu: {err}");
                Ok(cpu())
            }
            other => other,
        }
    }
}
