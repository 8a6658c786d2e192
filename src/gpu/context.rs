use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{InitializationError, ReduceError, Result};
use crate::gpu::edges::EdgePipelines;
use crate::gpu::pixellate::PixellatePipeline;
use crate::gpu::readback;
use crate::processing::extents::{EdgeExtents, ScanningParameters};
use crate::processing::grid::BlockSize;
use crate::processing::pixellation::Pixellation;
use crate::processing::source::SourceImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(value: PowerPreference) -> Self {
        match value {
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuOptions {
    pub power_preference: PowerPreference,
    /// Upper bound on each submission, measured from just before
    /// `Queue::submit` until its results are mapped on the host.
    ///
    /// Backends whose submit call blocks (GL) cannot be interrupted; the
    /// timeout is then reported as soon as the submit returns.
    pub dispatch_timeout: Duration,
}

impl GpuOptions {
    pub const fn default_dispatch_timeout() -> Duration {
        Duration::from_secs(10)
    }
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            power_preference: PowerPreference::default(),
            dispatch_timeout: Self::default_dispatch_timeout(),
        }
    }
}

/// Device, queue and compiled reduction pipelines.
///
/// Build once and reuse for every call: all pipeline compilation happens in
/// [`GpuContext::new`]. Per-call work only allocates the input texture and
/// the result buffers.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter: wgpu::AdapterInfo,
    limits: wgpu::Limits,
    timeout: Duration,
    pixellate: PixellatePipeline,
    edges: EdgePipelines,
}

impl GpuContext {
    pub fn new(options: &GpuOptions) -> Result<Self, InitializationError> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: options.power_preference.into(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;
        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("blockcam-reduce-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))?;
        info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "initialized gpu reduction context"
        );

        let pixellate = build_checked(&device, "pixellate", PixellatePipeline::new)?;
        let edges = build_checked(&device, "edges", EdgePipelines::new)?;

        Ok(Self {
            device,
            queue,
            adapter: adapter_info,
            limits,
            timeout: options.dispatch_timeout,
            pixellate,
            edges,
        })
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter
    }

    pub fn dispatch_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn pixellate(&self, image: &SourceImage, block_size: BlockSize) -> Result<Pixellation> {
        self.pixellate.run(self, image, block_size)
    }

    pub fn find_edges(&self, image: &SourceImage, params: &ScanningParameters) -> Result<EdgeExtents> {
        self.edges.run(self, image, params)
    }

    pub(crate) fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Submits `encoder` and returns the instant the dispatch clock started.
    pub(crate) fn submit(&self, encoder: wgpu::CommandEncoder) -> Result<Instant> {
        let commands = encoder.finish();
        let submitted = Instant::now();
        self.queue.submit(Some(commands));
        readback::check_deadline(submitted, self.timeout)?;
        Ok(submitted)
    }

    /// Uploads `image` as an `Rgba8Uint` texture and returns its view.
    pub(crate) fn upload(&self, image: &SourceImage) -> Result<wgpu::TextureView> {
        let max_dim = self.limits.max_texture_dimension_2d;
        if image.width() > max_dim || image.height() > max_dim {
            return Err(ReduceError::allocation(
                "source texture",
                format!(
                    "{}x{} exceeds the device limit of {max_dim}px",
                    image.width(),
                    image.height()
                ),
            ));
        }
        let size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("blockcam-source"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Uint,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width() * 4),
                rows_per_image: Some(image.height()),
            },
            size,
        );
        debug!(width = image.width(), height = image.height(), "uploaded source texture");
        Ok(texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    /// Allocates a storage buffer plus its mappable staging twin.
    pub(crate) fn result_buffers(&self, label: &'static str, size: u64) -> Result<(wgpu::Buffer, wgpu::Buffer)> {
        let binding_limit = u64::from(self.limits.max_storage_buffer_binding_size);
        if size > binding_limit || size > self.limits.max_buffer_size {
            return Err(ReduceError::allocation(
                label,
                format!("{size} bytes exceeds the device storage limit of {binding_limit} bytes"),
            ));
        }
        let storage = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok((storage, staging))
    }

    /// Blocks until `staging` is readable, at most until the dispatch timeout
    /// measured from `submitted` runs out.
    pub(crate) fn read_back<T: bytemuck::Pod>(
        &self,
        staging: &wgpu::Buffer,
        submitted: Instant,
    ) -> Result<Vec<T>> {
        readback::read_buffer(&self.device, staging, submitted, self.timeout)
    }
}

impl fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.adapter.name)
            .field("backend", &self.adapter.backend)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Runs `build` inside a validation error scope so shader or pipeline
/// errors come back as values instead of the default panic handler.
fn build_checked<T>(
    device: &wgpu::Device,
    pipeline: &'static str,
    build: impl FnOnce(&wgpu::Device) -> T,
) -> Result<T, InitializationError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let built = build(device);
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(InitializationError::ShaderCompilation {
            pipeline,
            message: err.to_string(),
        }),
        None => Ok(built),
    }
}
