//! wgpu compute backend for the reductions.
//!
//! Every kernel has the same shape: upload the image as an `Rgba8Uint`
//! texture, dispatch a kernel that writes disjoint slots of a storage buffer,
//! copy into a staging buffer and read back on the host. Each submission's
//! dispatch timeout is measured from just before `Queue::submit`.

pub mod context;
mod edges;
mod pixellate;
mod readback;

pub use context::{GpuContext, GpuOptions, PowerPreference};

/// Work-group size of the 2D pixellation kernels.
pub(crate) const WORKGROUP_X: u32 = 8;
pub(crate) const WORKGROUP_Y: u32 = 8;
/// Work-group size of the per-line edge scan kernels.
pub(crate) const LINE_WORKGROUP: u32 = 64;

pub(crate) fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Uint,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

pub(crate) fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    storage_buffer_entry(binding, false)
}

pub(crate) fn read_only_storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    storage_buffer_entry(binding, true)
}

fn storage_buffer_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
