use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use tracing::debug;
use wgpu::util::DeviceExt;

use crate::error::Result;
use crate::gpu::context::GpuContext;
use crate::gpu::{LINE_WORKGROUP, storage_entry, texture_entry, uniform_entry};
use crate::processing::extents::{EdgeExtents, ScanningParameters};
use crate::processing::source::SourceImage;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct EdgeUniform {
    width: u32,
    height: u32,
    tolerance: u32,
    _pad: u32,
    background: [u32; 4],
}

#[derive(Debug, Clone, Copy)]
enum ScanAxis {
    Columns,
    Rows,
}

impl ScanAxis {
    fn label(self) -> &'static str {
        match self {
            ScanAxis::Columns => "edges-columns",
            ScanAxis::Rows => "edges-rows",
        }
    }
}

pub(crate) struct EdgePipelines {
    columns: wgpu::ComputePipeline,
    rows: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
}

impl EdgePipelines {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("edges-compute"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/edges.comp.wgsl").into()),
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("edges-layout"),
            entries: &[
                uniform_entry(0),
                texture_entry(1),
                storage_entry(2),
                storage_entry(3),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("edges-pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let build = |entry_point: &str, label: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        };
        Self {
            columns: build("scan_columns", "edges-columns-pipeline"),
            rows: build("scan_rows", "edges-rows-pipeline"),
            layout,
        }
    }

    /// Column pass, then row pass, then the host min/max reduction.
    ///
    /// The row pass is only submitted after the column readback completes.
    pub(crate) fn run(
        &self,
        ctx: &GpuContext,
        image: &SourceImage,
        params: &ScanningParameters,
    ) -> Result<EdgeExtents> {
        let started = Instant::now();
        let source = ctx.upload(image)?;
        let uniforms = EdgeUniform {
            width: image.width(),
            height: image.height(),
            tolerance: u32::from(params.tolerance()),
            _pad: 0,
            background: params.background_rgba8().map(u32::from),
        };
        let uniform_buf = ctx.device().create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("edges-uniform"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let (column_top, column_bottom) =
            self.scan(ctx, ScanAxis::Columns, image.width(), &uniform_buf, &source)?;
        let (row_left, row_right) =
            self.scan(ctx, ScanAxis::Rows, image.height(), &uniform_buf, &source)?;

        let extents = EdgeExtents::reduce(&column_top, &column_bottom, &row_left, &row_right);
        debug!(
            width = image.width(),
            height = image.height(),
            ?extents,
            elapsed = ?started.elapsed(),
            "gpu edge scan complete"
        );
        Ok(extents)
    }

    fn scan(
        &self,
        ctx: &GpuContext,
        axis: ScanAxis,
        lines: u32,
        uniform_buf: &wgpu::Buffer,
        source: &wgpu::TextureView,
    ) -> Result<(Vec<u32>, Vec<u32>)> {
        let device = ctx.device();
        let size = u64::from(lines) * std::mem::size_of::<u32>() as u64;
        let (first, first_staging) = ctx.result_buffers("edges-first-hit", size)?;
        let (last, last_staging) = ctx.result_buffers("edges-last-hit", size)?;
        let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(axis.label()),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: first.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: last.as_entire_binding(),
                },
            ],
        });

        let pipeline = match axis {
            ScanAxis::Columns => &self.columns,
            ScanAxis::Rows => &self.rows,
        };
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(axis.label()),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(axis.label()),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind, &[]);
            pass.dispatch_workgroups(lines.div_ceil(LINE_WORKGROUP), 1, 1);
        }
        encoder.copy_buffer_to_buffer(&first, 0, &first_staging, 0, size);
        encoder.copy_buffer_to_buffer(&last, 0, &last_staging, 0, size);
        let submitted = ctx.submit(encoder)?;

        let first_hits = ctx.read_back(&first_staging, submitted)?;
        let last_hits = ctx.read_back(&last_staging, submitted)?;
        Ok((first_hits, last_hits))
    }
}
