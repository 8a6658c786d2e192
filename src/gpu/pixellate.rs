use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;
use tracing::debug;
use wgpu::util::DeviceExt;

use crate::error::Result;
use crate::gpu::context::GpuContext;
use crate::gpu::{
    WORKGROUP_X, WORKGROUP_Y, read_only_storage_entry, storage_entry, texture_entry, uniform_entry,
};
use crate::processing::color::Color;
use crate::processing::grid::{BlockGrid, BlockSize};
use crate::processing::pixellation::Pixellation;
use crate::processing::source::SourceImage;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PixellateUniform {
    width: u32,
    height: u32,
    block_size: u32,
    columns: u32,
}

impl PixellateUniform {
    fn new(grid: &BlockGrid, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            // same cells as the grid, and `column * block_size` stays in range
            block_size: grid.block_size().min(width.max(height)),
            columns: grid.columns(),
        }
    }
}

/// Two dispatches: per-block row sums, then a per-pixel broadcast of the
/// block averages the host folded from those sums.
pub(crate) struct PixellatePipeline {
    sums: wgpu::ComputePipeline,
    sums_layout: wgpu::BindGroupLayout,
    broadcast: wgpu::ComputePipeline,
    broadcast_layout: wgpu::BindGroupLayout,
}

impl PixellatePipeline {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let (sums, sums_layout) = build_pipeline(
            device,
            "pixellate-sums",
            include_str!("shaders/block_sums.comp.wgsl"),
            &[uniform_entry(0), texture_entry(1), storage_entry(2)],
        );
        let (broadcast, broadcast_layout) = build_pipeline(
            device,
            "pixellate-broadcast",
            include_str!("shaders/pixellate.comp.wgsl"),
            &[uniform_entry(0), read_only_storage_entry(1), storage_entry(2)],
        );
        Self {
            sums,
            sums_layout,
            broadcast,
            broadcast_layout,
        }
    }

    pub(crate) fn run(
        &self,
        ctx: &GpuContext,
        image: &SourceImage,
        block_size: BlockSize,
    ) -> Result<Pixellation> {
        let started = Instant::now();
        let width = image.width();
        let height = image.height();
        let grid = BlockGrid::new(width, height, block_size);
        let uniforms = PixellateUniform::new(&grid, width, height);
        let uniform_buf = ctx.device().create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pixellate-uniform"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let row_sums = self.sum_rows(ctx, image, &grid, &uniform_buf)?;
        let averages = fold_row_sums(&grid, &row_sums);
        let colors = self.broadcast(ctx, image, &averages, &uniform_buf)?;

        debug!(
            width,
            height,
            block = block_size.get(),
            blocks = averages.len(),
            elapsed = ?started.elapsed(),
            "gpu pixellation complete"
        );
        Ok(Pixellation::new(width, height, grid, colors))
    }

    fn sum_rows(
        &self,
        ctx: &GpuContext,
        image: &SourceImage,
        grid: &BlockGrid,
        uniform_buf: &wgpu::Buffer,
    ) -> Result<Vec<[u32; 4]>> {
        let device = ctx.device();
        let size = u64::from(grid.columns())
            * u64::from(image.height())
            * std::mem::size_of::<[u32; 4]>() as u64;
        let (sums, staging) = ctx.result_buffers("pixellate-row-sums", size)?;
        let source = ctx.upload(image)?;
        let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pixellate-sums-bind"),
            layout: &self.sums_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&source),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: sums.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("pixellate-sums-command"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("pixellate-sums-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.sums);
            pass.set_bind_group(0, &bind, &[]);
            pass.dispatch_workgroups(
                grid.columns().div_ceil(WORKGROUP_X),
                image.height().div_ceil(WORKGROUP_Y),
                1,
            );
        }
        encoder.copy_buffer_to_buffer(&sums, 0, &staging, 0, size);
        let submitted = ctx.submit(encoder)?;
        ctx.read_back(&staging, submitted)
    }

    fn broadcast(
        &self,
        ctx: &GpuContext,
        image: &SourceImage,
        averages: &[Color],
        uniform_buf: &wgpu::Buffer,
    ) -> Result<Vec<Color>> {
        let device = ctx.device();
        let size = (image.pixel_count() * std::mem::size_of::<Color>()) as u64;
        let (output, staging) = ctx.result_buffers("pixellate-output", size)?;
        let blocks = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pixellate-blocks"),
            contents: bytemuck::cast_slice(averages),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pixellate-broadcast-bind"),
            layout: &self.broadcast_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: blocks.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: output.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("pixellate-broadcast-command"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("pixellate-broadcast-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.broadcast);
            pass.set_bind_group(0, &bind, &[]);
            pass.dispatch_workgroups(
                image.width().div_ceil(WORKGROUP_X),
                image.height().div_ceil(WORKGROUP_Y),
                1,
            );
        }
        encoder.copy_buffer_to_buffer(&output, 0, &staging, 0, size);
        let submitted = ctx.submit(encoder)?;
        ctx.read_back(&staging, submitted)
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    entries: &[wgpu::BindGroupLayoutEntry],
) -> (wgpu::ComputePipeline, wgpu::BindGroupLayout) {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries,
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: Some("main"),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        cache: None,
    });
    (pipeline, layout)
}

/// Folds `columns x height` per-row block sums into one average per block,
/// row-major over `grid`.
fn fold_row_sums(grid: &BlockGrid, row_sums: &[[u32; 4]]) -> Vec<Color> {
    let columns = grid.columns() as usize;
    (0..grid.rows())
        .into_par_iter()
        .flat_map_iter(|row| {
            let band = grid.cell_rect(0, row);
            let mut totals = vec![[0u64; 4]; columns];
            for y in band.y..band.y + band.height {
                let line = &row_sums[y as usize * columns..][..columns];
                for (total, sum) in totals.iter_mut().zip(line) {
                    for (t, &s) in total.iter_mut().zip(sum) {
                        *t += u64::from(s);
                    }
                }
            }
            totals.into_iter().enumerate().map(move |(col, total)| {
                Color::from_block_sums(total, grid.cell_rect(col as u32, row).area())
            })
        })
        .collect()
}
