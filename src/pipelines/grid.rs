//! Ground grid below the particle volume.

use wgpu::util::DeviceExt;

use crate::{
    config::GridConfig,
    data_structures::{model::Vertex, texture::Texture},
    pipelines::basic::{lines, mk_render_pipeline},
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GridVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex for GridVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GridVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Line segments of a square grid in the XZ plane, two vertices per line.
///
/// The two lines through the origin use the centre colour.
pub fn grid_lines(config: &GridConfig) -> Vec<GridVertex> {
    let divisions = config.divisions.max(1);
    let half = config.size / 2.0;
    let step = config.size / divisions as f32;
    let y = config.height;

    let mut vertices = Vec::with_capacity(4 * (divisions as usize + 1));
    for i in 0..=divisions {
        let offset = -half + step * i as f32;
        let color = if 2 * i == divisions {
            config.center_color
        } else {
            config.line_color
        };
        vertices.push(GridVertex { position: [offset, y, -half], color });
        vertices.push(GridVertex { position: [offset, y, half], color });
        vertices.push(GridVertex { position: [-half, y, offset], color });
        vertices.push(GridVertex { position: [half, y, offset], color });
    }
    vertices
}

pub fn mk_grid_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    environment_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Grid Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout, environment_bind_group_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Grid Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("grid.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &layout,
        format,
        Some(Texture::DEPTH_FORMAT),
        &[GridVertex::desc()],
        lines(),
        shader,
    )
}

#[derive(Debug)]
pub struct Grid {
    vertex_buffer: wgpu::Buffer,
    num_vertices: u32,
}

impl Grid {
    pub fn new(device: &wgpu::Device, config: &GridConfig) -> Self {
        let vertices = grid_lines(config);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Grid Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            vertex_buffer,
            num_vertices: vertices.len() as u32,
        }
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..self.num_vertices, 0..1);
    }
}
