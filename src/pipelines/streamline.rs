//! Instanced drawing of the streamline pool.

use crate::data_structures::{
    instance::{Instance, InstanceRaw},
    model::{self, DrawMesh, Mesh, Vertex},
    texture::Texture,
};
use crate::pipelines::basic::{mk_render_pipeline, triangles};

pub fn mk_streamline_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    environment_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Streamline Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout, environment_bind_group_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Streamline Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("streamline.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &layout,
        format,
        Some(Texture::DEPTH_FORMAT),
        &[model::MeshVertex::desc(), InstanceRaw::desc()],
        triangles(Some(wgpu::Face::Back)),
        shader,
    )
}

/// GPU side of the particle pool: one box mesh and one instance per particle.
#[derive(Debug)]
pub struct StreakBatch {
    mesh: Mesh,
    instance_buffer: wgpu::Buffer,
    capacity: usize,
    count: usize,
    scratch: Vec<InstanceRaw>,
}

fn instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Streak Instance Buffer"),
        // wgpu rejects zero sized vertex buffers at bind time
        size: (capacity.max(1) * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl StreakBatch {
    pub fn new(device: &wgpu::Device, capacity: usize) -> Self {
        Self {
            mesh: Mesh::unit_box(device),
            instance_buffer: instance_buffer(device, capacity),
            capacity,
            count: 0,
            scratch: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Reallocate the instance buffer for a pool of a different size.
    pub fn resize(&mut self, device: &wgpu::Device, capacity: usize) {
        if capacity == self.capacity {
            return;
        }
        self.instance_buffer = instance_buffer(device, capacity);
        self.capacity = capacity;
        self.count = self.count.min(capacity);
    }

    /// Write this frame's transforms, growing the buffer if the pool outgrew it.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        instances: impl Iterator<Item = Instance>,
    ) {
        self.scratch.clear();
        self.scratch.extend(instances.map(|i| i.to_raw()));
        if self.scratch.len() > self.capacity {
            self.resize(device, self.scratch.len());
        }
        self.count = self.scratch.len();
        if self.count > 0 {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&self.scratch));
        }
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        if self.count == 0 {
            return;
        }
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.draw_mesh_instanced(&self.mesh, 0..self.count as u32);
    }
}
