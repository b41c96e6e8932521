//! Pressure shading of the loaded surface.

use cgmath::Vector3;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::{Instance, InstanceRaw},
        model::{self, Mesh, Vertex},
        texture::Texture,
    },
    pipelines::basic::{mk_render_pipeline, triangles, uniform_bind_group, uniform_layout},
    resources::mesh::SurfaceData,
    shading::PressurePalette,
    wind::FrameInputs,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PressureUniform {
    /// Unit wind direction in world space. Never rotated with the surface.
    wind_direction: [f32; 3],
    time: f32,
    high: [f32; 4],
    mid: [f32; 4],
    low: [f32; 4],
}

fn rgba(c: [f32; 3]) -> [f32; 4] {
    [c[0], c[1], c[2], 1.0]
}

impl PressureUniform {
    pub fn new(palette: &PressurePalette) -> Self {
        Self {
            wind_direction: Vector3::unit_x().into(),
            time: 0.0,
            high: rgba(palette.high),
            mid: rgba(palette.mid),
            low: rgba(palette.low),
        }
    }

    pub fn update(&mut self, frame: &FrameInputs) {
        self.wind_direction = frame.direction.into();
        self.time = frame.time;
    }

    pub fn wind_direction(&self) -> Vector3<f32> {
        self.wind_direction.into()
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

#[derive(Debug)]
pub struct PressureResources {
    pub uniform: PressureUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl PressureResources {
    pub fn new(device: &wgpu::Device, palette: &PressurePalette) -> Self {
        let uniform = PressureUniform::new(palette);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Pressure Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = uniform_layout(device, "pressure_bind_group_layout");
        let bind_group =
            uniform_bind_group(device, &bind_group_layout, &buffer, "pressure_bind_group");
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, frame: &FrameInputs) {
        self.uniform.update(frame);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

pub fn mk_pressure_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    pressure_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Pressure Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout, pressure_bind_group_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Pressure Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("pressure.wgsl").into()),
    };

    // Uploaded meshes are not guaranteed to be closed or consistently
    // wound, so both faces are drawn.
    mk_render_pipeline(
        device,
        &layout,
        format,
        Some(Texture::DEPTH_FORMAT),
        &[model::MeshVertex::desc(), InstanceRaw::desc()],
        triangles(None),
        shader,
    )
}

/// The loaded surface on the GPU together with its placement.
#[derive(Debug)]
pub struct SurfaceModel {
    pub mesh: Mesh,
    pub instance: Instance,
    pub instance_buffer: wgpu::Buffer,
}

impl SurfaceModel {
    pub fn new(device: &wgpu::Device, surface: &SurfaceData) -> Self {
        let instance = Instance::new();
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface Instance Buffer"),
            contents: bytemuck::cast_slice(&[instance.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            mesh: Mesh::from_surface(device, surface),
            instance,
            instance_buffer,
        }
    }

    pub fn name(&self) -> &str {
        &self.mesh.name
    }

    /// Replace the surface rotation. The vertex data stays untouched.
    pub fn orient(&mut self, queue: &wgpu::Queue, rotation: cgmath::Quaternion<f32>) {
        if self.instance.rotation == rotation {
            return;
        }
        self.instance.rotation = rotation;
        queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&[self.instance.to_raw()]),
        );
    }
}
