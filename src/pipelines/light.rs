//! Lighting rig and distance fog, shared by the grid and streak shaders.

use wgpu::util::DeviceExt;

use crate::{
    config::{FogConfig, LightConfig},
    pipelines::basic::{uniform_bind_group, uniform_layout},
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EnvironmentUniform {
    /// Direction the light travels, normalized.
    light_direction: [f32; 3],
    ambient: f32,
    light_color: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    fog_color: [f32; 3],
    fog_near: f32,
    fog_far: f32,
    _padding2: [u32; 3],
}

impl EnvironmentUniform {
    pub fn new(light: &LightConfig, fog: &FogConfig) -> Self {
        use cgmath::InnerSpace;
        let direction = cgmath::Vector3::from(light.direction);
        let direction = if direction.magnitude2() > 0.0 {
            direction.normalize()
        } else {
            -cgmath::Vector3::unit_y()
        };
        Self {
            light_direction: direction.into(),
            ambient: light.ambient,
            light_color: light.color,
            _padding: 0,
            fog_color: fog.color,
            fog_near: fog.near,
            fog_far: fog.far.max(fog.near + f32::EPSILON),
            _padding2: [0; 3],
        }
    }
}

pub struct LightResources {
    pub uniform: EnvironmentUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, uniform: EnvironmentUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Environment Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = uniform_layout(device, "environment_bind_group_layout");
        let bind_group =
            uniform_bind_group(device, &bind_group_layout, &buffer, "environment_bind_group");
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

impl std::fmt::Debug for LightResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightResources")
            .field("uniform", &self.uniform)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<EnvironmentUniform>(), 64);
    }

    #[test]
    fn fog_range_is_never_empty() {
        let fog = FogConfig {
            color: [0.0; 3],
            near: 10.0,
            far: 5.0,
        };
        let uniform = EnvironmentUniform::new(&LightConfig::default(), &fog);
        assert!(uniform.fog_far > uniform.fog_near);
    }
}
