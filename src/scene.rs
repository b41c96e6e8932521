//! The composed tunnel scene.
//!
//! [`TunnelScene`] owns everything that is drawn: the pressure-shaded
//! surface, the streamline pool and the ground grid. Each frame it derives
//! one [`FrameInputs`] from the current [`Settings`] and feeds the same value
//! to the shader uniform and to the particle advance.

use std::time::Duration;

use crate::{
    config::{SceneConfig, Settings},
    context::Context,
    data_structures::{instance::Instance, model::DrawMesh},
    particles::StreamlineParticles,
    pipelines::{
        grid::{Grid, mk_grid_pipeline},
        pressure::{PressureResources, SurfaceModel, mk_pressure_pipeline},
        streamline::{StreakBatch, mk_streamline_pipeline},
    },
    resources::mesh::SurfaceData,
    wind::FrameInputs,
};

#[derive(Debug)]
pub struct TunnelScene {
    pressure: PressureResources,
    pressure_pipeline: wgpu::RenderPipeline,
    streak_pipeline: wgpu::RenderPipeline,
    grid_pipeline: wgpu::RenderPipeline,
    grid: Grid,
    surface: Option<SurfaceModel>,
    particles: StreamlineParticles,
    streaks: StreakBatch,
    elapsed: Duration,
    last_frame: Option<FrameInputs>,
}

impl TunnelScene {
    pub fn new(ctx: &Context, settings: &Settings, config: &SceneConfig) -> Self {
        Self::with_particles(
            ctx,
            config,
            StreamlineParticles::new(settings.wind.particle_count, settings.bounds),
        )
    }

    /// Build the scene around an existing pool, e.g. one with a seeded rng.
    pub fn with_particles(
        ctx: &Context,
        config: &SceneConfig,
        particles: StreamlineParticles,
    ) -> Self {
        let format = ctx.config.format;
        let pressure = PressureResources::new(&ctx.device, &config.palette);
        let pressure_pipeline = mk_pressure_pipeline(
            &ctx.device,
            format,
            &ctx.camera.bind_group_layout,
            &pressure.bind_group_layout,
        );
        let streak_pipeline = mk_streamline_pipeline(
            &ctx.device,
            format,
            &ctx.camera.bind_group_layout,
            &ctx.light.bind_group_layout,
        );
        let grid_pipeline = mk_grid_pipeline(
            &ctx.device,
            format,
            &ctx.camera.bind_group_layout,
            &ctx.light.bind_group_layout,
        );
        let streaks = StreakBatch::new(&ctx.device, particles.len());

        Self {
            pressure,
            pressure_pipeline,
            streak_pipeline,
            grid_pipeline,
            grid: Grid::new(&ctx.device, &config.grid),
            surface: None,
            particles,
            streaks,
            elapsed: Duration::ZERO,
            last_frame: None,
        }
    }

    /// Swap in a newly loaded surface, replacing any previous one.
    pub fn set_surface(&mut self, ctx: &Context, surface: &SurfaceData) {
        if let Some(old) = &self.surface {
            log::info!("replacing surface {} with {}", old.name(), surface.name);
        }
        self.surface = Some(SurfaceModel::new(&ctx.device, surface));
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn surface(&self) -> Option<&SurfaceModel> {
        self.surface.as_ref()
    }

    pub fn particles(&self) -> &StreamlineParticles {
        &self.particles
    }

    /// The inputs of the most recent [`update`](Self::update).
    pub fn last_frame(&self) -> Option<&FrameInputs> {
        self.last_frame.as_ref()
    }

    pub fn pressure(&self) -> &PressureResources {
        &self.pressure
    }

    /// Advance the scene by `dt` and upload everything the next draw needs.
    pub fn update(&mut self, ctx: &Context, settings: &Settings, dt: Duration) -> FrameInputs {
        self.elapsed += dt;
        let frame = FrameInputs::derive(&settings.wind, self.elapsed);

        self.pressure.write(&ctx.queue, &frame);

        if self
            .particles
            .reconfigure(settings.wind.particle_count, settings.bounds)
        {
            self.streaks.resize(&ctx.device, self.particles.len());
        }
        let respawns = self.particles.advance_with(dt.as_secs_f32(), &frame);
        log::trace!("{} streak respawns", respawns);
        self.streaks.upload(
            &ctx.device,
            &ctx.queue,
            self.particles.instances(frame.direction, frame.speed),
        );

        if let Some(surface) = &mut self.surface {
            surface.orient(&ctx.queue, settings.orientation.rotation());
        }

        self.last_frame = Some(frame);
        frame
    }

    /// Record the draw calls: grid, then the surface, then the streaks.
    pub fn draw<'a>(&'a self, ctx: &'a Context, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);

        render_pass.set_pipeline(&self.grid_pipeline);
        render_pass.set_bind_group(1, &ctx.light.bind_group, &[]);
        self.grid.draw(render_pass);

        if let Some(surface) = &self.surface {
            render_pass.set_pipeline(&self.pressure_pipeline);
            render_pass.set_bind_group(1, &self.pressure.bind_group, &[]);
            render_pass.set_vertex_buffer(1, surface.instance_buffer.slice(..));
            render_pass.draw_mesh_instanced(&surface.mesh, 0..1);
        }

        if self.streaks.is_empty() {
            log::debug!("streamline pool is empty, skipping streaks");
            return;
        }
        render_pass.set_pipeline(&self.streak_pipeline);
        render_pass.set_bind_group(1, &ctx.light.bind_group, &[]);
        self.streaks.draw(render_pass);
    }

    /// Current surface placement, identity when nothing is loaded.
    pub fn surface_instance(&self) -> Instance {
        self.surface
            .as_ref()
            .map(|s| s.instance.clone())
            .unwrap_or_default()
    }
}
