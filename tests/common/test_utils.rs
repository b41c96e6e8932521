#![allow(dead_code)]

use std::path::PathBuf;

/// Path of a sample mesh shipped in `assets/`.
pub fn asset_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("assets")
        .join(name)
}

pub fn read_asset(name: &str) -> Vec<u8> {
    std::fs::read(asset_path(name)).expect("sample asset is missing")
}

#[cfg(feature = "integration-tests")]
pub mod gpu {
    use std::time::Duration;

    use flow_tunnel::{
        SceneConfig, Settings,
        context::Context,
        particles::StreamlineParticles,
        resources::parse_surface,
        scene::TunnelScene,
        snapshot,
    };
    use rand::{SeedableRng, rngs::StdRng};

    pub const WIDTH: u32 = 320;
    pub const HEIGHT: u32 = 240;

    /// Headless context plus a scene with a seeded particle pool.
    pub struct Harness {
        pub ctx: Context,
        pub scene: TunnelScene,
        pub settings: Settings,
    }

    impl Harness {
        pub fn new(settings: Settings) -> Self {
            let _ = env_logger::builder().is_test(true).try_init();
            let config = SceneConfig::default();
            let ctx = futures::executor::block_on(Context::headless(WIDTH, HEIGHT, &config))
                .expect("integration tests need a graphics adapter");
            let particles = StreamlineParticles::with_rng(
                settings.wind.particle_count,
                settings.bounds,
                StdRng::seed_from_u64(42),
            );
            let scene = TunnelScene::with_particles(&ctx, &config, particles);
            Self {
                ctx,
                scene,
                settings,
            }
        }

        pub fn load(&mut self, name: &str) {
            let bytes = super::read_asset(name);
            let surface = parse_surface(name, &bytes).expect("sample asset parses");
            self.scene.set_surface(&self.ctx, &surface);
        }

        pub fn frame(&mut self, dt: Duration) {
            self.ctx
                .camera
                .write_to_buffer(&self.ctx.queue, &self.ctx.projection);
            self.scene.update(&self.ctx, &self.settings, dt);
        }

        pub fn snapshot(&self) -> image::RgbaImage {
            futures::executor::block_on(snapshot::capture(&self.ctx, &self.scene))
                .expect("snapshot succeeds")
        }
    }
}
