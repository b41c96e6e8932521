use flow_tunnel::{
    ElementState, KeyCode, KeyEvent, Out, PhysicalKey, Settings, TunnelFlow, WindowEvent,
    cgmath::Vector3,
    context::Context,
    image::RgbaImage,
    resources::{LoadError, mesh::SurfaceData},
    snapshot::{SnapshotError, encode_png},
};

const ROTATION_STEP: f32 = 15.0;
const SPEED_STEP: f32 = 2.0;
const MAX_PARTICLES: usize = 20_000;

struct Tunnel {
    mesh: String,
    snapshots: u32,
}

impl Tunnel {
    fn handle_key(&mut self, settings: &mut Settings, key: KeyCode) -> Out {
        let wind = &mut settings.wind;
        match key {
            KeyCode::ArrowUp => wind.speed += SPEED_STEP,
            KeyCode::ArrowDown => wind.speed = (wind.speed - SPEED_STEP).max(0.0),
            KeyCode::Digit1 => wind.direction = Vector3::new(1.0, 0.0, 0.0),
            KeyCode::Digit2 => wind.direction = Vector3::new(-1.0, 0.0, 0.0),
            KeyCode::Digit3 => wind.direction = Vector3::new(0.0, 1.0, 0.0),
            KeyCode::Digit4 => wind.direction = Vector3::new(0.0, -1.0, 0.0),
            KeyCode::Digit5 => wind.direction = Vector3::new(0.0, 0.0, 1.0),
            KeyCode::Digit6 => wind.direction = Vector3::new(0.0, 0.0, -1.0),
            KeyCode::Equal => wind.particle_count = (wind.particle_count * 2).clamp(1, MAX_PARTICLES),
            KeyCode::Minus => wind.particle_count /= 2,
            KeyCode::KeyX => settings.orientation.rotate_axis(0, ROTATION_STEP),
            KeyCode::KeyY => settings.orientation.rotate_axis(1, ROTATION_STEP),
            KeyCode::KeyZ => settings.orientation.rotate_axis(2, ROTATION_STEP),
            KeyCode::KeyR => settings.orientation = Default::default(),
            KeyCode::KeyL => return Out::LoadFile(self.mesh.clone()),
            KeyCode::KeyP => return Out::Snapshot,
            _ => (),
        }
        Out::Empty
    }
}

impl TunnelFlow for Tunnel {
    fn on_init(&mut self, _: &mut Context, _: &mut Settings) -> Out {
        Out::LoadFile(self.mesh.clone())
    }

    fn on_window_events(&mut self, _: &Context, settings: &mut Settings, event: &WindowEvent) -> Out {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.handle_key(settings, *key),
            WindowEvent::DroppedFile(path) => {
                self.mesh = path.to_string_lossy().into_owned();
                Out::LoadFile(self.mesh.clone())
            }
            _ => Out::Empty,
        }
    }

    fn on_surface_loaded(
        &mut self,
        _: &Context,
        _: &mut Settings,
        result: Result<&SurfaceData, &LoadError>,
    ) -> Out {
        match result {
            Ok(surface) => log::info!(
                "showing {} ({} triangles, {:?})",
                surface.name,
                surface.triangle_count(),
                surface.extent
            ),
            Err(e) => log::warn!("keeping the previous surface: {}", e),
        }
        Out::Empty
    }

    fn on_snapshot(
        &mut self,
        _: &Context,
        _: &mut Settings,
        result: Result<RgbaImage, SnapshotError>,
    ) -> Out {
        let png = match result.and_then(|image| encode_png(&image)) {
            Ok(png) => png,
            Err(e) => {
                log::error!("snapshot failed: {}", e);
                return Out::Empty;
            }
        };
        self.snapshots += 1;
        let path = format!("snapshot-{:03}.png", self.snapshots);
        match std::fs::write(&path, png) {
            Ok(()) => log::info!("wrote {}", path),
            Err(e) => log::error!("could not write {}: {}", path, e),
        }
        Out::Empty
    }
}

fn main() {
    let mesh = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "wedge.stl".to_string());
    let tunnel = Tunnel { mesh, snapshots: 0 };
    if let Err(e) = flow_tunnel::run(tunnel) {
        eprintln!("{e:#}");
    }
}
