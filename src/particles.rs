//! Streamline particles.
//!
//! A fixed-size arena of particles that drift along the wind inside a cube of
//! side `bounds` centred at the origin. Particles are never created or
//! destroyed while the configuration holds: once one leaves the cube it is
//! re-seated in place on the upwind face. Every particle is rendered as a
//! stretched box oriented along the wind; the transforms of the whole pool
//! go into one instance buffer per frame (see [`crate::pipelines::streamline`]).

use cgmath::{InnerSpace, Matrix3, Quaternion, Rotation, Vector3};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    config::DEFAULT_BOUNDS,
    data_structures::instance::Instance,
    wind::{FrameInputs, WindField, normalize_direction},
};

/// Half-width of the random offset applied when re-entering on the upwind face.
pub const RESPAWN_JITTER: f32 = 5.0;
/// Axis components at or below this magnitude count as "no wind on this axis".
pub const AXIS_WIND_EPSILON: f32 = 0.1;
/// `|dot(direction, up)|` above which the look-at basis degenerates.
pub const VERTICAL_ALIGNMENT: f32 = 0.99;
/// Minimum streak length in world units.
pub const MIN_STREAK_LENGTH: f32 = 2.0;
const STREAK_LENGTH_PER_SPEED: f32 = 0.8;
const STREAK_THICKNESS: f32 = 0.3;
const ADVECTION_SCALE: f32 = 5.0;
/// Largest accepted side of the bounds cube.
pub const MAX_BOUNDS: f32 = 1.0e6;

/// Clamp a requested cube side into `[0, MAX_BOUNDS]`. Non-finite sides use
/// the default volume.
pub fn sanitize_bounds(bounds: f32) -> f32 {
    if bounds.is_finite() {
        bounds.clamp(0.0, MAX_BOUNDS)
    } else {
        DEFAULT_BOUNDS
    }
}

/// One streak in the pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vector3<f32>,
    /// Multiplier on the wind speed, in `[0.5, 1.5)`.
    pub speed_offset: f32,
    /// Multiplier on the streak thickness, in `[0.5, 1.5)`.
    pub size_offset: f32,
}

impl Particle {
    fn random<R: Rng>(rng: &mut R, half: f32) -> Self {
        Self {
            position: Vector3::new(
                uniform(rng, half),
                uniform(rng, half),
                uniform(rng, half),
            ),
            speed_offset: rng.random_range(0.5..1.5),
            size_offset: rng.random_range(0.5..1.5),
        }
    }
}

fn uniform<R: Rng>(rng: &mut R, half: f32) -> f32 {
    if half > 0.0 {
        rng.random_range(-half..=half)
    } else {
        0.0
    }
}

/// Rotation that maps the canonical streak axis (+Z) onto `direction`.
///
/// Uses a look-at basis around +Y, switching to the shortest-arc rotation
/// when the direction is (nearly) vertical and the basis would degenerate.
pub fn streak_rotation(direction: Vector3<f32>) -> Quaternion<f32> {
    let forward = normalize_direction(direction);
    let up = Vector3::unit_y();
    if forward.dot(up).abs() > VERTICAL_ALIGNMENT {
        return Quaternion::between_vectors(Vector3::unit_z(), forward);
    }
    let right = up.cross(forward).normalize();
    let up = forward.cross(right);
    Quaternion::from(Matrix3::from_cols(right, up, forward))
}

/// Length of a streak for a given wind speed.
pub fn streak_length(speed: f32) -> f32 {
    (speed * STREAK_LENGTH_PER_SPEED).max(MIN_STREAK_LENGTH)
}

/// Non-uniform scale of a streak: thin cross-section, long along travel (+Z).
pub fn streak_scale(speed: f32, size_offset: f32) -> Vector3<f32> {
    let thickness = STREAK_THICKNESS * size_offset;
    Vector3::new(thickness, thickness, streak_length(speed))
}

/// The pool of streamline particles.
#[derive(Debug)]
pub struct StreamlineParticles<R = StdRng> {
    particles: Vec<Particle>,
    bounds: f32,
    rng: R,
}

impl StreamlineParticles<StdRng> {
    pub fn new(count: usize, bounds: f32) -> Self {
        Self::with_rng(count, bounds, StdRng::from_os_rng())
    }
}

impl<R: Rng> StreamlineParticles<R> {
    pub fn with_rng(count: usize, bounds: f32, rng: R) -> Self {
        let mut pool = Self {
            particles: Vec::new(),
            bounds: sanitize_bounds(bounds),
            rng,
        };
        pool.rebuild(count);
        pool
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn bounds(&self) -> f32 {
        self.bounds
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    fn rebuild(&mut self, count: usize) {
        let half = self.bounds / 2.0;
        self.particles.clear();
        self.particles.reserve_exact(count);
        for _ in 0..count {
            let particle = Particle::random(&mut self.rng, half);
            self.particles.push(particle);
        }
    }

    /// Rebuild the pool if the count or bounds differ from the current ones.
    ///
    /// Returns `true` when a rebuild happened. Prior particle state is discarded.
    pub fn reconfigure(&mut self, count: usize, bounds: f32) -> bool {
        let bounds = sanitize_bounds(bounds);
        if count == self.particles.len() && bounds == self.bounds {
            return false;
        }
        log::info!(
            "rebuilding streamline pool: {} -> {} particles, bounds {} -> {}",
            self.particles.len(),
            count,
            self.bounds,
            bounds
        );
        self.bounds = bounds;
        self.rebuild(count);
        true
    }

    /// Advect every particle for `dt` seconds using raw wind settings.
    ///
    /// Returns how many per-axis respawns happened this step.
    pub fn advance(&mut self, dt: f32, wind: &WindField) -> usize {
        self.advance_along(dt, wind.unit_direction(), wind.effective_speed())
    }

    /// Same as [`advance`](Self::advance) with the values already derived for this frame.
    pub fn advance_with(&mut self, dt: f32, frame: &FrameInputs) -> usize {
        self.advance_along(dt, frame.direction, frame.speed)
    }

    fn advance_along(&mut self, dt: f32, direction: Vector3<f32>, speed: f32) -> usize {
        let direction = normalize_direction(direction);
        let half = self.bounds / 2.0;
        let mut respawns = 0;
        for particle in self.particles.iter_mut() {
            let move_speed = speed * particle.speed_offset * dt * ADVECTION_SCALE;
            particle.position += direction * move_speed;

            for axis in 0..3 {
                if particle.position[axis].abs() <= half {
                    continue;
                }
                particle.position[axis] = if direction[axis].abs() > AXIS_WIND_EPSILON {
                    -direction[axis].signum() * half
                        + self.rng.random_range(-RESPAWN_JITTER..=RESPAWN_JITTER)
                } else {
                    uniform(&mut self.rng, half)
                };
                respawns += 1;
            }
        }
        respawns
    }

    /// Render transforms for the whole pool.
    pub fn instances<'a>(
        &'a self,
        direction: Vector3<f32>,
        speed: f32,
    ) -> impl Iterator<Item = Instance> + 'a {
        let rotation = streak_rotation(direction);
        self.particles.iter().map(move |particle| Instance {
            position: particle.position,
            rotation,
            scale: streak_scale(speed, particle.size_offset),
        })
    }
}

/// Where the streak's canonical +Z axis ends up after [`streak_rotation`].
pub fn streak_axis(rotation: Quaternion<f32>) -> Vector3<f32> {
    rotation.rotate_vector(Vector3::unit_z())
}
