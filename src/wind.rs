//! Wind configuration and the per-frame values derived from it.
//!
//! [`WindField`] and [`ModelOrientation`] are plain configuration owned by the
//! application layer. [`FrameInputs`] is what the scene derives from them once
//! per frame; both the pressure shader and the streamline particles consume
//! the same `FrameInputs` so shading and flow never disagree within a frame.

use std::time::Duration;

use cgmath::{Deg, InnerSpace, Quaternion, Rotation3, Vector3};

/// Largest component below which a direction is treated as degenerate.
const DEGENERATE_COMPONENT: f32 = 1e-6;

/// Normalize a wind direction. A zero (or non-finite) vector falls back to +X.
///
/// The vector is scaled by its largest component first so that huge but
/// finite inputs do not overflow while squaring.
pub fn normalize_direction(direction: Vector3<f32>) -> Vector3<f32> {
    let finite = direction.x.is_finite() && direction.y.is_finite() && direction.z.is_finite();
    let largest = direction.x.abs().max(direction.y.abs()).max(direction.z.abs());
    if !finite || largest < DEGENERATE_COMPONENT {
        return Vector3::unit_x();
    }
    let scaled = direction / largest;
    scaled / scaled.magnitude()
}

/// User-controlled wind settings, read by the scene at the start of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindField {
    pub direction: Vector3<f32>,
    pub speed: f32,
    pub particle_count: usize,
}

impl WindField {
    pub fn new(direction: impl Into<Vector3<f32>>, speed: f32, particle_count: usize) -> Self {
        Self {
            direction: direction.into(),
            speed,
            particle_count,
        }
    }

    /// The unit direction the wind blows towards.
    pub fn unit_direction(&self) -> Vector3<f32> {
        normalize_direction(self.direction)
    }

    /// Speed clamped to be non-negative and finite.
    pub fn effective_speed(&self) -> f32 {
        if self.speed.is_finite() {
            self.speed.max(0.0)
        } else {
            0.0
        }
    }
}

impl Default for WindField {
    fn default() -> Self {
        Self {
            direction: Vector3::unit_x(),
            speed: 10.0,
            particle_count: 2000,
        }
    }
}

/// Euler rotation of the loaded surface in degrees.
///
/// Angles are applied in X, Y, Z order and only ever affect the placement
/// transform of the surface, never its vertex data.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModelOrientation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl ModelOrientation {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }.normalized()
    }

    /// All angles wrapped into `[0, 360)`.
    pub fn normalized(self) -> Self {
        let wrap = |deg: f32| {
            let wrapped = deg.rem_euclid(360.0);
            // rem_euclid may round up to exactly 360 for tiny negative inputs
            if wrapped >= 360.0 { 0.0 } else { wrapped }
        };
        Self {
            x: wrap(self.x),
            y: wrap(self.y),
            z: wrap(self.z),
        }
    }

    /// Rotate by `delta` degrees around the given axis index (0 = x, 1 = y, 2 = z).
    pub fn rotate_axis(&mut self, axis: usize, delta: f32) {
        match axis {
            0 => self.x += delta,
            1 => self.y += delta,
            2 => self.z += delta,
            _ => log::warn!("ignoring rotation around unknown axis {}", axis),
        }
        *self = self.normalized();
    }

    pub fn rotation(&self) -> Quaternion<f32> {
        Quaternion::from_angle_x(Deg(self.x))
            * Quaternion::from_angle_y(Deg(self.y))
            * Quaternion::from_angle_z(Deg(self.z))
    }
}

/// Values derived once per frame and shared by every consumer in that frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInputs {
    /// Unit wind direction in world space.
    pub direction: Vector3<f32>,
    pub speed: f32,
    /// Seconds since the scene started.
    pub time: f32,
}

impl FrameInputs {
    pub fn derive(wind: &WindField, elapsed: Duration) -> Self {
        Self {
            direction: wind.unit_direction(),
            speed: wind.effective_speed(),
            time: elapsed.as_secs_f32(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Rotation;
    use rstest::rstest;

    fn assert_close(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).magnitude() < 1e-5, "{:?} != {:?}", a, b);
    }

    #[test]
    fn zero_direction_falls_back_to_positive_x() {
        assert_eq!(normalize_direction(Vector3::new(0.0, 0.0, 0.0)), Vector3::unit_x());
        assert_eq!(
            normalize_direction(Vector3::new(f32::NAN, 0.0, 0.0)),
            Vector3::unit_x()
        );
    }

    #[rstest]
    #[case(Vector3::new(1.0, 0.0, 0.0))]
    #[case(Vector3::new(0.0, -1.0, 0.0))]
    #[case(Vector3::new(3.0, 4.0, 0.0))]
    #[case(Vector3::new(-0.2, 0.7, 5.0))]
    fn normalization_is_idempotent(#[case] direction: Vector3<f32>) {
        let once = normalize_direction(direction);
        let twice = normalize_direction(once);
        assert!((once.magnitude() - 1.0).abs() < 1e-6);
        assert_close(once, twice);
    }

    #[rstest]
    #[case(Vector3::new(0.0, 1e20, 0.0), Vector3::unit_y())]
    #[case(Vector3::new(-1e20, 0.0, 0.0), -Vector3::unit_x())]
    #[case(Vector3::new(f32::MAX, f32::MAX, 0.0), Vector3::new(1.0, 1.0, 0.0).normalize())]
    fn huge_components_keep_their_direction(
        #[case] direction: Vector3<f32>,
        #[case] expected: Vector3<f32>,
    ) {
        assert_close(normalize_direction(direction), expected);
    }

    #[test]
    fn non_finite_components_fall_back_to_positive_x() {
        assert_eq!(
            normalize_direction(Vector3::new(0.0, f32::NAN, 1.0)),
            Vector3::unit_x()
        );
        assert_eq!(
            normalize_direction(Vector3::new(0.0, 0.0, f32::INFINITY)),
            Vector3::unit_x()
        );
    }

    #[test]
    fn negative_speed_is_clamped() {
        let wind = WindField::new([1.0, 0.0, 0.0], -3.0, 10);
        assert_eq!(wind.effective_speed(), 0.0);
    }

    #[test]
    fn frame_inputs_use_unit_direction() {
        let wind = WindField::new([0.0, 0.0, 0.0], 0.0, 1);
        let frame = FrameInputs::derive(&wind, Duration::from_millis(1500));
        assert_eq!(frame.direction, Vector3::unit_x());
        assert_eq!(frame.speed, 0.0);
        assert!((frame.time - 1.5).abs() < 1e-6);
    }

    #[rstest]
    #[case(-90.0, 270.0)]
    #[case(360.0, 0.0)]
    #[case(725.0, 5.0)]
    #[case(12.5, 12.5)]
    fn orientation_angles_wrap(#[case] input: f32, #[case] expected: f32) {
        let orientation = ModelOrientation::new(input, 0.0, 0.0);
        assert!((orientation.x - expected).abs() < 1e-4);
        assert!(orientation.x >= 0.0 && orientation.x < 360.0);
    }

    #[test]
    fn half_turn_about_y_flips_a_face_normal_pointing_along_x() {
        let orientation = ModelOrientation::new(0.0, 180.0, 0.0);
        let rotated = orientation.rotation().rotate_vector(Vector3::unit_x());
        assert_close(rotated, -Vector3::unit_x());
    }
}
