//! Pressure shading model.
//!
//! The visualization colours every fragment of the surface by how directly it
//! faces the wind. The GPU program in `pipelines/pressure.wgsl` is what runs
//! each frame; the functions here compute exactly the same values on the host
//! so that the colour mapping can be inspected and tested without a device.
//! Both sides must change together.

use cgmath::{InnerSpace, Vector3};

/// Above this intensity a fragment is on the impact side.
pub const IMPACT_THRESHOLD: f32 = 0.2;
/// Below this intensity a fragment is in the wake.
pub const WAKE_THRESHOLD: f32 = -0.2;

/// Reference colours for the three pressure bands (linear RGB).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PressurePalette {
    pub high: [f32; 3],
    pub mid: [f32; 3],
    pub low: [f32; 3],
}

impl Default for PressurePalette {
    fn default() -> Self {
        Self {
            high: [1.0, 0.0, 0.0],
            mid: [1.0, 1.0, 0.0],
            low: [0.0, 0.0, 1.0],
        }
    }
}

/// Hermite smoothstep with the same semantics as the WGSL builtin.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn mix(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// The subtle ripple travelling along the wind direction.
pub fn flow_effect(position: Vector3<f32>, wind: Vector3<f32>, time: f32) -> f32 {
    let flow_phase = position.dot(wind) * 0.5 - time * 10.0;
    flow_phase.sin() * 0.05
}

/// Chaotic flicker applied in the wake region.
pub fn wake_turbulence(position: Vector3<f32>, time: f32) -> f32 {
    (position.x * 5.0 + time * 10.0).sin() * (position.y * 5.0 + time * 8.0).sin() * 0.15
}

/// Raw alignment of a surface normal against the wind, in `[-1, 1]` for unit inputs.
pub fn base_intensity(normal: Vector3<f32>, wind: Vector3<f32>) -> f32 {
    normal.dot(-wind)
}

/// Intensity after the animated ripple or wake turbulence is applied.
pub fn pressure_intensity(
    normal: Vector3<f32>,
    position: Vector3<f32>,
    wind: Vector3<f32>,
    time: f32,
) -> f32 {
    let intensity = base_intensity(normal, wind);
    if intensity < WAKE_THRESHOLD {
        intensity + wake_turbulence(position, time)
    } else {
        intensity + flow_effect(position, wind, time)
    }
}

/// Map an adjusted intensity onto the palette.
///
/// `flow_effect` is the ripple value of the current fragment; the wake band
/// reuses it as its brightness pulse.
pub fn band_color(palette: &PressurePalette, intensity: f32, flow_effect: f32) -> [f32; 3] {
    if intensity > IMPACT_THRESHOLD {
        mix(
            palette.mid,
            palette.high,
            smoothstep(IMPACT_THRESHOLD, 1.0, intensity),
        )
    } else if intensity > WAKE_THRESHOLD {
        mix(
            palette.low,
            palette.mid,
            smoothstep(WAKE_THRESHOLD, IMPACT_THRESHOLD, intensity),
        )
    } else {
        let brightness = 0.6 + flow_effect;
        palette.low.map(|c| c * brightness)
    }
}

/// Full per-fragment colour, mirroring `fs_main` in `pressure.wgsl`.
pub fn pressure_color(
    palette: &PressurePalette,
    normal: Vector3<f32>,
    position: Vector3<f32>,
    wind: Vector3<f32>,
    time: f32,
) -> [f32; 3] {
    let intensity = pressure_intensity(normal, position, wind, time);
    band_color(palette, intensity, flow_effect(position, wind, time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt()
    }

    #[test]
    fn smoothstep_hits_both_edges_with_flat_ends() {
        assert_eq!(smoothstep(0.2, 1.0, 0.2), 0.0);
        assert_eq!(smoothstep(0.2, 1.0, 1.0), 1.0);
        assert_eq!(smoothstep(-0.2, 0.2, -1.0), 0.0);
        assert_eq!(smoothstep(-0.2, 0.2, 3.0), 1.0);
        let h = 1e-3;
        assert!(smoothstep(0.0, 1.0, h) < 1e-5);
        assert!(1.0 - smoothstep(0.0, 1.0, 1.0 - h) < 1e-5);
    }

    #[test]
    fn smoothstep_is_monotonic() {
        let mut last = 0.0;
        for i in 0..=100 {
            let v = smoothstep(-0.2, 0.2, -0.2 + 0.4 * i as f32 / 100.0);
            assert!(v >= last);
            last = v;
        }
    }

    #[rstest]
    #[case([1.0, 0.0, 0.0], [1.0, 0.0, 0.0])]
    #[case([-1.0, 0.0, 0.0], [1.0, 0.0, 0.0])]
    #[case([0.0, 1.0, 0.0], [0.6, 0.8, 0.0])]
    #[case([0.0, 0.0, -1.0], [0.0, 0.0, 1.0])]
    fn base_intensity_is_bounded_for_unit_vectors(#[case] n: [f32; 3], #[case] w: [f32; 3]) {
        let intensity = base_intensity(n.into(), w.into());
        assert!((-1.0..=1.0).contains(&intensity));
    }

    #[test]
    fn facing_the_wind_is_high_pressure() {
        let palette = PressurePalette::default();
        let wind = Vector3::unit_x();
        // normal faces the wind head on, ripple is at most 0.05
        let color = pressure_color(&palette, -wind, Vector3::new(0.0, 0.0, 0.0), wind, 0.0);
        assert!(distance(color, palette.high) < 0.05, "{:?}", color);
    }

    #[test]
    fn facing_away_is_dim_low_pressure() {
        let palette = PressurePalette::default();
        let wind = Vector3::unit_x();
        let color = pressure_color(&palette, wind, Vector3::new(0.0, 0.0, 0.0), wind, 0.0);
        assert_eq!(color[0], 0.0);
        assert_eq!(color[1], 0.0);
        assert!(color[2] > 0.5 && color[2] < 0.7);
    }

    #[test]
    fn bands_meet_at_the_impact_threshold() {
        let palette = PressurePalette::default();
        let below = band_color(&palette, IMPACT_THRESHOLD - 1e-4, 0.0);
        let at = band_color(&palette, IMPACT_THRESHOLD, 0.0);
        let above = band_color(&palette, IMPACT_THRESHOLD + 1e-4, 0.0);
        assert!(distance(below, palette.mid) < 1e-3);
        assert!(distance(at, palette.mid) < 1e-6);
        assert!(distance(above, palette.mid) < 1e-3);
    }

    #[test]
    fn low_band_approaches_low_colour_at_the_wake_threshold() {
        let palette = PressurePalette::default();
        let just_above = band_color(&palette, WAKE_THRESHOLD + 1e-4, 0.0);
        assert!(distance(just_above, palette.low) < 1e-3);
        // the wake branch is the intentional brightness step
        let wake = band_color(&palette, WAKE_THRESHOLD, 0.0);
        assert!(distance(wake, palette.low.map(|c| c * 0.6)) < 1e-6);
    }

    #[test]
    fn wake_brightness_reuses_flow_effect() {
        let palette = PressurePalette::default();
        let pulsed = band_color(&palette, -0.9, 0.05);
        assert!((pulsed[2] - 0.65).abs() < 1e-6);
    }

    #[test]
    fn wake_is_turbulent_over_time() {
        let wind = Vector3::unit_x();
        let position = Vector3::new(0.1, 0.3, 0.0);
        let a = pressure_intensity(wind, position, wind, 0.0);
        let b = pressure_intensity(wind, position, wind, 0.37);
        assert!((a - b).abs() > 1e-4);
        assert!(a < WAKE_THRESHOLD + 0.15 && b < WAKE_THRESHOLD + 0.15);
    }
}
