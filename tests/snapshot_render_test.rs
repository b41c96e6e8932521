#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
use common::test_utils::gpu::{HEIGHT, Harness, WIDTH};
#[cfg(feature = "integration-tests")]
use flow_tunnel::{
    ModelOrientation, Settings, WindField,
    cgmath::{InnerSpace, Rotation, Vector3},
};
#[cfg(feature = "integration-tests")]
use std::time::Duration;

#[cfg(feature = "integration-tests")]
fn wind_along(direction: [f32; 3]) -> Settings {
    Settings {
        wind: WindField::new(direction, 10.0, 0),
        ..Default::default()
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour_above_the_horizon() {
    let mut harness = Harness::new(wind_along([1.0, 0.0, 0.0]));
    harness.ctx.clear_colour = wgpu::Color::WHITE;
    harness.frame(Duration::ZERO);

    let image = harness.snapshot();
    assert_eq!(image.dimensions(), (WIDTH, HEIGHT));
    for x in 0..WIDTH {
        assert_eq!(*image.get_pixel(x, 0), image::Rgba([255, 255, 255, 255]));
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn surface_facing_the_wind_is_red_and_the_wake_is_blue() {
    let centre = |harness: &Harness| *harness.snapshot().get_pixel(WIDTH / 2, HEIGHT / 2);

    // wind blowing straight down hits the top of the wedge
    let mut harness = Harness::new(wind_along([0.0, -1.0, 0.0]));
    harness.load("wedge.stl");
    harness.frame(Duration::ZERO);
    let impact = centre(&harness);
    assert!(impact[0] > 200, "{:?}", impact);
    assert!(impact[2] < 30, "{:?}", impact);

    // blowing upwards puts the same face in the wake
    harness.settings = wind_along([0.0, 1.0, 0.0]);
    harness.frame(Duration::ZERO);
    let wake = centre(&harness);
    assert!(wake[2] > 150, "{:?}", wake);
    assert!(wake[0] < 30, "{:?}", wake);
}

#[test]
#[cfg(feature = "integration-tests")]
fn streaks_are_drawn_and_the_pool_follows_the_settings() {
    let mut harness = Harness::new(wind_along([1.0, 0.0, 0.0]));
    harness.frame(Duration::from_millis(16));
    let empty = harness.snapshot();

    harness.settings.wind.particle_count = 3000;
    harness.frame(Duration::from_millis(16));
    assert_eq!(harness.scene.particles().len(), 3000);
    let streaks = harness.snapshot();

    let changed = empty
        .pixels()
        .zip(streaks.pixels())
        .filter(|(a, b)| a != b)
        .count();
    assert!(changed > 100, "only {} pixels changed", changed);
}

#[test]
#[cfg(feature = "integration-tests")]
fn shader_and_particles_see_the_same_frame() {
    let mut harness = Harness::new(wind_along([0.0, 3.0, 4.0]));
    harness.frame(Duration::from_millis(250));
    harness.frame(Duration::from_millis(250));

    let frame = *harness.scene.last_frame().expect("a frame was derived");
    let uniform = harness.scene.pressure().uniform;
    assert_eq!(uniform.wind_direction(), frame.direction);
    assert_eq!(uniform.time(), frame.time);
    assert!((frame.direction - Vector3::new(0.0, 0.6, 0.8)).magnitude() < 1e-6);
    assert!((frame.time - 0.5).abs() < 1e-6);

    // a zero direction falls back to +X for both consumers alike
    harness.settings = wind_along([0.0, 0.0, 0.0]);
    harness.frame(Duration::from_millis(16));
    let frame = *harness.scene.last_frame().expect("a frame was derived");
    assert_eq!(frame.direction, Vector3::unit_x());
    assert_eq!(harness.scene.pressure().uniform.wind_direction(), frame.direction);
    assert_eq!(harness.scene.pressure().uniform.time(), frame.time);
}

#[test]
#[cfg(feature = "integration-tests")]
fn orientation_turns_the_surface_but_not_the_wind() {
    let mut harness = Harness::new(wind_along([0.0, 0.0, -1.0]));
    harness.load("wedge.stl");
    harness.frame(Duration::ZERO);
    let wind_before = harness.scene.pressure().uniform.wind_direction();

    harness.settings.orientation = ModelOrientation::new(0.0, 180.0, 0.0);
    harness.frame(Duration::ZERO);

    assert_eq!(harness.scene.pressure().uniform.wind_direction(), wind_before);
    let facing = harness
        .scene
        .surface_instance()
        .rotation
        .rotate_vector(Vector3::unit_x());
    assert!((facing + Vector3::unit_x()).magnitude() < 1e-5, "{:?}", facing);
}
