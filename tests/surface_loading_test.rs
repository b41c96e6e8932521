mod common;

use common::test_utils::read_asset;
use flow_tunnel::{
    loader::{Accepted, LoadCompletion, SurfaceLoader},
    resources::{LoadError, parse_surface},
};

#[test]
fn sample_wedge_is_centred_and_closed() {
    let surface = parse_surface("wedge.stl", &read_asset("wedge.stl")).unwrap();
    // every edge of the wedge is a crease, so each face keeps its own corners
    assert_eq!(surface.vertices.len(), 18);
    assert_eq!(surface.triangle_count(), 8);
    assert_eq!(surface.extent, [60.0, 8.0, 100.0]);
    for v in &surface.vertices {
        let length: f32 = v.normal.iter().map(|c| c * c).sum::<f32>().sqrt();
        assert!((length - 1.0).abs() < 1e-4, "{:?}", v);
    }
    for tri in surface.indices.chunks(3) {
        let first = surface.vertices[tri[0] as usize].normal;
        for &i in &tri[1..] {
            assert_eq!(surface.vertices[i as usize].normal, first);
        }
    }
    // the thin leading edge is shared by the upper and lower faces without blending them
    let leading: Vec<_> = surface
        .vertices
        .iter()
        .filter(|v| v.position[0] < -29.0)
        .map(|v| v.normal)
        .collect();
    assert!(leading.iter().any(|n| n[1] > 0.99));
    assert!(leading.iter().any(|n| n[1] < -0.99));
    assert!(leading.iter().all(|n| n[1].abs() > 0.99 || n[2].abs() > 0.99));
}

#[test]
fn latest_upload_wins_when_parses_finish_out_of_order() {
    let mut loader = SurfaceLoader::new();
    let first = loader.issue();
    let second = loader.issue();

    let wedge = read_asset("wedge.stl");
    let slow = {
        let bytes = wedge.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(50));
            LoadCompletion::parse(first, "first.stl".to_string(), &bytes)
        })
    };
    let fast = std::thread::spawn(move || {
        LoadCompletion::parse(second, "second.stl".to_string(), &wedge)
    });

    let fast = fast.join().unwrap();
    match loader.accept(fast) {
        Accepted::Surface(surface) => assert_eq!(surface.name, "second.stl"),
        other => panic!("expected the second surface, got {:?}", other),
    }
    assert!(matches!(loader.accept(slow.join().unwrap()), Accepted::Stale));
}

#[test]
fn a_failed_latest_load_does_not_resurrect_an_older_one() {
    let mut loader = SurfaceLoader::new();
    let good = loader.issue();
    let bad = loader.issue();

    let broken = LoadCompletion::parse(bad, "broken.obj".to_string(), b"v 0 0 0\nf 1 2 3\n");
    assert!(matches!(loader.accept(broken), Accepted::Failed(_)));

    let late = LoadCompletion::parse(good, "wedge.stl".to_string(), &read_asset("wedge.stl"));
    assert!(matches!(loader.accept(late), Accepted::Stale));
}

#[test]
fn empty_uploads_are_rejected() {
    assert!(matches!(
        parse_surface("empty.stl", b"solid empty\nendsolid empty\n"),
        Err(LoadError::Empty)
    ));
}
