use std::collections::HashMap;

use cgmath::{InnerSpace, Vector3, Zero};

use crate::{data_structures::model::MeshVertex, resources::LoadError};

/// Faces whose normals differ by more than this share no vertex normal.
pub const CREASE_ANGLE_DEG: f32 = 45.0;

/**
 * A triangulated surface ready for upload: model-space positions centred on
 * the bounding-box centre and per-vertex normals derived from the triangle
 * winding, smooth across gentle curvature and split along sharp creases.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceData {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    /// Size of the bounding box along each axis.
    pub extent: [f32; 3],
}

impl SurfaceData {
    /**
     * Build a surface from indexed triangles.
     *
     * Positions that are bit-identical are welded so that separately stored
     * facets (as in STL) still share normals where the surface is smooth.
     * Corners on either side of an edge sharper than [`CREASE_ANGLE_DEG`]
     * keep separate vertices. Input normals are ignored; they are always
     * recomputed from the winding.
     */
    pub fn from_triangles(
        name: &str,
        positions: &[[f32; 3]],
        indices: &[u32],
    ) -> Result<Self, LoadError> {
        if indices.len() % 3 != 0 {
            return Err(LoadError::Malformed(format!(
                "{} indices do not form whole triangles",
                indices.len()
            )));
        }
        if indices.is_empty() {
            return Err(LoadError::Empty);
        }
        if positions.iter().flatten().any(|c| !c.is_finite()) {
            return Err(LoadError::NonFinite);
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(LoadError::Malformed(format!(
                "index {} out of range for {} vertices",
                bad,
                positions.len()
            )));
        }

        let (welded, remap) = weld(positions);
        let indices: Vec<u32> = indices.iter().map(|&i| remap[i as usize]).collect();

        let (min, max) = bounding_box(&welded);
        let center = (min + max) * 0.5;
        let extent = max - min;

        let centred: Vec<Vector3<f32>> = welded.iter().map(|p| *p - center).collect();
        let (vertices, indices) = split_creases(&centred, &indices);

        Ok(Self {
            name: name.to_string(),
            vertices,
            indices,
            extent: extent.into(),
        })
    }

    /// Build a surface from unindexed triangle soup (three positions per triangle).
    pub fn from_soup(name: &str, positions: &[[f32; 3]]) -> Result<Self, LoadError> {
        let indices: Vec<u32> = (0..positions.len() as u32).collect();
        Self::from_triangles(name, positions, &indices)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

fn weld(positions: &[[f32; 3]]) -> (Vec<Vector3<f32>>, Vec<u32>) {
    let mut lookup: HashMap<[u32; 3], u32> = HashMap::with_capacity(positions.len());
    let mut welded = Vec::new();
    let remap = positions
        .iter()
        .map(|p| {
            // -0.0 and 0.0 are the same point
            let key = p.map(|c| if c == 0.0 { 0 } else { c.to_bits() });
            *lookup.entry(key).or_insert_with(|| {
                welded.push(Vector3::from(*p));
                (welded.len() - 1) as u32
            })
        })
        .collect();
    (welded, remap)
}

fn bounding_box(points: &[Vector3<f32>]) -> (Vector3<f32>, Vector3<f32>) {
    let mut min = Vector3::new(f32::MAX, f32::MAX, f32::MAX);
    let mut max = Vector3::new(f32::MIN, f32::MIN, f32::MIN);
    for p in points {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    (min, max)
}

fn unit_or_up(n: Vector3<f32>) -> Vector3<f32> {
    let len2 = n.magnitude2();
    if len2 > f32::MIN_POSITIVE && len2.is_finite() {
        n / len2.sqrt()
    } else {
        Vector3::unit_y()
    }
}

/**
 * Area-weighted corner normals with crease splitting.
 *
 * Each corner accumulates the unnormalized cross products of the triangles
 * around its position whose facing lies within the crease angle of its own
 * triangle. Corners with the same position and the same resulting normal
 * become one vertex. Degenerate triangles take every neighbour into
 * account; corners with no usable neighbour get +Y.
 */
fn split_creases(positions: &[Vector3<f32>], indices: &[u32]) -> (Vec<MeshVertex>, Vec<u32>) {
    let crease_cos = CREASE_ANGLE_DEG.to_radians().cos();
    let faces: Vec<Vector3<f32>> = indices
        .chunks(3)
        .map(|c| {
            let p0 = positions[c[0] as usize];
            (positions[c[1] as usize] - p0).cross(positions[c[2] as usize] - p0)
        })
        .collect();
    let facing: Vec<Option<Vector3<f32>>> = faces
        .iter()
        .map(|f| {
            let len2 = f.magnitude2();
            (len2 > f32::MIN_POSITIVE && len2.is_finite()).then(|| *f / len2.sqrt())
        })
        .collect();

    let mut around: Vec<Vec<usize>> = vec![Vec::new(); positions.len()];
    for (t, c) in indices.chunks(3).enumerate() {
        for &i in c {
            around[i as usize].push(t);
        }
    }

    let mut lookup: HashMap<(u32, [u32; 3]), u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut out = Vec::with_capacity(indices.len());
    for (t, c) in indices.chunks(3).enumerate() {
        for &i in c {
            let sum = around[i as usize]
                .iter()
                .filter(|&&other| match (facing[t], facing[other]) {
                    (Some(own), Some(theirs)) => own.dot(theirs) >= crease_cos,
                    _ => true,
                })
                .fold(Vector3::zero(), |acc, &other| acc + faces[other]);
            let normal = unit_or_up(sum);
            let key = (i, Into::<[f32; 3]>::into(normal).map(f32::to_bits));
            let index = *lookup.entry(key).or_insert_with(|| {
                vertices.push(MeshVertex {
                    position: positions[i as usize].into(),
                    normal: normal.into(),
                });
                (vertices.len() - 1) as u32
            });
            out.push(index);
        }
    }
    (vertices, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // A unit square in the z = 5 plane, offset from the origin, as two facets
    // stored separately like STL does.
    fn offset_square() -> Vec<[f32; 3]> {
        vec![
            [10.0, 20.0, 5.0],
            [12.0, 20.0, 5.0],
            [12.0, 22.0, 5.0],
            [10.0, 20.0, 5.0],
            [12.0, 22.0, 5.0],
            [10.0, 22.0, 5.0],
        ]
    }

    #[test]
    fn surface_is_recentred_on_its_bounding_box() {
        let surface = SurfaceData::from_soup("square", &offset_square()).unwrap();
        assert_eq!(surface.extent, [2.0, 2.0, 0.0]);
        let (min, max) = bounding_box(
            &surface
                .vertices
                .iter()
                .map(|v| Vector3::from(v.position))
                .collect::<Vec<_>>(),
        );
        assert_eq!((min + max) * 0.5, Vector3::zero());
    }

    #[test]
    fn shared_corners_are_welded() {
        let surface = SurfaceData::from_soup("square", &offset_square()).unwrap();
        assert_eq!(surface.vertices.len(), 4);
        assert_eq!(surface.triangle_count(), 2);
    }

    #[test]
    fn normals_follow_counter_clockwise_winding() {
        let surface = SurfaceData::from_soup("square", &offset_square()).unwrap();
        for v in &surface.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    // Two triangles sharing the edge x = 0, the second lifted by `angle_deg`.
    fn hinge(angle_deg: f32) -> Vec<[f32; 3]> {
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        vec![
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [cos, 0.0, sin],
            [0.0, 1.0, 0.0],
        ]
    }

    #[test]
    fn gentle_folds_share_smoothed_normals() {
        let surface = SurfaceData::from_soup("hinge", &hinge(10.0)).unwrap();
        assert_eq!(surface.vertices.len(), 4);
        // the corners on the shared edge lean halfway between the two faces
        let tilt = -10f32.to_radians().sin();
        let blended = surface
            .vertices
            .iter()
            .filter(|v| v.normal[0] < -1e-3 && v.normal[0] > tilt + 1e-3)
            .count();
        assert_eq!(blended, 2);
    }

    #[test]
    fn sharp_creases_keep_separate_normals() {
        let surface = SurfaceData::from_soup("hinge", &hinge(90.0)).unwrap();
        assert_eq!(surface.vertices.len(), 6);
        for tri in surface.indices.chunks(3) {
            let first = surface.vertices[tri[0] as usize].normal;
            assert!(tri.iter().all(|&i| surface.vertices[i as usize].normal == first));
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(SurfaceData::from_soup("none", &[]), Err(LoadError::Empty)));
    }

    #[test]
    fn non_finite_positions_are_rejected() {
        let mut soup = offset_square();
        soup[2][1] = f32::INFINITY;
        assert!(matches!(
            SurfaceData::from_soup("bad", &soup),
            Err(LoadError::NonFinite)
        ));
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let positions = [[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        assert!(matches!(
            SurfaceData::from_triangles("bad", &positions, &[0, 1, 3]),
            Err(LoadError::Malformed(_))
        ));
    }

    #[test]
    fn degenerate_triangles_get_a_fallback_normal() {
        let positions = [[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let surface = SurfaceData::from_triangles("line", &positions, &[0, 1, 2]).unwrap();
        for v in &surface.vertices {
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        }
    }
}
