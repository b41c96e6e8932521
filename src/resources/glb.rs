use cgmath::{Matrix4, Point3, Transform};

use crate::resources::{LoadError, mesh::SurfaceData};

/**
 * Parse a self-contained glTF resource (`.glb`, or `.gltf` with embedded
 * buffers) into one surface.
 *
 * Every triangle primitive reachable from the default scene is baked into
 * world space with its node transform, then everything is merged.
 */
pub fn parse_glb(name: &str, bytes: &[u8]) -> Result<SurfaceData, LoadError> {
    let gltf = gltf::Gltf::from_slice(bytes)?;

    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.into()),
                None => {
                    return Err(LoadError::Malformed(
                        "glTF binary chunk is missing".to_string(),
                    ));
                }
            },
            gltf::buffer::Source::Uri(uri) => {
                return Err(LoadError::UnsupportedFormat(format!(
                    "external glTF buffer {:?}; use a .glb file",
                    uri
                )));
            }
        }
    }

    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(
                    &node,
                    Matrix4::from_scale(1.0),
                    &buffer_data,
                    &mut positions,
                    &mut indices,
                );
            }
        }
        // no scene graph, take the meshes as they are
        None => {
            for mesh in gltf.meshes() {
                collect_mesh(
                    &mesh,
                    Matrix4::from_scale(1.0),
                    &buffer_data,
                    &mut positions,
                    &mut indices,
                );
            }
        }
    }

    SurfaceData::from_triangles(name, &positions, &indices)
}

fn collect_node(
    node: &gltf::Node,
    parent: Matrix4<f32>,
    buffers: &[Vec<u8>],
    positions: &mut Vec<[f32; 3]>,
    indices: &mut Vec<u32>,
) {
    let transform = parent * Matrix4::from(node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, transform, buffers, positions, indices);
    }
    for child in node.children() {
        collect_node(&child, transform, buffers, positions, indices);
    }
}

fn collect_mesh(
    mesh: &gltf::Mesh,
    transform: Matrix4<f32>,
    buffers: &[Vec<u8>],
    positions: &mut Vec<[f32; 3]>,
    indices: &mut Vec<u32>,
) {
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "skipping {:?} primitive in mesh {:?}",
                primitive.mode(),
                mesh.name().unwrap_or("unnamed")
            );
            continue;
        }
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| b.as_slice()));
        let Some(read) = reader.read_positions() else {
            continue;
        };
        let base = positions.len() as u32;
        positions.extend(read.map(|p| Into::<[f32; 3]>::into(transform.transform_point(Point3::from(p)))));
        let count = positions.len() as u32 - base;
        match reader.read_indices() {
            Some(read) => indices.extend(read.into_u32().map(|i| base + i)),
            None => indices.extend(base..base + count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_gltf_bytes_are_rejected() {
        assert!(matches!(
            parse_glb("nope.glb", b"definitely not gltf"),
            Err(LoadError::Gltf(_))
        ));
    }

    #[test]
    fn embedded_triangle_is_loaded() {
        // one triangle, positions in a base64 data uri are not supported, so
        // build a .glb by hand: JSON chunk + BIN chunk
        let mut bin = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]] {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        let json = r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0]}],"nodes":[{"mesh":0,"translation":[10,0,0]}],"meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],"accessors":[{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[2,2,0]}],"bufferViews":[{"buffer":0,"byteLength":36}],"buffers":[{"byteLength":36}]}"#;
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::new();
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);

        let surface = parse_glb("tri.glb", &glb).unwrap();
        assert_eq!(surface.triangle_count(), 1);
        // the node translation does not survive recentring
        assert_eq!(surface.extent, [2.0, 2.0, 0.0]);
        assert!(surface.vertices.iter().any(|v| v.position == [-1.0, -1.0, 0.0]));
    }
}
