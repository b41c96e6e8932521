use std::io::{BufReader, Cursor};

use crate::resources::{LoadError, mesh::SurfaceData};

/**
 * Parse a Wavefront OBJ resource into a single surface.
 *
 * All objects in the file are merged since the tunnel only ever shows one
 * body. Materials are not needed for pressure shading, so `mtllib`
 * references are skipped instead of being resolved.
 */
pub fn parse_obj(name: &str, bytes: &[u8]) -> Result<SurfaceData, LoadError> {
    let mut reader = BufReader::new(Cursor::new(bytes));
    let (models, _materials) = tobj::load_obj_buf(&mut reader, &tobj::GPU_LOAD_OPTIONS, |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })?;

    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    for model in &models {
        let base = positions.len() as u32;
        positions.extend(
            model
                .mesh
                .positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]]),
        );
        indices.extend(model.mesh.indices.iter().map(|i| base + i));
    }
    log::debug!(
        "{}: {} objects, {} vertices, {} indices",
        name,
        models.len(),
        positions.len(),
        indices.len()
    );

    SurfaceData::from_triangles(name, &positions, &indices)
}
