//! STL parsing, both the binary and the ASCII flavour.
//!
//! Binary files are recognised by their length (an 80 byte header, a facet
//! count and 50 bytes per facet) rather than by the header text, because
//! plenty of exporters write `solid` into binary headers too.

use crate::resources::LoadError;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Triangle soup from an STL resource, three positions per facet.
pub fn parse_stl(bytes: &[u8]) -> Result<Vec<[f32; 3]>, LoadError> {
    if is_binary(bytes) {
        return Ok(parse_binary(bytes));
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|_| LoadError::Malformed("STL is neither binary nor ASCII".to_string()))?;
    if !text.trim_start().starts_with("solid") {
        return Err(LoadError::Malformed(
            "STL is neither binary nor ASCII".to_string(),
        ));
    }
    parse_ascii(text)
}

fn facet_count(bytes: &[u8]) -> Option<usize> {
    let count = bytes.get(HEADER_LEN..HEADER_LEN + 4)?;
    Some(u32::from_le_bytes([count[0], count[1], count[2], count[3]]) as usize)
}

pub(crate) fn is_binary(bytes: &[u8]) -> bool {
    facet_count(bytes)
        .and_then(|n| n.checked_mul(FACET_LEN))
        .and_then(|n| n.checked_add(HEADER_LEN + 4))
        .is_some_and(|expected| expected == bytes.len())
}

fn read_vec3(record: &[u8]) -> [f32; 3] {
    let f = |i: usize| {
        f32::from_le_bytes([record[i], record[i + 1], record[i + 2], record[i + 3]])
    };
    [f(0), f(4), f(8)]
}

fn parse_binary(bytes: &[u8]) -> Vec<[f32; 3]> {
    bytes[HEADER_LEN + 4..]
        .chunks_exact(FACET_LEN)
        .flat_map(|facet| {
            // skip the 12 byte facet normal; it gets recomputed
            [
                read_vec3(&facet[12..24]),
                read_vec3(&facet[24..36]),
                read_vec3(&facet[36..48]),
            ]
        })
        .collect()
}

fn parse_ascii(text: &str) -> Result<Vec<[f32; 3]>, LoadError> {
    let mut positions = Vec::new();
    let mut tokens = text.split_whitespace();
    while let Some(token) = tokens.next() {
        if token != "vertex" {
            continue;
        }
        let mut vertex = [0.0; 3];
        for c in vertex.iter_mut() {
            let raw = tokens.next().ok_or_else(|| {
                LoadError::Malformed("truncated vertex in ASCII STL".to_string())
            })?;
            *c = raw.parse::<f32>().map_err(|_| {
                LoadError::Malformed(format!("invalid coordinate {:?} in ASCII STL", raw))
            })?;
        }
        positions.push(vertex);
    }
    if positions.len() % 3 != 0 {
        return Err(LoadError::Malformed(format!(
            "ASCII STL has {} vertices, not a multiple of three",
            positions.len()
        )));
    }
    Ok(positions)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TETRAHEDRON: &str = "solid tetra
  facet normal 0 0 -1
    outer loop
      vertex 0 0 0
      vertex 0 1 0
      vertex 1 0 0
    endloop
  endfacet
  facet normal 0 -1 0
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 0 1
    endloop
  endfacet
  facet normal -1 0 0
    outer loop
      vertex 0 0 0
      vertex 0 0 1
      vertex 0 1 0
    endloop
  endfacet
  facet normal 1 1 1
    outer loop
      vertex 1 0 0
      vertex 0 1 0
      vertex 0 0 1
    endloop
  endfacet
endsolid tetra
";

    pub(crate) fn binary_stl(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
        // header deliberately starts with "solid" like many exporters
        let mut bytes = b"solid exported by a binary writer".to_vec();
        bytes.resize(HEADER_LEN, 0);
        bytes.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            bytes.extend(std::iter::repeat_n(0u8, 12));
            for v in tri {
                for c in v {
                    bytes.extend_from_slice(&c.to_le_bytes());
                }
            }
            bytes.extend_from_slice(&[0, 0]);
        }
        bytes
    }

    #[test]
    fn parses_ascii_facets() {
        let positions = parse_stl(TETRAHEDRON.as_bytes()).unwrap();
        assert_eq!(positions.len(), 12);
        assert_eq!(positions[1], [0.0, 1.0, 0.0]);
        assert_eq!(positions[11], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn parses_binary_even_with_solid_header() {
        let bytes = binary_stl(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        assert!(is_binary(&bytes));
        let positions = parse_stl(&bytes).unwrap();
        assert_eq!(positions, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn rejects_truncated_binary() {
        let mut bytes = binary_stl(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        bytes.truncate(bytes.len() - 10);
        assert!(matches!(parse_stl(&bytes), Err(LoadError::Malformed(_))));
    }

    #[test]
    fn rejects_bad_ascii_coordinates() {
        let text = "solid x\nfacet normal 0 0 1\nouter loop\nvertex 0 0 zero\n";
        assert!(matches!(parse_stl(text.as_bytes()), Err(LoadError::Malformed(_))));
    }

    #[test]
    fn rejects_incomplete_ascii_triangles() {
        let text = "solid x\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nendloop\nendfacet\nendsolid x";
        assert!(matches!(parse_stl(text.as_bytes()), Err(LoadError::Malformed(_))));
    }
}
