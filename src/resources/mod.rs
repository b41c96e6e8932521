/**
 * This module contains all logic for turning external mesh resources into
 * surfaces: fetching the bytes, recognising the format and parsing it.
 *
 * Parsing is synchronous and side-effect free so it can run on a worker
 * thread; see `crate::loader` for how results reach the render loop.
 */
pub mod glb;
pub mod mesh;
pub mod obj;
pub mod stl;

use std::path::Path;

use thiserror::Error;

use crate::resources::mesh::SurfaceData;

/// Why a mesh resource could not be turned into a surface.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read mesh resource: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not fetch mesh resource: {0}")]
    Fetch(String),
    #[error("unsupported mesh format: {0}")]
    UnsupportedFormat(String),
    #[error("malformed mesh: {0}")]
    Malformed(String),
    #[error("mesh contains non-finite coordinates")]
    NonFinite,
    #[error("mesh contains no triangles")]
    Empty,
    #[error("invalid OBJ: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),
}

/// Mesh formats the loader understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceFormat {
    Stl,
    Obj,
    Gltf,
}

impl SurfaceFormat {
    pub fn from_extension(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "stl" => Some(Self::Stl),
            "obj" => Some(Self::Obj),
            "glb" | "gltf" => Some(Self::Gltf),
            _ => None,
        }
    }

    /// Guess the format from the first bytes of the resource.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"glTF") {
            return Some(Self::Gltf);
        }
        if stl::is_binary(bytes) {
            return Some(Self::Stl);
        }
        let head = &bytes[..bytes.len().min(512)];
        let head = String::from_utf8_lossy(head);
        let head = head.trim_start();
        if head.starts_with("solid") {
            Some(Self::Stl)
        } else if head.starts_with('{') {
            Some(Self::Gltf)
        } else if head
            .lines()
            .any(|l| l.starts_with("v ") || l.starts_with("o ") || l.starts_with("mtllib"))
        {
            Some(Self::Obj)
        } else {
            None
        }
    }

    pub fn detect(name: &str, bytes: &[u8]) -> Option<Self> {
        Self::from_extension(name).or_else(|| Self::sniff(bytes))
    }
}

/// Parse a mesh resource into a recentred surface with vertex normals.
pub fn parse_surface(name: &str, bytes: &[u8]) -> Result<SurfaceData, LoadError> {
    let format = SurfaceFormat::detect(name, bytes)
        .ok_or_else(|| LoadError::UnsupportedFormat(name.to_string()))?;
    let surface = match format {
        SurfaceFormat::Stl => SurfaceData::from_soup(name, &stl::parse_stl(bytes)?)?,
        SurfaceFormat::Obj => obj::parse_obj(name, bytes)?,
        SurfaceFormat::Gltf => glb::parse_glb(name, bytes)?,
    };
    log::debug!(
        "parsed {} as {:?}: {} vertices, {} triangles, extent {:?}",
        name,
        format,
        surface.vertices.len(),
        surface.triangle_count(),
        surface.extent
    );
    Ok(surface)
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> Result<reqwest::Url, LoadError> {
    let fetch = |what: &str| LoadError::Fetch(what.to_string());
    let window = web_sys::window().ok_or_else(|| fetch("no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| fetch("page origin unavailable"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))
        .map_err(|e| fetch(&e.to_string()))?;
    base.join(file_name).map_err(|e| fetch(&e.to_string()))
}

/// Read a resource: from the filesystem natively, relative to the page's
/// `assets/` directory on the web.
///
/// Relative native paths that do not exist are retried under `./assets/`.
pub async fn load_binary(file_name: &str) -> Result<Vec<u8>, LoadError> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        let response = reqwest::get(url)
            .await
            .map_err(|e| LoadError::Fetch(e.to_string()))?;
        response
            .bytes()
            .await
            .map_err(|e| LoadError::Fetch(e.to_string()))?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = Path::new(file_name);
        let path = if path.is_relative() && !path.exists() {
            Path::new("./").join("assets").join(file_name)
        } else {
            path.to_path_buf()
        };
        tokio::fs::read(path).await?
    };

    Ok(data)
}
