//! Mesh loading
//!
//! Meshes are read once at start-up into CPU-side [`MeshData`]; the
//! renderer uploads them itself.

pub mod gltf_mesh;
pub mod obj;

use std::fs;
use std::path::Path;

use glam::Vec3;

use crate::core::{Error, Result};
use crate::renderer::vertex::Vertex;

/// Indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Number of triangles
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Give every zero-normal vertex the normalised sum of its adjacent face normals.
    pub fn generate_missing_normals(&mut self) {
        let missing = |v: &Vertex| v.normal == [0.0; 3];
        if !self.vertices.iter().any(missing) {
            return;
        }

        let mut accum = vec![Vec3::ZERO; self.vertices.len()];
        for triangle in self.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            let p = |i: usize| Vec3::from(self.vertices[i].position);
            let face = (p(b) - p(a)).cross(p(c) - p(a));
            if face.length_squared() > f32::EPSILON {
                let face = face.normalize();
                accum[a] += face;
                accum[b] += face;
                accum[c] += face;
            }
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(accum) {
            if missing(&*vertex) {
                vertex.normal = sum.normalize_or_zero().to_array();
            }
        }
    }
}

/// Load a mesh, picking the format from the file extension.
pub fn load_mesh(path: impl AsRef<Path>) -> Result<MeshData> {
    let path = path.as_ref();
    let asset_error = |message: String| Error::Asset {
        path: path.to_path_buf(),
        message,
    };

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let mesh = match extension.as_deref() {
        Some("obj") => {
            let text = fs::read_to_string(path).map_err(|err| asset_error(err.to_string()))?;
            obj::parse(&text).map_err(asset_error)?
        }
        Some("gltf" | "glb") => gltf_mesh::load(path).map_err(asset_error)?,
        _ => return Err(asset_error("unsupported mesh format".to_string())),
    };

    if mesh.indices.is_empty() {
        return Err(asset_error("mesh has no triangles".to_string()));
    }

    log::info!(
        "Loaded mesh {} ({} vertices, {} triangles)",
        path.display(),
        mesh.vertices.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}
