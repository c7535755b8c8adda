//! glTF / GLB mesh import
//!
//! Reads the first triangle primitive found. Missing normals are generated
//! from the faces; missing indices become a trivial 0..n list.

use std::path::Path;

use super::MeshData;
use crate::renderer::vertex::Vertex;

/// Import the first mesh primitive of a `.gltf` or `.glb` file.
pub fn load(path: &Path) -> Result<MeshData, String> {
    let (document, buffers, _images) = ::gltf::import(path).map_err(|err| err.to_string())?;

    let primitive = document
        .meshes()
        .flat_map(|mesh| mesh.primitives())
        .find(|p| p.mode() == ::gltf::mesh::Mode::Triangles)
        .ok_or_else(|| "no triangle primitive found".to_string())?;

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| "primitive has no positions".to_string())?
        .collect();
    let normals: Vec<[f32; 3]> = match reader.read_normals() {
        Some(normals) => normals.collect(),
        None => vec![[0.0; 3]; positions.len()],
    };
    if normals.len() != positions.len() {
        return Err(format!(
            "{} normals for {} positions",
            normals.len(),
            positions.len()
        ));
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(format!("index {bad} out of range"));
    }

    let vertices = positions
        .into_iter()
        .zip(normals)
        .map(|(position, normal)| Vertex::new(position, normal))
        .collect();

    let mut mesh = MeshData { vertices, indices };
    mesh.generate_missing_normals();
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::assets::load_mesh;
    use crate::core::Error;

    const POSITIONS: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    const NORMALS: [[f32; 3]; 3] = [[0.0, 0.0, 1.0]; 3];

    /// Write a one-mesh glTF with a point primitive followed by an indexed
    /// triangle primitive. `normal_count` of `None` leaves out the normals.
    fn write_gltf(dir: &Path, normal_count: Option<usize>, indices: [u16; 3]) -> PathBuf {
        let mut bin = Vec::new();
        bin.extend_from_slice(bytemuck::cast_slice(&POSITIONS));
        bin.extend_from_slice(bytemuck::cast_slice(&NORMALS));
        bin.extend_from_slice(bytemuck::cast_slice(&indices));
        fs::write(dir.join("mesh.bin"), &bin).unwrap();

        let normal_attribute = if normal_count.is_some() { ", \"NORMAL\": 1" } else { "" };
        let json = format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "buffers": [{{ "uri": "mesh.bin", "byteLength": {len} }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 72, "byteLength": 6 }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
       "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5126, "count": {normals}, "type": "VEC3" }},
    {{ "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ],
  "meshes": [{{ "primitives": [
    {{ "attributes": {{ "POSITION": 0 }}, "mode": 0 }},
    {{ "attributes": {{ "POSITION": 0{normal_attribute} }}, "indices": 2 }}
  ] }}]
}}"#,
            len = bin.len(),
            normals = normal_count.unwrap_or(3),
        );

        let path = dir.join("mesh.gltf");
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_reads_first_triangle_primitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gltf(dir.path(), Some(3), [2, 1, 0]);

        let mesh = load(&path).unwrap();
        assert_eq!(mesh.indices, vec![2, 1, 0]);
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_missing_normals_are_generated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gltf(dir.path(), None, [0, 1, 2]);

        let mesh = load_mesh(&path).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_index_out_of_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gltf(dir.path(), Some(3), [0, 1, 5]);

        let err = load(&path).unwrap_err();
        assert!(err.contains("index 5 out of range"));
    }

    #[test]
    fn test_normal_count_mismatch_is_asset_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gltf(dir.path(), Some(2), [0, 1, 2]);

        let err = load_mesh(&path).unwrap_err();
        assert!(matches!(err, Error::Asset { .. }));
        assert!(err.to_string().contains("2 normals for 3 positions"));
    }
}
