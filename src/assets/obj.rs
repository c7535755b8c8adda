//! Wavefront OBJ reader
//!
//! Reads `v`, `vn` and `f` records. Polygons are fan-triangulated, negative
//! (relative) indices are resolved, and vertices sharing a position/normal
//! pair are deduplicated. When the file has no normals for some vertices,
//! smooth normals are generated from the faces.

use glam::Vec3;
use rustc_hash::FxHashMap;

use super::MeshData;
use crate::renderer::vertex::Vertex;

#[derive(Debug, Clone, Copy)]
struct FaceIndex {
    position: i64,
    normal: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    position: usize,
    normal: Option<usize>,
}

/// Parse OBJ text into indexed vertices.
pub fn parse(text: &str) -> Result<MeshData, String> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut triangles: Vec<[FaceIndex; 3]> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => positions.push(
                parse_vec3(parts).map_err(|e| format!("line {}: invalid vertex: {e}", line_no + 1))?,
            ),
            "vn" => normals.push(
                parse_vec3(parts).map_err(|e| format!("line {}: invalid normal: {e}", line_no + 1))?,
            ),
            "f" => {
                let polygon =
                    parse_face(parts).map_err(|e| format!("line {}: invalid face: {e}", line_no + 1))?;
                for i in 1..polygon.len() - 1 {
                    triangles.push([polygon[0], polygon[i], polygon[i + 1]]);
                }
            }
            // Texture coordinates, groups, materials and smoothing are not used.
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err("no vertices defined".to_string());
    }
    if triangles.is_empty() {
        return Err("no faces defined".to_string());
    }

    let mut mesh = build(&positions, &normals, &triangles)?;
    mesh.generate_missing_normals();
    Ok(mesh)
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3, String> {
    let mut component = || -> Result<f32, String> {
        parts
            .next()
            .ok_or_else(|| "missing component".to_string())?
            .parse::<f32>()
            .map_err(|e| e.to_string())
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<FaceIndex>, String> {
    let mut polygon = Vec::new();
    for part in parts {
        let mut fields = part.split('/');
        let position = fields
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("missing position index in `{part}`"))?
            .parse::<i64>()
            .map_err(|e| format!("`{part}`: {e}"))?;
        let _texcoord = fields.next();
        let normal = match fields.next().filter(|s| !s.is_empty()) {
            Some(s) => Some(s.parse::<i64>().map_err(|e| format!("`{part}`: {e}"))?),
            None => None,
        };
        polygon.push(FaceIndex { position, normal });
    }
    if polygon.len() < 3 {
        return Err("faces need at least 3 vertices".to_string());
    }
    Ok(polygon)
}

/// Convert a 1-based or negative OBJ index into a 0-based one.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    match index {
        i if i > 0 => {
            let zero_based = (i - 1) as usize;
            (zero_based < len).then_some(zero_based)
        }
        i if i < 0 => {
            let back = i.unsigned_abs() as usize;
            (back <= len).then(|| len - back)
        }
        _ => None,
    }
}

fn build(
    positions: &[Vec3],
    normals: &[Vec3],
    triangles: &[[FaceIndex; 3]],
) -> Result<MeshData, String> {
    let mut lookup: FxHashMap<VertexKey, u32> = FxHashMap::default();
    let mut mesh = MeshData::default();

    for corner in triangles.iter().flatten() {
        let position = resolve_index(corner.position, positions.len())
            .ok_or_else(|| format!("vertex index {} out of range", corner.position))?;
        let normal = match corner.normal {
            Some(n) => Some(
                resolve_index(n, normals.len())
                    .ok_or_else(|| format!("normal index {n} out of range"))?,
            ),
            None => None,
        };

        let key = VertexKey { position, normal };
        let next = mesh.vertices.len() as u32;
        let index = *lookup.entry(key).or_insert_with(|| {
            let n = normal.map_or(Vec3::ZERO, |i| normals[i]);
            mesh.vertices
                .push(Vertex::new(positions[position].to_array(), n.to_array()));
            next
        });
        mesh.indices.push(index);
    }

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_triangle_with_normals() {
        let mesh = parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n",
        )
        .unwrap();

        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_quad_is_fan_triangulated_and_deduplicated() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n").unwrap();

        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_negative_indices_are_relative_to_end() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").unwrap();
        assert_eq!(mesh.vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_missing_normals_are_generated() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/7 2/8 3/9\n").unwrap();
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let err = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n").unwrap_err();
        assert!(err.contains("out of range"), "{err}");
    }

    #[test]
    fn test_bad_number_reports_line() {
        let err = parse("v 0 0 0\nv 1 zero 0\n").unwrap_err();
        assert!(err.starts_with("line 2"), "{err}");
    }

    #[test]
    fn test_file_without_faces_is_rejected() {
        assert!(parse("v 0 0 0\n").is_err());
        assert!(parse("# only a comment\n").is_err());
    }
}
