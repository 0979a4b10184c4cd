//! OBJ asset parsing into named sub-meshes

use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::pick::Aabb;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to read asset: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse OBJ: {0}")]
    ParseError(#[from] tobj::LoadError),
    #[error("Asset '{0}' contains no geometry")]
    NoGeometry(String),
    #[error("Failed to fetch '{url}': {message}")]
    FetchError { url: String, message: String },
    #[error("Fetching '{url}' returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
}

/// One named piece of the loaded object
#[derive(Debug, Clone, PartialEq)]
pub struct SubMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Triangle list indices into `positions`
    pub indices: Vec<u32>,
}

impl SubMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.positions)
    }
}

/// A parsed asset, ready to be registered
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedAsset {
    /// Where the asset came from (URL or path)
    pub source: String,
    pub meshes: Vec<SubMesh>,
}

impl LoadedAsset {
    /// Read and parse an OBJ file from disk
    pub fn from_file(path: &Path) -> Result<Self, AssetError> {
        let text = std::fs::read_to_string(path)?;
        parse_obj(&path.display().to_string(), &text)
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(SubMesh::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(SubMesh::triangle_count).sum()
    }

    /// Bounds of all sub-meshes together
    pub fn bounds(&self) -> Option<Aabb> {
        self.meshes
            .iter()
            .filter_map(SubMesh::bounds)
            .reduce(|a, b| a.union(&b))
    }
}

/// Parse OBJ text. Material libraries are ignored; every object or group
/// with vertices becomes a sub-mesh.
pub fn parse_obj(source: &str, text: &str) -> Result<LoadedAsset, AssetError> {
    let mut reader = Cursor::new(text.as_bytes());
    let (models, _materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )?;

    let mut meshes = Vec::with_capacity(models.len());
    for model in models {
        let mesh = model.mesh;
        if mesh.positions.len() < 3 {
            debug!(name = %model.name, "Skipping object without vertices");
            continue;
        }

        // Use normals from the file if they line up, otherwise derive them
        let normals = if mesh.normals.len() == mesh.positions.len() {
            mesh.normals
        } else {
            calculate_face_normals(&mesh.positions, &mesh.indices)
        };

        meshes.push(SubMesh {
            name: model.name,
            positions: to_vec3(&mesh.positions),
            normals: to_vec3(&normals),
            indices: mesh.indices,
        });
    }

    if meshes.is_empty() {
        return Err(AssetError::NoGeometry(source.to_string()));
    }

    let asset = LoadedAsset {
        source: source.to_string(),
        meshes,
    };

    info!(
        source = %source,
        sub_meshes = asset.meshes.len(),
        vertices = asset.vertex_count(),
        triangles = asset.triangle_count(),
        "Parsed OBJ asset"
    );

    Ok(asset)
}

fn to_vec3(flat: &[f32]) -> Vec<[f32; 3]> {
    flat.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect()
}

/// Per-vertex normals averaged from the faces each vertex belongs to.
/// Vertices that belong to no face get +Y.
pub fn calculate_face_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut sums = vec![[0.0f32; 3]; vertex_count];

    let vertex = |i: usize| [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            continue;
        }

        let (v0, v1, v2) = (vertex(i0), vertex(i1), vertex(i2));
        let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
        let face = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];

        for idx in [i0, i1, i2] {
            for axis in 0..3 {
                sums[idx][axis] += face[axis];
            }
        }
    }

    let mut normals = Vec::with_capacity(positions.len());
    for n in sums {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len > f32::EPSILON {
            normals.extend_from_slice(&[n[0] / len, n[1] / len, n[2] / len]);
        } else {
            normals.extend_from_slice(&[0.0, 1.0, 0.0]);
        }
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PARTS: &str = "\
o Frontal1_mesh003
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o Temp1_mesh001
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
f 4 5 6 7
";

    #[test]
    fn test_parse_named_sub_meshes() {
        let asset = parse_obj("test.obj", TWO_PARTS).unwrap();
        assert_eq!(asset.source, "test.obj");
        assert_eq!(asset.meshes.len(), 2);

        let frontal = &asset.meshes[0];
        assert_eq!(frontal.name, "Frontal1_mesh003");
        assert_eq!(frontal.vertex_count(), 3);
        assert_eq!(frontal.triangle_count(), 1);

        // Quad gets triangulated
        let temporal = &asset.meshes[1];
        assert_eq!(temporal.name, "Temp1_mesh001");
        assert_eq!(temporal.vertex_count(), 4);
        assert_eq!(temporal.triangle_count(), 2);
        assert_eq!(asset.vertex_count(), 7);
        assert_eq!(asset.triangle_count(), 3);
    }

    #[test]
    fn test_computed_normals() {
        let asset = parse_obj("test.obj", TWO_PARTS).unwrap();
        let frontal = &asset.meshes[0];
        assert_eq!(frontal.normals.len(), frontal.positions.len());
        for n in &frontal.normals {
            assert!((n[2] - 1.0).abs() < 1e-6, "expected +Z, got {:?}", n);
        }
    }

    #[test]
    fn test_file_normals_kept() {
        let text = "\
o stem1
v 0 0 0
v 1 0 0
v 0 1 0
vn 1 0 0
f 1//1 2//1 3//1
";
        let asset = parse_obj("n.obj", text).unwrap();
        assert_eq!(asset.meshes[0].normals, vec![[1.0, 0.0, 0.0]; 3]);
    }

    #[test]
    fn test_no_geometry() {
        let err = parse_obj("empty.obj", "# nothing here\n").unwrap_err();
        assert!(matches!(err, AssetError::NoGeometry(s) if s == "empty.obj"));
    }

    #[test]
    fn test_mtllib_ignored() {
        let text = format!("mtllib brain.mtl\n{}", TWO_PARTS);
        let asset = parse_obj("m.obj", &text).unwrap();
        assert_eq!(asset.meshes.len(), 2);
    }

    #[test]
    fn test_bounds() {
        let asset = parse_obj("test.obj", TWO_PARTS).unwrap();
        let bounds = asset.bounds().unwrap();
        assert_eq!(bounds.min, glam::Vec3::ZERO);
        assert_eq!(bounds.max, glam::Vec3::ONE);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("brain.obj");
        std::fs::write(&path, TWO_PARTS).unwrap();

        let asset = LoadedAsset::from_file(&path).unwrap();
        assert_eq!(asset.meshes.len(), 2);

        let missing = LoadedAsset::from_file(&dir.path().join("missing.obj"));
        assert!(matches!(missing, Err(AssetError::IoError(_))));
    }

    #[test]
    fn test_degenerate_triangle_normal() {
        let normals = calculate_face_normals(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0], &[0, 1, 0]);
        assert_eq!(normals, vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
    }
}
