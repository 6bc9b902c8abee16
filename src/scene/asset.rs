//! Optional external 3D assets that replace a marker's procedural shape.
//!
//! Only vertex positions are read; that is enough for a viewer to draw the
//! model as a point cloud and to size it. A missing file is not an error
//! (`Ok(None)`), a file that exists but cannot be parsed is.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use nalgebra::Vector3;

use crate::registry::MarkerDescriptor;

/// Vertex data of a loaded model.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAsset {
    pub source: PathBuf,
    pub vertices: Vec<Vector3<f32>>,
    pub face_count: usize,
}

impl MeshAsset {
    /// Parse the vertex (`v`) and face (`f`) records of a Wavefront OBJ file.
    pub fn parse_obj(text: &str, source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let mut vertices = Vec::new();
        let mut face_count = 0;

        for (line_no, line) in text.lines().enumerate() {
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("v") => {
                    let mut coords = [0.0f32; 3];
                    for c in coords.iter_mut() {
                        let field = fields.next().with_context(|| {
                            format!("{}:{}: vertex needs 3 coordinates", source.display(), line_no + 1)
                        })?;
                        *c = field.parse().with_context(|| {
                            format!("{}:{}: bad coordinate '{}'", source.display(), line_no + 1, field)
                        })?;
                    }
                    vertices.push(Vector3::from(coords));
                }
                Some("f") => face_count += 1,
                _ => {}
            }
        }

        if vertices.is_empty() {
            bail!("{} contains no vertices", source.display());
        }

        Ok(Self {
            source,
            vertices,
            face_count,
        })
    }

    /// Axis-aligned bounding box size.
    pub fn extent(&self) -> Vector3<f32> {
        let mut min = Vector3::repeat(f32::INFINITY);
        let mut max = Vector3::repeat(f32::NEG_INFINITY);
        for v in &self.vertices {
            min = min.inf(v);
            max = max.sup(v);
        }
        max - min
    }
}

/// Source of per-marker model overrides.
pub trait AssetLoader {
    /// `Ok(None)` when the marker has no asset; `Err` when one exists but
    /// could not be loaded.
    fn load(&self, marker: &MarkerDescriptor) -> Result<Option<MeshAsset>>;
}

/// Every marker uses its procedural shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAssets;

impl AssetLoader for NoAssets {
    fn load(&self, _marker: &MarkerDescriptor) -> Result<Option<MeshAsset>> {
        Ok(None)
    }
}

/// Looks for `<dir>/<marker name>.obj`.
#[derive(Debug, Clone)]
pub struct ObjAssetLoader {
    dir: PathBuf,
}

impl ObjAssetLoader {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, marker: &MarkerDescriptor) -> PathBuf {
        self.dir.join(format!("{}.obj", marker.name))
    }
}

impl AssetLoader for ObjAssetLoader {
    fn load(&self, marker: &MarkerDescriptor) -> Result<Option<MeshAsset>> {
        let path = self.path_for(marker);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        MeshAsset::parse_obj(&text, path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MarkerRegistry;

    const TETRA: &str = "# tetrahedron\nv 0 0 0\nv 1 0 0\nv 0 2 0\nv 0 0 0.5\nf 1 2 3\nf 1 2 4\nf 1 3 4\nf 2 3 4\n";

    #[test]
    fn test_parse_obj() {
        let mesh = MeshAsset::parse_obj(TETRA, "tetra.obj").unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.face_count, 4);
        assert_eq!(mesh.extent(), Vector3::new(1.0, 2.0, 0.5));
    }

    #[test]
    fn test_parse_obj_errors() {
        assert!(MeshAsset::parse_obj("f 1 2 3\n", "empty.obj").is_err());
        let err = MeshAsset::parse_obj("v 0 zero 0\n", "bad.obj").unwrap_err();
        assert!(format!("{:#}", err).contains("bad.obj:1"));
        assert!(MeshAsset::parse_obj("v 1 2\n", "short.obj").is_err());
    }

    #[test]
    fn test_obj_loader_missing_and_present() {
        let dir = tempfile::tempdir().unwrap();
        let registry = MarkerRegistry::from_count(2, 0.1).unwrap();
        std::fs::write(dir.path().join("marker2.obj"), TETRA).unwrap();

        let loader = ObjAssetLoader::new(dir.path());
        assert!(loader.load(&registry.all()[0]).unwrap().is_none());
        let mesh = loader.load(&registry.all()[1]).unwrap().unwrap();
        assert_eq!(mesh.source, dir.path().join("marker2.obj"));
    }

    #[test]
    fn test_obj_loader_broken_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = MarkerRegistry::from_count(1, 0.1).unwrap();
        std::fs::write(dir.path().join("marker1.obj"), "o nothing here\n").unwrap();

        let loader = ObjAssetLoader::new(dir.path());
        assert!(loader.load(&registry.all()[0]).is_err());
    }
}
