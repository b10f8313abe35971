//! Mesh and snapshot file I/O.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | Gmsh MSH | `.msh` | ✓ | ✗ | ASCII 2.2 and 4.1, tetrahedra only |
//! | STL | `.stl` | ✓ | ✗ | Surface summary before meshing |
//! | VTK XML unstructured grid | `.vtu` | ✓ | ✓ | ASCII data arrays |
//! | ParaView collection | `.pvd` | ✗ | ✓ | Time series index |
//!
//! # Snapshots
//!
//! A [`SnapshotWriter`] turns the arrays in a [`SnapshotData`] into one
//! self-contained file per step index:
//!
//! ```no_run
//! use tetsnap::io::vtu::VtuWriter;
//! use tetsnap::mesh::CalcMesh;
//!
//! let mesh = CalcMesh::new(
//!     &[1, 2, 3, 4],
//!     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
//!     &[1, 2, 3, 4],
//! )
//! .unwrap();
//!
//! let writer = VtuWriter::new("lab", "moth");
//! let path = mesh.snapshot(0, &writer).unwrap();
//! assert!(path.ends_with("moth-0.vtu"));
//! ```

pub mod msh;
pub mod pvd;
pub mod stl;
pub mod vtu;

use std::path::{Path, PathBuf};

use nalgebra::{Point3, Vector3};

use crate::error::{MeshError, Result};

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Gmsh mesh format.
    Msh,
    /// STL (stereolithography) surface.
    Stl,
    /// VTK XML unstructured grid.
    Vtu,
    /// ParaView data collection.
    Pvd,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "msh" => Some(Format::Msh),
            "stl" => Some(Format::Stl),
            "vtu" => Some(Format::Vtu),
            "pvd" => Some(Format::Pvd),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    /// Detect format from file path, failing for unknown extensions.
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<Format> {
        let path = path.as_ref();
        Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("(none)")
                .to_string(),
        })
    }
}

/// Borrowed view of everything a snapshot file contains.
///
/// Points, scalars and vectors are parallel arrays; tetrahedra index into
/// `points`.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotData<'a> {
    /// Point coordinates.
    pub points: &'a [Point3<f64>],
    /// Name of the scalar point attribute.
    pub scalar_name: &'a str,
    /// One scalar per point.
    pub scalars: &'a [f64],
    /// Name of the vector point attribute.
    pub vector_name: &'a str,
    /// One vector per point.
    pub vectors: &'a [Vector3<f64>],
    /// Tetrahedra as 0-based point indices.
    pub tetrahedra: &'a [[usize; 4]],
    /// Simulated time of the state.
    pub time: f64,
}

impl SnapshotData<'_> {
    /// Check that the attribute arrays line up with the points.
    pub fn validate(&self) -> Result<()> {
        let n = self.points.len();
        if self.scalars.len() != n {
            return Err(MeshError::LengthMismatch {
                name: "scalar attribute",
                expected: n,
                got: self.scalars.len(),
            });
        }
        if self.vectors.len() != n {
            return Err(MeshError::LengthMismatch {
                name: "vector attribute",
                expected: n,
                got: self.vectors.len(),
            });
        }
        Ok(())
    }
}

/// Serialises mesh state into one file per step index.
pub trait SnapshotWriter {
    /// Path the snapshot with the given index is written to.
    fn path_for(&self, index: usize) -> PathBuf;

    /// Write snapshot `index` and return its path.
    fn write_snapshot(&self, index: usize, data: &SnapshotData<'_>) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("moth.msh"), Some(Format::Msh));
        assert_eq!(Format::from_path("MOTH.STL"), Some(Format::Stl));
        assert_eq!(Format::from_path("lab/moth-3.vtu"), Some(Format::Vtu));
        assert_eq!(Format::from_path("lab/moth.pvd"), Some(Format::Pvd));
        assert_eq!(Format::from_path("moth.obj"), None);
        assert!(matches!(
            Format::detect("noext"),
            Err(MeshError::UnsupportedFormat { extension }) if extension == "(none)"
        ));
    }

    #[test]
    fn test_snapshot_data_validation() {
        let points = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let vectors = [Vector3::zeros(); 2];
        let data = SnapshotData {
            points: &points,
            scalar_name: "smth",
            scalars: &[0.0],
            vector_name: "vel",
            vectors: &vectors,
            tetrahedra: &[],
            time: 0.0,
        };
        assert!(matches!(
            data.validate(),
            Err(MeshError::LengthMismatch { expected: 2, got: 1, .. })
        ));
    }
}
