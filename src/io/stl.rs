//! STL (stereolithography) surface inspection.
//!
//! Surfaces are meshed by an external generator; this module only loads the
//! file to make sure it is readable and to summarise it before meshing.
//! Both binary and ASCII files are supported.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::tet;

/// Summary of a triangulated surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSummary {
    /// Number of non-degenerate triangles.
    pub triangles: usize,
    /// Number of distinct vertices.
    pub vertices: usize,
    /// Bounding box of the vertices.
    pub bounding_box: (Point3<f64>, Point3<f64>),
    /// Whether every edge is shared by exactly two triangles.
    pub closed: bool,
}

/// Load an STL file and summarise it.
///
/// Unreadable files and files without a single valid triangle fail with
/// [`MeshError::AcquisitionFailure`], since no volume can be meshed from them.
///
/// # Example
///
/// ```no_run
/// use tetsnap::io::stl;
///
/// let summary = stl::inspect("moth.stl").unwrap();
/// println!("{} triangles, closed: {}", summary.triangles, summary.closed);
/// ```
pub fn inspect<P: AsRef<Path>>(path: P) -> Result<SurfaceSummary> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| {
        MeshError::acquisition(format!("could not load STL mesh {}: {}", path.display(), e))
    })?;

    let stl = stl_io::read_stl(&mut file).map_err(|e| {
        MeshError::acquisition(format!("could not load STL mesh {}: {}", path.display(), e))
    })?;

    let vertices: Vec<Point3<f64>> = stl
        .vertices
        .iter()
        .map(|v| Point3::new(v[0] as f64, v[1] as f64, v[2] as f64))
        .collect();

    // Undirected edge -> number of incident triangles
    let mut edges: HashMap<(usize, usize), usize> = HashMap::new();
    let mut triangles = 0;

    for tri in &stl.faces {
        let [i0, i1, i2] = tri.vertices;
        // Skip degenerate triangles
        if i0 == i1 || i1 == i2 || i0 == i2 {
            continue;
        }
        triangles += 1;
        for (a, b) in [(i0, i1), (i1, i2), (i2, i0)] {
            *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }

    if triangles == 0 {
        return Err(MeshError::acquisition(format!(
            "STL file {} contains no valid triangles",
            path.display()
        )));
    }

    let bounding_box = tet::bounding_box(&vertices)
        .ok_or_else(|| MeshError::acquisition("STL file has no vertices"))?;

    Ok(SurfaceSummary {
        triangles,
        vertices: vertices.len(),
        bounding_box,
        closed: edges.values().all(|&n| n == 2),
    })
}
