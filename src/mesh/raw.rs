//! Raw node/element arrays as delivered by a mesh generator.
//!
//! Mesh generators hand back tag-ordered flat arrays: one tag per node, three
//! coordinates per node and four node tags per tetrahedron, all 1-based. This
//! module validates those arrays and converts them into 0-based form.

use nalgebra::Point3;

use crate::error::{MeshError, Result};

/// Flat node and tetrahedron arrays with 1-based node tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMesh {
    /// Node tags in storage order.
    pub node_tags: Vec<usize>,
    /// Node coordinates, `[x0, y0, z0, x1, y1, z1, ...]`.
    pub coords: Vec<f64>,
    /// Tetrahedron connectivity, four node tags per element.
    pub tetrahedra: Vec<usize>,
}

impl RawMesh {
    /// Create a raw mesh from its three flat arrays.
    pub fn new(node_tags: Vec<usize>, coords: Vec<f64>, tetrahedra: Vec<usize>) -> Self {
        Self {
            node_tags,
            coords,
            tetrahedra,
        }
    }

    /// Number of nodes described by the tag array.
    pub fn num_nodes(&self) -> usize {
        self.node_tags.len()
    }

    /// Number of complete tetrahedra in the connectivity array.
    pub fn num_tetrahedra(&self) -> usize {
        self.tetrahedra.len() / 4
    }

    /// Check every structural precondition and return the 0-based form.
    ///
    /// Node tag `i + 1` must sit at position `i`, the coordinate array must
    /// hold exactly three values per node, the connectivity array must hold
    /// whole tetrahedra, and every connectivity tag must name an existing node.
    pub fn to_indexed(&self) -> Result<(Vec<Point3<f64>>, Vec<[usize; 4]>)> {
        check_contiguous_tags(&self.node_tags)?;
        let nodes = points_from_flat(&self.coords)?;
        if nodes.len() != self.node_tags.len() {
            return Err(MeshError::LengthMismatch {
                name: "node coordinates",
                expected: self.node_tags.len(),
                got: nodes.len(),
            });
        }
        let tetrahedra = tetrahedra_from_tags(&self.tetrahedra, nodes.len())?;
        Ok((nodes, tetrahedra))
    }
}

/// Verify that `tags[i] == i + 1` for every position.
pub fn check_contiguous_tags(tags: &[usize]) -> Result<()> {
    match tags.iter().enumerate().find(|&(i, &tag)| tag != i + 1) {
        Some((position, &tag)) => Err(MeshError::TagInvariantViolation { position, tag }),
        None => Ok(()),
    }
}

/// Split a flat `[x, y, z, ...]` array into points.
pub fn points_from_flat(coords: &[f64]) -> Result<Vec<Point3<f64>>> {
    if coords.len() % 3 != 0 {
        return Err(MeshError::MalformedArray {
            name: "node coordinates",
            len: coords.len(),
            multiple: 3,
        });
    }
    Ok(coords
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}

/// Convert 1-based tetrahedron node tags into 0-based node indices.
pub fn tetrahedra_from_tags(tags: &[usize], num_nodes: usize) -> Result<Vec<[usize; 4]>> {
    if tags.len() % 4 != 0 {
        return Err(MeshError::MalformedArray {
            name: "tetrahedron connectivity",
            len: tags.len(),
            multiple: 4,
        });
    }
    if tags.is_empty() {
        return Err(MeshError::NoVolumeElements);
    }

    tags.chunks_exact(4)
        .enumerate()
        .map(|(element, chunk)| {
            let mut tet = [0usize; 4];
            for (slot, &tag) in tet.iter_mut().zip(chunk) {
                if tag == 0 || tag > num_nodes {
                    return Err(MeshError::InvalidNodeTag { element, tag });
                }
                *slot = tag - 1;
            }
            Ok(tet)
        })
        .collect()
}
