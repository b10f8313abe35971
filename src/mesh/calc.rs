//! The simulation mesh.
//!
//! [`CalcMesh`] owns node positions, a static scalar field, a velocity field
//! and tetrahedral connectivity. Nodes move under a closed-form oscillating
//! velocity law; there is no coupling between nodes or elements.

use std::path::PathBuf;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::raw::RawMesh;
use super::tet;
use crate::error::{MeshError, Result};
use crate::io::{SnapshotData, SnapshotWriter};

/// Name of the scalar point attribute written to snapshots.
pub const SCALAR_FIELD_NAME: &str = "smth";

/// Name of the vector point attribute written to snapshots.
pub const VELOCITY_FIELD_NAME: &str = "vel";

/// Angular frequency of the default velocity law.
pub const DEFAULT_FREQUENCY: f64 = 67.0;

/// How the velocity field is re-evaluated after each step.
///
/// Both laws scale the initial velocity by a cosine; they differ in the time
/// argument fed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VelocityLaw {
    /// `v = v0 * cos(ω * tau)` using only the step size of the latest move.
    ///
    /// With a constant step every move produces the same velocity field.
    #[default]
    LatestTau,
    /// `v = v0 * cos(ω * t)` with `t` the accumulated simulated time.
    ElapsedTime,
}

/// Tetrahedral mesh with per-node fields, advanced by explicit steps.
///
/// # Example
///
/// ```
/// use tetsnap::mesh::CalcMesh;
///
/// let mesh = CalcMesh::new(
///     &[1, 2, 3, 4],
///     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
///     &[1, 2, 3, 4],
/// )
/// .unwrap();
///
/// assert_eq!(mesh.scalar_field(), &[0.0, 1.0, 1.0, 0.0]);
/// assert_eq!(mesh.tetrahedra(), &[[0, 1, 2, 3]]);
/// ```
#[derive(Debug, Clone)]
pub struct CalcMesh {
    nodes: Vec<Point3<f64>>,
    scalar_field: Vec<f64>,
    velocity: Vec<Vector3<f64>>,
    initial_velocity: Vec<Vector3<f64>>,
    tetrahedra: Vec<[usize; 4]>,
    law: VelocityLaw,
    frequency: f64,
    elapsed: f64,
    steps: usize,
}

impl CalcMesh {
    /// Build a mesh from generator output.
    ///
    /// # Arguments
    /// * `node_tags` - Node tags in storage order; tag `i + 1` must be at position `i`
    /// * `coords` - Flat coordinates, three per node
    /// * `tetrahedra` - Flat connectivity, four 1-based node tags per element
    ///
    /// # Errors
    /// Fails with [`MeshError::TagInvariantViolation`] for non-contiguous tags,
    /// [`MeshError::MalformedArray`] for arrays that don't split into whole
    /// tuples, [`MeshError::InvalidNodeTag`] for dangling connectivity and
    /// [`MeshError::NoVolumeElements`] when there are no tetrahedra.
    pub fn new(node_tags: &[usize], coords: &[f64], tetrahedra: &[usize]) -> Result<Self> {
        super::raw::check_contiguous_tags(node_tags)?;
        let nodes = super::raw::points_from_flat(coords)?;
        if nodes.len() != node_tags.len() {
            return Err(MeshError::LengthMismatch {
                name: "node coordinates",
                expected: node_tags.len(),
                got: nodes.len(),
            });
        }
        let tetrahedra = super::raw::tetrahedra_from_tags(tetrahedra, nodes.len())?;
        Ok(Self::from_parts(nodes, tetrahedra))
    }

    /// Build a mesh from a [`RawMesh`].
    pub fn from_raw(raw: &RawMesh) -> Result<Self> {
        let (nodes, tetrahedra) = raw.to_indexed()?;
        Ok(Self::from_parts(nodes, tetrahedra))
    }

    /// Build a mesh from 0-based nodes and tetrahedra.
    ///
    /// # Errors
    /// Fails with [`MeshError::NoVolumeElements`] for an empty element list and
    /// [`MeshError::InvalidNodeTag`] (carrying the 1-based tag) for an index
    /// outside the node range.
    pub fn from_indexed(nodes: Vec<Point3<f64>>, tetrahedra: Vec<[usize; 4]>) -> Result<Self> {
        if tetrahedra.is_empty() {
            return Err(MeshError::NoVolumeElements);
        }
        for (element, tet) in tetrahedra.iter().enumerate() {
            if let Some(&bad) = tet.iter().find(|&&i| i >= nodes.len()) {
                return Err(MeshError::InvalidNodeTag {
                    element,
                    tag: bad + 1,
                });
            }
        }
        Ok(Self::from_parts(nodes, tetrahedra))
    }

    fn from_parts(nodes: Vec<Point3<f64>>, tetrahedra: Vec<[usize; 4]>) -> Self {
        let scalar_field = nodes.iter().map(|p| p.x * p.x + p.y * p.y).collect();
        let velocity = initial_velocity(&nodes);

        Self {
            initial_velocity: velocity.clone(),
            nodes,
            scalar_field,
            velocity,
            tetrahedra,
            law: VelocityLaw::default(),
            frequency: DEFAULT_FREQUENCY,
            elapsed: 0.0,
            steps: 0,
        }
    }

    /// Set the velocity law used by [`advance`](Self::advance).
    pub fn with_velocity_law(mut self, law: VelocityLaw) -> Self {
        self.law = law;
        self
    }

    /// Set the angular frequency of the velocity law.
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    /// Advance every node by one explicit step of size `tau`.
    ///
    /// Positions move with the *current* velocity, then the velocity field is
    /// re-evaluated from the initial one according to the [`VelocityLaw`].
    pub fn advance(&mut self, tau: f64) {
        for (p, v) in self.nodes.iter_mut().zip(&self.velocity) {
            *p += v * tau;
        }

        self.elapsed += tau;
        self.steps += 1;

        let t = match self.law {
            VelocityLaw::LatestTau => tau,
            VelocityLaw::ElapsedTime => self.elapsed,
        };
        let scale = (self.frequency * t).cos();
        for (v, v0) in self.velocity.iter_mut().zip(&self.initial_velocity) {
            *v = v0 * scale;
        }
    }

    /// Write the current state as snapshot `index` and return the file path.
    ///
    /// The mesh is not modified.
    pub fn snapshot<W: SnapshotWriter + ?Sized>(&self, index: usize, writer: &W) -> Result<PathBuf> {
        writer.write_snapshot(index, &self.snapshot_data())
    }

    /// Borrow the arrays a [`SnapshotWriter`] serialises.
    pub fn snapshot_data(&self) -> SnapshotData<'_> {
        SnapshotData {
            points: &self.nodes,
            scalar_name: SCALAR_FIELD_NAME,
            scalars: &self.scalar_field,
            vector_name: VELOCITY_FIELD_NAME,
            vectors: &self.velocity,
            tetrahedra: &self.tetrahedra,
            time: self.elapsed,
        }
    }

    /// Current node positions.
    pub fn nodes(&self) -> &[Point3<f64>] {
        &self.nodes
    }

    /// The scalar field `x² + y²` of the initial positions.
    pub fn scalar_field(&self) -> &[f64] {
        &self.scalar_field
    }

    /// Current velocity field.
    pub fn velocity(&self) -> &[Vector3<f64>] {
        &self.velocity
    }

    /// Velocity field at construction time.
    pub fn initial_velocity(&self) -> &[Vector3<f64>] {
        &self.initial_velocity
    }

    /// Tetrahedra as 0-based node indices.
    pub fn tetrahedra(&self) -> &[[usize; 4]] {
        &self.tetrahedra
    }

    /// The configured velocity law.
    pub fn velocity_law(&self) -> VelocityLaw {
        self.law
    }

    /// Sum of all step sizes passed to [`advance`](Self::advance).
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Number of completed steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of tetrahedra.
    pub fn num_tetrahedra(&self) -> usize {
        self.tetrahedra.len()
    }

    /// Bounding box of the current node positions.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        tet::bounding_box(&self.nodes)
    }

    /// Total unsigned volume of all tetrahedra at the current positions.
    pub fn total_volume(&self) -> f64 {
        self.tetrahedra
            .iter()
            .map(|&[a, b, c, d]| {
                tet::signed_volume(&self.nodes[a], &self.nodes[b], &self.nodes[c], &self.nodes[d])
                    .abs()
            })
            .sum()
    }
}

/// Element-wise cube of every coordinate, divided by the largest cubed value.
///
/// A zero maximum would divide by zero; the cubes are then returned as-is.
fn initial_velocity(nodes: &[Point3<f64>]) -> Vec<Vector3<f64>> {
    let cubed: Vec<Vector3<f64>> = nodes
        .iter()
        .map(|p| p.coords.map(|c| c * c * c))
        .collect();

    let max = cubed
        .iter()
        .flat_map(|v| v.iter().copied())
        .fold(f64::NEG_INFINITY, f64::max);

    if max == 0.0 || !max.is_finite() {
        if max == 0.0 {
            log::warn!("all cubed coordinates are <= 0, leaving initial velocity unnormalised");
        }
        return cubed;
    }

    cubed.into_iter().map(|v| v / max).collect()
}
