//! Time-stepping driver.
//!
//! The driver writes snapshot 0 from the initial state, then alternates
//! [`CalcMesh::advance`] and [`CalcMesh::snapshot`] so that snapshot `i`
//! always reflects exactly `i` steps. Everything runs on the calling thread;
//! the first failed write ends the run.
//!
//! # Example
//!
//! ```no_run
//! use tetsnap::io::vtu::VtuWriter;
//! use tetsnap::mesh::CalcMesh;
//! use tetsnap::sim::{simulate, SimulateOptions};
//!
//! let mut mesh = CalcMesh::new(
//!     &[1, 2, 3, 4],
//!     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
//!     &[1, 2, 3, 4],
//! )
//! .unwrap();
//!
//! let writer = VtuWriter::new("lab", "moth");
//! writer.ensure_directory().unwrap();
//! let summary = simulate(&mut mesh, &writer, &SimulateOptions::default()).unwrap();
//! assert_eq!(summary.snapshots.len(), 1000);
//! ```

mod progress;

pub use progress::{Progress, StepReport};

use std::path::PathBuf;

use crate::config::SimulationConfig;
use crate::error::{MeshError, Result};
use crate::io::pvd::DataSet;
use crate::io::SnapshotWriter;
use crate::mesh::CalcMesh;

/// Options for a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateOptions {
    /// Step size passed to every move.
    pub tau: f64,

    /// Number of snapshots, including the initial state.
    /// The mesh is advanced `steps - 1` times.
    pub steps: usize,
}

impl Default for SimulateOptions {
    fn default() -> Self {
        Self {
            tau: 0.1,
            steps: 1000,
        }
    }
}

impl SimulateOptions {
    /// Set the step size.
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    /// Set the number of snapshots.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.tau.is_finite() || self.tau <= 0.0 {
            return Err(MeshError::invalid_param("tau", self.tau, "must be finite and positive"));
        }
        if self.steps == 0 {
            return Err(MeshError::invalid_param("steps", self.steps, "must be at least 1"));
        }
        Ok(())
    }
}

impl From<&SimulationConfig> for SimulateOptions {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            tau: config.tau,
            steps: config.steps,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Written snapshots in index order, with their simulated time.
    pub snapshots: Vec<DataSet>,
    /// Simulated time after the last step.
    pub final_time: f64,
}

impl RunSummary {
    /// Paths of all written snapshots.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.snapshots.iter().map(|ds| &ds.file)
    }
}

/// Run the snapshot loop without progress reporting.
///
/// See [`simulate_with_progress`].
pub fn simulate<W: SnapshotWriter + ?Sized>(
    mesh: &mut CalcMesh,
    writer: &W,
    options: &SimulateOptions,
) -> Result<RunSummary> {
    simulate_with_progress(mesh, writer, options, &Progress::none())
}

/// Run the snapshot loop, reporting after every snapshot.
///
/// Writes snapshot 0 for the current state, then for `i in 1..steps`
/// advances the mesh by `tau` and writes snapshot `i`.
///
/// # Errors
///
/// Returns [`MeshError::InvalidParameter`] for a non-positive or non-finite
/// `tau` or zero `steps`, and the writer's error for the first snapshot that
/// fails to write. Snapshots written before the failure are left in place.
pub fn simulate_with_progress<W: SnapshotWriter + ?Sized>(
    mesh: &mut CalcMesh,
    writer: &W,
    options: &SimulateOptions,
    progress: &Progress,
) -> Result<RunSummary> {
    options.validate()?;
    log::info!(
        "simulating {} nodes, {} tetrahedra: {} snapshots, tau={}, {:?}",
        mesh.num_nodes(),
        mesh.num_tetrahedra(),
        options.steps,
        options.tau,
        mesh.velocity_law()
    );

    let mut summary = RunSummary {
        snapshots: Vec::with_capacity(options.steps),
        final_time: mesh.elapsed(),
    };

    for index in 0..options.steps {
        if index > 0 {
            mesh.advance(options.tau);
        }
        let path = mesh.snapshot(index, writer)?;
        progress.report(&StepReport {
            index,
            total: options.steps,
            time: mesh.elapsed(),
            path: &path,
        });
        summary.snapshots.push(DataSet {
            time: mesh.elapsed(),
            file: path,
        });
    }

    summary.final_time = mesh.elapsed();
    log::info!(
        "wrote {} snapshots, final time {}",
        summary.snapshots.len(),
        summary.final_time
    );
    Ok(summary)
}
