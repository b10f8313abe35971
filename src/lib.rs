//! # Tetsnap
//!
//! Time-stepping of tetrahedral meshes with VTK unstructured-grid snapshots.
//!
//! A closed triangulated surface (STL) is turned into a tetrahedral volume
//! mesh by Gmsh. Every node then carries a static scalar field and a velocity
//! field; each step moves the nodes by `velocity * tau` and re-evaluates the
//! velocity with an oscillating law. After every step the mesh is written as
//! a `.vtu` snapshot that ParaView can play back.
//!
//! ## Features
//!
//! - **Acquisition**: Gmsh driver (feature-angle surface classification,
//!   MathEval size field) and a reader for existing `.msh` files
//! - **Simulation**: deterministic, single-threaded explicit stepping
//! - **Output**: ASCII VTU snapshots plus optional `.pvd` collections
//! - **Configuration**: TOML files with defaults for every parameter
//!
//! ## Quick Start
//!
//! ```no_run
//! use tetsnap::prelude::*;
//!
//! // Load a volume mesh that was generated earlier
//! let raw = MshFile::new("moth.msh").load().unwrap();
//! let mut mesh = CalcMesh::from_raw(&raw).unwrap();
//!
//! // Write lab/moth-0.vtu .. lab/moth-999.vtu
//! let writer = VtuWriter::new("lab", "moth");
//! writer.ensure_directory().unwrap();
//! let summary = simulate(&mut mesh, &writer, &SimulateOptions::default()).unwrap();
//! println!("final time: {}", summary.final_time);
//! ```
//!
//! ## Stepping by Hand
//!
//! ```
//! use tetsnap::prelude::*;
//!
//! let mut mesh = CalcMesh::new(
//!     &[1, 2, 3, 4],
//!     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
//!     &[1, 2, 3, 4],
//! )
//! .unwrap();
//!
//! mesh.advance(0.1);
//! assert_eq!(mesh.steps(), 1);
//! assert_eq!(mesh.scalar_field(), &[0.0, 1.0, 1.0, 0.0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod acquire;
pub mod config;
pub mod error;
pub mod io;
pub mod mesh;
pub mod sim;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use tetsnap::prelude::*;
/// ```
pub mod prelude {
    pub use crate::acquire::{Gmsh, MeshGenerator, MshFile};
    pub use crate::config::Config;
    pub use crate::error::{MeshError, Result};
    pub use crate::io::vtu::VtuWriter;
    pub use crate::io::SnapshotWriter;
    pub use crate::mesh::{CalcMesh, RawMesh, VelocityLaw};
    pub use crate::sim::{simulate, simulate_with_progress, Progress, RunSummary, SimulateOptions};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_tetrahedron_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut mesh = CalcMesh::new(
            &[1, 2, 3, 4],
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            &[1, 2, 3, 4],
        )
        .unwrap();

        let writer = VtuWriter::new(dir.path(), "tet");
        let summary = simulate(
            &mut mesh,
            &writer,
            &SimulateOptions::default().with_steps(3),
        )
        .unwrap();

        assert_eq!(summary.snapshots.len(), 3);
        for (i, ds) in summary.snapshots.iter().enumerate() {
            assert_eq!(ds.file, dir.path().join(format!("tet-{}.vtu", i)));
            assert!(ds.file.exists());
        }
        assert_eq!(mesh.steps(), 2);
    }
}
