//! Core mesh data structures.
//!
//! This module provides the tetrahedral mesh representations used across the
//! pipeline.
//!
//! # Overview
//!
//! - [`RawMesh`] is what a mesh generator hands over: node tags, flat
//!   coordinates and flat tetrahedron tags, exactly as stored by Gmsh.
//! - [`CalcMesh`] is the simulation state built from it: indexed nodes,
//!   a scalar field, a velocity field and 0-based connectivity.
//!
//! # Construction
//!
//! ```
//! use tetsnap::mesh::{CalcMesh, RawMesh};
//!
//! let raw = RawMesh::new(
//!     vec![1, 2, 3, 4],
//!     vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
//!     vec![1, 2, 3, 4],
//! );
//! let mesh = CalcMesh::from_raw(&raw).unwrap();
//! assert_eq!(mesh.num_nodes(), 4);
//! assert_eq!(mesh.num_tetrahedra(), 1);
//! ```

mod calc;
mod raw;
pub mod tet;

pub use calc::{CalcMesh, VelocityLaw, DEFAULT_FREQUENCY, SCALAR_FIELD_NAME, VELOCITY_FIELD_NAME};
pub use raw::{check_contiguous_tags, points_from_flat, tetrahedra_from_tags, RawMesh};
pub use tet::{GMSH_TETRA, VTK_TETRA};
