//! Mesh acquisition.
//!
//! Turning a triangulated surface into a tetrahedral volume mesh is delegated
//! to an external meshing kernel. A [`MeshGenerator`] wraps such a kernel
//! behind the contract `surface file -> RawMesh`; [`Gmsh`] drives the `gmsh`
//! executable and [`MshFile`] replays a mesh that was generated earlier.
//!
//! # Example
//!
//! ```no_run
//! use tetsnap::acquire::{Gmsh, MeshGenerator};
//! use tetsnap::config::AcquisitionConfig;
//! use tetsnap::mesh::CalcMesh;
//!
//! let gmsh = Gmsh::new(AcquisitionConfig::default());
//! let raw = gmsh.generate("moth.stl".as_ref()).unwrap();
//! let mesh = CalcMesh::from_raw(&raw).unwrap();
//! ```

mod gmsh;

pub use gmsh::{geo_script, Gmsh};

use std::path::{Path, PathBuf};

use crate::error::{MeshError, Result};
use crate::io::msh;
use crate::mesh::RawMesh;

/// Produces a tetrahedral volume mesh from a closed triangulated surface.
pub trait MeshGenerator {
    /// Mesh the volume enclosed by `surface`.
    ///
    /// Implementations fail with [`MeshError::AcquisitionFailure`] when the
    /// surface cannot be loaded or meshed, and with
    /// [`MeshError::NoVolumeElements`] when meshing yields no tetrahedra.
    fn generate(&self, surface: &Path) -> Result<RawMesh>;
}

/// A generator that ignores the surface and loads a pre-generated `.msh` file.
#[derive(Debug, Clone)]
pub struct MshFile {
    path: PathBuf,
}

impl MshFile {
    /// Use the mesh stored at `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Load the stored mesh.
    pub fn load(&self) -> Result<RawMesh> {
        let raw = msh::load(&self.path).map_err(|e| match e {
            MeshError::Io(err) => MeshError::LoadError {
                path: self.path.clone(),
                message: err.to_string(),
            },
            other => other,
        })?;
        check_volume(&raw)?;
        log::info!(
            "loaded {}: {} nodes, {} tetrahedra",
            self.path.display(),
            raw.num_nodes(),
            raw.num_tetrahedra()
        );
        Ok(raw)
    }
}

impl MeshGenerator for MshFile {
    fn generate(&self, _surface: &Path) -> Result<RawMesh> {
        self.load()
    }
}

/// Fail with [`MeshError::NoVolumeElements`] if the mesh has no tetrahedra.
pub fn check_volume(raw: &RawMesh) -> Result<()> {
    if raw.tetrahedra.is_empty() {
        log::error!("can not find tetrahedron data");
        return Err(MeshError::NoVolumeElements);
    }
    Ok(())
}
