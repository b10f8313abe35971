//! Volume meshing through the external `gmsh` executable.
//!
//! The surface is classified into patches by feature angle, a geometry is
//! rebuilt on top of the patches, the enclosed volume is closed with a
//! surface loop and meshed with tetrahedra under a MathEval background size
//! field. All of that runs inside Gmsh from a generated `.geo` script; the
//! resulting `.msh` file is read back with [`crate::io::msh`].

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{MeshGenerator, MshFile};
use crate::config::AcquisitionConfig;
use crate::error::{MeshError, Result};
use crate::io::stl;
use crate::mesh::RawMesh;

/// Gmsh-backed [`MeshGenerator`].
#[derive(Debug, Clone)]
pub struct Gmsh {
    config: AcquisitionConfig,
    output: Option<PathBuf>,
}

impl Gmsh {
    /// Create a driver with the given classification and sizing parameters.
    pub fn new(config: AcquisitionConfig) -> Self {
        Self {
            config,
            output: None,
        }
    }

    /// Write the volume mesh to `path` instead of next to the surface.
    pub fn with_output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Path of the `.msh` file produced for `surface`.
    pub fn output_for(&self, surface: &Path) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| surface.with_extension("msh"))
    }

    /// Mesh `surface` into `output` and load the result.
    ///
    /// The `.geo` script is written next to `output` and kept for inspection.
    pub fn remesh(&self, surface: &Path, output: &Path) -> Result<RawMesh> {
        let summary = stl::inspect(surface)?;
        log::info!(
            "surface {}: {} triangles, {} vertices",
            surface.display(),
            summary.triangles,
            summary.vertices
        );
        if !summary.closed {
            log::warn!(
                "surface {} is not watertight, volume meshing may fail",
                surface.display()
            );
        }

        let surface = surface.canonicalize().map_err(|e| {
            MeshError::acquisition(format!("could not load STL mesh {}: {}", surface.display(), e))
        })?;
        let script_path = output.with_extension("geo");
        fs::write(&script_path, geo_script(&surface, &self.config))?;
        log::debug!("wrote {}", script_path.display());

        log::info!("meshing volume with {}", self.config.gmsh_executable.display());
        let result = Command::new(&self.config.gmsh_executable)
            .arg(&script_path)
            .arg("-3")
            .args(["-format", "msh41"])
            .arg("-o")
            .arg(output)
            .output()
            .map_err(|e| {
                MeshError::acquisition(format!(
                    "failed to run {}: {}",
                    self.config.gmsh_executable.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let stdout = String::from_utf8_lossy(&result.stdout);
            let detail = last_lines(if stderr.trim().is_empty() { &stdout } else { &stderr }, 5);
            return Err(MeshError::acquisition(format!(
                "gmsh exited with {}: {}",
                result.status, detail
            )));
        }

        MshFile::new(output).load()
    }

    /// Open `mesh` in the Gmsh GUI and block until the window is closed.
    pub fn show(&self, mesh: &Path) -> Result<()> {
        log::info!("opening {} in the gmsh viewer", mesh.display());
        let status = Command::new(&self.config.gmsh_executable)
            .arg(mesh)
            .status()
            .map_err(|e| {
                MeshError::acquisition(format!(
                    "failed to run {}: {}",
                    self.config.gmsh_executable.display(),
                    e
                ))
            })?;
        if !status.success() {
            log::warn!("gmsh viewer exited with {}", status);
        }
        Ok(())
    }
}

impl MeshGenerator for Gmsh {
    fn generate(&self, surface: &Path) -> Result<RawMesh> {
        let output = self.output_for(surface);
        self.remesh(surface, &output)
    }
}

/// Gmsh `.geo` script that remeshes `surface` into a tetrahedral volume.
pub fn geo_script(surface: &Path, config: &AcquisitionConfig) -> String {
    let mut s = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(s, "// Generated by tetsnap");
    let _ = writeln!(s, "Merge \"{}\";", geo_string(&surface.to_string_lossy()));
    let _ = writeln!(
        s,
        "ClassifySurfaces{{{} * Pi / 180, {}, {}, {} * Pi / 180}};",
        config.angle_deg,
        u8::from(config.include_boundary),
        u8::from(config.force_parametrizable_patches),
        config.curve_angle_deg
    );
    let _ = writeln!(s, "CreateGeometry;");
    let _ = writeln!(s, "Surface Loop(1) = Surface{{:}};");
    let _ = writeln!(s, "Volume(1) = {{1}};");
    let _ = writeln!(s, "Field[1] = MathEval;");
    let _ = writeln!(s, "Field[1].F = \"{}\";", geo_string(&config.size_field));
    let _ = writeln!(s, "Background Field = 1;");
    let _ = writeln!(s, "Mesh.MshFileVersion = 4.1;");
    s
}

/// Escape a value for a double-quoted `.geo` string literal.
fn geo_string(value: &str) -> String {
    value.replace('\\', "/").replace('"', "\\\"")
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_script_reproduces_pipeline() {
        let script = geo_script(Path::new("/data/moth.stl"), &AcquisitionConfig::default());
        let lines: Vec<&str> = script.lines().collect();

        assert!(lines.contains(&"Merge \"/data/moth.stl\";"));
        assert!(lines.contains(&"ClassifySurfaces{30 * Pi / 180, 1, 0, 180 * Pi / 180};"));
        assert!(lines.contains(&"CreateGeometry;"));
        assert!(lines.contains(&"Surface Loop(1) = Surface{:};"));
        assert!(lines.contains(&"Volume(1) = {1};"));
        assert!(lines.contains(&"Field[1].F = \"100\";"));
        assert!(lines.contains(&"Background Field = 1;"));
    }

    #[test]
    fn test_geo_script_uses_config_values() {
        let config = AcquisitionConfig {
            angle_deg: 40.0,
            include_boundary: false,
            force_parametrizable_patches: true,
            curve_angle_deg: 90.0,
            size_field: "2*Sin((x+y)/5) + 3".to_string(),
            ..Default::default()
        };
        let script = geo_script(Path::new("C:\\m\\\"q\".stl"), &config);
        assert!(script.contains("ClassifySurfaces{40 * Pi / 180, 0, 1, 90 * Pi / 180};"));
        assert!(script.contains("Field[1].F = \"2*Sin((x+y)/5) + 3\";"));
        assert!(script.contains("Merge \"C:/m/\\\"q\\\".stl\";"));
    }

    #[test]
    fn test_output_defaults_next_to_surface() {
        let gmsh = Gmsh::new(AcquisitionConfig::default());
        assert_eq!(gmsh.output_for(Path::new("a/moth.stl")), PathBuf::from("a/moth.msh"));
        let gmsh = gmsh.with_output("out/vol.msh");
        assert_eq!(gmsh.output_for(Path::new("a/moth.stl")), PathBuf::from("out/vol.msh"));
    }

    #[test]
    fn test_missing_surface_fails_before_running_gmsh() {
        let gmsh = Gmsh::new(AcquisitionConfig {
            gmsh_executable: PathBuf::from("/nonexistent/gmsh"),
            ..Default::default()
        });
        let err = gmsh.generate(Path::new("/nonexistent/moth.stl")).unwrap_err();
        assert!(matches!(err, MeshError::AcquisitionFailure { .. }));
    }

    #[test]
    fn test_missing_executable_is_acquisition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let surface = dir.path().join("tri.stl");
        let tri = stl_io::Triangle {
            normal: stl_io::Normal::new([0.0, 0.0, 1.0]),
            vertices: [
                stl_io::Vertex::new([0.0, 0.0, 0.0]),
                stl_io::Vertex::new([1.0, 0.0, 0.0]),
                stl_io::Vertex::new([0.0, 1.0, 0.0]),
            ],
        };
        let mut file = fs::File::create(&surface).unwrap();
        stl_io::write_stl(&mut file, [tri].iter()).unwrap();

        let gmsh = Gmsh::new(AcquisitionConfig {
            gmsh_executable: PathBuf::from("/nonexistent/gmsh"),
            ..Default::default()
        });
        let err = gmsh.generate(&surface).unwrap_err();
        assert!(matches!(err, MeshError::AcquisitionFailure { .. }), "{:?}", err);
        // The script is written before gmsh is launched
        assert!(dir.path().join("tri.geo").exists());
    }

    #[test]
    fn test_last_lines() {
        assert_eq!(last_lines("a\n\nb\nc\n", 2), "b | c");
        assert_eq!(last_lines("", 3), "");
    }
}
