//! Run configuration.
//!
//! Reads TOML files with three sections. Every field has a default, so an
//! empty file (or no file at all) reproduces the stock moth run: 30° feature
//! angle, uniform size field of 100, 1000 snapshots with `tau = 0.1` written
//! to `lab/moth-<i>.vtu`.
//!
//! ```toml
//! [acquisition]
//! angle_deg = 30.0
//! size_field = "100"
//!
//! [simulation]
//! tau = 0.1
//! steps = 1000
//! velocity_law = "latest-tau"
//!
//! [output]
//! directory = "lab"
//! prefix = "moth"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::mesh::{VelocityLaw, DEFAULT_FREQUENCY};

/// Complete run configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Surface classification and meshing.
    pub acquisition: AcquisitionConfig,
    /// Time stepping.
    pub simulation: SimulationConfig,
    /// Snapshot output.
    pub output: OutputConfig,
}

/// Parameters handed to the surface classification and volume meshing stage.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AcquisitionConfig {
    /// Dihedral angle (degrees) above which surface patches are split.
    pub angle_deg: f64,
    /// Whether boundary edges also delimit patches.
    pub include_boundary: bool,
    /// Force patches to be parametrizable, splitting them further if needed.
    pub force_parametrizable_patches: bool,
    /// Angle (degrees) above which curves are split.
    pub curve_angle_deg: f64,
    /// MathEval expression of the background mesh size field.
    pub size_field: String,
    /// Gmsh executable name or path.
    pub gmsh_executable: PathBuf,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            angle_deg: 30.0,
            include_boundary: true,
            force_parametrizable_patches: false,
            curve_angle_deg: 180.0,
            size_field: "100".to_string(),
            gmsh_executable: PathBuf::from("gmsh"),
        }
    }
}

/// Time-stepping parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Step size passed to every move.
    pub tau: f64,
    /// Number of snapshots, including the initial state.
    pub steps: usize,
    /// How velocity is re-evaluated after each move.
    pub velocity_law: VelocityLaw,
    /// Angular frequency of the velocity law.
    pub frequency: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tau: 0.1,
            steps: 1000,
            velocity_law: VelocityLaw::LatestTau,
            frequency: DEFAULT_FREQUENCY,
        }
    }
}

/// Where snapshots go.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Output directory.
    pub directory: PathBuf,
    /// Snapshot file prefix, files are named `<prefix>-<index>.vtu`.
    pub prefix: String,
    /// Also write a `<prefix>.pvd` collection.
    pub collection: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("lab"),
            prefix: "moth".to_string(),
            collection: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| MeshError::Config {
            path: path.to_path_buf(),
            message: format!("failed to read config file: {}", e),
        })?;
        Self::from_toml(&contents).map_err(|e| match e {
            MeshError::Config { message, .. } => MeshError::Config {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).map_err(|e| MeshError::Config {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        let acq = &self.acquisition;
        if !acq.angle_deg.is_finite() || acq.angle_deg < 0.0 {
            return Err(MeshError::invalid_param(
                "acquisition.angle_deg",
                acq.angle_deg,
                "must be a finite, non-negative angle",
            ));
        }
        if !acq.curve_angle_deg.is_finite() || acq.curve_angle_deg < 0.0 {
            return Err(MeshError::invalid_param(
                "acquisition.curve_angle_deg",
                acq.curve_angle_deg,
                "must be a finite, non-negative angle",
            ));
        }
        if acq.size_field.trim().is_empty() {
            return Err(MeshError::invalid_param(
                "acquisition.size_field",
                "\"\"",
                "must be a non-empty expression",
            ));
        }

        let sim = &self.simulation;
        if !sim.tau.is_finite() || sim.tau <= 0.0 {
            return Err(MeshError::invalid_param(
                "simulation.tau",
                sim.tau,
                "must be finite and positive",
            ));
        }
        if sim.steps == 0 {
            return Err(MeshError::invalid_param(
                "simulation.steps",
                sim.steps,
                "must be at least 1",
            ));
        }
        if !sim.frequency.is_finite() {
            return Err(MeshError::invalid_param(
                "simulation.frequency",
                sim.frequency,
                "must be finite",
            ));
        }

        let prefix = &self.output.prefix;
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(MeshError::invalid_param(
                "output.prefix",
                prefix,
                "must be a non-empty file name without separators",
            ));
        }
        Ok(())
    }

    /// Log a summary of the configuration.
    pub fn log_summary(&self) {
        log::info!(
            "acquisition: angle={}°, curve angle={}°, boundary={}, parametrizable={}, size field=\"{}\"",
            self.acquisition.angle_deg,
            self.acquisition.curve_angle_deg,
            self.acquisition.include_boundary,
            self.acquisition.force_parametrizable_patches,
            self.acquisition.size_field
        );
        log::info!(
            "simulation: tau={}, steps={}, law={:?}, frequency={}",
            self.simulation.tau,
            self.simulation.steps,
            self.simulation.velocity_law,
            self.simulation.frequency
        );
        log::info!(
            "output: {}/{}-<i>.vtu{}",
            self.output.directory.display(),
            self.output.prefix,
            if self.output.collection { " + collection" } else { "" }
        );
    }
}
