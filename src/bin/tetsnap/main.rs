//! Tetsnap CLI - mesh a surface with Gmsh and write time-stepped VTU snapshots.
//!
//! Usage: tetsnap <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `tetsnap --help` for available commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use tetsnap::acquire::{Gmsh, MshFile};
use tetsnap::config::Config;
use tetsnap::error::{MeshError, Result};
use tetsnap::io::{msh, pvd, stl, vtu, Format};
use tetsnap::mesh::{CalcMesh, RawMesh, VelocityLaw, SCALAR_FIELD_NAME, VELOCITY_FIELD_NAME};
use tetsnap::sim::{simulate_with_progress, Progress, SimulateOptions};

#[derive(Parser)]
#[command(name = "tetsnap")]
#[command(author, version, about = "Tetrahedral mesh time-stepping CLI", long_about = None)]
struct Cli {
    /// TOML configuration file (command-line options take precedence)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mesh the volume enclosed by an STL surface
    Remesh {
        /// Input surface (.stl)
        input: PathBuf,

        /// Output volume mesh (.msh)
        output: PathBuf,

        /// Do not open the Gmsh viewer after meshing
        #[arg(long)]
        nopopup: bool,
    },

    /// Time-step an existing volume mesh and write snapshots
    Simulate {
        /// Input volume mesh (.msh)
        input: PathBuf,

        #[command(flatten)]
        sim: SimArgs,
    },

    /// Mesh an STL surface, then time-step the result
    Run {
        /// Input surface (.stl)
        input: PathBuf,

        /// Where to keep the volume mesh (default: next to the input)
        #[arg(short, long)]
        mesh: Option<PathBuf>,

        /// Do not open the Gmsh viewer after meshing
        #[arg(long)]
        nopopup: bool,

        #[command(flatten)]
        sim: SimArgs,
    },

    /// Display information about a .msh, .stl or .vtu file
    Info {
        /// Input file
        input: PathBuf,
    },
}

#[derive(Args)]
struct SimArgs {
    /// Step size
    #[arg(short, long)]
    tau: Option<f64>,

    /// Number of snapshots, including the initial state
    #[arg(short, long)]
    steps: Option<usize>,

    /// Output directory for snapshots
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Snapshot file prefix
    #[arg(short, long)]
    prefix: Option<String>,

    /// Also write a .pvd collection listing all snapshots
    #[arg(long)]
    collection: bool,

    /// Evaluate the velocity law at the accumulated time instead of the step size
    #[arg(long)]
    elapsed_time: bool,
}

impl SimArgs {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(tau) = self.tau {
            config.simulation.tau = tau;
        }
        if let Some(steps) = self.steps {
            config.simulation.steps = steps;
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.output.prefix = prefix.clone();
        }
        if self.collection {
            config.output.collection = true;
        }
        if self.elapsed_time {
            config.simulation.velocity_law = VelocityLaw::ElapsedTime;
        }
        config.validate()
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => {
            log::info!("reading configuration from {}", path.display());
            Config::from_file(path)?
        }
        None => Config::default(),
    };

    match cli.command {
        Commands::Remesh {
            input,
            output,
            nopopup,
        } => {
            config.log_summary();
            cmd_remesh(&input, &output, nopopup, &config)?;
        }

        Commands::Simulate { input, sim } => {
            sim.apply(&mut config)?;
            config.log_summary();
            let raw = MshFile::new(&input).load()?;
            cmd_simulate(&raw, &config)?;
        }

        Commands::Run {
            input,
            mesh,
            nopopup,
            sim,
        } => {
            sim.apply(&mut config)?;
            config.log_summary();
            let output = mesh.unwrap_or_else(|| input.with_extension("msh"));
            let raw = cmd_remesh(&input, &output, nopopup, &config)?;
            cmd_simulate(&raw, &config)?;
        }

        Commands::Info { input } => {
            cmd_info(&input)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let last_percent = AtomicUsize::new(usize::MAX);

    Progress::new(move |step| {
        let percent = (step.fraction() * 100.0).round() as usize;

        // Only redraw when the percentage changes
        if last_percent.swap(percent, Ordering::Relaxed) == percent && !step.is_last() {
            return;
        }

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let empty = bar_width - filled;

        let bar = "=".repeat(filled);
        let space = " ".repeat(empty);

        let name = step
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        eprint!("\r[{}{}] {:3}% t={:<10.4} {}", bar, space, percent, step.time, name);
        let _ = std::io::stderr().flush();

        if step.is_last() {
            eprintln!();
        }
    })
}

fn cmd_remesh(input: &Path, output: &Path, nopopup: bool, config: &Config) -> Result<RawMesh> {
    let gmsh = Gmsh::new(config.acquisition.clone());

    let start = Instant::now();
    let raw = gmsh.remesh(input, output)?;
    let elapsed = start.elapsed();

    println!(
        "Meshed: {} nodes, {} tetrahedra ({:.2?})",
        raw.num_nodes(),
        raw.num_tetrahedra(),
        elapsed
    );
    println!("Saved: {}", output.display());

    if !nopopup {
        gmsh.show(output)?;
    }
    Ok(raw)
}

fn cmd_simulate(raw: &RawMesh, config: &Config) -> Result<()> {
    let sim = &config.simulation;
    let out = &config.output;

    let mut mesh = CalcMesh::from_raw(raw)?
        .with_velocity_law(sim.velocity_law)
        .with_frequency(sim.frequency);
    println!(
        "Loaded: {} nodes, {} tetrahedra",
        mesh.num_nodes(),
        mesh.num_tetrahedra()
    );

    let writer = vtu::VtuWriter::new(&out.directory, out.prefix.as_str());
    writer.ensure_directory()?;

    println!(
        "Simulating {} snapshots (tau={}, {:?}) into {}...",
        sim.steps,
        sim.tau,
        sim.velocity_law,
        out.directory.display()
    );
    let progress = create_progress();
    let start = Instant::now();
    let summary = simulate_with_progress(&mut mesh, &writer, &SimulateOptions::from(sim), &progress)?;
    let elapsed = start.elapsed();

    println!(
        "Wrote {} snapshots, final time {} ({:.2?})",
        summary.snapshots.len(),
        summary.final_time,
        elapsed
    );

    if out.collection {
        let path = writer.collection_path();
        pvd::save(&summary.snapshots, &path)?;
        println!("Saved: {}", path.display());
    }
    Ok(())
}

fn cmd_info(input: &Path) -> Result<()> {
    println!("File: {}", input.display());

    match Format::detect(input)? {
        Format::Stl => {
            let surface = stl::inspect(input)?;
            println!("Triangles: {}", surface.triangles);
            println!("Vertices: {}", surface.vertices);
            print_bounding_box(surface.bounding_box);
            if surface.closed {
                println!("Topology: Closed (watertight)");
            } else {
                println!("Topology: Open (not suitable for volume meshing)");
            }
        }

        Format::Msh => {
            let raw = msh::load(input)?;
            println!("Nodes: {}", raw.num_nodes());
            println!("Tetrahedra: {}", raw.num_tetrahedra());
            if raw.tetrahedra.is_empty() {
                println!("Volume: none (surface-only mesh)");
                return Ok(());
            }
            let mesh = CalcMesh::from_raw(&raw)?;
            if let Some(bbox) = mesh.bounding_box() {
                print_bounding_box(bbox);
            }
            println!("Volume: {:.6}", mesh.total_volume());
        }

        Format::Vtu => {
            let grid = vtu::load(input)?;
            println!("Points: {}", grid.num_points());
            println!("Cells: {}", grid.num_cells());
            if let Some(time) = grid.time {
                println!("Time: {}", time);
            }
            for array in &grid.point_data {
                println!("Point data: {} ({} components)", array.name, array.components);
            }
            if grid.scalars(SCALAR_FIELD_NAME).is_none() || grid.vectors(VELOCITY_FIELD_NAME).is_none() {
                println!("Note: not a tetsnap snapshot");
            }
        }

        Format::Pvd => {
            return Err(MeshError::UnsupportedFormat {
                extension: "pvd".to_string(),
            });
        }
    }

    Ok(())
}

fn print_bounding_box((min, max): (nalgebra::Point3<f64>, nalgebra::Point3<f64>)) {
    println!(
        "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
        min.x, min.y, min.z, max.x, max.y, max.z
    );
    let diag = max - min;
    println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
}
