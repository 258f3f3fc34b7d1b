//! Crease CLI - developability optimization on procedural surfaces.
//!
//! Usage: crease <COMMAND> [OPTIONS]
//!
//! Run `crease --help` for available commands. Set `RUST_LOG=debug` to see
//! every optimizer step and remeshing pass.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crease::algo::develop::{
    develop_with_progress, local_energy, DevelopOptions, EnergyPolicy, FaceGeometry, OptMethod,
    VertexStars,
};
use crease::algo::remesh::RemeshOptions;
use crease::algo::Progress;
use crease::mesh::{shapes, HalfEdgeMesh};

#[derive(Parser)]
#[command(name = "crease")]
#[command(author, version, about = "Mesh developability CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print developability energy statistics of a surface
    Energy {
        #[command(flatten)]
        surface: SurfaceArgs,

        /// Energy policy
        #[arg(short, long, value_enum, default_value = "max")]
        policy: PolicyArg,
    },

    /// Optimize a surface for developability
    Develop {
        #[command(flatten)]
        surface: SurfaceArgs,

        /// Step-length strategy
        #[arg(short, long, value_enum, default_value = "backtracking")]
        method: MethodArg,

        /// Energy policy
        #[arg(short, long, value_enum, default_value = "max")]
        policy: PolicyArg,

        /// Budget of energy evaluations
        #[arg(long, default_value = "5000")]
        max_fun_evals: usize,

        /// Convergence threshold on the squared gradient norm
        #[arg(long, default_value = "1e-6")]
        eps: f64,

        /// Step length (initial trial step for backtracking)
        #[arg(long, default_value = "0.01")]
        step_size: f64,

        /// Smallest step the line search tries
        #[arg(long, default_value = "1e-12")]
        min_step_size: f64,

        /// Line search shrink factor
        #[arg(long, default_value = "0.8")]
        tau: f64,

        /// Armijo constant
        #[arg(long, default_value = "1e-4")]
        m1: f64,

        /// Small-angle threshold for remeshing, in degrees
        #[arg(long, default_value = "1.0")]
        angle_threshold: f64,

        /// Disable edge flips
        #[arg(long)]
        no_flips: bool,

        /// Disable edge collapses
        #[arg(long)]
        no_collapses: bool,

        /// Skip the remeshing pass before optimizing
        #[arg(long)]
        no_initial_remesh: bool,

        /// Skip remeshing between steps
        #[arg(long)]
        no_remesh: bool,
    },
}

#[derive(Args)]
struct SurfaceArgs {
    /// Surface to generate
    #[arg(short, long, value_enum, default_value = "bumpy")]
    shape: ShapeArg,

    /// Grid resolution (squares per side)
    #[arg(short = 'n', long, default_value = "16")]
    resolution: usize,

    /// Bump height or fold angle in radians, depending on the shape
    #[arg(short, long, default_value = "0.2")]
    amount: f64,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ShapeArg {
    /// Flat square grid
    Grid,
    /// Sheet with a single straight fold
    Folded,
    /// Sheet with a sinusoidal bump pattern
    Bumpy,
    /// Regular octahedron
    Octahedron,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    /// Fixed step length
    Fixed,
    /// Armijo backtracking line search
    Backtracking,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    /// Largest normal deviation, worse region decides
    Max,
    /// Averaged pairwise deviation, regions summed
    Average,
}

impl From<MethodArg> for OptMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Fixed => OptMethod::FixedStep,
            MethodArg::Backtracking => OptMethod::Backtracking,
        }
    }
}

impl From<PolicyArg> for EnergyPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Max => EnergyPolicy::Max,
            PolicyArg::Average => EnergyPolicy::Average,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Energy { surface, policy } => cmd_energy(&surface, policy.into())?,

        Commands::Develop {
            surface,
            method,
            policy,
            max_fun_evals,
            eps,
            step_size,
            min_step_size,
            tau,
            m1,
            angle_threshold,
            no_flips,
            no_collapses,
            no_initial_remesh,
            no_remesh,
        } => {
            let options = DevelopOptions::default()
                .with_method(method.into())
                .with_policy(policy.into())
                .with_max_fun_evals(max_fun_evals)
                .with_eps(eps)
                .with_step_size(step_size)
                .with_min_step_size(min_step_size)
                .with_tau(tau)
                .with_m1(m1)
                .with_remesh(
                    RemeshOptions::default()
                        .with_angle_threshold(angle_threshold)
                        .with_edge_flips(!no_flips)
                        .with_edge_collapses(!no_collapses),
                )
                .with_initial_remesh(!no_initial_remesh)
                .with_remesh_during_optimization(!no_remesh);
            cmd_develop(&surface, &options)?;
        }
    }

    Ok(())
}

fn build_surface(args: &SurfaceArgs) -> crease::error::Result<HalfEdgeMesh> {
    match args.shape {
        ShapeArg::Grid => shapes::grid(args.resolution, 1.0),
        ShapeArg::Folded => shapes::folded_sheet(args.resolution, args.amount),
        ShapeArg::Bumpy => shapes::bumpy_sheet(args.resolution, args.amount),
        ShapeArg::Octahedron => shapes::octahedron(),
    }
}

/// Create a progress callback that draws a terminal progress bar.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = ((current * 100) + (total / 2)) / total;

        // Monotonic: the bar never moves backwards.
        let old = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        let percent = old.max(raw_percent);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {:<24}", bar, space, percent, message);
        let _ = std::io::stderr().flush();
    })
}

fn print_summary(mesh: &HalfEdgeMesh) {
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());
    println!("Surface area: {:.6}", mesh.surface_area());
    if let Some((min, max)) = mesh.bounding_box() {
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }
}

fn cmd_energy(args: &SurfaceArgs, policy: EnergyPolicy) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = build_surface(args)?;
    print_summary(&mesh);

    let stars = VertexStars::from_mesh(&mesh);
    let geometry = FaceGeometry::from_mesh(&mesh);

    let mut total = 0.0;
    let mut max = 0.0_f64;
    let mut active = 0;
    for v in mesh.vertex_ids() {
        let local = local_energy(v, &stars, &geometry, policy);
        total += local.energy;
        max = max.max(local.energy);
        if local.partition.is_some() {
            active += 1;
        }
    }

    println!("Vertices with an energy term: {}", active);
    println!("Total energy: {:.6e}", total);
    println!("Largest vertex energy: {:.6e}", max);
    if active > 0 {
        println!("Mean vertex energy: {:.6e}", total / active as f64);
    }

    Ok(())
}

fn cmd_develop(args: &SurfaceArgs, options: &DevelopOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = build_surface(args)?;
    print_summary(&mesh);

    println!(
        "Optimizing ({:?}, {:?} policy, budget {} evaluations)...",
        options.method, options.policy, options.max_fun_evals
    );
    let progress = create_progress();

    let start = Instant::now();
    let report = develop_with_progress(&mut mesh, options, &progress)?;
    let elapsed = start.elapsed();
    eprintln!();

    println!("Done in {:.2?}: {:?}", elapsed, report.termination);
    println!(
        "Energy: {:.6e} -> {:.6e}",
        report.initial_energy, report.final_energy
    );
    println!("Function evaluations: {}", report.num_fun_evals);
    println!("Squared gradient norm: {:.3e}", report.grad_sq_norm);
    println!("Remeshing passes: {}", report.remesh_passes);
    print_summary(&mesh);

    Ok(())
}
