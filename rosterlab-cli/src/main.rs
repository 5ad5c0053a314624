//! RosterLab CLI: run, replicate, and validate commands.
//!
//! Commands:
//! - `run`: generate unique rosters from a candidate CSV, evaluate accuracy,
//!   and save artifacts
//! - `replicate`: run independent seeded replicates and report error stability
//! - `validate`: load and check a candidate CSV without sampling
//!
//! Logging goes to stderr and is controlled by `ROSTERLAB_LOG`
//! (e.g. `ROSTERLAB_LOG=rosterlab_core=debug`).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rosterlab_core::{CandidatePool, Role};
use rosterlab_runner::{
    load_candidates, run_replicates, run_simulation, save_artifacts, save_replicate_artifacts,
    ReplicateSummary, RunConfig, SimulationResult,
};

#[derive(Parser)]
#[command(
    name = "rosterlab",
    about = "RosterLab CLI: constrained Monte-Carlo roster generation and accuracy checks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate unique rosters, evaluate selection accuracy, and save artifacts.
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Run independent replicates with derived seeds and report error stability.
    Replicate {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of replicates (overrides config).
        #[arg(long)]
        count: Option<usize>,

        /// Worker threads (overrides config).
        #[arg(long)]
        threads: Option<usize>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Load and validate a candidate CSV.
    Validate {
        /// Candidate CSV path.
        #[arg(long)]
        candidates: PathBuf,

        /// Path to a TOML config file (for the expected candidate count).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Required number of candidates (overrides config).
        #[arg(long)]
        expected_candidates: Option<usize>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Candidate CSV path.
    #[arg(long)]
    candidates: PathBuf,

    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed (overrides config).
    #[arg(long)]
    seed: Option<u64>,

    /// Target number of unique rosters (overrides config).
    #[arg(long)]
    target: Option<usize>,

    /// Members per roster (overrides config).
    #[arg(long)]
    roster_size: Option<usize>,

    /// Relative-error tolerance, e.g. 0.05 for ±5% (overrides config).
    #[arg(long)]
    tolerance: Option<f64>,

    /// Required number of candidates (overrides config).
    #[arg(long)]
    expected_candidates: Option<usize>,
}

impl CommonArgs {
    fn resolve(&self) -> Result<RunConfig> {
        let mut config = load_config(self.config.as_ref())?;
        if let Some(seed) = self.seed {
            config.sampling.seed = seed;
        }
        if let Some(target) = self.target {
            config.sampling.target_collection_size = target;
        }
        if let Some(k) = self.roster_size {
            config.sampling.roster_size = k;
        }
        if let Some(tol) = self.tolerance {
            config.evaluation.tolerance = tol;
        }
        if self.expected_candidates.is_some() {
            config.data.expected_candidates = self.expected_candidates;
        }
        config.validate()?;
        tracing::debug!(config_hash = %config.config_hash(), "resolved run config");
        Ok(config)
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { common, output_dir } => run_cmd(&common, output_dir),
        Commands::Replicate {
            common,
            count,
            threads,
            output_dir,
        } => replicate_cmd(&common, count, threads, output_dir),
        Commands::Validate {
            candidates,
            config,
            expected_candidates,
        } => validate_cmd(candidates, config, expected_candidates),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ROSTERLAB_LOG").unwrap_or_else(|_| {
        EnvFilter::new("rosterlab=info,rosterlab_core=info,rosterlab_runner=info")
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&PathBuf>) -> Result<RunConfig> {
    match path {
        Some(p) => RunConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(RunConfig::default()),
    }
}

fn run_cmd(common: &CommonArgs, output_dir: PathBuf) -> Result<()> {
    let config = common.resolve()?;
    let pool = load_candidates(&common.candidates, config.data.expected_candidates)?;

    let result = run_simulation(&config, &pool)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, &pool, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn replicate_cmd(
    common: &CommonArgs,
    count: Option<usize>,
    threads: Option<usize>,
    output_dir: PathBuf,
) -> Result<()> {
    let mut config = common.resolve()?;
    if let Some(count) = count {
        config.replicates.count = count;
    }
    if let Some(threads) = threads {
        config.replicates.threads = threads;
    }
    config.validate()?;

    let pool = load_candidates(&common.candidates, config.data.expected_candidates)?;
    let summary = run_replicates(&config, &pool)?;
    print_replicate_summary(&summary, pool.len());

    let run_dir = save_replicate_artifacts(&summary, &config.label, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn validate_cmd(
    candidates: PathBuf,
    config: Option<PathBuf>,
    expected_candidates: Option<usize>,
) -> Result<()> {
    let config = load_config(config.as_ref())?;
    let expected = expected_candidates.or(config.data.expected_candidates);
    let pool = load_candidates(&candidates, expected)?;
    print_pool(&pool, &config);
    Ok(())
}

fn print_pool(pool: &CandidatePool, config: &RunConfig) {
    println!();
    println!("=== Candidate Pool ===");
    println!("Candidates:     {}", pool.len());
    println!("Dataset hash:   {}", pool.dataset_hash());
    println!(
        "Weight total:   {:.4}",
        pool.iter().map(|c| c.target_probability()).sum::<f64>()
    );
    println!();
    println!("{:<12} {:>6}", "Role", "Count");
    println!("{}", "-".repeat(19));
    for role in Role::ALL {
        let n = pool.iter().filter(|c| c.role() == role).count();
        println!("{:<12} {:>6}", role.as_str(), n);
    }

    let present = pool.roles_present();
    let missing: Vec<&str> = config
        .sampling
        .required_roles
        .difference(&present)
        .map(|r| r.as_str())
        .collect();
    if !missing.is_empty() {
        println!();
        println!("WARNING: required roles with no candidate: {}", missing.join(", "));
    }
    if config.sampling.roster_size > pool.len() {
        println!(
            "WARNING: roster size {} exceeds pool size {}",
            config.sampling.roster_size,
            pool.len()
        );
    }
    println!();
}

fn print_summary(result: &SimulationResult) {
    let gen = &result.generation;
    let acc = &result.accuracy;
    println!();
    println!("=== Simulation Result ===");
    println!("Label:          {}", result.label);
    println!("Seed:           {}", result.seed);
    println!(
        "Rosters:        {} unique (target {})",
        gen.collection_size, gen.target_collection_size
    );
    println!("Stop reason:    {:?}", gen.stop_reason);
    println!(
        "Attempts:       {} ({} unsatisfiable, {} duplicate)",
        gen.attempts, gen.failed_draws, gen.duplicate_draws
    );
    println!(
        "Candidates used: {} / {}",
        result.coverage.distinct_members,
        acc.records.len()
    );
    println!("Duration:       {:.2}s", result.duration_secs);
    println!();
    println!("--- Accuracy ---");
    println!(
        "Within ±{:.2}%:  {} / {}",
        acc.tolerance * 100.0,
        acc.within_count,
        acc.records.len()
    );
    println!("Min error:      {:.2}%", acc.min_error * 100.0);
    println!("Max error:      {:.2}%", acc.max_error * 100.0);

    if !acc.all_within() {
        println!();
        println!(
            "{:<10} {:<24} {:>10} {:>10} {:>10}",
            "Code", "Name", "Target%", "Actual%", "Error%"
        );
        println!("{}", "-".repeat(68));
        for r in acc.outside() {
            println!(
                "{:<10} {:<24} {:>10.2} {:>10.2} {:>10.2}",
                r.candidate_id.as_str(),
                r.name,
                r.target_frequency * 100.0,
                r.observed_frequency * 100.0,
                r.relative_error * 100.0
            );
        }
    }

    if !gen.target_reached {
        println!();
        println!("WARNING: collection fell short of the target size");
    }
    if !result.coverage.is_consistent() {
        println!(
            "WARNING: {} roster(s) failed the role-coverage audit",
            result.coverage.deficient_rosters.len()
        );
    }
    println!();
}

fn print_replicate_summary(summary: &ReplicateSummary, candidates: usize) {
    println!();
    println!("=== Replicates ===");
    println!("Replicates:     {}", summary.replicates.len());
    println!("Master seed:    {}", summary.master_seed);
    println!(
        "Mean within:    {:.2} / {} (±{:.2}%)",
        summary.mean_within_count,
        candidates,
        summary.tolerance * 100.0
    );
    println!();
    println!(
        "{:<10} {:<24} {:>10} {:>10} {:>10}",
        "Code", "Name", "Mean err%", "Std err%", "Within"
    );
    println!("{}", "-".repeat(68));
    for c in &summary.candidates {
        println!(
            "{:<10} {:<24} {:>10.2} {:>10.2} {:>10.2}",
            c.candidate_id.as_str(),
            c.name,
            c.mean_relative_error * 100.0,
            c.std_relative_error * 100.0,
            c.within_fraction
        );
    }
    println!();
}
