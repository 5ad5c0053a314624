//! RosterLab Runner: simulation orchestration, replicates, and export.
//!
//! This crate builds on `rosterlab-core` to provide:
//! - Candidate loading from CSV with validation
//! - TOML run configuration with defaults
//! - Single seeded simulation (generate, evaluate, audit)
//! - Parallel replicates with derived seeds and stability statistics
//! - JSON / CSV / text artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod replicates;
pub mod runner;

pub use config::{ConfigError, RunConfig};
pub use data_loader::{load_candidates, load_candidates_from_reader, LoadError};
pub use export::{
    export_accuracy_csv, export_json, export_rosters_csv, import_json, render_tolerance_report,
    save_artifacts, save_replicate_artifacts,
};
pub use replicates::{run_replicates, CandidateStability, ReplicateOutcome, ReplicateSummary};
pub use runner::{run_simulation, GenerationStats, RunError, SimulationResult, SCHEMA_VERSION};
