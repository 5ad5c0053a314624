//! Single-simulation runner.
//!
//! Seeds a `StdRng` from the config, generates the roster collection, evaluates
//! accuracy, audits role coverage, and packages everything as a serializable
//! [`SimulationResult`].

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use rosterlab_core::{
    audit_role_coverage, evaluate, generate_unique_rosters, AccuracyReport, CandidatePool,
    CoverageAudit, EvaluationError, GenerationOutcome, RosterCollection, SampleError, StopReason,
};

use crate::config::{ConfigError, RunConfig};

/// Schema version of persisted simulation results.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("roster generation failed: {0}")]
    Sampling(#[from] SampleError),

    #[error("accuracy evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Counters from the generation phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub target_collection_size: usize,
    pub collection_size: usize,
    pub target_reached: bool,
    pub stop_reason: StopReason,
    pub attempts: usize,
    pub failed_draws: usize,
    pub duplicate_draws: usize,
}

impl From<&GenerationOutcome> for GenerationStats {
    fn from(outcome: &GenerationOutcome) -> Self {
        Self {
            target_collection_size: outcome.target_collection_size,
            collection_size: outcome.collection.len(),
            target_reached: outcome.target_reached(),
            stop_reason: outcome.stop_reason,
            attempts: outcome.attempts,
            failed_draws: outcome.failed_draws,
            duplicate_draws: outcome.duplicate_draws,
        }
    }
}

/// Everything a simulation produced. Persisted as `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub schema_version: u32,
    pub label: String,
    pub seed: u64,
    pub dataset_hash: String,
    pub config_hash: String,
    pub config: RunConfig,
    pub generated_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub generation: GenerationStats,
    pub accuracy: AccuracyReport,
    pub coverage: CoverageAudit,
    pub rosters: RosterCollection,
}

/// Run one seeded simulation over `pool`.
pub fn run_simulation(
    config: &RunConfig,
    pool: &CandidatePool,
) -> Result<SimulationResult, RunError> {
    config.validate()?;
    let started = Instant::now();
    let sampler_config = config.sampler_config();
    let dataset_hash = pool.dataset_hash();

    info!(
        label = %config.label,
        candidates = pool.len(),
        roster_size = sampler_config.roster_size,
        target = sampler_config.target_collection_size,
        seed = config.sampling.seed,
        "starting simulation"
    );

    let mut rng = StdRng::seed_from_u64(config.sampling.seed);
    let outcome = generate_unique_rosters(pool, &sampler_config, &mut rng)?;
    let accuracy = evaluate(pool, &outcome.collection, config.evaluation.tolerance)?;
    let coverage = audit_role_coverage(pool, &outcome.collection, &sampler_config.required_roles);

    if !outcome.target_reached() {
        warn!(
            unique = outcome.collection.len(),
            target = outcome.target_collection_size,
            stop_reason = ?outcome.stop_reason,
            "collection fell short of target"
        );
    }
    if !coverage.is_consistent() {
        warn!(
            deficient = coverage.deficient_rosters.len(),
            unknown = coverage.unknown_members.len(),
            "role coverage audit found inconsistent rosters"
        );
    }

    let duration_secs = started.elapsed().as_secs_f64();
    info!(
        unique = outcome.collection.len(),
        within = accuracy.within_count,
        candidates = accuracy.records.len(),
        duration_secs,
        "simulation finished"
    );

    Ok(SimulationResult {
        schema_version: SCHEMA_VERSION,
        label: config.label.clone(),
        seed: config.sampling.seed,
        dataset_hash,
        config_hash: config.config_hash(),
        config: config.clone(),
        generated_at: Utc::now(),
        duration_secs,
        generation: GenerationStats::from(&outcome),
        accuracy,
        coverage,
        rosters: outcome.collection,
    })
}
