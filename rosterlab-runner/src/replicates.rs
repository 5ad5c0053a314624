//! Replicate runs: how stable is accuracy across independent seeds?
//!
//! Runs `count` independent generations over the same pool. Each replicate owns
//! its collection and a `StdRng` derived from [`RngHierarchy`] keyed by the
//! pool's dataset hash and the replicate index, so results do not depend on
//! thread count or scheduling order. Per-candidate relative errors are then
//! aggregated into mean, standard deviation, and within-tolerance fraction.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use rosterlab_core::{
    evaluate, generate_unique_rosters, CandidateId, CandidatePool, RngHierarchy, Role,
    StopReason,
};

use crate::config::RunConfig;
use crate::runner::RunError;

/// Outcome of one replicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicateOutcome {
    pub replicate: usize,
    pub seed: u64,
    pub collection_size: usize,
    pub stop_reason: StopReason,
    pub attempts: usize,
    pub within_count: usize,
    /// Relative error per candidate, in candidate-id order.
    pub relative_errors: Vec<f64>,
    /// Within-tolerance flag per candidate, in candidate-id order.
    pub within_flags: Vec<bool>,
}

/// Per-candidate error statistics across replicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateStability {
    pub candidate_id: CandidateId,
    pub name: String,
    pub role: Role,
    pub target_frequency: f64,
    pub mean_relative_error: f64,
    /// Sample standard deviation; 0 with a single replicate.
    pub std_relative_error: f64,
    /// Share of replicates in which the candidate was within tolerance.
    pub within_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicateSummary {
    pub master_seed: u64,
    pub dataset_hash: String,
    pub tolerance: f64,
    pub replicates: Vec<ReplicateOutcome>,
    pub candidates: Vec<CandidateStability>,
    pub mean_within_count: f64,
}

/// Run `config.replicates.count` independent simulations.
///
/// `config.sampling.seed` is the master seed; `config.replicates.threads > 1`
/// runs replicates on a dedicated rayon pool.
pub fn run_replicates(
    config: &RunConfig,
    pool: &CandidatePool,
) -> Result<ReplicateSummary, RunError> {
    config.validate()?;
    let sampler_config = config.sampler_config();
    let tolerance = config.evaluation.tolerance;
    let hierarchy = RngHierarchy::new(config.sampling.seed);
    let dataset_hash = pool.dataset_hash();
    let count = config.replicates.count;

    info!(
        count,
        threads = config.replicates.threads,
        master_seed = hierarchy.master_seed(),
        "starting replicates"
    );

    let run_one = |replicate: usize| -> Result<ReplicateOutcome, RunError> {
        let seed = hierarchy.sub_seed(&dataset_hash, replicate as u64);
        let mut rng = hierarchy.rng_for(&dataset_hash, replicate as u64);
        let outcome = generate_unique_rosters(pool, &sampler_config, &mut rng)?;
        let report = evaluate(pool, &outcome.collection, tolerance)?;
        if !outcome.target_reached() {
            warn!(
                replicate,
                unique = outcome.collection.len(),
                target = outcome.target_collection_size,
                "replicate fell short of target"
            );
        }
        Ok(ReplicateOutcome {
            replicate,
            seed,
            collection_size: outcome.collection.len(),
            stop_reason: outcome.stop_reason,
            attempts: outcome.attempts,
            within_count: report.within_count,
            relative_errors: report.records.iter().map(|r| r.relative_error).collect(),
            within_flags: report.records.iter().map(|r| r.within_tolerance).collect(),
        })
    };

    let replicates: Vec<ReplicateOutcome> = if config.replicates.threads > 1 {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.replicates.threads)
            .build()
            .map_err(|e| RunError::ThreadPool(e.to_string()))?;
        thread_pool.install(|| {
            (0..count)
                .into_par_iter()
                .map(run_one)
                .collect::<Result<Vec<_>, _>>()
        })?
    } else {
        (0..count).map(run_one).collect::<Result<Vec<_>, _>>()?
    };

    let summary = summarize(pool, &replicates);
    info!(
        count,
        mean_within = summary.mean_within_count,
        "replicates finished"
    );

    Ok(ReplicateSummary {
        master_seed: hierarchy.master_seed(),
        dataset_hash,
        tolerance,
        mean_within_count: summary.mean_within_count,
        candidates: summary.candidates,
        replicates,
    })
}

struct Aggregate {
    candidates: Vec<CandidateStability>,
    mean_within_count: f64,
}

fn summarize(pool: &CandidatePool, replicates: &[ReplicateOutcome]) -> Aggregate {
    let mut sorted: Vec<_> = pool.iter().collect();
    sorted.sort_by(|a, b| a.id().cmp(b.id()));

    let candidates = sorted
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let errors: Vec<f64> = replicates.iter().map(|r| r.relative_errors[i]).collect();
            let within = replicates.iter().filter(|r| r.within_flags[i]).count();
            CandidateStability {
                candidate_id: c.id().clone(),
                name: c.name().to_string(),
                role: c.role(),
                target_frequency: c.target_probability(),
                mean_relative_error: mean(errors.iter().copied()),
                std_relative_error: sample_std(&errors),
                within_fraction: if errors.is_empty() {
                    0.0
                } else {
                    within as f64 / errors.len() as f64
                },
            }
        })
        .collect();

    Aggregate {
        candidates,
        mean_within_count: mean(replicates.iter().map(|r| r.within_count as f64)),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values.iter().copied());
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}
