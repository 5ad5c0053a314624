//! Roster sampler: weighted rejection sampling under a role-coverage constraint.
//!
//! Each draw picks `roster_size` distinct candidates by sequential weighted
//! sampling without replacement: every step samples from the remaining pool
//! proportionally to the remaining weights. A draw is kept only if its role set
//! covers every required role; otherwise it is retried, up to
//! `max_attempts_per_sample` times.
//!
//! [`generate_unique_rosters`] repeats single draws, deduplicating them into a
//! [`RosterCollection`], until one of three conditions holds:
//! - the collection reached `target_collection_size` rosters,
//! - the global attempt counter reached `max_total_attempts`,
//! - every possible `roster_size`-subset of the pool is already present.
//!
//! Falling short of the target is a normal outcome reported in
//! [`GenerationOutcome`]; producing no roster at all is [`SampleError::NoValidRoster`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{CandidatePool, Role, Roster, RosterCollection};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Members per roster (K).
    pub roster_size: usize,
    /// Roles that must each be held by at least one member.
    pub required_roles: BTreeSet<Role>,
    /// Stop once this many unique rosters are collected.
    pub target_collection_size: usize,
    /// Global budget of single-draw attempts, successful or not.
    pub max_total_attempts: usize,
    /// Rejection-sampling retries inside one draw.
    pub max_attempts_per_sample: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            roster_size: 11,
            required_roles: Role::all(),
            target_collection_size: 20_000,
            max_total_attempts: 1_000_000,
            max_attempts_per_sample: 1_000,
        }
    }
}

impl SamplerConfig {
    /// Check the preconditions against a pool.
    ///
    /// `max_total_attempts == 0` is accepted; generation then ends with
    /// [`SampleError::NoValidRoster`].
    pub fn validate(&self, pool: &CandidatePool) -> Result<(), SampleError> {
        if self.roster_size == 0 {
            return Err(SampleError::InvalidConfig("roster_size must be > 0".into()));
        }
        if self.roster_size > pool.len() {
            return Err(SampleError::InvalidConfig(format!(
                "roster_size {} exceeds pool size {}",
                self.roster_size,
                pool.len()
            )));
        }
        if self.required_roles.len() > self.roster_size {
            return Err(SampleError::InvalidConfig(format!(
                "{} required roles cannot fit in a roster of {}",
                self.required_roles.len(),
                self.roster_size
            )));
        }
        if self.target_collection_size == 0 {
            return Err(SampleError::InvalidConfig(
                "target_collection_size must be > 0".into(),
            ));
        }
        if self.max_attempts_per_sample == 0 {
            return Err(SampleError::InvalidConfig(
                "max_attempts_per_sample must be > 0".into(),
            ));
        }
        Ok(())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("invalid sampler config: {0}")]
    InvalidConfig(String),

    /// A single draw found no role-covering sample. Recoverable: the generator
    /// counts it against the global budget and keeps going.
    #[error("no draw covered the required roles within {attempts} attempts")]
    UnsatisfiableConstraint { attempts: usize },

    #[error(
        "no valid roster produced after {attempts} attempts ({failed_draws} unsatisfiable draws)"
    )]
    NoValidRoster { attempts: usize, failed_draws: usize },
}

// ─── Outcome ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TargetReached,
    BudgetExhausted,
    /// Every `roster_size`-subset of the pool is in the collection.
    CombinationsExhausted,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub collection: RosterCollection,
    pub target_collection_size: usize,
    /// Single draws attempted, including failed and duplicate ones.
    pub attempts: usize,
    /// Draws that ended in `UnsatisfiableConstraint`.
    pub failed_draws: usize,
    /// Valid draws already present in the collection.
    pub duplicate_draws: usize,
    pub stop_reason: StopReason,
}

impl GenerationOutcome {
    pub fn target_reached(&self) -> bool {
        self.collection.len() >= self.target_collection_size
    }
}

// ─── Sampler ─────────────────────────────────────────────────────────

/// Rejection sampler bound to a pool and a validated config.
#[derive(Debug, Clone)]
pub struct RosterSampler<'a> {
    pool: &'a CandidatePool,
    config: &'a SamplerConfig,
    weights: Vec<f64>,
}

impl<'a> RosterSampler<'a> {
    pub fn new(pool: &'a CandidatePool, config: &'a SamplerConfig) -> Result<Self, SampleError> {
        config.validate(pool)?;

        let present = pool.roles_present();
        let missing: Vec<Role> = config.required_roles.difference(&present).copied().collect();
        if !missing.is_empty() {
            warn!(?missing, "required roles absent from the candidate pool; every draw will fail");
        }

        Ok(Self {
            pool,
            config,
            weights: pool.weights(),
        })
    }

    pub fn config(&self) -> &SamplerConfig {
        self.config
    }

    /// One draw: retry weighted sampling until the required roles are covered.
    pub fn draw_roster<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Roster, SampleError> {
        let candidates = self.pool.candidates();
        for _ in 0..self.config.max_attempts_per_sample {
            let picked =
                weighted_sample_without_replacement(rng, &self.weights, self.config.roster_size);
            let roles: BTreeSet<Role> = picked.iter().map(|&i| candidates[i].role()).collect();
            if self.config.required_roles.is_subset(&roles) {
                return Ok(Roster::from_members(
                    picked.into_iter().map(|i| candidates[i].id().clone()),
                ));
            }
        }
        Err(SampleError::UnsatisfiableConstraint {
            attempts: self.config.max_attempts_per_sample,
        })
    }

    /// Draw until the target, the attempt budget, or the combination space runs out.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<GenerationOutcome, SampleError> {
        let target = self.config.target_collection_size;
        let max_total = self.config.max_total_attempts;
        let max_distinct = binomial(self.pool.len(), self.config.roster_size);

        let mut collection = RosterCollection::new();
        let mut attempts = 0usize;
        let mut failed_draws = 0usize;
        let mut duplicate_draws = 0usize;

        let stop_reason = loop {
            if collection.len() >= target {
                break StopReason::TargetReached;
            }
            if collection.len() as u128 >= max_distinct {
                break StopReason::CombinationsExhausted;
            }
            if attempts >= max_total {
                break StopReason::BudgetExhausted;
            }

            attempts += 1;
            match self.draw_roster(rng) {
                Ok(roster) => {
                    if !collection.insert(roster) {
                        duplicate_draws += 1;
                    }
                }
                Err(SampleError::UnsatisfiableConstraint { .. }) => failed_draws += 1,
                Err(e) => return Err(e),
            }
        };

        if collection.is_empty() {
            return Err(SampleError::NoValidRoster {
                attempts,
                failed_draws,
            });
        }

        debug!(
            unique = collection.len(),
            attempts, failed_draws, duplicate_draws, ?stop_reason, "roster generation finished"
        );
        if stop_reason == StopReason::BudgetExhausted {
            warn!(
                unique = collection.len(),
                target, attempts, "attempt budget exhausted before reaching target"
            );
        }

        Ok(GenerationOutcome {
            collection,
            target_collection_size: target,
            attempts,
            failed_draws,
            duplicate_draws,
            stop_reason,
        })
    }
}

/// Generate up to `config.target_collection_size` unique role-covering rosters.
pub fn generate_unique_rosters<R: Rng + ?Sized>(
    pool: &CandidatePool,
    config: &SamplerConfig,
    rng: &mut R,
) -> Result<GenerationOutcome, SampleError> {
    RosterSampler::new(pool, config)?.generate(rng)
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Draw `k` distinct indices, each step proportional to the remaining weights.
///
/// Returns fewer than `k` indices only when `weights` has fewer than `k` entries.
pub fn weighted_sample_without_replacement<R: Rng + ?Sized>(
    rng: &mut R,
    weights: &[f64],
    k: usize,
) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..weights.len()).collect();
    let mut picked = Vec::with_capacity(k.min(weights.len()));

    while picked.len() < k && !remaining.is_empty() {
        let total: f64 = remaining.iter().map(|&i| weights[i]).sum();
        let mut pick = rng.gen::<f64>() * total;
        // Float residue can leave `pick` slightly positive; fall back to the last slot.
        let mut slot = remaining.len() - 1;
        for (pos, &i) in remaining.iter().enumerate() {
            pick -= weights[i];
            if pick <= 0.0 {
                slot = pos;
                break;
            }
        }
        picked.push(remaining.remove(slot));
    }
    picked
}

/// `C(n, k)`, saturating at `u128::MAX`.
fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        result = match result.checked_mul((n - i) as u128) {
            Some(v) => v / (i as u128 + 1),
            None => return u128::MAX,
        };
    }
    result
}

// ─── Tests ───────────────────────────────────────────────────────────
