//! RosterLab Core: candidate domain types, roster sampler, accuracy evaluator.
//!
//! This crate is the pure kernel of the roster simulation:
//! - Domain types (roles, candidates, candidate pools, rosters, roster collections)
//! - Weighted rejection sampler with role coverage and deduplication
//! - Accuracy evaluator comparing observed selection frequencies with targets
//! - Deterministic RNG hierarchy for seeded replicates
//!
//! Nothing here performs I/O. Randomness is always injected by the caller.

pub mod domain;
pub mod evaluator;
pub mod rng;
pub mod sampler;

pub use domain::{
    Candidate, CandidateError, CandidateId, CandidatePool, Role, Roster, RosterCollection,
};
pub use evaluator::{
    audit_role_coverage, evaluate, AccuracyRecord, AccuracyReport, CoverageAudit,
    EvaluationError, DEFAULT_TOLERANCE,
};
pub use rng::RngHierarchy;
pub use sampler::{
    generate_unique_rosters, GenerationOutcome, RosterSampler, SampleError, SamplerConfig,
    StopReason,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: public types can cross thread boundaries.
    ///
    /// Replicates run on a rayon pool; every type they carry must be Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Candidate>();
        require_sync::<Candidate>();
        require_send::<CandidatePool>();
        require_sync::<CandidatePool>();
        require_send::<Roster>();
        require_sync::<Roster>();
        require_send::<RosterCollection>();
        require_sync::<RosterCollection>();
        require_send::<SamplerConfig>();
        require_sync::<SamplerConfig>();
        require_send::<GenerationOutcome>();
        require_sync::<GenerationOutcome>();
        require_send::<RosterSampler<'static>>();
        require_sync::<RosterSampler<'static>>();
        require_send::<AccuracyReport>();
        require_sync::<AccuracyReport>();
        require_send::<CoverageAudit>();
        require_sync::<CoverageAudit>();
        require_send::<RngHierarchy>();
        require_sync::<RngHierarchy>();
        require_send::<SampleError>();
        require_sync::<SampleError>();
    }

    /// Architecture contract: the sampler takes its randomness as a parameter.
    #[test]
    fn sampler_randomness_is_injected() {
        fn _check<R: rand::Rng>(
            pool: &CandidatePool,
            config: &SamplerConfig,
            rng: &mut R,
        ) -> Result<GenerationOutcome, SampleError> {
            generate_unique_rosters(pool, config, rng)
        }
    }
}
