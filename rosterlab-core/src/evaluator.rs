//! Accuracy evaluation: observed selection frequency versus target probability.
//!
//! For every candidate in the pool the evaluator counts the rosters that
//! contain it, divides by the collection size, and compares the result with
//! the candidate's target probability:
//!
//! `relative_error = (observed_frequency - target_frequency) / target_frequency`
//!
//! A candidate is within tolerance when `|relative_error| <= tolerance`, compared
//! at four-decimal precision. Records come out sorted by candidate id and
//! include candidates that were never selected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::domain::{CandidateId, CandidatePool, Role, RosterCollection};

/// Default relative-error tolerance (±5%).
pub const DEFAULT_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("cannot evaluate an empty roster collection")]
    EmptyCollection,

    #[error("invalid tolerance {0}: must be finite and >= 0")]
    InvalidTolerance(f64),
}

/// Per-candidate accuracy figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub candidate_id: CandidateId,
    pub name: String,
    pub role: Role,
    pub team: String,
    pub match_code: Option<String>,
    pub target_frequency: f64,
    /// `round(target_frequency * collection_size)`.
    pub expected_count: u64,
    pub observed_count: u64,
    pub observed_frequency: f64,
    pub relative_error: f64,
    pub within_tolerance: bool,
}

/// Accuracy records plus the summary KPIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub records: Vec<AccuracyRecord>,
    pub collection_size: usize,
    pub tolerance: f64,
    pub within_count: usize,
    pub outside_count: usize,
    pub min_error: f64,
    pub max_error: f64,
}

impl AccuracyReport {
    /// Records beyond tolerance, in id order.
    pub fn outside(&self) -> impl Iterator<Item = &AccuracyRecord> {
        self.records.iter().filter(|r| !r.within_tolerance)
    }

    pub fn all_within(&self) -> bool {
        self.outside_count == 0
    }

    /// Sum of observed counts. Equals `roster_size * collection_size` for a
    /// collection produced by the sampler.
    pub fn total_observed(&self) -> u64 {
        self.records.iter().map(|r| r.observed_count).sum()
    }

    pub fn record(&self, id: &CandidateId) -> Option<&AccuracyRecord> {
        self.records
            .binary_search_by(|r| r.candidate_id.cmp(id))
            .ok()
            .map(|i| &self.records[i])
    }
}

/// Compare observed selection frequencies in `collection` with the pool's targets.
pub fn evaluate(
    pool: &CandidatePool,
    collection: &RosterCollection,
    tolerance: f64,
) -> Result<AccuracyReport, EvaluationError> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(EvaluationError::InvalidTolerance(tolerance));
    }
    if collection.is_empty() {
        return Err(EvaluationError::EmptyCollection);
    }

    let mut counts = vec![0u64; pool.len()];
    for roster in collection {
        for id in roster.members() {
            if let Some(i) = pool.index_of(id) {
                counts[i] += 1;
            }
        }
    }

    let n = collection.len() as f64;
    let mut records: Vec<AccuracyRecord> = pool
        .iter()
        .zip(counts)
        .map(|(c, observed_count)| {
            let target = c.target_probability();
            let observed_frequency = observed_count as f64 / n;
            let relative_error = (observed_frequency - target) / target;
            AccuracyRecord {
                candidate_id: c.id().clone(),
                name: c.name().to_string(),
                role: c.role(),
                team: c.team().to_string(),
                match_code: c.match_code().map(str::to_string),
                target_frequency: target,
                expected_count: (target * n).round() as u64,
                observed_count,
                observed_frequency,
                relative_error,
                within_tolerance: round4(relative_error).abs() <= tolerance,
            }
        })
        .collect();
    records.sort_by(|a, b| a.candidate_id.cmp(&b.candidate_id));

    let within_count = records.iter().filter(|r| r.within_tolerance).count();
    let (min_error, max_error) = records.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), r| (lo.min(r.relative_error), hi.max(r.relative_error)),
    );

    Ok(AccuracyReport {
        outside_count: records.len() - within_count,
        within_count,
        records,
        collection_size: collection.len(),
        tolerance,
        min_error,
        max_error,
    })
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

// ─── Role-coverage audit ─────────────────────────────────────────────

/// Consistency check over a finished collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageAudit {
    pub rosters_checked: usize,
    pub required_role_count: usize,
    /// Pool candidates that appear in at least one roster.
    pub distinct_members: usize,
    /// Ids (collection positions) of rosters missing a required role.
    pub deficient_rosters: Vec<usize>,
    /// Members that are not in the pool.
    pub unknown_members: Vec<CandidateId>,
}

impl CoverageAudit {
    pub fn is_consistent(&self) -> bool {
        self.deficient_rosters.is_empty() && self.unknown_members.is_empty()
    }
}

/// Flag rosters whose distinct roles fall short of `required_roles`.
///
/// A roster is flagged when it holds fewer distinct roles than are required
/// or when any required role is missing from it.
pub fn audit_role_coverage(
    pool: &CandidatePool,
    collection: &RosterCollection,
    required_roles: &BTreeSet<Role>,
) -> CoverageAudit {
    let mut deficient_rosters = Vec::new();
    let mut unknown: BTreeSet<CandidateId> = BTreeSet::new();
    let mut selected = vec![false; pool.len()];

    for (roster_id, roster) in collection.iter().enumerate() {
        let mut roles = BTreeSet::new();
        for id in roster.members() {
            match pool.index_of(id) {
                Some(i) => {
                    selected[i] = true;
                    roles.insert(pool.candidates()[i].role());
                }
                None => {
                    unknown.insert(id.clone());
                }
            }
        }
        if roles.len() < required_roles.len() || !required_roles.is_subset(&roles) {
            deficient_rosters.push(roster_id);
        }
    }

    CoverageAudit {
        rosters_checked: collection.len(),
        required_role_count: required_roles.len(),
        distinct_members: selected.iter().filter(|&&s| s).count(),
        deficient_rosters,
        unknown_members: unknown.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candidate, Roster};

    fn pool() -> CandidatePool {
        CandidatePool::new(vec![
            Candidate::new("p3", "Cee", Role::WicketKeeper, "AUS", 0.5).unwrap(),
            Candidate::new("p1", "Ay", Role::Batsman, "IND", 0.5).unwrap(),
            Candidate::new("p2", "Bee", Role::Bowler, "IND", 1.0).unwrap(),
            Candidate::new("p4", "Dee", Role::Allrounder, "AUS", 0.2)
                .unwrap()
                .with_match_code("M1"),
        ])
        .unwrap()
    }

    fn roster(ids: &[&str]) -> Roster {
        Roster::from_members(ids.iter().map(|s| CandidateId::from(*s)))
    }

    fn collection(rosters: &[&[&str]]) -> RosterCollection {
        let mut c = RosterCollection::new();
        for r in rosters {
            c.insert(roster(r));
        }
        c
    }

    #[test]
    fn empty_collection_is_an_error() {
        assert_eq!(
            evaluate(&pool(), &RosterCollection::new(), DEFAULT_TOLERANCE).unwrap_err(),
            EvaluationError::EmptyCollection
        );
    }

    #[test]
    fn bad_tolerance_is_an_error() {
        let c = collection(&[&["p1", "p2"]]);
        assert!(matches!(
            evaluate(&pool(), &c, -0.1),
            Err(EvaluationError::InvalidTolerance(_))
        ));
        assert!(matches!(
            evaluate(&pool(), &c, f64::NAN),
            Err(EvaluationError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn frequencies_and_errors() {
        let c = collection(&[&["p1", "p2"], &["p2", "p3"]]);
        let report = evaluate(&pool(), &c, DEFAULT_TOLERANCE).unwrap();

        let ids: Vec<&str> = report.records.iter().map(|r| r.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3", "p4"]);

        let p1 = report.record(&"p1".into()).unwrap();
        assert_eq!(p1.observed_count, 1);
        assert!((p1.observed_frequency - 0.5).abs() < 1e-12);
        assert!(p1.relative_error.abs() < 1e-12);
        assert!(p1.within_tolerance);
        assert_eq!(p1.expected_count, 1);

        let p2 = report.record(&"p2".into()).unwrap();
        assert_eq!(p2.observed_count, 2);
        assert!(p2.within_tolerance);

        // Never selected: still reported, relative error of -100%.
        let p4 = report.record(&"p4".into()).unwrap();
        assert_eq!(p4.observed_count, 0);
        assert!((p4.relative_error + 1.0).abs() < 1e-12);
        assert!(!p4.within_tolerance);
        assert_eq!(p4.match_code.as_deref(), Some("M1"));

        assert_eq!(report.collection_size, 2);
        assert_eq!(report.within_count, 3);
        assert_eq!(report.outside_count, 1);
        assert_eq!(report.outside().count(), 1);
        assert!(!report.all_within());
        assert_eq!(report.total_observed(), 4);
        assert!((report.min_error + 1.0).abs() < 1e-12);
        assert!(report.max_error.abs() < 1e-12);
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        // 21 of 40 rosters for a 0.5 target: relative error exactly +5%.
        let mut c = RosterCollection::new();
        for i in 0..40 {
            let extra = format!("x{i}");
            let mut members = vec![CandidateId::from(extra.as_str())];
            if i < 21 {
                members.push("p1".into());
            }
            c.insert(Roster::from_members(members));
        }
        let report = evaluate(&pool(), &c, 0.05).unwrap();
        let p1 = report.record(&"p1".into()).unwrap();
        assert!((p1.relative_error - 0.05).abs() < 1e-12);
        assert!(p1.within_tolerance);

        let strict = evaluate(&pool(), &c, 0.049).unwrap();
        assert!(!strict.record(&"p1".into()).unwrap().within_tolerance);
    }

    #[test]
    fn audit_flags_missing_roles() {
        let c = collection(&[&["p1", "p2", "p3", "p4"], &["p1", "p2"], &["p1", "zz"]]);
        let audit = audit_role_coverage(&pool(), &c, &Role::all());
        assert_eq!(audit.rosters_checked, 3);
        assert_eq!(audit.required_role_count, 4);
        assert_eq!(audit.distinct_members, 4);
        assert_eq!(audit.deficient_rosters, vec![1, 2]);
        assert_eq!(audit.unknown_members, vec![CandidateId::from("zz")]);
        assert!(!audit.is_consistent());
    }

    #[test]
    fn audit_passes_covering_rosters() {
        let c = collection(&[&["p1", "p2", "p3", "p4"]]);
        let audit = audit_role_coverage(&pool(), &c, &Role::all());
        assert!(audit.is_consistent());
    }

    #[test]
    fn audit_counts_distinct_selected_members() {
        // p4 never selected; the unknown member is not counted.
        let c = collection(&[&["p1", "p2"], &["p2", "p3"], &["p1", "zz"]]);
        let audit = audit_role_coverage(&pool(), &c, &[Role::Batsman].into());
        assert_eq!(audit.distinct_members, 3);
        assert_eq!(audit.deficient_rosters, vec![1]);
    }
}
