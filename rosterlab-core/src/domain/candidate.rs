use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while building candidates or a candidate pool.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandidateError {
    #[error("invalid candidate '{id}': {reason}")]
    Invalid { id: String, reason: String },

    #[error("candidate pool is empty")]
    EmptyPool,
}

/// Role tag carried by every candidate. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Batsman,
    Bowler,
    #[serde(rename = "WK")]
    WicketKeeper,
    Allrounder,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Batsman,
        Role::Bowler,
        Role::WicketKeeper,
        Role::Allrounder,
    ];

    /// Tag as it appears in candidate files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Batsman => "Batsman",
            Role::Bowler => "Bowler",
            Role::WicketKeeper => "WK",
            Role::Allrounder => "Allrounder",
        }
    }

    /// Every role, as a set. This is the default coverage requirement.
    pub fn all() -> BTreeSet<Role> {
        Self::ALL.into_iter().collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role tag '{0}' (valid: Batsman, Bowler, WK, Allrounder)")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Batsman" => Ok(Role::Batsman),
            "Bowler" => Ok(Role::Bowler),
            "WK" => Ok(Role::WicketKeeper),
            "Allrounder" => Ok(Role::Allrounder),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Candidate identifier (the `player_code` column).
///
/// Ordering is plain string ordering; rosters use it as their canonical order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A selectable candidate with its target selection probability.
///
/// Fields are private: a `Candidate` can only be built through [`Candidate::new`],
/// which enforces a non-empty id and a probability in `(0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    id: CandidateId,
    name: String,
    role: Role,
    team: String,
    target_probability: f64,
    match_code: Option<String>,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        role: Role,
        team: impl Into<String>,
        target_probability: f64,
    ) -> Result<Self, CandidateError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CandidateError::Invalid {
                id,
                reason: "identifier is empty".into(),
            });
        }
        if !target_probability.is_finite() || target_probability <= 0.0 || target_probability > 1.0
        {
            return Err(CandidateError::Invalid {
                id,
                reason: format!("target probability {target_probability} is outside (0, 1]"),
            });
        }
        Ok(Self {
            id: CandidateId(id),
            name: name.into(),
            role,
            team: team.into(),
            target_probability,
            match_code: None,
        })
    }

    pub fn with_match_code(mut self, match_code: impl Into<String>) -> Self {
        self.match_code = Some(match_code.into());
        self
    }

    pub fn id(&self) -> &CandidateId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    /// Target selection probability. Also the relative sampling weight.
    pub fn target_probability(&self) -> f64 {
        self.target_probability
    }

    pub fn match_code(&self) -> Option<&str> {
        self.match_code.as_deref()
    }
}

/// Immutable, id-unique, non-empty set of candidates.
#[derive(Debug, Clone)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
    index: HashMap<CandidateId, usize>,
}

impl CandidatePool {
    pub fn new(candidates: Vec<Candidate>) -> Result<Self, CandidateError> {
        if candidates.is_empty() {
            return Err(CandidateError::EmptyPool);
        }
        let mut index = HashMap::with_capacity(candidates.len());
        for (i, c) in candidates.iter().enumerate() {
            if index.insert(c.id.clone(), i).is_some() {
                return Err(CandidateError::Invalid {
                    id: c.id.0.clone(),
                    reason: "duplicate identifier".into(),
                });
            }
        }
        Ok(Self { candidates, index })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn index_of(&self, id: &CandidateId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &CandidateId) -> Option<&Candidate> {
        self.index_of(id).map(|i| &self.candidates[i])
    }

    /// Sampling weights in pool order.
    pub fn weights(&self) -> Vec<f64> {
        self.candidates.iter().map(|c| c.target_probability).collect()
    }

    /// Roles held by at least one candidate.
    pub fn roles_present(&self) -> BTreeSet<Role> {
        self.candidates.iter().map(|c| c.role).collect()
    }

    /// BLAKE3 content hash, independent of row order.
    pub fn dataset_hash(&self) -> String {
        let mut sorted: Vec<&Candidate> = self.candidates.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        let mut hasher = blake3::Hasher::new();
        for c in sorted {
            hasher.update(c.id.0.as_bytes());
            hasher.update(&[0x1f]);
            hasher.update(c.name.as_bytes());
            hasher.update(&[0x1f]);
            hasher.update(c.role.as_str().as_bytes());
            hasher.update(&[0x1f]);
            hasher.update(c.team.as_bytes());
            hasher.update(&[0x1f]);
            hasher.update(&c.target_probability.to_bits().to_le_bytes());
            hasher.update(&[0x1e]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, role: Role, p: f64) -> Candidate {
        Candidate::new(id, format!("Player {id}"), role, "IND", p).unwrap()
    }

    #[test]
    fn role_parses_file_tags() {
        assert_eq!("Batsman".parse::<Role>().unwrap(), Role::Batsman);
        assert_eq!(" WK ".parse::<Role>().unwrap(), Role::WicketKeeper);
        assert!("Keeper".parse::<Role>().is_err());
        assert!("wk".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_as_file_tag() {
        let json = serde_json::to_string(&Role::WicketKeeper).unwrap();
        assert_eq!(json, "\"WK\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::WicketKeeper);
    }

    #[test]
    fn candidate_rejects_bad_probability() {
        for p in [0.0, -0.1, 1.5, f64::NAN, f64::INFINITY] {
            let err = Candidate::new("p1", "A", Role::Bowler, "T", p).unwrap_err();
            assert!(matches!(err, CandidateError::Invalid { .. }), "p={p}");
        }
        assert!(Candidate::new("p1", "A", Role::Bowler, "T", 1.0).is_ok());
    }

    #[test]
    fn candidate_rejects_empty_id() {
        let err = Candidate::new("  ", "A", Role::Bowler, "T", 0.5).unwrap_err();
        assert!(matches!(err, CandidateError::Invalid { .. }));
    }

    #[test]
    fn pool_rejects_duplicates_and_empty() {
        assert_eq!(CandidatePool::new(vec![]).unwrap_err(), CandidateError::EmptyPool);

        let err = CandidatePool::new(vec![
            candidate("a", Role::Batsman, 0.5),
            candidate("a", Role::Bowler, 0.5),
        ])
        .unwrap_err();
        assert!(matches!(err, CandidateError::Invalid { ref id, .. } if id == "a"));
    }

    #[test]
    fn pool_lookup_and_roles() {
        let pool = CandidatePool::new(vec![
            candidate("a", Role::Batsman, 0.5),
            candidate("b", Role::WicketKeeper, 0.25),
        ])
        .unwrap();
        assert_eq!(pool.index_of(&"b".into()), Some(1));
        assert_eq!(pool.get(&"a".into()).unwrap().role(), Role::Batsman);
        assert!(pool.get(&"z".into()).is_none());
        assert_eq!(pool.weights(), vec![0.5, 0.25]);
        assert_eq!(
            pool.roles_present(),
            [Role::Batsman, Role::WicketKeeper].into_iter().collect()
        );
    }

    #[test]
    fn dataset_hash_ignores_row_order() {
        let a = candidate("a", Role::Batsman, 0.5);
        let b = candidate("b", Role::Bowler, 0.25);
        let p1 = CandidatePool::new(vec![a.clone(), b.clone()]).unwrap();
        let p2 = CandidatePool::new(vec![b, a]).unwrap();
        assert_eq!(p1.dataset_hash(), p2.dataset_hash());

        let p3 = CandidatePool::new(vec![
            candidate("a", Role::Batsman, 0.5),
            candidate("b", Role::Bowler, 0.3),
        ])
        .unwrap();
        assert_ne!(p1.dataset_hash(), p3.dataset_hash());
    }
}
