//! Candidate loading for the runner.
//!
//! Reads a candidate CSV with the header
//! `match_code,player_code,player_name,role,team,perc_selection` and builds a
//! validated [`CandidatePool`]. Column order does not matter; `match_code` may
//! be absent or empty. Role tags must belong to the closed set
//! `Batsman`, `Bowler`, `WK`, `Allrounder`.

use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use rosterlab_core::{Candidate, CandidateError, CandidatePool, Role};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open candidate file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed candidate row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("candidate row {row}: {source}")]
    Candidate {
        row: usize,
        #[source]
        source: CandidateError,
    },

    #[error(transparent)]
    Pool(#[from] CandidateError),

    #[error("expected {expected} candidates, found {found}")]
    CountMismatch { expected: usize, found: usize },
}

#[derive(Debug, Deserialize)]
struct CandidateRow {
    #[serde(default)]
    match_code: Option<String>,
    player_code: String,
    player_name: String,
    role: String,
    team: String,
    perc_selection: f64,
}

impl CandidateRow {
    fn into_candidate(self) -> Result<Candidate, CandidateError> {
        let role: Role = self.role.parse().map_err(|e| CandidateError::Invalid {
            id: self.player_code.clone(),
            reason: format!("{e}"),
        })?;
        let candidate = Candidate::new(
            self.player_code,
            self.player_name,
            role,
            self.team,
            self.perc_selection,
        )?;
        Ok(match self.match_code.filter(|m| !m.trim().is_empty()) {
            Some(code) => candidate.with_match_code(code),
            None => candidate,
        })
    }
}

/// Load candidates from any CSV reader.
///
/// `expected` enforces an exact row count when set.
pub fn load_candidates_from_reader<R: Read>(
    reader: R,
    expected: Option<usize>,
) -> Result<CandidatePool, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut candidates = Vec::new();
    for (i, record) in rdr.deserialize::<CandidateRow>().enumerate() {
        // Row numbers are 1-based and skip the header, as a spreadsheet shows them.
        let row = i + 2;
        let record = record.map_err(|source| LoadError::Row { row, source })?;
        let candidate = record
            .into_candidate()
            .map_err(|source| LoadError::Candidate { row, source })?;
        candidates.push(candidate);
    }

    if let Some(expected) = expected {
        if candidates.len() != expected {
            return Err(LoadError::CountMismatch {
                expected,
                found: candidates.len(),
            });
        }
    }

    Ok(CandidatePool::new(candidates)?)
}

/// Load candidates from a CSV file.
pub fn load_candidates(path: &Path, expected: Option<usize>) -> Result<CandidatePool, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let pool = load_candidates_from_reader(file, expected)?;
    info!(
        path = %path.display(),
        candidates = pool.len(),
        dataset_hash = %pool.dataset_hash(),
        "loaded candidate pool"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosterlab_core::CandidateId;

    const HEADER: &str = "match_code,player_code,player_name,role,team,perc_selection\n";

    fn load(body: &str, expected: Option<usize>) -> Result<CandidatePool, LoadError> {
        let csv = format!("{HEADER}{body}");
        load_candidates_from_reader(csv.as_bytes(), expected)
    }

    #[test]
    fn loads_valid_rows() {
        let pool = load(
            "M1,101,Ann,Batsman,IND,0.8\nM1,102,Bob,WK,AUS,0.45\n",
            Some(2),
        )
        .unwrap();
        assert_eq!(pool.len(), 2);
        let bob = pool.get(&CandidateId::from("102")).unwrap();
        assert_eq!(bob.role(), Role::WicketKeeper);
        assert_eq!(bob.team(), "AUS");
        assert_eq!(bob.match_code(), Some("M1"));
        assert!((bob.target_probability() - 0.45).abs() < 1e-12);
    }

    #[test]
    fn trims_whitespace_and_allows_empty_match_code() {
        let pool = load(" ,101 , Ann , Bowler , IND , 0.5\n", None).unwrap();
        let ann = pool.get(&CandidateId::from("101")).unwrap();
        assert_eq!(ann.name(), "Ann");
        assert_eq!(ann.match_code(), None);
    }

    #[test]
    fn match_code_column_is_optional() {
        let csv = "player_code,player_name,role,team,perc_selection\n7,Cy,Allrounder,ENG,0.3\n";
        let pool = load_candidates_from_reader(csv.as_bytes(), None).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn unknown_role_is_invalid_candidate() {
        let err = load("M1,101,Ann,Keeper,IND,0.5\n", None).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Candidate {
                row: 2,
                source: CandidateError::Invalid { .. }
            }
        ));
    }

    #[test]
    fn bad_weight_is_invalid_candidate() {
        let err = load("M1,101,Ann,Batsman,IND,0.5\nM1,102,Bo,Bowler,IND,0\n", None).unwrap_err();
        assert!(matches!(err, LoadError::Candidate { row: 3, .. }));
    }

    #[test]
    fn missing_weight_is_row_error() {
        let err = load("M1,101,Ann,Batsman,IND,\n", None).unwrap_err();
        assert!(matches!(err, LoadError::Row { row: 2, .. }));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = load("M1,101,Ann,Batsman,IND,0.5\nM1,101,Bo,Bowler,IND,0.5\n", None).unwrap_err();
        assert!(matches!(err, LoadError::Pool(CandidateError::Invalid { .. })));
    }

    #[test]
    fn count_mismatch_rejected() {
        let err = load("M1,101,Ann,Batsman,IND,0.5\n", Some(22)).unwrap_err();
        assert!(matches!(
            err,
            LoadError::CountMismatch {
                expected: 22,
                found: 1
            }
        ));
    }

    #[test]
    fn empty_file_is_empty_pool() {
        let err = load("", None).unwrap_err();
        assert!(matches!(err, LoadError::Pool(CandidateError::EmptyPool)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_candidates(Path::new("/nonexistent/players.csv"), None).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
