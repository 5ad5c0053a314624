//! Domain types: candidates, roles, rosters, and roster collections.

pub mod candidate;
pub mod roster;

pub use candidate::{Candidate, CandidateError, CandidateId, CandidatePool, Role, UnknownRole};
pub use roster::{Roster, RosterCollection};
