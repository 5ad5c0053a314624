use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::CandidateId;

/// An unordered set of candidates, stored in canonical (sorted) form.
///
/// Two rosters with the same members compare equal regardless of draw order.
/// Deserialization goes through [`Roster::from_members`], so the canonical
/// form holds for rosters read back from a manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<CandidateId>", into = "Vec<CandidateId>")]
pub struct Roster(Vec<CandidateId>);

impl Roster {
    /// Build a roster from members in any order. Repeated ids collapse.
    pub fn from_members(members: impl IntoIterator<Item = CandidateId>) -> Self {
        let mut ids: Vec<CandidateId> = members.into_iter().collect();
        ids.sort();
        ids.dedup();
        Self(ids)
    }

    pub fn members(&self) -> &[CandidateId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        self.0.binary_search(id).is_ok()
    }
}

impl From<Vec<CandidateId>> for Roster {
    fn from(members: Vec<CandidateId>) -> Self {
        Self::from_members(members)
    }
}

impl From<Roster> for Vec<CandidateId> {
    fn from(roster: Roster) -> Self {
        roster.0
    }
}

/// Insertion-ordered set of unique rosters.
///
/// The position of a roster is its `roster_id` in exports. The collection only
/// grows; `insert` is the single check-then-insert step guarding uniqueness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Roster>", into = "Vec<Roster>")]
pub struct RosterCollection {
    rosters: Vec<Roster>,
    seen: HashSet<Roster>,
}

impl RosterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `roster` if no roster with the same members exists.
    /// Returns `true` when the roster was new.
    pub fn insert(&mut self, roster: Roster) -> bool {
        if self.seen.contains(&roster) {
            return false;
        }
        self.seen.insert(roster.clone());
        self.rosters.push(roster);
        true
    }

    pub fn contains(&self, roster: &Roster) -> bool {
        self.seen.contains(roster)
    }

    pub fn len(&self) -> usize {
        self.rosters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rosters.is_empty()
    }

    pub fn get(&self, roster_id: usize) -> Option<&Roster> {
        self.rosters.get(roster_id)
    }

    pub fn as_slice(&self) -> &[Roster] {
        &self.rosters
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Roster> {
        self.rosters.iter()
    }
}

impl From<Vec<Roster>> for RosterCollection {
    fn from(rosters: Vec<Roster>) -> Self {
        let mut collection = Self::new();
        for roster in rosters {
            collection.insert(roster);
        }
        collection
    }
}

impl From<RosterCollection> for Vec<Roster> {
    fn from(collection: RosterCollection) -> Self {
        collection.rosters
    }
}

impl<'a> IntoIterator for &'a RosterCollection {
    type Item = &'a Roster;
    type IntoIter = std::slice::Iter<'a, Roster>;

    fn into_iter(self) -> Self::IntoIter {
        self.rosters.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(ids: &[&str]) -> Roster {
        Roster::from_members(ids.iter().map(|s| CandidateId::from(*s)))
    }

    #[test]
    fn roster_is_canonical() {
        let r1 = roster(&["c", "a", "b"]);
        let r2 = roster(&["b", "c", "a"]);
        assert_eq!(r1, r2);
        assert_eq!(r1.members()[0].as_str(), "a");
        assert!(r1.contains(&"b".into()));
        assert!(!r1.contains(&"z".into()));
    }

    #[test]
    fn roster_collapses_repeats() {
        assert_eq!(roster(&["a", "a", "b"]).len(), 2);
    }

    #[test]
    fn collection_rejects_duplicates() {
        let mut c = RosterCollection::new();
        assert!(c.insert(roster(&["a", "b"])));
        assert!(!c.insert(roster(&["b", "a"])));
        assert!(c.insert(roster(&["a", "c"])));
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(1), Some(&roster(&["a", "c"])));
    }

    #[test]
    fn deserialization_drops_duplicates() {
        let json = r#"[["a","b"],["b","a"],["c","d"]]"#;
        let c: RosterCollection = serde_json::from_str(json).unwrap();
        assert_eq!(c.len(), 2);
        assert!(c.contains(&roster(&["c", "d"])));

        let out = serde_json::to_string(&c).unwrap();
        assert_eq!(out, r#"[["a","b"],["c","d"]]"#);
    }

    #[test]
    fn deserialized_roster_is_canonical() {
        let r: Roster = serde_json::from_str(r#"["c","a","b","a"]"#).unwrap();
        assert_eq!(r, roster(&["a", "b", "c"]));
        assert_eq!(r.len(), 3);
        assert!(r.contains(&"a".into()));
        assert!(r.contains(&"c".into()));
        assert!(!r.contains(&"d".into()));
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"["a","b","c"]"#);
    }

    #[test]
    fn deserialized_collection_dedups_reordered_rosters() {
        let c: RosterCollection = serde_json::from_str(r#"[["b","a"],["a","b"]]"#).unwrap();
        assert_eq!(c.len(), 1);
        assert!(c.contains(&roster(&["a", "b"])));
        assert_eq!(c.get(0).map(|r| r.members()[0].as_str()), Some("a"));
    }
}
