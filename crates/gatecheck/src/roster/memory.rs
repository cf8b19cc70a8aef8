//! In-memory roster used by tests and dry runs.

use crate::error::{Error, Result};

use super::{Roster, RosterEntry};

/// A roster held entirely in memory.
///
/// Mirrors the remote sheet's shape (1-based rows below a header row) so the
/// check-in workflow behaves identically against either implementation.
#[derive(Debug, Clone, Default)]
pub struct MemoryRoster {
    entries: Vec<RosterEntry>,
    /// Count of `mark_verified` calls, for asserting on mutations in tests.
    writes: usize,
}

impl MemoryRoster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unverified entry, assigning the next sheet row.
    pub fn insert(&mut self, id: &str, name: &str, mobile: &str) {
        let row = self.entries.len() + 2; // row 1 is the header
        self.entries.push(RosterEntry {
            row,
            id: id.to_string(),
            name: name.to_string(),
            mobile: mobile.to_string(),
            verified: false,
        });
    }

    /// Look up an entry by identifier without going through the trait.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Number of `mark_verified` calls made against this roster.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl Roster for MemoryRoster {
    fn entries(&mut self) -> Result<Vec<RosterEntry>> {
        Ok(self.entries.clone())
    }

    fn mark_verified(&mut self, entry: &RosterEntry) -> Result<()> {
        let stored = self
            .entries
            .iter_mut()
            .find(|e| e.row == entry.row)
            .ok_or_else(|| Error::internal(format!("no entry at row {}", entry.row)))?;
        stored.verified = true;
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_rows_below_header() {
        let mut roster = MemoryRoster::new();
        roster.insert("42", "Ada", "555-0042");
        roster.insert("43", "Grace", "555-0043");

        let entries = roster.entries().unwrap();
        assert_eq!(entries[0].row, 2);
        assert_eq!(entries[1].row, 3);
    }

    #[test]
    fn test_mark_verified_flips_marker() {
        let mut roster = MemoryRoster::new();
        roster.insert("42", "Ada", "555-0042");

        let entry = roster.entries().unwrap().remove(0);
        assert!(!entry.verified);

        roster.mark_verified(&entry).unwrap();
        assert!(roster.get("42").unwrap().verified);
        assert_eq!(roster.write_count(), 1);
    }

    #[test]
    fn test_mark_verified_unknown_row() {
        let mut roster = MemoryRoster::new();
        let entry = RosterEntry {
            row: 99,
            id: "x".to_string(),
            name: String::new(),
            mobile: String::new(),
            verified: false,
        };
        assert!(roster.mark_verified(&entry).is_err());
        assert_eq!(roster.write_count(), 0);
    }
}
