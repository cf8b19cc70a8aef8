//! Roster abstraction over the remote verification records.
//!
//! The roster is a tabular dataset with `ID`, `Name`, `Mobile`, and `Verified`
//! columns. Rows are created out-of-band; this program only ever flips the
//! `Verified` marker from unset to set.

pub mod memory;
pub mod sheet;

pub use memory::MemoryRoster;
pub use sheet::SheetClient;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Value written to the `Verified` cell when an entry is checked in.
pub const VERIFIED_MARK: &str = "TRUE";

/// A single verification record from the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// 1-based sheet row this entry came from (row 1 is the header).
    pub row: usize,
    /// Unique identifier for the person.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact number.
    pub mobile: String,
    /// Whether the entry has already been checked in.
    pub verified: bool,
}

/// A tabular store of verification records.
///
/// Implementations are the remote sheet client and the in-memory test double.
/// Reads are bulk (the whole worksheet); the only write is setting one entry's
/// `Verified` marker. The read-then-write sequence is NOT atomic across
/// processes; two scanners racing on the same unset entry can both succeed.
pub trait Roster {
    /// Fetch all verification records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn entries(&mut self) -> Result<Vec<RosterEntry>>;

    /// Find the record with the given identifier, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find(&mut self, id: &str) -> Result<Option<RosterEntry>> {
        Ok(self.entries()?.into_iter().find(|e| e.id == id))
    }

    /// Set the `Verified` marker on the given entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn mark_verified(&mut self, entry: &RosterEntry) -> Result<()>;
}

/// Interpret a raw `Verified` cell value.
///
/// Empty cells and explicit negatives count as unset; anything else counts as
/// set, matching the loose boolean-like convention of hand-maintained sheets.
#[must_use]
pub fn parse_verified_cell(raw: &str) -> bool {
    let value = raw.trim();
    if value.is_empty() {
        return false;
    }
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "false" | "no" | "0" | "n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verified_cell_unset() {
        assert!(!parse_verified_cell(""));
        assert!(!parse_verified_cell("   "));
        assert!(!parse_verified_cell("FALSE"));
        assert!(!parse_verified_cell("no"));
        assert!(!parse_verified_cell("0"));
        assert!(!parse_verified_cell("N"));
    }

    #[test]
    fn test_parse_verified_cell_set() {
        assert!(parse_verified_cell("TRUE"));
        assert!(parse_verified_cell("yes"));
        assert!(parse_verified_cell("1"));
        assert!(parse_verified_cell("checked in at 10:02"));
    }

    #[test]
    fn test_roster_entry_serialization() {
        let entry = RosterEntry {
            row: 2,
            id: "42".to_string(),
            name: "Ada".to_string(),
            mobile: "555-0042".to_string(),
            verified: false,
        };

        let json = serde_json::to_string(&entry).unwrap();
        let back: RosterEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }

    #[test]
    fn test_default_find_uses_entries() {
        let mut roster = MemoryRoster::new();
        roster.insert("42", "Ada", "555-0042");
        roster.insert("43", "Grace", "555-0043");

        let found = roster.find("43").unwrap().unwrap();
        assert_eq!(found.name, "Grace");
        assert!(roster.find("99").unwrap().is_none());
    }
}
