//! The check-in workflow.
//!
//! Takes a parsed payload, looks its identifier up in the roster, and flips
//! the `Verified` marker when the entry has not been checked in yet. This is
//! a pure decision composed with one conditional remote mutation: no loops,
//! no retries, and no atomicity guarantee against concurrent scanners.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::payload::ScanPayload;
use crate::roster::Roster;

/// The result of one check-in attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckinOutcome {
    /// The entry was found unverified and has been marked verified.
    Verified {
        /// The identifier that was checked in.
        id: String,
        /// Stored display name.
        name: String,
        /// Stored contact number.
        mobile: String,
    },
    /// The entry was already verified before this scan.
    Duplicate {
        /// The identifier that was scanned again.
        id: String,
        /// Stored display name.
        name: String,
    },
    /// No roster entry carries the scanned identifier.
    NotFound {
        /// The identifier that was not found.
        id: String,
    },
}

impl CheckinOutcome {
    /// Short machine-readable label, used by the scan history.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Verified { .. } => "verified",
            Self::Duplicate { .. } => "duplicate",
            Self::NotFound { .. } => "not_found",
        }
    }

    /// Whether this outcome mutated the remote store.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}

impl std::fmt::Display for CheckinOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified { name, mobile, .. } => {
                write!(f, "checked in: {name} ({mobile})")
            }
            Self::Duplicate { name, .. } => write!(f, "already checked in: {name}"),
            Self::NotFound { id } => write!(f, "no roster entry for ID '{id}'"),
        }
    }
}

/// Run the verification check and commit the marker on success.
///
/// # Errors
///
/// Returns an error if the roster cannot be read or written. Lookup misses
/// and duplicates are outcomes, not errors.
pub fn check_in<R: Roster + ?Sized>(
    roster: &mut R,
    payload: &ScanPayload,
) -> Result<CheckinOutcome> {
    run(roster, payload, true)
}

/// Run the verification check without committing the marker.
///
/// Reports the same outcomes as [`check_in`] but never writes, so a
/// `Verified` outcome here means "would be checked in".
///
/// # Errors
///
/// Returns an error if the roster cannot be read.
pub fn check_in_dry_run<R: Roster + ?Sized>(
    roster: &mut R,
    payload: &ScanPayload,
) -> Result<CheckinOutcome> {
    run(roster, payload, false)
}

fn run<R: Roster + ?Sized>(
    roster: &mut R,
    payload: &ScanPayload,
    commit: bool,
) -> Result<CheckinOutcome> {
    let id = payload.id();

    let Some(entry) = roster.find(id)? else {
        warn!(id = %id, "Scanned identifier not present in roster");
        return Ok(CheckinOutcome::NotFound { id: id.to_string() });
    };

    if entry.verified {
        warn!(id = %id, name = %entry.name, "Duplicate check-in attempt");
        return Ok(CheckinOutcome::Duplicate {
            id: entry.id,
            name: entry.name,
        });
    }

    if commit {
        // Read-then-write with no transaction: a concurrent scanner that read
        // the same unset marker will also land here and also succeed.
        roster.mark_verified(&entry)?;
        info!(id = %id, name = %entry.name, "Check-in recorded");
    }

    Ok(CheckinOutcome::Verified {
        id: entry.id,
        name: entry.name,
        mobile: entry.mobile,
    })
}
