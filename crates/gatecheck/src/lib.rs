//! `gatecheck` - QR-code check-in against a remote spreadsheet roster
//!
//! This library provides the core functionality for decoding QR payloads from
//! images, extracting user identifiers, and marking matching roster entries
//! verified in a remote sheet.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod checkin;
pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod history;
pub mod logging;
pub mod payload;
pub mod roster;
pub mod source;

pub use checkin::{check_in, check_in_dry_run, CheckinOutcome};
pub use config::Config;
pub use error::{Error, Result};
pub use history::{History, HistoryStats, ScanRecord};
pub use logging::init_logging;
pub use payload::ScanPayload;
pub use roster::{MemoryRoster, Roster, RosterEntry, SheetClient};
pub use source::{DirectoryWatchSource, Frame, FrameSource};
