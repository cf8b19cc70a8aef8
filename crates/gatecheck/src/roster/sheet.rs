//! Remote sheet client.
//!
//! Talks to a spreadsheet-style HTTP API: one bulk read of the worksheet's
//! values, and single-cell updates to set the `Verified` marker. Requests are
//! synchronous (`ureq`) with bearer-token auth; every scan is a fresh
//! read-then-write pass with no atomicity across scanners.

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::SheetConfig;
use crate::error::{Error, Result};

use super::{parse_verified_cell, Roster, RosterEntry, VERIFIED_MARK};

/// Column indices located from the worksheet header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetColumns {
    /// Index of the `ID` column.
    pub id: usize,
    /// Index of the `Name` column.
    pub name: usize,
    /// Index of the `Mobile` column.
    pub mobile: usize,
    /// Index of the `Verified` column.
    pub verified: usize,
}

/// Response body of a bulk values read.
#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// HTTP client for the remote roster sheet.
pub struct SheetClient {
    config: SheetConfig,
    agent: ureq::Agent,
    token: String,
    /// Column layout discovered by the last fetch.
    columns: Option<SheetColumns>,
}

impl std::fmt::Debug for SheetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The bearer token stays out of debug output
        f.debug_struct("SheetClient")
            .field("endpoint", &self.config.endpoint)
            .field("spreadsheet_id", &self.config.spreadsheet_id)
            .field("worksheet", &self.config.worksheet)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

impl SheetClient {
    /// Build a client from configuration.
    ///
    /// Reads the bearer token from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialsMissing`] if no token is available.
    pub fn connect(config: &SheetConfig) -> Result<Self> {
        let token = config.token()?;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout())
            .timeout_read(config.request_timeout())
            .timeout_write(config.request_timeout())
            .build();

        Ok(Self {
            config: config.clone(),
            agent,
            token,
            columns: None,
        })
    }

    /// URL of the bulk values read for the configured worksheet.
    fn values_url(&self) -> String {
        format!(
            "{}/{}/values/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.spreadsheet_id,
            encode_range(&self.config.worksheet)
        )
    }

    /// URL of a single-cell update.
    fn cell_url(&self, column: usize, row: usize) -> String {
        let range = format!("{}!{}{}", self.config.worksheet, column_letter(column), row);
        format!(
            "{}/{}/values/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.spreadsheet_id,
            encode_range(&range)
        )
    }

    /// Map a ureq error onto the crate error taxonomy.
    fn request_error(&self, err: ureq::Error) -> Error {
        match err {
            ureq::Error::Status(401 | 403, resp) => Error::CredentialsRejected {
                status: resp.status(),
            },
            ureq::Error::Status(404, _) => Error::WorksheetNotFound {
                spreadsheet_id: self.config.spreadsheet_id.clone(),
                worksheet: self.config.worksheet.clone(),
            },
            ureq::Error::Status(status, resp) => {
                let message = resp
                    .into_string()
                    .unwrap_or_else(|_| "unreadable response body".to_string());
                Error::SheetRequest { status, message }
            }
            ureq::Error::Transport(transport) => Error::sheet_transport(transport.to_string()),
        }
    }
}

impl Roster for SheetClient {
    fn entries(&mut self) -> Result<Vec<RosterEntry>> {
        let url = self.values_url();
        debug!("Fetching roster values from {}", url);

        let response = self
            .agent
            .get(&url)
            .set("authorization", &format!("Bearer {}", self.token))
            .call()
            .map_err(|err| self.request_error(err))?;

        let body = response
            .into_string()
            .map_err(|err| Error::sheet_transport(err.to_string()))?;
        let parsed: ValuesResponse = serde_json::from_str(&body)?;

        let (entries, columns) = entries_from_values(&parsed.values)?;
        self.columns = Some(columns);
        info!("Fetched {} roster entries", entries.len());
        Ok(entries)
    }

    fn mark_verified(&mut self, entry: &RosterEntry) -> Result<()> {
        let columns = self.columns.ok_or_else(|| {
            Error::internal("mark_verified called before the roster was fetched")
        })?;

        let url = self.cell_url(columns.verified, entry.row);
        let body = serde_json::json!({ "values": [[VERIFIED_MARK]] }).to_string();
        debug!("Updating verified cell at {}", url);

        self.agent
            .put(&url)
            .query("valueInputOption", "RAW")
            .set("authorization", &format!("Bearer {}", self.token))
            .set("content-type", "application/json")
            .send_string(&body)
            .map_err(|err| self.request_error(err))?;

        info!(id = %entry.id, row = entry.row, "Marked entry verified");
        Ok(())
    }
}

/// Locate the required columns in a worksheet header row.
///
/// Matching is case-insensitive on the trimmed header text.
///
/// # Errors
///
/// Returns [`Error::ColumnMissing`] naming the first absent column.
pub fn locate_columns(header: &[String]) -> Result<SheetColumns> {
    let find = |name: &str| {
        header
            .iter()
            .position(|cell| cell.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::ColumnMissing {
                column: name.to_string(),
            })
    };

    Ok(SheetColumns {
        id: find("ID")?,
        name: find("Name")?,
        mobile: find("Mobile")?,
        verified: find("Verified")?,
    })
}

/// Convert raw worksheet values into roster entries.
///
/// The first row is the header; data rows start at sheet row 2. Rows with an
/// empty `ID` cell are skipped. Short rows are padded with empty cells.
///
/// # Errors
///
/// Returns an error if the values are empty or a required column is missing.
pub fn entries_from_values(values: &[Vec<String>]) -> Result<(Vec<RosterEntry>, SheetColumns)> {
    let header = values.first().ok_or_else(|| Error::ColumnMissing {
        column: "ID".to_string(),
    })?;
    let columns = locate_columns(header)?;

    let cell = |row: &Vec<String>, index: usize| -> String {
        row.get(index).map(|s| s.trim().to_string()).unwrap_or_default()
    };

    let entries = values
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(index, row)| {
            let id = cell(row, columns.id);
            if id.is_empty() {
                return None;
            }
            Some(RosterEntry {
                row: index + 1, // values are 0-indexed, sheet rows are 1-indexed
                id,
                name: cell(row, columns.name),
                mobile: cell(row, columns.mobile),
                verified: parse_verified_cell(&cell(row, columns.verified)),
            })
        })
        .collect();

    Ok((entries, columns))
}

/// Convert a 0-based column index to a sheet column letter (`0` -> `A`).
#[must_use]
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = index + 1;
    while remaining > 0 {
        let digit = (remaining - 1) % 26;
        letters.push(b'A' + u8::try_from(digit).unwrap_or(0));
        remaining = (remaining - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_else(|_| "A".to_string())
}

/// Percent-encode the characters a sheet range can contain that are not
/// URL-path safe.
fn encode_range(range: &str) -> String {
    range
        .replace('%', "%25")
        .replace(' ', "%20")
        .replace('!', "%21")
        .replace('\'', "%27")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_locate_columns() {
        let header = row(&["ID", "Name", "Mobile", "Verified"]);
        let columns = locate_columns(&header).unwrap();
        assert_eq!(columns.id, 0);
        assert_eq!(columns.verified, 3);
    }

    #[test]
    fn test_locate_columns_case_insensitive_any_order() {
        let header = row(&["name", " verified ", "id", "MOBILE"]);
        let columns = locate_columns(&header).unwrap();
        assert_eq!(columns.name, 0);
        assert_eq!(columns.verified, 1);
        assert_eq!(columns.id, 2);
        assert_eq!(columns.mobile, 3);
    }

    #[test]
    fn test_locate_columns_missing() {
        let header = row(&["ID", "Name", "Mobile"]);
        let err = locate_columns(&header).unwrap_err();
        assert!(matches!(err, Error::ColumnMissing { column } if column == "Verified"));
    }

    #[test]
    fn test_entries_from_values() {
        let values = vec![
            row(&["ID", "Name", "Mobile", "Verified"]),
            row(&["42", "Ada", "555-0042", ""]),
            row(&["43", "Grace", "555-0043", "TRUE"]),
        ];

        let (entries, columns) = entries_from_values(&values).unwrap();
        assert_eq!(columns.verified, 3);
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].row, 2);
        assert_eq!(entries[0].id, "42");
        assert!(!entries[0].verified);

        assert_eq!(entries[1].row, 3);
        assert_eq!(entries[1].name, "Grace");
        assert!(entries[1].verified);
    }

    #[test]
    fn test_entries_from_values_skips_blank_ids() {
        let values = vec![
            row(&["ID", "Name", "Mobile", "Verified"]),
            row(&["", "Nobody", "", ""]),
            row(&["44", "Edsger", "555-0044", "no"]),
        ];

        let (entries, _) = entries_from_values(&values).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "44");
        assert_eq!(entries[0].row, 3); // sheet row is preserved, not compacted
        assert!(!entries[0].verified);
    }

    #[test]
    fn test_entries_from_values_pads_short_rows() {
        let values = vec![
            row(&["ID", "Name", "Mobile", "Verified"]),
            row(&["45"]),
        ];

        let (entries, _) = entries_from_values(&values).unwrap();
        assert_eq!(entries[0].name, "");
        assert_eq!(entries[0].mobile, "");
        assert!(!entries[0].verified);
    }

    #[test]
    fn test_entries_from_values_empty() {
        let err = entries_from_values(&[]).unwrap_err();
        assert!(matches!(err, Error::ColumnMissing { .. }));
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(3), "D");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
    }

    #[test]
    fn test_encode_range() {
        assert_eq!(encode_range("Sheet1!D3"), "Sheet1%21D3");
        assert_eq!(encode_range("Guest List"), "Guest%20List");
    }

    #[test]
    fn test_values_response_deserializes() {
        let parsed: ValuesResponse =
            serde_json::from_str(r#"{"range":"Sheet1","values":[["ID"],["42"]]}"#).unwrap();
        assert_eq!(parsed.values.len(), 2);

        // An empty worksheet omits "values" entirely
        let empty: ValuesResponse = serde_json::from_str(r#"{"range":"Sheet1"}"#).unwrap();
        assert!(empty.values.is_empty());
    }
}
