//! QR payload parsing.
//!
//! A decoded QR payload is multi-line text expected to carry an
//! `"ID: <value>"` line. This module extracts and validates the candidate
//! identifier from such a payload.

use regex::Regex;

use crate::error::{Error, Result};

/// Literal prefix marking the identifier line inside a payload.
pub const ID_PREFIX: &str = "ID: ";

/// A parsed QR payload.
///
/// Holds the raw decoded text plus the identifier extracted from it. The raw
/// text is kept for hashing and for the scan history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPayload {
    raw: String,
    id: String,
}

impl ScanPayload {
    /// Parse a decoded payload into an identifier.
    ///
    /// The first line beginning with `"ID: "` supplies the identifier; the
    /// remainder of that line, trimmed, is the candidate value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadFormat`] if no `"ID: "` line exists or the
    /// value after the prefix is empty.
    pub fn parse(raw: &str) -> Result<Self> {
        let id = extract_id(raw)?;
        Ok(Self {
            raw: raw.to_string(),
            id,
        })
    }

    /// Parse a payload and additionally require the identifier to match
    /// a configured pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadFormat`] if parsing fails or the identifier
    /// does not match `pattern`.
    pub fn parse_matching(raw: &str, pattern: Option<&Regex>) -> Result<Self> {
        let payload = Self::parse(raw)?;
        if let Some(re) = pattern {
            if !re.is_match(&payload.id) {
                return Err(Error::payload_format(format!(
                    "identifier '{}' does not match the configured pattern",
                    payload.id
                )));
            }
        }
        Ok(payload)
    }

    /// The extracted identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The raw decoded text.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// BLAKE3 hash of the raw payload, used to deduplicate repeated frames.
    #[must_use]
    pub fn content_hash(&self) -> String {
        hash_payload(&self.raw)
    }
}

/// Compute the BLAKE3 hash of a raw payload.
#[must_use]
pub fn hash_payload(raw: &str) -> String {
    blake3::hash(raw.as_bytes()).to_hex().to_string()
}

/// Extract the candidate identifier from a decoded payload.
///
/// # Errors
///
/// Returns [`Error::PayloadFormat`] if no line starts with `"ID: "` or the
/// value after the prefix is empty.
pub fn extract_id(raw: &str) -> Result<String> {
    let line = raw
        .lines()
        .find(|line| line.starts_with(ID_PREFIX))
        .ok_or_else(|| {
            Error::payload_format(format!("no line starting with '{}'", ID_PREFIX.trim_end()))
        })?;

    let id = line[ID_PREFIX.len()..].trim();
    if id.is_empty() {
        return Err(Error::payload_format("identifier value is empty"));
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_id_from_multiline_payload() {
        let id = extract_id("ID: 42\nName: X").unwrap();
        assert_eq!(id, "42");
    }

    #[test]
    fn test_extract_id_skips_earlier_lines() {
        let id = extract_id("Event: Meetup\nID: guest-7\nName: Y").unwrap();
        assert_eq!(id, "guest-7");
    }

    #[test]
    fn test_extract_id_takes_first_matching_line() {
        let id = extract_id("ID: first\nID: second").unwrap();
        assert_eq!(id, "first");
    }

    #[test]
    fn test_extract_id_trims_value() {
        let id = extract_id("ID:   42  \n").unwrap();
        assert_eq!(id, "42");
    }

    #[test]
    fn test_extract_id_missing_line() {
        let err = extract_id("Name: X\nMobile: 123").unwrap_err();
        assert!(matches!(err, Error::PayloadFormat { .. }));
    }

    #[test]
    fn test_extract_id_requires_prefix_space() {
        // "ID:42" lacks the literal "ID: " prefix
        let err = extract_id("ID:42").unwrap_err();
        assert!(matches!(err, Error::PayloadFormat { .. }));
    }

    #[test]
    fn test_extract_id_empty_value() {
        let err = extract_id("ID:   \nName: X").unwrap_err();
        assert!(matches!(err, Error::PayloadFormat { .. }));
    }

    #[test]
    fn test_extract_id_empty_payload() {
        assert!(extract_id("").is_err());
    }

    #[test]
    fn test_parse_keeps_raw() {
        let payload = ScanPayload::parse("ID: 42\nName: X").unwrap();
        assert_eq!(payload.id(), "42");
        assert_eq!(payload.raw(), "ID: 42\nName: X");
    }

    #[test]
    fn test_parse_matching_accepts() {
        let re = Regex::new(r"^\d+$").unwrap();
        let payload = ScanPayload::parse_matching("ID: 42", Some(&re)).unwrap();
        assert_eq!(payload.id(), "42");
    }

    #[test]
    fn test_parse_matching_rejects() {
        let re = Regex::new(r"^\d+$").unwrap();
        let err = ScanPayload::parse_matching("ID: guest-42", Some(&re)).unwrap_err();
        assert!(matches!(err, Error::PayloadFormat { .. }));
    }

    #[test]
    fn test_parse_matching_no_pattern() {
        let payload = ScanPayload::parse_matching("ID: anything", None).unwrap();
        assert_eq!(payload.id(), "anything");
    }

    #[test]
    fn test_hash_consistency() {
        let h1 = hash_payload("ID: 42");
        let h2 = hash_payload("ID: 42");
        assert_eq!(h1, h2);
        assert_ne!(h1, hash_payload("ID: 43"));
    }

    #[test]
    fn test_content_hash_matches_raw_hash() {
        let payload = ScanPayload::parse("ID: 42\nName: X").unwrap();
        assert_eq!(payload.content_hash(), hash_payload("ID: 42\nName: X"));
    }
}
