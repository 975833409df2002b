//! Core type definitions used throughout opsift.

use crate::core::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Protocol opcode.
pub type Opcode = u32;

/// Parse an opcode typed as hex, with or without a `0x` prefix.
pub fn parse_opcode(text: &str) -> Result<Opcode> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(Error::InvalidOpcode(text.to_string()));
    }

    u32::from_str_radix(digits, 16).map_err(|_| Error::InvalidOpcode(text.to_string()))
}

/// Format an opcode the way captures tools display it (at least four hex digits).
pub fn format_opcode(opcode: Opcode) -> String {
    format!("{:04X}", opcode)
}

/// What to search for and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Directory searched recursively
    pub root_path: PathBuf,
    /// Lowercase extensions without the leading dot
    pub file_extensions: BTreeSet<String>,
    /// Opcode counted per record
    pub target_opcode: Opcode,
}

impl SearchRequest {
    /// Create a request, normalizing extensions (`.PCAP` -> `pcap`).
    pub fn new<I, S>(root_path: impl Into<PathBuf>, file_extensions: I, target_opcode: Opcode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let file_extensions = file_extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        Self {
            root_path: root_path.into(),
            file_extensions,
            target_opcode,
        }
    }

    /// Check whether a path carries one of the requested extensions.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                self.file_extensions
                    .contains(&ext.to_string_lossy().to_lowercase())
            })
            .unwrap_or(false)
    }
}

/// One decoded protocol record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcapRecord {
    /// Opcodes carried by the record
    pub opcodes: BTreeSet<Opcode>,
    /// Raw fragment payloads, in wire order
    #[serde(default, with = "hex_fragments")]
    pub fragments: Vec<Vec<u8>>,
}

impl PcapRecord {
    /// Create a record with the given opcodes and no fragments.
    pub fn with_opcodes(opcodes: impl IntoIterator<Item = Opcode>) -> Self {
        Self {
            opcodes: opcodes.into_iter().collect(),
            fragments: Vec::new(),
        }
    }

    /// Append a fragment payload.
    pub fn with_fragment(mut self, fragment: impl Into<Vec<u8>>) -> Self {
        self.fragments.push(fragment.into());
        self
    }

    /// Check whether the record carries the opcode.
    pub fn contains(&self, opcode: Opcode) -> bool {
        self.opcodes.contains(&opcode)
    }
}

/// Fragments travel as hex strings in serialized records.
mod hex_fragments {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(fragments: &[Vec<u8>], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(fragments.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<u8>>, D::Error> {
        let encoded = Vec::<String>::deserialize(d)?;
        encoded
            .iter()
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Per-file search result, reported only when `hit_count > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Path of the capture file
    pub file_path: PathBuf,
    /// Number of records containing the target opcode
    pub hit_count: u64,
    /// Size of the capture file in bytes
    pub file_size_bytes: u64,
}

/// Deduplication key of a special marker.
pub type SpecialHit = String;

/// Lifecycle of a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    /// No search in progress
    #[default]
    Idle,
    /// Files are being processed
    Running,
    /// Winding down after a stop request or the last file
    Stopping,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Idle => write!(f, "Idle"),
            ScanState::Running => write!(f, "Running"),
            ScanState::Stopping => write!(f, "Stopping"),
        }
    }
}

/// Incremental progress delivered to the presentation layer.
///
/// `new_outcomes` and `new_special_hits` hold only items not delivered by any
/// earlier snapshot of the same search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Files accounted for so far, including those skipped after a stop
    pub files_processed: u64,
    /// Files found by enumeration
    pub files_total: u64,
    /// Rows produced since the previous snapshot
    pub new_outcomes: Vec<FileOutcome>,
    /// Special markers first seen since the previous snapshot
    pub new_special_hits: Vec<SpecialHit>,
}

impl ProgressSnapshot {
    /// Whether this snapshot carries no new rows or markers.
    pub fn is_empty(&self) -> bool {
        self.new_outcomes.is_empty() && self.new_special_hits.is_empty()
    }

    /// Completion percentage.
    pub fn percentage(&self) -> f64 {
        if self.files_total > 0 {
            (self.files_processed as f64 / self.files_total as f64) * 100.0
        } else {
            100.0
        }
    }
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    /// Search is still running
    Running,
    /// Every file was visited
    Completed,
    /// Search was stopped before every file was visited
    Cancelled,
}

/// Summary of a finished search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSummary {
    /// Unique search identifier
    pub search_id: String,
    /// The request that was searched
    pub request: SearchRequest,
    /// When the search started
    pub start_time: DateTime<Utc>,
    /// When the search ended
    pub end_time: Option<DateTime<Utc>>,
    /// Final status
    pub status: SearchStatus,
    /// Files accounted for
    pub files_processed: u64,
    /// Files that were never decoded because the search was stopped
    pub files_skipped: u64,
    /// Files found by enumeration
    pub files_total: u64,
    /// Every reported row, in delivery order
    pub outcomes: Vec<FileOutcome>,
    /// Every special marker, in first-seen order
    pub special_hits: Vec<SpecialHit>,
}

impl SearchSummary {
    /// Create a new running summary.
    pub fn new(request: SearchRequest, files_total: u64) -> Self {
        Self {
            search_id: uuid::Uuid::new_v4().to_string(),
            request,
            start_time: Utc::now(),
            end_time: None,
            status: SearchStatus::Running,
            files_processed: 0,
            files_skipped: 0,
            files_total,
            outcomes: Vec::new(),
            special_hits: Vec::new(),
        }
    }

    /// Fold one delivered snapshot into the summary.
    pub fn absorb(&mut self, snapshot: &ProgressSnapshot) {
        self.files_processed = snapshot.files_processed;
        self.outcomes.extend(snapshot.new_outcomes.iter().cloned());
        self.special_hits
            .extend(snapshot.new_special_hits.iter().cloned());
    }

    /// Mark the search finished.
    pub fn finish(&mut self, cancelled: bool) {
        self.end_time = Some(Utc::now());
        self.status = if cancelled {
            SearchStatus::Cancelled
        } else {
            SearchStatus::Completed
        };
    }

    /// Total hits across all rows.
    pub fn total_hits(&self) -> u64 {
        self.outcomes.iter().map(|o| o.hit_count).sum()
    }

    /// Search duration in milliseconds.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opcode() {
        assert_eq!(parse_opcode("F7B0").unwrap(), 0xF7B0);
        assert_eq!(parse_opcode("0xf7b0").unwrap(), 0xF7B0);
        assert_eq!(parse_opcode(" 02BB ").unwrap(), 0x02BB);
        assert!(parse_opcode("").is_err());
        assert!(parse_opcode("0x").is_err());
        assert!(parse_opcode("XYZ").is_err());
        assert!(parse_opcode("1FFFFFFFF").is_err());
    }

    #[test]
    fn test_format_opcode() {
        assert_eq!(format_opcode(0x2BB), "02BB");
        assert_eq!(format_opcode(0xF7B0), "F7B0");
        assert_eq!(format_opcode(0x1_0000), "10000");
    }

    #[test]
    fn test_request_extensions_normalized() {
        let request = SearchRequest::new("/captures", [".PCAP", "pcapng", " "], 0xF7B0);
        assert_eq!(request.file_extensions.len(), 2);
        assert!(request.matches_extension(Path::new("/captures/a.pcap")));
        assert!(request.matches_extension(Path::new("/captures/b.PcapNG")));
        assert!(!request.matches_extension(Path::new("/captures/c.txt")));
        assert!(!request.matches_extension(Path::new("/captures/pcap")));
    }

    #[test]
    fn test_record_json_shape() {
        let record = PcapRecord::with_opcodes([0xF7B0]).with_fragment(vec![0xB0, 0xF7, 0, 0]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"opcodes":[63408],"fragments":["b0f70000"]}"#);

        let parsed: PcapRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_snapshot_percentage() {
        let snapshot = ProgressSnapshot {
            files_processed: 1,
            files_total: 4,
            ..Default::default()
        };
        assert_eq!(snapshot.percentage(), 25.0);
        assert!(snapshot.is_empty());
        assert_eq!(ProgressSnapshot::default().percentage(), 100.0);
    }

    #[test]
    fn test_summary_absorb() {
        let request = SearchRequest::new("/captures", ["pcap"], 1);
        let mut summary = SearchSummary::new(request, 2);
        summary.absorb(&ProgressSnapshot {
            files_processed: 2,
            files_total: 2,
            new_outcomes: vec![FileOutcome {
                file_path: PathBuf::from("/captures/a.pcap"),
                hit_count: 3,
                file_size_bytes: 10,
            }],
            new_special_hits: vec!["ABCD".to_string()],
        });
        summary.finish(false);

        assert_eq!(summary.files_processed, 2);
        assert_eq!(summary.total_hits(), 3);
        assert_eq!(summary.special_hits, vec!["ABCD"]);
        assert_eq!(summary.status, SearchStatus::Completed);
        assert!(summary.duration_ms().is_some());
    }
}
