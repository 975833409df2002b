//! Capture decoding boundary.
//!
//! Decoding a capture into protocol records is delegated to a [`RecordSource`].
//! The scanner treats every decode failure the same way: the file is searched
//! as if it held no records.

use crate::core::error::{Error, Result};
use crate::core::types::PcapRecord;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Decodes one capture file into its protocol records.
///
/// Implementations are shared across worker threads and may block on I/O.
pub trait RecordSource: Send + Sync {
    /// Decode every record in `path`, in capture order.
    fn decode(&self, path: &Path) -> Result<Vec<PcapRecord>>;
}

impl<F> RecordSource for F
where
    F: Fn(&Path) -> Result<Vec<PcapRecord>> + Send + Sync,
{
    fn decode(&self, path: &Path) -> Result<Vec<PcapRecord>> {
        self(path)
    }
}

/// Reads records dumped by an external decoder as JSON lines.
///
/// Each non-blank line is one record:
/// `{"opcodes":[63408],"fragments":["b0f7000001000000..."]}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesSource;

impl JsonLinesSource {
    /// Create a new JSON lines reader.
    pub fn new() -> Self {
        Self
    }
}

impl RecordSource for JsonLinesSource {
    fn decode(&self, path: &Path) -> Result<Vec<PcapRecord>> {
        let file = File::open(path).map_err(|e| Error::file_read(path, e))?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::file_read(path, e))?;
            if line.trim().is_empty() {
                continue;
            }

            let record: PcapRecord = serde_json::from_str(&line)
                .map_err(|e| Error::decode(path, format!("line {}: {}", index + 1, e)))?;
            records.push(record);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_json_lines_decode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, r#"{{"opcodes":[1,2],"fragments":[]}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"opcodes":[],"fragments":["00ff"]}}"#).unwrap();

        let records = JsonLinesSource::new().decode(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].contains(2));
        assert_eq!(records[1].fragments, vec![vec![0x00, 0xFF]]);
    }

    #[test]
    fn test_json_lines_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.jsonl");
        std::fs::write(&path, "{\"opcodes\":[1]\nnot json\n").unwrap();

        let err = JsonLinesSource::new().decode(&path).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_json_lines_missing_file() {
        let err = JsonLinesSource::new()
            .decode(Path::new("/definitely/not/here.jsonl"))
            .unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_closure_source() {
        let source = |_: &Path| -> Result<Vec<PcapRecord>> {
            Ok(vec![PcapRecord::with_opcodes([7])])
        };
        let records = source.decode(Path::new("ignored")).unwrap();
        assert!(records[0].contains(7));
    }
}
