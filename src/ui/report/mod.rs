//! Export of search summaries.

pub mod csv;

use crate::core::error::{Error, Result};
use crate::core::types::SearchSummary;
use std::path::Path;

pub use csv::CsvExporter;

/// Report format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Json,
}

impl ReportFormat {
    /// Pick a format from a file extension; anything but `.json` is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Csv,
        }
    }
}

/// Write a search summary to `output_path`.
pub fn generate_report(
    summary: &SearchSummary,
    format: ReportFormat,
    output_path: &Path,
) -> Result<()> {
    match format {
        ReportFormat::Csv => CsvExporter::new().export(summary, output_path),
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(summary)?;
            std::fs::write(output_path, json).map_err(|e| Error::Io(e.to_string()))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SearchRequest;

    #[test]
    fn test_format_from_path() {
        assert_eq!(ReportFormat::from_path(Path::new("out.JSON")), ReportFormat::Json);
        assert_eq!(ReportFormat::from_path(Path::new("out.csv")), ReportFormat::Csv);
        assert_eq!(ReportFormat::from_path(Path::new("out")), ReportFormat::Csv);
    }

    #[test]
    fn test_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let summary = SearchSummary::new(SearchRequest::new("/captures", ["pcap"], 0x02BB), 0);

        generate_report(&summary, ReportFormat::Json, &path).unwrap();
        let parsed: SearchSummary =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.search_id, summary.search_id);
    }
}
