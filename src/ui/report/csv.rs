//! CSV export of search results for spreadsheet analysis.

use crate::core::error::Result;
use crate::core::types::{format_opcode, SearchSummary};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// CSV exporter for search summaries.
pub struct CsvExporter {
    /// Delimiter character
    delimiter: char,
    /// Include header row
    include_header: bool,
}

impl CsvExporter {
    /// Create a new CSV exporter.
    pub fn new() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }

    /// Set the delimiter character.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set whether to include headers.
    pub fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    /// Export a search summary to `output_path`.
    pub fn export(&self, summary: &SearchSummary, output_path: &Path) -> Result<()> {
        let mut file = BufWriter::new(File::create(output_path)?);
        self.write_summary(summary, &mut file)?;
        file.flush()?;
        Ok(())
    }

    /// Write the summary header comments, result rows and special markers.
    pub fn write_summary(&self, summary: &SearchSummary, out: &mut impl Write) -> Result<()> {
        let d = self.delimiter;
        let opcode = format_opcode(summary.request.target_opcode);

        writeln!(out, "# opsift search report")?;
        writeln!(out, "# Search ID: {}", summary.search_id)?;
        writeln!(out, "# Root: {}", summary.request.root_path.display())?;
        writeln!(out, "# Opcode: {}", opcode)?;
        writeln!(out, "# Status: {:?}", summary.status)?;
        writeln!(out, "# Start Time: {}", summary.start_time)?;
        if let Some(end_time) = summary.end_time {
            writeln!(out, "# End Time: {}", end_time)?;
        }
        writeln!(
            out,
            "# Files Processed: {} of {}",
            summary.files_processed, summary.files_total
        )?;
        writeln!(out, "# Files Skipped: {}", summary.files_skipped)?;
        writeln!(out)?;

        if self.include_header {
            writeln!(out, "Hits{d}Opcode{d}Size Bytes{d}Path")?;
        }
        for outcome in &summary.outcomes {
            writeln!(
                out,
                "{}{d}{}{d}{}{d}{}",
                outcome.hit_count,
                opcode,
                outcome.file_size_bytes,
                self.escape_csv(&outcome.file_path.display().to_string()),
            )?;
        }

        if !summary.special_hits.is_empty() {
            writeln!(out)?;
            if self.include_header {
                writeln!(out, "Special")?;
            }
            for hit in &summary.special_hits {
                writeln!(out, "{}", self.escape_csv(hit))?;
            }
        }

        Ok(())
    }

    /// Escape a CSV field, quoting it if it holds the active delimiter.
    fn escape_csv(&self, field: &str) -> String {
        if field.contains(self.delimiter)
            || field.contains('"')
            || field.contains('\n')
            || field.contains('\r')
        {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}
