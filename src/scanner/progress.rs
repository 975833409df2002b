//! Search progress tracking and periodic reporting.

use crate::core::types::{format_opcode, FileOutcome, ProgressSnapshot};
use crate::scanner::aggregator::ResultAggregator;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Receives progress snapshots on the reporting cadence.
///
/// Rows and markers in a snapshot are never delivered again; sinks should
/// append them rather than re-query.
pub trait ProgressSink: Send + Sync {
    /// Handle one snapshot.
    fn deliver(&self, snapshot: &ProgressSnapshot);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressSnapshot) + Send + Sync,
{
    fn deliver(&self, snapshot: &ProgressSnapshot) {
        self(snapshot)
    }
}

/// Sink that drops every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn deliver(&self, _snapshot: &ProgressSnapshot) {}
}

/// Per-search counters shared by workers and the reporter.
#[derive(Debug)]
pub struct ScanCounters {
    files_total: AtomicU64,
    files_processed: AtomicU64,
    files_skipped: AtomicU64,
    decode_failures: AtomicU64,
    start_time: RwLock<Instant>,
}

impl Default for ScanCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self {
            files_total: AtomicU64::new(0),
            files_processed: AtomicU64::new(0),
            files_skipped: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            start_time: RwLock::new(Instant::now()),
        }
    }

    /// Reset all counters for a new search over `total` files.
    pub fn reset(&self, total: u64) {
        self.files_total.store(total, Ordering::SeqCst);
        self.files_processed.store(0, Ordering::SeqCst);
        self.files_skipped.store(0, Ordering::SeqCst);
        self.decode_failures.store(0, Ordering::SeqCst);
        if let Ok(mut start) = self.start_time.write() {
            *start = Instant::now();
        }
    }

    /// Count a file the processor visited.
    pub fn increment_processed(&self) {
        self.files_processed.fetch_add(1, Ordering::AcqRel);
    }

    /// Count a file that was never decoded because the search was stopped.
    pub fn increment_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::AcqRel);
    }

    /// Count a file whose decode failed.
    pub fn increment_decode_failures(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Files found by enumeration.
    pub fn files_total(&self) -> u64 {
        self.files_total.load(Ordering::Acquire)
    }

    /// Files accounted for: visited plus skipped.
    pub fn files_accounted(&self) -> u64 {
        let processed = self.files_processed.load(Ordering::Acquire);
        let skipped = self.files_skipped.load(Ordering::Acquire);
        processed + skipped
    }

    /// Files that were never decoded because the search was stopped.
    pub fn files_skipped(&self) -> u64 {
        self.files_skipped.load(Ordering::Acquire)
    }

    /// Files whose decode failed.
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    /// Time since the current search started.
    pub fn elapsed(&self) -> Duration {
        self.start_time
            .read()
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    /// Throughput of the current search so far.
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.files_accounted() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Drains the aggregator into snapshots and hands them to a sink.
pub struct ProgressReporter {
    aggregator: Arc<ResultAggregator>,
    counters: Arc<ScanCounters>,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressReporter {
    /// Create a reporter over shared search state.
    pub fn new(
        aggregator: Arc<ResultAggregator>,
        counters: Arc<ScanCounters>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            aggregator,
            counters,
            sink,
        }
    }

    /// Drain once, deliver the snapshot, and return it.
    pub fn tick(&self) -> ProgressSnapshot {
        // Counters are read after the drain so every drained outcome's file is
        // already included in `files_processed`.
        let drained = self.aggregator.drain_all();
        let files_total = self.counters.files_total();
        let snapshot = ProgressSnapshot {
            files_processed: self.counters.files_accounted().min(files_total),
            files_total,
            new_outcomes: drained.outcomes,
            new_special_hits: drained.special_hits,
        };

        self.sink.deliver(&snapshot);
        snapshot
    }

    /// Tick until a drain comes back empty; returns every snapshot delivered.
    ///
    /// The last snapshot returned is always empty of rows and markers and
    /// carries the final counts.
    pub fn flush(&self) -> Vec<ProgressSnapshot> {
        let mut delivered = Vec::new();
        loop {
            let snapshot = self.tick();
            let done = snapshot.is_empty();
            delivered.push(snapshot);
            if done {
                return delivered;
            }
        }
    }
}

/// Console sink: rows and markers to stdout, a status line to stderr.
pub struct ConsoleProgressReporter {
    target_opcode: u32,
    last_line_length: AtomicUsize,
    show_status: bool,
}

impl ConsoleProgressReporter {
    /// Create a console reporter for a search of `target_opcode`.
    pub fn new(target_opcode: u32) -> Self {
        Self {
            target_opcode,
            last_line_length: AtomicUsize::new(0),
            show_status: true,
        }
    }

    /// Suppress the status line (rows and markers are still printed).
    pub fn quiet(mut self) -> Self {
        self.show_status = false;
        self
    }

    /// Format one result row.
    pub fn format_row(&self, outcome: &FileOutcome) -> String {
        format!(
            "{:>8} x {}  {:>12} bytes  {}",
            outcome.hit_count,
            format_opcode(self.target_opcode),
            outcome.file_size_bytes,
            outcome.file_path.display()
        )
    }

    fn clear_status(&self) {
        let last_len = self.last_line_length.swap(0, Ordering::Relaxed);
        if last_len > 0 {
            eprint!("\r{}\r", " ".repeat(last_len));
        }
    }
}

impl ProgressSink for ConsoleProgressReporter {
    fn deliver(&self, snapshot: &ProgressSnapshot) {
        if !snapshot.is_empty() {
            self.clear_status();
        }
        for outcome in &snapshot.new_outcomes {
            println!("{}", self.format_row(outcome));
        }
        for hit in &snapshot.new_special_hits {
            println!("special: {}", hit);
        }

        if self.show_status {
            let message = format!(
                "\rFiles Processed: {} of {} ({:.1}%)",
                snapshot.files_processed,
                snapshot.files_total,
                snapshot.percentage()
            );
            let last_len = self.last_line_length.load(Ordering::Relaxed);
            let padding = " ".repeat(last_len.saturating_sub(message.len()));
            eprint!("{}{}", message, padding);
            self.last_line_length.store(message.len(), Ordering::Relaxed);
        }
    }
}
