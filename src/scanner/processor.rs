//! Per-file opcode search.

use crate::core::error::{Error, Result};
use crate::core::types::{FileOutcome, Opcode, PcapRecord};
use crate::scanner::aggregator::ResultAggregator;
use crate::scanner::catalog::CatalogEntry;
use crate::scanner::inspect::InspectorSet;
use crate::scanner::progress::ScanCounters;
use crate::scanner::source::RecordSource;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileVisit {
    /// The search was already stopped; the file was not opened.
    Skipped,
    /// The search was stopped while the file was decoding; results discarded.
    Cancelled,
    /// The file was searched (a failed decode counts as zero hits).
    Searched { hit_count: u64 },
}

/// Searches single files and feeds the shared aggregator.
pub struct FileProcessor {
    source: Arc<dyn RecordSource>,
    inspectors: Arc<InspectorSet>,
    aggregator: Arc<ResultAggregator>,
    counters: Arc<ScanCounters>,
    target_opcode: Opcode,
}

impl FileProcessor {
    /// Create a processor for one search.
    pub fn new(
        source: Arc<dyn RecordSource>,
        inspectors: Arc<InspectorSet>,
        aggregator: Arc<ResultAggregator>,
        counters: Arc<ScanCounters>,
        target_opcode: Opcode,
    ) -> Self {
        Self {
            source,
            inspectors,
            aggregator,
            counters,
            target_opcode,
        }
    }

    /// Search one file.
    ///
    /// Never fails: decode errors (and decoder panics) degrade the file to
    /// zero hits. Every visit except [`FileVisit::Skipped`] increments the
    /// processed counter exactly once, before any outcome is published.
    pub fn process(&self, entry: &CatalogEntry, cancelled: &AtomicBool) -> FileVisit {
        if cancelled.load(Ordering::Relaxed) {
            return FileVisit::Skipped;
        }

        let records = match self.decode(entry) {
            Ok(records) => records,
            Err(e) => {
                log::debug!("Treating {:?} as empty: {}", entry.path, e);
                self.counters.increment_decode_failures();
                Vec::new()
            }
        };

        if cancelled.load(Ordering::Relaxed) {
            self.counters.increment_processed();
            return FileVisit::Cancelled;
        }

        let hit_count = self.search(entry, &records);

        self.counters.increment_processed();

        if hit_count > 0 {
            self.aggregator.add(FileOutcome {
                file_path: entry.path.clone(),
                hit_count,
                file_size_bytes: entry.size,
            });
        }

        FileVisit::Searched { hit_count }
    }

    fn decode(&self, entry: &CatalogEntry) -> Result<Vec<PcapRecord>> {
        catch_unwind(AssertUnwindSafe(|| self.source.decode(&entry.path)))
            .unwrap_or_else(|_| Err(Error::decode(&entry.path, "decoder panicked")))
    }

    /// Count records carrying the target opcode and run the inspectors.
    ///
    /// A panicking inspector loses only the fragment it was looking at.
    fn search(&self, entry: &CatalogEntry, records: &[PcapRecord]) -> u64 {
        let mut hits = 0;
        for record in records {
            if record.contains(self.target_opcode) {
                hits += 1;
            }
            for fragment in &record.fragments {
                let inspected = catch_unwind(AssertUnwindSafe(|| {
                    self.inspectors.inspect_fragment(fragment, |hit| {
                        self.aggregator.add_special(hit);
                    });
                }));
                if inspected.is_err() {
                    log::warn!("Inspector panicked on a fragment of {:?}", entry.path);
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::inspect::MessageCensus;
    use std::path::{Path, PathBuf};

    const OPCODE: Opcode = 0xF7B0;

    fn entry(name: &str) -> CatalogEntry {
        CatalogEntry {
            path: PathBuf::from(name),
            size: 1234,
        }
    }

    fn fragment(code: u32, len: usize) -> Vec<u8> {
        let mut bytes = code.to_le_bytes().to_vec();
        bytes.resize(len, 0xAA);
        bytes
    }

    struct Harness {
        processor: FileProcessor,
        aggregator: Arc<ResultAggregator>,
        counters: Arc<ScanCounters>,
    }

    fn harness(source: impl RecordSource + 'static) -> Harness {
        let aggregator = Arc::new(ResultAggregator::new());
        let counters = Arc::new(ScanCounters::new());
        let mut inspectors = InspectorSet::new();
        inspectors.register_any(MessageCensus);

        let processor = FileProcessor::new(
            Arc::new(source),
            Arc::new(inspectors),
            Arc::clone(&aggregator),
            Arc::clone(&counters),
            OPCODE,
        );
        counters.reset(1);
        Harness {
            processor,
            aggregator,
            counters,
        }
    }

    #[test]
    fn test_hits_counted_once_per_record() {
        let h = harness(|_: &Path| -> Result<Vec<PcapRecord>> {
            Ok(vec![
                PcapRecord::with_opcodes([OPCODE, 0x02BB]),
                PcapRecord::with_opcodes([0x02BB]),
                PcapRecord::with_opcodes([OPCODE]),
            ])
        });

        let visit = h.processor.process(&entry("a.pcap"), &AtomicBool::new(false));
        assert_eq!(visit, FileVisit::Searched { hit_count: 2 });
        assert_eq!(h.counters.files_accounted(), 1);

        let drained = h.aggregator.drain_all();
        assert_eq!(
            drained.outcomes,
            vec![FileOutcome {
                file_path: PathBuf::from("a.pcap"),
                hit_count: 2,
                file_size_bytes: 1234,
            }]
        );
    }

    #[test]
    fn test_zero_hits_not_reported() {
        let h = harness(|_: &Path| -> Result<Vec<PcapRecord>> {
            Ok(vec![PcapRecord::with_opcodes([0x02BB])])
        });

        let visit = h.processor.process(&entry("a.pcap"), &AtomicBool::new(false));
        assert_eq!(visit, FileVisit::Searched { hit_count: 0 });
        assert_eq!(h.counters.files_accounted(), 1);
        assert!(h.aggregator.drain_all().outcomes.is_empty());
    }

    #[test]
    fn test_decode_failure_is_zero_hits() {
        let h = harness(|path: &Path| -> Result<Vec<PcapRecord>> {
            Err(Error::decode(path, "truncated"))
        });

        let visit = h.processor.process(&entry("bad.pcap"), &AtomicBool::new(false));
        assert_eq!(visit, FileVisit::Searched { hit_count: 0 });
        assert_eq!(h.counters.files_accounted(), 1);
        assert_eq!(h.counters.decode_failures(), 1);
        assert!(h.aggregator.drain_all().is_empty());
    }

    #[test]
    fn test_decoder_panic_is_isolated() {
        let h = harness(|_: &Path| -> Result<Vec<PcapRecord>> { panic!("corrupt block") });

        let visit = h.processor.process(&entry("panic.pcap"), &AtomicBool::new(false));
        assert_eq!(visit, FileVisit::Searched { hit_count: 0 });
        assert_eq!(h.counters.files_accounted(), 1);
        assert_eq!(h.counters.decode_failures(), 1);
    }

    #[test]
    fn test_cancelled_before_decode_is_skipped() {
        let h = harness(|_: &Path| -> Result<Vec<PcapRecord>> {
            panic!("must not decode after cancellation")
        });

        let visit = h.processor.process(&entry("a.pcap"), &AtomicBool::new(true));
        assert_eq!(visit, FileVisit::Skipped);
        assert_eq!(h.counters.files_accounted(), 0);
    }

    #[test]
    fn test_cancelled_during_decode_discards_results() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let h = harness(move |_: &Path| -> Result<Vec<PcapRecord>> {
            flag.store(true, Ordering::Relaxed);
            Ok(vec![PcapRecord::with_opcodes([OPCODE]).with_fragment(fragment(0x02BB, 24))])
        });

        let visit = h.processor.process(&entry("a.pcap"), &cancelled);
        assert_eq!(visit, FileVisit::Cancelled);
        assert_eq!(h.counters.files_accounted(), 1);
        assert!(h.aggregator.drain_all().is_empty());
    }

    #[test]
    fn test_inspector_panic_keeps_hits_and_other_fragments() {
        let aggregator = Arc::new(ResultAggregator::new());
        let counters = Arc::new(ScanCounters::new());
        let mut inspectors = InspectorSet::new();
        inspectors.register(0xDEAD, |_: u32, _: &[u8]| -> Option<String> {
            panic!("bad marker layout")
        });
        inspectors.register_any(MessageCensus);

        let source = |_: &Path| -> Result<Vec<PcapRecord>> {
            Ok(vec![
                PcapRecord::with_opcodes([OPCODE]).with_fragment(fragment(0xDEAD, 24)),
                PcapRecord::with_opcodes([OPCODE]).with_fragment(fragment(0x02BB, 24)),
            ])
        };
        let processor = FileProcessor::new(
            Arc::new(source),
            Arc::new(inspectors),
            Arc::clone(&aggregator),
            Arc::clone(&counters),
            OPCODE,
        );
        counters.reset(1);

        let visit = processor.process(&entry("a.pcap"), &AtomicBool::new(false));
        assert_eq!(visit, FileVisit::Searched { hit_count: 2 });

        let drained = aggregator.drain_all();
        assert_eq!(drained.outcomes.len(), 1);
        assert_eq!(drained.outcomes[0].hit_count, 2);
        assert_eq!(drained.special_hits, vec!["02BB"]);
    }

    #[test]
    fn test_short_fragments_not_inspected() {
        let h = harness(|_: &Path| -> Result<Vec<PcapRecord>> {
            Ok(vec![PcapRecord::default()
                .with_fragment(fragment(0x02BB, 20))
                .with_fragment(fragment(0xF7E0, 21))])
        });

        h.processor.process(&entry("a.pcap"), &AtomicBool::new(false));
        assert_eq!(h.aggregator.drain_all().special_hits, vec!["F7E0"]);
    }
}
