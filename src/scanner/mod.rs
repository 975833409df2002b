//! Capture search engine.
//!
//! This module provides:
//! - Extension-filtered enumeration of capture files
//! - Per-file opcode counting with cooperative cancellation
//! - Pluggable special marker inspectors keyed by message code
//! - Lock-free aggregation of results from parallel workers
//! - Periodic progress snapshots and the search lifecycle

pub mod aggregator;
pub mod catalog;
pub mod coordinator;
pub mod inspect;
pub mod processor;
pub mod progress;
pub mod source;

pub use aggregator::{Drained, ResultAggregator};
pub use catalog::{CatalogEntry, FileCatalog};
pub use coordinator::SearchCoordinator;
pub use inspect::{GameEventInspector, InspectorSet, MessageCensus, OpcodeInspector};
pub use processor::{FileProcessor, FileVisit};
pub use progress::{ConsoleProgressReporter, NullSink, ProgressReporter, ProgressSink, ScanCounters};
pub use source::{JsonLinesSource, RecordSource};
