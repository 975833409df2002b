//! opsift: parallel, cancellable opcode search across packet capture files.
//!
//! A [`SearchCoordinator`](scanner::SearchCoordinator) walks a directory tree,
//! decodes every capture through a pluggable
//! [`RecordSource`](scanner::RecordSource), counts the records carrying a
//! target opcode, and surfaces deduplicated special markers found by
//! [`OpcodeInspector`](scanner::OpcodeInspector)s. Partial results are
//! delivered as [`ProgressSnapshot`]s while the search runs.

pub mod core;
pub mod scanner;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use crate::core::config::Config;
pub use crate::core::error::{Error, Result};
pub use crate::core::types::*;
