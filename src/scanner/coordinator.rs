//! Search lifecycle: start, stop, worker pool and periodic reporting.

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{format_opcode, ScanState, SearchRequest, SearchSummary};
use crate::scanner::aggregator::ResultAggregator;
use crate::scanner::catalog::{CatalogEntry, FileCatalog};
use crate::scanner::inspect::InspectorSet;
use crate::scanner::processor::{FileProcessor, FileVisit};
use crate::scanner::progress::{NullSink, ProgressReporter, ProgressSink, ScanCounters};
use crate::scanner::source::RecordSource;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Runs one search at a time over a worker pool.
///
/// `start` returns once the files are enumerated and handed to the pool;
/// progress then flows to the configured [`ProgressSink`] every
/// `scan.report_interval_ms` until the search winds down to
/// [`ScanState::Idle`]. Must be used from within a Tokio runtime.
pub struct SearchCoordinator {
    config: Arc<Config>,
    catalog: FileCatalog,
    source: Arc<dyn RecordSource>,
    inspectors: Arc<InspectorSet>,
    sink: Arc<dyn ProgressSink>,
    aggregator: Arc<ResultAggregator>,
    counters: Arc<ScanCounters>,
    cancelled: Arc<AtomicBool>,
    state: Arc<watch::Sender<ScanState>>,
    driver: AsyncMutex<Option<JoinHandle<SearchSummary>>>,
}

impl SearchCoordinator {
    /// Create a coordinator decoding files with `source`.
    ///
    /// Inspectors default to the built-ins selected in `config.inspect`.
    pub fn new(config: Arc<Config>, source: Arc<dyn RecordSource>) -> Self {
        let (state, _) = watch::channel(ScanState::Idle);
        Self {
            catalog: FileCatalog::new().with_follow_symlinks(config.scan.follow_symlinks),
            inspectors: Arc::new(InspectorSet::from_config(&config.inspect)),
            config,
            source,
            sink: Arc::new(NullSink),
            aggregator: Arc::new(ResultAggregator::new()),
            counters: Arc::new(ScanCounters::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
            state: Arc::new(state),
            driver: AsyncMutex::new(None),
        }
    }

    /// Replace the marker inspectors.
    pub fn with_inspectors(mut self, inspectors: InspectorSet) -> Self {
        self.inspectors = Arc::new(inspectors);
        self
    }

    /// Deliver progress snapshots to `sink`.
    pub fn with_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ScanState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state.subscribe()
    }

    /// Check if a stop has been requested for the current search.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Start a search.
    ///
    /// Fails with [`Error::AlreadyRunning`] unless idle, and with a path error
    /// if the root cannot be enumerated; in both cases nothing changes.
    pub async fn start(&self, request: SearchRequest) -> Result<()> {
        let mut driver = self.driver.lock().await;
        if self.state() != ScanState::Idle {
            return Err(Error::AlreadyRunning);
        }

        let catalog = self.catalog.clone();
        let enumerate_request = request.clone();
        let entries = tokio::task::spawn_blocking(move || catalog.enumerate(&enumerate_request))
            .await
            .map_err(|e| Error::Internal(format!("File enumeration task failed: {}", e)))??;

        let total = entries.len() as u64;
        self.aggregator.reset();
        self.counters.reset(total);

        log::info!(
            "Searching {} file(s) under {:?} for opcode {}",
            total,
            request.root_path,
            format_opcode(request.target_opcode)
        );

        let processor = FileProcessor::new(
            Arc::clone(&self.source),
            Arc::clone(&self.inspectors),
            Arc::clone(&self.aggregator),
            Arc::clone(&self.counters),
            request.target_opcode,
        );
        let task = SearchTask {
            entries,
            workers: self.config.scan.workers(),
            interval: self.config.scan.report_interval(),
            processor: Arc::new(processor),
            reporter: ProgressReporter::new(
                Arc::clone(&self.aggregator),
                Arc::clone(&self.counters),
                Arc::clone(&self.sink),
            ),
            counters: Arc::clone(&self.counters),
            cancelled: Arc::clone(&self.cancelled),
            state: Arc::clone(&self.state),
            summary: SearchSummary::new(request, total),
        };

        self.state.send_modify(|state| {
            self.cancelled.store(false, Ordering::SeqCst);
            *state = ScanState::Running;
        });
        *driver = Some(tokio::spawn(task.run()));
        Ok(())
    }

    /// Request the running search to stop.
    ///
    /// Files already decoding finish their current step; files not yet
    /// started are skipped. Has no effect unless running.
    pub fn stop(&self) {
        // The flag is raised under the state lock so a stop racing a search
        // that just finished can never leak into the next `start`.
        let stopped = self.state.send_if_modified(|state| {
            if *state == ScanState::Running {
                *state = ScanState::Stopping;
                self.cancelled.store(true, Ordering::SeqCst);
                true
            } else {
                false
            }
        });

        if stopped {
            log::info!("Stop requested; waiting for in-flight files");
        }
    }

    /// Wait for the most recently started search to reach idle.
    ///
    /// Not cancel-safe: dropping the future detaches the search, which still
    /// runs to completion but whose summary is lost.
    pub async fn wait(&self) -> Result<SearchSummary> {
        let handle = self.driver.lock().await.take().ok_or(Error::NoSearch)?;
        handle
            .await
            .map_err(|e| Error::Internal(format!("Search task failed: {}", e)))
    }

    /// Start a search and wait for it to finish.
    pub async fn run(&self, request: SearchRequest) -> Result<SearchSummary> {
        self.start(request).await?;
        self.wait().await
    }
}

/// State moved into the background task of one search.
struct SearchTask {
    entries: Vec<CatalogEntry>,
    workers: usize,
    interval: Duration,
    processor: Arc<FileProcessor>,
    reporter: ProgressReporter,
    counters: Arc<ScanCounters>,
    cancelled: Arc<AtomicBool>,
    state: Arc<watch::Sender<ScanState>>,
    summary: SearchSummary,
}

impl SearchTask {
    async fn run(mut self) -> SearchSummary {
        let workers = self.workers.min(self.entries.len()).max(1);
        let queue = Arc::new(Mutex::new(VecDeque::from(std::mem::take(&mut self.entries))));

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let processor = Arc::clone(&self.processor);
                let counters = Arc::clone(&self.counters);
                let cancelled = Arc::clone(&self.cancelled);
                tokio::task::spawn_blocking(move || {
                    worker_loop(&queue, &processor, &counters, &cancelled)
                })
            })
            .collect();

        let mut pool = tokio::spawn(async move {
            for handle in handles {
                match handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => log::error!("Search worker stopped early: {}", e),
                    Err(e) => log::error!("Search worker failed: {}", e),
                }
            }
        });

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                joined = &mut pool => {
                    if let Err(e) = joined {
                        log::error!("Worker pool task failed: {}", e);
                    }
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = self.reporter.tick();
                    self.summary.absorb(&snapshot);
                }
            }
        }

        self.state.send_if_modified(|state| {
            if *state == ScanState::Running {
                *state = ScanState::Stopping;
                true
            } else {
                false
            }
        });

        for snapshot in self.reporter.flush() {
            self.summary.absorb(&snapshot);
        }

        self.summary.files_skipped = self.counters.files_skipped();
        self.summary.finish(self.cancelled.load(Ordering::SeqCst));

        let elapsed = self.counters.elapsed();
        log::info!(
            "Search {:?}: {} of {} file(s) in {:.2}s ({:.1} files/s), {} row(s), {} special marker(s), {} unreadable",
            self.summary.status,
            self.summary.files_processed,
            self.summary.files_total,
            elapsed.as_secs_f64(),
            self.counters.files_per_second(),
            self.summary.outcomes.len(),
            self.summary.special_hits.len(),
            self.counters.decode_failures()
        );

        self.state.send_replace(ScanState::Idle);
        self.summary
    }
}

/// Pull files off the shared queue until it is empty.
///
/// After a stop the remaining files are still popped so each one is counted
/// as skipped.
fn worker_loop(
    queue: &Mutex<VecDeque<CatalogEntry>>,
    processor: &FileProcessor,
    counters: &ScanCounters,
    cancelled: &AtomicBool,
) -> Result<()> {
    loop {
        let entry = queue
            .lock()
            .map_err(|_| Error::lock_poisoned("search file queue"))?
            .pop_front();

        let Some(entry) = entry else {
            return Ok(());
        };

        if processor.process(&entry, cancelled) == FileVisit::Skipped {
            counters.increment_skipped();
        }
    }
}
