//! Scanner module: orchestrates a scan over a list of roots.
//!
//! Pipeline, per root:
//!
//! ```text
//! ScanOrchestrator ─▶ walker (jwalk) ─▶ classify ─▶ container ─▶ materialize ─▶ container …
//! ```
//!
//! Roots are walked one after another by default. With `parallel_roots` they
//! are walked on a rayon pool, each into a private event buffer that is
//! replayed in root order, so per-root ordering is the same either way.
//!
//! Nothing unwinds past [`ScanOrchestrator::run`]: failures become
//! [`progress::ScanEvent::Error`] records and the scan always reaches
//! [`progress::ScanEvent::Complete`].
pub mod container;
pub mod materialize;
pub mod progress;
pub mod walker;

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::model::ScanRoot;
use materialize::Materializer;
use progress::{Recorder, RootStats, ScanEvent, ScanSink, ScanSummary};

use crossbeam_channel::Receiver;
use rayon::prelude::*;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

/// Maximum number of events that may queue up in the channel of a
/// background scan before the scanner blocks on `send`.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Everything one root's walk needs, threaded through walker and descender.
pub(crate) struct ScanContext<'s> {
    pub(crate) config: &'s ScanConfig,
    pub(crate) materializer: Materializer,
    pub(crate) recorder: Recorder<'s>,
}

impl<'s> ScanContext<'s> {
    pub(crate) fn new(config: &'s ScanConfig, sink: &'s mut dyn ScanSink, root: PathBuf) -> Self {
        Self {
            config,
            materializer: Materializer::new(config.temp_dir.clone(), config.max_materialized_bytes),
            recorder: Recorder::new(sink, root, &config.transient_error_markers),
        }
    }
}

/// Runs the walker over every root, isolating failures per root.
#[derive(Debug, Clone, Default)]
pub struct ScanOrchestrator {
    config: ScanConfig,
}

impl ScanOrchestrator {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Walk every root exactly once, in order, then emit `Complete`.
    pub fn run(&self, roots: &[ScanRoot], sink: &mut dyn ScanSink) -> ScanSummary {
        let start = Instant::now();
        let mut totals = RootStats::default();

        let mut walked = false;
        if self.config.parallel_roots && roots.len() > 1 {
            match self.walk_parallel(roots) {
                Ok(buffers) => {
                    for (events, stats) in buffers {
                        for event in events {
                            sink.emit(event);
                        }
                        totals.merge(&stats);
                    }
                    walked = true;
                }
                Err(err) => warn!("Could not build root worker pool, walking sequentially: {err}"),
            }
        }
        if !walked {
            for root in roots {
                totals.merge(&self.walk_root(root, sink));
            }
        }

        let summary = ScanSummary {
            roots: roots.len() as u64,
            totals,
            duration: start.elapsed(),
        };
        info!(
            "Scrape complete: {} root(s), {} file(s) found, {} error(s), {} fatal, in {:?}",
            summary.roots,
            totals.discoveries,
            totals.errors,
            totals.fatal_errors,
            summary.duration
        );
        sink.emit(ScanEvent::Complete(summary));
        summary
    }

    /// Walk a single root. Any error or panic is recorded, never returned.
    pub fn walk_root(&self, root: &ScanRoot, sink: &mut dyn ScanSink) -> RootStats {
        sink.emit(ScanEvent::RootStarted {
            root: root.path.clone(),
        });
        let stats = {
            let mut ctx = ScanContext::new(&self.config, &mut *sink, root.path.clone());
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| walker::walk(root, &mut ctx)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => ctx.recorder.error(err),
                Err(payload) => ctx.recorder.error(ScanError::Panicked {
                    location: root.path.display().to_string(),
                    message: panic_message(payload.as_ref()),
                }),
            }
            ctx.recorder.stats()
        };
        sink.emit(ScanEvent::RootFinished {
            root: root.path.clone(),
            stats,
        });
        stats
    }

    fn walk_parallel(
        &self,
        roots: &[ScanRoot],
    ) -> Result<Vec<(Vec<ScanEvent>, RootStats)>, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads())
            .thread_name(|i| format!("dicomscout-root-{i}"))
            .build()?;
        Ok(pool.install(|| {
            roots
                .par_iter()
                .map(|root| {
                    let mut events: Vec<ScanEvent> = Vec::new();
                    let stats = self.walk_root(root, &mut events);
                    (events, stats)
                })
                .collect()
        }))
    }
}

/// Handle to a scan running on a background thread.
///
/// Drain [`ScanHandle::events`] until it disconnects, then call
/// [`ScanHandle::join`]. The channel is bounded, so joining without draining
/// can stall the scanner on a large tree.
pub struct ScanHandle {
    pub events: Receiver<ScanEvent>,
    thread: thread::JoinHandle<ScanSummary>,
}

impl ScanHandle {
    /// Wait for the scanner thread and return its summary.
    pub fn join(self) -> Result<ScanSummary, ScanError> {
        self.thread.join().map_err(|payload| ScanError::Panicked {
            location: "scanner thread".to_string(),
            message: panic_message(payload.as_ref()),
        })
    }
}

/// Start a scan of `roots` on a background thread.
pub fn start_scan(roots: Vec<ScanRoot>, config: ScanConfig) -> io::Result<ScanHandle> {
    let (mut events_tx, events_rx) = crossbeam_channel::bounded::<ScanEvent>(PROGRESS_CHANNEL_CAPACITY);
    let thread = thread::Builder::new()
        .name("dicomscout-scanner".into())
        .spawn(move || {
            info!("Starting scan of {} root(s)", roots.len());
            ScanOrchestrator::new(config).run(&roots, &mut events_tx)
        })?;
    Ok(ScanHandle {
        events: events_rx,
        thread,
    })
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
