// Directory watcher module
// Debounced filesystem watching that drives reconciliation passes


use anyhow::{Context, Result};
use notify::event::{CreateKind, RemoveKind};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::ingest::IngestionPipeline;

/// How often the event loop checks whether the debounce window elapsed.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Single-slot debounce timer.
///
/// Arming an already-armed slot replaces the deadline, so a burst of
/// filesystem events collapses into one firing once the directory has been
/// quiet for the full delay.
#[derive(Debug)]
pub struct DebounceSlot {
    deadline: Option<Instant>,
    delay: Duration,
}

impl DebounceSlot {
    #[inline]
    pub fn new(delay: Duration) -> Self {
        Self {
            deadline: None,
            delay,
        }
    }

    /// Start (or restart) the window as of `now`.
    #[inline]
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Whether a window is pending.
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm and report true if the window elapsed by `now`.
    #[inline]
    pub fn take_expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Whether a filesystem event should restart the debounce window.
///
/// Only additions and removals of PDF files count; modifications and
/// metadata churn are ignored so editors touching files do not trigger
/// reconciliation.
pub(crate) fn is_relevant(event: &Event) -> bool {
    let kind_matches = matches!(
        event.kind,
        EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Remove(RemoveKind::File | RemoveKind::Any)
    );

    kind_matches
        && event.paths.iter().any(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
}

/// Watches one directory and runs a reconciliation pass after each
/// debounced burst of PDF additions or removals.
pub struct DirectoryWatcher {
    pipeline: Arc<IngestionPipeline>,
    data_dir: PathBuf,
    debounce: Duration,
}

impl DirectoryWatcher {
    #[inline]
    pub fn new(pipeline: Arc<IngestionPipeline>, data_dir: PathBuf, debounce: Duration) -> Self {
        Self {
            pipeline,
            data_dir,
            debounce,
        }
    }

    /// Run until the watch backend shuts down.
    ///
    /// A full pass runs once at startup so changes made while the watcher
    /// was down are picked up, then each debounced burst triggers another.
    /// Pass failures are logged and the loop keeps watching.
    pub async fn run(&self) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<Event>(256);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if is_relevant(&event) {
                        // Send fails only when the loop below is gone
                        let _ = tx.blocking_send(event);
                    }
                }
                Err(e) => warn!("Watch backend error: {}", e),
            }
        })
        .context("Failed to create filesystem watcher")?;

        watcher
            .watch(&self.data_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", self.data_dir.display()))?;

        info!(
            "Watching {} with a {}ms debounce",
            self.data_dir.display(),
            self.debounce.as_millis()
        );

        self.run_pass().await;

        let mut slot = DebounceSlot::new(self.debounce);
        loop {
            tokio::select! {
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            debug!("Relevant change: {:?} {:?}", event.kind, event.paths);
                            slot.arm(Instant::now());
                        }
                        None => {
                            info!("Watch channel closed, stopping");
                            break;
                        }
                    }
                }
                _ = sleep(POLL_INTERVAL) => {
                    if slot.take_expired(Instant::now()) {
                        info!("Directory settled, starting reconciliation pass");
                        self.run_pass().await;
                    }
                }
            }
        }

        Ok(())
    }

    // The pipeline blocks on PDF parsing and HTTP, so it runs off the
    // runtime threads; the caller's select! stays responsive meanwhile.
    async fn run_pass(&self) {
        let pipeline = Arc::clone(&self.pipeline);
        let data_dir = self.data_dir.clone();

        match tokio::task::spawn_blocking(move || pipeline.synchronize(&data_dir)).await {
            Ok(Ok(stats)) => {
                info!(
                    "Pass complete: {} indexed, {} skipped, {} removed, {} failed",
                    stats.documents_indexed,
                    stats.documents_skipped,
                    stats.documents_removed,
                    stats.documents_failed
                );
            }
            Ok(Err(e)) => error!("Reconciliation pass failed: {:#}", e),
            Err(e) => error!("Reconciliation task panicked: {}", e),
        }
    }
}
