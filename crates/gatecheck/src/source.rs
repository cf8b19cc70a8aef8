//! Live frame sources for watch mode.
//!
//! A frame source emits image frames over a channel until it is told to stop.
//! The shipped source polls a spool directory for newly dropped image files,
//! which is how camera bridges and upload hooks hand frames to the scanner.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// An image frame observed by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Path of the frame image on disk.
    pub path: PathBuf,
    /// When the source first observed the frame.
    pub observed_at: DateTime<Utc>,
}

/// A cloneable stop signal shared between a source and its controller.
#[derive(Debug, Clone, Default)]
pub struct SourceHandle {
    stop_signal: Arc<AtomicBool>,
}

impl SourceHandle {
    /// Create a new handle with the stop signal unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the source to stop.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Check whether the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }
}

/// A source of image frames.
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// The name of this frame source (for logging/debugging).
    fn name(&self) -> &'static str;

    /// A handle that can stop this source from another task.
    fn handle(&self) -> SourceHandle;

    /// Run the source, sending frames until stopped or the receiver closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot start.
    async fn run(&mut self, tx: mpsc::Sender<Frame>) -> Result<()>;
}

/// Frame source that polls a spool directory for new image files.
///
/// Files are reported once; a file already present when the source starts is
/// still reported (a code may be waiting in the spool before watch begins).
#[derive(Debug)]
pub struct DirectoryWatchSource {
    dir: PathBuf,
    poll_interval: Duration,
    extensions: Vec<String>,
    seen: HashSet<PathBuf>,
    handle: SourceHandle,
}

impl DirectoryWatchSource {
    /// Create a source watching `dir` at the given interval.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, poll_interval: Duration, extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval,
            extensions: extensions
                .into_iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
            seen: HashSet::new(),
            handle: SourceHandle::new(),
        }
    }

    /// Whether the path has an extension this source accepts.
    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
    }

    /// Scan the spool directory once, returning unseen frames in path order.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn poll_once(&mut self) -> Result<Vec<Frame>> {
        let mut fresh = Vec::new();
        for dir_entry in std::fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if !path.is_file() || !self.accepts(&path) {
                continue;
            }
            if self.seen.insert(path.clone()) {
                fresh.push(Frame {
                    path,
                    observed_at: Utc::now(),
                });
            }
        }
        fresh.sort_by(|a, b| a.path.cmp(&b.path));
        trace!("Spool poll found {} new frame(s)", fresh.len());
        Ok(fresh)
    }
}

#[async_trait::async_trait]
impl FrameSource for DirectoryWatchSource {
    fn name(&self) -> &'static str {
        "directory-watch"
    }

    fn handle(&self) -> SourceHandle {
        self.handle.clone()
    }

    async fn run(&mut self, tx: mpsc::Sender<Frame>) -> Result<()> {
        if !self.dir.is_dir() {
            return Err(Error::source_start(
                self.name(),
                format!("spool directory {} does not exist", self.dir.display()),
            ));
        }

        debug!(
            "Watching {} every {:?} for {:?} files",
            self.dir.display(),
            self.poll_interval,
            self.extensions
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            if self.handle.should_stop() {
                debug!("Frame source stopped");
                return Ok(());
            }
            for frame in self.poll_once()? {
                if tx.send(frame).await.is_err() {
                    // Receiver dropped; nothing left to feed.
                    return Ok(());
                }
            }
        }
    }
}
