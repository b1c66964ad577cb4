//! File tailer for `--stdout` / `--stderr`
//!
//! Follows a file with filesystem events from `notify`, watching its parent
//! directory so creation and rotation by rename are seen too. Falls back to
//! polling when no watcher can be set up, or always polls with `--poll`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::Result;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Stream a tailed file is copied to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailTarget {
    Stdout,
    Stderr,
}

/// A file to follow and where its lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailSpec {
    pub path: PathBuf,
    pub target: TailTarget,
}

/// How a tailer learns that its file changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowMode {
    /// Filesystem events, polling only if the watcher cannot be created
    Events,
    /// Re-read every poll interval
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowOptions {
    pub mode: FollowMode,
    pub poll_interval: Duration,
}

impl Default for FollowOptions {
    fn default() -> Self {
        FollowOptions {
            mode: FollowMode::Events,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

type WatchEvent = notify::Result<Event>;

/// The currently open generation of the followed file
struct Followed {
    file: File,
    position: u64,
    id: Option<(u64, u64)>,
}

impl Followed {
    async fn open(path: &Path) -> Option<Followed> {
        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Waiting for file");
                return None;
            }
        };
        let id = file.metadata().await.ok().as_ref().and_then(file_id);
        Some(Followed {
            file,
            position: 0,
            id,
        })
    }

    async fn copy_to_end<W>(&mut self, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; 8192];
        loop {
            let read = self.file.read(&mut buf).await?;
            if read == 0 {
                return Ok(());
            }
            self.position += read as u64;
            out.write_all(&buf[..read]).await?;
            out.flush().await?;
        }
    }

    /// Truncated in place, or another file now sits at `path`
    async fn replaced(&self, path: &Path) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len() < self.position || file_id(&meta) != self.id,
            // rotated away and not recreated yet: keep draining the old file
            Err(_) => false,
        }
    }
}

#[cfg(unix)]
fn file_id(meta: &std::fs::Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_id(_meta: &std::fs::Metadata) -> Option<(u64, u64)> {
    None
}

/// Follows one file, reopening it on truncation or rotation
#[derive(Debug, Clone)]
pub struct Tailer {
    spec: TailSpec,
    options: FollowOptions,
}

impl Tailer {
    pub fn new(spec: TailSpec, options: FollowOptions) -> Self {
        Tailer { spec, options }
    }

    /// Copy the file to its target stream until `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        match self.spec.target {
            TailTarget::Stdout => self.run_into(&mut tokio::io::stdout(), cancel).await,
            TailTarget::Stderr => self.run_into(&mut tokio::io::stderr(), cancel).await,
        }
    }

    /// Copy the file, from its beginning, into `out` until `cancel` fires
    ///
    /// Whatever was appended before cancellation is still copied.
    pub async fn run_into<W>(&self, out: &mut W, cancel: CancellationToken) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = unbounded_channel();
        // dropping the watcher stops its events
        let watcher = match self.options.mode {
            FollowMode::Events => self.watch(tx),
            FollowMode::Poll => None,
        };
        let event_driven = watcher.is_some();

        let mut current = None;
        self.catch_up(&mut current, out).await?;
        loop {
            let stop = if event_driven {
                self.next_event(&mut rx, &cancel).await
            } else {
                self.pause(&cancel).await
            };
            self.catch_up(&mut current, out).await?;
            if stop {
                return Ok(());
            }
        }
    }

    /// Watch the parent directory, `None` if notify is unavailable
    fn watch(&self, tx: UnboundedSender<WatchEvent>) -> Option<RecommendedWatcher> {
        let path = &self.spec.path;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let handler = move |event: WatchEvent| {
            let _ = tx.send(event);
        };
        let mut watcher = match RecommendedWatcher::new(handler, NotifyConfig::default()) {
            Ok(watcher) => watcher,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not create watcher, falling back to polling");
                return None;
            }
        };
        if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
            warn!(dir = %dir.display(), error = %e, "Could not watch directory, falling back to polling");
            return None;
        }

        debug!(path = %path.display(), "Event-driven tailing enabled");
        Some(watcher)
    }

    /// Wait for an event on the followed file, `true` if cancelled meanwhile
    async fn next_event(
        &self,
        rx: &mut UnboundedReceiver<WatchEvent>,
        cancel: &CancellationToken,
    ) -> bool {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return true,
                event = rx.recv() => match event {
                    Some(Ok(event)) if self.concerns(&event) => return false,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(path = %self.spec.path.display(), error = %e, "Watcher error");
                        return false;
                    }
                    None => return self.pause(cancel).await,
                },
            }
        }
    }

    fn concerns(&self, event: &Event) -> bool {
        if matches!(event.kind, EventKind::Access(_)) {
            return false;
        }
        let name = self.spec.path.file_name();
        event.paths.iter().any(|p| p.file_name() == name)
    }

    /// Copy everything new, following the file across truncation and rotation
    async fn catch_up<W>(&self, current: &mut Option<Followed>, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let path = &self.spec.path;
        if current.is_none() {
            *current = Followed::open(path).await;
        }
        while let Some(followed) = current.as_mut() {
            followed.copy_to_end(out).await?;
            if !followed.replaced(path).await {
                break;
            }
            debug!(path = %path.display(), "File truncated or rotated, reopening");
            *current = Followed::open(path).await;
        }
        Ok(())
    }

    /// Sleep one poll interval, `true` if cancelled meanwhile
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(self.options.poll_interval) => false,
        }
    }
}
