//! # File Watcher
//!
//! Recursive `notify` watcher on the project root. Raw events are filtered
//! (ignored directories, non-source extensions), debounced per path, checked
//! against the self-edit filter, and only then refresh the template map and
//! go out to subscribers.
//!
//! Per path: `Idle` --event--> `Debounced(deadline)` --event--> deadline
//! pushed back; `Debounced` --deadline passes--> examined, back to `Idle`.

use chrono::{DateTime, Utc};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::errors::WatchError;
use crate::project::Project;
use crate::scan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Modified,
    Removed,
}

/// An outside change to a source file, published after the template map
/// has been refreshed for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub timestamp: DateTime<Utc>,
}

/// Paths waiting for their debounce window to close. A path that is not
/// in the map is idle.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadlines: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadlines: HashMap::new(),
        }
    }

    /// Record an event, restarting the path's window
    pub fn touch(&mut self, path: PathBuf, now: Instant) {
        self.deadlines.insert(path, now + self.window);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    pub fn is_idle(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Paths whose window has closed, returned to idle
    pub fn take_due(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut due: Vec<PathBuf> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &due {
            self.deadlines.remove(path);
        }
        due.sort();
        due
    }
}

/// Source paths of an event that may change file contents
fn relevant_paths(project: &Project, event: &Event) -> Vec<PathBuf> {
    if matches!(event.kind, EventKind::Access(_)) {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter(|path| project.is_source_path(path))
        .cloned()
        .collect()
}

async fn read_current(project: &Project, path: &Path) -> io::Result<Option<String>> {
    let fs = project.fs.clone();
    let owned = path.to_path_buf();
    let read = tokio::task::spawn_blocking(move || fs.read_to_string(&owned))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    match read {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Examine a path whose debounce window closed. Returns the change to
/// publish, if any.
pub(crate) async fn refresh(project: &Project, path: &Path) -> Option<FileChange> {
    let _guard = project.locks.lock(path).await;

    let content = match read_current(project, path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to read changed file: {}", e);
            return None;
        }
    };

    if !project.filter.should_notify(path, content.as_deref()) {
        tracing::debug!(path = %path.display(), "change suppressed");
        return None;
    }

    let kind = match content {
        None => {
            project.map.remove_file(path);
            ChangeKind::Removed
        }
        Some(_) => {
            if let Err(e) = scan::scan_locked(project, path).await {
                tracing::warn!(path = %path.display(), "Rescan failed: {}", e);
            }
            ChangeKind::Modified
        }
    };

    tracing::info!(path = %path.display(), ?kind, "file changed");
    Some(FileChange {
        path: path.to_path_buf(),
        kind,
        timestamp: Utc::now(),
    })
}

async fn run(
    project: Project,
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    changes: broadcast::Sender<FileChange>,
) {
    let mut debouncer = Debouncer::new(project.config.debounce());

    loop {
        let wake = debouncer
            .next_deadline()
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        tokio::select! {
            event = events.recv() => match event {
                Some(Ok(event)) => {
                    let now = Instant::now();
                    for path in relevant_paths(&project, &event) {
                        debouncer.touch(path, now);
                    }
                }
                Some(Err(e)) => tracing::warn!("Watch error: {}", e),
                None => break,
            },
            _ = tokio::time::sleep_until(wake), if !debouncer.is_idle() => {
                for path in debouncer.take_due(Instant::now()) {
                    if let Some(change) = refresh(&project, &path).await {
                        // No subscribers is fine
                        let _ = changes.send(change);
                    }
                }
            }
        }
    }
    tracing::debug!("watch loop stopped");
}

/// Running watch on a project root; dropping it stops the watch
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl FileWatcher {
    /// Start watching. Must be called from within a tokio runtime.
    pub fn start(project: Project, changes: broadcast::Sender<FileChange>) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            NotifyConfig::default(),
        )?;
        watcher.watch(&project.root, RecursiveMode::Recursive)?;
        tracing::info!(root = %project.root.display(), "watching for changes");

        let task = tokio::spawn(run(project, rx, changes));
        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tessera_common::MockFileSystem;

    use crate::config::Config;

    #[test]
    fn test_debouncer_collapses_bursts() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let path = PathBuf::from("/app/page.tsx");

        debouncer.touch(path.clone(), start);
        debouncer.touch(path.clone(), start + Duration::from_millis(200));
        assert_eq!(debouncer.next_deadline(), Some(start + Duration::from_millis(500)));

        assert!(debouncer.take_due(start + Duration::from_millis(400)).is_empty());
        assert_eq!(debouncer.take_due(start + Duration::from_millis(500)), vec![path]);
        assert!(debouncer.is_idle());
    }

    #[test]
    fn test_relevant_paths() {
        let project = Project::new(PathBuf::from("/app"), Config::default(), Arc::new(MockFileSystem::new()));
        let event = Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(PathBuf::from("/app/page.tsx"))
            .add_path(PathBuf::from("/app/node_modules/x/index.jsx"))
            .add_path(PathBuf::from("/app/styles.css"));
        assert_eq!(relevant_paths(&project, &event), vec![PathBuf::from("/app/page.tsx")]);

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/app/page.tsx"));
        assert!(relevant_paths(&project, &access).is_empty());
    }

    #[tokio::test]
    async fn test_refresh_suppresses_own_writes() {
        let fs = Arc::new(MockFileSystem::new());
        let project = Project::new(PathBuf::from("/app"), Config::default(), fs.clone());
        let path = PathBuf::from("/app/page.tsx");

        let ours = "const a = <div data-oid=\"d\" />;";
        fs.add_file(&path, ours);
        project.filter.register(&path, ours);
        assert_eq!(refresh(&project, &path).await, None);

        let theirs = "const a = <div data-oid=\"d\" className=\"x\" />;";
        fs.add_file(&path, theirs);
        let change = refresh(&project, &path).await.unwrap();
        assert_eq!(change.kind, ChangeKind::Modified);
        assert!(project.map.get("d").is_some());

        // A touch that leaves the text unchanged
        assert_eq!(refresh(&project, &path).await, None);
    }
}
