//! # Session
//!
//! One open project: its template map, per-path locks, self-edit filter,
//! writer and optional file watcher. Created at project open, torn down
//! with [`Session::close`].

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_stream::wrappers::BroadcastStream;

use tessera_common::{CommonError, CommonResult, FileSystem, RealFileSystem};
use tessera_editor::EditRequest;

use crate::config::Config;
use crate::diff::{self, CodeDiff, DiffBatch};
use crate::errors::{WatchError, WorkspaceError, WorkspaceResult, WriteError};
use crate::project::Project;
use crate::scan::{self, RebuildReport, ScanReport};
use crate::template_map::{self, TemplateMap, TemplateNode};
use crate::watcher::{FileChange, FileWatcher};
use crate::writer::{formatter_for, FileWriteResult, SourceWriter, WriteReport};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Result of applying a batch: what was produced and what was written
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub batch: DiffBatch,
    pub writes: WriteReport,
}

impl ApplyReport {
    /// Every request applied and every file written
    pub fn success(&self) -> bool {
        self.batch.all_applied() && self.writes.success()
    }
}

pub struct Session {
    project: Project,
    writer: Arc<SourceWriter>,
    changes: broadcast::Sender<FileChange>,
    watcher: Mutex<Option<FileWatcher>>,
}

impl Session {
    /// Open a project on the real file system and build its template map
    pub async fn open(root: impl AsRef<Path>, config: Config) -> WorkspaceResult<Self> {
        Self::open_with(root, config, Arc::new(RealFileSystem)).await
    }

    pub async fn open_with(
        root: impl AsRef<Path>,
        config: Config,
        fs: Arc<dyn FileSystem>,
    ) -> WorkspaceResult<Self> {
        let root = root.as_ref();
        if !fs.exists(root) {
            tracing::error!(root = %root.display(), "project root not found");
            return Err(WorkspaceError::RootNotFound(root.to_path_buf()));
        }
        let root = fs.canonicalize(root)?;

        let formatter = formatter_for(&config);
        let project = Project::new(root, config, fs);
        let writer = SourceWriter::new(project.fs.clone(), project.filter.clone(), formatter);
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        let session = Self {
            project,
            writer: Arc::new(writer),
            changes,
            watcher: Mutex::new(None),
        };
        session.rebuild().await;
        Ok(session)
    }

    pub fn root(&self) -> &Path {
        &self.project.root
    }

    pub fn config(&self) -> &Config {
        &self.project.config
    }

    pub fn template_map(&self) -> &TemplateMap {
        &self.project.map
    }

    /// Shared state: the file system, self-edit filter and path locks
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Files with template nodes
    pub fn files(&self) -> Vec<PathBuf> {
        self.project.map.files()
    }

    /// Rescan every source file under the root
    pub async fn rebuild(&self) -> RebuildReport {
        scan::rebuild(&self.project).await
    }

    pub async fn scan_file(&self, path: impl AsRef<Path>) -> CommonResult<ScanReport> {
        let path = self.project.resolve(path.as_ref());
        scan::scan_file(&self.project, &path).await
    }

    pub fn template_node(&self, oid: &str) -> Option<TemplateNode> {
        self.project.map.get(oid)
    }

    pub async fn build_diffs(&self, requests: &[EditRequest]) -> DiffBatch {
        diff::build_diffs(&self.project, requests).await
    }

    /// Build the diffs for `requests`, write them and rescan the written files
    pub async fn apply(&self, requests: &[EditRequest]) -> ApplyReport {
        let batch = self.build_diffs(requests).await;
        let writes = self.write(&batch.diffs).await;
        ApplyReport { batch, writes }
    }

    /// Persist diffs, one task per file, each holding the file's lock for
    /// the write and the rescan that follows it
    pub async fn write(&self, diffs: &[CodeDiff]) -> WriteReport {
        let mut tasks = JoinSet::new();
        for diff in diffs.iter().cloned() {
            let project = self.project.clone();
            let writer = self.writer.clone();
            tasks.spawn(async move {
                let _guard = project.locks.lock(&diff.path).await;
                let path = diff.path.clone();
                let result = match tokio::task::spawn_blocking(move || writer.write_one(&diff)).await {
                    Ok(result) => result,
                    Err(e) => FileWriteResult {
                        path: path.clone(),
                        formatted: false,
                        result: Err(WriteError::Io {
                            path: path.clone(),
                            message: e.to_string(),
                        }),
                    },
                };
                if result.is_ok() {
                    if let Err(e) = scan::scan_locked(&project, &path).await {
                        tracing::warn!(path = %path.display(), "Rescan after write failed: {}", e);
                    }
                }
                result
            });
        }

        let mut results = Vec::with_capacity(diffs.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!("Write task failed: {}", e),
            }
        }
        results.sort_by(|a, b| a.path.cmp(&b.path));
        self.project.locks.prune();
        WriteReport { results }
    }

    async fn read(&self, path: &Path) -> CommonResult<String> {
        let fs = self.project.fs.clone();
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || fs.read_to_string(&owned))
            .await
            .map_err(|e| CommonError::Task(e.to_string()))?
            .map_err(CommonError::from)
    }

    /// Source text of the element carrying `oid`, optionally without
    /// identity attributes
    pub async fn code_block(&self, oid: &str, strip_ids: bool) -> Option<String> {
        let Some(node) = self.template_node(oid) else {
            tracing::warn!(oid = %oid, "No template node for identity");
            return None;
        };
        let source = match self.read(&node.path).await {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(path = %node.path.display(), "Failed to read file: {}", e);
                return None;
            }
        };
        let block = template_map::code_block(&node, &source)?;
        if !strip_ids {
            return Some(block);
        }
        match tessera_editor::strip_source(&block) {
            Ok(stripped) => Some(stripped),
            Err(e) => {
                tracing::warn!(oid = %oid, "Code block did not parse: {}", e);
                Some(block)
            }
        }
    }

    /// Identity of the `index`-th `<component>` inside the element `parent_oid`
    pub async fn instance_child(&self, parent_oid: &str, component: &str, index: usize) -> Option<String> {
        let block = self.code_block(parent_oid, false).await?;
        template_map::instance_child(&block, component, index)
    }

    /// Components exported by a file
    pub async fn components(&self, path: impl AsRef<Path>) -> CommonResult<Vec<String>> {
        let path = self.project.resolve(path.as_ref());
        let source = self.read(&path).await?;
        let module = tessera_parser::parse_with_path(&source, &path.to_string_lossy())?;
        Ok(template_map::exported_components(&module))
    }

    /// File text with every identity attribute removed
    pub async fn clean_source(&self, path: impl AsRef<Path>) -> CommonResult<String> {
        let path = self.project.resolve(path.as_ref());
        let source = self.read(&path).await?;
        Ok(tessera_editor::strip_source(&source)?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FileChange> {
        self.changes.subscribe()
    }

    /// Changes as a stream; lagging subscribers see an error item
    pub fn change_stream(&self) -> BroadcastStream<FileChange> {
        BroadcastStream::new(self.subscribe())
    }

    /// Start the file watcher. On failure the session stays usable without it.
    pub async fn start_watching(&self) -> Result<(), WatchError> {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            return Err(WatchError::AlreadyWatching(self.project.root.clone()));
        }
        match FileWatcher::start(self.project.clone(), self.changes.clone()) {
            Ok(watcher) => {
                self.project.filter.clear_pending();
                *slot = Some(watcher);
                Ok(())
            }
            Err(e) => {
                tracing::error!(root = %self.project.root.display(), "Watching disabled: {}", e);
                Err(e)
            }
        }
    }

    pub fn stop_watching(&self) {
        if self.watcher.lock().take().is_some() {
            tracing::info!(root = %self.project.root.display(), "stopped watching");
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Stop watching and drop all template nodes
    pub fn close(self) {
        self.stop_watching();
        self.project.map.clear();
        self.project.locks.prune();
        tracing::info!(root = %self.project.root.display(), "session closed");
    }
}
