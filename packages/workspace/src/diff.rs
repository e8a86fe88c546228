//! # Diff Producer
//!
//! Turns a batch of edit requests into one before/after pair per file.
//! Requests are routed to files through the template map; every file is
//! read, parsed and transformed once, in its own task, while holding that
//! file's path lock.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tessera_common::FileSystem;
use tessera_editor::{transform_source, EditRequest, TransformWarning};
use tokio::task::JoinSet;

use crate::project::Project;

/// Full text of one file before and after a batch of edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDiff {
    pub path: PathBuf,
    pub original: String,
    pub generated: String,
}

/// What happened to one request of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RequestOutcome {
    Applied {
        oid: String,
        path: PathBuf,
        warnings: Vec<TransformWarning>,
    },
    /// No template node for the identity
    MissingIdentity { oid: String },
    /// The map points at a file that no longer contains the identity
    NotInFile { oid: String, path: PathBuf },
    ParseFailed {
        oid: String,
        path: PathBuf,
        message: String,
    },
    ReadFailed {
        oid: String,
        path: PathBuf,
        message: String,
    },
}

impl RequestOutcome {
    pub fn oid(&self) -> &str {
        match self {
            RequestOutcome::Applied { oid, .. }
            | RequestOutcome::MissingIdentity { oid }
            | RequestOutcome::NotInFile { oid, .. }
            | RequestOutcome::ParseFailed { oid, .. }
            | RequestOutcome::ReadFailed { oid, .. } => oid,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, RequestOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffBatch {
    /// Changed files, ordered by path
    pub diffs: Vec<CodeDiff>,
    /// One entry per distinct identity, in request order
    pub outcomes: Vec<RequestOutcome>,
}

impl DiffBatch {
    pub fn all_applied(&self) -> bool {
        self.outcomes.iter().all(RequestOutcome::is_applied)
    }
}

/// Requests of a batch with one request per identity, the latest one,
/// paired with the position of that identity's first request
fn dedupe(requests: &[EditRequest]) -> Vec<(usize, EditRequest)> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut latest: Vec<(usize, EditRequest)> = Vec::new();
    for request in requests {
        match slots.get(request.oid.as_str()) {
            Some(&slot) => latest[slot].1 = request.clone(),
            None => {
                slots.insert(&request.oid, latest.len());
                latest.push((latest.len(), request.clone()));
            }
        }
    }
    latest
}

struct FileResult {
    diff: Option<CodeDiff>,
    outcomes: Vec<(usize, RequestOutcome)>,
}

/// Read, transform and print one file
fn diff_file(fs: &dyn FileSystem, path: &Path, requests: Vec<(usize, EditRequest)>) -> FileResult {
    let fail = |make: &dyn Fn(String) -> RequestOutcome| FileResult {
        diff: None,
        outcomes: requests
            .iter()
            .map(|(order, request)| (*order, make(request.oid.clone())))
            .collect(),
    };

    let source = match fs.read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to read file: {}", e);
            let message = e.to_string();
            return fail(&|oid| RequestOutcome::ReadFailed {
                oid,
                path: path.to_path_buf(),
                message: message.clone(),
            });
        }
    };

    let batch: Vec<EditRequest> = requests.iter().map(|(_, request)| request.clone()).collect();
    let edit = match transform_source(&source, &path.to_string_lossy(), &batch) {
        Ok(edit) => edit,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Skipping file: {}", e);
            let message = e.to_string();
            return fail(&|oid| RequestOutcome::ParseFailed {
                oid,
                path: path.to_path_buf(),
                message: message.clone(),
            });
        }
    };

    let outcomes = requests
        .into_iter()
        .map(|(order, request)| {
            let outcome = if edit.report.not_found.contains(&request.oid) {
                RequestOutcome::NotInFile {
                    oid: request.oid,
                    path: path.to_path_buf(),
                }
            } else {
                let warnings = edit
                    .report
                    .warnings
                    .iter()
                    .filter(|w| w.oid() == request.oid)
                    .cloned()
                    .collect();
                RequestOutcome::Applied {
                    oid: request.oid,
                    path: path.to_path_buf(),
                    warnings,
                }
            };
            (order, outcome)
        })
        .collect();

    let diff = (edit.original != edit.generated).then(|| CodeDiff {
        path: path.to_path_buf(),
        original: edit.original,
        generated: edit.generated,
    });

    FileResult { diff, outcomes }
}

/// Produce the diffs for a batch of requests. Requests that cannot be
/// routed or applied are reported in the outcomes and never abort the
/// rest of the batch.
pub async fn build_diffs(project: &Project, requests: &[EditRequest]) -> DiffBatch {
    let mut outcomes: Vec<(usize, RequestOutcome)> = Vec::new();
    let mut by_file: BTreeMap<PathBuf, Vec<(usize, EditRequest)>> = BTreeMap::new();

    for (order, request) in dedupe(requests) {
        match project.map.path_of(&request.oid) {
            Some(path) => by_file.entry(path).or_default().push((order, request)),
            None => {
                tracing::warn!(oid = %request.oid, "No template node for identity");
                outcomes.push((order, RequestOutcome::MissingIdentity { oid: request.oid }));
            }
        }
    }

    let mut tasks = JoinSet::new();
    for (path, requests) in by_file {
        let project = project.clone();
        tasks.spawn(async move {
            let _guard = project.locks.lock(&path).await;
            let fs = project.fs.clone();
            let orders: Vec<(usize, String)> = requests
                .iter()
                .map(|(order, request)| (*order, request.oid.clone()))
                .collect();
            let task_path = path.clone();
            match tokio::task::spawn_blocking(move || diff_file(fs.as_ref(), &task_path, requests)).await {
                Ok(result) => result,
                Err(e) => FileResult {
                    diff: None,
                    outcomes: orders
                        .into_iter()
                        .map(|(order, oid)| {
                            let outcome = RequestOutcome::ReadFailed {
                                oid,
                                path: path.clone(),
                                message: e.to_string(),
                            };
                            (order, outcome)
                        })
                        .collect(),
                },
            }
        });
    }

    let mut diffs = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => {
                diffs.extend(result.diff);
                outcomes.extend(result.outcomes);
            }
            Err(e) => tracing::error!("Diff task failed: {}", e),
        }
    }

    diffs.sort_by(|a, b| a.path.cmp(&b.path));
    outcomes.sort_by_key(|(order, _)| *order);
    tracing::debug!(files = diffs.len(), requests = outcomes.len(), "diffs built");

    DiffBatch {
        diffs,
        outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
    }
}
