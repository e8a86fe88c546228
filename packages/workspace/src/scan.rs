//! File scanning: parse, give every element an identity, persist the ids
//! that were added and record template nodes for the file.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tessera_common::{CommonError, CommonResult, FileSystem};
use tessera_parser::Printer;
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::config::Config;
use crate::project::Project;
use crate::self_edit::SelfEditFilter;
use crate::template_map::{classify, TemplateNode};

/// Template nodes of one file, after identities were injected
#[derive(Debug, Clone)]
pub struct FileScan {
    pub nodes: HashMap<String, TemplateNode>,
    /// Identities added or repaired (and written back to disk)
    pub injected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub path: PathBuf,
    pub oids: usize,
    pub injected: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RebuildReport {
    pub scanned: Vec<ScanReport>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Scan one file synchronously. Injected identities are written back with
/// an atomic write announced to the self-edit filter.
pub fn scan_source(fs: &dyn FileSystem, filter: &SelfEditFilter, path: &Path) -> CommonResult<FileScan> {
    let source = fs.read_to_string(path)?;
    let name = path.to_string_lossy();
    let mut module = tessera_parser::parse_with_path(&source, &name)?;

    let report = tessera_editor::inject(&mut module);
    let injected = report.added + report.reassigned;

    let (source, module) = if report.changed() {
        let mut printer = Printer::new(&source);
        printer.mark_dirty_many(report.dirty);
        let updated = printer.print(&module);

        let token = filter.register(path, &updated);
        if let Err(e) = fs.write_atomic(path, &updated) {
            filter.cancel(&token);
            return Err(e.into());
        }
        tracing::info!(path = %path.display(), added = report.added, reassigned = report.reassigned, "persisted identities");

        // Positions must come from the text now on disk
        let module = tessera_parser::parse_with_path(&updated, &name)?;
        (updated, module)
    } else {
        (source, module)
    };

    filter.remember(path, &source);
    Ok(FileScan {
        nodes: classify(&module, &source, path),
        injected,
    })
}

/// Source files under `root`, skipping ignored directories
pub fn discover(root: &Path, config: &Config) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !entry
                    .file_name()
                    .to_str()
                    .map(|name| config.is_ignored_dir(name))
                    .unwrap_or(false)
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && config.has_source_extension(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Scan a file into the template map, holding its path lock
pub async fn scan_file(project: &Project, path: &Path) -> CommonResult<ScanReport> {
    let _guard = project.locks.lock(path).await;
    scan_locked(project, path).await
}

/// Scan a file into the template map. The caller holds the path lock.
pub(crate) async fn scan_locked(project: &Project, path: &Path) -> CommonResult<ScanReport> {
    let fs = project.fs.clone();
    let filter = project.filter.clone();
    let owned = path.to_path_buf();
    let scan = tokio::task::spawn_blocking(move || scan_source(fs.as_ref(), &filter, &owned))
        .await
        .map_err(|e| CommonError::Task(e.to_string()))?;

    match scan {
        Ok(scan) => {
            let report = ScanReport {
                path: path.to_path_buf(),
                oids: scan.nodes.len(),
                injected: scan.injected,
            };
            project.map.upsert_file(path.to_path_buf(), scan.nodes);
            Ok(report)
        }
        Err(e) if e.is_not_found() => {
            project.map.remove_file(path);
            project.filter.forget(path);
            Err(e)
        }
        // Previous entries stay until the file parses again
        Err(e) => Err(e),
    }
}

/// Scan every source file of the project. Files that fail are logged and
/// skipped; files no longer on disk are dropped from the map.
pub async fn rebuild(project: &Project) -> RebuildReport {
    let files = {
        let root = project.root.clone();
        let config = project.config.clone();
        tokio::task::spawn_blocking(move || discover(&root, &config))
            .await
            .unwrap_or_default()
    };
    tracing::info!(root = %project.root.display(), files = files.len(), "scanning project");

    let mut tasks = JoinSet::new();
    for path in files.iter().cloned() {
        let project = project.clone();
        tasks.spawn(async move {
            let result = scan_file(&project, &path).await;
            (path, result)
        });
    }

    let mut report = RebuildReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(scan))) => report.scanned.push(scan),
            Ok((path, Err(e))) => {
                tracing::warn!(path = %path.display(), "Skipping file: {}", e);
                report.failed.push((path, e.to_string()));
            }
            Err(e) => tracing::warn!("Scan task failed: {}", e),
        }
    }

    let live: HashSet<&PathBuf> = files.iter().collect();
    for path in project.map.files() {
        if !live.contains(&path) {
            project.map.remove_file(&path);
        }
    }
    project.locks.prune();

    report.scanned.sort_by(|a, b| a.path.cmp(&b.path));
    report.failed.sort();
    tracing::info!(
        files = report.scanned.len(),
        failed = report.failed.len(),
        oids = project.map.len(),
        "template map built"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_common::MockFileSystem;

    #[test]
    fn test_scan_injects_and_persists() {
        let fs = MockFileSystem::new();
        let filter = SelfEditFilter::new();
        let path = PathBuf::from("/app/page.tsx");
        fs.add_file(&path, "export const Page = () => <main>hi</main>;\n");

        let scan = scan_source(&fs, &filter, &path).unwrap();
        assert_eq!(scan.injected, 1);
        assert_eq!(scan.nodes.len(), 1);

        let written = fs.contents(&path).unwrap();
        let oid = scan.nodes.keys().next().unwrap();
        assert_eq!(
            written,
            format!("export const Page = () => <main data-oid=\"{}\">hi</main>;\n", oid)
        );

        // The write is recognised as our own
        assert_eq!(filter.pending_count(), 1);
        assert!(!filter.should_notify(&path, Some(&written)));

        // Scanning again changes nothing
        let again = scan_source(&fs, &filter, &path).unwrap();
        assert_eq!(again.injected, 0);
        assert_eq!(again.nodes, scan.nodes);
        assert_eq!(fs.contents(&path).unwrap(), written);
    }

    #[test]
    fn test_scan_failures() {
        let fs = MockFileSystem::new();
        let filter = SelfEditFilter::new();

        let broken = PathBuf::from("/app/broken.tsx");
        fs.add_file(&broken, "const a = <div>;");
        assert!(matches!(scan_source(&fs, &filter, &broken), Err(CommonError::Parse(_))));

        let locked = PathBuf::from("/app/locked.tsx");
        fs.add_file(&locked, "const a = <div />;");
        fs.fail_writes_to(&locked);
        assert!(matches!(scan_source(&fs, &filter, &locked), Err(CommonError::Io(_))));
        assert_eq!(filter.pending_count(), 0);

        assert!(scan_source(&fs, &filter, Path::new("/missing.tsx")).is_err());
    }

    #[test]
    fn test_discover_skips_ignored_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for file in [
            "app/page.tsx",
            "components/Button.jsx",
            "lib/util.ts",
            "node_modules/pkg/index.jsx",
            ".next/server/page.tsx",
        ] {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }

        let files = discover(root, &Config::default());
        assert_eq!(
            files,
            vec![root.join("app/page.tsx"), root.join("components/Button.jsx")]
        );
    }
}
