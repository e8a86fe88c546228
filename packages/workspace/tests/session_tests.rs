//! Session tests against real project trees in temporary directories

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tessera_common::{FileSystem, RealFileSystem};
use tessera_editor::*;
use tessera_parser::Position;
use tessera_workspace::*;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, contents) in files {
        let path = dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    dir
}

fn request(oid: &str, actions: Vec<StructureAction>) -> EditRequest {
    EditRequest {
        oid: oid.to_string(),
        structure_changes: actions,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_scan_persists_single_identity() {
    let dir = project(&[(
        "app/page.tsx",
        "export default function Page() {\n  return <main className=\"p-4\">Hello</main>;\n}\n",
    )]);
    let session = Session::open(dir.path(), Config::default()).await.unwrap();
    let path = session.root().join("app/page.tsx");

    let map = session.template_map();
    assert_eq!(map.len(), 1);
    let (oid, node) = map.file_nodes(&path).pop().unwrap();
    assert_eq!(oid.len(), 7);

    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        on_disk,
        format!(
            "export default function Page() {{\n  return <main className=\"p-4\" data-oid=\"{}\">Hello</main>;\n}}\n",
            oid
        )
    );

    assert_eq!(node.path, path);
    assert_eq!(node.start_tag.start, Position { line: 2, column: 10 });
    assert_eq!(node.start_tag.end, Position { line: 2, column: 50 });
    let end_tag = node.end_tag.unwrap();
    assert_eq!(end_tag.start, Position { line: 2, column: 56 });
    assert_eq!(end_tag.end, Position { line: 2, column: 62 });
    assert_eq!(node.component.as_deref(), Some("Page"));
    assert_eq!(node.core_element_type, Some(CoreElementType::ComponentRoot));

    // Reopening finds the persisted identity and writes nothing
    drop(session);
    let session = Session::open(dir.path(), Config::default()).await.unwrap();
    assert!(session.template_node(&oid).is_some());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), on_disk);
}

#[tokio::test]
async fn test_missing_root_is_setup_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Session::open(dir.path().join("nope"), Config::default()).await;
    assert!(matches!(result, Err(WorkspaceError::RootNotFound(_))));
}

#[tokio::test]
async fn test_rebuild_skips_ignored_and_broken_files() {
    let dir = project(&[
        ("app/page.tsx", "export const Page = () => <main data-oid=\"m\" />;\n"),
        ("app/broken.tsx", "export const Broken = () => <main>;\n"),
        ("node_modules/lib/index.jsx", "export const X = () => <div />;\n"),
        ("vendor/widget.jsx", "export const W = () => <div data-oid=\"w\" />;\n"),
    ]);
    std::fs::write(
        dir.path().join(DEFAULT_CONFIG_NAME),
        r#"{ "ignore": ["node_modules", "vendor"] }"#,
    )
    .unwrap();

    let config = Config::load(dir.path()).unwrap();
    let session = Session::open(dir.path(), config).await.unwrap();
    let report = session.rebuild().await;

    assert_eq!(report.scanned.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("app/broken.tsx"));
    assert!(session.template_node("m").is_some());
    assert!(session.template_node("w").is_none());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("node_modules/lib/index.jsx")).unwrap(),
        "export const X = () => <div />;\n"
    );
}

#[tokio::test]
async fn test_apply_writes_and_rescans() {
    let dir = project(&[(
        "app/page.tsx",
        "export default function Page() {\n  return (\n    <div data-oid=\"root\">\n      <span data-oid=\"s\" />\n      <p data-oid=\"p\" />\n    </div>\n  );\n}\n",
    )]);
    let session = Session::open(dir.path(), Config::default()).await.unwrap();
    let path = session.root().join("app/page.tsx");

    let mut element = ActionElement::new("img");
    element.oid = Some("pic".to_string());
    let report = session
        .apply(&[request(
            "root",
            vec![StructureAction::Insert(InsertAction {
                target_position: Some(TargetPosition::Index { index: 1 }),
                element,
                code_fragment: None,
            })],
        )])
        .await;

    assert!(report.success());
    assert_eq!(report.batch.diffs.len(), 1);
    assert_eq!(report.writes.results.len(), 1);

    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert_eq!(on_disk, report.batch.diffs[0].generated);
    assert_eq!(
        strip_source(&on_disk).unwrap(),
        "export default function Page() {\n  return (\n    <div>\n      <span />\n      <img/>\n      <p />\n    </div>\n  );\n}\n"
    );

    // The written file was rescanned: the new element resolves to line 5
    let pic = session.template_node("pic").unwrap();
    assert_eq!(pic.start_tag.start.line, 5);
    assert_eq!(session.template_node("p").unwrap().start_tag.start.line, 6);
}

#[tokio::test]
async fn test_locks_are_released_after_rebuild_and_write() {
    let dir = project(&[
        ("a.tsx", "export const A = () => <div data-oid=\"a\">x</div>;\n"),
        ("b.tsx", "export const B = () => <div data-oid=\"b\" />;\n"),
    ]);
    let session = Session::open(dir.path(), Config::default()).await.unwrap();
    assert!(session.project().locks.is_empty());

    let report = session
        .apply(&[EditRequest {
            oid: "a".to_string(),
            text_content: Some("y".to_string()),
            ..Default::default()
        }])
        .await;
    assert!(report.success());
    assert!(session.project().locks.is_empty());
}

#[tokio::test]
async fn test_missing_identity_is_reported_not_thrown() {
    let dir = project(&[("a.tsx", "export const A = () => <div data-oid=\"a\">x</div>;\n")]);
    let session = Session::open(dir.path(), Config::default()).await.unwrap();

    let report = session
        .apply(&[
            EditRequest {
                oid: "ghost".to_string(),
                text_content: Some("boo".to_string()),
                ..Default::default()
            },
            EditRequest {
                oid: "a".to_string(),
                text_content: Some("hi".to_string()),
                ..Default::default()
            },
        ])
        .await;

    assert!(!report.success());
    assert!(report.writes.success());
    assert_eq!(
        report.batch.outcomes[0],
        RequestOutcome::MissingIdentity {
            oid: "ghost".to_string()
        }
    );
    assert!(report.batch.outcomes[1].is_applied());
    assert_eq!(report.batch.diffs.len(), 1);
    assert_eq!(
        std::fs::read_to_string(session.root().join("a.tsx")).unwrap(),
        "export const A = () => <div data-oid=\"a\">hi</div>;\n"
    );
}

#[tokio::test]
async fn test_removed_identity_is_gone_after_rebuild() {
    let dir = project(&[(
        "list.tsx",
        "export const List = () => (\n  <ul data-oid=\"list\">\n    <li data-oid=\"one\">1</li>\n    <li data-oid=\"two\">2</li>\n  </ul>\n);\n",
    )]);
    let session = Session::open(dir.path(), Config::default()).await.unwrap();
    assert!(session.template_node("one").is_some());

    let report = session
        .apply(&[request(
            "list",
            vec![StructureAction::Remove(RemoveAction {
                target_position: Some(TargetPosition::Index { index: 0 }),
            })],
        )])
        .await;
    assert!(report.success());
    assert!(session.template_node("one").is_none());

    session.rebuild().await;
    assert!(session.template_node("one").is_none());
    assert!(session.template_node("two").is_some());
}

#[tokio::test]
async fn test_deleted_file_leaves_map_on_rebuild() {
    let dir = project(&[
        ("a.tsx", "export const A = () => <div data-oid=\"a\" />;\n"),
        ("b.tsx", "export const B = () => <div data-oid=\"b\" />;\n"),
    ]);
    let session = Session::open(dir.path(), Config::default()).await.unwrap();
    assert_eq!(session.files().len(), 2);

    std::fs::remove_file(dir.path().join("b.tsx")).unwrap();
    session.rebuild().await;

    assert_eq!(session.files(), vec![session.root().join("a.tsx")]);
    assert!(session.template_node("b").is_none());
}

/// Real file system that refuses writes to one path
struct LockedFile {
    locked: PathBuf,
}

impl FileSystem for LockedFile {
    fn exists(&self, path: &Path) -> bool {
        RealFileSystem.exists(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, io::Error> {
        RealFileSystem.canonicalize(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String, io::Error> {
        RealFileSystem.read_to_string(path)
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), io::Error> {
        if path == self.locked {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
        }
        RealFileSystem.write_atomic(path, contents)
    }
}

#[tokio::test]
async fn test_write_failure_is_per_file() {
    let dir = project(&[
        ("a.tsx", "export const A = () => <div data-oid=\"a\" />;\n"),
        ("b.tsx", "export const B = () => <div data-oid=\"b\" />;\n"),
    ]);
    let root = dir.path().canonicalize().unwrap();
    let fs = Arc::new(LockedFile {
        locked: root.join("a.tsx"),
    });
    let session = Session::open_with(&root, Config::default(), fs).await.unwrap();

    let class_request = |oid: &str| EditRequest {
        oid: oid.to_string(),
        attributes: Some(AttributeEdits {
            class_name: Some("p-2".to_string()),
        }),
        ..Default::default()
    };
    let report = session.apply(&[class_request("a"), class_request("b")]).await;

    assert!(report.batch.all_applied());
    assert!(!report.writes.success());
    let failures: Vec<_> = report.writes.failures().map(|r| r.path.clone()).collect();
    assert_eq!(failures, vec![root.join("a.tsx")]);
    assert!(std::fs::read_to_string(root.join("b.tsx")).unwrap().contains("className=\"p-2\""));
    assert!(!std::fs::read_to_string(root.join("a.tsx")).unwrap().contains("p-2"));
}

#[tokio::test]
async fn test_queries() {
    let dir = project(&[(
        "app/page.tsx",
        "import { Card } from './card';\n\nexport default function Page() {\n  return (\n    <main data-oid=\"main\">\n      <Card data-oid=\"c1\" />\n      <Card data-oid=\"c2\" title=\"b\" />\n    </main>\n  );\n}\n\nfunction helper() {}\n",
    )]);
    let session = Session::open(dir.path(), Config::default()).await.unwrap();

    let block = session.code_block("c2", false).await.unwrap();
    assert_eq!(block, "<Card data-oid=\"c2\" title=\"b\" />");
    assert_eq!(session.code_block("c2", true).await.unwrap(), "<Card title=\"b\" />");
    assert_eq!(session.code_block("nope", false).await, None);

    assert_eq!(session.instance_child("main", "Card", 1).await.as_deref(), Some("c2"));
    assert_eq!(session.instance_child("main", "Card", 5).await, None);

    assert_eq!(session.components("app/page.tsx").await.unwrap(), vec!["Page"]);

    let clean = session.clean_source("app/page.tsx").await.unwrap();
    assert!(!clean.contains("data-oid"));
    assert!(clean.contains("<Card title=\"b\" />"));
}

#[tokio::test]
async fn test_close_clears_map() {
    let dir = project(&[("a.tsx", "export const A = () => <div data-oid=\"a\" />;\n")]);
    let session = Session::open(dir.path(), Config::default()).await.unwrap();
    assert!(!session.template_map().is_empty());
    session.close();
}

async fn next_change(changes: &mut tokio::sync::broadcast::Receiver<FileChange>) -> FileChange {
    tokio::time::timeout(Duration::from_secs(10), changes.recv())
        .await
        .expect("no change within timeout")
        .unwrap()
}

#[tokio::test]
async fn test_watcher_reports_outside_edits_only() {
    let dir = project(&[
        ("a.tsx", "export const A = () => <div data-oid=\"a\">x</div>;\n"),
        ("b.tsx", "export const B = () => <div data-oid=\"b\" />;\n"),
    ]);
    let config = Config {
        debounce_ms: 50,
        ..Config::default()
    };
    let session = Session::open(dir.path(), config).await.unwrap();
    let mut changes = session.subscribe();
    session.start_watching().await.unwrap();
    assert!(session.is_watching());
    assert!(matches!(
        session.start_watching().await,
        Err(WatchError::AlreadyWatching(_))
    ));

    // Our own write is not reported back
    let report = session
        .apply(&[EditRequest {
            oid: "a".to_string(),
            text_content: Some("mine".to_string()),
            ..Default::default()
        }])
        .await;
    assert!(report.success());
    tokio::time::sleep(Duration::from_millis(300)).await;

    // An outside edit is, after the map has been refreshed
    let b = session.root().join("b.tsx");
    std::fs::write(&b, "export const B = () => <section data-oid=\"b2\" />;\n").unwrap();

    let change = next_change(&mut changes).await;
    assert_eq!(change.path, b);
    assert_eq!(change.kind, ChangeKind::Modified);
    assert!(session.template_node("b2").is_some());
    assert!(session.template_node("b").is_none());

    std::fs::remove_file(&b).unwrap();
    let change = next_change(&mut changes).await;
    assert_eq!(change.kind, ChangeKind::Removed);
    assert!(session.template_node("b2").is_none());

    session.stop_watching();
    assert!(!session.is_watching());
}

#[tokio::test]
async fn test_watcher_reports_revert_to_scanned_text() {
    let dir = project(&[("a.tsx", "export const A = () => <div>x</div>;\n")]);
    let config = Config {
        debounce_ms: 50,
        ..Config::default()
    };
    let session = Session::open(dir.path(), config).await.unwrap();
    let path = session.root().join("a.tsx");

    // Persisting the injected identity left a token no watcher will consume
    assert_eq!(session.project().filter.pending_count(), 1);
    let scanned = std::fs::read_to_string(&path).unwrap();

    let mut changes = session.subscribe();
    session.start_watching().await.unwrap();
    assert_eq!(session.project().filter.pending_count(), 0);

    std::fs::write(&path, "export const A = () => <div data-oid=\"other\">x</div>;\n").unwrap();
    let change = next_change(&mut changes).await;
    assert_eq!(change.path, path);
    assert!(session.template_node("other").is_some());

    // Restoring the text the scan wrote is an outside edit too
    std::fs::write(&path, &scanned).unwrap();
    let change = next_change(&mut changes).await;
    assert_eq!(change.path, path);
    assert_eq!(change.kind, ChangeKind::Modified);
    assert!(session.template_node("other").is_none());

    session.stop_watching();
}
