//! Project-level synchronization between edit requests and source files:
//! the template map, diff production, atomic writes and file watching,
//! owned by a [`Session`].

pub mod config;
pub mod diff;
pub mod errors;
pub mod locks;
pub mod project;
pub mod scan;
pub mod self_edit;
pub mod session;
pub mod template_map;
pub mod watcher;
pub mod writer;

pub use config::{Config, FormatterConfig, DEFAULT_CONFIG_NAME};
pub use diff::{build_diffs, CodeDiff, DiffBatch, RequestOutcome};
pub use errors::{ConfigError, WatchError, WorkspaceError, WorkspaceResult, WriteError};
pub use locks::{normalize_path, PathLocks};
pub use project::Project;
pub use scan::{RebuildReport, ScanReport};
pub use self_edit::{SelfEditFilter, WriteToken};
pub use session::{ApplyReport, Session};
pub use template_map::{CoreElementType, DynamicType, TagRange, TemplateMap, TemplateNode};
pub use watcher::{ChangeKind, FileChange, FileWatcher};
pub use writer::{ExternalFormatter, FileWriteResult, Formatter, NoopFormatter, SourceWriter, WriteReport};
