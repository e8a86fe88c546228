pub mod apply;
pub mod components;
pub mod locate;
pub mod scan;
pub mod strip;
pub mod watch;

pub use apply::{apply, ApplyArgs};
pub use components::{components, ComponentsArgs};
pub use locate::{locate, LocateArgs};
pub use scan::{scan, ScanArgs};
pub use strip::{strip, StripArgs};
pub use watch::{watch, WatchArgs};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tessera_workspace::{Config, Session};

/// Project root from the command line, or the current directory
fn project_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(root) => Ok(root),
        None => std::env::current_dir().context("cannot get current directory"),
    }
}

/// Open a session with the root's `tessera.config.json`
async fn open_session(root: Option<PathBuf>) -> Result<Session> {
    let root = project_root(root)?;
    let config = Config::load(&root)?;
    let session = Session::open(&root, config).await?;
    Ok(session)
}

/// Read a source file, rendering parse errors against its text
fn parse_file(path: &Path) -> Result<(String, tessera_parser::Module)> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let name = path.to_string_lossy();
    match tessera_parser::parse_with_path(&source, &name) {
        Ok(module) => Ok((source, module)),
        Err(err) => {
            eprint!("{}", err.report(&name, &source));
            Err(err.into())
        }
    }
}
