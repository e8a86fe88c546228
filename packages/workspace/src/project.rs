use std::path::{Path, PathBuf};
use std::sync::Arc;

use tessera_common::FileSystem;

use crate::config::Config;
use crate::locks::PathLocks;
use crate::self_edit::SelfEditFilter;
use crate::template_map::TemplateMap;

/// State shared by every task of one open project
#[derive(Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub fs: Arc<dyn FileSystem>,
    pub filter: Arc<SelfEditFilter>,
    pub locks: PathLocks,
    pub map: Arc<TemplateMap>,
}

impl Project {
    pub fn new(root: PathBuf, config: Config, fs: Arc<dyn FileSystem>) -> Self {
        let filter = Arc::new(SelfEditFilter::with_ttl(config.self_edit_ttl()));
        Self {
            root,
            config: Arc::new(config),
            fs,
            filter,
            locks: PathLocks::new(),
            map: Arc::new(TemplateMap::new()),
        }
    }

    /// Absolute form of a path given relative to the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn is_source_path(&self, path: &Path) -> bool {
        self.config.is_source_path(&self.root, path)
    }
}
