//! Temporary file map
//!
//! One file per KV collection, named `{collection}.txt`. The map is built
//! once from configuration and handed to every builder and loader, so no
//! component derives paths on its own.

use hyperload_core::{KvCollection, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix of the sort output before it replaces the original file
pub const SORTED_SUFFIX: &str = "sorted";

/// Collection -> temporary file path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempFiles {
    paths: [PathBuf; KvCollection::COUNT],
}

impl TempFiles {
    /// `{dir}/{collection}.txt` for every collection
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            paths: KvCollection::ALL.map(|c| dir.join(format!("{}.txt", c.as_str()))),
        }
    }

    /// Override the path of one collection
    pub fn with_path(mut self, collection: KvCollection, path: impl Into<PathBuf>) -> Self {
        self.paths[collection as usize] = path.into();
        self
    }

    /// Path of `collection`'s file
    pub fn path(&self, collection: KvCollection) -> &Path {
        &self.paths[collection as usize]
    }

    /// Every (collection, path) pair
    pub fn iter(&self) -> impl Iterator<Item = (KvCollection, &Path)> {
        KvCollection::ALL
            .iter()
            .map(move |&c| (c, self.path(c)))
    }

    /// Remove every file, ignoring ones that do not exist
    pub fn remove_all(&self) -> Result<()> {
        for (collection, path) in self.iter() {
            match fs::remove_file(path) {
                Ok(()) => debug!(target: "hyperload::files", %collection, path = %path.display(), "Removed temporary file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// `{path}.sorted`
pub fn sorted_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(SORTED_SUFFIX);
    PathBuf::from(name)
}
