//! Storage layer for Cairn data.
//!
//! The manifest is a single JSON document at `.cairn/tasks.json` inside the
//! project directory. It is loaded fully into memory, mutated, and
//! rewritten wholesale on every commit; there is no incremental
//! persistence. Commits replace the file atomically (write to a temporary
//! file in the same directory, then rename) so a crash mid-write leaves
//! the prior version intact and no partial file is ever visible at the
//! canonical path.
//!
//! The transaction log lives alongside the manifest; see [`txlog`].

pub mod txlog;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::models::Manifest;
use crate::{Error, Result};

/// Directory holding Cairn data inside a project.
pub const DATA_DIR: &str = ".cairn";

/// Manifest file name within the data directory.
const MANIFEST_FILE: &str = "tasks.json";

/// Walk upward from `start` to the nearest directory containing a `.cairn`
/// data directory.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(DATA_DIR).is_dir() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

/// Owner of the on-disk manifest for one project.
pub struct ManifestStore {
    /// Data directory for this project
    pub root: PathBuf,

    /// Canonical manifest path
    path: PathBuf,
}

impl ManifestStore {
    /// Open storage for an already-initialized project.
    pub fn open(project_dir: &Path) -> Result<Self> {
        let root = project_dir.join(DATA_DIR);
        let path = root.join(MANIFEST_FILE);
        if !path.exists() {
            return Err(Error::NotInitialized);
        }
        Ok(Self { root, path })
    }

    /// Initialize storage for a project, creating an empty manifest.
    ///
    /// A manifest that already exists is left untouched.
    pub fn init(project_dir: &Path, name: String, description: Option<String>) -> Result<Self> {
        let root = project_dir.join(DATA_DIR);
        fs::create_dir_all(&root)?;

        let store = Self {
            path: root.join(MANIFEST_FILE),
            root,
        };
        if !store.path.exists() {
            let mut manifest = Manifest::new(name, description);
            store.commit(&mut manifest)?;
        }
        Ok(store)
    }

    /// Check whether a project has been initialized.
    pub fn exists(project_dir: &Path) -> bool {
        project_dir.join(DATA_DIR).join(MANIFEST_FILE).exists()
    }

    /// Path to the canonical manifest file.
    pub fn manifest_path(&self) -> &Path {
        &self.path
    }

    /// Load the current manifest.
    pub fn load(&self) -> Result<Manifest> {
        let data = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Replace the persisted manifest.
    ///
    /// Recomputes `stats` from the task sequence, then writes the whole
    /// document to a temporary file in the data directory, flushes it, and
    /// renames it over the canonical path. On any error the prior manifest
    /// is still on disk and the temporary file is cleaned up.
    pub fn commit(&self, manifest: &mut Manifest) -> Result<()> {
        manifest.refresh_stats();

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(&mut tmp, manifest)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}
