//src/workdir.rs

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};

/// The directory all intermediate files live in for one run.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Creates `path`, which must not exist yet.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(Error::WorkDirExists(path.to_path_buf()));
        }
        log::info!("mkdir {}", path.display());
        fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn snapshot(&self) -> Result<BTreeSet<String>> {
        list_dir(&self.path)
    }

    /// Logs the files that appeared since `before` was taken.
    pub fn report_new_files(&self, before: &BTreeSet<String>) -> Result<Vec<String>> {
        let new_files: Vec<String> = self.snapshot()?.difference(before).cloned().collect();
        match new_files.len() {
            0 => {}
            1 => log::info!("New file: {}", new_files[0]),
            _ => log::info!("New files: {}", new_files.join(", ")),
        }
        Ok(new_files)
    }

    /// Scratch subdirectory for daligner/datander (`-P`), removed afterwards.
    pub fn with_scratch_dir<T>(&self, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let scratch = self.join(name);
        log::info!("mkdir {name}");
        fs::create_dir(&scratch).map_err(|e| Error::io(&scratch, e))?;
        let result = f();
        log::info!("rm -r {name}");
        let removed = fs::remove_dir_all(&scratch).map_err(|e| Error::io(&scratch, e));
        let value = result?;
        removed?;
        Ok(value)
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        log::info!("mv {from} {to}");
        let source = self.join(from);
        fs::rename(&source, self.join(to)).map_err(|e| Error::io(source, e))
    }

    pub fn remove(self) -> Result<()> {
        log::info!("rm -r {}", self.path.display());
        fs::remove_dir_all(&self.path).map_err(|e| Error::io(&self.path, e))
    }
}

fn list_dir(path: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(path).map_err(|e| Error::io(path, e))? {
        let entry = entry.map_err(|e| Error::io(path, e))?;
        names.insert(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}
