//! Scoped cleanup guard for temp/output files created mid-pipeline. Deletes
//! everything it was told about unless explicitly told to keep them, so every
//! exit path (including `?`-propagated errors) leaves no stray files behind.

use std::fs;
use std::path::PathBuf;

pub struct TempCleanup {
    paths: Vec<PathBuf>,
    keep: bool,
}

impl TempCleanup {
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            keep: false,
        }
    }

    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Cancels cleanup: the tracked paths are left on disk (ownership has
    /// transferred to whoever now owns them, e.g. the Storage Sink).
    pub fn keep(mut self) {
        self.keep = true;
    }
}

impl Default for TempCleanup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempCleanup {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        for path in &self.paths {
            let _ = fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn drop_removes_tracked_paths_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.raw");
        std::fs::File::create(&path).unwrap().write_all(b"x").unwrap();

        {
            let mut cleanup = TempCleanup::new();
            cleanup.add(path.clone());
        }

        assert!(!path.exists());
    }

    #[test]
    fn keep_prevents_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.raw");
        std::fs::File::create(&path).unwrap().write_all(b"x").unwrap();

        {
            let mut cleanup = TempCleanup::new();
            cleanup.add(path.clone());
            cleanup.keep();
        }

        assert!(path.exists());
    }
}
