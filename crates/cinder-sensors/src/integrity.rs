//! File-integrity sensor
//!
//! Takes an mtime snapshot of a watched tree at construction. Any
//! modified, created or deleted file afterwards is treated as maximum
//! threat: someone is touching the operator's files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use cinder_core::Sensor;
use tracing::debug;

/// Directories never worth watching.
const SKIP_DIRS: &[&str] = &[".git", "target", "node_modules", "__pycache__"];

pub struct FileIntegritySensor {
    root: PathBuf,
    weight: f64,
    snapshot: HashMap<PathBuf, SystemTime>,
}

impl FileIntegritySensor {
    /// Snapshot `root` now; later scores compare against this moment.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_weight(root, 2.0)
    }

    pub fn with_weight(root: impl Into<PathBuf>, weight: f64) -> Self {
        let root = root.into();
        let mut snapshot = HashMap::new();
        collect_mtimes(&root, &mut snapshot);
        debug!(root = %root.display(), files = snapshot.len(), "integrity snapshot taken");

        Self {
            root,
            weight,
            snapshot,
        }
    }

    /// Count of files in the baseline snapshot.
    pub fn baseline_len(&self) -> usize {
        self.snapshot.len()
    }
}

/// Record mtimes for every regular file under `dir`, skipping noisy
/// directories. Unreadable entries are skipped, matching the score-time
/// walk so they never count as phantom changes.
fn collect_mtimes(dir: &Path, out: &mut HashMap<PathBuf, SystemTime>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let name = entry.file_name();
            if SKIP_DIRS.iter().any(|s| name == *s) {
                continue;
            }
            collect_mtimes(&path, out);
        } else if let Ok(meta) = entry.metadata() {
            if let Ok(mtime) = meta.modified() {
                out.insert(path, mtime);
            }
        }
    }
}

impl Sensor for FileIntegritySensor {
    fn name(&self) -> &str {
        "file integrity"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self) -> anyhow::Result<f64> {
        let mut current = HashMap::new();
        collect_mtimes(&self.root, &mut current);

        let mut changes = 0usize;

        for (path, mtime) in &current {
            match self.snapshot.get(path) {
                Some(snap) if snap == mtime => {}
                // Modified or newly created
                _ => changes += 1,
            }
        }
        for path in self.snapshot.keys() {
            if !current.contains_key(path) {
                changes += 1;
            }
        }

        if changes > 0 {
            debug!(root = %self.root.display(), changes, "integrity drift detected");
            return Ok(1.0);
        }
        Ok(0.0)
    }
}
