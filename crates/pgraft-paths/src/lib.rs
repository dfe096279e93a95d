//! Per-node data directory layout.
//!
//! Every node keeps its state under a single `--data-dir` (default
//! `./data`), namespaced by node id: a `sled` file for the KV façade and a
//! directory for the consensus runtime's own log/state files.

use std::path::{Path, PathBuf};

/// The directory structure for one node, rooted at `--data-dir`.
#[derive(Debug, Clone)]
pub struct NodePaths {
    root: PathBuf,
    id: String,
}

impl NodePaths {
    pub fn new(root: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            id: id.into(),
        }
    }

    /// Ensures the data directory and this node's raft subdirectory exist.
    pub fn create_all(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.raft_dir())
    }

    /// Path to this node's `sled` KV file: `<root>/data<id>`.
    pub fn kv_file(&self) -> PathBuf {
        self.root.join(format!("data{}", self.id))
    }

    /// Path to this node's raft state directory: `<root>/raft<id>/`.
    pub fn raft_dir(&self) -> PathBuf {
        self.root.join(format!("raft{}", self.id))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_namespaced_by_id() {
        let paths = NodePaths::new("./data", "2");
        assert_eq!(paths.kv_file(), PathBuf::from("./data/data2"));
        assert_eq!(paths.raft_dir(), PathBuf::from("./data/raft2"));
    }
}
