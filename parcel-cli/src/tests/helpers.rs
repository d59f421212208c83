//! Temporary workspaces and runtimes shared by the CLI tests.

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// UTF-8 scratch directory removed when dropped.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn output(&self) -> Utf8PathBuf {
        self.path("parcels.geojson")
    }

    pub(super) fn credentials_file(&self) -> Utf8PathBuf {
        self.path("settings/credentials.json")
    }
}

pub(super) fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

pub(super) fn read_json(path: &Utf8Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path).expect("read output");
    serde_json::from_str(&text).expect("output is JSON")
}
