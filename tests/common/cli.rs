//! Helpers for running the `decksync` binary in an isolated directory.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch working directory that also serves as `HOME`, so no user or
/// project config leaks into a test.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("workspace tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    /// `decksync` with the workspace as cwd and a clean environment.
    pub fn decksync(&self) -> Command {
        let mut cmd = Command::cargo_bin("decksync").expect("decksync binary");
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env_remove("RUST_LOG")
            .env_remove("DECKSYNC_ENDPOINT")
            .env_remove("DECKSYNC_BASE_COLLECTION")
            .env_remove("DECKSYNC_FAILURE_LOG")
            .env_remove("DECKSYNC_TIMEOUT_SECS");
        cmd
    }
}

pub const SAMPLE_CSV: &str = "\
Deck,Front,Back,Ref,Tags
Meteo,What is foehn?,A warm dry wind,MET 4.2,\"wind, alps\"
Meteo,The {{c1::tropopause}} caps the weather,,MET 1.1,layers
Nav,What does VOR stand for?,VHF omnidirectional range,NAV 3,radio
";
