#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Isolated database and config for one test
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    pub fn init() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("data").join("homedo.db")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.config_path();
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("homedo").expect("binary");
        cmd.current_dir(self.path())
            .env("HOMEDO_DB", self.db_path())
            .env("HOMEDO_CONFIG", self.config_path())
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run with `--json`, assert success, and return the envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }

    /// Create a task and return its ID.
    pub fn add_task(&self, args: &[&str]) -> String {
        let mut full = vec!["task", "add"];
        full.extend_from_slice(args);
        let envelope = self.json(&full);
        envelope["data"]["task"]["id"]
            .as_str()
            .expect("task id")
            .to_string()
    }
}
