//! Common test utilities for ukbsearch CLI tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Variables that would leak the developer's setup into a test run
const SCRUBBED_ENV: &[&str] = &[
    "GLM_API_KEY",
    "GLM_MODEL",
    "GLM_BASE_URL",
    "DB_PATH",
    "LOG_LEVEL",
    "DEBUG",
    "RUST_LOG",
    "MAX_ITERATIONS",
    "ENABLE_RATE_LIMITING",
];

pub const DUMP: &str = r#"
INSERT INTO category (category_id, title, descript) VALUES
    (100, 'Baseline characteristics', NULL),
    (102, 'Cardiac monitoring', NULL);
INSERT INTO field (field_id, title, value_type, units, main_category, encoding_id, notes, num_participants, item_count) VALUES
    (31, 'Sex', 'Categorical single', NULL, 100, 9, NULL, 502000, 502000),
    (102, 'Pulse rate, automated reading', 'Integer', 'bpm', 102, 0, 'Heart rate measured by the blood pressure monitor', 475000, 1900000);
INSERT INTO encoding (encoding_id, title, descript) VALUES (9, 'Sex', NULL);
INSERT INTO esimpint (encoding_id, value, meaning, showcase_order) VALUES
    (9, 0, 'Female', 1),
    (9, 1, 'Male', 2);
"#;

/// Isolated home directory and database for one test
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub db_path: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let config_dir = temp_dir.path().join(".ukbsearch");
        let db_path = temp_dir.path().join("ukb_datadict.db");

        Ok(Self {
            temp_dir,
            config_dir,
            db_path,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    /// Command with HOME and the database pointed into the temp dir
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_ukbsearch"));
        for var in SCRUBBED_ENV {
            cmd.env_remove(var);
        }
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("DB_PATH", &self.db_path);
        cmd
    }

    pub fn write_dump(&self) -> anyhow::Result<PathBuf> {
        let path = self.temp_dir.path().join("dump.sql");
        std::fs::write(&path, DUMP)?;
        Ok(path)
    }

    /// Create and fill the dictionary database
    pub fn create_database(&self) -> anyhow::Result<()> {
        let dump = self.write_dump()?;
        self.command()
            .arg("init-db")
            .arg("--from")
            .arg(&dump)
            .assert()
            .success();
        Ok(())
    }

    pub fn create_config(&self, json: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::write(self.config_file(), json)?;
        Ok(())
    }
}
