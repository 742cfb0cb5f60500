//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo;
use assert_cmd::Command;
use tempfile::TempDir;

/// Stock export used by most tests: five items plus a total row
pub const SAMPLE: &str = "\
Código Produto;Código Acesso;Produto;Quantidade em Estoque;Dias Ult. Entrada;Custo Liq. Unitário;Valor Custo Bruto
100;7891;Arroz Tipo 1 5kg;10;3;2,50;
200;;Feijão Carioca;4;12;8,00;
;555;Óleo de Soja;3;;;7,25
;;Sal Grosso;1;;1,00;
300;;Açúcar;1.200,00;5;4,00;
;;TOTAL GERAL;1.218,00;;;
";

/// Helper to get a tally command
pub fn tally() -> Command {
    Command::new(cargo::cargo_bin!("tally"))
}

/// An isolated device: its own data dir, config dir and user name
pub struct Device {
    pub tmp: TempDir,
    pub user: String,
    pub sync_dir: Option<PathBuf>,
}

impl Device {
    pub fn new(user: &str) -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
            user: user.to_string(),
            sync_dir: None,
        }
    }

    /// A device that exchanges counts through `sync_dir`
    pub fn with_sync(user: &str, sync_dir: &std::path::Path) -> Self {
        Self {
            sync_dir: Some(sync_dir.to_path_buf()),
            ..Self::new(user)
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.tmp.path().join("data")
    }

    /// A tally command bound to this device
    pub fn cmd(&self) -> Command {
        let mut cmd = tally();
        cmd.current_dir(self.tmp.path())
            .env("HOME", self.tmp.path())
            .env("XDG_CONFIG_HOME", self.tmp.path().join("config"))
            .env("XDG_DATA_HOME", self.tmp.path().join("share"))
            .env("TALLY_DATA_DIR", self.data_dir())
            .env("TALLY_USER", &self.user)
            .env_remove("TALLY_SYNC_DIR")
            .env_remove("RUST_LOG");
        if let Some(dir) = &self.sync_dir {
            cmd.env("TALLY_SYNC_DIR", dir);
        }
        cmd
    }

    /// Write a file into the device directory and return its path
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.tmp.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Load [`SAMPLE`] as `estoque.csv`
    pub fn load_sample(&self) {
        let path = self.write_file("estoque.csv", SAMPLE);
        self.cmd()
            .arg("load")
            .arg(path)
            .assert()
            .success();
    }

    /// Record a count and assert it was accepted
    pub fn count(&self, reference: &str, qty: &str) {
        self.cmd()
            .args(["count", reference, qty])
            .assert()
            .success();
    }

    /// Run a command with `-o json` and parse its stdout
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.cmd().args(args).args(["-o", "json"]).output().unwrap();
        assert!(
            output.status.success(),
            "command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}
