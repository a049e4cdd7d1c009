use crate::cli::opts::{Cli, StoreKind};
use convodeck_json::paths::data_root;
use std::path::PathBuf;

const SQLITE_FILE: &str = "convodeck.sqlite3";

/// Settings resolved from flags, `CONVODECK_*` env vars and platform defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreKind,
    pub data_dir: PathBuf,
    pub max_backups: usize,
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            store: cli.store,
            data_dir: cli.data_dir.clone().unwrap_or_else(data_root),
            max_backups: cli.max_backups.max(1),
        }
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join(SQLITE_FILE)
    }
}
