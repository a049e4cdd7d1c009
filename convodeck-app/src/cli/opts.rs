use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Json,
    Sqlite,
}

#[derive(Debug, Parser, Clone)]
#[command(name = "convodeck", version, about = "ConvoDeck conversation cards: import sets, track progress")]
pub struct Cli {
    /// Storage backend
    #[arg(long, value_enum, env = "CONVODECK_STORE", default_value_t = StoreKind::Json)]
    pub store: StoreKind,

    /// Directory holding the store files (defaults to the app data dir)
    #[arg(long, env = "CONVODECK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Backups kept by the JSON store
    #[arg(long, env = "CONVODECK_MAX_BACKUPS", default_value_t = 10)]
    pub max_backups: usize,

    /// Log filter, e.g. `info` or `convodeck_core=debug` (falls back to RUST_LOG)
    #[arg(long, env = "CONVODECK_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Import a card set from a JSON file
    Import(ImportCmd),
    /// Card set operations
    #[command(subcommand)]
    Sets(SetsCmd),
    /// Record that a card was viewed
    View { set: String, card_id: String },
    /// Progress queries
    #[command(subcommand)]
    Progress(ProgressCmd),
    /// Walk through a set's cards, recording each view
    Study(StudyCmd),
}

#[derive(Debug, Args, Clone)]
pub struct ImportCmd {
    pub path: PathBuf,
    /// Print the import result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum SetsCmd {
    List,
    Show { name: String },
    Rm { name: String },
    /// Write a stored set back out as an importable JSON document
    Export { name: String, path: PathBuf },
}

#[derive(Debug, Subcommand, Clone)]
pub enum ProgressCmd {
    Show {
        set: String,
        /// Card count to measure against (defaults to the stored set's size)
        #[arg(long)]
        total: Option<usize>,
    },
    All,
    Reset { set: String },
}

#[derive(Debug, Args, Clone)]
pub struct StudyCmd {
    pub set: String,
    /// Only cards not yet seen
    #[arg(long)]
    pub unseen: bool,
    #[arg(long)]
    pub category: Option<String>,
}
