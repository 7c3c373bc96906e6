use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(
    about = "Load content files in order and report the merged record store",
    version
)]
pub struct Args {
    /// openmw.cfg-style file with data=, data-local= and content= lines
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Additional data directory, searched after those from --config
    #[arg(long = "data", value_name = "DIR")]
    pub data: Vec<PathBuf>,

    /// Additional content file, loaded after those from --config
    #[arg(long = "content", value_name = "FILE")]
    pub content: Vec<String>,

    /// Match content file names case-insensitively
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub fold_case: bool,

    /// List every record id instead of only per-kind counts
    #[arg(long)]
    pub verbose: bool,

    /// Path to write per-kind counts and ids as JSON
    #[arg(long)]
    pub diagnostics_json: Option<PathBuf>,

    /// Path to write each dialogue topic's merged info ids as JSON
    #[arg(long)]
    pub dialogue_report: Option<PathBuf>,
}
