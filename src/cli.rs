//! CLI argument surface (spec.md §2 "CLI surface"): a `search-systems`
//! subcommand driving the full pipeline and a `check-package` subcommand
//! exposing spec.md §9's Open Question.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::common;

#[derive(Debug, Parser)]
#[command(author, version, about = "Detection of macromolecular systems in prokaryotic protein datasets")]
pub struct Cli {
    #[command(flatten)]
    pub common: common::Args,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the detection pipeline against a sequence database.
    SearchSystems(SearchSystemsArgs),
    /// Validate a model package without running detection.
    CheckPackage(CheckPackageArgs),
}

#[derive(Debug, Args)]
pub struct SearchSystemsArgs {
    /// Directory tree holding `metadata.yml`, `definitions/*.xml`, `profiles/*.hmm`.
    #[arg(long)]
    pub package_dir: PathBuf,

    /// Model family to detect; defaults to every model in the package.
    #[arg(long)]
    pub family: Option<String>,

    /// Sequence database, optionally gzip-compressed FASTA.
    #[arg(long)]
    pub sequence_db: PathBuf,

    /// `unordered`, `ordered_replicon`, or `gembase`.
    #[arg(long, default_value = "unordered")]
    pub db_type: String,

    /// Optional `<replicon>\t<linear|circular>` topology file.
    #[arg(long)]
    pub topology_file: Option<PathBuf>,

    /// Directory the tabular and text reports are written under.
    #[arg(long, default_value = "macsylib_results")]
    pub output_dir: PathBuf,

    /// Number of HMMER worker processes.
    #[arg(long)]
    pub worker_count: Option<usize>,

    /// Wall-clock budget per replicon for the solution resolver, in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Extra YAML configuration files, lowest precedence first (spec.md §6.3).
    #[arg(long = "cfg-file")]
    pub cfg_files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CheckPackageArgs {
    #[arg(long)]
    pub package_dir: PathBuf,

    #[arg(long)]
    pub family: String,

    /// Downgrade every issue found to a warning instead of an error.
    #[arg(long)]
    pub lenient: bool,
}
