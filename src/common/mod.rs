//! Common, cross-cutting types shared by every stage of the pipeline.

use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Commonly used command line arguments, flattened into every subcommand.
#[derive(Parser, Debug, Clone)]
pub struct Args {
    /// Verbosity of the program.
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// The version of the `macsylib` package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run-level metadata threaded into the Reporter so that every output file
/// can carry the `#`-comment header spec.md §6.4 requires (tool version,
/// command line, model package version).
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub tool_version: String,
    pub command_line: String,
    pub model_package_version: String,
}

impl RunMetadata {
    pub fn new(command_line: impl Into<String>, model_package_version: impl Into<String>) -> Self {
        Self {
            tool_version: VERSION.to_string(),
            command_line: command_line.into(),
            model_package_version: model_package_version.into(),
        }
    }
}

/// Warnings inlined as `#`-comments in output files (spec.md §7's
/// propagation policy: "warnings are inlined ... parseable alongside data").
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A loner hit is claimed by more candidates than it has occurrences
    /// for, and the gene is not `multi_system` (spec.md §4.4 point 5).
    LonerUndersupplied {
        gene: String,
        available: usize,
        candidate_count: usize,
    },
    /// The resolver's branch-and-bound search hit its wall-clock budget on
    /// this replicon before completing (spec.md §4.6 Terminal states).
    ReplionTimeout { replicon: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::LonerUndersupplied {
                gene,
                available,
                candidate_count,
            } => write!(
                f,
                "# WARNING Loner: there is only {available} occurrence(s) of loner '{gene}' \
                 and {candidate_count} potential systems [...]"
            ),
            Warning::ReplionTimeout { replicon } => write!(
                f,
                "# WARNING Timeout: replicon '{replicon}' did not finish solution search \
                 within the configured budget; reporting the best solution found so far"
            ),
        }
    }
}

/// Scoped ownership of the temporary working directory for one run
/// (spec.md §5: "a run owns the directory for its lifetime and releases
/// (but does not delete unless told) on completion").
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    _guard: Option<tempfile::TempDir>,
    delete_on_drop: bool,
}

impl WorkDir {
    /// Create a fresh scratch directory that is deleted when this value is
    /// dropped.
    pub fn scoped() -> std::io::Result<Self> {
        let guard = tempfile::Builder::new().prefix("macsylib-").tempdir()?;
        let path = guard.path().to_path_buf();
        Ok(Self {
            path,
            _guard: Some(guard),
            delete_on_drop: true,
        })
    }

    /// Use a caller-provided directory that is left on disk when this value
    /// is dropped.
    pub fn persistent(path: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&path)?;
        Ok(Self {
            path,
            _guard: None,
            delete_on_drop: false,
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn deletes_on_drop(&self) -> bool {
        self.delete_on_drop
    }
}
