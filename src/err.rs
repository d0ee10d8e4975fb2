//! Fatal error taxonomy (spec.md §7: configuration / model / I/O errors).
//!
//! Candidate rejections and warnings are *not* modeled here: they are plain
//! data that flows through the pipeline (see [`crate::candidates::RejectionReason`]
//! and [`crate::common::Warning`]), never `Err` values.

use std::process::ExitCode;

/// Configuration errors: unknown option, incompatible `db_type`, missing
/// sequence database. Fatal before any work starts.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unknown option group {group:?} (key {key:?})")]
    UnknownOption { group: String, key: String },
    #[error("db_type {db_type:?} is incompatible with topology file usage")]
    IncompatibleDbType { db_type: String },
    #[error("sequence database not found at {path:?}")]
    MissingSequenceDatabase { path: std::path::PathBuf },
    #[error("could not read config file {path:?}: {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Model errors: XML parse failure, unresolved gene reference, quorum
/// invariant violation, duplicate gene name within a model family. Fatal
/// during load.
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("malformed model definition {path:?}: {source}")]
    XmlParse {
        path: std::path::PathBuf,
        #[source]
        source: quick_xml::DeError,
    },
    #[error("model {model:?} references unknown gene {gene:?}")]
    UnknownGeneReference { model: String, gene: String },
    #[error("model {model:?} references unreachable profile for gene {gene:?} at {path:?}")]
    UnreachableProfile {
        model: String,
        gene: String,
        path: std::path::PathBuf,
    },
    #[error(
        "model {model:?} violates the quorum invariant: min_mandatory_genes_required ({mmgr}) \
         > min_genes_required ({mgr}) or min_genes_required > |mandatory ∪ accessory| ({total})"
    )]
    QuorumInvariantViolated {
        model: String,
        mmgr: usize,
        mgr: usize,
        total: usize,
    },
    #[error("model family {family:?} declares gene {gene:?} more than once")]
    DuplicateGeneName { family: String, gene: String },
    #[error("exchangeables of gene {gene:?} in model {model:?} form a cycle")]
    CyclicExchangeables { model: String, gene: String },
}

/// I/O errors: missing HMM profile, unreadable report, corrupt gzip. Fatal
/// for the affected gene; aborts the run.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error("missing HMM profile for gene {gene:?} at {path:?}")]
    MissingProfile {
        gene: String,
        path: std::path::PathBuf,
    },
    #[error("unreadable HMM report {path:?}: {source}")]
    UnreadableReport {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt gzip stream in {path:?}: {source}")]
    CorruptGzip {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed hit record on line {line} of {path:?}: {detail}")]
    MalformedRecord {
        path: std::path::PathBuf,
        line: usize,
        detail: String,
    },
    #[error("could not write report {path:?}: {source}")]
    ReportWriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Process-level outcome, mapped to the five exit codes of spec.md §6.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Exit 0: success, no replicon timed out.
    Success,
    /// Exit 4: success, but at least one replicon hit its search timeout.
    SuccessWithTimeout,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::from(0),
            Outcome::SuccessWithTimeout => ExitCode::from(4),
        }
    }
}

/// Maps a top-level `anyhow::Error` onto the user/data/runtime exit codes of
/// spec.md §6.5 by downcasting to the taxonomy above. Unclassified errors
/// are treated as runtime errors (exit 3), the most conservative choice.
pub fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    if error.downcast_ref::<ConfigError>().is_some() {
        ExitCode::from(1)
    } else if error.downcast_ref::<ModelError>().is_some() {
        ExitCode::from(2)
    } else if error.downcast_ref::<IoError>().is_some() {
        match error.downcast_ref::<IoError>() {
            Some(IoError::MissingProfile { .. }) | Some(IoError::UnreadableReport { .. }) => {
                ExitCode::from(2)
            }
            _ => ExitCode::from(3),
        }
    } else {
        ExitCode::from(3)
    }
}
