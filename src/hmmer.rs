//! HMMER invocation seam (spec.md §1 "explicitly out-of-scope collaborator",
//! §5 "External HMMER invocation (process wait)"). The core engine never
//! depends on the HMMER binary directly: it asks a [`HmmSearchRunner`] for a
//! gene's report path and parses whatever comes back.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::err::IoError;

/// Runs one `(gene, profile)` HMM search against the sequence database and
/// returns the path to its raw report (spec.md §5 "Scheduling model").
pub trait HmmSearchRunner {
    fn search(&self, gene: &str, profile_path: &Path, sequence_db: &Path, work_dir: &Path) -> Result<PathBuf, IoError>;
}

/// Spawns the external `hmmsearch` binary and waits for it to complete,
/// writing its tabular output under `work_dir`.
pub struct Real {
    pub binary: PathBuf,
}

impl Default for Real {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("hmmsearch"),
        }
    }
}

impl Real {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

impl HmmSearchRunner for Real {
    fn search(&self, gene: &str, profile_path: &Path, sequence_db: &Path, work_dir: &Path) -> Result<PathBuf, IoError> {
        if !profile_path.exists() {
            return Err(IoError::MissingProfile {
                gene: gene.to_string(),
                path: profile_path.to_path_buf(),
            });
        }
        let report_path = work_dir.join(format!("{gene}.tsv"));
        let status = Command::new(&self.binary)
            .arg("--tblout")
            .arg(&report_path)
            .arg(profile_path)
            .arg(sequence_db)
            .status()
            .map_err(|source| IoError::UnreadableReport {
                path: report_path.clone(),
                source,
            })?;
        if !status.success() {
            return Err(IoError::UnreadableReport {
                path: report_path,
                source: std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("hmmsearch exited with status {status}"),
                ),
            });
        }
        Ok(report_path)
    }
}

/// Replays a canned report per gene, used in tests so the pipeline stages
/// downstream of the Hit Stream are exercised without HMMER installed
/// (spec.md §5).
#[derive(Debug, Default)]
pub struct Fake {
    pub reports: std::collections::HashMap<String, PathBuf>,
}

impl Fake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(mut self, gene: impl Into<String>, path: PathBuf) -> Self {
        self.reports.insert(gene.into(), path);
        self
    }
}

impl HmmSearchRunner for Fake {
    fn search(&self, gene: &str, _profile_path: &Path, _sequence_db: &Path, _work_dir: &Path) -> Result<PathBuf, IoError> {
        self.reports.get(gene).cloned().ok_or_else(|| IoError::MissingProfile {
            gene: gene.to_string(),
            path: PathBuf::from("<fake>"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_runner_returns_the_canned_report_for_a_known_gene() {
        let runner = Fake::new().with_report("gspD", PathBuf::from("/tmp/gspD.tsv"));
        let path = runner
            .search("gspD", Path::new("gspD.hmm"), Path::new("db.fasta"), Path::new("/tmp"))
            .unwrap();
        assert_eq!(PathBuf::from("/tmp/gspD.tsv"), path);
    }

    #[test]
    fn fake_runner_reports_missing_profile_for_an_unknown_gene() {
        let runner = Fake::new();
        let err = runner
            .search("unknown", Path::new("x.hmm"), Path::new("db.fasta"), Path::new("/tmp"))
            .unwrap_err();
        assert!(matches!(err, IoError::MissingProfile { .. }));
    }

    #[test]
    fn real_runner_reports_missing_profile_before_spawning() {
        let runner = Real::default();
        let err = runner
            .search(
                "gspD",
                Path::new("/nonexistent/gspD.hmm"),
                Path::new("db.fasta"),
                Path::new("/tmp"),
            )
            .unwrap_err();
        assert!(matches!(err, IoError::MissingProfile { .. }));
    }
}
