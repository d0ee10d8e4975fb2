//! `check-package`: the external-collaborator interface spec.md §9 leaves as
//! an Open Question, made concrete here. Validates a model package directory
//! without running the detection pipeline against it.

use std::path::{Path, PathBuf};

use crate::model::load_package;

/// A problem found while checking a model package. Severity tracks whether
/// `--lenient` downgraded it from an error (spec.md §4.1's fatal list) to a
/// warning.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageIssue {
    UnreadableMetadata { path: PathBuf },
    DanglingProfileReference { model: String, gene: String, path: PathBuf },
    ModelCatalogError { detail: String },
}

impl std::fmt::Display for PackageIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageIssue::UnreadableMetadata { path } => write!(f, "unreadable metadata.yml at {path:?}"),
            PackageIssue::DanglingProfileReference { model, gene, path } => {
                write!(f, "model {model:?} references profile for gene {gene:?} missing at {path:?}")
            }
            PackageIssue::ModelCatalogError { detail } => write!(f, "{detail}"),
        }
    }
}

/// One issue plus whether it was downgraded to a warning by `--lenient`.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedIssue {
    pub issue: PackageIssue,
    pub is_warning: bool,
}

/// Check a model package directory: parse `definitions/*.xml` via the Model
/// Catalog's own loader, confirm every gene's profile file exists under
/// `profiles/`, and confirm `metadata.yml` is at least readable (its content
/// is not otherwise interpreted — spec.md §1 keeps model *package* metadata
/// an external collaborator).
pub fn check_package(package_dir: &Path, family: &str, lenient: bool) -> Vec<CheckedIssue> {
    let mut issues = Vec::new();

    let metadata_path = package_dir.join("metadata.yml");
    if std::fs::read(&metadata_path).is_err() {
        issues.push(PackageIssue::UnreadableMetadata { path: metadata_path });
    }

    match load_package(package_dir, family) {
        Ok(catalog) => {
            let genes = catalog.gene_catalog();
            for i in 0..genes.len() {
                let gene = genes.get(crate::model::CoreGeneId(i as u32));
                if !gene.profile_path.exists() {
                    issues.push(PackageIssue::DanglingProfileReference {
                        model: gene.family.clone(),
                        gene: gene.name.clone(),
                        path: gene.profile_path.clone(),
                    });
                }
            }
        }
        Err(e) => issues.push(PackageIssue::ModelCatalogError { detail: e.to_string() }),
    }

    issues
        .into_iter()
        .map(|issue| CheckedIssue {
            is_warning: lenient,
            issue,
        })
        .collect()
}
