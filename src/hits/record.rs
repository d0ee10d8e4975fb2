//! `Hit` and `ModelHit` records (spec.md §3).

use crate::model::{CoreGeneId, ModelGeneId, Role};

/// An immutable HMM hit record, after the raw HMMER report has been parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub replicon: String,
    pub position: u32,
    pub protein_id: String,
    pub core_gene: CoreGeneId,
    pub i_evalue: f64,
    pub score: f64,
    pub profile_coverage: f64,
    pub sequence_coverage: f64,
    pub seq_length: u32,
    pub match_begin: u32,
    pub match_end: u32,
}

impl Hit {
    /// A hit is selected iff `i_evalue <= i_evalue_sel && profile_coverage
    /// >= coverage_profile` (spec.md §3).
    pub fn is_selected(&self, i_evalue_sel: f64, coverage_profile: f64) -> bool {
        self.i_evalue <= i_evalue_sel && self.profile_coverage >= coverage_profile
    }
}

/// Status a `ModelHit` inherits from its `ModelGene`'s role (spec.md §3).
pub type Status = Role;

/// A selected `Hit` bound to a `ModelGene` in a given model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHit {
    pub hit: Hit,
    pub model_gene: ModelGeneId,
    pub status: Status,
    pub loner: bool,
    pub multi_model: bool,
    pub multi_system: bool,
    /// True if `hit.core_gene` matches the `ModelGene` via an exchangeable
    /// rather than directly (spec.md §4.5 `w_source`).
    pub via_exchangeable: bool,
}

impl ModelHit {
    pub fn position(&self) -> u32 {
        self.hit.position
    }

    pub fn replicon(&self) -> &str {
        &self.hit.replicon
    }
}
