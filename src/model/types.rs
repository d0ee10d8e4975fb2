//! `ModelGene` and its role/flags (spec.md §3 "ModelGene").

use super::gene::CoreGeneId;

/// A `ModelGene`'s role within its model. A role of `Forbidden` forbids
/// inclusion in an occurrence, not detection (spec.md §3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Mandatory,
    Accessory,
    Neutral,
    Forbidden,
}

/// Stable index into a model's gene list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelGeneId(pub u32);

/// A `CoreGene` used in a specific model, with the attributes spec.md §3
/// enumerates.
#[derive(Debug, Clone)]
pub struct ModelGene {
    pub id: ModelGeneId,
    pub core_gene: CoreGeneId,
    pub role: Role,
    pub loner: bool,
    pub multi_model: bool,
    pub multi_system: bool,
    /// `None` means "inherit the model's default".
    pub inter_gene_max_space: Option<u32>,
    /// Other `CoreGene`s that can fulfil this gene's role in this model.
    pub exchangeables: Vec<CoreGeneId>,
}

impl ModelGene {
    /// Whether `core_gene` satisfies this `ModelGene`'s role, either
    /// directly or via one of its exchangeables.
    pub fn matches(&self, core_gene: CoreGeneId) -> bool {
        self.core_gene == core_gene || self.exchangeables.contains(&core_gene)
    }

    /// Whether `core_gene` matches via an exchangeable rather than directly
    /// (used by the Scorer's `w_source`, spec.md §4.5).
    pub fn matches_via_exchangeable(&self, core_gene: CoreGeneId) -> bool {
        self.core_gene != core_gene && self.exchangeables.contains(&core_gene)
    }

    /// `ModelHit`s are non-eligible for ordinary clustering if they are
    /// loner, multi-model, or forbidden (spec.md §4.3 step 2).
    pub fn is_cluster_eligible(&self) -> bool {
        !self.loner && !self.multi_model && self.role != Role::Forbidden
    }
}
