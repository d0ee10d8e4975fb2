//! `Model` definitions and the `ModelCatalog` that owns them
//! (spec.md §3 "Model", §4.1 "Model Catalog").

use indexmap::IndexMap;

use crate::err::ModelError;

use super::gene::{CoreGeneId, GeneCatalog};
use super::types::{ModelGene, ModelGeneId, Role};

/// Stable index into a [`ModelCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u32);

/// A named tuple of `ModelGene`s with thresholds, per spec.md §3 "Model".
#[derive(Debug, Clone)]
pub struct Model {
    pub id: ModelId,
    /// Fully-qualified name `family/path/name`.
    pub fqn: String,
    pub genes: Vec<ModelGeneId>,
    pub inter_gene_max_space: u32,
    pub min_mandatory_genes_required: usize,
    pub min_genes_required: usize,
    pub max_nb_genes: Option<usize>,
    pub multi_loci: bool,
}

impl Model {
    pub fn family(&self) -> &str {
        self.fqn.split('/').next().unwrap_or(&self.fqn)
    }

    pub fn short_name(&self) -> &str {
        self.fqn.rsplit('/').next().unwrap_or(&self.fqn)
    }
}

/// Selects which models a catalog should hand back from
/// [`ModelCatalog::models_to_detect`].
#[derive(Debug, Clone)]
pub enum ModelSelector {
    All,
    Family(String),
    Names(Vec<String>),
}

/// Holds parsed models, genes, exchangeables, per-model thresholds and
/// per-gene overrides. Immutable after load; many readers, zero writers
/// (spec.md §4.1, §5).
#[derive(Debug)]
pub struct ModelCatalog {
    genes: GeneCatalog,
    model_genes: Vec<ModelGene>,
    models: Vec<Model>,
    fqn_index: IndexMap<String, ModelId>,
}

impl ModelCatalog {
    pub fn builder() -> ModelCatalogBuilder {
        ModelCatalogBuilder::default()
    }

    pub fn gene_catalog(&self) -> &GeneCatalog {
        &self.genes
    }

    /// Intern-or-lookup a `CoreGene` by `(family, name)`. After load this is
    /// a pure lookup; an unknown pair is the caller's bug, reflected as a
    /// panic only in contexts that have already validated the reference
    /// during load (see [`ModelCatalogBuilder::finish`]).
    pub fn gene_by(&self, family: &str, name: &str) -> Option<CoreGeneId> {
        self.genes.find(family, name)
    }

    pub fn model(&self, id: ModelId) -> &Model {
        &self.models[id.0 as usize]
    }

    pub fn model_by_fqn(&self, fqn: &str) -> Option<&Model> {
        self.fqn_index.get(fqn).map(|&id| self.model(id))
    }

    /// Mutable lookup by fully-qualified name, used to apply per-model
    /// configuration overrides after load (spec.md §6.3 `models_opt`).
    pub fn model_by_fqn_mut(&mut self, fqn: &str) -> Option<&mut Model> {
        let id = *self.fqn_index.get(fqn)?;
        Some(&mut self.models[id.0 as usize])
    }

    pub fn model_gene(&self, id: ModelGeneId) -> &ModelGene {
        &self.model_genes[id.0 as usize]
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    /// `models_to_detect(selector) -> ordered list of Model` (spec.md §4.1).
    pub fn models_to_detect(&self, selector: &ModelSelector) -> Vec<&Model> {
        match selector {
            ModelSelector::All => self.models.iter().collect(),
            ModelSelector::Family(family) => self
                .models
                .iter()
                .filter(|m| m.family() == family)
                .collect(),
            ModelSelector::Names(names) => names
                .iter()
                .filter_map(|n| self.model_by_fqn(n))
                .collect(),
        }
    }

    /// `effective_inter_gene_max_space`: the maximum of the two `ModelGene`s'
    /// per-gene overrides, falling back to the model's default
    /// (spec.md §3 "Cluster").
    pub fn effective_inter_gene_max_space(
        &self,
        model: &Model,
        a: ModelGeneId,
        b: ModelGeneId,
    ) -> u32 {
        let ga = self.model_gene(a).inter_gene_max_space.unwrap_or(model.inter_gene_max_space);
        let gb = self.model_gene(b).inter_gene_max_space.unwrap_or(model.inter_gene_max_space);
        ga.max(gb)
    }

    /// Genes of a model having a given role, in declaration order.
    pub fn genes_with_role<'a>(
        &'a self,
        model: &'a Model,
        role: Role,
    ) -> impl Iterator<Item = ModelGeneId> + 'a {
        model
            .genes
            .iter()
            .copied()
            .filter(move |&gid| self.model_gene(gid).role == role)
    }

    /// Find the `ModelGene` of `model` that `core_gene` satisfies, directly
    /// or through an exchangeable.
    pub fn model_gene_for_core_gene(
        &self,
        model: &Model,
        core_gene: CoreGeneId,
    ) -> Option<ModelGeneId> {
        model
            .genes
            .iter()
            .copied()
            .find(|&gid| self.model_gene(gid).matches(core_gene))
    }
}

/// Staged construction of a [`ModelCatalog`], validating the quorum
/// invariant and gene references as each model is added (spec.md §4.1
/// "Errors: unknown gene reference ... quorum invariant violated ... all
/// fatal").
#[derive(Default)]
pub struct ModelCatalogBuilder {
    genes: GeneCatalog,
    model_genes: Vec<ModelGene>,
    models: Vec<Model>,
    fqn_index: IndexMap<String, ModelId>,
}

/// One gene declaration as parsed from XML, handed to the builder.
#[derive(Debug, Clone)]
pub struct GeneSpec {
    pub name: String,
    pub role: Role,
    pub loner: bool,
    pub multi_model: bool,
    pub multi_system: bool,
    pub inter_gene_max_space: Option<u32>,
    pub exchangeables: Vec<String>,
    pub profile_path: std::path::PathBuf,
}

/// One model declaration as parsed from XML, handed to the builder.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub fqn: String,
    pub inter_gene_max_space: u32,
    pub min_mandatory_genes_required: usize,
    pub min_genes_required: usize,
    pub max_nb_genes: Option<usize>,
    pub multi_loci: bool,
    pub genes: Vec<GeneSpec>,
}

impl ModelCatalogBuilder {
    pub fn add_model(&mut self, spec: ModelSpec) -> Result<(), ModelError> {
        let family = spec.fqn.split('/').next().unwrap_or(&spec.fqn).to_string();

        let mut seen_names = std::collections::HashSet::new();
        for gene in &spec.genes {
            if !seen_names.insert(gene.name.clone()) {
                return Err(ModelError::DuplicateGeneName {
                    family: family.clone(),
                    gene: gene.name.clone(),
                });
            }
        }

        let mut gene_ids = Vec::with_capacity(spec.genes.len());
        for gene in &spec.genes {
            let core_gene = self
                .genes
                .intern(&family, &gene.name, gene.profile_path.clone());

            let mut exchangeables = Vec::with_capacity(gene.exchangeables.len());
            for x in &gene.exchangeables {
                if x == &gene.name {
                    return Err(ModelError::CyclicExchangeables {
                        model: spec.fqn.clone(),
                        gene: gene.name.clone(),
                    });
                }
                exchangeables.push(self.genes.intern(&family, x, gene.profile_path.clone()));
            }

            let model_gene_id = ModelGeneId(self.model_genes.len() as u32);
            self.model_genes.push(ModelGene {
                id: model_gene_id,
                core_gene,
                role: gene.role,
                loner: gene.loner,
                multi_model: gene.multi_model,
                multi_system: gene.multi_system,
                inter_gene_max_space: gene.inter_gene_max_space,
                exchangeables,
            });
            gene_ids.push(model_gene_id);
        }

        let total_mandatory_or_accessory = gene_ids
            .iter()
            .filter(|&&gid| {
                matches!(
                    self.model_genes[gid.0 as usize].role,
                    Role::Mandatory | Role::Accessory
                )
            })
            .count();

        if spec.min_mandatory_genes_required > spec.min_genes_required
            || spec.min_genes_required > total_mandatory_or_accessory
        {
            return Err(ModelError::QuorumInvariantViolated {
                model: spec.fqn.clone(),
                mmgr: spec.min_mandatory_genes_required,
                mgr: spec.min_genes_required,
                total: total_mandatory_or_accessory,
            });
        }

        let model_id = ModelId(self.models.len() as u32);
        self.models.push(Model {
            id: model_id,
            fqn: spec.fqn.clone(),
            genes: gene_ids,
            inter_gene_max_space: spec.inter_gene_max_space,
            min_mandatory_genes_required: spec.min_mandatory_genes_required,
            min_genes_required: spec.min_genes_required,
            max_nb_genes: spec.max_nb_genes,
            multi_loci: spec.multi_loci,
        });
        self.fqn_index.insert(spec.fqn, model_id);

        Ok(())
    }

    pub fn finish(self) -> ModelCatalog {
        ModelCatalog {
            genes: self.genes,
            model_genes: self.model_genes,
            models: self.models,
            fqn_index: self.fqn_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gene(name: &str, role: Role) -> GeneSpec {
        GeneSpec {
            name: name.to_string(),
            role,
            loner: false,
            multi_model: false,
            multi_system: false,
            inter_gene_max_space: None,
            exchangeables: vec![],
            profile_path: format!("{name}.hmm").into(),
        }
    }

    #[test]
    fn quorum_invariant_violation_is_rejected() {
        let mut builder = ModelCatalog::builder();
        let spec = ModelSpec {
            fqn: "T2SS/model".into(),
            inter_gene_max_space: 2,
            min_mandatory_genes_required: 3,
            min_genes_required: 2,
            max_nb_genes: None,
            multi_loci: false,
            genes: vec![gene("A", Role::Mandatory), gene("B", Role::Mandatory)],
        };
        let err = builder.add_model(spec).unwrap_err();
        assert!(matches!(err, ModelError::QuorumInvariantViolated { .. }));
    }

    #[test]
    fn duplicate_gene_name_within_a_model_is_rejected() {
        let mut builder = ModelCatalog::builder();
        let spec = ModelSpec {
            fqn: "T2SS/model".into(),
            inter_gene_max_space: 2,
            min_mandatory_genes_required: 1,
            min_genes_required: 1,
            max_nb_genes: None,
            multi_loci: false,
            genes: vec![gene("A", Role::Mandatory), gene("A", Role::Accessory)],
        };
        let err = builder.add_model(spec).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateGeneName { .. }));
    }

    #[test]
    fn valid_model_round_trips_through_the_catalog() {
        let mut builder = ModelCatalog::builder();
        let spec = ModelSpec {
            fqn: "T2SS/model".into(),
            inter_gene_max_space: 2,
            min_mandatory_genes_required: 2,
            min_genes_required: 3,
            max_nb_genes: None,
            multi_loci: false,
            genes: vec![
                gene("A", Role::Mandatory),
                gene("B", Role::Mandatory),
                gene("C", Role::Mandatory),
                gene("D", Role::Accessory),
            ],
        };
        builder.add_model(spec).unwrap();
        let catalog = builder.finish();

        let model = catalog.model_by_fqn("T2SS/model").unwrap();
        assert_eq!(4, model.genes.len());
        assert!(catalog.gene_by("T2SS", "A").is_some());
        assert!(catalog.gene_by("T2SS", "Z").is_none());
    }
}
