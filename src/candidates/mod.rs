//! Candidate Builder: assembles clusters (and loner/multi-model hits) into
//! `CandidateSystem`s that satisfy a model's rules, or `RejectedCandidate`s
//! that don't (spec.md §4.4).

use itertools::Itertools;

use crate::cluster::Cluster;
use crate::hits::ModelHit;
use crate::model::{Model, ModelCatalog, ModelGeneId, Role};

/// Why a candidate combination was rejected (spec.md §4.4, §7). Data, never
/// an `Err` — rejections are accumulated, not propagated as failures.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    ForbiddenPresent,
    MandatoryQuorumNotReached { required: usize, observed: usize },
    GenesQuorumNotReached { required: usize, observed: usize },
    NoCluster,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::ForbiddenPresent => write!(f, "FORBIDDEN_PRESENT"),
            RejectionReason::MandatoryQuorumNotReached { required, observed } => {
                write!(f, "MANDATORY_QUORUM_NOT_REACHED({required},{observed})")
            }
            RejectionReason::GenesQuorumNotReached { required, observed } => {
                write!(f, "GENES_QUORUM_NOT_REACHED({required},{observed})")
            }
            RejectionReason::NoCluster => write!(f, "NO_CLUSTER"),
        }
    }
}

/// A candidate combination that failed one or more of the builder's rules,
/// with provenance preserved (spec.md §3 "Rejected Candidate").
#[derive(Debug, Clone)]
pub struct RejectedCandidate {
    pub replicon: String,
    pub model_fqn: String,
    pub hits: Vec<ModelHit>,
    pub reasons: Vec<RejectionReason>,
}

/// A proposed occurrence of a model (spec.md §3 "Candidate System").
#[derive(Debug, Clone)]
pub struct CandidateSystem {
    pub system_id: String,
    pub replicon: String,
    pub model_fqn: String,
    pub clusters: Vec<Cluster>,
    /// Loner/multi-model `ModelHit`s contributed from outside any cluster.
    pub outside_hits: Vec<ModelHit>,
    pub wholeness: f64,
    pub occ: u32,
}

impl CandidateSystem {
    /// Every `ModelHit` the candidate is built from, in-cluster first.
    pub fn all_hits(&self) -> Vec<&ModelHit> {
        self.clusters
            .iter()
            .flat_map(|c| c.hits.iter())
            .chain(self.outside_hits.iter())
            .collect()
    }

    /// Number of clusters contributing to this candidate, excluding loner
    /// clusters (spec.md §3 "sys_loci").
    pub fn sys_loci(&self) -> usize {
        self.clusters.iter().filter(|c| !c.is_loner_cluster()).count()
    }

    pub fn min_position(&self) -> u32 {
        self.all_hits()
            .iter()
            .map(|h| h.position())
            .min()
            .unwrap_or(0)
    }
}

/// Counts, per `ModelGene`, how many hits in `hits` satisfy that gene.
fn role_counts<'a>(
    model: &Model,
    catalog: &ModelCatalog,
    hits: impl Iterator<Item = &'a ModelHit>,
) -> indexmap::IndexMap<ModelGeneId, usize> {
    let mut counts: indexmap::IndexMap<ModelGeneId, usize> =
        model.genes.iter().map(|&g| (g, 0)).collect();
    for hit in hits {
        if let Some(count) = counts.get_mut(&hit.model_gene) {
            *count += 1;
        }
    }
    let _ = catalog; // counts keyed by ModelGeneId already resolve exchangeables upstream
    counts
}

/// Build every candidate for one model on one replicon from its clusters
/// and loner/multi-model pools (spec.md §4.4).
pub fn build_candidates(
    replicon: &str,
    model: &Model,
    catalog: &ModelCatalog,
    clusters: &[Cluster],
    loner_pool: &[ModelHit],
    multi_model_pool: &[ModelHit],
    forbidden_hits: &[ModelHit],
) -> (Vec<CandidateSystem>, Vec<RejectedCandidate>) {
    if clusters.is_empty() && loner_pool.is_empty() && multi_model_pool.is_empty() {
        // Hits were materialised for this model on this replicon (the
        // forbidden pool is non-empty) but clustering produced nothing
        // usable to build a candidate from (spec.md §7 `NO_CLUSTER`).
        if forbidden_hits.is_empty() {
            return (Vec::new(), Vec::new());
        }
        return (
            Vec::new(),
            vec![RejectedCandidate {
                replicon: replicon.to_string(),
                model_fqn: model.fqn.clone(),
                hits: forbidden_hits.to_vec(),
                reasons: vec![RejectionReason::NoCluster],
            }],
        );
    }

    let outside_pool: Vec<&ModelHit> = loner_pool.iter().chain(multi_model_pool.iter()).collect();

    let cluster_indices: Vec<usize> = (0..clusters.len()).collect();
    let cluster_combos: Vec<Vec<usize>> = if model.multi_loci {
        cluster_indices
            .iter()
            .copied()
            .powerset()
            .filter(|c| !c.is_empty())
            .collect()
    } else {
        cluster_indices.iter().map(|&i| vec![i]).collect()
    };

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    let mut ordinal = 0usize;

    for combo in &cluster_combos {
        let cluster_hit_count: usize = combo.iter().map(|&i| clusters[i].hits.len()).sum();
        let remaining_budget = model
            .max_nb_genes
            .map(|max| max.saturating_sub(cluster_hit_count));
        let max_k = remaining_budget.unwrap_or(outside_pool.len()).min(outside_pool.len());

        for k in 0..=max_k {
            for outside_combo in outside_pool.iter().copied().combinations(k) {
                let cluster_hits: Vec<&ModelHit> =
                    combo.iter().flat_map(|&i| clusters[i].hits.iter()).collect();
                let all_hits: Vec<&ModelHit> =
                    cluster_hits.iter().copied().chain(outside_combo.iter().copied()).collect();

                if let Some(max) = model.max_nb_genes {
                    if all_hits.len() > max {
                        continue;
                    }
                }

                let mut reasons = Vec::new();

                // Checked per cluster (wrap-aware via `Cluster::span_contains`)
                // rather than over one bounding `[min, max]` interval across
                // the whole combo: a wrapped cluster's occupied positions are
                // not a contiguous numeric range, and a multi-loci combo's
                // clusters are not one contiguous span either.
                let has_forbidden_in_span = forbidden_hits.iter().any(|f| {
                    f.replicon() == replicon && combo.iter().any(|&i| clusters[i].span_contains(f.position()))
                });
                if has_forbidden_in_span {
                    reasons.push(RejectionReason::ForbiddenPresent);
                }

                let counts = role_counts(model, catalog, all_hits.iter().copied());

                let mandatory_observed = catalog
                    .genes_with_role(model, Role::Mandatory)
                    .filter(|g| counts.get(g).copied().unwrap_or(0) > 0)
                    .count();
                if mandatory_observed < model.min_mandatory_genes_required {
                    reasons.push(RejectionReason::MandatoryQuorumNotReached {
                        required: model.min_mandatory_genes_required,
                        observed: mandatory_observed,
                    });
                }

                let global_observed = catalog
                    .genes_with_role(model, Role::Mandatory)
                    .chain(catalog.genes_with_role(model, Role::Accessory))
                    .filter(|g| counts.get(g).copied().unwrap_or(0) > 0)
                    .count();
                if global_observed < model.min_genes_required {
                    reasons.push(RejectionReason::GenesQuorumNotReached {
                        required: model.min_genes_required,
                        observed: global_observed,
                    });
                }

                if reasons.is_empty() {
                    let total_mandatory_accessory = catalog
                        .genes_with_role(model, Role::Mandatory)
                        .chain(catalog.genes_with_role(model, Role::Accessory))
                        .count()
                        .max(1);
                    let wholeness = global_observed as f64 / total_mandatory_accessory as f64;

                    // spec.md §3 "occ = floor(mean count of each required
                    // component)": the mean is over mandatory ∪ accessory
                    // ModelGenes only, not every gene in `counts` (which is
                    // seeded for neutral/forbidden genes too).
                    let required_counts: Vec<usize> = catalog
                        .genes_with_role(model, Role::Mandatory)
                        .chain(catalog.genes_with_role(model, Role::Accessory))
                        .map(|g| counts.get(&g).copied().unwrap_or(0))
                        .collect();
                    let occ = if required_counts.is_empty() {
                        0
                    } else {
                        let mean: f64 = required_counts.iter().map(|&c| c as f64).sum::<f64>()
                            / required_counts.len() as f64;
                        mean.floor() as u32
                    };

                    let clusters_owned: Vec<Cluster> =
                        combo.iter().map(|&i| clusters[i].clone()).collect();
                    let outside_owned: Vec<ModelHit> =
                        outside_combo.iter().map(|h| (**h).clone()).collect();

                    let min_position = clusters_owned
                        .iter()
                        .map(Cluster::min_position)
                        .chain(outside_owned.iter().map(ModelHit::position))
                        .min()
                        .unwrap_or(0);

                    let system_id =
                        format!("{replicon}_{}_{min_position}_{ordinal}", model.fqn.replace('/', "."));
                    ordinal += 1;

                    accepted.push(CandidateSystem {
                        system_id,
                        replicon: replicon.to_string(),
                        model_fqn: model.fqn.clone(),
                        clusters: clusters_owned,
                        outside_hits: outside_owned,
                        wholeness,
                        occ,
                    });
                } else {
                    rejected.push(RejectedCandidate {
                        replicon: replicon.to_string(),
                        model_fqn: model.fqn.clone(),
                        hits: all_hits.into_iter().cloned().collect(),
                        reasons,
                    });
                }
            }
        }
    }

    dedup_strict_subsets(&mut accepted);

    (accepted, rejected)
}

/// Discards any accepted candidate whose hit-id set is a strict subset of
/// another accepted candidate with identical hit contents otherwise
/// (spec.md §4.4 "Enumeration policy").
fn dedup_strict_subsets(candidates: &mut Vec<CandidateSystem>) {
    let hit_sets: Vec<std::collections::BTreeSet<(u32, u32)>> = candidates
        .iter()
        .map(|c| {
            c.all_hits()
                .iter()
                .map(|h| (h.position(), h.model_gene.0))
                .collect()
        })
        .collect();

    let mut keep = vec![true; candidates.len()];
    for i in 0..candidates.len() {
        for j in 0..candidates.len() {
            if i == j || !keep[i] {
                continue;
            }
            if hit_sets[i].is_subset(&hit_sets[j]) && hit_sets[i] != hit_sets[j] {
                keep[i] = false;
            }
        }
    }

    let mut kept = Vec::with_capacity(candidates.len());
    for (candidate, keep) in candidates.drain(..).zip(keep) {
        if keep {
            kept.push(candidate);
        }
    }
    *candidates = kept;
}
