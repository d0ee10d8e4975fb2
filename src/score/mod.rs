//! Scorer: computes a `CandidateSystem`'s score from its hits' weighted,
//! redundancy-penalised contributions (spec.md §4.5).

use indexmap::IndexMap;

use crate::candidates::CandidateSystem;
use crate::hits::ModelHit;
use crate::model::{ModelGeneId, Role};

/// Tunable weights feeding `base(h) = w_status × w_source × w_ref`
/// (spec.md §4.5). Defaults match MacSyFinder's own scoring defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub mandatory_weight: f64,
    pub accessory_weight: f64,
    pub exchangeable_weight: f64,
    pub out_of_cluster: f64,
    pub redundancy_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights {
            mandatory_weight: 1.0,
            accessory_weight: 0.5,
            exchangeable_weight: 0.8,
            out_of_cluster: 0.7,
            redundancy_penalty: 1.5,
        }
    }
}

impl ScoringWeights {
    fn w_status(&self, status: Role) -> f64 {
        match status {
            Role::Mandatory => self.mandatory_weight,
            Role::Accessory => self.accessory_weight,
            Role::Neutral => 0.0,
            Role::Forbidden => 0.0,
        }
    }

    fn w_source(&self, hit: &ModelHit) -> f64 {
        if hit.via_exchangeable {
            self.exchangeable_weight
        } else {
            1.0
        }
    }

    fn w_ref(&self, in_cluster: bool) -> f64 {
        if in_cluster {
            1.0
        } else {
            self.out_of_cluster
        }
    }

    fn base(&self, hit: &ModelHit, in_cluster: bool) -> f64 {
        self.w_status(hit.status) * self.w_source(hit) * self.w_ref(in_cluster)
    }
}

/// Score a candidate: group its hits' `base` contributions by `ModelGene`,
/// apply the redundancy penalty within each group, then sum (spec.md §4.5).
/// Full precision is preserved for ordering; callers round only at report
/// time.
pub fn score(candidate: &CandidateSystem, weights: &ScoringWeights) -> f64 {
    let mut contribs: IndexMap<ModelGeneId, Vec<f64>> = IndexMap::new();

    for cluster in &candidate.clusters {
        for hit in &cluster.hits {
            contribs
                .entry(hit.model_gene)
                .or_default()
                .push(weights.base(hit, true));
        }
    }
    for hit in &candidate.outside_hits {
        contribs
            .entry(hit.model_gene)
            .or_default()
            .push(weights.base(hit, false));
    }

    contribs
        .values()
        .map(|values| penalised_sum(values, weights.redundancy_penalty))
        .sum()
}

/// First contribution counts fully; each subsequent one is divided by
/// `redundancy_penalty` (spec.md §4.5). Order within a `ModelGene`'s
/// contributions does not affect the sum since every divisor is the same.
fn penalised_sum(values: &[f64], redundancy_penalty: f64) -> f64 {
    values
        .iter()
        .enumerate()
        .map(|(idx, &v)| if idx == 0 { v } else { v / redundancy_penalty })
        .sum()
}

/// Round a score to three decimals for reporting (spec.md §4.5); ordering
/// elsewhere in the pipeline must use the unrounded value.
pub fn round_for_report(raw: f64) -> f64 {
    (raw * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Cluster;
    use crate::hits::Hit;
    use crate::model::{CoreGeneId, ModelGeneId};

    fn model_hit(gene: ModelGeneId, status: Role, via_exchangeable: bool, position: u32) -> ModelHit {
        ModelHit {
            hit: Hit {
                replicon: "R".into(),
                position,
                protein_id: format!("p{position}"),
                core_gene: CoreGeneId(0),
                i_evalue: 1e-20,
                score: 100.0,
                profile_coverage: 0.9,
                sequence_coverage: 0.9,
                seq_length: 200,
                match_begin: 1,
                match_end: 100,
            },
            model_gene: gene,
            status,
            loner: false,
            multi_model: false,
            multi_system: false,
            via_exchangeable,
        }
    }

    fn candidate(clusters: Vec<Cluster>, outside_hits: Vec<ModelHit>) -> CandidateSystem {
        CandidateSystem {
            system_id: "R_TEST.model_1_0".into(),
            replicon: "R".into(),
            model_fqn: "TEST/model".into(),
            clusters,
            outside_hits,
            wholeness: 1.0,
            occ: 1,
        }
    }

    #[test]
    fn single_mandatory_in_cluster_hit_scores_its_full_weight() {
        let weights = ScoringWeights::default();
        let c = candidate(
            vec![Cluster {
                hits: vec![model_hit(ModelGeneId(0), Role::Mandatory, false, 1)],
                locus_num: 0,
                wrapped: false,
            }],
            vec![],
        );
        assert!((score(&c, &weights) - weights.mandatory_weight).abs() < 1e-9);
    }

    #[test]
    fn second_hit_on_the_same_gene_is_redundancy_penalised() {
        let weights = ScoringWeights::default();
        let c = candidate(
            vec![Cluster {
                hits: vec![
                    model_hit(ModelGeneId(0), Role::Mandatory, false, 1),
                    model_hit(ModelGeneId(0), Role::Mandatory, false, 2),
                ],
                locus_num: 0,
                wrapped: false,
            }],
            vec![],
        );
        let expected = weights.mandatory_weight + weights.mandatory_weight / weights.redundancy_penalty;
        assert!((score(&c, &weights) - expected).abs() < 1e-9);
    }

    #[test]
    fn outside_pool_hit_takes_the_out_of_cluster_penalty() {
        let weights = ScoringWeights::default();
        let c = candidate(vec![], vec![model_hit(ModelGeneId(0), Role::Accessory, false, 5)]);
        let expected = weights.accessory_weight * weights.out_of_cluster;
        assert!((score(&c, &weights) - expected).abs() < 1e-9);
    }

    #[test]
    fn exchangeable_sourced_hit_takes_the_exchangeable_weight() {
        let weights = ScoringWeights::default();
        let c = candidate(
            vec![Cluster {
                hits: vec![model_hit(ModelGeneId(0), Role::Mandatory, true, 1)],
                locus_num: 0,
                wrapped: false,
            }],
            vec![],
        );
        let expected = weights.mandatory_weight * weights.exchangeable_weight;
        assert!((score(&c, &weights) - expected).abs() < 1e-9);
    }

    #[test]
    fn neutral_status_contributes_nothing() {
        let weights = ScoringWeights::default();
        let c = candidate(
            vec![Cluster {
                hits: vec![model_hit(ModelGeneId(0), Role::Neutral, false, 1)],
                locus_num: 0,
                wrapped: false,
            }],
            vec![],
        );
        assert_eq!(0.0, score(&c, &weights));
    }

    #[test]
    fn report_rounding_keeps_three_decimals() {
        assert!((round_for_report(1.23456) - 1.235).abs() < 1e-9);
    }
}
