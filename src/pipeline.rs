//! Orchestrates the full per-replicon pipeline (spec.md §2, §5): Model
//! Catalog + Hit Stream → Clustering → Candidate Building → Scoring →
//! Resolution, run independently per replicon under `rayon`, then merged
//! into one global report.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use rayon::prelude::*;

use crate::candidates::{build_candidates, CandidateSystem, RejectedCandidate};
use crate::cluster::cluster_model_hits;
use crate::common::Warning;
use crate::hits::{HitStream, ModelHit};
use crate::model::{Model, ModelCatalog, ModelGeneId, ModelSelector};
use crate::replicon::Replicon;
use crate::resolve::{resolve, ResolverOutcome, Solution};
use crate::score::ScoringWeights;

/// Everything produced by running every model against every replicon, ready
/// to hand to the Reporter.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub accepted: Vec<CandidateSystem>,
    pub best_solutions: Vec<Solution>,
    pub rejected: Vec<RejectedCandidate>,
    pub warnings: Vec<Warning>,
}

/// Run the pipeline for one replicon against one model: cluster its
/// selected hits, build candidates, and resolve the best non-conflicting
/// set (spec.md §2's per-replicon data flow).
fn run_replicon_model(
    replicon: &Replicon,
    model: &Model,
    catalog: &ModelCatalog,
    hit_stream: &HitStream,
    weights: &ScoringWeights,
    timeout: Option<Duration>,
) -> (Vec<CandidateSystem>, Vec<Solution>, Vec<RejectedCandidate>, Vec<Warning>) {
    let hits = hit_stream.hits_on_replicon(&replicon.name);
    let cluster_set = cluster_model_hits(replicon, model, catalog, &hits);

    let (accepted, rejected) = build_candidates(
        &replicon.name,
        model,
        catalog,
        &cluster_set.clusters,
        &cluster_set.loner_pool,
        &cluster_set.multi_model_pool,
        &cluster_set.forbidden_hits,
    );

    let mut warnings = loner_undersupply_warnings(catalog, &cluster_set.loner_pool, &accepted);

    let (solutions, outcome) = resolve(&accepted, weights, timeout);
    if let ResolverOutcome::Timeout = outcome {
        warnings.push(Warning::ReplionTimeout {
            replicon: replicon.name.clone(),
        });
    }

    (accepted, solutions, rejected, warnings)
}

/// spec.md §4.4 point 5: if multiple candidate occurrences of `model` rely
/// on the same loner gene and it is not `multi_system`, the loner pool may
/// have fewer physical occurrences than candidates that want to claim one.
/// Surfaced as a warning, never a rejection.
fn loner_undersupply_warnings(
    catalog: &ModelCatalog,
    loner_pool: &[ModelHit],
    accepted: &[CandidateSystem],
) -> Vec<Warning> {
    let mut available: HashMap<ModelGeneId, HashSet<(String, u32)>> = HashMap::new();
    let mut multi_system: HashMap<ModelGeneId, bool> = HashMap::new();
    for h in loner_pool {
        available
            .entry(h.model_gene)
            .or_default()
            .insert((h.replicon().to_string(), h.position()));
        multi_system.insert(h.model_gene, h.multi_system);
    }

    let mut claimants: HashMap<ModelGeneId, HashSet<&str>> = HashMap::new();
    for candidate in accepted {
        for hit in &candidate.outside_hits {
            if hit.loner {
                claimants.entry(hit.model_gene).or_default().insert(&candidate.system_id);
            }
        }
    }

    let mut warnings: Vec<Warning> = claimants
        .into_iter()
        .filter(|(gene_id, _)| !multi_system.get(gene_id).copied().unwrap_or(false))
        .filter_map(|(gene_id, claiming_candidates)| {
            let occurrences = available.get(&gene_id).map(HashSet::len).unwrap_or(0);
            let candidate_count = claiming_candidates.len();
            if candidate_count > occurrences.max(1) {
                let core_gene = catalog.model_gene(gene_id).core_gene;
                let gene = catalog.gene_catalog().get(core_gene).name.clone();
                Some(Warning::LonerUndersupplied {
                    gene,
                    available: occurrences,
                    candidate_count,
                })
            } else {
                None
            }
        })
        .collect();
    warnings.sort_by(|a, b| format!("{a:?}").cmp(&format!("{b:?}")));
    warnings
}

/// Run every model selected by `selector` against every replicon in
/// `replicons`, in parallel per `(replicon, model)` pair (spec.md §5:
/// "each replicon is an independent graph").
pub fn run(
    replicons: &[Replicon],
    catalog: &ModelCatalog,
    selector: &ModelSelector,
    hit_stream: &HitStream,
    weights: &ScoringWeights,
    timeout: Option<Duration>,
) -> PipelineReport {
    let models = catalog.models_to_detect(selector);

    let jobs: Vec<(&Replicon, &Model)> = replicons
        .iter()
        .flat_map(|r| models.iter().map(move |&m| (r, m)))
        .collect();

    let results: Vec<_> = jobs
        .par_iter()
        .map(|&(replicon, model)| run_replicon_model(replicon, model, catalog, hit_stream, weights, timeout))
        .collect();

    let mut report = PipelineReport::default();
    for (accepted, solutions, rejected, warning) in results {
        report.accepted.extend(accepted);
        // Every replicon's tied solutions get merged into one flat list;
        // the Reporter only ever looks at `best_solutions[0]` for
        // `best_solution.tsv` and the whole list for `all_best_solutions.tsv`.
        report.best_solutions.extend(solutions);
        report.rejected.extend(rejected);
        report.warnings.extend(warning);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::Hit;
    use crate::model::{GeneSpec, ModelSpec, Role};
    use crate::replicon::Topology;

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
    fn runs_end_to_end_for_one_replicon_and_model() {
        let mut builder = ModelCatalog::builder();
        builder
            .add_model(ModelSpec {
                fqn: "TEST/model".into(),
                inter_gene_max_space: 2,
                min_mandatory_genes_required: 2,
                min_genes_required: 2,
                max_nb_genes: None,
                multi_loci: false,
                genes: vec![gene("A", Role::Mandatory), gene("B", Role::Mandatory)],
            })
            .unwrap();
        let catalog = builder.finish();
        let a = catalog.gene_by("TEST", "A").unwrap();
        let b = catalog.gene_by("TEST", "B").unwrap();

        let mut hit_stream = HitStream::new();
        hit_stream.ingest(
            vec![
                Hit {
                    replicon: "R".into(),
                    position: 1,
                    protein_id: "p1".into(),
                    core_gene: a,
                    i_evalue: 1e-20,
                    score: 100.0,
                    profile_coverage: 0.9,
                    sequence_coverage: 0.9,
                    seq_length: 200,
                    match_begin: 1,
                    match_end: 100,
                },
                Hit {
                    replicon: "R".into(),
                    position: 2,
                    protein_id: "p2".into(),
                    core_gene: b,
                    i_evalue: 1e-20,
                    score: 100.0,
                    profile_coverage: 0.9,
                    sequence_coverage: 0.9,
                    seq_length: 200,
                    match_begin: 1,
                    match_end: 100,
                },
            ],
            1e-4,
            0.5,
        );

        let replicons = vec![Replicon::new("R", 10, Topology::Linear)];
        let report = run(
            &replicons,
            &catalog,
            &ModelSelector::All,
            &hit_stream,
            &ScoringWeights::default(),
            None,
        );

        assert_eq!(1, report.accepted.len());
        assert_eq!(1, report.best_solutions.len());
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn loner_undersupply_is_warned_when_more_candidates_claim_it_than_it_has_occurrences() {
        let mut builder = ModelCatalog::builder();
        builder
            .add_model(ModelSpec {
                fqn: "TEST/model".into(),
                inter_gene_max_space: 2,
                min_mandatory_genes_required: 2,
                min_genes_required: 3,
                max_nb_genes: None,
                multi_loci: false,
                genes: vec![
                    gene("A", Role::Mandatory),
                    gene("B", Role::Mandatory),
                    GeneSpec {
                        name: "L".to_string(),
                        role: Role::Accessory,
                        loner: true,
                        multi_model: false,
                        multi_system: false,
                        inter_gene_max_space: None,
                        exchangeables: vec![],
                        profile_path: "L.hmm".into(),
                    },
                ],
            })
            .unwrap();
        let catalog = builder.finish();
        let a = catalog.gene_by("TEST", "A").unwrap();
        let b = catalog.gene_by("TEST", "B").unwrap();
        let l = catalog.gene_by("TEST", "L").unwrap();

        fn h(replicon: &str, position: u32, core_gene: crate::model::CoreGeneId) -> Hit {
            Hit {
                replicon: replicon.to_string(),
                position,
                protein_id: format!("p{position}"),
                core_gene,
                i_evalue: 1e-20,
                score: 100.0,
                profile_coverage: 0.9,
                sequence_coverage: 0.9,
                seq_length: 200,
                match_begin: 1,
                match_end: 100,
            }
        }

        let mut hit_stream = HitStream::new();
        hit_stream.ingest(
            vec![
                h("R", 1, a),
                h("R", 2, b),
                h("R", 10, a),
                h("R", 11, b),
                h("R", 50, l),
            ],
            1e-4,
            0.5,
        );

        let replicons = vec![Replicon::new("R", 100, Topology::Linear)];
        let report = run(
            &replicons,
            &catalog,
            &ModelSelector::All,
            &hit_stream,
            &ScoringWeights::default(),
            None,
        );

        assert_eq!(2, report.accepted.len());
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            Warning::LonerUndersupplied { gene, available: 1, candidate_count: 2 } if gene == "L"
        )));
    }
}
