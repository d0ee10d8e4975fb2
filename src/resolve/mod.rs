//! Solution Resolver: picks the maximum-weight set of non-conflicting
//! `CandidateSystem`s on one replicon via branch-and-bound (spec.md §4.6).

use std::time::{Duration, Instant};

use crate::candidates::CandidateSystem;
use crate::hits::ModelHit;
use crate::model::Role;
use crate::score::{score, ScoringWeights};

/// Terminal state of one replicon's resolution (spec.md §4.6). All three are
/// non-error outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverOutcome {
    Optimal,
    Timeout,
    Empty,
}

/// One maximum-weight independent set of candidates, with its score cached
/// (spec.md §3 "Solution").
#[derive(Debug, Clone)]
pub struct Solution {
    pub candidates: Vec<CandidateSystem>,
    pub score: f64,
}

impl Solution {
    pub fn hit_count(&self) -> usize {
        self.candidates.iter().map(|c| c.all_hits().len()).sum()
    }

    pub fn mean_wholeness(&self) -> f64 {
        if self.candidates.is_empty() {
            return 0.0;
        }
        self.candidates.iter().map(|c| c.wholeness).sum::<f64>() / self.candidates.len() as f64
    }

    fn sorted_hit_positions(&self) -> Vec<u32> {
        let mut positions: Vec<u32> = self
            .candidates
            .iter()
            .flat_map(|c| c.all_hits().into_iter().map(ModelHit::position))
            .collect();
        positions.sort_unstable();
        positions
    }
}

/// Two `ModelHit`s are the same physical hit iff they share a replicon and
/// position; position alone indexes a protein within one replicon (spec.md
/// §3 "Hit").
fn same_physical_hit(a: &ModelHit, b: &ModelHit) -> bool {
    a.replicon() == b.replicon() && a.position() == b.position()
}

/// Whether two candidates conflict (spec.md §4.6 step 1): they share a
/// physical hit whose `ModelGene` disallows it (`multi_system=false` and not
/// covered by `multi_model`), or they belong to the same model and share a
/// mandatory hit, which is always a conflict regardless of those flags.
fn conflicts(a: &CandidateSystem, b: &CandidateSystem) -> bool {
    let a_hits = a.all_hits();
    let b_hits = b.all_hits();
    for ha in &a_hits {
        for hb in &b_hits {
            if !same_physical_hit(ha, hb) {
                continue;
            }
            if a.model_fqn == b.model_fqn && (ha.status == Role::Mandatory || hb.status == Role::Mandatory) {
                return true;
            }
            let shareable = ha.multi_system || ha.multi_model || hb.multi_system || hb.multi_model;
            if !shareable {
                return true;
            }
        }
    }
    false
}

/// Resolve the maximum-weight independent set(s) of `candidates` on one
/// replicon (spec.md §4.6). Returns every solution tied at the maximum
/// score, ranked with the best first, plus the terminal state.
pub fn resolve(
    candidates: &[CandidateSystem],
    weights: &ScoringWeights,
    timeout: Option<Duration>,
) -> (Vec<Solution>, ResolverOutcome) {
    if candidates.is_empty() {
        return (Vec::new(), ResolverOutcome::Empty);
    }

    let scores: Vec<f64> = candidates.iter().map(|c| score(c, weights)).collect();

    // Vertex ordering: descending score, descending hit count, ascending
    // minimum position (spec.md §4.6 step 2).
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&i, &j| {
        scores[j]
            .partial_cmp(&scores[i])
            .unwrap()
            .then_with(|| candidates[j].all_hits().len().cmp(&candidates[i].all_hits().len()))
            .then_with(|| candidates[i].min_position().cmp(&candidates[j].min_position()))
    });

    let n = order.len();
    let adj: Vec<Vec<bool>> = (0..candidates.len())
        .map(|i| (0..candidates.len()).map(|j| i != j && conflicts(&candidates[i], &candidates[j])).collect())
        .collect();

    // Upper bound at position `pos`: sum of the remaining ordered scores.
    // Looser than "remaining *compatible* candidates" (spec.md §4.6 step 2)
    // but still a valid bound since compatible ones are a subset.
    let mut suffix_sum = vec![0.0f64; n + 1];
    for i in (0..n).rev() {
        suffix_sum[i] = suffix_sum[i + 1] + scores[order[i]];
    }

    let deadline = timeout.map(|d| Instant::now() + d);

    let mut best_score = 0.0f64;
    let mut best_sets: Vec<Vec<usize>> = vec![Vec::new()];
    let mut timed_out = false;
    let mut chosen: Vec<usize> = Vec::new();

    search(
        0,
        &order,
        &scores,
        &adj,
        &suffix_sum,
        deadline,
        &mut chosen,
        0.0,
        &mut best_score,
        &mut best_sets,
        &mut timed_out,
    );

    let mut solutions: Vec<Solution> = best_sets
        .into_iter()
        .map(|indices| Solution {
            candidates: indices.iter().map(|&i| candidates[i].clone()).collect(),
            score: best_score,
        })
        .collect();

    rank_solutions(&mut solutions);

    let outcome = if timed_out {
        ResolverOutcome::Timeout
    } else {
        ResolverOutcome::Optimal
    };
    (solutions, outcome)
}

#[allow(clippy::too_many_arguments)]
fn search(
    pos: usize,
    order: &[usize],
    scores: &[f64],
    adj: &[Vec<bool>],
    suffix_sum: &[f64],
    deadline: Option<Instant>,
    chosen: &mut Vec<usize>,
    chosen_score: f64,
    best_score: &mut f64,
    best_sets: &mut Vec<Vec<usize>>,
    timed_out: &mut bool,
) {
    if *timed_out {
        return;
    }
    if let Some(dl) = deadline {
        if Instant::now() >= dl {
            *timed_out = true;
            return;
        }
    }

    if chosen_score > *best_score + 1e-9 {
        *best_score = chosen_score;
        best_sets.clear();
        best_sets.push(chosen.clone());
    } else if (chosen_score - *best_score).abs() <= 1e-9 && !chosen.is_empty() && !best_sets.contains(chosen) {
        best_sets.push(chosen.clone());
    }

    if pos == order.len() {
        return;
    }
    if chosen_score + suffix_sum[pos] < *best_score - 1e-9 {
        return;
    }

    let v = order[pos];
    let compatible = chosen.iter().all(|&c| !adj[c][v]);
    if compatible {
        chosen.push(v);
        search(
            pos + 1,
            order,
            scores,
            adj,
            suffix_sum,
            deadline,
            chosen,
            chosen_score + scores[v],
            best_score,
            best_sets,
            timed_out,
        );
        chosen.pop();
    }
    search(
        pos + 1,
        order,
        scores,
        adj,
        suffix_sum,
        deadline,
        chosen,
        chosen_score,
        best_score,
        best_sets,
        timed_out,
    );
}

/// Rank tied solutions (spec.md §4.6 step 4): hit count desc, candidate
/// count desc, mean wholeness desc, lexicographic ascending hit positions.
fn rank_solutions(solutions: &mut [Solution]) {
    solutions.sort_by(|a, b| {
        b.hit_count()
            .cmp(&a.hit_count())
            .then_with(|| b.candidates.len().cmp(&a.candidates.len()))
            .then_with(|| b.mean_wholeness().partial_cmp(&a.mean_wholeness()).unwrap())
            .then_with(|| a.sorted_hit_positions().cmp(&b.sorted_hit_positions()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Cluster;
    use crate::hits::Hit;
    use crate::model::{CoreGeneId, ModelGeneId};

    fn model_hit(
        replicon: &str,
        position: u32,
        gene: ModelGeneId,
        status: Role,
        multi_system: bool,
        multi_model: bool,
    ) -> ModelHit {
        ModelHit {
            hit: Hit {
                replicon: replicon.to_string(),
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
            multi_model,
            multi_system,
            via_exchangeable: false,
        }
    }

    fn single_cluster_candidate(id: &str, model_fqn: &str, hits: Vec<ModelHit>, wholeness: f64) -> CandidateSystem {
        CandidateSystem {
            system_id: id.to_string(),
            replicon: "R".into(),
            model_fqn: model_fqn.to_string(),
            clusters: vec![Cluster {
                hits,
                locus_num: 0,
                wrapped: false,
            }],
            outside_hits: vec![],
            wholeness,
            occ: 1,
        }
    }

    #[test]
    fn empty_candidate_list_is_the_empty_terminal_state() {
        let (solutions, outcome) = resolve(&[], &ScoringWeights::default(), None);
        assert!(solutions.is_empty());
        assert_eq!(ResolverOutcome::Empty, outcome);
    }

    #[test]
    fn two_non_conflicting_candidates_are_both_kept() {
        let a = single_cluster_candidate(
            "a",
            "TEST/modelA",
            vec![model_hit("R", 1, ModelGeneId(0), Role::Mandatory, false, false)],
            1.0,
        );
        let b = single_cluster_candidate(
            "b",
            "TEST/modelB",
            vec![model_hit("R", 50, ModelGeneId(0), Role::Mandatory, false, false)],
            1.0,
        );
        let (solutions, outcome) = resolve(&[a, b], &ScoringWeights::default(), None);
        assert_eq!(ResolverOutcome::Optimal, outcome);
        assert_eq!(2, solutions[0].candidates.len());
    }

    #[test]
    fn conflicting_candidates_keep_only_the_higher_scoring_one() {
        let shared = model_hit("R", 1, ModelGeneId(0), Role::Mandatory, false, false);
        let a = single_cluster_candidate("a", "TEST/model", vec![shared.clone()], 1.0);
        let mut richer_hits = vec![shared];
        richer_hits.push(model_hit("R", 2, ModelGeneId(1), Role::Accessory, false, false));
        let b = single_cluster_candidate("b", "TEST/model", richer_hits, 1.0);

        let (solutions, outcome) = resolve(&[a, b], &ScoringWeights::default(), None);
        assert_eq!(ResolverOutcome::Optimal, outcome);
        assert_eq!(1, solutions[0].candidates.len());
        assert_eq!("b", solutions[0].candidates[0].system_id);
    }

    #[test]
    fn multi_system_hit_allows_both_candidates_to_share_it() {
        let shared = model_hit("R", 1, ModelGeneId(0), Role::Accessory, true, false);
        let a = single_cluster_candidate("a", "TEST/modelA", vec![shared.clone()], 1.0);
        let b = single_cluster_candidate("b", "TEST/modelB", vec![shared], 1.0);

        let (solutions, _) = resolve(&[a, b], &ScoringWeights::default(), None);
        assert_eq!(2, solutions[0].candidates.len());
    }

    #[test]
    fn same_model_mandatory_overlap_always_conflicts_even_if_multi_system() {
        let shared = model_hit("R", 1, ModelGeneId(0), Role::Mandatory, true, true);
        let a = single_cluster_candidate("a", "TEST/model", vec![shared.clone()], 1.0);
        let b = single_cluster_candidate("b", "TEST/model", vec![shared], 1.0);

        let (solutions, _) = resolve(&[a, b], &ScoringWeights::default(), None);
        assert_eq!(1, solutions[0].candidates.len());
    }
}
