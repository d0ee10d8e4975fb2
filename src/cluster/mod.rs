//! Clustering Engine: groups `ModelHit`s on one replicon into `Cluster`s
//! under per-gene spacing rules, with loner/multi-model hits pooled
//! separately (spec.md §4.3).

use crate::hits::{Hit, ModelHit};
use crate::model::{Model, ModelCatalog};
use crate::replicon::{Replicon, Topology};

/// Ordered non-negative locus number of a cluster, or a negative id for a
/// loner cluster (spec.md §3 "Cluster"): loner clusters "do not count
/// toward `sys_loci`".
pub type LocusNum = i32;

/// Ordered non-empty sequence of `ModelHit`s belonging to one model on one
/// replicon, respecting the per-gene spacing rule (spec.md §3 "Cluster").
#[derive(Debug, Clone)]
pub struct Cluster {
    pub hits: Vec<ModelHit>,
    pub locus_num: LocusNum,
    /// True if this cluster was formed by merging the tail of the sweep
    /// with its head across the replicon origin (spec.md §4.3 step 4).
    pub wrapped: bool,
}

impl Cluster {
    pub fn min_position(&self) -> u32 {
        self.hits.iter().map(ModelHit::position).min().unwrap_or(0)
    }

    pub fn max_position(&self) -> u32 {
        self.hits.iter().map(ModelHit::position).max().unwrap_or(0)
    }

    pub fn is_loner_cluster(&self) -> bool {
        self.locus_num < 0
    }

    /// True if `pos` falls within the positions this cluster actually
    /// spans. For a cluster wrapped across the replicon origin (spec.md
    /// §4.3 step 4), `hits` is ordered (tail-segment, head-segment), so the
    /// span is everything from the tail's first position around the origin
    /// to the head's last position — not the numeric `[min, max]` interval,
    /// which would wrongly include the untouched middle of the replicon.
    pub fn span_contains(&self, pos: u32) -> bool {
        if self.wrapped {
            let Some(tail_start) = self.hits.first().map(ModelHit::position) else {
                return false;
            };
            let Some(head_end) = self.hits.last().map(ModelHit::position) else {
                return false;
            };
            pos >= tail_start || pos <= head_end
        } else {
            self.min_position() <= pos && pos <= self.max_position()
        }
    }
}

/// Output of clustering one model on one replicon: its clusters plus the
/// loner and multi-model pools kept aside (spec.md §4.3).
#[derive(Debug, Clone, Default)]
pub struct ClusterSet {
    pub clusters: Vec<Cluster>,
    /// Loner `ModelHit`s, each appearing at most once.
    pub loner_pool: Vec<ModelHit>,
    /// Multi-model `ModelHit`s, each appearing at most once.
    pub multi_model_pool: Vec<ModelHit>,
    /// `ModelHit`s of forbidden genes, retained for rejection reasoning
    /// (spec.md §4.3 step 1) but never cluster-eligible.
    pub forbidden_hits: Vec<ModelHit>,
}

/// Materialise `ModelHit`s for `model` from raw `Hit`s: every hit whose
/// `CoreGene` appears in the model (directly or as an exchangeable)
/// becomes a `ModelHit` with status/flags from the matching `ModelGene`
/// (spec.md §4.3 step 1).
pub fn materialize_model_hits(
    hits: &[&Hit],
    model: &Model,
    catalog: &ModelCatalog,
) -> Vec<ModelHit> {
    let mut model_hits = Vec::new();
    for &hit in hits {
        if let Some(gid) = catalog.model_gene_for_core_gene(model, hit.core_gene) {
            let gene = catalog.model_gene(gid);
            model_hits.push(ModelHit {
                hit: hit.clone(),
                model_gene: gid,
                status: gene.role,
                loner: gene.loner,
                multi_model: gene.multi_model,
                multi_system: gene.multi_system,
                via_exchangeable: gene.matches_via_exchangeable(hit.core_gene),
            });
        }
    }
    model_hits.sort_by_key(ModelHit::position);
    model_hits
}

/// Cluster one model's materialised hits on one replicon
/// (spec.md §4.3 steps 2-5). Clustering is pure and cannot fail: an empty
/// output is a valid result.
pub fn cluster_model_hits(replicon: &Replicon, model: &Model, catalog: &ModelCatalog, hits: &[&Hit]) -> ClusterSet {
    let model_hits = materialize_model_hits(hits, model, catalog);

    let mut eligible = Vec::new();
    let mut loner_pool = Vec::new();
    let mut multi_model_pool = Vec::new();
    let mut forbidden_hits = Vec::new();

    for mh in model_hits {
        let gene = catalog.model_gene(mh.model_gene);
        if gene.role == crate::model::Role::Forbidden {
            forbidden_hits.push(mh);
        } else if gene.is_cluster_eligible() {
            eligible.push(mh);
        } else if mh.loner {
            loner_pool.push(mh);
        } else if mh.multi_model {
            multi_model_pool.push(mh);
        }
    }
    eligible.sort_by_key(ModelHit::position);

    // Sweep using the plain linear gap `p' - p_prev - 1` (spec.md §4.3 step
    // 3) even on circular replicons: origin-spanning runs are fused
    // afterwards by the explicit wrap-merge below (step 4), not by the
    // sweep itself.
    let mut raw_clusters: Vec<Vec<ModelHit>> = Vec::new();
    for mh in eligible {
        match raw_clusters.last_mut() {
            Some(current) => {
                let prev = current.last().unwrap();
                let max_space = catalog.effective_inter_gene_max_space(
                    model,
                    prev.model_gene,
                    mh.model_gene,
                );
                let gap = mh.position() - prev.position() - 1;
                if gap <= max_space {
                    current.push(mh);
                } else {
                    raw_clusters.push(vec![mh]);
                }
            }
            None => raw_clusters.push(vec![mh]),
        }
    }

    // Merge the sweep's tail cluster with its head across the origin
    // before discarding singletons: a singleton on either end may only
    // become non-degenerate once merged (spec.md §4.3 step 4).
    let mut wrapped = false;
    if replicon.topology == Topology::Circular && raw_clusters.len() >= 2 {
        let can_merge = {
            let first = raw_clusters.first().unwrap();
            let last = raw_clusters.last().unwrap();
            let tail_hit = last.last().unwrap();
            let head_hit = first.first().unwrap();
            let max_space = catalog.effective_inter_gene_max_space(
                model,
                tail_hit.model_gene,
                head_hit.model_gene,
            );
            let gap = replicon.genes_between(tail_hit.position(), head_hit.position());
            gap <= max_space
        };
        if can_merge {
            let head = raw_clusters.remove(0);
            let mut tail = raw_clusters.pop().unwrap();
            tail.extend(head);
            raw_clusters.insert(0, tail);
            wrapped = true;
        }
    }

    // A singleton cluster is discarded: the eligible set excludes loners by
    // construction (step 2 above), so a lone eligible hit can never become
    // a loner cluster here (spec.md §4.3 step 3).
    raw_clusters.retain(|c| c.len() > 1);

    let clusters = raw_clusters
        .into_iter()
        .enumerate()
        .map(|(idx, hits)| Cluster {
            hits,
            locus_num: idx as LocusNum,
            wrapped: wrapped && idx == 0,
        })
        .collect();

    ClusterSet {
        clusters,
        loner_pool,
        multi_model_pool,
        forbidden_hits,
    }
}
