//! Filtered, indexed `Hit` stream (spec.md §4.2 "Hit Stream").

use indexmap::IndexMap;

use crate::model::CoreGeneId;

use super::record::Hit;

/// Normalised, filtered hit records indexed by replicon and by gene.
///
/// Guarantee: for any `(replicon, gene)` the selected hits are unique and
/// sorted by ascending position; ties on position are impossible because
/// position indexes proteins (spec.md §4.2).
#[derive(Debug, Default)]
pub struct HitStream {
    by_replicon_and_gene: IndexMap<(String, CoreGeneId), Vec<Hit>>,
}

impl HitStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed in one gene's raw hits, filtering by the selection thresholds
    /// and indexing what survives (spec.md §4.2 steps 1-3).
    pub fn ingest(&mut self, raw_hits: Vec<Hit>, i_evalue_sel: f64, coverage_profile: f64) {
        let mut by_replicon: IndexMap<String, Vec<Hit>> = IndexMap::new();
        for hit in raw_hits {
            if hit.is_selected(i_evalue_sel, coverage_profile) {
                by_replicon.entry(hit.replicon.clone()).or_default().push(hit);
            }
        }
        for (replicon, mut hits) in by_replicon {
            hits.sort_by_key(|h| h.position);
            hits.dedup_by_key(|h| h.position);
            let gene = hits
                .first()
                .map(|h| h.core_gene)
                .expect("non-empty by construction");
            self.by_replicon_and_gene
                .entry((replicon, gene))
                .or_default()
                .extend(hits);
        }
    }

    /// Selected hits for one `(replicon, gene)` pair, ascending position.
    pub fn hits_for(&self, replicon: &str, gene: CoreGeneId) -> &[Hit] {
        self.by_replicon_and_gene
            .get(&(replicon.to_string(), gene))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All distinct replicon names that have at least one selected hit.
    pub fn replicons(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .by_replicon_and_gene
            .keys()
            .map(|(r, _)| r.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// All selected hits on one replicon, across every gene, ascending
    /// position (used by the Clustering Engine).
    pub fn hits_on_replicon(&self, replicon: &str) -> Vec<&Hit> {
        let mut hits: Vec<&Hit> = self
            .by_replicon_and_gene
            .iter()
            .filter(|((r, _), _)| r == replicon)
            .flat_map(|(_, hits)| hits.iter())
            .collect();
        hits.sort_by_key(|h| h.position);
        hits
    }

    pub fn is_empty(&self) -> bool {
        self.by_replicon_and_gene.values().all(|v| v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(replicon: &str, position: u32, i_evalue: f64, coverage: f64) -> Hit {
        Hit {
            replicon: replicon.to_string(),
            position,
            protein_id: format!("p{position}"),
            core_gene: CoreGeneId(0),
            i_evalue,
            score: 100.0,
            profile_coverage: coverage,
            sequence_coverage: coverage,
            seq_length: 200,
            match_begin: 1,
            match_end: 100,
        }
    }

    #[test]
    fn filters_by_i_evalue_and_coverage() {
        let mut stream = HitStream::new();
        stream.ingest(
            vec![
                hit("r1", 1, 1e-20, 0.9),
                hit("r1", 2, 1.0, 0.9),
                hit("r1", 3, 1e-20, 0.1),
            ],
            1e-5,
            0.5,
        );
        let kept = stream.hits_for("r1", CoreGeneId(0));
        assert_eq!(1, kept.len());
        assert_eq!(1, kept[0].position);
    }

    #[test]
    fn hits_are_sorted_by_ascending_position() {
        let mut stream = HitStream::new();
        stream.ingest(
            vec![hit("r1", 5, 1e-20, 0.9), hit("r1", 1, 1e-20, 0.9)],
            1e-5,
            0.5,
        );
        let kept = stream.hits_for("r1", CoreGeneId(0));
        assert_eq!(vec![1, 5], kept.iter().map(|h| h.position).collect::<Vec<_>>());
    }

    #[test]
    fn zero_selected_hits_is_a_valid_empty_result() {
        let stream = HitStream::new();
        assert!(stream.is_empty());
        assert!(stream.hits_for("r1", CoreGeneId(0)).is_empty());
    }
}
