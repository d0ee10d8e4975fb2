//! Replicons: named ordered protein sequences, linear or circular
//! (spec.md §3 "Replicon").

use serde::{Deserialize, Serialize};

/// Topology of a replicon, fixing how gene-to-gene distances wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    Linear,
    Circular,
}

/// Tagged variant for the input layout a replicon's proteins were read from
/// (spec.md §9 Design Notes: "dynamic dispatch across report variants").
/// Clustering branches on this only insofar as it determines [`Topology`]
/// and how `replicon` names are derived from protein identifiers; it is not
/// otherwise a source of behavioral differences downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationLayout {
    /// Single, unordered collection of proteins: no clustering is possible,
    /// every hit behaves as if it were in its own replicon-wide loner pool.
    Unordered,
    /// One ordered replicon, topology given explicitly.
    OrderedReplicon,
    /// Multiple replicons multiplexed in one FASTA, protein IDs prefixed by
    /// `<replicon>_`; topology looked up in an optional topology file,
    /// defaulting to linear.
    Gembase,
}

/// A named ordered sequence of proteins with positions `1..=size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replicon {
    pub name: String,
    pub size: u32,
    pub topology: Topology,
}

impl Replicon {
    pub fn new(name: impl Into<String>, size: u32, topology: Topology) -> Self {
        Self {
            name: name.into(),
            size,
            topology,
        }
    }

    /// Number of gene positions strictly between `i` and `j` (exclusive of
    /// both endpoints), respecting topology (spec.md §3).
    ///
    /// On a circular replicon this is `min(|i-j|, size-|i-j|) - 1`; on a
    /// linear replicon positions never wrap.
    pub fn genes_between(&self, i: u32, j: u32) -> u32 {
        let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
        let linear_gap = hi - lo - 1;
        match self.topology {
            Topology::Linear => linear_gap,
            Topology::Circular => {
                let direct = hi - lo;
                let wrap = self.size.saturating_sub(direct);
                direct.min(wrap).saturating_sub(1)
            }
        }
    }
}

/// Derive the replicon name from a `gembase`-style protein identifier: the
/// prefix up to (and excluding) the last `_` (spec.md §6.1).
pub fn gembase_replicon_name(protein_id: &str) -> Option<&str> {
    protein_id.rfind('_').map(|idx| &protein_id[..idx])
}
