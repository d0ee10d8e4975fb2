//! `CoreGene` interning (spec.md §3 "CoreGene", §9 "arena-like storage").

use std::path::PathBuf;

use indexmap::IndexMap;

/// Stable index into a [`GeneCatalog`]. Cheap to copy, used everywhere a
/// `CoreGene` would otherwise need to be referenced, avoiding cycles at the
/// type level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoreGeneId(pub u32);

/// A gene unique by `(family, name)`; owns a reference to an HMM profile.
/// Exactly one instance per `(family, name)` exists in a [`GeneCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreGene {
    pub id: CoreGeneId,
    pub family: String,
    pub name: String,
    pub profile_path: PathBuf,
}

/// Process-wide immutable table of [`CoreGene`]s, built once before any
/// worker starts (spec.md §5: "populated once before workers start;
/// concurrent reads are lock-free").
#[derive(Debug, Default)]
pub struct GeneCatalog {
    by_key: IndexMap<(String, String), CoreGeneId>,
    genes: Vec<CoreGene>,
}

impl GeneCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a `(family, name)` pair, returning the existing id if already
    /// known. The profile path of the first registration wins; subsequent
    /// registrations with a different profile path are a caller bug, not a
    /// runtime error, so we simply keep the first value.
    pub fn intern(&mut self, family: &str, name: &str, profile_path: PathBuf) -> CoreGeneId {
        let key = (family.to_string(), name.to_string());
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }
        let id = CoreGeneId(self.genes.len() as u32);
        self.genes.push(CoreGene {
            id,
            family: key.0.clone(),
            name: key.1.clone(),
            profile_path,
        });
        self.by_key.insert(key, id);
        id
    }

    /// Look up an already-interned `(family, name)` pair.
    pub fn find(&self, family: &str, name: &str) -> Option<CoreGeneId> {
        self.by_key
            .get(&(family.to_string(), name.to_string()))
            .copied()
    }

    pub fn get(&self, id: CoreGeneId) -> &CoreGene {
        &self.genes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}
