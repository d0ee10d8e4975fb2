//! Model Catalog: parsed models, genes, exchangeables and thresholds
//! (spec.md §3, §4.1).

pub mod gene;
pub mod model;
pub mod types;
mod xml;

pub use gene::{CoreGene, CoreGeneId, GeneCatalog};
pub use model::{GeneSpec, Model, ModelCatalog, ModelCatalogBuilder, ModelId, ModelSelector, ModelSpec};
pub use types::{ModelGene, ModelGeneId, Role};

use std::path::Path;

use crate::err::ModelError;

/// Load every `definitions/*.xml` file under a model package directory into
/// a [`ModelCatalog`] (spec.md §6.1 "Model package").
///
/// The package's `metadata.yml` and `model_conf.xml` stay an external
/// collaborator per spec.md §1; this loader only needs the family name (the
/// package directory's own name), the gene definitions, and the profile
/// file layout under `profiles/`.
pub fn load_package(package_dir: &Path, family: &str) -> Result<ModelCatalog, ModelError> {
    let definitions_dir = package_dir.join("definitions");
    let profiles_dir = package_dir.join("profiles");

    let mut builder = ModelCatalog::builder();

    let mut paths: Vec<_> = std::fs::read_dir(&definitions_dir)
        .map_err(|source| ModelError::XmlParse {
            path: definitions_dir.clone(),
            source: quick_xml::DeError::Custom(source.to_string()),
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("xml"))
        .collect();
    paths.sort();

    for path in paths {
        let spec = xml::parse_definition(&path, family, &profiles_dir)?;
        builder.add_model(spec)?;
    }

    Ok(builder.finish())
}
