//! Reader for the `definitions/*.xml` model grammar (spec.md §6.2).
//!
//! Grounded on the pack's `ARGA-Genomes-arga-oplogger`, `PoorRican-ncbi-rs`
//! and `David-OConnor-plascad` manifests, all of which reach for
//! `quick-xml`'s `serialize` feature for this kind of small,
//! attribute-heavy XML grammar.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::err::ModelError;

use super::model::{GeneSpec, ModelSpec};
use super::types::Role;

#[derive(Debug, Deserialize)]
#[serde(rename = "model")]
struct ModelXml {
    #[serde(rename = "@inter_gene_max_space")]
    inter_gene_max_space: u32,
    #[serde(rename = "@min_mandatory_genes_required")]
    min_mandatory_genes_required: usize,
    #[serde(rename = "@min_genes_required")]
    min_genes_required: usize,
    #[serde(rename = "@max_nb_genes", default)]
    max_nb_genes: Option<usize>,
    #[serde(rename = "@multi_loci", default)]
    multi_loci: bool,
    #[serde(rename = "gene", default)]
    genes: Vec<GeneXml>,
}

#[derive(Debug, Deserialize)]
struct GeneXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@presence")]
    presence: PresenceXml,
    #[serde(rename = "@loner", default)]
    loner: bool,
    #[serde(rename = "@multi_model", default)]
    multi_model: bool,
    #[serde(rename = "@multi_system", default)]
    multi_system: bool,
    #[serde(rename = "@inter_gene_max_space", default)]
    inter_gene_max_space: Option<u32>,
    #[serde(rename = "exchangeables", default)]
    exchangeables: Option<ExchangeablesXml>,
}

#[derive(Debug, Deserialize)]
struct ExchangeablesXml {
    #[serde(rename = "gene", default)]
    genes: Vec<ExchangeableGeneXml>,
}

#[derive(Debug, Deserialize)]
struct ExchangeableGeneXml {
    #[serde(rename = "@name")]
    name: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum PresenceXml {
    Mandatory,
    Accessory,
    Neutral,
    Forbidden,
}

impl From<PresenceXml> for Role {
    fn from(value: PresenceXml) -> Self {
        match value {
            PresenceXml::Mandatory => Role::Mandatory,
            PresenceXml::Accessory => Role::Accessory,
            PresenceXml::Neutral => Role::Neutral,
            PresenceXml::Forbidden => Role::Forbidden,
        }
    }
}

/// Parse one `definitions/<name>.xml` file into a [`ModelSpec`], looking
/// up each gene's profile under `<package>/profiles/<gene>.hmm`
/// (spec.md §6.1).
pub fn parse_definition(
    path: &Path,
    family: &str,
    profiles_dir: &Path,
) -> Result<ModelSpec, ModelError> {
    let text = std::fs::read_to_string(path).map_err(|source| ModelError::XmlParse {
        path: path.to_path_buf(),
        source: quick_xml::DeError::Custom(source.to_string()),
    })?;
    let xml: ModelXml = quick_xml::de::from_str(&text).map_err(|source| ModelError::XmlParse {
        path: path.to_path_buf(),
        source,
    })?;

    let name_stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string();
    let fqn = format!("{family}/{name_stem}");

    let genes = xml
        .genes
        .into_iter()
        .map(|g| {
            let profile_path: PathBuf = profiles_dir.join(format!("{}.hmm", g.name));
            GeneSpec {
                name: g.name,
                role: g.presence.into(),
                loner: g.loner,
                multi_model: g.multi_model,
                multi_system: g.multi_system,
                inter_gene_max_space: g.inter_gene_max_space,
                exchangeables: g
                    .exchangeables
                    .map(|x| x.genes.into_iter().map(|eg| eg.name).collect())
                    .unwrap_or_default(),
                profile_path,
            }
        })
        .collect();

    Ok(ModelSpec {
        fqn,
        inter_gene_max_space: xml.inter_gene_max_space,
        min_mandatory_genes_required: xml.min_mandatory_genes_required,
        min_genes_required: xml.min_genes_required,
        max_nb_genes: xml.max_nb_genes,
        multi_loci: xml.multi_loci,
        genes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const T2SS_XML: &str = r#"
        <model inter_gene_max_space="2" min_mandatory_genes_required="2" min_genes_required="3" vers="2.0">
            <gene name="gspD" presence="mandatory"/>
            <gene name="gspE" presence="mandatory"/>
            <gene name="gspF" presence="accessory">
                <exchangeables>
                    <gene name="gspF2"/>
                </exchangeables>
            </gene>
            <gene name="gspZ" presence="forbidden"/>
        </model>
    "#;

    #[test]
    fn parses_gene_roles_quorum_and_exchangeables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("T2SS.xml");
        std::fs::write(&path, T2SS_XML).unwrap();

        let spec = parse_definition(&path, "T2SS", &dir.path().join("profiles")).unwrap();

        assert_eq!("T2SS/T2SS", spec.fqn);
        assert_eq!(2, spec.min_mandatory_genes_required);
        assert_eq!(3, spec.min_genes_required);
        assert_eq!(4, spec.genes.len());

        let gspf = spec.genes.iter().find(|g| g.name == "gspF").unwrap();
        assert_eq!(vec!["gspF2".to_string()], gspf.exchangeables);

        let gspz = spec.genes.iter().find(|g| g.name == "gspZ").unwrap();
        assert_eq!(Role::Forbidden, gspz.role);
    }
}
