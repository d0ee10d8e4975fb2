//! Layered run configuration (spec.md §6.3 "Configuration precedence").
//!
//! Six option groups — `base`, `models`, `models_opt`, `hmmer`, `score_opt`,
//! `directories`, `general` — are represented as partial, `serde`-derived
//! override layers folded left-to-right in ascending precedence:
//! `system-wide < user < model package < project < --cfg-file < CLI`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::err::ConfigError;
use crate::score::ScoringWeights;

/// One layer's partial view of the configuration. Every field is optional:
/// a layer only overrides what it sets, letting lower layers show through.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
    pub base: Option<BaseOptions>,
    pub models: Option<ModelsOptions>,
    #[serde(default)]
    pub models_opt: HashMap<String, ModelOverride>,
    pub hmmer: Option<HmmerOptions>,
    pub score_opt: Option<ScoreOptions>,
    pub directories: Option<DirectoryOptions>,
    pub general: Option<GeneralOptions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BaseOptions {
    pub sequence_db: Option<PathBuf>,
    pub db_type: Option<String>,
    pub i_evalue_sel: Option<f64>,
    pub coverage_profile: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsOptions {
    pub package_dir: Option<PathBuf>,
    pub family: Option<String>,
}

/// Per-model threshold overrides, keyed by fully-qualified model name
/// (spec.md §6.3 "`models_opt` overrides per-model thresholds using
/// fully-qualified model names").
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelOverride {
    pub inter_gene_max_space: Option<u32>,
    pub min_mandatory_genes_required: Option<usize>,
    pub min_genes_required: Option<usize>,
    pub max_nb_genes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HmmerOptions {
    pub binary: Option<PathBuf>,
    pub worker_count: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreOptions {
    pub mandatory_weight: Option<f64>,
    pub accessory_weight: Option<f64>,
    pub exchangeable_weight: Option<f64>,
    pub out_of_cluster: Option<f64>,
    pub redundancy_penalty: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryOptions {
    pub output_dir: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralOptions {
    pub timeout_secs: Option<u64>,
}

/// The fully-resolved configuration after folding every layer, in the
/// precedence order of spec.md §6.3.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub sequence_db: PathBuf,
    pub db_type: String,
    pub i_evalue_sel: f64,
    pub coverage_profile: f64,
    pub package_dir: PathBuf,
    pub family: String,
    pub model_overrides: HashMap<String, ModelOverride>,
    pub hmmer_binary: PathBuf,
    pub worker_count: usize,
    pub scoring: ScoringWeights,
    pub output_dir: PathBuf,
    pub work_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl RunConfig {
    /// Fold `layers` left-to-right — `layers[0]` is least significant
    /// (`system-wide`), `layers.last()` most significant (`CLI`) — then
    /// check the invariants spec.md §7 calls fatal configuration errors.
    pub fn resolve(layers: &[ConfigLayer]) -> Result<Self, ConfigError> {
        let mut merged = ConfigLayer::default();
        for layer in layers {
            merge_layer(&mut merged, layer);
        }

        let base = merged.base.unwrap_or_default();
        let models = merged.models.unwrap_or_default();
        let hmmer = merged.hmmer.unwrap_or_default();
        let score_opt = merged.score_opt.unwrap_or_default();
        let directories = merged.directories.unwrap_or_default();
        let general = merged.general.unwrap_or_default();

        let sequence_db = base.sequence_db.ok_or(ConfigError::MissingSequenceDatabase {
            path: PathBuf::new(),
        })?;
        if !sequence_db.exists() {
            return Err(ConfigError::MissingSequenceDatabase { path: sequence_db });
        }

        let db_type = base.db_type.unwrap_or_else(|| "unordered".to_string());
        if !matches!(db_type.as_str(), "unordered" | "ordered_replicon" | "gembase") {
            return Err(ConfigError::UnknownOption {
                group: "base".to_string(),
                key: format!("db_type={db_type}"),
            });
        }

        let mut scoring = ScoringWeights::default();
        if let Some(v) = score_opt.mandatory_weight {
            scoring.mandatory_weight = v;
        }
        if let Some(v) = score_opt.accessory_weight {
            scoring.accessory_weight = v;
        }
        if let Some(v) = score_opt.exchangeable_weight {
            scoring.exchangeable_weight = v;
        }
        if let Some(v) = score_opt.out_of_cluster {
            scoring.out_of_cluster = v;
        }
        if let Some(v) = score_opt.redundancy_penalty {
            scoring.redundancy_penalty = v;
        }

        Ok(RunConfig {
            sequence_db,
            db_type,
            i_evalue_sel: base.i_evalue_sel.unwrap_or(1e-4),
            coverage_profile: base.coverage_profile.unwrap_or(0.5),
            package_dir: models.package_dir.unwrap_or_default(),
            family: models.family.unwrap_or_default(),
            model_overrides: merged.models_opt,
            hmmer_binary: hmmer.binary.unwrap_or_else(|| PathBuf::from("hmmsearch")),
            worker_count: hmmer.worker_count.unwrap_or_else(num_cpus_fallback),
            scoring,
            output_dir: directories.output_dir.unwrap_or_else(|| PathBuf::from("macsylib_results")),
            work_dir: directories.work_dir,
            timeout_secs: general.timeout_secs,
        })
    }

    /// Load and resolve a stack of YAML config files plus a final CLI layer,
    /// in the precedence order of spec.md §6.3.
    pub fn from_files(paths: &[PathBuf], cli_layer: ConfigLayer) -> Result<Self, ConfigError> {
        let mut layers = Vec::with_capacity(paths.len() + 1);
        for path in paths {
            layers.push(read_layer(path)?);
        }
        layers.push(cli_layer);
        Self::resolve(&layers)
    }
}

fn read_layer(path: &Path) -> Result<ConfigLayer, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
    })
}

fn merge_layer(merged: &mut ConfigLayer, layer: &ConfigLayer) {
    if layer.base.is_some() {
        merged.base = layer.base.clone();
    }
    if layer.models.is_some() {
        merged.models = layer.models.clone();
    }
    for (fqn, overrides) in &layer.models_opt {
        merged.models_opt.insert(fqn.clone(), overrides.clone());
    }
    if layer.hmmer.is_some() {
        merged.hmmer = layer.hmmer.clone();
    }
    if layer.score_opt.is_some() {
        merged.score_opt = layer.score_opt.clone();
    }
    if layer.directories.is_some() {
        merged.directories = layer.directories.clone();
    }
    if layer.general.is_some() {
        merged.general = layer.general.clone();
    }
}

fn num_cpus_fallback() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_later_layer_overrides_an_earlier_one() {
        let system_wide = ConfigLayer {
            base: Some(BaseOptions {
                sequence_db: None,
                db_type: Some("unordered".into()),
                i_evalue_sel: Some(1e-2),
                coverage_profile: None,
            }),
            ..Default::default()
        };
        let cli = ConfigLayer {
            base: Some(BaseOptions {
                sequence_db: Some(PathBuf::from(file!())),
                db_type: None,
                i_evalue_sel: Some(1e-6),
                coverage_profile: None,
            }),
            ..Default::default()
        };

        let config = RunConfig::resolve(&[system_wide, cli]).unwrap();
        assert_eq!(1e-6, config.i_evalue_sel);
        assert_eq!("unordered", config.db_type);
    }

    #[test]
    fn missing_sequence_database_is_a_config_error() {
        let cli = ConfigLayer::default();
        let err = RunConfig::resolve(&[cli]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSequenceDatabase { .. }));
    }

    #[test]
    fn unknown_db_type_is_rejected() {
        let cli = ConfigLayer {
            base: Some(BaseOptions {
                sequence_db: Some(PathBuf::from(file!())),
                db_type: Some("bogus".into()),
                i_evalue_sel: None,
                coverage_profile: None,
            }),
            ..Default::default()
        };
        let err = RunConfig::resolve(&[cli]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption { .. }));
    }

    #[test]
    fn models_opt_overrides_are_keyed_by_fully_qualified_name() {
        let mut models_opt = HashMap::new();
        models_opt.insert(
            "TEST/model".to_string(),
            ModelOverride {
                inter_gene_max_space: Some(5),
                ..Default::default()
            },
        );
        let cli = ConfigLayer {
            base: Some(BaseOptions {
                sequence_db: Some(PathBuf::from(file!())),
                db_type: None,
                i_evalue_sel: None,
                coverage_profile: None,
            }),
            models_opt,
            ..Default::default()
        };
        let config = RunConfig::resolve(&[cli]).unwrap();
        assert_eq!(
            Some(5),
            config.model_overrides.get("TEST/model").and_then(|o| o.inter_gene_max_space)
        );
    }
}
