//! Result Reporter: a pure projection of the resolver's output onto the
//! tabular file contracts of spec.md §6.4. Never recomputes scores or
//! reorders hits.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

use crate::candidates::{CandidateSystem, RejectedCandidate};
use crate::common::{RunMetadata, Warning};
use crate::err::IoError;
use crate::hits::ModelHit;
use crate::model::ModelCatalog;
use crate::resolve::Solution;
use crate::score::{round_for_report, score, ScoringWeights};

const SYSTEM_COLUMNS: &[&str] = &[
    "replicon",
    "hit_id",
    "gene_name",
    "hit_pos",
    "model_fqn",
    "sys_id",
    "sys_loci",
    "locus_num",
    "sys_wholeness",
    "sys_score",
    "sys_occ",
    "hit_gene_ref",
    "hit_status",
    "hit_seq_len",
    "hit_i_eval",
    "hit_score",
    "hit_profile_cov",
    "hit_seq_cov",
    "hit_begin_match",
    "hit_end_match",
    "counterpart",
    "used_in",
];

const REJECTED_COLUMNS: &[&str] =
    &["candidate_id", "replicon", "model_fqn", "cluster_id", "hit_id", "hit_pos", "gene_name", "function", "reasons"];

/// Which physical hits (by replicon+position) are shared across multiple
/// accepted systems, for the `used_in` column (spec.md §6.4).
fn used_in_map<'a>(candidates: impl Iterator<Item = &'a CandidateSystem>) -> HashMap<(String, u32), Vec<String>> {
    let mut map: HashMap<(String, u32), Vec<String>> = HashMap::new();
    for candidate in candidates {
        for hit in candidate.all_hits() {
            map.entry((hit.replicon().to_string(), hit.position()))
                .or_default()
                .push(candidate.system_id.clone());
        }
    }
    map
}

fn comma_join(values: &[String]) -> String {
    values.join(",")
}

fn locus_num_for(candidate: &CandidateSystem, hit: &ModelHit) -> i32 {
    candidate
        .clusters
        .iter()
        .find(|c| c.hits.iter().any(|h| h == hit))
        .map(|c| c.locus_num)
        .unwrap_or(-1)
}

#[allow(clippy::too_many_arguments)]
fn system_row(
    candidate: &CandidateSystem,
    hit: &ModelHit,
    catalog: &ModelCatalog,
    weights: &ScoringWeights,
    used_in: &HashMap<(String, u32), Vec<String>>,
    sol_id: Option<usize>,
) -> Vec<String> {
    let model_gene = catalog.model_gene(hit.model_gene);
    let core_gene = catalog.gene_catalog().get(hit.hit.core_gene);
    let reference_gene = catalog.gene_catalog().get(model_gene.core_gene);

    let counterpart = comma_join(
        &model_gene
            .exchangeables
            .iter()
            .map(|&id| catalog.gene_catalog().get(id).name.clone())
            .collect::<Vec<_>>(),
    );

    let used_in = used_in
        .get(&(hit.replicon().to_string(), hit.position()))
        .map(|ids| {
            ids.iter()
                .filter(|id| *id != &candidate.system_id)
                .cloned()
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let mut row = vec![
        hit.replicon().to_string(),
        hit.hit.protein_id.clone(),
        core_gene.name.clone(),
        hit.position().to_string(),
        candidate.model_fqn.clone(),
        candidate.system_id.clone(),
        candidate.sys_loci().to_string(),
        locus_num_for(candidate, hit).to_string(),
        format!("{:.3}", candidate.wholeness),
        format!("{:.3}", round_for_report(score(candidate, weights))),
        candidate.occ.to_string(),
        reference_gene.name.clone(),
        hit.status.to_string(),
        hit.hit.seq_length.to_string(),
        format!("{:e}", hit.hit.i_evalue),
        format!("{:.3}", hit.hit.score),
        format!("{:.3}", hit.hit.profile_coverage),
        format!("{:.3}", hit.hit.sequence_coverage),
        hit.hit.match_begin.to_string(),
        hit.hit.match_end.to_string(),
        counterpart,
        comma_join(&used_in),
    ];
    if let Some(id) = sol_id {
        row.insert(0, id.to_string());
    }
    row
}

fn write_header_comments<W: Write>(out: &mut W, metadata: &RunMetadata, warnings: &[Warning]) -> std::io::Result<()> {
    writeln!(out, "# macsylib {}", metadata.tool_version)?;
    writeln!(out, "# command: {}", metadata.command_line)?;
    writeln!(out, "# models: {}", metadata.model_package_version)?;
    for warning in warnings {
        writeln!(out, "{warning}")?;
    }
    Ok(())
}

fn open(path: &Path) -> Result<std::fs::File, IoError> {
    std::fs::File::create(path).map_err(|source| IoError::ReportWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Write one TSV table: header comments, a column-name row, then one row per
/// `(candidate, hit)` pair. `sol_id` prefixes an extra leading column when
/// `Some` (spec.md §6.4 `all_best_solutions.tsv`).
fn write_system_tsv<'a>(
    path: &Path,
    rows: impl Iterator<Item = (&'a CandidateSystem, &'a ModelHit, Option<usize>)>,
    catalog: &ModelCatalog,
    weights: &ScoringWeights,
    metadata: &RunMetadata,
    warnings: &[Warning],
) -> Result<(), IoError> {
    let rows: Vec<_> = rows.collect();
    let used_in = used_in_map(rows.iter().map(|(c, _, _)| *c));

    let mut file = open(path)?;
    write_header_comments(&mut file, metadata, warnings).map_err(|source| IoError::ReportWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = WriterBuilder::new().delimiter(b'\t').has_headers(false).from_writer(file);
    let mut header: Vec<&str> = SYSTEM_COLUMNS.to_vec();
    let has_sol_id = rows.iter().any(|(_, _, sol_id)| sol_id.is_some());
    if has_sol_id {
        header.insert(0, "sol_id");
    }
    writer
        .write_record(&header)
        .map_err(|e| write_err(path, e))?;
    for (candidate, hit, sol_id) in &rows {
        let row = system_row(candidate, hit, catalog, weights, &used_in, *sol_id);
        writer.write_record(&row).map_err(|e| write_err(path, e))?;
    }
    writer.flush().map_err(|source| IoError::ReportWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn write_err(path: &Path, e: csv::Error) -> IoError {
    IoError::ReportWriteFailed {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::Other, e),
    }
}

fn write_rejected_tsv(
    path: &Path,
    rejected: &[RejectedCandidate],
    catalog: &ModelCatalog,
    metadata: &RunMetadata,
    warnings: &[Warning],
) -> Result<(), IoError> {
    let mut file = open(path)?;
    write_header_comments(&mut file, metadata, warnings).map_err(|source| IoError::ReportWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = WriterBuilder::new().delimiter(b'\t').has_headers(false).from_writer(file);
    writer.write_record(REJECTED_COLUMNS).map_err(|e| write_err(path, e))?;

    for (candidate_id, candidate) in rejected.iter().enumerate() {
        let reasons = candidate.reasons.iter().map(|r| r.to_string()).collect::<Vec<_>>().join("/");
        for hit in &candidate.hits {
            let core_gene = catalog.gene_catalog().get(hit.hit.core_gene);
            let row = vec![
                candidate_id.to_string(),
                candidate.replicon.clone(),
                candidate.model_fqn.clone(),
                "0".to_string(),
                hit.hit.protein_id.clone(),
                hit.position().to_string(),
                core_gene.name.clone(),
                core_gene.family.clone(),
                reasons.clone(),
            ];
            writer.write_record(&row).map_err(|e| write_err(path, e))?;
        }
    }
    writer.flush().map_err(|source| IoError::ReportWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// A blank-line-separated, human-readable counterpart to a system TSV
/// (spec.md §6.4: "parsers must treat blank lines as record terminators").
fn write_system_txt<'a>(
    path: &Path,
    candidates: impl Iterator<Item = &'a CandidateSystem>,
    catalog: &ModelCatalog,
    weights: &ScoringWeights,
    metadata: &RunMetadata,
    warnings: &[Warning],
) -> Result<(), IoError> {
    let mut file = open(path)?;
    write_header_comments(&mut file, metadata, warnings).map_err(|source| IoError::ReportWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let write_err = |source: std::io::Error| IoError::ReportWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    for candidate in candidates {
        writeln!(file, "system id = {}", candidate.system_id).map_err(write_err)?;
        writeln!(file, "model = {}", candidate.model_fqn).map_err(write_err)?;
        writeln!(file, "replicon = {}", candidate.replicon).map_err(write_err)?;
        writeln!(file, "wholeness = {:.3}", candidate.wholeness).map_err(write_err)?;
        writeln!(file, "score = {:.3}", round_for_report(score(candidate, weights))).map_err(write_err)?;
        writeln!(file, "occ = {}", candidate.occ).map_err(write_err)?;
        for hit in candidate.all_hits() {
            let core_gene = catalog.gene_catalog().get(hit.hit.core_gene);
            writeln!(
                file,
                "  {}\t{}\t{}\t{}",
                hit.hit.protein_id,
                core_gene.name,
                hit.position(),
                hit.status
            )
            .map_err(write_err)?;
        }
        writeln!(file).map_err(write_err)?;
    }
    Ok(())
}

/// Write every output file spec.md §6.4 names into `output_dir`.
///
/// - `accepted`: every accepted `CandidateSystem`, across every replicon,
///   prior to resolution (`all_systems.tsv`).
/// - `best_solutions`: the tied maximum-score solutions; `[0]` is reported
///   as `best_solution.tsv`; the whole tie set feeds `all_best_solutions.tsv`.
pub fn write_reports(
    output_dir: &Path,
    accepted: &[CandidateSystem],
    best_solutions: &[Solution],
    rejected: &[RejectedCandidate],
    warnings: &[Warning],
    metadata: &RunMetadata,
    catalog: &ModelCatalog,
    weights: &ScoringWeights,
) -> Result<(), IoError> {
    std::fs::create_dir_all(output_dir).map_err(|source| IoError::ReportWriteFailed {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let best = best_solutions.first();
    let best_rows: Vec<(&CandidateSystem, &ModelHit, Option<usize>)> = best
        .into_iter()
        .flat_map(|sol| sol.candidates.iter())
        .flat_map(|c| c.all_hits().into_iter().map(move |h| (c, h, None)))
        .collect();
    write_system_tsv(
        &output_dir.join("best_solution.tsv"),
        best_rows.into_iter(),
        catalog,
        weights,
        metadata,
        warnings,
    )?;
    write_system_txt(
        &output_dir.join("best_solution.txt"),
        best.into_iter().flat_map(|sol| sol.candidates.iter()),
        catalog,
        weights,
        metadata,
        warnings,
    )?;

    let all_rows: Vec<(&CandidateSystem, &ModelHit, Option<usize>)> = accepted
        .iter()
        .flat_map(|c| c.all_hits().into_iter().map(move |h| (c, h, None)))
        .collect();
    write_system_tsv(
        &output_dir.join("all_systems.tsv"),
        all_rows.into_iter(),
        catalog,
        weights,
        metadata,
        warnings,
    )?;
    write_system_txt(
        &output_dir.join("all_systems.txt"),
        accepted.iter(),
        catalog,
        weights,
        metadata,
        warnings,
    )?;

    let loner_rows: Vec<(&CandidateSystem, &ModelHit, Option<usize>)> = best
        .into_iter()
        .flat_map(|sol| sol.candidates.iter())
        .flat_map(|c| c.all_hits().into_iter().filter(|h| h.loner).map(move |h| (c, h, None)))
        .collect();
    write_system_tsv(
        &output_dir.join("best_solution_loners.tsv"),
        loner_rows.into_iter(),
        catalog,
        weights,
        metadata,
        warnings,
    )?;

    let multisystem_rows: Vec<(&CandidateSystem, &ModelHit, Option<usize>)> = best
        .into_iter()
        .flat_map(|sol| sol.candidates.iter())
        .flat_map(|c| c.all_hits().into_iter().filter(|h| h.multi_system).map(move |h| (c, h, None)))
        .collect();
    write_system_tsv(
        &output_dir.join("best_solution_multisystems.tsv"),
        multisystem_rows.into_iter(),
        catalog,
        weights,
        metadata,
        warnings,
    )?;

    let tied_rows: Vec<(&CandidateSystem, &ModelHit, Option<usize>)> = best_solutions
        .iter()
        .enumerate()
        .flat_map(|(sol_id, sol)| sol.candidates.iter().map(move |c| (sol_id, c)))
        .flat_map(|(sol_id, c)| c.all_hits().into_iter().map(move |h| (c, h, Some(sol_id))))
        .collect();
    write_system_tsv(
        &output_dir.join("all_best_solutions.tsv"),
        tied_rows.into_iter(),
        catalog,
        weights,
        metadata,
        warnings,
    )?;

    write_rejected_tsv(&output_dir.join("rejected_candidates.tsv"), rejected, catalog, metadata, warnings)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Cluster;
    use crate::hits::Hit;
    use crate::model::{CoreGeneId, GeneSpec, ModelCatalog, ModelGeneId, ModelSpec, Role};

    fn build_catalog() -> ModelCatalog {
        let mut builder = ModelCatalog::builder();
        builder
            .add_model(ModelSpec {
                fqn: "TEST/model".into(),
                inter_gene_max_space: 2,
                min_mandatory_genes_required: 1,
                min_genes_required: 1,
                max_nb_genes: None,
                multi_loci: false,
                genes: vec![GeneSpec {
                    name: "A".into(),
                    role: Role::Mandatory,
                    loner: false,
                    multi_model: false,
                    multi_system: false,
                    inter_gene_max_space: None,
                    exchangeables: vec![],
                    profile_path: "A.hmm".into(),
                }],
            })
            .unwrap();
        builder.finish()
    }

    fn candidate(catalog: &ModelCatalog) -> CandidateSystem {
        let hit = ModelHit {
            hit: Hit {
                replicon: "R".into(),
                position: 1,
                protein_id: "p1".into(),
                core_gene: CoreGeneId(0),
                i_evalue: 1e-20,
                score: 99.0,
                profile_coverage: 0.9,
                sequence_coverage: 0.9,
                seq_length: 200,
                match_begin: 1,
                match_end: 100,
            },
            model_gene: ModelGeneId(0),
            status: Role::Mandatory,
            loner: false,
            multi_model: false,
            multi_system: false,
            via_exchangeable: false,
        };
        let _ = catalog;
        CandidateSystem {
            system_id: "R_TEST.model_1_0".into(),
            replicon: "R".into(),
            model_fqn: "TEST/model".into(),
            clusters: vec![Cluster {
                hits: vec![hit],
                locus_num: 0,
                wrapped: false,
            }],
            outside_hits: vec![],
            wholeness: 1.0,
            occ: 1,
        }
    }

    #[test]
    fn writes_best_solution_and_all_systems_tsv() {
        let catalog = build_catalog();
        let candidate = candidate(&catalog);
        let weights = ScoringWeights::default();
        let solution = Solution {
            candidates: vec![candidate.clone()],
            score: score(&candidate, &weights),
        };
        let metadata = RunMetadata::new("macsylib search-systems", "1.0");
        let dir = tempfile::tempdir().unwrap();

        write_reports(
            dir.path(),
            &[candidate],
            &[solution],
            &[],
            &[],
            &metadata,
            &catalog,
            &weights,
        )
        .unwrap();

        let contents = std::fs::read_to_string(dir.path().join("best_solution.tsv")).unwrap();
        assert!(contents.contains("# macsylib"));
        assert!(contents.contains("p1"));
        assert!(contents.contains("R_TEST.model_1_0"));

        let all_systems = std::fs::read_to_string(dir.path().join("all_systems.tsv")).unwrap();
        assert!(all_systems.contains("p1"));
    }
}
