//! `macsylib` executable entry point.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use console::Term;
use rayon::prelude::*;

use macsylib::cli::{Cli, Commands, SearchSystemsArgs};
use macsylib::common::RunMetadata;
use macsylib::config::{BaseOptions, ConfigLayer, DirectoryOptions, GeneralOptions, HmmerOptions, ModelOverride, ModelsOptions, RunConfig};
use macsylib::err::{exit_code_for, IoError, Outcome};
use macsylib::hits::report::parse_report;
use macsylib::hits::HitStream;
use macsylib::hmmer::{HmmSearchRunner, Real};
use macsylib::model::{load_package, ModelSelector};
use macsylib::package::check_package;
use macsylib::pipeline;
use macsylib::report::write_reports;
use macsylib::seqdb::discover_replicons;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || match run(&cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            let _ = term.write_line(&format!("error: {err:#}"));
            exit_code_for(&err)
        }
    })
}

fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    match &cli.command {
        Commands::SearchSystems(args) => run_search_systems(args),
        Commands::CheckPackage(args) => {
            let issues = check_package(&args.package_dir, &args.family, args.lenient);
            for checked in &issues {
                let prefix = if checked.is_warning { "warning" } else { "error" };
                println!("{prefix}: {}", checked.issue);
            }
            if issues.iter().any(|i| !i.is_warning) {
                anyhow::bail!(
                    "model package {:?} failed validation ({} issue(s))",
                    args.package_dir,
                    issues.len()
                );
            }
            Ok(Outcome::Success)
        }
    }
}

/// Apply `models_opt`'s per-model threshold overrides onto the loaded
/// catalog in place, keyed by fully-qualified model name (spec.md §6.3).
/// Overrides for unknown model names are silently ignored: the config may
/// legitimately name models from a package that is not the one loaded.
fn apply_model_overrides(catalog: &mut macsylib::model::ModelCatalog, overrides: &std::collections::HashMap<String, ModelOverride>) {
    for (fqn, over) in overrides {
        let Some(model) = catalog.model_by_fqn_mut(fqn) else {
            continue;
        };
        if let Some(v) = over.inter_gene_max_space {
            model.inter_gene_max_space = v;
        }
        if let Some(v) = over.min_mandatory_genes_required {
            model.min_mandatory_genes_required = v;
        }
        if let Some(v) = over.min_genes_required {
            model.min_genes_required = v;
        }
        if let Some(v) = over.max_nb_genes {
            model.max_nb_genes = Some(v);
        }
    }
}

fn run_search_systems(args: &SearchSystemsArgs) -> anyhow::Result<Outcome> {
    let cli_layer = ConfigLayer {
        base: Some(BaseOptions {
            sequence_db: Some(args.sequence_db.clone()),
            db_type: Some(args.db_type.clone()),
            i_evalue_sel: None,
            coverage_profile: None,
        }),
        models: Some(ModelsOptions {
            package_dir: Some(args.package_dir.clone()),
            family: args.family.clone(),
        }),
        hmmer: Some(HmmerOptions {
            binary: None,
            worker_count: args.worker_count,
        }),
        directories: Some(DirectoryOptions {
            output_dir: Some(args.output_dir.clone()),
            work_dir: None,
        }),
        general: Some(GeneralOptions {
            timeout_secs: args.timeout_secs,
        }),
        ..Default::default()
    };
    let config = RunConfig::from_files(&args.cfg_files, cli_layer)?;

    if args.worker_count.is_some() {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count)
            .build_global()?;
    }

    let mut catalog = load_package(&config.package_dir, &config.family)?;
    apply_model_overrides(&mut catalog, &config.model_overrides);

    let replicons = discover_replicons(&config.sequence_db, &config.db_type, args.topology_file.as_deref())?;

    let work_dir = match &config.work_dir {
        Some(path) => macsylib::common::WorkDir::persistent(path.clone())?,
        None => macsylib::common::WorkDir::scoped()?,
    };
    let runner = Real::new(config.hmmer_binary.clone());

    let genes: Vec<_> = (0..catalog.gene_catalog().len())
        .map(|i| catalog.gene_catalog().get(macsylib::model::CoreGeneId(i as u32)).clone())
        .collect();

    let gene_hits: Vec<(macsylib::model::CoreGeneId, Result<Vec<macsylib::hits::Hit>, IoError>)> = genes
        .par_iter()
        .map(|gene| {
            let outcome = runner
                .search(&gene.name, &gene.profile_path, &config.sequence_db, work_dir.path())
                .and_then(|report_path| parse_report(&report_path, gene.id));
            (gene.id, outcome)
        })
        .collect();

    let mut hit_stream = HitStream::new();
    for (_, outcome) in gene_hits {
        hit_stream.ingest(outcome?, config.i_evalue_sel, config.coverage_profile);
    }

    let timeout = config.timeout_secs.map(Duration::from_secs);
    let report = pipeline::run(
        &replicons,
        &catalog,
        &ModelSelector::All,
        &hit_stream,
        &config.scoring,
        timeout,
    );

    let metadata = RunMetadata::new(std::env::args().collect::<Vec<_>>().join(" "), config.family.clone());
    write_reports(
        &config.output_dir,
        &report.accepted,
        &report.best_solutions,
        &report.rejected,
        &report.warnings,
        &metadata,
        &catalog,
        &config.scoring,
    )?;

    let timed_out = report
        .warnings
        .iter()
        .any(|w| matches!(w, macsylib::common::Warning::ReplionTimeout { .. }));
    if timed_out {
        Ok(Outcome::SuccessWithTimeout)
    } else {
        Ok(Outcome::Success)
    }
}
