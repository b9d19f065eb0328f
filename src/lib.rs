pub mod analytics;
pub mod breakdown;
pub mod catalog;
pub mod charts;
pub mod cli;
pub mod data;
pub mod error;
pub mod filter;
pub mod inference;
pub mod ingest;
pub mod io_utils;
pub mod pipeline;
pub mod preview;
pub mod report;
pub mod schema;
pub mod stats;
pub mod summary;
pub mod table;

use std::{env, fs, path::PathBuf, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{ChartsArgs, Cli, Commands, DetectArgs, ExportArgs, FilterArgs, InputArgs, MappingArgs},
    inference::infer_columns,
    pipeline::Analysis,
    report::ExportFormat,
    schema::ColumnMapping,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_report", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Preview(args) => preview::execute(&args),
        Commands::Detect(args) => handle_detect(&args),
        Commands::Summary(args) => summary::execute(&args),
        Commands::Charts(args) => handle_charts(&args),
        Commands::Export(args) => handle_export(&args),
    }
}

/// Loads, maps, standardizes and analyses the input described by the shared
/// argument groups.
pub(crate) fn prepare_analysis(
    input: &InputArgs,
    mapping: &MappingArgs,
    filter: &FilterArgs,
) -> Result<Analysis> {
    let path = &input.input;
    let raw = ingest::load_table(path, &input.load_options())
        .with_context(|| format!("Loading {path:?}"))?;
    let options = mapping.options();
    let catalog = pipeline::load_catalog(&options).context("Loading column catalog")?;
    let mapping = pipeline::resolve_mapping(&raw, &catalog, &options)
        .context("Resolving column mapping")?;
    let (_, analysis) = pipeline::analyze(&raw, &mapping, &filter.selection())
        .with_context(|| format!("Standardizing columns of {path:?}"))?;
    Ok(analysis)
}

fn handle_detect(args: &DetectArgs) -> Result<()> {
    let path = &args.input.input;
    info!("Detecting columns in '{}'", path.display());
    let raw = ingest::load_table(path, &args.input.load_options())
        .with_context(|| format!("Loading {path:?}"))?;
    let catalog = match &args.catalog {
        Some(catalog) => catalog::SynonymCatalog::load_extension(catalog)
            .with_context(|| format!("Loading catalog {catalog:?}"))?,
        None => catalog::SynonymCatalog::builtin(),
    };
    let inferred = infer_columns(&catalog, raw.headers());

    let mut rows = Vec::new();
    for (field, column) in inferred.iter() {
        match column {
            Some(column) => {
                rows.push(vec![field.key().to_string(), column.to_string(), "detected".into()]);
            }
            None => {
                warn!("No column detected for {field}; confirm it with --map {}=<column>", field.key());
                rows.push(vec![field.key().to_string(), String::new(), "unresolved".into()]);
            }
        }
    }
    table::print_table(&["Field", "Column", "Status"], &rows);

    if let Some(output) = &args.output {
        let saved = ColumnMapping::with_placeholders(&inferred, raw.headers())
            .with_context(|| format!("Building mapping for {path:?}"))?
            .to_file();
        saved
            .save(output)
            .with_context(|| format!("Writing mapping to {output:?}"))?;
        info!(
            "Mapping for {} of {} field(s) written to {:?}",
            saved.columns.len(),
            catalog::SemanticField::ALL.len(),
            output
        );
    }
    Ok(())
}

fn handle_charts(args: &ChartsArgs) -> Result<()> {
    let analysis = prepare_analysis(&args.input, &args.mapping, &args.filter)?;
    let images = analysis.render_charts().context("Rendering charts")?;
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Creating output directory {:?}", args.out_dir))?;
    for image in &images {
        let target = args.out_dir.join(image.file_name());
        fs::write(&target, &image.png).with_context(|| format!("Writing chart {target:?}"))?;
        debug!("Wrote {target:?} ({} bytes)", image.png.len());
    }
    info!("Wrote {} chart(s) to {:?}", images.len(), args.out_dir);
    Ok(())
}

fn handle_export(args: &ExportArgs) -> Result<()> {
    let analysis = prepare_analysis(&args.input, &args.mapping, &args.filter)?;
    let images = match args.format {
        ExportFormat::Xlsx => Vec::new(),
        ExportFormat::Pdf | ExportFormat::Pptx => {
            analysis.render_charts().context("Rendering charts")?
        }
    };
    let payload = analysis.payload(&args.currency, &images);
    let artifact = report::export(args.format, &payload)
        .with_context(|| format!("Exporting {}", args.format.file_name()))?;
    let target = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&artifact.file_name));
    fs::write(&target, &artifact.bytes)
        .with_context(|| format!("Writing {target:?}"))?;
    info!(
        "Exported {} ({}, {} bytes) to {:?}",
        artifact.file_name,
        artifact.mime_type,
        artifact.bytes.len(),
        target
    );
    Ok(())
}
