use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::{
    filter::FilterSelection, ingest::LoadOptions, pipeline::MappingOptions,
    report::ExportFormat,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Analyse contract sales tables and export reports",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Preview the first rows of the raw input table
    Preview(PreviewArgs),
    /// Detect which columns hold each semantic field
    Detect(DetectArgs),
    /// Print KPIs, top distributors, monthly revenue, forecast and anomalies
    Summary(SummaryArgs),
    /// Render every chart as a PNG file
    Charts(ChartsArgs),
    /// Export the analysis as a spreadsheet, PDF or slide deck
    Export(ExportArgs),
}

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Input CSV/TSV file or spreadsheet (xlsx, xls, ods)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of delimited input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Worksheet name or 0-based index for spreadsheet input
    #[arg(long)]
    pub sheet: Option<String>,
}

impl InputArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            delimiter: self.delimiter,
            encoding: self.input_encoding.clone(),
            sheet: self.sheet.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct MappingArgs {
    /// YAML file with extra column aliases per field
    #[arg(long)]
    pub catalog: Option<PathBuf>,
    /// Saved mapping file (as written by `detect -o`)
    #[arg(long)]
    pub mapping: Option<PathBuf>,
    /// Map a field to a column, e.g. `--map revenue="Chiffre d'affaires"`
    #[arg(long = "map", action = clap::ArgAction::Append)]
    pub overrides: Vec<String>,
    /// Proceed with placeholder columns for fields that were not detected
    #[arg(long = "accept-placeholders")]
    pub accept_placeholders: bool,
}

impl MappingArgs {
    pub fn options(&self) -> MappingOptions {
        MappingOptions {
            catalog: self.catalog.clone(),
            mapping_file: self.mapping.clone(),
            overrides: self.overrides.clone(),
            accept_placeholders: self.accept_placeholders,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// First day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,
    /// Restrict to these products (repeatable)
    #[arg(long = "product", action = clap::ArgAction::Append)]
    pub products: Vec<String>,
    /// Restrict to these distributors (repeatable)
    #[arg(long = "distributor", action = clap::ArgAction::Append)]
    pub distributors: Vec<String>,
    /// Case-insensitive product/distributor search; replaces explicit selections
    #[arg(long)]
    pub search: Option<String>,
}

impl FilterArgs {
    pub fn selection(&self) -> FilterSelection {
        FilterSelection {
            start: self.start,
            end: self.end,
            products: self.products.clone(),
            distributors: self.distributors.clone(),
            search: self.search.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// YAML file with extra column aliases per field
    #[arg(long)]
    pub catalog: Option<PathBuf>,
    /// Write the detected mapping to this YAML file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub mapping: MappingArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Currency label shown next to amounts
    #[arg(long, default_value = crate::report::DEFAULT_CURRENCY)]
    pub currency: String,
    /// Emit the summary as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ChartsArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub mapping: MappingArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Directory receiving one PNG per chart
    #[arg(long = "out-dir")]
    pub out_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub mapping: MappingArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Export format
    #[arg(long, value_enum)]
    pub format: ExportFormat,
    /// Output path (defaults to the format's standard file name)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Currency label shown next to amounts
    #[arg(long, default_value = crate::report::DEFAULT_CURRENCY)]
    pub currency: String,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("Invalid date '{value}' (expected YYYY-MM-DD): {err}"))
}
