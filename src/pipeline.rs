//! End-to-end recomputation: mapping resolution, standardization,
//! filtering, aggregation and the optional analytics, in that order.

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::{
    analytics::{
        AnomalyDetector, FORECAST_HORIZON, ForecastOutcome, Forecaster, HoltLinear,
        JointOutlierDetector, anomalous_rows, forecast_months,
    },
    breakdown::{Breakdown, YearMonth},
    catalog::SynonymCatalog,
    charts::{self, ChartImage},
    data::RawTable,
    error::Result,
    filter::{FilterCriteria, FilterSelection, apply_filters},
    inference::infer_columns,
    report::ReportPayload,
    schema::{ColumnMapping, FilteredTable, MappingFile, NormalizedTable, standardize},
    stats::Kpis,
};

/// How the column mapping is completed after inference.
#[derive(Debug, Clone, Default)]
pub struct MappingOptions {
    pub catalog: Option<PathBuf>,
    pub mapping_file: Option<PathBuf>,
    pub overrides: Vec<String>,
    /// Keep first-column placeholders for unresolved fields instead of
    /// failing.
    pub accept_placeholders: bool,
}

pub fn load_catalog(options: &MappingOptions) -> Result<SynonymCatalog> {
    match &options.catalog {
        Some(path) => SynonymCatalog::load_extension(path),
        None => Ok(SynonymCatalog::builtin()),
    }
}

/// Inference first, then the saved mapping file, then command-line
/// overrides. Each later source wins over the earlier ones.
pub fn resolve_mapping(
    raw: &RawTable,
    catalog: &SynonymCatalog,
    options: &MappingOptions,
) -> Result<ColumnMapping> {
    let inferred = infer_columns(catalog, raw.headers());
    let mut mapping = ColumnMapping::with_placeholders(&inferred, raw.headers())?;
    if let Some(path) = &options.mapping_file {
        debug!("Applying mapping file {path:?}");
        mapping.apply_file(&MappingFile::load(path)?);
    }
    mapping.apply_overrides(&options.overrides)?;

    let pending = mapping.placeholders().collect::<Vec<_>>();
    if !pending.is_empty() {
        if options.accept_placeholders {
            for field in &pending {
                warn!(
                    "{field} was not detected; using placeholder column '{}'",
                    mapping.column(*field)
                );
            }
        } else {
            mapping.require_confirmed()?;
        }
    }
    Ok(mapping)
}

/// Results of one recomputation pass over a standardized table.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub criteria: FilterCriteria,
    pub filtered: FilteredTable,
    pub kpis: Kpis,
    pub breakdown: Breakdown,
    /// Projected monthly revenue, or why none could be produced.
    pub forecast: std::result::Result<Vec<(YearMonth, f64)>, ForecastOutcome>,
    pub anomalies: FilteredTable,
}

impl Analysis {
    pub fn forecast_points(&self) -> Option<&[(YearMonth, f64)]> {
        self.forecast.as_deref().ok()
    }

    pub fn render_charts(&self) -> Result<Vec<ChartImage>> {
        charts::render_all(&charts::build_charts(
            &self.breakdown,
            self.forecast_points(),
        ))
    }

    pub fn payload<'a>(&'a self, currency: &'a str, images: &'a [ChartImage]) -> ReportPayload<'a> {
        ReportPayload {
            table: &self.filtered,
            kpis: &self.kpis,
            period: self.criteria.date_range,
            currency,
            images,
        }
    }
}

pub struct Analyzer {
    forecaster: Box<dyn Forecaster>,
    detector: Box<dyn AnomalyDetector>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(
            Box::new(HoltLinear::default()),
            Box::new(JointOutlierDetector::default()),
        )
    }
}

impl Analyzer {
    pub fn new(forecaster: Box<dyn Forecaster>, detector: Box<dyn AnomalyDetector>) -> Self {
        Self {
            forecaster,
            detector,
        }
    }

    pub fn run(&self, table: &NormalizedTable, selection: &FilterSelection) -> Analysis {
        let criteria = FilterCriteria::resolve(table, selection);
        self.run_with(table, criteria)
    }

    pub fn run_with(&self, table: &NormalizedTable, criteria: FilterCriteria) -> Analysis {
        let filtered = apply_filters(table, &criteria);
        let kpis = Kpis::compute(&filtered);
        let breakdown = Breakdown::compute(&filtered);
        let forecast = forecast_months(self.forecaster.as_ref(), &breakdown.monthly, FORECAST_HORIZON);
        if let Err(ForecastOutcome::InsufficientData { required, available }) = &forecast {
            debug!("Forecast skipped: {available} month(s) of history, {required} required");
        }
        let anomalies = anomalous_rows(self.detector.as_ref(), &filtered);
        info!(
            "Analysed {} of {} row(s); {} anomalous",
            filtered.len(),
            table.len(),
            anomalies.len()
        );
        Analysis {
            criteria,
            filtered,
            kpis,
            breakdown,
            forecast,
            anomalies,
        }
    }
}

/// Standardizes `raw` and runs the default analyzer in one step.
pub fn analyze(
    raw: &RawTable,
    mapping: &ColumnMapping,
    selection: &FilterSelection,
) -> Result<(NormalizedTable, Analysis)> {
    let table = standardize(raw, mapping)?;
    let analysis = Analyzer::default().run(&table, selection);
    Ok((table, analysis))
}
