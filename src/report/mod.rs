//! Report assembly: summary text plus spreadsheet, PDF and slide-deck
//! exports. Every export is built in memory and returned as an
//! [`Artifact`]; nothing here touches the filesystem or mutates its inputs.

mod ooxml;
pub mod pdf;
pub mod png;
pub mod pptx;
pub mod xlsx;

use chrono::NaiveDate;
use clap::ValueEnum;
use num_format::{Locale, ToFormattedString};

use crate::{
    charts::ChartImage,
    error::Result,
    schema::FilteredTable,
    stats::{Kpis, NO_DATA},
};

pub const REPORT_TITLE: &str = "Sales Report";
pub const DEFAULT_CURRENCY: &str = "TND";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Xlsx,
    Pdf,
    Pptx,
}

impl ExportFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "sales_analysis.xlsx",
            ExportFormat::Pdf => "sales_report.pdf",
            ExportFormat::Pptx => "sales_report.pptx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }
}

/// A finished export, ready to be written or offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Artifact {
    fn new(format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format.file_name().to_string(),
            mime_type: format.mime_type(),
            bytes,
        }
    }
}

/// Everything a report is assembled from. `images` must already hold every
/// rendered chart, in presentation order.
#[derive(Debug, Clone, Copy)]
pub struct ReportPayload<'a> {
    pub table: &'a FilteredTable,
    pub kpis: &'a Kpis,
    pub period: Option<(NaiveDate, NaiveDate)>,
    pub currency: &'a str,
    pub images: &'a [ChartImage],
}

impl ReportPayload<'_> {
    pub fn summary_lines(&self) -> Vec<String> {
        summary_lines(self.kpis, self.period, self.currency)
    }
}

/// Two decimals with comma thousands separators, e.g. `1,234,567.89`.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let cents = (value.abs() * 100.0).round();
    let whole = (cents / 100.0).trunc() as u64;
    let fraction = (cents % 100.0) as u64;
    let sign = if value < 0.0 && cents > 0.0 { "-" } else { "" };
    format!(
        "{sign}{}.{fraction:02}",
        whole.to_formatted_string(&Locale::en)
    )
}

pub fn summary_lines(
    kpis: &Kpis,
    period: Option<(NaiveDate, NaiveDate)>,
    currency: &str,
) -> Vec<String> {
    let period = match period {
        Some((start, end)) => format!("{start} to {end}"),
        None => NO_DATA.to_string(),
    };
    vec![
        REPORT_TITLE.to_string(),
        format!("Period : {period}"),
        format!(
            "Total revenue : {} {currency}",
            format_amount(kpis.total_revenue)
        ),
        format!(
            "Total margin : {} {currency}",
            format_amount(kpis.total_margin)
        ),
        format!("Contract count : {}", kpis.contract_count),
        format!("Top product : {}", kpis.top_product_label()),
    ]
}

pub fn export(format: ExportFormat, payload: &ReportPayload<'_>) -> Result<Artifact> {
    let bytes = match format {
        ExportFormat::Xlsx => xlsx::write_workbook(payload.table)?,
        ExportFormat::Pdf => pdf::write_pdf(&payload.summary_lines(), payload.images)?,
        ExportFormat::Pptx => pptx::write_deck(&payload.summary_lines(), payload.images)?,
    };
    log::info!(
        "Assembled {} ({} bytes, {} image(s))",
        format.file_name(),
        bytes.len(),
        payload.images.len()
    );
    Ok(Artifact::new(format, bytes))
}
