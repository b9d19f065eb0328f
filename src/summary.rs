use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    analytics::ForecastOutcome,
    cli::SummaryArgs,
    data::format_number,
    pipeline::Analysis,
    report::{format_amount, summary_lines},
    schema::{NormalizedRow, NormalizedTable},
    stats::Kpis,
    table,
};

#[derive(Debug, Serialize)]
pub struct SummaryDocument<'a> {
    pub currency: &'a str,
    pub start: Option<String>,
    pub end: Option<String>,
    pub kpis: &'a Kpis,
    pub top_distributors: Vec<NamedAmount>,
    pub monthly_revenue: Vec<NamedAmount>,
    /// Empty when there was too little history to forecast.
    pub forecast: Vec<NamedAmount>,
    pub anomalies: &'a [NormalizedRow],
}

#[derive(Debug, Serialize, PartialEq)]
pub struct NamedAmount {
    pub label: String,
    pub value: f64,
}

impl<'a> SummaryDocument<'a> {
    pub fn new(analysis: &'a Analysis, currency: &'a str) -> Self {
        let named = |label: String, value: f64| NamedAmount { label, value };
        Self {
            currency,
            start: analysis.criteria.start().map(|d| d.to_string()),
            end: analysis.criteria.end().map(|d| d.to_string()),
            kpis: &analysis.kpis,
            top_distributors: analysis
                .breakdown
                .top_distributors
                .iter()
                .map(|(name, value)| named(name.clone(), *value))
                .collect(),
            monthly_revenue: analysis
                .breakdown
                .monthly
                .iter()
                .map(|(month, value)| named(month.to_string(), *value))
                .collect(),
            forecast: analysis
                .forecast_points()
                .unwrap_or_default()
                .iter()
                .map(|(month, value)| named(month.to_string(), *value))
                .collect(),
            anomalies: analysis.anomalies.rows(),
        }
    }
}

pub fn execute(args: &SummaryArgs) -> Result<()> {
    let analysis = crate::prepare_analysis(&args.input, &args.mapping, &args.filter)?;
    if args.json {
        let document = SummaryDocument::new(&analysis, &args.currency);
        let json = serde_json::to_string_pretty(&document).context("Serializing summary")?;
        println!("{json}");
    } else {
        print!("{}", render_text(&analysis, &args.currency));
    }
    Ok(())
}

fn amount_rows(series: &[(String, f64)]) -> Vec<Vec<String>> {
    series
        .iter()
        .map(|(label, value)| vec![label.clone(), format_amount(*value)])
        .collect()
}

fn optional(value: Option<f64>) -> String {
    value.map(format_amount).unwrap_or_else(|| "-".to_string())
}

pub fn render_text(analysis: &Analysis, currency: &str) -> String {
    let kpis = &analysis.kpis;
    let mut out = String::new();
    for line in summary_lines(kpis, analysis.criteria.date_range, currency) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');

    let averages = vec![
        vec!["Mean revenue".to_string(), optional(kpis.mean_revenue)],
        vec!["Mean margin".to_string(), optional(kpis.mean_margin)],
        vec![
            "Days covered".to_string(),
            kpis.day_span.map_or_else(|| "-".to_string(), |d| d.to_string()),
        ],
    ];
    out.push_str(&table::render_table(&["Metric", "Value"], &averages));

    out.push_str("\nTop distributors\n");
    out.push_str(&table::render_table(
        &["Distributor", "Revenue"],
        &amount_rows(&analysis.breakdown.top_distributors),
    ));

    let monthly = analysis
        .breakdown
        .monthly
        .iter()
        .map(|(month, value)| (month.to_string(), *value))
        .collect::<Vec<_>>();
    out.push_str("\nMonthly revenue\n");
    out.push_str(&table::render_table(&["Month", "Revenue"], &amount_rows(&monthly)));

    out.push_str("\nForecast\n");
    match &analysis.forecast {
        Ok(points) => {
            let points = points
                .iter()
                .map(|(month, value)| (month.to_string(), *value))
                .collect::<Vec<_>>();
            out.push_str(&table::render_table(&["Month", "Revenue"], &amount_rows(&points)));
        }
        Err(ForecastOutcome::InsufficientData { required, available }) => {
            out.push_str(&format!(
                "Not enough history: {available} month(s), {required} required\n"
            ));
        }
        Err(ForecastOutcome::Forecast(_)) => {}
    }

    out.push_str("\nAnomalies\n");
    if analysis.anomalies.is_empty() {
        out.push_str("None detected\n");
    } else {
        out.push_str(&anomaly_table(&analysis.anomalies));
    }
    out
}

fn anomaly_table(rows: &NormalizedTable) -> String {
    let cell = |value: Option<f64>| value.map(format_number).unwrap_or_default();
    let body = rows
        .rows()
        .iter()
        .map(|row| {
            vec![
                row.date.map(|d| d.to_string()).unwrap_or_default(),
                cell(row.revenue),
                cell(row.margin),
                row.product.clone(),
                cell(row.insurer_share),
                row.distributor.clone(),
            ]
        })
        .collect::<Vec<_>>();
    table::render_table(&NormalizedTable::headers(), &body)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{filter::FilterSelection, pipeline::Analyzer};

    fn analysis() -> Analysis {
        let row = |day: u32, revenue: f64, product: &str, distributor: &str| NormalizedRow {
            date: NaiveDate::from_ymd_opt(2024, 1, day),
            revenue: Some(revenue),
            margin: Some(revenue / 10.0),
            product: product.to_string(),
            insurer_share: None,
            distributor: distributor.to_string(),
        };
        let table = NormalizedTable::new(vec![
            row(5, 100.0, "X", "North"),
            row(6, 2_000.0, "Y", "South"),
        ]);
        Analyzer::default().run(&table, &FilterSelection::default())
    }

    #[test]
    fn text_summary_lists_every_section() {
        let text = render_text(&analysis(), "TND");
        assert!(text.starts_with("Sales Report\nPeriod : 2024-01-05 to 2024-01-06\n"));
        assert!(text.contains("Total revenue : 2,100.00 TND"));
        assert!(text.contains("Top distributors"));
        assert!(text.contains("Not enough history: 1 month(s), 7 required"));
        assert!(text.contains("None detected"));
    }

    #[test]
    fn json_document_carries_ranked_distributors() {
        let analysis = analysis();
        let document = SummaryDocument::new(&analysis, "EUR");
        assert_eq!(
            document.top_distributors[0],
            NamedAmount {
                label: "South".into(),
                value: 2_000.0
            }
        );
        assert!(document.forecast.is_empty());
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["kpis"]["contract_count"], 2);
        assert_eq!(json["monthly_revenue"][0]["label"], "2024-01");
    }
}
