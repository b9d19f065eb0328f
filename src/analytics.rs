//! Optional analytics behind narrow, swappable interfaces.
//!
//! [`Forecaster`] turns a numeric series into a forecast for the next
//! periods, or reports that there is not enough history. [`AnomalyDetector`]
//! picks unusual rows out of a table, returning nothing for tables that are
//! too small. The default implementations are deterministic.

use serde::Serialize;

use crate::{
    breakdown::YearMonth,
    schema::{FilteredTable, NormalizedTable},
};

pub const FORECAST_HORIZON: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ForecastOutcome {
    Forecast(Vec<f64>),
    InsufficientData { required: usize, available: usize },
}

pub trait Forecaster {
    fn forecast(&self, series: &[f64], horizon: usize) -> ForecastOutcome;
}

pub trait AnomalyDetector {
    /// Indices of anomalous rows in ascending order.
    fn detect(&self, table: &FilteredTable) -> Vec<usize>;
}

/// Holt's linear-trend exponential smoothing (additive trend, no season).
/// Smoothing weights are picked from a fixed grid by minimising the
/// one-step-ahead squared error over the history.
#[derive(Debug, Clone)]
pub struct HoltLinear {
    pub min_points: usize,
}

impl Default for HoltLinear {
    fn default() -> Self {
        Self { min_points: 7 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HoltFit {
    alpha: f64,
    beta: f64,
    level: f64,
    trend: f64,
    sse: f64,
}

impl HoltLinear {
    fn fit_with(series: &[f64], alpha: f64, beta: f64) -> HoltFit {
        let mut level = series[0];
        let mut trend = series[1] - series[0];
        let mut sse = 0.0;
        for &observed in &series[1..] {
            let predicted = level + trend;
            sse += (observed - predicted).powi(2);
            let previous_level = level;
            level = alpha * observed + (1.0 - alpha) * (level + trend);
            trend = beta * (level - previous_level) + (1.0 - beta) * trend;
        }
        HoltFit {
            alpha,
            beta,
            level,
            trend,
            sse,
        }
    }

    fn fit(series: &[f64]) -> HoltFit {
        let grid = (1..20).map(|step| step as f64 * 0.05).collect::<Vec<_>>();
        let mut best: Option<HoltFit> = None;
        for &alpha in &grid {
            for &beta in &grid {
                let candidate = Self::fit_with(series, alpha, beta);
                if best.is_none_or(|current| candidate.sse < current.sse) {
                    best = Some(candidate);
                }
            }
        }
        best.unwrap_or_else(|| Self::fit_with(series, 0.5, 0.5))
    }
}

impl Forecaster for HoltLinear {
    fn forecast(&self, series: &[f64], horizon: usize) -> ForecastOutcome {
        let required = self.min_points.max(2);
        if series.len() < required {
            return ForecastOutcome::InsufficientData {
                required,
                available: series.len(),
            };
        }
        let fit = Self::fit(series);
        log::debug!(
            "Holt fit alpha={:.2} beta={:.2} sse={:.3}",
            fit.alpha,
            fit.beta,
            fit.sse
        );
        ForecastOutcome::Forecast(
            (1..=horizon)
                .map(|h| fit.level + h as f64 * fit.trend)
                .collect(),
        )
    }
}

/// Forecasts the months following the last month of `monthly`.
pub fn forecast_months(
    forecaster: &dyn Forecaster,
    monthly: &[(YearMonth, f64)],
    horizon: usize,
) -> Result<Vec<(YearMonth, f64)>, ForecastOutcome> {
    let values = monthly.iter().map(|(_, v)| *v).collect::<Vec<_>>();
    match forecaster.forecast(&values, horizon) {
        ForecastOutcome::Forecast(points) => {
            let mut month = monthly.last().map(|(m, _)| *m);
            Ok(points
                .into_iter()
                .filter_map(|value| {
                    month = month.map(YearMonth::next);
                    month.map(|m| (m, value))
                })
                .collect())
        }
        insufficient => Err(insufficient),
    }
}

/// Flags rows whose revenue and margin sit jointly far from the rest.
/// Each row is scored by its squared standardized distance over both
/// columns (nulls count as zero) and the highest `contamination` share is
/// returned.
#[derive(Debug, Clone)]
pub struct JointOutlierDetector {
    pub min_rows: usize,
    pub contamination: f64,
}

impl Default for JointOutlierDetector {
    fn default() -> Self {
        Self {
            min_rows: 21,
            contamination: 0.05,
        }
    }
}

fn standardize_column(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    values
        .iter()
        .map(|v| {
            if std_dev > f64::EPSILON {
                (v - mean) / std_dev
            } else {
                0.0
            }
        })
        .collect()
}

impl AnomalyDetector for JointOutlierDetector {
    fn detect(&self, table: &FilteredTable) -> Vec<usize> {
        let rows = table.rows();
        if rows.len() < self.min_rows || rows.is_empty() {
            return Vec::new();
        }
        let revenue = standardize_column(
            &rows
                .iter()
                .map(|r| r.revenue.unwrap_or(0.0))
                .collect::<Vec<_>>(),
        );
        let margin = standardize_column(
            &rows
                .iter()
                .map(|r| r.margin.unwrap_or(0.0))
                .collect::<Vec<_>>(),
        );
        let mut scored = revenue
            .iter()
            .zip(&margin)
            .map(|(r, m)| r * r + m * m)
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        let flagged = (rows.len() as f64 * self.contamination).ceil() as usize;
        let mut indices = scored
            .into_iter()
            .take(flagged)
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        indices.sort_unstable();
        indices
    }
}

pub fn anomalous_rows(detector: &dyn AnomalyDetector, table: &FilteredTable) -> FilteredTable {
    let indices = detector.detect(table);
    NormalizedTable::new(
        indices
            .into_iter()
            .filter_map(|idx| table.rows().get(idx).cloned())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NormalizedRow;
    use chrono::NaiveDate;

    #[test]
    fn short_series_reports_insufficient_data() {
        let outcome = HoltLinear::default().forecast(&[1.0, 2.0, 3.0], 3);
        assert_eq!(
            outcome,
            ForecastOutcome::InsufficientData {
                required: 7,
                available: 3
            }
        );
    }

    #[test]
    fn linear_trend_is_extrapolated() {
        let series = (1..=8).map(|v| v as f64 * 10.0).collect::<Vec<_>>();
        let ForecastOutcome::Forecast(points) = HoltLinear::default().forecast(&series, 3) else {
            panic!("expected a forecast");
        };
        assert_eq!(points.len(), 3);
        for (idx, expected) in [90.0, 100.0, 110.0].iter().enumerate() {
            assert!((points[idx] - expected).abs() < 1e-6, "{points:?}");
        }
    }

    #[test]
    fn forecast_months_labels_following_months() {
        let monthly = (0..7)
            .map(|i| {
                (
                    YearMonth {
                        year: 2024,
                        month: 6 + i,
                    },
                    100.0,
                )
            })
            .collect::<Vec<_>>();
        let forecast = forecast_months(&HoltLinear::default(), &monthly, 3).unwrap();
        let labels = forecast.iter().map(|(m, _)| m.to_string()).collect::<Vec<_>>();
        assert_eq!(labels, ["2025-01", "2025-02", "2025-03"]);
        assert!(forecast.iter().all(|(_, v)| (v - 100.0).abs() < 1e-9));
    }

    fn row(revenue: f64, margin: f64) -> NormalizedRow {
        NormalizedRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
            revenue: Some(revenue),
            margin: Some(margin),
            product: "P".to_string(),
            insurer_share: None,
            distributor: "D".to_string(),
        }
    }

    #[test]
    fn detector_flags_the_extreme_row() {
        let mut rows = (0..24)
            .map(|i| row(100.0 + (i % 3) as f64, 10.0 + (i % 2) as f64))
            .collect::<Vec<_>>();
        rows[17] = row(5_000.0, 900.0);
        let table = NormalizedTable::new(rows);
        let detector = JointOutlierDetector::default();
        let flagged = detector.detect(&table);
        assert_eq!(flagged.len(), 2);
        assert!(flagged.contains(&17));
        assert_eq!(anomalous_rows(&detector, &table).len(), 2);
    }

    #[test]
    fn detector_ignores_small_tables() {
        let table = NormalizedTable::new(vec![row(1.0, 1.0), row(1_000.0, 1.0)]);
        assert!(JointOutlierDetector::default().detect(&table).is_empty());
    }

    #[test]
    fn constant_rows_are_never_anomalous() {
        let table = NormalizedTable::new((0..30).map(|_| row(5.0, 1.0)).collect());
        assert!(JointOutlierDetector::default().detect(&table).is_empty());
    }
}
