use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    breakdown::{ranked, revenue_by_product},
    schema::FilteredTable,
};

/// Shown wherever a KPI has no value, such as the top product of an empty
/// selection.
pub const NO_DATA: &str = "no data";

/// Scalar KPIs. Means and date-derived values are `None` when undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_revenue: f64,
    pub total_margin: f64,
    pub mean_revenue: Option<f64>,
    pub mean_margin: Option<f64>,
    pub contract_count: usize,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
    pub day_span: Option<i64>,
    pub top_product: Option<String>,
}

impl Kpis {
    pub fn compute(table: &FilteredTable) -> Self {
        let mut revenue = ColumnStats::default();
        let mut margin = ColumnStats::default();
        for row in table.rows() {
            revenue.add(row.revenue);
            margin.add(row.margin);
        }
        let bounds = table.date_bounds();
        let top_product = ranked(revenue_by_product(table))
            .into_iter()
            .next()
            .map(|(name, _)| name);
        Self {
            total_revenue: revenue.sum,
            total_margin: margin.sum,
            mean_revenue: revenue.mean(),
            mean_margin: margin.mean(),
            contract_count: table.len(),
            earliest: bounds.map(|(min, _)| min),
            latest: bounds.map(|(_, max)| max),
            day_span: bounds.map(|(min, max)| (max - min).num_days() + 1),
            top_product,
        }
    }

    pub fn top_product_label(&self) -> &str {
        self.top_product.as_deref().unwrap_or(NO_DATA)
    }
}

#[derive(Debug, Default)]
struct ColumnStats {
    sum: f64,
    count: usize,
}

impl ColumnStats {
    fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.sum / self.count as f64)
        } else {
            None
        }
    }
}
