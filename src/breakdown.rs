//! Grouped revenue aggregates: per day, per month, per product, per
//! distributor, and the product × distributor pivot.
//!
//! Group sums skip null revenue, so a group whose revenues are all null
//! totals zero. Rankings use a stable descending sort, which keeps ties in
//! first-encountered order.

use std::{collections::BTreeMap, fmt};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::schema::{FilteredTable, NormalizedRow};

pub const TOP_PRODUCTS: usize = 10;
pub const TOP_DISTRIBUTORS: usize = 5;

/// Calendar month key, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Sums revenue per key, keeping keys in first-encountered order.
pub fn group_revenue<F>(rows: &[NormalizedRow], key: F) -> Vec<(String, f64)>
where
    F: Fn(&NormalizedRow) -> &str,
{
    let mut order: Vec<(String, f64)> = Vec::new();
    let mut positions: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        let name = key(row);
        let slot = *positions.entry(name).or_insert_with(|| {
            order.push((name.to_string(), 0.0));
            order.len() - 1
        });
        order[slot].1 += row.revenue.unwrap_or(0.0);
    }
    order
}

/// Stable descending sort by value.
pub fn ranked(mut series: Vec<(String, f64)>) -> Vec<(String, f64)> {
    series.sort_by(|a, b| b.1.total_cmp(&a.1));
    series
}

pub fn revenue_by_product(table: &FilteredTable) -> Vec<(String, f64)> {
    group_revenue(table.rows(), |row| row.product.as_str())
}

pub fn revenue_by_distributor(table: &FilteredTable) -> Vec<(String, f64)> {
    group_revenue(table.rows(), |row| row.distributor.as_str())
}

pub fn top_products(table: &FilteredTable, n: usize) -> Vec<(String, f64)> {
    let mut ranked = ranked(revenue_by_product(table));
    ranked.truncate(n);
    ranked
}

pub fn daily_revenue(table: &FilteredTable) -> Vec<(NaiveDate, f64)> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in table.rows() {
        if let Some(date) = row.date {
            *days.entry(date).or_insert(0.0) += row.revenue.unwrap_or(0.0);
        }
    }
    days.into_iter().collect()
}

pub fn monthly_revenue(table: &FilteredTable) -> Vec<(YearMonth, f64)> {
    let mut months: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for row in table.rows() {
        if let Some(date) = row.date {
            *months.entry(YearMonth::of(date)).or_insert(0.0) += row.revenue.unwrap_or(0.0);
        }
    }
    months.into_iter().collect()
}

/// Non-null margins per product, products in first-encountered order.
pub fn margins_by_product(table: &FilteredTable) -> Vec<(String, Vec<f64>)> {
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
    for row in table.rows() {
        let slot = match groups.iter().position(|(name, _)| *name == row.product) {
            Some(slot) => slot,
            None => {
                groups.push((row.product.clone(), Vec::new()));
                groups.len() - 1
            }
        };
        if let Some(margin) = row.margin {
            groups[slot].1.push(margin);
        }
    }
    groups
}

/// Revenue per product (rows) and distributor (columns). Every combination
/// of names present in the table has a cell; empty combinations hold zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pivot {
    pub products: Vec<String>,
    pub distributors: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl Pivot {
    pub fn compute(table: &FilteredTable) -> Self {
        let mut products = table
            .products()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let mut distributors = table
            .distributors()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        products.sort();
        distributors.sort();

        let mut values = vec![vec![0.0; distributors.len()]; products.len()];
        for row in table.rows() {
            let (Ok(p), Ok(d)) = (
                products.binary_search(&row.product),
                distributors.binary_search(&row.distributor),
            ) else {
                continue;
            };
            values[p][d] += row.revenue.unwrap_or(0.0);
        }
        Self {
            products,
            distributors,
            values,
        }
    }

    pub fn get(&self, product: &str, distributor: &str) -> Option<f64> {
        let p = self.products.iter().position(|name| name == product)?;
        let d = self.distributors.iter().position(|name| name == distributor)?;
        Some(self.values[p][d])
    }

    pub fn max_value(&self) -> f64 {
        self.values
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty() || self.distributors.is_empty()
    }
}

/// Every grouped series shown to the user or embedded in reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdown {
    pub daily: Vec<(NaiveDate, f64)>,
    pub monthly: Vec<(YearMonth, f64)>,
    pub by_product: Vec<(String, f64)>,
    pub top_products: Vec<(String, f64)>,
    pub by_distributor: Vec<(String, f64)>,
    pub top_distributors: Vec<(String, f64)>,
    pub margins_by_product: Vec<(String, Vec<f64>)>,
    pub pivot: Pivot,
}

impl Breakdown {
    pub fn compute(table: &FilteredTable) -> Self {
        let by_product = revenue_by_product(table);
        let by_distributor = ranked(revenue_by_distributor(table));
        let mut top_products = ranked(by_product.clone());
        top_products.truncate(TOP_PRODUCTS);
        let top_distributors = by_distributor
            .iter()
            .take(TOP_DISTRIBUTORS)
            .cloned()
            .collect();
        Self {
            daily: daily_revenue(table),
            monthly: monthly_revenue(table),
            by_product,
            top_products,
            by_distributor,
            top_distributors,
            margins_by_product: margins_by_product(table),
            pivot: Pivot::compute(table),
        }
    }
}
