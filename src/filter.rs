use std::collections::BTreeSet;

use chrono::NaiveDate;
use log::debug;

use crate::schema::{FilteredTable, NormalizedRow, NormalizedTable};

/// What the user asked for. Empty category lists mean "everything".
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub products: Vec<String>,
    pub distributors: Vec<String>,
    pub search: Option<String>,
}

/// Fully resolved filter for one recomputation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Inclusive date range. `None` when the data holds no valid dates, in
    /// which case no row is in range.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub products: BTreeSet<String>,
    pub distributors: BTreeSet<String>,
    pub search: Option<String>,
}

impl FilterCriteria {
    /// Whole date range with every product and distributor included.
    pub fn full_range(table: &NormalizedTable) -> Self {
        Self {
            date_range: table.date_bounds(),
            products: table.products().into_iter().map(str::to_string).collect(),
            distributors: table
                .distributors()
                .into_iter()
                .map(str::to_string)
                .collect(),
            search: None,
        }
    }

    /// Resolves a user selection against the data. Explicit bounds are
    /// clamped into the data's own min/max date.
    pub fn resolve(table: &NormalizedTable, selection: &FilterSelection) -> Self {
        let mut criteria = Self::full_range(table);
        criteria.date_range = criteria.date_range.map(|(min, max)| {
            let start = selection.start.map_or(min, |d| d.clamp(min, max));
            let end = selection.end.map_or(max, |d| d.clamp(min, max));
            (start, end)
        });
        if !selection.products.is_empty() {
            criteria.products = selection.products.iter().cloned().collect();
        }
        if !selection.distributors.is_empty() {
            criteria.distributors = selection.distributors.iter().cloned().collect();
        }
        criteria.search = selection
            .search
            .clone()
            .filter(|term| !term.is_empty());
        criteria
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.date_range.map(|(start, _)| start)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.date_range.map(|(_, end)| end)
    }
}

/// Product and distributor sets actually used for a pass. A non-empty
/// search term replaces both explicit selections with substring matches.
pub fn effective_categories(
    table: &NormalizedTable,
    criteria: &FilterCriteria,
) -> (BTreeSet<String>, BTreeSet<String>) {
    match criteria.search.as_deref().filter(|term| !term.is_empty()) {
        Some(term) => {
            let needle = term.to_lowercase();
            let matching = |names: Vec<&str>| {
                names
                    .into_iter()
                    .filter(|name| name.to_lowercase().contains(&needle))
                    .map(str::to_string)
                    .collect::<BTreeSet<_>>()
            };
            (
                matching(table.products()),
                matching(table.distributors()),
            )
        }
        None => (criteria.products.clone(), criteria.distributors.clone()),
    }
}

pub fn apply_filters(table: &NormalizedTable, criteria: &FilterCriteria) -> FilteredTable {
    let (products, distributors) = effective_categories(table, criteria);
    let filtered = table.filter(|row| {
        in_date_range(row, criteria.date_range)
            && products.contains(&row.product)
            && distributors.contains(&row.distributor)
    });
    debug!(
        "Filter kept {} of {} row(s) ({} product(s), {} distributor(s))",
        filtered.len(),
        table.len(),
        products.len(),
        distributors.len()
    );
    filtered
}

fn in_date_range(row: &NormalizedRow, range: Option<(NaiveDate, NaiveDate)>) -> bool {
    match (row.date, range) {
        (Some(date), Some((start, end))) => start <= date && date <= end,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: Option<(i32, u32, u32)>, product: &str, distributor: &str) -> NormalizedRow {
        NormalizedRow {
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            revenue: Some(1.0),
            margin: Some(0.1),
            product: product.to_string(),
            insurer_share: None,
            distributor: distributor.to_string(),
        }
    }

    fn sample() -> NormalizedTable {
        NormalizedTable::new(vec![
            row(Some((2024, 1, 5)), "A", "North Mall"),
            row(Some((2024, 1, 6)), "B", "South Shop"),
            row(Some((2024, 1, 7)), "C", "Kiosk"),
            row(None, "A", "Kiosk"),
        ])
    }

    #[test]
    fn null_dates_are_always_out_of_range() {
        let table = sample();
        let filtered = apply_filters(&table, &FilterCriteria::full_range(&table));
        assert_eq!(filtered.len(), 3);
        assert!(filtered.rows().iter().all(|r| r.date.is_some()));
    }

    #[test]
    fn search_term_replaces_explicit_selection() {
        let table = sample();
        let selection = FilterSelection {
            products: vec!["B".into(), "C".into()],
            search: Some("a".into()),
            ..Default::default()
        };
        let criteria = FilterCriteria::resolve(&table, &selection);
        let (products, distributors) = effective_categories(&table, &criteria);
        assert_eq!(products, BTreeSet::from(["A".to_string()]));
        assert_eq!(distributors, BTreeSet::from(["North Mall".to_string()]));
        let filtered = apply_filters(&table, &criteria);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows()[0].product, "A");
    }

    #[test]
    fn empty_search_term_is_ignored() {
        let table = sample();
        let selection = FilterSelection {
            search: Some(String::new()),
            ..Default::default()
        };
        let criteria = FilterCriteria::resolve(&table, &selection);
        assert_eq!(criteria.search, None);
        assert_eq!(apply_filters(&table, &criteria).len(), 3);
    }

    #[test]
    fn search_term_whitespace_is_matched_literally() {
        let table = sample();
        let selection = FilterSelection {
            search: Some(" mall".into()),
            ..Default::default()
        };
        let criteria = FilterCriteria::resolve(&table, &selection);
        let (products, distributors) = effective_categories(&table, &criteria);
        assert!(products.is_empty());
        assert_eq!(distributors, BTreeSet::from(["North Mall".to_string()]));

        let blank = FilterSelection {
            search: Some("  ".into()),
            ..Default::default()
        };
        let criteria = FilterCriteria::resolve(&table, &blank);
        assert_eq!(criteria.search.as_deref(), Some("  "));
        assert!(apply_filters(&table, &criteria).is_empty());
    }

    #[test]
    fn explicit_bounds_are_clamped_to_the_data() {
        let table = sample();
        let selection = FilterSelection {
            start: NaiveDate::from_ymd_opt(2023, 1, 1),
            end: NaiveDate::from_ymd_opt(2024, 1, 6),
            ..Default::default()
        };
        let criteria = FilterCriteria::resolve(&table, &selection);
        assert_eq!(criteria.start(), NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(criteria.end(), NaiveDate::from_ymd_opt(2024, 1, 6));
        assert_eq!(apply_filters(&table, &criteria).len(), 2);
    }

    #[test]
    fn category_filters_use_exact_membership() {
        let table = sample();
        let selection = FilterSelection {
            distributors: vec!["Shop".into(), "Kiosk".into()],
            ..Default::default()
        };
        let filtered = apply_filters(&table, &FilterCriteria::resolve(&table, &selection));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows()[0].product, "C");
    }

    #[test]
    fn inverted_range_yields_empty_table() {
        let table = sample();
        let selection = FilterSelection {
            start: NaiveDate::from_ymd_opt(2024, 1, 7),
            end: NaiveDate::from_ymd_opt(2024, 1, 5),
            ..Default::default()
        };
        assert!(apply_filters(&table, &FilterCriteria::resolve(&table, &selection)).is_empty());
    }
}
