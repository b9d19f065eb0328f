//! Column mapping and schema standardization.
//!
//! This module owns the [`ColumnMapping`] (semantic field → raw column name),
//! its YAML persistence, and [`standardize`], which turns a [`RawTable`] into
//! the strongly typed [`NormalizedTable`] every later stage works on.
//!
//! ## Responsibilities
//!
//! - Completing an inference result with placeholder columns
//! - Applying `field=column` overrides and saved mapping files
//! - Validating that every mapped column exists
//! - Coercing dates (day-first), numbers, and text; bad values become nulls

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    io::BufReader,
    path::Path,
};

use chrono::NaiveDate;
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::SemanticField,
    data::{RawTable, coerce_date, coerce_number},
    error::{Error, MappingConfigError, Result},
    inference::InferredColumns,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: BTreeMap<SemanticField, String>,
    placeholders: BTreeSet<SemanticField>,
}

impl ColumnMapping {
    /// Completes an inference result. Unresolved fields fall back to the
    /// first raw column and are recorded as placeholders awaiting
    /// confirmation.
    pub fn with_placeholders(
        inferred: &InferredColumns,
        headers: &[String],
    ) -> Result<Self, MappingConfigError> {
        let first = headers.first().ok_or(MappingConfigError::NoColumns)?;
        let mut columns = BTreeMap::new();
        let mut placeholders = BTreeSet::new();
        for (field, detected) in inferred.iter() {
            match detected {
                Some(column) => {
                    columns.insert(field, column.to_string());
                }
                None => {
                    columns.insert(field, first.clone());
                    placeholders.insert(field);
                }
            }
        }
        Ok(Self {
            columns,
            placeholders,
        })
    }

    pub fn column(&self, field: SemanticField) -> &str {
        self.columns
            .get(&field)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn placeholders(&self) -> impl Iterator<Item = SemanticField> + '_ {
        self.placeholders.iter().copied()
    }

    pub fn is_placeholder(&self, field: SemanticField) -> bool {
        self.placeholders.contains(&field)
    }

    /// Confirms `field` as mapped to `column`.
    pub fn set(&mut self, field: SemanticField, column: impl Into<String>) {
        self.columns.insert(field, column.into());
        self.placeholders.remove(&field);
    }

    pub fn apply_file(&mut self, file: &MappingFile) {
        for (field, column) in &file.columns {
            self.set(*field, column.clone());
        }
    }

    /// Applies `field=column` overrides given on the command line.
    pub fn apply_overrides(&mut self, overrides: &[String]) -> Result<(), MappingConfigError> {
        for raw in overrides {
            let (field, column) = raw
                .split_once('=')
                .filter(|(field, column)| !field.trim().is_empty() && !column.trim().is_empty())
                .ok_or_else(|| MappingConfigError::InvalidOverride(raw.clone()))?;
            let field = field.parse::<SemanticField>()?;
            self.set(field, column.trim());
        }
        Ok(())
    }

    /// Fails on the first field that still holds a placeholder column.
    pub fn require_confirmed(&self) -> Result<(), MappingConfigError> {
        match self.placeholders.first() {
            Some(field) => Err(MappingConfigError::Unresolved {
                field: *field,
                key: field.key(),
            }),
            None => Ok(()),
        }
    }

    /// Confirmed columns only. Placeholders are left out so a saved file
    /// never confirms them on a later run.
    pub fn to_file(&self) -> MappingFile {
        MappingFile {
            columns: self
                .columns
                .iter()
                .filter(|(field, _)| !self.is_placeholder(**field))
                .map(|(field, column)| (*field, column.clone()))
                .collect(),
        }
    }
}

/// On-disk form of a confirmed mapping. Partial files are allowed; missing
/// fields keep their detected column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingFile {
    #[serde(default)]
    pub columns: BTreeMap<SemanticField, String>,
}

impl MappingFile {
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|err| Error::export("mapping", format!("serializing YAML: {err}")))?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| Error::ingestion(path, err))?;
        serde_yaml::from_reader(BufReader::new(file))
            .map_err(|err| Error::ingestion(path, format!("invalid mapping YAML: {err}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub date: Option<NaiveDate>,
    pub revenue: Option<f64>,
    pub margin: Option<f64>,
    pub product: String,
    pub insurer_share: Option<f64>,
    pub distributor: String,
}

/// Rows restricted to the six semantic columns with coerced types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    rows: Vec<NormalizedRow>,
}

/// A [`NormalizedTable`] after filtering. Same shape, fewer rows.
pub type FilteredTable = NormalizedTable;

impl NormalizedTable {
    pub fn new(rows: Vec<NormalizedRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers() -> [&'static str; 6] {
        SemanticField::ALL.map(SemanticField::column_name)
    }

    /// Earliest and latest non-null dates.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.rows
            .iter()
            .filter_map(|row| row.date)
            .minmax()
            .into_option()
    }

    /// Distinct product names in first-seen order.
    pub fn products(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.product.as_str())
            .unique()
            .collect()
    }

    /// Distinct distributor names in first-seen order.
    pub fn distributors(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.distributor.as_str())
            .unique()
            .collect()
    }

    pub fn filter<P>(&self, predicate: P) -> FilteredTable
    where
        P: Fn(&NormalizedRow) -> bool,
    {
        Self {
            rows: self.rows.iter().filter(|row| predicate(row)).cloned().collect(),
        }
    }
}

/// Standardizes `raw` through `mapping`. Every mapped column must exist.
pub fn standardize(raw: &RawTable, mapping: &ColumnMapping) -> Result<NormalizedTable> {
    let mut indices = [0usize; 6];
    for (slot, field) in SemanticField::ALL.into_iter().enumerate() {
        let column = mapping.column(field);
        indices[slot] =
            raw.column_index(column)
                .ok_or_else(|| MappingConfigError::MissingColumn {
                    field,
                    column: column.to_string(),
                })?;
        debug!("Mapped {field} <- '{column}'");
    }
    let [date, revenue, margin, product, insurer_share, distributor] = indices;

    let rows = raw
        .rows()
        .iter()
        .map(|cells| NormalizedRow {
            date: coerce_date(&cells[date]),
            revenue: coerce_number(&cells[revenue]),
            margin: coerce_number(&cells[margin]),
            product: cells[product].as_text(),
            insurer_share: coerce_number(&cells[insurer_share]),
            distributor: cells[distributor].as_text(),
        })
        .collect::<Vec<_>>();

    report_coercions(raw, &indices, &rows);
    Ok(NormalizedTable { rows })
}

fn report_coercions(raw: &RawTable, indices: &[usize; 6], rows: &[NormalizedRow]) {
    let coerced: [(SemanticField, usize); 4] = [
        (
            SemanticField::Date,
            rows.iter().filter(|r| r.date.is_none()).count(),
        ),
        (
            SemanticField::Revenue,
            rows.iter().filter(|r| r.revenue.is_none()).count(),
        ),
        (
            SemanticField::Margin,
            rows.iter().filter(|r| r.margin.is_none()).count(),
        ),
        (
            SemanticField::InsurerShare,
            rows.iter().filter(|r| r.insurer_share.is_none()).count(),
        ),
    ];
    for (field, nulls) in coerced {
        let slot = field as usize;
        let blanks = raw.column(indices[slot]).filter(|c| c.is_empty()).count();
        let invalid = nulls.saturating_sub(blanks);
        if invalid > 0 {
            warn!("{invalid} value(s) in {field} could not be parsed and were set to null");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::SynonymCatalog, data::RawCell, inference::infer_columns};

    fn text(value: &str) -> RawCell {
        RawCell::Text(value.to_string())
    }

    fn sample_raw() -> RawTable {
        RawTable::new(
            ["date", "ca", "marge", "produit", "part", "client"]
                .map(String::from)
                .to_vec(),
            vec![
                vec![
                    text("05/01/2024"),
                    text("100"),
                    text("10"),
                    text("X"),
                    text("0.3"),
                    text("D1"),
                ],
                vec![
                    text("not a date"),
                    text("abc"),
                    RawCell::Empty,
                    RawCell::Number(7.0),
                    text(""),
                    RawCell::Empty,
                ],
            ],
        )
    }

    fn sample_mapping(raw: &RawTable) -> ColumnMapping {
        let inferred = infer_columns(&SynonymCatalog::builtin(), raw.headers());
        ColumnMapping::with_placeholders(&inferred, raw.headers()).unwrap()
    }

    #[test]
    fn standardize_coerces_types_and_keeps_bad_rows() {
        let raw = sample_raw();
        let table = standardize(&raw, &sample_mapping(&raw)).unwrap();
        assert_eq!(table.len(), 2);

        let first = &table.rows()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(first.revenue, Some(100.0));
        assert_eq!(first.insurer_share, Some(0.3));

        let second = &table.rows()[1];
        assert_eq!(second.date, None);
        assert_eq!(second.revenue, None);
        assert_eq!(second.margin, None);
        assert_eq!(second.product, "7");
        assert_eq!(second.distributor, "nan");
    }

    #[test]
    fn standardize_rejects_absent_columns() {
        let raw = sample_raw();
        let mut mapping = sample_mapping(&raw);
        mapping.set(SemanticField::Margin, "Marge HT");
        let err = standardize(&raw, &mapping).unwrap_err();
        assert!(matches!(
            err,
            Error::MappingConfig(MappingConfigError::MissingColumn {
                field: SemanticField::Margin,
                ..
            })
        ));
    }

    #[test]
    fn placeholders_use_first_column_until_confirmed() {
        let headers = ["Jour", "ca"].map(String::from).to_vec();
        let inferred = infer_columns(&SynonymCatalog::builtin(), &headers);
        let mut mapping = ColumnMapping::with_placeholders(&inferred, &headers).unwrap();
        assert_eq!(mapping.column(SemanticField::Date), "Jour");
        assert!(mapping.is_placeholder(SemanticField::Date));
        assert!(!mapping.is_placeholder(SemanticField::Revenue));
        assert!(matches!(
            mapping.require_confirmed(),
            Err(MappingConfigError::Unresolved {
                field: SemanticField::Date,
                ..
            })
        ));

        mapping
            .apply_overrides(&[
                "date=Jour".to_string(),
                "margin= ca".to_string(),
                "product=ca".to_string(),
                "insurer_share=ca".to_string(),
                "distributor=Jour".to_string(),
            ])
            .unwrap();
        assert!(mapping.require_confirmed().is_ok());
        assert_eq!(mapping.column(SemanticField::Margin), "ca");
    }

    #[test]
    fn malformed_overrides_are_rejected() {
        let headers = ["a"].map(String::from).to_vec();
        let inferred = infer_columns(&SynonymCatalog::builtin(), &headers);
        let mut mapping = ColumnMapping::with_placeholders(&inferred, &headers).unwrap();
        assert_eq!(
            mapping.apply_overrides(&["revenue".to_string()]),
            Err(MappingConfigError::InvalidOverride("revenue".to_string()))
        );
        assert_eq!(
            mapping.apply_overrides(&["volume=a".to_string()]),
            Err(MappingConfigError::UnknownField("volume".to_string()))
        );
    }

    #[test]
    fn saved_mapping_leaves_out_placeholders() {
        let headers = ["Jour", "ca"].map(String::from).to_vec();
        let inferred = infer_columns(&SynonymCatalog::builtin(), &headers);
        let mut mapping = ColumnMapping::with_placeholders(&inferred, &headers).unwrap();
        assert_eq!(
            mapping.to_file().columns.into_iter().collect::<Vec<_>>(),
            [(SemanticField::Revenue, "ca".to_string())]
        );
        mapping.set(SemanticField::Date, "Jour");
        assert_eq!(mapping.to_file().columns[&SemanticField::Date], "Jour");
    }

    #[test]
    fn mapping_file_round_trips_through_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.yml");
        let raw = sample_raw();
        let file = sample_mapping(&raw).to_file();
        file.save(&path).unwrap();
        let loaded = MappingFile::load(&path).unwrap();
        assert_eq!(loaded, file);
        assert_eq!(loaded.columns[&SemanticField::Distributor], "client");
    }

    #[test]
    fn distinct_names_keep_first_seen_order() {
        let row = |product: &str, distributor: &str| NormalizedRow {
            date: None,
            revenue: None,
            margin: None,
            product: product.to_string(),
            insurer_share: None,
            distributor: distributor.to_string(),
        };
        let table = NormalizedTable::new(vec![row("B", "D2"), row("A", "D1"), row("B", "D1")]);
        assert_eq!(table.products(), ["B", "A"]);
        assert_eq!(table.distributors(), ["D2", "D1"]);
        assert_eq!(table.date_bounds(), None);
    }
}
