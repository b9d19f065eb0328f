//! Best-guess assignment of raw columns to semantic fields.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    catalog::{SemanticField, SynonymCatalog},
    data::normalize_header,
};

/// Outcome of header detection. A field maps to `None` when no alias matched,
/// which is distinct from matching the first column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferredColumns {
    detected: BTreeMap<SemanticField, Option<String>>,
}

impl InferredColumns {
    pub fn get(&self, field: SemanticField) -> Option<&str> {
        self.detected.get(&field).and_then(|c| c.as_deref())
    }

    pub fn unresolved(&self) -> Vec<SemanticField> {
        SemanticField::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved().is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SemanticField, Option<&str>)> + '_ {
        SemanticField::ALL
            .into_iter()
            .map(|field| (field, self.get(field)))
    }
}

/// Returns the first column matching one of `aliases`. Aliases are tried in
/// order and, for each alias, columns are scanned left to right.
pub fn detect_column<'a, S>(aliases: &[S], columns: &'a [String]) -> Option<&'a str>
where
    S: AsRef<str>,
{
    let normalized = columns
        .iter()
        .map(|c| normalize_header(c))
        .collect::<Vec<_>>();
    aliases.iter().find_map(|alias| {
        let alias = normalize_header(alias.as_ref());
        normalized
            .iter()
            .position(|column| *column == alias)
            .map(|idx| columns[idx].as_str())
    })
}

pub fn infer_columns(catalog: &SynonymCatalog, columns: &[String]) -> InferredColumns {
    let detected = SemanticField::ALL
        .into_iter()
        .map(|field| {
            let column = detect_column(catalog.aliases(field), columns).map(str::to_string);
            (field, column)
        })
        .collect();
    InferredColumns { detected }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detection_is_case_and_whitespace_insensitive() {
        let columns = headers(&["  Date Début ", "CA", "Revendeur"]);
        assert_eq!(
            detect_column(&["date", "date début"], &columns),
            Some("  Date Début ")
        );
        assert_eq!(detect_column(&["ca"], &columns), Some("CA"));
    }

    #[test]
    fn alias_priority_beats_column_order() {
        let columns = headers(&["Client", "Distributeur"]);
        assert_eq!(
            detect_column(&["distributeur", "client"], &columns),
            Some("Distributeur")
        );
    }

    #[test]
    fn first_matching_column_wins_for_one_alias() {
        let columns = headers(&["type", "TYPE"]);
        assert_eq!(detect_column(&["type"], &columns), Some("type"));
    }

    #[test]
    fn unmatched_fields_are_reported_as_unresolved() {
        let catalog = SynonymCatalog::builtin();
        let inferred = infer_columns(&catalog, &headers(&["Date", "Revenu", "Produit"]));
        assert_eq!(inferred.get(SemanticField::Date), Some("Date"));
        assert_eq!(inferred.get(SemanticField::Margin), None);
        assert_eq!(
            inferred.unresolved(),
            vec![
                SemanticField::Margin,
                SemanticField::InsurerShare,
                SemanticField::Distributor
            ]
        );
        assert!(!inferred.is_complete());
    }
}
