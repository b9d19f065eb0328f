//! Semantic fields and the header synonym catalog.
//!
//! Every input file is standardized toward the same six [`SemanticField`]s.
//! The [`SynonymCatalog`] lists, per field, the raw header spellings that are
//! recognized automatically, in priority order. The built-in catalog is a
//! constant; YAML catalog files can only append aliases to it.

use std::{collections::BTreeMap, fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, MappingConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    Date,
    Revenue,
    Margin,
    Product,
    InsurerShare,
    Distributor,
}

impl SemanticField {
    pub const ALL: [SemanticField; 6] = [
        SemanticField::Date,
        SemanticField::Revenue,
        SemanticField::Margin,
        SemanticField::Product,
        SemanticField::InsurerShare,
        SemanticField::Distributor,
    ];

    /// Identifier used on the command line and in YAML files.
    pub fn key(self) -> &'static str {
        match self {
            SemanticField::Date => "date",
            SemanticField::Revenue => "revenue",
            SemanticField::Margin => "margin",
            SemanticField::Product => "product",
            SemanticField::InsurerShare => "insurer_share",
            SemanticField::Distributor => "distributor",
        }
    }

    /// Column header used for the field in normalized output.
    pub fn column_name(self) -> &'static str {
        match self {
            SemanticField::Date => "Date",
            SemanticField::Revenue => "Revenue",
            SemanticField::Margin => "Margin",
            SemanticField::Product => "Product",
            SemanticField::InsurerShare => "InsurerShare",
            SemanticField::Distributor => "Distributor",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for SemanticField {
    type Err = MappingConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        let key = match lowered.as_str() {
            "insurer" | "insurershare" | "insurer-share" => "insurer_share",
            other => other,
        };
        SemanticField::ALL
            .into_iter()
            .find(|field| field.key() == key)
            .ok_or_else(|| MappingConfigError::UnknownField(value.to_string()))
    }
}

const BUILTIN_ALIASES: [&[&str]; 6] = [
    &["date", "date début", "date de vente"],
    &["prime total ttc", "revenu", "ca"],
    &["marge", "marge distributeur ttc"],
    &["produit", "device", "type", "categorie"],
    &["part assureur", "part", "taux"],
    &["distributeur", "revendeur", "client", "point de vente"],
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymCatalog {
    aliases: [Vec<String>; 6],
}

impl Default for SynonymCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SynonymCatalog {
    pub fn builtin() -> Self {
        Self {
            aliases: BUILTIN_ALIASES.map(|list| list.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn aliases(&self, field: SemanticField) -> &[String] {
        &self.aliases[field.index()]
    }

    /// Returns a catalog with `extra` aliases appended after the existing ones.
    pub fn extended(&self, extra: &BTreeMap<SemanticField, Vec<String>>) -> Self {
        let mut catalog = self.clone();
        for (field, aliases) in extra {
            let list = &mut catalog.aliases[field.index()];
            for alias in aliases {
                let alias = alias.trim();
                let lowered = alias.to_lowercase();
                if alias.is_empty() || list.iter().any(|a| a.to_lowercase() == lowered) {
                    continue;
                }
                list.push(alias.to_string());
            }
        }
        catalog
    }

    /// Loads a YAML catalog extension and applies it on top of the built-ins.
    pub fn load_extension(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| Error::ingestion(path, err))?;
        let extension: CatalogFile = serde_yaml::from_reader(BufReader::new(file))
            .map_err(|err| Error::ingestion(path, format!("invalid catalog YAML: {err}")))?;
        Ok(Self::builtin().extended(&extension.aliases))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub aliases: BTreeMap<SemanticField, Vec<String>>,
}
