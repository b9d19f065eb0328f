//! Error taxonomy shared by every stage of the analysis pipeline.
//!
//! Ingestion and mapping failures abort a run before any aggregation happens.
//! Export and chart failures are scoped to the action that raised them.
//! Values that fail to coerce are not errors at all: they become null cells.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::catalog::SemanticField;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read {path:?}: {message}")]
    Ingestion { path: PathBuf, message: String },

    #[error(transparent)]
    MappingConfig(#[from] MappingConfigError),

    #[error("Export to {format} failed: {message}")]
    Export {
        format: &'static str,
        message: String,
    },

    #[error("Rendering chart '{chart}' failed: {message}")]
    Chart { chart: String, message: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingConfigError {
    #[error("Column '{column}' mapped to {field} does not exist in the input")]
    MissingColumn { field: SemanticField, column: String },

    #[error("No column could be detected for {field}; confirm it with --map {key}=<column>")]
    Unresolved {
        field: SemanticField,
        key: &'static str,
    },

    #[error("Unknown semantic field '{0}'")]
    UnknownField(String),

    #[error("Invalid mapping override '{0}' (expected field=column)")]
    InvalidOverride(String),

    #[error("Input has no columns to map")]
    NoColumns,
}

impl Error {
    pub fn ingestion(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Ingestion {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn export(format: &'static str, message: impl ToString) -> Self {
        Error::Export {
            format,
            message: message.to_string(),
        }
    }

    pub fn chart(chart: impl Into<String>, message: impl ToString) -> Self {
        Error::Chart {
            chart: chart.into(),
            message: message.to_string(),
        }
    }
}
