use anyhow::{Context, Result};
use log::info;

use crate::{cli::PreviewArgs, data::RawTable, ingest, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let path = &args.input.input;
    let raw = ingest::load_table(path, &args.input.load_options())
        .with_context(|| format!("Loading {path:?}"))?;
    let rows = preview_rows(&raw, args.rows);
    table::print_table(raw.headers(), &rows);
    info!(
        "Displayed {} of {} row(s) from {:?}",
        rows.len(),
        raw.row_count(),
        path
    );
    Ok(())
}

/// First `limit` rows rendered as display strings; empty cells stay blank.
pub fn preview_rows(raw: &RawTable, limit: usize) -> Vec<Vec<String>> {
    raw.rows()
        .iter()
        .take(limit)
        .map(|cells| cells.iter().map(ToString::to_string).collect())
        .collect()
}
