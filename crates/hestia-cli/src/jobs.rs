use std::path::Path;

use anyhow::{Context, Result};
use hestia_core::models::ListingRequest;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JobRow {
    identifier: String,
    #[serde(default)]
    destination_id: Option<String>,
}

/// Load batch jobs from a CSV file with an `identifier,destination_id` header.
///
/// `destination_id` may be missing or empty. Rows with a blank identifier
/// and `#` comment lines are skipped.
pub fn load_jobs(path: &Path) -> Result<Vec<ListingRequest>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("Failed to open job file: {}", path.display()))?;

    let mut jobs = Vec::new();
    for (line, row) in reader.deserialize::<JobRow>().enumerate() {
        let row = row.with_context(|| format!("Invalid job row {} in {}", line + 1, path.display()))?;
        if row.identifier.is_empty() {
            tracing::warn!(row = line + 1, "Skipping job row without identifier");
            continue;
        }
        jobs.push(ListingRequest::new(row.identifier, row.destination_id));
    }
    Ok(jobs)
}
