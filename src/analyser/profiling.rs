use super::semantic;
use super::types::ColumnProfile;
use anyhow::{Context as _, Result};
use polars::prelude::*;

/// First `limit` non-null values of a column, stringified.
pub fn sample_values(col: &Column, limit: usize) -> Vec<String> {
    let series = col.as_materialized_series();
    let head = series.drop_nulls().head(Some(limit));
    match head.cast(&DataType::String) {
        Ok(s_ca) => s_ca
            .str()
            .map(|ca| {
                ca.into_iter()
                    .flatten()
                    .map(|s| s.to_owned())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default(),
        Err(_) => head.iter().map(|v| v.to_string()).collect(),
    }
}

pub fn profile_column(col: &Column, sample_size: usize) -> Result<ColumnProfile> {
    let name = col.name().to_string();
    let series = col.as_materialized_series();
    let row_count = series.len();
    let null_count = series.null_count();

    let null_percentage = if row_count == 0 {
        0.0
    } else {
        (null_count as f64 / row_count as f64) * 100.0
    };

    let unique_count = series
        .drop_nulls()
        .n_unique()
        .with_context(|| format!("Failed to count distinct values in '{name}'"))?;

    // Null counts as one more distinct value here, so repeated nulls are duplicates.
    let duplicate_percentage = if series.dtype() == &DataType::String {
        if row_count == 0 {
            Some(0.0)
        } else {
            let distinct = series
                .n_unique()
                .with_context(|| format!("Failed to count distinct values in '{name}'"))?;
            Some(((row_count - distinct) as f64 / row_count as f64) * 100.0)
        }
    } else {
        None
    };

    let samples = sample_values(col, sample_size);
    let semantic_type = semantic::classify(&name, &samples);

    Ok(ColumnProfile {
        data_type: series.dtype().to_string(),
        semantic_type,
        row_count,
        null_count,
        null_percentage,
        unique_count,
        completeness: 100.0 - null_percentage,
        duplicate_percentage,
        name,
    })
}

/// Profile every column, isolating per-column failures.
///
/// Returns the successful profiles in column order plus one warning per
/// column that could not be profiled.
pub fn profile_columns(df: &DataFrame, sample_size: usize) -> (Vec<ColumnProfile>, Vec<String>) {
    let mut profiles = Vec::with_capacity(df.width());
    let mut warnings = Vec::new();

    for col in df.get_columns() {
        match profile_column(col, sample_size) {
            Ok(profile) => profiles.push(profile),
            Err(e) => {
                tracing::warn!(column = %col.name(), "Profiling failed: {e:#}");
                warnings.push(format!("Profiling failed for column '{}': {e:#}", col.name()));
            }
        }
    }

    (profiles, warnings)
}
