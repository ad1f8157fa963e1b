use crate::error::{PipesmithError, Result, ResultExt as _};
use polars::prelude::*;
use std::path::Path;

/// Formats [`load_dataset`] accepts, by lowercase extension.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "json"];

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load a `.csv` (header row) or `.json` (array of records) file.
pub fn load_dataset(path: &Path) -> Result<DataFrame> {
    let ext = extension(path);

    let df = match ext.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(Some(10000))
            .with_has_header(true)
            .finish()
            .and_then(|lf| lf.collect())
            .with_context(|| format!("Failed to read CSV {}", path.display()))?,
        "json" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            JsonReader::new(file)
                .finish()
                .with_context(|| format!("Failed to read JSON {}", path.display()))?
        }
        _ => {
            return Err(PipesmithError::UnsupportedSourceFormat(
                path.display().to_string(),
            ));
        }
    };

    tracing::info!(
        rows = df.height(),
        columns = df.width(),
        "Loaded dataset {}",
        path.display()
    );
    Ok(df)
}

/// Write a dataframe as CSV with a header row.
pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .context("Failed to write CSV file")?;
    Ok(())
}
