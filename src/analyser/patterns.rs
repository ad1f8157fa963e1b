//! Row clustering over the numeric projection of a dataset.

use super::types::{ClusterReport, DegradedReason};
use linfa::DatasetBase;
use linfa::traits::{Fit as _, Predict as _};
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::SeedableRng as _;
use rand::rngs::StdRng;

/// Numeric columns of a dataset as a row-major matrix, nulls and NaN read as 0.
#[derive(Debug, Clone)]
pub struct NumericProjection {
    pub columns: Vec<String>,
    pub records: Array2<f64>,
}

impl NumericProjection {
    pub fn n_rows(&self) -> usize {
        self.records.nrows()
    }
}

pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| c.dtype().is_primitive_numeric())
        .map(|c| c.name().to_string())
        .collect()
}

/// Build the projection, or report why there is nothing to project.
pub fn numeric_projection(df: &DataFrame) -> Result<NumericProjection, DegradedReason> {
    let columns = numeric_column_names(df);
    if columns.is_empty() {
        return Err(DegradedReason::NoNumericColumns);
    }
    if df.height() == 0 {
        return Err(DegradedReason::NoRows);
    }

    let n_rows = df.height();
    let mut records = Array2::<f64>::zeros((n_rows, columns.len()));

    for (j, name) in columns.iter().enumerate() {
        let values = df
            .column(name)
            .and_then(|c| c.cast(&DataType::Float64))
            .map_err(|e| DegradedReason::failed(format!("cannot cast '{name}' to f64: {e}")))?;
        let ca = values
            .as_materialized_series()
            .f64()
            .map_err(|e| DegradedReason::failed(e.to_string()))?;
        for (i, v) in ca.into_iter().enumerate() {
            records[[i, j]] = match v {
                Some(x) if x.is_finite() => x,
                _ => 0.0,
            };
        }
    }

    Ok(NumericProjection { columns, records })
}

/// Zero-mean, unit-variance columns. Constant columns are only centred.
pub fn standardize(records: &Array2<f64>) -> Array2<f64> {
    let mut scaled = records.clone();
    for mut column in scaled.axis_iter_mut(Axis(1)) {
        let mean = column.mean().unwrap_or(0.0);
        let std = column.std(0.0);
        let scale = if std > 0.0 && std.is_finite() { std } else { 1.0 };
        column.mapv_inplace(|v| (v - mean) / scale);
    }
    scaled
}

fn distinct_rows(records: &Array2<f64>) -> usize {
    let mut rows: Vec<Vec<u64>> = records
        .outer_iter()
        .map(|r| r.iter().map(|v| v.to_bits()).collect())
        .collect();
    rows.sort_unstable();
    rows.dedup();
    rows.len()
}

/// Seeded k-means over the standardized projection.
pub fn cluster_rows(
    projection: &NumericProjection,
    k: usize,
    seed: u64,
) -> Result<ClusterReport, DegradedReason> {
    if k == 0 {
        return Err(DegradedReason::failed("cluster count must be positive"));
    }
    let scaled = standardize(&projection.records);

    let distinct = distinct_rows(&scaled);
    if distinct < k {
        return Err(DegradedReason::failed(format!(
            "{distinct} distinct rows cannot form {k} clusters"
        )));
    }

    let dataset = DatasetBase::from(scaled.clone());
    let model = KMeans::params_with_rng(k, StdRng::seed_from_u64(seed))
        .max_n_iterations(300)
        .tolerance(1e-4)
        .fit(&dataset)
        .map_err(|e| DegradedReason::failed(format!("k-means failed: {e}")))?;

    let labels: Array1<usize> = model.predict(&scaled);
    let report = tally_clusters(labels.iter().copied(), k);
    tracing::debug!(
        k,
        populated = report.cluster_count,
        sizes = ?report.cluster_sizes,
        "Clustered {} rows",
        projection.n_rows()
    );
    Ok(report)
}

/// Rows per label. Only clusters that received a row are counted.
fn tally_clusters(labels: impl IntoIterator<Item = usize>, k: usize) -> ClusterReport {
    let mut cluster_sizes = vec![0usize; k];
    for label in labels {
        if let Some(size) = cluster_sizes.get_mut(label) {
            *size += 1;
        }
    }
    ClusterReport {
        cluster_count: cluster_sizes.iter().filter(|&&n| n > 0).count(),
        cluster_sizes,
    }
}
