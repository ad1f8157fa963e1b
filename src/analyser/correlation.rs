use super::patterns::numeric_column_names;
use super::types::{CorrelationMatrix, CorrelationPair, CorrelationReport, DegradedReason};
use polars::prelude::*;

fn as_f64(df: &DataFrame, name: &str) -> PolarsResult<Float64Chunked> {
    let casted = df.column(name)?.cast(&DataType::Float64)?;
    Ok(casted.as_materialized_series().f64()?.clone())
}

/// Pearson coefficient over rows where both values are present.
///
/// `None` when fewer than two such rows exist or either side is constant.
fn pairwise_pearson(a: &Float64Chunked, b: &Float64Chunked) -> PolarsResult<Option<f64>> {
    let mask = a.is_not_null() & b.is_not_null();
    let a = a.filter(&mask)?;
    let b = b.filter(&mask)?;
    if a.len() < 2 {
        return Ok(None);
    }
    Ok(polars::prelude::cov::pearson_corr(&a, &b).filter(|r| r.is_finite()))
}

pub fn calculate_correlation_matrix(
    df: &DataFrame,
    numeric_cols: &[String],
) -> PolarsResult<CorrelationMatrix> {
    let series = numeric_cols
        .iter()
        .map(|name| as_f64(df, name))
        .collect::<PolarsResult<Vec<_>>>()?;

    let n = series.len();
    let mut data = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = if i == j {
                // Constant or near-empty columns have no defined self-correlation.
                pairwise_pearson(&series[i], &series[i])?.map(|_| 1.0)
            } else {
                pairwise_pearson(&series[i], &series[j])?
            };
            data[i][j] = r;
            data[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        columns: numeric_cols.to_vec(),
        data,
    })
}

/// Pairs with |r| strictly above `threshold`, each unordered pair once (i < j).
pub fn strong_pairs(matrix: &CorrelationMatrix, threshold: f64) -> Vec<CorrelationPair> {
    let mut pairs = Vec::new();
    for (i, row) in matrix.data.iter().enumerate() {
        for (j, value) in row.iter().enumerate().skip(i + 1) {
            if let Some(r) = value
                && r.abs() > threshold
            {
                pairs.push(CorrelationPair {
                    column_a: matrix.columns[i].clone(),
                    column_b: matrix.columns[j].clone(),
                    correlation: *r,
                });
            }
        }
    }
    pairs
}

/// Correlation step of the analysis. Needs at least two numeric columns.
pub fn analyse_correlations(
    df: &DataFrame,
    threshold: f64,
) -> Result<CorrelationReport, DegradedReason> {
    let numeric_cols = numeric_column_names(df);
    if numeric_cols.len() < 2 {
        return Err(DegradedReason::InsufficientNumericColumns {
            found: numeric_cols.len(),
        });
    }

    let matrix = calculate_correlation_matrix(df, &numeric_cols)
        .map_err(|e| DegradedReason::failed(format!("correlation failed: {e}")))?;
    let strong_pairs = strong_pairs(&matrix, threshold);

    Ok(CorrelationReport {
        matrix,
        strong_pairs,
    })
}
