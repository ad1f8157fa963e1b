use super::anomaly::{self, ForestParams};
use super::correlation;
use super::patterns;
use super::profiling;
use super::recommend;
use super::types::{AnalysisResult, StepOutcome};
use crate::config::AnalysisSettings;
use polars::prelude::*;

/// Profile, cluster, score and correlate one dataset, then synthesize advice.
///
/// Never fails as a whole: steps that cannot run come back as
/// [`StepOutcome::Unavailable`] and per-column failures land in `warnings`.
pub fn analyze_dataset(df: &DataFrame, settings: &AnalysisSettings) -> AnalysisResult {
    let (columns, warnings) = profiling::profile_columns(df, settings.semantic_sample_size);

    let projection = patterns::numeric_projection(df);

    let clusters: StepOutcome<_> = projection
        .as_ref()
        .map_err(Clone::clone)
        .and_then(|p| patterns::cluster_rows(p, settings.cluster_count, settings.seed))
        .into();

    let forest = ForestParams {
        contamination: settings.contamination,
        seed: settings.seed,
        ..ForestParams::default()
    };
    let anomalies: StepOutcome<_> = projection
        .as_ref()
        .map_err(Clone::clone)
        .and_then(|p| anomaly::detect_anomalies(p, &forest, settings.min_anomaly_rows))
        .into();

    let correlations: StepOutcome<_> =
        correlation::analyse_correlations(df, settings.correlation_threshold).into();

    let strong_pairs = correlations
        .completed()
        .map(|r| r.strong_pairs.as_slice())
        .unwrap_or_default();
    let recommendations =
        recommend::synthesize(&columns, strong_pairs, anomalies.completed(), settings);

    let result = AnalysisResult {
        row_count: df.height(),
        column_count: df.width(),
        columns,
        clusters,
        anomalies,
        correlations,
        recommendations,
        warnings,
    };

    for degraded in result.degraded_stages() {
        tracing::info!("{degraded}");
    }
    tracing::info!(
        columns = result.columns.len(),
        recommendations = result.recommendations.messages.len(),
        "Analysis complete"
    );
    result
}
