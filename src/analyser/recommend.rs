//! Turns analysis findings into advice and directives.
//!
//! Messages are emitted in four passes: per-column quality findings,
//! per-column type findings, correlation pairs, then the anomaly rate.
//! Directive order follows column order and is stable across runs.

use super::types::{
    AnomalyReport, ColumnProfile, CorrelationPair, Recommendations, SemanticType,
};
use crate::config::AnalysisSettings;
use crate::pipeline::directives::{FillMethod, QualityCheckDirective, TransformDirective};

pub fn synthesize(
    profiles: &[ColumnProfile],
    strong_pairs: &[CorrelationPair],
    anomalies: Option<&AnomalyReport>,
    settings: &AnalysisSettings,
) -> Recommendations {
    let mut out = Recommendations::default();
    let mut dedupe_emitted = false;

    for profile in profiles {
        let name = &profile.name;

        if profile.null_percentage > settings.null_threshold_pct {
            out.messages.push(format!(
                "High null percentage ({:.1}%) in column '{name}'. Consider imputation or removal.",
                profile.null_percentage
            ));
            out.transformations.push(TransformDirective::FillNulls {
                column: name.clone(),
                method: FillMethod::Median,
            });
        }

        if let Some(dup) = profile.duplicate_percentage
            && dup > settings.duplicate_threshold_pct
        {
            out.messages.push(format!(
                "High duplicate percentage ({dup:.1}%) in column '{name}'. Consider deduplication."
            ));
            // Whole-row deduplication covers every column at once.
            if !dedupe_emitted {
                out.transformations
                    .push(TransformDirective::RemoveDuplicates { subset: None });
                dedupe_emitted = true;
            }
        }
    }

    for profile in profiles {
        let name = &profile.name;
        match profile.semantic_type {
            SemanticType::Email => {
                out.messages.push(format!(
                    "Column '{name}' contains emails. Consider email validation and privacy measures."
                ));
                out.quality_checks
                    .push(QualityCheckDirective::EmailValidation {
                        column: name.clone(),
                    });
            }
            SemanticType::Identifier => {
                out.messages.push(format!(
                    "Column '{name}' appears to be an identifier. Consider indexing for performance."
                ));
                out.quality_checks.push(QualityCheckDirective::Unique {
                    column: name.clone(),
                });
            }
            SemanticType::Date => {
                out.messages.push(format!(
                    "Column '{name}' contains dates. Consider date parsing and time-based analysis."
                ));
            }
            SemanticType::Phone
            | SemanticType::Currency
            | SemanticType::Geographic
            | SemanticType::Generic => {}
        }
    }

    for pair in strong_pairs {
        out.messages.push(format!(
            "Strong correlation ({:.2}) between '{}' and '{}'. Consider feature engineering.",
            pair.correlation, pair.column_a, pair.column_b
        ));
    }

    if let Some(report) = anomalies
        && report.anomaly_percentage > settings.anomaly_threshold_pct
    {
        out.messages.push(format!(
            "High anomaly rate ({:.1}%). Consider outlier handling strategies.",
            report.anomaly_percentage
        ));
    }

    out
}
