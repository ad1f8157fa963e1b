//! Data-quality validation against a pipeline's quality checks.
//!
//! Each [`QualityCheckDirective`] is evaluated on its own; a rule that cannot
//! run (missing column, incompatible dtype) is reported as a failed outcome
//! instead of aborting the whole validation.

use super::anomaly::{self, ForestParams};
use super::patterns;
use super::types::{AnomalyReport, StepOutcome};
use crate::config::AnalysisSettings;
use crate::error::PipesmithError;
use crate::pipeline::directives::QualityCheckDirective;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Distinct trimmed lengths a text column may show and still count as consistent
const MAX_CONSISTENT_LENGTHS: usize = 3;
const PATTERN_CONSISTENCY_CUTOFF: f64 = 0.8;
const FRESHNESS_PROBE_ROWS: usize = 100;
const DEFAULT_ACCURACY: f64 = 0.95;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleOutcome {
    pub rule: QualityCheckDirective,
    pub passed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityMetrics {
    pub total_rows: usize,
    pub total_columns: usize,
    /// Non-null cells over all cells, 0..=1
    pub completeness_score: f64,
    pub consistency_score: f64,
    pub accuracy_score: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyLevel {
    High,
    Normal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyInsight {
    pub anomaly_percentage: f64,
    pub anomaly_count: usize,
    pub status: AnomalyLevel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyStatus {
    Consistent,
    Inconsistent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternConsistency {
    /// Share of values having the most common length
    pub consistency_score: f64,
    pub status: ConsistencyStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessStatus {
    Fresh,
    Stale,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Freshness {
    pub latest_date: NaiveDateTime,
    pub days_old: i64,
    pub status: FreshnessStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityInsights {
    pub anomaly_detection: StepOutcome<AnomalyInsight>,
    pub pattern_consistency: BTreeMap<String, PatternConsistency>,
    pub data_freshness: BTreeMap<String, Freshness>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    pub passed: bool,
    /// Failed rules only
    pub issues: Vec<RuleOutcome>,
    pub metrics: QualityMetrics,
    pub insights: QualityInsights,
}

/// Evaluates quality checks and computes dataset-level quality signals.
#[derive(Debug, Clone, Default)]
pub struct QualityValidator {
    settings: AnalysisSettings,
}

impl QualityValidator {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    pub fn validate(
        &self,
        df: &DataFrame,
        rules: &[QualityCheckDirective],
        now: DateTime<Utc>,
    ) -> ValidationReport {
        let issues: Vec<RuleOutcome> = rules
            .iter()
            .map(|rule| execute_rule(df, rule))
            .filter(|outcome| !outcome.passed)
            .collect();

        for issue in &issues {
            tracing::warn!(rule = issue.rule.kind(), "{}", issue.message);
        }

        let insights = self.insights(df, now);
        let accuracy_score = insights
            .anomaly_detection
            .completed()
            .map_or(DEFAULT_ACCURACY, |a| {
                (1.0 - a.anomaly_percentage / 100.0).max(0.0)
            });

        let metrics = QualityMetrics {
            total_rows: df.height(),
            total_columns: df.width(),
            completeness_score: completeness_score(df),
            consistency_score: consistency_score(df),
            accuracy_score,
        };

        ValidationReport {
            passed: issues.is_empty(),
            issues,
            metrics,
            insights,
        }
    }

    pub fn insights(&self, df: &DataFrame, now: DateTime<Utc>) -> QualityInsights {
        let forest = ForestParams {
            contamination: self.settings.contamination,
            seed: self.settings.seed,
            ..ForestParams::default()
        };
        let anomaly_detection: StepOutcome<AnomalyInsight> = patterns::numeric_projection(df)
            .and_then(|p| anomaly::detect_anomalies(&p, &forest, self.settings.min_anomaly_rows))
            .map(|report| self.anomaly_insight(&report))
            .into();

        QualityInsights {
            anomaly_detection,
            pattern_consistency: pattern_consistency(df),
            data_freshness: data_freshness(df, now, self.settings.freshness_window_days),
        }
    }

    fn anomaly_insight(&self, report: &AnomalyReport) -> AnomalyInsight {
        let status = if report.anomaly_percentage > self.settings.anomaly_threshold_pct {
            AnomalyLevel::High
        } else {
            AnomalyLevel::Normal
        };
        AnomalyInsight {
            anomaly_percentage: report.anomaly_percentage,
            anomaly_count: report.anomaly_count,
            status,
        }
    }
}

fn rule_error(rule: &QualityCheckDirective, message: impl Into<String>) -> PipesmithError {
    PipesmithError::QualityRuleExecution {
        rule: rule.kind().to_owned(),
        column: rule.column().to_owned(),
        message: message.into(),
    }
}

/// Outcome of one rule. Evaluation errors become a failed outcome.
pub fn execute_rule(df: &DataFrame, rule: &QualityCheckDirective) -> RuleOutcome {
    let (passed, message) = match evaluate_rule(df, rule) {
        Ok(result) => result,
        Err(e) => (false, e.to_string()),
    };
    RuleOutcome {
        rule: rule.clone(),
        passed,
        message,
    }
}

fn evaluate_rule(
    df: &DataFrame,
    rule: &QualityCheckDirective,
) -> Result<(bool, String), PipesmithError> {
    let column = rule.column();
    let series = df
        .column(column)
        .map_err(|e| rule_error(rule, e.to_string()))?
        .as_materialized_series();

    let outcome = match rule {
        QualityCheckDirective::NotNull { .. } => {
            let nulls = series.null_count();
            if nulls == 0 {
                (true, "No null values found".to_owned())
            } else {
                (false, format!("Found {nulls} null values in {column}"))
            }
        }
        QualityCheckDirective::Unique { .. } => {
            let present = series.drop_nulls();
            let distinct = present
                .n_unique()
                .map_err(|e| rule_error(rule, e.to_string()))?;
            let duplicates = present.len() - distinct;
            if duplicates == 0 {
                (true, "All values are unique".to_owned())
            } else {
                (false, format!("Found {duplicates} duplicate values in {column}"))
            }
        }
        QualityCheckDirective::Range { min, max, .. } => {
            let values = series
                .strict_cast(&DataType::Float64)
                .map_err(|e| rule_error(rule, e.to_string()))?;
            let out_of_range = values
                .f64()
                .map_err(|e| rule_error(rule, e.to_string()))?
                .into_iter()
                .flatten()
                .filter(|v| v < min || v > max)
                .count();
            if out_of_range == 0 {
                (true, "All values in range".to_owned())
            } else {
                (
                    false,
                    format!("Found {out_of_range} values out of range [{min}, {max}] in {column}"),
                )
            }
        }
        QualityCheckDirective::EmailValidation { .. } => {
            let text = series
                .cast(&DataType::String)
                .map_err(|e| rule_error(rule, e.to_string()))?;
            let invalid = text
                .str()
                .map_err(|e| rule_error(rule, e.to_string()))?
                .into_iter()
                .flatten()
                .filter(|v| !v.contains('@'))
                .count();
            if invalid == 0 {
                (true, "All emails look valid".to_owned())
            } else {
                (false, format!("Found {invalid} invalid emails in {column}"))
            }
        }
    };

    Ok(outcome)
}

pub fn completeness_score(df: &DataFrame) -> f64 {
    let total_cells = df.height() * df.width();
    if total_cells == 0 {
        return 1.0;
    }
    let missing: usize = df.get_columns().iter().map(|c| c.null_count()).sum();
    (total_cells - missing) as f64 / total_cells as f64
}

fn string_values(col: &Column) -> Vec<String> {
    col.as_materialized_series()
        .str()
        .map(|ca| ca.into_iter().flatten().map(str::to_owned).collect())
        .unwrap_or_default()
}

/// Mean per-column consistency. Text columns with more than a few distinct
/// trimmed lengths score 0.7; everything else scores 1.0.
pub fn consistency_score(df: &DataFrame) -> f64 {
    let scores: Vec<f64> = df
        .get_columns()
        .iter()
        .map(|col| {
            if col.dtype() != &DataType::String {
                return 1.0;
            }
            let lengths: HashSet<usize> = string_values(col)
                .iter()
                .map(|v| v.trim().chars().count())
                .collect();
            if lengths.len() <= MAX_CONSISTENT_LENGTHS {
                1.0
            } else {
                0.7
            }
        })
        .collect();

    if scores.is_empty() {
        1.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

pub fn pattern_consistency(df: &DataFrame) -> BTreeMap<String, PatternConsistency> {
    let mut results = BTreeMap::new();

    for col in df.get_columns() {
        if col.dtype() != &DataType::String {
            continue;
        }
        let values = string_values(col);
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for v in &values {
            *counts.entry(v.chars().count()).or_default() += 1;
        }
        if counts.len() <= 1 {
            continue;
        }
        let most_common = counts.values().copied().max().unwrap_or(0);
        let score = most_common as f64 / values.len() as f64;
        let status = if score < PATTERN_CONSISTENCY_CUTOFF {
            ConsistencyStatus::Inconsistent
        } else {
            ConsistencyStatus::Consistent
        };
        results.insert(
            col.name().to_string(),
            PatternConsistency {
                consistency_score: score,
                status,
            },
        );
    }

    results
}

/// Parse a date or timestamp in one of the layouts commonly found in exports.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn column_datetimes(col: &Column) -> Option<Vec<NaiveDateTime>> {
    let series = col.as_materialized_series();
    match series.dtype() {
        DataType::String => {
            let values = string_values(col);
            let probe = values.iter().take(FRESHNESS_PROBE_ROWS);
            if probe.clone().any(|v| parse_datetime(v).is_none()) {
                return None;
            }
            Some(values.iter().filter_map(|v| parse_datetime(v)).collect())
        }
        DataType::Date | DataType::Datetime(_, _) => {
            let ms = series
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .and_then(|s| s.cast(&DataType::Int64))
                .ok()?;
            Some(
                ms.i64()
                    .ok()?
                    .into_iter()
                    .flatten()
                    .filter_map(|v| DateTime::from_timestamp_millis(v).map(|d| d.naive_utc()))
                    .collect(),
            )
        }
        _ => None,
    }
}

/// Freshness of every date-like column: name mentions `date` or `time` and
/// the first values parse as dates.
pub fn data_freshness(
    df: &DataFrame,
    now: DateTime<Utc>,
    window_days: i64,
) -> BTreeMap<String, Freshness> {
    let mut results = BTreeMap::new();

    for col in df.get_columns() {
        let lowered = col.name().to_lowercase();
        if !(lowered.contains("date") || lowered.contains("time")) {
            continue;
        }
        let Some(latest) = column_datetimes(col).and_then(|d| d.into_iter().max()) else {
            continue;
        };
        let days_old = (now.naive_utc() - latest).num_days();
        let status = if days_old <= window_days {
            FreshnessStatus::Fresh
        } else {
            FreshnessStatus::Stale
        };
        results.insert(
            col.name().to_string(),
            Freshness {
                latest_date: latest,
                days_old,
                status,
            },
        );
    }

    results
}
