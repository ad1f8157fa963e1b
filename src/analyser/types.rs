use crate::error::PipesmithError;
use crate::pipeline::directives::{QualityCheckDirective, TransformDirective};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inferred domain meaning of a column, independent of its storage dtype
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Email,
    Phone,
    Date,
    Identifier,
    Currency,
    Geographic,
    Generic,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Date => "date",
            Self::Identifier => "identifier",
            Self::Currency => "currency",
            Self::Geographic => "geographic",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    /// Storage dtype as reported by polars
    pub data_type: String,
    pub semantic_type: SemanticType,
    pub row_count: usize,
    pub null_count: usize,
    pub null_percentage: f64,
    /// Distinct non-null values
    pub unique_count: usize,
    /// Non-null share of the column, as a percentage
    pub completeness: f64,
    /// Only computed for string columns
    pub duplicate_percentage: Option<f64>,
}

impl ColumnProfile {
    /// Completeness as a 0..=1 ratio.
    pub fn completeness_ratio(&self) -> f64 {
        self.completeness / 100.0
    }
}

/// Why an analysis step produced no result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DegradedReason {
    NoNumericColumns,
    NoRows,
    InsufficientRows { required: usize, actual: usize },
    InsufficientNumericColumns { found: usize },
    ComputationFailed { message: String },
}

impl DegradedReason {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::ComputationFailed {
            message: message.into(),
        }
    }
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoNumericColumns => write!(f, "no numeric columns"),
            Self::NoRows => write!(f, "dataset has no rows"),
            Self::InsufficientRows { required, actual } => {
                write!(f, "needs more than {required} rows, found {actual}")
            }
            Self::InsufficientNumericColumns { found } => {
                write!(f, "needs at least 2 numeric columns, found {found}")
            }
            Self::ComputationFailed { message } => write!(f, "computation failed: {message}"),
        }
    }
}

/// Result of an analysis step that is allowed to degrade
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome<T> {
    Completed(T),
    Unavailable(DegradedReason),
}

impl<T> StepOutcome<T> {
    pub fn completed(&self) -> Option<&T> {
        match self {
            Self::Completed(v) => Some(v),
            Self::Unavailable(_) => None,
        }
    }

    pub fn degraded_reason(&self) -> Option<&DegradedReason> {
        match self {
            Self::Completed(_) => None,
            Self::Unavailable(reason) => Some(reason),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

impl<T> From<Result<T, DegradedReason>> for StepOutcome<T> {
    fn from(result: Result<T, DegradedReason>) -> Self {
        match result {
            Ok(v) => Self::Completed(v),
            Err(reason) => Self::Unavailable(reason),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterReport {
    /// Clusters holding at least one row
    pub cluster_count: usize,
    /// Rows per cluster, indexed by cluster label
    pub cluster_sizes: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyReport {
    pub anomaly_count: usize,
    pub anomaly_percentage: f64,
}

/// Pairwise Pearson coefficients; `None` where the coefficient is undefined
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.data.get(i)?.get(j).copied().flatten()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationPair {
    pub column_a: String,
    pub column_b: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationReport {
    pub matrix: CorrelationMatrix,
    pub strong_pairs: Vec<CorrelationPair>,
}

/// Free-text advice plus the machine-actionable directives behind it
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Recommendations {
    pub messages: Vec<String>,
    pub transformations: Vec<TransformDirective>,
    pub quality_checks: Vec<QualityCheckDirective>,
}

/// Everything the analyser learned about one dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnProfile>,
    pub clusters: StepOutcome<ClusterReport>,
    pub anomalies: StepOutcome<AnomalyReport>,
    pub correlations: StepOutcome<CorrelationReport>,
    pub recommendations: Recommendations,
    /// Per-column failures that did not stop the analysis
    pub warnings: Vec<String>,
}

impl AnalysisResult {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn strong_pairs(&self) -> &[CorrelationPair] {
        self.correlations
            .completed()
            .map(|r| r.strong_pairs.as_slice())
            .unwrap_or_default()
    }

    /// One [`PipesmithError::AnalysisDegraded`] per stage that produced no result.
    pub fn degraded_stages(&self) -> Vec<PipesmithError> {
        [
            ("clustering", self.clusters.degraded_reason()),
            ("anomaly detection", self.anomalies.degraded_reason()),
            ("correlation", self.correlations.degraded_reason()),
        ]
        .into_iter()
        .filter_map(|(stage, reason)| {
            reason.map(|r| PipesmithError::AnalysisDegraded {
                stage: stage.to_owned(),
                reason: r.to_string(),
            })
        })
        .collect()
    }
}
