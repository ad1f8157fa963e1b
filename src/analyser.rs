//! Dataset profiling, pattern discovery and recommendation engine.
//!
//! [`analyze_dataset`] runs every stage over one [`DataFrame`](polars::prelude::DataFrame):
//!
//! ```text
//! dataset ─┬─> profiling (null / unique / duplicate metrics + semantic type)
//!          ├─> patterns  (k-means over the standardized numeric projection)
//!          ├─> anomaly   (isolation forest over the numeric projection)
//!          └─> correlation (pairwise Pearson, strong pairs)
//!                     │
//!                     └─> recommend ──> messages + directives
//! ```
//!
//! Stages that cannot run (no numeric columns, too few rows) degrade to a
//! typed [`StepOutcome::Unavailable`] instead of failing the analysis.

pub mod analysis;
pub mod anomaly;
pub mod correlation;
pub mod io;
pub mod patterns;
pub mod profiling;
pub mod quality;
pub mod recommend;
pub mod semantic;
pub mod types;

pub use analysis::analyze_dataset;
pub use io::{load_dataset, save_csv};
pub use quality::{QualityValidator, ValidationReport};
pub use types::{
    AnalysisResult, AnomalyReport, ClusterReport, ColumnProfile, CorrelationMatrix,
    CorrelationPair, CorrelationReport, DegradedReason, Recommendations, SemanticType, StepOutcome,
};
