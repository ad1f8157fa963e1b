//! Structured transformation and quality-check directives.
//!
//! Directives are produced by the recommendation engine, stored on a
//! [`PipelineSpec`](super::PipelineSpec) and rendered into framework code by
//! the code synthesizer. Both enums are tagged on `type`:
//!
//! ```json
//! { "type": "fill_nulls", "column": "email", "method": "median" }
//! { "type": "range", "column": "age", "min": 18, "max": 100 }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Imputation method for [`TransformDirective::FillNulls`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FillMethod {
    #[default]
    Median,
    Mean,
    Mode,
    Zero,
}

impl FillMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Mean => "mean",
            Self::Mode => "mode",
            Self::Zero => "zero",
        }
    }
}

/// Transformation step applied between extraction and validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformDirective {
    /// Impute missing values in one column
    FillNulls {
        column: String,
        #[serde(default)]
        method: FillMethod,
    },

    /// Drop duplicate rows, optionally considering only `subset`
    RemoveDuplicates {
        #[serde(default)]
        subset: Option<Vec<String>>,
    },

    /// Keep rows matching a pandas-style query expression
    Filter { condition: String },

    /// Group and aggregate; `aggregations` maps column to function name
    Aggregate {
        group_by: Vec<String>,
        aggregations: BTreeMap<String, String>,
    },
}

impl TransformDirective {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FillNulls { .. } => "fill_nulls",
            Self::RemoveDuplicates { .. } => "remove_duplicates",
            Self::Filter { .. } => "filter",
            Self::Aggregate { .. } => "aggregate",
        }
    }

    pub fn target_column(&self) -> Option<&str> {
        match self {
            Self::FillNulls { column, .. } => Some(column),
            _ => None,
        }
    }

    /// One-line human description, used in docs and CLI output
    pub fn describe(&self) -> String {
        match self {
            Self::FillNulls { column, method } => {
                format!("Fill nulls in '{column}' with the {}", method.as_str())
            }
            Self::RemoveDuplicates { subset: None } => "Remove duplicate rows".to_owned(),
            Self::RemoveDuplicates {
                subset: Some(cols),
            } => format!("Remove duplicates on [{}]", cols.join(", ")),
            Self::Filter { condition } => format!("Filter rows where {condition}"),
            Self::Aggregate {
                group_by,
                aggregations,
            } => {
                let aggs = aggregations
                    .iter()
                    .map(|(col, func)| format!("{func}({col})"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Group by [{}] computing {aggs}", group_by.join(", "))
            }
        }
    }
}

/// Data-quality assertion evaluated after transformation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QualityCheckDirective {
    NotNull { column: String },
    Unique { column: String },
    Range { column: String, min: f64, max: f64 },
    EmailValidation { column: String },
}

impl QualityCheckDirective {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotNull { .. } => "not_null",
            Self::Unique { .. } => "unique",
            Self::Range { .. } => "range",
            Self::EmailValidation { .. } => "email_validation",
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::NotNull { column }
            | Self::Unique { column }
            | Self::Range { column, .. }
            | Self::EmailValidation { column } => column,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::NotNull { column } => format!("'{column}' has no null values"),
            Self::Unique { column } => format!("'{column}' values are unique"),
            Self::Range { column, min, max } => {
                format!("'{column}' values lie within [{min}, {max}]")
            }
            Self::EmailValidation { column } => format!("'{column}' values look like emails"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_tagging() -> anyhow::Result<()> {
        let fill = TransformDirective::FillNulls {
            column: "email".to_owned(),
            method: FillMethod::Median,
        };
        let json = serde_json::to_string(&fill)?;
        assert_eq!(json, r#"{"type":"fill_nulls","column":"email","method":"median"}"#);

        let dedupe: TransformDirective =
            serde_json::from_str(r#"{ "type": "remove_duplicates", "subset": null }"#)?;
        assert_eq!(dedupe, TransformDirective::RemoveDuplicates { subset: None });
        assert_eq!(dedupe.kind(), "remove_duplicates");
        assert_eq!(dedupe.target_column(), None);
        Ok(())
    }

    #[test]
    fn test_fill_method_defaults_to_median() -> anyhow::Result<()> {
        let fill: TransformDirective =
            serde_json::from_str(r#"{ "type": "fill_nulls", "column": "age" }"#)?;
        assert_eq!(
            fill,
            TransformDirective::FillNulls {
                column: "age".to_owned(),
                method: FillMethod::Median
            }
        );
        Ok(())
    }

    #[test]
    fn test_quality_check_parsing() -> anyhow::Result<()> {
        let range: QualityCheckDirective =
            serde_json::from_str(r#"{ "type": "range", "column": "age", "min": 18, "max": 100 }"#)?;
        assert_eq!(range.kind(), "range");
        assert_eq!(range.column(), "age");

        let unknown = serde_json::from_str::<QualityCheckDirective>(
            r#"{ "type": "regex", "column": "age" }"#,
        );
        assert!(unknown.is_err());
        Ok(())
    }
}
