use crate::analyser::quality::*;
use crate::config::AnalysisSettings;
use crate::pipeline::directives::QualityCheckDirective;
use anyhow::Result;
use chrono::{DateTime, TimeZone as _, Utc};
use polars::prelude::*;
use pretty_assertions::assert_eq;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

fn orders() -> Result<DataFrame> {
    Ok(df!(
        "order_id" => &[1i64, 2, 2, 4, 5],
        "email" => &[Some("a@x.io"), None, Some("broken"), Some("d@x.io"), Some("e@x.io")],
        "amount" => &[5.0, 12.0, 250.0, 40.0, 18.0]
    )?)
}

#[test]
fn test_not_null_rule() -> Result<()> {
    let df = orders()?;
    let failed = execute_rule(
        &df,
        &QualityCheckDirective::NotNull {
            column: "email".to_owned(),
        },
    );
    assert!(!failed.passed);
    assert_eq!(failed.message, "Found 1 null values in email");

    let passed = execute_rule(
        &df,
        &QualityCheckDirective::NotNull {
            column: "amount".to_owned(),
        },
    );
    assert!(passed.passed);
    assert_eq!(passed.message, "No null values found");
    Ok(())
}

#[test]
fn test_unique_rule_counts_repeats() -> Result<()> {
    let df = orders()?;
    let outcome = execute_rule(
        &df,
        &QualityCheckDirective::Unique {
            column: "order_id".to_owned(),
        },
    );
    assert!(!outcome.passed);
    assert_eq!(outcome.message, "Found 1 duplicate values in order_id");
    Ok(())
}

#[test]
fn test_range_rule_inclusive_bounds() -> Result<()> {
    let df = orders()?;
    let rule = QualityCheckDirective::Range {
        column: "amount".to_owned(),
        min: 5.0,
        max: 100.0,
    };
    let outcome = execute_rule(&df, &rule);
    assert!(!outcome.passed);
    assert_eq!(outcome.message, "Found 1 values out of range [5, 100] in amount");
    Ok(())
}

#[test]
fn test_email_rule_flags_missing_at_sign() -> Result<()> {
    let df = orders()?;
    let outcome = execute_rule(
        &df,
        &QualityCheckDirective::EmailValidation {
            column: "email".to_owned(),
        },
    );
    assert!(!outcome.passed);
    assert_eq!(outcome.message, "Found 1 invalid emails in email");
    Ok(())
}

#[test]
fn test_rule_on_missing_column_fails_without_aborting() -> Result<()> {
    let df = orders()?;
    let rules = vec![
        QualityCheckDirective::NotNull {
            column: "ghost".to_owned(),
        },
        QualityCheckDirective::NotNull {
            column: "amount".to_owned(),
        },
    ];
    let report = QualityValidator::default().validate(&df, &rules, fixed_now());

    assert!(!report.passed);
    assert_eq!(report.issues.len(), 1);
    assert!(report.issues[0].message.starts_with("Error executing rule"));
    assert!(report.issues[0].message.contains("'ghost'"));
    Ok(())
}

#[test]
fn test_validation_metrics() -> Result<()> {
    let df = orders()?;
    let report = QualityValidator::new(AnalysisSettings::default()).validate(&df, &[], fixed_now());

    assert!(report.passed);
    assert_eq!(report.metrics.total_rows, 5);
    assert_eq!(report.metrics.total_columns, 3);
    // one missing cell out of fifteen
    assert!((report.metrics.completeness_score - 14.0 / 15.0).abs() < 1e-12);
    // 5 rows is below the anomaly minimum, so accuracy falls back
    assert!(!report.insights.anomaly_detection.is_completed());
    assert_eq!(report.metrics.accuracy_score, 0.95);
    Ok(())
}

#[test]
fn test_consistency_score_penalises_ragged_text() -> Result<()> {
    let tidy = df!("code" => &["AB", "CD", "EF"])?;
    assert_eq!(consistency_score(&tidy), 1.0);

    let ragged = df!("note" => &["a", "bb", "ccc", "dddd", "eeeee"], "n" => &[1, 2, 3, 4, 5])?;
    assert!((consistency_score(&ragged) - 0.85).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_pattern_consistency() -> Result<()> {
    let df = df!(
        "zip" => &["12345", "23456", "34567", "45678", "1234"],
        "mixed" => &["a", "bb", "ccc", "dd", "e"],
        "same" => &["xx", "yy", "zz", "ww", "vv"]
    )?;
    let result = pattern_consistency(&df);

    assert_eq!(result["zip"].status, ConsistencyStatus::Consistent);
    assert!((result["zip"].consistency_score - 0.8).abs() < 1e-12);
    assert_eq!(result["mixed"].status, ConsistencyStatus::Inconsistent);
    assert!(!result.contains_key("same"), "single-length columns are skipped");
    Ok(())
}

#[test]
fn test_parse_datetime_layouts() {
    assert!(parse_datetime("2024-03-01").is_some());
    assert!(parse_datetime("2024-03-01 08:30:00").is_some());
    assert!(parse_datetime("2024-03-01T08:30:00Z").is_some());
    assert!(parse_datetime("03/01/2024").is_some());
    assert!(parse_datetime("next tuesday").is_none());
}

#[test]
fn test_freshness_of_text_dates() -> Result<()> {
    let df = df!(
        "purchase_date" => &["2024-03-01", "2024-03-08", "2024-02-20"],
        "updated_time" => &["2024-01-01", "2024-01-15", "2024-01-02"],
        "notes" => &["2024-03-09", "x", "y"]
    )?;
    let result = data_freshness(&df, fixed_now(), 7);

    let purchase = &result["purchase_date"];
    assert_eq!(purchase.days_old, 2);
    assert_eq!(purchase.status, FreshnessStatus::Fresh);

    let updated = &result["updated_time"];
    assert_eq!(updated.status, FreshnessStatus::Stale);

    assert!(!result.contains_key("notes"), "name must mention date or time");
    Ok(())
}

#[test]
fn test_freshness_skips_unparseable_columns() -> Result<()> {
    let df = df!("signup_date" => &["soon", "2024-03-01"])?;
    assert!(data_freshness(&df, fixed_now(), 7).is_empty());
    Ok(())
}
