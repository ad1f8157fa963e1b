use crate::analyser::profiling::profile_column;
use crate::analyser::*;
use crate::config::AnalysisSettings;
use crate::pipeline::directives::{QualityCheckDirective, TransformDirective};
use anyhow::Result;
use polars::prelude::*;
use proptest::prelude::*;

fn customers(rows: usize, missing_emails: usize) -> Result<DataFrame> {
    let ids: Vec<i64> = (1..=rows as i64).collect();
    let emails: Vec<Option<String>> = (0..rows)
        .map(|i| (i >= missing_emails).then(|| format!("user{i}@example.com")))
        .collect();
    Ok(df!("customer_id" => ids, "email" => emails)?)
}

#[test]
fn test_identifier_and_partially_missing_email() -> Result<()> {
    let df = customers(1000, 50)?;
    let result = analyze_dataset(&df, &AnalysisSettings::default());

    let email = result.column("email").expect("email profiled");
    assert_eq!(email.semantic_type, SemanticType::Email);
    assert!((email.completeness - 95.0).abs() < 1e-9, "{}", email.completeness);
    assert!((email.null_percentage - 5.0).abs() < 1e-9);

    let id = result.column("customer_id").expect("id profiled");
    assert_eq!(id.semantic_type, SemanticType::Identifier);
    assert_eq!(id.unique_count, 1000);
    assert_eq!(id.duplicate_percentage, None, "numeric columns have no duplicate metric");

    let recs = &result.recommendations;
    assert!(recs.quality_checks.contains(&QualityCheckDirective::Unique {
        column: "customer_id".to_owned()
    }));
    assert!(
        !recs
            .transformations
            .iter()
            .any(|t| t.target_column() == Some("email")),
        "5% nulls is below the imputation threshold"
    );
    Ok(())
}

#[test]
fn test_strong_correlation_is_advisory_only() -> Result<()> {
    // x and u are centred, equally scaled and orthogonal, so r(x, y) = 0.85 exactly.
    let x_base = [1.0, -1.0, 1.0, -1.0];
    let u_base = [1.0, 1.0, -1.0, -1.0];
    let noise = (1.0f64 - 0.85 * 0.85).sqrt();
    let mut height = Vec::new();
    let mut weight = Vec::new();
    for _ in 0..25 {
        for k in 0..4 {
            height.push(x_base[k]);
            weight.push(0.85 * x_base[k] + noise * u_base[k]);
        }
    }
    let df = df!("height_cm" => height, "weight_kg" => weight)?;
    let result = analyze_dataset(&df, &AnalysisSettings::default());

    let pairs = result.strong_pairs();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].column_a, "height_cm");
    assert_eq!(pairs[0].column_b, "weight_kg");
    assert!((pairs[0].correlation - 0.85).abs() < 1e-9);

    assert!(result.recommendations.messages.contains(
        &"Strong correlation (0.85) between 'height_cm' and 'weight_kg'. Consider feature engineering."
            .to_owned()
    ));
    assert!(result.recommendations.transformations.is_empty());
    assert!(result.recommendations.quality_checks.is_empty());
    Ok(())
}

#[test]
fn test_high_null_column_gets_single_median_fill() -> Result<()> {
    let scores: Vec<Option<f64>> = (0..20)
        .map(|i| (i % 4 != 0).then_some(f64::from(i)))
        .collect();
    let df = df!("score" => scores)?;
    let result = analyze_dataset(&df, &AnalysisSettings::default());

    let fills: Vec<_> = result
        .recommendations
        .transformations
        .iter()
        .filter(|t| matches!(t, TransformDirective::FillNulls { column, .. } if column == "score"))
        .collect();
    assert_eq!(fills.len(), 1);
    assert_eq!(
        result.recommendations.messages[0],
        "High null percentage (25.0%) in column 'score'. Consider imputation or removal."
    );
    Ok(())
}

#[test]
fn test_text_only_dataset_degrades_numeric_stages() -> Result<()> {
    let df = df!("city" => &["Leeds", "York", "Hull"])?;
    let result = analyze_dataset(&df, &AnalysisSettings::default());

    assert_eq!(
        result.clusters.degraded_reason(),
        Some(&DegradedReason::NoNumericColumns)
    );
    assert_eq!(
        result.anomalies.degraded_reason(),
        Some(&DegradedReason::NoNumericColumns)
    );
    assert_eq!(
        result.correlations.degraded_reason(),
        Some(&DegradedReason::InsufficientNumericColumns { found: 0 })
    );
    assert_eq!(
        result.column("city").map(|c| c.semantic_type),
        Some(SemanticType::Geographic)
    );
    Ok(())
}

#[test]
fn test_small_dataset_skips_anomaly_detection() -> Result<()> {
    let df = df!("a" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], "b" => &[2.0, 1.0, 4.0, 3.0, 6.0, 5.0])?;
    let result = analyze_dataset(&df, &AnalysisSettings::default());
    assert_eq!(
        result.anomalies.degraded_reason(),
        Some(&DegradedReason::InsufficientRows {
            required: 10,
            actual: 6
        })
    );
    assert!(result.clusters.is_completed());
    Ok(())
}

#[test]
fn test_zero_row_column_profile() -> Result<()> {
    let s = Series::new("empty".into(), Vec::<String>::new());
    let profile = profile_column(&Column::from(s), 10)?;
    assert_eq!(profile.null_percentage, 0.0);
    assert_eq!(profile.completeness, 100.0);
    assert_eq!(profile.duplicate_percentage, Some(0.0));
    assert_eq!(profile.semantic_type, SemanticType::Generic);
    Ok(())
}

#[test]
fn test_string_duplicates_count_repeated_nulls() -> Result<()> {
    let s = Series::new(
        "tag".into(),
        vec![Some("a"), Some("a"), None, None, Some("b")],
    );
    let profile = profile_column(&Column::from(s), 10)?;
    // 5 rows, distinct {a, b, null} = 3
    assert_eq!(profile.duplicate_percentage, Some(40.0));
    assert_eq!(profile.unique_count, 2);
    Ok(())
}

#[test]
fn test_semantic_sample_skips_nulls() -> Result<()> {
    let mut values: Vec<Option<&str>> = vec![None; 15];
    values.push(Some("ops@example.org"));
    let s = Series::new("contact".into(), values);
    let profile = profile_column(&Column::from(s), 10)?;
    assert_eq!(profile.semantic_type, SemanticType::Email);
    Ok(())
}

#[test]
fn test_analysis_is_deterministic() -> Result<()> {
    let values: Vec<f64> = (0..300).map(|i| f64::from((i * 37) % 101)).collect();
    let other: Vec<f64> = (0..300).map(|i| f64::from((i * 11) % 53)).collect();
    let df = df!("v" => values, "w" => other)?;

    let a = analyze_dataset(&df, &AnalysisSettings::default());
    let b = analyze_dataset(&df, &AnalysisSettings::default());
    assert_eq!(a.clusters, b.clusters);
    assert_eq!(a.anomalies, b.anomalies);
    assert_eq!(a.recommendations, b.recommendations);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_completeness_complements_null_share(
        values in proptest::collection::vec(proptest::option::of(-1000i64..1000), 0..200)
    ) {
        let s = Series::new("v".into(), values);
        let profile = profile_column(&Column::from(s), 10).unwrap();
        let total = profile.completeness_ratio() + profile.null_percentage / 100.0;
        prop_assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn prop_fill_nulls_iff_above_threshold(
        values in proptest::collection::vec(proptest::option::of(0i64..50), 1..120)
    ) {
        let nulls = values.iter().filter(|v| v.is_none()).count();
        let null_pct = nulls as f64 / values.len() as f64 * 100.0;
        let df = DataFrame::new(vec![Column::from(Series::new("measure".into(), values))]).unwrap();
        let result = analyze_dataset(&df, &AnalysisSettings::default());

        let fills = result
            .recommendations
            .transformations
            .iter()
            .filter(|t| t.kind() == "fill_nulls")
            .count();
        prop_assert_eq!(fills, usize::from(null_pct > 20.0));
    }
}
