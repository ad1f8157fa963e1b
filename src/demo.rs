//! Deterministic sample customer dataset with injected quality issues.
//!
//! Issues, by zero-based row index:
//! - rows 50..=60: `email` is missing
//! - rows 100..=105: `customer_id` repeats `1001`
//! - row 200: `purchase_amount` is a 10 000 outlier

use crate::analyser::save_csv;
use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};
use std::ops::RangeInclusive;
use std::path::Path;

pub const DEMO_FILE: &str = "sample_customer_data.csv";
pub const DEMO_PIPELINE: &str = "customer_analytics_pipeline";

const CATEGORIES: [&str; 4] = ["Electronics", "Clothing", "Books", "Home"];
const MISSING_EMAIL_ROWS: RangeInclusive<usize> = 50..=60;
const DUPLICATE_ID_ROWS: RangeInclusive<usize> = 100..=105;
const OUTLIER_ROW: usize = 200;

#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub rows: usize,
    pub seed: u64,
    /// Timestamp of the first purchase; each row is one hour later
    pub start: NaiveDateTime,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            rows: 1000,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
        }
    }
}

/// Standard normal sample via Box-Muller.
fn normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.r#gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

pub fn demo_dataset(options: &DemoOptions) -> Result<DataFrame> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let n = options.rows;

    let mut ids = Vec::with_capacity(n);
    let mut emails = Vec::with_capacity(n);
    let mut amounts = Vec::with_capacity(n);
    let mut dates = Vec::with_capacity(n);
    let mut categories = Vec::with_capacity(n);
    let mut ages = Vec::with_capacity(n);

    for i in 0..n {
        let id = if DUPLICATE_ID_ROWS.contains(&i) {
            1001
        } else {
            1000 + i as i64
        };
        ids.push(id);
        emails.push((!MISSING_EMAIL_ROWS.contains(&i)).then(|| format!("user{i}@example.com")));

        let amount = normal(&mut rng, 100.0, 25.0);
        amounts.push(if i == OUTLIER_ROW { 10_000.0 } else { amount });

        let at = options.start + TimeDelta::hours(i as i64);
        dates.push(at.format("%Y-%m-%d %H:%M:%S").to_string());
        categories.push(CATEGORIES[rng.gen_range(0..CATEGORIES.len())]);
        ages.push(rng.gen_range(18i64..80));
    }

    Ok(df!(
        "customer_id" => ids,
        "email" => emails,
        "purchase_amount" => amounts,
        "purchase_date" => dates,
        "product_category" => categories,
        "customer_age" => ages
    )?)
}

/// Generate the demo dataset and write it as CSV.
pub fn write_demo_dataset(path: &Path, options: &DemoOptions) -> Result<DataFrame> {
    let mut df = demo_dataset(options)?;
    save_csv(&mut df, path)?;
    tracing::info!(rows = df.height(), "Wrote demo dataset to {}", path.display());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_dataset_injects_issues() -> anyhow::Result<()> {
        let df = demo_dataset(&DemoOptions::default())?;
        assert_eq!(df.shape(), (1000, 6));
        assert_eq!(df.column("email")?.null_count(), 11);

        let ids = df.column("customer_id")?.as_materialized_series().i64()?.clone();
        assert_eq!(ids.get(100), Some(1001));
        assert_eq!(ids.get(105), Some(1001));
        assert_eq!(ids.get(106), Some(1106));

        let amounts = df.column("purchase_amount")?.as_materialized_series().f64()?.clone();
        assert_eq!(amounts.get(OUTLIER_ROW), Some(10_000.0));
        Ok(())
    }

    #[test]
    fn test_demo_dataset_is_deterministic() -> anyhow::Result<()> {
        let a = demo_dataset(&DemoOptions::default())?;
        let b = demo_dataset(&DemoOptions::default())?;
        assert!(a.equals_missing(&b));
        Ok(())
    }
}
