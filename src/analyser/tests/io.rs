use crate::analyser::io::{load_dataset, save_csv};
use crate::error::PipesmithError;
use anyhow::Result;
use polars::prelude::*;

#[test]
fn test_load_csv_infers_types() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("orders.csv");
    std::fs::write(&path, "order_id,amount,region\n1,10.5,north\n2,20.0,south\n3,,east\n")?;

    let df = load_dataset(&path)?;
    assert_eq!(df.shape(), (3, 3));
    assert_eq!(df.column("amount")?.dtype(), &DataType::Float64);
    assert_eq!(df.column("amount")?.null_count(), 1);
    assert_eq!(df.column("region")?.dtype(), &DataType::String);
    Ok(())
}

#[test]
fn test_load_json_array_of_records() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("events.JSON");
    std::fs::write(
        &path,
        r#"[{"id": 1, "kind": "click"}, {"id": 2, "kind": "view"}]"#,
    )?;

    let df = load_dataset(&path)?;
    assert_eq!(df.height(), 2);
    assert!(df.column("kind").is_ok());
    Ok(())
}

#[test]
fn test_unsupported_extension_is_typed_error() {
    let err = load_dataset(std::path::Path::new("report.xlsx")).unwrap_err();
    assert!(matches!(err, PipesmithError::UnsupportedSourceFormat(src) if src == "report.xlsx"));
}

#[test]
fn test_missing_csv_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_dataset(&dir.path().join("absent.csv"));
    assert!(result.is_err());
}

#[test]
fn test_save_csv_creates_parent_and_reloads() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("out.csv");
    let mut df = df!("a" => &[1i64, 2, 3], "b" => &["x", "y", "z"])?;

    save_csv(&mut df, &path)?;
    assert!(path.exists());

    let back = load_dataset(&path)?;
    assert_eq!(back.shape(), (3, 2));
    assert_eq!(back.column("b")?.as_materialized_series().str()?.get(2), Some("z"));
    Ok(())
}
