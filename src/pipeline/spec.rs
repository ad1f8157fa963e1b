//! Pipeline specification data structures.
//!
//! A [`PipelineSpec`] is what the registry persists and what the code
//! synthesizer renders: where data comes from and goes to, which framework
//! runs it, on what schedule, and the directives applied in between.

use super::directives::{QualityCheckDirective, TransformDirective};
use crate::analyser::quality::Freshness;
use crate::error::{PipesmithError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Current pipeline spec version
pub const SPEC_VERSION: &str = "0.1";

pub const DEFAULT_SCHEDULE: &str = "@daily";

/// Root pipeline specification structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSpec {
    /// Specification version for future migrations
    #[serde(default = "default_version")]
    pub version: String,

    /// Unique registry key
    pub name: String,

    pub source: EndpointDescriptor,

    pub destination: EndpointDescriptor,

    /// Cron preset (`@hourly`, `@daily`, `@weekly`) or cron expression
    pub schedule: String,

    pub framework: Framework,

    /// Applied in order between extraction and validation
    #[serde(default)]
    pub transformations: Vec<TransformDirective>,

    #[serde(default)]
    pub quality_checks: Vec<QualityCheckDirective>,

    /// Also used as the generation timestamp of rendered artifacts
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub state: LifecycleState,
}

impl PipelineSpec {
    /// Create an empty spec in the [`LifecycleState::Created`] state.
    pub fn new(
        name: impl Into<String>,
        framework: Framework,
        source: EndpointDescriptor,
        destination: EndpointDescriptor,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            version: default_version(),
            name: name.into(),
            source,
            destination,
            schedule: DEFAULT_SCHEDULE.to_owned(),
            framework,
            transformations: Vec::new(),
            quality_checks: Vec::new(),
            created_at,
            state: LifecycleState::Created,
        }
    }

    /// Load a pipeline spec from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse a pipeline spec from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize pipeline spec to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize pipeline spec to YAML, as shipped in `pipeline.yaml`
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Python / SQL safe variant of [`PipelineSpec::name`]
    pub fn identifier(&self) -> String {
        crate::utils::sanitize_identifier(&self.name)
    }
}

fn default_version() -> String {
    SPEC_VERSION.to_owned()
}

/// Execution framework the artifacts are rendered for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Airflow,
    Dbt,
    Prefect,
}

impl Framework {
    pub const ALL: [Self; 3] = [Self::Airflow, Self::Dbt, Self::Prefect];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Airflow => "airflow",
            Self::Dbt => "dbt",
            Self::Prefect => "prefect",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = PipesmithError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "airflow" => Ok(Self::Airflow),
            "dbt" => Ok(Self::Dbt),
            "prefect" => Ok(Self::Prefect),
            _ => Err(PipesmithError::UnsupportedFramework(s.to_owned())),
        }
    }
}

/// Broad category of a data source or destination
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum EndpointKind {
    Relational,
    FlatFile,
    HttpApi,
    Custom,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::FlatFile => "flat-file",
            Self::HttpApi => "http-api",
            Self::Custom => "custom",
        }
    }

    /// Accepts canonical names and the common aliases; never fails.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "relational" | "postgresql" | "postgres" | "database" => Self::Relational,
            "flat-file" | "csv" | "json" | "file" => Self::FlatFile,
            "http-api" | "api" | "http" => Self::HttpApi,
            _ => Self::Custom,
        }
    }
}

impl From<String> for EndpointKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<EndpointKind> for String {
    fn from(kind: EndpointKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source or destination of a pipeline: a kind plus free-form settings
/// (`host`, `database`, `table`, `file_path`, `url`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointDescriptor {
    pub kind: EndpointKind,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl EndpointDescriptor {
    pub fn new(kind: EndpointKind) -> Self {
        Self {
            kind,
            settings: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Describe the dataset a pipeline was created from. Files become
    /// flat-file sources, anything else a relational connection string.
    pub fn from_data_source(data_source: &str) -> Self {
        let lowered = data_source.to_lowercase();
        if lowered.ends_with(".csv") || lowered.ends_with(".json") {
            Self::new(EndpointKind::FlatFile).with("file_path", data_source)
        } else {
            Self::new(EndpointKind::Relational).with("connection_string", data_source)
        }
    }

    /// Build from `key=value` settings; the `type` key picks the kind and
    /// defaults to a flat file.
    pub fn from_settings(mut settings: BTreeMap<String, String>) -> Self {
        let kind = settings
            .remove("type")
            .map_or(EndpointKind::FlatFile, |t| EndpointKind::parse(&t));
        Self { kind, settings }
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    pub fn setting_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.setting(key).unwrap_or(default)
    }
}

impl Default for EndpointDescriptor {
    /// `output.csv` in the working directory
    fn default() -> Self {
        Self::new(EndpointKind::FlatFile).with("file_path", "output.csv")
    }
}

/// Position of a registered spec in its lifecycle. Deletion is terminal and
/// has no state: the entry is simply gone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Built but not yet registered
    #[default]
    Created,
    /// Registered
    Active,
    /// Modified at least once after registration
    Updated,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Updated => "updated",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Changes allowed on a registered spec. Omitted fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineUpdate {
    pub schedule: Option<String>,
    pub transformations: Option<Vec<TransformDirective>>,
    pub quality_checks: Option<Vec<QualityCheckDirective>>,
}

impl PipelineUpdate {
    pub fn is_empty(&self) -> bool {
        self.schedule.is_none() && self.transformations.is_none() && self.quality_checks.is_none()
    }

    /// Apply to `spec` and mark it [`LifecycleState::Updated`].
    pub fn apply(self, spec: &mut PipelineSpec) {
        if let Some(schedule) = self.schedule {
            spec.schedule = schedule;
        }
        if let Some(transformations) = self.transformations {
            spec.transformations = transformations;
        }
        if let Some(quality_checks) = self.quality_checks {
            spec.quality_checks = quality_checks;
        }
        spec.state = LifecycleState::Updated;
    }
}

/// Pick a schedule from how stale the dataset's date columns are.
///
/// Mean age of at most a day runs hourly, at most `window_days` daily,
/// anything older weekly. Datasets without date columns run daily.
pub fn schedule_from_freshness(freshness: &BTreeMap<String, Freshness>, window_days: i64) -> String {
    if freshness.is_empty() {
        return DEFAULT_SCHEDULE.to_owned();
    }
    let mean_age = freshness.values().map(|f| f.days_old as f64).sum::<f64>() / freshness.len() as f64;

    let schedule = if mean_age <= 1.0 {
        "@hourly"
    } else if mean_age <= window_days as f64 {
        "@daily"
    } else {
        "@weekly"
    };
    schedule.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::quality::FreshnessStatus;
    use crate::pipeline::directives::FillMethod;
    use chrono::TimeZone as _;

    fn sample_spec() -> PipelineSpec {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let mut spec = PipelineSpec::new(
            "customer_analytics",
            Framework::Airflow,
            EndpointDescriptor::from_data_source("customers.csv"),
            EndpointDescriptor::new(EndpointKind::Relational)
                .with("host", "localhost")
                .with("table", "processed_customers"),
            created,
        );
        spec.transformations.push(TransformDirective::FillNulls {
            column: "age".to_owned(),
            method: FillMethod::Median,
        });
        spec.quality_checks.push(QualityCheckDirective::Unique {
            column: "customer_id".to_owned(),
        });
        spec
    }

    #[test]
    fn test_spec_serialization() {
        let spec = sample_spec();

        let json = spec.to_json().expect("Failed to serialize");
        assert!(json.contains("\"version\": \"0.1\""));
        assert!(json.contains("\"type\": \"fill_nulls\""));
        assert!(json.contains("\"kind\": \"flat-file\""));
        assert!(json.contains("\"state\": \"created\""));

        let parsed = PipelineSpec::from_json(&json).expect("Failed to parse");
        assert_eq!(parsed, spec);
        assert_eq!(parsed.created_at, spec.created_at);
    }

    #[test]
    fn test_yaml_contains_directives() {
        let yaml = sample_spec().to_yaml().expect("yaml");
        assert!(yaml.contains("name: customer_analytics"));
        assert!(yaml.contains("type: unique"));
    }

    #[test]
    fn test_framework_parsing() {
        assert_eq!("Airflow".parse::<Framework>().unwrap(), Framework::Airflow);
        assert_eq!(" dbt ".parse::<Framework>().unwrap(), Framework::Dbt);
        let err = "luigi".parse::<Framework>().unwrap_err();
        assert!(matches!(err, PipesmithError::UnsupportedFramework(name) if name == "luigi"));
    }

    #[test]
    fn test_endpoint_aliases() {
        for (alias, kind) in [
            ("postgresql", EndpointKind::Relational),
            ("Postgres", EndpointKind::Relational),
            ("database", EndpointKind::Relational),
            ("csv", EndpointKind::FlatFile),
            ("json", EndpointKind::FlatFile),
            ("file", EndpointKind::FlatFile),
            ("api", EndpointKind::HttpApi),
            ("http", EndpointKind::HttpApi),
            ("s3", EndpointKind::Custom),
        ] {
            assert_eq!(EndpointKind::parse(alias), kind, "{alias}");
        }

        let parsed: EndpointDescriptor =
            serde_json::from_str(r#"{"kind": "postgresql", "settings": {"host": "db"}}"#).unwrap();
        assert_eq!(parsed.kind, EndpointKind::Relational);
        assert_eq!(parsed.setting("host"), Some("db"));
    }

    #[test]
    fn test_endpoint_from_settings() {
        let settings = BTreeMap::from([
            ("type".to_owned(), "postgresql".to_owned()),
            ("table".to_owned(), "orders".to_owned()),
        ]);
        let endpoint = EndpointDescriptor::from_settings(settings);
        assert_eq!(endpoint.kind, EndpointKind::Relational);
        assert_eq!(endpoint.setting("type"), None);
        assert_eq!(endpoint.setting_or("host", "localhost"), "localhost");

        let database = EndpointDescriptor::from_data_source("postgresql://db/sales");
        assert_eq!(database.kind, EndpointKind::Relational);
    }

    #[test]
    fn test_update_touches_only_given_fields() {
        let mut spec = sample_spec();
        PipelineUpdate {
            schedule: Some("@hourly".to_owned()),
            ..PipelineUpdate::default()
        }
        .apply(&mut spec);

        assert_eq!(spec.schedule, "@hourly");
        assert_eq!(spec.transformations.len(), 1);
        assert_eq!(spec.quality_checks.len(), 1);
        assert_eq!(spec.state, LifecycleState::Updated);
    }

    fn freshness(days_old: i64) -> Freshness {
        Freshness {
            latest_date: Utc::now().naive_utc(),
            days_old,
            status: FreshnessStatus::Fresh,
        }
    }

    #[test]
    fn test_schedule_from_freshness() {
        let empty = BTreeMap::new();
        assert_eq!(schedule_from_freshness(&empty, 7), "@daily");

        let recent = BTreeMap::from([("a_date".to_owned(), freshness(0))]);
        assert_eq!(schedule_from_freshness(&recent, 7), "@hourly");

        let mixed = BTreeMap::from([
            ("a_date".to_owned(), freshness(2)),
            ("b_date".to_owned(), freshness(10)),
        ]);
        assert_eq!(schedule_from_freshness(&mixed, 7), "@daily");

        let old = BTreeMap::from([("a_date".to_owned(), freshness(30))]);
        assert_eq!(schedule_from_freshness(&old, 7), "@weekly");
    }
}
