//! Closed catalog of code fragments the synthesizer stitches into templates.
//!
//! Python fragments fill the four task bodies of the Airflow and Prefect
//! targets; SQL fragments build the CTE chain of a dbt model. Every fragment
//! is returned unindented and without a trailing newline.

use super::directives::{FillMethod, QualityCheckDirective, TransformDirective};
use super::spec::{EndpointDescriptor, EndpointKind};
use crate::utils::sanitize_identifier;
use std::collections::BTreeMap;

/// How a Python task body receives the previous task's dataframe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// Airflow: pull the upstream return value from XCom
    XCom,
    /// Prefect: the upstream result is passed as `data`
    Argument,
}

impl Handoff {
    fn pull(self, upstream: &str) -> String {
        match self {
            Self::XCom => {
                format!("df = context[\"task_instance\"].xcom_pull(task_ids=\"{upstream}\")")
            }
            Self::Argument => "df = data".to_owned(),
        }
    }
}

fn py_escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Single-quoted Python string literal.
pub fn py_quote(value: &str) -> String {
    format!("'{}'", py_escape(value).replace('\'', "\\'"))
}

/// Text safe to embed in a double-quoted Python string.
fn dq_text(value: &str) -> String {
    py_escape(value).replace('"', "\\\"")
}

/// Text safe to embed in a double-quoted Python f-string.
fn fstring_text(value: &str) -> String {
    dq_text(value).replace('{', "{{").replace('}', "}}")
}

/// Text safe to place after a `#` or `--` line comment.
fn comment_text(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn py_float(v: f64) -> String {
    if v.is_finite() {
        format!("{v}")
    } else if v.is_nan() {
        "float('nan')".to_owned()
    } else if v > 0.0 {
        "float('inf')".to_owned()
    } else {
        "float('-inf')".to_owned()
    }
}

fn py_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| py_quote(s)).collect();
    format!("[{}]", quoted.join(", "))
}

fn is_json_path(path: &str) -> bool {
    path.to_lowercase().ends_with(".json")
}

/// Extraction body for the first task. Returns the dataframe.
pub fn python_extract(source: &EndpointDescriptor) -> String {
    match source.kind {
        EndpointKind::Relational => {
            let connect = match source.setting("connection_string") {
                Some(dsn) => format!("conn = psycopg2.connect({})", py_quote(dsn)),
                None => format!(
                    "conn = psycopg2.connect(\n    host={},\n    database={},\n    user={},\n    password={},\n)",
                    py_quote(source.setting_or("host", "localhost")),
                    py_quote(source.setting_or("database", "")),
                    py_quote(source.setting_or("user", "")),
                    py_quote(source.setting_or("password", "")),
                ),
            };
            format!(
                "import psycopg2\n\n{connect}\n\nquery = {}\ndf = pd.read_sql(query, conn)\nconn.close()\nlogging.info(f\"Extracted {{len(df)}} rows from PostgreSQL\")\nreturn df",
                py_quote(source.setting_or("query", "SELECT * FROM source_table")),
            )
        }
        EndpointKind::FlatFile => {
            let path = source.setting_or("file_path", "");
            let (reader, label) = if is_json_path(path) {
                ("read_json", "JSON")
            } else {
                ("read_csv", "CSV")
            };
            format!(
                "df = pd.{reader}({})\nlogging.info(f\"Extracted {{len(df)}} rows from {label}\")\nreturn df",
                py_quote(path)
            )
        }
        EndpointKind::HttpApi => format!(
            "import requests\n\nresponse = requests.get({})\nresponse.raise_for_status()\ndf = pd.DataFrame(response.json())\nlogging.info(f\"Extracted {{len(df)}} rows from API\")\nreturn df",
            py_quote(source.setting_or("url", ""))
        ),
        EndpointKind::Custom => {
            "# Add your custom extraction logic here\ndf = pd.DataFrame()  # placeholder\nreturn df"
                .to_owned()
        }
    }
}

/// Load body for the last task.
pub fn python_load(destination: &EndpointDescriptor, handoff: Handoff) -> String {
    let pull = handoff.pull("validate_data");
    match destination.kind {
        EndpointKind::Relational => {
            let url = match destination.setting("connection_string") {
                Some(dsn) => dsn.to_owned(),
                None => format!(
                    "postgresql://{}:{}@{}/{}",
                    destination.setting_or("user", ""),
                    destination.setting_or("password", ""),
                    destination.setting_or("host", "localhost"),
                    destination.setting_or("database", ""),
                ),
            };
            format!(
                "from sqlalchemy import create_engine\n\n{pull}\nengine = create_engine({})\ndf.to_sql({}, engine, if_exists='replace', index=False)\nlogging.info(f\"Loaded {{len(df)}} rows to PostgreSQL\")",
                py_quote(&url),
                py_quote(destination.setting_or("table", "processed_data")),
            )
        }
        EndpointKind::FlatFile => {
            let path = destination.setting_or("file_path", "output.csv");
            if is_json_path(path) {
                format!(
                    "{pull}\ndf.to_json({}, orient='records')\nlogging.info(f\"Loaded {{len(df)}} rows to JSON\")",
                    py_quote(path)
                )
            } else {
                format!(
                    "{pull}\ndf.to_csv({}, index=False)\nlogging.info(f\"Loaded {{len(df)}} rows to CSV\")",
                    py_quote(path)
                )
            }
        }
        EndpointKind::HttpApi => format!(
            "import requests\n\n{pull}\nresponse = requests.post({}, json=df.to_dict(orient='records'))\nresponse.raise_for_status()\nlogging.info(f\"Loaded {{len(df)}} rows to API\")",
            py_quote(destination.setting_or("url", ""))
        ),
        EndpointKind::Custom => format!(
            "# Add your custom load logic here\n{pull}\nlogging.info(f\"Custom load logic for {{len(df)}} rows\")"
        ),
    }
}

fn python_fill(column: &str, method: FillMethod) -> String {
    let col = py_quote(column);
    let value = match method {
        FillMethod::Median => format!("df[{col}].median()"),
        FillMethod::Mean => format!("df[{col}].mean()"),
        FillMethod::Mode => format!("df[{col}].mode().iloc[0]"),
        FillMethod::Zero => "0".to_owned(),
    };
    format!(
        "# Handle nulls in {}\ndf[{col}] = df[{col}].fillna({value})",
        comment_text(column)
    )
}

fn python_transform_step(directive: &TransformDirective) -> String {
    match directive {
        TransformDirective::FillNulls { column, method } => python_fill(column, *method),
        TransformDirective::RemoveDuplicates { subset: None } => {
            "# Remove duplicates\ndf = df.drop_duplicates()".to_owned()
        }
        TransformDirective::RemoveDuplicates {
            subset: Some(columns),
        } => format!(
            "# Remove duplicates\ndf = df.drop_duplicates(subset={})",
            py_list(columns)
        ),
        TransformDirective::Filter { condition } => {
            format!(
                "# Filter: {}\ndf = df.query({})",
                comment_text(condition),
                py_quote(condition)
            )
        }
        TransformDirective::Aggregate {
            group_by,
            aggregations,
        } => {
            let aggs: Vec<String> = aggregations
                .iter()
                .map(|(col, func)| format!("{}: {}", py_quote(col), py_quote(func)))
                .collect();
            format!(
                "# Aggregate by {}\ndf = df.groupby({}).agg({{{}}}).reset_index()",
                comment_text(&group_by.join(", ")),
                py_list(group_by),
                aggs.join(", ")
            )
        }
    }
}

/// Transform body: each directive in order, or a single no-op comment.
pub fn python_transform(directives: &[TransformDirective], handoff: Handoff) -> String {
    let mut lines = vec![
        "# Start with the extracted data".to_owned(),
        handoff.pull("extract_data"),
    ];
    if directives.is_empty() {
        lines.push("# No specific transformations needed based on data analysis".to_owned());
    }
    lines.extend(directives.iter().map(python_transform_step));
    lines.push("logging.info(f\"Transformed data: {len(df)} rows\")".to_owned());
    lines.push("return df".to_owned());
    lines.join("\n")
}

fn python_check(check: &QualityCheckDirective) -> String {
    let column = check.column();
    let col = py_quote(column);
    let text = fstring_text(column);
    let note = comment_text(column);
    match check {
        QualityCheckDirective::EmailValidation { .. } => format!(
            "# Validate email format in {note}\nemail_valid = df[{col}].str.contains('@', na=False)\nif not email_valid.all():\n    logging.warning(f\"Found {{(~email_valid).sum()}} invalid emails in {text}\")"
        ),
        QualityCheckDirective::Unique { .. } => format!(
            "# Check for unique identifiers in {note}\nif df[{col}].nunique() != len(df):\n    logging.warning(\"Non-unique identifiers found in {}\")",
            dq_text(column)
        ),
        QualityCheckDirective::NotNull { .. } => format!(
            "# Check for nulls in {note}\nnull_count = df[{col}].isnull().sum()\nif null_count > 0:\n    raise ValueError(f\"Found {{null_count}} null values in {text}\")"
        ),
        QualityCheckDirective::Range { min, max, .. } => format!(
            "# Validate range for {note}\nout_of_range = df[(df[{col}] < {}) | (df[{col}] > {})].shape[0]\nif out_of_range > 0:\n    raise ValueError(f\"Found {{out_of_range}} values out of range in {text}\")",
            py_float(*min),
            py_float(*max)
        ),
    }
}

/// Validation body: email / unique checks warn, not-null / range checks raise.
pub fn python_validate(checks: &[QualityCheckDirective], handoff: Handoff) -> String {
    let mut lines = vec![
        "# Start with the transformed data".to_owned(),
        handoff.pull("transform_data"),
    ];
    if checks.is_empty() {
        lines.push("# No specific validations configured".to_owned());
    }
    lines.extend(checks.iter().map(python_check));
    lines.push("logging.info('Data validation completed successfully')".to_owned());
    lines.push("return df".to_owned());
    lines.join("\n")
}

/// Double-quoted SQL identifier.
pub fn sql_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// dbt relation call (without the surrounding braces) the model reads from,
/// plus an optional setup note.
pub fn sql_source_relation(source: &EndpointDescriptor) -> (String, Option<String>) {
    match source.kind {
        EndpointKind::Relational => (
            format!(
                "source({}, {})",
                sql_literal(source.setting_or("schema", "public")),
                sql_literal(source.setting_or("table", "source_table"))
            ),
            None,
        ),
        EndpointKind::FlatFile => {
            let path = source.setting_or("file_path", "source_table");
            let stem = std::path::Path::new(path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(path);
            let seed = sanitize_identifier(stem);
            (
                format!("ref({})", sql_literal(&seed)),
                Some(format!(
                    "-- Load {} as a dbt seed named {seed}",
                    comment_text(path)
                )),
            )
        }
        EndpointKind::HttpApi | EndpointKind::Custom => (
            "source('public', 'source_table')".to_owned(),
            Some(format!(
                "-- Declare a dbt source for the {} endpoint",
                source.kind
            )),
        ),
    }
}

/// Body of the `source_data` CTE.
pub fn sql_extract(source: &EndpointDescriptor) -> String {
    let (relation, note) = sql_source_relation(source);
    let select = format!("SELECT *\nFROM {{{{ {relation} }}}}");
    match note {
        Some(note) => format!("{note}\n{select}"),
        None => select,
    }
}

fn sql_fill_expr(column: &str, method: FillMethod, upstream: &str) -> String {
    let col = sql_ident(column);
    let value = match method {
        FillMethod::Median => format!(
            "(SELECT PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY {col}) FROM {upstream})"
        ),
        FillMethod::Mean => format!("(SELECT AVG({col}) FROM {upstream})"),
        FillMethod::Mode => {
            format!("(SELECT MODE() WITHIN GROUP (ORDER BY {col}) FROM {upstream})")
        }
        FillMethod::Zero => "0".to_owned(),
    };
    format!("COALESCE({col}, {value}) AS {col}")
}

fn sql_aggregate_alias(column: &str, func: &str) -> String {
    format!("{column}_{}", func.to_lowercase())
}

fn sql_aggregate_expr(column: &str, func: &str) -> String {
    let col = sql_ident(column);
    let expr = match func.to_lowercase().as_str() {
        "mean" | "avg" => format!("AVG({col})"),
        "median" => format!("PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY {col})"),
        "nunique" => format!("COUNT(DISTINCT {col})"),
        other => format!("{}({col})", other.to_uppercase()),
    };
    format!("{expr} AS {}", sql_ident(&sql_aggregate_alias(column, func)))
}

/// One common table expression of a dbt model.
#[derive(Debug, Clone, serde::Serialize, PartialEq, Eq)]
pub struct Cte {
    pub name: String,
    /// Unindented body
    pub body: String,
}

/// Columns visible at the current end of the chain.
enum Columns {
    /// Whatever the source relation has
    Source(String),
    /// Named explicitly, after a grouping
    Known(Vec<String>),
}

/// Directives that fit in one `SELECT`: `WHERE` applies before the select
/// list and `DISTINCT` after it.
#[derive(Default)]
struct Stage<'a> {
    conditions: Vec<String>,
    fills: Vec<(&'a str, FillMethod)>,
    distinct: Option<Option<&'a [String]>>,
}

impl<'a> Stage<'a> {
    fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.fills.is_empty() && self.distinct.is_none()
    }

    fn accepts(&self, directive: &TransformDirective) -> bool {
        match directive {
            TransformDirective::Filter { .. } => self.fills.is_empty() && self.distinct.is_none(),
            TransformDirective::FillNulls { column, .. } => {
                self.conditions.is_empty()
                    && self.distinct.is_none()
                    && !self.fills.iter().any(|(c, _)| *c == column.as_str())
            }
            TransformDirective::RemoveDuplicates { .. } => self.distinct.is_none(),
            TransformDirective::Aggregate { .. } => false,
        }
    }

    fn add(&mut self, directive: &'a TransformDirective) {
        match directive {
            TransformDirective::Filter { condition } => {
                self.conditions.push(format!("({})", condition.replace("==", "=")));
            }
            TransformDirective::FillNulls { column, method } => {
                self.fills.push((column.as_str(), *method));
            }
            TransformDirective::RemoveDuplicates { subset } => {
                self.distinct = Some(subset.as_deref());
            }
            TransformDirective::Aggregate { .. } => {}
        }
    }

    fn render(&self, upstream: &str, columns: &Columns) -> String {
        let select = match self.distinct {
            None => "SELECT".to_owned(),
            Some(None) => "SELECT DISTINCT".to_owned(),
            Some(Some(subset)) => {
                let keys: Vec<String> = subset.iter().map(|c| sql_ident(c)).collect();
                format!("SELECT DISTINCT ON ({})", keys.join(", "))
            }
        };

        let fill = |column: &str| {
            self.fills
                .iter()
                .find(|(c, _)| *c == column)
                .map(|(c, m)| sql_fill_expr(c, *m, upstream))
        };
        let selected = match columns {
            _ if self.fills.is_empty() => vec!["*".to_owned()],
            Columns::Source(relation) => {
                let except: Vec<String> = self.fills.iter().map(|(c, _)| format!("\"{c}\"")).collect();
                let mut out = vec![format!(
                    "{{{{ dbt_utils.star(from={relation}, except=[{}]) }}}}",
                    except.join(", ")
                )];
                out.extend(self.fills.iter().map(|(c, m)| sql_fill_expr(c, *m, upstream)));
                out
            }
            Columns::Known(names) => {
                let mut out: Vec<String> = names
                    .iter()
                    .map(|name| fill(name).unwrap_or_else(|| sql_ident(name)))
                    .collect();
                out.extend(
                    self.fills
                        .iter()
                        .filter(|(c, _)| !names.iter().any(|n| n.as_str() == *c))
                        .map(|(c, m)| sql_fill_expr(c, *m, upstream)),
                );
                out
            }
        };

        let mut body = format!("{select}\n    {}\nFROM {upstream}", selected.join(",\n    "));
        if !self.conditions.is_empty() {
            body.push_str("\nWHERE ");
            body.push_str(&self.conditions.join("\n  AND "));
        }
        body
    }
}

struct Chain {
    ctes: Vec<Cte>,
    columns: Columns,
    cleaned: usize,
    aggregated: usize,
}

impl Chain {
    fn upstream(&self) -> &str {
        self.ctes.last().map_or("source_data", |c| c.name.as_str())
    }

    fn push_stage(&mut self, stage: Stage<'_>) {
        if stage.is_empty() {
            return;
        }
        self.cleaned += 1;
        let name = match self.cleaned {
            1 => "cleaned_data".to_owned(),
            n => format!("cleaned_data_{n}"),
        };
        let body = stage.render(self.upstream(), &self.columns);
        self.ctes.push(Cte { name, body });
    }

    fn push_aggregate(&mut self, group_by: &[String], aggregations: &BTreeMap<String, String>) {
        self.aggregated += 1;
        let keys: Vec<String> = group_by.iter().map(|c| sql_ident(c)).collect();
        let mut selected = keys.clone();
        selected.extend(aggregations.iter().map(|(c, f)| sql_aggregate_expr(c, f)));
        let body = format!(
            "SELECT\n    {}\nFROM {}\nGROUP BY {}",
            selected.join(",\n    "),
            self.upstream(),
            keys.join(", ")
        );
        self.ctes.push(Cte {
            name: format!("aggregated_{}", self.aggregated),
            body,
        });

        let mut known = group_by.to_vec();
        known.extend(aggregations.iter().map(|(c, f)| sql_aggregate_alias(c, f)));
        self.columns = Columns::Known(known);
    }
}

/// CTEs after `source_data`, one per run of directives that a single
/// `SELECT` can express, in directive order. Each aggregation is its own
/// grouped CTE.
pub fn sql_transform(source: &EndpointDescriptor, directives: &[TransformDirective]) -> Vec<Cte> {
    if directives.is_empty() {
        return vec![Cte {
            name: "cleaned_data".to_owned(),
            body: "-- No specific transformations needed based on data analysis\nSELECT *\nFROM source_data"
                .to_owned(),
        }];
    }

    let (relation, _) = sql_source_relation(source);
    let mut chain = Chain {
        ctes: Vec::new(),
        columns: Columns::Source(relation),
        cleaned: 0,
        aggregated: 0,
    };
    let mut stage = Stage::default();
    for directive in directives {
        if !stage.accepts(directive) {
            chain.push_stage(std::mem::take(&mut stage));
        }
        match directive {
            TransformDirective::Aggregate {
                group_by,
                aggregations,
            } => chain.push_aggregate(group_by, aggregations),
            _ => stage.add(directive),
        }
    }
    chain.push_stage(stage);
    chain.ctes
}

/// Trailing comment block listing the checks to declare as dbt tests.
pub fn sql_validate(checks: &[QualityCheckDirective]) -> String {
    if checks.is_empty() {
        return "-- No specific validations configured".to_owned();
    }
    let mut lines = vec!["-- Quality checks to declare as dbt tests:".to_owned()];
    lines.extend(
        checks
            .iter()
            .map(|c| format!("--   {}: {}", c.kind(), comment_text(&c.describe()))),
    );
    lines.join("\n")
}

/// Materialization settings derived from the destination.
#[derive(Debug, Clone, Default, serde::Serialize, PartialEq, Eq)]
pub struct DbtTarget {
    pub schema: Option<String>,
    pub alias: Option<String>,
    pub note: Option<String>,
}

pub fn sql_load(destination: &EndpointDescriptor) -> DbtTarget {
    match destination.kind {
        EndpointKind::Relational => DbtTarget {
            schema: destination.setting("schema").map(str::to_owned),
            alias: destination.setting("table").map(str::to_owned),
            note: None,
        },
        EndpointKind::FlatFile | EndpointKind::HttpApi | EndpointKind::Custom => {
            let location = destination
                .setting("file_path")
                .or_else(|| destination.setting("url"))
                .unwrap_or("unspecified location");
            DbtTarget {
                note: Some(format!(
                    "-- Destination {} ({}) is written outside dbt",
                    destination.kind,
                    comment_text(location)
                )),
                ..DbtTarget::default()
            }
        }
    }
}

/// Indent every non-blank line by `spaces`.
pub fn indent_block(code: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    code.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn test_py_quote_escapes() {
        assert_eq!(py_quote("plain"), "'plain'");
        assert_eq!(py_quote("it's"), "'it\\'s'");
    }

    #[test]
    fn test_indent_block_skips_blank_lines() {
        assert_eq!(indent_block("a\n\n  b", 4), "    a\n\n      b");
    }

    #[test]
    fn test_empty_transform_gets_single_placeholder() {
        let body = python_transform(&[], Handoff::XCom);
        assert_eq!(
            body,
            "# Start with the extracted data\n\
             df = context[\"task_instance\"].xcom_pull(task_ids=\"extract_data\")\n\
             # No specific transformations needed based on data analysis\n\
             logging.info(f\"Transformed data: {len(df)} rows\")\n\
             return df"
        );
    }

    #[test]
    fn test_transform_fragments_follow_directive_order() {
        let directives = vec![
            TransformDirective::RemoveDuplicates { subset: None },
            TransformDirective::FillNulls {
                column: "age".to_owned(),
                method: FillMethod::Median,
            },
        ];
        let body = python_transform(&directives, Handoff::Argument);
        let dedupe = body.find("df = df.drop_duplicates()").expect("dedupe");
        let fill = body
            .find("df['age'] = df['age'].fillna(df['age'].median())")
            .expect("fill");
        assert!(dedupe < fill);
        assert!(body.contains("df = data"));
    }

    #[test]
    fn test_validation_fragments() {
        let checks = vec![
            QualityCheckDirective::EmailValidation {
                column: "email".to_owned(),
            },
            QualityCheckDirective::Range {
                column: "age".to_owned(),
                min: 18.0,
                max: 99.5,
            },
        ];
        let body = python_validate(&checks, Handoff::XCom);
        assert!(body.contains("email_valid = df['email'].str.contains('@', na=False)"));
        assert!(body.contains("logging.warning(f\"Found {(~email_valid).sum()} invalid emails in email\")"));
        assert!(body.contains("df[(df['age'] < 18) | (df['age'] > 99.5)]"));
        assert!(body.contains("raise ValueError"));
    }

    #[test]
    fn test_extract_catalog() {
        let csv = EndpointDescriptor::new(EndpointKind::FlatFile).with("file_path", "in.csv");
        assert!(python_extract(&csv).starts_with("df = pd.read_csv('in.csv')"));

        let json = EndpointDescriptor::new(EndpointKind::FlatFile).with("file_path", "in.json");
        assert!(python_extract(&json).contains("pd.read_json('in.json')"));

        let api = EndpointDescriptor::new(EndpointKind::HttpApi).with("url", "https://x.test/items");
        assert!(python_extract(&api).contains("requests.get('https://x.test/items')"));

        let db = EndpointDescriptor::new(EndpointKind::Relational).with("database", "sales");
        let code = python_extract(&db);
        assert!(code.contains("psycopg2.connect("));
        assert!(code.contains("database='sales'"));

        let custom = EndpointDescriptor::new(EndpointKind::Custom);
        assert!(python_extract(&custom).contains("placeholder"));
    }

    #[test]
    fn test_load_catalog() {
        let db = EndpointDescriptor::new(EndpointKind::Relational)
            .with("host", "localhost")
            .with("database", "analytics")
            .with("table", "processed_customers");
        let code = python_load(&db, Handoff::XCom);
        assert!(code.contains("create_engine('postgresql://:@localhost/analytics')"));
        assert!(code.contains("df.to_sql('processed_customers'"));
        assert!(code.contains("xcom_pull(task_ids=\"validate_data\")"));

        let csv = EndpointDescriptor::default();
        assert!(python_load(&csv, Handoff::Argument).contains("df.to_csv('output.csv', index=False)"));
    }

    #[test]
    fn test_sql_stages_follow_directive_order() {
        let source = EndpointDescriptor::new(EndpointKind::Relational)
            .with("schema", "raw")
            .with("table", "customers");
        let directives = vec![
            TransformDirective::FillNulls {
                column: "age".to_owned(),
                method: FillMethod::Median,
            },
            TransformDirective::RemoveDuplicates { subset: None },
            TransformDirective::Filter {
                condition: "age > 0".to_owned(),
            },
        ];
        let ctes = sql_transform(&source, &directives);
        assert_eq!(
            ctes,
            vec![
                Cte {
                    name: "cleaned_data".to_owned(),
                    body: "SELECT DISTINCT\n    \
                           {{ dbt_utils.star(from=source('raw', 'customers'), except=[\"age\"]) }},\n    \
                           COALESCE(\"age\", (SELECT PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY \"age\") FROM source_data)) AS \"age\"\n\
                           FROM source_data"
                        .to_owned(),
                },
                Cte {
                    name: "cleaned_data_2".to_owned(),
                    body: "SELECT\n    *\nFROM cleaned_data\nWHERE (age > 0)".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn test_sql_filters_share_a_where_clause() {
        let directives = vec![
            TransformDirective::Filter {
                condition: "status == 'active'".to_owned(),
            },
            TransformDirective::Filter {
                condition: "age > 0".to_owned(),
            },
            TransformDirective::RemoveDuplicates {
                subset: Some(vec!["email".to_owned()]),
            },
        ];
        let ctes = sql_transform(&EndpointDescriptor::default(), &directives);
        assert_eq!(ctes.len(), 1);
        assert_eq!(
            ctes[0].body,
            "SELECT DISTINCT ON (\"email\")\n    *\nFROM source_data\nWHERE (status = 'active')\n  AND (age > 0)"
        );
    }

    #[test]
    fn test_sql_aggregate_chain() {
        let directives = vec![TransformDirective::Aggregate {
            group_by: vec!["region".to_owned()],
            aggregations: BTreeMap::from([("amount".to_owned(), "mean".to_owned())]),
        }];
        let ctes = sql_transform(&EndpointDescriptor::default(), &directives);
        assert_eq!(ctes.len(), 1);
        assert_eq!(ctes[0].name, "aggregated_1");
        assert!(ctes[0].body.contains("AVG(\"amount\") AS \"amount_mean\""));
        assert!(ctes[0].body.contains("FROM source_data"));
        assert!(ctes[0].body.ends_with("GROUP BY \"region\""));
    }

    #[test]
    fn test_sql_steps_after_aggregate_read_its_output() {
        let directives = vec![
            TransformDirective::Aggregate {
                group_by: vec!["region".to_owned()],
                aggregations: BTreeMap::from([("amount".to_owned(), "sum".to_owned())]),
            },
            TransformDirective::Filter {
                condition: "amount_sum > 100".to_owned(),
            },
            TransformDirective::FillNulls {
                column: "amount_sum".to_owned(),
                method: FillMethod::Zero,
            },
        ];
        let ctes = sql_transform(&EndpointDescriptor::default(), &directives);
        let names: Vec<&str> = ctes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["aggregated_1", "cleaned_data", "cleaned_data_2"]);
        assert_eq!(
            ctes[1].body,
            "SELECT\n    *\nFROM aggregated_1\nWHERE (amount_sum > 100)"
        );
        assert_eq!(
            ctes[2].body,
            "SELECT\n    \"region\",\n    COALESCE(\"amount_sum\", 0) AS \"amount_sum\"\nFROM cleaned_data"
        );
    }

    #[test]
    fn test_sql_repeated_dedupes_are_kept() {
        let directives = vec![
            TransformDirective::RemoveDuplicates {
                subset: Some(vec!["email".to_owned()]),
            },
            TransformDirective::RemoveDuplicates { subset: None },
        ];
        let ctes = sql_transform(&EndpointDescriptor::default(), &directives);
        assert_eq!(ctes.len(), 2);
        assert_eq!(ctes[0].body, "SELECT DISTINCT ON (\"email\")\n    *\nFROM source_data");
        assert_eq!(ctes[1].body, "SELECT DISTINCT\n    *\nFROM cleaned_data");
    }

    #[test]
    fn test_sql_empty_transform_gets_placeholder() {
        let ctes = sql_transform(&EndpointDescriptor::default(), &[]);
        assert_eq!(
            ctes,
            vec![Cte {
                name: "cleaned_data".to_owned(),
                body: "-- No specific transformations needed based on data analysis\nSELECT *\nFROM source_data"
                    .to_owned(),
            }]
        );
    }

    #[test]
    fn test_line_breaks_stay_out_of_comments() {
        let directives = vec![
            TransformDirective::FillNulls {
                column: "age\nimport os".to_owned(),
                method: FillMethod::Zero,
            },
            TransformDirective::Filter {
                condition: "age > 0\r\nos.remove('x')".to_owned(),
            },
        ];
        let body = python_transform(&directives, Handoff::Argument);
        assert!(body.contains("# Handle nulls in age import os\n"));
        assert!(body.contains("# Filter: age > 0  os.remove('x')\n"));
        assert!(!body.lines().any(|line| line.starts_with("import os")));
        assert!(!body.lines().any(|line| line.starts_with("os.remove")));

        let checks = vec![QualityCheckDirective::NotNull {
            column: "id\nraise SystemExit".to_owned(),
        }];
        let body = python_validate(&checks, Handoff::Argument);
        assert!(body.contains("# Check for nulls in id raise SystemExit\n"));
        assert!(body.contains("df['id\\nraise SystemExit']"));
        assert!(!body.lines().any(|line| line.starts_with("raise SystemExit")));

        let sql = sql_validate(&checks);
        assert_eq!(sql.lines().count(), 2);
    }

    #[test]
    fn test_sql_flat_file_source_is_seed() {
        let source = EndpointDescriptor::from_data_source("data/Customer Data.csv");
        assert_eq!(
            sql_extract(&source),
            "-- Load data/Customer Data.csv as a dbt seed named customer_data\nSELECT *\nFROM {{ ref('customer_data') }}"
        );
    }
}
