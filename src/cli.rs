use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use pipesmith::config::Settings;
use pipesmith::demo::{DEMO_FILE, DEMO_PIPELINE, DemoOptions, write_demo_dataset};
use pipesmith::pipeline::{
    EndpointDescriptor, EndpointKind, Framework, PipelineRegistry, PipelineUpdate, write_bundle,
};
use pipesmith::service::PipelineService;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "pipesmith",
    about = "Profile datasets and generate Airflow, dbt or Prefect pipelines"
)]
pub struct Cli {
    /// Settings file. Defaults to the per-user config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Registry file, overriding the settings
    #[arg(long, global = true, env = "PIPESMITH_REGISTRY")]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyse a dataset, register a pipeline and generate its code
    Create {
        /// CSV or JSON file to analyse
        data_source: PathBuf,

        /// Pipeline name
        #[arg(short, long)]
        name: String,

        /// Target framework: airflow, dbt or prefect
        #[arg(short, long, default_value = "airflow", value_parser = parse_framework)]
        framework: Framework,

        /// Destination setting as key=value. Repeatable; `type` selects the kind.
        #[arg(short, long = "destination", value_parser = parse_key_val)]
        destination: Vec<(String, String)>,

        /// Directory to write the generated artifacts into
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Run a pipeline's quality checks against a dataset
    Validate {
        name: String,
        data_path: PathBuf,
    },
    /// Show a registered pipeline
    Status { name: String },
    /// List registered pipelines
    List,
    /// Change a pipeline's schedule, transformations or quality checks
    Update {
        name: String,

        /// New cron expression or preset
        #[arg(long)]
        schedule: Option<String>,

        /// JSON file holding the replacement transformation list
        #[arg(long)]
        transformations: Option<PathBuf>,

        /// JSON file holding the replacement quality-check list
        #[arg(long)]
        quality_checks: Option<PathBuf>,
    },
    /// Remove a pipeline from the registry
    Delete { name: String },
    /// Print Markdown documentation for a pipeline
    Docs {
        name: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Regenerate the artifacts of a registered pipeline
    Render {
        name: String,

        /// Directory to write into. Prints the bundle as JSON when omitted.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Generate the sample dataset and build a pipeline from it
    Demo {
        /// Where to write the sample CSV
        #[arg(long, default_value = DEMO_FILE)]
        data: PathBuf,

        #[arg(long, default_value_t = 1000)]
        rows: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(short, long, default_value = "airflow", value_parser = parse_framework)]
        framework: Framework,

        /// Directory for the generated artifacts
        #[arg(short, long, default_value = "generated")]
        out: PathBuf,
    },
}

fn parse_framework(s: &str) -> Result<Framework, pipesmith::error::PipesmithError> {
    s.parse()
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_owned(), value.trim().to_owned()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json_list<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn service(cli: &Cli) -> Result<PipelineService> {
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    Ok(match &cli.registry {
        Some(path) => PipelineService::with_registry(
            PipelineRegistry::new(path),
            settings.analysis.clone(),
        ),
        None => PipelineService::new(&settings),
    })
}

#[derive(Serialize)]
struct CreateOutput<'a> {
    name: &'a str,
    framework: Framework,
    schedule: &'a str,
    recommendations: &'a [String],
    artifacts: Vec<&'a str>,
    written: Vec<PathBuf>,
}

pub fn run_command(cli: Cli) -> Result<()> {
    let service = service(&cli)?;

    match cli.command {
        Commands::Create {
            data_source,
            name,
            framework,
            destination,
            out,
        } => handle_create(
            &service,
            &data_source,
            &name,
            framework,
            EndpointDescriptor::from_settings(destination.into_iter().collect()),
            out.as_deref(),
        ),
        Commands::Validate { name, data_path } => {
            let report = service.validate_pipeline(&name, &data_path)?;
            print_json(&report)
        }
        Commands::Status { name } => print_json(&service.status(&name)?),
        Commands::List => print_json(&service.list()?),
        Commands::Update {
            name,
            schedule,
            transformations,
            quality_checks,
        } => {
            let update = PipelineUpdate {
                schedule,
                transformations: transformations
                    .as_deref()
                    .map(read_json_list)
                    .transpose()?,
                quality_checks: quality_checks.as_deref().map(read_json_list).transpose()?,
            };
            if update.is_empty() {
                anyhow::bail!(
                    "Nothing to update: pass --schedule, --transformations or --quality-checks"
                );
            }
            print_json(&service.update(&name, update)?)
        }
        Commands::Delete { name } => {
            let removed = service.delete(&name)?;
            print_json(&serde_json::json!({ "deleted": removed.name }))
        }
        Commands::Docs { name, out } => {
            let markdown = service.documentation(&name)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, markdown)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Documentation written to {}", path.display());
                }
                None => print!("{markdown}"),
            }
            Ok(())
        }
        Commands::Render { name, out } => {
            let bundle = service.render(&name)?;
            match out {
                Some(dir) => print_json(&write_bundle(&bundle, &dir)?),
                None => print_json(&bundle),
            }
        }
        Commands::Demo {
            data,
            rows,
            seed,
            framework,
            out,
        } => handle_demo(&service, &data, rows, seed, framework, &out),
    }
}

fn handle_create(
    service: &PipelineService,
    data_source: &Path,
    name: &str,
    framework: Framework,
    destination: EndpointDescriptor,
    out: Option<&Path>,
) -> Result<()> {
    let created = service
        .create_pipeline(data_source, name, framework, destination)
        .with_context(|| format!("Failed to create pipeline '{name}'"))?;

    let written = match out {
        Some(dir) => write_bundle(&created.artifacts, dir)?,
        None => Vec::new(),
    };

    print_json(&CreateOutput {
        name: &created.spec.name,
        framework: created.spec.framework,
        schedule: &created.spec.schedule,
        recommendations: &created.recommendations,
        artifacts: created.artifacts.names().collect(),
        written,
    })
}

fn handle_demo(
    service: &PipelineService,
    data: &Path,
    rows: usize,
    seed: u64,
    framework: Framework,
    out: &Path,
) -> Result<()> {
    let options = DemoOptions {
        rows,
        seed,
        ..DemoOptions::default()
    };
    write_demo_dataset(data, &options)?;

    let destination: BTreeMap<String, String> = [
        ("type", EndpointKind::Relational.as_str()),
        ("connection_string", "postgresql://localhost/analytics"),
        ("table", "customer_analytics"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect();

    let created = service.create_pipeline(
        data,
        DEMO_PIPELINE,
        framework,
        EndpointDescriptor::from_settings(destination),
    )?;
    let written = write_bundle(&created.artifacts, out)?;
    let report = service.validate_pipeline(DEMO_PIPELINE, data)?;

    print_json(&serde_json::json!({
        "dataset": data,
        "pipeline": created.spec.name,
        "schedule": created.spec.schedule,
        "recommendations": created.recommendations,
        "written": written,
        "validation": {
            "passed": report.passed,
            "issues": report.issues,
            "metrics": report.metrics,
        },
    }))
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("table = orders"),
            Ok(("table".to_owned(), "orders".to_owned()))
        );
        assert_eq!(
            parse_key_val("url=http://x/?a=b"),
            Ok(("url".to_owned(), "http://x/?a=b".to_owned()))
        );
        assert!(parse_key_val("no-separator").is_err());
        assert!(parse_key_val("=value").is_err());
    }

    #[test]
    fn test_create_arguments() {
        let cli = Cli::try_parse_from([
            "pipesmith",
            "--registry",
            "reg.json",
            "create",
            "orders.csv",
            "--name",
            "orders",
            "--framework",
            "DBT",
            "-d",
            "type=relational",
            "-d",
            "table=orders",
        ])
        .unwrap();
        assert_eq!(cli.registry, Some(PathBuf::from("reg.json")));
        match cli.command {
            Commands::Create {
                framework,
                destination,
                ..
            } => {
                assert_eq!(framework, Framework::Dbt);
                assert_eq!(destination.len(), 2);
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_unknown_framework_is_rejected() {
        let result =
            Cli::try_parse_from(["pipesmith", "create", "a.csv", "-n", "a", "-f", "luigi"]);
        assert!(result.is_err());
    }
}
