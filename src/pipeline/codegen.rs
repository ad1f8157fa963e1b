//! Multi-target code synthesis.
//!
//! Every execution framework is described by a [`FrameworkDescriptor`]: which
//! artifact it produces, which fragment dialect fills the slots, which
//! template wraps them and which Python packages it adds on top of
//! [`BASE_REQUIREMENTS`]. [`render_bundle`] consumes any descriptor, so a new
//! target is a new descriptor plus a template.
//!
//! Rendering is a pure function of the [`PipelineSpec`]: the generation
//! timestamp is the spec's `created_at`.

use super::snippets::{self, Cte, DbtTarget, Handoff};
use super::spec::{Framework, PipelineSpec};
use crate::error::{Result, ResultExt as _};
use chrono::SecondsFormat;
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

mod embedded {
    pub const AIRFLOW_DAG: &str = include_str!("../../templates/airflow_dag.py.jinja");
    pub const PREFECT_FLOW: &str = include_str!("../../templates/prefect_flow.py.jinja");
    pub const DBT_MODEL: &str = include_str!("../../templates/dbt_model.sql.jinja");
}

/// Python packages every generated pipeline needs
pub const BASE_REQUIREMENTS: &[&str] = &[
    "pandas>=1.3.0",
    "numpy>=1.21.0",
    "scikit-learn>=1.0.0",
    "pyyaml>=6.0",
    "requests>=2.28.0",
];

pub const REQUIREMENTS_ARTIFACT: &str = "requirements.txt";
pub const SPEC_ARTIFACT: &str = "pipeline.yaml";

/// Language the slot fragments are written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Python(Handoff),
    Sql,
}

#[derive(Debug, Clone, Copy)]
pub struct FrameworkDescriptor {
    pub framework: Framework,
    /// File name of the primary artifact
    pub artifact: &'static str,
    pub dialect: Dialect,
    /// Template registered under this name
    pub template: &'static str,
    template_source: &'static str,
    /// Indent applied to every slot body
    pub indent: usize,
    /// Added to [`BASE_REQUIREMENTS`]
    pub dependencies: &'static [&'static str],
}

const AIRFLOW: FrameworkDescriptor = FrameworkDescriptor {
    framework: Framework::Airflow,
    artifact: "dag.py",
    dialect: Dialect::Python(Handoff::XCom),
    template: "airflow_dag.py.jinja",
    template_source: embedded::AIRFLOW_DAG,
    indent: 4,
    dependencies: &["apache-airflow>=2.5.0", "psycopg2-binary>=2.9.0"],
};

const DBT: FrameworkDescriptor = FrameworkDescriptor {
    framework: Framework::Dbt,
    artifact: "model.sql",
    dialect: Dialect::Sql,
    template: "dbt_model.sql.jinja",
    template_source: embedded::DBT_MODEL,
    indent: 4,
    dependencies: &["dbt-core>=1.0.0", "dbt-postgres>=1.0.0"],
};

const PREFECT: FrameworkDescriptor = FrameworkDescriptor {
    framework: Framework::Prefect,
    artifact: "flow.py",
    dialect: Dialect::Python(Handoff::Argument),
    template: "prefect_flow.py.jinja",
    template_source: embedded::PREFECT_FLOW,
    indent: 4,
    dependencies: &["prefect>=2.0.0"],
};

/// Descriptor for a framework
pub fn descriptor(framework: Framework) -> &'static FrameworkDescriptor {
    match framework {
        Framework::Airflow => &AIRFLOW,
        Framework::Dbt => &DBT,
        Framework::Prefect => &PREFECT,
    }
}

/// Named text outputs for one framework, ordered by name. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ArtifactBundle {
    artifacts: BTreeMap<String, String>,
}

impl ArtifactBundle {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.artifacts.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.artifacts
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    fn insert(&mut self, name: impl Into<String>, text: String) {
        self.artifacts.insert(name.into(), text);
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Slots {
    Python {
        extract: String,
        transform: String,
        validate: String,
        load: String,
    },
    Sql {
        ctes: Vec<Cte>,
        final_relation: String,
        target: DbtTarget,
        validate: String,
    },
}

#[derive(Debug, Serialize)]
struct TemplateContext {
    identifier: String,
    name_literal: String,
    description: String,
    schedule: String,
    schedule_text: String,
    generated_at: String,
    start_date: String,
    tasks: [&'static str; 4],
    slots: Slots,
}

fn build_slots(spec: &PipelineSpec, descriptor: &FrameworkDescriptor) -> Slots {
    let indent = descriptor.indent;
    match descriptor.dialect {
        Dialect::Python(handoff) => Slots::Python {
            extract: snippets::indent_block(&snippets::python_extract(&spec.source), indent),
            transform: snippets::indent_block(
                &snippets::python_transform(&spec.transformations, handoff),
                indent,
            ),
            validate: snippets::indent_block(
                &snippets::python_validate(&spec.quality_checks, handoff),
                indent,
            ),
            load: snippets::indent_block(
                &snippets::python_load(&spec.destination, handoff),
                indent,
            ),
        },
        Dialect::Sql => {
            let mut ctes = vec![Cte {
                name: "source_data".to_owned(),
                body: snippets::sql_extract(&spec.source),
            }];
            ctes.extend(snippets::sql_transform(&spec.source, &spec.transformations));
            for cte in &mut ctes {
                cte.body = snippets::indent_block(&cte.body, indent);
            }
            let final_relation = ctes
                .last()
                .map_or_else(|| "source_data".to_owned(), |c| c.name.clone());
            Slots::Sql {
                ctes,
                final_relation,
                target: snippets::sql_load(&spec.destination),
                validate: snippets::sql_validate(&spec.quality_checks),
            }
        }
    }
}

fn environment(descriptor: &FrameworkDescriptor) -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template(descriptor.template, descriptor.template_source)
        .with_context(|| format!("Failed to load template {}", descriptor.template))?;
    Ok(env)
}

/// Render the primary artifact of `descriptor` for `spec`.
pub fn render_primary(spec: &PipelineSpec, descriptor: &FrameworkDescriptor) -> Result<String> {
    let env = environment(descriptor)?;
    let template = env.get_template(descriptor.template)?;

    let ctx = TemplateContext {
        identifier: spec.identifier(),
        name_literal: snippets::py_quote(&spec.name),
        description: snippets::py_quote(&format!("Generated pipeline for {}", spec.name)),
        schedule: snippets::py_quote(&spec.schedule),
        schedule_text: spec.schedule.clone(),
        generated_at: spec.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        start_date: spec.created_at.format("%Y, %-m, %-d").to_string(),
        tasks: ["extract", "transform", "validate", "load"],
        slots: build_slots(spec, descriptor),
    };

    Ok(template.render(&ctx)?)
}

/// `requirements.txt`: the base set followed by the framework's additions.
pub fn requirements(descriptor: &FrameworkDescriptor) -> String {
    let mut lines: Vec<&str> = BASE_REQUIREMENTS.to_vec();
    lines.extend_from_slice(descriptor.dependencies);
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Primary artifact, `requirements.txt` and `pipeline.yaml` for the spec's
/// framework.
pub fn render_bundle(spec: &PipelineSpec) -> Result<ArtifactBundle> {
    let descriptor = descriptor(spec.framework);

    let mut bundle = ArtifactBundle::default();
    bundle.insert(descriptor.artifact, render_primary(spec, descriptor)?);
    bundle.insert(REQUIREMENTS_ARTIFACT, requirements(descriptor));
    bundle.insert(SPEC_ARTIFACT, spec.to_yaml()?);

    tracing::debug!(
        pipeline = %spec.name,
        framework = %spec.framework,
        artifacts = bundle.len(),
        "Rendered artifact bundle"
    );
    Ok(bundle)
}

/// Write every artifact into `dir`, creating it if needed.
pub fn write_bundle(bundle: &ArtifactBundle, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(bundle.len());
    for (name, text) in bundle.iter() {
        let path = dir.join(name);
        std::fs::write(&path, text)
            .with_context(|| format!("Failed to write artifact {}", path.display()))?;
        written.push(path);
    }

    tracing::info!("Wrote {} artifacts to {}", written.len(), dir.display());
    Ok(written)
}
