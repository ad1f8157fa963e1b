//! Request/response façade over the analyser, the registry and the code
//! synthesizer. The CLI is a thin layer on top of [`PipelineService`].

use crate::analyser::quality::{self, QualityValidator, ValidationReport};
use crate::analyser::{AnalysisResult, analyze_dataset, load_dataset};
use crate::config::{AnalysisSettings, Settings};
use crate::error::Result;
use crate::pipeline::{
    ArtifactBundle, EndpointDescriptor, EndpointKind, Framework, LifecycleState, PipelineRegistry,
    PipelineSpec, PipelineUpdate, docs, render_bundle, schedule_from_freshness,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything produced when a pipeline is created from a dataset
#[derive(Debug, Clone, Serialize)]
pub struct CreatedPipeline {
    pub analysis: AnalysisResult,
    /// The registered spec
    pub spec: PipelineSpec,
    pub artifacts: ArtifactBundle,
    pub recommendations: Vec<String>,
}

/// Summary of one registered pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineStatus {
    pub name: String,
    pub framework: Framework,
    pub schedule: String,
    pub created_at: DateTime<Utc>,
    pub source_kind: EndpointKind,
    pub destination_kind: EndpointKind,
    pub transformations_count: usize,
    pub quality_checks_count: usize,
    pub state: LifecycleState,
}

impl From<&PipelineSpec> for PipelineStatus {
    fn from(spec: &PipelineSpec) -> Self {
        Self {
            name: spec.name.clone(),
            framework: spec.framework,
            schedule: spec.schedule.clone(),
            created_at: spec.created_at,
            source_kind: spec.source.kind,
            destination_kind: spec.destination.kind,
            transformations_count: spec.transformations.len(),
            quality_checks_count: spec.quality_checks.len(),
            state: spec.state,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineService {
    registry: PipelineRegistry,
    analysis: AnalysisSettings,
}

impl PipelineService {
    pub fn new(settings: &Settings) -> Self {
        Self::with_registry(
            PipelineRegistry::new(&settings.registry_path),
            settings.analysis.clone(),
        )
    }

    pub fn with_registry(registry: PipelineRegistry, analysis: AnalysisSettings) -> Self {
        Self { registry, analysis }
    }

    pub fn registry(&self) -> &PipelineRegistry {
        &self.registry
    }

    /// Analyse `data_source`, derive a spec from the recommendations,
    /// register it and render its artifacts.
    pub fn create_pipeline(
        &self,
        data_source: &Path,
        name: &str,
        framework: Framework,
        destination: EndpointDescriptor,
    ) -> Result<CreatedPipeline> {
        self.create_pipeline_at(data_source, name, framework, destination, Utc::now())
    }

    /// [`Self::create_pipeline`] with an explicit creation time.
    pub fn create_pipeline_at(
        &self,
        data_source: &Path,
        name: &str,
        framework: Framework,
        destination: EndpointDescriptor,
        now: DateTime<Utc>,
    ) -> Result<CreatedPipeline> {
        tracing::info!("Creating pipeline: {name}");

        let df = load_dataset(data_source)?;
        let analysis = analyze_dataset(&df, &self.analysis);

        let freshness = quality::data_freshness(&df, now, self.analysis.freshness_window_days);
        let mut spec = PipelineSpec::new(
            name,
            framework,
            EndpointDescriptor::from_data_source(&data_source.to_string_lossy()),
            destination,
            now,
        );
        spec.schedule = schedule_from_freshness(&freshness, self.analysis.freshness_window_days);
        spec.transformations = analysis.recommendations.transformations.clone();
        spec.quality_checks = analysis.recommendations.quality_checks.clone();

        // Nothing is registered unless the bundle renders.
        spec.state = LifecycleState::Active;
        let artifacts = render_bundle(&spec)?;
        let spec = self.registry.insert(spec)?;

        tracing::info!(
            transformations = spec.transformations.len(),
            quality_checks = spec.quality_checks.len(),
            schedule = %spec.schedule,
            "Pipeline '{name}' registered"
        );

        Ok(CreatedPipeline {
            recommendations: analysis.recommendations.messages.clone(),
            analysis,
            spec,
            artifacts,
        })
    }

    /// Run the pipeline's quality checks against a dataset.
    pub fn validate_pipeline(&self, name: &str, data_path: &Path) -> Result<ValidationReport> {
        self.validate_pipeline_at(name, data_path, Utc::now())
    }

    pub fn validate_pipeline_at(
        &self,
        name: &str,
        data_path: &Path,
        now: DateTime<Utc>,
    ) -> Result<ValidationReport> {
        let spec = self.registry.get(name)?;
        let df = load_dataset(data_path)?;
        let report =
            QualityValidator::new(self.analysis.clone()).validate(&df, &spec.quality_checks, now);

        tracing::info!(
            passed = report.passed,
            issues = report.issues.len(),
            "Validated {} against pipeline '{name}'",
            data_path.display()
        );
        Ok(report)
    }

    pub fn status(&self, name: &str) -> Result<PipelineStatus> {
        Ok(PipelineStatus::from(&self.registry.get(name)?))
    }

    pub fn list(&self) -> Result<Vec<PipelineStatus>> {
        Ok(self
            .registry
            .list()?
            .iter()
            .map(PipelineStatus::from)
            .collect())
    }

    /// Change the schedule, transformations and/or quality checks.
    pub fn update(&self, name: &str, update: PipelineUpdate) -> Result<PipelineSpec> {
        let spec = self.registry.update(name, update)?;
        tracing::info!("Pipeline '{name}' updated successfully");
        Ok(spec)
    }

    /// Remove a pipeline, returning the deleted spec.
    pub fn delete(&self, name: &str) -> Result<PipelineSpec> {
        let spec = self.registry.remove(name)?;
        tracing::info!("Pipeline '{name}' deleted successfully");
        Ok(spec)
    }

    pub fn documentation(&self, name: &str) -> Result<String> {
        docs::render_markdown(&self.registry.get(name)?)
    }

    /// Regenerate the artifacts of a registered pipeline.
    pub fn render(&self, name: &str) -> Result<ArtifactBundle> {
        render_bundle(&self.registry.get(name)?)
    }
}
