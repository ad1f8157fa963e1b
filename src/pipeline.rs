//! Pipeline specifications, their registry and multi-target code synthesis.
//!
//! A [`PipelineSpec`] names a source, a destination, a schedule, a target
//! framework and the directives recommended by the analyser. The
//! [`codegen`] module renders it into an [`ArtifactBundle`] for one of:
//!
//! - **Airflow**: `dag.py` with four chained `PythonOperator` tasks
//! - **Prefect**: `flow.py` with four `@task`s and one `@flow`
//! - **dbt**: `model.sql` built from a CTE chain
//!
//! Every bundle also carries `requirements.txt` and `pipeline.yaml`.
//!
//! # Example
//!
//! ```no_run
//! use pipesmith::pipeline::{EndpointDescriptor, Framework, PipelineSpec, render_bundle};
//!
//! let spec = PipelineSpec::new(
//!     "daily_orders",
//!     Framework::Airflow,
//!     EndpointDescriptor::from_data_source("orders.csv"),
//!     EndpointDescriptor::default(),
//!     chrono::Utc::now(),
//! );
//! let bundle = render_bundle(&spec)?;
//! println!("{}", bundle.get("dag.py").unwrap_or_default());
//! # Ok::<(), pipesmith::error::PipesmithError>(())
//! ```

pub mod codegen;
pub mod directives;
pub mod docs;
pub mod registry;
pub mod snippets;
pub mod spec;

pub use codegen::{ArtifactBundle, FrameworkDescriptor, render_bundle, write_bundle};
pub use directives::{FillMethod, QualityCheckDirective, TransformDirective};
pub use registry::PipelineRegistry;
pub use spec::{
    EndpointDescriptor, EndpointKind, Framework, LifecycleState, PipelineSpec, PipelineUpdate,
    SPEC_VERSION, schedule_from_freshness,
};
