//! # pipesmith - data-driven pipeline generation
//!
//! pipesmith profiles a tabular dataset, turns what it finds into cleaning
//! and quality-check recommendations, and synthesizes a runnable pipeline
//! for Airflow, dbt or Prefect from them. Generated pipelines are kept in a
//! JSON registry so they can be inspected, updated, re-rendered and
//! validated against new data later.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pipesmith::config::Settings;
//! use pipesmith::pipeline::{EndpointDescriptor, Framework};
//! use pipesmith::service::PipelineService;
//! use std::path::Path;
//!
//! let service = PipelineService::new(&Settings::default());
//! let created = service.create_pipeline(
//!     Path::new("orders.csv"),
//!     "daily_orders",
//!     Framework::Prefect,
//!     EndpointDescriptor::default(),
//! )?;
//!
//! for message in &created.recommendations {
//!     println!("{message}");
//! }
//! print!("{}", created.artifacts.get("flow.py").unwrap_or_default());
//! # Ok::<(), pipesmith::error::PipesmithError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`analyser`]: profiling, clustering, anomaly detection, correlation,
//!   recommendations and quality validation
//! - [`pipeline`]: pipeline specs, the registry, code synthesis and docs
//! - [`service`]: the create / validate / status / update / delete façade
//! - [`demo`]: a deterministic sample dataset with known defects
//! - [`config`]: settings file and analysis thresholds
//! - [`error`]: the crate error type
//! - [`logging`]: tracing setup for the binary
//! - [`utils`]: identifier sanitizing
//!
//! ## Degraded analysis
//!
//! Clustering, anomaly detection and correlation need numeric columns and
//! enough rows. When a stage cannot run, its slot in
//! [`analyser::AnalysisResult`] is [`analyser::StepOutcome::Unavailable`]
//! with a reason, and the remaining stages still produce results.

#![warn(clippy::all, rust_2018_idioms)]

pub mod analyser;
pub mod config;
pub mod demo;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod service;
pub mod utils;
