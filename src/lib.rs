//! bodymetrics - Body composition and metabolic metrics engine
//!
//! Turns one clinical assessment (weight, circumferences, bioimpedance readings,
//! skinfold thicknesses) plus patient demographics into a consistent set of
//! derived indicators through a deterministic pipeline: normalization →
//! anthropometry → body composition → metabolism → risk scoring → aggregation.
//!
//! The engine never fails on missing or invalid measurements; indicators whose
//! inputs are unavailable are simply absent.

pub mod anthropometry;
pub mod composition;
pub mod config;
pub mod encoder;
pub mod error;
pub mod metabolic;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod scoring;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use error::ComputeError;
pub use pipeline::{compute_metrics, compute_metrics_json, MetricsEngine};
pub use types::{AssessmentInput, CalculatedMetrics, ClinicalFlags, MetricsReport, PatientProfile};

// Schema exports
pub use schema::{MetricsRequest, RequestParser, SCHEMA_VERSION};

/// Engine version embedded in every report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "bodymetrics";
