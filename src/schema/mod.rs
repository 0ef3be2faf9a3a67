//! bodymetrics.request.v1 schema
//!
//! This module defines the JSON request envelope accepted at the engine
//! boundary: one patient profile, one assessment and optional clinical flags.
//! Requests arrive either as a JSON array or as NDJSON (one request per line).

mod parser;
mod request;

pub use parser::*;
pub use request::*;
