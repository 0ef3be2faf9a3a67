//! Parsing and batch validation of metrics requests

use serde::Serialize;
use uuid::Uuid;

use crate::error::ComputeError;
use crate::schema::request::{MetricsRequest, ValidationError};

/// Parser for request batches
pub struct RequestParser;

impl RequestParser {
    /// Parse a JSON string containing an array of requests
    pub fn parse_array(json: &str) -> Result<Vec<MetricsRequest>, ComputeError> {
        let requests: Vec<MetricsRequest> = serde_json::from_str(json)?;
        Ok(requests)
    }

    /// Parse NDJSON (newline-delimited JSON), one request per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<MetricsRequest>, ComputeError> {
        let mut requests = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<MetricsRequest>(trimmed) {
                Ok(request) => requests.push(request),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(requests)
    }

    /// Validate a batch of requests, returning only the failures
    pub fn validate_requests(requests: &[MetricsRequest]) -> Vec<ValidationResult> {
        requests
            .iter()
            .enumerate()
            .filter_map(|(index, request)| {
                request.validate().err().map(|error| ValidationResult {
                    index,
                    assessment_id: request.assessment.id,
                    error,
                })
            })
            .collect()
    }
}

/// A request that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub assessment_id: Uuid,
    pub error: ValidationError,
}

/// Serializable summary of a validation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total_requests: usize,
    pub valid_requests: usize,
    pub invalid_requests: usize,
    pub errors: Vec<ValidationErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationErrorDetail {
    pub index: usize,
    pub assessment_id: Uuid,
    pub error: String,
}

impl ValidationReport {
    pub fn new(total_requests: usize, failures: &[ValidationResult]) -> Self {
        ValidationReport {
            total_requests,
            valid_requests: total_requests - failures.len(),
            invalid_requests: failures.len(),
            errors: failures
                .iter()
                .map(|r| ValidationErrorDetail {
                    index: r.index,
                    assessment_id: r.assessment_id,
                    error: r.error.to_string(),
                })
                .collect(),
        }
    }
}
