//! Report encoding
//!
//! This module wraps calculated metrics in the report envelope: producer,
//! provenance and input quality. Reports carry no computation timestamp, so
//! the same request always encodes to the same JSON.

use crate::error::ComputeError;
use crate::types::{
    AssessmentInput, CalculatedMetrics, MetricsReport, NormalizedAssessment, PatientProfile,
    ReportProducer, ReportProvenance, ReportQuality,
};
use crate::{ENGINE_VERSION, PRODUCER_NAME};

/// Current report schema version
pub const REPORT_VERSION: &str = "bodymetrics.report.v1";

/// Encoder for metrics reports
pub struct ReportEncoder {
    producer: ReportProducer,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    pub fn new() -> Self {
        Self {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
            },
        }
    }

    /// Build the report for one computed assessment
    pub fn encode(
        &self,
        patient: &PatientProfile,
        assessment: &AssessmentInput,
        normalized: &NormalizedAssessment,
        metrics: CalculatedMetrics,
    ) -> MetricsReport {
        let provenance = ReportProvenance {
            patient_id: patient.id,
            assessment_id: assessment.id,
            measured_at_utc: assessment.measured_at.to_rfc3339(),
        };

        let quality = ReportQuality {
            coverage: normalized.coverage,
            bf_percent_method: metrics.bf_percent_method,
            issues: normalized.issues.clone(),
        };

        MetricsReport {
            report_version: REPORT_VERSION.to_string(),
            producer: self.producer.clone(),
            provenance,
            quality,
            metrics,
        }
    }

    /// Encode a report to pretty-printed JSON
    pub fn encode_to_json(&self, report: &MetricsReport) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(report).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BodyFatMethod, InputIssue, IssueReason};
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn make_patient() -> PatientProfile {
        PatientProfile {
            id: Uuid::new_v4(),
            name: None,
            sex: None,
            birth_date: None,
            height_m: None,
        }
    }

    fn make_assessment() -> AssessmentInput {
        let measured_at = "2024-06-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        AssessmentInput::new(measured_at, Some(80.0))
    }

    #[test]
    fn test_encode_envelope() {
        let patient = make_patient();
        let assessment = make_assessment();
        let normalized = NormalizedAssessment {
            coverage: 0.25,
            issues: vec![InputIssue {
                field: "hip_cm".to_string(),
                reason: IssueReason::NotPositive,
            }],
            ..Default::default()
        };
        let metrics = CalculatedMetrics {
            bf_percent_method: Some(BodyFatMethod::Direct),
            ..Default::default()
        };

        let report = ReportEncoder::new().encode(&patient, &assessment, &normalized, metrics);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.provenance.patient_id, patient.id);
        assert_eq!(report.provenance.assessment_id, assessment.id);
        assert_eq!(report.provenance.measured_at_utc, "2024-06-01T10:00:00+00:00");
        assert_eq!(report.quality.coverage, 0.25);
        assert_eq!(report.quality.bf_percent_method, Some(BodyFatMethod::Direct));
        assert_eq!(report.quality.issues.len(), 1);
    }

    #[test]
    fn test_encode_to_json_is_deterministic() {
        let encoder = ReportEncoder::default();
        let patient = make_patient();
        let assessment = make_assessment();
        let normalized = NormalizedAssessment::default();

        let first = encoder.encode(&patient, &assessment, &normalized, CalculatedMetrics::default());
        let second = encoder.encode(&patient, &assessment, &normalized, CalculatedMetrics::default());

        let first_json = encoder.encode_to_json(&first).unwrap();
        assert_eq!(first_json, encoder.encode_to_json(&second).unwrap());

        let value: serde_json::Value = serde_json::from_str(&first_json).unwrap();
        assert_eq!(value["report_version"], REPORT_VERSION);
        assert!(value["metrics"]["bmi"].is_null());
    }
}
