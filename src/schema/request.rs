//! bodymetrics.request.v1 schema definition

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{AssessmentInput, ClinicalFlags, PatientProfile};

/// Current schema version
pub const SCHEMA_VERSION: &str = "bodymetrics.request.v1";

/// One metrics request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRequest {
    /// Schema version identifier
    pub schema_version: String,
    /// Patient demographics
    pub patient: PatientProfile,
    /// The assessment to compute metrics for
    pub assessment: AssessmentInput,
    /// Findings from the clinical intake, if one was done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_flags: Option<ClinicalFlags>,
}

impl MetricsRequest {
    /// Create a request for the current schema version
    pub fn new(patient: PatientProfile, assessment: AssessmentInput) -> Self {
        MetricsRequest {
            schema_version: SCHEMA_VERSION.to_string(),
            patient,
            assessment,
            clinical_flags: None,
        }
    }

    /// Attach clinical intake flags
    pub fn with_clinical_flags(mut self, flags: ClinicalFlags) -> Self {
        self.clinical_flags = Some(flags);
        self
    }

    /// Validate the request envelope.
    ///
    /// Only structural problems are rejected here. Missing or out-of-range
    /// measurements are handled by the normalizer and never fail a request.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        if let Some(birth_date) = self.patient.birth_date {
            let measured_on = self.assessment.measured_at.date_naive();
            if birth_date > measured_on {
                return Err(ValidationError::BirthAfterAssessment {
                    birth_date,
                    measured_on,
                });
            }
        }

        Ok(())
    }
}

/// Validation errors for metrics requests
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Birth date {birth_date} is after the assessment date {measured_on}")]
    BirthAfterAssessment {
        birth_date: NaiveDate,
        measured_on: NaiveDate,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn make_request() -> MetricsRequest {
        let patient = PatientProfile {
            id: Uuid::new_v4(),
            name: Some("Test Patient".to_string()),
            sex: None,
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 20),
            height_m: Some(1.70),
        };
        let measured_at = "2024-03-01T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        MetricsRequest::new(patient, AssessmentInput::new(measured_at, Some(70.0)))
    }

    #[test]
    fn test_validate_ok() {
        assert!(make_request().validate().is_ok());
    }

    #[test]
    fn test_validate_schema_version() {
        let mut request = make_request();
        request.schema_version = "bodymetrics.request.v0".to_string();

        assert!(matches!(
            request.validate(),
            Err(ValidationError::InvalidSchemaVersion { .. })
        ));
    }

    #[test]
    fn test_validate_birth_after_assessment() {
        let mut request = make_request();
        request.patient.birth_date = NaiveDate::from_ymd_opt(2024, 3, 2);

        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("2024-03-02"));
    }

    #[test]
    fn test_birth_on_assessment_day_is_valid() {
        let mut request = make_request();
        request.patient.birth_date = NaiveDate::from_ymd_opt(2024, 3, 1);

        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_deserialize_request() {
        let json = r#"{
            "schema_version": "bodymetrics.request.v1",
            "patient": {
                "id": "7f9c24e8-3b1a-4d5e-9c6f-2a8b4d6e8f01",
                "sex": "F",
                "birth_date": "1995-07-14",
                "height_m": "1,65"
            },
            "assessment": {
                "id": "0b6d3e2a-5f4c-4a1b-8e7d-9c2f1a3b5d70",
                "measured_at": "2024-03-01T09:00:00Z",
                "weight_kg": 58.2,
                "waist_cm": "",
                "activity_level": "LIGHT",
                "skinfolds": { "triceps_mm": 14, "suprailiac_mm": "11.5", "thigh_mm": 22 }
            },
            "clinical_flags": { "amenorrhea": false }
        }"#;

        let request: MetricsRequest = serde_json::from_str(json).unwrap();

        assert!(request.validate().is_ok());
        assert_eq!(request.patient.height_m, Some(1.65));
        assert_eq!(request.assessment.waist_cm, None);
        assert_eq!(request.assessment.skinfolds.count(), 3);
        assert_eq!(request.clinical_flags.unwrap().amenorrhea, Some(false));
    }

    #[test]
    fn test_serialize_omits_missing_flags() {
        let json = serde_json::to_string(&make_request()).unwrap();

        assert!(json.contains(SCHEMA_VERSION));
        assert!(!json.contains("clinical_flags"));
    }
}
