//! Input normalization
//!
//! This module turns a patient profile and a raw assessment into a
//! `NormalizedAssessment`:
//! - Lenient numeric coercion (numbers, numeric strings, blanks)
//! - Per-field sanity checks with an omit-on-invalid policy
//! - Age in whole years at the assessment date
//! - Input coverage

use chrono::{Datelike, NaiveDate};
use serde::{de::IgnoredAny, Deserialize, Deserializer};
use tracing::debug;

use crate::types::{
    AssessmentInput, InputIssue, IssueReason, NormalizedAssessment, PatientProfile, Skinfolds,
};

/// Number of tracked core fields used for coverage
const COVERAGE_FIELDS: usize = 8;

/// Skinfold sites needed before the skinfolds count as a body-fat source
const SKINFOLD_SOURCE_SITES: usize = 3;

/// Normalizer for converting raw inputs to a normalized assessment
pub struct Normalizer;

impl Normalizer {
    /// Normalize one patient/assessment pair. Never fails.
    pub fn normalize(patient: &PatientProfile, assessment: &AssessmentInput) -> NormalizedAssessment {
        let mut checker = FieldChecker::default();

        let height_m = checker.positive("height_m", patient.height_m);
        let weight_kg = checker.positive("weight_kg", assessment.weight_kg);
        let waist_cm = checker.positive("waist_cm", assessment.waist_cm);
        let hip_cm = checker.positive("hip_cm", assessment.hip_cm);
        let neck_cm = checker.positive("neck_cm", assessment.neck_cm);
        let body_fat_percent = checker.percent("body_fat_percent", assessment.body_fat_percent);
        let fat_free_mass_kg = checker.non_negative("fat_free_mass_kg", assessment.fat_free_mass_kg);
        let skeletal_muscle_mass_kg =
            checker.non_negative("skeletal_muscle_mass_kg", assessment.skeletal_muscle_mass_kg);
        let total_body_water_l =
            checker.non_negative("total_body_water_l", assessment.total_body_water_l);
        let extracellular_water_l =
            checker.non_negative("extracellular_water_l", assessment.extracellular_water_l);
        let intracellular_water_l =
            checker.non_negative("intracellular_water_l", assessment.intracellular_water_l);
        let visceral_fat_index =
            checker.non_negative("visceral_fat_index", assessment.visceral_fat_index);
        let phase_angle_deg = checker.non_negative("phase_angle_deg", assessment.phase_angle_deg);
        let protein_mass_kg = checker.non_negative("protein_mass_kg", assessment.protein_mass_kg);
        let mineral_mass_kg = checker.non_negative("mineral_mass_kg", assessment.mineral_mass_kg);
        let estimated_intake_kcal =
            checker.non_negative("estimated_intake_kcal", assessment.estimated_intake_kcal);
        let exercise_expenditure_kcal = checker.non_negative(
            "exercise_expenditure_kcal",
            assessment.exercise_expenditure_kcal,
        );
        let skinfolds = checker.skinfolds(&assessment.skinfolds);

        let age = patient.birth_date.and_then(|birth| {
            let on = assessment.measured_at.date_naive();
            let age = age_in_years(birth, on);
            if age.is_none() {
                checker.reject("birth_date", IssueReason::BirthAfterAssessment);
            }
            age
        });

        let has_fat_source = body_fat_percent.is_some()
            || fat_free_mass_kg.is_some()
            || skinfolds.count() >= SKINFOLD_SOURCE_SITES;

        let present = [
            weight_kg.is_some(),
            height_m.is_some(),
            patient.sex.is_some(),
            age.is_some(),
            waist_cm.is_some(),
            hip_cm.is_some(),
            has_fat_source,
            assessment.activity_level.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();

        let coverage = present as f64 / COVERAGE_FIELDS as f64;

        NormalizedAssessment {
            sex: patient.sex,
            age,
            height_m,
            weight_kg,
            waist_cm,
            hip_cm,
            neck_cm,
            body_fat_percent,
            fat_free_mass_kg,
            skeletal_muscle_mass_kg,
            total_body_water_l,
            extracellular_water_l,
            intracellular_water_l,
            visceral_fat_index,
            phase_angle_deg,
            protein_mass_kg,
            mineral_mass_kg,
            activity_level: assessment.activity_level,
            estimated_intake_kcal,
            exercise_expenditure_kcal,
            skinfolds,
            skinfold_protocol: assessment.skinfold_protocol.unwrap_or_default(),
            coverage,
            issues: checker.issues,
        }
    }
}

/// Whole years elapsed between `birth` and `on`; `None` if `on` precedes `birth`
pub fn age_in_years(birth: NaiveDate, on: NaiveDate) -> Option<u32> {
    if on < birth {
        return None;
    }

    let mut years = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }

    u32::try_from(years).ok()
}

/// Collects rejected fields while applying the per-field policy
#[derive(Default)]
struct FieldChecker {
    issues: Vec<InputIssue>,
}

impl FieldChecker {
    fn reject(&mut self, field: &str, reason: IssueReason) {
        debug!(field, ?reason, "dropping invalid input value");
        self.issues.push(InputIssue {
            field: field.to_string(),
            reason,
        });
    }

    fn finite(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
        let v = value?;
        if v.is_finite() {
            Some(v)
        } else {
            self.reject(field, IssueReason::NotFinite);
            None
        }
    }

    /// Weight, height and circumferences: strictly positive
    fn positive(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
        let v = self.finite(field, value)?;
        if v > 0.0 {
            Some(v)
        } else {
            self.reject(field, IssueReason::NotPositive);
            None
        }
    }

    fn non_negative(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
        let v = self.finite(field, value)?;
        if v >= 0.0 {
            Some(v)
        } else {
            self.reject(field, IssueReason::Negative);
            None
        }
    }

    fn percent(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
        let v = self.finite(field, value)?;
        if (0.0..=100.0).contains(&v) {
            Some(v)
        } else {
            self.reject(field, IssueReason::OutOfRange);
            None
        }
    }

    fn skinfolds(&mut self, raw: &Skinfolds) -> Skinfolds {
        Skinfolds {
            triceps_mm: self.non_negative("skinfolds.triceps_mm", raw.triceps_mm),
            subscapular_mm: self.non_negative("skinfolds.subscapular_mm", raw.subscapular_mm),
            suprailiac_mm: self.non_negative("skinfolds.suprailiac_mm", raw.suprailiac_mm),
            abdominal_mm: self.non_negative("skinfolds.abdominal_mm", raw.abdominal_mm),
            thigh_mm: self.non_negative("skinfolds.thigh_mm", raw.thigh_mm),
            chest_mm: self.non_negative("skinfolds.chest_mm", raw.chest_mm),
            midaxillary_mm: self.non_negative("skinfolds.midaxillary_mm", raw.midaxillary_mm),
        }
    }
}

/// Accepts a JSON number, a numeric string, a blank, `null` or anything else.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Lenient deserializer for optional numeric fields.
///
/// Form inputs arrive as numbers or strings ("72,5", " 80 ", ""). Blank and
/// malformed values become `None` instead of failing the whole record.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawNumber>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawNumber::Number(n)) => Some(n),
        Some(RawNumber::Text(s)) => parse_numeric_text(&s),
        Some(RawNumber::Other(_)) | None => None,
    })
}

/// Accepts a known value of `T`, or anything else.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawChoice<T> {
    Known(T),
    Other(IgnoredAny),
}

/// Lenient deserializer for optional enum and flag fields.
///
/// Blank or unrecognised values (`""`, `"unknown"`, `0`) become `None`, the
/// same as an absent field, instead of failing the whole record.
pub fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw = Option::<RawChoice<T>>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawChoice::Known(value)) => Some(value),
        Some(RawChoice::Other(_)) | None => None,
    })
}

fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.replace(',', ".").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityLevel, ClinicalFlags, Sex, SkinfoldProtocol};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn make_date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn make_patient() -> PatientProfile {
        PatientProfile {
            id: Uuid::new_v4(),
            name: None,
            sex: Some(Sex::Male),
            birth_date: Some(make_date(1994, 6, 15)),
            height_m: Some(1.80),
        }
    }

    fn make_assessment() -> AssessmentInput {
        let measured_at = Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();
        AssessmentInput::new(measured_at, Some(90.0))
    }

    #[test]
    fn test_age_on_birthday() {
        assert_eq!(age_in_years(make_date(1994, 6, 15), make_date(2024, 6, 15)), Some(30));
    }

    #[test]
    fn test_age_day_before_birthday() {
        assert_eq!(age_in_years(make_date(1994, 6, 15), make_date(2024, 6, 14)), Some(29));
    }

    #[test]
    fn test_age_leap_day_birth() {
        let birth = make_date(2000, 2, 29);
        assert_eq!(age_in_years(birth, make_date(2023, 2, 28)), Some(22));
        assert_eq!(age_in_years(birth, make_date(2023, 3, 1)), Some(23));
    }

    #[test]
    fn test_age_birth_after_assessment() {
        assert_eq!(age_in_years(make_date(2025, 1, 1), make_date(2024, 1, 1)), None);
    }

    #[test]
    fn test_normalize_valid_inputs() {
        let patient = make_patient();
        let mut assessment = make_assessment();
        assessment.waist_cm = Some(92.0);
        assessment.body_fat_percent = Some(20.0);
        assessment.activity_level = Some(ActivityLevel::Moderate);

        let normalized = Normalizer::normalize(&patient, &assessment);

        assert_eq!(normalized.age, Some(30));
        assert_eq!(normalized.weight_kg, Some(90.0));
        assert_eq!(normalized.height_cm(), Some(180.0));
        assert_eq!(normalized.body_fat_percent, Some(20.0));
        assert_eq!(normalized.skinfold_protocol, SkinfoldProtocol::Auto);
        assert!(normalized.issues.is_empty());
        // Everything but hip
        assert!((normalized.coverage - 7.0 / 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_values_are_omitted() {
        let mut patient = make_patient();
        patient.height_m = Some(0.0);
        let mut assessment = make_assessment();
        assessment.weight_kg = Some(-5.0);
        assessment.body_fat_percent = Some(120.0);
        assessment.phase_angle_deg = Some(f64::NAN);
        assessment.skinfolds.triceps_mm = Some(-1.0);

        let normalized = Normalizer::normalize(&patient, &assessment);

        assert_eq!(normalized.height_m, None);
        assert_eq!(normalized.weight_kg, None);
        assert_eq!(normalized.body_fat_percent, None);
        assert_eq!(normalized.phase_angle_deg, None);
        assert_eq!(normalized.skinfolds.triceps_mm, None);

        let reasons: Vec<(&str, IssueReason)> = normalized
            .issues
            .iter()
            .map(|i| (i.field.as_str(), i.reason))
            .collect();
        assert!(reasons.contains(&("height_m", IssueReason::NotPositive)));
        assert!(reasons.contains(&("weight_kg", IssueReason::NotPositive)));
        assert!(reasons.contains(&("body_fat_percent", IssueReason::OutOfRange)));
        assert!(reasons.contains(&("phase_angle_deg", IssueReason::NotFinite)));
        assert!(reasons.contains(&("skinfolds.triceps_mm", IssueReason::Negative)));
    }

    #[test]
    fn test_birth_after_assessment_is_flagged() {
        let mut patient = make_patient();
        patient.birth_date = Some(make_date(2030, 1, 1));

        let normalized = Normalizer::normalize(&patient, &make_assessment());

        assert_eq!(normalized.age, None);
        assert_eq!(normalized.issues[0].reason, IssueReason::BirthAfterAssessment);
    }

    #[test]
    fn test_lenient_numeric_strings() {
        let json = r#"{
            "id": "6f1c1b8e-8a51-4f0e-9d55-3c1a8b7f2e10",
            "measured_at": "2024-06-15T09:00:00Z",
            "weight_kg": "72,5",
            "waist_cm": " 80 ",
            "hip_cm": "",
            "neck_cm": "abc",
            "body_fat_percent": 18,
            "visceral_fat_index": true,
            "skinfolds": { "triceps_mm": "12.5", "thigh_mm": null }
        }"#;

        let assessment: AssessmentInput = serde_json::from_str(json).unwrap();

        assert_eq!(assessment.weight_kg, Some(72.5));
        assert_eq!(assessment.waist_cm, Some(80.0));
        assert_eq!(assessment.hip_cm, None);
        assert_eq!(assessment.neck_cm, None);
        assert_eq!(assessment.body_fat_percent, Some(18.0));
        assert_eq!(assessment.visceral_fat_index, None);
        assert_eq!(assessment.skinfolds.triceps_mm, Some(12.5));
        assert_eq!(assessment.skinfolds.thigh_mm, None);
        assert_eq!(assessment.fat_free_mass_kg, None);
    }

    #[test]
    fn test_blank_and_unknown_choices_are_absent() {
        let json = r#"{
            "id": "6f1c1b8e-8a51-4f0e-9d55-3c1a8b7f2e10",
            "measured_at": "2024-06-15T09:00:00Z",
            "weight_kg": 80,
            "activity_level": "",
            "skinfold_protocol": "durnin"
        }"#;
        let assessment: AssessmentInput = serde_json::from_str(json).unwrap();
        assert_eq!(assessment.activity_level, None);
        assert_eq!(assessment.skinfold_protocol, None);
        assert_eq!(assessment.weight_kg, Some(80.0));

        let json = r#"{"id": "6f1c1b8e-8a51-4f0e-9d55-3c1a8b7f2e10", "sex": "", "height_m": 1.7}"#;
        let patient: PatientProfile = serde_json::from_str(json).unwrap();
        assert_eq!(patient.sex, None);
        assert_eq!(patient.height_m, Some(1.7));

        let json = r#"{"id": "6f1c1b8e-8a51-4f0e-9d55-3c1a8b7f2e10", "sex": "female"}"#;
        let patient: PatientProfile = serde_json::from_str(json).unwrap();
        assert_eq!(patient.sex, Some(Sex::Female));
    }

    #[test]
    fn test_lenient_clinical_flags() {
        let flags: ClinicalFlags =
            serde_json::from_str(r#"{"amenorrhea": true, "fatigue": "", "diabetes": null}"#).unwrap();
        assert_eq!(flags.amenorrhea, Some(true));
        assert_eq!(flags.fatigue, None);
        assert_eq!(flags.diabetes, None);
        assert_eq!(flags.hypertension, None);
    }
}
