//! Core types for the bodymetrics pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! engine: raw patient/assessment inputs, the normalized assessment, the
//! per-stage results, and the aggregated `CalculatedMetrics` record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalizer::{lenient_f64, lenient_option};

/// Biological sex as recorded on the patient profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M", alias = "m", alias = "male", alias = "MALE")]
    Male,
    #[serde(rename = "F", alias = "f", alias = "female", alias = "FEMALE")]
    Female,
    #[serde(rename = "OTHER", alias = "other")]
    Other,
}

impl Sex {
    /// Sex-specific equations only distinguish male from everything else
    pub fn is_male(&self) -> bool {
        matches!(self, Sex::Male)
    }
}

/// Habitual activity level used to scale BMR into TDEE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityLevel {
    #[serde(alias = "sedentary")]
    Sedentary,
    #[serde(alias = "light")]
    Light,
    #[default]
    #[serde(alias = "moderate")]
    Moderate,
    #[serde(alias = "intense")]
    Intense,
    #[serde(alias = "athlete")]
    Athlete,
}

/// Skinfold regression protocol requested by the assessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinfoldProtocol {
    /// Pick the most specific equation the available sites allow
    #[default]
    Auto,
    /// Jackson-Pollock three-site
    Jp3,
    /// Jackson-Pollock seven-site
    Jp7,
}

/// Skinfold measurement sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinfoldSite {
    Triceps,
    Subscapular,
    Suprailiac,
    Abdominal,
    Thigh,
    Chest,
    Midaxillary,
}

/// Skinfold thicknesses in millimetres
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skinfolds {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub triceps_mm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub subscapular_mm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub suprailiac_mm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub abdominal_mm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub thigh_mm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub chest_mm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub midaxillary_mm: Option<f64>,
}

impl Skinfolds {
    /// All seven sites with their (possibly absent) thickness
    pub fn sites(&self) -> [(SkinfoldSite, Option<f64>); 7] {
        [
            (SkinfoldSite::Triceps, self.triceps_mm),
            (SkinfoldSite::Subscapular, self.subscapular_mm),
            (SkinfoldSite::Suprailiac, self.suprailiac_mm),
            (SkinfoldSite::Abdominal, self.abdominal_mm),
            (SkinfoldSite::Thigh, self.thigh_mm),
            (SkinfoldSite::Chest, self.chest_mm),
            (SkinfoldSite::Midaxillary, self.midaxillary_mm),
        ]
    }

    pub fn get(&self, site: SkinfoldSite) -> Option<f64> {
        match site {
            SkinfoldSite::Triceps => self.triceps_mm,
            SkinfoldSite::Subscapular => self.subscapular_mm,
            SkinfoldSite::Suprailiac => self.suprailiac_mm,
            SkinfoldSite::Abdominal => self.abdominal_mm,
            SkinfoldSite::Thigh => self.thigh_mm,
            SkinfoldSite::Chest => self.chest_mm,
            SkinfoldSite::Midaxillary => self.midaxillary_mm,
        }
    }

    /// Number of sites with a measurement
    pub fn count(&self) -> usize {
        self.sites().iter().filter(|(_, v)| v.is_some()).count()
    }
}

/// Patient demographics (immutable per call)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    /// Height in metres
    #[serde(default, deserialize_with = "lenient_f64")]
    pub height_m: Option<f64>,
}

/// Raw inputs of one clinical assessment (immutable per call)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentInput {
    pub id: Uuid,
    /// When the measurements were taken; the only date used for age
    pub measured_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weight_kg: Option<f64>,

    // Circumferences (cm)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub waist_cm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub hip_cm: Option<f64>,
    /// Recorded for the chart; no derivation reads it
    #[serde(default, deserialize_with = "lenient_f64")]
    pub neck_cm: Option<f64>,

    // Bioimpedance readings
    #[serde(default, deserialize_with = "lenient_f64")]
    pub body_fat_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fat_free_mass_kg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub skeletal_muscle_mass_kg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_body_water_l: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub extracellular_water_l: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub intracellular_water_l: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub visceral_fat_index: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub phase_angle_deg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub protein_mass_kg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mineral_mass_kg: Option<f64>,

    // Energy balance
    #[serde(default, deserialize_with = "lenient_option")]
    pub activity_level: Option<ActivityLevel>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub estimated_intake_kcal: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub exercise_expenditure_kcal: Option<f64>,

    // Skinfold anthropometry
    #[serde(default)]
    pub skinfolds: Skinfolds,
    #[serde(default, deserialize_with = "lenient_option")]
    pub skinfold_protocol: Option<SkinfoldProtocol>,

    /// Free text, never used in computation
    #[serde(default)]
    pub notes: Option<String>,
}

impl AssessmentInput {
    /// Create an assessment with only the measurement date and weight set
    pub fn new(measured_at: DateTime<Utc>, weight_kg: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            measured_at,
            weight_kg,
            waist_cm: None,
            hip_cm: None,
            neck_cm: None,
            body_fat_percent: None,
            fat_free_mass_kg: None,
            skeletal_muscle_mass_kg: None,
            total_body_water_l: None,
            extracellular_water_l: None,
            intracellular_water_l: None,
            visceral_fat_index: None,
            phase_angle_deg: None,
            protein_mass_kg: None,
            mineral_mass_kg: None,
            activity_level: None,
            estimated_intake_kcal: None,
            exercise_expenditure_kcal: None,
            skinfolds: Skinfolds::default(),
            skinfold_protocol: None,
            notes: None,
        }
    }
}

/// Symptom and comorbidity flags from the clinical intake.
///
/// `None` means "not assessed" and is left out of every score; `Some(false)`
/// counts as evidence that the finding is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalFlags {
    #[serde(default, deserialize_with = "lenient_option")]
    pub amenorrhea: Option<bool>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub stress_fractures: Option<bool>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub fatigue: Option<bool>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub performance_drop: Option<bool>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub hypertension: Option<bool>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub diabetes: Option<bool>,
}

/// Why the normalizer dropped a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueReason {
    NotFinite,
    Negative,
    NotPositive,
    OutOfRange,
    /// Birth date falls after the assessment date
    BirthAfterAssessment,
}

/// A value rejected during normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputIssue {
    pub field: String,
    pub reason: IssueReason,
}

/// Typed, unit-consistent view of one assessment.
///
/// Every field here has passed the per-field sanity policy; rejected values
/// are `None` and listed in `issues`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAssessment {
    pub sex: Option<Sex>,
    pub age: Option<u32>,
    pub height_m: Option<f64>,
    pub weight_kg: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hip_cm: Option<f64>,
    /// Validated and carried through; the body-fat precedence chain ignores it
    pub neck_cm: Option<f64>,
    pub body_fat_percent: Option<f64>,
    pub fat_free_mass_kg: Option<f64>,
    pub skeletal_muscle_mass_kg: Option<f64>,
    pub total_body_water_l: Option<f64>,
    pub extracellular_water_l: Option<f64>,
    pub intracellular_water_l: Option<f64>,
    pub visceral_fat_index: Option<f64>,
    pub phase_angle_deg: Option<f64>,
    pub protein_mass_kg: Option<f64>,
    pub mineral_mass_kg: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub estimated_intake_kcal: Option<f64>,
    pub exercise_expenditure_kcal: Option<f64>,
    pub skinfolds: Skinfolds,
    pub skinfold_protocol: SkinfoldProtocol,
    /// Share of tracked core fields present (0-1)
    pub coverage: f64,
    pub issues: Vec<InputIssue>,
}

impl NormalizedAssessment {
    pub fn height_cm(&self) -> Option<f64> {
        self.height_m.map(|h| h * 100.0)
    }

    /// Height squared in m², the denominator of every mass index
    pub fn height_sq(&self) -> Option<f64> {
        self.height_m.map(|h| h * h)
    }
}

/// BMI category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    ObesityI,
    ObesityII,
    ObesityIII,
}

/// Binary anthropometric risk label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskFlag {
    Normal,
    Elevated,
}

impl RiskFlag {
    pub fn is_elevated(&self) -> bool {
        matches!(self, RiskFlag::Elevated)
    }
}

/// Which source the fat/lean split came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFatMethod {
    Direct,
    Bioimpedance,
    Skinfold,
}

impl BodyFatMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyFatMethod::Direct => "direct",
            BodyFatMethod::Bioimpedance => "bioimpedance",
            BodyFatMethod::Skinfold => "skinfold",
        }
    }
}

/// Energy availability band (kcal per kg lean mass)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyAvailabilityCategory {
    Low,
    Adequate,
    High,
}

/// Three-level bucket shared by composite risk scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

/// Stage 2 output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnthropometricMetrics {
    pub bmi: Option<f64>,
    pub bmi_category: Option<BmiCategory>,
    pub waist_height_ratio: Option<f64>,
    pub waist_height_risk: Option<RiskFlag>,
    pub waist_hip_ratio: Option<f64>,
    pub waist_hip_risk: Option<RiskFlag>,
}

/// Stage 3 output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionMetrics {
    pub body_fat_percent: Option<f64>,
    pub bf_percent_method: Option<BodyFatMethod>,
    pub skinfold_sum_mm: Option<f64>,
    pub body_density: Option<f64>,
    pub bf_percent_skinfold: Option<f64>,
    pub fat_mass_kg: Option<f64>,
    pub lean_mass_kg: Option<f64>,
    pub smi: Option<f64>,
    pub ffmi: Option<f64>,
    pub fmi: Option<f64>,
    pub smm_weight_ratio: Option<f64>,
    pub bcm_kg: Option<f64>,
    pub protein_mass_kg: Option<f64>,
    pub mineral_mass_kg: Option<f64>,
}

/// Stage 4 output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetabolicMetrics {
    pub bmr_mifflin: Option<f64>,
    pub bmr_cunningham: Option<f64>,
    pub activity_factor: Option<f64>,
    pub tdee: Option<f64>,
    pub energy_availability: Option<f64>,
    pub energy_availability_category: Option<EnergyAvailabilityCategory>,
    pub ecw_tbw_ratio: Option<f64>,
}

/// Stage 5 output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub cardiometabolic_score: Option<f64>,
    pub cardiometabolic_level: Option<RiskLevel>,
    pub red_s_score: Option<f64>,
    pub red_s_level: Option<RiskLevel>,
    pub metabolic_age: Option<u32>,
    pub body_composition_score: Option<f64>,
}

/// Every derived indicator for one assessment.
///
/// A field is present only if its required inputs were present and valid.
/// When `fat_mass_kg` is present, `lean_mass_kg` is too and they sum to the
/// assessment weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatedMetrics {
    pub age: Option<u32>,

    // Anthropometry
    pub bmi: Option<f64>,
    pub bmi_category: Option<BmiCategory>,
    pub waist_height_ratio: Option<f64>,
    pub waist_height_risk: Option<RiskFlag>,
    pub waist_hip_ratio: Option<f64>,
    pub waist_hip_risk: Option<RiskFlag>,

    // Body composition
    pub body_fat_percent: Option<f64>,
    pub bf_percent_method: Option<BodyFatMethod>,
    pub skinfold_sum_mm: Option<f64>,
    pub body_density: Option<f64>,
    pub bf_percent_skinfold: Option<f64>,
    pub fat_mass_kg: Option<f64>,
    pub lean_mass_kg: Option<f64>,
    pub smi: Option<f64>,
    pub ffmi: Option<f64>,
    pub fmi: Option<f64>,
    pub smm_weight_ratio: Option<f64>,
    pub bcm_kg: Option<f64>,
    pub protein_mass_kg: Option<f64>,
    pub mineral_mass_kg: Option<f64>,

    // Metabolism
    pub bmr_mifflin: Option<f64>,
    pub bmr_cunningham: Option<f64>,
    pub activity_factor: Option<f64>,
    pub tdee: Option<f64>,
    pub energy_availability: Option<f64>,
    pub energy_availability_category: Option<EnergyAvailabilityCategory>,
    pub ecw_tbw_ratio: Option<f64>,

    // Risk and composite scores
    pub cardiometabolic_score: Option<f64>,
    pub cardiometabolic_level: Option<RiskLevel>,
    pub red_s_score: Option<f64>,
    pub red_s_level: Option<RiskLevel>,
    pub metabolic_age: Option<u32>,
    pub body_composition_score: Option<f64>,
}

/// Producer metadata embedded in reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
}

/// Which records a report was computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub patient_id: Uuid,
    pub assessment_id: Uuid,
    pub measured_at_utc: String,
}

/// Input quality summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportQuality {
    /// Share of tracked core inputs present (0-1)
    pub coverage: f64,
    pub bf_percent_method: Option<BodyFatMethod>,
    pub issues: Vec<InputIssue>,
}

/// Complete report for one assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub quality: ReportQuality,
    pub metrics: CalculatedMetrics,
}
