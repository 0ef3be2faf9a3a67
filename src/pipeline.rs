//! Pipeline orchestration
//!
//! This module provides the public API for bodymetrics.
//! It runs one assessment through every stage and merges the results.

use tracing::debug;

use crate::anthropometry::AnthropometricCalculator;
use crate::composition::CompositionResolver;
use crate::config::EngineConfig;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::metabolic::MetabolicCalculator;
use crate::normalizer::Normalizer;
use crate::schema::MetricsRequest;
use crate::scoring::RiskScorer;
use crate::types::{
    AnthropometricMetrics, AssessmentInput, CalculatedMetrics, ClinicalFlags, CompositionMetrics,
    MetabolicMetrics, MetricsReport, NormalizedAssessment, PatientProfile, RiskMetrics,
};

/// Compute every derivable indicator for one assessment with the default
/// configuration and no clinical flags.
///
/// Never fails: an indicator whose inputs are missing or invalid is `None`.
///
/// # Example
/// ```ignore
/// let metrics = compute_metrics(&patient, &assessment);
/// if let Some(bmi) = metrics.bmi {
///     println!("BMI {bmi:.1}");
/// }
/// ```
pub fn compute_metrics(patient: &PatientProfile, assessment: &AssessmentInput) -> CalculatedMetrics {
    MetricsEngine::new().compute(patient, assessment, None)
}

/// Compute the report for one `bodymetrics.request.v1` JSON document.
///
/// # Returns
/// The pretty-printed report JSON, or an error if the request cannot be
/// parsed or fails validation.
pub fn compute_metrics_json(request_json: &str) -> Result<String, ComputeError> {
    MetricsEngine::new().process_json(request_json)
}

/// Engine holding an immutable configuration.
///
/// Holds no per-call state, so one engine can serve any number of
/// assessments from any number of threads.
pub struct MetricsEngine {
    config: EngineConfig,
    encoder: ReportEncoder,
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            encoder: ReportEncoder::new(),
        }
    }

    /// Create an engine with a custom configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            encoder: ReportEncoder::new(),
        })
    }

    /// Create an engine from configuration JSON
    pub fn from_config_json(json: &str) -> Result<Self, ComputeError> {
        Self::with_config(EngineConfig::from_json(json)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute metrics for one assessment
    pub fn compute(
        &self,
        patient: &PatientProfile,
        assessment: &AssessmentInput,
        flags: Option<&ClinicalFlags>,
    ) -> CalculatedMetrics {
        let normalized = Normalizer::normalize(patient, assessment);
        self.evaluate(&normalized, flags)
    }

    /// Compute metrics and wrap them in a report envelope
    pub fn report(
        &self,
        patient: &PatientProfile,
        assessment: &AssessmentInput,
        flags: Option<&ClinicalFlags>,
    ) -> MetricsReport {
        let normalized = Normalizer::normalize(patient, assessment);
        let metrics = self.evaluate(&normalized, flags);
        self.encoder.encode(patient, assessment, &normalized, metrics)
    }

    /// Validate a request and compute its report
    pub fn process_request(&self, request: &MetricsRequest) -> Result<MetricsReport, ComputeError> {
        request.validate()?;
        Ok(self.report(
            &request.patient,
            &request.assessment,
            request.clinical_flags.as_ref(),
        ))
    }

    /// Process one request JSON document into report JSON
    pub fn process_json(&self, request_json: &str) -> Result<String, ComputeError> {
        let request: MetricsRequest = serde_json::from_str(request_json)?;
        let report = self.process_request(&request)?;
        self.encoder.encode_to_json(&report)
    }

    /// Run stages 2-5 over an already normalized assessment.
    ///
    /// Pipeline stages:
    /// 1. Normalizer - done by the caller
    /// 2. AnthropometricCalculator - BMI and waist ratios
    /// 3. CompositionResolver - fat/lean split and mass indices
    /// 4. MetabolicCalculator - BMR, TDEE, energy availability
    /// 5. RiskScorer - risk scores, metabolic age, composition score
    fn evaluate(
        &self,
        normalized: &NormalizedAssessment,
        flags: Option<&ClinicalFlags>,
    ) -> CalculatedMetrics {
        let flags = flags.copied().unwrap_or_default();

        let anthropometry = AnthropometricCalculator::calculate(normalized, &self.config);
        let composition = CompositionResolver::resolve(normalized, &self.config);
        let metabolic = MetabolicCalculator::calculate(normalized, &composition, &self.config);
        let risk = RiskScorer::score(
            normalized,
            &anthropometry,
            &composition,
            &metabolic,
            &flags,
            &self.config,
        );

        debug!(
            coverage = normalized.coverage,
            issues = normalized.issues.len(),
            bf_percent_method = composition.bf_percent_method.map(|m| m.as_str()),
            "assessment evaluated"
        );

        merge(normalized.age, anthropometry, composition, metabolic, risk)
    }
}

/// Stage 6: flatten the per-stage results into one record
fn merge(
    age: Option<u32>,
    anthropometry: AnthropometricMetrics,
    composition: CompositionMetrics,
    metabolic: MetabolicMetrics,
    risk: RiskMetrics,
) -> CalculatedMetrics {
    CalculatedMetrics {
        age,

        bmi: anthropometry.bmi,
        bmi_category: anthropometry.bmi_category,
        waist_height_ratio: anthropometry.waist_height_ratio,
        waist_height_risk: anthropometry.waist_height_risk,
        waist_hip_ratio: anthropometry.waist_hip_ratio,
        waist_hip_risk: anthropometry.waist_hip_risk,

        body_fat_percent: composition.body_fat_percent,
        bf_percent_method: composition.bf_percent_method,
        skinfold_sum_mm: composition.skinfold_sum_mm,
        body_density: composition.body_density,
        bf_percent_skinfold: composition.bf_percent_skinfold,
        fat_mass_kg: composition.fat_mass_kg,
        lean_mass_kg: composition.lean_mass_kg,
        smi: composition.smi,
        ffmi: composition.ffmi,
        fmi: composition.fmi,
        smm_weight_ratio: composition.smm_weight_ratio,
        bcm_kg: composition.bcm_kg,
        protein_mass_kg: composition.protein_mass_kg,
        mineral_mass_kg: composition.mineral_mass_kg,

        bmr_mifflin: metabolic.bmr_mifflin,
        bmr_cunningham: metabolic.bmr_cunningham,
        activity_factor: metabolic.activity_factor,
        tdee: metabolic.tdee,
        energy_availability: metabolic.energy_availability,
        energy_availability_category: metabolic.energy_availability_category,
        ecw_tbw_ratio: metabolic.ecw_tbw_ratio,

        cardiometabolic_score: risk.cardiometabolic_score,
        cardiometabolic_level: risk.cardiometabolic_level,
        red_s_score: risk.red_s_score,
        red_s_level: risk.red_s_level,
        metabolic_age: risk.metabolic_age,
        body_composition_score: risk.body_composition_score,
    }
}
