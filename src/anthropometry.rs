//! Anthropometric indices
//!
//! BMI, waist-to-height and waist-to-hip ratios with their categorical labels.
//! Each index is computed independently and omitted when its inputs are missing.

use crate::config::{BmiThresholds, EngineConfig, WaistRiskConfig};
use crate::types::{AnthropometricMetrics, BmiCategory, NormalizedAssessment, RiskFlag, Sex};

/// Calculator for stage 2 of the pipeline
pub struct AnthropometricCalculator;

impl AnthropometricCalculator {
    pub fn calculate(input: &NormalizedAssessment, config: &EngineConfig) -> AnthropometricMetrics {
        let bmi = compute_bmi(input);
        let bmi_category = bmi.map(|b| bmi_category(b, &config.bmi));

        let waist_height_ratio = compute_waist_height_ratio(input);
        let waist_height_risk =
            waist_height_ratio.map(|r| flag_above(r, config.waist.waist_height_cutoff));

        let waist_hip_ratio = compute_waist_hip_ratio(input);
        let waist_hip_risk = match (waist_hip_ratio, input.sex) {
            (Some(ratio), Some(sex)) => Some(waist_hip_risk(ratio, sex, &config.waist)),
            _ => None,
        };

        AnthropometricMetrics {
            bmi,
            bmi_category,
            waist_height_ratio,
            waist_height_risk,
            waist_hip_ratio,
            waist_hip_risk,
        }
    }
}

/// BMI = weight / height²
fn compute_bmi(input: &NormalizedAssessment) -> Option<f64> {
    let weight = input.weight_kg?;
    let height_sq = input.height_sq()?;
    Some(weight / height_sq)
}

/// Waist (cm) over height (cm)
fn compute_waist_height_ratio(input: &NormalizedAssessment) -> Option<f64> {
    let waist = input.waist_cm?;
    let height_cm = input.height_cm()?;
    Some(waist / height_cm)
}

fn compute_waist_hip_ratio(input: &NormalizedAssessment) -> Option<f64> {
    let waist = input.waist_cm?;
    let hip = input.hip_cm?;
    Some(waist / hip)
}

/// Bucket a BMI value into its category. Lower bounds are inclusive.
pub fn bmi_category(bmi: f64, thresholds: &BmiThresholds) -> BmiCategory {
    if bmi >= thresholds.obesity_iii_from {
        BmiCategory::ObesityIII
    } else if bmi >= thresholds.obesity_ii_from {
        BmiCategory::ObesityII
    } else if bmi >= thresholds.obesity_i_from {
        BmiCategory::ObesityI
    } else if bmi >= thresholds.overweight_from {
        BmiCategory::Overweight
    } else if bmi >= thresholds.normal_from {
        BmiCategory::Normal
    } else {
        BmiCategory::Underweight
    }
}

/// Waist-hip risk; `OTHER` uses the stricter female cutoff
pub fn waist_hip_risk(ratio: f64, sex: Sex, config: &WaistRiskConfig) -> RiskFlag {
    let cutoff = if sex.is_male() {
        config.waist_hip_male_cutoff
    } else {
        config.waist_hip_female_cutoff
    };
    flag_above(ratio, cutoff)
}

fn flag_above(value: f64, cutoff: f64) -> RiskFlag {
    if value > cutoff {
        RiskFlag::Elevated
    } else {
        RiskFlag::Normal
    }
}
