//! Risk and composite scoring
//!
//! Combines the anthropometric, composition and metabolic stages into:
//! - Cardiometabolic risk score and level
//! - RED-S (relative energy deficiency in sport) risk score and level
//! - Metabolic age
//! - Body composition score
//!
//! Risk scores only count evidence that is present: a contributor with missing
//! inputs is left out of both the numerator and the denominator.

use crate::config::{CompositionScoreWeights, EngineConfig};
use crate::metabolic::cunningham_bmr;
use crate::types::{
    AnthropometricMetrics, BmiCategory, ClinicalFlags, CompositionMetrics,
    EnergyAvailabilityCategory, MetabolicMetrics, NormalizedAssessment, RiskMetrics, Sex,
};

/// Age (years) at which each reference point applies
const REFERENCE_AGES: [f64; 8] = [18.0, 25.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0];

/// Population-average lean mass (kg) at each reference age. The reference BMR
/// curve is the Cunningham BMR of these values, so an adult with average lean
/// mass for their age maps back to roughly that age.
const MALE_REFERENCE_LEAN_MASS: [f64; 8] = [65.5, 65.0, 64.0, 62.5, 61.0, 59.0, 56.5, 53.5];
const FEMALE_REFERENCE_LEAN_MASS: [f64; 8] = [45.5, 45.0, 44.5, 43.5, 42.5, 41.0, 39.5, 37.5];

/// Healthy body-fat ranges (%) by age band: under 40, 40-59, 60 and over
const MALE_BODY_FAT_RANGES: [(f64, f64); 3] = [(8.0, 19.0), (11.0, 21.0), (13.0, 24.0)];
const FEMALE_BODY_FAT_RANGES: [(f64, f64); 3] = [(21.0, 32.0), (23.0, 33.0), (24.0, 35.0)];

/// Points lost per percentage point outside the healthy range
const BODY_FAT_PENALTY_BELOW: f64 = 5.0;
const BODY_FAT_PENALTY_ABOVE: f64 = 4.0;

/// FFMI (kg/m²) mapped linearly from 0 at the floor to 100 at the target
const MALE_FFMI_RANGE: (f64, f64) = (14.0, 19.0);
const FEMALE_FFMI_RANGE: (f64, f64) = (11.0, 16.0);

/// Accumulates weighted yes/no evidence into a 0-100 score
#[derive(Debug, Default)]
struct WeightedEvidence {
    hit: f64,
    total: f64,
}

impl WeightedEvidence {
    fn add(&mut self, weight: f64, hit: Option<bool>) {
        if let Some(hit) = hit {
            self.total += weight;
            if hit {
                self.hit += weight;
            }
        }
    }

    fn score(&self) -> Option<f64> {
        if self.total > 0.0 {
            Some(100.0 * self.hit / self.total)
        } else {
            None
        }
    }
}

/// Scorer for stage 5 of the pipeline
pub struct RiskScorer;

impl RiskScorer {
    pub fn score(
        input: &NormalizedAssessment,
        anthropometry: &AnthropometricMetrics,
        composition: &CompositionMetrics,
        metabolic: &MetabolicMetrics,
        flags: &ClinicalFlags,
        config: &EngineConfig,
    ) -> RiskMetrics {
        let cardiometabolic_score = cardiometabolic_score(input, anthropometry, flags, config);
        let red_s_score = red_s_score(input, metabolic, flags, config);

        let metabolic_age = match (metabolic.bmr_cunningham, input.sex) {
            (Some(bmr), Some(sex)) => Some(metabolic_age(bmr, sex)),
            _ => None,
        };

        RiskMetrics {
            cardiometabolic_score,
            cardiometabolic_level: cardiometabolic_score
                .map(|s| config.cardiometabolic.levels.level(s)),
            red_s_score,
            red_s_level: red_s_score.map(|s| config.red_s.levels.level(s)),
            metabolic_age,
            body_composition_score: body_composition_score(
                input,
                anthropometry,
                composition,
                &config.composition_score,
            ),
        }
    }
}

fn cardiometabolic_score(
    input: &NormalizedAssessment,
    anthropometry: &AnthropometricMetrics,
    flags: &ClinicalFlags,
    config: &EngineConfig,
) -> Option<f64> {
    let c = &config.cardiometabolic;
    let mut evidence = WeightedEvidence::default();

    evidence.add(
        c.waist_height_weight,
        anthropometry.waist_height_risk.map(|r| r.is_elevated()),
    );
    evidence.add(
        c.waist_hip_weight,
        anthropometry.waist_hip_risk.map(|r| r.is_elevated()),
    );
    evidence.add(c.bmi_weight, anthropometry.bmi.map(|b| b >= c.bmi_cutoff));
    evidence.add(
        c.visceral_fat_weight,
        input.visceral_fat_index.map(|v| v > c.visceral_fat_cutoff),
    );
    evidence.add(c.hypertension_weight, flags.hypertension);
    evidence.add(c.diabetes_weight, flags.diabetes);

    evidence.score()
}

fn red_s_score(
    input: &NormalizedAssessment,
    metabolic: &MetabolicMetrics,
    flags: &ClinicalFlags,
    config: &EngineConfig,
) -> Option<f64> {
    let r = &config.red_s;
    let mut evidence = WeightedEvidence::default();

    evidence.add(
        r.low_energy_availability_weight,
        metabolic
            .energy_availability_category
            .map(|c| c == EnergyAvailabilityCategory::Low),
    );
    evidence.add(
        r.low_phase_angle_weight,
        input.phase_angle_deg.map(|pa| pa < r.phase_angle_cutoff),
    );
    evidence.add(
        r.high_ecw_tbw_weight,
        metabolic.ecw_tbw_ratio.map(|ratio| ratio > r.ecw_tbw_cutoff),
    );
    evidence.add(r.amenorrhea_weight, flags.amenorrhea);
    evidence.add(r.stress_fractures_weight, flags.stress_fractures);
    evidence.add(r.fatigue_weight, flags.fatigue);
    evidence.add(r.performance_drop_weight, flags.performance_drop);

    evidence.score()
}

/// Reference BMR at point `i`; `OTHER` uses the mean of both curves
fn reference_bmr(sex: Sex, i: usize) -> f64 {
    match sex {
        Sex::Male => cunningham_bmr(MALE_REFERENCE_LEAN_MASS[i]),
        Sex::Female => cunningham_bmr(FEMALE_REFERENCE_LEAN_MASS[i]),
        Sex::Other => {
            (cunningham_bmr(MALE_REFERENCE_LEAN_MASS[i])
                + cunningham_bmr(FEMALE_REFERENCE_LEAN_MASS[i]))
                / 2.0
        }
    }
}

/// Age at which the reference curve matches `bmr`.
///
/// The curve decreases with age, so a higher BMR maps to a younger age.
/// Results are clamped to the curve's age range and rounded to whole years.
pub fn metabolic_age(bmr: f64, sex: Sex) -> u32 {
    let last = REFERENCE_AGES.len() - 1;

    let age = if bmr >= reference_bmr(sex, 0) {
        REFERENCE_AGES[0]
    } else if bmr <= reference_bmr(sex, last) {
        REFERENCE_AGES[last]
    } else {
        (0..last)
            .find_map(|i| {
                let upper = reference_bmr(sex, i);
                let lower = reference_bmr(sex, i + 1);
                if bmr <= upper && bmr >= lower {
                    let fraction = (upper - bmr) / (upper - lower);
                    Some(REFERENCE_AGES[i] + fraction * (REFERENCE_AGES[i + 1] - REFERENCE_AGES[i]))
                } else {
                    None
                }
            })
            .unwrap_or(REFERENCE_AGES[last])
    };

    age.round() as u32
}

fn body_composition_score(
    input: &NormalizedAssessment,
    anthropometry: &AnthropometricMetrics,
    composition: &CompositionMetrics,
    weights: &CompositionScoreWeights,
) -> Option<f64> {
    let body_fat = match (composition.body_fat_percent, input.sex, input.age) {
        (Some(bf), Some(sex), Some(age)) => Some(body_fat_rating(bf, sex, age)),
        _ => None,
    };
    let ffmi = match (composition.ffmi, input.sex) {
        (Some(ffmi), Some(sex)) => Some(ffmi_rating(ffmi, sex)),
        _ => None,
    };

    let parts = [
        (weights.bmi, anthropometry.bmi_category.map(bmi_rating)),
        (weights.body_fat, body_fat),
        (weights.ffmi, ffmi),
    ];

    let (weighted, total) = parts
        .iter()
        .filter_map(|(w, score)| score.map(|s| (w * s, *w)))
        .fold((0.0, 0.0), |(acc_s, acc_w), (s, w)| (acc_s + s, acc_w + w));

    if total > 0.0 {
        Some(weighted / total)
    } else {
        None
    }
}

fn bmi_rating(category: BmiCategory) -> f64 {
    match category {
        BmiCategory::Underweight => 60.0,
        BmiCategory::Normal => 100.0,
        BmiCategory::Overweight => 70.0,
        BmiCategory::ObesityI => 45.0,
        BmiCategory::ObesityII => 30.0,
        BmiCategory::ObesityIII => 15.0,
    }
}

/// 100 inside the healthy range for sex and age, falling off linearly outside it.
///
/// Stands in for a population percentile: standing is judged by distance from
/// the healthy band for the sex and age band, not by rank against a reference
/// distribution.
pub fn body_fat_rating(bf_percent: f64, sex: Sex, age: u32) -> f64 {
    let ranges = if sex.is_male() {
        &MALE_BODY_FAT_RANGES
    } else {
        &FEMALE_BODY_FAT_RANGES
    };
    let (low, high) = match age {
        0..=39 => ranges[0],
        40..=59 => ranges[1],
        _ => ranges[2],
    };

    let score = if bf_percent < low {
        100.0 - BODY_FAT_PENALTY_BELOW * (low - bf_percent)
    } else if bf_percent > high {
        100.0 - BODY_FAT_PENALTY_ABOVE * (bf_percent - high)
    } else {
        100.0
    };

    score.clamp(0.0, 100.0)
}

pub fn ffmi_rating(ffmi: f64, sex: Sex) -> f64 {
    let (floor, target) = if sex.is_male() {
        MALE_FFMI_RANGE
    } else {
        FEMALE_FFMI_RANGE
    };
    (100.0 * (ffmi - floor) / (target - floor)).clamp(0.0, 100.0)
}
