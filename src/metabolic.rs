//! Metabolic calculations
//!
//! Basal metabolic rate by Mifflin-St Jeor (weight/height/age) and Cunningham
//! (lean mass), total daily energy expenditure, energy availability and the
//! ECW/TBW hydration ratio.

use tracing::warn;

use crate::config::{EnergyAvailabilityBands, EngineConfig};
use crate::types::{
    CompositionMetrics, EnergyAvailabilityCategory, MetabolicMetrics, NormalizedAssessment, Sex,
};

/// Mifflin-St Jeor coefficients
mod mifflin {
    pub const WEIGHT: f64 = 10.0;
    pub const HEIGHT_CM: f64 = 6.25;
    pub const AGE: f64 = 5.0;
    pub const MALE: f64 = 5.0;
    pub const FEMALE: f64 = -161.0;
}

/// Cunningham (1980) coefficients
mod cunningham {
    pub const INTERCEPT: f64 = 500.0;
    pub const LEAN_MASS: f64 = 22.0;
}

/// Calculator for stage 4 of the pipeline
pub struct MetabolicCalculator;

impl MetabolicCalculator {
    pub fn calculate(
        input: &NormalizedAssessment,
        composition: &CompositionMetrics,
        config: &EngineConfig,
    ) -> MetabolicMetrics {
        let bmr_mifflin = match (input.weight_kg, input.height_cm(), input.age, input.sex) {
            (Some(weight), Some(height_cm), Some(age), Some(sex)) => {
                Some(mifflin_st_jeor(weight, height_cm, age, sex))
            }
            _ => None,
        };

        let bmr_cunningham = composition.lean_mass_kg.map(cunningham_bmr);

        let activity_level = input.activity_level.unwrap_or_default();
        let activity_factor = config.activity_factors.factor(activity_level);
        let tdee = bmr_mifflin.or(bmr_cunningham).map(|bmr| bmr * activity_factor);

        let energy_availability = match (
            input.estimated_intake_kcal,
            input.exercise_expenditure_kcal,
            composition.lean_mass_kg,
        ) {
            (Some(intake), Some(exercise), Some(lean)) if lean > 0.0 => {
                Some((intake - exercise) / lean)
            }
            _ => None,
        };
        let energy_availability_category = energy_availability
            .map(|ea| energy_availability_category(ea, &config.energy_availability));

        MetabolicMetrics {
            bmr_mifflin,
            bmr_cunningham,
            activity_factor: tdee.map(|_| activity_factor),
            tdee,
            energy_availability,
            energy_availability_category,
            ecw_tbw_ratio: ecw_tbw_ratio(input),
        }
    }
}

/// BMR = 10·weight + 6.25·height_cm − 5·age + s, with s = +5 for men and −161 otherwise
pub fn mifflin_st_jeor(weight_kg: f64, height_cm: f64, age: u32, sex: Sex) -> f64 {
    let sex_constant = if sex.is_male() {
        mifflin::MALE
    } else {
        mifflin::FEMALE
    };

    mifflin::WEIGHT * weight_kg + mifflin::HEIGHT_CM * height_cm - mifflin::AGE * f64::from(age)
        + sex_constant
}

/// BMR = 500 + 22·lean mass
pub fn cunningham_bmr(lean_mass_kg: f64) -> f64 {
    cunningham::INTERCEPT + cunningham::LEAN_MASS * lean_mass_kg
}

pub fn energy_availability_category(
    ea: f64,
    bands: &EnergyAvailabilityBands,
) -> EnergyAvailabilityCategory {
    if ea >= bands.high_from {
        EnergyAvailabilityCategory::High
    } else if ea >= bands.adequate_from {
        EnergyAvailabilityCategory::Adequate
    } else {
        EnergyAvailabilityCategory::Low
    }
}

fn ecw_tbw_ratio(input: &NormalizedAssessment) -> Option<f64> {
    let ecw = input.extracellular_water_l?;
    let tbw = input.total_body_water_l?;
    if tbw <= 0.0 {
        return None;
    }
    if ecw > tbw {
        warn!(ecw_l = ecw, tbw_l = tbw, "extracellular water exceeds total body water; omitting ratio");
        return None;
    }
    Some(ecw / tbw)
}
