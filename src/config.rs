//! Engine configuration
//!
//! Every lookup table and cutoff the engine uses lives here as immutable data.
//! `EngineConfig::default()` carries the clinical reference values; a custom
//! configuration can be loaded from JSON and is validated before use.

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;
use crate::types::{ActivityLevel, RiskLevel};

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bmi: BmiThresholds,
    pub waist: WaistRiskConfig,
    pub activity_factors: ActivityFactors,
    pub energy_availability: EnergyAvailabilityBands,
    pub composition: CompositionConfig,
    pub cardiometabolic: CardiometabolicConfig,
    pub red_s: RedSConfig,
    pub composition_score: CompositionScoreWeights,
}

/// Lower bounds (kg/m²) of each BMI category above underweight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BmiThresholds {
    pub normal_from: f64,
    pub overweight_from: f64,
    pub obesity_i_from: f64,
    pub obesity_ii_from: f64,
    pub obesity_iii_from: f64,
}

impl Default for BmiThresholds {
    fn default() -> Self {
        Self {
            normal_from: 18.5,
            overweight_from: 25.0,
            obesity_i_from: 30.0,
            obesity_ii_from: 35.0,
            obesity_iii_from: 40.0,
        }
    }
}

/// Central adiposity cutoffs; a ratio strictly above the cutoff is elevated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaistRiskConfig {
    pub waist_height_cutoff: f64,
    pub waist_hip_male_cutoff: f64,
    pub waist_hip_female_cutoff: f64,
}

impl Default for WaistRiskConfig {
    fn default() -> Self {
        Self {
            waist_height_cutoff: 0.5,
            waist_hip_male_cutoff: 0.90,
            waist_hip_female_cutoff: 0.85,
        }
    }
}

/// BMR multipliers per activity level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityFactors {
    pub sedentary: f64,
    pub light: f64,
    pub moderate: f64,
    pub intense: f64,
    pub athlete: f64,
}

impl Default for ActivityFactors {
    fn default() -> Self {
        Self {
            sedentary: 1.2,
            light: 1.35,
            moderate: 1.5,
            intense: 1.7,
            athlete: 1.9,
        }
    }
}

impl ActivityFactors {
    pub fn factor(&self, level: ActivityLevel) -> f64 {
        match level {
            ActivityLevel::Sedentary => self.sedentary,
            ActivityLevel::Light => self.light,
            ActivityLevel::Moderate => self.moderate,
            ActivityLevel::Intense => self.intense,
            ActivityLevel::Athlete => self.athlete,
        }
    }
}

/// Energy availability bands (kcal per kg lean mass per day)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyAvailabilityBands {
    /// Below this value availability is low
    pub adequate_from: f64,
    /// At or above this value availability is high
    pub high_from: f64,
}

impl Default for EnergyAvailabilityBands {
    fn default() -> Self {
        Self {
            adequate_from: 30.0,
            high_from: 45.0,
        }
    }
}

/// Body composition resolver constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Minimum number of skinfold sites for a density estimate
    pub min_skinfold_sites: usize,
    /// Body-cell mass per litre of intracellular water
    pub bcm_per_icw_litre: f64,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            min_skinfold_sites: 3,
            // BCM is ~70% water
            bcm_per_icw_litre: 1.0 / 0.70,
        }
    }
}

/// Score boundaries between risk levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    pub moderate_from: f64,
    pub high_from: f64,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            moderate_from: 30.0,
            high_from: 60.0,
        }
    }
}

impl LevelThresholds {
    pub fn level(&self, score: f64) -> RiskLevel {
        if score >= self.high_from {
            RiskLevel::High
        } else if score >= self.moderate_from {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

/// Cardiometabolic contributor weights and cutoffs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardiometabolicConfig {
    pub waist_height_weight: f64,
    pub waist_hip_weight: f64,
    pub bmi_weight: f64,
    pub visceral_fat_weight: f64,
    pub hypertension_weight: f64,
    pub diabetes_weight: f64,
    /// BMI at or above this counts as a contributor hit
    pub bmi_cutoff: f64,
    /// Visceral fat index strictly above this counts as a hit
    pub visceral_fat_cutoff: f64,
    pub levels: LevelThresholds,
}

impl Default for CardiometabolicConfig {
    fn default() -> Self {
        Self {
            waist_height_weight: 3.0,
            waist_hip_weight: 2.0,
            bmi_weight: 2.0,
            visceral_fat_weight: 3.0,
            hypertension_weight: 2.0,
            diabetes_weight: 2.0,
            bmi_cutoff: 30.0,
            visceral_fat_cutoff: 12.0,
            levels: LevelThresholds::default(),
        }
    }
}

/// RED-S contributor weights and cutoffs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedSConfig {
    pub low_energy_availability_weight: f64,
    pub low_phase_angle_weight: f64,
    pub high_ecw_tbw_weight: f64,
    pub amenorrhea_weight: f64,
    pub stress_fractures_weight: f64,
    pub fatigue_weight: f64,
    pub performance_drop_weight: f64,
    /// Phase angle (degrees) strictly below this counts as a hit
    pub phase_angle_cutoff: f64,
    /// ECW/TBW strictly above this counts as a hit
    pub ecw_tbw_cutoff: f64,
    pub levels: LevelThresholds,
}

impl Default for RedSConfig {
    fn default() -> Self {
        Self {
            low_energy_availability_weight: 3.0,
            low_phase_angle_weight: 2.0,
            high_ecw_tbw_weight: 1.0,
            amenorrhea_weight: 3.0,
            stress_fractures_weight: 3.0,
            fatigue_weight: 1.0,
            performance_drop_weight: 2.0,
            phase_angle_cutoff: 5.0,
            ecw_tbw_cutoff: 0.39,
            levels: LevelThresholds::default(),
        }
    }
}

/// Sub-score weights of the body composition score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionScoreWeights {
    pub bmi: f64,
    pub body_fat: f64,
    pub ffmi: f64,
}

impl Default for CompositionScoreWeights {
    fn default() -> Self {
        Self {
            bmi: 0.25,
            body_fat: 0.45,
            ffmi: 0.30,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from JSON; missing sections take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject tables that would make bucketing or scoring ill-defined
    pub fn validate(&self) -> Result<(), ComputeError> {
        let b = &self.bmi;
        ensure_ascending(
            "bmi",
            &[
                b.normal_from,
                b.overweight_from,
                b.obesity_i_from,
                b.obesity_ii_from,
                b.obesity_iii_from,
            ],
        )?;
        ensure_ascending(
            "energy_availability",
            &[self.energy_availability.adequate_from, self.energy_availability.high_from],
        )?;
        ensure_ascending(
            "cardiometabolic.levels",
            &[
                self.cardiometabolic.levels.moderate_from,
                self.cardiometabolic.levels.high_from,
            ],
        )?;
        ensure_ascending(
            "red_s.levels",
            &[self.red_s.levels.moderate_from, self.red_s.levels.high_from],
        )?;

        let a = &self.activity_factors;
        for (name, value) in [
            ("sedentary", a.sedentary),
            ("light", a.light),
            ("moderate", a.moderate),
            ("intense", a.intense),
            ("athlete", a.athlete),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ComputeError::InvalidConfig(format!(
                    "activity factor '{name}' must be positive, got {value}"
                )));
            }
        }

        let c = &self.cardiometabolic;
        let r = &self.red_s;
        let s = &self.composition_score;
        ensure_weights(
            "cardiometabolic",
            &[
                c.waist_height_weight,
                c.waist_hip_weight,
                c.bmi_weight,
                c.visceral_fat_weight,
                c.hypertension_weight,
                c.diabetes_weight,
            ],
        )?;
        ensure_weights(
            "red_s",
            &[
                r.low_energy_availability_weight,
                r.low_phase_angle_weight,
                r.high_ecw_tbw_weight,
                r.amenorrhea_weight,
                r.stress_fractures_weight,
                r.fatigue_weight,
                r.performance_drop_weight,
            ],
        )?;
        ensure_weights("composition_score", &[s.bmi, s.body_fat, s.ffmi])?;

        if self.composition.min_skinfold_sites == 0 || self.composition.min_skinfold_sites > 7 {
            return Err(ComputeError::InvalidConfig(format!(
                "composition.min_skinfold_sites must be within 1..=7, got {}",
                self.composition.min_skinfold_sites
            )));
        }
        if !self.composition.bcm_per_icw_litre.is_finite()
            || self.composition.bcm_per_icw_litre <= 0.0
        {
            return Err(ComputeError::InvalidConfig(
                "composition.bcm_per_icw_litre must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn ensure_ascending(section: &str, values: &[f64]) -> Result<(), ComputeError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ComputeError::InvalidConfig(format!(
            "{section}: thresholds must be finite"
        )));
    }
    if values.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ComputeError::InvalidConfig(format!(
            "{section}: thresholds must be strictly ascending"
        )));
    }
    Ok(())
}

fn ensure_weights(section: &str, weights: &[f64]) -> Result<(), ComputeError> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ComputeError::InvalidConfig(format!(
            "{section}: weights must be finite and non-negative"
        )));
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(ComputeError::InvalidConfig(format!(
            "{section}: at least one weight must be positive"
        )));
    }
    Ok(())
}
