//! Body composition resolution
//!
//! Determines one authoritative fat-mass/lean-mass split from the first
//! available source, in order:
//! 1. Directly measured body-fat percentage
//! 2. Bioimpedance-reported fat-free mass
//! 3. Skinfold body density (Jackson-Pollock) converted with the Siri equation
//!
//! Mass indices (SMI, FFMI, FMI), body-cell mass and the bioimpedance
//! pass-through compartments are derived from the resolved split.

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::types::{
    BodyFatMethod, CompositionMetrics, NormalizedAssessment, Sex, SkinfoldProtocol, SkinfoldSite,
    Skinfolds,
};

const JP3_MALE_SITES: [SkinfoldSite; 3] =
    [SkinfoldSite::Chest, SkinfoldSite::Abdominal, SkinfoldSite::Thigh];
const JP3_FEMALE_SITES: [SkinfoldSite; 3] =
    [SkinfoldSite::Triceps, SkinfoldSite::Suprailiac, SkinfoldSite::Thigh];

/// Jackson-Pollock density coefficients: `d = a - b*S + c*S² - k*age`
struct DensityCoefficients {
    a: f64,
    b: f64,
    c: f64,
    k: f64,
}

impl DensityCoefficients {
    fn density(&self, sum_mm: f64, age: u32) -> f64 {
        self.a - self.b * sum_mm + self.c * sum_mm * sum_mm - self.k * f64::from(age)
    }
}

mod jp7 {
    use super::DensityCoefficients;

    pub(super) const MALE: DensityCoefficients = DensityCoefficients {
        a: 1.112,
        b: 0.000_434_99,
        c: 0.000_000_55,
        k: 0.000_288_26,
    };
    pub(super) const FEMALE: DensityCoefficients = DensityCoefficients {
        a: 1.097,
        b: 0.000_469_71,
        c: 0.000_000_56,
        k: 0.000_128_28,
    };
}

mod jp3 {
    use super::DensityCoefficients;

    pub(super) const MALE: DensityCoefficients = DensityCoefficients {
        a: 1.109_38,
        b: 0.000_826_7,
        c: 0.000_001_6,
        k: 0.000_257_4,
    };
    pub(super) const FEMALE: DensityCoefficients = DensityCoefficients {
        a: 1.099_492_1,
        b: 0.000_992_9,
        c: 0.000_002_3,
        k: 0.000_139_2,
    };
}

/// Which regression produced a skinfold estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkinfoldEquation {
    Jp3,
    Jp7,
    /// Available sites scaled to a seven-site sum and fed into JP7
    Generalized,
}

/// Result of a skinfold density estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinfoldEstimate {
    pub equation: SkinfoldEquation,
    /// Sum of the sites the equation used (mm)
    pub sum_mm: f64,
    pub body_density: f64,
    pub body_fat_percent: f64,
}

/// Resolver for stage 3 of the pipeline
pub struct CompositionResolver;

impl CompositionResolver {
    pub fn resolve(input: &NormalizedAssessment, config: &EngineConfig) -> CompositionMetrics {
        let mut metrics = CompositionMetrics::default();
        let weight = input.weight_kg;

        if let Some(bf) = input.body_fat_percent {
            debug!(bf_percent = bf, "body fat from direct measurement");
            metrics.bf_percent_method = Some(BodyFatMethod::Direct);
            metrics.body_fat_percent = Some(bf);
            if let Some(w) = weight {
                let fat = w * bf / 100.0;
                metrics.fat_mass_kg = Some(fat);
                metrics.lean_mass_kg = Some(w - fat);
            }
        } else if let Some(ffm) = input.fat_free_mass_kg {
            debug!(ffm_kg = ffm, "body fat from bioimpedance fat-free mass");
            metrics.bf_percent_method = Some(BodyFatMethod::Bioimpedance);
            match weight {
                Some(w) if ffm <= w => {
                    let fat = w - ffm;
                    metrics.fat_mass_kg = Some(fat);
                    metrics.lean_mass_kg = Some(ffm);
                    metrics.body_fat_percent = Some(fat / w * 100.0);
                }
                Some(w) => {
                    warn!(ffm_kg = ffm, weight_kg = w, "fat-free mass exceeds body weight; omitting split");
                }
                None => {}
            }
        } else if input.skinfolds.count() >= config.composition.min_skinfold_sites {
            if let Some(estimate) = estimate_from_skinfolds(input) {
                debug!(
                    equation = ?estimate.equation,
                    density = estimate.body_density,
                    "body fat from skinfolds"
                );
                metrics.bf_percent_method = Some(BodyFatMethod::Skinfold);
                metrics.skinfold_sum_mm = Some(estimate.sum_mm);
                metrics.body_density = Some(estimate.body_density);
                metrics.bf_percent_skinfold = Some(estimate.body_fat_percent);
                metrics.body_fat_percent = Some(estimate.body_fat_percent);
                if let Some(w) = weight {
                    let fat = w * estimate.body_fat_percent / 100.0;
                    metrics.fat_mass_kg = Some(fat);
                    metrics.lean_mass_kg = Some(w - fat);
                }
            }
        }

        let height_sq = input.height_sq();

        let smm = match (input.skeletal_muscle_mass_kg, weight) {
            (Some(smm), Some(w)) if smm > w => {
                warn!(smm_kg = smm, weight_kg = w, "skeletal muscle mass exceeds body weight; omitting");
                None
            }
            (smm, _) => smm,
        };

        metrics.smi = ratio(smm, height_sq);
        metrics.ffmi = ratio(metrics.lean_mass_kg, height_sq);
        metrics.fmi = ratio(metrics.fat_mass_kg, height_sq);
        metrics.smm_weight_ratio = ratio(smm, weight);
        metrics.bcm_kg = input
            .intracellular_water_l
            .map(|icw| icw * config.composition.bcm_per_icw_litre);
        metrics.protein_mass_kg = input.protein_mass_kg;
        metrics.mineral_mass_kg = input.mineral_mass_kg;

        metrics
    }
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 => Some(n / d),
        _ => None,
    }
}

/// Estimate body density and %BF from the skinfold sites.
///
/// Needs sex and age. Returns `None` when the regression yields a density or
/// percentage outside the physically meaningful range.
pub fn estimate_from_skinfolds(input: &NormalizedAssessment) -> Option<SkinfoldEstimate> {
    let sex = input.sex?;
    let age = input.age?;
    let skinfolds = &input.skinfolds;
    let jp3_sites = if sex.is_male() {
        &JP3_MALE_SITES
    } else {
        &JP3_FEMALE_SITES
    };

    let all_seven = skinfolds.count() == 7;
    let jp3_sum = sum_sites(skinfolds, jp3_sites);

    let (equation, sum_mm, density) = match (input.skinfold_protocol, all_seven, jp3_sum) {
        (SkinfoldProtocol::Jp7 | SkinfoldProtocol::Auto, true, _) => {
            let sum = sum_available(skinfolds);
            (SkinfoldEquation::Jp7, sum, jp7_coefficients(sex).density(sum, age))
        }
        (SkinfoldProtocol::Jp3 | SkinfoldProtocol::Auto, _, Some(sum)) => {
            (SkinfoldEquation::Jp3, sum, jp3_coefficients(sex).density(sum, age))
        }
        _ => {
            let n = skinfolds.count();
            if n == 0 {
                return None;
            }
            let sum = sum_available(skinfolds);
            let seven_site_equivalent = sum * 7.0 / n as f64;
            (
                SkinfoldEquation::Generalized,
                sum,
                jp7_coefficients(sex).density(seven_site_equivalent, age),
            )
        }
    };

    if density <= 0.0 {
        warn!(density, "skinfold regression produced a non-positive density");
        return None;
    }

    let bf = siri_body_fat_percent(density);
    if !(0.0..100.0).contains(&bf) {
        warn!(bf_percent = bf, "skinfold body fat outside [0, 100); omitting");
        return None;
    }

    Some(SkinfoldEstimate {
        equation,
        sum_mm,
        body_density: density,
        body_fat_percent: bf,
    })
}

/// Siri (1961): %BF = 495 / density - 450
pub fn siri_body_fat_percent(body_density: f64) -> f64 {
    495.0 / body_density - 450.0
}

fn jp7_coefficients(sex: Sex) -> &'static DensityCoefficients {
    if sex.is_male() {
        &jp7::MALE
    } else {
        &jp7::FEMALE
    }
}

fn jp3_coefficients(sex: Sex) -> &'static DensityCoefficients {
    if sex.is_male() {
        &jp3::MALE
    } else {
        &jp3::FEMALE
    }
}

fn sum_available(skinfolds: &Skinfolds) -> f64 {
    skinfolds.sites().iter().filter_map(|(_, v)| *v).sum()
}

/// Sum of the given sites, or `None` if any is missing
fn sum_sites(skinfolds: &Skinfolds, sites: &[SkinfoldSite]) -> Option<f64> {
    sites.iter().map(|site| skinfolds.get(*site)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    fn make_input() -> NormalizedAssessment {
        NormalizedAssessment {
            sex: Some(Sex::Male),
            age: Some(30),
            height_m: Some(1.80),
            weight_kg: Some(90.0),
            ..Default::default()
        }
    }

    fn male_jp3_skinfolds() -> Skinfolds {
        Skinfolds {
            chest_mm: Some(12.0),
            abdominal_mm: Some(25.0),
            thigh_mm: Some(18.0),
            ..Default::default()
        }
    }

    fn seven_skinfolds() -> Skinfolds {
        Skinfolds {
            triceps_mm: Some(10.0),
            subscapular_mm: Some(14.0),
            suprailiac_mm: Some(16.0),
            abdominal_mm: Some(25.0),
            thigh_mm: Some(18.0),
            chest_mm: Some(12.0),
            midaxillary_mm: Some(11.0),
        }
    }

    #[test]
    fn test_direct_body_fat() {
        let mut input = make_input();
        input.body_fat_percent = Some(20.0);

        let metrics = CompositionResolver::resolve(&input, &EngineConfig::default());

        assert_eq!(metrics.bf_percent_method, Some(BodyFatMethod::Direct));
        assert!(approx_eq(metrics.fat_mass_kg.unwrap(), 18.0, 1e-9));
        assert!(approx_eq(metrics.lean_mass_kg.unwrap(), 72.0, 1e-9));
        // 72 / 3.24
        assert!(approx_eq(metrics.ffmi.unwrap(), 22.222, 1e-3));
        assert!(approx_eq(metrics.fmi.unwrap(), 5.5556, 1e-3));
    }

    #[test]
    fn test_direct_beats_bioimpedance_and_skinfolds() {
        let mut input = make_input();
        input.body_fat_percent = Some(20.0);
        input.fat_free_mass_kg = Some(60.0);
        input.skinfolds = seven_skinfolds();

        let metrics = CompositionResolver::resolve(&input, &EngineConfig::default());

        assert_eq!(metrics.bf_percent_method, Some(BodyFatMethod::Direct));
        assert!(approx_eq(metrics.lean_mass_kg.unwrap(), 72.0, 1e-9));
        assert_eq!(metrics.body_density, None);
        assert_eq!(metrics.skinfold_sum_mm, None);
    }

    #[test]
    fn test_bioimpedance_fat_free_mass() {
        let mut input = make_input();
        input.fat_free_mass_kg = Some(70.0);
        input.skinfolds = seven_skinfolds();

        let metrics = CompositionResolver::resolve(&input, &EngineConfig::default());

        assert_eq!(metrics.bf_percent_method, Some(BodyFatMethod::Bioimpedance));
        assert_eq!(metrics.lean_mass_kg, Some(70.0));
        assert!(approx_eq(metrics.fat_mass_kg.unwrap(), 20.0, 1e-9));
        assert!(approx_eq(metrics.body_fat_percent.unwrap(), 22.222, 1e-3));
    }

    #[test]
    fn test_fat_free_mass_above_weight_is_omitted() {
        let mut input = make_input();
        input.fat_free_mass_kg = Some(95.0);

        let metrics = CompositionResolver::resolve(&input, &EngineConfig::default());

        assert_eq!(metrics.fat_mass_kg, None);
        assert_eq!(metrics.lean_mass_kg, None);
        assert_eq!(metrics.ffmi, None);
    }

    #[test]
    fn test_three_skinfolds_use_jp3() {
        let mut input = make_input();
        input.skinfolds = male_jp3_skinfolds();

        let estimate = estimate_from_skinfolds(&input).unwrap();
        assert_eq!(estimate.equation, SkinfoldEquation::Jp3);
        assert!(approx_eq(estimate.sum_mm, 55.0, 1e-9));

        // d = 1.10938 - 0.0008267*55 + 0.0000016*55² - 0.0002574*30
        let expected_density = 1.10938 - 0.0008267 * 55.0 + 0.0000016 * 3025.0 - 0.0002574 * 30.0;
        assert!(approx_eq(estimate.body_density, expected_density, 1e-12));
        assert!(approx_eq(
            estimate.body_fat_percent,
            495.0 / expected_density - 450.0,
            1e-9
        ));

        let metrics = CompositionResolver::resolve(&input, &EngineConfig::default());
        assert_eq!(metrics.bf_percent_method, Some(BodyFatMethod::Skinfold));
        let fat = metrics.fat_mass_kg.unwrap();
        let lean = metrics.lean_mass_kg.unwrap();
        assert!(fat > 0.0 && lean > 0.0);
        assert!(approx_eq(fat + lean, 90.0, 1e-6));
    }

    #[test]
    fn test_seven_skinfolds_use_jp7() {
        let mut input = make_input();
        input.skinfolds = seven_skinfolds();

        let estimate = estimate_from_skinfolds(&input).unwrap();

        assert_eq!(estimate.equation, SkinfoldEquation::Jp7);
        assert!(approx_eq(estimate.sum_mm, 106.0, 1e-9));
        // Typical lean-ish male lands in the low-to-mid teens
        assert!(estimate.body_fat_percent > 8.0 && estimate.body_fat_percent < 25.0);
    }

    #[test]
    fn test_explicit_jp3_with_seven_sites() {
        let mut input = make_input();
        input.skinfolds = seven_skinfolds();
        input.skinfold_protocol = SkinfoldProtocol::Jp3;

        let estimate = estimate_from_skinfolds(&input).unwrap();

        assert_eq!(estimate.equation, SkinfoldEquation::Jp3);
        assert!(approx_eq(estimate.sum_mm, 55.0, 1e-9));
    }

    #[test]
    fn test_arbitrary_three_sites_use_generalized_regression() {
        let mut input = make_input();
        input.skinfolds = Skinfolds {
            triceps_mm: Some(10.0),
            subscapular_mm: Some(14.0),
            midaxillary_mm: Some(11.0),
            ..Default::default()
        };

        let estimate = estimate_from_skinfolds(&input).unwrap();

        assert_eq!(estimate.equation, SkinfoldEquation::Generalized);
        let expected = jp7::MALE.density(35.0 * 7.0 / 3.0, 30);
        assert!(approx_eq(estimate.body_density, expected, 1e-12));
    }

    #[test]
    fn test_jp7_protocol_with_three_sites_falls_back_to_generalized() {
        let mut input = make_input();
        input.skinfolds = male_jp3_skinfolds();
        input.skinfold_protocol = SkinfoldProtocol::Jp7;

        let estimate = estimate_from_skinfolds(&input).unwrap();

        assert_eq!(estimate.equation, SkinfoldEquation::Generalized);
        assert!(approx_eq(estimate.sum_mm, 55.0, 1e-9));
        let expected = jp7::MALE.density(55.0 * 7.0 / 3.0, 30);
        assert!(approx_eq(estimate.body_density, expected, 1e-12));

        let metrics = CompositionResolver::resolve(&input, &EngineConfig::default());
        assert_eq!(metrics.bf_percent_method, Some(BodyFatMethod::Skinfold));
        assert_eq!(metrics.skinfold_sum_mm, Some(estimate.sum_mm));
        assert!(approx_eq(metrics.fat_mass_kg.unwrap() + metrics.lean_mass_kg.unwrap(), 90.0, 1e-6));
    }

    #[test]
    fn test_negative_skinfold_body_fat_is_omitted() {
        let mut input = make_input();
        input.skinfolds = Skinfolds {
            chest_mm: Some(0.0),
            abdominal_mm: Some(0.0),
            thigh_mm: Some(0.0),
            ..Default::default()
        };

        // Density 1.1017 is above Siri's 1.1 ceiling, so %BF would be negative
        let density = jp3::MALE.density(0.0, 30);
        assert!(siri_body_fat_percent(density) < 0.0);
        assert!(estimate_from_skinfolds(&input).is_none());

        let metrics = CompositionResolver::resolve(&input, &EngineConfig::default());
        assert_eq!(metrics.bf_percent_method, None);
        assert_eq!(metrics.body_fat_percent, None);
        assert_eq!(metrics.body_density, None);
        assert_eq!(metrics.skinfold_sum_mm, None);
        assert_eq!(metrics.fat_mass_kg, None);
        assert_eq!(metrics.lean_mass_kg, None);
    }

    #[test]
    fn test_other_sex_uses_female_sites() {
        let mut input = make_input();
        input.sex = Some(Sex::Other);
        input.skinfolds = Skinfolds {
            triceps_mm: Some(18.0),
            suprailiac_mm: Some(15.0),
            thigh_mm: Some(25.0),
            ..Default::default()
        };

        let estimate = estimate_from_skinfolds(&input).unwrap();

        assert_eq!(estimate.equation, SkinfoldEquation::Jp3);
        let expected = jp3::FEMALE.density(58.0, 30);
        assert!(approx_eq(estimate.body_density, expected, 1e-12));
    }

    #[test]
    fn test_skinfolds_need_age_and_sex() {
        let mut input = make_input();
        input.skinfolds = male_jp3_skinfolds();
        input.age = None;

        let metrics = CompositionResolver::resolve(&input, &EngineConfig::default());

        assert_eq!(metrics.bf_percent_method, None);
        assert_eq!(metrics.fat_mass_kg, None);
    }

    #[test]
    fn test_two_skinfolds_are_not_enough() {
        let mut input = make_input();
        input.skinfolds = Skinfolds {
            chest_mm: Some(12.0),
            thigh_mm: Some(18.0),
            ..Default::default()
        };

        let metrics = CompositionResolver::resolve(&input, &EngineConfig::default());

        assert_eq!(metrics.bf_percent_method, None);
        assert_eq!(metrics.lean_mass_kg, None);
    }

    #[test]
    fn test_skinfold_estimate_without_weight() {
        let mut input = make_input();
        input.weight_kg = None;
        input.skinfolds = male_jp3_skinfolds();

        let metrics = CompositionResolver::resolve(&input, &EngineConfig::default());

        assert!(metrics.bf_percent_skinfold.is_some());
        assert_eq!(metrics.fat_mass_kg, None);
        assert_eq!(metrics.lean_mass_kg, None);
    }

    #[test]
    fn test_muscle_and_cell_mass() {
        let mut input = make_input();
        input.skeletal_muscle_mass_kg = Some(40.5);
        input.intracellular_water_l = Some(28.0);
        input.protein_mass_kg = Some(12.1);

        let metrics = CompositionResolver::resolve(&input, &EngineConfig::default());

        assert!(approx_eq(metrics.smi.unwrap(), 12.5, 1e-9));
        assert!(approx_eq(metrics.smm_weight_ratio.unwrap(), 0.45, 1e-9));
        assert!(approx_eq(metrics.bcm_kg.unwrap(), 40.0, 1e-9));
        assert_eq!(metrics.protein_mass_kg, Some(12.1));
        assert_eq!(metrics.mineral_mass_kg, None);
    }

    #[test]
    fn test_muscle_mass_above_weight_is_omitted() {
        let mut input = make_input();
        input.skeletal_muscle_mass_kg = Some(120.0);

        let metrics = CompositionResolver::resolve(&input, &EngineConfig::default());

        assert_eq!(metrics.smi, None);
        assert_eq!(metrics.smm_weight_ratio, None);
    }

    #[test]
    fn test_siri() {
        // Density 1.0 => 45%
        assert!(approx_eq(siri_body_fat_percent(1.0), 45.0, 1e-9));
        assert!(approx_eq(siri_body_fat_percent(1.1), 0.0, 1e-9));
    }
}
