//! Scenario configuration.
//!
//! All tunable inputs of a single simulation run live here. Construction is
//! cheap; [`ScenarioConfig::validate`] rejects out-of-range parameters and
//! inconsistent option combinations before a run starts.

use crate::errors::{GcrError, GcrResult};
use serde::{Deserialize, Serialize};

/// How the co-benefit overlay pool is redistributed at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CobenefitWeighting {
    /// Weight by the host country's co-benefit weight (`base_cqe`).
    CountryWeight,
    /// Weight by the per-project co-benefit score sampled at initiation.
    ProjectScore,
}

/// A deterministic inflation shock applied at the start of a given year.
/// Used by stress scenarios that need reproducible shock timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledShock {
    pub year: usize,
    /// Additive shock to realized inflation (e.g. 0.01 = +1 percentage point).
    pub magnitude: f64,
}

/// Parameters of a single scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Simulation duration
    /// unit: years
    /// default: 50
    pub years: usize,

    /// Atmospheric CO2 at the start of the run
    /// unit: ppm
    /// default: 420.0
    pub initial_co2_ppm: f64,

    /// Roadmap target the controller steers toward
    /// unit: ppm
    /// default: 350.0
    pub target_co2_ppm: f64,

    /// Initial XCR price floor
    /// unit: USD
    /// default: 100.0
    pub initial_price_floor: f64,

    /// Inflation target used by the controller and the alliance
    /// unit: fraction/yr (0.02 = 2%)
    /// default: 0.02
    pub inflation_target: f64,

    /// Countries joining the alliance per year. Fractional parts are
    /// resolved probabilistically each tick.
    /// default: 3.5
    pub adoption_rate: f64,

    /// Whether the auditor verifies projects and mints XCR.
    /// default: true
    pub enable_audits: bool,

    /// RNG seed. Identical (config, seed) pairs produce bit-identical runs.
    /// default: 42
    pub seed: u64,

    /// Year in which business-as-usual emissions stop growing
    /// default: 6
    pub bau_peak_year: usize,

    /// One-time capital injection while the market bootstraps
    /// unit: USD
    /// default: 2e10
    pub one_time_seed_capital_usd: f64,

    /// Total CDR material budget before scarcity bites hard
    /// unit: GtCO2
    /// default: 500.0
    pub cdr_material_budget_gt: f64,

    /// Peak cost multiplier as the CDR material budget depletes
    /// default: 4.0
    pub cdr_material_cost_multiplier: f64,

    /// Residual CDR build capacity once materials are exhausted
    /// default: 0.25
    pub cdr_material_capacity_floor: f64,

    /// Year after which no new CDR project may start (`Some(0)` blocks CDR
    /// entirely). `None` leaves buildout open-ended.
    /// default: None
    pub cdr_buildout_stop_year: Option<usize>,

    /// Stop new CDR buildout once atmospheric CO2 has declined for two
    /// consecutive years after its peak.
    /// default: false
    pub cdr_buildout_stop_on_co2_peak: bool,

    /// CDR learning rate (cost reduction per deployment doubling)
    /// default: 0.20
    pub cdr_learning_rate: f64,

    /// Conventional-mitigation learning rate
    /// default: 0.12
    pub conventional_learning_rate: f64,

    /// Cumulative deployment at which projects reach full industrial scale
    /// unit: GtCO2
    /// default: 45.0
    pub full_scale_deployment_gt: f64,

    /// Steepness of the scale-damping curve, applied per Gt of the
    /// full-scale threshold. Higher values sharpen the pilot-to-industrial
    /// transition.
    /// default: 8.0
    pub scale_damping_steepness: f64,

    /// Annual CDR deployment ceiling
    /// unit: GtCO2/yr
    /// default: 20.0
    pub cdr_capacity_gt: f64,

    /// Year the XCR system switches on. Before this the economy runs on
    /// BAU emissions alone.
    /// default: 0
    pub xcr_start_year: usize,

    /// Institutional ramp: years from XCR start until minting runs at
    /// full capacity.
    /// default: 5
    pub years_to_full_capacity: usize,

    /// Enable random inflation shocks and background noise.
    /// default: true
    pub stochastic_shocks: bool,

    /// Deterministic shock schedule, applied in addition to (or instead
    /// of) the stochastic shocks.
    /// default: empty
    pub scheduled_shocks: Vec<ScheduledShock>,

    /// Fraction of every mint reserved for the co-benefit overlay pool
    /// default: 0.15
    pub cobenefit_pool_fraction: f64,

    /// Redistribution weighting for the overlay pool
    /// default: CountryWeight
    pub cobenefit_weighting: CobenefitWeighting,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            years: 50,
            initial_co2_ppm: 420.0,
            target_co2_ppm: 350.0,
            initial_price_floor: 100.0,
            inflation_target: 0.02,
            adoption_rate: 3.5,
            enable_audits: true,
            seed: 42,
            bau_peak_year: 6,
            one_time_seed_capital_usd: 2.0e10,
            cdr_material_budget_gt: 500.0,
            cdr_material_cost_multiplier: 4.0,
            cdr_material_capacity_floor: 0.25,
            cdr_buildout_stop_year: None,
            cdr_buildout_stop_on_co2_peak: false,
            cdr_learning_rate: 0.20,
            conventional_learning_rate: 0.12,
            full_scale_deployment_gt: 45.0,
            scale_damping_steepness: 8.0,
            cdr_capacity_gt: 20.0,
            xcr_start_year: 0,
            years_to_full_capacity: 5,
            stochastic_shocks: true,
            scheduled_shocks: Vec::new(),
            cobenefit_pool_fraction: 0.15,
            cobenefit_weighting: CobenefitWeighting::CountryWeight,
        }
    }
}

impl ScenarioConfig {
    /// Check parameter ranges and option consistency.
    ///
    /// Called by `Simulation::new`; a failing configuration aborts before
    /// the first tick.
    pub fn validate(&self) -> GcrResult<()> {
        fn fail(msg: String) -> GcrResult<()> {
            Err(GcrError::InvalidConfiguration(msg))
        }

        if self.years == 0 {
            return fail("years must be at least 1".into());
        }
        if !(self.initial_co2_ppm.is_finite() && self.initial_co2_ppm > 0.0) {
            return fail(format!("initial CO2 must be positive, got {}", self.initial_co2_ppm));
        }
        if self.target_co2_ppm <= 0.0 || self.target_co2_ppm >= self.initial_co2_ppm {
            return fail(format!(
                "target CO2 ({}) must be positive and below initial CO2 ({})",
                self.target_co2_ppm, self.initial_co2_ppm
            ));
        }
        if self.initial_price_floor <= 0.0 {
            return fail(format!("price floor must be positive, got {}", self.initial_price_floor));
        }
        if !(0.0..1.0).contains(&self.inflation_target) {
            return fail(format!(
                "inflation target must be in [0, 1), got {}",
                self.inflation_target
            ));
        }
        if self.adoption_rate < 0.0 {
            return fail(format!("adoption rate must be non-negative, got {}", self.adoption_rate));
        }
        for (name, lr) in [
            ("cdr_learning_rate", self.cdr_learning_rate),
            ("conventional_learning_rate", self.conventional_learning_rate),
        ] {
            if !(0.0..1.0).contains(&lr) {
                return fail(format!("{name} must be in [0, 1), got {lr}"));
            }
        }
        if self.full_scale_deployment_gt <= 0.0 {
            return fail("full-scale deployment threshold must be positive".into());
        }
        if self.scale_damping_steepness <= 0.0 {
            return fail("scale damping steepness must be positive".into());
        }
        if self.cdr_capacity_gt < 0.0 {
            return fail("CDR capacity cap must be non-negative".into());
        }
        if self.cdr_material_budget_gt <= 0.0 {
            return fail("CDR material budget must be positive".into());
        }
        if self.cdr_material_cost_multiplier < 1.0 {
            return fail("CDR material cost multiplier must be at least 1.0".into());
        }
        if !(0.0..=1.0).contains(&self.cdr_material_capacity_floor) {
            return fail("CDR material capacity floor must be in [0, 1]".into());
        }
        if !(0.0..=1.0).contains(&self.cobenefit_pool_fraction) {
            return fail("co-benefit pool fraction must be in [0, 1]".into());
        }
        if self.one_time_seed_capital_usd < 0.0 {
            return fail("seed capital must be non-negative".into());
        }
        for shock in &self.scheduled_shocks {
            if shock.year >= self.years {
                return fail(format!(
                    "scheduled shock at year {} is outside the {}-year run",
                    shock.year, self.years
                ));
            }
        }
        Ok(())
    }
}
