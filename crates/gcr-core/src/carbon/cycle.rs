//! Four-reservoir carbon cycle with temperature and feedbacks.
//!
//! # What this component does
//!
//! 1. Splits the anthropogenic flux into ocean uptake (solubility- and
//!    Revelle-damped), land uptake (fertilization minus respiration, fire
//!    and land-use losses) and the airborne remainder
//!
//! 2. Tracks four carbon stocks: atmosphere, surface ocean, deep ocean and
//!    land, plus a finite vulnerable permafrost pool that releases carbon
//!    above a temperature threshold
//!
//! 3. Maps cumulative emissions to a temperature anomaly through the TCRE
//!    relationship plus a delayed committed-warming term
//!
//! The component is pure numerical and never fails: stocks are clamped at
//! zero and uptake is clipped to the available flux, with clipping events
//! reported as diagnostics on the step delta.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tunable parameters for the four-reservoir carbon module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonCycleParameters {
    /// Atmospheric concentration change per unit stock
    /// unit: ppm per GtC
    /// default: 0.47
    pub ppm_per_gtc: f64,

    /// Mass ratio CO2 : C
    /// default: 3.67
    pub gtco2_per_gtc: f64,

    /// Pre-industrial atmospheric stock
    /// unit: GtC (~280 ppm)
    /// default: 590.0
    pub preindustrial_gtc: f64,

    /// Fraction of the net anthropogenic flux absorbed by the ocean before
    /// solubility and Revelle damping
    /// default: 0.35
    pub k_ocean: f64,

    /// Surface-to-deep mixing rate
    /// unit: 1/yr
    /// default: 0.01
    pub k_mix: f64,

    /// Ocean solubility loss per degree above the reference anomaly
    /// unit: 1/K
    /// default: 0.03
    pub beta_temp_coeff: f64,

    /// Reference anomaly for the solubility term
    /// unit: K
    /// default: 1.0
    pub beta_temp_ref: f64,

    /// Revelle-factor sensitivity to the atmospheric excess
    /// unit: 1/GtC
    /// default: 0.0015
    pub gamma_coeff: f64,

    /// Surface-ocean equilibrium stock
    /// unit: GtC
    /// default: 1000.0
    pub surface_ocean_eq_gtc: f64,

    /// Initial deep-ocean stock
    /// unit: GtC
    /// default: 37000.0
    pub deep_ocean_gtc: f64,

    /// Initial land stock
    /// unit: GtC
    /// default: 2000.0
    pub land_gtc: f64,

    /// CO2 fertilization strength
    /// unit: GtC/yr per e-fold of concentration
    /// default: 15.0
    pub k_land: f64,

    /// Heterotrophic respiration at the reference anomaly
    /// unit: GtC/yr
    /// default: 2.0
    pub respiration_base: f64,

    /// Respiration Q10
    /// default: 2.0
    pub respiration_q10: f64,

    /// Reference anomaly for respiration
    /// unit: K
    /// default: 1.0
    pub respiration_t_ref: f64,

    /// Baseline fire emissions
    /// unit: GtC/yr
    /// default: 0.5
    pub fire_base: f64,

    /// Quadratic fire response above the threshold
    /// default: 0.3
    pub fire_alpha: f64,

    /// Warming threshold for amplified fire
    /// unit: K
    /// default: 1.5
    pub fire_threshold: f64,

    /// Exogenous land-use-change emissions
    /// unit: GtC/yr
    /// default: 1.0
    pub land_use_flux_gtc: f64,

    /// Transient climate response to cumulative emissions
    /// unit: K per 1000 GtC
    /// default: 0.45
    pub tcre: f64,

    /// Asymptotic committed warming from delayed ocean heat uptake
    /// unit: K
    /// default: 0.5
    pub committed_max: f64,

    /// Committed-warming e-folding time
    /// unit: yr
    /// default: 30.0
    pub committed_tau_years: f64,

    /// Observed anomaly the initial state is anchored to
    /// unit: K
    /// default: 1.2
    pub baseline_temp_anomaly: f64,

    /// Cumulative anthropogenic emissions at the start of the run
    /// unit: GtC
    /// default: 650.0
    pub initial_cumulative_emissions_gtc: f64,

    /// Vulnerable permafrost carbon
    /// unit: GtC
    /// default: 100.0
    pub permafrost_vulnerable_gtc: f64,

    /// Fraction of the remaining pool released per K above threshold
    /// unit: 1/(K yr)
    /// default: 0.005
    pub permafrost_rate: f64,

    /// Warming threshold for permafrost release
    /// unit: K
    /// default: 1.5
    pub permafrost_threshold: f64,
}

impl Default for CarbonCycleParameters {
    fn default() -> Self {
        Self {
            ppm_per_gtc: 0.47,
            gtco2_per_gtc: 3.67,
            preindustrial_gtc: 590.0,

            k_ocean: 0.35,
            k_mix: 0.01,
            beta_temp_coeff: 0.03,
            beta_temp_ref: 1.0,
            gamma_coeff: 0.0015,
            surface_ocean_eq_gtc: 1000.0,
            deep_ocean_gtc: 37000.0,

            land_gtc: 2000.0,
            k_land: 15.0,
            respiration_base: 2.0,
            respiration_q10: 2.0,
            respiration_t_ref: 1.0,
            fire_base: 0.5,
            fire_alpha: 0.3,
            fire_threshold: 1.5,
            land_use_flux_gtc: 1.0,

            tcre: 0.45,
            committed_max: 0.5,
            committed_tau_years: 30.0,
            baseline_temp_anomaly: 1.2,
            initial_cumulative_emissions_gtc: 650.0,

            permafrost_vulnerable_gtc: 100.0,
            permafrost_rate: 0.005,
            permafrost_threshold: 1.5,
        }
    }
}

/// Reservoir stocks and the derived temperature state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonCycleState {
    /// Atmospheric carbon (GtC).
    pub c_atm: f64,
    /// Surface-ocean carbon (GtC).
    pub c_ocean_surface: f64,
    /// Deep-ocean carbon (GtC).
    pub c_ocean_deep: f64,
    /// Land carbon (GtC).
    pub c_land: f64,
    /// Remaining vulnerable permafrost carbon (GtC).
    pub c_permafrost_remaining: f64,
    /// Temperature anomaly above pre-industrial (K).
    pub temperature: f64,
    /// Cumulative anthropogenic-equivalent emissions (GtC).
    pub cumulative_emissions: f64,
    /// Years advanced since construction.
    pub years_elapsed: usize,
}

/// Fluxes and diagnostics from a single yearly step.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StepDelta {
    /// Net anthropogenic flux after structural mitigation (GtC/yr).
    pub net_anthropogenic_gtc: f64,
    pub ocean_uptake_gtc: f64,
    pub land_uptake_gtc: f64,
    pub permafrost_emissions_gtc: f64,
    pub fire_emissions_gtc: f64,
    /// Change in the atmospheric stock this step (GtC).
    pub atmospheric_delta_gtc: f64,
    /// Fraction of gross emissions that stayed airborne this step.
    pub airborne_fraction: f64,
    pub temperature: f64,
    pub co2_ppm: f64,
    pub cumulative_emissions_gtc: f64,
    /// Set when the flux guard scaled uptake to avoid a negative stock.
    pub uptake_clipped: bool,
}

/// Four-reservoir carbon cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonCycle {
    params: CarbonCycleParameters,
    state: CarbonCycleState,
    /// Constant offset anchoring the TCRE line to the observed baseline
    /// anomaly at construction.
    temperature_anchor: f64,
}

impl CarbonCycle {
    /// Build a cycle whose atmosphere starts at `initial_co2_ppm` and whose
    /// temperature reproduces the configured baseline anomaly.
    pub fn new(initial_co2_ppm: f64, params: CarbonCycleParameters) -> Self {
        let c_atm = initial_co2_ppm / params.ppm_per_gtc;
        let tcre_term =
            (params.tcre / 1000.0) * params.initial_cumulative_emissions_gtc;
        let temperature_anchor = params.baseline_temp_anomaly - tcre_term;
        let state = CarbonCycleState {
            c_atm,
            c_ocean_surface: params.surface_ocean_eq_gtc,
            c_ocean_deep: params.deep_ocean_gtc,
            c_land: params.land_gtc,
            c_permafrost_remaining: params.permafrost_vulnerable_gtc,
            temperature: params.baseline_temp_anomaly,
            cumulative_emissions: params.initial_cumulative_emissions_gtc,
            years_elapsed: 0,
        };
        Self { params, state, temperature_anchor }
    }

    pub fn from_defaults(initial_co2_ppm: f64) -> Self {
        Self::new(initial_co2_ppm, CarbonCycleParameters::default())
    }

    pub fn state(&self) -> &CarbonCycleState {
        &self.state
    }

    pub fn params(&self) -> &CarbonCycleParameters {
        &self.params
    }

    pub fn co2_ppm(&self) -> f64 {
        self.state.c_atm * self.params.ppm_per_gtc
    }

    pub fn temperature(&self) -> f64 {
        self.state.temperature
    }

    /// Ocean solubility factor: warm water holds less CO2.
    fn beta_temp(&self, temperature: f64) -> f64 {
        (1.0 - self.params.beta_temp_coeff * (temperature - self.params.beta_temp_ref)).max(0.0)
    }

    /// Revelle buffering: uptake efficiency falls as the atmospheric
    /// excess over pre-industrial grows.
    fn gamma_revelle(&self, c_atm: f64) -> f64 {
        let excess = (c_atm - self.params.preindustrial_gtc).max(0.0);
        1.0 / (1.0 + self.params.gamma_coeff * excess)
    }

    fn ocean_uptake(&self, net_flux: f64, temperature: f64) -> f64 {
        (self.params.k_ocean
            * net_flux.max(0.0)
            * self.beta_temp(temperature)
            * self.gamma_revelle(self.state.c_atm))
        .max(0.0)
    }

    /// Net land flux (positive = uptake) and its fire component.
    fn land_flux(&self, temperature: f64) -> (f64, f64) {
        let fertilization = (self.params.k_land
            * (self.state.c_atm.max(1.0) / self.params.preindustrial_gtc).ln())
        .max(0.0);
        let respiration = self.params.respiration_base
            * self
                .params
                .respiration_q10
                .powf((temperature - self.params.respiration_t_ref) / 10.0);
        let fire = self.params.fire_base
            * (1.0 + self.params.fire_alpha * (temperature - self.params.fire_threshold).max(0.0).powi(2));
        let net = fertilization - respiration - fire - self.params.land_use_flux_gtc;
        (net, fire)
    }

    /// Permafrost release for this step; depletes the vulnerable pool.
    fn permafrost_release(&mut self, temperature: f64) -> f64 {
        if temperature < self.params.permafrost_threshold || self.state.c_permafrost_remaining <= 0.0
        {
            return 0.0;
        }
        let release = (self.params.permafrost_rate
            * (temperature - self.params.permafrost_threshold)
            * self.state.c_permafrost_remaining)
            .min(self.state.c_permafrost_remaining);
        self.state.c_permafrost_remaining -= release;
        release
    }

    fn committed_warming(&self, years_elapsed: f64) -> f64 {
        self.params.committed_max * (1.0 - (-years_elapsed / self.params.committed_tau_years).exp())
    }

    fn temperature_from_emissions(&self, cumulative_gtc: f64, years_elapsed: f64) -> f64 {
        (self.params.tcre / 1000.0) * cumulative_gtc
            + self.committed_warming(years_elapsed)
            + self.temperature_anchor
    }

    /// Advance the cycle by one year.
    ///
    /// All inputs are flows in GtC/yr. `conv_mitigation_gtc` and
    /// `avdef_gtc` structurally reduce the emissions flow (they add no sink
    /// capacity); `cdr_removal_gtc` draws down the atmospheric stock
    /// directly; `reversal_gtc` returns previously stored carbon.
    pub fn step(
        &mut self,
        bau_emissions_gtc: f64,
        cdr_removal_gtc: f64,
        conv_mitigation_gtc: f64,
        avdef_gtc: f64,
        reversal_gtc: f64,
    ) -> StepDelta {
        let cdr = cdr_removal_gtc.max(0.0);
        let reversal = reversal_gtc.max(0.0);

        // Structural mitigation is capped at the remaining human flux so
        // emissions cannot go negative.
        let conv = conv_mitigation_gtc.max(0.0).min(bau_emissions_gtc.max(0.0));
        let net_flux = (bau_emissions_gtc.max(0.0) - conv - avdef_gtc.max(0.0)).max(0.0);

        self.state.years_elapsed += 1;
        let temperature = self.state.temperature;
        let prev_c_atm = self.state.c_atm;

        let mut f_ocean = self.ocean_uptake(net_flux, temperature);
        let f_mix = self.params.k_mix * (self.state.c_ocean_surface - self.params.surface_ocean_eq_gtc);
        let (mut f_land, f_fire) = self.land_flux(temperature);
        let f_permafrost = self.permafrost_release(temperature);

        // Flux guard: uptake cannot exceed the carbon actually entering
        // the atmosphere this step.
        let mut uptake_clipped = false;
        let uptake_total = f_ocean + f_land.max(0.0);
        let available = net_flux + f_permafrost + reversal + cdr;
        if uptake_total > available && uptake_total > 0.0 {
            let scale = available / uptake_total;
            f_ocean *= scale;
            if f_land > 0.0 {
                f_land *= scale;
            }
            uptake_clipped = true;
            debug!(
                year = self.state.years_elapsed,
                scale, "uptake clipped to available flux"
            );
        }

        let atm_delta = net_flux + f_permafrost + reversal - cdr - f_ocean - f_land;
        self.state.c_atm = (self.state.c_atm + atm_delta).max(0.0);
        self.state.c_ocean_surface = (self.state.c_ocean_surface + f_ocean - f_mix).max(0.0);
        self.state.c_ocean_deep = (self.state.c_ocean_deep + f_mix).max(0.0);
        self.state.c_land = (self.state.c_land + f_land).max(0.0);

        let net_anthro = net_flux + f_permafrost + reversal - cdr;
        self.state.cumulative_emissions = (self.state.cumulative_emissions + net_anthro).max(0.0);
        self.state.temperature = self.temperature_from_emissions(
            self.state.cumulative_emissions,
            self.state.years_elapsed as f64,
        );

        let gross = net_flux + f_permafrost + reversal;
        let airborne_fraction = if gross > 0.0 {
            (self.state.c_atm - prev_c_atm) / gross
        } else {
            0.0
        };

        StepDelta {
            net_anthropogenic_gtc: net_flux,
            ocean_uptake_gtc: f_ocean,
            land_uptake_gtc: f_land,
            permafrost_emissions_gtc: f_permafrost,
            fire_emissions_gtc: f_fire,
            atmospheric_delta_gtc: self.state.c_atm - prev_c_atm,
            airborne_fraction,
            temperature: self.state.temperature,
            co2_ppm: self.co2_ppm(),
            cumulative_emissions_gtc: self.state.cumulative_emissions,
            uptake_clipped,
        }
    }
}

/// Climate-dependent multiplier on project failure rates.
///
/// Piecewise linear in the temperature anomaly: flat at 1.0 below 1.5 K,
/// steepening through each subsequent degree.
pub fn climate_risk_multiplier(temperature: f64) -> f64 {
    if temperature < 1.5 {
        1.0
    } else if temperature < 2.0 {
        1.0 + 0.2 * (temperature - 1.5)
    } else if temperature < 3.0 {
        1.1 + 0.3 * (temperature - 2.0)
    } else {
        1.4 + 0.5 * (temperature - 3.0)
    }
}
