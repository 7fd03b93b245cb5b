//! The controller agent: stability monitoring, the minting brake and
//! periodic price-floor revisions.
//!
//! # Brake factor
//!
//! The brake multiplies XCR minting and, through the initiation gate, new
//! project starts. Three inputs combine multiplicatively:
//!
//! 1. A stability-ratio brake with inflation-adjusted thresholds. At the
//!    2% baseline the bands sit at 8/10/12/15; low realized inflation
//!    widens them (up to 2x), high inflation tightens them (down to 0.3x).
//! 2. A budget brake that engages above 90% CQE budget utilization.
//! 3. A direct inflation penalty above target.
//!
//! # Floor revision
//!
//! Every five years the controller measures the CO2 roadmap gap, derives
//! an annual growth rate (attenuated under inflation or warming overshoot)
//! and locks it; between revisions the floor compounds at the locked rate.

use crate::state::{ControllerState, MarketState};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Outcome of the yearly floor-growth step.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloorRevision {
    /// Floor change applied this tick (USD).
    pub floor_delta: f64,
    /// Whether this tick recomputed and re-locked the growth rate.
    pub revised: bool,
}

/// Decision point: stability policy and floor guidance.
pub trait ControllerModel {
    /// Recompute the stability ratio, warning flag and brake factor.
    fn update_policy(
        &self,
        market: &mut MarketState,
        controller: &mut ControllerState,
        xcr_supply: f64,
        budget_utilization: f64,
    );

    /// Grow the price floor; every `revision_interval` years, re-lock the
    /// growth rate from roadmap performance.
    fn revise_floor(
        &self,
        market: &mut MarketState,
        controller: &mut ControllerState,
        year: usize,
        co2_ppm: f64,
        temperature: f64,
    ) -> FloorRevision;
}

/// Rule-based controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cea {
    pub target_co2_ppm: f64,
    pub initial_co2_ppm: f64,
    pub inflation_target: f64,
    pub total_years: usize,
    /// Years between floor revisions
    /// default: 5
    pub revision_interval: usize,
    /// Budget utilization where the budget brake engages
    /// default: 0.90
    pub budget_brake_start: f64,
    /// Budget brake floor once the cap is hit
    /// default: 0.25
    pub budget_brake_floor: f64,
}

impl Cea {
    pub fn new(
        initial_co2_ppm: f64,
        target_co2_ppm: f64,
        inflation_target: f64,
        total_years: usize,
    ) -> Self {
        Self {
            target_co2_ppm,
            initial_co2_ppm,
            inflation_target,
            total_years,
            revision_interval: 5,
            budget_brake_start: 0.90,
            budget_brake_floor: 0.25,
        }
    }

    /// Linear roadmap from the initial concentration to the target.
    pub fn roadmap_target(&self, year: usize) -> f64 {
        let progress = year as f64 / self.total_years.max(1) as f64;
        self.initial_co2_ppm - (self.initial_co2_ppm - self.target_co2_ppm) * progress
    }

    /// Realized inflation normalized to the 2% baseline.
    fn inflation_ratio(realized_inflation: f64) -> f64 {
        realized_inflation.max(0.0) / 0.02
    }

    /// Threshold widening/tightening factor from realized inflation.
    pub fn inflation_adjustment(realized_inflation: f64) -> f64 {
        let rho = Self::inflation_ratio(realized_inflation);
        if rho < 0.5 {
            2.0
        } else if rho < 2.0 {
            2.0 - (rho - 0.5)
        } else {
            (0.5 - 0.05 * (rho - 2.0)).max(0.3)
        }
    }

    /// Minting floor under the heaviest brake, tightening with inflation.
    pub fn heavy_brake_floor(realized_inflation: f64) -> f64 {
        let rho = Self::inflation_ratio(realized_inflation);
        if rho < 0.5 {
            0.30
        } else if rho < 2.0 {
            // Linear from 0.30 at rho=0.5 to 0.055 at rho=2.0.
            0.30 - (0.245 / 1.5) * (rho - 0.5)
        } else {
            (0.05 - 0.01 * (rho - 2.0)).max(0.01)
        }
    }

    /// Brake factor from the stability ratio, realized inflation and CQE
    /// budget utilization.
    pub fn brake_factor(&self, ratio: f64, realized_inflation: f64, budget_utilization: f64) -> f64 {
        let adj = Self::inflation_adjustment(realized_inflation);
        let heavy_floor = Self::heavy_brake_floor(realized_inflation);

        let brake_start = 10.0 * adj;
        let brake_mid = 12.0 * adj;
        let brake_heavy = 15.0 * adj;

        let ratio_brake = if ratio < brake_start {
            1.0
        } else if ratio < brake_mid {
            1.0 - 0.5 * (ratio - brake_start) / (brake_mid - brake_start)
        } else if ratio < brake_heavy {
            // Quadratic descent from 0.5 to the heavy floor.
            let t = (ratio - brake_mid) / (brake_heavy - brake_mid);
            0.5 - (0.5 - heavy_floor) * t * t
        } else {
            heavy_floor
        };

        let utilization = budget_utilization.clamp(0.0, 1.0);
        let budget_brake = if utilization < self.budget_brake_start {
            1.0
        } else {
            let span = (1.0 - self.budget_brake_start).max(1e-6);
            (1.0 - (utilization - self.budget_brake_start) / span).max(self.budget_brake_floor)
        };

        let rho = Self::inflation_ratio(realized_inflation);
        let inflation_penalty = if rho > 1.0 {
            (1.0 - 0.4 * (rho - 1.0)).max(0.2)
        } else {
            1.0
        };

        ratio_brake * budget_brake * inflation_penalty
    }
}

impl ControllerModel for Cea {
    fn update_policy(
        &self,
        market: &mut MarketState,
        controller: &mut ControllerState,
        xcr_supply: f64,
        budget_utilization: f64,
    ) {
        let market_cap = xcr_supply * market.market_price;
        let ratio = if market.cqe_budget_annual > 0.0 {
            market_cap / market.cqe_budget_annual
        } else {
            0.0
        };
        market.stability_ratio = ratio;

        let adj = Self::inflation_adjustment(market.realized_inflation);
        controller.warning_was_active = controller.warning_active;
        controller.warning_active = ratio >= 8.0 * adj;

        market.brake_factor =
            self.brake_factor(ratio, market.realized_inflation, budget_utilization);
    }

    fn revise_floor(
        &self,
        market: &mut MarketState,
        controller: &mut ControllerState,
        year: usize,
        co2_ppm: f64,
        temperature: f64,
    ) -> FloorRevision {
        let mut revised = false;

        if year > 0 && year % self.revision_interval == 0 && controller.last_revision_year != year {
            revised = true;
            let roadmap_gap = co2_ppm - self.roadmap_target(year);
            let max_gap = (self.initial_co2_ppm - self.target_co2_ppm).max(1e-9);

            // Behind the roadmap: grow faster; ahead: ease off.
            let mut growth = 0.02 + 0.05 * (roadmap_gap / max_gap);

            // Inflation guard: overshoot above target damps the raise.
            if self.inflation_target > 0.0 && market.realized_inflation > self.inflation_target {
                let overshoot_ratio =
                    (market.realized_inflation - self.inflation_target) / self.inflation_target;
                growth *= (1.0 - 0.6 * overshoot_ratio).max(0.25);
            }

            // Climate guard: past the Paris guardrail a rising floor adds
            // pressure the real economy cannot absorb.
            if temperature > 2.0 {
                growth *= 0.5;
            } else if temperature > 1.5 {
                growth *= 0.7;
            }

            growth = growth.clamp(-0.02, 0.10);
            controller.locked_floor_growth = growth;
            controller.last_revision_year = year;
            info!(
                year,
                roadmap_gap_ppm = roadmap_gap,
                locked_growth = growth,
                "price-floor revision"
            );
        }

        let old_floor = market.price_floor;
        market.price_floor = old_floor * (1.0 + controller.locked_floor_growth);

        FloorRevision {
            floor_delta: market.price_floor - old_floor,
            revised,
        }
    }
}
