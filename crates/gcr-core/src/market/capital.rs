//! Private capital flows into XCR.
//!
//! XCR attracts capital on three legs: a climate hedge (forward guidance
//! on future damages), an inflation hedge (real asset backed by physical
//! carbon), and plain return chasing (sentiment). The combined
//! attractiveness is compared against a neutrality threshold that eases as
//! the market matures; the signed difference scales annual turnover into a
//! net flow.

use serde::{Deserialize, Serialize};

/// Inputs visible to the capital-flow decision.
#[derive(Debug, Clone, Copy)]
pub struct CapitalObservation {
    pub co2_ppm: f64,
    pub initial_co2_ppm: f64,
    pub target_co2_ppm: f64,
    pub year: usize,
    pub total_years: usize,
    /// Current CO2 minus the linear roadmap level (positive = behind).
    pub roadmap_gap_ppm: f64,
    pub realized_inflation: f64,
    pub sentiment: f64,
    pub xcr_supply: f64,
    pub price_floor: f64,
    /// Years since the XCR system launched.
    pub market_age_years: usize,
}

/// Output of the capital-flow decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapitalFlowDecision {
    /// Net USD flow this year; negative means outflow.
    pub net_capital_flow: f64,
    /// Non-negative price premium from demand pressure.
    pub capital_demand_premium: f64,
    /// Forward guidance signal in [0, 1].
    pub forward_guidance: f64,
}

/// Decision point: how private capital responds to system state.
pub trait CapitalFlowModel {
    fn update_flows(&mut self, obs: &CapitalObservation) -> CapitalFlowDecision;
}

/// Rule-based capital market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalMarket {
    /// Bootstrap inflow applied while the market is small
    /// unit: USD
    /// default: 2e10
    pub seed_capital_usd: f64,
    /// Market cap below which the seed still applies
    /// unit: USD
    /// default: 5e10
    pub seed_market_cap_usd: f64,
    /// Neutrality threshold for a newly launched market
    /// default: 0.6
    pub neutrality_start: f64,
    /// Neutrality threshold once liquidity has matured
    /// default: 0.3
    pub neutrality_end: f64,
    /// Years over which the threshold ramps down
    /// default: 10
    pub neutrality_ramp_years: usize,
    /// Annual turnover as a fraction of market cap
    /// default: 0.10
    pub base_turnover_rate: f64,
}

impl CapitalMarket {
    pub fn new(seed_capital_usd: f64) -> Self {
        Self {
            seed_capital_usd,
            seed_market_cap_usd: 5.0e10,
            neutrality_start: 0.6,
            neutrality_end: 0.3,
            neutrality_ramp_years: 10,
            base_turnover_rate: 0.10,
        }
    }

    /// Attractiveness hurdle, easing linearly with market age.
    fn neutrality_threshold(&self, market_age_years: usize) -> f64 {
        if self.neutrality_ramp_years == 0 || market_age_years >= self.neutrality_ramp_years {
            return self.neutrality_end;
        }
        let progress = market_age_years as f64 / self.neutrality_ramp_years as f64;
        self.neutrality_start + (self.neutrality_end - self.neutrality_start) * progress
    }

    /// Forward guidance on climate damages in [0, 1].
    ///
    /// Weighted blend of the CO2 gap (40%), quadratic deadline pressure
    /// (30%) and the roadmap shortfall (30%).
    pub fn forward_guidance(&self, obs: &CapitalObservation) -> f64 {
        let max_gap = (obs.initial_co2_ppm - obs.target_co2_ppm).max(1e-9);
        let co2_urgency = ((obs.co2_ppm - obs.target_co2_ppm) / max_gap).clamp(0.0, 1.0);
        let time_progress = obs.year as f64 / obs.total_years.max(1) as f64;
        let time_urgency = time_progress * time_progress;
        let progress_urgency = (obs.roadmap_gap_ppm / max_gap).clamp(0.0, 1.0);
        0.4 * co2_urgency + 0.3 * time_urgency + 0.3 * progress_urgency
    }

    /// Inflation-hedge demand multiplier in [0.5, 2.5].
    ///
    /// Absolute inflation drives the hedge: a real asset is more
    /// attractive at 6% CPI than at 2%, whatever the policy target is.
    pub fn inflation_hedge_demand(&self, realized_inflation: f64) -> f64 {
        const STABLE_REFERENCE: f64 = 0.02;
        if realized_inflation <= STABLE_REFERENCE {
            0.5 + 0.5 * (realized_inflation.max(0.0) / STABLE_REFERENCE)
        } else {
            1.0 + ((realized_inflation - STABLE_REFERENCE) / 0.04).min(1.5)
        }
    }
}

impl CapitalFlowModel for CapitalMarket {
    fn update_flows(&mut self, obs: &CapitalObservation) -> CapitalFlowDecision {
        let forward_guidance = self.forward_guidance(obs);
        let hedge = self.inflation_hedge_demand(obs.realized_inflation);

        // Conservative market cap at the floor; a minimum cap lets flows
        // exist before any supply does.
        let observed_cap = obs.xcr_supply * obs.price_floor;
        let market_cap = observed_cap.max(1.0e9);

        let attractiveness = forward_guidance * hedge * obs.sentiment;
        let neutrality = self.neutrality_threshold(obs.market_age_years);
        let mut net_flow =
            market_cap * self.base_turnover_rate * (attractiveness - neutrality) * 2.0;

        // Bootstrap: while the market is below the seed threshold, the
        // guidance-scaled seed acts as a floor on inflow.
        if observed_cap < self.seed_market_cap_usd {
            let seed = self.seed_capital_usd * forward_guidance.max(0.2);
            net_flow = net_flow.max(seed);
        }

        // Demand premium: flow intensity against the cap, clamped
        // non-negative (outflows depress price via sentiment, not via a
        // negative premium).
        let intensity = (net_flow / market_cap).clamp(0.0, 0.5);
        let capital_demand_premium = obs.price_floor * intensity;

        CapitalFlowDecision {
            net_capital_flow: net_flow,
            capital_demand_premium,
            forward_guidance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_observation() -> CapitalObservation {
        CapitalObservation {
            co2_ppm: 420.0,
            initial_co2_ppm: 420.0,
            target_co2_ppm: 350.0,
            year: 0,
            total_years: 50,
            roadmap_gap_ppm: 0.0,
            realized_inflation: 0.02,
            sentiment: 1.0,
            xcr_supply: 0.0,
            price_floor: 100.0,
            market_age_years: 0,
        }
    }

    #[test]
    fn test_neutrality_ramps_down_with_age() {
        let market = CapitalMarket::new(2.0e10);
        assert_eq!(market.neutrality_threshold(0), 0.6);
        assert!((market.neutrality_threshold(5) - 0.45).abs() < 1e-12);
        assert_eq!(market.neutrality_threshold(10), 0.3);
        assert_eq!(market.neutrality_threshold(30), 0.3);
    }

    #[test]
    fn test_seed_capital_floors_early_inflow() {
        let mut market = CapitalMarket::new(2.0e10);
        let decision = market.update_flows(&base_observation());
        // Guidance at launch is 0.4 (full CO2 gap), so the seed floor is
        // 0.4 * 2e10 = $8B.
        assert!(decision.net_capital_flow >= 8.0e9 - 1.0);
    }

    #[test]
    fn test_seed_stops_once_market_is_large() {
        let mut market = CapitalMarket::new(2.0e10);
        let obs = CapitalObservation {
            xcr_supply: 1.0e9, // $100B cap at the floor
            sentiment: 0.1,
            realized_inflation: 0.0,
            ..base_observation()
        };
        let decision = market.update_flows(&obs);
        assert!(
            decision.net_capital_flow < 0.0,
            "unattractive mature market should see outflow, got {}",
            decision.net_capital_flow
        );
    }

    #[test]
    fn test_higher_inflation_raises_hedge_demand() {
        let market = CapitalMarket::new(2.0e10);
        assert!(market.inflation_hedge_demand(0.06) > market.inflation_hedge_demand(0.02));
        assert_eq!(market.inflation_hedge_demand(0.12), 2.5);
        assert_eq!(market.inflation_hedge_demand(0.0), 0.5);
    }

    #[test]
    fn test_forward_guidance_rises_when_behind_schedule() {
        let market = CapitalMarket::new(2.0e10);
        let on_track = market.forward_guidance(&base_observation());
        let behind = market.forward_guidance(&CapitalObservation {
            roadmap_gap_ppm: 30.0,
            ..base_observation()
        });
        assert!(behind > on_track);
    }

    #[test]
    fn test_premium_is_never_negative() {
        let mut market = CapitalMarket::new(0.0);
        let obs = CapitalObservation {
            xcr_supply: 1.0e9,
            sentiment: 0.1,
            realized_inflation: 0.0,
            ..base_observation()
        };
        let decision = market.update_flows(&obs);
        assert!(decision.net_capital_flow < 0.0);
        assert!(decision.capital_demand_premium >= 0.0);
    }

    #[test]
    fn test_guidance_bounds() {
        let market = CapitalMarket::new(2.0e10);
        let extreme = CapitalObservation {
            co2_ppm: 500.0,
            year: 50,
            roadmap_gap_ppm: 200.0,
            ..base_observation()
        };
        let g = market.forward_guidance(&extreme);
        assert!((0.0..=1.0).contains(&g));
    }
}
