//! Central-bank alliance: Carbon Quantitative Easing.
//!
//! The alliance defends the XCR price floor by buying tokens with newly
//! created reserves. The annual budget is flow-based: 5% of this year's
//! private capital inflow, capped at 0.5% of active-member GDP, so public
//! money stays a minority backstop behind private capital. Willingness to
//! intervene falls off a sigmoid as realized inflation rises past 1.5x
//! target; an exhausted budget simply stops the defense until next year.

use crate::state::MarketState;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of one floor-defense decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct CqeIntervention {
    /// Upward price pressure applied to the market (USD).
    pub price_support: f64,
    /// Additive inflation impact of the reserve creation (fraction).
    pub inflation_impact: f64,
    /// XCR bought into central-bank holdings. These are ledger debits
    /// against the float, not burns.
    pub xcr_purchased: f64,
    /// Reserves created to fund the purchase (USD).
    pub fiat_spent: f64,
}

/// Decision point: how the alliance sizes its budget and defends the
/// floor.
pub trait FloorDefense {
    /// Recompute this year's budget from the private-capital flow.
    fn update_budget(
        &mut self,
        market: &mut MarketState,
        annual_private_inflow_usd: f64,
        active_gdp_usd: f64,
    );

    fn defend_floor(
        &mut self,
        market: &mut MarketState,
        xcr_supply: f64,
        active_gdp_usd: f64,
    ) -> CqeIntervention;
}

/// Rule-based alliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentralBankAlliance {
    /// CQE budget as a share of annual private inflow
    /// default: 0.05
    pub cqe_ratio: f64,
    /// Budget cap as a share of active-member GDP
    /// default: 0.005
    pub gdp_cap_ratio: f64,
    /// Sharpness of the inflation-willingness sigmoid
    /// default: 12.0
    pub willingness_sharpness: f64,
    /// Largest share of outstanding supply purchasable per step
    /// default: 0.05
    pub max_supply_fraction: f64,
}

impl CentralBankAlliance {
    pub fn new() -> Self {
        Self {
            cqe_ratio: 0.05,
            gdp_cap_ratio: 0.005,
            willingness_sharpness: 12.0,
            max_supply_fraction: 0.05,
        }
    }

    /// Willingness to intervene in [0, 1]; zero when no inflation target
    /// exists to anchor the sigmoid.
    pub fn willingness(&self, realized_inflation: f64, inflation_target: f64) -> f64 {
        if inflation_target <= 0.0 {
            return 0.0;
        }
        let center = 1.5 * inflation_target;
        1.0 / (1.0 + (self.willingness_sharpness * (realized_inflation - center)).exp())
    }
}

impl Default for CentralBankAlliance {
    fn default() -> Self {
        Self::new()
    }
}

impl FloorDefense for CentralBankAlliance {
    fn update_budget(
        &mut self,
        market: &mut MarketState,
        annual_private_inflow_usd: f64,
        active_gdp_usd: f64,
    ) {
        let flow_budget = annual_private_inflow_usd.max(0.0) * self.cqe_ratio;
        let gdp_cap = active_gdp_usd * self.gdp_cap_ratio;
        market.cqe_budget_annual = flow_budget.min(gdp_cap);
    }

    fn defend_floor(
        &mut self,
        market: &mut MarketState,
        xcr_supply: f64,
        active_gdp_usd: f64,
    ) -> CqeIntervention {
        let remaining_budget = market.cqe_budget_annual - market.cqe_spent_annual;
        if remaining_budget <= 0.0 {
            // Budget exhaustion is a normal outcome: the price may slip
            // below the floor until next year's budget.
            return CqeIntervention::default();
        }
        if market.market_price >= market.price_floor {
            return CqeIntervention::default();
        }

        let willingness = self.willingness(market.realized_inflation, market.inflation_target);
        if willingness <= 0.0 {
            return CqeIntervention::default();
        }

        let gap = market.price_floor - market.market_price;
        let mut strength = (gap / market.price_floor).min(0.5) * willingness;

        // Purchases sized as a bounded fraction of the float, executed at
        // the current market price.
        let mut xcr_purchased = xcr_supply * strength * self.max_supply_fraction;
        let mut fiat_spent = xcr_purchased * market.market_price;
        if fiat_spent > remaining_budget {
            let scale = remaining_budget / fiat_spent;
            fiat_spent = remaining_budget;
            xcr_purchased *= scale;
            strength *= scale;
            debug!(remaining_budget, "CQE intervention truncated by annual budget");
        }
        if fiat_spent <= 0.0 {
            return CqeIntervention::default();
        }

        market.cqe_spent_annual += fiat_spent;
        market.cqe_spent_cumulative += fiat_spent;
        market.xcr_purchased_annual += xcr_purchased;

        // Reserve creation leaks into CPI in proportion to the real
        // economy, with a floor once spending is material and a hard cap
        // of +2 percentage points per intervention.
        let mut inflation_impact = if active_gdp_usd > 0.0 {
            (fiat_spent / active_gdp_usd) * 5.0
        } else {
            0.0
        };
        if active_gdp_usd > 0.0 && fiat_spent / active_gdp_usd > 0.001 {
            inflation_impact = inflation_impact.max(0.0025);
        }
        inflation_impact = inflation_impact.clamp(0.0, 0.02);

        CqeIntervention {
            price_support: gap * strength,
            inflation_impact,
            xcr_purchased,
            fiat_spent,
        }
    }
}
