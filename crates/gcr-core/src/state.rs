//! Authoritative simulation state shared across tick phases.
//!
//! The simulation owns one instance of each struct here; each phase
//! receives an exclusive borrow of the subset it mutates. Everything a
//! later phase needs from an earlier one flows through these values.

use crate::errors::{GcrError, GcrResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Token accounting. `supply` always equals mints minus burns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenLedger {
    /// Outstanding XCR supply.
    pub supply: f64,
    /// XCR minted this year (reset in the rollover phase).
    pub minted_annual: f64,
    /// XCR burned this year (reset in the rollover phase).
    pub burned_annual: f64,
    /// Lifetime XCR burned.
    pub burned_cumulative: f64,
    /// Co-benefit overlay minted this year.
    pub cobenefit_bonus_annual: f64,
}

impl TokenLedger {
    /// Record a mint and return the amount actually minted.
    pub fn mint(&mut self, xcr: f64) -> f64 {
        let amount = xcr.max(0.0);
        self.supply += amount;
        self.minted_annual += amount;
        amount
    }

    /// Record a burn, clipping at zero supply. Supply under-runs are
    /// malformed states: the clip is recorded as a diagnostic, never an
    /// error.
    pub fn burn(&mut self, xcr: f64) -> f64 {
        let requested = xcr.max(0.0);
        let amount = requested.min(self.supply);
        if amount < requested {
            debug!(requested, available = self.supply, "burn clipped at zero supply");
        }
        self.supply -= amount;
        self.burned_annual += amount;
        self.burned_cumulative += amount;
        amount
    }

    /// Annual counter reset (phase 0 of the tick).
    pub fn rollover(&mut self) {
        self.minted_annual = 0.0;
        self.burned_annual = 0.0;
        self.cobenefit_bonus_annual = 0.0;
    }
}

/// Market-facing state: price, floor, sentiment, inflation, capital flows
/// and the CQE budget position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketState {
    pub market_price: f64,
    pub price_floor: f64,
    /// Investor trust in [0.1, 1.0].
    pub sentiment: f64,
    /// Realized inflation (fraction/yr).
    pub realized_inflation: f64,
    pub inflation_target: f64,
    /// Minting brake in [heavy_brake_floor, 1.0].
    pub brake_factor: f64,
    /// Market cap over annual CQE budget.
    pub stability_ratio: f64,
    /// This year's CQE budget (USD).
    pub cqe_budget_annual: f64,
    /// CQE spent this year (USD, reset in the rollover phase).
    pub cqe_spent_annual: f64,
    /// Lifetime CQE spending (USD).
    pub cqe_spent_cumulative: f64,
    /// XCR bought by the alliance this year.
    pub xcr_purchased_annual: f64,
    /// Lifetime private capital inflow (USD, non-decreasing).
    pub cumulative_capital_inflow: f64,
    /// This year's net private flow (USD, may be negative).
    pub net_capital_flow: f64,
    /// Price premium from capital demand (USD, non-negative).
    pub capital_demand_premium: f64,
    /// Forward guidance signal in [0, 1].
    pub forward_guidance: f64,
}

impl MarketState {
    pub fn new(price_floor: f64, inflation_target: f64) -> Self {
        Self {
            market_price: price_floor + 50.0,
            price_floor,
            sentiment: 1.0,
            realized_inflation: 0.0,
            inflation_target,
            brake_factor: 1.0,
            stability_ratio: 0.0,
            cqe_budget_annual: 0.0,
            cqe_spent_annual: 0.0,
            cqe_spent_cumulative: 0.0,
            xcr_purchased_annual: 0.0,
            cumulative_capital_inflow: 0.0,
            net_capital_flow: 0.0,
            capital_demand_premium: 0.0,
            forward_guidance: 0.0,
        }
    }

    /// Utilization of this year's CQE budget in [0, 1].
    pub fn budget_utilization(&self) -> f64 {
        if self.cqe_budget_annual > 0.0 {
            (self.cqe_spent_annual / self.cqe_budget_annual).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Annual counter reset (phase 0 of the tick).
    pub fn rollover(&mut self) {
        self.cqe_spent_annual = 0.0;
        self.xcr_purchased_annual = 0.0;
    }
}

/// Controller-side state: warnings, the floor-growth lock, the net-zero
/// latch, the CO2 peak detector and the structural-mitigation counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerState {
    /// Stability warning currently active.
    pub warning_active: bool,
    /// Warning state of the previous tick (for onset detection).
    pub warning_was_active: bool,
    /// Locked annual price-floor growth rate.
    pub locked_floor_growth: f64,
    pub last_revision_year: usize,
    /// Once true, conventional crediting is terminated permanently.
    pub net_zero_ever_reached: bool,
    /// Emissions-to-sinks ratio of the previous tick (large before any
    /// sinks exist).
    pub es_ratio: f64,
    /// Previous tick's atmospheric CO2 (ppm) for the peak detector.
    pub prev_co2_ppm: f64,
    /// Highest CO2 seen so far (ppm).
    pub peak_co2_ppm: f64,
    /// Consecutive years of CO2 decline since the peak.
    pub co2_decline_streak: usize,
    /// New CDR buildout is permanently blocked.
    pub cdr_buildout_stopped: bool,
    /// Installed structural conventional mitigation (tonnes CO2/yr).
    /// This is the explicit "remaining human emissions" counter: residual
    /// emissions = BAU flow minus this capacity.
    pub structural_conventional_tonnes: f64,
}

impl ControllerState {
    pub fn new(initial_co2_ppm: f64) -> Self {
        Self {
            warning_active: false,
            warning_was_active: false,
            locked_floor_growth: 0.02,
            last_revision_year: 0,
            net_zero_ever_reached: false,
            es_ratio: f64::INFINITY,
            prev_co2_ppm: initial_co2_ppm,
            peak_co2_ppm: initial_co2_ppm,
            co2_decline_streak: 0,
            cdr_buildout_stopped: false,
            structural_conventional_tonnes: 0.0,
        }
    }

    /// Feed the peak detector with this tick's closing CO2 level.
    pub fn observe_co2(&mut self, co2_ppm: f64) {
        if co2_ppm < self.prev_co2_ppm {
            self.co2_decline_streak += 1;
        } else {
            self.co2_decline_streak = 0;
            if co2_ppm > self.peak_co2_ppm {
                self.peak_co2_ppm = co2_ppm;
            }
        }
        self.prev_co2_ppm = co2_ppm;
    }

    /// The peak-stop condition: CO2 has declined for two consecutive
    /// years after reaching a maximum.
    pub fn co2_peaked(&self) -> bool {
        self.co2_decline_streak >= 2
    }
}

/// Tick-end invariant audit. Violations are engine bugs and abort the run
/// at the tick boundary.
pub fn audit_invariants(
    tick: usize,
    ledger: &TokenLedger,
    market: &MarketState,
) -> GcrResult<()> {
    fn violated(tick: usize, cause: String) -> GcrResult<()> {
        Err(GcrError::InvariantViolation { tick, cause })
    }

    if !(ledger.supply >= 0.0) {
        return violated(tick, format!("XCR supply went negative: {}", ledger.supply));
    }
    if !(0.1..=1.0).contains(&market.sentiment) {
        return violated(tick, format!("sentiment out of range: {}", market.sentiment));
    }
    if !(0.0..=1.0).contains(&market.brake_factor) {
        return violated(tick, format!("brake factor out of range: {}", market.brake_factor));
    }
    if market.cqe_spent_annual > market.cqe_budget_annual + 1e-6 {
        return violated(
            tick,
            format!(
                "annual CQE spend {} exceeds budget {}",
                market.cqe_spent_annual, market.cqe_budget_annual
            ),
        );
    }
    if market.capital_demand_premium < 0.0 {
        return violated(
            tick,
            format!("capital demand premium negative: {}", market.capital_demand_premium),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_supply_equals_mints_minus_burns() {
        let mut ledger = TokenLedger::default();
        ledger.mint(100.0);
        ledger.mint(40.0);
        ledger.burn(30.0);
        assert_eq!(ledger.supply, 110.0);
        assert_eq!(ledger.burned_cumulative, 30.0);
    }

    #[test]
    fn test_burn_clips_at_zero_supply() {
        let mut ledger = TokenLedger::default();
        ledger.mint(10.0);
        let burned = ledger.burn(25.0);
        assert_eq!(burned, 10.0);
        assert_eq!(ledger.supply, 0.0);
    }

    #[test]
    fn test_rollover_resets_annual_counters_only() {
        let mut ledger = TokenLedger::default();
        ledger.mint(100.0);
        ledger.burn(20.0);
        ledger.rollover();
        assert_eq!(ledger.minted_annual, 0.0);
        assert_eq!(ledger.burned_annual, 0.0);
        assert_eq!(ledger.supply, 80.0);
        assert_eq!(ledger.burned_cumulative, 20.0);

        let mut market = MarketState::new(100.0, 0.02);
        market.cqe_spent_annual = 5.0e9;
        market.cqe_spent_cumulative = 7.0e9;
        market.rollover();
        assert_eq!(market.cqe_spent_annual, 0.0);
        assert_eq!(market.cqe_spent_cumulative, 7.0e9);
    }

    #[test]
    fn test_peak_detector_needs_two_declines() {
        let mut ctl = ControllerState::new(420.0);
        ctl.observe_co2(421.0);
        assert!(!ctl.co2_peaked());
        ctl.observe_co2(420.5);
        assert!(!ctl.co2_peaked());
        ctl.observe_co2(420.0);
        assert!(ctl.co2_peaked());
        assert_eq!(ctl.peak_co2_ppm, 421.0);
    }

    #[test]
    fn test_peak_detector_resets_on_rebound() {
        let mut ctl = ControllerState::new(420.0);
        ctl.observe_co2(419.0);
        ctl.observe_co2(419.5);
        assert_eq!(ctl.co2_decline_streak, 0);
        assert!(!ctl.co2_peaked());
    }

    #[test]
    fn test_audit_flags_negative_supply() {
        let ledger = TokenLedger {
            supply: -1.0,
            ..TokenLedger::default()
        };
        let market = MarketState::new(100.0, 0.02);
        assert!(audit_invariants(3, &ledger, &market).is_err());
    }

    #[test]
    fn test_audit_passes_fresh_state() {
        let ledger = TokenLedger::default();
        let market = MarketState::new(100.0, 0.02);
        assert!(audit_invariants(0, &ledger, &market).is_ok());
    }
}
