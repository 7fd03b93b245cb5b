//! Investor sentiment and price discovery.
//!
//! Sentiment is a scalar trust level in [0.1, 1.0]. It decays
//! multiplicatively on stability warnings and inflation overshoots,
//! recovers proportionally to the remaining gap when the system performs,
//! and feeds directly into the price: each point of sentiment is worth up
//! to $50 over the floor.

use crate::state::MarketState;
use serde::{Deserialize, Serialize};

/// Everything the sentiment update is allowed to see.
#[derive(Debug, Clone, Copy)]
pub struct SentimentObservation {
    /// Stability warning currently raised by the controller.
    pub warning_active: bool,
    /// Warning state of the previous tick.
    pub warning_was_active: bool,
    /// Atmospheric CO2 fell relative to the previous tick.
    pub co2_declined: bool,
    /// Forward guidance signal in [0, 1].
    pub forward_guidance: f64,
    /// Price-floor change applied this tick (positive on upward revision).
    pub floor_delta: f64,
}

/// Decision point: how investor trust responds to system state.
pub trait SentimentModel {
    fn update_sentiment(&mut self, market: &mut MarketState, obs: &SentimentObservation);
}

/// Rule-based investor market.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvestorMarket {}

impl InvestorMarket {
    pub fn new() -> Self {
        Self {}
    }

    /// Price discovery: floor plus sentiment premium plus capital demand.
    pub fn price(market: &MarketState) -> f64 {
        market.price_floor + 50.0 * market.sentiment + market.capital_demand_premium
    }
}

impl SentimentModel for InvestorMarket {
    fn update_sentiment(&mut self, market: &mut MarketState, obs: &SentimentObservation) {
        let mut sentiment = market.sentiment;
        let target = market.inflation_target;
        let inflation = market.realized_inflation;

        // Warnings: a fresh warning bites harder than a persistent one.
        if obs.warning_active {
            sentiment *= if obs.warning_was_active { 0.995 } else { 0.97 };
        }

        // Inflation overshoot, relative to target.
        if inflation > target * 3.0 {
            sentiment *= 0.94;
        } else if inflation > target * 2.0 {
            sentiment *= 0.97;
        } else if inflation > target * 1.5 {
            sentiment *= 0.995;
        }

        // Recovery: no warning and inflation within half a target-width.
        if !obs.warning_active && (inflation - target).abs() <= 0.5 * target {
            sentiment += (1.0 - sentiment) * 0.02;
        }

        // Visible progress on drawdown.
        if obs.co2_declined {
            sentiment += 0.01;
        }

        // Policy-confidence bonuses: up to +0.02 of the remaining gap on
        // strong guidance or an upward floor revision.
        sentiment += (1.0 - sentiment) * 0.02 * obs.forward_guidance.clamp(0.0, 1.0);
        if obs.floor_delta > 0.0 && market.price_floor > 0.0 {
            let strength = (10.0 * obs.floor_delta / market.price_floor).clamp(0.0, 1.0);
            sentiment += (1.0 - sentiment) * 0.02 * strength;
        }

        market.sentiment = sentiment.clamp(0.1, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calm_observation() -> SentimentObservation {
        SentimentObservation {
            warning_active: false,
            warning_was_active: false,
            co2_declined: false,
            forward_guidance: 0.0,
            floor_delta: 0.0,
        }
    }

    fn market_with(sentiment: f64, inflation: f64) -> MarketState {
        let mut m = MarketState::new(100.0, 0.02);
        m.sentiment = sentiment;
        m.realized_inflation = inflation;
        m
    }

    #[test]
    fn test_new_warning_decays_three_percent() {
        let mut investor = InvestorMarket::new();
        let mut market = market_with(1.0, 0.02);
        // Inflation exactly on target also triggers recovery, so compare
        // against the no-warning path.
        let mut baseline = market.clone();
        let obs_warning = SentimentObservation { warning_active: true, ..calm_observation() };
        investor.update_sentiment(&mut market, &obs_warning);
        investor.update_sentiment(&mut baseline, &calm_observation());
        assert!(market.sentiment < baseline.sentiment);
    }

    #[test]
    fn test_persistent_warning_decays_less_than_onset() {
        let mut investor = InvestorMarket::new();
        let mut onset = market_with(0.8, 0.05);
        let mut persistent = market_with(0.8, 0.05);
        investor.update_sentiment(
            &mut onset,
            &SentimentObservation { warning_active: true, ..calm_observation() },
        );
        investor.update_sentiment(
            &mut persistent,
            &SentimentObservation {
                warning_active: true,
                warning_was_active: true,
                ..calm_observation()
            },
        );
        assert!(persistent.sentiment > onset.sentiment);
    }

    #[test]
    fn test_inflation_tiers_decay_progressively() {
        let mut investor = InvestorMarket::new();
        let mut moderate = market_with(1.0, 0.035); // > 1.5x target
        let mut high = market_with(1.0, 0.045); // > 2x target
        let mut very_high = market_with(1.0, 0.07); // > 3x target
        for m in [&mut moderate, &mut high, &mut very_high] {
            investor.update_sentiment(m, &calm_observation());
        }
        assert!(moderate.sentiment > high.sentiment);
        assert!(high.sentiment > very_high.sentiment);
    }

    #[test]
    fn test_recovery_when_calm() {
        let mut investor = InvestorMarket::new();
        let mut market = market_with(0.5, 0.02);
        investor.update_sentiment(&mut market, &calm_observation());
        assert!(market.sentiment > 0.5, "on-target inflation without warning recovers");
    }

    #[test]
    fn test_co2_progress_bonus_is_additive() {
        let mut investor = InvestorMarket::new();
        let mut with = market_with(0.5, 0.05);
        let mut without = market_with(0.5, 0.05);
        investor.update_sentiment(
            &mut with,
            &SentimentObservation { co2_declined: true, ..calm_observation() },
        );
        investor.update_sentiment(&mut without, &calm_observation());
        assert!((with.sentiment - without.sentiment - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_sentiment_never_leaves_bounds() {
        let mut investor = InvestorMarket::new();
        let mut market = market_with(0.11, 0.30);
        for _ in 0..200 {
            investor.update_sentiment(
                &mut market,
                &SentimentObservation {
                    warning_active: true,
                    warning_was_active: true,
                    ..calm_observation()
                },
            );
            assert!(market.sentiment >= 0.1);
        }
        let mut market = market_with(0.99, 0.02);
        for _ in 0..200 {
            investor.update_sentiment(
                &mut market,
                &SentimentObservation {
                    co2_declined: true,
                    forward_guidance: 1.0,
                    ..calm_observation()
                },
            );
            assert!(market.sentiment <= 1.0);
        }
    }

    #[test]
    fn test_price_formula() {
        let mut market = MarketState::new(100.0, 0.02);
        market.sentiment = 0.6;
        market.capital_demand_premium = 12.0;
        assert!((InvestorMarket::price(&market) - 142.0).abs() < 1e-12);
    }
}
