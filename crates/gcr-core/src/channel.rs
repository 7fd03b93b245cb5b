//! Mitigation channels and their per-channel parameter tables.
//!
//! Every channel-dependent constant lives here as an exhaustive match so a
//! new channel cannot be added without deciding all of its parameters.

use serde::{Deserialize, Serialize};

/// The three physical mitigation channels that can host projects.
///
/// Co-benefits are handled as a reward overlay on top of minting (see the
/// auditor), not as a channel that hosts projects of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Carbon dioxide removal: durable atmospheric drawdown, R fixed at 1.
    Cdr,
    /// Conventional mitigation: structural reduction of the fossil
    /// emissions flow (renewables, efficiency, fuel switching).
    Conventional,
    /// Avoided deforestation: reduction of the land-use-change flow.
    AvoidedDeforestation,
}

/// Initiation order within a tick. Cheap structural channels are funded
/// before capital-intensive removal.
pub const INITIATION_ORDER: [Channel; 3] = [
    Channel::AvoidedDeforestation,
    Channel::Conventional,
    Channel::Cdr,
];

impl Channel {
    /// Marginal cost per tonne before learning and scarcity effects (USD).
    pub fn base_cost(self) -> f64 {
        match self {
            Channel::Cdr => 100.0,
            Channel::Conventional => 80.0,
            Channel::AvoidedDeforestation => 60.0,
        }
    }

    /// Learning rate: fractional cost reduction per doubling of cumulative
    /// deployment. CDR and conventional rates can be overridden per
    /// scenario; avoided deforestation is nature-based with limited
    /// technology gains.
    pub fn default_learning_rate(self) -> f64 {
        match self {
            Channel::Cdr => 0.20,
            Channel::Conventional => 0.12,
            Channel::AvoidedDeforestation => 0.08,
        }
    }

    /// Fraction of lifetime delivered tonnes that reverses to the
    /// atmosphere when a project fails. Stored carbon leaks a little;
    /// abandoned structural mitigation mostly comes back.
    pub fn failure_reversal_fraction(self) -> f64 {
        match self {
            Channel::Cdr => 0.10,
            Channel::Conventional | Channel::AvoidedDeforestation => 0.50,
        }
    }

    /// Channel sensitivity multiplier on the climate-adjusted failure rate.
    pub fn risk_sensitivity(self) -> f64 {
        match self {
            Channel::Cdr => 1.0,
            Channel::Conventional => 1.2,
            Channel::AvoidedDeforestation => 1.5,
        }
    }

    /// Maximum operational lifetime in years before a project is retired.
    pub fn max_operational_years(self) -> u32 {
        match self {
            Channel::Cdr => 100,
            Channel::Conventional => 25,
            Channel::AvoidedDeforestation => 50,
        }
    }

    /// Default annual deployment ceiling (GtCO2/yr of planned capacity).
    /// The CDR cap is configurable per scenario.
    pub fn default_capacity_gt(self) -> f64 {
        match self {
            Channel::Cdr => 20.0,
            Channel::Conventional => 30.0,
            Channel::AvoidedDeforestation => 5.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Cdr => "CDR",
            Channel::Conventional => "CONVENTIONAL",
            Channel::AvoidedDeforestation => "AVOIDED_DEFORESTATION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiation_order_funds_structural_channels_first() {
        assert_eq!(INITIATION_ORDER[0], Channel::AvoidedDeforestation);
        assert_eq!(INITIATION_ORDER[2], Channel::Cdr);
    }

    #[test]
    fn test_reversal_fractions() {
        assert_eq!(Channel::Cdr.failure_reversal_fraction(), 0.10);
        assert_eq!(Channel::Conventional.failure_reversal_fraction(), 0.50);
        assert_eq!(Channel::AvoidedDeforestation.failure_reversal_fraction(), 0.50);
    }

    #[test]
    fn test_lifetimes_ordered_by_durability() {
        assert!(
            Channel::Cdr.max_operational_years()
                > Channel::AvoidedDeforestation.max_operational_years()
        );
        assert!(
            Channel::AvoidedDeforestation.max_operational_years()
                > Channel::Conventional.max_operational_years()
        );
    }
}
