//! Business-as-usual emissions trajectory.

use serde::{Deserialize, Serialize};

/// Exogenous fossil emissions flow under the no-policy counterfactual.
///
/// The profile grows 1%/yr until the peak year, plateaus through
/// mid-century, then declines slowly (~0.2%/yr) as population pressure
/// eases late in the century. Both the policy run and the BAU twin read
/// the same flow each tick, so the twin comparison isolates mitigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BauEmissions {
    /// Current emissions flow
    /// unit: GtCO2/yr
    current_gtco2: f64,
    /// Year emissions stop growing
    /// default: 6
    peak_year: usize,
    /// Year the late-century decline begins
    /// default: 60
    decline_start_year: usize,
    /// Pre-peak annual growth rate
    /// default: 0.01
    growth_rate_pre_peak: f64,
    /// Post-decline annual growth rate (negative)
    /// default: -0.002
    decline_rate: f64,
}

impl BauEmissions {
    /// Start from the present-day flow of ~40 GtCO2/yr.
    pub fn new(peak_year: usize) -> Self {
        Self {
            current_gtco2: 40.0,
            peak_year,
            decline_start_year: 60,
            growth_rate_pre_peak: 0.01,
            decline_rate: -0.002,
        }
    }

    /// Current flow in GtCO2/yr.
    pub fn current_gtco2(&self) -> f64 {
        self.current_gtco2
    }

    /// Current flow in GtC/yr.
    pub fn current_gtc(&self) -> f64 {
        self.current_gtco2 / 3.67
    }

    /// Roll the flow forward to the next year.
    pub fn advance(&mut self, year: usize) {
        let rate = if year < self.peak_year {
            self.growth_rate_pre_peak
        } else if year < self.decline_start_year {
            0.0
        } else {
            self.decline_rate
        };
        self.current_gtco2 = (self.current_gtco2 * (1.0 + rate)).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_grows_then_plateaus_then_declines() {
        let mut bau = BauEmissions::new(6);
        let mut series = Vec::new();
        for year in 0..80 {
            series.push(bau.current_gtco2());
            bau.advance(year);
        }
        assert!(series[5] > series[0], "pre-peak growth");
        assert!((series[30] - series[10]).abs() < 1e-9, "plateau is flat");
        assert!(series[79] < series[60], "late-century decline");
    }

    #[test]
    fn test_peak_flow_is_about_five_percent_above_start() {
        let mut bau = BauEmissions::new(6);
        for year in 0..10 {
            bau.advance(year);
        }
        let expected = 40.0 * 1.01f64.powi(6);
        assert!((bau.current_gtco2() - expected).abs() < 1e-9);
    }
}
