//! Per-year output records.
//!
//! One [`AnnualSnapshot`] is appended per tick; the sequence is the
//! engine's entire output surface. Serde renames pin the serialized field
//! names to the tabular column names consumed by the exporter and the
//! dashboard, so the Rust-side naming can stay idiomatic.

use serde::{Deserialize, Serialize};

/// One simulated year.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnualSnapshot {
    #[serde(rename = "Year")]
    pub year: usize,
    #[serde(rename = "CO2_ppm")]
    pub co2_ppm: f64,
    #[serde(rename = "BAU_CO2_ppm")]
    pub bau_co2_ppm: f64,
    #[serde(rename = "CO2_Avoided")]
    pub co2_avoided: f64,
    #[serde(rename = "Temperature_Anomaly")]
    pub temperature_anomaly: f64,
    #[serde(rename = "Inflation")]
    pub inflation: f64,
    #[serde(rename = "Market_Price")]
    pub market_price: f64,
    #[serde(rename = "Price_Floor")]
    pub price_floor: f64,
    #[serde(rename = "Sentiment")]
    pub sentiment: f64,
    #[serde(rename = "CEA_Brake_Factor")]
    pub cea_brake_factor: f64,
    #[serde(rename = "XCR_Supply")]
    pub xcr_supply: f64,
    #[serde(rename = "XCR_Minted")]
    pub xcr_minted: f64,
    #[serde(rename = "XCR_Burned_Annual")]
    pub xcr_burned_annual: f64,
    #[serde(rename = "XCR_Burned_Cumulative")]
    pub xcr_burned_cumulative: f64,
    #[serde(rename = "Cobenefit_Bonus_XCR")]
    pub cobenefit_bonus_xcr: f64,
    #[serde(rename = "Projects_Total")]
    pub projects_total: usize,
    #[serde(rename = "Projects_Operational")]
    pub projects_operational: usize,
    #[serde(rename = "Projects_Development")]
    pub projects_development: usize,
    #[serde(rename = "Projects_Failed")]
    pub projects_failed: usize,
    #[serde(rename = "Sequestration_Tonnes")]
    pub sequestration_tonnes: f64,
    #[serde(rename = "CDR_Sequestration_Tonnes")]
    pub cdr_sequestration_tonnes: f64,
    #[serde(rename = "Conventional_Mitigation_Tonnes")]
    pub conventional_mitigation_tonnes: f64,
    #[serde(rename = "Avoided_Deforestation_Tonnes")]
    pub avoided_deforestation_tonnes: f64,
    #[serde(rename = "Reversal_Tonnes")]
    pub reversal_tonnes: f64,
    #[serde(rename = "CQE_Spent")]
    pub cqe_spent: f64,
    #[serde(rename = "Annual_CQE_Spent")]
    pub annual_cqe_spent: f64,
    #[serde(rename = "Annual_CQE_Budget")]
    pub annual_cqe_budget: f64,
    #[serde(rename = "CQE_Budget_Utilization")]
    pub cqe_budget_utilization: f64,
    #[serde(rename = "XCR_Purchased")]
    pub xcr_purchased: f64,
    #[serde(rename = "CQE_Budget_Total")]
    pub cqe_budget_total: f64,
    #[serde(rename = "Active_Countries")]
    pub active_countries: usize,
    #[serde(rename = "Ocean_Uptake_GtC")]
    pub ocean_uptake_gtc: f64,
    #[serde(rename = "Land_Uptake_GtC")]
    pub land_uptake_gtc: f64,
    #[serde(rename = "Airborne_Fraction")]
    pub airborne_fraction: f64,
    #[serde(rename = "Permafrost_Emissions_GtC")]
    pub permafrost_emissions_gtc: f64,
    #[serde(rename = "Fire_Emissions_GtC")]
    pub fire_emissions_gtc: f64,
    #[serde(rename = "Cumulative_Emissions_GtC")]
    pub cumulative_emissions_gtc: f64,
    #[serde(rename = "Climate_Risk_Multiplier")]
    pub climate_risk_multiplier: f64,
    #[serde(rename = "Net_Capital_Flow")]
    pub net_capital_flow: f64,
    #[serde(rename = "Capital_Demand_Premium")]
    pub capital_demand_premium: f64,
    #[serde(rename = "Forward_Guidance")]
    pub forward_guidance: f64,
    #[serde(rename = "CDR_Cost_Per_Tonne")]
    pub cdr_cost_per_tonne: f64,
    #[serde(rename = "Conventional_Cost_Per_Tonne")]
    pub conventional_cost_per_tonne: f64,
    #[serde(rename = "CDR_Cumulative_GtCO2")]
    pub cdr_cumulative_gtco2: f64,
    #[serde(rename = "Conventional_Cumulative_GtCO2")]
    pub conventional_cumulative_gtco2: f64,
    #[serde(rename = "CDR_R_Effective")]
    pub cdr_r_effective: f64,
    #[serde(rename = "Conventional_R_Effective")]
    pub conventional_r_effective: f64,
    #[serde(rename = "Conventional_Capacity_Utilization")]
    pub conventional_capacity_utilization: f64,
    #[serde(rename = "CDR_Material_Utilization")]
    pub cdr_material_utilization: f64,
    #[serde(rename = "CDR_Buildout_Stopped")]
    pub cdr_buildout_stopped: bool,
}

/// End-of-run attribution for a single country.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryAttribution {
    pub country: String,
    pub oecd: bool,
    pub gdp_tril: f64,
    /// Cumulative XCR minted to projects hosted here.
    pub xcr_earned: f64,
    /// Cumulative XCR-equivalent attributed from CQE purchases.
    pub xcr_purchased_equiv: f64,
    /// Earned minus purchased.
    pub net_xcr: f64,
    pub historical_emissions_gtco2: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_with_tabular_column_names() {
        let snapshot = AnnualSnapshot {
            year: 7,
            co2_ppm: 415.2,
            cdr_buildout_stopped: true,
            ..AnnualSnapshot::default()
        };
        let json = serde_json::to_string(&snapshot).expect("serialize");
        for column in [
            "\"Year\":7",
            "\"CO2_ppm\":415.2",
            "\"BAU_CO2_ppm\"",
            "\"CEA_Brake_Factor\"",
            "\"XCR_Burned_Cumulative\"",
            "\"Cobenefit_Bonus_XCR\"",
            "\"CQE_Budget_Utilization\"",
            "\"CDR_Material_Utilization\"",
            "\"CDR_Buildout_Stopped\":true",
        ] {
            assert!(json.contains(column), "missing column {column} in {json}");
        }
    }

    #[test]
    fn test_snapshot_round_trips() {
        let snapshot = AnnualSnapshot {
            year: 3,
            market_price: 151.5,
            projects_total: 12,
            ..AnnualSnapshot::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: AnnualSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.year, 3);
        assert_eq!(parsed.projects_total, 12);
        assert_eq!(parsed.market_price, 151.5);
    }
}
