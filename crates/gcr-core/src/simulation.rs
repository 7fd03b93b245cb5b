//! The simulation driver.
//!
//! One tick is one year. The driver owns every piece of authoritative
//! state and walks a fixed phase order; reordering phases changes results,
//! so the order below is part of the engine contract:
//!
//! 1. rollover (annual CQE spend and mint/burn counters)
//! 2. inflation shocks, then mean-reverting correction toward target
//! 3. country adoption
//! 4. carbon-cycle pre-step for the BAU twin
//! 5. investor sentiment update
//! 6. capital-market update (net flow, demand premium, forward guidance)
//! 7. CQE budget recalculation
//! 8. CEA policy update (stability ratio, brake) and price-floor growth
//! 9. project initiation
//! 10. project advancement (development, failures, retirement)
//! 11. audit, minting and clawback
//! 12. CQE floor defense
//! 13. carbon-cycle step with verified flows
//! 14. snapshot record and invariant audit
//!
//! All stochastic draws go through one seeded generator; consumption
//! order within a tick is fixed: shocks, adoption, initiation,
//! advancement, audits. Identical (config, seed) pairs therefore produce
//! bit-identical snapshot sequences.

use crate::auditor::{AuditOutcome, Auditor};
use crate::broker::{BrokerParameters, ChannelTable, InitiationContext, ProjectsBroker};
use crate::carbon::{climate_risk_multiplier, BauEmissions, CarbonCycle, CarbonCycleParameters};
use crate::channel::Channel;
use crate::config::ScenarioConfig;
use crate::country::CountryPool;
use crate::errors::GcrResult;
use crate::market::{
    CapitalFlowModel, CapitalMarket, CapitalObservation, InvestorMarket, SentimentModel,
    SentimentObservation,
};
use crate::policy::{Cea, CentralBankAlliance, ControllerModel, FloorDefense};
use crate::snapshot::{AnnualSnapshot, CountryAttribution};
use crate::state::{audit_invariants, ControllerState, MarketState, TokenLedger};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::info;

/// A completed run: the ordered snapshot sequence plus end-of-run
/// per-country attribution.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub snapshots: Vec<AnnualSnapshot>,
    pub country_attribution: Vec<CountryAttribution>,
}

/// The coupled climate-economy simulation.
pub struct Simulation {
    config: ScenarioConfig,
    rng: StdRng,
    year: usize,

    countries: CountryPool,
    carbon: CarbonCycle,
    bau_twin: CarbonCycle,
    bau_emissions: BauEmissions,
    broker: ProjectsBroker,
    auditor: Auditor,

    ledger: TokenLedger,
    market: MarketState,
    controller: ControllerState,

    sentiment_model: Box<dyn SentimentModel>,
    capital_model: Box<dyn CapitalFlowModel>,
    controller_model: Box<dyn ControllerModel>,
    floor_defense: Box<dyn FloorDefense>,

    /// Floor change applied in the previous tick (investor signal).
    last_floor_delta: f64,
    snapshots: Vec<AnnualSnapshot>,
}

impl Simulation {
    /// Build a simulation with the default rule-based agents.
    pub fn new(config: ScenarioConfig) -> GcrResult<Self> {
        let sentiment: Box<dyn SentimentModel> = Box::new(InvestorMarket::new());
        let capital: Box<dyn CapitalFlowModel> =
            Box::new(CapitalMarket::new(config.one_time_seed_capital_usd));
        let controller: Box<dyn ControllerModel> = Box::new(Cea::new(
            config.initial_co2_ppm,
            config.target_co2_ppm,
            config.inflation_target,
            config.years,
        ));
        let defense: Box<dyn FloorDefense> = Box::new(CentralBankAlliance::new());
        Self::with_agents(config, sentiment, capital, controller, defense)
    }

    /// Build a simulation with caller-provided decision agents. This is
    /// the substitution point for alternative (e.g. model-driven) agents:
    /// the engine only ever talks to the four traits.
    pub fn with_agents(
        config: ScenarioConfig,
        sentiment_model: Box<dyn SentimentModel>,
        capital_model: Box<dyn CapitalFlowModel>,
        controller_model: Box<dyn ControllerModel>,
        floor_defense: Box<dyn FloorDefense>,
    ) -> GcrResult<Self> {
        config.validate()?;
        info!(weighting = ?config.cobenefit_weighting, "co-benefit overlay weighting");

        let carbon_params = CarbonCycleParameters::default();
        let carbon = CarbonCycle::new(config.initial_co2_ppm, carbon_params.clone());
        let bau_twin = CarbonCycle::new(config.initial_co2_ppm, carbon_params);

        let broker_params = BrokerParameters {
            learning_rates: ChannelTable {
                cdr: config.cdr_learning_rate,
                conventional: config.conventional_learning_rate,
                avoided_deforestation: Channel::AvoidedDeforestation.default_learning_rate(),
            },
            full_scale_deployment_gt: config.full_scale_deployment_gt,
            scale_damping_steepness: config.scale_damping_steepness,
            cdr_material_budget_gt: config.cdr_material_budget_gt,
            cdr_material_cost_multiplier: config.cdr_material_cost_multiplier,
            cdr_material_capacity_floor: config.cdr_material_capacity_floor,
            capacity_gt: ChannelTable {
                cdr: config.cdr_capacity_gt,
                conventional: Channel::Conventional.default_capacity_gt(),
                avoided_deforestation: Channel::AvoidedDeforestation.default_capacity_gt(),
            },
            target_co2_ppm: config.target_co2_ppm,
            ..BrokerParameters::default()
        };

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            year: 0,
            countries: CountryPool::new(),
            carbon,
            bau_twin,
            bau_emissions: BauEmissions::new(config.bau_peak_year),
            broker: ProjectsBroker::new(broker_params),
            auditor: Auditor::new(config.cobenefit_pool_fraction, config.cobenefit_weighting),
            ledger: TokenLedger::default(),
            market: MarketState::new(config.initial_price_floor, config.inflation_target),
            controller: ControllerState::new(config.initial_co2_ppm),
            sentiment_model,
            capital_model,
            controller_model,
            floor_defense,
            last_floor_delta: 0.0,
            snapshots: Vec::with_capacity(config.years),
            config,
        })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn year(&self) -> usize {
        self.year
    }

    pub fn finished(&self) -> bool {
        self.year >= self.config.years
    }

    pub fn snapshots(&self) -> &[AnnualSnapshot] {
        &self.snapshots
    }

    /// Read-only views for external drivers (checkpointing, dashboards,
    /// stepwise test harnesses).
    pub fn market_state(&self) -> &MarketState {
        &self.market
    }

    pub fn controller_state(&self) -> &ControllerState {
        &self.controller
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    pub fn broker(&self) -> &ProjectsBroker {
        &self.broker
    }

    pub fn countries(&self) -> &CountryPool {
        &self.countries
    }

    /// Institutional capacity fraction: zero before the XCR start year,
    /// then a linear ramp to full minting capacity.
    fn capacity_fraction(&self) -> f64 {
        if self.year < self.config.xcr_start_year {
            return 0.0;
        }
        let since_start = self.year - self.config.xcr_start_year;
        if self.config.years_to_full_capacity == 0
            || since_start >= self.config.years_to_full_capacity
        {
            1.0
        } else {
            since_start as f64 / self.config.years_to_full_capacity as f64
        }
    }

    /// Linear CO2 roadmap from the initial level to the target.
    fn roadmap_target(&self, year: usize) -> f64 {
        let progress = year as f64 / self.config.years.max(1) as f64;
        self.config.initial_co2_ppm
            - (self.config.initial_co2_ppm - self.config.target_co2_ppm) * progress
    }

    /// Inflation shocks: the scheduled list first (deterministic), then
    /// the stochastic background.
    fn apply_shocks(&mut self) {
        for shock in &self.config.scheduled_shocks {
            if shock.year == self.year {
                self.market.realized_inflation += shock.magnitude;
                info!(year = self.year, magnitude = shock.magnitude, "scheduled inflation shock");
            }
        }
        if self.config.stochastic_shocks {
            if self.rng.gen::<f64>() < 0.05 {
                let shock = self.rng.gen_range(0.005..0.015);
                self.market.realized_inflation += shock;
                info!(year = self.year, magnitude = shock, "inflation shock");
            }
            let noise_dist = Normal::new(0.0, 0.002).expect("valid normal parameters");
            self.market.realized_inflation += noise_dist.sample(&mut self.rng);
        }
    }

    /// Central banks steer CPI toward target: 25%/yr correction,
    /// 40% when more than two points adrift.
    fn correct_inflation(&mut self) {
        let gap = self.market.realized_inflation - self.config.inflation_target;
        let rate = if gap.abs() > 0.02 { 0.4 } else { 0.25 };
        self.market.realized_inflation -= gap * rate;
    }

    /// Flip the CDR buildout stop when a stop condition is met.
    fn update_cdr_buildout_stop(&mut self) {
        if self.controller.cdr_buildout_stopped {
            return;
        }
        let year_stop = self
            .config
            .cdr_buildout_stop_year
            .is_some_and(|stop| self.year >= stop);
        let peak_stop = self.config.cdr_buildout_stop_on_co2_peak && self.controller.co2_peaked();
        if year_stop || peak_stop {
            self.controller.cdr_buildout_stopped = true;
            info!(
                year = self.year,
                on_peak = peak_stop,
                "CDR buildout stopped; no further CDR projects will start"
            );
        }
    }

    /// Advance one year. See the module docs for the phase order.
    pub fn step(&mut self) -> GcrResult<()> {
        let year = self.year;
        let system_active = year >= self.config.xcr_start_year;
        let capacity_fraction = self.capacity_fraction();

        // Phase 0: rollover. Last year's budget utilization feeds this
        // year's brake before the annual counters reset.
        let prior_utilization = self.market.budget_utilization();
        self.market.rollover();
        self.ledger.rollover();

        // Inflation dynamics.
        if system_active {
            self.apply_shocks();
            self.correct_inflation();
        } else {
            self.market.realized_inflation = 0.0;
        }

        // Country adoption.
        if system_active && capacity_fraction > 0.0 {
            self.countries
                .adopt(self.config.adoption_rate, year, &mut self.rng);
        }

        // BAU twin pre-step: same sink physics, emissions only.
        let bau_gtc = self.bau_emissions.current_gtc();
        let bau_gtco2 = self.bau_emissions.current_gtco2();
        let bau_delta = self.bau_twin.step(bau_gtc, 0.0, 0.0, 0.0, 0.0);

        // Investor sentiment.
        if system_active {
            let obs = SentimentObservation {
                warning_active: self.controller.warning_active,
                warning_was_active: self.controller.warning_was_active,
                co2_declined: self.controller.co2_decline_streak >= 1,
                forward_guidance: self.market.forward_guidance,
                floor_delta: self.last_floor_delta,
            };
            self.sentiment_model.update_sentiment(&mut self.market, &obs);
        }

        // Capital market.
        let co2_level = self.carbon.co2_ppm();
        if system_active {
            let obs = CapitalObservation {
                co2_ppm: co2_level,
                initial_co2_ppm: self.config.initial_co2_ppm,
                target_co2_ppm: self.config.target_co2_ppm,
                year,
                total_years: self.config.years,
                roadmap_gap_ppm: co2_level - self.roadmap_target(year),
                realized_inflation: self.market.realized_inflation,
                sentiment: self.market.sentiment,
                xcr_supply: self.ledger.supply,
                price_floor: self.market.price_floor,
                market_age_years: year - self.config.xcr_start_year,
            };
            let decision = self.capital_model.update_flows(&obs);
            self.market.net_capital_flow = decision.net_capital_flow;
            self.market.capital_demand_premium = decision.capital_demand_premium;
            self.market.forward_guidance = decision.forward_guidance;
            self.market.cumulative_capital_inflow += decision.net_capital_flow.max(0.0);
            self.market.market_price = InvestorMarket::price(&self.market);
        } else {
            self.market.net_capital_flow = 0.0;
            self.market.capital_demand_premium = 0.0;
            self.market.forward_guidance = 0.0;
        }

        // CQE budget from this year's private flow.
        let active_gdp_usd = self.countries.active_gdp_usd();
        if system_active {
            let annual_inflow = self.market.net_capital_flow.max(0.0);
            self.floor_defense
                .update_budget(&mut self.market, annual_inflow, active_gdp_usd);
        }

        // CEA policy: stability ratio, warning, brake; then floor growth.
        if system_active {
            self.controller_model.update_policy(
                &mut self.market,
                &mut self.controller,
                self.ledger.supply,
                prior_utilization,
            );
            let revision = self.controller_model.revise_floor(
                &mut self.market,
                &mut self.controller,
                year,
                co2_level,
                self.carbon.temperature(),
            );
            self.last_floor_delta = revision.floor_delta;
        }

        // Project initiation.
        self.update_cdr_buildout_stop();
        let luc_gtco2 = self.carbon.params().land_use_flux_gtc * self.carbon.params().gtco2_per_gtc;
        if system_active && capacity_fraction > 0.0 {
            let structural_gt = self.controller.structural_conventional_tonnes / 1.0e9;
            let planned_avdef_gt = self.broker.planned_rate_gt(Channel::AvoidedDeforestation);
            let ctx = InitiationContext {
                year,
                market_price: self.market.market_price,
                brake_factor: self.market.brake_factor,
                co2_ppm: co2_level,
                realized_inflation: self.market.realized_inflation,
                available_capital_usd: self.market.net_capital_flow.max(0.0),
                residual_emissions_gt: (bau_gtco2 - structural_gt).max(0.0),
                residual_luc_gt: (luc_gtco2 - planned_avdef_gt).max(0.0),
                es_ratio: self.controller.es_ratio,
                cdr_blocked: self.controller.cdr_buildout_stopped,
            };
            self.broker.initiate_projects(&ctx, &self.countries, &mut self.rng);
        }

        // Project advancement.
        let risk = climate_risk_multiplier(self.carbon.temperature());
        let reversal_projects_tonnes = self.broker.advance_projects(
            co2_level,
            self.market.realized_inflation,
            risk,
            &mut self.rng,
        );

        // Audit, minting, clawback.
        let audit_outcome = if system_active && capacity_fraction > 0.0 && self.config.enable_audits
        {
            self.auditor.audit_and_mint(
                &mut self.broker,
                &mut self.ledger,
                &mut self.countries,
                &mut self.controller,
                bau_gtco2 * 1.0e9,
                luc_gtco2 * 1.0e9,
                self.market.brake_factor,
                capacity_fraction,
                &mut self.rng,
            )
        } else {
            AuditOutcome::default()
        };

        // CQE floor defense.
        let intervention =
            self.floor_defense
                .defend_floor(&mut self.market, self.ledger.supply, active_gdp_usd);
        if intervention.xcr_purchased > 0.0 {
            self.countries.attribute_purchases(intervention.xcr_purchased);
        }
        if intervention.price_support > 0.0 {
            self.market.market_price += intervention.price_support;
            self.market.realized_inflation += intervention.inflation_impact;
            // Hard mean-reversion clamp: reserve creation must not run CPI
            // away from target.
            if self.market.realized_inflation > self.config.inflation_target {
                let overshoot = self.market.realized_inflation - self.config.inflation_target;
                self.market.realized_inflation -= overshoot * 0.6;
                self.market.realized_inflation = self
                    .market
                    .realized_inflation
                    .min(self.config.inflation_target * 1.5);
            }
        }

        // Carbon-cycle step with verified flows.
        let gtc_per_tonne = 1.0 / (1.0e9 * self.carbon.params().gtco2_per_gtc);
        let cdr_gtc = audit_outcome.cdr_tonnes * gtc_per_tonne;
        let conv_gtc = self.controller.structural_conventional_tonnes * gtc_per_tonne;
        let avdef_gtc = audit_outcome.avdef_tonnes * gtc_per_tonne;
        let reversal_tonnes = reversal_projects_tonnes + audit_outcome.reversal_tonnes;
        let reversal_gtc = reversal_tonnes * gtc_per_tonne;
        let delta = self
            .carbon
            .step(bau_gtc, cdr_gtc, conv_gtc, avdef_gtc, reversal_gtc);

        // Net-zero latch: first time emissions fall to the sink total,
        // conventional crediting terminates permanently.
        let sinks_gtc = cdr_gtc + delta.ocean_uptake_gtc + delta.land_uptake_gtc.max(0.0);
        self.controller.es_ratio = if sinks_gtc > 0.0 {
            delta.net_anthropogenic_gtc / sinks_gtc
        } else {
            f64::INFINITY
        };
        if !self.controller.net_zero_ever_reached && self.controller.es_ratio <= 1.0 {
            self.controller.net_zero_ever_reached = true;
            info!(year, "net-zero reached; conventional crediting terminated");
        }
        self.controller.observe_co2(delta.co2_ppm);

        // BAU emissions roll forward for next year.
        self.bau_emissions.advance(year);

        // Record.
        let (total, operational, development, failed) = self.broker.counts();
        let cdr_cost = self.broker.marginal_cost(Channel::Cdr);
        let conv_cost = self.broker.marginal_cost(Channel::Conventional);
        let (_, cdr_r_eff) = ProjectsBroker::r_values(Channel::Cdr, cdr_cost, cdr_cost);
        let (_, conv_r_eff) = ProjectsBroker::r_values(Channel::Conventional, conv_cost, cdr_cost);
        let (_, _, conv_utilization) = self.broker.scarcity(Channel::Conventional);
        let (_, _, cdr_utilization) = self.broker.scarcity(Channel::Cdr);

        self.snapshots.push(AnnualSnapshot {
            year,
            co2_ppm: delta.co2_ppm,
            bau_co2_ppm: bau_delta.co2_ppm,
            co2_avoided: bau_delta.co2_ppm - delta.co2_ppm,
            temperature_anomaly: delta.temperature,
            inflation: self.market.realized_inflation,
            market_price: self.market.market_price,
            price_floor: self.market.price_floor,
            sentiment: self.market.sentiment,
            cea_brake_factor: self.market.brake_factor,
            xcr_supply: self.ledger.supply,
            xcr_minted: self.ledger.minted_annual,
            xcr_burned_annual: self.ledger.burned_annual,
            xcr_burned_cumulative: self.ledger.burned_cumulative,
            cobenefit_bonus_xcr: self.ledger.cobenefit_bonus_annual,
            projects_total: total,
            projects_operational: operational,
            projects_development: development,
            projects_failed: failed,
            sequestration_tonnes: audit_outcome.total_sequestered_tonnes,
            cdr_sequestration_tonnes: audit_outcome.cdr_tonnes,
            conventional_mitigation_tonnes: audit_outcome.conventional_tonnes,
            avoided_deforestation_tonnes: audit_outcome.avdef_tonnes,
            reversal_tonnes,
            cqe_spent: self.market.cqe_spent_cumulative,
            annual_cqe_spent: self.market.cqe_spent_annual,
            annual_cqe_budget: self.market.cqe_budget_annual,
            cqe_budget_utilization: self.market.budget_utilization(),
            xcr_purchased: self.market.xcr_purchased_annual,
            cqe_budget_total: self.market.cqe_budget_annual,
            active_countries: self.countries.active_count(),
            ocean_uptake_gtc: delta.ocean_uptake_gtc,
            land_uptake_gtc: delta.land_uptake_gtc,
            airborne_fraction: delta.airborne_fraction,
            permafrost_emissions_gtc: delta.permafrost_emissions_gtc,
            fire_emissions_gtc: delta.fire_emissions_gtc,
            cumulative_emissions_gtc: delta.cumulative_emissions_gtc,
            climate_risk_multiplier: risk,
            net_capital_flow: self.market.net_capital_flow,
            capital_demand_premium: self.market.capital_demand_premium,
            forward_guidance: self.market.forward_guidance,
            cdr_cost_per_tonne: cdr_cost,
            conventional_cost_per_tonne: conv_cost,
            cdr_cumulative_gtco2: self.broker.cumulative_deployment_gt(Channel::Cdr),
            conventional_cumulative_gtco2: self
                .broker
                .cumulative_deployment_gt(Channel::Conventional),
            cdr_r_effective: cdr_r_eff,
            conventional_r_effective: conv_r_eff,
            conventional_capacity_utilization: conv_utilization,
            cdr_material_utilization: cdr_utilization,
            cdr_buildout_stopped: self.controller.cdr_buildout_stopped,
        });

        self.year += 1;

        // A tick either completes and passes the invariant audit, or the
        // run aborts at this boundary.
        audit_invariants(year, &self.ledger, &self.market)
    }

    /// Run every remaining tick and consume the simulation.
    pub fn run(mut self) -> GcrResult<RunResult> {
        while !self.finished() {
            self.step()?;
        }

        let country_attribution = self
            .countries
            .iter()
            .filter(|c| c.active)
            .map(|c| CountryAttribution {
                country: c.name.clone(),
                oecd: c.oecd,
                gdp_tril: c.gdp_tril,
                xcr_earned: c.xcr_earned,
                xcr_purchased_equiv: c.xcr_purchased_equiv,
                net_xcr: c.xcr_earned - c.xcr_purchased_equiv,
                historical_emissions_gtco2: c.historical_emissions_gtco2,
            })
            .collect();

        Ok(RunResult {
            snapshots: self.snapshots,
            country_attribution,
        })
    }
}
