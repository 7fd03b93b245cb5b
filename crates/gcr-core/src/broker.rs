//! Project portfolio management.
//!
//! # What this component does
//!
//! 1. Initiates new projects from the available capital pool, channel by
//!    channel (avoided deforestation, then conventional, then CDR), while
//!    the economics clear the gate `market_price * brake >= marginal_cost`
//!
//! 2. Prices each channel through a learning curve (cost falls per
//!    deployment doubling), a depletion term (easy opportunities thin out
//!    as the project count grows) and a scarcity term (sigmoid cost
//!    escalation as the channel's resource budget depletes)
//!
//! 3. Scales project size and count with cumulative industry experience
//!    (pilot plants early, industrial scale late) and with climate urgency
//!    (buildout tapers as CO2 approaches the 350 ppm target)
//!
//! 4. Advances the portfolio each year: development terms, stochastic
//!    failures with climate-risk amplification, age-out retirement, and
//!    accelerated wind-down once the drawdown target is overshot

use crate::channel::{Channel, INITIATION_ORDER};
use crate::country::CountryPool;
use crate::project::{Project, ProjectStatus};
use crate::util::{clamp01, logistic, normalized_logistic};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One value per channel, matched exhaustively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelTable<T> {
    pub cdr: T,
    pub conventional: T,
    pub avoided_deforestation: T,
}

impl<T> ChannelTable<T> {
    pub fn get(&self, channel: Channel) -> &T {
        match channel {
            Channel::Cdr => &self.cdr,
            Channel::Conventional => &self.conventional,
            Channel::AvoidedDeforestation => &self.avoided_deforestation,
        }
    }

    pub fn get_mut(&mut self, channel: Channel) -> &mut T {
        match channel {
            Channel::Cdr => &mut self.cdr,
            Channel::Conventional => &mut self.conventional,
            Channel::AvoidedDeforestation => &mut self.avoided_deforestation,
        }
    }
}

/// Tunable parameters for the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerParameters {
    /// Learning rates per channel (cost reduction per doubling).
    pub learning_rates: ChannelTable<f64>,

    /// Midpoint of the CDR learning-rate taper
    /// unit: GtCO2 cumulative
    /// default: 20.0
    pub cdr_learning_taper_midpoint_gt: f64,

    /// Slope of the CDR learning-rate taper
    /// unit: GtCO2
    /// default: 5.0
    pub cdr_learning_taper_slope_gt: f64,

    /// Cumulative deployment at which projects reach industrial scale
    /// unit: GtCO2
    /// default: 45.0
    pub full_scale_deployment_gt: f64,

    /// Steepness of the scale-damping curve (per Gt of the threshold)
    /// default: 8.0
    pub scale_damping_steepness: f64,

    /// Project scale at zero deployment experience
    /// default: 0.15
    pub scale_floor: f64,

    /// Scale-damper midpoint as a fraction of the full-scale threshold
    /// default: 0.30
    pub scale_midpoint_fraction: f64,

    /// Minimum fraction of potential projects initiated at low deployment
    /// default: 0.30
    pub count_damper_floor: f64,

    /// Low-cost conventional mitigation available before scarcity
    /// unit: GtCO2
    /// default: 1000.0
    pub conventional_easy_budget_gt: f64,

    /// Scarcity sigmoid centre as a fraction of the easy budget
    /// default: 0.70
    pub conventional_scarcity_center: f64,

    /// Peak conventional cost multiplier at exhaustion
    /// default: 4.0
    pub conventional_scarcity_max_multiplier: f64,

    /// Residual hard-to-abate conventional capacity at exhaustion
    /// default: 0.10
    pub conventional_capacity_floor: f64,

    /// CDR material budget
    /// unit: GtCO2
    /// default: 500.0
    pub cdr_material_budget_gt: f64,

    /// Material-scarcity sigmoid centre as a fraction of the budget
    /// default: 0.60
    pub cdr_material_scarcity_center: f64,

    /// Peak CDR cost multiplier at material exhaustion
    /// default: 4.0
    pub cdr_material_cost_multiplier: f64,

    /// Residual CDR build capacity at material exhaustion
    /// default: 0.25
    pub cdr_material_capacity_floor: f64,

    /// Steepness of both scarcity sigmoids on the utilization axis
    /// default: 10.0
    pub scarcity_steepness: f64,

    /// Annual deployment ceilings per channel (GtCO2/yr).
    pub capacity_gt: ChannelTable<f64>,

    /// Headroom fraction at which the conventional frontier taper is
    /// half-engaged
    /// default: 0.15
    pub frontier_taper_midpoint: f64,

    /// Steepness of the frontier taper
    /// default: 12.0
    pub frontier_taper_steepness: f64,

    /// Expected project delivery before scale damping
    /// unit: tonnes CO2/yr
    /// default: 5.5e7
    pub expected_base_seq_tonnes: f64,

    /// Smallest project delivery before scale damping
    /// unit: tonnes CO2/yr
    /// default: 1.0e7
    pub min_base_seq_tonnes: f64,

    /// Baseline annual failure probability while operational
    /// default: 0.02
    pub base_failure_rate: f64,

    /// Multiplicative health wear per operational year
    /// default: 0.995
    pub health_wear: f64,

    /// Drawdown target used by the urgency taper and retirement logic
    /// unit: ppm
    /// default: 350.0
    pub target_co2_ppm: f64,
}

impl Default for BrokerParameters {
    fn default() -> Self {
        Self {
            learning_rates: ChannelTable {
                cdr: Channel::Cdr.default_learning_rate(),
                conventional: Channel::Conventional.default_learning_rate(),
                avoided_deforestation: Channel::AvoidedDeforestation.default_learning_rate(),
            },
            cdr_learning_taper_midpoint_gt: 20.0,
            cdr_learning_taper_slope_gt: 5.0,
            full_scale_deployment_gt: 45.0,
            scale_damping_steepness: 8.0,
            scale_floor: 0.15,
            scale_midpoint_fraction: 0.30,
            count_damper_floor: 0.30,
            conventional_easy_budget_gt: 1000.0,
            conventional_scarcity_center: 0.70,
            conventional_scarcity_max_multiplier: 4.0,
            conventional_capacity_floor: 0.10,
            cdr_material_budget_gt: 500.0,
            cdr_material_scarcity_center: 0.60,
            cdr_material_cost_multiplier: 4.0,
            cdr_material_capacity_floor: 0.25,
            scarcity_steepness: 10.0,
            capacity_gt: ChannelTable {
                cdr: Channel::Cdr.default_capacity_gt(),
                conventional: Channel::Conventional.default_capacity_gt(),
                avoided_deforestation: Channel::AvoidedDeforestation.default_capacity_gt(),
            },
            frontier_taper_midpoint: 0.15,
            frontier_taper_steepness: 12.0,
            expected_base_seq_tonnes: 5.5e7,
            min_base_seq_tonnes: 1.0e7,
            base_failure_rate: 0.02,
            health_wear: 0.995,
            target_co2_ppm: 350.0,
        }
    }
}

/// Per-tick inputs for project initiation, read-only for the broker.
#[derive(Debug, Clone, Copy)]
pub struct InitiationContext {
    pub year: usize,
    pub market_price: f64,
    pub brake_factor: f64,
    pub co2_ppm: f64,
    pub realized_inflation: f64,
    /// Capital pool available for new builds (USD).
    pub available_capital_usd: f64,
    /// Residual human emissions conventional projects can still displace
    /// (GtCO2/yr).
    pub residual_emissions_gt: f64,
    /// Residual land-use emissions avoided-deforestation projects can
    /// still displace (GtCO2/yr).
    pub residual_luc_gt: f64,
    /// Emissions-to-sinks ratio of the previous tick.
    pub es_ratio: f64,
    /// New CDR buildout is blocked this tick.
    pub cdr_blocked: bool,
}

/// The portfolio manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsBroker {
    params: BrokerParameters,
    projects: Vec<Project>,
    next_project_id: u64,
    /// Verified cumulative deployment per channel (tonnes CO2).
    cumulative_deployment_tonnes: ChannelTable<f64>,
    /// First-deployment reference for the learning curves (tonnes CO2).
    reference_capacity_tonnes: ChannelTable<Option<f64>>,
}

impl ProjectsBroker {
    pub fn new(params: BrokerParameters) -> Self {
        Self {
            params,
            projects: Vec::new(),
            next_project_id: 1,
            cumulative_deployment_tonnes: ChannelTable::default(),
            reference_capacity_tonnes: ChannelTable::default(),
        }
    }

    pub fn params(&self) -> &BrokerParameters {
        &self.params
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn projects_mut(&mut self) -> &mut [Project] {
        &mut self.projects
    }

    pub fn cumulative_deployment_gt(&self, channel: Channel) -> f64 {
        self.cumulative_deployment_tonnes.get(channel) / 1.0e9
    }

    /// Record verified deployment; the first delivery pins the learning
    /// reference.
    pub fn record_deployment(&mut self, channel: Channel, tonnes: f64) {
        *self.cumulative_deployment_tonnes.get_mut(channel) += tonnes;
        let reference = self.reference_capacity_tonnes.get_mut(channel);
        if reference.is_none() && tonnes > 0.0 {
            *reference = Some(tonnes);
        }
    }

    /// (total, operational, development, failed) project counts.
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let mut operational = 0;
        let mut development = 0;
        let mut failed = 0;
        for p in &self.projects {
            match p.status {
                ProjectStatus::Operational => operational += 1,
                ProjectStatus::Development => development += 1,
                ProjectStatus::Failed => failed += 1,
            }
        }
        (self.projects.len(), operational, development, failed)
    }

    // ------------------------------------------------------------------
    // Cost model
    // ------------------------------------------------------------------

    /// Channel learning rate; CDR's tapers off with cumulative deployment
    /// as the technology matures.
    fn effective_learning_rate(&self, channel: Channel) -> f64 {
        let lr = *self.params.learning_rates.get(channel);
        if channel != Channel::Cdr {
            return lr;
        }
        let cum_gt = self.cumulative_deployment_gt(Channel::Cdr);
        let taper = logistic(
            (cum_gt - self.params.cdr_learning_taper_midpoint_gt)
                / self.params.cdr_learning_taper_slope_gt.max(1e-9),
        );
        lr * (1.0 - taper)
    }

    /// Scarcity state of a channel: (cost multiplier, capacity factor,
    /// budget utilization).
    pub fn scarcity(&self, channel: Channel) -> (f64, f64, f64) {
        let (budget_gt, center, max_mult, floor) = match channel {
            Channel::Conventional => (
                self.params.conventional_easy_budget_gt,
                self.params.conventional_scarcity_center,
                self.params.conventional_scarcity_max_multiplier,
                self.params.conventional_capacity_floor,
            ),
            Channel::Cdr => (
                self.params.cdr_material_budget_gt,
                self.params.cdr_material_scarcity_center,
                self.params.cdr_material_cost_multiplier,
                self.params.cdr_material_capacity_floor,
            ),
            Channel::AvoidedDeforestation => return (1.0, 1.0, 0.0),
        };
        let utilization = clamp01(self.cumulative_deployment_gt(channel) / budget_gt.max(1e-9));
        let s = normalized_logistic(utilization, 0.0, 1.0, center, self.params.scarcity_steepness);
        let cost_multiplier = 1.0 + (max_mult - 1.0) * s;
        let capacity_factor = (1.0 - s).max(floor);
        (cost_multiplier, capacity_factor, utilization)
    }

    /// Current marginal cost per tonne for new builds.
    ///
    /// `cost = base * learning * depletion * scarcity`, with
    /// `learning(x) = (x / x_ref)^(log2(1 - LR))` and
    /// `depletion(n) = 1 + 0.15 * log10(n + 1)`.
    ///
    /// Scarcity inflation applies to new builds only; existing projects
    /// keep the cost locked at initiation.
    pub fn marginal_cost(&self, channel: Channel) -> f64 {
        let base = channel.base_cost();
        let cumulative = *self.cumulative_deployment_tonnes.get(channel);
        let reference = *self.reference_capacity_tonnes.get(channel);

        let learning = match reference {
            Some(reference) if reference > 0.0 && cumulative > 0.0 => {
                let lr = self.effective_learning_rate(channel);
                let exponent = (1.0 - lr).ln() / 2.0f64.ln();
                (cumulative.max(1e-9) / reference).powf(exponent)
            }
            _ => 1.0,
        };

        let count = self.projects.iter().filter(|p| p.channel == channel).count();
        let depletion = 1.0 + 0.15 * ((count + 1) as f64).log10();

        let (scarcity_mult, _, _) = self.scarcity(channel);

        base * learning * depletion * scarcity_mult
    }

    /// Cost-gate multiplier pushing conventional initiation toward zero as
    /// the economy approaches net-zero: 1x at an emissions-to-sinks ratio
    /// of 6, 100x at 1, exponential in between. This prices conventional
    /// crediting out before the hard latch trips.
    pub fn net_zero_proximity_penalty(es_ratio: f64) -> f64 {
        if !es_ratio.is_finite() || es_ratio >= 6.0 {
            1.0
        } else if es_ratio <= 1.0 {
            100.0
        } else {
            (100.0f64.ln() * (6.0 - es_ratio) / 5.0).exp()
        }
    }

    /// R-values for a new project: CDR is fixed at 1; other channels are
    /// priced relative to the CDR benchmark.
    pub fn r_values(channel: Channel, marginal_cost: f64, benchmark_cdr_cost: f64) -> (f64, f64) {
        let r_base = match channel {
            Channel::Cdr => 1.0,
            Channel::Conventional | Channel::AvoidedDeforestation => {
                if benchmark_cdr_cost > 0.0 {
                    (marginal_cost / benchmark_cdr_cost).max(0.1)
                } else {
                    1.0
                }
            }
        };
        (r_base, r_base)
    }

    // ------------------------------------------------------------------
    // Deployment scaling
    // ------------------------------------------------------------------

    fn total_deployment_gt(&self) -> f64 {
        (self.cumulative_deployment_tonnes.cdr
            + self.cumulative_deployment_tonnes.conventional
            + self.cumulative_deployment_tonnes.avoided_deforestation)
            / 1.0e9
    }

    /// Project-size damper: industry-wide experience determines whether
    /// new builds are pilots or industrial plants. 15% scale at zero
    /// deployment, 100% at the full-scale threshold.
    pub fn scale_damper(&self) -> f64 {
        let full = self.params.full_scale_deployment_gt;
        let s = normalized_logistic(
            self.total_deployment_gt(),
            0.0,
            full,
            full * self.params.scale_midpoint_fraction,
            self.params.scale_damping_steepness / full.max(1e-9),
        );
        self.params.scale_floor + (1.0 - self.params.scale_floor) * s
    }

    /// Project-count damper: independent of size, the number of viable
    /// sites ramps with the same experience curve from a 30% floor.
    pub fn count_damper(&self) -> f64 {
        let full = self.params.full_scale_deployment_gt;
        let s = normalized_logistic(
            self.total_deployment_gt(),
            0.0,
            full,
            full * self.params.scale_midpoint_fraction,
            self.params.scale_damping_steepness / full.max(1e-9),
        );
        self.params.count_damper_floor + (1.0 - self.params.count_damper_floor) * s
    }

    /// Climate-urgency multiplier on buildout in [0, 1].
    ///
    /// Buildout runs at full tilt while CO2 is far above target and
    /// tapers through banded thresholds on approach. Realized inflation
    /// shifts where the taper starts (370 ppm when money is easy, up to
    /// 425 ppm when inflation runs hot) and steepens the inner bands.
    pub fn urgency_multiplier(&self, co2_ppm: f64, realized_inflation: f64) -> f64 {
        let target = self.params.target_co2_ppm;
        let rho = realized_inflation.max(0.0) / 0.02;

        let taper_start = if rho < 0.5 {
            370.0
        } else if rho < 1.5 {
            370.0 + 20.0 * (rho - 0.5)
        } else {
            (390.0 + 15.0 * (rho - 1.5)).min(425.0)
        };

        if co2_ppm >= taper_start {
            1.0
        } else if co2_ppm > 370.0 {
            let range = (taper_start - 370.0).max(1e-9);
            0.6 + 0.4 * (co2_ppm - 370.0) / range
        } else if co2_ppm > 360.0 {
            let t = (co2_ppm - 360.0) / 10.0;
            if rho > 2.5 {
                0.15 + 0.45 * t
            } else if rho > 1.5 {
                0.2 + 0.4 * t
            } else {
                0.3 + 0.3 * t
            }
        } else if co2_ppm > target {
            let t = (co2_ppm - target) / 10.0;
            if rho > 2.5 {
                0.01 + 0.14 * t
            } else if rho > 1.5 {
                0.02 + 0.18 * t
            } else {
                0.05 + 0.25 * t
            }
        } else {
            0.02
        }
    }

    /// Planned delivery rate (operational + development) for a channel,
    /// in GtCO2/yr.
    pub fn planned_rate_gt(&self, channel: Channel) -> f64 {
        self.projects
            .iter()
            .filter(|p| p.channel == channel && p.status != ProjectStatus::Failed)
            .map(|p| p.annual_sequestration_tonnes)
            .sum::<f64>()
            / 1.0e9
    }

    /// Operational delivery rate for a channel, in GtCO2/yr.
    pub fn operational_rate_gt(&self, channel: Channel) -> f64 {
        self.projects
            .iter()
            .filter(|p| p.channel == channel && p.status == ProjectStatus::Operational)
            .map(|p| p.annual_sequestration_tonnes)
            .sum::<f64>()
            / 1.0e9
    }

    // ------------------------------------------------------------------
    // Initiation
    // ------------------------------------------------------------------

    /// Initiate new projects for this tick. Channels draw from the shared
    /// capital pool in a fixed order; each channel builds while capital,
    /// capacity and the urgency taper allow.
    pub fn initiate_projects<R: Rng>(
        &mut self,
        ctx: &InitiationContext,
        countries: &CountryPool,
        rng: &mut R,
    ) {
        let mut remaining_capital = ctx.available_capital_usd.max(0.0);
        let benchmark_cdr_cost = self.marginal_cost(Channel::Cdr);
        let score_dist = Normal::new(0.6, 0.2).expect("valid normal parameters");

        for channel in INITIATION_ORDER {
            if remaining_capital <= 0.0 {
                break;
            }
            if channel == Channel::Cdr && ctx.cdr_blocked {
                continue;
            }

            let capacity_cap = *self.params.capacity_gt.get(channel);
            let planned = self.planned_rate_gt(channel);
            if planned >= capacity_cap {
                continue;
            }
            let mut remaining_gt = capacity_cap - planned;
            match channel {
                Channel::Conventional => {
                    remaining_gt = remaining_gt.min(ctx.residual_emissions_gt.max(0.0));
                }
                Channel::AvoidedDeforestation => {
                    remaining_gt = remaining_gt.min(ctx.residual_luc_gt.max(0.0));
                }
                Channel::Cdr => {}
            }
            if remaining_gt <= 0.0 {
                continue;
            }

            let marginal_cost = self.marginal_cost(channel);
            let (r_base, r_effective) = Self::r_values(channel, marginal_cost, benchmark_cdr_cost);

            // The proximity penalty prices conventional out of the gate as
            // net-zero nears, without inflating the recorded cost basis.
            let gate_cost = if channel == Channel::Conventional {
                marginal_cost * Self::net_zero_proximity_penalty(ctx.es_ratio)
            } else {
                marginal_cost
            };
            if ctx.market_price * ctx.brake_factor < gate_cost {
                continue;
            }

            let scale_damper = self.scale_damper();
            let expected_seq = self.params.expected_base_seq_tonnes * scale_damper;
            let min_seq = self.params.min_base_seq_tonnes * scale_damper;

            let max_by_capital = remaining_capital / (marginal_cost * expected_seq).max(1.0);
            let max_by_capacity = (remaining_gt * 1.0e9) / min_seq.max(1.0);
            let potential = max_by_capital.min(max_by_capacity).max(0.0);

            let urgency = self.urgency_multiplier(ctx.co2_ppm, ctx.realized_inflation);
            let count_damper = self.count_damper();
            let (_, scarcity_capacity, _) = self.scarcity(channel);
            let frontier = if channel == Channel::Conventional {
                let headroom = (remaining_gt / capacity_cap.max(1e-9)).clamp(0.0, 1.0);
                logistic(
                    self.params.frontier_taper_steepness
                        * (headroom - self.params.frontier_taper_midpoint),
                )
            } else {
                1.0
            };

            let num_projects =
                (potential * urgency * count_damper * scarcity_capacity * frontier).floor() as usize;

            for _ in 0..num_projects {
                if remaining_gt <= 0.0 || remaining_capital <= 0.0 {
                    break;
                }
                let Some(country) = countries.select_host(channel, rng) else {
                    break;
                };

                let development_years = rng.gen_range(1..=4);
                let base_seq = rng.gen_range(1.0e7..1.0e8);
                let mut annual_seq = base_seq * scale_damper;
                annual_seq = annual_seq.min(remaining_gt * 1.0e9);
                annual_seq = annual_seq.min(remaining_capital / marginal_cost.max(1e-9));
                if annual_seq <= 0.0 {
                    break;
                }

                let co_benefit_score = clamp01(score_dist.sample(rng));

                self.projects.push(Project {
                    id: self.next_project_id,
                    channel,
                    country,
                    start_year: ctx.year,
                    development_years,
                    annual_sequestration_tonnes: annual_seq,
                    marginal_cost_per_tonne: marginal_cost,
                    r_base,
                    r_effective,
                    co_benefit_score,
                    status: ProjectStatus::Development,
                    health: 1.0,
                    years_in_development: 0,
                    years_operational: 0,
                    total_xcr_minted: 0.0,
                    total_sequestered_tonnes: 0.0,
                    structural_credited_tonnes: 0.0,
                });
                self.next_project_id += 1;
                remaining_capital -= annual_seq * marginal_cost;
                remaining_gt -= annual_seq / 1.0e9;
            }
        }
    }

    // ------------------------------------------------------------------
    // Advancement
    // ------------------------------------------------------------------

    /// Advance every project by one year and return the reversal tonnes
    /// emitted by failures and forced retirements.
    ///
    /// Iteration is insertion-ordered; RNG draws happen only on the
    /// branches below, in this order per project: overshoot-retirement
    /// draw (operational, CO2 below target), then failure draw
    /// (operational).
    pub fn advance_projects<R: Rng>(
        &mut self,
        co2_ppm: f64,
        realized_inflation: f64,
        climate_risk_multiplier: f64,
        rng: &mut R,
    ) -> f64 {
        let target = self.params.target_co2_ppm;
        let mut reversal_tonnes = 0.0;

        for project in &mut self.projects {
            match project.status {
                ProjectStatus::Failed => continue,
                ProjectStatus::Development => {
                    project.advance_development();
                }
                ProjectStatus::Operational => {
                    // Past the drawdown target, the portfolio winds down:
                    // retirement probability scales with overshoot depth
                    // and the inflation environment.
                    if co2_ppm < target {
                        let overshoot = target - co2_ppm;
                        let base_rate: f64 = if overshoot <= 5.0 {
                            0.15
                        } else if overshoot <= 15.0 {
                            0.22
                        } else if overshoot <= 30.0 {
                            0.30
                        } else {
                            0.40
                        };
                        let rho = realized_inflation.max(0.0) / 0.02;
                        let inflation_multiplier = if rho > 2.5 {
                            1.4
                        } else if rho > 1.5 {
                            1.2
                        } else if rho < 0.5 {
                            0.8
                        } else {
                            1.0
                        };
                        let retirement_probability = (base_rate * inflation_multiplier).min(0.5);
                        if rng.gen::<f64>() < retirement_probability {
                            reversal_tonnes += project.fail_with_reversal();
                            continue;
                        }
                    }

                    let failure_rate = (self.params.base_failure_rate
                        * climate_risk_multiplier
                        * project.channel.risk_sensitivity())
                    .clamp(0.0, 0.5);
                    if rng.gen::<f64>() < failure_rate {
                        debug!(project = project.id, channel = project.channel.name(), "project failed");
                        reversal_tonnes += project.fail_with_reversal();
                        continue;
                    }

                    project.years_operational += 1;
                    project.health = (project.health * self.params.health_wear).clamp(0.0, 1.0);
                    if project.past_max_age() {
                        project.retire();
                    }
                }
            }
        }

        reversal_tonnes
    }
}
