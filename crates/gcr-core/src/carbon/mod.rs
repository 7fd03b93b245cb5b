//! Carbon cycle physics: four-reservoir stocks, sinks, feedbacks,
//! temperature response and the business-as-usual emissions profile.

mod bau;
mod cycle;

pub use bau::BauEmissions;
pub use cycle::{climate_risk_multiplier, CarbonCycle, CarbonCycleParameters, CarbonCycleState, StepDelta};
