//! Market agents: investor sentiment and private capital flows.
//!
//! Both agents expose their decision step through a trait so an
//! alternative implementation (e.g. an LLM-backed agent) can be swapped in
//! without engine changes. The rule-based structs here are the defaults.

mod capital;
mod investor;

pub use capital::{CapitalFlowDecision, CapitalFlowModel, CapitalMarket, CapitalObservation};
pub use investor::{InvestorMarket, SentimentModel, SentimentObservation};
