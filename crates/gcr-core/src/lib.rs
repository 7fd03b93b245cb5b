//! Core engine for the Global Carbon Reward (GCR) agent-based simulator.
//!
//! The engine advances a coupled climate-economy system on a yearly tick:
//! a four-reservoir carbon cycle with feedbacks, a portfolio of mitigation
//! projects across three channels, a tokenized reward asset (XCR) minted
//! against verified mitigation, a central-bank alliance defending a price
//! floor through Carbon Quantitative Easing, and a governance controller
//! that brakes issuance when monetary stability degrades.
//!
//! Entry point is [`simulation::Simulation`]; scenario inputs are collected
//! in [`config::ScenarioConfig`]. Given the same configuration and seed,
//! two runs produce bit-identical snapshot sequences.

pub mod auditor;
pub mod broker;
pub mod carbon;
pub mod channel;
pub mod config;
pub mod country;
pub mod errors;
pub mod market;
pub mod policy;
pub mod project;
pub mod simulation;
pub mod snapshot;
pub mod state;
mod util;

pub use config::ScenarioConfig;
pub use errors::{GcrError, GcrResult};
pub use simulation::{RunResult, Simulation};
pub use snapshot::AnnualSnapshot;
