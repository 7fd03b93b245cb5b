//! Governance agents: the CEA controller and the central-bank alliance.

mod cea;
mod cqe;

pub use cea::{Cea, ControllerModel, FloorRevision};
pub use cqe::{CentralBankAlliance, CqeIntervention, FloorDefense};
