//! Mitigation projects and their lifecycle state machine.

use crate::channel::Channel;
use serde::{Deserialize, Serialize};

/// Lifecycle status. Transitions run one way only:
/// `Development -> Operational -> Failed`. `Failed` is terminal and covers
/// both verification failure and scheduled retirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    Development,
    Operational,
    Failed,
}

/// A single mitigation or sequestration project.
///
/// Economic terms are locked at initiation: the marginal cost and the
/// R-values never change once the project exists. Everything the project
/// delivers is credited by the auditor against `annual_sequestration_tonnes`
/// while the status is `Operational`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub channel: Channel,
    /// Host country name (key into the country roster).
    pub country: String,
    pub start_year: usize,
    /// Years of construction before the project turns operational (1-4).
    pub development_years: u32,
    /// Delivery rate once operational (tonnes CO2/yr).
    pub annual_sequestration_tonnes: f64,
    /// Cost per tonne at initiation (USD), locked for the project's life.
    pub marginal_cost_per_tonne: f64,
    /// Cost-effectiveness R-value relative to the CDR benchmark.
    pub r_base: f64,
    /// R-value actually used for minting.
    pub r_effective: f64,
    /// Overlay weighting score in [0, 1], sampled at initiation.
    pub co_benefit_score: f64,

    pub status: ProjectStatus,
    /// Delivery quality in [0, 1]; wears slowly while operational and
    /// raises the audit failure probability as it degrades.
    pub health: f64,
    pub years_in_development: u32,
    pub years_operational: u32,
    /// Lifetime XCR minted to this project (clawback base).
    pub total_xcr_minted: f64,
    /// Lifetime physically delivered tonnes (reversal base).
    pub total_sequestered_tonnes: f64,
    /// Conventional only: tonnes already credited against the structural
    /// emissions baseline, so the same capacity is never counted twice.
    pub structural_credited_tonnes: f64,
}

impl Project {
    /// Advance construction by a year, commissioning the project once its
    /// development term is served. No effect outside `Development`.
    pub fn advance_development(&mut self) {
        if self.status == ProjectStatus::Development {
            self.years_in_development += 1;
            if self.years_in_development >= self.development_years {
                self.status = ProjectStatus::Operational;
            }
        }
    }

    /// Terminate the project and return the tonnes that reverse to the
    /// atmosphere. The reversal base is zeroed so a project can only
    /// reverse once.
    pub fn fail_with_reversal(&mut self) -> f64 {
        let reversal = self.total_sequestered_tonnes * self.channel.failure_reversal_fraction();
        self.total_sequestered_tonnes = 0.0;
        self.status = ProjectStatus::Failed;
        reversal
    }

    /// Retire the project without reversal (end of scheduled lifetime).
    pub fn retire(&mut self) {
        self.status = ProjectStatus::Failed;
    }

    /// Whether the project has outlived its channel's maximum lifetime.
    pub fn past_max_age(&self) -> bool {
        self.years_operational >= self.channel.max_operational_years()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project(channel: Channel) -> Project {
        Project {
            id: 1,
            channel,
            country: "Kenya".to_string(),
            start_year: 0,
            development_years: 2,
            annual_sequestration_tonnes: 5.0e7,
            marginal_cost_per_tonne: 80.0,
            r_base: 1.0,
            r_effective: 1.0,
            co_benefit_score: 0.5,
            status: ProjectStatus::Development,
            health: 1.0,
            years_in_development: 0,
            years_operational: 0,
            total_xcr_minted: 0.0,
            total_sequestered_tonnes: 0.0,
            structural_credited_tonnes: 0.0,
        }
    }

    #[test]
    fn test_development_term_is_served_before_commissioning() {
        let mut p = sample_project(Channel::Cdr);
        p.advance_development();
        assert_eq!(p.status, ProjectStatus::Development);
        p.advance_development();
        assert_eq!(p.status, ProjectStatus::Operational);
    }

    #[test]
    fn test_failure_reverses_once() {
        let mut p = sample_project(Channel::Cdr);
        p.status = ProjectStatus::Operational;
        p.total_sequestered_tonnes = 1.0e8;

        let first = p.fail_with_reversal();
        assert!((first - 1.0e7).abs() < 1.0, "CDR reverses 10% of delivery");
        assert_eq!(p.status, ProjectStatus::Failed);

        let second = p.fail_with_reversal();
        assert_eq!(second, 0.0, "a failed project cannot reverse again");
    }

    #[test]
    fn test_conventional_reverses_half() {
        let mut p = sample_project(Channel::Conventional);
        p.status = ProjectStatus::Operational;
        p.total_sequestered_tonnes = 2.0e7;
        assert!((p.fail_with_reversal() - 1.0e7).abs() < 1.0);
    }

    #[test]
    fn test_failed_is_terminal_for_development_ticks() {
        let mut p = sample_project(Channel::Cdr);
        p.status = ProjectStatus::Failed;
        p.advance_development();
        assert_eq!(p.status, ProjectStatus::Failed);
        assert_eq!(p.years_in_development, 0);
    }
}
