//! Per-year ensemble statistics.

use gcr_core::simulation::RunResult;
use gcr_core::AnnualSnapshot;
use indexmap::IndexMap;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// The headline variables summarized across the ensemble, with the
/// extractor for each.
const VARIABLES: [(&str, fn(&AnnualSnapshot) -> f64); 8] = [
    ("CO2_ppm", |s| s.co2_ppm),
    ("BAU_CO2_ppm", |s| s.bau_co2_ppm),
    ("Temperature_Anomaly", |s| s.temperature_anomaly),
    ("XCR_Supply", |s| s.xcr_supply),
    ("Market_Price", |s| s.market_price),
    ("Sentiment", |s| s.sentiment),
    ("Inflation", |s| s.inflation),
    ("CEA_Brake_Factor", |s| s.cea_brake_factor),
];

/// Ensemble statistics for one variable: arrays indexed by year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSummary {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
    pub min: Array1<f64>,
    pub max: Array1<f64>,
    /// 5th percentile across members.
    pub q05: Array1<f64>,
    /// 95th percentile across members.
    pub q95: Array1<f64>,
}

impl VariableSummary {
    /// Summarize a (years x runs) matrix along the run axis.
    fn from_matrix(matrix: &Array2<f64>) -> Self {
        let (n_years, n_runs) = matrix.dim();
        let mut mean = Array1::zeros(n_years);
        let mut std = Array1::zeros(n_years);
        let mut min = Array1::zeros(n_years);
        let mut max = Array1::zeros(n_years);
        let mut q05 = Array1::zeros(n_years);
        let mut q95 = Array1::zeros(n_years);

        for year in 0..n_years {
            let row = matrix.row(year);
            let m = row.sum() / n_runs as f64;
            let var = row.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n_runs as f64;

            let mut sorted: Vec<f64> = row.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).expect("non-NaN ensemble values"));

            mean[year] = m;
            std[year] = var.sqrt();
            min[year] = sorted[0];
            max[year] = sorted[n_runs - 1];
            q05[year] = percentile(&sorted, 0.05);
            q95[year] = percentile(&sorted, 0.95);
        }

        Self { mean, std, min, max, q05, q95 }
    }
}

/// Per-year statistics for every headline variable, keyed by the tabular
/// column name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleSummary {
    pub n_runs: usize,
    pub n_years: usize,
    pub variables: IndexMap<String, VariableSummary>,
}

impl EnsembleSummary {
    /// Build the summary from completed runs. Every run must cover the
    /// same year range (the runner guarantees this).
    pub fn from_runs(runs: &[RunResult]) -> Self {
        let n_runs = runs.len();
        let n_years = runs.first().map(|r| r.snapshots.len()).unwrap_or(0);

        let mut variables = IndexMap::with_capacity(VARIABLES.len());
        for (name, extract) in VARIABLES {
            let mut matrix = Array2::zeros((n_years, n_runs));
            for (run_idx, run) in runs.iter().enumerate() {
                for (year, snapshot) in run.snapshots.iter().enumerate() {
                    matrix[[year, run_idx]] = extract(snapshot);
                }
            }
            variables.insert(name.to_string(), VariableSummary::from_matrix(&matrix));
        }

        Self { n_runs, n_years, variables }
    }

    pub fn variable(&self, name: &str) -> Option<&VariableSummary> {
        self.variables.get(name)
    }
}

/// Linear-interpolated percentile of an already-sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
