use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::path::Path;
use tracing::info;

use crate::config::{DetectorConfig, SimulationParams};
use crate::error::{ModelError, ParamError, SessionError, SweepError};
use crate::output::{compute_summary, SummaryMetrics};
use crate::scorer::FraudScorer;
use crate::session::{Session, DEFAULT_CAPACITY};
use crate::simulation::Simulation;

const SWEEP_USER: &str = "sweep";

/// Result of evaluating one (fraud rate, sensitivity) combination.
#[derive(Debug, Clone)]
pub struct SweepResult {
    pub fraud_rate: u32,
    pub sensitivity: f64,
    pub summary: SummaryMetrics,
}

/// Runs the simulation across a grid of fraud rates and sensitivities.
/// The detector is fitted once and shared by every run.
pub struct SweepEngine {
    pub ticks: u64,
    pub seed: u64,
    pub speed: u32,
    pub start: NaiveDateTime,
    scorer: FraudScorer,
}

impl SweepEngine {
    pub fn new(
        ticks: u64,
        seed: u64,
        detector: &DetectorConfig,
        start: NaiveDateTime,
    ) -> Result<Self, ModelError> {
        Ok(SweepEngine {
            ticks,
            seed,
            speed: SimulationParams::default().speed,
            start,
            scorer: FraudScorer::fit(detector)?,
        })
    }

    /// Generate all parameter combinations (cartesian product), validated.
    fn combinations(
        &self,
        fraud_rates: &[u32],
        sensitivities: &[f64],
    ) -> Result<Vec<SimulationParams>, ParamError> {
        let mut combos = Vec::with_capacity(fraud_rates.len() * sensitivities.len());
        for &rate in fraud_rates {
            for &sensitivity in sensitivities {
                combos.push(SimulationParams::new(self.speed, rate, sensitivity)?);
            }
        }
        Ok(combos)
    }

    /// Evaluate a single combination with a fresh session.
    pub fn evaluate(&self, params: &SimulationParams) -> Result<SweepResult, SessionError> {
        let session = Session::new(SWEEP_USER, DEFAULT_CAPACITY);
        let mut sim = Simulation::new(session, self.scorer.clone(), self.seed).with_metrics(true);
        sim.run_clocked(self.ticks, params, self.start)?;
        Ok(SweepResult {
            fraud_rate: params.fraud_rate,
            sensitivity: params.sensitivity,
            summary: compute_summary(&sim.metrics),
        })
    }

    /// Run a grid sweep: evaluate all combos in parallel, in grid order.
    pub fn run_grid(
        &self,
        fraud_rates: &[u32],
        sensitivities: &[f64],
    ) -> Result<Vec<SweepResult>, SweepError> {
        let combos = self.combinations(fraud_rates, sensitivities)?;
        info!(combos = combos.len(), ticks = self.ticks, "sweep started");

        let results = combos
            .par_iter()
            .map(|p| self.evaluate(p))
            .collect::<Result<Vec<_>, _>>()?;

        info!("sweep finished");
        Ok(results)
    }

    /// Best detection rate first; ties broken by precision.
    pub fn sort_results(results: &mut [SweepResult]) {
        results.sort_by(|a, b| {
            b.summary
                .detection_rate
                .partial_cmp(&a.summary.detection_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    b.summary
                        .precision
                        .partial_cmp(&a.summary.precision)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });
    }
}

/// Plain-text table for the terminal.
pub fn format_table(results: &[SweepResult]) -> String {
    let mut out = format!(
        "{:>10} {:>11} {:>7} {:>9} {:>9} {:>10} {:>10}\n",
        "fraud_rate", "sensitivity", "fraud", "injected", "detected", "detect_%", "precision"
    );
    for r in results {
        out.push_str(&format!(
            "{:>9}% {:>11.2} {:>7} {:>9} {:>9} {:>9.1}% {:>9.1}%\n",
            r.fraud_rate,
            r.sensitivity,
            r.summary.fraud_count,
            r.summary.injected_count,
            r.summary.true_positives,
            r.summary.detection_rate * 100.0,
            r.summary.precision * 100.0,
        ));
    }
    out
}

/// Save sweep results to CSV.
pub fn save_sweep_csv(
    results: &[SweepResult],
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "fraud_rate",
        "sensitivity",
        "ticks",
        "fraud_count",
        "normal_count",
        "consulted_count",
        "injected_count",
        "true_positives",
        "false_positives",
        "missed",
        "detection_rate",
        "precision",
    ])?;
    for r in results {
        let s = &r.summary;
        wtr.write_record(&[
            r.fraud_rate.to_string(),
            format!("{:.2}", r.sensitivity),
            s.total_ticks.to_string(),
            s.fraud_count.to_string(),
            s.normal_count.to_string(),
            s.consulted_count.to_string(),
            s.injected_count.to_string(),
            s.true_positives.to_string(),
            s.false_positives.to_string(),
            s.missed.to_string(),
            format!("{:.4}", s.detection_rate),
            format!("{:.4}", s.precision),
        ])?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = results.len(), "sweep results saved");
    Ok(())
}
