use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::config::FraudGuardConfig;
use crate::session::SessionState;
use crate::simulation::{Simulation, TickMetrics};

/// Summary statistics for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_ticks: u64,
    pub fraud_count: u64,
    pub normal_count: u64,
    pub fraud_share: f64,
    pub consulted_count: u64,
    pub injected_count: u64,
    /// Injected and flagged.
    pub true_positives: u64,
    /// Flagged without injection.
    pub false_positives: u64,
    /// Injected but not flagged.
    pub missed: u64,
    /// true_positives / injected_count.
    pub detection_rate: f64,
    /// true_positives / fraud_count.
    pub precision: f64,
    pub mean_score: Option<f64>,
    pub min_score: Option<f64>,
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn count(metrics: &[TickMetrics], pred: impl Fn(&TickMetrics) -> bool) -> u64 {
    metrics.iter().filter(|m| pred(m)).count() as u64
}

/// Compute summary statistics from per-tick metrics.
pub fn compute_summary(metrics: &[TickMetrics]) -> SummaryMetrics {
    let fraud_count = count(metrics, |m| m.flagged);
    let injected_count = count(metrics, |m| m.injected);
    let true_positives = count(metrics, |m| m.injected && m.flagged);

    let scores: Vec<f64> = metrics.iter().filter_map(|m| m.score).collect();
    let mean_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };
    let min_score = scores.iter().cloned().reduce(f64::min);

    let total_ticks = metrics.len() as u64;
    SummaryMetrics {
        total_ticks,
        fraud_count,
        normal_count: total_ticks - fraud_count,
        fraud_share: ratio(fraud_count, total_ticks),
        consulted_count: count(metrics, |m| m.consulted),
        injected_count,
        true_positives,
        false_positives: fraud_count - true_positives,
        missed: injected_count - true_positives,
        detection_rate: ratio(true_positives, injected_count),
        precision: ratio(true_positives, fraud_count),
        mean_score,
        min_score,
    }
}

/// Save the recent-transaction table (newest first) to CSV.
pub fn save_audit_csv(
    state: &SessionState,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "id", "type", "amount", "time", "from", "to", "history", "status",
    ])?;

    for tx in state.recent() {
        let history: Vec<String> = tx.history.iter().map(|h| h.to_string()).collect();
        wtr.write_record(&[
            tx.id.clone(),
            tx.kind.label().to_string(),
            tx.amount.to_string(),
            tx.time_label(),
            tx.sender.clone(),
            tx.receiver.clone(),
            history.join(";"),
            tx.status.label().to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save summary metrics to JSON.
pub fn save_summary_json(
    summary: &SummaryMetrics,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Save configuration to TOML format. The file loads back with
/// `FraudGuardConfig::load`.
pub fn save_config_toml(
    config: &FraudGuardConfig,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml = format!(
        r#"[simulation]
speed = {}
fraud_rate = {}
sensitivity = {:?}
seed = {}

[detector]
n_estimators = {}
max_samples = {}
contamination = {:?}
threshold = {:?}
training_set = "{}"
training_seed = {}

[session]
capacity = {}
"#,
        config.params.speed,
        config.params.fraud_rate,
        config.params.sensitivity,
        config.seed,
        config.detector.n_estimators,
        config.detector.max_samples,
        config.detector.contamination,
        config.detector.threshold,
        config.detector.training_set.name(),
        config.detector.training_seed,
        config.session.capacity,
    );

    std::fs::write(path, toml)?;
    Ok(())
}

/// Save all outputs for a run to a directory.
pub fn save_all(
    simulation: &Simulation,
    config: &FraudGuardConfig,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(output_dir)?;

    if let Some(state) = simulation.state() {
        save_audit_csv(state, &output_dir.join("audit.csv"))?;
    }
    simulation.save_metrics_csv(&output_dir.join("timeseries.csv"))?;

    let summary = compute_summary(&simulation.metrics);
    save_summary_json(&summary, &output_dir.join("summary.json"))?;

    save_config_toml(config, &output_dir.join("config.toml"))?;

    info!(dir = %output_dir.display(), "outputs saved");
    Ok(())
}

/// One-line tally for logs and the terminal footer.
pub fn summary_line(summary: &SummaryMetrics) -> String {
    format!(
        "ticks={} fraud={} normal={} injected={} detected={} ({:.1}%) precision={:.1}%",
        summary.total_ticks,
        summary.fraud_count,
        summary.normal_count,
        summary.injected_count,
        summary.true_positives,
        summary.detection_rate * 100.0,
        summary.precision * 100.0,
    )
}
