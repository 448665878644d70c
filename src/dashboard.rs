use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::info;

use crate::config::SimulationParams;
use crate::credentials::CredentialStore;
use crate::session::{Session, SessionState};
use crate::simulation::Simulation;
use crate::transaction::{format_amount, Transaction};

const RULE: &str = "════════════════════════════════════════════════════════════════════════";
const BAR_WIDTH: usize = 40;
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Splash shown before login, listing the accepted identifiers.
pub fn render_login(identifiers: &[&str]) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push_str("\n  FRAUDGUARD PRO\n");
    out.push_str("  Financial fraud detection demo\n");
    out.push_str(RULE);
    out.push('\n');
    out.push_str("  Log in to access the dashboard.\n");
    out.push_str(&format!("  Users: {}\n", identifiers.join(", ")));
    out
}

/// Alert region: details of the latest transaction when flagged, else clear.
pub fn render_alert(latest: Option<&Transaction>, fraud_count: u64) -> String {
    let mut out = String::from("LIVE ALERTS\n");
    match latest {
        Some(tx) if tx.is_fraud() => {
            out.push_str("  !! LATEST FRAUD ALERT\n");
            out.push_str(&format!("  {} | {}\n", tx.id, tx.time_label()));
            out.push_str(&format!("  Rp {}\n", format_amount(tx.amount)));
            out.push_str(&format!(
                "  {} >> {} -> {}\n",
                tx.kind, tx.sender, tx.receiver
            ));
        }
        _ => out.push_str("  No suspicious activity\n"),
    }
    out.push_str(&format!("  Total fraud detected: {}\n", fraud_count));
    out
}

/// Two-category proportion bar of cumulative normal vs fraud counts.
pub fn render_distribution(state: &SessionState) -> String {
    let share = state.fraud_share();
    let (normal_cells, fraud_cells, normal_pct) = if state.total() == 0 {
        (0, 0, 0.0)
    } else {
        let fraud_cells = (share * BAR_WIDTH as f64).round() as usize;
        (BAR_WIDTH - fraud_cells, fraud_cells, (1.0 - share) * 100.0)
    };

    format!(
        "TRANSACTION DISTRIBUTION\n  [{}{}{}]\n  Normal {} ({:.1}%)  Fraud {} ({:.1}%)\n",
        "█".repeat(normal_cells),
        "░".repeat(fraud_cells),
        " ".repeat(BAR_WIDTH - normal_cells - fraud_cells),
        state.normal_count,
        normal_pct,
        state.fraud_count,
        share * 100.0,
    )
}

pub fn render_params(params: &SimulationParams) -> String {
    format!(
        "PARAMETERS  speed={}/s  fraud rate={}%  sensitivity={:.2}\n",
        params.speed, params.fraud_rate, params.sensitivity
    )
}

/// Audit table of recent transactions, newest first.
pub fn render_table(state: &SessionState) -> String {
    let mut out = String::from("AUDIT TRAIL\n");
    out.push_str(&format!(
        "  {:<10} {:<12} {:>15} {:<9} {}\n",
        "id", "type", "amount", "time", "status"
    ));
    for tx in state.recent() {
        out.push_str(&format!(
            "  {:<10} {:<12} {:>15} {:<9} {}\n",
            tx.id,
            tx.kind.label(),
            format_amount(tx.amount),
            tx.time_label(),
            tx.status
        ));
    }
    out
}

/// A full dashboard frame. Pure projection of the session and parameters.
pub fn render_frame(session: &Session, params: &SimulationParams) -> String {
    let Some(state) = session.state() else {
        return render_login(&CredentialStore::builtin().identifiers());
    };
    let mut out = String::new();
    out.push_str(RULE);
    out.push_str(&format!(
        "\n  FRAUDGUARD PRO | user {} | since {}\n",
        session.user().to_uppercase(),
        session.started_at().format("%H:%M:%S")
    ));
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&render_params(params));
    out.push('\n');
    out.push_str(&render_alert(state.latest(), state.fraud_count));
    out.push('\n');
    out.push_str(&render_distribution(state));
    out.push('\n');
    out.push_str(&render_table(state));
    out
}

/// Drives the tick loop against a writer: step, render, sleep, repeat.
pub struct LiveDashboard<W: Write> {
    out: W,
    running: Arc<AtomicBool>,
    interval: Option<Duration>,
    clear: bool,
}

impl<W: Write> LiveDashboard<W> {
    pub fn new(out: W) -> Self {
        LiveDashboard {
            out,
            running: Arc::new(AtomicBool::new(true)),
            interval: None,
            clear: true,
        }
    }

    /// Override the 3/speed second sleep between ticks.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Emit an ANSI clear before each frame (on by default).
    pub fn with_clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    /// Flag checked between ticks; store `false` to stop the loop.
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Run until the running flag drops or `max_ticks` ticks have executed.
    /// Returns the number of ticks run.
    pub fn run(
        &mut self,
        simulation: &mut Simulation,
        params: &SimulationParams,
        max_ticks: Option<u64>,
    ) -> Result<u64, Box<dyn std::error::Error>> {
        let interval = self.interval.unwrap_or_else(|| params.tick_interval());
        info!(
            user = simulation.session().user(),
            interval_ms = interval.as_millis() as u64,
            "live dashboard started"
        );

        let mut ticks = 0u64;
        while self.running.load(Ordering::Relaxed) {
            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
            simulation.step(params, Local::now().naive_local())?;
            ticks += 1;

            if self.clear {
                self.out.write_all(CLEAR_SCREEN.as_bytes())?;
            }
            self.out
                .write_all(render_frame(simulation.session(), params).as_bytes())?;
            self.out.flush()?;

            if !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }

        info!(ticks, "live dashboard stopped");
        Ok(ticks)
    }
}
