use chrono::{Local, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::config::SimulationParams;
use crate::error::SessionError;
use crate::generator::TransactionGenerator;
use crate::scorer::FraudScorer;
use crate::session::{Session, SessionState};
use crate::transaction::Transaction;

/// Per-tick metrics snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TickMetrics {
    pub tick: u64,
    pub fraud_count: u64,
    pub normal_count: u64,
    pub amount: u64,
    pub injected: bool,
    pub consulted: bool,
    pub flagged: bool,
    pub score: Option<f64>,
}

/// Result of one tick: the scored transaction and the tick number.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub tick: u64,
    pub transaction: Transaction,
}

/// The simulation state: generator, scorer and the session they feed.
pub struct Simulation {
    generator: TransactionGenerator,
    scorer: FraudScorer,
    session: Session,
    ticks: u64,
    record_metrics: bool,
    pub metrics: Vec<TickMetrics>,
    rng: StdRng,
}

impl Simulation {
    pub fn new(session: Session, scorer: FraudScorer, seed: u64) -> Self {
        Simulation {
            generator: TransactionGenerator::new(seed),
            scorer,
            session,
            ticks: 0,
            record_metrics: false,
            metrics: Vec::new(),
            rng: StdRng::seed_from_u64(seed.wrapping_add(0xBEEF)),
        }
    }

    /// Keep a `TickMetrics` row per tick for reports.
    pub fn with_metrics(mut self, record: bool) -> Self {
        self.record_metrics = record;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.session.state()
    }

    pub fn scorer(&self) -> &FraudScorer {
        &self.scorer
    }

    /// Ticks executed since the session (re)started.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Execute a single tick: generate, score, record.
    pub fn step(
        &mut self,
        params: &SimulationParams,
        now: NaiveDateTime,
    ) -> Result<TickOutcome, SessionError> {
        let state = self.session.state_mut().ok_or(SessionError::NotAuthenticated)?;

        let raw = self.generator.generate(params, now);
        let assessment = self.scorer.assess(&raw, params.sensitivity, &mut self.rng);
        let transaction = raw.into_scored(assessment.status, assessment.consulted, assessment.score);

        state.record(transaction.clone());
        self.ticks += 1;

        debug!(
            tick = self.ticks,
            id = %transaction.id,
            amount = transaction.amount,
            injected = transaction.injected,
            consulted = transaction.consulted,
            status = %transaction.status,
            "tick"
        );

        if self.record_metrics {
            self.metrics.push(TickMetrics {
                tick: self.ticks,
                fraud_count: state.fraud_count,
                normal_count: state.normal_count,
                amount: transaction.amount,
                injected: transaction.injected,
                consulted: transaction.consulted,
                flagged: transaction.is_fraud(),
                score: transaction.score,
            });
        }

        Ok(TickOutcome {
            tick: self.ticks,
            transaction,
        })
    }

    /// Run `ticks` steps back to back against the wall clock.
    pub fn run(&mut self, ticks: u64, params: &SimulationParams) -> Result<(), SessionError> {
        for _ in 0..ticks {
            self.step(params, Local::now().naive_local())?;
        }
        Ok(())
    }

    /// Run `ticks` steps on a simulated clock that starts at `start` and
    /// advances by the tick interval, so runs are reproducible per seed.
    pub fn run_clocked(
        &mut self,
        ticks: u64,
        params: &SimulationParams,
        start: NaiveDateTime,
    ) -> Result<(), SessionError> {
        self.run_clocked_with(ticks, params, start, |_| {})
    }

    /// `run_clocked`, calling `on_tick` after every step.
    pub fn run_clocked_with<F>(
        &mut self,
        ticks: u64,
        params: &SimulationParams,
        start: NaiveDateTime,
        mut on_tick: F,
    ) -> Result<(), SessionError>
    where
        F: FnMut(&TickOutcome),
    {
        let step_ms = params.tick_interval().as_millis() as i64;
        for i in 0..ticks {
            let now = start + chrono::Duration::milliseconds(step_ms * i as i64);
            let outcome = self.step(params, now)?;
            on_tick(&outcome);
        }
        Ok(())
    }

    /// Start a fresh session with zeroed counters and history.
    pub fn restart(&mut self) {
        self.session.restart();
        self.ticks = 0;
        self.metrics.clear();
    }

    /// Export per-tick metrics to CSV.
    pub fn save_metrics_csv(
        &self,
        path: &std::path::Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record([
            "tick",
            "fraud_count",
            "normal_count",
            "amount",
            "injected",
            "consulted",
            "flagged",
            "score",
        ])?;

        for m in &self.metrics {
            wtr.write_record(&[
                m.tick.to_string(),
                m.fraud_count.to_string(),
                m.normal_count.to_string(),
                m.amount.to_string(),
                m.injected.to_string(),
                m.consulted.to_string(),
                m.flagged.to_string(),
                m.score.map(|s| format!("{:.6}", s)).unwrap_or_default(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}
