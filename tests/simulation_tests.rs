use chrono::{NaiveDate, NaiveDateTime};
use std::sync::atomic::Ordering;
use std::time::Duration;

use fraudguard::config::{DetectorConfig, SimulationParams};
use fraudguard::dashboard::LiveDashboard;
use fraudguard::error::SessionError;
use fraudguard::generator::{MAX_INJECTED_AMOUNT, MIN_INJECTED_AMOUNT};
use fraudguard::scorer::FraudScorer;
use fraudguard::session::{Session, DEFAULT_CAPACITY};
use fraudguard::simulation::Simulation;
use fraudguard::transaction::Status;

const TEST_SEED: u64 = 42;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn simulation(seed: u64) -> Simulation {
    let scorer = FraudScorer::fit(&DetectorConfig::default()).unwrap();
    Simulation::new(Session::new("bank", DEFAULT_CAPACITY), scorer, seed).with_metrics(true)
}

// ═══════════════════════════════════════════════════════════════════════
// Tick invariants
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_counters_sum_to_ticks() {
    let mut sim = simulation(TEST_SEED);
    let params = SimulationParams::default();
    for expected in 1..=120u64 {
        let outcome = sim.step(&params, start()).unwrap();
        assert_eq!(outcome.tick, expected);
        let state = sim.state().unwrap();
        assert_eq!(state.fraud_count + state.normal_count, expected);
        assert!(state.recent_len() <= DEFAULT_CAPACITY);
        assert_eq!(state.latest().unwrap().id, outcome.transaction.id);
    }
    assert_eq!(sim.ticks(), 120);
    assert_eq!(sim.metrics.len(), 120);
    assert_eq!(sim.state().unwrap().recent_len(), DEFAULT_CAPACITY);
}

#[test]
fn test_zero_sensitivity_all_normal() {
    let mut sim = simulation(TEST_SEED);
    let params = SimulationParams::new(3, 100, 0.0).unwrap();
    sim.run_clocked(300, &params, start()).unwrap();
    let state = sim.state().unwrap();
    assert_eq!(state.fraud_count, 0);
    assert_eq!(state.normal_count, 300);
    assert!(sim.metrics.iter().all(|m| !m.consulted && m.score.is_none()));
}

#[test]
fn test_full_rate_full_sensitivity() {
    let mut sim = simulation(TEST_SEED);
    let params = SimulationParams::new(3, 100, 1.0).unwrap();
    for _ in 0..300 {
        let tx = sim.step(&params, start()).unwrap().transaction;
        assert!((MIN_INJECTED_AMOUNT..=MAX_INJECTED_AMOUNT).contains(&tx.amount));
        assert!(tx.consulted);
        assert!(tx.score.is_some());
        assert_eq!(tx.status.is_fraud(), tx.score.unwrap() < -0.1);
    }
    assert_eq!(sim.state().unwrap().total(), 300);
    assert!(sim.metrics.iter().all(|m| m.injected && m.consulted));
}

#[test]
fn test_flag_only_when_consulted() {
    let mut sim = simulation(TEST_SEED);
    let params = SimulationParams::new(3, 50, 0.5).unwrap();
    sim.run_clocked(400, &params, start()).unwrap();
    for m in &sim.metrics {
        if m.flagged {
            assert!(m.consulted);
        }
        assert_eq!(m.consulted, m.score.is_some());
    }
    let consulted = sim.metrics.iter().filter(|m| m.consulted).count() as f64 / 400.0;
    assert!((0.4..0.6).contains(&consulted), "consulted share {}", consulted);
}

// ═══════════════════════════════════════════════════════════════════════
// Session lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_step_requires_login() {
    let mut sim = simulation(TEST_SEED);
    sim.session_mut().logout();
    let err = sim.step(&SimulationParams::default(), start()).unwrap_err();
    assert_eq!(err, SessionError::NotAuthenticated);
    assert_eq!(sim.ticks(), 0);
}

#[test]
fn test_restart_resets_counters() {
    let mut sim = simulation(TEST_SEED);
    sim.run_clocked(30, &SimulationParams::default(), start()).unwrap();
    sim.restart();
    assert_eq!(sim.ticks(), 0);
    assert!(sim.metrics.is_empty());
    let state = sim.state().unwrap();
    assert_eq!(state.total(), 0);
    assert!(state.latest().is_none());
}

// ═══════════════════════════════════════════════════════════════════════
// Determinism
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_clocked_run_reproducible() {
    let params = SimulationParams::new(5, 40, 0.8).unwrap();
    let mut a = simulation(7);
    let mut b = simulation(7);
    a.run_clocked(100, &params, start()).unwrap();
    b.run_clocked(100, &params, start()).unwrap();
    assert_eq!(a.metrics, b.metrics);

    let ids_a: Vec<String> = a.state().unwrap().recent().map(|t| t.id.clone()).collect();
    let ids_b: Vec<String> = b.state().unwrap().recent().map(|t| t.id.clone()).collect();
    assert_eq!(ids_a, ids_b);
}

#[test]
fn test_clock_advances_by_tick_interval() {
    let mut sim = simulation(TEST_SEED);
    // speed 3 -> one second per tick
    let params = SimulationParams::new(3, 0, 0.0).unwrap();
    sim.run_clocked(3, &params, start()).unwrap();
    let times: Vec<String> = sim.state().unwrap().recent().map(|t| t.time_label()).collect();
    assert_eq!(times, vec!["09:00:02", "09:00:01", "09:00:00"]);
    assert!(sim
        .state()
        .unwrap()
        .recent()
        .all(|t| t.status == Status::Normal));
}

#[test]
fn test_clocked_callback_sees_every_tick() {
    let mut sim = simulation(TEST_SEED);
    let params = SimulationParams::new(5, 30, 0.5).unwrap();
    let mut seen = Vec::new();
    sim.run_clocked_with(25, &params, start(), |outcome| {
        seen.push((outcome.tick, outcome.transaction.id.clone()))
    })
    .unwrap();

    assert_eq!(seen.len(), 25);
    for (i, (tick, _)) in seen.iter().enumerate() {
        assert_eq!(*tick, i as u64 + 1);
    }
    assert_eq!(seen.last().unwrap().1, sim.state().unwrap().latest().unwrap().id);
}

#[test]
fn test_clocked_callback_not_called_without_login() {
    let mut sim = simulation(TEST_SEED);
    sim.session_mut().logout();
    let mut calls = 0;
    let err = sim
        .run_clocked_with(5, &SimulationParams::default(), start(), |_| calls += 1)
        .unwrap_err();
    assert_eq!(err, SessionError::NotAuthenticated);
    assert_eq!(calls, 0);
}

// ═══════════════════════════════════════════════════════════════════════
// Live loop
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_live_loop_stops_when_flag_cleared() {
    let mut sim = simulation(TEST_SEED);
    let params = SimulationParams::default();
    let mut dash = LiveDashboard::new(Vec::<u8>::new())
        .with_interval(Duration::from_millis(5))
        .with_clear(false);

    let flag = dash.running();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(60));
        flag.store(false, Ordering::Relaxed);
    });
    let ticks = dash.run(&mut sim, &params, None).unwrap();
    stopper.join().unwrap();

    assert!(ticks > 0);
    assert_eq!(sim.ticks(), ticks);
    let out = String::from_utf8(dash.into_inner()).unwrap();
    assert_eq!(out.matches("AUDIT TRAIL").count(), ticks as usize);
    assert!(!out.contains("\x1b[2J"));
}

#[test]
fn test_live_loop_honours_tick_cap() {
    let mut sim = simulation(TEST_SEED);
    let mut dash = LiveDashboard::new(Vec::<u8>::new())
        .with_interval(Duration::ZERO)
        .with_clear(false);
    let ticks = dash.run(&mut sim, &SimulationParams::default(), Some(4)).unwrap();
    assert_eq!(ticks, 4);
    assert!(dash.running().load(Ordering::Relaxed));
    let out = String::from_utf8(dash.into_inner()).unwrap();
    assert_eq!(out.matches("FRAUDGUARD PRO | user BANK").count(), 4);
}
