use chrono::{NaiveDateTime, NaiveTime, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimulationParams;
use crate::transaction::{RawTransaction, TransactionType, HISTORY_LEN};

pub const MIN_AMOUNT: u64 = 10_000;
pub const MAX_AMOUNT: u64 = 500_000_000;
pub const MIN_HISTORY_AMOUNT: u64 = 10_000;
pub const MAX_HISTORY_AMOUNT: u64 = 1_000_000;
pub const MIN_INJECTED_AMOUNT: u64 = 100_000_000;
pub const MAX_INJECTED_AMOUNT: u64 = 2_000_000_000;
/// Injected records get an early-morning timestamp with this probability.
pub const EARLY_MORNING_SHIFT_PROBABILITY: f64 = 0.5;

/// Synthetic transaction source.
///
/// One record per call; randomness comes from an owned seeded RNG and the
/// timestamp from the caller, so a run is reproducible given a seed and a
/// clock.
pub struct TransactionGenerator {
    rng: StdRng,
}

impl TransactionGenerator {
    pub fn new(seed: u64) -> Self {
        TransactionGenerator {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self, params: &SimulationParams, now: NaiveDateTime) -> RawTransaction {
        let kinds = TransactionType::all();
        let kind = kinds[self.rng.gen_range(0..kinds.len())];
        let mut amount = self.rng.gen_range(MIN_AMOUNT..=MAX_AMOUNT);
        let mut time = truncate_to_seconds(now.time());
        let sender = format!("USER-{}", self.rng.gen_range(1000..=9999));
        let receiver = format!("RECV-{}", self.rng.gen_range(1000..=9999));

        let mut history = [0u64; HISTORY_LEN];
        for slot in history.iter_mut() {
            *slot = self.rng.gen_range(MIN_HISTORY_AMOUNT..=MAX_HISTORY_AMOUNT);
        }

        let injected = self.rng.gen::<f64>() < params.fraud_probability();
        if injected {
            amount = self.rng.gen_range(MIN_INJECTED_AMOUNT..=MAX_INJECTED_AMOUNT);
            if self.rng.gen::<f64>() < EARLY_MORNING_SHIFT_PROBABILITY {
                let hour = self.rng.gen_range(0..=4);
                let minute = self.rng.gen_range(0..=59);
                time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(time);
            }
        }

        RawTransaction {
            id: transaction_id(now),
            kind,
            amount,
            time,
            sender,
            receiver,
            history,
            injected,
        }
    }
}

/// `TX` followed by the wall-clock nanoseconds modulo one million, unpadded.
pub fn transaction_id(now: NaiveDateTime) -> String {
    let nanos = now.and_utc().timestamp_nanos_opt().unwrap_or_default();
    format!("TX{}", nanos.rem_euclid(1_000_000))
}

fn truncate_to_seconds(time: NaiveTime) -> NaiveTime {
    time.with_nanosecond(0).unwrap_or(time)
}
