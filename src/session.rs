use chrono::{DateTime, Local};
use std::collections::VecDeque;

use crate::transaction::Transaction;

pub const DEFAULT_CAPACITY: usize = 50;

/// Counters plus the rolling list of recent transactions.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub fraud_count: u64,
    pub normal_count: u64,
    capacity: usize,
    /// Newest first.
    recent: VecDeque<Transaction>,
}

impl SessionState {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SessionState {
            fraud_count: 0,
            normal_count: 0,
            capacity,
            recent: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Count the transaction and push it to the front, evicting the oldest
    /// once the list is over capacity.
    pub fn record(&mut self, tx: Transaction) {
        if tx.is_fraud() {
            self.fraud_count += 1;
        } else {
            self.normal_count += 1;
        }
        self.recent.push_front(tx);
        if self.recent.len() > self.capacity {
            self.recent.pop_back();
        }
    }

    pub fn total(&self) -> u64 {
        self.fraud_count + self.normal_count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Recent transactions, newest first.
    pub fn recent(&self) -> impl Iterator<Item = &Transaction> {
        self.recent.iter()
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    pub fn latest(&self) -> Option<&Transaction> {
        self.recent.front()
    }

    /// Share of processed transactions flagged as fraud, 0.0 when empty.
    pub fn fraud_share(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.fraud_count as f64 / n as f64,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An authenticated dashboard session. Created by a successful login and
/// reset by `logout`.
#[derive(Debug, Clone)]
pub struct Session {
    user: String,
    started_at: DateTime<Local>,
    state: Option<SessionState>,
    capacity: usize,
}

impl Session {
    pub fn new(user: &str, capacity: usize) -> Self {
        Session {
            user: user.to_string(),
            started_at: Local::now(),
            state: Some(SessionState::new(capacity)),
            capacity,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn state_mut(&mut self) -> Option<&mut SessionState> {
        self.state.as_mut()
    }

    /// Drop all counters and history; the session must log in again to be
    /// used.
    pub fn logout(&mut self) {
        self.state = None;
    }

    /// Start over with empty counters, as a fresh login would.
    pub fn restart(&mut self) {
        self.started_at = Local::now();
        self.state = Some(SessionState::new(self.capacity));
    }
}
