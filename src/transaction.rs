use chrono::{NaiveTime, Timelike};
use std::fmt;

pub const HISTORY_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    Transfer,
    Crypto,
    EWallet,
    CreditCard,
}

impl TransactionType {
    pub fn all() -> [TransactionType; 4] {
        [
            TransactionType::Transfer,
            TransactionType::Crypto,
            TransactionType::EWallet,
            TransactionType::CreditCard,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Transfer => "Transfer",
            Self::Crypto => "Crypto",
            Self::EWallet => "E-Wallet",
            Self::CreditCard => "Credit Card",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Fraud,
    Normal,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fraud => "FRAUD",
            Self::Normal => "NORMAL",
        }
    }

    pub fn is_fraud(&self) -> bool {
        matches!(self, Self::Fraud)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A generated record before the scorer has labelled it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    pub id: String,
    pub kind: TransactionType,
    /// Minor currency units.
    pub amount: u64,
    pub time: NaiveTime,
    pub sender: String,
    pub receiver: String,
    pub history: [u64; HISTORY_LEN],
    /// Whether the generator biased this record toward fraud.
    pub injected: bool,
}

impl RawTransaction {
    /// Hour 00-04 inclusive.
    pub fn is_early_morning(&self) -> bool {
        self.time.hour() <= 4
    }

    pub fn into_scored(self, status: Status, consulted: bool, score: Option<f64>) -> Transaction {
        Transaction {
            id: self.id,
            kind: self.kind,
            amount: self.amount,
            time: self.time,
            sender: self.sender,
            receiver: self.receiver,
            history: self.history,
            injected: self.injected,
            status,
            consulted,
            score,
        }
    }
}

/// A scored transaction. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionType,
    pub amount: u64,
    pub time: NaiveTime,
    pub sender: String,
    pub receiver: String,
    pub history: [u64; HISTORY_LEN],
    pub injected: bool,
    pub status: Status,
    /// Whether the anomaly model was consulted for this record.
    pub consulted: bool,
    /// Decision score when consulted.
    pub score: Option<f64>,
}

impl Transaction {
    pub fn is_fraud(&self) -> bool {
        self.status.is_fraud()
    }

    pub fn time_label(&self) -> String {
        self.time.format("%H:%M:%S").to_string()
    }
}

/// Format minor units with `,` thousands separators: 1234567 -> "1,234,567".
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1000), "1,000");
        assert_eq!(format_amount(500_000_000), "500,000,000");
        assert_eq!(format_amount(2_000_000_000), "2,000,000,000");
    }

    #[test]
    fn test_early_morning_window() {
        let mut tx = RawTransaction {
            id: "TX000001".into(),
            kind: TransactionType::Crypto,
            amount: 10_000,
            time: NaiveTime::from_hms_opt(4, 59, 59).unwrap(),
            sender: "USER-1000".into(),
            receiver: "RECV-1000".into(),
            history: [10_000; HISTORY_LEN],
            injected: false,
        };
        assert!(tx.is_early_morning());
        tx.time = NaiveTime::from_hms_opt(5, 0, 0).unwrap();
        assert!(!tx.is_early_morning());
        tx.time = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        assert!(tx.is_early_morning());
    }

    #[test]
    fn test_type_labels() {
        let labels: Vec<&str> = TransactionType::all().iter().map(|t| t.label()).collect();
        assert_eq!(labels, vec!["Transfer", "Crypto", "E-Wallet", "Credit Card"]);
    }
}
