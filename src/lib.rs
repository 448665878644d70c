pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod error;
pub mod forest;
pub mod generator;
pub mod output;
pub mod report;
pub mod scorer;
pub mod session;
pub mod simulation;
pub mod sweep;
pub mod transaction;
