use thiserror::Error;

/// Rejected simulation parameter values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("speed {0} out of range (expected 1-10 transactions per second)")]
    Speed(u32),

    #[error("fraud rate {0}% out of range (expected 0-100)")]
    FraudRate(u32),

    #[error("sensitivity {0} out of range (expected 0.0-1.0)")]
    Sensitivity(f64),
}

/// Failures while fitting or querying the anomaly model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("training row {row} has {found} features, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("model was fitted on {fitted} features but received {found}")]
    FeatureMismatch { fitted: usize, found: usize },

    #[error("contamination {0} out of range (expected 0.0-0.5)")]
    Contamination(f64),

    #[error("n_estimators must be at least 1")]
    NoEstimators,
}

/// Failures while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("session capacity must be at least 1")]
    Capacity,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is not authenticated")]
    NotAuthenticated,
}

/// Failures while running a parameter sweep.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SweepError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
