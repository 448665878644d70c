use serde::Deserialize;
use std::path::Path;

use crate::error::{ConfigError, ParamError};

/// Live-adjustable knobs, read once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Transactions per second control, 1-10. Tick interval is 3/speed seconds.
    pub speed: u32,
    /// Injected-fraud probability in percent, 0-100.
    pub fraud_rate: u32,
    /// Probability the detector is consulted at all, 0.0-1.0.
    pub sensitivity: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            speed: 3,
            fraud_rate: 25,
            sensitivity: 0.7,
        }
    }
}

impl SimulationParams {
    pub fn new(speed: u32, fraud_rate: u32, sensitivity: f64) -> Result<Self, ParamError> {
        let params = SimulationParams {
            speed,
            fraud_rate,
            sensitivity,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        if !(1..=10).contains(&self.speed) {
            return Err(ParamError::Speed(self.speed));
        }
        if self.fraud_rate > 100 {
            return Err(ParamError::FraudRate(self.fraud_rate));
        }
        if !(0.0..=1.0).contains(&self.sensitivity) {
            return Err(ParamError::Sensitivity(self.sensitivity));
        }
        Ok(())
    }

    /// Injected-fraud probability as a fraction.
    pub fn fraud_probability(&self) -> f64 {
        self.fraud_rate as f64 / 100.0
    }

    /// Sleep between ticks: 3 / speed seconds.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(3.0 / self.speed.max(1) as f64)
    }
}

/// Which fixed synthetic dataset the detector is fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingSet {
    /// Normal traffic sampled in feature space.
    Traffic,
    /// Two tight Gaussian clusters at +2 and -2 on every axis.
    Clusters,
}

impl TrainingSet {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Traffic => "traffic",
            Self::Clusters => "clusters",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    /// Decision scores below this are fraud.
    pub threshold: f64,
    pub training_set: TrainingSet,
    pub training_seed: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.2,
            threshold: -0.1,
            training_set: TrainingSet::Traffic,
            training_seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Most recent transactions kept for display.
    pub capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig { capacity: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
struct SimulationSection {
    speed: u32,
    fraud_rate: u32,
    sensitivity: f64,
    seed: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        let params = SimulationParams::default();
        SimulationSection {
            speed: params.speed,
            fraud_rate: params.fraud_rate,
            sensitivity: params.sensitivity,
            seed: 42,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    simulation: SimulationSection,
    detector: DetectorConfig,
    session: SessionConfig,
}

/// Everything a dashboard run needs besides the login.
#[derive(Debug, Clone, PartialEq)]
pub struct FraudGuardConfig {
    pub params: SimulationParams,
    pub seed: u64,
    pub detector: DetectorConfig,
    pub session: SessionConfig,
}

impl Default for FraudGuardConfig {
    fn default() -> Self {
        FraudGuardConfig {
            params: SimulationParams::default(),
            seed: 42,
            detector: DetectorConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl FraudGuardConfig {
    /// Parse a TOML document. Missing sections and keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        let config = FraudGuardConfig {
            params: SimulationParams {
                speed: raw.simulation.speed,
                fraud_rate: raw.simulation.fraud_rate,
                sensitivity: raw.simulation.sensitivity,
            },
            seed: raw.simulation.seed,
            detector: raw.detector,
            session: raw.session,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.params.validate()?;
        if self.session.capacity == 0 {
            return Err(ConfigError::Capacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_dashboard_sliders() {
        let params = SimulationParams::default();
        assert_eq!(params.speed, 3);
        assert_eq!(params.fraud_rate, 25);
        assert_eq!(params.sensitivity, 0.7);
        assert_eq!(params.tick_interval(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_param_bounds() {
        assert!(SimulationParams::new(1, 0, 0.0).is_ok());
        assert!(SimulationParams::new(10, 100, 1.0).is_ok());
        assert_eq!(SimulationParams::new(0, 25, 0.5), Err(ParamError::Speed(0)));
        assert_eq!(SimulationParams::new(11, 25, 0.5), Err(ParamError::Speed(11)));
        assert_eq!(
            SimulationParams::new(3, 101, 0.5),
            Err(ParamError::FraudRate(101))
        );
        assert_eq!(
            SimulationParams::new(3, 25, 1.5),
            Err(ParamError::Sensitivity(1.5))
        );
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = FraudGuardConfig::from_toml_str("").unwrap();
        assert_eq!(config, FraudGuardConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = FraudGuardConfig::from_toml_str(
            r#"
[simulation]
fraud_rate = 80
seed = 7

[detector]
training_set = "clusters"
"#,
        )
        .unwrap();
        assert_eq!(config.params.fraud_rate, 80);
        assert_eq!(config.params.speed, 3);
        assert_eq!(config.seed, 7);
        assert_eq!(config.detector.training_set, TrainingSet::Clusters);
        assert_eq!(config.detector.n_estimators, 100);
        assert_eq!(config.session.capacity, 50);
    }

    #[test]
    fn test_toml_rejects_out_of_range() {
        let err = FraudGuardConfig::from_toml_str("[simulation]\nsensitivity = 2.0\n");
        assert!(matches!(err, Err(ConfigError::Param(ParamError::Sensitivity(_)))));
        let err = FraudGuardConfig::from_toml_str("[session]\ncapacity = 0\n");
        assert!(matches!(err, Err(ConfigError::Capacity)));
    }
}
