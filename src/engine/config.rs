//! Run configuration threaded through every round.

use crate::engine_error::EngineError;
use crate::message::DeliveryMode;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads per partition.
    pub threads: usize,
    /// Upper bound on IncEval rounds; `None` runs until quiescence.
    pub max_rounds: Option<usize>,
    /// Overrides the program's preferred delivery mode.
    pub mode: Option<DeliveryMode>,
    /// Channel mode: per-peer buffer length that triggers a flush.
    pub channel_flush_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: 2,
            max_rounds: None,
            mode: None,
            channel_flush_threshold: 4096,
        }
    }
}

impl EngineConfig {
    /// Set the round bound from a signed value; negative bounds are rejected.
    pub fn with_max_rounds(mut self, bound: i64) -> Result<Self, EngineError> {
        let bound = usize::try_from(bound).map_err(|_| {
            EngineError::Configuration(format!("round bound must be non-negative, got {bound}"))
        })?;
        self.max_rounds = Some(bound);
        Ok(self)
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_mode(mut self, mode: DeliveryMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn validate(&self, n_partitions: usize) -> Result<(), EngineError> {
        if n_partitions == 0 {
            return Err(EngineError::Configuration("zero partitions".into()));
        }
        if self.threads == 0 {
            return Err(EngineError::Configuration("threads must be positive".into()));
        }
        if self.channel_flush_threshold == 0 {
            return Err(EngineError::Configuration(
                "channel_flush_threshold must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_settings() {
        assert!(EngineConfig::default().validate(1).is_ok());
        assert!(EngineConfig::default().validate(0).is_err());
        assert!(EngineConfig::default().with_threads(0).validate(1).is_err());
        let c = EngineConfig {
            channel_flush_threshold: 0,
            ..Default::default()
        };
        assert!(matches!(c.validate(2), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn negative_bound_is_a_configuration_error() {
        assert!(EngineConfig::default().with_max_rounds(-1).is_err());
        assert_eq!(
            EngineConfig::default().with_max_rounds(0).unwrap().max_rounds,
            Some(0)
        );
    }

    #[test]
    fn json_fills_defaults() {
        let c: EngineConfig =
            serde_json::from_str(r#"{"max_rounds": 3, "mode": "Channel"}"#).unwrap();
        assert_eq!(c.max_rounds, Some(3));
        assert_eq!(c.mode, Some(DeliveryMode::Channel));
        assert_eq!(c.threads, 2);
    }
}
