use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("pixels_per_second must be > 0 (got {0})")]
    NonPositiveScale(f32),
    #[error("output_latency_seconds must be >= 0 (got {0})")]
    NegativeLatency(f64),
    #[error("trigger_tolerance_seconds must be >= 0 (got {0})")]
    NegativeTolerance(f64),
    #[error("preparation_offset must be >= 0 (got {0})")]
    NegativePreparation(f64),
    #[error("configuration contains a non-finite value")]
    NonFinite,
}

/// Timing and display configuration for one playback session.
///
/// `output_latency_seconds` and `trigger_tolerance_seconds` are independent
/// constants: the first compensates the audio output path, the second only
/// covers discrete-tick sampling error. They must never be merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay between issuing note-on and audible sound, typically
    /// buffer_samples / sample_rate.
    pub output_latency_seconds: f64,
    /// Lead-in before the first event; playback starts at minus this.
    pub preparation_offset: f64,
    /// Horizontal scale before zoom is applied.
    pub pixels_per_second: f32,
    /// Screen x of the fixed "now" line.
    pub reference_x: f32,
    /// Early-fire margin for trigger detection. Sized from the tick
    /// interval (~1.5-3 frame periods), not from audio latency.
    pub trigger_tolerance_seconds: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            // 512-sample buffer at 44.1 kHz
            output_latency_seconds: 512.0 / 44_100.0,
            preparation_offset: 2.0,
            pixels_per_second: 200.0,
            reference_x: 200.0,
            trigger_tolerance_seconds: 0.025,
        }
    }
}

impl SyncConfig {
    /// Rejects any value that would invert scroll direction or trigger
    /// order. Nothing is silently clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.output_latency_seconds.is_finite()
            || !self.preparation_offset.is_finite()
            || !self.trigger_tolerance_seconds.is_finite()
            || !self.pixels_per_second.is_finite()
            || !self.reference_x.is_finite()
        {
            return Err(ConfigError::NonFinite);
        }
        if self.pixels_per_second <= 0.0 {
            return Err(ConfigError::NonPositiveScale(self.pixels_per_second));
        }
        if self.output_latency_seconds < 0.0 {
            return Err(ConfigError::NegativeLatency(self.output_latency_seconds));
        }
        if self.trigger_tolerance_seconds < 0.0 {
            return Err(ConfigError::NegativeTolerance(self.trigger_tolerance_seconds));
        }
        if self.preparation_offset < 0.0 {
            return Err(ConfigError::NegativePreparation(self.preparation_offset));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_scale() {
        let cfg = SyncConfig {
            pixels_per_second: 0.0,
            ..SyncConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveScale(_))
        ));
    }

    #[test]
    fn rejects_negative_latency() {
        let cfg = SyncConfig {
            output_latency_seconds: -0.012,
            ..SyncConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::NegativeLatency(_))));
    }

    #[test]
    fn rejects_nan() {
        let cfg = SyncConfig {
            trigger_tolerance_seconds: f64::NAN,
            ..SyncConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::NonFinite)));
    }
}
