use crate::config::ConfigError;

/// Pure time shift compensating the audio output path. Both the screen
/// mapping and the trigger detector consume the shifted value, so a note's
/// crossing of the reference line and its audible onset coincide: note-on
/// is issued `output_latency` seconds before the event's nominal start.
#[derive(Debug, Clone, Copy)]
pub struct LatencyCompensator {
    output_latency: f64,
}

impl LatencyCompensator {
    pub fn new(output_latency: f64) -> Result<Self, ConfigError> {
        if !output_latency.is_finite() {
            return Err(ConfigError::NonFinite);
        }
        if output_latency < 0.0 {
            return Err(ConfigError::NegativeLatency(output_latency));
        }
        Ok(Self { output_latency })
    }

    /// Latency of an output stream with the given buffer size.
    pub fn from_buffer(buffer_samples: u32, sample_rate: u32) -> Self {
        Self {
            output_latency: buffer_samples as f64 / sample_rate as f64,
        }
    }

    pub fn output_latency(&self) -> f64 {
        self.output_latency
    }

    pub fn compensate(&self, current_time: f64) -> f64 {
        current_time + self.output_latency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compensate_shifts_forward() {
        let c = LatencyCompensator::new(0.012).unwrap();
        assert_eq!(c.compensate(1.0), 1.012);
        assert_eq!(c.compensate(-2.0), -1.988);
    }

    #[test]
    fn from_buffer_matches_ratio() {
        let c = LatencyCompensator::from_buffer(512, 44_100);
        assert!((c.output_latency() - 512.0 / 44_100.0).abs() < 1e-12);
    }

    #[test]
    fn negative_latency_is_rejected() {
        assert!(LatencyCompensator::new(-0.001).is_err());
        assert!(LatencyCompensator::new(f64::NAN).is_err());
    }
}
