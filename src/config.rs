#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{AMPLITUDE, PLAY_DURATION, SAMPLE_RATE, SINE_FREQUENCY};

/// Parameters of one playback run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneConfig {
    /// Requested stream rate in Hz. The device may run at another rate.
    pub sample_rate: f64,
    pub frequency: f64,
    pub amplitude: f32,
    pub duration: Duration,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            frequency: SINE_FREQUENCY,
            amplitude: AMPLITUDE,
            duration: PLAY_DURATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_tone_constants() {
        let config = ToneConfig::default();
        assert_eq!(config.sample_rate, 44_100.0);
        assert_eq!(config.frequency, 880.0);
        assert_eq!(config.amplitude, 0.25);
        assert_eq!(config.duration, Duration::from_secs(5));
    }
}
