//! TonePlayer - sets up the output unit, plays the tone, tears it down.

use color_eyre::eyre::{eyre, Result as EyreResult};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::{
    config::ToneConfig,
    dsp::SineOscillator,
    io::{OutputUnit, StreamEvent, StreamFormat},
    render::ToneRenderer,
};

/// How often the control thread checks for stream events while playing.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    pub device: String,
    pub sample_rate: f64,
    pub channels: u16,
    pub frames_rendered: u64,
}

/// Main player builder
pub struct TonePlayer {
    config: ToneConfig,
}

impl TonePlayer {
    /// Player for the default tone: 880 Hz at 44.1 kHz for five seconds.
    pub fn new() -> Self {
        Self {
            config: ToneConfig::default(),
        }
    }

    pub fn with_config(config: ToneConfig) -> Self {
        Self { config }
    }

    /// How long the output unit runs before teardown
    pub fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = duration;
        self
    }

    pub fn config(&self) -> &ToneConfig {
        &self.config
    }

    /// Open the default output, play for the configured duration, then
    /// stop and release the stream.
    ///
    /// A stream error ends playback early and is returned once the unit has
    /// been torn down.
    pub fn play(self) -> EyreResult<PlaybackReport> {
        let ToneConfig {
            sample_rate,
            frequency,
            amplitude,
            duration,
        } = self.config;

        let mut unit = OutputUnit::open(StreamFormat::mono_f32(sample_rate))?;
        let format = *unit.format();

        // The device rate wins when it differs, so the pitch stays put.
        let osc = SineOscillator::new(format.sample_rate, frequency, amplitude)?;
        unit.initialize(ToneRenderer::new(osc, format.channels))?;
        unit.start()?;

        info!(frequency, ?duration, "playing tone");
        let waited = wait_for(duration, POLL_INTERVAL, || unit.poll_event());
        let stopped = unit.stop();
        waited?;
        stopped?;

        Ok(PlaybackReport {
            device: unit.device_name().to_owned(),
            sample_rate: format.sample_rate,
            channels: format.channels,
            frames_rendered: unit.frames_rendered(),
        })
    }
}

impl Default for TonePlayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleep for `duration` in `interval` steps, failing on the first stream
/// event. Later events already queued are logged and dropped.
fn wait_for(
    duration: Duration,
    interval: Duration,
    mut poll: impl FnMut() -> Option<StreamEvent>,
) -> EyreResult<()> {
    let deadline = Instant::now() + duration;

    loop {
        if let Some(event) = poll() {
            error!(%event, "stream failed");
            while let Some(late) = poll() {
                warn!(event = %late, "further stream event");
            }
            return Err(eyre!("playback aborted: {event}"));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        std::thread::sleep(interval.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::events::{event_queue, EventReceiver};

    #[test]
    fn builder_overrides_duration() {
        let player = TonePlayer::new().duration(Duration::from_millis(250));
        assert_eq!(player.config().duration, Duration::from_millis(250));
        assert_eq!(player.config().frequency, 880.0);
    }

    #[test]
    fn wait_runs_full_duration_without_events() {
        let (_tx, mut rx) = event_queue(4);
        let start = Instant::now();

        wait_for(Duration::from_millis(30), Duration::from_millis(5), || {
            EventReceiver::pop(&mut rx)
        })
        .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn wait_stops_on_first_event() {
        let (mut tx, mut rx) = event_queue(4);
        tx.send(StreamEvent::DeviceLost);
        tx.send(StreamEvent::Backend("late".into()));

        let start = Instant::now();
        let err = wait_for(Duration::from_secs(10), Duration::from_millis(5), || {
            EventReceiver::pop(&mut rx)
        })
        .unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(err.to_string().contains("no longer available"));
        assert_eq!(EventReceiver::pop(&mut rx), None);
    }
}
