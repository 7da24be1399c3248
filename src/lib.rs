use std::time::Duration;

pub mod config;
pub mod dsp;
pub mod io; // Host-facing types: stream format, output unit, events
pub mod player;
pub mod render; // Render callback body

pub use config::ToneConfig;
pub use player::TonePlayer;

pub const MAX_BLOCK_SIZE: usize = 2048;

/// Requested stream sample rate in Hz.
pub const SAMPLE_RATE: f64 = 44_100.0;
/// Tone pitch in Hz.
pub const SINE_FREQUENCY: f64 = 880.0;
/// Peak sample value of the tone.
pub const AMPLITUDE: f32 = 0.25;
/// How long the output unit runs before teardown.
pub const PLAY_DURATION: Duration = Duration::from_secs(5);
