//! Low-level DSP primitives used by the render callback.
//!
//! These components are allocation-free and realtime-safe, so the render
//! callback can own them directly and call them on the audio thread.

/// Sine phase accumulator.
pub mod oscillator;

pub use oscillator::SineOscillator;
