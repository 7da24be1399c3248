use color_eyre::eyre::{ensure, Result};
use std::f64::consts::TAU;

/*
Phase Accumulator
=================

The oscillator does not store a phase angle. It stores how many frames
into the current cycle it is:

    cycle_length = sample_rate / frequency      (frames per cycle)
    sample       = amplitude * sin(2π * j / cycle_length)

After each sample `j` advances by one frame. Once it runs past the end of
the cycle, one cycle length is subtracted, so `j` never grows without bound
and the waveform stays continuous across the wrap.

At 44.1 kHz and 880 Hz the cycle is 50.11 frames long, so the wrap lands
between sample instants and the fractional remainder carries into the
next cycle.
*/

/// Fixed-frequency sine source used by the render callback.
#[derive(Debug, Clone)]
pub struct SineOscillator {
    /// Frames into the current cycle.
    position: f64,
    cycle_length: f64,
    amplitude: f32,
}

impl SineOscillator {
    pub fn new(sample_rate: f64, frequency: f64, amplitude: f32) -> Result<Self> {
        ensure!(
            sample_rate.is_finite() && sample_rate > 0.0,
            "sample rate must be positive, got {sample_rate}"
        );
        ensure!(
            frequency.is_finite() && frequency > 0.0,
            "frequency must be positive, got {frequency}"
        );
        ensure!(
            frequency < sample_rate / 2.0,
            "frequency {frequency} Hz is at or above Nyquist for {sample_rate} Hz"
        );
        ensure!(
            amplitude.is_finite() && (0.0..=1.0).contains(&amplitude),
            "amplitude must be within 0.0..=1.0, got {amplitude}"
        );

        Ok(Self {
            position: 0.0,
            cycle_length: sample_rate / frequency,
            amplitude,
        })
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let sample = (TAU * (self.position / self.cycle_length)).sin() as f32 * self.amplitude;

        self.position += 1.0;
        if self.position > self.cycle_length {
            self.position -= self.cycle_length;
        }

        sample
    }

    /// Fill `out` with consecutive samples. The position carries over, so
    /// back-to-back blocks form one continuous waveform.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Period of the tone in frames.
    pub fn cycle_length(&self) -> f64 {
        self.cycle_length
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f64 = 44_100.0;
    const FREQUENCY: f64 = 880.0;

    #[test]
    fn valid_sine() {
        let mut osc = SineOscillator::new(SAMPLE_RATE, FREQUENCY, 0.25).unwrap();
        let mut buffer = vec![0.0f32; 32];
        osc.render(&mut buffer);

        // sample n should be 0.25 * sin(2pi f n / sr) before the first wrap
        let sample_index = 12;
        let expected =
            0.25 * (TAU * FREQUENCY * sample_index as f64 / SAMPLE_RATE).sin() as f32;
        let actual = buffer[sample_index];
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn first_sample_is_zero() {
        let mut osc = SineOscillator::new(SAMPLE_RATE, FREQUENCY, 0.25).unwrap();
        assert_eq!(osc.next_sample(), 0.0);
    }

    #[test]
    fn position_wraps_past_cycle_end() {
        let mut osc = SineOscillator::new(SAMPLE_RATE, FREQUENCY, 0.25).unwrap();
        let cycle = osc.cycle_length();
        assert!((cycle - 50.113_636).abs() < 1e-5);

        // 50 steps land inside the cycle, the 51st runs past it.
        for _ in 0..50 {
            osc.next_sample();
        }
        assert_eq!(osc.position(), 50.0);

        osc.next_sample();
        assert!((osc.position() - (51.0 - cycle)).abs() < 1e-9);
    }

    #[test]
    fn position_reaches_cycle_end_before_wrapping() {
        // 882 Hz gives a whole-number cycle of 50 frames.
        let mut osc = SineOscillator::new(SAMPLE_RATE, 882.0, 0.25).unwrap();
        assert_eq!(osc.cycle_length(), 50.0);

        for _ in 0..50 {
            osc.next_sample();
        }
        assert_eq!(osc.position(), 50.0);

        let sample = osc.next_sample();
        assert!(sample.abs() < 1e-6, "expected ~0 at cycle end, got {sample}");
        assert_eq!(osc.position(), 1.0);
    }

    #[test]
    fn position_stays_within_one_cycle() {
        let mut osc = SineOscillator::new(SAMPLE_RATE, FREQUENCY, 0.25).unwrap();
        for _ in 0..SAMPLE_RATE as usize {
            osc.next_sample();
            assert!(osc.position() >= 0.0);
            assert!(osc.position() <= osc.cycle_length());
        }
    }

    #[test]
    fn samples_stay_within_amplitude() {
        let mut osc = SineOscillator::new(SAMPLE_RATE, FREQUENCY, 0.25).unwrap();
        let mut buffer = vec![0.0f32; 4096];
        osc.render(&mut buffer);

        assert!(buffer.iter().all(|s| s.abs() <= 0.25 + f32::EPSILON));
        let peak = buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.24, "peak {peak} should approach the amplitude");
    }

    #[test]
    fn block_split_does_not_change_output() {
        let mut whole = SineOscillator::new(SAMPLE_RATE, FREQUENCY, 0.25).unwrap();
        let mut expected = vec![0.0f32; 1000];
        whole.render(&mut expected);

        let mut split = SineOscillator::new(SAMPLE_RATE, FREQUENCY, 0.25).unwrap();
        let mut actual = vec![0.0f32; 1000];
        for chunk in actual.chunks_mut(37) {
            split.render(chunk);
        }

        assert_eq!(expected, actual);
        assert_eq!(whole.position(), split.position());
    }

    #[test]
    fn reset_restarts_cycle() {
        let mut osc = SineOscillator::new(SAMPLE_RATE, FREQUENCY, 0.25).unwrap();
        let mut first = vec![0.0f32; 64];
        osc.render(&mut first);

        osc.reset();
        let mut second = vec![0.0f32; 64];
        osc.render(&mut second);

        assert_eq!(first, second);
    }

    #[test]
    fn keeps_constructor_parameters() {
        let osc = SineOscillator::new(SAMPLE_RATE, FREQUENCY, 0.25).unwrap();
        assert_eq!(osc.amplitude(), 0.25);
        assert_eq!(osc.position(), 0.0);
        assert_eq!(osc.cycle_length(), SAMPLE_RATE / FREQUENCY);
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(SineOscillator::new(0.0, FREQUENCY, 0.25).is_err());
        assert!(SineOscillator::new(f64::NAN, FREQUENCY, 0.25).is_err());
        assert!(SineOscillator::new(SAMPLE_RATE, -1.0, 0.25).is_err());
        assert!(SineOscillator::new(SAMPLE_RATE, SAMPLE_RATE / 2.0, 0.25).is_err());
        assert!(SineOscillator::new(SAMPLE_RATE, FREQUENCY, 1.5).is_err());
    }
}
