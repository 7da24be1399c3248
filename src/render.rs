//! Body of the real-time render callback.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::{dsp::SineOscillator, MAX_BLOCK_SIZE};

/// Fills host buffers with the tone.
///
/// Owns everything it touches, so the audio thread never allocates, locks
/// or blocks. The tone is mono and copied to every channel of each frame.
pub struct ToneRenderer {
    osc: SineOscillator,
    block: Vec<f32>,
    channels: usize,
    frames: Arc<AtomicU64>,
}

impl ToneRenderer {
    pub fn new(osc: SineOscillator, channels: u16) -> Self {
        Self {
            osc,
            block: vec![0.0; MAX_BLOCK_SIZE],
            channels: channels.max(1) as usize,
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Shared handle to the frame count, readable from the control thread
    /// after the renderer has moved into the stream.
    pub fn frame_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.frames)
    }

    /// Render into an interleaved host buffer.
    pub fn render(&mut self, data: &mut [f32]) {
        let channels = self.channels;
        let total_frames = data.len() / channels;
        let mut frames_written = 0;

        while frames_written < total_frames {
            let frames_remaining = total_frames - frames_written;
            let frames_to_render = frames_remaining.min(MAX_BLOCK_SIZE);

            let block = &mut self.block[..frames_to_render];
            self.osc.render(block);

            let out_off = frames_written * channels;
            let out = &mut data[out_off..out_off + frames_to_render * channels];
            for (frame, &s) in out.chunks_exact_mut(channels).zip(block.iter()) {
                frame.fill(s);
            }

            frames_written += frames_to_render;
        }

        // Samples past the last whole frame
        data[total_frames * channels..].fill(0.0);

        self.frames.fetch_add(total_frames as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(channels: u16) -> ToneRenderer {
        let osc = SineOscillator::new(44_100.0, 880.0, 0.25).unwrap();
        ToneRenderer::new(osc, channels)
    }

    #[test]
    fn mono_matches_oscillator() {
        let mut reference = SineOscillator::new(44_100.0, 880.0, 0.25).unwrap();
        let mut expected = vec![0.0f32; 512];
        reference.render(&mut expected);

        let mut tone = renderer(1);
        let mut data = vec![1.0f32; 512];
        tone.render(&mut data);

        assert_eq!(data, expected);
        assert_eq!(tone.frames_rendered(), 512);
    }

    #[test]
    fn copies_sample_to_every_channel() {
        let mut tone = renderer(2);
        let mut data = vec![0.0f32; 256];
        tone.render(&mut data);

        for frame in data.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert_eq!(tone.frames_rendered(), 128);
    }

    #[test]
    fn spans_more_than_one_block() {
        let frames = MAX_BLOCK_SIZE * 2 + 100;
        let mut reference = SineOscillator::new(44_100.0, 880.0, 0.25).unwrap();
        let mut expected = vec![0.0f32; frames];
        reference.render(&mut expected);

        let mut tone = renderer(1);
        let mut data = vec![0.0f32; frames];
        tone.render(&mut data);

        assert_eq!(data, expected);
    }

    #[test]
    fn zero_fills_partial_frame() {
        let mut tone = renderer(2);
        let mut data = vec![1.0f32; 9];
        tone.render(&mut data);

        assert_eq!(data[8], 0.0);
        assert_eq!(tone.frames_rendered(), 4);
    }

    #[test]
    fn empty_buffer_is_a_no_op() {
        let mut tone = renderer(2);
        tone.render(&mut []);
        assert_eq!(tone.frames_rendered(), 0);
    }

    #[test]
    fn counter_is_shared() {
        let mut tone = renderer(1);
        let counter = tone.frame_counter();
        tone.render(&mut [0.0f32; 64]);
        assert_eq!(counter.load(Ordering::Relaxed), 64);
    }
}
