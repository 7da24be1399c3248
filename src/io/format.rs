//! Linear PCM stream description and config negotiation.

use cpal::{
    BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedStreamConfig,
    SupportedStreamConfigRange,
};
use std::ops::BitOr;

/// Layout flags of a linear PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatFlags(u32);

impl FormatFlags {
    pub const FLOAT: Self = Self(1 << 0);
    pub const PACKED: Self = Self(1 << 3);
    pub const NON_INTERLEAVED: Self = Self(1 << 5);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for FormatFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Fixed-layout description of the stream the render callback produces.
///
/// One frame holds one sample per channel and every packet holds exactly
/// one frame. For non-interleaved streams each channel lives in its own
/// buffer, so the frame and packet sizes cover a single channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFormat {
    pub sample_rate: f64,
    pub channels: u16,
    pub bits_per_channel: u32,
    pub flags: FormatFlags,
}

impl StreamFormat {
    /// Mono, packed, non-interleaved 32-bit float at `sample_rate`.
    pub fn mono_f32(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            channels: 1,
            bits_per_channel: 32,
            flags: FormatFlags::FLOAT | FormatFlags::PACKED | FormatFlags::NON_INTERLEAVED,
        }
    }

    /// Same layout with `channels` channels. Multichannel streams are
    /// delivered interleaved by the host, so the non-interleaved flag is
    /// dropped for them.
    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        if channels > 1 {
            self.flags = self.flags.without(FormatFlags::NON_INTERLEAVED);
        }
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn bytes_per_sample(&self) -> u32 {
        self.bits_per_channel / 8
    }

    pub fn bytes_per_frame(&self) -> u32 {
        if self.flags.contains(FormatFlags::NON_INTERLEAVED) {
            self.bytes_per_sample()
        } else {
            self.bytes_per_sample() * self.channels as u32
        }
    }

    pub fn frames_per_packet(&self) -> u32 {
        1
    }

    pub fn bytes_per_packet(&self) -> u32 {
        self.bytes_per_frame() * self.frames_per_packet()
    }

    pub fn sample_format(&self) -> Option<SampleFormat> {
        let float = self.flags.contains(FormatFlags::FLOAT);
        match (float, self.bits_per_channel) {
            (true, 32) => Some(SampleFormat::F32),
            (true, 64) => Some(SampleFormat::F64),
            (false, 16) => Some(SampleFormat::I16),
            (false, 32) => Some(SampleFormat::I32),
            _ => None,
        }
    }

    pub fn to_stream_config(&self) -> StreamConfig {
        StreamConfig {
            channels: self.channels,
            sample_rate: SampleRate(self.sample_rate.round() as u32),
            buffer_size: BufferSize::Default,
        }
    }
}

/// One range of configurations an output device accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigRange {
    pub channels: u16,
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
    pub sample_format: SampleFormat,
}

impl ConfigRange {
    fn contains_rate(&self, rate: u32) -> bool {
        (self.min_sample_rate..=self.max_sample_rate).contains(&rate)
    }
}

impl From<&SupportedStreamConfigRange> for ConfigRange {
    fn from(range: &SupportedStreamConfigRange) -> Self {
        Self {
            channels: range.channels(),
            min_sample_rate: range.min_sample_rate().0,
            max_sample_rate: range.max_sample_rate().0,
            sample_format: range.sample_format(),
        }
    }
}

impl From<&SupportedStreamConfig> for ConfigRange {
    fn from(config: &SupportedStreamConfig) -> Self {
        Self {
            channels: config.channels(),
            min_sample_rate: config.sample_rate().0,
            max_sample_rate: config.sample_rate().0,
            sample_format: config.sample_format(),
        }
    }
}

/// Outcome of matching the requested format against a device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Negotiated {
    /// The device runs at the requested rate and sample format.
    Requested(StreamFormat),
    /// The requested rate is unsupported; the device default is used.
    DeviceDefault(StreamFormat),
}

impl Negotiated {
    pub fn format(&self) -> &StreamFormat {
        match self {
            Negotiated::Requested(format) | Negotiated::DeviceDefault(format) => format,
        }
    }
}

/// Pick the device configuration closest to `requested`.
///
/// Ranges with the requested sample format and rate win, fewest channels
/// first. Without one, the device default is accepted if its sample format
/// matches. Returns `None` when neither applies.
pub fn select_config(
    requested: &StreamFormat,
    ranges: impl IntoIterator<Item = ConfigRange>,
    device_default: Option<ConfigRange>,
) -> Option<Negotiated> {
    let sample_format = requested.sample_format()?;
    let rate = requested.sample_rate.round() as u32;

    let best = ranges
        .into_iter()
        .filter(|range| range.sample_format == sample_format)
        .filter(|range| range.channels >= requested.channels)
        .filter(|range| range.contains_rate(rate))
        .min_by_key(|range| range.channels);

    if let Some(range) = best {
        return Some(Negotiated::Requested(requested.with_channels(range.channels)));
    }

    device_default
        .filter(|config| config.sample_format == sample_format)
        .map(|config| {
            Negotiated::DeviceDefault(
                requested
                    .with_sample_rate(config.min_sample_rate as f64)
                    .with_channels(config.channels),
            )
        })
}
