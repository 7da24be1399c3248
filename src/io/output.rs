//! Output unit: the default output device plus the stream driving the
//! render callback.

use color_eyre::eyre::{ensure, eyre, Result, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::Consumer;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{debug, error, info, warn};

use super::events::{event_queue, EventReceiver, StreamEvent, EVENT_QUEUE_CAPACITY};
use super::format::{select_config, ConfigRange, Negotiated, StreamFormat};
use crate::render::ToneRenderer;

/// Stream state set up by [`OutputUnit::initialize`].
struct Graph {
    stream: cpal::Stream,
    events: Consumer<StreamEvent>,
    frames: Arc<AtomicU64>,
}

/// Lifecycle: [`open`](Self::open), [`initialize`](Self::initialize),
/// [`start`](Self::start), [`stop`](Self::stop). Dropping the unit stops
/// it and releases the stream.
pub struct OutputUnit {
    device: cpal::Device,
    device_name: String,
    negotiated: Negotiated,
    graph: Option<Graph>,
    state: RunState,
}

/// Running flag of the unit. Stopping clears it even when the host fails
/// to pause, so a failed stop is reported once.
#[derive(Debug, Default)]
struct RunState {
    running: bool,
}

impl RunState {
    /// Run `play` unless already running. Returns whether the state changed.
    fn start(&mut self, play: impl FnOnce() -> Result<()>) -> Result<bool> {
        if self.running {
            return Ok(false);
        }
        play()?;
        self.running = true;
        Ok(true)
    }

    /// Run `pause` if running. Returns whether the state changed.
    fn stop(&mut self, pause: impl FnOnce() -> Result<()>) -> Result<bool> {
        if !self.running {
            return Ok(false);
        }
        self.running = false;
        pause()?;
        Ok(true)
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

impl OutputUnit {
    /// Find the default output device and negotiate a stream format with it.
    pub fn open(requested: StreamFormat) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("can't get output unit: no default output device"))?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| String::from("<unnamed device>"));

        let ranges: Vec<ConfigRange> = device
            .supported_output_configs()
            .wrap_err_with(|| format!("failed to query output configs of {device_name}"))?
            .map(|range| ConfigRange::from(&range))
            .collect();
        let device_default = device
            .default_output_config()
            .ok()
            .map(|config| ConfigRange::from(&config));

        let negotiated = select_config(&requested, ranges, device_default).ok_or_else(|| {
            eyre!(
                "output device {device_name} supports neither {} Hz {:?} nor a matching default",
                requested.sample_rate,
                requested.sample_format()
            )
        })?;

        match &negotiated {
            Negotiated::Requested(format) => info!(
                device = %device_name,
                sample_rate = format.sample_rate,
                channels = format.channels,
                "opened output unit"
            ),
            Negotiated::DeviceDefault(format) => warn!(
                device = %device_name,
                requested = requested.sample_rate,
                sample_rate = format.sample_rate,
                channels = format.channels,
                "requested rate unsupported, using device default"
            ),
        }

        Ok(Self {
            device,
            device_name,
            negotiated,
            graph: None,
            state: RunState::default(),
        })
    }

    pub fn format(&self) -> &StreamFormat {
        self.negotiated.format()
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Build the output stream with `renderer` as its render callback.
    pub fn initialize(&mut self, mut renderer: ToneRenderer) -> Result<()> {
        ensure!(self.graph.is_none(), "output unit is already initialized");
        let format = *self.format();
        ensure!(
            renderer.channels() == format.channels as usize,
            "renderer produces {} channels, stream expects {}",
            renderer.channels(),
            format.channels
        );

        let (mut events_tx, events) = event_queue(EVENT_QUEUE_CAPACITY);
        let frames = renderer.frame_counter();
        let config = format.to_stream_config();

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| renderer.render(data),
                move |err| {
                    // Dropped when full; the first queued event already ends playback.
                    let _ = events_tx.send(StreamEvent::from(err));
                },
                None,
            )
            .wrap_err_with(|| format!("couldn't initialize output unit on {}", self.device_name))?;

        debug!(?config, "render callback registered");
        self.graph = Some(Graph {
            stream,
            events,
            frames,
        });
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        let graph = self
            .graph
            .as_ref()
            .ok_or_else(|| eyre!("output unit started before initialize"))?;
        let started = self.state.start(|| {
            graph.stream.play().wrap_err("couldn't start output unit")
        })?;
        if started {
            info!("output unit started");
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        let graph = self.graph.as_ref();
        let stopped = self.state.stop(|| match graph {
            Some(graph) => graph.stream.pause().wrap_err("couldn't stop output unit"),
            None => Ok(()),
        })?;
        if stopped {
            info!(frames = self.frames_rendered(), "output unit stopped");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Next event reported by the audio thread, if any.
    pub fn poll_event(&mut self) -> Option<StreamEvent> {
        self.graph
            .as_mut()
            .and_then(|graph| EventReceiver::pop(&mut graph.events))
    }

    pub fn frames_rendered(&self) -> u64 {
        self.graph
            .as_ref()
            .map_or(0, |graph| graph.frames.load(Ordering::Relaxed))
    }
}

impl Drop for OutputUnit {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                error!("{err:#}");
            }
        }
        if self.graph.take().is_some() {
            debug!(device = %self.device_name, "output unit disposed");
        }
    }
}
