use cpal::StreamError;
use rtrb::{Consumer, Producer, RingBuffer};
use std::fmt;

/// Queue depth for stream events. Only the first event ends playback, the
/// rest are logged, so a short queue is enough.
pub const EVENT_QUEUE_CAPACITY: usize = 16;

/// Something the host reported from the audio thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The output device went away (unplugged, reconfigured).
    DeviceLost,
    /// Backend-specific failure with its description.
    Backend(String),
}

impl From<StreamError> for StreamEvent {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::DeviceNotAvailable => StreamEvent::DeviceLost,
            other => StreamEvent::Backend(other.to_string()),
        }
    }
}

impl fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamEvent::DeviceLost => write!(f, "output device is no longer available"),
            StreamEvent::Backend(description) => write!(f, "stream error: {description}"),
        }
    }
}

pub trait EventReceiver {
    fn pop(&mut self) -> Option<StreamEvent>;
}

impl EventReceiver for Consumer<StreamEvent> {
    fn pop(&mut self) -> Option<StreamEvent> {
        Consumer::pop(self).ok()
    }
}

/// Audio-thread end of the event queue.
pub struct EventSender {
    producer: Producer<StreamEvent>,
}

impl EventSender {
    /// Push without blocking. Returns `false` if the queue is full and the
    /// event was dropped.
    pub fn send(&mut self, event: StreamEvent) -> bool {
        self.producer.push(event).is_ok()
    }
}

pub fn event_queue(capacity: usize) -> (EventSender, Consumer<StreamEvent>) {
    let (producer, consumer) = RingBuffer::new(capacity);
    (EventSender { producer }, consumer)
}
