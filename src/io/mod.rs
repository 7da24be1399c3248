// Purpose - host-facing types: stream format, output unit, stream events

pub mod events;
pub mod format;
pub mod output;

pub use events::StreamEvent;
pub use format::StreamFormat;
pub use output::OutputUnit;
