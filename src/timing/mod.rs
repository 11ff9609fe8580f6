mod latency;
mod transport;
mod trigger;

pub use latency::LatencyCompensator;
pub use transport::{Transport, TransportCell};
pub use trigger::{NoteSink, TriggerDetector, TriggerObserver, TriggerState};
