pub mod recorder_sink;
pub mod tap_client;
pub mod tap_observer;
pub mod tap_source;
