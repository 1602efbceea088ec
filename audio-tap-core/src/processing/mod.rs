pub mod converter;
pub mod host_clock;
pub mod resampler;
