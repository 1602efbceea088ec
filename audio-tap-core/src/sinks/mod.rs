pub mod channel_sink;
