use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::models::buffer::TimedAudioBuffer;
use crate::models::format::AudioFormatDescriptor;
use crate::traits::recorder_sink::RecorderSink;

/// Recorder sink that hands buffers to a consumer thread over a bounded channel.
///
/// `accept` never blocks: when the consumer falls behind, buffers are dropped
/// and counted.
pub struct ChannelSink {
    tx: Sender<TimedAudioBuffer>,
    desired_format: Mutex<Option<AudioFormatDescriptor>>,
    accepted: AtomicU64,
    dropped: AtomicU64,
}

impl ChannelSink {
    pub fn bounded(capacity: usize) -> (Arc<Self>, Receiver<TimedAudioBuffer>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let sink = Arc::new(Self {
            tx,
            desired_format: Mutex::new(None),
            accepted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        });
        (sink, rx)
    }

    pub fn desired_format(&self) -> Option<AudioFormatDescriptor> {
        *self.desired_format.lock()
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl RecorderSink for ChannelSink {
    fn set_desired_format(&self, format: Option<AudioFormatDescriptor>) {
        *self.desired_format.lock() = format;
    }

    fn accept(&self, buffer: TimedAudioBuffer) {
        match self.tx.try_send(buffer) {
            Ok(()) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::models::buffer::{HostTime, PcmBuffer, TimeRange};

    fn buffer(frames: usize) -> TimedAudioBuffer {
        let mut pcm = PcmBuffer::new(AudioFormatDescriptor::default(), frames).unwrap();
        pcm.set_frame_length(frames).unwrap();
        TimedAudioBuffer::new(pcm, HostTime(1), TimeRange::default(), Uuid::nil()).unwrap()
    }

    #[test]
    fn forwards_to_receiver() {
        let (sink, rx) = ChannelSink::bounded(4);
        sink.accept(buffer(16));

        assert_eq!(rx.try_recv().unwrap().frame_count(), 16);
        assert_eq!(sink.accepted_count(), 1);
        assert_eq!(sink.dropped_count(), 0);
    }

    #[test]
    fn drops_when_full() {
        let (sink, rx) = ChannelSink::bounded(1);
        sink.accept(buffer(8));
        sink.accept(buffer(8));

        assert_eq!(sink.accepted_count(), 1);
        assert_eq!(sink.dropped_count(), 1);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn drops_when_consumer_gone() {
        let (sink, rx) = ChannelSink::bounded(4);
        drop(rx);
        sink.accept(buffer(8));

        assert_eq!(sink.dropped_count(), 1);
    }

    #[test]
    fn tracks_desired_format() {
        let (sink, _rx) = ChannelSink::bounded(1);
        assert!(sink.desired_format().is_none());

        sink.set_desired_format(Some(AudioFormatDescriptor::default()));
        assert_eq!(sink.desired_format(), Some(AudioFormatDescriptor::default()));

        sink.set_desired_format(None);
        assert!(sink.desired_format().is_none());
    }
}
