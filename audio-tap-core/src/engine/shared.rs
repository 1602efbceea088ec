use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use uuid::Uuid;

use crate::models::audio_models::TapDiagnostics;
use crate::models::buffer::TimedAudioBuffer;
use crate::models::config::TapConfiguration;
use crate::models::error::{TapError, TapErrorRecord};
use crate::models::format::AudioFormatDescriptor;
use crate::processing::converter::PcmConverter;
use crate::processing::host_clock::HostClock;
use crate::traits::recorder_sink::RecorderSink;
use crate::traits::tap_client::{BufferDelivery, TapClient};
use crate::traits::tap_source::PulledAudio;

use super::error_slot::ErrorSlot;

/// Sink handle published to the render thread.
struct SinkSlot {
    sink: Arc<dyn RecorderSink>,
}

#[derive(Default)]
struct TapCounters {
    sessions_created: AtomicU64,
    sessions_finalized: AtomicU64,
    process_cycles: AtomicU64,
    buffers_forwarded: AtomicU64,
    buffers_discarded: AtomicU64,
    frames_forwarded: AtomicU64,
    pull_failures: AtomicU64,
    conversion_failures: AtomicU64,
}

impl TapCounters {
    fn snapshot(&self) -> TapDiagnostics {
        TapDiagnostics {
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            sessions_finalized: self.sessions_finalized.load(Ordering::Relaxed),
            process_cycles: self.process_cycles.load(Ordering::Relaxed),
            buffers_forwarded: self.buffers_forwarded.load(Ordering::Relaxed),
            buffers_discarded: self.buffers_discarded.load(Ordering::Relaxed),
            frames_forwarded: self.frames_forwarded.load(Ordering::Relaxed),
            pull_failures: self.pull_failures.load(Ordering::Relaxed),
            conversion_failures: self.conversion_failures.load(Ordering::Relaxed),
        }
    }
}

/// Engine state reachable from the render thread.
///
/// Everything here is either immutable after construction or lock-free.
pub(crate) struct EngineShared {
    pub(crate) target_format: AudioFormatDescriptor,
    converter: PcmConverter,
    clock: HostClock,
    sink: ArcSwapOption<SinkSlot>,
    /// Render-thread forwards currently between loading the sink and returning from `accept`.
    forwarding: AtomicUsize,
    pub(crate) errors: ErrorSlot,
    counters: TapCounters,
}

impl EngineShared {
    pub(crate) fn new(config: &TapConfiguration) -> Self {
        Self {
            target_format: config.target_format,
            converter: PcmConverter::new(config.target_format, config.mismatch_policy),
            clock: HostClock::new(),
            sink: ArcSwapOption::empty(),
            forwarding: AtomicUsize::new(0),
            errors: ErrorSlot::new(config.error_channel_capacity),
            counters: TapCounters::default(),
        }
    }

    pub(crate) fn diagnostics(&self) -> TapDiagnostics {
        self.counters.snapshot()
    }

    /// Publish `sink` to the render thread.
    ///
    /// Returns once no forward that could still see the previous sink is in
    /// flight, so the caller may retire it.
    pub(crate) fn publish_sink(&self, sink: Option<Arc<dyn RecorderSink>>) {
        self.sink.store(sink.map(|sink| Arc::new(SinkSlot { sink })));
        while self.forwarding.load(Ordering::SeqCst) != 0 {
            std::thread::yield_now();
        }
    }

    /// Hand a finished buffer to the attached sink, or discard it when there is none.
    pub(crate) fn on_sample_produced(&self, buffer: TimedAudioBuffer) {
        self.forwarding.fetch_add(1, Ordering::SeqCst);
        if let Some(slot) = &*self.sink.load() {
            let frames = buffer.frame_count() as u64;
            slot.sink.accept(buffer);
            self.counters.buffers_forwarded.fetch_add(1, Ordering::Relaxed);
            self.counters.frames_forwarded.fetch_add(frames, Ordering::Relaxed);
        } else {
            self.counters.buffers_discarded.fetch_add(1, Ordering::Relaxed);
        }
        self.forwarding.fetch_sub(1, Ordering::SeqCst);
    }

    fn package(
        &self,
        delivery: &mut BufferDelivery<'_>,
        pulled: &PulledAudio,
    ) -> Result<Option<TimedAudioBuffer>, TapError> {
        let Some(pcm) = self.converter.convert_stream(
            delivery.io,
            pulled.frames as usize,
            delivery.processing_format,
            delivery.resampler,
        )?
        else {
            return Ok(None);
        };
        let host_time = self.clock.now();
        TimedAudioBuffer::new(pcm, host_time, pulled.time_range, delivery.session_id).map(Some)
    }

    fn report(&self, error: TapError, session_id: Uuid) {
        self.errors.publish(TapErrorRecord::new(error, Some(session_id)));
    }
}

impl TapClient for EngineShared {
    fn session_created(&self, _session_id: Uuid) {
        self.counters.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    fn session_finalized(&self, _session_id: Uuid) {
        self.counters.sessions_finalized.fetch_add(1, Ordering::Relaxed);
    }

    fn session_prepare_failed(&self, session_id: Uuid, error: &TapError) {
        self.report(error.clone(), session_id);
    }

    fn on_buffer_delivered(&self, mut delivery: BufferDelivery<'_>) -> Result<PulledAudio, TapError> {
        self.counters.process_cycles.fetch_add(1, Ordering::Relaxed);

        let pulled = match delivery.source.pull(delivery.requested_frames, delivery.io) {
            Ok(pulled) => pulled,
            Err(err) => {
                log::error!("tap session {}: getting source audio failed: {}", delivery.session_id, err);
                self.counters.pull_failures.fetch_add(1, Ordering::Relaxed);
                self.report(err.clone(), delivery.session_id);
                return Err(err);
            }
        };

        // End of stream can legitimately deliver nothing.
        if pulled.frames == 0 {
            return Ok(pulled);
        }

        match self.package(&mut delivery, &pulled) {
            Ok(Some(buffer)) => self.on_sample_produced(buffer),
            // Resampling carried this cycle's frames into the next one.
            Ok(None) => {}
            Err(err) => {
                log::error!("tap session {}: dropping buffer: {}", delivery.session_id, err);
                self.counters.conversion_failures.fetch_add(1, Ordering::Relaxed);
                self.report(err, delivery.session_id);
            }
        }

        Ok(pulled)
    }
}
