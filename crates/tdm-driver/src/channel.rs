//! Per-channel runtime state.
//!
//! A channel owns the SDK objects provisioned for it (one device
//! handle, a media stream pair, and their queues) plus the bookkeeping
//! the I/O and event paths read. Slow-changing state lives behind one
//! mutex; the status and alarm words are atomics so the event poller
//! can flag a channel without taking the state lock; the DTMF digit
//! buffer has its own lock because the tone completion worker drains
//! it concurrently with writers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use tdm_hal::{
    AudioEncoding, EcConfig, HdlcHandle, PhoneHandle, PlayConfig, QueueHandle, RecordConfig,
    SdkEvent, StreamHandle, TrunkHandle,
};

use crate::types::{chan_flag, ChannelType};

/// The SDK device object backing a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceHandle {
    /// No device object; bearer timeslots are seized on the span.
    #[default]
    Timeslot,
    Trunk(TrunkHandle),
    Phone(PhoneHandle),
    Hdlc(HdlcHandle),
}

impl DeviceHandle {
    /// Returns the trunk handle if this channel is backed by one.
    pub fn trunk(&self) -> Option<TrunkHandle> {
        match self {
            DeviceHandle::Trunk(h) => Some(*h),
            _ => None,
        }
    }

    /// Returns the phone handle if this channel is backed by one.
    pub fn phone(&self) -> Option<PhoneHandle> {
        match self {
            DeviceHandle::Phone(h) => Some(*h),
            _ => None,
        }
    }

    /// Returns the HDLC handle if this channel is backed by one.
    pub fn hdlc(&self) -> Option<HdlcHandle> {
        match self {
            DeviceHandle::Hdlc(h) => Some(*h),
            _ => None,
        }
    }
}

/// Queued DTMF digits awaiting hardware tone generation.
///
/// Writers append; the completion worker drains in bounded chunks and
/// records the size of the chunk currently in the tone generator.
#[derive(Debug, Default)]
pub struct DigitBuffer {
    queued: VecDeque<u8>,
    in_flight: usize,
}

impl DigitBuffer {
    /// Appends digits to the queue.
    pub fn write(&mut self, digits: &str) {
        self.queued.extend(digits.bytes());
    }

    /// Removes and returns up to `max` queued digits, recording the
    /// chunk as in flight. Returns None when the queue is empty.
    pub fn read_chunk(&mut self, max: usize) -> Option<String> {
        if self.queued.is_empty() {
            return None;
        }
        let n = self.queued.len().min(max);
        let chunk: Vec<u8> = self.queued.drain(..n).collect();
        self.in_flight = n;
        // Digits are always ASCII dial characters.
        Some(String::from_utf8_lossy(&chunk).into_owned())
    }

    /// Marks the in-flight chunk as played out.
    pub fn finish_chunk(&mut self) {
        self.in_flight = 0;
    }

    /// Returns true if digits are queued and not yet handed to the
    /// tone generator.
    pub fn has_queued(&self) -> bool {
        !self.queued.is_empty()
    }

    /// Size of the chunk currently in the tone generator.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

/// Mutable channel state guarded by the channel mutex.
#[derive(Debug, Default)]
pub struct ChanState {
    pub device: DeviceHandle,
    pub media_in: StreamHandle,
    pub media_out: StreamHandle,
    pub media_in_queue: QueueHandle,
    pub media_out_queue: QueueHandle,
    pub record_config: RecordConfig,
    pub play_config: PlayConfig,
    pub ec_enabled: bool,
    pub ec_config: EcConfig,
    /// Last event taken from the media-in queue.
    pub last_media_event: Option<SdkEvent>,
    /// Last span-queue event routed to this channel, pending
    /// translation.
    pub last_oob_event: Option<SdkEvent>,
    /// Byte count recorded from the most recent HDLC message event.
    pub hdlc_bytes: u32,
    /// Media block size in bytes.
    pub packet_len: u32,
    /// Native wakeup interval in milliseconds.
    pub native_interval: u32,
    pub dtmf_on_ms: u32,
    pub dtmf_off_ms: u32,
    pub codec: AudioEncoding,
    /// Hardware coordinates, for log lines.
    pub board_no: u32,
    pub span_no: u32,
    pub chan_no: u32,
    pub name: String,
    pub number: String,
}

/// One channel slot on a span.
pub struct Channel {
    slot: u32,
    chan_type: ChannelType,
    state: Mutex<ChanState>,
    flags: AtomicU32,
    alarms: AtomicU32,
    digits: Mutex<DigitBuffer>,
    last_error: Mutex<String>,
    last_event_ms: AtomicU64,
}

impl Channel {
    /// Creates an unprovisioned channel in the given slot.
    pub fn new(slot: u32, chan_type: ChannelType) -> Self {
        Self {
            slot,
            chan_type,
            state: Mutex::new(ChanState {
                dtmf_on_ms: 250,
                dtmf_off_ms: 50,
                ..ChanState::default()
            }),
            flags: AtomicU32::new(0),
            alarms: AtomicU32::new(0),
            digits: Mutex::new(DigitBuffer::default()),
            last_error: Mutex::new(String::new()),
            last_event_ms: AtomicU64::new(0),
        }
    }

    /// Slot index within the owning span.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn chan_type(&self) -> ChannelType {
        self.chan_type
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, ChanState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn digits(&self) -> &Mutex<DigitBuffer> {
        &self.digits
    }

    /// Outbound media stream, for the tone completion path.
    pub(crate) fn media_out(&self) -> StreamHandle {
        self.state().media_out
    }

    /// Hardware coordinates as (board, span, channel).
    pub fn device_address(&self) -> (u32, u32, u32) {
        let state = self.state();
        (state.board_no, state.span_no, state.chan_no)
    }

    /// Native PCM codec negotiated at provisioning.
    pub fn codec(&self) -> AudioEncoding {
        self.state().codec
    }

    /// Media block size in bytes.
    pub fn packet_len(&self) -> u32 {
        self.state().packet_len
    }

    /// Native wakeup interval in milliseconds.
    pub fn native_interval(&self) -> u32 {
        self.state().native_interval
    }

    pub fn name(&self) -> String {
        self.state().name.clone()
    }

    pub fn number(&self) -> String {
        self.state().number.clone()
    }

    pub fn set_flags(&self, bits: u32) {
        self.flags.fetch_or(bits, Ordering::SeqCst);
    }

    pub fn clear_flags(&self, bits: u32) {
        self.flags.fetch_and(!bits, Ordering::SeqCst);
    }

    pub fn has_flag(&self, bit: u32) -> bool {
        self.flags.load(Ordering::SeqCst) & bit != 0
    }

    /// Returns true once provisioning completed.
    pub fn is_ready(&self) -> bool {
        self.has_flag(chan_flag::READY)
    }

    pub fn raise_alarms(&self, bits: u32) {
        self.alarms.fetch_or(bits, Ordering::SeqCst);
    }

    pub fn clear_alarms(&self, bits: u32) {
        self.alarms.fetch_and(!bits, Ordering::SeqCst);
    }

    /// Current alarm condition bits.
    pub fn alarm_bits(&self) -> u32 {
        self.alarms.load(Ordering::SeqCst)
    }

    pub fn set_last_error(&self, message: impl Into<String>) {
        *self.last_error.lock().unwrap() = message.into();
    }

    /// Text of the most recent channel error or alarm.
    pub fn last_error(&self) -> String {
        self.last_error.lock().unwrap().clone()
    }

    pub(crate) fn touch_event_time(&self) {
        self.last_event_ms.store(now_ms(), Ordering::SeqCst);
    }

    pub(crate) fn clear_event_time(&self) {
        self.last_event_ms.store(0, Ordering::SeqCst);
    }

    /// Wall-clock milliseconds of the last routed event, zero once the
    /// event has been consumed.
    pub fn last_event_ms(&self) -> u64 {
        self.last_event_ms.load(Ordering::SeqCst)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_digit_buffer_chunks() {
        let mut buf = DigitBuffer::default();
        buf.write("12345");
        buf.write("678");
        let chunk = buf.read_chunk(4).unwrap();
        assert_eq!(chunk, "1234");
        assert_eq!(buf.in_flight(), 4);
        assert!(buf.has_queued());
        assert_eq!(buf.read_chunk(128).unwrap(), "5678");
        assert!(buf.read_chunk(128).is_none());
        buf.finish_chunk();
        assert_eq!(buf.in_flight(), 0);
    }

    #[test]
    fn test_channel_flags_and_alarms() {
        let chan = Channel::new(0, ChannelType::Fxo);
        assert!(!chan.is_ready());
        chan.set_flags(chan_flag::READY | chan_flag::EVENT);
        assert!(chan.is_ready());
        chan.clear_flags(chan_flag::EVENT);
        assert!(!chan.has_flag(chan_flag::EVENT));

        chan.raise_alarms(crate::types::alarm::RED | crate::types::alarm::GENERAL);
        chan.clear_alarms(crate::types::alarm::GENERAL);
        assert_eq!(chan.alarm_bits(), crate::types::alarm::RED);
    }

    #[test]
    fn test_device_handle_accessors() {
        let dev = DeviceHandle::default();
        assert_eq!(dev, DeviceHandle::Timeslot);
        assert!(dev.trunk().is_none());
        assert!(dev.phone().is_none());
        assert!(dev.hdlc().is_none());
    }
}
