//! The narrow SDK contract the driver is allowed to call.
//!
//! The vendor library does its own board enumeration, signal
//! generation, and DSP work; the driver only ever touches it through
//! this trait. Keeping the contract as a trait object lets the driver
//! run against the real bindings in production and [`crate::mock::MockSdk`]
//! in tests.

use crate::config::{
    BoardConfig, BoardList, EcConfig, HdlcConfig, HdlcMode, HookState, PhoneConfig, PlayConfig,
    RecordConfig, SpanConfig, SystemConfig, TrunkConfig,
};
use crate::error::SdkResult;
use crate::event::{AttachTag, SdkEvent};
use crate::types::{
    BoardHandle, HdlcHandle, PhoneHandle, QueueHandle, RawHandle, SpanHandle, StreamHandle,
    SystemHandle, TrunkHandle,
};

/// Event queue flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueMode {
    /// Events are held until a consumer waits on the queue.
    Normal,
    /// Events are delivered by invoking the installed handler on an
    /// SDK-owned thread.
    Callback,
}

/// Handler installed on a callback-mode queue.
///
/// Invoked by the SDK on its own thread, asynchronous to every caller
/// thread; implementations must confine themselves to posting a
/// message or touching state behind its own lock.
pub type EventHandler = Box<dyn Fn(&SdkEvent) + Send + Sync>;

/// The board/media SDK surface used by the driver.
///
/// One method per vendor entry point the driver calls; nothing more.
/// All methods are synchronous; only [`TelephonySdk::queue_wait`]
/// blocks, bounded by the caller-supplied timeout.
pub trait TelephonySdk: Send + Sync {
    // System object and board enumeration.
    fn system_open(&self) -> SdkResult<SystemHandle>;
    fn system_close(&self, system: SystemHandle) -> SdkResult<()>;
    fn system_detect(&self, system: SystemHandle) -> SdkResult<BoardList>;
    fn system_get_config(&self, system: SystemHandle) -> SdkResult<SystemConfig>;
    fn system_set_config(&self, system: SystemHandle, config: &SystemConfig) -> SdkResult<()>;

    // Scratch media streams, used once at load to capture the factory
    // default record/play/EC configurations.
    fn media_stream_create(&self) -> SdkResult<StreamHandle>;
    fn media_stream_destroy(&self, stream: StreamHandle) -> SdkResult<()>;

    // Boards.
    fn board_open(&self, board_id: u32) -> SdkResult<BoardHandle>;
    fn board_close(&self, board: BoardHandle) -> SdkResult<()>;
    fn board_get_config(&self, board: BoardHandle) -> SdkResult<BoardConfig>;
    fn board_set_config(&self, board: BoardHandle, config: &BoardConfig) -> SdkResult<()>;

    // Digital spans.
    fn span_open(&self, board: BoardHandle, span_no: u32) -> SdkResult<SpanHandle>;
    fn span_close(&self, span: SpanHandle) -> SdkResult<()>;
    fn span_get_config(&self, span: SpanHandle) -> SdkResult<SpanConfig>;
    fn span_set_config(&self, span: SpanHandle, config: &SpanConfig) -> SdkResult<()>;
    fn span_start(&self, span: SpanHandle) -> SdkResult<()>;
    fn span_stop(&self, span: SpanHandle) -> SdkResult<()>;
    fn span_seize_timeslot(&self, span: SpanHandle, timeslot: u32) -> SdkResult<()>;
    fn span_media_streams(
        &self,
        span: SpanHandle,
        timeslot: u32,
    ) -> SdkResult<(StreamHandle, StreamHandle)>;

    // Analog trunks (FXO).
    fn trunk_open(&self, board: BoardHandle, index: u32) -> SdkResult<TrunkHandle>;
    fn trunk_close(&self, trunk: TrunkHandle) -> SdkResult<()>;
    fn trunk_seize(&self, trunk: TrunkHandle) -> SdkResult<()>;
    fn trunk_start(&self, trunk: TrunkHandle) -> SdkResult<()>;
    fn trunk_get_config(&self, trunk: TrunkHandle) -> SdkResult<TrunkConfig>;
    fn trunk_set_config(&self, trunk: TrunkHandle, config: &TrunkConfig) -> SdkResult<()>;
    fn trunk_media_streams(&self, trunk: TrunkHandle) -> SdkResult<(StreamHandle, StreamHandle)>;
    fn trunk_set_hook_switch(&self, trunk: TrunkHandle, state: HookState) -> SdkResult<()>;

    // Analog phones (FXS).
    fn phone_open(&self, board: BoardHandle, index: u32) -> SdkResult<PhoneHandle>;
    fn phone_close(&self, phone: PhoneHandle) -> SdkResult<()>;
    fn phone_seize(&self, phone: PhoneHandle) -> SdkResult<()>;
    fn phone_start(&self, phone: PhoneHandle) -> SdkResult<()>;
    fn phone_get_config(&self, phone: PhoneHandle) -> SdkResult<PhoneConfig>;
    fn phone_set_config(&self, phone: PhoneHandle, config: &PhoneConfig) -> SdkResult<()>;
    fn phone_media_streams(&self, phone: PhoneHandle) -> SdkResult<(StreamHandle, StreamHandle)>;
    fn phone_ring_start(&self, phone: PhoneHandle, pattern: u32, cadence: u32) -> SdkResult<()>;
    fn phone_ring_stop(&self, phone: PhoneHandle) -> SdkResult<()>;

    // HDLC framers on digital spans.
    fn hdlc_open(&self, span: SpanHandle, mode: HdlcMode) -> SdkResult<HdlcHandle>;
    fn hdlc_get_config(&self, hdlc: HdlcHandle) -> SdkResult<HdlcConfig>;
    fn hdlc_set_config(&self, hdlc: HdlcHandle, config: &HdlcConfig) -> SdkResult<()>;
    fn hdlc_send_message(&self, hdlc: HdlcHandle, data: &[u8]) -> SdkResult<()>;
    fn hdlc_get_message(&self, hdlc: HdlcHandle, max_len: usize) -> SdkResult<Vec<u8>>;

    // Event queues.
    fn queue_create(&self, mode: QueueMode) -> SdkResult<QueueHandle>;
    fn queue_destroy(&self, queue: QueueHandle) -> SdkResult<()>;
    fn queue_attach(&self, queue: QueueHandle, source: RawHandle, tag: AttachTag)
        -> SdkResult<()>;
    fn queue_detach(&self, queue: QueueHandle, source: RawHandle) -> SdkResult<()>;
    fn queue_flush(&self, queue: QueueHandle) -> SdkResult<()>;
    /// Blocks up to `timeout_ms`. A timeout is not an error: the call
    /// succeeds and delivers the distinguished queue-timeout event.
    fn queue_wait(&self, queue: QueueHandle, timeout_ms: u32) -> SdkResult<SdkEvent>;
    fn queue_set_handler(&self, queue: QueueHandle, handler: EventHandler) -> SdkResult<()>;

    // Record (inbound media) objects.
    fn record_get_config(&self, stream: StreamHandle) -> SdkResult<RecordConfig>;
    fn record_set_config(&self, stream: StreamHandle, config: &RecordConfig) -> SdkResult<()>;
    fn record_start(&self, stream: StreamHandle) -> SdkResult<()>;
    fn record_stop(&self, stream: StreamHandle) -> SdkResult<()>;
    fn record_data(&self, stream: StreamHandle, len: usize) -> SdkResult<Vec<u8>>;

    // Play (outbound media) objects.
    fn play_get_config(&self, stream: StreamHandle) -> SdkResult<PlayConfig>;
    fn play_set_config(&self, stream: StreamHandle, config: &PlayConfig) -> SdkResult<()>;
    fn play_start(&self, stream: StreamHandle) -> SdkResult<()>;
    fn play_stop(&self, stream: StreamHandle) -> SdkResult<()>;
    fn play_add_data(&self, stream: StreamHandle, offset: u32, data: &[u8]) -> SdkResult<()>;

    // Echo cancellation.
    fn ec_get_config(&self, stream: StreamHandle) -> SdkResult<EcConfig>;
    fn ec_set_config(&self, stream: StreamHandle, config: &EcConfig) -> SdkResult<()>;
    fn ec_start(
        &self,
        stream: StreamHandle,
        media_in: StreamHandle,
        media_out: StreamHandle,
    ) -> SdkResult<()>;

    // Tone generation.
    fn tone_play_dtmf(&self, stream: StreamHandle, digits: &str) -> SdkResult<()>;
}
