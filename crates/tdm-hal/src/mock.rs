//! In-memory SDK used by driver tests.
//!
//! `MockSdk` implements the whole [`TelephonySdk`] contract against
//! fabricated hardware: a scripted board list, per-queue event storage
//! with condvar waiting, callback queues that invoke the installed
//! handler on the injecting thread (standing in for the SDK thread),
//! and per-call failure injection. Captured side effects (DTMF chunks
//! played, hook transitions, sent HDLC frames) are exposed through
//! accessor methods so tests can assert on them.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::config::{
    BoardConfig, BoardInfo, BoardList, EcConfig, HdlcConfig, HdlcMode, HookState, InterfaceType,
    PhoneConfig, PlayConfig, RecordConfig, SpanConfig, SystemConfig, TrunkConfig,
};
use crate::error::{SdkError, SdkResult, SdkStatus};
use crate::event::{AttachTag, SdkEvent, SdkEventId};
use crate::sdk::{EventHandler, QueueMode, TelephonySdk};
use crate::types::{
    BoardHandle, HdlcHandle, PhoneHandle, QueueHandle, RawHandle, SpanHandle, StreamHandle,
    SystemHandle, TrunkHandle,
};

struct QueueRec {
    mode: QueueMode,
    events: Mutex<VecDeque<SdkEvent>>,
    cv: Condvar,
    handler: Mutex<Option<EventHandler>>,
}

impl QueueRec {
    fn new(mode: QueueMode) -> Self {
        Self {
            mode,
            events: Mutex::new(VecDeque::new()),
            cv: Condvar::new(),
            handler: Mutex::new(None),
        }
    }

    fn deliver(&self, event: SdkEvent) {
        if self.mode == QueueMode::Callback {
            let handler = self.handler.lock().unwrap();
            if let Some(h) = handler.as_ref() {
                h(&event);
                return;
            }
        }
        self.events.lock().unwrap().push_back(event);
        self.cv.notify_one();
    }

    fn wait(&self, timeout: Duration) -> SdkEvent {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock().unwrap();
        loop {
            if let Some(ev) = events.pop_front() {
                return ev;
            }
            let now = Instant::now();
            if now >= deadline {
                return SdkEvent::timeout();
            }
            let (guard, _) = self.cv.wait_timeout(events, deadline - now).unwrap();
            events = guard;
        }
    }
}

struct SpanRec {
    config: SpanConfig,
    started: bool,
}

struct TrunkRec {
    config: TrunkConfig,
    seized: bool,
    started: bool,
    media: (RawHandle, RawHandle),
}

struct PhoneRec {
    config: PhoneConfig,
    seized: bool,
    started: bool,
    ringing: bool,
    media: (RawHandle, RawHandle),
}

struct HdlcRec {
    config: HdlcConfig,
    inbox: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
}

#[derive(Default)]
struct StreamRec {
    record: RecordConfig,
    play: PlayConfig,
    ec: EcConfig,
    record_started: bool,
    play_started: bool,
    ec_started: bool,
    record_blocks: VecDeque<Vec<u8>>,
    play_data: Vec<u8>,
}

struct Attachment {
    queue: RawHandle,
    source: RawHandle,
    tag: AttachTag,
}

#[derive(Default)]
struct FailPlan {
    seen: u32,
    fail_on: Vec<u32>,
}

struct State {
    next_raw: RawHandle,
    system: Option<RawHandle>,
    system_config: SystemConfig,
    boards: Vec<BoardInfo>,
    open_boards: HashMap<RawHandle, u32>,
    board_configs: HashMap<u32, BoardConfig>,
    spans: HashMap<RawHandle, SpanRec>,
    span_order: Vec<RawHandle>,
    trunks: HashMap<RawHandle, TrunkRec>,
    phones: HashMap<RawHandle, PhoneRec>,
    hdlcs: HashMap<RawHandle, HdlcRec>,
    hdlc_order: Vec<RawHandle>,
    streams: HashMap<RawHandle, StreamRec>,
    queues: HashMap<RawHandle, Arc<QueueRec>>,
    attachments: Vec<Attachment>,
    fail_plans: HashMap<String, FailPlan>,
    played_dtmf: Vec<String>,
    play_start_count: u32,
    hook_log: Vec<HookState>,
    ring_starts: u32,
    ring_stops: u32,
    t1_template: SpanConfig,
    e1_template: SpanConfig,
    default_record: RecordConfig,
    default_play: PlayConfig,
    default_ec: EcConfig,
}

impl State {
    fn alloc(&mut self) -> RawHandle {
        self.next_raw += 1;
        self.next_raw
    }

    fn gate(&mut self, name: &str) -> SdkResult<()> {
        if let Some(plan) = self.fail_plans.get_mut(name) {
            plan.seen += 1;
            if plan.fail_on.contains(&plan.seen) {
                log::debug!("mock: scheduled failure for {} call #{}", name, plan.seen);
                return Err(SdkError::Status {
                    status: SdkStatus::HardwareFault,
                });
            }
        }
        Ok(())
    }

    fn new_stream(&mut self) -> RawHandle {
        let raw = self.alloc();
        let rec = StreamRec {
            record: self.default_record,
            play: self.default_play,
            ec: self.default_ec,
            ..Default::default()
        };
        self.streams.insert(raw, rec);
        raw
    }

    fn stream_mut(&mut self, raw: RawHandle) -> SdkResult<&mut StreamRec> {
        self.streams
            .get_mut(&raw)
            .ok_or_else(|| SdkError::not_found(format!("stream 0x{:x}", raw)))
    }
}

/// Fabricated SDK for driver tests.
pub struct MockSdk {
    state: Mutex<State>,
}

impl MockSdk {
    /// Creates a mock with the given enumerable boards.
    pub fn with_boards(boards: Vec<BoardInfo>) -> Self {
        let t1_template = SpanConfig {
            framing: crate::config::Framing::Esf,
            encoding: crate::config::LineEncoding::B8zs,
            loop_length: crate::config::LoopLength::Short,
            build_out: crate::config::BuildOut::Lbo0Db,
            compand_mode: crate::config::CompandMode::MuLaw,
        };
        let e1_template = SpanConfig {
            framing: crate::config::Framing::Ccs,
            encoding: crate::config::LineEncoding::Hdb3,
            loop_length: crate::config::LoopLength::Short,
            build_out: crate::config::BuildOut::Lbo0Db,
            compand_mode: crate::config::CompandMode::ALaw,
        };
        Self {
            state: Mutex::new(State {
                next_raw: 0,
                system: None,
                system_config: SystemConfig::default(),
                boards,
                open_boards: HashMap::new(),
                board_configs: HashMap::new(),
                spans: HashMap::new(),
                span_order: Vec::new(),
                trunks: HashMap::new(),
                phones: HashMap::new(),
                hdlcs: HashMap::new(),
                hdlc_order: Vec::new(),
                streams: HashMap::new(),
                queues: HashMap::new(),
                attachments: Vec::new(),
                fail_plans: HashMap::new(),
                played_dtmf: Vec::new(),
                play_start_count: 0,
                hook_log: Vec::new(),
                ring_starts: 0,
                ring_stops: 0,
                t1_template,
                e1_template,
                default_record: RecordConfig::default(),
                default_play: PlayConfig::default(),
                default_ec: EcConfig::default(),
            }),
        }
    }

    /// One digital gateway board, the common test fixture.
    pub fn one_digital_board() -> Self {
        Self::with_boards(vec![BoardInfo {
            id: 0,
            board_type: crate::config::BoardType::DigitalGateway,
            serial_number: 1001,
        }])
    }

    /// One analog gateway board.
    pub fn one_analog_board() -> Self {
        Self::with_boards(vec![BoardInfo {
            id: 0,
            board_type: crate::config::BoardType::AnalogGateway,
            serial_number: 2001,
        }])
    }

    /// Schedules the `nth` (1-based) upcoming call to `name` to fail
    /// with a hardware-fault status.
    pub fn fail_nth_call(&self, name: &str, nth: u32) {
        let mut state = self.state.lock().unwrap();
        state
            .fail_plans
            .entry(name.to_string())
            .or_default()
            .fail_on
            .push(nth);
    }

    /// Pushes an event directly onto a queue, as the hardware would.
    /// Callback queues invoke their handler on the calling thread.
    pub fn push_event(&self, queue: QueueHandle, event: SdkEvent) {
        let rec = {
            let state = self.state.lock().unwrap();
            state.queues.get(&queue.as_raw()).cloned()
        };
        if let Some(rec) = rec {
            rec.deliver(event);
        }
    }

    /// Seeds an inbound media block on a record stream.
    pub fn seed_record_block(&self, stream: StreamHandle, block: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        if let Some(rec) = state.streams.get_mut(&stream.as_raw()) {
            rec.record_blocks.push_back(block);
        }
    }

    /// Seeds an inbound HDLC frame on the nth opened framer.
    pub fn seed_hdlc_frame(&self, nth: usize, frame: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        if let Some(&raw) = state.hdlc_order.get(nth) {
            if let Some(rec) = state.hdlcs.get_mut(&raw) {
                rec.inbox.push_back(frame);
            }
        }
    }

    /// Span handles in open order.
    pub fn span_handles(&self) -> Vec<SpanHandle> {
        let state = self.state.lock().unwrap();
        state
            .span_order
            .iter()
            .map(|&raw| SpanHandle::from_raw_unchecked(raw))
            .collect()
    }

    /// All DTMF strings handed to the tone generator, in order.
    pub fn played_dtmf(&self) -> Vec<String> {
        self.state.lock().unwrap().played_dtmf.clone()
    }

    /// Number of play-start calls observed.
    pub fn play_start_count(&self) -> u32 {
        self.state.lock().unwrap().play_start_count
    }

    /// Hook transitions observed, in order.
    pub fn hook_log(&self) -> Vec<HookState> {
        self.state.lock().unwrap().hook_log.clone()
    }

    /// (ring starts, ring stops) observed.
    pub fn ring_counts(&self) -> (u32, u32) {
        let state = self.state.lock().unwrap();
        (state.ring_starts, state.ring_stops)
    }

    /// Frames sent on the nth opened HDLC framer.
    pub fn sent_hdlc_frames(&self, nth: usize) -> Vec<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .hdlc_order
            .get(nth)
            .and_then(|raw| state.hdlcs.get(raw))
            .map(|rec| rec.sent.clone())
            .unwrap_or_default()
    }

    /// Current interface type recorded for a board.
    pub fn board_interface(&self, board_id: u32) -> InterfaceType {
        let state = self.state.lock().unwrap();
        state
            .board_configs
            .get(&board_id)
            .map(|c| c.interface_type)
            .unwrap_or(InterfaceType::T1)
    }

    /// Bytes appended to a play stream.
    pub fn play_data(&self, stream: StreamHandle) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        state
            .streams
            .get(&stream.as_raw())
            .map(|rec| rec.play_data.clone())
            .unwrap_or_default()
    }

    fn queue_rec(&self, queue: QueueHandle) -> SdkResult<Arc<QueueRec>> {
        let state = self.state.lock().unwrap();
        state
            .queues
            .get(&queue.as_raw())
            .cloned()
            .ok_or_else(|| SdkError::not_found(format!("queue {}", queue)))
    }
}

impl TelephonySdk for MockSdk {
    fn system_open(&self) -> SdkResult<SystemHandle> {
        let mut state = self.state.lock().unwrap();
        state.gate("system_open")?;
        let raw = state.alloc();
        state.system = Some(raw);
        Ok(SystemHandle::from_raw_unchecked(raw))
    }

    fn system_close(&self, _system: SystemHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.system = None;
        Ok(())
    }

    fn system_detect(&self, _system: SystemHandle) -> SdkResult<BoardList> {
        let mut state = self.state.lock().unwrap();
        state.gate("system_detect")?;
        let boards = state.boards.clone();
        for b in &boards {
            state.board_configs.entry(b.id).or_default();
        }
        Ok(BoardList { boards })
    }

    fn system_get_config(&self, _system: SystemHandle) -> SdkResult<SystemConfig> {
        Ok(self.state.lock().unwrap().system_config)
    }

    fn system_set_config(&self, _system: SystemHandle, config: &SystemConfig) -> SdkResult<()> {
        self.state.lock().unwrap().system_config = *config;
        Ok(())
    }

    fn media_stream_create(&self) -> SdkResult<StreamHandle> {
        let mut state = self.state.lock().unwrap();
        let raw = state.new_stream();
        Ok(StreamHandle::from_raw_unchecked(raw))
    }

    fn media_stream_destroy(&self, stream: StreamHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.streams.remove(&stream.as_raw());
        Ok(())
    }

    fn board_open(&self, board_id: u32) -> SdkResult<BoardHandle> {
        let mut state = self.state.lock().unwrap();
        state.gate("board_open")?;
        if !state.boards.iter().any(|b| b.id == board_id) {
            return Err(SdkError::not_found(format!("board {}", board_id)));
        }
        let raw = state.alloc();
        state.open_boards.insert(raw, board_id);
        Ok(BoardHandle::from_raw_unchecked(raw))
    }

    fn board_close(&self, board: BoardHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.open_boards.remove(&board.as_raw());
        Ok(())
    }

    fn board_get_config(&self, board: BoardHandle) -> SdkResult<BoardConfig> {
        let state = self.state.lock().unwrap();
        let id = state
            .open_boards
            .get(&board.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("board handle {}", board)))?;
        Ok(state.board_configs.get(id).copied().unwrap_or_default())
    }

    fn board_set_config(&self, board: BoardHandle, config: &BoardConfig) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("board_set_config")?;
        let id = *state
            .open_boards
            .get(&board.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("board handle {}", board)))?;
        state.board_configs.insert(id, *config);
        Ok(())
    }

    fn span_open(&self, board: BoardHandle, _span_no: u32) -> SdkResult<SpanHandle> {
        let mut state = self.state.lock().unwrap();
        state.gate("span_open")?;
        let id = *state
            .open_boards
            .get(&board.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("board handle {}", board)))?;
        let iface = state
            .board_configs
            .get(&id)
            .map(|c| c.interface_type)
            .unwrap_or(InterfaceType::T1);
        let config = match iface {
            InterfaceType::T1 => state.t1_template,
            InterfaceType::E1 => state.e1_template,
        };
        let raw = state.alloc();
        state.spans.insert(
            raw,
            SpanRec {
                config,
                started: false,
            },
        );
        state.span_order.push(raw);
        Ok(SpanHandle::from_raw_unchecked(raw))
    }

    fn span_close(&self, span: SpanHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.spans.remove(&span.as_raw());
        state.span_order.retain(|&raw| raw != span.as_raw());
        Ok(())
    }

    fn span_get_config(&self, span: SpanHandle) -> SdkResult<SpanConfig> {
        let state = self.state.lock().unwrap();
        state
            .spans
            .get(&span.as_raw())
            .map(|rec| rec.config)
            .ok_or_else(|| SdkError::not_found(format!("span {}", span)))
    }

    fn span_set_config(&self, span: SpanHandle, config: &SpanConfig) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("span_set_config")?;
        let rec = state
            .spans
            .get_mut(&span.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("span {}", span)))?;
        rec.config = *config;
        Ok(())
    }

    fn span_start(&self, span: SpanHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("span_start")?;
        let rec = state
            .spans
            .get_mut(&span.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("span {}", span)))?;
        rec.started = true;
        Ok(())
    }

    fn span_stop(&self, span: SpanHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(rec) = state.spans.get_mut(&span.as_raw()) {
            rec.started = false;
        }
        Ok(())
    }

    fn span_seize_timeslot(&self, span: SpanHandle, _timeslot: u32) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("span_seize_timeslot")?;
        if !state.spans.contains_key(&span.as_raw()) {
            return Err(SdkError::not_found(format!("span {}", span)));
        }
        Ok(())
    }

    fn span_media_streams(
        &self,
        span: SpanHandle,
        _timeslot: u32,
    ) -> SdkResult<(StreamHandle, StreamHandle)> {
        let mut state = self.state.lock().unwrap();
        state.gate("span_media_streams")?;
        if !state.spans.contains_key(&span.as_raw()) {
            return Err(SdkError::not_found(format!("span {}", span)));
        }
        let media_in = state.new_stream();
        let media_out = state.new_stream();
        Ok((
            StreamHandle::from_raw_unchecked(media_in),
            StreamHandle::from_raw_unchecked(media_out),
        ))
    }

    fn trunk_open(&self, board: BoardHandle, _index: u32) -> SdkResult<TrunkHandle> {
        let mut state = self.state.lock().unwrap();
        state.gate("trunk_open")?;
        if !state.open_boards.contains_key(&board.as_raw()) {
            return Err(SdkError::not_found(format!("board handle {}", board)));
        }
        let media_in = state.new_stream();
        let media_out = state.new_stream();
        let raw = state.alloc();
        state.trunks.insert(
            raw,
            TrunkRec {
                config: TrunkConfig::default(),
                seized: false,
                started: false,
                media: (media_in, media_out),
            },
        );
        Ok(TrunkHandle::from_raw_unchecked(raw))
    }

    fn trunk_close(&self, trunk: TrunkHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.trunks.remove(&trunk.as_raw());
        Ok(())
    }

    fn trunk_seize(&self, trunk: TrunkHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("trunk_seize")?;
        let rec = state
            .trunks
            .get_mut(&trunk.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("trunk {}", trunk)))?;
        rec.seized = true;
        Ok(())
    }

    fn trunk_start(&self, trunk: TrunkHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("trunk_start")?;
        let rec = state
            .trunks
            .get_mut(&trunk.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("trunk {}", trunk)))?;
        rec.started = true;
        Ok(())
    }

    fn trunk_get_config(&self, trunk: TrunkHandle) -> SdkResult<TrunkConfig> {
        let state = self.state.lock().unwrap();
        state
            .trunks
            .get(&trunk.as_raw())
            .map(|rec| rec.config)
            .ok_or_else(|| SdkError::not_found(format!("trunk {}", trunk)))
    }

    fn trunk_set_config(&self, trunk: TrunkHandle, config: &TrunkConfig) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        let rec = state
            .trunks
            .get_mut(&trunk.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("trunk {}", trunk)))?;
        rec.config = *config;
        Ok(())
    }

    fn trunk_media_streams(&self, trunk: TrunkHandle) -> SdkResult<(StreamHandle, StreamHandle)> {
        let state = self.state.lock().unwrap();
        let rec = state
            .trunks
            .get(&trunk.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("trunk {}", trunk)))?;
        Ok((
            StreamHandle::from_raw_unchecked(rec.media.0),
            StreamHandle::from_raw_unchecked(rec.media.1),
        ))
    }

    fn trunk_set_hook_switch(&self, trunk: TrunkHandle, hook: HookState) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("trunk_set_hook_switch")?;
        if !state.trunks.contains_key(&trunk.as_raw()) {
            return Err(SdkError::not_found(format!("trunk {}", trunk)));
        }
        state.hook_log.push(hook);
        Ok(())
    }

    fn phone_open(&self, board: BoardHandle, _index: u32) -> SdkResult<PhoneHandle> {
        let mut state = self.state.lock().unwrap();
        state.gate("phone_open")?;
        if !state.open_boards.contains_key(&board.as_raw()) {
            return Err(SdkError::not_found(format!("board handle {}", board)));
        }
        let media_in = state.new_stream();
        let media_out = state.new_stream();
        let raw = state.alloc();
        state.phones.insert(
            raw,
            PhoneRec {
                config: PhoneConfig::default(),
                seized: false,
                started: false,
                ringing: false,
                media: (media_in, media_out),
            },
        );
        Ok(PhoneHandle::from_raw_unchecked(raw))
    }

    fn phone_close(&self, phone: PhoneHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.phones.remove(&phone.as_raw());
        Ok(())
    }

    fn phone_seize(&self, phone: PhoneHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("phone_seize")?;
        let rec = state
            .phones
            .get_mut(&phone.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("phone {}", phone)))?;
        rec.seized = true;
        Ok(())
    }

    fn phone_start(&self, phone: PhoneHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("phone_start")?;
        let rec = state
            .phones
            .get_mut(&phone.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("phone {}", phone)))?;
        rec.started = true;
        Ok(())
    }

    fn phone_get_config(&self, phone: PhoneHandle) -> SdkResult<PhoneConfig> {
        let state = self.state.lock().unwrap();
        state
            .phones
            .get(&phone.as_raw())
            .map(|rec| rec.config)
            .ok_or_else(|| SdkError::not_found(format!("phone {}", phone)))
    }

    fn phone_set_config(&self, phone: PhoneHandle, config: &PhoneConfig) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        let rec = state
            .phones
            .get_mut(&phone.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("phone {}", phone)))?;
        rec.config = *config;
        Ok(())
    }

    fn phone_media_streams(&self, phone: PhoneHandle) -> SdkResult<(StreamHandle, StreamHandle)> {
        let state = self.state.lock().unwrap();
        let rec = state
            .phones
            .get(&phone.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("phone {}", phone)))?;
        Ok((
            StreamHandle::from_raw_unchecked(rec.media.0),
            StreamHandle::from_raw_unchecked(rec.media.1),
        ))
    }

    fn phone_ring_start(&self, phone: PhoneHandle, _pattern: u32, _cadence: u32) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("phone_ring_start")?;
        let rec = state
            .phones
            .get_mut(&phone.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("phone {}", phone)))?;
        rec.ringing = true;
        state.ring_starts += 1;
        Ok(())
    }

    fn phone_ring_stop(&self, phone: PhoneHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("phone_ring_stop")?;
        let rec = state
            .phones
            .get_mut(&phone.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("phone {}", phone)))?;
        rec.ringing = false;
        state.ring_stops += 1;
        Ok(())
    }

    fn hdlc_open(&self, span: SpanHandle, _mode: HdlcMode) -> SdkResult<HdlcHandle> {
        let mut state = self.state.lock().unwrap();
        state.gate("hdlc_open")?;
        if !state.spans.contains_key(&span.as_raw()) {
            return Err(SdkError::not_found(format!("span {}", span)));
        }
        let raw = state.alloc();
        state.hdlcs.insert(
            raw,
            HdlcRec {
                config: HdlcConfig::default(),
                inbox: VecDeque::new(),
                sent: Vec::new(),
            },
        );
        state.hdlc_order.push(raw);
        Ok(HdlcHandle::from_raw_unchecked(raw))
    }

    fn hdlc_get_config(&self, hdlc: HdlcHandle) -> SdkResult<HdlcConfig> {
        let state = self.state.lock().unwrap();
        state
            .hdlcs
            .get(&hdlc.as_raw())
            .map(|rec| rec.config)
            .ok_or_else(|| SdkError::not_found(format!("hdlc {}", hdlc)))
    }

    fn hdlc_set_config(&self, hdlc: HdlcHandle, config: &HdlcConfig) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        let rec = state
            .hdlcs
            .get_mut(&hdlc.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("hdlc {}", hdlc)))?;
        rec.config = *config;
        Ok(())
    }

    fn hdlc_send_message(&self, hdlc: HdlcHandle, data: &[u8]) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("hdlc_send_message")?;
        let rec = state
            .hdlcs
            .get_mut(&hdlc.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("hdlc {}", hdlc)))?;
        rec.sent.push(data.to_vec());
        Ok(())
    }

    fn hdlc_get_message(&self, hdlc: HdlcHandle, max_len: usize) -> SdkResult<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.gate("hdlc_get_message")?;
        let rec = state
            .hdlcs
            .get_mut(&hdlc.as_raw())
            .ok_or_else(|| SdkError::not_found(format!("hdlc {}", hdlc)))?;
        let mut frame = rec.inbox.pop_front().ok_or(SdkError::Status {
            status: SdkStatus::QueueEmpty,
        })?;
        frame.truncate(max_len);
        Ok(frame)
    }

    fn queue_create(&self, mode: QueueMode) -> SdkResult<QueueHandle> {
        let mut state = self.state.lock().unwrap();
        state.gate("queue_create")?;
        let raw = state.alloc();
        state.queues.insert(raw, Arc::new(QueueRec::new(mode)));
        Ok(QueueHandle::from_raw_unchecked(raw))
    }

    fn queue_destroy(&self, queue: QueueHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.queues.remove(&queue.as_raw());
        state.attachments.retain(|a| a.queue != queue.as_raw());
        Ok(())
    }

    fn queue_attach(
        &self,
        queue: QueueHandle,
        source: RawHandle,
        tag: AttachTag,
    ) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("queue_attach")?;
        if !state.queues.contains_key(&queue.as_raw()) {
            return Err(SdkError::not_found(format!("queue {}", queue)));
        }
        state.attachments.push(Attachment {
            queue: queue.as_raw(),
            source,
            tag,
        });
        Ok(())
    }

    fn queue_detach(&self, queue: QueueHandle, source: RawHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .attachments
            .retain(|a| !(a.queue == queue.as_raw() && a.source == source));
        Ok(())
    }

    fn queue_flush(&self, queue: QueueHandle) -> SdkResult<()> {
        let rec = self.queue_rec(queue)?;
        rec.events.lock().unwrap().clear();
        Ok(())
    }

    fn queue_wait(&self, queue: QueueHandle, timeout_ms: u32) -> SdkResult<SdkEvent> {
        let rec = self.queue_rec(queue)?;
        Ok(rec.wait(Duration::from_millis(u64::from(timeout_ms))))
    }

    fn queue_set_handler(&self, queue: QueueHandle, handler: EventHandler) -> SdkResult<()> {
        let rec = self.queue_rec(queue)?;
        *rec.handler.lock().unwrap() = Some(handler);
        Ok(())
    }

    fn record_get_config(&self, stream: StreamHandle) -> SdkResult<RecordConfig> {
        let mut state = self.state.lock().unwrap();
        Ok(state.stream_mut(stream.as_raw())?.record)
    }

    fn record_set_config(&self, stream: StreamHandle, config: &RecordConfig) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("record_set_config")?;
        state.stream_mut(stream.as_raw())?.record = *config;
        Ok(())
    }

    fn record_start(&self, stream: StreamHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("record_start")?;
        state.stream_mut(stream.as_raw())?.record_started = true;
        Ok(())
    }

    fn record_stop(&self, stream: StreamHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.stream_mut(stream.as_raw())?.record_started = false;
        Ok(())
    }

    fn record_data(&self, stream: StreamHandle, len: usize) -> SdkResult<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.gate("record_data")?;
        let rec = state.stream_mut(stream.as_raw())?;
        let mut block = rec.record_blocks.pop_front().ok_or(SdkError::Status {
            status: SdkStatus::QueueEmpty,
        })?;
        block.truncate(len);
        Ok(block)
    }

    fn play_get_config(&self, stream: StreamHandle) -> SdkResult<PlayConfig> {
        let mut state = self.state.lock().unwrap();
        Ok(state.stream_mut(stream.as_raw())?.play)
    }

    fn play_set_config(&self, stream: StreamHandle, config: &PlayConfig) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("play_set_config")?;
        state.stream_mut(stream.as_raw())?.play = *config;
        Ok(())
    }

    fn play_start(&self, stream: StreamHandle) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("play_start")?;
        state.stream_mut(stream.as_raw())?.play_started = true;
        state.play_start_count += 1;
        Ok(())
    }

    fn play_stop(&self, stream: StreamHandle) -> SdkResult<()> {
        // Stopping playback drains the play object; the hardware
        // reports that with a play-idle completion on the attached
        // callback queue.
        let (rec, tag) = {
            let mut state = self.state.lock().unwrap();
            state.gate("play_stop")?;
            state.stream_mut(stream.as_raw())?.play_started = false;
            let attachment = state
                .attachments
                .iter()
                .find(|a| a.source == stream.as_raw());
            match attachment {
                Some(a) => {
                    let tag = a.tag;
                    (state.queues.get(&a.queue).cloned(), Some(tag))
                }
                None => (None, None),
            }
        };
        if let (Some(rec), Some(tag)) = (rec, tag) {
            rec.deliver(SdkEvent::new(SdkEventId::PlayIdle).with_tag(tag));
        }
        Ok(())
    }

    fn play_add_data(&self, stream: StreamHandle, _offset: u32, data: &[u8]) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("play_add_data")?;
        state
            .stream_mut(stream.as_raw())?
            .play_data
            .extend_from_slice(data);
        Ok(())
    }

    fn ec_get_config(&self, stream: StreamHandle) -> SdkResult<EcConfig> {
        let mut state = self.state.lock().unwrap();
        Ok(state.stream_mut(stream.as_raw())?.ec)
    }

    fn ec_set_config(&self, stream: StreamHandle, config: &EcConfig) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("ec_set_config")?;
        state.stream_mut(stream.as_raw())?.ec = *config;
        Ok(())
    }

    fn ec_start(
        &self,
        stream: StreamHandle,
        _media_in: StreamHandle,
        _media_out: StreamHandle,
    ) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("ec_start")?;
        state.stream_mut(stream.as_raw())?.ec_started = true;
        Ok(())
    }

    fn tone_play_dtmf(&self, stream: StreamHandle, digits: &str) -> SdkResult<()> {
        let mut state = self.state.lock().unwrap();
        state.gate("tone_play_dtmf")?;
        if !state.streams.contains_key(&stream.as_raw()) {
            return Err(SdkError::not_found(format!("stream {}", stream)));
        }
        state.played_dtmf.push(digits.to_string());
        Ok(())
    }
}
