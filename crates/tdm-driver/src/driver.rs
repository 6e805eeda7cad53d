//! Module lifecycle and the channel I/O contract.
//!
//! [`TdmDriver`] is the per-process driver context: it owns the SDK
//! system object, the enumerated board list, the profile store, the
//! factory-default media configurations captured at load, and the
//! tone completion worker. Everything above the driver talks to it
//! through the [`ChannelIo`] trait.

use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tdm_hal::{
    BoardHandle, BoardList, BoardType, InterfaceType, SpanConfig, SystemHandle, TelephonySdk,
};
use tracing::{info, warn};

use crate::channel::Channel;
use crate::command::{ChannelCommand, CommandOutcome};
use crate::error::{DriverError, DriverResult};
use crate::media::{spawn_completion_worker, CompletionMsg, COMPLETION_QUEUE_DEPTH};
use crate::profile::ProfileStore;
use crate::span::Span;
use crate::types::{ChannelType, OobEvent, PollOutcome, WaitFlags, WaitOutcome};

/// Upper bound on addressable boards.
pub const MAX_BOARDS: u32 = 64;

/// Media block size in bytes at 8 kHz mono.
pub const BLOCK_SIZE: u32 = 160;

/// Duration of one media block.
pub const BLOCK_LEN_MS: u32 = 20;

/// Record buffers per channel.
pub const NUM_BUFFERS: u32 = 8;

/// PCM sampling rate.
pub const SAMPLE_RATE_HZ: u32 = 8000;

/// The channel/span I/O surface exposed to the stack above.
pub trait ChannelIo {
    /// Applies one configuration directive to a named profile.
    fn configure(&self, category: &str, key: &str, value: &str) -> DriverResult<()>;

    /// Provisions the channels named by `descriptor` onto `span` and
    /// returns how many were configured.
    fn configure_span(
        &self,
        span: &mut Span,
        descriptor: &str,
        chan_type: ChannelType,
        name: Option<&str>,
        number: Option<&str>,
    ) -> u32;

    /// Opens a provisioned channel for use.
    fn open(&self, chan: &Channel) -> DriverResult<()>;

    /// Releases a channel opened with [`ChannelIo::open`].
    fn close(&self, chan: &Channel) -> DriverResult<()>;

    /// Blocks until the channel is ready in one of the requested
    /// directions or the timeout expires.
    fn wait(&self, chan: &Channel, flags: WaitFlags, timeout_ms: u32) -> DriverResult<WaitOutcome>;

    /// Reads one inbound media block or HDLC message.
    fn read(&self, chan: &Channel, buf: &mut [u8]) -> DriverResult<usize>;

    /// Writes outbound media or an HDLC message.
    fn write(&self, chan: &Channel, buf: &[u8]) -> DriverResult<usize>;

    /// Executes a control command against the channel.
    fn command(&self, chan: &Channel, cmd: ChannelCommand) -> DriverResult<CommandOutcome>;

    /// Waits for signaling activity anywhere on the span.
    fn poll_event(&self, span: &Span, timeout_ms: u32) -> DriverResult<PollOutcome>;

    /// Translates and returns the next pending out-of-band event.
    fn next_event(&self, span: &Span) -> DriverResult<OobEvent>;

    /// Reports current alarm state on demand.
    fn get_alarms(&self, chan: &Channel) -> DriverResult<()>;

    /// Tears down one channel's hardware resources.
    fn channel_destroy(&self, span: &Span, chan: &Channel) -> DriverResult<()>;

    /// Tears down span-level hardware resources.
    fn span_destroy(&self, span: &Span) -> DriverResult<()>;
}

/// Driver context, one per process.
pub struct TdmDriver {
    pub(crate) sdk: Arc<dyn TelephonySdk>,
    pub(crate) system: SystemHandle,
    pub(crate) board_list: BoardList,
    pub(crate) open_boards: Mutex<HashMap<u32, BoardHandle>>,
    pub(crate) profiles: ProfileStore,
    /// Span line templates read from the first digital board at load.
    pub(crate) t1_template: SpanConfig,
    pub(crate) e1_template: SpanConfig,
    pub(crate) completion_tx: SyncSender<CompletionMsg>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TdmDriver {
    /// Opens the SDK, enumerates boards, captures factory defaults
    /// and span line templates, and starts the completion worker.
    ///
    /// Fails when the system object cannot be opened or no boards are
    /// present.
    pub fn init(sdk: Arc<dyn TelephonySdk>) -> DriverResult<Self> {
        let system = sdk.system_open()?;

        let board_list = match sdk.system_detect(system) {
            Ok(list) => list,
            Err(e) => {
                let _ = sdk.system_close(system);
                return Err(e.into());
            }
        };
        if board_list.is_empty() {
            warn!("no boards detected");
            let _ = sdk.system_close(system);
            return Err(DriverError::board_not_present(0));
        }

        let mut sys_config = sdk.system_get_config(system)?;
        sys_config.max_audio_process_block = BLOCK_LEN_MS;
        sys_config.play_buffer_size = BLOCK_SIZE;
        sys_config.record_buffer_size = BLOCK_SIZE;
        sys_config.record_buffer_count = NUM_BUFFERS;
        if let Err(e) = sdk.system_set_config(system, &sys_config) {
            warn!("failed to apply system buffering config: {}", e);
        }

        // A scratch stream carries the factory default media configs.
        let scratch = sdk.media_stream_create()?;
        let default_record = sdk.record_get_config(scratch)?;
        let default_play = sdk.play_get_config(scratch)?;
        let default_ec = sdk.ec_get_config(scratch)?;
        let _ = sdk.media_stream_destroy(scratch);
        info!(
            "default record config: gain {} agc {} vad {}",
            default_record.gain, default_record.agc.enabled, default_record.vad.enabled
        );
        info!(
            "default play config: gain {} agc {}",
            default_play.gain, default_play.agc.enabled
        );
        info!(
            "default ec config: suppression {} comfort noise {} adaptation {}",
            default_ec.echo_suppression_enabled,
            default_ec.comfort_noise_enabled,
            default_ec.adaptation_mode_enabled
        );

        let mut t1_template = SpanConfig::default();
        let mut e1_template = SpanConfig::default();
        for info in &board_list.boards {
            info!(
                "found board type:[{}] id:[{}] serial:[{}]",
                info.board_type.as_str(),
                info.id,
                info.serial_number
            );
            if info.board_type != BoardType::DigitalGateway {
                continue;
            }
            if let Err(e) =
                capture_span_templates(sdk.as_ref(), info.id, &mut t1_template, &mut e1_template)
            {
                warn!("failed to read span templates from board {}: {}", info.id, e);
            }
        }

        let (completion_tx, completion_rx) = sync_channel(COMPLETION_QUEUE_DEPTH);
        let worker = spawn_completion_worker(Arc::clone(&sdk), completion_rx);

        Ok(Self {
            sdk,
            system,
            board_list,
            open_boards: Mutex::new(HashMap::new()),
            profiles: ProfileStore::new(default_record, default_play, default_ec),
            t1_template,
            e1_template,
            completion_tx,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Closes every open board and the system object and stops the
    /// completion worker.
    pub fn unload(&self) -> DriverResult<()> {
        let mut open = self.open_boards.lock().unwrap();
        for (board_no, handle) in open.drain() {
            if let Err(e) = self.sdk.board_close(handle) {
                warn!("failed to close board {}: {}", board_no, e);
            }
        }
        drop(open);

        self.profiles.clear();
        let _ = self.completion_tx.send(CompletionMsg::Shutdown);
        if let Some(worker) = self.worker.lock().unwrap().take() {
            let _ = worker.join();
        }
        self.sdk.system_close(self.system)?;
        Ok(())
    }

    /// Number of boards enumerated at load.
    pub fn board_count(&self) -> usize {
        self.board_list.len()
    }

    /// The profile store, for inspection.
    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Returns the handle for a board index, opening the board on
    /// first use.
    pub(crate) fn board_handle(&self, board_no: u32) -> DriverResult<BoardHandle> {
        if board_no >= MAX_BOARDS || board_no as usize >= self.board_list.len() {
            return Err(DriverError::board_not_present(board_no));
        }
        let mut open = self.open_boards.lock().unwrap();
        if let Some(handle) = open.get(&board_no) {
            return Ok(*handle);
        }
        let id = self.board_list.boards[board_no as usize].id;
        let handle = self.sdk.board_open(id)?;
        open.insert(board_no, handle);
        Ok(handle)
    }
}

/// Reads the hardware's T1 and E1 span line templates from a digital
/// board by flipping its interface type, then restores it.
fn capture_span_templates(
    sdk: &dyn TelephonySdk,
    board_id: u32,
    t1_template: &mut SpanConfig,
    e1_template: &mut SpanConfig,
) -> DriverResult<()> {
    let board = sdk.board_open(board_id)?;
    let original = sdk.board_get_config(board);

    let result = (|| -> DriverResult<()> {
        for (iface, slot) in [
            (InterfaceType::T1, &mut *t1_template),
            (InterfaceType::E1, &mut *e1_template),
        ] {
            let mut config = sdk.board_get_config(board)?;
            config.interface_type = iface;
            sdk.board_set_config(board, &config)?;
            let span = sdk.span_open(board, 0)?;
            *slot = sdk.span_get_config(span)?;
            sdk.span_close(span)?;
        }
        Ok(())
    })();

    if let Ok(config) = original {
        let _ = sdk.board_set_config(board, &config);
    }
    let _ = sdk.board_close(board);
    result
}

impl ChannelIo for TdmDriver {
    fn configure(&self, category: &str, key: &str, value: &str) -> DriverResult<()> {
        self.profiles.apply(category, key, value);
        Ok(())
    }

    fn configure_span(
        &self,
        span: &mut Span,
        descriptor: &str,
        chan_type: ChannelType,
        name: Option<&str>,
        number: Option<&str>,
    ) -> u32 {
        self.configure_span_impl(span, descriptor, chan_type, name, number)
    }

    fn open(&self, chan: &Channel) -> DriverResult<()> {
        self.open_impl(chan)
    }

    fn close(&self, chan: &Channel) -> DriverResult<()> {
        self.close_impl(chan)
    }

    fn wait(&self, chan: &Channel, flags: WaitFlags, timeout_ms: u32) -> DriverResult<WaitOutcome> {
        self.wait_impl(chan, flags, timeout_ms)
    }

    fn read(&self, chan: &Channel, buf: &mut [u8]) -> DriverResult<usize> {
        self.read_impl(chan, buf)
    }

    fn write(&self, chan: &Channel, buf: &[u8]) -> DriverResult<usize> {
        self.write_impl(chan, buf)
    }

    fn command(&self, chan: &Channel, cmd: ChannelCommand) -> DriverResult<CommandOutcome> {
        self.command_impl(chan, cmd)
    }

    fn poll_event(&self, span: &Span, timeout_ms: u32) -> DriverResult<PollOutcome> {
        self.poll_event_impl(span, timeout_ms)
    }

    fn next_event(&self, span: &Span) -> DriverResult<OobEvent> {
        self.next_event_impl(span)
    }

    fn get_alarms(&self, _chan: &Channel) -> DriverResult<()> {
        Err(DriverError::unsupported("alarm query"))
    }

    fn channel_destroy(&self, span: &Span, chan: &Channel) -> DriverResult<()> {
        self.channel_destroy_impl(span, chan)
    }

    fn span_destroy(&self, span: &Span) -> DriverResult<()> {
        self.span_destroy_impl(span)
    }
}
