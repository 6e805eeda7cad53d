//! Span state: an ordered set of channel slots plus the hardware
//! resources shared by all of them.

use std::sync::{Arc, Mutex, MutexGuard};

use tdm_hal::{BoardHandle, QueueHandle, SdkEvent, SpanConfig, SpanHandle};

use crate::channel::Channel;
use crate::types::TrunkType;

/// Hardware resources acquired the first time channels are
/// provisioned onto the span.
#[derive(Debug, Default)]
pub struct SpanResources {
    /// Board index the span's channels live on.
    pub board_no: u32,
    /// Hardware span number on that board.
    pub span_no: u32,
    pub board: BoardHandle,
    /// Signaling/event queue shared by every channel on the span.
    pub event_queue: QueueHandle,
    /// Digital span object; null until a digital channel type opens it.
    pub handle: SpanHandle,
    /// Line configuration read back from the hardware.
    pub config: SpanConfig,
    /// Set once the board has been committed to E1 line mode.
    pub locked_e1: bool,
    /// Last event taken from the span event queue.
    pub last_event: Option<SdkEvent>,
}

/// One logical span.
pub struct Span {
    id: u32,
    trunk_type: Mutex<TrunkType>,
    channels: Vec<Arc<Channel>>,
    resources: Mutex<Option<SpanResources>>,
}

impl Span {
    /// Creates an empty span with the given id and trunk flavor.
    pub fn new(id: u32, trunk_type: TrunkType) -> Self {
        Self {
            id,
            trunk_type: Mutex::new(trunk_type),
            channels: Vec::new(),
            resources: Mutex::new(None),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn trunk_type(&self) -> TrunkType {
        *self.trunk_type.lock().unwrap()
    }

    pub(crate) fn set_trunk_type(&self, trunk_type: TrunkType) {
        *self.trunk_type.lock().unwrap() = trunk_type;
    }

    /// Channels in slot order.
    pub fn channels(&self) -> &[Arc<Channel>] {
        &self.channels
    }

    /// Channel by slot index.
    pub fn channel(&self, slot: u32) -> Option<&Arc<Channel>> {
        self.channels.get(slot as usize)
    }

    pub(crate) fn push_channel(&mut self, chan: Arc<Channel>) {
        self.channels.push(chan);
    }

    pub(crate) fn resources(&self) -> MutexGuard<'_, Option<SpanResources>> {
        self.resources.lock().unwrap()
    }

    /// The span's shared event queue, once provisioned.
    pub fn event_queue(&self) -> Option<QueueHandle> {
        self.resources
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| r.event_queue)
    }
}
