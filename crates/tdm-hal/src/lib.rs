//! Safe typed contract for the TDM gateway board/media SDK.
//!
//! The vendor library exposes boards, spans, analog interfaces, media
//! streams, and event queues through raw integer handles and C status
//! codes. This crate wraps that surface so the driver above it cannot
//! mix handle types, ignore failures, or guess at event identifiers.
//!
//! # Architecture
//!
//! - [`types`]: phantom-typed hardware handles
//! - [`error`]: status codes and error handling
//! - [`config`]: configuration records for every SDK object
//! - [`event`]: signaling/media event identifiers and ownership tags
//! - [`sdk`]: the [`sdk::TelephonySdk`] trait, the one contract the
//!   driver calls
//! - [`mock`]: an in-memory SDK for tests

pub mod config;
pub mod error;
pub mod event;
pub mod mock;
pub mod sdk;
pub mod types;

pub use config::{
    AgcParams, AudioEncoding, BoardConfig, BoardInfo, BoardList, BoardType, BuildOut, CompandMode,
    EcConfig, Framing, HdlcConfig, HdlcMode, HookState, InterfaceType, InternationalControl,
    LineEncoding, LoopLength, PhoneConfig, PlayConfig, RecordConfig, SamplingRate, SpanConfig,
    SystemConfig, TrunkConfig, VadParams,
};
pub use error::{SdkError, SdkResult, SdkStatus};
pub use event::{AttachTag, SdkEvent, SdkEventId};
pub use mock::MockSdk;
pub use sdk::{EventHandler, QueueMode, TelephonySdk};
pub use types::{
    BoardHandle, Handle, HandleKind, HdlcHandle, PhoneHandle, QueueHandle, RawHandle, SpanHandle,
    StreamHandle, SystemHandle, TrunkHandle,
};
