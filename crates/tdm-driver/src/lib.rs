//! Channel/span driver for TDM gateway boards.
//!
//! The driver sits between a telephony stack and the vendor board SDK
//! (wrapped by the `tdm-hal` crate). It provisions channels from
//! descriptor strings, manages span and channel lifecycle, translates
//! hardware signaling events into a small out-of-band vocabulary, and
//! carries media and HDLC traffic.
//!
//! # Architecture
//!
//! - [`driver`]: the [`driver::TdmDriver`] context and the
//!   [`driver::ChannelIo`] contract
//! - [`profile`]: named configuration profiles
//! - [`span`] / [`channel`]: runtime state for provisioned hardware
//! - [`command`]: the channel control command surface
//! - [`types`]: channel kinds, flags, and event vocabulary
//!
//! Provisioning, I/O, event translation, and DTMF generation live in
//! private modules behind the [`driver::ChannelIo`] methods.

pub mod channel;
pub mod command;
pub mod driver;
pub mod error;
mod event;
mod io;
mod media;
pub mod profile;
mod registry;
pub mod span;
pub mod types;

pub use channel::{Channel, DeviceHandle, DigitBuffer};
pub use command::{ChannelCommand, CommandOutcome};
pub use driver::{
    ChannelIo, TdmDriver, BLOCK_LEN_MS, BLOCK_SIZE, MAX_BOARDS, NUM_BUFFERS, SAMPLE_RATE_HZ,
};
pub use error::{DriverError, DriverResult};
pub use profile::{Profile, ProfileStore, Region};
pub use span::{Span, SpanResources};
pub use types::{
    alarm, chan_flag, ChannelType, OobEvent, OobEventKind, PollOutcome, TrunkType, WaitFlags,
    WaitOutcome,
};
