//! Core driver vocabulary: channel kinds, status flags, alarm bits,
//! wait flags, and the out-of-band event surface handed to callers.

use std::fmt;

/// What a provisioned channel is, which decides the SDK objects that
/// back it and how descriptor indices are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
    /// Analog station interface (phone side).
    Fxs,
    /// Analog trunk interface (line side).
    Fxo,
    /// Digital bearer timeslot.
    BChannel,
    /// Digital signaling timeslot carried over an HDLC framer.
    Hdlc,
}

impl ChannelType {
    /// Returns true for channel types that carry voice media.
    pub fn is_voice(&self) -> bool {
        !matches!(self, ChannelType::Hdlc)
    }

    /// Returns true for the analog channel types, whose descriptor
    /// indices are one-based.
    pub fn is_analog(&self) -> bool {
        matches!(self, ChannelType::Fxs | ChannelType::Fxo)
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelType::Fxs => "FXS",
            ChannelType::Fxo => "FXO",
            ChannelType::BChannel => "B",
            ChannelType::Hdlc => "DQ921",
        };
        write!(f, "{}", s)
    }
}

/// Digital trunk flavor of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrunkType {
    #[default]
    T1,
    E1,
}

impl fmt::Display for TrunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrunkType::T1 => "T1",
            TrunkType::E1 => "E1",
        };
        write!(f, "{}", s)
    }
}

/// Channel status flag bits, stored in one atomic word per channel.
pub mod chan_flag {
    /// Provisioning finished and the channel is usable.
    pub const READY: u32 = 1 << 0;
    /// An out-of-band event is pending for this channel.
    pub const EVENT: u32 = 1 << 1;
    /// The hook switch is off hook.
    pub const OFFHOOK: u32 = 1 << 2;
    /// Ringing is in progress on an FXS channel.
    pub const RINGING: u32 = 1 << 3;
    /// Queued DTMF digits are generated by the hardware tone player.
    pub const DTMF_GENERATE: u32 = 1 << 4;
}

/// Alarm condition bits, stored in one atomic word per channel.
pub mod alarm {
    pub const RED: u32 = 1 << 0;
    pub const YELLOW: u32 = 1 << 1;
    pub const RAI: u32 = 1 << 2;
    pub const AIS: u32 = 1 << 3;
    pub const GENERAL: u32 = 1 << 4;
}

/// Readiness directions for [`crate::driver::ChannelIo::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaitFlags(u32);

impl WaitFlags {
    pub const NONE: WaitFlags = WaitFlags(0);
    pub const READ: WaitFlags = WaitFlags(1 << 0);
    pub const WRITE: WaitFlags = WaitFlags(1 << 1);
    pub const EVENTS: WaitFlags = WaitFlags(1 << 2);

    /// Returns true if every bit of `other` is set in `self`.
    pub fn contains(&self, other: WaitFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of the two flag sets.
    pub fn union(&self, other: WaitFlags) -> WaitFlags {
        WaitFlags(self.0 | other.0)
    }

    /// Returns true if no direction is requested.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Outcome of a bounded channel wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The channel is ready in the reported directions.
    Ready(WaitFlags),
    /// The wait expired with nothing ready.
    Timeout,
}

/// Outcome of a bounded span event poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// At least one channel now holds a pending event.
    Pending,
    /// The poll expired with no event delivered.
    Timeout,
}

/// Out-of-band event categories reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OobEventKind {
    Onhook,
    Offhook,
    Flash,
    RingStart,
    RingStop,
    /// An alarm condition was raised; the channel's alarm bits and
    /// last-error text carry the detail.
    AlarmTrap,
    /// An alarm condition cleared.
    AlarmClear,
    /// Recognized but unmapped hardware event.
    Invalid,
}

impl fmt::Display for OobEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OobEventKind::Onhook => "onhook",
            OobEventKind::Offhook => "offhook",
            OobEventKind::Flash => "flash",
            OobEventKind::RingStart => "ring_start",
            OobEventKind::RingStop => "ring_stop",
            OobEventKind::AlarmTrap => "alarm_trap",
            OobEventKind::AlarmClear => "alarm_clear",
            OobEventKind::Invalid => "invalid",
        };
        write!(f, "{}", s)
    }
}

/// One translated out-of-band event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OobEvent {
    /// Slot index of the channel the event belongs to.
    pub channel: u32,
    pub kind: OobEventKind,
}
