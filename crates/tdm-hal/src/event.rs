//! Signaling and media event identifiers.
//!
//! Every asynchronous notification the SDK produces is delivered as an
//! [`SdkEvent`] through an event queue (or a callback handler for
//! callback-kind queues). The `tag` echoes the ownership tag supplied
//! when the emitting object was attached to the queue, so a consumer
//! can tell channel-scoped events from span-scoped ones.

use std::fmt;

/// Vendor event identifiers observed by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkEventId {
    /// Queue wait expired with nothing delivered.
    QueueTimeout,
    /// Inbound media arrived faster than the consumer drained it.
    RecordBufferOverflow,
    /// An inbound media block is ready.
    RecordData,
    /// The outbound play object ran out of queued audio.
    PlayIdle,
    /// A generated tone finished playing.
    TonePlayed,
    /// An HDLC frame arrived; p2 carries the byte count.
    HdlcMessage,

    TrunkHookFlash,
    TrunkRingOn,
    TrunkRingOff,
    TrunkAboveThreshold,
    TrunkBelowThreshold,
    TrunkOnHook,
    TrunkOffHook,
    TrunkDialed,
    TrunkReversal,
    TrunkLcso,
    TrunkDropout,
    TrunkLof,
    TrunkRxOverload,

    PhoneOffHook,
    PhoneOnHook,

    SpanAlarmT1Red,
    SpanAlarmT1Yellow,
    SpanAlarmT1Ais,
    SpanAlarmE1Red,
    SpanAlarmE1Rai,
    SpanAlarmE1Ais,
    SpanAlarmE1Rmai,
    SpanAlarmE1Ts16Ais,
    SpanAlarmE1Ts16Los,
    SpanOutOfSync,
    SpanFramingError,
    SpanLossOfSignal,
    SpanOutOfCrcMfSync,
    SpanOutOfCasMfSync,

    SpanAlarmT1RedClear,
    SpanAlarmT1YellowClear,
    SpanAlarmT1AisClear,
    SpanAlarmE1RedClear,
    SpanAlarmE1RaiClear,
    SpanAlarmE1AisClear,
    SpanAlarmE1RmaiClear,
    SpanAlarmE1Ts16AisClear,
    SpanAlarmE1Ts16LosClear,
    SpanInSync,
    SpanLossOfSignalClear,
    SpanInCrcMfSync,
    SpanInCasMfSync,

    SpanMessage,
    SpanAbcdSignalChange,
}

impl fmt::Display for SdkEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SdkEventId::QueueTimeout => "EVENT_QUEUE_TIMEOUT",
            SdkEventId::RecordBufferOverflow => "EVENT_RECORD_BUFFER_OVERFLOW",
            SdkEventId::RecordData => "EVENT_RECORD_DATA",
            SdkEventId::PlayIdle => "EVENT_PLAY_IDLE",
            SdkEventId::TonePlayed => "EVENT_TG_TONE_PLAYED",
            SdkEventId::HdlcMessage => "EVENT_HDLC_MESSAGE",
            SdkEventId::TrunkHookFlash => "EVENT_TRUNK_HOOKFLASH",
            SdkEventId::TrunkRingOn => "EVENT_TRUNK_RING_ON",
            SdkEventId::TrunkRingOff => "EVENT_TRUNK_RING_OFF",
            SdkEventId::TrunkAboveThreshold => "EVENT_TRUNK_ABOVE_THRESHOLD",
            SdkEventId::TrunkBelowThreshold => "EVENT_TRUNK_BELOW_THRESHOLD",
            SdkEventId::TrunkOnHook => "EVENT_TRUNK_ONHOOK",
            SdkEventId::TrunkOffHook => "EVENT_TRUNK_OFFHOOK",
            SdkEventId::TrunkDialed => "EVENT_TRUNK_DIALED",
            SdkEventId::TrunkReversal => "EVENT_TRUNK_REVERSAL",
            SdkEventId::TrunkLcso => "EVENT_TRUNK_LCSO",
            SdkEventId::TrunkDropout => "EVENT_TRUNK_DROPOUT",
            SdkEventId::TrunkLof => "EVENT_TRUNK_LOF",
            SdkEventId::TrunkRxOverload => "EVENT_TRUNK_RX_OVERLOAD",
            SdkEventId::PhoneOffHook => "EVENT_PHONE_OFFHOOK",
            SdkEventId::PhoneOnHook => "EVENT_PHONE_ONHOOK",
            SdkEventId::SpanAlarmT1Red => "EVENT_SPAN_ALARM_T1_RED",
            SdkEventId::SpanAlarmT1Yellow => "EVENT_SPAN_ALARM_T1_YELLOW",
            SdkEventId::SpanAlarmT1Ais => "EVENT_SPAN_ALARM_T1_AIS",
            SdkEventId::SpanAlarmE1Red => "EVENT_SPAN_ALARM_E1_RED",
            SdkEventId::SpanAlarmE1Rai => "EVENT_SPAN_ALARM_E1_RAI",
            SdkEventId::SpanAlarmE1Ais => "EVENT_SPAN_ALARM_E1_AIS",
            SdkEventId::SpanAlarmE1Rmai => "EVENT_SPAN_ALARM_E1_RMAI",
            SdkEventId::SpanAlarmE1Ts16Ais => "EVENT_SPAN_ALARM_E1_TS16AIS",
            SdkEventId::SpanAlarmE1Ts16Los => "EVENT_SPAN_ALARM_E1_TS16LOS",
            SdkEventId::SpanOutOfSync => "EVENT_SPAN_OUT_OF_SYNC",
            SdkEventId::SpanFramingError => "EVENT_SPAN_FRAMING_ERROR",
            SdkEventId::SpanLossOfSignal => "EVENT_SPAN_LOSS_OF_SIGNAL",
            SdkEventId::SpanOutOfCrcMfSync => "EVENT_SPAN_OUT_OF_CRC_MF_SYNC",
            SdkEventId::SpanOutOfCasMfSync => "EVENT_SPAN_OUT_OF_CAS_MF_SYNC",
            SdkEventId::SpanAlarmT1RedClear => "EVENT_SPAN_ALARM_T1_RED_CLEAR",
            SdkEventId::SpanAlarmT1YellowClear => "EVENT_SPAN_ALARM_T1_YELLOW_CLEAR",
            SdkEventId::SpanAlarmT1AisClear => "EVENT_SPAN_ALARM_T1_AIS_CLEAR",
            SdkEventId::SpanAlarmE1RedClear => "EVENT_SPAN_ALARM_E1_RED_CLEAR",
            SdkEventId::SpanAlarmE1RaiClear => "EVENT_SPAN_ALARM_E1_RAI_CLEAR",
            SdkEventId::SpanAlarmE1AisClear => "EVENT_SPAN_ALARM_E1_AIS_CLEAR",
            SdkEventId::SpanAlarmE1RmaiClear => "EVENT_SPAN_ALARM_E1_RMAI_CLEAR",
            SdkEventId::SpanAlarmE1Ts16AisClear => "EVENT_SPAN_ALARM_E1_TS16AIS_CLEAR",
            SdkEventId::SpanAlarmE1Ts16LosClear => "EVENT_SPAN_ALARM_E1_TS16LOS_CLEAR",
            SdkEventId::SpanInSync => "EVENT_SPAN_IN_SYNC",
            SdkEventId::SpanLossOfSignalClear => "EVENT_SPAN_LOSS_OF_SIGNAL_CLEAR",
            SdkEventId::SpanInCrcMfSync => "EVENT_SPAN_IN_CRC_MF_SYNC",
            SdkEventId::SpanInCasMfSync => "EVENT_SPAN_IN_CAS_MF_SYNC",
            SdkEventId::SpanMessage => "EVENT_SPAN_MESSAGE",
            SdkEventId::SpanAbcdSignalChange => "EVENT_SPAN_ABCD_SIGNAL_CHANGE",
        };
        write!(f, "{}", s)
    }
}

/// Ownership tag supplied at queue-attach time.
///
/// The SDK echoes it back in every event delivered from the attached
/// object, letting the consumer route channel-scoped and span-scoped
/// events without inspecting the event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachTag {
    /// Event targets one channel, identified by its slot index.
    Channel(u32),
    /// Event targets the whole span.
    Span,
}

/// One delivered SDK event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdkEvent {
    pub id: SdkEventId,
    /// Ownership tag of the emitting object, if it was attached with one.
    pub tag: Option<AttachTag>,
    /// First event parameter (media block size for record events).
    pub p0: u32,
    /// Second event parameter (remaining tone count for tone events).
    pub p1: u32,
    /// Third event parameter (byte count for HDLC message events).
    pub p2: u32,
}

impl SdkEvent {
    /// Creates an event with zeroed parameters.
    pub fn new(id: SdkEventId) -> Self {
        Self {
            id,
            tag: None,
            p0: 0,
            p1: 0,
            p2: 0,
        }
    }

    /// The distinguished queue-timeout event.
    pub fn timeout() -> Self {
        Self::new(SdkEventId::QueueTimeout)
    }

    /// Sets the ownership tag.
    pub fn with_tag(mut self, tag: AttachTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Sets the event parameters.
    pub fn with_params(mut self, p0: u32, p1: u32, p2: u32) -> Self {
        self.p0 = p0;
        self.p1 = p1;
        self.p2 = p2;
        self
    }

    /// Returns true if this is the queue-timeout marker.
    pub fn is_timeout(&self) -> bool {
        self.id == SdkEventId::QueueTimeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builders() {
        let ev = SdkEvent::new(SdkEventId::HdlcMessage)
            .with_tag(AttachTag::Channel(3))
            .with_params(0, 0, 12);
        assert_eq!(ev.tag, Some(AttachTag::Channel(3)));
        assert_eq!(ev.p2, 12);
        assert!(!ev.is_timeout());
        assert!(SdkEvent::timeout().is_timeout());
    }

    #[test]
    fn test_event_names() {
        assert_eq!(
            SdkEventId::SpanAlarmE1Ts16Los.to_string(),
            "EVENT_SPAN_ALARM_E1_TS16LOS"
        );
        assert_eq!(SdkEventId::PlayIdle.to_string(), "EVENT_PLAY_IDLE");
    }
}
