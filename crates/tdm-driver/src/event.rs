//! Span event polling and out-of-band event translation.
//!
//! `poll_event` blocks on the span's shared signaling queue and flags
//! the channels an event belongs to; `next_event` then walks the span
//! in slot order, translating the first pending hardware event into
//! the caller-facing out-of-band vocabulary. Alarm events fan out to
//! every channel on the span.

use tdm_hal::{AttachTag, SdkEvent, SdkEventId};
use tracing::debug;

use crate::channel::Channel;
use crate::driver::TdmDriver;
use crate::error::{DriverError, DriverResult};
use crate::span::Span;
use crate::types::{alarm, chan_flag, OobEvent, OobEventKind, PollOutcome};

/// Alarm-clear chain. A clear event applies its own entry and every
/// entry after it before clearing the general alarm bit.
const CLEAR_CHAIN: &[(SdkEventId, u32)] = &[
    (SdkEventId::SpanAlarmT1RedClear, alarm::RED),
    (SdkEventId::SpanAlarmT1YellowClear, alarm::YELLOW),
    (SdkEventId::SpanAlarmT1AisClear, alarm::AIS),
    (SdkEventId::SpanAlarmE1RedClear, alarm::RED),
    (SdkEventId::SpanAlarmE1RaiClear, alarm::RAI),
    (SdkEventId::SpanAlarmE1AisClear, alarm::AIS),
    (SdkEventId::SpanAlarmE1RmaiClear, 0),
    (SdkEventId::SpanAlarmE1Ts16AisClear, 0),
    (SdkEventId::SpanAlarmE1Ts16LosClear, 0),
    (SdkEventId::SpanInSync, 0),
    (SdkEventId::SpanLossOfSignalClear, 0),
    (SdkEventId::SpanInCrcMfSync, 0),
    (SdkEventId::SpanInCasMfSync, 0),
];

fn is_alarm_broadcast(id: SdkEventId) -> bool {
    matches!(
        id,
        SdkEventId::SpanAlarmT1Red
            | SdkEventId::SpanAlarmT1Yellow
            | SdkEventId::SpanAlarmT1Ais
            | SdkEventId::SpanAlarmE1Red
            | SdkEventId::SpanAlarmE1Rai
            | SdkEventId::SpanAlarmE1Ais
            | SdkEventId::SpanAlarmE1Rmai
            | SdkEventId::SpanAlarmE1Ts16Ais
            | SdkEventId::SpanAlarmE1Ts16Los
            | SdkEventId::SpanOutOfSync
            | SdkEventId::SpanFramingError
            | SdkEventId::SpanLossOfSignal
            | SdkEventId::SpanOutOfCrcMfSync
            | SdkEventId::SpanOutOfCasMfSync
    ) || CLEAR_CHAIN.iter().any(|(clear, _)| *clear == id)
}

impl TdmDriver {
    pub(crate) fn poll_event_impl(&self, span: &Span, timeout_ms: u32) -> DriverResult<PollOutcome> {
        let event_queue = span
            .event_queue()
            .ok_or_else(|| DriverError::span_not_provisioned(span.id()))?;

        let event = self.sdk.queue_wait(event_queue, timeout_ms)?;
        if let Some(res) = span.resources().as_mut() {
            res.last_event = Some(event);
        }
        if event.is_timeout() {
            return Ok(PollOutcome::Timeout);
        }
        debug!("span {} event: {}", span.id(), event.id);

        match event.tag {
            Some(AttachTag::Channel(slot)) => {
                if let Some(chan) = span.channel(slot) {
                    mark_pending(chan, event);
                }
            }
            Some(AttachTag::Span) | None => {
                // Only alarm family events fan out; span messages and
                // ABCD transitions are recorded but flag no channel.
                if is_alarm_broadcast(event.id) {
                    for chan in span.channels() {
                        mark_pending(chan, event);
                    }
                }
            }
        }
        Ok(PollOutcome::Pending)
    }

    pub(crate) fn next_event_impl(&self, span: &Span) -> DriverResult<OobEvent> {
        for chan in span.channels() {
            if !chan.has_flag(chan_flag::EVENT) {
                continue;
            }
            chan.clear_flags(chan_flag::EVENT);

            let event = match chan.state().last_oob_event {
                Some(event) => event,
                None => continue,
            };

            let kind = match event.id {
                // Signaling frames are not surfaced as events; note
                // the byte count for the read path and keep scanning.
                SdkEventId::HdlcMessage => {
                    chan.state().hdlc_bytes = event.p2;
                    continue;
                }
                SdkEventId::TrunkHookFlash => OobEventKind::Flash,
                SdkEventId::TrunkRingOff => OobEventKind::RingStop,
                SdkEventId::TrunkRingOn => OobEventKind::RingStart,
                SdkEventId::PhoneOffHook => {
                    chan.set_flags(chan_flag::OFFHOOK);
                    OobEventKind::Offhook
                }
                SdkEventId::TrunkBelowThreshold
                | SdkEventId::TrunkAboveThreshold
                | SdkEventId::PhoneOnHook => {
                    chan.clear_flags(chan_flag::OFFHOOK);
                    OobEventKind::Onhook
                }
                SdkEventId::SpanAlarmT1Red | SdkEventId::SpanAlarmE1Red => {
                    raise(chan, alarm::RED, "RED ALARM")
                }
                SdkEventId::SpanAlarmT1Yellow => raise(chan, alarm::YELLOW, "YELLOW ALARM"),
                SdkEventId::SpanAlarmT1Ais | SdkEventId::SpanAlarmE1Ais => {
                    raise(chan, alarm::AIS, "AIS ALARM")
                }
                SdkEventId::SpanAlarmE1Rai => raise(chan, alarm::RAI, "RAI ALARM"),
                SdkEventId::SpanAlarmE1Rmai
                | SdkEventId::SpanAlarmE1Ts16Ais
                | SdkEventId::SpanAlarmE1Ts16Los
                | SdkEventId::SpanOutOfSync
                | SdkEventId::SpanFramingError
                | SdkEventId::SpanLossOfSignal
                | SdkEventId::SpanOutOfCrcMfSync
                | SdkEventId::SpanOutOfCasMfSync => raise(chan, alarm::GENERAL, "GENERAL ALARM"),
                id if CLEAR_CHAIN.iter().any(|(clear, _)| *clear == id) => {
                    apply_clear_chain(chan, id);
                    OobEventKind::AlarmClear
                }
                SdkEventId::SpanMessage | SdkEventId::SpanAbcdSignalChange => OobEventKind::Invalid,
                id => {
                    debug!(
                        "unhandled event {} on channel {}",
                        id,
                        chan.slot()
                    );
                    OobEventKind::Invalid
                }
            };

            chan.clear_event_time();
            return Ok(OobEvent {
                channel: chan.slot(),
                kind,
            });
        }
        Err(DriverError::NoPendingEvent)
    }
}

fn mark_pending(chan: &Channel, event: SdkEvent) {
    chan.set_flags(chan_flag::EVENT);
    chan.touch_event_time();
    chan.state().last_oob_event = Some(event);
}

fn raise(chan: &Channel, bit: u32, text: &str) -> OobEventKind {
    chan.raise_alarms(bit);
    chan.set_last_error(text);
    OobEventKind::AlarmTrap
}

/// Applies the clear event's chain entry and every entry after it,
/// then drops the general alarm bit.
fn apply_clear_chain(chan: &Channel, id: SdkEventId) {
    if let Some(pos) = CLEAR_CHAIN.iter().position(|(clear, _)| *clear == id) {
        for (_, bit) in &CLEAR_CHAIN[pos..] {
            if *bit != 0 {
                chan.raise_alarms(*bit);
            }
        }
    }
    chan.clear_alarms(alarm::GENERAL);
}
