//! Signaling event integration tests.
//!
//! Injects span-queue events through the mock SDK and checks the
//! poll/translate pipeline: alarm broadcast fan-out, the clear
//! cascade, channel-scoped hook and ring events, and the HDLC
//! message short-circuit into the read path.

use std::collections::BTreeSet;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tdm_driver::{
    alarm, chan_flag, ChannelIo, ChannelType, DriverError, OobEventKind, PollOutcome, Span,
    TdmDriver, TrunkType, WaitFlags, WaitOutcome,
};
use tdm_hal::{AttachTag, MockSdk, SdkEvent, SdkEventId, TelephonySdk};

fn driver_with(mock: MockSdk) -> (Arc<MockSdk>, TdmDriver) {
    let mock = Arc::new(mock);
    let driver = TdmDriver::init(Arc::clone(&mock) as Arc<dyn TelephonySdk>).unwrap();
    (mock, driver)
}

fn digital_span(driver: &TdmDriver) -> Span {
    let mut span = Span::new(1, TrunkType::T1);
    assert_eq!(
        driver.configure_span(&mut span, "0:0:1-2", ChannelType::BChannel, None, None),
        2
    );
    assert_eq!(
        driver.configure_span(&mut span, "0:0:16", ChannelType::Hdlc, None, None),
        1
    );
    span
}

#[test]
fn test_poll_times_out_when_idle() {
    let (_mock, driver) = driver_with(MockSdk::one_digital_board());
    let span = digital_span(&driver);

    assert_eq!(driver.poll_event(&span, 10).unwrap(), PollOutcome::Timeout);
}

#[test]
fn test_poll_on_unprovisioned_span_fails() {
    let (_mock, driver) = driver_with(MockSdk::one_digital_board());
    let span = Span::new(9, TrunkType::T1);

    assert!(matches!(
        driver.poll_event(&span, 10),
        Err(DriverError::SpanNotProvisioned { .. })
    ));
}

#[test]
fn test_span_alarm_fans_out_to_every_channel() {
    let (mock, driver) = driver_with(MockSdk::one_digital_board());
    let span = digital_span(&driver);

    mock.push_event(
        span.event_queue().unwrap(),
        SdkEvent::new(SdkEventId::SpanAlarmE1Rai).with_tag(AttachTag::Span),
    );
    assert_eq!(driver.poll_event(&span, 100).unwrap(), PollOutcome::Pending);

    let mut seen = BTreeSet::new();
    for _ in 0..3 {
        let ev = driver.next_event(&span).unwrap();
        assert_eq!(ev.kind, OobEventKind::AlarmTrap);
        seen.insert(ev.channel);
    }
    assert_eq!(seen, BTreeSet::from([0, 1, 2]));
    assert!(matches!(
        driver.next_event(&span),
        Err(DriverError::NoPendingEvent)
    ));

    for chan in span.channels() {
        assert_eq!(chan.alarm_bits(), alarm::RAI);
        assert_eq!(chan.last_error(), "RAI ALARM");
    }
}

#[test]
fn test_alarm_clear_reports_surviving_conditions() {
    let (mock, driver) = driver_with(MockSdk::one_digital_board());
    let span = digital_span(&driver);
    let chan = span.channel(0).unwrap();
    chan.raise_alarms(alarm::GENERAL);

    mock.push_event(
        span.event_queue().unwrap(),
        SdkEvent::new(SdkEventId::SpanAlarmT1RedClear).with_tag(AttachTag::Span),
    );
    assert_eq!(driver.poll_event(&span, 100).unwrap(), PollOutcome::Pending);

    let ev = driver.next_event(&span).unwrap();
    assert_eq!(ev.kind, OobEventKind::AlarmClear);
    let bits = span.channel(ev.channel).unwrap().alarm_bits();
    assert_eq!(bits & alarm::GENERAL, 0);
    assert_eq!(bits, alarm::RED | alarm::YELLOW | alarm::AIS | alarm::RAI);
}

#[test]
fn test_non_alarm_span_event_is_not_broadcast() {
    let (mock, driver) = driver_with(MockSdk::one_digital_board());
    let span = digital_span(&driver);

    mock.push_event(
        span.event_queue().unwrap(),
        SdkEvent::new(SdkEventId::SpanAbcdSignalChange).with_tag(AttachTag::Span),
    );
    assert_eq!(driver.poll_event(&span, 100).unwrap(), PollOutcome::Pending);
    assert!(matches!(
        driver.next_event(&span),
        Err(DriverError::NoPendingEvent)
    ));
}

#[test]
fn test_channel_scoped_ring_events() {
    let (mock, driver) = driver_with(MockSdk::one_analog_board());
    let mut span = Span::new(1, TrunkType::T1);
    assert_eq!(
        driver.configure_span(&mut span, "0:0:1-2", ChannelType::Fxo, None, None),
        2
    );

    let queue = span.event_queue().unwrap();
    mock.push_event(
        queue,
        SdkEvent::new(SdkEventId::TrunkRingOn).with_tag(AttachTag::Channel(1)),
    );
    assert_eq!(driver.poll_event(&span, 100).unwrap(), PollOutcome::Pending);
    let ev = driver.next_event(&span).unwrap();
    assert_eq!(ev.channel, 1);
    assert_eq!(ev.kind, OobEventKind::RingStart);

    mock.push_event(
        queue,
        SdkEvent::new(SdkEventId::TrunkRingOff).with_tag(AttachTag::Channel(1)),
    );
    driver.poll_event(&span, 100).unwrap();
    let ev = driver.next_event(&span).unwrap();
    assert_eq!(ev.kind, OobEventKind::RingStop);
}

#[test]
fn test_hook_events_track_offhook_flag() {
    let (mock, driver) = driver_with(MockSdk::one_analog_board());
    let mut span = Span::new(1, TrunkType::T1);
    assert_eq!(
        driver.configure_span(&mut span, "0:0:1", ChannelType::Fxs, None, None),
        1
    );
    let queue = span.event_queue().unwrap();
    let chan = span.channel(0).unwrap();

    mock.push_event(
        queue,
        SdkEvent::new(SdkEventId::PhoneOffHook).with_tag(AttachTag::Channel(0)),
    );
    driver.poll_event(&span, 100).unwrap();
    assert_eq!(driver.next_event(&span).unwrap().kind, OobEventKind::Offhook);
    assert!(chan.has_flag(chan_flag::OFFHOOK));

    mock.push_event(
        queue,
        SdkEvent::new(SdkEventId::PhoneOnHook).with_tag(AttachTag::Channel(0)),
    );
    driver.poll_event(&span, 100).unwrap();
    assert_eq!(driver.next_event(&span).unwrap().kind, OobEventKind::Onhook);
    assert!(!chan.has_flag(chan_flag::OFFHOOK));
}

#[test]
fn test_hdlc_message_feeds_the_read_path() {
    let (mock, driver) = driver_with(MockSdk::one_digital_board());
    let mut span = Span::new(1, TrunkType::T1);
    assert_eq!(
        driver.configure_span(&mut span, "0:0:16", ChannelType::Hdlc, None, None),
        1
    );
    let chan = span.channel(0).unwrap();

    mock.push_event(
        span.event_queue().unwrap(),
        SdkEvent::new(SdkEventId::HdlcMessage)
            .with_tag(AttachTag::Channel(0))
            .with_params(0, 0, 12),
    );
    assert_eq!(driver.poll_event(&span, 100).unwrap(), PollOutcome::Pending);
    // The frame notice is absorbed into the data path, not surfaced
    // as an out-of-band event.
    assert!(matches!(
        driver.next_event(&span),
        Err(DriverError::NoPendingEvent)
    ));

    assert_eq!(
        driver.wait(chan, WaitFlags::READ, 10).unwrap(),
        WaitOutcome::Ready(WaitFlags::READ)
    );

    mock.seed_hdlc_frame(0, vec![0xAA; 12]);
    let mut buf = [0u8; 64];
    let n = driver.read(chan, &mut buf).unwrap();
    assert_eq!(n, 12);
    assert_eq!(&buf[..12], &[0xAA; 12]);

    // Count consumed; the next wait goes back to the media queue.
    assert_eq!(
        driver.wait(chan, WaitFlags::READ, 10).unwrap(),
        WaitOutcome::Timeout
    );
}

#[test]
fn test_unmapped_channel_event_is_invalid() {
    let (mock, driver) = driver_with(MockSdk::one_analog_board());
    let mut span = Span::new(1, TrunkType::T1);
    driver.configure_span(&mut span, "0:0:1", ChannelType::Fxo, None, None);

    mock.push_event(
        span.event_queue().unwrap(),
        SdkEvent::new(SdkEventId::TrunkDialed).with_tag(AttachTag::Channel(0)),
    );
    driver.poll_event(&span, 100).unwrap();
    assert_eq!(driver.next_event(&span).unwrap().kind, OobEventKind::Invalid);
}
