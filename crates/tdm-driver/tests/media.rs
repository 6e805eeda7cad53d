//! Media data path integration tests: open, bounded waits, block
//! read/write, interval changes, and teardown.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tdm_driver::{
    Channel, ChannelCommand, ChannelIo, ChannelType, CommandOutcome, DriverError, Span, TdmDriver,
    TrunkType, WaitFlags, WaitOutcome,
};
use tdm_hal::{AttachTag, MockSdk, SdkEvent, SdkEventId, TelephonySdk};

fn driver_with(mock: MockSdk) -> (Arc<MockSdk>, TdmDriver) {
    let mock = Arc::new(mock);
    let driver = TdmDriver::init(Arc::clone(&mock) as Arc<dyn TelephonySdk>).unwrap();
    (mock, driver)
}

fn fxo_span(driver: &TdmDriver) -> Span {
    let mut span = Span::new(1, TrunkType::T1);
    assert_eq!(
        driver.configure_span(&mut span, "0:0:1", ChannelType::Fxo, None, None),
        1
    );
    span
}

#[test]
fn test_open_requires_provisioning() {
    let (_mock, driver) = driver_with(MockSdk::one_analog_board());
    let chan = Channel::new(0, ChannelType::Fxo);

    assert!(matches!(
        driver.open(&chan),
        Err(DriverError::ChannelNotReady { .. })
    ));
}

#[test]
fn test_open_starts_playback() {
    let (mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);
    let chan = span.channel(0).unwrap();

    let before = mock.play_start_count();
    driver.open(chan).unwrap();
    assert_eq!(mock.play_start_count(), before + 1);
    driver.close(chan).unwrap();
}

#[test]
fn test_wait_read_then_read_block() {
    let (mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);
    let chan = span.channel(0).unwrap();
    let (media_in, _media_out) = driver.media_streams(chan);

    mock.seed_record_block(media_in, vec![7u8; 160]);
    mock.push_event(
        driver.media_in_queue(chan),
        SdkEvent::new(SdkEventId::RecordData)
            .with_tag(AttachTag::Channel(0))
            .with_params(160, 0, 0),
    );

    assert_eq!(
        driver.wait(chan, WaitFlags::READ, 100).unwrap(),
        WaitOutcome::Ready(WaitFlags::READ)
    );
    let mut buf = [0u8; 320];
    let n = driver.read(chan, &mut buf).unwrap();
    assert_eq!(n, 160);
    assert_eq!(&buf[..160], &[7u8; 160][..]);
}

#[test]
fn test_wait_without_read_flag_is_immediate() {
    let (_mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);
    let chan = span.channel(0).unwrap();

    assert_eq!(
        driver.wait(chan, WaitFlags::WRITE, 5000).unwrap(),
        WaitOutcome::Ready(WaitFlags::NONE)
    );
}

#[test]
fn test_wait_treats_overflow_as_timeout() {
    let (mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);
    let chan = span.channel(0).unwrap();

    mock.push_event(
        driver.media_in_queue(chan),
        SdkEvent::new(SdkEventId::RecordBufferOverflow).with_tag(AttachTag::Channel(0)),
    );
    assert_eq!(
        driver.wait(chan, WaitFlags::READ, 100).unwrap(),
        WaitOutcome::Timeout
    );
}

#[test]
fn test_write_appends_play_data() {
    let (mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);
    let chan = span.channel(0).unwrap();
    let (_media_in, media_out) = driver.media_streams(chan);

    let n = driver.write(chan, b"abcd").unwrap();
    assert_eq!(n, 4);
    assert_eq!(mock.play_data(media_out), b"abcd".to_vec());
}

#[test]
fn test_hdlc_write_sends_frame() {
    let (mock, driver) = driver_with(MockSdk::one_digital_board());
    let mut span = Span::new(1, TrunkType::T1);
    assert_eq!(
        driver.configure_span(&mut span, "0:0:16", ChannelType::Hdlc, None, None),
        1
    );
    let chan = span.channel(0).unwrap();

    let n = driver.write(chan, &[0x01, 0x7e, 0x03]).unwrap();
    assert_eq!(n, 3);
    assert_eq!(mock.sent_hdlc_frames(0), vec![vec![0x01, 0x7e, 0x03]]);
}

#[test]
fn test_interval_commands() {
    let (_mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);
    let chan = span.channel(0).unwrap();

    assert_eq!(
        driver.command(chan, ChannelCommand::GetInterval).unwrap(),
        CommandOutcome::Value(20)
    );
    assert_eq!(
        driver.command(chan, ChannelCommand::SetInterval(30)).unwrap(),
        CommandOutcome::Done
    );
    assert_eq!(chan.packet_len(), 240);
    assert_eq!(
        driver.command(chan, ChannelCommand::GetInterval).unwrap(),
        CommandOutcome::Value(30)
    );
}

#[test]
fn test_channel_destroy_releases_device() {
    let (mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);
    let chan = span.channel(0).unwrap();

    driver.channel_destroy(&span, chan).unwrap();
    assert!(!chan.is_ready());
    // A destroyed trunk no longer accepts hook commands.
    assert!(driver.command(chan, ChannelCommand::Offhook).is_err());
    assert!(mock.hook_log().is_empty());

    // Destroy is idempotent on an already-released channel.
    driver.channel_destroy(&span, chan).unwrap();
}

#[test]
fn test_span_destroy_drops_event_queue() {
    let (_mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);

    assert!(span.event_queue().is_some());
    driver.span_destroy(&span).unwrap();
    assert!(span.event_queue().is_none());
    driver.span_destroy(&span).unwrap();
}

#[test]
fn test_hook_and_ring_commands() {
    let (mock, driver) = driver_with(MockSdk::one_analog_board());
    let mut span = Span::new(1, TrunkType::T1);
    driver.configure_span(&mut span, "0:0:1", ChannelType::Fxo, None, None);
    driver.configure_span(&mut span, "0:0:2", ChannelType::Fxs, None, None);
    let trunk = span.channel(0).unwrap();
    let phone = span.channel(1).unwrap();

    driver.command(trunk, ChannelCommand::Offhook).unwrap();
    assert!(trunk.has_flag(tdm_driver::chan_flag::OFFHOOK));
    driver.command(trunk, ChannelCommand::Onhook).unwrap();
    assert!(!trunk.has_flag(tdm_driver::chan_flag::OFFHOOK));
    assert_eq!(mock.hook_log().len(), 2);

    driver.command(phone, ChannelCommand::RingOn).unwrap();
    driver.command(phone, ChannelCommand::RingOff).unwrap();
    assert_eq!(mock.ring_counts(), (1, 1));

    // Cross-type commands are rejected.
    assert!(driver.command(phone, ChannelCommand::Offhook).is_err());
    assert!(driver.command(trunk, ChannelCommand::RingOn).is_err());
}
