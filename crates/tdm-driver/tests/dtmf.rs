//! DTMF generation integration tests.
//!
//! Digit sequences flow through the queue-and-completion pipeline:
//! a send queues digits and stops playback, the play-idle completion
//! drains the queue into the tone generator on the worker thread, and
//! tone-played completions resume normal playback.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use tdm_driver::{
    ChannelCommand, ChannelIo, ChannelType, CommandOutcome, Span, TdmDriver, TrunkType,
};
use tdm_hal::{AttachTag, MockSdk, SdkEvent, SdkEventId, TelephonySdk};

fn driver_with(mock: MockSdk) -> (Arc<MockSdk>, TdmDriver) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
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

/// Polls until `pred` holds, panicking after two seconds. The tone
/// pipeline crosses a worker thread, so assertions need a grace
/// period.
fn wait_for(mut pred: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !pred() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_send_dtmf_reaches_tone_generator() {
    let (mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);
    let chan = span.channel(0).unwrap();

    let outcome = driver
        .command(chan, ChannelCommand::SendDtmf("1234".into()))
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Done);

    wait_for(|| mock.played_dtmf().concat() == "1234");
    driver.unload().unwrap();
}

#[test]
fn test_tone_played_resumes_playback() {
    let (mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);
    let chan = span.channel(0).unwrap();

    driver
        .command(chan, ChannelCommand::SendDtmf("5".into()))
        .unwrap();
    wait_for(|| mock.played_dtmf().concat() == "5");

    let before = mock.play_start_count();
    // p1 == 0 means no tones remain in the generator.
    mock.push_event(
        driver.media_out_queue(chan),
        SdkEvent::new(SdkEventId::TonePlayed)
            .with_tag(AttachTag::Channel(0))
            .with_params(0, 0, 0),
    );
    wait_for(|| mock.play_start_count() > before);
    driver.unload().unwrap();
}

#[test]
fn test_concurrent_senders_lose_no_digits() {
    let (mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);
    let chan = span.channel(0).unwrap();

    thread::scope(|s| {
        for digit in ["1", "2", "3", "4"] {
            let driver = &driver;
            s.spawn(move || {
                for _ in 0..25 {
                    driver
                        .command(chan, ChannelCommand::SendDtmf(digit.into()))
                        .unwrap();
                }
            });
        }
    });

    wait_for(|| mock.played_dtmf().concat().len() == 100);
    let played = mock.played_dtmf().concat();
    for digit in ['1', '2', '3', '4'] {
        assert_eq!(played.chars().filter(|&c| c == digit).count(), 25);
    }
    driver.unload().unwrap();
}

#[test]
fn test_dtmf_period_bounds() {
    let (_mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);
    let chan = span.channel(0).unwrap();

    assert!(driver
        .command(chan, ChannelCommand::SetDtmfOnPeriod(10))
        .is_err());
    assert_eq!(chan.last_error(), "invalid value 10 range 10-1000");
    assert!(driver
        .command(chan, ChannelCommand::SetDtmfOnPeriod(11))
        .is_ok());
    assert!(driver
        .command(chan, ChannelCommand::SetDtmfOnPeriod(999))
        .is_ok());
    assert!(driver
        .command(chan, ChannelCommand::SetDtmfOnPeriod(1000))
        .is_err());
    assert!(driver
        .command(chan, ChannelCommand::SetDtmfOffPeriod(0))
        .is_err());

    assert_eq!(
        driver.command(chan, ChannelCommand::GetDtmfOnPeriod).unwrap(),
        CommandOutcome::Value(999)
    );
}

#[test]
fn test_off_period_query_reports_on_period() {
    let (_mock, driver) = driver_with(MockSdk::one_analog_board());
    let span = fxo_span(&driver);
    let chan = span.channel(0).unwrap();

    driver
        .command(chan, ChannelCommand::SetDtmfOnPeriod(300))
        .unwrap();
    driver
        .command(chan, ChannelCommand::SetDtmfOffPeriod(80))
        .unwrap();

    assert_eq!(
        driver.command(chan, ChannelCommand::GetDtmfOffPeriod).unwrap(),
        CommandOutcome::Value(300)
    );
}
