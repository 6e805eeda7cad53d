//! Provisioning integration tests against the mock SDK.
//!
//! Covers descriptor parsing, analog/digital index handling, partial
//! bring-up failures, profile application, and the E1 line lock.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tdm_driver::{chan_flag, ChannelIo, ChannelType, Span, TdmDriver, TrunkType};
use tdm_hal::{AudioEncoding, InterfaceType, MockSdk, TelephonySdk};

fn driver_with(mock: MockSdk) -> (Arc<MockSdk>, TdmDriver) {
    let mock = Arc::new(mock);
    let driver = TdmDriver::init(Arc::clone(&mock) as Arc<dyn TelephonySdk>).unwrap();
    (mock, driver)
}

#[test]
fn test_analog_descriptor_is_one_based() {
    let (_mock, driver) = driver_with(MockSdk::one_analog_board());
    let mut span = Span::new(1, TrunkType::T1);

    let configured = driver.configure_span(&mut span, "0:0:1-2", ChannelType::Fxo, Some("fxo"), Some("100"));

    assert_eq!(configured, 2);
    assert_eq!(span.channels().len(), 2);
    // Descriptor indices 1-2 land on hardware devices 0 and 1.
    assert_eq!(span.channel(0).unwrap().device_address(), (0, 0, 0));
    assert_eq!(span.channel(1).unwrap().device_address(), (0, 0, 1));
    assert_eq!(span.channel(0).unwrap().name(), "fxo");
    assert_eq!(span.channel(0).unwrap().number(), "100");
    assert_eq!(span.channel(0).unwrap().codec(), AudioEncoding::MuLaw);
    assert_eq!(span.channel(0).unwrap().packet_len(), 160);
    assert_eq!(span.channel(0).unwrap().native_interval(), 20);
}

#[test]
fn test_digital_descriptor_uses_timeslots_as_written() {
    let (_mock, driver) = driver_with(MockSdk::one_digital_board());
    let mut span = Span::new(1, TrunkType::T1);

    let configured =
        driver.configure_span(&mut span, "0:0:1-2", ChannelType::BChannel, None, None);

    assert_eq!(configured, 2);
    assert_eq!(span.channel(0).unwrap().device_address(), (0, 0, 1));
    assert_eq!(span.channel(1).unwrap().device_address(), (0, 0, 2));
}

#[test]
fn test_partial_failure_skips_slot_and_counts_rest() {
    let mock = MockSdk::one_digital_board();
    mock.fail_nth_call("span_seize_timeslot", 4);
    let (_mock, driver) = driver_with(mock);
    let mut span = Span::new(1, TrunkType::T1);

    let configured =
        driver.configure_span(&mut span, "0:0:1-5", ChannelType::BChannel, None, None);

    // The failed slot stays on the span but never becomes ready.
    assert_eq!(configured, 4);
    assert_eq!(span.channels().len(), 5);
    let ready: Vec<u32> = span
        .channels()
        .iter()
        .filter(|c| c.is_ready())
        .map(|c| c.slot())
        .collect();
    assert_eq!(ready, vec![0, 1, 2, 4]);
}

#[test]
fn test_eu_profile_locks_span_into_e1() {
    let (mock, driver) = driver_with(MockSdk::one_digital_board());
    driver.configure("euro", "region", "eu").unwrap();
    let mut span = Span::new(1, TrunkType::T1);

    let configured =
        driver.configure_span(&mut span, "0:0:16@euro", ChannelType::Hdlc, None, None);

    assert_eq!(configured, 1);
    assert_eq!(span.trunk_type(), TrunkType::E1);
    assert_eq!(mock.board_interface(0), InterfaceType::E1);
}

#[test]
fn test_e1_lock_survives_later_t1_requests() {
    let (mock, driver) = driver_with(MockSdk::one_digital_board());
    driver.configure("euro", "region", "eu").unwrap();
    let mut span = Span::new(1, TrunkType::T1);

    assert_eq!(
        driver.configure_span(&mut span, "0:0:16@euro", ChannelType::Hdlc, None, None),
        1
    );
    // A later request without the EU profile cannot undo the lock.
    let configured =
        driver.configure_span(&mut span, "0:0:1-2", ChannelType::BChannel, None, None);

    assert_eq!(configured, 2);
    assert_eq!(span.trunk_type(), TrunkType::E1);
    assert_eq!(mock.board_interface(0), InterfaceType::E1);
    assert_eq!(span.channel(1).unwrap().codec(), AudioEncoding::ALaw);
}

#[test]
fn test_b_channel_codec_follows_span_compand_mode() {
    let (_mock, driver) = driver_with(MockSdk::one_digital_board());
    driver.configure("euro", "region", "eu").unwrap();
    let mut span = Span::new(1, TrunkType::T1);

    driver.configure_span(&mut span, "0:0:16@euro", ChannelType::Hdlc, None, None);
    let configured =
        driver.configure_span(&mut span, "0:0:1-2", ChannelType::BChannel, None, None);

    assert_eq!(configured, 2);
    // The E1 line template companding is A-law.
    assert_eq!(span.channel(1).unwrap().codec(), AudioEncoding::ALaw);
    assert_eq!(span.channel(2).unwrap().codec(), AudioEncoding::ALaw);
}

#[test]
fn test_unknown_profile_reference_is_ignored() {
    let (_mock, driver) = driver_with(MockSdk::one_analog_board());
    let mut span = Span::new(1, TrunkType::T1);

    let configured =
        driver.configure_span(&mut span, "0:0:1@missing", ChannelType::Fxo, None, None);

    assert_eq!(configured, 1);
    assert_eq!(span.channel(0).unwrap().codec(), AudioEncoding::MuLaw);
}

#[test]
fn test_absent_board_configures_nothing() {
    let (_mock, driver) = driver_with(MockSdk::one_analog_board());
    let mut span = Span::new(1, TrunkType::T1);

    let configured = driver.configure_span(&mut span, "7:0:1", ChannelType::Fxo, None, None);

    assert_eq!(configured, 0);
    assert!(span.channels().is_empty());
}

#[test]
fn test_malformed_descriptor_entries_are_skipped() {
    let (_mock, driver) = driver_with(MockSdk::one_analog_board());
    let mut span = Span::new(1, TrunkType::T1);

    let configured =
        driver.configure_span(&mut span, "0:1,bogus,0:0:2", ChannelType::Fxo, None, None);

    assert_eq!(configured, 1);
    assert_eq!(span.channels().len(), 1);
}

#[test]
fn test_init_requires_boards() {
    let mock: Arc<dyn TelephonySdk> = Arc::new(MockSdk::with_boards(Vec::new()));
    assert!(TdmDriver::init(mock).is_err());
}

#[test]
fn test_init_restores_board_interface() {
    let (mock, driver) = driver_with(MockSdk::one_digital_board());
    // Template capture flips the board to E1 and back.
    assert_eq!(mock.board_interface(0), InterfaceType::T1);
    assert_eq!(driver.board_count(), 1);
}

#[test]
fn test_configure_feeds_profile_store() {
    let (_mock, driver) = driver_with(MockSdk::one_analog_board());
    driver.configure("p", "rx-agc-enabled", "true").unwrap();
    driver.configure("p", "tx-gain", "2.5").unwrap();

    let profile = driver.profiles().get("p").unwrap();
    assert!(profile.record.agc.enabled);
    assert_eq!(profile.play.gain, 2.5);
}

#[test]
fn test_failed_channel_keeps_no_ready_flag() {
    let mock = MockSdk::one_analog_board();
    mock.fail_nth_call("trunk_seize", 1);
    let (_mock, driver) = driver_with(mock);
    let mut span = Span::new(1, TrunkType::T1);

    let configured = driver.configure_span(&mut span, "0:0:1", ChannelType::Fxo, None, None);

    assert_eq!(configured, 0);
    assert_eq!(span.channels().len(), 1);
    assert!(!span.channel(0).unwrap().has_flag(chan_flag::READY));
}

#[test]
fn test_unload_closes_cleanly() {
    let (_mock, driver) = driver_with(MockSdk::one_analog_board());
    let mut span = Span::new(1, TrunkType::T1);
    driver.configure_span(&mut span, "0:0:1", ChannelType::Fxo, None, None);
    driver.unload().unwrap();
}
