//! Named configuration profiles.
//!
//! A profile collects media, echo-cancellation, and span line settings
//! under a name. Configuration directives arrive one key at a time;
//! the first directive seen for a name creates the profile seeded from
//! the factory defaults captured at load, and later directives edit it
//! in place. Provisioning requests reference a profile by appending
//! `@name` to a channel descriptor.

use std::collections::HashMap;
use std::sync::Mutex;

use tdm_hal::{EcConfig, PlayConfig, RecordConfig, SpanConfig};
use tracing::{error, info};

/// Regional default set applied by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Region {
    #[default]
    NorthAmerica,
    Europe,
}

/// One named configuration profile.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub name: String,
    pub record: RecordConfig,
    pub play: PlayConfig,
    pub ec_enabled: bool,
    pub ec: EcConfig,
    pub span: SpanConfig,
    /// Number of span line directives seen; when zero the span section
    /// is untouched defaults and a regional template is used instead.
    pub span_overrides: u32,
    pub region: Region,
}

/// Store of named profiles, seeded from factory defaults.
pub struct ProfileStore {
    record_seed: RecordConfig,
    play_seed: PlayConfig,
    ec_seed: EcConfig,
    profiles: Mutex<HashMap<String, Profile>>,
}

impl ProfileStore {
    /// Creates a store whose new profiles start from the given
    /// factory-default configurations.
    pub fn new(record_seed: RecordConfig, play_seed: PlayConfig, ec_seed: EcConfig) -> Self {
        Self {
            record_seed,
            play_seed,
            ec_seed,
            profiles: Mutex::new(HashMap::new()),
        }
    }

    /// Applies one configuration directive to the profile named by
    /// `category`, creating it on first reference.
    ///
    /// Unknown keys are logged and skipped; the call itself always
    /// succeeds so one bad line does not abort configuration loading.
    pub fn apply(&self, category: &str, key: &str, value: &str) {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.entry(category.to_string()).or_insert_with(|| {
            info!("creating config profile [{}]", category);
            Profile {
                name: category.to_string(),
                record: self.record_seed,
                play: self.play_seed,
                ec_enabled: false,
                ec: self.ec_seed,
                span: SpanConfig::default(),
                span_overrides: 0,
                region: Region::NorthAmerica,
            }
        });

        match key {
            k if k.eq_ignore_ascii_case("rx-gain") => profile.record.gain = parse_f32(value),
            k if k.eq_ignore_ascii_case("rx-agc-enabled") => {
                profile.record.agc.enabled = parse_bool(value)
            }
            k if k.eq_ignore_ascii_case("rx-agc-targetPower") => {
                profile.record.agc.target_power = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("rx-agc-minGain") => {
                profile.record.agc.min_gain = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("rx-agc-maxGain") => {
                profile.record.agc.max_gain = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("rx-agc-attackRate") => {
                profile.record.agc.attack_rate = parse_i32(value)
            }
            k if k.eq_ignore_ascii_case("rx-agc-decayRate") => {
                profile.record.agc.decay_rate = parse_i32(value)
            }
            k if k.eq_ignore_ascii_case("rx-agc-speechThreshold") => {
                profile.record.agc.speech_threshold = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("rx-vad-enabled") => {
                profile.record.vad.enabled = parse_bool(value)
            }
            k if k.eq_ignore_ascii_case("rx-vad-activationThreshold") => {
                profile.record.vad.activation_threshold = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("rx-vad-activationDebounceTime") => {
                profile.record.vad.activation_debounce_time = parse_i32(value)
            }
            k if k.eq_ignore_ascii_case("rx-vad-deactivationThreshold") => {
                profile.record.vad.deactivation_threshold = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("rx-vad-deactivationDebounceTime") => {
                profile.record.vad.deactivation_debounce_time = parse_i32(value)
            }
            k if k.eq_ignore_ascii_case("rx-vad-preSpeechBufferSize") => {
                profile.record.vad.pre_speech_buffer_size = parse_i32(value)
            }
            k if k.eq_ignore_ascii_case("tx-gain") => profile.play.gain = parse_f32(value),
            k if k.eq_ignore_ascii_case("tx-agc-enabled") => {
                profile.play.agc.enabled = parse_bool(value)
            }
            k if k.eq_ignore_ascii_case("tx-agc-targetPower") => {
                profile.play.agc.target_power = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("tx-agc-minGain") => {
                profile.play.agc.min_gain = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("tx-agc-maxGain") => {
                profile.play.agc.max_gain = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("tx-agc-attackRate") => {
                profile.play.agc.attack_rate = parse_i32(value)
            }
            k if k.eq_ignore_ascii_case("tx-agc-decayRate") => {
                profile.play.agc.decay_rate = parse_i32(value)
            }
            k if k.eq_ignore_ascii_case("tx-agc-speechThreshold") => {
                profile.play.agc.speech_threshold = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("ec-enabled") => profile.ec_enabled = parse_bool(value),
            k if k.eq_ignore_ascii_case("ec-doubleTalkerThreshold") => {
                profile.ec.double_talker_threshold = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("ec-speechPresentThreshold") => {
                profile.ec.speech_present_threshold = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("ec-echoSuppressionThreshold") => {
                profile.ec.echo_suppression_threshold = parse_f32(value)
            }
            k if k.eq_ignore_ascii_case("ec-echoSuppressionEnabled") => {
                profile.ec.echo_suppression_enabled = parse_bool(value)
            }
            k if k.eq_ignore_ascii_case("ec-comfortNoiseEnabled") => {
                profile.ec.comfort_noise_enabled = parse_bool(value)
            }
            k if k.eq_ignore_ascii_case("ec-adaptationModeEnabled") => {
                profile.ec.adaptation_mode_enabled = parse_bool(value)
            }
            k if k.eq_ignore_ascii_case("framing") => {
                profile.span.framing = value.parse().unwrap_or_default();
                profile.span_overrides += 1;
            }
            k if k.eq_ignore_ascii_case("encoding") => {
                profile.span.encoding = value.parse().unwrap_or_default();
                profile.span_overrides += 1;
            }
            k if k.eq_ignore_ascii_case("loopLength") => {
                profile.span.loop_length = value.parse().unwrap_or_default();
                profile.span_overrides += 1;
            }
            k if k.eq_ignore_ascii_case("buildOut") => {
                profile.span.build_out = value.parse().unwrap_or_default();
                profile.span_overrides += 1;
            }
            k if k.eq_ignore_ascii_case("compandMode") => {
                profile.span.compand_mode = value.parse().unwrap_or_default();
                profile.span_overrides += 1;
            }
            k if k.eq_ignore_ascii_case("region") => {
                profile.region = if value.eq_ignore_ascii_case("eu") {
                    Region::Europe
                } else {
                    Region::NorthAmerica
                };
            }
            _ => {
                error!("profile [{}]: ignoring unknown parameter {}", category, key);
                return;
            }
        }
        info!("profile [{}]: set {} = {}", category, key, value);
    }

    /// Returns a copy of the named profile.
    pub fn get(&self, name: &str) -> Option<Profile> {
        self.profiles.lock().unwrap().get(name).cloned()
    }

    /// Number of profiles defined.
    pub fn len(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }

    /// Returns true if no profile has been defined.
    pub fn is_empty(&self) -> bool {
        self.profiles.lock().unwrap().is_empty()
    }

    /// Drops every profile. Used at module unload.
    pub fn clear(&self) {
        self.profiles.lock().unwrap().clear();
    }
}

fn parse_f32(value: &str) -> f32 {
    value.trim().parse().unwrap_or(0.0)
}

fn parse_i32(value: &str) -> i32 {
    value.trim().parse().unwrap_or(0)
}

fn parse_bool(value: &str) -> bool {
    let v = value.trim();
    if let Ok(n) = v.parse::<i64>() {
        return n != 0;
    }
    ["true", "yes", "on", "enabled", "active", "allow"]
        .iter()
        .any(|t| v.eq_ignore_ascii_case(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tdm_hal::Framing;

    fn store() -> ProfileStore {
        let mut record = RecordConfig::default();
        record.gain = 1.5;
        ProfileStore::new(record, PlayConfig::default(), EcConfig::default())
    }

    #[test]
    fn test_first_directive_creates_seeded_profile() {
        let store = store();
        store.apply("pri-a", "tx-gain", "3.0");
        let p = store.get("pri-a").unwrap();
        assert_eq!(p.name, "pri-a");
        assert_eq!(p.play.gain, 3.0);
        // Untouched sections keep the factory seed.
        assert_eq!(p.record.gain, 1.5);
        assert_eq!(p.span_overrides, 0);
    }

    #[test]
    fn test_directives_accumulate_idempotently() {
        let store = store();
        store.apply("pri-a", "framing", "ccs");
        store.apply("pri-a", "rx-agc-enabled", "yes");
        store.apply("pri-a", "framing", "ccs");
        assert_eq!(store.len(), 1);
        let p = store.get("pri-a").unwrap();
        assert_eq!(p.span.framing, Framing::Ccs);
        assert!(p.record.agc.enabled);
        assert_eq!(p.span_overrides, 2);
    }

    #[test]
    fn test_unknown_key_is_skipped() {
        let store = store();
        store.apply("x", "no-such-key", "1");
        store.apply("x", "ec-enabled", "true");
        let p = store.get("x").unwrap();
        assert!(p.ec_enabled);
    }

    #[test]
    fn test_region_token() {
        let store = store();
        store.apply("euro", "region", "eu");
        assert_eq!(store.get("euro").unwrap().region, Region::Europe);
        store.apply("euro", "region", "us");
        assert_eq!(store.get("euro").unwrap().region, Region::NorthAmerica);
        // Region alone never counts as a span line override.
        assert_eq!(store.get("euro").unwrap().span_overrides, 0);
    }

    #[test]
    fn test_directive_logging_posture() {
        use std::io;
        use std::sync::{Arc, Mutex};

        #[derive(Clone)]
        struct Sink(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Sink {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let sink = Sink(Arc::new(Mutex::new(Vec::new())));
        let writer = sink.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let store = store();
            store.apply("pri-a", "tx-gain", "3.0");
            store.apply("pri-a", "no-such-key", "1");
        });

        let log = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        // Profile creation and every accepted pair land at info.
        assert!(log.contains("creating config profile [pri-a]"));
        assert!(log.contains("set tx-gain = 3.0"));
        // Unknown keys land at error and are not echoed as accepted.
        assert!(log.contains("ERROR"));
        assert!(log.contains("ignoring unknown parameter no-such-key"));
        assert!(!log.contains("set no-such-key"));
    }

    #[test]
    fn test_bool_tokens() {
        assert!(parse_bool("enabled"));
        assert!(parse_bool("1"));
        assert!(parse_bool("On"));
        assert!(!parse_bool("off"));
        assert!(!parse_bool("0"));
    }
}
