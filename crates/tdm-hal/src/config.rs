//! SDK configuration structures.
//!
//! These mirror the vendor SDK's configuration records for the system,
//! boards, spans, media streams, and DSP features. The driver reads a
//! configuration from the hardware, edits the fields it cares about,
//! and writes the whole record back.

use std::str::FromStr;

/// Physical board family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardType {
    /// T1/E1 digital gateway.
    DigitalGateway,
    /// FXS/FXO analog gateway.
    AnalogGateway,
    /// Unrecognized board family.
    Unknown,
}

impl BoardType {
    /// Returns the board family name used in enumeration logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardType::DigitalGateway => "digital_gateway",
            BoardType::AnalogGateway => "analog_gateway",
            BoardType::Unknown => "unknown",
        }
    }
}

/// One enumerated board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardInfo {
    /// SDK-assigned board id, stable for the process lifetime.
    pub id: u32,
    pub board_type: BoardType,
    pub serial_number: u32,
}

/// The result of board enumeration.
#[derive(Debug, Clone, Default)]
pub struct BoardList {
    pub boards: Vec<BoardInfo>,
}

impl BoardList {
    /// Number of boards present.
    pub fn len(&self) -> usize {
        self.boards.len()
    }

    /// Returns true if no boards were enumerated.
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}

/// Process-wide SDK buffering configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemConfig {
    pub max_audio_process_block: u32,
    pub play_buffer_size: u32,
    pub record_buffer_size: u32,
    pub record_buffer_count: u32,
}

/// Digital board line interface type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    T1,
    E1,
}

/// Board-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    /// Interface type for digital gateway boards.
    pub interface_type: InterfaceType,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            interface_type: InterfaceType::T1,
        }
    }
}

macro_rules! span_field_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            #[default]
            Invalid,
            $($variant,)+
        }

        impl FromStr for $name {
            type Err = ();

            /// Unrecognized tokens map to `Invalid`, never an error,
            /// matching the SDK's string-to-enum helpers.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let v = match s {
                    $(t if t.eq_ignore_ascii_case($token) => $name::$variant,)+
                    _ => $name::Invalid,
                };
                Ok(v)
            }
        }

        impl $name {
            /// Returns the configuration token for this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $name::Invalid => "invalid",
                    $($name::$variant => $token,)+
                }
            }
        }
    };
}

span_field_enum!(
    /// Span framing format.
    Framing {
        Esf => "esf",
        Sf => "sf",
        Cas => "cas",
        Ccs => "ccs",
    }
);

span_field_enum!(
    /// Span line encoding.
    LineEncoding {
        B8zs => "b8zs",
        Ami => "ami",
        Hdb3 => "hdb3",
    }
);

span_field_enum!(
    /// Span loop length.
    LoopLength {
        Short => "short",
        Long => "long",
    }
);

span_field_enum!(
    /// Line build-out attenuation.
    BuildOut {
        Lbo0Db => "0db",
        Lbo75Db => "-7.5db",
        Lbo15Db => "-15db",
        Lbo225Db => "-22.5db",
    }
);

span_field_enum!(
    /// Span companding mode.
    CompandMode {
        MuLaw => "ulaw",
        ALaw => "alaw",
    }
);

/// Span line parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanConfig {
    pub framing: Framing,
    pub encoding: LineEncoding,
    pub loop_length: LoopLength,
    pub build_out: BuildOut,
    pub compand_mode: CompandMode,
}

/// PCM payload encoding for media streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AudioEncoding {
    #[default]
    MuLaw,
    ALaw,
}

/// Media sampling rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplingRate {
    #[default]
    Khz8,
}

/// Automatic gain control tuning.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AgcParams {
    pub enabled: bool,
    pub target_power: f32,
    pub min_gain: f32,
    pub max_gain: f32,
    pub attack_rate: i32,
    pub decay_rate: i32,
    pub speech_threshold: f32,
}

/// Voice activity detection tuning.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VadParams {
    pub enabled: bool,
    pub activation_threshold: f32,
    pub activation_debounce_time: i32,
    pub deactivation_threshold: f32,
    pub deactivation_debounce_time: i32,
    pub pre_speech_buffer_size: i32,
}

/// Inbound (record) media stream configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RecordConfig {
    pub gain: f32,
    pub agc: AgcParams,
    pub vad: VadParams,
    pub encoding: AudioEncoding,
    pub sampling_rate: SamplingRate,
    pub buffer_size: u32,
    pub buffer_count: u32,
}

/// Outbound (play) media stream configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayConfig {
    pub gain: f32,
    pub agc: AgcParams,
    pub encoding: AudioEncoding,
    pub sampling_rate: SamplingRate,
}

/// Echo cancellation tuning.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EcConfig {
    pub double_talker_threshold: f32,
    pub speech_present_threshold: f32,
    pub echo_suppression_threshold: f32,
    pub echo_suppression_enabled: bool,
    pub comfort_noise_enabled: bool,
    pub adaptation_mode_enabled: bool,
}

/// Regional supervision profile for analog interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InternationalControl {
    #[default]
    NorthAmerica,
    Europe,
}

/// Analog trunk (FXO) configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrunkConfig {
    pub international_control: InternationalControl,
    pub audio_format: AudioEncoding,
    pub compand_mode: AudioEncoding,
}

/// Analog phone (FXS) configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhoneConfig {
    pub international_control: InternationalControl,
    pub compand_mode: AudioEncoding,
}

/// HDLC framer operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HdlcMode {
    #[default]
    Normal,
}

/// HDLC framer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HdlcConfig {
    /// Timeslot carrying the signaling channel.
    pub channel_id: u32,
}

/// Hook switch positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookState {
    OnHook,
    OffHook,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_enum_parse() {
        assert_eq!("esf".parse::<Framing>().unwrap(), Framing::Esf);
        assert_eq!("ESF".parse::<Framing>().unwrap(), Framing::Esf);
        assert_eq!("hdb3".parse::<LineEncoding>().unwrap(), LineEncoding::Hdb3);
        assert_eq!("alaw".parse::<CompandMode>().unwrap(), CompandMode::ALaw);
    }

    #[test]
    fn test_span_enum_invalid_token() {
        assert_eq!("bogus".parse::<Framing>().unwrap(), Framing::Invalid);
        assert_eq!("".parse::<BuildOut>().unwrap(), BuildOut::Invalid);
    }

    #[test]
    fn test_board_type_names() {
        assert_eq!(BoardType::DigitalGateway.as_str(), "digital_gateway");
        assert_eq!(BoardType::AnalogGateway.as_str(), "analog_gateway");
        assert_eq!(BoardType::Unknown.as_str(), "unknown");
    }
}
