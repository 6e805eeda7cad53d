//! Channel control commands.

use tracing::debug;

use tdm_hal::HookState;

use crate::channel::Channel;
use crate::driver::TdmDriver;
use crate::error::{DriverError, DriverResult};
use crate::types::chan_flag;

/// Control operations executed against one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCommand {
    /// Take an FXO trunk off hook.
    Offhook,
    /// Put an FXO trunk back on hook.
    Onhook,
    /// Start ringing an FXS phone.
    RingOn,
    /// Stop ringing an FXS phone.
    RingOff,
    /// Report the native wakeup interval in milliseconds.
    GetInterval,
    /// Change the media block interval in milliseconds.
    SetInterval(u32),
    GetDtmfOnPeriod,
    GetDtmfOffPeriod,
    SetDtmfOnPeriod(u32),
    SetDtmfOffPeriod(u32),
    /// Queue digits for hardware DTMF generation.
    SendDtmf(String),
}

/// Result of a control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    Value(u32),
}

impl TdmDriver {
    pub(crate) fn command_impl(
        &self,
        chan: &Channel,
        cmd: ChannelCommand,
    ) -> DriverResult<CommandOutcome> {
        match cmd {
            ChannelCommand::Offhook => {
                let trunk = self.trunk_of(chan)?;
                if let Err(e) = self.sdk.trunk_set_hook_switch(trunk, HookState::OffHook) {
                    chan.set_last_error(e.to_string());
                    return Err(e.into());
                }
                chan.set_flags(chan_flag::OFFHOOK);
                Ok(CommandOutcome::Done)
            }
            ChannelCommand::Onhook => {
                let trunk = self.trunk_of(chan)?;
                if let Err(e) = self.sdk.trunk_set_hook_switch(trunk, HookState::OnHook) {
                    chan.set_last_error(e.to_string());
                    return Err(e.into());
                }
                chan.clear_flags(chan_flag::OFFHOOK);
                Ok(CommandOutcome::Done)
            }
            ChannelCommand::RingOn => {
                let phone = self.phone_of(chan)?;
                if let Err(e) = self.sdk.phone_ring_start(phone, 0, 0) {
                    chan.set_last_error(e.to_string());
                    return Err(e.into());
                }
                chan.set_flags(chan_flag::RINGING);
                Ok(CommandOutcome::Done)
            }
            ChannelCommand::RingOff => {
                let phone = self.phone_of(chan)?;
                if let Err(e) = self.sdk.phone_ring_stop(phone) {
                    chan.set_last_error(e.to_string());
                    return Err(e.into());
                }
                chan.clear_flags(chan_flag::RINGING);
                Ok(CommandOutcome::Done)
            }
            ChannelCommand::GetInterval => Ok(CommandOutcome::Value(chan.state().native_interval)),
            ChannelCommand::SetInterval(interval_ms) => {
                let (media_in, config) = {
                    let mut state = chan.state();
                    let len = interval_ms * 8;
                    state.record_config.buffer_size = len;
                    state.record_config.buffer_count = state.record_config.buffer_size;
                    state.packet_len = state.record_config.buffer_size;
                    state.native_interval = state.packet_len / 8;
                    (state.media_in, state.record_config)
                };
                self.sdk.record_set_config(media_in, &config)?;
                Ok(CommandOutcome::Done)
            }
            ChannelCommand::GetDtmfOnPeriod => Ok(CommandOutcome::Value(chan.state().dtmf_on_ms)),
            // Reports the on period; the hardware tone generator does
            // not track a separate off period.
            ChannelCommand::GetDtmfOffPeriod => Ok(CommandOutcome::Value(chan.state().dtmf_on_ms)),
            ChannelCommand::SetDtmfOnPeriod(value) => {
                check_period(chan, value)?;
                chan.state().dtmf_on_ms = value;
                Ok(CommandOutcome::Done)
            }
            ChannelCommand::SetDtmfOffPeriod(value) => {
                check_period(chan, value)?;
                chan.state().dtmf_off_ms = value;
                Ok(CommandOutcome::Done)
            }
            ChannelCommand::SendDtmf(digits) => {
                debug!("adding dtmf sequence [{}]", digits);
                let media_out = {
                    let state = chan.state();
                    let mut buffer = chan.digits().lock().unwrap();
                    buffer.write(&digits);
                    state.media_out
                };
                // Stopping playback forces a play-idle completion,
                // which kicks the tone generation path.
                if let Err(e) = self.sdk.play_stop(media_out) {
                    chan.set_last_error(e.to_string());
                    return Err(e.into());
                }
                Ok(CommandOutcome::Done)
            }
        }
    }

    fn trunk_of(&self, chan: &Channel) -> DriverResult<tdm_hal::TrunkHandle> {
        chan.state()
            .device
            .trunk()
            .ok_or_else(|| DriverError::unsupported("hook switch on a non-trunk channel"))
    }

    fn phone_of(&self, chan: &Channel) -> DriverResult<tdm_hal::PhoneHandle> {
        chan.state()
            .device
            .phone()
            .ok_or_else(|| DriverError::unsupported("ring control on a non-phone channel"))
    }
}

fn check_period(chan: &Channel, value: u32) -> DriverResult<()> {
    if value > 10 && value < 1000 {
        Ok(())
    } else {
        let message = format!("invalid value {} range 10-1000", value);
        chan.set_last_error(message.as_str());
        Err(DriverError::invalid_parameter(message))
    }
}
