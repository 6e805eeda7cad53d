//! Channel open/close, bounded waits, and the media/HDLC data path.

use tracing::{debug, warn};

use crate::channel::Channel;
use crate::driver::TdmDriver;
use crate::error::{DriverError, DriverResult};
use crate::span::Span;
use crate::types::{chan_flag, ChannelType, WaitFlags, WaitOutcome};

impl TdmDriver {
    pub(crate) fn open_impl(&self, chan: &Channel) -> DriverResult<()> {
        if !chan.is_ready() {
            return Err(DriverError::channel_not_ready(chan.slot()));
        }
        let state = chan.state();
        if !state.media_in_queue.is_null() {
            self.sdk.queue_flush(state.media_in_queue)?;
        }
        if chan.chan_type().is_voice() {
            self.sdk.play_start(state.media_out)?;
        }
        Ok(())
    }

    pub(crate) fn close_impl(&self, _chan: &Channel) -> DriverResult<()> {
        Ok(())
    }

    /// Only read readiness is event driven; an HDLC byte count noted
    /// by the event path short-circuits the wait.
    pub(crate) fn wait_impl(
        &self,
        chan: &Channel,
        flags: WaitFlags,
        timeout_ms: u32,
    ) -> DriverResult<WaitOutcome> {
        if !flags.contains(WaitFlags::READ) {
            return Ok(WaitOutcome::Ready(WaitFlags::NONE));
        }

        let media_in_queue = {
            let state = chan.state();
            if state.hdlc_bytes > 0 {
                return Ok(WaitOutcome::Ready(WaitFlags::READ));
            }
            state.media_in_queue
        };

        match self.sdk.queue_wait(media_in_queue, timeout_ms) {
            Ok(event) => {
                let timed_out = event.is_timeout()
                    || event.id == tdm_hal::SdkEventId::RecordBufferOverflow;
                chan.state().last_media_event = Some(event);
                if timed_out {
                    return Ok(WaitOutcome::Timeout);
                }
                Ok(WaitOutcome::Ready(WaitFlags::READ))
            }
            Err(e) => {
                debug!("media queue wait failed: {}", e);
                Ok(WaitOutcome::Ready(WaitFlags::NONE))
            }
        }
    }

    pub(crate) fn read_impl(&self, chan: &Channel, buf: &mut [u8]) -> DriverResult<usize> {
        if chan.chan_type() == ChannelType::Hdlc {
            let (hdlc, bytes) = {
                let state = chan.state();
                let hdlc = state
                    .device
                    .hdlc()
                    .ok_or_else(|| DriverError::channel_not_ready(chan.slot()))?;
                (hdlc, state.hdlc_bytes as usize)
            };
            let frame = self.sdk.hdlc_get_message(hdlc, buf.len())?;
            let copied = frame.len().min(buf.len());
            buf[..copied].copy_from_slice(&frame[..copied]);
            chan.state().hdlc_bytes = 0;
            // The length reported is the byte count recorded from the
            // message event, not the copy size.
            return Ok(bytes);
        }

        let (media_in, len) = {
            let state = chan.state();
            let len = match state.last_media_event {
                Some(event) if event.p0 > 0 => event.p0 as usize,
                _ => state.packet_len as usize,
            };
            (state.media_in, len)
        };
        let len = len.min(buf.len());
        match self.sdk.record_data(media_in, len) {
            Ok(block) => {
                let copied = block.len().min(buf.len());
                buf[..copied].copy_from_slice(&block[..copied]);
                Ok(copied)
            }
            Err(e) => {
                debug!("record read failed: {}", e);
                Err(e.into())
            }
        }
    }

    pub(crate) fn write_impl(&self, chan: &Channel, buf: &[u8]) -> DriverResult<usize> {
        if chan.chan_type() == ChannelType::Hdlc {
            let hdlc = chan
                .state()
                .device
                .hdlc()
                .ok_or_else(|| DriverError::channel_not_ready(chan.slot()))?;
            self.sdk.hdlc_send_message(hdlc, buf)?;
            return Ok(buf.len());
        }
        let media_out = chan.state().media_out;
        self.sdk.play_add_data(media_out, 0, buf)?;
        Ok(buf.len())
    }

    pub(crate) fn channel_destroy_impl(&self, span: &Span, chan: &Channel) -> DriverResult<()> {
        if !chan.is_ready() {
            return Ok(());
        }
        let state = chan.state();
        if let Err(e) = self.sdk.record_stop(state.media_in) {
            debug!("record stop failed: {}", e);
        }
        if let Err(e) = self.sdk.play_stop(state.media_out) {
            debug!("play stop failed: {}", e);
        }
        if !state.media_in_queue.is_null() {
            let _ = self.sdk.queue_destroy(state.media_in_queue);
        }
        if !state.media_out_queue.is_null() {
            let _ = self.sdk.queue_destroy(state.media_out_queue);
        }

        let event_queue = span.event_queue();
        match chan.chan_type() {
            ChannelType::Fxs => {
                if let Some(phone) = state.device.phone() {
                    if let Some(queue) = event_queue {
                        let _ = self.sdk.queue_detach(queue, phone.as_raw());
                    }
                    self.sdk.phone_close(phone)?;
                }
            }
            ChannelType::Fxo => {
                if let Some(trunk) = state.device.trunk() {
                    if let Some(queue) = event_queue {
                        let _ = self.sdk.queue_detach(queue, trunk.as_raw());
                    }
                    self.sdk.trunk_close(trunk)?;
                }
            }
            ChannelType::Hdlc => {
                if let Some(res) = span.resources().as_ref() {
                    if !res.handle.is_null() {
                        self.sdk.span_stop(res.handle)?;
                    }
                }
            }
            ChannelType::BChannel => {}
        }
        drop(state);
        chan.clear_flags(chan_flag::READY);
        Ok(())
    }

    pub(crate) fn span_destroy_impl(&self, span: &Span) -> DriverResult<()> {
        let mut resources = span.resources();
        if let Some(res) = resources.take() {
            if let Err(e) = self.sdk.queue_destroy(res.event_queue) {
                warn!("failed to destroy span event queue: {}", e);
            }
        }
        Ok(())
    }
}
