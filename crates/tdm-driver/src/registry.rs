//! Channel provisioning: descriptor parsing and per-type hardware
//! bring-up.
//!
//! A descriptor names one or more `board:span:channel[-channel]`
//! ranges, comma separated, with an optional `@profile` suffix that
//! applies to the whole request. Ranges are inclusive. Analog channel
//! indices are one-based in descriptors and zero-based on the
//! hardware; digital timeslot indices are used as written.
//!
//! Failures are contained per channel: a slot that fails bring-up is
//! logged and skipped, and the request reports how many channels were
//! actually configured.

use std::sync::Arc;

use tdm_hal::{
    AttachTag, AudioEncoding, BoardHandle, CompandMode, HdlcMode, InterfaceType,
    InternationalControl, QueueHandle, QueueMode, SamplingRate, SpanConfig, SpanHandle,
    StreamHandle,
};
use tracing::{debug, error, info, warn};

use crate::channel::{ChanState, Channel, DeviceHandle};
use crate::driver::{TdmDriver, BLOCK_SIZE, NUM_BUFFERS};
use crate::error::{DriverError, DriverResult};
use crate::media::completion_handler;
use crate::profile::{Profile, Region};
use crate::span::{Span, SpanResources};
use crate::types::{chan_flag, ChannelType, TrunkType};

impl TdmDriver {
    pub(crate) fn configure_span_impl(
        &self,
        span: &mut Span,
        descriptor: &str,
        chan_type: ChannelType,
        name: Option<&str>,
        number: Option<&str>,
    ) -> u32 {
        let (ranges, profile_name) = match descriptor.split_once('@') {
            Some((ranges, profile)) => (ranges, Some(profile)),
            None => (descriptor, None),
        };
        let profile = profile_name
            .filter(|p| !p.is_empty())
            .and_then(|p| self.profiles.get(p));
        if let Some(p) = profile_name {
            if profile.is_none() {
                debug!("no config profile named [{}]", p);
            }
        }

        let mut configured = 0;
        for item in ranges.split(',') {
            let mut parts = item.splitn(3, ':');
            let (Some(bd), Some(sp), Some(ch)) = (parts.next(), parts.next(), parts.next())
            else {
                error!("invalid channel descriptor entry [{}]", item);
                continue;
            };
            let Ok(board_no) = bd.trim().parse::<u32>() else {
                error!("invalid board number [{}]", bd);
                continue;
            };
            let Ok(span_no) = sp.trim().parse::<u32>() else {
                error!("invalid span number [{}]", sp);
                continue;
            };
            let (first, last) = match ch.split_once('-') {
                Some((first, last)) => (first, last),
                None => (ch, ch),
            };
            let Ok(start) = first.trim().parse::<u32>() else {
                error!("invalid channel number [{}]", first);
                continue;
            };
            let Ok(top) = last.trim().parse::<u32>() else {
                error!("invalid channel range [{}]", last);
                continue;
            };
            configured += self.open_range(
                span,
                board_no,
                span_no,
                start,
                top + 1,
                chan_type,
                name,
                number,
                profile.as_ref(),
            );
        }
        configured
    }

    /// Provisions channels `start..end` (exclusive) onto the span.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn open_range(
        &self,
        span: &mut Span,
        board_no: u32,
        span_no: u32,
        start: u32,
        end: u32,
        chan_type: ChannelType,
        name: Option<&str>,
        number: Option<&str>,
        profile: Option<&Profile>,
    ) -> u32 {
        let board = match self.board_handle(board_no) {
            Ok(handle) => handle,
            Err(e) => {
                error!("board {} is not present: {}", board_no, e);
                return 0;
            }
        };

        {
            let mut resources = span.resources();
            if resources.is_none() {
                let event_queue = match self.sdk.queue_create(QueueMode::Normal) {
                    Ok(queue) => queue,
                    Err(e) => {
                        error!("failed to create span event queue: {}", e);
                        return 0;
                    }
                };
                *resources = Some(SpanResources {
                    board_no,
                    span_no,
                    board,
                    event_queue,
                    ..SpanResources::default()
                });
            }
        }

        // Analog devices are one-based in descriptors, zero-based on
        // the hardware. Digital timeslots are used as written.
        let (start, end) = if chan_type.is_analog() {
            (start.saturating_sub(1), end.saturating_sub(1))
        } else {
            (start, end)
        };

        let mut configured = 0;
        for index in start..end {
            let slot = span.channels().len() as u32;
            let chan = Arc::new(Channel::new(slot, chan_type));
            span.push_channel(Arc::clone(&chan));
            if let Err(e) = self.setup_channel(span, &chan, board, board_no, span_no, index, profile)
            {
                error!(
                    "failure configuring device b{}s{}c{}: {}",
                    board_no, span_no, index, e
                );
                continue;
            }
            self.finish_channel(span, &chan, index, name, number, profile);
            configured += 1;
        }
        configured
    }

    /// Brings up the hardware objects behind one channel slot.
    #[allow(clippy::too_many_arguments)]
    fn setup_channel(
        &self,
        span: &Span,
        chan: &Arc<Channel>,
        board: BoardHandle,
        board_no: u32,
        span_no: u32,
        index: u32,
        profile: Option<&Profile>,
    ) -> DriverResult<()> {
        let event_queue = span
            .event_queue()
            .ok_or_else(|| DriverError::span_not_provisioned(span.id()))?;

        if matches!(chan.chan_type(), ChannelType::BChannel | ChannelType::Hdlc) {
            self.ensure_digital_span(span, board, span_no, profile)?;
        }

        let tag = AttachTag::Channel(chan.slot());
        let europe = profile.map(|p| p.region) == Some(Region::Europe);
        let mut state = chan.state();
        state.board_no = board_no;
        state.span_no = span_no;
        state.chan_no = index;

        match chan.chan_type() {
            ChannelType::Fxo => {
                let trunk = self.sdk.trunk_open(board, index)?;
                state.device = DeviceHandle::Trunk(trunk);
                self.sdk.trunk_seize(trunk)?;
                if europe {
                    let mut config = self.sdk.trunk_get_config(trunk)?;
                    config.international_control = InternationalControl::Europe;
                    config.audio_format = AudioEncoding::ALaw;
                    config.compand_mode = AudioEncoding::ALaw;
                    self.sdk.trunk_set_config(trunk, &config)?;
                    state.codec = AudioEncoding::ALaw;
                } else {
                    state.codec = AudioEncoding::MuLaw;
                }
                self.sdk.queue_attach(event_queue, trunk.as_raw(), tag)?;
                let (media_in, media_out) = self.sdk.trunk_media_streams(trunk)?;
                state.media_in = media_in;
                state.media_out = media_out;
                self.attach_media_queues(chan, &mut state, tag)?;
                self.sdk.trunk_start(trunk)?;
            }
            ChannelType::Fxs => {
                let phone = self.sdk.phone_open(board, index)?;
                state.device = DeviceHandle::Phone(phone);
                self.sdk.phone_seize(phone)?;
                if europe {
                    let mut config = self.sdk.phone_get_config(phone)?;
                    config.international_control = InternationalControl::Europe;
                    config.compand_mode = AudioEncoding::ALaw;
                    self.sdk.phone_set_config(phone, &config)?;
                    state.codec = AudioEncoding::ALaw;
                } else {
                    state.codec = AudioEncoding::MuLaw;
                }
                let (media_in, media_out) = self.sdk.phone_media_streams(phone)?;
                state.media_in = media_in;
                state.media_out = media_out;
                self.sdk.queue_attach(event_queue, phone.as_raw(), tag)?;
                self.attach_media_queues(chan, &mut state, tag)?;
                self.sdk.phone_start(phone)?;
            }
            ChannelType::BChannel => {
                let span_handle = self.digital_span_handle(span)?;
                self.sdk.span_seize_timeslot(span_handle, index)?;
                let (media_in, media_out) = self.sdk.span_media_streams(span_handle, index)?;
                state.media_in = media_in;
                state.media_out = media_out;
                self.attach_media_queues(chan, &mut state, tag)?;
            }
            ChannelType::Hdlc => {
                let span_handle = self.digital_span_handle(span)?;
                let hdlc = self.sdk.hdlc_open(span_handle, HdlcMode::Normal)?;
                state.device = DeviceHandle::Hdlc(hdlc);
                let mut config = self.sdk.hdlc_get_config(hdlc)?;
                config.channel_id = index;
                self.sdk.hdlc_set_config(hdlc, &config)?;
                let queue = self.sdk.queue_create(QueueMode::Normal)?;
                state.media_in_queue = queue;
                self.sdk.queue_attach(queue, hdlc.as_raw(), tag)?;
                self.sdk.queue_attach(event_queue, hdlc.as_raw(), tag)?;

                let line = self.resolve_span_line_config(span, profile);
                if let Err(e) = self.sdk.span_set_config(span_handle, &line) {
                    warn!("failed to apply span line config: {}", e);
                }
                if let Some(res) = span.resources().as_mut() {
                    res.config = line;
                }
                self.sdk.span_start(span_handle)?;
            }
        }
        Ok(())
    }

    /// Opens the digital span object on first digital channel use,
    /// settling the T1/E1 question for the whole board.
    fn ensure_digital_span(
        &self,
        span: &Span,
        board: BoardHandle,
        span_no: u32,
        profile: Option<&Profile>,
    ) -> DriverResult<()> {
        let mut resources = span.resources();
        let res = resources
            .as_mut()
            .ok_or_else(|| DriverError::span_not_provisioned(span.id()))?;
        if !res.handle.is_null() {
            return Ok(());
        }

        let mut board_config = self.sdk.board_get_config(board)?;
        if profile.map(|p| p.region) == Some(Region::Europe) || res.locked_e1 {
            if span.trunk_type() == TrunkType::T1 {
                warn!("changing trunk type to E1 based on previous config");
            }
            span.set_trunk_type(TrunkType::E1);
        }

        match span.trunk_type() {
            TrunkType::T1 => {
                if res.locked_e1 {
                    warn!("already locked into E1 mode");
                }
            }
            TrunkType::E1 => {
                board_config.interface_type = InterfaceType::E1;
                if let Err(e) = self.sdk.board_set_config(board, &board_config) {
                    error!("failed to set board interface type: {}", e);
                }
                res.locked_e1 = true;
            }
        }

        let handle = self.sdk.span_open(board, span_no)?;
        res.handle = handle;
        res.config = self.sdk.span_get_config(handle)?;
        self.sdk
            .queue_attach(res.event_queue, handle.as_raw(), AttachTag::Span)?;
        Ok(())
    }

    fn digital_span_handle(&self, span: &Span) -> DriverResult<SpanHandle> {
        span.resources()
            .as_ref()
            .map(|r| r.handle)
            .filter(|h| !h.is_null())
            .ok_or_else(|| DriverError::span_not_provisioned(span.id()))
    }

    /// Creates the channel's media queue pair: a normal queue for
    /// inbound blocks, a callback queue for outbound completions.
    fn attach_media_queues(
        &self,
        chan: &Arc<Channel>,
        state: &mut ChanState,
        tag: AttachTag,
    ) -> DriverResult<()> {
        let media_in_queue = self.sdk.queue_create(QueueMode::Normal)?;
        state.media_in_queue = media_in_queue;
        self.sdk
            .queue_attach(media_in_queue, state.media_in.as_raw(), tag)?;

        let media_out_queue = self.sdk.queue_create(QueueMode::Callback)?;
        state.media_out_queue = media_out_queue;
        let handler = completion_handler(self.completion_tx.clone(), Arc::downgrade(chan));
        self.sdk.queue_set_handler(media_out_queue, handler)?;
        self.sdk
            .queue_attach(media_out_queue, state.media_out.as_raw(), tag)?;
        Ok(())
    }

    /// Chooses the span line configuration: explicit profile overrides
    /// win, then the profile's regional template, then the span's
    /// trunk type.
    fn resolve_span_line_config(&self, span: &Span, profile: Option<&Profile>) -> SpanConfig {
        match profile {
            Some(p) if p.span_overrides > 0 => p.span,
            Some(p) => {
                if p.region == Region::Europe {
                    self.e1_template
                } else {
                    self.t1_template
                }
            }
            None => {
                if span.trunk_type() == TrunkType::E1 {
                    self.e1_template
                } else {
                    self.t1_template
                }
            }
        }
    }

    /// Marks the channel ready and applies media configuration; media
    /// setup failures here are logged, never fatal.
    fn finish_channel(
        &self,
        span: &Span,
        chan: &Arc<Channel>,
        index: u32,
        name: Option<&str>,
        number: Option<&str>,
        profile: Option<&Profile>,
    ) {
        chan.set_flags(chan_flag::READY | chan_flag::DTMF_GENERATE);
        let mut state = chan.state();
        let voice = chan.chan_type().is_voice();

        if voice {
            if let Ok(config) = self.sdk.record_get_config(state.media_in) {
                state.record_config = config;
            }
            state.record_config.encoding = AudioEncoding::MuLaw;
            state.record_config.sampling_rate = SamplingRate::Khz8;
            state.record_config.buffer_size = BLOCK_SIZE;
            state.record_config.buffer_count = NUM_BUFFERS;
            state.record_config.vad.enabled = false;

            if let Ok(config) = self.sdk.play_get_config(state.media_out) {
                state.play_config = config;
            }
            state.play_config.encoding = AudioEncoding::MuLaw;
            state.play_config.sampling_rate = SamplingRate::Khz8;
            state.play_config.agc.enabled = false;
        }

        info!(
            "configuring device b{}s{}c{} as channel {}:{}",
            state.board_no,
            state.span_no,
            index,
            span.id(),
            chan.slot()
        );

        if let Some(p) = profile {
            info!(
                "applying config profile {} to device {}:{}",
                p.name,
                span.id(),
                chan.slot()
            );
            state.record_config.gain = p.record.gain;
            state.record_config.agc = p.record.agc;
            state.record_config.vad = p.record.vad;
            state.play_config.gain = p.play.gain;
            state.play_config.agc = p.play.agc;
            state.ec_enabled = p.ec_enabled;
            state.ec_config = p.ec;
        }

        if chan.chan_type() == ChannelType::BChannel {
            let compand = span
                .resources()
                .as_ref()
                .map(|r| r.config.compand_mode)
                .unwrap_or_default();
            state.codec = if compand == CompandMode::ALaw {
                AudioEncoding::ALaw
            } else {
                AudioEncoding::MuLaw
            };
        }

        state.packet_len = state.record_config.buffer_size;
        state.native_interval = state.packet_len / 8;

        if voice {
            if let Err(e) = self.sdk.record_set_config(state.media_in, &state.record_config) {
                debug!("record config rejected: {}", e);
            }
            if let Err(e) = self.sdk.play_set_config(state.media_out, &state.play_config) {
                debug!("play config rejected: {}", e);
            }
            if let Err(e) = self.sdk.record_start(state.media_in) {
                debug!("record start failed: {}", e);
            }
            if let Err(e) = self.sdk.play_start(state.media_out) {
                debug!("play start failed: {}", e);
            }
            if state.ec_enabled {
                let ec_config = state.ec_config;
                if let Err(e) = self.sdk.ec_set_config(state.media_in, &ec_config) {
                    debug!("ec config rejected: {}", e);
                }
                if let Err(e) = self
                    .sdk
                    .ec_start(state.media_in, state.media_in, state.media_out)
                {
                    debug!("ec start failed: {}", e);
                }
            }
        }

        if let Some(name) = name.filter(|n| !n.is_empty()) {
            state.name = name.to_string();
        }
        if let Some(number) = number.filter(|n| !n.is_empty()) {
            state.number = number.to_string();
        }
    }

    /// Event queue feeding a channel's inbound media path.
    pub fn media_in_queue(&self, chan: &Channel) -> QueueHandle {
        chan.state().media_in_queue
    }

    /// Callback queue attached to a channel's outbound media path.
    pub fn media_out_queue(&self, chan: &Channel) -> QueueHandle {
        chan.state().media_out_queue
    }

    /// The channel's (inbound, outbound) media streams.
    pub fn media_streams(&self, chan: &Channel) -> (StreamHandle, StreamHandle) {
        let state = chan.state();
        (state.media_in, state.media_out)
    }
}
