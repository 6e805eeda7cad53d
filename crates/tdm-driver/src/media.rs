//! Hardware DTMF generation and the tone completion path.
//!
//! Outbound media queues are created in callback mode: the SDK invokes
//! the installed handler on its own thread. The handler does nothing
//! but post a message into a bounded channel; a single driver-owned
//! worker thread services those messages, draining the channel's digit
//! buffer into the tone generator on play-idle and restarting normal
//! playout when the tone generator reports the last digit done.

use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use tdm_hal::{EventHandler, SdkEvent, SdkEventId, TelephonySdk};
use tracing::debug;

use crate::channel::Channel;

/// Depth of the completion message channel.
pub(crate) const COMPLETION_QUEUE_DEPTH: usize = 256;

/// Digits handed to the tone generator per request.
pub(crate) const DTMF_CHUNK: usize = 128;

/// Message posted from the SDK callback thread to the worker.
pub(crate) enum CompletionMsg {
    Event {
        channel: Weak<Channel>,
        event: SdkEvent,
    },
    Shutdown,
}

/// Builds the handler installed on a channel's outbound callback
/// queue. It only posts; the SDK thread never touches driver state.
pub(crate) fn completion_handler(
    tx: SyncSender<CompletionMsg>,
    channel: Weak<Channel>,
) -> EventHandler {
    Box::new(move |event| {
        let msg = CompletionMsg::Event {
            channel: channel.clone(),
            event: *event,
        };
        if tx.try_send(msg).is_err() {
            debug!("completion queue full, dropping {}", event.id);
        }
    })
}

/// Spawns the worker that services completion messages until a
/// shutdown message arrives or every sender is gone.
pub(crate) fn spawn_completion_worker(
    sdk: Arc<dyn TelephonySdk>,
    rx: Receiver<CompletionMsg>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            match msg {
                CompletionMsg::Shutdown => break,
                CompletionMsg::Event { channel, event } => {
                    if let Some(chan) = channel.upgrade() {
                        handle_completion(sdk.as_ref(), &chan, &event);
                    }
                }
            }
        }
    })
}

fn handle_completion(sdk: &dyn TelephonySdk, chan: &Channel, event: &SdkEvent) {
    match event.id {
        SdkEventId::PlayIdle => {
            let media_out = chan.media_out();
            let mut digits = chan.digits().lock().unwrap();
            while digits.has_queued() {
                if let Some(chunk) = digits.read_chunk(DTMF_CHUNK) {
                    debug!("generating {} dtmf digits", chunk.len());
                    if let Err(e) = sdk.tone_play_dtmf(media_out, &chunk) {
                        debug!("dtmf generation failed: {}", e);
                        digits.finish_chunk();
                        break;
                    }
                }
            }
        }
        // p1 carries the remaining tone count; zero means the last
        // queued digit finished.
        SdkEventId::TonePlayed if event.p1 == 0 => {
            let media_out = chan.media_out();
            let mut digits = chan.digits().lock().unwrap();
            if let Err(e) = sdk.play_start(media_out) {
                debug!("play restart after dtmf failed: {}", e);
            }
            digits.finish_chunk();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::sync_channel;
    use tdm_hal::MockSdk;

    use crate::types::ChannelType;

    #[test]
    fn test_worker_stops_on_shutdown() {
        let sdk: Arc<dyn TelephonySdk> = Arc::new(MockSdk::one_digital_board());
        let (tx, rx) = sync_channel(4);
        let worker = spawn_completion_worker(sdk, rx);
        tx.send(CompletionMsg::Shutdown).unwrap();
        worker.join().unwrap();
    }

    #[test]
    fn test_dropped_channel_is_ignored() {
        let sdk: Arc<dyn TelephonySdk> = Arc::new(MockSdk::one_digital_board());
        let (tx, rx) = sync_channel(4);
        let worker = spawn_completion_worker(sdk, rx);
        let chan = Arc::new(Channel::new(0, ChannelType::Fxo));
        let weak = Arc::downgrade(&chan);
        drop(chan);
        tx.send(CompletionMsg::Event {
            channel: weak,
            event: SdkEvent::new(SdkEventId::PlayIdle),
        })
        .unwrap();
        tx.send(CompletionMsg::Shutdown).unwrap();
        worker.join().unwrap();
    }
}
