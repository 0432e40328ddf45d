//! # Native-bound Bridge
//!
//! Receives URIs from the page (through the `AppInterface.handleURI` script
//! hook), validates them and hands a typed [`VideoCommand`] to a sink.
//!
//! Malformed input is dropped quietly: the page is cooperative but not
//! trusted, and a bad URI must never take the bridge down. The one error that
//! escapes is a non-numeric seek amount, returned from that single call.

use std::sync::Arc;

use log::{debug, warn};
use shared::protocol::{Command, NativeAction, UriCodec};
use tokio::sync::mpsc::UnboundedSender;

use crate::BridgeError;

/// A validated command from the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoCommand {
    /// Load a new source, optionally playing once prepared
    Load { url: String, auto_play: bool },
    /// Toggle play/pause
    PlayPause,
    /// Seek backwards by `ms` milliseconds
    Rewind { ms: i64 },
    /// Seek forwards by `ms` milliseconds
    FastForward { ms: i64 },
}

/// Receiver of validated commands
pub trait VideoCommandSink: Send + Sync {
    fn dispatch(&self, command: VideoCommand);
}

impl<T: VideoCommandSink + ?Sized> VideoCommandSink for Arc<T> {
    fn dispatch(&self, command: VideoCommand) {
        (**self).dispatch(command)
    }
}

/// Forwards commands to a task owning the session
impl VideoCommandSink for UnboundedSender<VideoCommand> {
    fn dispatch(&self, command: VideoCommand) {
        if self.send(command).is_err() {
            warn!("Video command receiver dropped, command discarded");
        }
    }
}

/// Validates page URIs and forwards them to a [`VideoCommandSink`]
pub struct NativeBridge<S> {
    codec: UriCodec,
    sink: S,
}

impl<S: VideoCommandSink> NativeBridge<S> {
    pub fn new(codec: UriCodec, sink: S) -> Self {
        Self { codec, sink }
    }

    /// Handle one URI received from the page
    ///
    /// Unknown schemes, unknown actions and wrong argument counts are no-ops.
    pub fn handle(&self, uri: &str) -> Result<(), BridgeError> {
        let command = match self.codec.decode(uri) {
            Ok(command) => command,
            Err(e) => {
                debug!("Ignoring uri {uri:?}: {e}");
                return Ok(());
            }
        };

        if let Some(video_command) = parse_command(&command)? {
            debug!("Dispatching {video_command:?}");
            self.sink.dispatch(video_command);
        }

        Ok(())
    }
}

/// Validate a decoded command
///
/// Returns `Ok(None)` for anything that should be ignored.
pub fn parse_command(command: &Command) -> Result<Option<VideoCommand>, BridgeError> {
    let Some(action) = command.native_action() else {
        debug!("Ignoring unknown action {:?}", command.action);
        return Ok(None);
    };

    let args = command.trimmed_args();
    let parsed = match action {
        NativeAction::LoadVideo => match args {
            [url] => Some(VideoCommand::Load {
                url: url.clone(),
                auto_play: false,
            }),
            [url, flag] => Some(VideoCommand::Load {
                url: url.clone(),
                auto_play: flag.eq_ignore_ascii_case("true"),
            }),
            _ => None,
        },
        NativeAction::PlayPauseVideo => Some(VideoCommand::PlayPause),
        NativeAction::RewindVideo => match args {
            [seconds] => Some(VideoCommand::Rewind {
                ms: seconds_to_millis(seconds)?,
            }),
            _ => None,
        },
        NativeAction::FastForwardVideo => match args {
            [seconds] => Some(VideoCommand::FastForward {
                ms: seconds_to_millis(seconds)?,
            }),
            _ => None,
        },
    };

    if parsed.is_none() {
        debug!(
            "Ignoring {action} with {} fields",
            command.field_count()
        );
    }

    Ok(parsed)
}

// Wire carries seconds, the engine works in milliseconds
fn seconds_to_millis(raw: &str) -> Result<i64, BridgeError> {
    let seconds: i32 = raw.parse().map_err(|source| BridgeError::InvalidSeconds {
        value: raw.to_owned(),
        source,
    })?;
    Ok(i64::from(seconds) * 1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        commands: Mutex<Vec<VideoCommand>>,
    }

    impl VideoCommandSink for RecordingSink {
        fn dispatch(&self, command: VideoCommand) {
            self.commands.lock().unwrap().push(command);
        }
    }

    fn bridge() -> NativeBridge<Arc<RecordingSink>> {
        NativeBridge::new(UriCodec::default(), Arc::new(RecordingSink::default()))
    }

    fn dispatched(bridge: &NativeBridge<Arc<RecordingSink>>) -> Vec<VideoCommand> {
        bridge.sink.commands.lock().unwrap().clone()
    }

    #[test]
    fn test_load_autoplay_flag() {
        let bridge = bridge();
        bridge.handle("nativewebsample://ACTION_LOAD_VIDEO;http://x/a.mp4;").unwrap();
        bridge.handle("nativewebsample://ACTION_LOAD_VIDEO;http://x/a.mp4;true;").unwrap();
        bridge.handle("nativewebsample://ACTION_LOAD_VIDEO;http://x/a.mp4;TRUE;").unwrap();
        bridge.handle("nativewebsample://ACTION_LOAD_VIDEO;http://x/a.mp4;yes;").unwrap();

        let url = "http://x/a.mp4".to_owned();
        assert_eq!(
            dispatched(&bridge),
            vec![
                VideoCommand::Load { url: url.clone(), auto_play: false },
                VideoCommand::Load { url: url.clone(), auto_play: true },
                VideoCommand::Load { url: url.clone(), auto_play: true },
                VideoCommand::Load { url, auto_play: false },
            ]
        );
    }

    #[test]
    fn test_load_with_wrong_arity_is_ignored() {
        let bridge = bridge();
        bridge.handle("nativewebsample://ACTION_LOAD_VIDEO;http://x/a.mp4;false;x;").unwrap();
        bridge.handle("nativewebsample://ACTION_LOAD_VIDEO;").unwrap();
        assert!(dispatched(&bridge).is_empty());
    }

    #[test]
    fn test_seek_seconds_become_millis() {
        let bridge = bridge();
        bridge.handle("nativewebsample://ACTION_REWIND_VIDEO;30;").unwrap();
        bridge.handle("nativewebsample://ACTION_FASTFORWARD_VIDEO;10;").unwrap();
        assert_eq!(
            dispatched(&bridge),
            vec![
                VideoCommand::Rewind { ms: 30_000 },
                VideoCommand::FastForward { ms: 10_000 },
            ]
        );
    }

    #[test]
    fn test_seek_with_non_numeric_seconds_fails_that_call() {
        let bridge = bridge();
        let err = bridge
            .handle("nativewebsample://ACTION_REWIND_VIDEO;abc;")
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidSeconds { ref value, .. } if value == "abc"));

        // The bridge keeps working afterwards
        bridge.handle("nativewebsample://ACTION_PLAY_PAUSE_VIDEO;").unwrap();
        assert_eq!(dispatched(&bridge), vec![VideoCommand::PlayPause]);
    }

    #[test]
    fn test_seek_with_extra_fields_is_ignored() {
        let bridge = bridge();
        bridge.handle("nativewebsample://ACTION_FASTFORWARD_VIDEO;10;20;").unwrap();
        bridge.handle("nativewebsample://ACTION_FASTFORWARD_VIDEO;").unwrap();
        assert!(dispatched(&bridge).is_empty());
    }

    #[test]
    fn test_unrecognized_input_is_silent() {
        let bridge = bridge();
        for uri in [
            "",
            "ACTION_PLAY_PAUSE_VIDEO;",
            "otherscheme://ACTION_PLAY_PAUSE_VIDEO;",
            "nativewebsample://",
            "nativewebsample://KEY_EVENT;23;",
        ] {
            bridge.handle(uri).unwrap();
        }
        assert!(dispatched(&bridge).is_empty());
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_commands() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<VideoCommand>();
        let bridge = NativeBridge::new(UriCodec::default(), tx);
        bridge.handle("nativewebsample://ACTION_PLAY_PAUSE_VIDEO;").unwrap();
        assert_eq!(rx.recv().await, Some(VideoCommand::PlayPause));
    }
}
