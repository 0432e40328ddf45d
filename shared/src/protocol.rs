//! # URI Command Protocol
//!
//! This module defines the textual command format exchanged between the web
//! content and the native player. The same format is used in both directions.
//!
//! ## Wire Format
//!
//! ```text
//! ┌────────────────────┬──────────┬─────┬────────┬─────┬─────┬────────┬─────┐
//! │ scheme "://"       │  ACTION  │  ;  │  ARG1  │  ;  │ ... │  ARGn  │  ;  │
//! └────────────────────┴──────────┴─────┴────────┴─────┴─────┴────────┴─────┘
//! ```
//!
//! Every argument, including the last, is followed by the separator. There is
//! no escaping: an argument containing `;` cannot be represented, so
//! [`UriCodec::encode`] refuses it instead of producing an ambiguous string.
//!
//! ## Action Families
//!
//! - **Native-bound** ([`NativeAction`]): issued by the page (load, play/pause, seek)
//! - **Web-bound** ([`WebAction`]): pushed by native code (duration, position, state)

use core::fmt;

use thiserror::Error;

/// Scheme used by the bundled web client
pub const DEFAULT_SCHEME: &str = "nativewebsample";

/// Separator terminating the action and every argument
pub const SEPARATOR: char = ';';

/// Actions the web content sends to the native side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeAction {
    /// `ACTION_LOAD_VIDEO;<url>[;<autoplay>];`
    LoadVideo,
    /// `ACTION_PLAY_PAUSE_VIDEO;`
    PlayPauseVideo,
    /// `ACTION_REWIND_VIDEO;<seconds>;`
    RewindVideo,
    /// `ACTION_FASTFORWARD_VIDEO;<seconds>;`
    FastForwardVideo,
}

impl NativeAction {
    /// Wire name of the action
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoadVideo => "ACTION_LOAD_VIDEO",
            Self::PlayPauseVideo => "ACTION_PLAY_PAUSE_VIDEO",
            Self::RewindVideo => "ACTION_REWIND_VIDEO",
            Self::FastForwardVideo => "ACTION_FASTFORWARD_VIDEO",
        }
    }
}

impl TryFrom<&str> for NativeAction {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "ACTION_LOAD_VIDEO" => Ok(Self::LoadVideo),
            "ACTION_PLAY_PAUSE_VIDEO" => Ok(Self::PlayPauseVideo),
            "ACTION_REWIND_VIDEO" => Ok(Self::RewindVideo),
            "ACTION_FASTFORWARD_VIDEO" => Ok(Self::FastForwardVideo),
            _ => Err(()),
        }
    }
}

impl fmt::Display for NativeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions the native side pushes into the web content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebAction {
    /// Media duration in whole seconds
    Duration,
    /// Playback position in whole seconds
    CurrentPosition,
    /// `PLAYING` or `PAUSED`
    PlayState,
    /// Buffering progress, 0-100
    BufferingPercent,
    /// Raw key code forwarded from the host
    KeyEvent,
}

impl WebAction {
    /// Wire name of the action
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Duration => "DATA_DURATION",
            Self::CurrentPosition => "DATA_CURRENT_POSITION",
            Self::PlayState => "DATA_PLAY_STATE",
            Self::BufferingPercent => "DATA_BUFFERING_PERCENT",
            Self::KeyEvent => "KEY_EVENT",
        }
    }
}

impl TryFrom<&str> for WebAction {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "DATA_DURATION" => Ok(Self::Duration),
            "DATA_CURRENT_POSITION" => Ok(Self::CurrentPosition),
            "DATA_PLAY_STATE" => Ok(Self::PlayState),
            "DATA_BUFFERING_PERCENT" => Ok(Self::BufferingPercent),
            "KEY_EVENT" => Ok(Self::KeyEvent),
            _ => Err(()),
        }
    }
}

impl fmt::Display for WebAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value carried by `DATA_PLAY_STATE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
}

impl PlayState {
    pub fn from_playing(is_playing: bool) -> Self {
        if is_playing {
            Self::Playing
        } else {
            Self::Paused
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Playing => "PLAYING",
            Self::Paused => "PAUSED",
        }
    }
}

/// A decoded command: action name plus positional arguments
///
/// Arguments are kept exactly as split from the wire, so a terminating
/// separator shows up as a trailing empty argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Action name (first element after the scheme)
    pub action: String,
    /// Positional arguments, untyped
    pub args: Vec<String>,
}

impl Command {
    /// Create a new command from an action and its arguments
    pub fn new<S: Into<String>>(action: impl Into<String>, args: impl IntoIterator<Item = S>) -> Self {
        Self {
            action: action.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve the action name against the native-bound actions
    pub fn native_action(&self) -> Option<NativeAction> {
        NativeAction::try_from(self.action.as_str()).ok()
    }

    /// Arguments with trailing empty entries removed
    ///
    /// This matches how the web client counts fields: `ACTION;30;` carries a
    /// single argument even though the split yields `["30", ""]`.
    pub fn trimmed_args(&self) -> &[String] {
        let end = self
            .args
            .iter()
            .rposition(|arg| !arg.is_empty())
            .map_or(0, |idx| idx + 1);
        &self.args[..end]
    }

    /// Number of wire fields (action included) after trimming
    pub fn field_count(&self) -> usize {
        1 + self.trimmed_args().len()
    }
}

/// Errors during command encoding/decoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input does not start with the registered scheme prefix
    #[error("uri does not start with `{0}`")]
    MissingScheme(String),
    /// Nothing follows the scheme prefix
    #[error("uri has no command after the scheme")]
    EmptyBody,
    /// The action name contains the separator
    #[error("action `{0}` contains the separator")]
    SeparatorInAction(String),
    /// An argument contains the separator and cannot be represented
    #[error("argument {index} contains the separator")]
    SeparatorInArgument {
        /// Position of the offending argument
        index: usize,
    },
}

impl CodecError {
    /// Whether this error means "not one of ours" rather than a caller bug
    pub fn is_not_recognized(&self) -> bool {
        matches!(self, Self::MissingScheme(_) | Self::EmptyBody)
    }
}

/// Encoder/decoder bound to one scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriCodec {
    prefix: String,
}

impl UriCodec {
    /// Create a codec for `scheme` (without the `://`)
    pub fn new(scheme: &str) -> Self {
        Self {
            prefix: format!("{scheme}://"),
        }
    }

    /// Encode an action and its arguments into a URI
    pub fn encode<S: AsRef<str>>(&self, action: &str, args: &[S]) -> Result<String, CodecError> {
        if action.contains(SEPARATOR) {
            return Err(CodecError::SeparatorInAction(action.to_owned()));
        }

        let mut uri = String::with_capacity(
            self.prefix.len() + action.len() + 1 + args.iter().map(|a| a.as_ref().len() + 1).sum::<usize>(),
        );
        uri.push_str(&self.prefix);
        uri.push_str(action);
        uri.push(SEPARATOR);

        for (index, arg) in args.iter().enumerate() {
            let arg = arg.as_ref();
            if arg.contains(SEPARATOR) {
                return Err(CodecError::SeparatorInArgument { index });
            }
            uri.push_str(arg);
            uri.push(SEPARATOR);
        }

        Ok(uri)
    }

    /// Encode a web-bound action
    pub fn encode_web<S: AsRef<str>>(&self, action: WebAction, args: &[S]) -> Result<String, CodecError> {
        self.encode(action.as_str(), args)
    }

    /// Decode a URI into a [`Command`]
    ///
    /// Fails only when the scheme prefix is missing or nothing follows it.
    /// Unknown action names decode successfully; resolving them is up to the
    /// receiver.
    pub fn decode(&self, uri: &str) -> Result<Command, CodecError> {
        let body = uri
            .strip_prefix(self.prefix.as_str())
            .ok_or_else(|| CodecError::MissingScheme(self.prefix.clone()))?;

        if body.is_empty() {
            return Err(CodecError::EmptyBody);
        }

        let mut parts = body.split(SEPARATOR);
        let action = parts.next().ok_or(CodecError::EmptyBody)?;

        Ok(Command {
            action: action.to_owned(),
            args: parts.map(str::to_owned).collect(),
        })
    }
}

impl Default for UriCodec {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEME)
    }
}
