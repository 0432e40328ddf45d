//! # Host Collaborator Traits
//!
//! The bridge never talks to a concrete media player or web view. The host
//! (the Android activity in production, mocks in tests) implements the traits
//! below and the core drives them.
//!
//! - **Interface Segregation**: playback and content rendering are separate traits
//! - **Dependency Inversion**: the session controller depends on these abstractions
//!
//! ## Threading Contract
//!
//! ```text
//!  render thread ──► ContentSurface::load_url / reload / go_back
//!  any thread    ──► ContentSurface::request_drain
//!  any thread    ──► PlaybackEngine::*
//! ```
//!
//! `ContentSurface` methods other than `request_drain` are only called on the
//! content-rendering thread. Implementations must not call back into the
//! bridge synchronously from any of these methods.

use core::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::DEFAULT_SCHEME;

/// Errors reported by the playback engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The media source was rejected
    #[error("invalid media source: {0}")]
    InvalidSource(String),
    /// The call is not allowed in the engine's current state
    #[error("engine is in an illegal state for `{0}`")]
    IllegalState(&'static str),
    /// The source could not be opened or read
    #[error("I/O error: {0}")]
    Io(String),
    /// The call into the host failed (e.g. a JNI exception)
    #[error("host call failed: {0}")]
    Host(String),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Identifies one `load_video` request
///
/// The engine hands the ticket back with its prepare-completion so late
/// completions of superseded loads can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoadTicket(pub u64);

impl LoadTicket {
    /// The ticket following this one
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Opaque media player driven by the session controller
///
/// Positions and durations are in milliseconds. Seeks outside the media are
/// the engine's to clamp.
pub trait PlaybackEngine: Send + Sync {
    /// Drop the current source and return to the idle state
    fn reset(&self) -> EngineResult<()>;

    /// Set the media source to prepare next
    fn set_source(&self, url: &str) -> EngineResult<()>;

    /// Begin asynchronous preparation
    ///
    /// Completion must be reported back with the same `ticket`.
    fn prepare_async(&self, ticket: LoadTicket) -> EngineResult<()>;

    /// Start or resume playback
    fn play(&self) -> EngineResult<()>;

    /// Pause playback
    fn pause(&self) -> EngineResult<()>;

    /// Seek to an absolute position
    fn seek_to(&self, position_ms: i64) -> EngineResult<()>;

    /// Current playback position
    fn current_position(&self) -> i64;

    /// Duration of the prepared media
    fn duration(&self) -> i64;

    /// Whether the engine is currently playing
    fn is_playing(&self) -> bool;

    /// Release all engine resources; the engine is unusable afterwards
    fn release(&self);
}

/// The web view hosting the page
pub trait ContentSurface: Send + Sync {
    /// Load a URL (including `javascript:` URLs) into the page
    fn load_url(&self, url: &str);

    /// Reload the current page
    fn reload(&self);

    /// Whether the history stack can go back
    fn can_go_back(&self) -> bool;

    /// Navigate one step back in history
    fn go_back(&self);

    /// Ask the host to call the dispatcher's drain on the render thread
    ///
    /// May be called from any thread.
    fn request_drain(&self);
}

/// Point-in-time view of the playback engine
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    /// Media duration in milliseconds
    pub duration_ms: i64,
    /// Playback position in milliseconds
    pub position_ms: i64,
    /// Whether the engine is playing
    pub is_playing: bool,
    /// Last reported buffering progress (0-100)
    pub buffering_percent: u8,
}

/// Configuration for the bridge
///
/// Deserialized from the JSON handed over by the host; every field is
/// optional and falls back to [`BridgeConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// URI scheme shared with the web client
    pub scheme: String,
    /// Script object receiving playback data
    pub player_receiver: String,
    /// Script object receiving key events
    pub key_receiver: String,
    /// Period of the playback state poller in milliseconds
    pub update_period_ms: u64,
    /// Consume d-pad keys and inject them into the page
    pub consume_dpad: bool,
    /// Development build: `R` reloads the page
    pub development_build: bool,
}

impl BridgeConfig {
    /// Poller period as a [`Duration`]
    pub fn update_period(&self) -> Duration {
        Duration::from_millis(self.update_period_ms.max(1))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_owned(),
            player_receiver: "fullscreenPage".to_owned(),
            key_receiver: "androidKeyHandler".to_owned(),
            update_period_ms: 900,
            consume_dpad: true,
            development_build: false,
        }
    }
}
