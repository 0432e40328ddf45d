//! # Shared Protocol Library
//!
//! This crate provides the core abstractions for the web/native playback bridge:
//!
//! - **URI Command Codec**: the `scheme://ACTION;arg;` format spoken by both sides
//! - **Collaborator Traits**: playback engine and content surface implemented by the host
//! - **Configuration**: scheme, script receivers and poller period
//!
//! ## Architecture
//!
//! ```text
//! Web content ──── "nativewebsample://ACTION_…;" ────► native bridge
//!                                                          │
//!                                                  PlaybackEngine
//!                                                          │
//! Web content ◄─── "nativewebsample://DATA_…;" ────── dispatcher
//! ```

pub mod protocol;
pub mod traits;

// Re-export main types for convenience
pub use protocol::{Command, CodecError, NativeAction, PlayState, UriCodec, WebAction};
pub use traits::{
    BridgeConfig, ContentSurface, EngineError, EngineResult, LoadTicket, PlaybackEngine,
    PlaybackSnapshot,
};

/// Library version for protocol compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
