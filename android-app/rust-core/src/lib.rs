//! # Android JNI Rust Core Library
//!
//! This library provides the native backend of a web app that plays video
//! through the platform player instead of an HTML5 `<video>` tag. It handles:
//!
//! - Validating commands sent by the page (`nativewebsample://ACTION_…;`)
//! - Driving the media player through the load/play/pause/seek lifecycle
//! - Pushing playback state back into the page on the WebView's thread
//!
//! ## JNI Bridge Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Android App (Kotlin)                       │
//! │                                                                 │
//! │  ┌─────────────────┐     ┌──────────────────────────────────┐  │
//! │  │     WebView     │────►│  RustBridge host (MediaPlayer)   │  │
//! │  └─────────────────┘     └──────────────────────────────────┘  │
//! │           ▲                            │                        │
//! │           │ javascript:                │ JNI Calls              │
//! │           │                            ▼                        │
//! │  ┌──────────────────────────────────────────────────────────┐  │
//! │  │                    rust_core (this lib)                   │  │
//! │  │                                                           │  │
//! │  │  ┌──────────┐  ┌────────────┐  ┌─────────┐  ┌──────────┐  │  │
//! │  │  │  Bridge  │─►│  Session   │─►│ Poller  │  │Dispatcher│  │  │
//! │  │  │ (in URI) │  │ Controller │─────────────►│ (out URI)│  │  │
//! │  │  └──────────┘  └────────────┘  └─────────┘  └──────────┘  │  │
//! │  └──────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## JNI Functions Exported
//!
//! See [`jni_api`]; every function except `nativeInit` and
//! `nativeEmbeddedUrl` takes the handle returned by `nativeInit`.

pub mod bridge;
pub mod dispatcher;
pub mod host;
pub mod jni_api;
pub mod keys;
pub mod poller;
pub mod session;

#[cfg(test)]
mod testing;

use std::num::ParseIntError;
use std::sync::{Arc, Once};

use log::{info, LevelFilter};
use serde::Deserialize;
use shared::protocol::UriCodec;
use shared::traits::{BridgeConfig, ContentSurface, LoadTicket, PlaybackEngine, PlaybackSnapshot};
use thiserror::Error;
use tokio::runtime::Runtime;

use crate::bridge::NativeBridge;
use crate::dispatcher::WebDispatcher;
use crate::keys::KeyRouter;
use crate::session::SessionController;

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Errors that can occur in the bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("invalid seek seconds `{value}`: {source}")]
    InvalidSeconds {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("failed to start poller runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("JNI error: {0}")]
    Jni(#[from] jni::errors::Error),
}

/// Configuration handed over by the host as JSON
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    #[serde(flatten)]
    pub bridge: BridgeConfig,
    /// Maximum log level forwarded to logcat
    pub log_level: LevelFilter,
}

impl CoreConfig {
    /// Parse the host's JSON; an empty string means defaults
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            log_level: LevelFilter::Debug,
        }
    }
}

/// Route `log` output to logcat (no-op off Android beyond the level filter)
pub fn init_logger(level: LevelFilter) {
    INIT_LOGGER.call_once(|| {
        #[cfg(target_os = "android")]
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(level)
                .with_tag("NativeWeb"),
        );
        #[cfg(not(target_os = "android"))]
        log::set_max_level(level);
    });
}

/// Everything behind one JNI handle
///
/// Must be created on the render thread, which the dispatcher binds to.
pub struct NativeWebCore {
    bridge: NativeBridge<Arc<SessionController>>,
    controller: Arc<SessionController>,
    dispatcher: Arc<WebDispatcher>,
    surface: Arc<dyn ContentSurface>,
    keys: KeyRouter,
    // Dropped last: the controller's poller runs on it
    _runtime: Runtime,
}

impl NativeWebCore {
    pub fn new(
        config: &BridgeConfig,
        engine: Arc<dyn PlaybackEngine>,
        surface: Arc<dyn ContentSurface>,
    ) -> Result<Self, BridgeError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("nativeweb-poller")
            .enable_time()
            .build()
            .map_err(BridgeError::Runtime)?;

        let dispatcher = Arc::new(WebDispatcher::new(config, surface.clone()));
        let controller = SessionController::new(
            engine,
            surface.clone(),
            dispatcher.clone(),
            runtime.handle().clone(),
            config.update_period(),
        );
        let bridge = NativeBridge::new(UriCodec::new(&config.scheme), controller.clone());

        info!("Native web core created, protocol version {}", shared::VERSION);

        Ok(Self {
            bridge,
            controller,
            dispatcher,
            surface,
            keys: KeyRouter::new(config),
            _runtime: runtime,
        })
    }

    /// URI from the page's `AppInterface.handleURI`
    pub fn handle_uri(&self, uri: &str) -> Result<(), BridgeError> {
        self.bridge.handle(uri)
    }

    /// Deliver queued scripts; render thread only
    pub fn drain(&self) -> usize {
        self.dispatcher.drain()
    }

    /// Make the calling thread the render thread, e.g. after the WebView is recreated
    pub fn bind_render_thread(&self) {
        self.dispatcher.bind_render_thread();
    }

    pub fn on_prepared(&self, ticket: LoadTicket) {
        self.controller.on_prepared(ticket);
    }

    pub fn on_buffering_update(&self, percent: i32) {
        self.controller.on_buffering_update(percent);
    }

    pub fn page_changed(&self, url: &str) {
        self.controller.page_changed(url);
    }

    pub fn can_go_back(&self) -> bool {
        self.controller.can_go_back()
    }

    pub fn go_back(&self) {
        self.controller.go_back();
    }

    /// Forward a key code into the page's key handler
    pub fn handle_key_injection(&self, key_code: i32) {
        self.dispatcher.send_key_event(key_code);
    }

    /// Route a raw key event; returns whether the host must consume it
    pub fn key_event(&self, key_code: i32, key_up: bool) -> bool {
        let route = self.keys.route(key_code, key_up);
        if route.refresh {
            self.surface.reload();
        }
        if route.inject {
            self.handle_key_injection(key_code);
        }
        route.consumed
    }

    pub fn suspend(&self) {
        self.controller.suspend();
    }

    pub fn resume(&self) {
        self.controller.resume();
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.controller.snapshot()
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }
}
