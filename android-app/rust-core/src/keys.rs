//! Key routing and page URL helpers for the host shell.
//!
//! The WebView turns d-pad presses into mouse-like focus moves, which fights
//! the page's own focus handling. Keys listed here are swallowed by the host
//! and re-injected into the page as `KEY_EVENT` commands instead.

use shared::traits::BridgeConfig;

pub const KEYCODE_DPAD_UP: i32 = 19;
pub const KEYCODE_DPAD_DOWN: i32 = 20;
pub const KEYCODE_DPAD_LEFT: i32 = 21;
pub const KEYCODE_DPAD_RIGHT: i32 = 22;
pub const KEYCODE_DPAD_CENTER: i32 = 23;
pub const KEYCODE_R: i32 = 46;

const DPAD_KEYS: [i32; 5] = [
    KEYCODE_DPAD_CENTER,
    KEYCODE_DPAD_UP,
    KEYCODE_DPAD_LEFT,
    KEYCODE_DPAD_DOWN,
    KEYCODE_DPAD_RIGHT,
];

/// What the host should do with a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRoute {
    /// Reload the page before anything else
    pub refresh: bool,
    /// Forward the key code to the page's key handler
    pub inject: bool,
    /// The host must not pass the event on to the WebView
    pub consumed: bool,
}

#[derive(Debug, Clone)]
pub struct KeyRouter {
    override_codes: Vec<i32>,
    development_build: bool,
}

impl KeyRouter {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            override_codes: if config.consume_dpad {
                DPAD_KEYS.to_vec()
            } else {
                Vec::new()
            },
            development_build: config.development_build,
        }
    }

    /// Route one key event; overridden keys are injected on key-up only
    pub fn route(&self, key_code: i32, key_up: bool) -> KeyRoute {
        let consumed = self.override_codes.contains(&key_code);
        KeyRoute {
            refresh: self.development_build && key_code == KEYCODE_R,
            inject: consumed && key_up,
            consumed,
        }
    }
}

/// Mark a page URL as embedded so the page enables its native-player features
pub fn embedded_url(url: &str) -> String {
    let has_query = match (url.find('/'), url.rfind('?')) {
        (Some(slash), Some(query)) => slash < query,
        _ => false,
    };

    if has_query {
        format!("{url}&embedded=true")
    } else {
        format!("{url}?embedded=true")
    }
}
