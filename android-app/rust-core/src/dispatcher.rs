//! # Web-bound Dispatcher
//!
//! Turns native state changes into `javascript:` URLs and delivers them to
//! the page on the render thread.
//!
//! ```text
//!  poller thread ──┐
//!  engine thread ──┼──► queue (FIFO) ──► request_drain ──► render thread: drain()
//!  render thread ──┘                 └──────────────────► drained in place
//! ```
//!
//! The dispatcher is a pure ordered relay: nothing is merged, dropped or
//! reordered once queued.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use log::{error, trace, warn};
use shared::protocol::{UriCodec, WebAction};
use shared::traits::{BridgeConfig, ContentSurface};

/// Ordered relay of web-bound commands onto the render thread
pub struct WebDispatcher {
    codec: UriCodec,
    player_receiver: String,
    key_receiver: String,
    surface: Arc<dyn ContentSurface>,
    render_thread: Mutex<ThreadId>,
    queue: Mutex<VecDeque<String>>,
}

impl WebDispatcher {
    /// Create a dispatcher bound to the calling thread as render thread
    pub fn new(config: &BridgeConfig, surface: Arc<dyn ContentSurface>) -> Self {
        Self {
            codec: UriCodec::new(&config.scheme),
            player_receiver: config.player_receiver.clone(),
            key_receiver: config.key_receiver.clone(),
            surface,
            render_thread: Mutex::new(thread::current().id()),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Declare the calling thread as the render thread
    pub fn bind_render_thread(&self) {
        *self
            .render_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = thread::current().id();
    }

    /// Whether the calling thread is the render thread
    pub fn is_render_thread(&self) -> bool {
        *self
            .render_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            == thread::current().id()
    }

    /// Send a playback data action to the player receiver
    pub fn send<S: AsRef<str>>(&self, action: WebAction, args: &[S]) {
        self.send_to(&self.player_receiver, action, args);
    }

    /// Inject a raw key code into the page's key handler
    pub fn send_key_event(&self, key_code: i32) {
        self.send_to(&self.key_receiver, WebAction::KeyEvent, &[key_code.to_string()]);
    }

    fn send_to<S: AsRef<str>>(&self, receiver: &str, action: WebAction, args: &[S]) {
        let uri = match self.codec.encode_web(action, args) {
            Ok(uri) => uri,
            Err(e) => {
                error!("Cannot encode {action}: {e}");
                return;
            }
        };

        self.queue().push_back(script_for(receiver, &uri));

        if self.is_render_thread() {
            self.drain();
        } else {
            self.surface.request_drain();
        }
    }

    /// Deliver every queued script in order
    ///
    /// Must run on the render thread; elsewhere the host is asked to call
    /// back and nothing is delivered. Returns the number of scripts delivered.
    pub fn drain(&self) -> usize {
        if !self.is_render_thread() {
            warn!("drain() called off the render thread, rescheduling");
            self.surface.request_drain();
            return 0;
        }

        let mut delivered = 0;
        loop {
            // Guard must be gone before the page is called
            let next = self.queue().pop_front();
            let Some(script) = next else { break };
            trace!("-> {script}");
            self.surface.load_url(&script);
            delivered += 1;
        }
        delivered
    }

    /// Number of scripts waiting for the render thread
    pub fn pending(&self) -> usize {
        self.queue().len()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wrap a URI in a call to `receiver.handleUri`
fn script_for(receiver: &str, uri: &str) -> String {
    let mut script = String::with_capacity(receiver.len() + uri.len() + 28);
    script.push_str("javascript:");
    script.push_str(receiver);
    script.push_str(".handleUri('");
    for c in uri.chars() {
        match c {
            '\\' => script.push_str("\\\\"),
            '\'' => script.push_str("\\'"),
            '\n' => script.push_str("\\n"),
            '\r' => script.push_str("\\r"),
            _ => script.push(c),
        }
    }
    script.push_str("');");
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSurface;

    fn dispatcher() -> (WebDispatcher, Arc<MockSurface>) {
        let surface = Arc::new(MockSurface::default());
        (WebDispatcher::new(&BridgeConfig::default(), surface.clone()), surface)
    }

    #[test]
    fn test_render_thread_delivers_in_place() {
        let (dispatcher, surface) = dispatcher();
        dispatcher.send(WebAction::Duration, &["12"]);

        assert_eq!(
            surface.loaded(),
            vec!["javascript:fullscreenPage.handleUri('nativewebsample://DATA_DURATION;12;');".to_owned()]
        );
        assert_eq!(dispatcher.pending(), 0);
        assert_eq!(surface.drain_requests(), 0);
    }

    #[test]
    fn test_other_threads_are_marshaled() {
        let (dispatcher, surface) = dispatcher();
        let dispatcher = Arc::new(dispatcher);

        let worker = {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                for position in 0..5 {
                    dispatcher.send(WebAction::CurrentPosition, &[position.to_string()]);
                }
                // Draining is refused off the render thread
                assert_eq!(dispatcher.drain(), 0);
            })
        };
        worker.join().unwrap();

        assert!(surface.loaded().is_empty());
        assert_eq!(dispatcher.pending(), 5);
        assert!(surface.drain_requests() >= 5);

        assert_eq!(dispatcher.drain(), 5);
        let positions: Vec<String> = surface
            .web_commands()
            .into_iter()
            .map(|(_, args)| args[0].clone())
            .collect();
        assert_eq!(positions, ["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn test_render_thread_send_flushes_older_messages_first() {
        let (dispatcher, surface) = dispatcher();
        let dispatcher = Arc::new(dispatcher);

        let d = dispatcher.clone();
        thread::spawn(move || d.send(WebAction::BufferingPercent, &["40"]))
            .join()
            .unwrap();
        dispatcher.send(WebAction::PlayState, &["PLAYING"]);

        let actions: Vec<String> = surface.web_commands().into_iter().map(|(a, _)| a).collect();
        assert_eq!(actions, ["DATA_BUFFERING_PERCENT", "DATA_PLAY_STATE"]);
    }

    #[test]
    fn test_rebinding_render_thread() {
        let (dispatcher, _surface) = dispatcher();
        let dispatcher = Arc::new(dispatcher);
        let d = dispatcher.clone();
        let bound_elsewhere = thread::spawn(move || {
            d.bind_render_thread();
            d.is_render_thread()
        })
        .join()
        .unwrap();

        assert!(bound_elsewhere);
        assert!(!dispatcher.is_render_thread());
    }

    #[test]
    fn test_key_event_goes_to_key_handler() {
        let (dispatcher, surface) = dispatcher();
        dispatcher.send_key_event(23);
        assert_eq!(
            surface.loaded(),
            vec!["javascript:androidKeyHandler.handleUri('nativewebsample://KEY_EVENT;23;');".to_owned()]
        );
    }

    #[test]
    fn test_separator_in_argument_is_not_sent() {
        let (dispatcher, surface) = dispatcher();
        dispatcher.send(WebAction::PlayState, &["PLAY;ING"]);
        assert!(surface.loaded().is_empty());
        assert_eq!(dispatcher.pending(), 0);
    }

    #[test]
    fn test_script_escapes_quotes() {
        assert_eq!(
            script_for("page", "s://A;it's;"),
            "javascript:page.handleUri('s://A;it\\'s;');"
        );
        assert_eq!(script_for("page", "s://A;a\\b;"), "javascript:page.handleUri('s://A;a\\\\b;');");
    }
}
