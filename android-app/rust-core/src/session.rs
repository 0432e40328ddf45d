//! # Playback Session Controller
//!
//! Owns the lifecycle of one media source and drives the playback engine,
//! the update poller and the web-bound dispatcher.
//!
//! ## State Machine
//!
//! ```text
//!            load_video              prepared            play
//!  Idle ───────────────► Loading ─────────────► Prepared ─────► Playing
//!   ▲                     ▲  ▲                     │     pause    │  ▲
//!   │ suspend / go_back   │  └──── load_video ─────┘   ┌──────────┘  │
//!   └─────────────────────┘                            ▼        play │
//!                                                    Paused ─────────┘
//! ```
//!
//! All state lives behind one mutex. Requests from the page, poller ticks and
//! engine completions (which arrive on arbitrary threads) are serialized on
//! it. The engine cannot cancel a preparation, so completions carry the
//! [`LoadTicket`] of their load and are ignored once superseded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use log::{debug, error, info, warn};
use shared::protocol::{PlayState, WebAction};
use shared::traits::{ContentSurface, LoadTicket, PlaybackEngine, PlaybackSnapshot};
use tokio::runtime::Handle;

use crate::bridge::{VideoCommand, VideoCommandSink};
use crate::dispatcher::WebDispatcher;
use crate::poller::UpdatePoller;

/// Lifecycle state of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading,
    Prepared,
    Playing,
    Paused,
}

impl SessionState {
    /// Whether the engine has a prepared source
    pub fn is_prepared(self) -> bool {
        matches!(self, Self::Prepared | Self::Playing | Self::Paused)
    }
}

/// One load-to-unload lifecycle of a media source
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub state: SessionState,
    pub source_url: Option<String>,
    /// Page that issued the load
    pub origin_page: Option<String>,
    pub auto_play_requested: bool,
    pub ticket: Option<LoadTicket>,
    pub buffering_percent: u8,
}

struct Inner {
    session: Session,
    current_page: Option<String>,
    poller: Option<UpdatePoller>,
    next_ticket: LoadTicket,
}

/// Drives the playback engine on behalf of the page
pub struct SessionController {
    engine: Arc<dyn PlaybackEngine>,
    surface: Arc<dyn ContentSurface>,
    dispatcher: Arc<WebDispatcher>,
    runtime: Handle,
    update_period: Duration,
    inner: Mutex<Inner>,
    this: Weak<SessionController>,
}

impl SessionController {
    /// Create a controller; the poller is spawned on `runtime`
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        surface: Arc<dyn ContentSurface>,
        dispatcher: Arc<WebDispatcher>,
        runtime: Handle,
        update_period: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            engine,
            surface,
            dispatcher,
            runtime,
            update_period,
            inner: Mutex::new(Inner {
                session: Session::default(),
                current_page: None,
                poller: None,
                next_ticket: LoadTicket(1),
            }),
            this: this.clone(),
        })
    }

    /// Load a new source, discarding whatever was loaded before
    ///
    /// Engine failures are logged and leave the session in `Loading`.
    pub fn load_video(&self, url: &str, auto_play: bool) {
        info!("loadVideo() url = {url} autoPlay = {auto_play}");
        let mut inner = self.lock();

        if let Some(poller) = inner.poller.take() {
            poller.stop();
        }

        let ticket = inner.next_ticket;
        inner.next_ticket = ticket.next();
        inner.session = Session {
            state: SessionState::Loading,
            source_url: Some(url.to_owned()),
            origin_page: inner.current_page.clone(),
            auto_play_requested: auto_play,
            ticket: Some(ticket),
            buffering_percent: 0,
        };

        if let Err(e) = self.engine.reset() {
            error!("Failed to reset engine before loading {url}: {e}");
            return;
        }
        self.push_reset();

        // Completion must arrive asynchronously; the session lock is held here
        if let Err(e) = self
            .engine
            .set_source(url)
            .and_then(|()| self.engine.prepare_async(ticket))
        {
            error!("Failed to prepare {url}: {e}");
        }
    }

    /// Engine finished preparing the source of `ticket`
    pub fn on_prepared(&self, ticket: LoadTicket) {
        let mut inner = self.lock();
        let session = &inner.session;

        if session.state != SessionState::Loading || session.ticket != Some(ticket) {
            debug!("Discarding stale prepare completion {ticket:?}");
            return;
        }
        // A load issued before any page was reported has no identity to match
        if session.origin_page.is_none() || session.origin_page != inner.current_page {
            debug!(
                "Discarding prepare completion for {:?}, page is now {:?}",
                session.origin_page, inner.current_page
            );
            return;
        }

        inner.session.state = SessionState::Prepared;
        self.dispatcher.send(
            WebAction::Duration,
            &[(self.engine.duration() / 1000).to_string()],
        );
        self.push_position(&inner);

        if std::mem::take(&mut inner.session.auto_play_requested) {
            self.play(&mut inner);
        }
    }

    /// Toggle between playing and paused
    pub fn play_pause_video(&self) {
        let mut inner = self.lock();
        if !inner.session.state.is_prepared() {
            debug!("playPauseVideo() ignored in {:?}", inner.session.state);
            return;
        }

        if self.engine.is_playing() {
            self.pause(&mut inner);
        } else {
            self.play(&mut inner);
        }
    }

    pub fn fast_forward_video(&self, skip_ms: i64) {
        self.seek_by(skip_ms);
    }

    pub fn rewind_video(&self, skip_ms: i64) {
        self.seek_by(-skip_ms);
    }

    fn seek_by(&self, delta_ms: i64) {
        let _inner = self.lock();
        let target = self.engine.current_position() + delta_ms;
        if let Err(e) = self.engine.seek_to(target) {
            error!("Seek to {target}ms failed: {e}");
        }
    }

    /// Navigate the page back and wind down playback
    pub fn go_back(&self) {
        self.surface.go_back();

        let mut inner = self.lock();
        if self.engine.is_playing() {
            if let Err(e) = self.engine.reset() {
                error!("Failed to reset engine on back navigation: {e}");
            }
            inner.session.state = SessionState::Idle;
        }

        if !self.engine.is_playing() {
            if let Some(poller) = inner.poller.take() {
                poller.stop();
            }
        }
    }

    pub fn can_go_back(&self) -> bool {
        self.surface.can_go_back()
    }

    /// Poller tick: push position and play state
    pub fn on_perform_update(&self) {
        let inner = self.lock();
        if !inner.session.state.is_prepared() {
            return;
        }

        self.push_position(&inner);
        self.push_play_state();
    }

    /// Engine buffering progress
    pub fn on_buffering_update(&self, percent: i32) {
        let mut inner = self.lock();
        if !inner.session.state.is_prepared() {
            return;
        }

        let percent = percent.clamp(0, 100) as u8;
        inner.session.buffering_percent = percent;
        self.dispatcher
            .send(WebAction::BufferingPercent, &[percent.to_string()]);
    }

    /// The page reported a navigation; `url` becomes the current page identity
    pub fn page_changed(&self, url: &str) {
        self.lock().current_page = Some(url.to_owned());
    }

    /// Host is going to the background: stop everything and release the engine
    pub fn suspend(&self) {
        let mut inner = self.lock();
        inner.session.state = SessionState::Idle;
        if let Some(poller) = inner.poller.take() {
            poller.stop();
        }
        self.engine.release();
        info!("Session suspended, engine released");
    }

    /// Host is back in the foreground: reload the page
    pub fn resume(&self) {
        self.surface.reload();
    }

    /// Sample the engine
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let inner = self.lock();
        if !inner.session.state.is_prepared() {
            return PlaybackSnapshot::default();
        }

        PlaybackSnapshot {
            duration_ms: self.engine.duration(),
            position_ms: self.engine.current_position(),
            is_playing: self.engine.is_playing(),
            buffering_percent: inner.session.buffering_percent,
        }
    }

    pub fn session(&self) -> Session {
        self.lock().session.clone()
    }

    pub fn state(&self) -> SessionState {
        self.lock().session.state
    }

    pub fn is_polling(&self) -> bool {
        self.lock().poller.as_ref().is_some_and(UpdatePoller::is_running)
    }

    fn play(&self, inner: &mut Inner) {
        if self.engine.is_playing() || !inner.session.state.is_prepared() {
            return;
        }

        if inner.poller.is_none() {
            let this = self.this.clone();
            inner.poller = Some(UpdatePoller::start(
                &self.runtime,
                self.update_period,
                move || {
                    if let Some(controller) = this.upgrade() {
                        controller.on_perform_update();
                    }
                },
            ));
        }

        debug!("playVideo() start");
        match self.engine.play() {
            Ok(()) => inner.session.state = SessionState::Playing,
            Err(e) => error!("Failed to start playback: {e}"),
        }
    }

    fn pause(&self, inner: &mut Inner) {
        if !self.engine.is_playing() || !inner.session.state.is_prepared() {
            return;
        }

        // The poller keeps running while paused
        match self.engine.pause() {
            Ok(()) => inner.session.state = SessionState::Paused,
            Err(e) => error!("Failed to pause playback: {e}"),
        }
    }

    fn push_reset(&self) {
        self.dispatcher.send(WebAction::CurrentPosition, &["0"]);
        self.dispatcher.send(WebAction::Duration, &["0"]);
        self.push_play_state();
    }

    fn push_position(&self, inner: &Inner) {
        let seconds = if inner.session.state.is_prepared() {
            self.engine.current_position() / 1000
        } else {
            0
        };
        self.dispatcher
            .send(WebAction::CurrentPosition, &[seconds.to_string()]);
    }

    fn push_play_state(&self) {
        let state = PlayState::from_playing(self.engine.is_playing());
        self.dispatcher.send(WebAction::PlayState, &[state.as_str()]);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VideoCommandSink for SessionController {
    fn dispatch(&self, command: VideoCommand) {
        match command {
            VideoCommand::Load { url, auto_play } => self.load_video(&url, auto_play),
            VideoCommand::PlayPause => self.play_pause_video(),
            VideoCommand::Rewind { ms } => self.rewind_video(ms),
            VideoCommand::FastForward { ms } => self.fast_forward_video(ms),
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(poller) = inner.poller.take() {
            warn!("Session controller dropped while polling");
            poller.stop();
        }
    }
}
