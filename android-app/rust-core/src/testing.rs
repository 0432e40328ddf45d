//! In-memory engine and surface used by the unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use shared::protocol::UriCodec;
use shared::traits::{ContentSurface, EngineError, EngineResult, LoadTicket, PlaybackEngine};

#[derive(Debug, Default)]
struct EngineState {
    playing: bool,
    position_ms: i64,
    duration_ms: i64,
    source: Option<String>,
    tickets: Vec<LoadTicket>,
    seeks: Vec<i64>,
    resets: usize,
    fail_next_source: bool,
    released: bool,
}

/// Player that clamps seeks to `[0, duration]` and never completes on its own
#[derive(Debug, Default)]
pub struct MockEngine {
    state: Mutex<EngineState>,
}

impl MockEngine {
    pub fn with_duration(duration_ms: i64) -> Self {
        Self {
            state: Mutex::new(EngineState {
                duration_ms,
                ..EngineState::default()
            }),
        }
    }

    pub fn last_ticket(&self) -> Option<LoadTicket> {
        self.state.lock().unwrap().tickets.last().copied()
    }

    pub fn source(&self) -> Option<String> {
        self.state.lock().unwrap().source.clone()
    }

    pub fn seeks(&self) -> Vec<i64> {
        self.state.lock().unwrap().seeks.clone()
    }

    pub fn resets(&self) -> usize {
        self.state.lock().unwrap().resets
    }

    pub fn released(&self) -> bool {
        self.state.lock().unwrap().released
    }

    pub fn set_position(&self, position_ms: i64) {
        self.state.lock().unwrap().position_ms = position_ms;
    }

    pub fn fail_next_source(&self) {
        self.state.lock().unwrap().fail_next_source = true;
    }
}

impl PlaybackEngine for MockEngine {
    fn reset(&self) -> EngineResult<()> {
        let mut state = self.state.lock().unwrap();
        state.resets += 1;
        state.playing = false;
        state.position_ms = 0;
        state.source = None;
        Ok(())
    }

    fn set_source(&self, url: &str) -> EngineResult<()> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_next_source) {
            return Err(EngineError::InvalidSource(url.to_owned()));
        }
        state.source = Some(url.to_owned());
        Ok(())
    }

    fn prepare_async(&self, ticket: LoadTicket) -> EngineResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.source.is_none() {
            return Err(EngineError::IllegalState("prepareAsync"));
        }
        state.tickets.push(ticket);
        Ok(())
    }

    fn play(&self) -> EngineResult<()> {
        self.state.lock().unwrap().playing = true;
        Ok(())
    }

    fn pause(&self) -> EngineResult<()> {
        self.state.lock().unwrap().playing = false;
        Ok(())
    }

    fn seek_to(&self, position_ms: i64) -> EngineResult<()> {
        let mut state = self.state.lock().unwrap();
        state.seeks.push(position_ms);
        state.position_ms = position_ms.clamp(0, state.duration_ms);
        Ok(())
    }

    fn current_position(&self) -> i64 {
        self.state.lock().unwrap().position_ms
    }

    fn duration(&self) -> i64 {
        self.state.lock().unwrap().duration_ms
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    fn release(&self) {
        let mut state = self.state.lock().unwrap();
        state.released = true;
        state.playing = false;
    }
}

/// Web view stand-in recording every URL it is asked to load
#[derive(Debug, Default)]
pub struct MockSurface {
    loaded: Mutex<Vec<String>>,
    drain_requests: AtomicUsize,
    back_navigations: AtomicUsize,
    reloads: AtomicUsize,
    history: AtomicBool,
}

impl MockSurface {
    pub fn loaded(&self) -> Vec<String> {
        self.loaded.lock().unwrap().clone()
    }

    /// Decode every `javascript:<receiver>.handleUri('<uri>');` into (action, args)
    pub fn web_commands(&self) -> Vec<(String, Vec<String>)> {
        let codec = UriCodec::default();
        self.loaded()
            .iter()
            .filter_map(|script| {
                let start = script.find("('")? + 2;
                let end = script.rfind("');")?;
                let command = codec.decode(&script[start..end]).ok()?;
                Some((command.action.clone(), command.trimmed_args().to_vec()))
            })
            .collect()
    }

    pub fn drain_requests(&self) -> usize {
        self.drain_requests.load(Ordering::SeqCst)
    }

    pub fn back_navigations(&self) -> usize {
        self.back_navigations.load(Ordering::SeqCst)
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn set_history(&self, can_go_back: bool) {
        self.history.store(can_go_back, Ordering::SeqCst);
    }
}

impl ContentSurface for MockSurface {
    fn load_url(&self, url: &str) {
        self.loaded.lock().unwrap().push(url.to_owned());
    }

    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }

    fn can_go_back(&self) -> bool {
        self.history.load(Ordering::SeqCst)
    }

    fn go_back(&self) {
        self.back_navigations.fetch_add(1, Ordering::SeqCst);
    }

    fn request_drain(&self) {
        self.drain_requests.fetch_add(1, Ordering::SeqCst);
    }
}
