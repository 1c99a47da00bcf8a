//! Game viewer owning the navigation state and the autoplay task

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use super::navigator::{BoardView, Navigator};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingest::{prepare_upload, UploadPayload};
use crate::parser::GameRecord;
use crate::replay::{HistoryEntry, Replayer};

const MANUAL_GAME_NOTICE: &str =
    "Move data is unavailable for this game: it was recovered with the fallback parser";

#[derive(Default)]
struct ViewerState {
    games: Vec<GameRecord>,
    selected: Option<usize>,
    navigator: Navigator,
    is_playing: bool,
    /// Bumped whenever a running autoplay task must stop ticking
    generation: u64,
    notice: Option<String>,
    raw_text: Option<String>,
}

impl ViewerState {
    fn halt(&mut self) {
        self.is_playing = false;
        self.generation += 1;
    }
}

fn lock(state: &Mutex<ViewerState>) -> MutexGuard<'_, ViewerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One viewer instance: a list of games, the selected game's replay and
/// at most one autoplay timer.
pub struct GameViewer {
    state: Arc<Mutex<ViewerState>>,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl GameViewer {
    pub fn new(config: &Config) -> Self {
        Self {
            state: Arc::new(Mutex::new(ViewerState::default())),
            interval: config.autoplay_interval(),
            task: None,
        }
    }

    /// Parses `text` and selects its first game. On failure the raw text is
    /// kept with an explanatory notice so there is always something to show.
    pub fn open(&mut self, text: &str, config: &Config) -> Result<UploadPayload> {
        match prepare_upload(text.to_string(), config) {
            Ok(payload) => {
                self.load_games(payload.games.clone());
                let mut state = lock(&self.state);
                state.raw_text = Some(payload.raw.clone());
                if state.notice.is_none() {
                    state.notice = payload.warnings.first().cloned();
                }
                Ok(payload)
            }
            Err(e) => {
                self.load_games(Vec::new());
                let mut state = lock(&self.state);
                state.raw_text = Some(text.to_string());
                state.notice = Some(format!("Unable to display this PGN: {}", e));
                Err(e)
            }
        }
    }

    /// Replaces the game list and selects the first game, if any.
    pub fn load_games(&mut self, games: Vec<GameRecord>) {
        self.stop_autoplay();
        let has_games = !games.is_empty();
        {
            let mut state = lock(&self.state);
            state.games = games;
            state.selected = None;
            state.navigator = Navigator::default();
            state.notice = None;
            state.raw_text = None;
        }
        if has_games {
            if let Err(e) = self.select_game(0) {
                tracing::warn!("Cannot select the first game: {}", e);
            }
        }
    }

    /// Switches to another game, rebuilding its history from the start.
    /// Returns the history length.
    pub fn select_game(&mut self, index: usize) -> Result<usize> {
        self.stop_autoplay();

        let mut state = lock(&self.state);
        let count = state.games.len();
        let game = state
            .games
            .get(index)
            .ok_or(Error::GameNotFound { index, count })?;

        let mut replayer = Replayer::new();
        replayer.load_game(game);
        let notice = game.is_manually_parsed.then(|| MANUAL_GAME_NOTICE.to_string());

        let orientation = state.navigator.orientation();
        state.navigator = Navigator::new(replayer.into_history());
        if orientation != state.navigator.orientation() {
            state.navigator.flip_board();
        }
        state.selected = Some(index);
        state.notice = notice;

        Ok(state.navigator.len())
    }

    pub fn game_count(&self) -> usize {
        lock(&self.state).games.len()
    }

    pub fn selected_index(&self) -> Option<usize> {
        lock(&self.state).selected
    }

    pub fn selected_game(&self) -> Option<GameRecord> {
        let state = lock(&self.state);
        state.selected.and_then(|i| state.games.get(i).cloned())
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        lock(&self.state).navigator.history().to_vec()
    }

    pub fn history_len(&self) -> usize {
        lock(&self.state).navigator.len()
    }

    pub fn current_move_index(&self) -> isize {
        lock(&self.state).navigator.current_index()
    }

    pub fn board_view(&self) -> BoardView {
        lock(&self.state).navigator.board_view()
    }

    pub fn notice(&self) -> Option<String> {
        lock(&self.state).notice.clone()
    }

    pub fn raw_text(&self) -> Option<String> {
        lock(&self.state).raw_text.clone()
    }

    pub fn flip_board(&self) {
        lock(&self.state).navigator.flip_board();
    }

    pub fn go_to_move(&self, index: isize) -> bool {
        lock(&self.state).navigator.go_to_move(index)
    }

    pub fn go_to_first(&self) -> bool {
        lock(&self.state).navigator.go_to_first()
    }

    pub fn go_to_last(&self) -> bool {
        lock(&self.state).navigator.go_to_last()
    }

    pub fn go_to_previous(&self) -> bool {
        lock(&self.state).navigator.go_to_previous()
    }

    pub fn go_to_next(&self) -> bool {
        lock(&self.state).navigator.go_to_next()
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.state).is_playing
    }

    /// Starts stepping forward every interval until the last move. Does
    /// nothing if already playing. Must be called inside a tokio runtime.
    pub fn start_autoplay(&mut self) {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("Autoplay needs a tokio runtime; ignoring start request");
            return;
        };

        let generation = {
            let mut state = lock(&self.state);
            if state.is_playing {
                return;
            }
            state.is_playing = true;
            state.generation += 1;
            state.generation
        };

        if let Some(finished) = self.task.take() {
            finished.abort();
        }

        tracing::debug!("Autoplay started (generation {})", generation);
        let state = Arc::clone(&self.state);
        self.task = Some(handle.spawn(run_autoplay(state, generation, self.interval)));
    }

    /// Cancels the autoplay timer; idempotent.
    pub fn stop_autoplay(&mut self) {
        lock(&self.state).halt();
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Autoplay stopped");
        }
    }

    pub fn toggle_autoplay(&mut self) {
        if self.is_playing() {
            self.stop_autoplay();
        } else {
            self.start_autoplay();
        }
    }

    /// Tears the viewer down; no tick runs after this returns.
    pub fn close(&mut self) {
        self.stop_autoplay();
    }
}

impl Drop for GameViewer {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_autoplay(state: Arc<Mutex<ViewerState>>, generation: u64, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);

    loop {
        ticker.tick().await;

        let keep_going = {
            let mut guard = lock(&state);
            if guard.generation != generation || !guard.is_playing {
                false
            } else {
                guard.navigator.go_to_next();
                if guard.navigator.is_at_end() {
                    guard.is_playing = false;
                    tracing::debug!("Autoplay reached the last move");
                    false
                } else {
                    true
                }
            }
        };

        if !keep_going {
            break;
        }
    }
}
