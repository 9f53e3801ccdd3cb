// Round lifecycle: `Idle → Playing → {Won, Lost}`, restart via `start()`.
//
// The session is the single writer of [`RoundState`]. It owns the 1 Hz
// countdown and the round generation counter that fences off poll
// responses sent during an earlier round.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::classifier::{ERROR_GUESS, parse_guesses};
use crate::clock::Interval;
use crate::poller::PollResponse;

pub const DEFAULT_ROUND_SECONDS: u32 = 20;
const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus { Idle, Playing, Won, Lost }

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

/// Read-only view for the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundState {
    pub status: RoundStatus,
    pub target_word: String,
    pub seconds_remaining: u32,
    /// Latest ranked guesses, most confident first. Kept while a poll is in
    /// flight or after one fails (then it holds the error placeholder).
    pub guesses: Vec<String>,
}

/// What a poll response did to the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// From an earlier round, or the round is already over: ignored.
    Stale,
    /// Guesses replaced; `won` when the target appeared in the answer.
    Guessed { won: bool },
    /// Request failed; the error placeholder is shown.
    Failed,
}

pub struct Session {
    state: RoundState,
    generation: u64,
    round_seconds: u32,
    countdown: Option<Interval>, // Some only while Playing
}

impl Session {
    pub fn new(round_seconds: u32) -> Self {
        Self {
            state: RoundState {
                status: RoundStatus::Idle,
                target_word: String::new(),
                seconds_remaining: round_seconds,
                guesses: Vec::new(),
            },
            generation: 0,
            round_seconds,
            countdown: None,
        }
    }

    pub fn state(&self) -> &RoundState { &self.state }
    pub fn status(&self) -> RoundStatus { self.state.status }
    pub fn is_playing(&self) -> bool { self.state.status == RoundStatus::Playing }
    pub fn generation(&self) -> u64 { self.generation }
    pub fn countdown_running(&self) -> bool { self.countdown.is_some() }

    /// Begin a new round (from any state). Bumping the generation
    /// invalidates every poll still in flight. Clearing the canvas is the
    /// caller's half of the transition.
    pub fn start(&mut self, now: Instant, target_word: String) -> u64 {
        self.generation += 1;
        self.state = RoundState {
            status: RoundStatus::Playing,
            target_word,
            seconds_remaining: self.round_seconds,
            guesses: Vec::new(),
        };
        self.countdown = Some(Interval::starting(now, COUNTDOWN_PERIOD));
        info!(
            generation = self.generation,
            word = %self.state.target_word,
            seconds = self.round_seconds,
            "round started"
        );
        self.generation
    }

    /// Run every countdown second that has elapsed by `now`.
    pub fn on_clock(&mut self, now: Instant) {
        while let Some(countdown) = self.countdown.as_mut() {
            if !countdown.due(now) {
                break;
            }
            self.tick_second();
        }
    }

    /// One countdown second. Reaching zero loses the round and stops the timer.
    pub fn tick_second(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.state.seconds_remaining = self.state.seconds_remaining.saturating_sub(1);
        if self.state.seconds_remaining == 0 {
            self.finish(RoundStatus::Lost);
        }
    }

    /// Fold one classifier round trip into the round.
    pub fn apply_poll(&mut self, response: PollResponse) -> PollOutcome {
        if response.generation != self.generation || !self.is_playing() {
            debug!(
                response = response.generation,
                current = self.generation,
                status = self.state.status.as_str(),
                "stale poll response discarded"
            );
            return PollOutcome::Stale;
        }

        match response.result {
            Ok(text) => {
                self.state.guesses = parse_guesses(&text);
                let won = mentions(&text, &self.state.target_word);
                debug!(answer = %text, won, "classifier guesses");
                if won {
                    self.finish(RoundStatus::Won);
                }
                PollOutcome::Guessed { won }
            }
            Err(e) => {
                warn!("classifier request failed: {e}");
                self.state.guesses = vec![ERROR_GUESS.to_string()];
                PollOutcome::Failed
            }
        }
    }

    fn finish(&mut self, status: RoundStatus) {
        self.state.status = status;
        self.countdown = None;
        info!(
            generation = self.generation,
            word = %self.state.target_word,
            seconds_left = self.state.seconds_remaining,
            "round {}",
            status.as_str()
        );
    }
}

/// Case-insensitive substring match of `word` anywhere in the answer.
fn mentions(answer: &str, word: &str) -> bool {
    !word.is_empty() && answer.to_lowercase().contains(&word.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn playing(word: &str) -> (Session, Instant) {
        let mut s = Session::new(DEFAULT_ROUND_SECONDS);
        let t0 = Instant::now();
        s.start(t0, word.to_string());
        (s, t0)
    }

    fn answer(generation: u64, text: &str) -> PollResponse {
        PollResponse { generation, result: Ok(text.to_string()) }
    }

    #[test]
    fn starts_idle() {
        let s = Session::new(DEFAULT_ROUND_SECONDS);
        assert_eq!(s.status(), RoundStatus::Idle);
        assert_eq!(s.generation(), 0);
        assert!(!s.countdown_running());
    }

    #[test]
    fn start_resets_round() {
        let (mut s, t0) = playing("Fish");
        s.apply_poll(answer(1, "Line, Scribble"));
        s.on_clock(t0 + Duration::from_secs(5));
        let g = s.start(t0 + Duration::from_secs(5), "Boat".into());
        assert_eq!(g, 2);
        let st = s.state();
        assert_eq!(st.status, RoundStatus::Playing);
        assert_eq!(st.target_word, "Boat");
        assert_eq!(st.seconds_remaining, 20);
        assert!(st.guesses.is_empty());
    }

    #[test]
    fn target_in_answer_wins() {
        let (mut s, _) = playing("Boat");
        assert_eq!(s.apply_poll(answer(1, "Fish, Boat, Bird")), PollOutcome::Guessed { won: true });
        assert_eq!(s.status(), RoundStatus::Won);
        assert!(!s.countdown_running());
        assert_eq!(s.state().guesses, vec!["Fish", "Boat", "Bird"]);
    }

    #[test]
    fn target_absent_keeps_playing() {
        let (mut s, _) = playing("Boat");
        assert_eq!(s.apply_poll(answer(1, "Line, Scribble")), PollOutcome::Guessed { won: false });
        assert_eq!(s.status(), RoundStatus::Playing);
        assert_eq!(s.state().guesses, vec!["Line", "Scribble"]);
    }

    #[test]
    fn win_match_ignores_case_and_matches_substrings() {
        let (mut s, _) = playing("Sun");
        s.apply_poll(answer(1, "a SUNflower, maybe"));
        assert_eq!(s.status(), RoundStatus::Won);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let (mut s, t0) = playing("Boat");
        s.apply_poll(answer(1, "Line"));
        s.start(t0, "Tree".into()); // generation 2
        assert_eq!(s.apply_poll(answer(1, "Tree, Bush, Boat")), PollOutcome::Stale);
        assert_eq!(s.status(), RoundStatus::Playing);
        assert!(s.state().guesses.is_empty());
    }

    #[test]
    fn failure_shows_placeholder_and_keeps_playing() {
        let (mut s, _) = playing("Boat");
        s.apply_poll(answer(1, "Line, Curve"));
        let out = s.apply_poll(PollResponse {
            generation: 1,
            result: Err(Error::ClassifierRequestFailed("timeout".into())),
        });
        assert_eq!(out, PollOutcome::Failed);
        assert_eq!(s.state().guesses, vec![ERROR_GUESS]);
        assert_eq!(s.status(), RoundStatus::Playing);
        assert!(s.countdown_running());
    }

    #[test]
    fn last_second_loses_and_stops() {
        let (mut s, _) = playing("Boat");
        s.state.seconds_remaining = 1;
        s.tick_second();
        assert_eq!(s.status(), RoundStatus::Lost);
        assert_eq!(s.state().seconds_remaining, 0);
        assert!(!s.countdown_running());
        s.tick_second();
        assert_eq!(s.state().seconds_remaining, 0);
        assert_eq!(s.status(), RoundStatus::Lost);
    }

    #[test]
    fn countdown_runs_out_on_clock() {
        let (mut s, t0) = playing("Boat");
        s.on_clock(t0 + Duration::from_millis(3500));
        assert_eq!(s.state().seconds_remaining, 17);
        s.on_clock(t0 + Duration::from_secs(60));
        assert_eq!(s.status(), RoundStatus::Lost);
        assert_eq!(s.state().seconds_remaining, 0);
    }

    #[test]
    fn finished_round_ignores_late_answers() {
        let (mut s, t0) = playing("Boat");
        s.on_clock(t0 + Duration::from_secs(20));
        assert_eq!(s.status(), RoundStatus::Lost);
        assert_eq!(s.apply_poll(answer(1, "Boat")), PollOutcome::Stale);
        assert_eq!(s.status(), RoundStatus::Lost);
    }
}
