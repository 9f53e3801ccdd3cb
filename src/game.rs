// The game core: one single-threaded coordinator for the three event
// sources (camera frames, the 1 Hz countdown, the recognition poll clock).
//
// Each handler runs to completion before the next is dispatched, so the
// canvas and the round state never see interleaved mutation:
//
// ```text
// frame ─▶ normalize ─▶ classify ─┬▶ stroke renderer ─▶ canvas
//                      smooth ────┘                        │ snapshot
// clock ─▶ countdown ─▶ poll tick ─────────────────────────┘
// poll responses ─▶ session (generation check, win check)
// ```

use std::time::{Duration, Instant};

use tracing::info;

use crate::classifier::Classifier;
use crate::config::Config;
use crate::gesture::{GesturePolicy, InputState};
use crate::landmarks::{HandLandmarks, normalize};
use crate::poller::{PollResponse, PollTick, Poller};
use crate::session::{PollOutcome, RoundState, Session};
use crate::smoothing::PositionSmoother;
use crate::stroke::StrokeRenderer;
use crate::types::{FrameBuffer, Point2D};
use crate::words::WordPicker;

pub struct Game {
    policy: GesturePolicy,
    smoother: PositionSmoother,
    canvas: StrokeRenderer,
    session: Session,
    poller: Poller,
    words: WordPicker,

    // ── last frame, for the UI ───────────────────────────────────────────
    input: InputState,
    cursor: Option<Point2D>,
}

impl Game {
    pub fn new<C: Classifier>(cfg: &Config, classifier: C, words: WordPicker) -> Self {
        Self {
            policy: GesturePolicy::from_kind(cfg.policy, cfg.pinch_threshold),
            smoother: PositionSmoother::new(cfg.smoothing, cfg.surface_width, cfg.surface_height),
            canvas: StrokeRenderer::new(
                cfg.surface_width,
                cfg.surface_height,
                cfg.background,
                cfg.ink,
                cfg.line_width,
            ),
            session: Session::new(cfg.round_seconds),
            poller: Poller::spawn(
                classifier,
                Duration::from_millis(cfg.poll_interval_ms),
                Duration::from_millis(cfg.classifier_timeout_ms),
            ),
            words,
            input: InputState::Idle,
            cursor: None,
        }
    }

    // ── transitions ──────────────────────────────────────────────────────

    /// New round: fresh word, blank canvas, full timer, new generation.
    pub fn start(&mut self, now: Instant) {
        let word = self.words.pick();
        self.canvas.clear();
        self.session.start(now, word);
        self.poller.start(now);
    }

    pub fn set_policy(&mut self, policy: GesturePolicy) {
        if policy != self.policy {
            info!(policy = %policy.kind(), "gesture policy changed");
            self.policy = policy;
            self.canvas.lift();
        }
    }

    // ── event handlers ───────────────────────────────────────────────────

    /// One camera frame (`None` = no hand). Strokes are only committed
    /// while a round is being played.
    pub fn on_frame(&mut self, hand: Option<&HandLandmarks>) -> InputState {
        let sample = normalize(hand);
        let state = self.policy.classify(sample.as_ref());

        self.cursor = match sample {
            Some(s) => Some(self.smoother.update(s.tip)),
            None => {
                self.smoother.reset();
                None
            }
        };

        if self.session.is_playing() {
            self.canvas.apply(state, self.cursor);
        } else {
            self.canvas.lift();
        }
        self.input = state;
        state
    }

    /// Countdown first (it may end the round), then the poll clock.
    pub fn on_clock(&mut self, now: Instant) -> PollTick {
        self.session.on_clock(now);
        self.sync_timers();
        self.poller.tick(now, self.session.generation(), &self.canvas)
    }

    /// Apply every classifier answer that has come back since last call.
    pub fn on_poll_responses(&mut self) -> Vec<PollOutcome> {
        let responses = self.poller.drain();
        responses.into_iter().map(|r| self.apply_poll_response(r)).collect()
    }

    /// Fold a single response in; stale generations change nothing.
    pub fn apply_poll_response(&mut self, response: PollResponse) -> PollOutcome {
        let outcome = self.session.apply_poll(response);
        self.sync_timers();
        outcome
    }

    /// Leaving `Playing` by any path disarms the poll clock; the session
    /// already dropped its countdown.
    fn sync_timers(&mut self) {
        if !self.session.is_playing() && self.poller.is_running() {
            self.poller.stop();
            self.canvas.lift();
        }
    }

    // ── accessors for the render loop ────────────────────────────────────

    pub fn round(&self) -> &RoundState { self.session.state() }
    pub fn generation(&self) -> u64 { self.session.generation() }
    pub fn input(&self) -> InputState { self.input }
    pub fn cursor(&self) -> Option<Point2D> { self.cursor }
    pub fn canvas(&self) -> &StrokeRenderer { &self.canvas }
    pub fn surface(&self) -> &FrameBuffer { self.canvas.surface() }
    pub fn policy(&self) -> GesturePolicy { self.policy }
    pub fn polling(&self) -> bool { self.poller.is_running() }
    pub fn countdown_running(&self) -> bool { self.session.countdown_running() }
}
