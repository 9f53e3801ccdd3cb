// Top-level run loop: window, input source, game, HUD.
//
// One iteration per displayed frame, always in the same order: keys, hand
// frame, clocks (countdown then poll), classifier answers, render, present.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::classifier::{Classifier, ProcessClassifier, ScriptedClassifier};
use crate::config::Config;
use crate::detector::{FrameEvent, latest, mouse_hand};
use crate::draw::{
    Drawer, blit_scaled, draw_cursor, draw_text_5x7, draw_text_centered, fill_rect,
};
use crate::error::Error;
use crate::game::Game;
use crate::gesture::{GesturePolicy, InputState, PolicyKind};
use crate::session::RoundStatus;
use crate::types::FrameBuffer;
use crate::words::WordPicker;

const TITLE: &str = "Ocean Canvas";

// HUD colours (0x00RRGGBB)
const HUD_TEXT: u32 = 0x00FF_FFFF;
const HUD_BAR: u32 = 0x0014_2B4A;
const CURSOR_DRAW: u32 = 0x00FF_3355;
const CURSOR_HOVER: u32 = 0x0000_B4D8;
const WIN_TEXT: u32 = 0x0033_DD66;
const LOSE_TEXT: u32 = 0x00FF_5544;

const PREVIEW_W: i32 = 160;
const PREVIEW_H: i32 = 120;

/// What the command line asked for on top of the config file.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    /// Mouse stands in for the hand; no camera is opened.
    pub simulate: bool,
    /// Canned classifier answers instead of `classifier_command`.
    pub offline: bool,
}

/// Where hand frames come from.
#[cfg_attr(not(feature = "camera"), allow(dead_code))]
enum HandInput {
    Mouse,
    Stream {
        rx: Receiver<FrameEvent>,
        preview: Option<FrameBuffer>,
        connected: bool,
    },
}

/// Open the window and play until it is closed or ESC is pressed.
pub fn run(cfg: Config, opts: RunOptions) -> Result<(), Error> {
    cfg.validate()?;

    let classifier = make_classifier(&cfg, opts.offline)?;
    let words = WordPicker::from_clock(cfg.words.clone());
    let mut game = Game::new(&cfg, classifier, words);
    let mut input = make_input(&cfg, opts.simulate);

    let (w, h) = (cfg.surface_width, cfg.surface_height);
    let mut drawer = Drawer::new(TITLE, w, h)?;
    let mut screen = FrameBuffer::filled(w, h, cfg.background);

    info!(policy = %game.policy().kind(), simulate = matches!(input, HandInput::Mouse), "ready, press SPACE to start");

    while drawer.is_open() && !drawer.esc_pressed() {
        let now = Instant::now();

        // 1) keys
        if drawer.space_pressed_once() && game.round().status != RoundStatus::Playing {
            game.start(now);
        }
        if drawer.p_pressed_once() {
            let next = match game.policy().kind() {
                PolicyKind::Index => PolicyKind::Pinch,
                PolicyKind::Pinch => PolicyKind::Index,
            };
            game.set_policy(GesturePolicy::from_kind(next, cfg.pinch_threshold));
        }

        // 2) hand frame
        match &mut input {
            HandInput::Mouse => {
                let hand = drawer
                    .mouse_pos()
                    .map(|(x, y)| mouse_hand(x, y, w, h, drawer.left_mouse_down()));
                game.on_frame(hand.as_ref());
            }
            HandInput::Stream { rx, preview, connected } => match latest(rx) {
                Ok(Some(ev)) => {
                    game.on_frame(ev.hand.as_ref());
                    if ev.preview.is_some() {
                        *preview = ev.preview;
                    }
                }
                Ok(None) => {}
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    if *connected {
                        warn!("camera source stopped; no hand from now on");
                        *connected = false;
                        game.on_frame(None);
                    }
                }
            },
        }

        // 3) clocks, 4) answers
        game.on_clock(now);
        game.on_poll_responses();

        // 5) render + present
        let preview = match &input {
            HandInput::Stream { preview, .. } => preview.as_ref(),
            HandInput::Mouse => None,
        };
        render_scene(&mut screen, &game, preview);
        drawer.present(&screen)?;
    }

    info!("window closed");
    Ok(())
}

fn make_classifier(cfg: &Config, offline: bool) -> Result<Box<dyn Classifier>, Error> {
    match (&cfg.classifier_command, offline) {
        (Some(argv), false) => {
            info!(command = %argv.join(" "), "using external classifier");
            let timeout = Duration::from_millis(cfg.classifier_timeout_ms);
            Ok(Box::new(ProcessClassifier::new(argv.clone(), timeout)?))
        }
        (None, false) => {
            warn!("no classifier_command configured; playing with offline guesses");
            Ok(Box::new(ScriptedClassifier::new(cfg.offline_guesses.clone())))
        }
        (_, true) => {
            info!("offline mode: scripted guesses");
            Ok(Box::new(ScriptedClassifier::new(cfg.offline_guesses.clone())))
        }
    }
}

#[cfg(feature = "camera")]
fn make_input(cfg: &Config, simulate: bool) -> HandInput {
    use crate::detector::{CameraSource, spawn_landmark_source};

    if simulate {
        return HandInput::Mouse;
    }
    let detector_argv = cfg.detector_command.clone().unwrap_or_else(|| {
        warn!("no detector_command configured; camera preview only");
        Vec::new()
    });
    let rx = spawn_landmark_source(CameraSource {
        index: cfg.camera_index,
        width: cfg.camera_width,
        height: cfg.camera_height,
        detector_argv,
    });
    HandInput::Stream { rx, preview: None, connected: true }
}

#[cfg(not(feature = "camera"))]
fn make_input(_cfg: &Config, simulate: bool) -> HandInput {
    if !simulate {
        warn!("built without the `camera` feature; using the mouse");
    }
    HandInput::Mouse
}

/// Compose one displayed frame: canvas, camera preview, cursor, HUD, prompts.
pub fn render_scene(screen: &mut FrameBuffer, game: &Game, preview: Option<&FrameBuffer>) {
    screen.pixels.copy_from_slice(&game.surface().pixels);
    let (sw, sh) = (screen.width as i32, screen.height as i32);

    if let Some(cam) = preview {
        blit_scaled(screen, cam, sw - PREVIEW_W - 8, 30, PREVIEW_W, PREVIEW_H, HUD_TEXT);
    }

    if let Some(p) = game.cursor() {
        let (cx, cy) = (p.x as i32, p.y as i32);
        match game.input() {
            InputState::Draw => draw_cursor(screen, cx, cy, 8, CURSOR_DRAW, true),
            InputState::Hover => draw_cursor(screen, cx, cy, 10, CURSOR_HOVER, false),
            // Idle means no hand, and then there is no cursor either.
            InputState::Idle => {}
        }
    }

    let round = game.round();
    fill_rect(screen, 0, 0, sw, 24, HUD_BAR);
    draw_text_5x7(screen, 8, 6, &hud_line(game), HUD_TEXT, 2);

    let hint = format!("SPACE: NEW ROUND  P: DRAW WITH {}  ESC: QUIT", game.policy().kind());
    draw_text_5x7(screen, 8, sh - 16, &hint, CURSOR_HOVER, 1);

    let word = round.target_word.to_uppercase();
    match round.status {
        RoundStatus::Idle => draw_text_centered(screen, sh / 2 - 14, "PRESS SPACE TO START", CURSOR_HOVER, 4),
        RoundStatus::Won => {
            draw_text_centered(screen, sh / 2 - 30, &format!("MASTERPIECE! IT WAS {word}"), WIN_TEXT, 3);
            draw_text_centered(screen, sh / 2 + 10, "PRESS SPACE TO PLAY AGAIN", HUD_TEXT, 2);
        }
        RoundStatus::Lost => {
            draw_text_centered(screen, sh / 2 - 30, &format!("TIME'S UP! IT WAS {word}"), LOSE_TEXT, 3);
            draw_text_centered(screen, sh / 2 + 10, "PRESS SPACE TO TRY AGAIN", HUD_TEXT, 2);
        }
        RoundStatus::Playing => {}
    }
}

/// `DRAW THIS: HOUSE | 17S | AI SEES: TREE`
pub fn hud_line(game: &Game) -> String {
    let round = game.round();
    let seen = round.guesses.first().map(String::as_str).unwrap_or("drawing...");
    format!(
        "DRAW THIS: {} | {}S | AI SEES: {}",
        round.target_word.to_uppercase(),
        round.seconds_remaining,
        seen.to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::HandLandmarks;
    use crate::poller::PollResponse;
    use crate::types::Point2D;

    fn game() -> (Game, Config) {
        let cfg = Config { words: vec!["House".into()], ..Config::default() };
        let g = Game::new(&cfg, ScriptedClassifier::new(vec![]), WordPicker::new(cfg.words.clone(), 3));
        (g, cfg)
    }

    #[test]
    fn hud_shows_word_time_and_top_guess() {
        let (mut g, _) = game();
        g.start(Instant::now());
        assert_eq!(hud_line(&g), "DRAW THIS: HOUSE | 20S | AI SEES: DRAWING...");

        g.apply_poll_response(PollResponse { generation: g.generation(), result: Ok("Tree, Car".into()) });
        assert_eq!(hud_line(&g), "DRAW THIS: HOUSE | 20S | AI SEES: TREE");
    }

    #[test]
    fn scene_draws_over_the_canvas_without_touching_it() {
        let (g, cfg) = game();
        let mut screen = FrameBuffer::filled(cfg.surface_width, cfg.surface_height, 0);
        let cam = FrameBuffer::filled(64, 48, 0x0000_FF00);
        render_scene(&mut screen, &g, Some(&cam));

        // HUD bar on top, preview in the top-right corner.
        assert_eq!(screen.get(2, 2), Some(HUD_BAR));
        let px = cfg.surface_width - PREVIEW_W as usize;
        assert_eq!(screen.get(px, 60), Some(0x0000_FF00));
        assert!(g.surface().pixels.iter().all(|&p| p == cfg.background));
    }

    #[test]
    fn offline_flag_wins_over_configured_command() {
        let cfg = Config { classifier_command: Some(vec!["false".into()]), ..Config::default() };
        let mut c = make_classifier(&cfg, true).unwrap();
        assert_eq!(c.classify(&[], "x").unwrap(), cfg.offline_guesses[0]);
    }

    #[test]
    fn cursor_ring_follows_hand_and_vanishes_without_one() {
        let (mut g, cfg) = game();
        let mut screen = FrameBuffer::filled(cfg.surface_width, cfg.surface_height, 0);
        // Lands on pixel (400, 450) after mirroring, below the idle prompt.
        let hand = HandLandmarks::synthetic(Point2D::new(0.5, 0.75), false, false);

        assert_eq!(g.on_frame(Some(&hand)), InputState::Hover);
        render_scene(&mut screen, &g, None);
        assert_eq!(screen.get(409, 450), Some(CURSOR_HOVER));

        assert_eq!(g.on_frame(None), InputState::Idle);
        render_scene(&mut screen, &g, None);
        assert_eq!(screen.get(409, 450), Some(cfg.background));
    }
}
