// What you SEE:
// • A white canvas. Raise your index finger (or pinch, with --policy pinch)
//   and move it to draw; curl the finger to lift the pen.
// • SPACE starts a 20 s round with a word to draw; the top bar shows what
//   the vision model currently thinks it sees.
// • P switches between index and pinch drawing. ESC quits.
// • Without a camera build (or with --simulate), the mouse is the hand:
//   hold the left button to draw.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use ocean_canvas::Config;
use ocean_canvas::app::{RunOptions, run};
use ocean_canvas::gesture::PolicyKind;

#[derive(Parser, Debug)]
#[command(name = "ocean-canvas", about = "Draw in the air; a vision model guesses your sketch")]
struct Cli {
    /// TOML config file (defaults are used for anything it leaves out)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Draw trigger: index or pinch
    #[arg(long)]
    policy: Option<PolicyKind>,

    /// Use the mouse instead of the camera
    #[arg(long)]
    simulate: bool,

    /// Use canned guesses instead of the classifier command
    #[arg(long)]
    offline: bool,

    /// Write the default config to this path and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ocean_canvas=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.write_default_config {
        Config::default()
            .save(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("default config written to {}", path.display());
        return Ok(());
    }

    let mut cfg = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(policy) = cli.policy {
        cfg.policy = policy;
    }

    let simulate = cli.simulate || !cfg!(feature = "camera");
    if simulate {
        info!("mode: mouse simulation (hold the left button to draw)");
    } else {
        info!("mode: camera {}", cfg.camera_index);
    }

    run(cfg, RunOptions { simulate, offline: cli.offline }).context("game loop")?;
    Ok(())
}
