//! Command-line arguments and cue scripts.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use swirl_audio::CueDispatcher;
use tracing::info;

/// Step names listed under `--help`.
const STEPS_HELP: &str = "\
Steps:
  rotate          piece rotation click
  block           block spawn knock
  loop:N          loop of N pipes
  emergency       start the emergency beeps
  stop            stop the emergency beeps
  gameover        game over rumble
  wait:MS         pause for MS milliseconds
  effects:on|off  toggle sound effects
  music:on|off    toggle background music";

/// One action of a cue script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Rotate,
    Block,
    Loop(u32),
    Emergency,
    Stop,
    GameOver,
    Wait(Duration),
    Effects(bool),
    Music(bool),
}

impl Step {
    /// Trigger the step on the dispatcher; waits only for `Wait`.
    pub async fn run(&self, dispatcher: &CueDispatcher) {
        match *self {
            Self::Rotate => dispatcher.play_rotate(),
            Self::Block => dispatcher.play_block_appear(),
            Self::Loop(length) => dispatcher.play_loop_complete(length),
            Self::Emergency => dispatcher.play_emergency(),
            Self::Stop => dispatcher.stop_emergency(),
            Self::GameOver => dispatcher.play_game_over(),
            Self::Wait(duration) => tokio::time::sleep(duration).await,
            Self::Effects(enabled) => dispatcher.set_effects_enabled(enabled),
            Self::Music(enabled) => dispatcher.set_music_enabled(enabled),
        }
    }
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };

        let step = match (name, arg) {
            ("rotate", None) => Self::Rotate,
            ("block", None) => Self::Block,
            ("emergency", None) => Self::Emergency,
            ("stop", None) => Self::Stop,
            ("gameover", None) => Self::GameOver,
            ("loop", Some(n)) => Self::Loop(
                n.parse()
                    .with_context(|| format!("Invalid loop length in '{s}'"))?,
            ),
            ("wait", Some(ms)) => Self::Wait(Duration::from_millis(
                ms.parse()
                    .with_context(|| format!("Invalid wait in '{s}'"))?,
            )),
            ("effects", Some(state)) => Self::Effects(parse_switch(state)?),
            ("music", Some(state)) => Self::Music(parse_switch(state)?),
            _ => bail!("Unknown step '{s}'"),
        };
        Ok(step)
    }
}

fn parse_switch(state: &str) -> Result<bool> {
    match state {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(anyhow!("Expected 'on' or 'off', got '{other}'")),
    }
}

/// Script played when no steps are given.
pub fn demo_script() -> Vec<Step> {
    vec![
        Step::Block,
        Step::Rotate,
        Step::Wait(Duration::from_millis(300)),
        Step::Loop(6),
        Step::Wait(Duration::from_millis(1200)),
        Step::Emergency,
        Step::Wait(Duration::from_millis(2500)),
        Step::Stop,
        Step::GameOver,
    ]
}

/// Swirl cues - play the Swirl puzzle game's sound cues
#[derive(Debug, Parser)]
#[command(name = "swirl-cues")]
#[command(about = "Play the Swirl puzzle game's sound cues")]
#[command(version)]
#[command(after_help = STEPS_HELP)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log cues instead of sending them to the output device
    #[arg(long)]
    pub silent: bool,

    /// Cue script to play; a short demo plays when empty
    #[arg(value_name = "STEP")]
    pub steps: Vec<Step>,
}

impl Cli {
    /// The steps to run, falling back to the demo script.
    pub fn script(&self) -> Vec<Step> {
        if self.steps.is_empty() {
            info!("No steps given, playing the demo script");
            demo_script()
        } else {
            self.steps.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_steps() {
        assert_eq!("rotate".parse::<Step>().unwrap(), Step::Rotate);
        assert_eq!("loop:12".parse::<Step>().unwrap(), Step::Loop(12));
        assert_eq!(
            "wait:250".parse::<Step>().unwrap(),
            Step::Wait(Duration::from_millis(250))
        );
        assert_eq!("effects:off".parse::<Step>().unwrap(), Step::Effects(false));
        assert_eq!("music:on".parse::<Step>().unwrap(), Step::Music(true));
        assert_eq!("gameover".parse::<Step>().unwrap(), Step::GameOver);
    }

    #[test]
    fn test_rejects_bad_steps() {
        assert!("explode".parse::<Step>().is_err());
        assert!("loop".parse::<Step>().is_err());
        assert!("loop:-3".parse::<Step>().is_err());
        assert!("rotate:1".parse::<Step>().is_err());
        assert!("music:maybe".parse::<Step>().is_err());
    }

    #[test]
    fn test_cli_flags_and_steps() {
        let cli = Cli::try_parse_from([
            "swirl-cues",
            "--config",
            "cues.json",
            "--silent",
            "block",
            "loop:4",
            "stop",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("cues.json")));
        assert!(cli.silent);
        assert_eq!(cli.script(), vec![Step::Block, Step::Loop(4), Step::Stop]);
    }

    #[test]
    fn test_cli_rejects_unknown_step() {
        let err = Cli::try_parse_from(["swirl-cues", "rotate", "explode"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_missing_config_path() {
        assert!(Cli::try_parse_from(["swirl-cues", "--config"]).is_err());
    }

    #[test]
    fn test_help_is_reported_before_any_script() {
        let err = Cli::try_parse_from(["swirl-cues", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert!(err.to_string().contains("loop:N"));
    }

    #[test]
    fn test_empty_invocation_plays_demo() {
        let cli = Cli::try_parse_from(["swirl-cues"]).unwrap();
        assert!(cli.steps.is_empty());
        assert!(!cli.silent);
        assert_eq!(cli.script(), demo_script());
    }
}
