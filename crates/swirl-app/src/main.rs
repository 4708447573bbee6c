//! # Swirl cues
//!
//! Plays the Swirl puzzle game's sound cues from the command line.

mod script;
mod settings;

use anyhow::Result;
use clap::Parser;
use script::Cli;
use std::sync::Arc;
use std::time::Duration;
use swirl_audio::{CueDispatcher, TokioScheduler};
use swirl_core::Error;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Time left for scheduled cues to finish before exiting.
const DRAIN_DELAY: Duration = Duration::from_millis(1500);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swirl_app=info,swirl_audio=info".into()),
        )
        .init();

    info!("Starting swirl-cues v{}", env!("CARGO_PKG_VERSION"));

    let config = settings::load(cli.config.as_deref())?;
    let scheduler = Arc::new(TokioScheduler::current()?);

    let dispatcher = if cli.silent {
        CueDispatcher::initialize(&config, scheduler, || {
            Err(Error::BackendUnavailable("output disabled by --silent".into()))
        })
    } else {
        CueDispatcher::with_default_output(&config, scheduler)
    };

    for step in &cli.script() {
        step.run(&dispatcher).await;
        log_events(&dispatcher);
    }

    tokio::time::sleep(DRAIN_DELAY).await;
    dispatcher.stop_emergency();
    log_events(&dispatcher);

    info!("Done");
    Ok(())
}

fn log_events(dispatcher: &CueDispatcher) {
    while let Some(event) = dispatcher.try_recv_event() {
        debug!("Status: {event:?}");
    }
}
