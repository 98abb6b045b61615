use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    focus_api::{GenericFocusProvider, UnsupportedFocusProvider},
    tracker::{
        focus::FocusProvider, input::GenericEventSource,
        shutdown::detect_shutdown, Tracker,
    },
    utils::clock::DefaultClock,
};

/// Backend for the current build. A backend that fails to connect still lets the tracker run,
/// every sample then counts as the fallback app.
pub fn focus_provider() -> Box<dyn FocusProvider> {
    match GenericFocusProvider::new() {
        Ok(provider) => Box::new(provider),
        Err(e) => {
            warn!("Focused app lookup is unavailable: {e:?}");
            Box::new(UnsupportedFocusProvider)
        }
    }
}

/// Command to process `start`. Tracks in the foreground until interrupted. The tracker is
/// acquired by the caller, so a refused lock is reported before any detaching.
pub async fn process_start_command(tracker: Tracker) -> Result<()> {
    let shutdown = CancellationToken::new();
    tokio::spawn(detect_shutdown(shutdown.clone()));

    println!(
        "Tracking into {}. Press ctrl+c to stop.",
        tracker.store().path().display()
    );
    tracker
        .run(
            Box::new(GenericEventSource),
            focus_provider(),
            Box::new(DefaultClock),
            shutdown.clone(),
        )
        .await?;
    println!("Tracker stopped.");
    Ok(())
}
