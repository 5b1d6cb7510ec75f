//! voicewave: terminal voice recorder with a live scrolling waveform.

mod app;
mod commands;
mod config;
mod logging;
mod recording;
mod ui;
mod waveform;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        tracing::error!("Fatal error: {e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
