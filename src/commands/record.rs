//! Interactive recording session.
//!
//! Runs the recorder TUI: the live waveform while recording, then the recorded
//! waveform with seekable playback once the recording is decoded. The same
//! loop serves `play`, which starts from an existing audio file instead of the
//! microphone.

use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;

use crate::config::VoicewaveConfig;
use crate::recording::export::mime_for_path;
use crate::recording::ui::UserCommand;
use crate::recording::{
    Controller, CpalMicrophone, CpalPlayback, FrameLoop, RecordedAudio, SymphoniaDecoder,
    SystemClock, VoicewaveTui,
};
use crate::ui::ErrorScreen;
use crate::waveform::{surface_size, WaveformHost};

/// Records from the configured microphone.
pub async fn handle_record() -> Result<(), anyhow::Error> {
    tracing::info!("=== voicewave recorder started ===");
    run_session(None).await
}

/// Shows and plays an existing audio file.
pub async fn handle_play(file: &Path) -> Result<(), anyhow::Error> {
    tracing::info!("=== voicewave player started: {} ===", file.display());

    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("Failed to read {}: {err}", file.display());
            show_error(&format!(
                "File Error:\n\n{}: {err}\n\nPlease check the path and try again.",
                file.display()
            ))?;
            return Err(anyhow!("Failed to read {}: {err}", file.display()));
        }
    };

    run_session(Some(RecordedAudio::new(bytes, mime_for_path(file)))).await
}

async fn run_session(initial: Option<RecordedAudio>) -> Result<(), anyhow::Error> {
    let config_data = match VoicewaveConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            show_error(&format!(
                "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/voicewave/voicewave.toml file and try again."
            ))?;
            return Err(anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: device={}, sample_rate={}Hz, bar_width={}, gap={}, speed={}",
        config_data.audio.device,
        config_data.audio.sample_rate,
        config_data.visualizer.bar_width,
        config_data.visualizer.gap,
        config_data.visualizer.speed
    );

    let microphone = Arc::new(CpalMicrophone::new(
        config_data.audio.device.clone(),
        config_data.audio.sample_rate,
    ));
    let mut controller = Controller::new(
        microphone,
        Arc::new(SymphoniaDecoder),
        Box::new(CpalPlayback::new()),
        Box::new(FrameLoop::new()),
        Arc::new(SystemClock),
    );

    let mut tui = VoicewaveTui::new().map_err(|e| anyhow!("Failed to initialize UI: {e}"))?;
    let (width, height) = surface_size(
        tui.waveform_area()
            .map_err(|e| anyhow!("Failed to query terminal size: {e}"))?,
    );
    let mut host = WaveformHost::new(config_data.visualizer.clone(), width, height);

    match initial {
        Some(audio) => controller.set_recorded_audio(audio),
        None => controller.start_recording(),
    }

    let result = run_loop(&mut tui, &mut controller, &mut host, &config_data);

    controller.dispose();
    tui.cleanup()
        .map_err(|e| anyhow!("Failed to restore terminal: {e}"))?;

    if let Some(error) = controller.snapshot().last_error {
        tracing::warn!("Session ended with error: {}", error);
    }
    tracing::info!("=== voicewave session ended ===");
    result
}

fn run_loop(
    tui: &mut VoicewaveTui,
    controller: &mut Controller,
    host: &mut WaveformHost,
    config_data: &VoicewaveConfig,
) -> Result<(), anyhow::Error> {
    let mut status: Option<String> = None;

    loop {
        let command = tui
            .handle_input()
            .map_err(|e| anyhow!("Input handling error: {e}"))?;

        match command {
            UserCommand::Continue => {}
            UserCommand::Quit => break,
            UserCommand::Start => {
                status = None;
                controller.start_recording();
            }
            UserCommand::TogglePause => controller.toggle_pause_resume(),
            UserCommand::Stop => controller.stop_recording(),
            UserCommand::Save => {
                status = match controller.save_audio_file(&config_data.output.directory()) {
                    Ok(Some(path)) => Some(format!("saved {}", path.display())),
                    Ok(None) => Some("nothing to save".to_string()),
                    Err(_) => None,
                };
            }
            UserCommand::Clear => {
                status = None;
                controller.clear_canvas();
            }
            UserCommand::Hover(x) => host.pointer_moved(x),
            UserCommand::HoverEnd => host.pointer_left(),
            UserCommand::Seek(x) => host.pointer_clicked(x, controller),
        }

        controller.tick();

        let area = tui
            .waveform_area()
            .map_err(|e| anyhow!("Failed to query terminal size: {e}"))?;
        let (width, height) = surface_size(area);
        host.resize(width, height);
        host.render(controller);

        tui.render(host, &controller.snapshot(), status.as_deref())
            .map_err(|e| anyhow!("Render failed: {e}"))?;
    }

    Ok(())
}

fn show_error(message: &str) -> Result<(), anyhow::Error> {
    let mut error_screen = ErrorScreen::new()?;
    error_screen.show_error(message)?;
    error_screen.cleanup()?;
    Ok(())
}
