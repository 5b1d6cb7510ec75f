//! Configuration file management for voicewave.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory and written with
//! defaults the first time it is loaded.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::waveform::color::Color;

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `voicewave list-devices`
    /// - device name from `voicewave list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Requested recording sample rate in Hz (the device rate wins if it differs)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// Waveform appearance and the optional indicators drawn around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    /// Width of one bar in pixels (terminal columns)
    pub bar_width: u16,
    /// Gap between bars, as a multiple of the bar width
    pub gap: u16,
    /// Corner radius of the bars; 0 draws square bars
    pub rounded: u16,
    /// Color of unplayed bars and of the live waveform
    pub main_color: Color,
    /// Color of played bars and of the baseline
    pub secondary_color: Color,
    /// Surface background, or "transparent"
    pub background_color: Color,
    /// Live waveform is redrawn once every `speed` frames
    pub speed: u16,
    /// Scroll the live waveform across the whole width instead of from the center
    pub fullscreen: bool,
    /// Draw a bar at the anchor that follows the latest sample
    pub animate_current_pick: bool,
    /// Draw the center baseline while nothing is recording
    pub idle_baseline: bool,
    /// Show the playback position marker
    pub progress_indicator: bool,
    /// Show the playback time next to the marker
    pub progress_indicator_time: bool,
    /// Show a marker under the mouse pointer
    pub hover_indicator: bool,
    /// Show the time under the mouse pointer
    pub hover_time: bool,
    /// Show "Processing Audio..." while the recording decodes
    pub processing_text: bool,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            bar_width: 2,
            gap: 1,
            rounded: 5,
            main_color: Color::WHITE,
            secondary_color: Color::Rgb(0x5E, 0x5E, 0x5E),
            background_color: Color::Transparent,
            speed: 3,
            fullscreen: false,
            animate_current_pick: true,
            idle_baseline: true,
            progress_indicator: true,
            progress_indicator_time: true,
            hover_indicator: true,
            hover_time: true,
            processing_text: true,
        }
    }
}

/// Where saved recordings go.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for saved recordings; the working directory when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl OutputConfig {
    /// Resolves the directory recordings are saved to.
    pub fn directory(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoicewaveConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl VoicewaveConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// Writes a default configuration file first if none exists.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read or created
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            tracing::info!(
                "No configuration found, writing defaults to {}",
                config_path.display()
            );
            Self::default().save_to(&config_path)?;
        }
        Self::load_from(&config_path)
    }

    /// Loads configuration from an explicit path.
    ///
    /// # Errors
    /// - If the file cannot be read
    /// - If the TOML is malformed
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config_content = fs::read_to_string(path)?;
        let config: VoicewaveConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let config_content = toml::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }
}

/// Retrieves the path to the config file, creating its directory.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?
        .join(".config")
        .join("voicewave");

    fs::create_dir_all(&config_dir)?;

    Ok(config_dir.join("voicewave.toml"))
}
