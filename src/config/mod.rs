//! Configuration for voicewave.
//!
//! Settings live in `~/.config/voicewave/voicewave.toml`, with sections for
//! audio capture, the waveform visualizer and saved recordings.

pub mod file;

pub use file::{get_config_path, VisualizerConfig, VoicewaveConfig};
