//! Application command handlers for voicewave.
//!
//! # Commands
//! - `record`: Record from the microphone with the live waveform (default)
//! - `play`: Show and play an existing audio file
//! - `config`: Open configuration file in user's preferred editor
//! - `list_devices`: List available audio devices
//! - `logs`: Display recent log entries

pub mod config;
pub mod list_devices;
pub mod logs;
pub mod record;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use record::{handle_play, handle_record};
