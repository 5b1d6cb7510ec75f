//! Recording and playback of one voice clip.
//!
//! Provides microphone capture, the recording/playback state machine, decoding
//! of recorded data, playback, export, and the terminal UI for the workflow.

pub mod audio;
pub mod controller;
pub mod decode;
pub mod error;
pub mod export;
pub mod playback;
pub mod scheduler;
pub mod session;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use audio::CpalMicrophone;
pub use controller::Controller;
pub use decode::SymphoniaDecoder;
pub use playback::CpalPlayback;
pub use scheduler::{FrameLoop, SystemClock};
pub use session::RecordedAudio;
pub use ui::VoicewaveTui;
