//! Waveform rendering.
//!
//! Compositors draw onto a [`surface::Surface`]; the [`WaveformHost`] picks the
//! compositor for the controller's state and [`WaveformWidget`] puts the
//! result on the terminal.

pub mod blob;
pub mod color;
pub mod downsample;
pub mod host;
pub mod live;
pub mod surface;
pub mod widget;

pub use host::WaveformHost;
pub use widget::{surface_size, WaveformWidget};
