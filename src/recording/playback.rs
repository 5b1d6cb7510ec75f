//! Playback of the finished recording.
//!
//! The controller drives playback through [`PlaybackOutput`]; the cpal
//! implementation plays decoded mono PCM on the default output device and
//! reports its position so the waveform can follow it.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::audio::suppress_alsa_warnings;
use super::error::RecorderError;
use super::session::DecodedAudio;

/// An audio output element: play, pause, seek, and position reporting.
pub trait PlaybackOutput: Send {
    /// Replaces the source and rewinds to the start, paused.
    fn load(&mut self, audio: &DecodedAudio) -> Result<(), RecorderError>;
    fn play(&mut self) -> Result<(), RecorderError>;
    fn pause(&mut self);
    /// Unloads the source and releases the output device.
    fn stop(&mut self);
    /// Moves the play head, in seconds.
    fn seek(&mut self, seconds: f64);
    /// Current play head, in seconds.
    fn position(&self) -> f64;
    /// The play head reached the end since the last play or seek.
    fn is_ended(&self) -> bool;
}

#[derive(Debug)]
struct PlayState {
    samples: Arc<[f32]>,
    source_rate: u32,
    device_rate: u32,
    /// Read position in source samples
    position: f64,
    playing: bool,
    ended: bool,
}

impl PlayState {
    fn step(&self) -> f64 {
        if self.device_rate == 0 {
            1.0
        } else {
            f64::from(self.source_rate) / f64::from(self.device_rate)
        }
    }

    /// Produces the next output sample, advancing the play head.
    fn next_sample(&mut self) -> f32 {
        if !self.playing {
            return 0.0;
        }

        let index = self.position as usize;
        match self.samples.get(index) {
            Some(&sample) => {
                self.position += self.step();
                sample
            }
            None => {
                self.playing = false;
                self.ended = true;
                0.0
            }
        }
    }
}

/// Plays decoded audio on the default cpal output device.
pub struct CpalPlayback {
    state: Arc<Mutex<PlayState>>,
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalPlayback {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PlayState {
                samples: Arc::from(Vec::new()),
                source_rate: 0,
                device_rate: 0,
                position: 0.0,
                playing: false,
                ended: false,
            })),
            stop_tx: None,
            thread: None,
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PlayState) -> R) -> Option<R> {
        self.state.lock().ok().map(|mut state| f(&mut state))
    }

    /// Opens the output device on its own thread if it is not open yet.
    fn ensure_stream(&mut self) -> Result<(), RecorderError> {
        if self.thread.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let state = Arc::clone(&self.state);

        let thread = std::thread::Builder::new()
            .name("voicewave-playback".into())
            .spawn(move || {
                let stream = match open_output_stream(state) {
                    Ok((stream, rate)) => {
                        let _ = ready_tx.send(Ok(rate));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = stop_rx.recv();
                drop(stream);
                tracing::debug!("Output stream closed");
            })
            .map_err(|e| RecorderError::Playback(format!("failed to spawn playback thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(rate)) => {
                self.with_state(|state| state.device_rate = rate);
                self.stop_tx = Some(stop_tx);
                self.thread = Some(thread);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(RecorderError::Playback(e.to_string()))
            }
            Err(_) => {
                let _ = thread.join();
                Err(RecorderError::Playback(
                    "playback thread exited before the device opened".to_string(),
                ))
            }
        }
    }

    fn close_stream(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Playback thread panicked");
            }
        }
    }
}

impl Default for CpalPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackOutput for CpalPlayback {
    fn load(&mut self, audio: &DecodedAudio) -> Result<(), RecorderError> {
        self.with_state(|state| {
            state.samples = Arc::clone(&audio.samples);
            state.source_rate = audio.sample_rate;
            state.position = 0.0;
            state.playing = false;
            state.ended = false;
        });
        tracing::debug!("Playback loaded: {:.2}s", audio.duration());
        Ok(())
    }

    fn play(&mut self) -> Result<(), RecorderError> {
        self.ensure_stream()?;
        self.with_state(|state| {
            if state.position as usize >= state.samples.len() {
                state.position = 0.0;
            }
            state.playing = true;
            state.ended = false;
        });
        Ok(())
    }

    fn pause(&mut self) {
        self.with_state(|state| state.playing = false);
    }

    fn stop(&mut self) {
        self.with_state(|state| {
            state.playing = false;
            state.ended = false;
            state.position = 0.0;
            state.samples = Arc::from(Vec::new());
        });
        self.close_stream();
    }

    fn seek(&mut self, seconds: f64) {
        self.with_state(|state| {
            let max = state.samples.len() as f64;
            state.position = (seconds.max(0.0) * f64::from(state.source_rate)).min(max);
            state.ended = false;
        });
    }

    fn position(&self) -> f64 {
        self.with_state(|state| {
            if state.source_rate == 0 {
                0.0
            } else {
                state.position.min(state.samples.len() as f64) / f64::from(state.source_rate)
            }
        })
        .unwrap_or_default()
    }

    fn is_ended(&self) -> bool {
        self.with_state(|state| state.ended).unwrap_or(false)
    }
}

impl Drop for CpalPlayback {
    fn drop(&mut self) {
        self.close_stream();
    }
}

fn open_output_stream(state: Arc<Mutex<PlayState>>) -> Result<(cpal::Stream, u32)> {
    let device = suppress_alsa_warnings(|| {
        cpal::default_host()
            .default_output_device()
            .ok_or_else(|| anyhow!("No audio output device available"))
    })?;

    let device_config = device.default_output_config()?;
    let device_rate = device_config.sample_rate().0;
    let channels = device_config.channels() as usize;
    tracing::debug!(
        "Output device: {}Hz, {} channels, {:?}",
        device_rate,
        channels,
        device_config.sample_format()
    );

    let config: cpal::StreamConfig = device_config.clone().into();
    let stream = match device_config.sample_format() {
        cpal::SampleFormat::F32 => build_output_stream::<f32>(&device, &config, state, channels)?,
        cpal::SampleFormat::I16 => build_output_stream::<i16>(&device, &config, state, channels)?,
        cpal::SampleFormat::U16 => build_output_stream::<u16>(&device, &config, state, channels)?,
        other => return Err(anyhow!("Unsupported output sample format: {other:?}")),
    };

    stream.play()?;
    Ok((stream, device_rate))
}

fn build_output_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    state: Arc<Mutex<PlayState>>,
    channels: usize,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let Ok(mut state) = state.lock() else {
                data.fill(T::EQUILIBRIUM);
                return;
            };
            for frame in data.chunks_mut(channels.max(1)) {
                let value = T::from_sample(state.next_sample());
                frame.fill(value);
            }
        },
        |err| {
            tracing::error!("Output stream error: {}", err);
        },
        None,
    )?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(samples: Vec<f32>, source_rate: u32, device_rate: u32) -> PlayState {
        PlayState {
            samples: samples.into(),
            source_rate,
            device_rate,
            position: 0.0,
            playing: true,
            ended: false,
        }
    }

    #[test]
    fn test_next_sample_marks_end() {
        let mut state = state(vec![0.5, -0.5], 8_000, 8_000);
        assert_eq!(state.next_sample(), 0.5);
        assert_eq!(state.next_sample(), -0.5);
        assert_eq!(state.next_sample(), 0.0);
        assert!(state.ended);
        assert!(!state.playing);
    }

    #[test]
    fn test_rate_conversion_steps_through_source() {
        let mut state = state(vec![0.1, 0.2, 0.3, 0.4], 8_000, 16_000);
        let out: Vec<f32> = (0..4).map(|_| state.next_sample()).collect();
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_paused_state_is_silent() {
        let mut state = state(vec![0.9; 4], 8_000, 8_000);
        state.playing = false;
        assert_eq!(state.next_sample(), 0.0);
        assert_eq!(state.position, 0.0);
    }

    #[test]
    fn test_seek_and_position_without_device() {
        let mut playback = CpalPlayback::new();
        playback
            .load(&DecodedAudio::new(vec![0.0; 16_000], 8_000))
            .unwrap();

        playback.seek(1.25);
        assert!((playback.position() - 1.25).abs() < 1e-9);

        playback.seek(10.0);
        assert!((playback.position() - 2.0).abs() < 1e-9);
        assert!(!playback.is_ended());
    }
}
