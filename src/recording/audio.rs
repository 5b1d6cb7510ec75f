//! Microphone capture.
//!
//! This module defines the capture seam the controller talks to and its cpal
//! implementation. Audio is captured from the configured input device at its
//! native sample rate, converted to mono, and kept in memory until the
//! recording stops, when it is flushed as a WAV file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::decode::{encode_wav, WAV_MIME_TYPE};
use super::error::RecorderError;
use super::session::RecordedAudio;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Number of most recent samples in one time-domain snapshot.
pub const TIME_DOMAIN_WINDOW: usize = 2048;

/// Grants exclusive access to a microphone.
pub trait Microphone: Send + Sync {
    /// Opens the device and starts capturing. May block (permission prompts,
    /// device enumeration), so the controller calls it off the control thread.
    fn acquire(&self) -> Result<Box<dyn CaptureStream>, RecorderError>;
}

/// A running capture owned by exactly one recording.
pub trait CaptureStream: Send {
    /// Overwrites `out` with the latest time-domain snapshot as unsigned
    /// bytes centered at 128.
    fn read_time_domain(&self, out: &mut Vec<u8>);
    /// Stops accumulating samples without releasing the device.
    fn pause(&mut self);
    /// Resumes accumulating samples.
    fn resume(&mut self);
    /// Releases the hardware. Idempotent; samples captured so far are kept.
    fn release(&mut self);
    /// Releases the hardware (if still held) and encodes everything captured.
    fn finish(self: Box<Self>) -> Result<RecordedAudio, RecorderError>;
    /// MIME type of the data [`CaptureStream::finish`] produces.
    fn mime_type(&self) -> &str;
}

/// Converts a signed 16-bit sample to an unsigned amplitude byte.
pub fn amplitude_byte(sample: i16) -> u8 {
    ((i32::from(sample) >> 8) + 128) as u8
}

/// Writes the last [`TIME_DOMAIN_WINDOW`] samples as amplitude bytes.
pub fn time_domain_bytes(samples: &[i16], out: &mut Vec<u8>) {
    let start = samples.len().saturating_sub(TIME_DOMAIN_WINDOW);
    out.clear();
    out.extend(samples[start..].iter().map(|&s| amplitude_byte(s)));
}

/// Microphone backed by a cpal input device.
///
/// Features:
/// - Captures from a specified input device or system default at its native sample rate
/// - Converts multi-channel audio to mono by averaging channels
/// - Runs the cpal stream on its own thread so the handle can move between threads
#[derive(Debug, Clone)]
pub struct CpalMicrophone {
    /// Device name, numeric index, or "default" to use the system default device
    device_name: String,
    /// Desired sample rate in Hz (the device's native rate wins)
    requested_sample_rate: u32,
}

impl CpalMicrophone {
    pub fn new(device_name: String, requested_sample_rate: u32) -> Self {
        Self {
            device_name,
            requested_sample_rate,
        }
    }
}

impl Microphone for CpalMicrophone {
    fn acquire(&self) -> Result<Box<dyn CaptureStream>, RecorderError> {
        let samples = Arc::new(Mutex::new(Vec::new()));
        let paused = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let device_name = self.device_name.clone();
        let requested_sample_rate = self.requested_sample_rate;
        let samples_thread = Arc::clone(&samples);
        let paused_thread = Arc::clone(&paused);

        let thread = std::thread::Builder::new()
            .name("voicewave-capture".into())
            .spawn(move || {
                let stream = match open_input_stream(
                    &device_name,
                    requested_sample_rate,
                    samples_thread,
                    paused_thread,
                ) {
                    Ok((stream, sample_rate)) => {
                        let _ = ready_tx.send(Ok(sample_rate));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Park until released; a dropped sender counts as release
                let _ = stop_rx.recv();
                drop(stream);
                tracing::debug!("Audio stream closed");
            })
            .map_err(|e| RecorderError::Acquisition(format!("failed to spawn capture thread: {e}")))?;

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(RecorderError::Acquisition(e.to_string()));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(RecorderError::Acquisition(
                    "capture thread exited before the device opened".to_string(),
                ));
            }
        };

        Ok(Box::new(CpalCapture {
            sample_rate,
            samples,
            paused,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }))
    }
}

/// Handle to a running cpal capture thread.
struct CpalCapture {
    /// Actual recording sample rate from device
    sample_rate: u32,
    /// Recorded audio samples (i16 PCM mono)
    samples: Arc<Mutex<Vec<i16>>>,
    /// Whether recording is currently paused
    paused: Arc<AtomicBool>,
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureStream for CpalCapture {
    fn read_time_domain(&self, out: &mut Vec<u8>) {
        match self.samples.lock() {
            Ok(samples) => time_domain_bytes(&samples, out),
            Err(_) => out.clear(),
        }
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
        tracing::debug!("Recording paused");
    }

    fn resume(&mut self) {
        self.paused.store(false, Ordering::SeqCst);
        tracing::debug!("Recording resumed");
    }

    fn release(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Capture thread panicked");
            }
            tracing::debug!("Microphone released");
        }
    }

    fn finish(mut self: Box<Self>) -> Result<RecordedAudio, RecorderError> {
        self.release();

        let samples = self
            .samples
            .lock()
            .map(|mut samples| std::mem::take(&mut *samples))
            .map_err(|_| RecorderError::Flush("sample buffer poisoned".to_string()))?;

        let duration_secs = samples.len() as f32 / self.sample_rate as f32;
        tracing::info!(
            "Recording stopped: {:.2}s ({} samples at {}Hz)",
            duration_secs,
            samples.len(),
            self.sample_rate
        );

        let bytes = encode_wav(&samples, self.sample_rate)
            .map_err(|e| RecorderError::Flush(e.to_string()))?;
        Ok(RecordedAudio::new(bytes, WAV_MIME_TYPE))
    }

    fn mime_type(&self) -> &str {
        WAV_MIME_TYPE
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.release();
    }
}

/// Opens the configured device and starts a mono i16 input stream.
fn open_input_stream(
    device_name: &str,
    requested_sample_rate: u32,
    samples: Arc<Mutex<Vec<i16>>>,
    paused: Arc<AtomicBool>,
) -> Result<(cpal::Stream, u32)> {
    // Get device while suppressing ALSA library warnings
    let device = suppress_alsa_warnings(|| {
        let host = cpal::default_host();

        if device_name == "default" {
            host.default_input_device()
                .ok_or_else(|| anyhow!("No audio input device available"))
        } else {
            find_device_by_name(&host, device_name)
        }
    })?;

    let name = device
        .name()
        .unwrap_or_else(|_| "Unknown device".to_string());
    tracing::info!("Recording device: {}", name);

    let device_config = device.default_input_config()?;
    let device_sample_rate = device_config.sample_rate().0;
    let num_channels = device_config.channels() as usize;

    if device_sample_rate != requested_sample_rate {
        tracing::warn!(
            "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
            requested_sample_rate,
            device_sample_rate
        );
    }

    tracing::debug!(
        "Device configuration: {}Hz, {} channels, {:?}",
        device_sample_rate,
        num_channels,
        device_config.sample_format()
    );

    let config: cpal::StreamConfig = device_config.clone().into();
    let stream = match device_config.sample_format() {
        cpal::SampleFormat::I16 => {
            build_input_stream::<i16>(&device, &config, samples, paused, num_channels)?
        }
        cpal::SampleFormat::U16 => {
            build_input_stream::<u16>(&device, &config, samples, paused, num_channels)?
        }
        cpal::SampleFormat::F32 => {
            build_input_stream::<f32>(&device, &config, samples, paused, num_channels)?
        }
        other => return Err(anyhow!("Unsupported input sample format: {other:?}")),
    };

    stream.play()?;
    tracing::debug!("Audio stream started");
    Ok((stream, device_sample_rate))
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    samples: Arc<Mutex<Vec<i16>>>,
    paused: Arc<AtomicBool>,
    num_channels: usize,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample,
    i16: cpal::FromSample<T>,
{
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if paused.load(Ordering::Relaxed) {
                return;
            }
            let converted: Vec<i16> = data
                .iter()
                .map(|&s| cpal::Sample::to_sample::<i16>(s))
                .collect();
            if let Ok(mut samples) = samples.lock() {
                push_mono(&converted, &mut samples, num_channels);
            }
        },
        |err| {
            tracing::error!("Audio stream error: {}", err);
        },
        None,
    )?;
    Ok(stream)
}

/// Appends interleaved input to `samples`, averaging all channels per frame.
fn push_mono(data: &[i16], samples: &mut Vec<i16>, num_channels: usize) {
    match num_channels {
        0 => {}
        1 => samples.extend_from_slice(data),
        _ => {
            for chunk in data.chunks_exact(num_channels) {
                let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                samples.push((sum / num_channels as i32) as i16);
            }
        }
    }
}

/// Finds an audio input device by name or numeric index.
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    let devices: Vec<_> = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            )
        });
    }

    devices
        .into_iter()
        .find(|device| device.name().is_ok_and(|name| name == device_spec))
        .ok_or_else(|| {
            anyhow!(
                "Audio input device '{device_spec}' not found. Use 'voicewave list-devices' to see available devices."
            )
        })
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let dev_null_fd = dev_null.as_raw_fd();

    // Save the current stderr file descriptor
    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    // Restore the original stderr
    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

/// On non-Linux platforms, no stderr suppression is needed since ALSA doesn't exist.
#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amplitude_byte_is_centered() {
        assert_eq!(amplitude_byte(0), 128);
        assert_eq!(amplitude_byte(i16::MAX), 255);
        assert_eq!(amplitude_byte(i16::MIN), 0);
    }

    #[test]
    fn test_time_domain_uses_latest_window() {
        let mut samples = vec![0i16; TIME_DOMAIN_WINDOW];
        samples.extend([i16::MAX; 4]);
        let mut out = vec![1, 2, 3];

        time_domain_bytes(&samples, &mut out);
        assert_eq!(out.len(), TIME_DOMAIN_WINDOW);
        assert_eq!(&out[out.len() - 4..], &[255; 4]);
        assert_eq!(out[0], 128);
    }

    #[test]
    fn test_push_mono_averages_channels() {
        let mut samples = Vec::new();
        push_mono(&[100, 300, -50, 50], &mut samples, 2);
        assert_eq!(samples, vec![200, 0]);

        push_mono(&[1, 2, 3], &mut samples, 3);
        assert_eq!(samples, vec![200, 0, 2]);

        push_mono(&[7, 8], &mut samples, 1);
        assert_eq!(samples, vec![200, 0, 2, 7, 8]);
    }
}
