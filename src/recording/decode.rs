//! Encoding captured PCM and decoding recorded data back to PCM.

use std::io::Cursor;

use anyhow::{anyhow, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::error::RecorderError;
use super::export::extension_for_mime;
use super::session::{DecodedAudio, RecordedAudio};

/// MIME type of the data the microphone capture produces.
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Turns recorded data into PCM. Runs on a blocking worker thread.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, audio: &RecordedAudio) -> Result<DecodedAudio, RecorderError>;
}

/// Encodes mono 16-bit samples as an in-memory WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let wav_spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, wav_spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    tracing::debug!("Encoded {} samples as WAV", samples.len());
    Ok(cursor.into_inner())
}

/// Decoder for every container/codec symphonia was built with.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, audio: &RecordedAudio) -> Result<DecodedAudio, RecorderError> {
        decode_first_channel(audio).map_err(|e| {
            tracing::warn!("Decoding {} failed: {}", audio.mime_type, e);
            RecorderError::Decode(e.to_string())
        })
    }
}

fn decode_first_channel(audio: &RecordedAudio) -> Result<DecodedAudio> {
    let source = Cursor::new(audio.bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    hint.mime_type(&audio.mime_type);
    if let Some(extension) = extension_for_mime(&audio.mime_type) {
        hint.with_extension(extension.trim_start_matches('.'));
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("no default audio track"))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        sample_rate = spec.rate;

        let needs_buffer = sample_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < decoded.capacity());
        if needs_buffer {
            sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend(buf.samples().iter().step_by(channels).copied());
        }
    }

    if sample_rate == 0 {
        return Err(anyhow!("unknown sample rate"));
    }

    tracing::debug!(
        "Decoded {} samples at {}Hz from {}",
        samples.len(),
        sample_rate,
        audio.mime_type
    );
    Ok(DecodedAudio::new(samples, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_captured_wav() {
        let sample_rate = 8_000;
        let samples: Vec<i16> = (0..2 * sample_rate)
            .map(|i| ((i as f32 * 0.05).sin() * 12_000.0) as i16)
            .collect();
        let wav = encode_wav(&samples, sample_rate).unwrap();

        let decoded = SymphoniaDecoder
            .decode(&RecordedAudio::new(wav, WAV_MIME_TYPE))
            .unwrap();

        assert_eq!(decoded.sample_rate, sample_rate);
        assert_eq!(decoded.samples.len(), samples.len());
        assert!((decoded.duration() - 2.0).abs() < 1e-6);
        assert!(decoded.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let audio = RecordedAudio::new(b"definitely not audio".to_vec(), "audio/webm");
        let result = SymphoniaDecoder.decode(&audio);
        assert!(matches!(result, Err(RecorderError::Decode(_))));
    }

    #[test]
    fn test_empty_data_is_a_decode_error() {
        let audio = RecordedAudio::new(Vec::new(), WAV_MIME_TYPE);
        assert!(matches!(
            SymphoniaDecoder.decode(&audio),
            Err(RecorderError::Decode(_))
        ));
    }
}
