//! Saving the recorded data to disk.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use super::session::RecordedAudio;

/// Base name of saved recordings.
const FILE_STEM: &str = "recorded_audio";

/// File extension (with leading dot) for a MIME type such as
/// `audio/webm;codecs=opus`. `None` when the type carries no subtype.
pub fn extension_for_mime(mime_type: &str) -> Option<Cow<'static, str>> {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    let (_, subtype) = essence.split_once('/')?;

    let extension = match subtype.to_ascii_lowercase().as_str() {
        "" => return None,
        "wav" | "wave" | "x-wav" | "vnd.wave" => ".wav",
        "mpeg" | "mp3" => ".mp3",
        "webm" => ".webm",
        "ogg" | "opus" => ".ogg",
        "mp4" | "aac" | "x-m4a" => ".m4a",
        "flac" | "x-flac" => ".flac",
        other => return Some(Cow::Owned(format!(".{other}"))),
    };
    Some(Cow::Borrowed(extension))
}

/// MIME type of an audio file, guessed from its extension.
pub fn mime_for_path(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "wav" | "wave" => "audio/wav".to_string(),
        "mp3" => "audio/mpeg".to_string(),
        "m4a" | "mp4" | "aac" => "audio/mp4".to_string(),
        "oga" | "opus" => "audio/ogg".to_string(),
        "" => "application/octet-stream".to_string(),
        other => format!("audio/{other}"),
    }
}

/// File name a recording of the given MIME type is saved under.
pub fn file_name_for(mime_type: &str) -> String {
    format!("{FILE_STEM}{}", extension_for_mime(mime_type).unwrap_or_default())
}

/// Writes `audio` into `directory`, returning the final path.
///
/// The bytes go to a temporary `.part` file first and are renamed into place,
/// so a failed write never leaves a truncated recording behind.
pub fn save_recording(audio: &RecordedAudio, directory: &Path) -> std::io::Result<PathBuf> {
    fs::create_dir_all(directory)?;

    let target = directory.join(file_name_for(&audio.mime_type));
    let partial = target.with_file_name(format!(".{}.part", file_name_for(&audio.mime_type)));

    let result = fs::write(&partial, &audio.bytes).and_then(|_| fs::rename(&partial, &target));
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result?;

    tracing::info!(
        "Recording saved: {} ({} bytes)",
        target.display(),
        audio.bytes.len()
    );
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_common_types() {
        assert_eq!(extension_for_mime("audio/wav").as_deref(), Some(".wav"));
        assert_eq!(extension_for_mime("audio/webm;codecs=opus").as_deref(), Some(".webm"));
        assert_eq!(extension_for_mime("audio/mpeg").as_deref(), Some(".mp3"));
        assert_eq!(extension_for_mime("audio/mp4").as_deref(), Some(".m4a"));
        assert_eq!(extension_for_mime("audio/x-custom").as_deref(), Some(".x-custom"));
        assert_eq!(extension_for_mime("").as_deref(), None);
        assert_eq!(extension_for_mime("audio/").as_deref(), None);
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("memo.WAV")), "audio/wav");
        assert_eq!(mime_for_path(Path::new("a/b.mp3")), "audio/mpeg");
        assert_eq!(mime_for_path(Path::new("clip.ogg")), "audio/ogg");
        assert_eq!(mime_for_path(Path::new("clip.flac")), "audio/flac");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_file_name_without_extension() {
        assert_eq!(file_name_for("audio/ogg"), "recorded_audio.ogg");
        assert_eq!(file_name_for(""), "recorded_audio");
    }

    #[test]
    fn test_save_recording_writes_and_cleans_up() {
        let dir = std::env::temp_dir().join(format!("voicewave_export_{}", std::process::id()));
        let audio = RecordedAudio::new(vec![1, 2, 3, 4], "audio/wav");

        let path = save_recording(&audio, &dir).unwrap();
        assert_eq!(path, dir.join("recorded_audio.wav"));
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3, 4]);
        assert!(!dir.join(".recorded_audio.wav.part").exists());

        fs::remove_dir_all(&dir).ok();
    }
}
