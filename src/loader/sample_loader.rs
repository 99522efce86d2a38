use std::path::{Path, PathBuf};

use crate::audio::SampleBuffer;

/// A file somebody wants bound to a key, before anything has been decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFile {
    pub name: String,
    pub path: PathBuf,
    pub media_type: &'static str,
}

impl SourceFile {
    // The path is made absolute against the current directory here, since it
    // gets saved and must still resolve when started from somewhere else.
    pub fn probe(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let path = std::path::absolute(path).unwrap_or_else(|e| {
            log::warn!("could not resolve {}: {e}", path.display());
            path.to_path_buf()
        });
        Self {
            name,
            media_type: media_type_of(&path),
            path,
        }
    }

    pub fn is_audio(&self) -> bool {
        self.media_type.starts_with("audio/")
    }
}

// Guess the media type from the extension, the same way a file picker would
pub fn media_type_of(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "wav" | "wave" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" | "aac" => "audio/aac",
        "opus" => "audio/opus",
        "aif" | "aiff" => "audio/aiff",
        _ => "application/octet-stream",
    }
}

// Decode a file from disk so it can be registered with the engine.
// Only WAV is decodable; other audio types fail here and get reported per file.
pub fn load(file: &SourceFile, target_rate: u32) -> anyhow::Result<SampleBuffer> {
    if file.media_type != "audio/wav" {
        anyhow::bail!("{} decoding is not supported, convert it to wav", file.media_type);
    }
    SampleBuffer::load_wav(&file.path, target_rate)
}
