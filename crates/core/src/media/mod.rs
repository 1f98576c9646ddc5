use std::ffi::OsStr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{LineVizError, Result};

/// Container extensions accepted for audio uploads.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac"];

/// Container extensions accepted for video uploads.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// Uploads above this size trigger a non-blocking warning; the load is still
/// attempted.
pub const LARGE_FILE_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Classifies a file name by extension, before any decode attempt.
pub fn classify(file_name: &str) -> Result<MediaKind> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(OsStr::to_str)
        .unwrap_or("")
        .to_ascii_lowercase();

    if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        Ok(MediaKind::Audio)
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        Ok(MediaKind::Video)
    } else {
        Err(LineVizError::UnsupportedFormat { extension })
    }
}

pub fn exceeds_size_advisory(size_bytes: u64) -> bool {
    size_bytes > LARGE_FILE_BYTES
}

/// Metadata for a decoded audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioHandle {
    pub name: String,
    pub sample_rate: u32,
    pub duration_seconds: f32,
}

/// Metadata for a decoded video's audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoHandle {
    pub name: String,
    pub sample_rate: u32,
    pub duration_seconds: f32,
}

/// Metadata for an open capture device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicHandle {
    pub device: String,
    pub sample_rate: u32,
}

/// A successfully decoded file handle of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaHandle {
    Audio(AudioHandle),
    Video(VideoHandle),
}

impl MediaHandle {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaHandle::Audio(_) => MediaKind::Audio,
            MediaHandle::Video(_) => MediaKind::Video,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MediaHandle::Audio(handle) => &handle.name,
            MediaHandle::Video(handle) => &handle.name,
        }
    }
}

/// Platform decode and capture service.
///
/// Implementations own the actual codec and device plumbing; the core only
/// consumes the resulting handles and pushes sample blocks.
pub trait MediaLoader {
    fn decode_audio(&mut self, path: &Path) -> Result<AudioHandle>;
    fn decode_video(&mut self, path: &Path) -> Result<VideoHandle>;
    fn open_microphone(&mut self) -> Result<MicHandle>;
}
