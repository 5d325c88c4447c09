use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::RecordingId;

/// Error type for configuration, parsing, merging, serialization, and
/// publishing failures. Every variant is fatal to the conversion run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("failed parsing metadata {}: {reason}", .path.display())]
    MetadataParse { path: PathBuf, reason: String },
    #[error(
        "metadata/caption identifier mismatch: {} metadata row(s) without captions [{}]; {} caption entries without metadata [{}]",
        .missing_captions.len(),
        .missing_captions.join(", "),
        .missing_metadata.len(),
        .missing_metadata.join(", ")
    )]
    MissingRecordings {
        /// Identifiers present in the scene table but absent from the caption file.
        missing_captions: Vec<RecordingId>,
        /// Identifiers present in the caption file but absent from the scene table.
        missing_metadata: Vec<RecordingId>,
    },
    #[error("no audio file named '{recording}' under {}", .audio_root.display())]
    MissingAudioFile {
        recording: RecordingId,
        audio_root: PathBuf,
    },
    #[error("unreadable audio file {}: {reason}", .path.display())]
    AudioRead { path: PathBuf, reason: String },
    #[error("failed writing dataset: {0}")]
    Serialization(String),
    #[error("hub authentication failed: {0}")]
    Authentication(String),
    #[error("hub upload failed: {0}")]
    Publish(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}
