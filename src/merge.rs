//! Cross-source join of scene metadata and caption annotations.

use std::path::Path;

use tracing::debug;

use crate::audio::AudioRef;
use crate::captions::{CaptionAnnotation, CaptionTable};
use crate::errors::ConvertError;
use crate::meta::SceneTable;
use crate::types::{RecordingId, SceneLabel, SourceLabel, TauIdentifier};

/// One output row: a recording with its scene label, audio reference, and
/// ordered caption annotations.
#[derive(Clone, Debug)]
pub struct MergedRow {
    /// Recording identifier (audio basename).
    pub recording: RecordingId,
    /// Acoustic scene label.
    pub scene_label: SceneLabel,
    /// Reference to the clip under the audio root.
    pub audio: AudioRef,
    /// Caption annotations in manifest order.
    pub annotations: Vec<CaptionAnnotation>,
    /// Optional TAU location identifier from the scene table.
    pub tau_identifier: Option<TauIdentifier>,
    /// Optional recording-device label from the scene table.
    pub source_label: Option<SourceLabel>,
}

/// Join the two metadata tables on recording identifier and resolve each
/// clip's audio path.
///
/// The join is verified in both directions before any row is built:
/// identifiers present in only one source are collected exhaustively and
/// reported in a single `MissingRecordings` error, so one run surfaces the
/// complete mismatch set. Output order equals scene-table order.
pub fn merge_records(
    scenes: &SceneTable,
    captions: &CaptionTable,
    audio_root: &Path,
) -> Result<Vec<MergedRow>, ConvertError> {
    let mut missing_captions: Vec<RecordingId> = scenes
        .rows()
        .iter()
        .filter(|row| !captions.contains(&row.recording))
        .map(|row| row.recording.clone())
        .collect();
    let mut missing_metadata: Vec<RecordingId> = captions
        .recordings()
        .filter(|recording| !scenes.contains(recording.as_str()))
        .cloned()
        .collect();
    if !missing_captions.is_empty() || !missing_metadata.is_empty() {
        missing_captions.sort();
        missing_metadata.sort();
        return Err(ConvertError::MissingRecordings {
            missing_captions,
            missing_metadata,
        });
    }

    let mut rows = Vec::with_capacity(scenes.len());
    for scene in scenes.rows() {
        // Exact filename match under the audio root; no fuzzy probing.
        let path = audio_root.join(&scene.recording);
        if !path.is_file() {
            return Err(ConvertError::MissingAudioFile {
                recording: scene.recording.clone(),
                audio_root: audio_root.to_path_buf(),
            });
        }
        let annotations: Vec<CaptionAnnotation> = captions
            .annotations(&scene.recording)
            .unwrap_or_default()
            .to_vec();
        rows.push(MergedRow {
            recording: scene.recording.clone(),
            scene_label: scene.scene_label.clone(),
            audio: AudioRef::new(path),
            annotations,
            tau_identifier: scene.tau_identifier.clone(),
            source_label: scene.source_label.clone(),
        });
    }
    debug!(rows = rows.len(), "merged metadata sources");
    Ok(rows)
}
