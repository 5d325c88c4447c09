//! YAML caption/tag manifest loading.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use serde::Deserialize;

use crate::constants::meta::AUDIO_PATH_PREFIX;
use crate::errors::ConvertError;
use crate::types::{AnnotatorId, CaptionText, RecordingId, TagLabel};

/// One annotator's caption for one recording.
///
/// Annotation order within a recording is the manifest order and is carried
/// through to the output columns unchanged.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct CaptionAnnotation {
    /// Identifier of the human annotator.
    pub annotator_id: AnnotatorId,
    /// Free-text caption.
    #[serde(rename = "sentence")]
    pub caption: CaptionText,
    /// Tag labels, order as given in the manifest.
    #[serde(default)]
    pub tags: Vec<TagLabel>,
}

/// Caption manifest keyed by recording identifier.
#[derive(Debug, Default)]
pub struct CaptionTable {
    entries: HashMap<RecordingId, Vec<CaptionAnnotation>>,
}

impl CaptionTable {
    /// Annotations for `recording`, in manifest order.
    pub fn annotations(&self, recording: &str) -> Option<&[CaptionAnnotation]> {
        self.entries.get(recording).map(Vec::as_slice)
    }

    /// True when `recording` has a caption entry.
    pub fn contains(&self, recording: &str) -> bool {
        self.entries.contains_key(recording)
    }

    /// Number of captioned recordings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no recording has captions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterator over captioned recording identifiers (unordered).
    pub fn recordings(&self) -> impl Iterator<Item = &RecordingId> {
        self.entries.keys()
    }
}

// Wire shape of the manifest. Unknown keys at any level are ignored so newer
// corpus releases with extra fields still parse.
#[derive(Debug, Deserialize)]
struct ManifestFile {
    files: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    filename: String,
    #[serde(default)]
    annotations: Vec<CaptionAnnotation>,
}

/// Parse the YAML caption manifest into a per-recording annotation table.
pub fn load_caption_table(path: &Path) -> Result<CaptionTable, ConvertError> {
    let file = File::open(path)
        .map_err(|err| parse_error(path, format!("failed opening manifest: {err}")))?;
    let manifest: ManifestFile = serde_yaml::from_reader(file)
        .map_err(|err| parse_error(path, format!("malformed manifest: {err}")))?;

    let mut table = CaptionTable::default();
    for entry in manifest.files {
        let recording = basename(&entry.filename).to_string();
        if recording.is_empty() {
            return Err(parse_error(
                path,
                format!("caption entry with empty filename '{}'", entry.filename),
            ));
        }
        if table.entries.insert(recording.clone(), entry.annotations).is_some() {
            return Err(parse_error(
                path,
                format!("duplicate caption entry for recording '{recording}'"),
            ));
        }
    }
    Ok(table)
}

/// Reduce a manifest filename to the recording identifier. Entries usually
/// carry an `audio/` prefix; arbitrary other path prefixes are reduced to the
/// final component as well.
fn basename(filename: &str) -> &str {
    let trimmed = filename
        .strip_prefix(AUDIO_PATH_PREFIX)
        .unwrap_or(filename)
        .trim();
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

fn parse_error(path: &Path, reason: String) -> ConvertError {
    ConvertError::MetadataParse {
        path: path.to_path_buf(),
        reason,
    }
}
