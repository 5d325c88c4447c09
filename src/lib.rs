#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line surface and process wiring.
pub mod app;
/// Lazily-decodable audio references.
pub mod audio;
/// YAML caption manifest loading.
pub mod captions;
/// Centralized constants for columns, dataset layout, and hub endpoints.
pub mod constants;
/// Columnar dataset materialization and serialization.
pub mod dataset;
/// Hub token resolution and publishing client.
pub mod hub;
/// Cross-source record merging.
pub mod merge;
/// Delimited scene-table loading.
pub mod meta;
/// Input path validation and inventory.
pub mod paths;
/// Linear conversion pipeline.
pub mod pipeline;
/// Shared type aliases.
pub mod types;

mod errors;

pub use audio::{AudioProbe, AudioRef, DecodedAudio};
pub use captions::{CaptionAnnotation, CaptionTable, load_caption_table};
pub use dataset::{DatasetSummary, output_schema, write_dataset};
pub use errors::ConvertError;
pub use hub::{HubClient, resolve_token};
pub use merge::{MergedRow, merge_records};
pub use meta::{SceneRow, SceneTable, load_scene_table};
pub use paths::{ResolvedInputs, resolve_inputs};
pub use pipeline::{ConvertOptions, ConvertReport, run};
pub use types::{
    AnnotatorId, CaptionText, RecordingId, RepoId, SceneLabel, SourceLabel, TagLabel,
    TauIdentifier,
};
