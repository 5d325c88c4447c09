/// Unique recording identifier (audio basename, the join key across sources).
/// Example: `a001_0_10.wav`
pub type RecordingId = String;
/// Acoustic scene label from the delimited metadata table.
/// Examples: `airport`, `metro_station`, `public_square`
pub type SceneLabel = String;
/// Free-text caption written by one annotator for one recording.
/// Example: `People are talking while a vehicle passes by.`
pub type CaptionText = String;
/// Single tag label attached to a caption annotation.
/// Examples: `traffic`, `adults_talking`, `birds_singing`
pub type TagLabel = String;
/// Numeric identifier of a human annotator.
/// Examples: `103`, `214`
pub type AnnotatorId = i32;
/// Hub repository identifier in `namespace/name` form.
/// Example: `username/MACS_captions`
pub type RepoId = String;
/// TAU location identifier carried through from the scene table.
/// Example: `airport-lisbon-1000`
pub type TauIdentifier = String;
/// Recording-device label carried through from the scene table.
/// Example: `a`
pub type SourceLabel = String;
