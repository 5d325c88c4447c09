/// Constants used by scene-table parsing and delimiter inference.
pub mod meta {
    /// Required column holding the audio filename (join key source).
    pub const COL_FILENAME: &str = "filename";
    /// Required column holding the acoustic scene label.
    pub const COL_SCENE_LABEL: &str = "scene_label";
    /// Optional column holding the TAU location identifier.
    pub const COL_IDENTIFIER: &str = "identifier";
    /// Optional column holding the recording-device label.
    pub const COL_SOURCE_LABEL: &str = "source_label";
    /// Path prefix stripped from filename cells to obtain the recording id.
    pub const AUDIO_PATH_PREFIX: &str = "audio/";
    /// Delimiters considered by header sniffing, in tie-break order.
    pub const DELIMITER_CANDIDATES: [u8; 3] = [b'\t', b',', b';'];
}

/// Constants used by output dataset layout and the columnar schema.
pub mod dataset {
    /// Name of the single split this converter produces.
    pub const SPLIT_ALL: &str = "all";
    /// Logical dataset name written into the info descriptor.
    pub const DATASET_NAME: &str = "macs";
    /// Default output directory when `--out-dir` is omitted.
    pub const DEFAULT_OUT_DIR: &str = "macs_hf";
    /// Subdirectory holding the parquet shards.
    pub const DATA_SUBDIR: &str = "data";
    /// Filename of the dataset descriptor.
    pub const INFO_FILENAME: &str = "dataset_info.json";
    /// Prefix for the staging directory used for atomic overwrite.
    pub const STAGING_PREFIX: &str = ".macs_hf-staging-";
    /// Rows per arrow record batch; bounds peak embedded-audio memory.
    pub const ROWS_PER_BATCH: usize = 64;
    /// Rows per parquet shard file.
    pub const ROWS_PER_SHARD: usize = 512;

    /// Output column: recording identifier.
    pub const COL_FILENAME: &str = "filename";
    /// Output column: acoustic scene label.
    pub const COL_SCENE: &str = "scene";
    /// Output column: embedded audio struct.
    pub const COL_AUDIO: &str = "audio";
    /// Output column: caption texts, one per annotator.
    pub const COL_CAPTIONS: &str = "captions";
    /// Output column: tag lists, parallel to `captions`.
    pub const COL_TAGS: &str = "tags";
    /// Output column: annotator ids, parallel to `captions`.
    pub const COL_ANNOTATORS: &str = "annotators";
    /// Output column: TAU location identifier (nullable).
    pub const COL_AUDIO_IDENTIFIER: &str = "audio_identifier";
    /// Output column: recording-device label (nullable).
    pub const COL_AUDIO_SOURCE_LABEL: &str = "audio_source_label";
    /// Field name of the raw container bytes inside the audio struct.
    pub const AUDIO_FIELD_BYTES: &str = "bytes";
    /// Field name of the relative path inside the audio struct.
    pub const AUDIO_FIELD_PATH: &str = "path";
}

/// Constants used by the hub publishing client.
pub mod hub {
    /// Default hub endpoint; override with `HF_ENDPOINT`.
    pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";
    /// Environment variable overriding the hub endpoint.
    pub const ENDPOINT_ENV: &str = "HF_ENDPOINT";
    /// Environment variable consulted for the access token.
    pub const TOKEN_ENV: &str = "HF_TOKEN";
    /// Revision all uploads commit to.
    pub const MAIN_REVISION: &str = "main";
    /// User agent sent with every hub request.
    pub const USER_AGENT: &str = concat!("macs2hf/", env!("CARGO_PKG_VERSION"));
    /// Bytes of file head sent as the preupload content sample.
    pub const PREUPLOAD_SAMPLE_BYTES: usize = 512;
    /// Commit summary recorded on the hub.
    pub const COMMIT_SUMMARY: &str = "Upload MACS captioned-audio dataset with macs2hf";
}
