//! Columnar dataset materialization: arrow batches, parquet shards, and the
//! dataset descriptor, written through a staging directory for clean
//! overwrite semantics.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryBuilder, Int32Builder, ListBuilder, StringBuilder, StructArray,
};
use arrow::datatypes::{DataType, Field, FieldRef, Fields, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::json;
use tracing::info;

use crate::constants::dataset::{
    AUDIO_FIELD_BYTES, AUDIO_FIELD_PATH, COL_ANNOTATORS, COL_AUDIO, COL_AUDIO_IDENTIFIER,
    COL_AUDIO_SOURCE_LABEL, COL_CAPTIONS, COL_FILENAME, COL_SCENE, COL_TAGS, DATASET_NAME,
    DATA_SUBDIR, INFO_FILENAME, ROWS_PER_BATCH, ROWS_PER_SHARD, SPLIT_ALL, STAGING_PREFIX,
};
use crate::errors::ConvertError;
use crate::merge::MergedRow;

/// Facts about one completed dataset write.
#[derive(Clone, Debug)]
pub struct DatasetSummary {
    /// Rows written.
    pub rows: usize,
    /// Parquet shard files written.
    pub shards: usize,
    /// Final dataset directory.
    pub out_dir: PathBuf,
}

/// Arrow schema of the output table.
pub fn output_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(COL_FILENAME, DataType::Utf8, false),
        Field::new(COL_SCENE, DataType::Utf8, false),
        Field::new(COL_AUDIO, DataType::Struct(audio_struct_fields()), false),
        Field::new(COL_CAPTIONS, string_list_type(), false),
        Field::new(
            COL_TAGS,
            DataType::List(Arc::new(Field::new("item", string_list_type(), true))),
            false,
        ),
        Field::new(
            COL_ANNOTATORS,
            DataType::List(Arc::new(Field::new("item", DataType::Int32, true))),
            false,
        ),
        Field::new(COL_AUDIO_IDENTIFIER, DataType::Utf8, true),
        Field::new(COL_AUDIO_SOURCE_LABEL, DataType::Utf8, true),
    ]))
}

fn audio_struct_fields() -> Fields {
    Fields::from(vec![
        Field::new(AUDIO_FIELD_BYTES, DataType::Binary, true),
        Field::new(AUDIO_FIELD_PATH, DataType::Utf8, true),
    ])
}

fn string_list_type() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
}

/// Write `rows` as a single-split dataset under `out_dir`.
///
/// The artifact is assembled in a staging directory beside the target and
/// renamed over it only after every shard and the descriptor are complete, so
/// re-running with the same out-dir overwrites cleanly and a failed run never
/// clobbers a previous artifact.
pub fn write_dataset(rows: &[MergedRow], out_dir: &Path) -> Result<DatasetSummary, ConvertError> {
    let parent = match out_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(parent)
        .map_err(|err| {
            ConvertError::Serialization(format!("failed creating staging directory: {err}"))
        })?;
    let data_dir = staging.path().join(DATA_SUBDIR);
    fs::create_dir_all(&data_dir)?;

    let schema = output_schema();
    let num_shards = rows.len().div_ceil(ROWS_PER_SHARD).max(1);
    for shard_idx in 0..num_shards {
        let start = shard_idx * ROWS_PER_SHARD;
        let end = rows.len().min(start + ROWS_PER_SHARD);
        let shard_path = data_dir.join(shard_file_name(shard_idx, num_shards));
        write_shard(&schema, &rows[start..end], &shard_path)?;
        info!(
            shard = %shard_path.display(),
            rows = end - start,
            "wrote parquet shard"
        );
    }

    let info = dataset_info(rows.len());
    let info_body = serde_json::to_string_pretty(&info).map_err(|err| {
        ConvertError::Serialization(format!("failed encoding dataset info: {err}"))
    })?;
    fs::write(staging.path().join(INFO_FILENAME), info_body)
        .map_err(|err| ConvertError::Serialization(format!("failed writing dataset info: {err}")))?;

    if out_dir.exists() {
        fs::remove_dir_all(out_dir).map_err(|err| {
            ConvertError::Serialization(format!(
                "failed clearing previous dataset {}: {err}",
                out_dir.display()
            ))
        })?;
    }
    fs::rename(staging.path(), out_dir).map_err(|err| {
        ConvertError::Serialization(format!(
            "failed moving staged dataset into {}: {err}",
            out_dir.display()
        ))
    })?;
    // The staging TempDir now points at a moved-away path; its drop is a no-op.

    Ok(DatasetSummary {
        rows: rows.len(),
        shards: num_shards,
        out_dir: out_dir.to_path_buf(),
    })
}

fn shard_file_name(shard_idx: usize, num_shards: usize) -> String {
    format!("{SPLIT_ALL}-{shard_idx:05}-of-{num_shards:05}.parquet")
}

fn write_shard(
    schema: &SchemaRef,
    rows: &[MergedRow],
    path: &Path,
) -> Result<(), ConvertError> {
    let file = File::create(path).map_err(|err| {
        ConvertError::Serialization(format!("failed creating {}: {err}", path.display()))
    })?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props)).map_err(|err| {
        ConvertError::Serialization(format!("failed opening shard writer: {err}"))
    })?;
    // Bounded batches keep peak memory at one batch of embedded audio bytes.
    for batch_rows in rows.chunks(ROWS_PER_BATCH) {
        let batch = build_batch(schema.clone(), batch_rows)?;
        writer
            .write(&batch)
            .map_err(|err| ConvertError::Serialization(format!("failed writing batch: {err}")))?;
    }
    writer
        .close()
        .map_err(|err| ConvertError::Serialization(format!("failed finishing shard: {err}")))?;
    Ok(())
}

fn build_batch(schema: SchemaRef, rows: &[MergedRow]) -> Result<RecordBatch, ConvertError> {
    let mut filenames = StringBuilder::new();
    let mut scenes = StringBuilder::new();
    let mut audio_bytes = BinaryBuilder::new();
    let mut audio_paths = StringBuilder::new();
    let mut captions = ListBuilder::new(StringBuilder::new());
    let mut tags = ListBuilder::new(ListBuilder::new(StringBuilder::new()));
    let mut annotators = ListBuilder::new(Int32Builder::new());
    let mut identifiers = StringBuilder::new();
    let mut source_labels = StringBuilder::new();

    for row in rows {
        filenames.append_value(&row.recording);
        scenes.append_value(&row.scene_label);
        audio_bytes.append_value(row.audio.read_bytes()?);
        audio_paths.append_value(&row.recording);
        for annotation in &row.annotations {
            captions.values().append_value(&annotation.caption);
            let tag_list = tags.values();
            for tag in &annotation.tags {
                tag_list.values().append_value(tag);
            }
            tag_list.append(true);
            annotators.values().append_value(annotation.annotator_id);
        }
        captions.append(true);
        tags.append(true);
        annotators.append(true);
        match &row.tau_identifier {
            Some(value) => identifiers.append_value(value),
            None => identifiers.append_null(),
        }
        match &row.source_label {
            Some(value) => source_labels.append_value(value),
            None => source_labels.append_null(),
        }
    }

    let audio = StructArray::from(vec![
        (
            Arc::new(Field::new(AUDIO_FIELD_BYTES, DataType::Binary, true)) as FieldRef,
            Arc::new(audio_bytes.finish()) as ArrayRef,
        ),
        (
            Arc::new(Field::new(AUDIO_FIELD_PATH, DataType::Utf8, true)) as FieldRef,
            Arc::new(audio_paths.finish()) as ArrayRef,
        ),
    ]);

    let columns: Vec<ArrayRef> = vec![
        Arc::new(filenames.finish()),
        Arc::new(scenes.finish()),
        Arc::new(audio),
        Arc::new(captions.finish()),
        Arc::new(tags.finish()),
        Arc::new(annotators.finish()),
        Arc::new(identifiers.finish()),
        Arc::new(source_labels.finish()),
    ];
    RecordBatch::try_new(schema, columns).map_err(|err| {
        ConvertError::Serialization(format!("failed assembling record batch: {err}"))
    })
}

/// Self-describing dataset descriptor written beside the shards.
fn dataset_info(rows: usize) -> serde_json::Value {
    json!({
        "dataset_name": DATASET_NAME,
        "config_name": "default",
        "description": "MACS (Multilingual Audio Captioning in real-life Scenes) merged into a single captioned-audio table.",
        "features": {
            COL_FILENAME: {"dtype": "string", "_type": "Value"},
            COL_SCENE: {"dtype": "string", "_type": "Value"},
            COL_AUDIO: {"_type": "Audio"},
            COL_CAPTIONS: {"feature": {"dtype": "string", "_type": "Value"}, "_type": "Sequence"},
            COL_TAGS: {
                "feature": {"feature": {"dtype": "string", "_type": "Value"}, "_type": "Sequence"},
                "_type": "Sequence"
            },
            COL_ANNOTATORS: {"feature": {"dtype": "int32", "_type": "Value"}, "_type": "Sequence"},
            COL_AUDIO_IDENTIFIER: {"dtype": "string", "_type": "Value"},
            COL_AUDIO_SOURCE_LABEL: {"dtype": "string", "_type": "Value"},
        },
        "splits": {
            SPLIT_ALL: {"name": SPLIT_ALL, "num_examples": rows}
        }
    })
}
