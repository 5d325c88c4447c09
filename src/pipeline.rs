//! Linear conversion pipeline: validate, load, merge, attach, build, publish.

use std::path::PathBuf;

use tracing::info;

use crate::captions::load_caption_table;
use crate::dataset::write_dataset;
use crate::errors::ConvertError;
use crate::hub::{HubClient, resolve_token};
use crate::merge::merge_records;
use crate::meta::load_scene_table;
use crate::paths::resolve_inputs;
use crate::types::RepoId;

/// Inputs of one conversion run.
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Directory containing the WAV clips.
    pub audio_root: PathBuf,
    /// Delimited scene-label table.
    pub meta_csv: PathBuf,
    /// YAML caption manifest.
    pub yaml_file: PathBuf,
    /// Output dataset directory.
    pub out_dir: PathBuf,
    /// Optional hub dataset repo to publish to.
    pub push_to_hub: Option<RepoId>,
    /// Mark the hub repo private on creation.
    pub private: bool,
    /// Optional explicit hub token.
    pub hf_token: Option<String>,
}

/// Outcome of one successful conversion run.
#[derive(Clone, Debug)]
pub struct ConvertReport {
    /// Rows in the output table.
    pub rows: usize,
    /// Parquet shards written.
    pub shards: usize,
    /// Final dataset directory.
    pub out_dir: PathBuf,
    /// Hub repo the dataset was published to, when requested.
    pub published: Option<RepoId>,
}

/// Run the conversion end to end.
///
/// Strictly linear and run-to-completion; every failure is fatal. The local
/// artifact is complete and valid before any publish step runs, so a hub
/// failure never invalidates the local output.
pub fn run(options: ConvertOptions) -> Result<ConvertReport, ConvertError> {
    // Credentials resolve once, up front; a missing token fails before any work.
    let credentials = match &options.push_to_hub {
        Some(_) => Some(resolve_token(options.hf_token.clone())?),
        None => None,
    };

    let inputs = resolve_inputs(
        &options.audio_root,
        &options.meta_csv,
        &options.yaml_file,
        &options.out_dir,
    )?;

    let scenes = load_scene_table(&inputs.meta_csv)?;
    info!(path = %inputs.meta_csv.display(), rows = scenes.len(), "scene table loaded");
    let captions = load_caption_table(&inputs.yaml_file)?;
    info!(path = %inputs.yaml_file.display(), recordings = captions.len(), "caption manifest loaded");

    let rows = merge_records(&scenes, &captions, &inputs.audio_root)?;

    // Validity gate over every referenced clip: header probe only, no decode.
    for row in &rows {
        row.audio.probe()?;
    }
    info!(rows = rows.len(), "audio references probed");

    let summary = write_dataset(&rows, &options.out_dir)?;
    info!(
        rows = summary.rows,
        shards = summary.shards,
        out_dir = %summary.out_dir.display(),
        "dataset written"
    );

    let published = match (&options.push_to_hub, credentials) {
        (Some(repo), Some(token)) => {
            HubClient::new(token)?.publish_dataset(repo, &summary.out_dir, options.private)?;
            Some(repo.clone())
        }
        _ => None,
    };

    Ok(ConvertReport {
        rows: summary.rows,
        shards: summary.shards,
        out_dir: summary.out_dir,
        published,
    })
}
