//! Input path validation and audio-root inventory.

use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

use crate::errors::ConvertError;

/// Validated conversion input paths.
#[derive(Clone, Debug)]
pub struct ResolvedInputs {
    /// Directory containing the WAV clips.
    pub audio_root: PathBuf,
    /// Delimited scene-label table.
    pub meta_csv: PathBuf,
    /// YAML caption manifest.
    pub yaml_file: PathBuf,
    /// Number of regular files found under the audio root.
    pub audio_file_count: usize,
}

/// Verify that every required input exists with the expected shape and that
/// the out-dir path is usable.
///
/// The out-dir itself is created later by the dataset builder's staging
/// logic; here it is only rejected when it already exists as a non-directory.
pub fn resolve_inputs(
    audio_root: &Path,
    meta_csv: &Path,
    yaml_file: &Path,
    out_dir: &Path,
) -> Result<ResolvedInputs, ConvertError> {
    require_dir(audio_root, "audio root")?;
    require_file(meta_csv, "scene metadata table")?;
    require_file(yaml_file, "caption manifest")?;
    if out_dir.exists() && !out_dir.is_dir() {
        return Err(ConvertError::Configuration(format!(
            "output path {} exists and is not a directory",
            out_dir.display()
        )));
    }

    let audio_file_count = WalkDir::new(audio_root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count();
    info!(
        audio_root = %audio_root.display(),
        files = audio_file_count,
        "audio root inventory"
    );

    Ok(ResolvedInputs {
        audio_root: audio_root.to_path_buf(),
        meta_csv: meta_csv.to_path_buf(),
        yaml_file: yaml_file.to_path_buf(),
        audio_file_count,
    })
}

fn require_dir(path: &Path, role: &str) -> Result<(), ConvertError> {
    if !path.exists() {
        return Err(ConvertError::Configuration(format!(
            "{role} does not exist: {}",
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(ConvertError::Configuration(format!(
            "{role} is not a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

fn require_file(path: &Path, role: &str) -> Result<(), ConvertError> {
    if !path.exists() {
        return Err(ConvertError::Configuration(format!(
            "{role} does not exist: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(ConvertError::Configuration(format!(
            "{role} is not a file: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn accepts_valid_inputs_and_counts_audio_files() {
        let temp = tempdir().expect("failed creating tempdir");
        let audio_root = temp.path().join("audio");
        fs::create_dir(&audio_root).expect("failed creating audio root");
        fs::write(audio_root.join("a.wav"), b"x").expect("failed writing clip");
        fs::write(audio_root.join("b.wav"), b"x").expect("failed writing clip");
        let meta = temp.path().join("meta.csv");
        fs::write(&meta, "filename,scene_label\n").expect("failed writing table");
        let yaml = temp.path().join("MACS.yaml");
        fs::write(&yaml, "files: []\n").expect("failed writing manifest");

        let resolved = resolve_inputs(&audio_root, &meta, &yaml, &temp.path().join("out"))
            .expect("inputs should validate");
        assert_eq!(resolved.audio_file_count, 2);
    }

    #[test]
    fn missing_input_is_a_configuration_error() {
        let temp = tempdir().expect("failed creating tempdir");
        let err = resolve_inputs(
            &temp.path().join("nope"),
            &temp.path().join("meta.csv"),
            &temp.path().join("MACS.yaml"),
            &temp.path().join("out"),
        )
        .expect_err("missing audio root should fail");
        assert!(matches!(err, ConvertError::Configuration(_)));
        assert!(err.to_string().contains("audio root"));
    }

    #[test]
    fn file_where_directory_expected_fails() {
        let temp = tempdir().expect("failed creating tempdir");
        let audio_root = temp.path().join("audio");
        fs::write(&audio_root, b"i am a file").expect("failed writing file");
        let meta = temp.path().join("meta.csv");
        fs::write(&meta, "filename,scene_label\n").expect("failed writing table");
        let yaml = temp.path().join("MACS.yaml");
        fs::write(&yaml, "files: []\n").expect("failed writing manifest");

        let err = resolve_inputs(&audio_root, &meta, &yaml, &temp.path().join("out"))
            .expect_err("file-as-dir should fail");
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn out_dir_path_occupied_by_file_fails() {
        let temp = tempdir().expect("failed creating tempdir");
        let audio_root = temp.path().join("audio");
        fs::create_dir(&audio_root).expect("failed creating audio root");
        let meta = temp.path().join("meta.csv");
        fs::write(&meta, "filename,scene_label\n").expect("failed writing table");
        let yaml = temp.path().join("MACS.yaml");
        fs::write(&yaml, "files: []\n").expect("failed writing manifest");
        let out = temp.path().join("out");
        fs::write(&out, b"occupied").expect("failed writing file");

        let err = resolve_inputs(&audio_root, &meta, &yaml, &out)
            .expect_err("occupied out path should fail");
        assert!(err.to_string().contains("not a directory"));
    }
}
