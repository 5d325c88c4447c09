//! Delimited scene-table loading with header-based delimiter inference.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::constants::meta::{
    AUDIO_PATH_PREFIX, COL_FILENAME, COL_IDENTIFIER, COL_SCENE_LABEL, COL_SOURCE_LABEL,
    DELIMITER_CANDIDATES,
};
use crate::errors::ConvertError;
use crate::types::{RecordingId, SceneLabel, SourceLabel, TauIdentifier};

/// One parsed row of the scene-label table.
#[derive(Clone, Debug)]
pub struct SceneRow {
    /// Recording identifier (filename cell with any `audio/` prefix stripped).
    pub recording: RecordingId,
    /// Acoustic scene label.
    pub scene_label: SceneLabel,
    /// Optional TAU location identifier.
    pub tau_identifier: Option<TauIdentifier>,
    /// Optional recording-device label.
    pub source_label: Option<SourceLabel>,
}

/// Scene-label table in original file order, indexed by recording id.
#[derive(Debug, Default)]
pub struct SceneTable {
    rows: Vec<SceneRow>,
    index: HashSet<RecordingId>,
}

impl SceneTable {
    /// Rows in the order they appeared in the input file.
    pub fn rows(&self) -> &[SceneRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when `recording` appears in the table.
    pub fn contains(&self, recording: &str) -> bool {
        self.index.contains(recording)
    }
}

/// Parse the delimited scene table, accepting comma-, tab-, or
/// semicolon-separated variants. Unknown columns are ignored; `filename` and
/// `scene_label` are required. Row order is preserved.
pub fn load_scene_table(path: &Path) -> Result<SceneTable, ConvertError> {
    let delimiter = sniff_delimiter(path)?;
    debug!(
        path = %path.display(),
        delimiter = %(delimiter as char).escape_default(),
        "inferred scene table delimiter"
    );

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)
        .map_err(|err| parse_error(path, format!("failed opening table: {err}")))?;

    let headers = reader
        .headers()
        .map_err(|err| parse_error(path, format!("failed reading header row: {err}")))?
        .clone();
    let filename_idx = require_column(path, &headers, COL_FILENAME)?;
    let scene_idx = require_column(path, &headers, COL_SCENE_LABEL)?;
    let identifier_idx = find_column(&headers, COL_IDENTIFIER);
    let source_idx = find_column(&headers, COL_SOURCE_LABEL);

    let mut table = SceneTable::default();
    for (row_no, result) in reader.records().enumerate() {
        // Header is line 1; data rows start at line 2.
        let line = row_no + 2;
        let record =
            result.map_err(|err| parse_error(path, format!("unreadable row at line {line}: {err}")))?;

        let filename = required_cell(path, &record, filename_idx, COL_FILENAME, line)?;
        let scene_label = required_cell(path, &record, scene_idx, COL_SCENE_LABEL, line)?;
        let recording = strip_audio_prefix(&filename).to_string();

        if !table.index.insert(recording.clone()) {
            return Err(parse_error(
                path,
                format!("duplicate recording identifier '{recording}' at line {line}"),
            ));
        }
        table.rows.push(SceneRow {
            recording,
            scene_label,
            tau_identifier: optional_cell(&record, identifier_idx),
            source_label: optional_cell(&record, source_idx),
        });
    }
    Ok(table)
}

/// Infer the table delimiter by counting candidate bytes in the header line.
fn sniff_delimiter(path: &Path) -> Result<u8, ConvertError> {
    let file = File::open(path)
        .map_err(|err| parse_error(path, format!("failed opening table: {err}")))?;
    let mut header = String::new();
    BufReader::new(file)
        .read_line(&mut header)
        .map_err(|err| parse_error(path, format!("failed reading header line: {err}")))?;
    if header.trim().is_empty() {
        return Err(parse_error(path, "table is empty".to_string()));
    }

    // Earlier candidates win ties, so the scan keeps strictly-greater maxima.
    let mut best = (DELIMITER_CANDIDATES[0], 0usize);
    for &candidate in &DELIMITER_CANDIDATES {
        let count = header.bytes().filter(|&byte| byte == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    let (best, count) = best;
    if count == 0 {
        return Err(parse_error(
            path,
            "could not infer delimiter from header line".to_string(),
        ));
    }
    Ok(best)
}

fn strip_audio_prefix(filename: &str) -> &str {
    filename
        .strip_prefix(AUDIO_PATH_PREFIX)
        .unwrap_or(filename)
        .trim()
}

fn require_column(
    path: &Path,
    headers: &csv::StringRecord,
    name: &str,
) -> Result<usize, ConvertError> {
    find_column(headers, name)
        .ok_or_else(|| parse_error(path, format!("required column '{name}' is missing")))
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header.trim() == name)
}

fn required_cell(
    path: &Path,
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    line: usize,
) -> Result<String, ConvertError> {
    let value = record.get(idx).map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(parse_error(
            path,
            format!("empty '{name}' cell at line {line}"),
        ));
    }
    Ok(value.to_string())
}

fn optional_cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    let value = record.get(idx?)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_error(path: &Path, reason: String) -> ConvertError {
    ConvertError::MetadataParse {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_table(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let temp = tempdir().expect("failed creating tempdir");
        let path = temp.path().join("meta.csv");
        fs::write(&path, contents).expect("failed writing table");
        (temp, path)
    }

    #[test]
    fn parses_tab_separated_table_in_order() {
        let (_temp, path) = write_table(
            "filename\tscene_label\tidentifier\tsource_label\n\
             audio/b.wav\tairport\tairport-lisbon-1000\ta\n\
             audio/a.wav\tpark\tpark-lyon-1010\tb\n",
        );
        let table = load_scene_table(&path).expect("table should parse");
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].recording, "b.wav");
        assert_eq!(table.rows()[1].recording, "a.wav");
        assert_eq!(table.rows()[0].scene_label, "airport");
        assert_eq!(
            table.rows()[0].tau_identifier.as_deref(),
            Some("airport-lisbon-1000")
        );
        assert!(table.contains("a.wav"));
    }

    #[test]
    fn parses_comma_separated_table_and_ignores_unknown_columns() {
        let (_temp, path) = write_table(
            "filename,scene_label,future_column\naudio/a.wav,metro,whatever\n",
        );
        let table = load_scene_table(&path).expect("table should parse");
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].scene_label, "metro");
        assert_eq!(table.rows()[0].tau_identifier, None);
        assert_eq!(table.rows()[0].source_label, None);
    }

    #[test]
    fn missing_required_column_fails() {
        let (_temp, path) = write_table("filename,location\naudio/a.wav,metro\n");
        let err = load_scene_table(&path).expect_err("missing scene_label should fail");
        assert!(matches!(err, ConvertError::MetadataParse { .. }));
        assert!(err.to_string().contains("scene_label"));
    }

    #[test]
    fn undecidable_delimiter_fails() {
        let (_temp, path) = write_table("filename\naudio/a.wav\n");
        let err = load_scene_table(&path).expect_err("single-column header should fail");
        assert!(err.to_string().contains("delimiter"));
    }

    #[test]
    fn duplicate_recording_identifier_fails() {
        let (_temp, path) = write_table(
            "filename,scene_label\naudio/a.wav,metro\naudio/a.wav,park\n",
        );
        let err = load_scene_table(&path).expect_err("duplicate id should fail");
        assert!(err.to_string().contains("duplicate"));
    }
}
