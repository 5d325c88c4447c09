//! Optional hub publishing: startup token resolution and a thin client over
//! the dataset-registry HTTP API (repo creation, preupload, LFS transfer,
//! single NDJSON commit).

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::info;
use walkdir::WalkDir;

use crate::constants::hub::{
    COMMIT_SUMMARY, DEFAULT_ENDPOINT, ENDPOINT_ENV, MAIN_REVISION, PREUPLOAD_SAMPLE_BYTES,
    TOKEN_ENV, USER_AGENT,
};
use crate::errors::ConvertError;
use crate::types::RepoId;

/// Resolve the hub access token once, at startup, into an explicit value.
///
/// Precedence: explicit CLI argument, then the `HF_TOKEN` environment
/// variable, then the ambient token written by a previous hub login.
pub fn resolve_token(explicit: Option<String>) -> Result<String, ConvertError> {
    resolve_token_from(explicit, std::env::var(TOKEN_ENV).ok(), || {
        hf_hub::Cache::default().token()
    })
}

fn resolve_token_from(
    explicit: Option<String>,
    env_token: Option<String>,
    ambient: impl FnOnce() -> Option<String>,
) -> Result<String, ConvertError> {
    for candidate in [explicit, env_token] {
        if let Some(token) = candidate {
            let token = token.trim().to_string();
            if !token.is_empty() {
                return Ok(token);
            }
        }
    }
    if let Some(token) = ambient() {
        let token = token.trim().to_string();
        if !token.is_empty() {
            return Ok(token);
        }
    }
    Err(ConvertError::Authentication(format!(
        "no token available via --hf-token, {TOKEN_ENV}, or an ambient hub login"
    )))
}

/// Authenticated client for one hub endpoint.
pub struct HubClient {
    endpoint: String,
    token: String,
    http: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct PreuploadResponse {
    files: Vec<PreuploadFile>,
}

#[derive(Debug, Deserialize)]
struct PreuploadFile {
    path: String,
    #[serde(rename = "uploadMode")]
    upload_mode: String,
}

#[derive(Debug, Deserialize)]
struct LfsBatchResponse {
    objects: Vec<LfsObject>,
}

#[derive(Debug, Deserialize)]
struct LfsObject {
    oid: String,
    #[serde(default)]
    actions: Option<LfsActions>,
}

#[derive(Debug, Deserialize)]
struct LfsActions {
    upload: Option<LfsAction>,
}

#[derive(Debug, Deserialize)]
struct LfsAction {
    href: String,
    #[serde(default)]
    header: Option<HashMap<String, String>>,
}

#[derive(Debug)]
struct UploadFile {
    rel_path: String,
    abs_path: PathBuf,
    size: u64,
}

impl HubClient {
    /// Build a client for the configured endpoint with a resolved token.
    pub fn new(token: String) -> Result<Self, ConvertError> {
        let endpoint =
            std::env::var(ENDPOINT_ENV).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| ConvertError::Publish(format!("failed building http client: {err}")))?;
        Ok(Self {
            endpoint,
            token,
            http,
        })
    }

    /// Upload every file under `local_dir` to the dataset repo `repo` in one
    /// commit, creating the repo first when needed.
    pub fn publish_dataset(
        &self,
        repo: &RepoId,
        local_dir: &Path,
        private: bool,
    ) -> Result<(), ConvertError> {
        self.ensure_repo(repo, private)?;
        let files = collect_files(local_dir)?;
        if files.is_empty() {
            return Err(ConvertError::Publish(format!(
                "nothing to upload under {}",
                local_dir.display()
            )));
        }

        let modes = self.preupload(repo, &files)?;
        let mut operations = vec![serde_json::json!({
            "key": "header",
            "value": {"summary": COMMIT_SUMMARY, "description": ""},
        })];
        for file in &files {
            let lfs = modes
                .get(&file.rel_path)
                .is_some_and(|mode| mode.as_str() == "lfs");
            if lfs {
                let oid = self.upload_lfs(repo, file)?;
                operations.push(serde_json::json!({
                    "key": "lfsFile",
                    "value": {
                        "path": file.rel_path,
                        "algo": "sha256",
                        "oid": oid,
                        "size": file.size,
                    },
                }));
            } else {
                let bytes = std::fs::read(&file.abs_path)?;
                operations.push(serde_json::json!({
                    "key": "file",
                    "value": {
                        "path": file.rel_path,
                        "content": BASE64.encode(bytes),
                        "encoding": "base64",
                    },
                }));
            }
        }
        self.commit(repo, &operations)?;
        info!(repo = %repo, files = files.len(), "published dataset to hub");
        Ok(())
    }

    fn ensure_repo(&self, repo: &RepoId, private: bool) -> Result<(), ConvertError> {
        let (organization, name) = match repo.split_once('/') {
            Some((organization, name)) => (Some(organization), name),
            None => (None, repo.as_str()),
        };
        let mut body = serde_json::json!({
            "type": "dataset",
            "name": name,
            "private": private,
        });
        if let Some(organization) = organization {
            body["organization"] = serde_json::Value::String(organization.to_string());
        }

        let response = self
            .http
            .post(format!("{}/api/repos/create", self.endpoint))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(|err| ConvertError::Publish(format!("repo creation request failed: {err}")))?;
        if response.status() == reqwest::StatusCode::CONFLICT {
            // Repo already exists; uploading into it is fine.
            return Ok(());
        }
        self.check("repo creation", response)?;
        Ok(())
    }

    fn preupload(
        &self,
        repo: &RepoId,
        files: &[UploadFile],
    ) -> Result<HashMap<String, String>, ConvertError> {
        let descriptors: Vec<serde_json::Value> = files
            .iter()
            .map(|file| {
                let sample = read_sample(&file.abs_path, file.size)?;
                Ok(serde_json::json!({
                    "path": file.rel_path,
                    "size": file.size,
                    "sample": BASE64.encode(sample),
                }))
            })
            .collect::<Result<_, ConvertError>>()?;

        let response = self
            .http
            .post(format!(
                "{}/api/datasets/{repo}/preupload/{MAIN_REVISION}",
                self.endpoint
            ))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({"files": descriptors}))
            .send()
            .map_err(|err| ConvertError::Publish(format!("preupload request failed: {err}")))?;
        let response = self.check("preupload", response)?;
        let parsed: PreuploadResponse = response
            .json()
            .map_err(|err| ConvertError::Publish(format!("bad preupload response: {err}")))?;
        Ok(parsed
            .files
            .into_iter()
            .map(|file| (file.path, file.upload_mode))
            .collect())
    }

    /// Upload one file through the git-lfs batch protocol; returns its oid.
    fn upload_lfs(&self, repo: &RepoId, file: &UploadFile) -> Result<String, ConvertError> {
        let oid = sha256_file(&file.abs_path)?;
        let response = self
            .http
            .post(format!(
                "{}/datasets/{repo}.git/info/lfs/objects/batch",
                self.endpoint
            ))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.git-lfs+json")
            .header("Content-Type", "application/vnd.git-lfs+json")
            .json(&serde_json::json!({
                "operation": "upload",
                "transfers": ["basic"],
                "hash_algo": "sha256",
                "objects": [{"oid": oid, "size": file.size}],
            }))
            .send()
            .map_err(|err| ConvertError::Publish(format!("lfs batch request failed: {err}")))?;
        let response = self.check("lfs batch", response)?;
        let parsed: LfsBatchResponse = response
            .json()
            .map_err(|err| ConvertError::Publish(format!("bad lfs batch response: {err}")))?;
        let object = parsed
            .objects
            .into_iter()
            .find(|object| object.oid == oid)
            .ok_or_else(|| {
                ConvertError::Publish(format!("lfs batch response missing oid for {}", file.rel_path))
            })?;

        // No upload action means the object is already stored server-side.
        if let Some(action) = object.actions.and_then(|actions| actions.upload) {
            let bytes = std::fs::read(&file.abs_path)?;
            let mut request = self.http.put(&action.href).body(bytes);
            for (key, value) in action.header.unwrap_or_default() {
                request = request.header(key.as_str(), value.as_str());
            }
            let response = request.send().map_err(|err| {
                ConvertError::Publish(format!("lfs transfer failed for {}: {err}", file.rel_path))
            })?;
            self.check("lfs transfer", response)?;
        }
        Ok(oid)
    }

    fn commit(
        &self,
        repo: &RepoId,
        operations: &[serde_json::Value],
    ) -> Result<(), ConvertError> {
        let body = operations
            .iter()
            .map(|operation| operation.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let response = self
            .http
            .post(format!(
                "{}/api/datasets/{repo}/commit/{MAIN_REVISION}",
                self.endpoint
            ))
            .bearer_auth(&self.token)
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .map_err(|err| ConvertError::Publish(format!("commit request failed: {err}")))?;
        self.check("commit", response)?;
        Ok(())
    }

    fn check(
        &self,
        context: &str,
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, ConvertError> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ConvertError::Authentication(format!(
                "{context} rejected by hub ({status})"
            )));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ConvertError::Publish(format!(
                "{context} failed ({status}): {body}"
            )));
        }
        Ok(response)
    }
}

fn collect_files(local_dir: &Path) -> Result<Vec<UploadFile>, ConvertError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(local_dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let abs_path = entry.path().to_path_buf();
        let rel_path = abs_path
            .strip_prefix(local_dir)
            .map_err(|_| {
                ConvertError::Publish(format!(
                    "file {} escaped upload root {}",
                    abs_path.display(),
                    local_dir.display()
                ))
            })?
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let size = entry
            .metadata()
            .map_err(|err| ConvertError::Publish(format!("failed reading metadata: {err}")))?
            .len();
        files.push(UploadFile {
            rel_path,
            abs_path,
            size,
        });
    }
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}

fn read_sample(path: &Path, size: u64) -> Result<Vec<u8>, ConvertError> {
    let mut file = File::open(path)?;
    let mut sample = vec![0u8; PREUPLOAD_SAMPLE_BYTES.min(size as usize)];
    file.read_exact(&mut sample)?;
    Ok(sample)
}

fn sha256_file(path: &Path) -> Result<String, ConvertError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn explicit_token_wins_over_environment_and_ambient() {
        let token = resolve_token_from(
            Some("explicit".to_string()),
            Some("from-env".to_string()),
            || Some("ambient".to_string()),
        )
        .expect("token should resolve");
        assert_eq!(token, "explicit");
    }

    #[test]
    fn blank_explicit_token_falls_through() {
        let token = resolve_token_from(Some("  ".to_string()), Some("from-env".to_string()), || {
            None
        })
        .expect("token should resolve");
        assert_eq!(token, "from-env");
    }

    #[test]
    fn ambient_token_is_last_resort() {
        let token =
            resolve_token_from(None, None, || Some("ambient".to_string())).expect("should resolve");
        assert_eq!(token, "ambient");
    }

    #[test]
    fn missing_token_everywhere_is_an_authentication_error() {
        let err = resolve_token_from(None, None, || None).expect_err("should fail");
        assert!(matches!(err, ConvertError::Authentication(_)));
    }

    #[test]
    fn collect_files_yields_sorted_slash_relative_paths() {
        let temp = tempdir().expect("failed creating tempdir");
        fs::create_dir(temp.path().join("data")).expect("failed creating data dir");
        fs::write(temp.path().join("data/b.parquet"), b"bb").expect("failed writing file");
        fs::write(temp.path().join("a.json"), b"a").expect("failed writing file");

        let files = collect_files(temp.path()).expect("collect should succeed");
        let paths: Vec<&str> = files.iter().map(|file| file.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["a.json", "data/b.parquet"]);
        assert_eq!(files[1].size, 2);
    }

    #[test]
    fn sha256_matches_known_digest() {
        let temp = tempdir().expect("failed creating tempdir");
        let path = temp.path().join("abc.txt");
        fs::write(&path, b"abc").expect("failed writing file");
        assert_eq!(
            sha256_file(&path).expect("hashing should succeed"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
