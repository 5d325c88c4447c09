//! Command-line surface and process-level wiring.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::constants::dataset::DEFAULT_OUT_DIR;
use crate::pipeline::{self, ConvertOptions};

/// CLI for the MACS converter.
#[derive(Debug, Parser)]
#[command(
    name = "macs2hf",
    disable_help_subcommand = true,
    about = "Convert the raw MACS release into a streaming-ready captioned-audio dataset",
    long_about = "Join the MACS scene-label table and caption manifest on audio filename, \
                  embed each clip as a lazily-decoded audio column, and write a single-split \
                  columnar dataset, optionally pushing it to the hub.",
    after_help = "The hub token is resolved from --hf-token, then HF_TOKEN, then an ambient hub login."
)]
pub struct ConvertCli {
    #[arg(
        long = "audio-root",
        value_name = "PATH",
        help = "Directory containing the WAV clips"
    )]
    audio_root: PathBuf,
    #[arg(
        long = "meta-csv",
        value_name = "PATH",
        help = "Delimited scene-label table (comma- or tab-separated)"
    )]
    meta_csv: PathBuf,
    #[arg(long = "yaml-file", value_name = "PATH", help = "YAML caption/tag manifest")]
    yaml_file: PathBuf,
    #[arg(
        long = "out-dir",
        value_name = "DIR",
        default_value = DEFAULT_OUT_DIR,
        help = "Where to write the converted dataset"
    )]
    out_dir: PathBuf,
    #[arg(
        long = "push-to-hub",
        value_name = "REPO_ID",
        help = "Push the converted dataset to this hub dataset repo, e.g. 'username/MACS_captions'"
    )]
    push_to_hub: Option<String>,
    #[arg(
        long,
        requires = "push_to_hub",
        help = "Mark the hub repository private (only with --push-to-hub)"
    )]
    private: bool,
    #[arg(
        long = "hf-token",
        value_name = "TOKEN",
        help = "Hub access token; defaults to HF_TOKEN or an ambient login"
    )]
    hf_token: Option<String>,
}

impl From<ConvertCli> for ConvertOptions {
    fn from(cli: ConvertCli) -> Self {
        Self {
            audio_root: cli.audio_root,
            meta_csv: cli.meta_csv,
            yaml_file: cli.yaml_file,
            out_dir: cli.out_dir,
            push_to_hub: cli.push_to_hub,
            private: cli.private,
            hf_token: cli.hf_token,
        }
    }
}

/// Parse arguments, run the pipeline, and map the outcome to an exit code.
pub fn main() -> ExitCode {
    init_tracing();
    let cli = ConvertCli::parse();
    match pipeline::run(cli.into()) {
        Ok(report) => {
            info!(
                rows = report.rows,
                out_dir = %report.out_dir.display(),
                "conversion complete"
            );
            if let Some(repo) = report.published {
                info!(repo = %repo, "dataset published");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_requires_push_to_hub() {
        let err = ConvertCli::try_parse_from([
            "macs2hf",
            "--audio-root",
            "audio",
            "--meta-csv",
            "meta.csv",
            "--yaml-file",
            "MACS.yaml",
            "--private",
        ])
        .expect_err("--private without --push-to-hub should be rejected");
        assert!(err.to_string().contains("--push-to-hub"));
    }

    #[test]
    fn out_dir_defaults_to_macs_hf() {
        let cli = ConvertCli::try_parse_from([
            "macs2hf",
            "--audio-root",
            "audio",
            "--meta-csv",
            "meta.csv",
            "--yaml-file",
            "MACS.yaml",
        ])
        .expect("minimal invocation should parse");
        let options = ConvertOptions::from(cli);
        assert_eq!(options.out_dir, PathBuf::from(DEFAULT_OUT_DIR));
        assert_eq!(options.push_to_hub, None);
        assert!(!options.private);
    }
}
