//! Lazily-decodable audio references.
//!
//! Ownership model:
//! - `AudioRef` is the merged row's handle on one clip: a path plus
//!   capabilities, never decoded samples.
//! - `probe` is the build-time validity gate (container/codec headers only).
//! - `decode` exists for consumers that want waveforms on access; the
//!   conversion pipeline itself never calls it.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::errors::ConvertError;

/// Reference to one audio clip on disk.
#[derive(Clone, Debug)]
pub struct AudioRef {
    path: PathBuf,
}

/// Container-level facts read by a lightweight format probe.
#[derive(Clone, Copy, Debug)]
pub struct AudioProbe {
    /// Sample rate reported by the codec parameters, when present.
    pub sample_rate: Option<u32>,
    /// Channel count reported by the codec parameters, when present.
    pub channels: Option<usize>,
    /// Total frame count, when the container declares it.
    pub frames: Option<u64>,
}

/// Fully decoded waveform produced on demand.
#[derive(Clone, Debug)]
pub struct DecodedAudio {
    /// Interleaved f32 samples at the clip's native sample rate.
    pub samples: Vec<f32>,
    /// Native sample rate.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: usize,
}

impl AudioRef {
    /// Wrap a resolved on-disk clip path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the referenced clip.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw container bytes for embedding in the audio column.
    pub fn read_bytes(&self) -> Result<Vec<u8>, ConvertError> {
        fs::read(&self.path).map_err(|err| self.error(format!("failed reading file: {err}")))
    }

    /// Validate the clip by probing container and codec headers.
    ///
    /// No packets are decoded, so probing the whole corpus stays streaming
    /// rather than memory-bound.
    pub fn probe(&self) -> Result<AudioProbe, ConvertError> {
        let format = self.open_format()?;
        let track = format
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| self.error("no decodable audio track".to_string()))?;
        Ok(AudioProbe {
            sample_rate: track.codec_params.sample_rate,
            channels: track.codec_params.channels.map(|channels| channels.count()),
            frames: track.codec_params.n_frames,
        })
    }

    /// Decode the whole clip to interleaved f32 samples.
    pub fn decode(&self) -> Result<DecodedAudio, ConvertError> {
        let mut format = self.open_format()?;
        let track = format
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| self.error("no decodable audio track".to_string()))?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track.codec_params.channels.map(|channels| channels.count());

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|err| self.error(format!("failed creating decoder: {err}")))?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                // End of stream surfaces as an IO error from the reader.
                Err(SymphoniaError::IoError(_)) => break,
                Err(err) => {
                    return Err(self.error(format!("failed reading packet: {err}")));
                }
            };
            if packet.track_id() != track_id {
                continue;
            }
            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // Recoverable per-packet failures are skipped by the decoder contract.
                Err(SymphoniaError::DecodeError(_)) | Err(SymphoniaError::IoError(_)) => continue,
                Err(err) => {
                    return Err(self.error(format!("unrecoverable decode error: {err}")));
                }
            };
            sample_rate.get_or_insert(decoded.spec().rate);
            channels.get_or_insert(decoded.spec().channels.count());

            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
            buffer.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buffer.samples());
        }

        let sample_rate =
            sample_rate.ok_or_else(|| self.error("could not determine sample rate".to_string()))?;
        let channels =
            channels.ok_or_else(|| self.error("could not determine channel count".to_string()))?;
        if samples.is_empty() {
            return Err(self.error("decoded audio was empty".to_string()));
        }
        Ok(DecodedAudio {
            samples,
            sample_rate,
            channels,
        })
    }

    fn open_format(&self) -> Result<Box<dyn FormatReader>, ConvertError> {
        let file = File::open(&self.path)
            .map_err(|err| self.error(format!("failed opening file: {err}")))?;
        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = self.path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|err| self.error(format!("unsupported or corrupt container: {err}")))?;
        Ok(probed.format)
    }

    fn error(&self, reason: String) -> ConvertError {
        ConvertError::AudioRead {
            path: self.path.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_wav(path: &Path, sample_rate: u32, samples: &[i16]) {
        let data_len = (samples.len() * 2) as u32;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        std::fs::write(path, bytes).expect("failed writing wav fixture");
    }

    #[test]
    fn probe_reads_header_facts() {
        let temp = tempdir().expect("failed creating tempdir");
        let path = temp.path().join("clip.wav");
        write_wav(&path, 48_000, &[0, 120, -120, 64]);

        let probe = AudioRef::new(&path).probe().expect("probe should succeed");
        assert_eq!(probe.sample_rate, Some(48_000));
        assert_eq!(probe.channels, Some(1));
    }

    #[test]
    fn probe_rejects_corrupt_header() {
        let temp = tempdir().expect("failed creating tempdir");
        let path = temp.path().join("broken.wav");
        std::fs::write(&path, b"definitely not a riff container").expect("failed writing fixture");

        let err = AudioRef::new(&path)
            .probe()
            .expect_err("garbage bytes should fail the probe");
        assert!(matches!(err, ConvertError::AudioRead { .. }));
    }

    #[test]
    fn decode_returns_native_waveform() {
        let temp = tempdir().expect("failed creating tempdir");
        let path = temp.path().join("clip.wav");
        let samples: Vec<i16> = (0..32).map(|value| value * 128).collect();
        write_wav(&path, 16_000, &samples);

        let decoded = AudioRef::new(&path).decode().expect("decode should succeed");
        assert_eq!(decoded.sample_rate, 16_000);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples.len(), samples.len());
    }

    #[test]
    fn read_bytes_returns_container_bytes() {
        let temp = tempdir().expect("failed creating tempdir");
        let path = temp.path().join("clip.wav");
        write_wav(&path, 16_000, &[1, 2, 3]);

        let bytes = AudioRef::new(&path)
            .read_bytes()
            .expect("read_bytes should succeed");
        assert_eq!(&bytes[..4], b"RIFF");
    }
}
