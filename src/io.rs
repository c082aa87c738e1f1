// File-level helpers for savestream encoding/decoding.
//
// Wraps the container operations with file reads/writes and returns
// per-operation statistics. Savestreams and save states are loaded whole;
// the codec has no streaming mode. Optionally computes a SHA-256 digest of
// the produced savestream (feature-gated behind `file-io`).

use std::io;
use std::path::{Path, PathBuf};

#[cfg(feature = "file-io")]
use sha2::{Digest, Sha256};

use crate::container::{self, CodecError};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `encode_files()`.
#[derive(Debug, Clone)]
pub struct EncodeStats {
    /// Number of save states encoded.
    pub states: usize,
    /// Total input bytes across all save states.
    pub input_bytes: u64,
    /// Savestream output size in bytes.
    pub stream_bytes: u64,
    /// SHA-256 of the savestream (if the `file-io` feature is enabled).
    pub stream_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `decode_to_dir()`.
#[derive(Debug, Clone)]
pub struct DecodeStats {
    /// Number of save states written.
    pub states: usize,
    /// Savestream input size in bytes.
    pub stream_bytes: u64,
    /// Total bytes written across all decoded states.
    pub output_bytes: u64,
}

/// Statistics returned by `trim_file()`.
#[derive(Debug, Clone)]
pub struct TrimStats {
    /// Number of save states kept.
    pub kept: usize,
    /// Trimmed savestream size in bytes.
    pub stream_bytes: u64,
}

/// Summary returned by `stream_info()`.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Number of save states in the savestream.
    pub states: usize,
    /// Savestream size in bytes.
    pub stream_bytes: u64,
    /// Serialized bytes per frame (0.0 for an empty savestream).
    pub avg_frame_bytes: f64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file-oriented operations.
#[derive(Debug)]
pub enum IoError {
    /// I/O error (file open, read, write), with the path involved.
    Io(PathBuf, io::Error),
    /// Codec error.
    Codec(CodecError),
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "{}: {e}", path.display()),
            Self::Codec(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(_, e) => Some(e),
            Self::Codec(e) => Some(e),
        }
    }
}

impl From<CodecError> for IoError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, IoError> {
    std::fs::read(path).map_err(|e| IoError::Io(path.to_path_buf(), e))
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), IoError> {
    std::fs::write(path, data).map_err(|e| IoError::Io(path.to_path_buf(), e))
}

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Some(hasher.finalize().into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// encode_files
// ---------------------------------------------------------------------------

/// Encode save-state files, in argument order, into a savestream file.
pub fn encode_files(inputs: &[PathBuf], output: &Path) -> Result<EncodeStats, IoError> {
    let mut states = Vec::with_capacity(inputs.len());
    let mut input_bytes = 0u64;
    for path in inputs {
        let state = read_file(path)?;
        input_bytes += state.len() as u64;
        states.push(state);
    }

    let stream = container::encode(&states)?;
    write_file(output, &stream)?;

    Ok(EncodeStats {
        states: states.len(),
        input_bytes,
        stream_bytes: stream.len() as u64,
        stream_sha256: sha256(&stream),
    })
}

// ---------------------------------------------------------------------------
// decode_to_dir
// ---------------------------------------------------------------------------

/// Decode a savestream file into `<i>.bin` files under `out_dir`.
///
/// With `index`, decodes and writes only that one state (still named by
/// its index). The directory is created if absent.
pub fn decode_to_dir(
    input: &Path,
    out_dir: &Path,
    index: Option<usize>,
) -> Result<DecodeStats, IoError> {
    let stream = read_file(input)?;
    std::fs::create_dir_all(out_dir).map_err(|e| IoError::Io(out_dir.to_path_buf(), e))?;

    let mut stats = DecodeStats {
        states: 0,
        stream_bytes: stream.len() as u64,
        output_bytes: 0,
    };

    if let Some(index) = index {
        let state = container::decode_one(&stream, index)?;
        let path = out_dir.join(format!("{index}.bin"));
        write_file(&path, &state)?;
        stats.states = 1;
        stats.output_bytes = state.len() as u64;
        return Ok(stats);
    }

    for (i, state) in container::decode(&stream)?.enumerate() {
        let state = state?;
        let path = out_dir.join(format!("{i}.bin"));
        write_file(&path, &state)?;
        stats.states += 1;
        stats.output_bytes += state.len() as u64;
    }
    Ok(stats)
}

// ---------------------------------------------------------------------------
// trim_file
// ---------------------------------------------------------------------------

/// Trim a savestream file to the half-open state range `[start, end)`.
pub fn trim_file(
    input: &Path,
    output: &Path,
    start: usize,
    end: Option<usize>,
) -> Result<TrimStats, IoError> {
    let stream = read_file(input)?;
    let trimmed = container::trim(&stream, start, end)?;
    write_file(output, &trimmed)?;
    let kept = container::length(&trimmed)?;
    Ok(TrimStats {
        kept,
        stream_bytes: trimmed.len() as u64,
    })
}

// ---------------------------------------------------------------------------
// stream_info
// ---------------------------------------------------------------------------

/// Summarize a savestream file without decoding its states.
pub fn stream_info(input: &Path) -> Result<StreamInfo, IoError> {
    let stream = read_file(input)?;
    let states = container::length(&stream)?;
    let stream_bytes = stream.len() as u64;
    let avg_frame_bytes = if states == 0 {
        0.0
    } else {
        stream_bytes as f64 / states as f64
    };
    Ok(StreamInfo {
        states,
        stream_bytes,
        avg_frame_bytes,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
