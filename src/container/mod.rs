// Savestream container: frame records and the codec operations.
//
// Encoding splits each save state, aligns its buffer, feeds it through the
// dedup index, and diffs its parsed info against the previous frame's.
// Decoding replays the same pipeline in reverse, rebuilding the dedup
// tables from per-frame deltas. All codec state lives inside a single
// `encode` or `decode` call; nothing persists across calls.
//
// # Modules
//
// - `wire` — MessagePack subset serialization of the frame list

pub mod wire;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::dedup::{
    BlockStore, DedupError, DedupIndex, IdSpace, BLOCK_SIZE, SUPER_BLOCK_SIZE,
};
use crate::jsondiff::{self, PatchError};
use crate::state::aligner::{RegionError, RegionTable};
use crate::state::framer::{self, HeaderError, HEADER_LEN, INFO_LEN_OFFSET};
use wire::WireError;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One per-state record of the savestream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// The 16-byte save-state header, verbatim.
    pub header_block: [u8; HEADER_LEN],
    /// JSON edit script from the previous frame's info (`{}` for frame 0).
    pub info_patch: Vec<u8>,
    /// Superblock IDs whose expansions concatenate to the aligned buffer.
    pub super_sequence: Vec<u32>,
    /// Blocks first introduced by this frame.
    pub new_blocks: BTreeMap<u32, Vec<u8>>,
    /// Superblocks first introduced by this frame.
    pub new_super_blocks: BTreeMap<u32, Vec<u32>>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The codec's public error type. Every failure of a top-level operation
/// is one of these kinds; no partial output is ever committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Save state shorter than its header, or info length past EOF.
    MalformedHeader(String),
    /// Info block is not compact UTF-8 JSON or its regions are unusable.
    MalformedInfo(String),
    /// Savestream bytes fail structural deserialization.
    MalformedContainer(String),
    /// A frame references a block or superblock ID not yet defined.
    UnknownId { space: IdSpace, id: u32 },
    /// A frame redefines an existing ID with different content.
    DuplicateId { space: IdSpace, id: u32 },
    /// `decode_one` index outside `[0, length)`.
    OutOfRange { index: usize, len: usize },
    /// An ID table or a frame serialization exceeded its ceiling.
    ResourceExhausted(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedHeader(msg) => write!(f, "malformed save state: {msg}"),
            Self::MalformedInfo(msg) => write!(f, "malformed info block: {msg}"),
            Self::MalformedContainer(msg) => write!(f, "malformed savestream: {msg}"),
            Self::UnknownId { space, id } => write!(f, "unknown {space} id {id}"),
            Self::DuplicateId { space, id } => {
                write!(f, "{space} id {id} redefined with different content")
            }
            Self::OutOfRange { index, len } => {
                write!(f, "state index {index} out of range for savestream of {len}")
            }
            Self::ResourceExhausted(msg) => write!(f, "resource limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<HeaderError> for CodecError {
    fn from(e: HeaderError) -> Self {
        Self::MalformedHeader(e.to_string())
    }
}

impl From<RegionError> for CodecError {
    fn from(e: RegionError) -> Self {
        Self::MalformedInfo(e.to_string())
    }
}

impl From<DedupError> for CodecError {
    fn from(e: DedupError) -> Self {
        match e {
            DedupError::Unknown { space, id } => Self::UnknownId { space, id },
            DedupError::Duplicate { space, id } => Self::DuplicateId { space, id },
            DedupError::BadBlockLen { .. } | DedupError::BadSuperLen { .. } => {
                Self::MalformedContainer(e.to_string())
            }
            DedupError::TableFull { .. } => Self::ResourceExhausted(e.to_string()),
        }
    }
}

impl From<WireError> for CodecError {
    fn from(e: WireError) -> Self {
        match e {
            WireError::FrameTooLarge => Self::ResourceExhausted(e.to_string()),
            _ => Self::MalformedContainer(e.to_string()),
        }
    }
}

impl From<PatchError> for CodecError {
    fn from(e: PatchError) -> Self {
        Self::MalformedContainer(format!("info patch does not apply: {e}"))
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode an ordered sequence of raw save states into savestream bytes.
pub fn encode<S: AsRef<[u8]>>(states: &[S]) -> Result<Vec<u8>, CodecError> {
    let mut index = DedupIndex::new();
    let mut prev_info = Value::Object(Default::default());
    let mut frames = Vec::with_capacity(states.len());

    for state in states {
        let parts = framer::split(state.as_ref())?;

        let info: Value = serde_json::from_slice(parts.info)
            .map_err(|e| CodecError::MalformedInfo(e.to_string()))?;
        // The decoder reproduces info bytes by patch-then-serialize, so
        // anything but the compact serialized form cannot round trip.
        let reserialized = serde_json::to_vec(&info)
            .map_err(|e| CodecError::MalformedInfo(e.to_string()))?;
        if reserialized != parts.info {
            return Err(CodecError::MalformedInfo(
                "info block is not in compact serialized form".into(),
            ));
        }

        if info.get("buffer_infos").is_none() && !parts.buffer.is_empty() {
            return Err(RegionError::MissingBufferInfos.into());
        }
        let regions = RegionTable::from_info(&info)?;
        regions.check_coverage(parts.buffer.len())?;

        let aligned = regions.align(parts.buffer, BLOCK_SIZE, SUPER_BLOCK_SIZE)?;
        let delta = index.ingest(&aligned)?;

        let ops = jsondiff::diff(&prev_info, &info);
        let info_patch = serde_json::to_vec(&jsondiff::ops_to_json(&ops))
            .map_err(|e| CodecError::MalformedInfo(e.to_string()))?;

        frames.push(Frame {
            header_block: *parts.header,
            info_patch,
            super_sequence: delta.super_sequence,
            new_blocks: delta.new_blocks,
            new_super_blocks: delta.new_super_blocks,
        });
        prev_info = info;
    }

    Ok(wire::write_savestream(&frames)?)
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Lazy decoder over a savestream's frames.
///
/// Yields one raw save state per frame. The frame list is deserialized up
/// front; per-frame codec work happens on each `next()`. The sequence is
/// finite, consumed once, and not restartable; random access goes through
/// [`decode_one`].
pub struct Decoder {
    frames: std::vec::IntoIter<Frame>,
    store: BlockStore,
    prev_info: Value,
}

impl Decoder {
    fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into_iter(),
            store: BlockStore::new(),
            prev_info: Value::Object(Default::default()),
        }
    }

    /// Number of frames not yet yielded.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    fn decode_frame(&mut self, frame: &Frame) -> Result<Vec<u8>, CodecError> {
        self.store.merge(&frame.new_blocks, &frame.new_super_blocks)?;

        let patch_json: Value = serde_json::from_slice(&frame.info_patch).map_err(|e| {
            CodecError::MalformedContainer(format!("info patch is not JSON: {e}"))
        })?;
        let ops = jsondiff::ops_from_json(&patch_json)?;
        let info = jsondiff::patch(&self.prev_info, &ops)?;
        let info_bytes = serde_json::to_vec(&info)
            .map_err(|e| CodecError::MalformedContainer(e.to_string()))?;

        // The stored header embeds the info length; a patched info that
        // serializes to a different length cannot reproduce the state.
        let header_len = u32::from_le_bytes(
            frame.header_block[INFO_LEN_OFFSET..]
                .try_into()
                .unwrap_or([0; 4]),
        );
        if u64::from(header_len) != info_bytes.len() as u64 {
            return Err(CodecError::MalformedContainer(format!(
                "patched info is {} bytes but the stored header says {header_len}",
                info_bytes.len()
            )));
        }

        let aligned = self.store.rehydrate(&frame.super_sequence)?;
        let regions = RegionTable::from_info(&info)?;
        let buffer = regions.unalign(&aligned, BLOCK_SIZE)?;

        let raw = framer::join(&frame.header_block, &info_bytes, &buffer)?;
        self.prev_info = info;
        Ok(raw)
    }
}

impl Iterator for Decoder {
    type Item = Result<Vec<u8>, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.frames.next()?;
        Some(self.decode_frame(&frame))
    }
}

/// Decode a savestream into a lazy sequence of raw save states.
pub fn decode(savestream: &[u8]) -> Result<Decoder, CodecError> {
    let frames = wire::read_savestream(savestream)?;
    Ok(Decoder::new(frames))
}

/// Decode the single save state at `index`.
///
/// Frame deltas are cumulative, so this replays frames `0..=index`.
pub fn decode_one(savestream: &[u8], index: usize) -> Result<Vec<u8>, CodecError> {
    let frames = wire::read_savestream(savestream)?;
    let len = frames.len();
    if index >= len {
        return Err(CodecError::OutOfRange { index, len });
    }
    let mut decoder = Decoder::new(frames);
    let mut current = None;
    for _ in 0..=index {
        let state = decoder
            .next()
            .ok_or(CodecError::OutOfRange { index, len })??;
        current = Some(state);
    }
    current.ok_or(CodecError::OutOfRange { index, len })
}

/// Number of save states in a savestream.
///
/// Structural deserialization only; no dedup or patch replay.
pub fn length(savestream: &[u8]) -> Result<usize, CodecError> {
    Ok(wire::read_savestream(savestream)?.len())
}

// ---------------------------------------------------------------------------
// Trim
// ---------------------------------------------------------------------------

/// Re-encode the subrange `[start, end)` of a savestream.
///
/// `end` defaults to the stream length; both bounds saturate to
/// `[0, length]`, and `start >= end` yields an empty savestream. Frames
/// reference dedup IDs cumulatively, so the kept range is decoded with the
/// full codec and encoded afresh rather than sliced.
pub fn trim(savestream: &[u8], start: usize, end: Option<usize>) -> Result<Vec<u8>, CodecError> {
    let frames = wire::read_savestream(savestream)?;
    let len = frames.len();
    let end = end.unwrap_or(len).min(len);
    let start = start.min(len);
    if start >= end {
        return encode::<&[u8]>(&[]);
    }

    let mut kept = Vec::with_capacity(end - start);
    for (i, state) in Decoder::new(frames).enumerate() {
        if i >= end {
            break;
        }
        let state = state?;
        if i >= start {
            kept.push(state);
        }
    }
    encode(&kept)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
