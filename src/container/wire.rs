// Savestream container encoding: the MessagePack subset the format needs.
//
// The container is one top-level array of frames; each frame is a 5-entry
// map with string keys. Only five wire types appear: unsigned integers,
// strings, binary, arrays, and maps. The writer always emits the shortest
// encoding of a value (what the reference encoder produces); the reader
// accepts any well-formed size variant.
//
// Marker bytes (MessagePack spec):
//   0x00-0x7f  positive fixint        0xa0-0xbf  fixstr
//   0xcc/cd/ce/cf  uint8/16/32/64     0xd9/da/db str8/16/32
//   0xc4/c5/c6 bin8/16/32             0x90-0x9f  fixarray
//   0xdc/dd    array16/32             0x80-0x8f  fixmap
//   0xde/df    map16/32

use std::collections::BTreeMap;

use super::Frame;
use crate::state::HEADER_LEN;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Input ended inside a value.
    Truncated,
    /// A marker or value violates the container schema.
    Malformed(String),
    /// A frame is missing one of its five required fields.
    MissingField(&'static str),
    /// A single frame serialized past the 2^32-byte ceiling.
    FrameTooLarge,
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated => write!(f, "savestream truncated"),
            Self::Malformed(msg) => write!(f, "malformed savestream: {msg}"),
            Self::MissingField(name) => write!(f, "frame lacks required field `{name}`"),
            Self::FrameTooLarge => write!(f, "frame serialization exceeds 2^32 bytes"),
        }
    }
}

impl std::error::Error for WireError {}

// ---------------------------------------------------------------------------
// Writing primitives
// ---------------------------------------------------------------------------

pub fn write_uint(out: &mut Vec<u8>, v: u64) {
    if v < 0x80 {
        out.push(v as u8);
    } else if v <= u8::MAX as u64 {
        out.push(0xcc);
        out.push(v as u8);
    } else if v <= u16::MAX as u64 {
        out.push(0xcd);
        out.extend_from_slice(&(v as u16).to_be_bytes());
    } else if v <= u32::MAX as u64 {
        out.push(0xce);
        out.extend_from_slice(&(v as u32).to_be_bytes());
    } else {
        out.push(0xcf);
        out.extend_from_slice(&v.to_be_bytes());
    }
}

pub fn write_str(out: &mut Vec<u8>, s: &str) {
    let len = s.len();
    if len < 32 {
        out.push(0xa0 | len as u8);
    } else if len <= u8::MAX as usize {
        out.push(0xd9);
        out.push(len as u8);
    } else if len <= u16::MAX as usize {
        out.push(0xda);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(0xdb);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
    out.extend_from_slice(s.as_bytes());
}

pub fn write_bin(out: &mut Vec<u8>, data: &[u8]) -> Result<(), WireError> {
    if data.len() <= u8::MAX as usize {
        out.push(0xc4);
        out.push(data.len() as u8);
    } else if data.len() <= u16::MAX as usize {
        out.push(0xc5);
        out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    } else if data.len() <= u32::MAX as usize {
        out.push(0xc6);
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    } else {
        return Err(WireError::FrameTooLarge);
    }
    out.extend_from_slice(data);
    Ok(())
}

pub fn write_array_len(out: &mut Vec<u8>, len: usize) -> Result<(), WireError> {
    if len < 16 {
        out.push(0x90 | len as u8);
    } else if len <= u16::MAX as usize {
        out.push(0xdc);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else if len <= u32::MAX as usize {
        out.push(0xdd);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    } else {
        return Err(WireError::FrameTooLarge);
    }
    Ok(())
}

pub fn write_map_len(out: &mut Vec<u8>, len: usize) -> Result<(), WireError> {
    if len < 16 {
        out.push(0x80 | len as u8);
    } else if len <= u16::MAX as usize {
        out.push(0xde);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else if len <= u32::MAX as usize {
        out.push(0xdf);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    } else {
        return Err(WireError::FrameTooLarge);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reading primitives
// ---------------------------------------------------------------------------

/// Cursor over the container bytes.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(n).ok_or(WireError::Truncated)?;
        if end > self.data.len() {
            return Err(WireError::Truncated);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn take_be(&mut self, n: usize) -> Result<u64, WireError> {
        let bytes = self.take(n)?;
        let mut v = 0u64;
        for &b in bytes {
            v = (v << 8) | u64::from(b);
        }
        Ok(v)
    }

    pub fn read_uint(&mut self) -> Result<u64, WireError> {
        let marker = self.take_u8()?;
        match marker {
            0x00..=0x7f => Ok(u64::from(marker)),
            0xcc => self.take_be(1),
            0xcd => self.take_be(2),
            0xce => self.take_be(4),
            0xcf => self.take_be(8),
            other => Err(WireError::Malformed(format!(
                "expected unsigned integer, found marker {other:#04x}"
            ))),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        let v = self.read_uint()?;
        u32::try_from(v)
            .map_err(|_| WireError::Malformed(format!("integer {v} does not fit an id")))
    }

    pub fn read_str(&mut self) -> Result<&'a str, WireError> {
        let marker = self.take_u8()?;
        let len = match marker {
            0xa0..=0xbf => usize::from(marker & 0x1f),
            0xd9 => self.take_be(1)? as usize,
            0xda => self.take_be(2)? as usize,
            0xdb => self.take_be(4)? as usize,
            other => {
                return Err(WireError::Malformed(format!(
                    "expected string, found marker {other:#04x}"
                )))
            }
        };
        std::str::from_utf8(self.take(len)?)
            .map_err(|_| WireError::Malformed("string is not valid UTF-8".into()))
    }

    pub fn read_bin(&mut self) -> Result<&'a [u8], WireError> {
        let marker = self.take_u8()?;
        let len = match marker {
            0xc4 => self.take_be(1)? as usize,
            0xc5 => self.take_be(2)? as usize,
            0xc6 => self.take_be(4)? as usize,
            other => {
                return Err(WireError::Malformed(format!(
                    "expected binary, found marker {other:#04x}"
                )))
            }
        };
        self.take(len)
    }

    pub fn read_array_len(&mut self) -> Result<usize, WireError> {
        let marker = self.take_u8()?;
        match marker {
            0x90..=0x9f => Ok(usize::from(marker & 0x0f)),
            0xdc => Ok(self.take_be(2)? as usize),
            0xdd => Ok(self.take_be(4)? as usize),
            other => Err(WireError::Malformed(format!(
                "expected array, found marker {other:#04x}"
            ))),
        }
    }

    pub fn read_map_len(&mut self) -> Result<usize, WireError> {
        let marker = self.take_u8()?;
        match marker {
            0x80..=0x8f => Ok(usize::from(marker & 0x0f)),
            0xde => Ok(self.take_be(2)? as usize),
            0xdf => Ok(self.take_be(4)? as usize),
            other => Err(WireError::Malformed(format!(
                "expected map, found marker {other:#04x}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Savestream writing
// ---------------------------------------------------------------------------

const FIELD_HEADER_BLOCK: &str = "header_block";
const FIELD_INFO_PATCH: &str = "info_patch";
const FIELD_SUPER_SEQUENCE: &str = "super_sequence";
const FIELD_NEW_BLOCKS: &str = "new_blocks";
const FIELD_NEW_SUPER_BLOCKS: &str = "new_super_blocks";

/// Serialize an ordered frame list into savestream bytes.
pub fn write_savestream(frames: &[Frame]) -> Result<Vec<u8>, WireError> {
    let mut out = Vec::new();
    write_array_len(&mut out, frames.len())?;
    for frame in frames {
        let frame_start = out.len();

        write_map_len(&mut out, 5)?;
        write_str(&mut out, FIELD_HEADER_BLOCK);
        write_bin(&mut out, &frame.header_block)?;

        write_str(&mut out, FIELD_INFO_PATCH);
        write_bin(&mut out, &frame.info_patch)?;

        write_str(&mut out, FIELD_SUPER_SEQUENCE);
        write_array_len(&mut out, frame.super_sequence.len())?;
        for &sid in &frame.super_sequence {
            write_uint(&mut out, u64::from(sid));
        }

        write_str(&mut out, FIELD_NEW_BLOCKS);
        write_map_len(&mut out, frame.new_blocks.len())?;
        for (&bid, body) in &frame.new_blocks {
            write_uint(&mut out, u64::from(bid));
            write_bin(&mut out, body)?;
        }

        write_str(&mut out, FIELD_NEW_SUPER_BLOCKS);
        write_map_len(&mut out, frame.new_super_blocks.len())?;
        for (&sid, sequence) in &frame.new_super_blocks {
            write_uint(&mut out, u64::from(sid));
            write_array_len(&mut out, sequence.len())?;
            for &bid in sequence {
                write_uint(&mut out, u64::from(bid));
            }
        }

        if out.len() - frame_start > u32::MAX as usize {
            return Err(WireError::FrameTooLarge);
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Savestream reading
// ---------------------------------------------------------------------------

/// Deserialize savestream bytes into the ordered frame list.
///
/// Strict: every frame must carry exactly the five required fields, and no
/// bytes may follow the top-level array.
pub fn read_savestream(data: &[u8]) -> Result<Vec<Frame>, WireError> {
    let mut reader = Reader::new(data);
    let frame_count = reader.read_array_len()?;

    let mut frames = Vec::new();
    for _ in 0..frame_count {
        frames.push(read_frame(&mut reader)?);
    }
    if !reader.is_at_end() {
        return Err(WireError::Malformed(
            "trailing bytes after the frame list".into(),
        ));
    }
    Ok(frames)
}

fn read_frame(reader: &mut Reader<'_>) -> Result<Frame, WireError> {
    let field_count = reader.read_map_len()?;

    let mut header_block: Option<[u8; HEADER_LEN]> = None;
    let mut info_patch: Option<Vec<u8>> = None;
    let mut super_sequence: Option<Vec<u32>> = None;
    let mut new_blocks: Option<BTreeMap<u32, Vec<u8>>> = None;
    let mut new_super_blocks: Option<BTreeMap<u32, Vec<u32>>> = None;

    for _ in 0..field_count {
        let field = reader.read_str()?;
        let duplicate = match field {
            FIELD_HEADER_BLOCK => {
                let bin = reader.read_bin()?;
                let block: [u8; HEADER_LEN] = bin.try_into().map_err(|_| {
                    WireError::Malformed(format!(
                        "header_block is {} bytes, expected {HEADER_LEN}",
                        bin.len()
                    ))
                })?;
                header_block.replace(block).is_some()
            }
            FIELD_INFO_PATCH => info_patch.replace(reader.read_bin()?.to_vec()).is_some(),
            FIELD_SUPER_SEQUENCE => {
                let len = reader.read_array_len()?;
                let mut sequence = Vec::with_capacity(len.min(1 << 20));
                for _ in 0..len {
                    sequence.push(reader.read_u32()?);
                }
                super_sequence.replace(sequence).is_some()
            }
            FIELD_NEW_BLOCKS => {
                let len = reader.read_map_len()?;
                let mut blocks = BTreeMap::new();
                for _ in 0..len {
                    let id = reader.read_u32()?;
                    let body = reader.read_bin()?.to_vec();
                    if blocks.insert(id, body).is_some() {
                        return Err(WireError::Malformed(format!(
                            "new_blocks repeats id {id}"
                        )));
                    }
                }
                new_blocks.replace(blocks).is_some()
            }
            FIELD_NEW_SUPER_BLOCKS => {
                let len = reader.read_map_len()?;
                let mut supers = BTreeMap::new();
                for _ in 0..len {
                    let id = reader.read_u32()?;
                    let seq_len = reader.read_array_len()?;
                    let mut sequence = Vec::with_capacity(seq_len.min(1 << 20));
                    for _ in 0..seq_len {
                        sequence.push(reader.read_u32()?);
                    }
                    if supers.insert(id, sequence).is_some() {
                        return Err(WireError::Malformed(format!(
                            "new_super_blocks repeats id {id}"
                        )));
                    }
                }
                new_super_blocks.replace(supers).is_some()
            }
            other => {
                return Err(WireError::Malformed(format!(
                    "unexpected frame field `{other}`"
                )))
            }
        };
        if duplicate {
            return Err(WireError::Malformed(format!(
                "frame repeats field `{field}`"
            )));
        }
    }

    Ok(Frame {
        header_block: header_block.ok_or(WireError::MissingField(FIELD_HEADER_BLOCK))?,
        info_patch: info_patch.ok_or(WireError::MissingField(FIELD_INFO_PATCH))?,
        super_sequence: super_sequence.ok_or(WireError::MissingField(FIELD_SUPER_SEQUENCE))?,
        new_blocks: new_blocks.ok_or(WireError::MissingField(FIELD_NEW_BLOCKS))?,
        new_super_blocks: new_super_blocks.ok_or(WireError::MissingField(FIELD_NEW_SUPER_BLOCKS))?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
