// Two-level content-addressed deduplication.
//
// Aligned buffers are carved into 256-byte blocks; runs of 256 blocks form
// a superblock. Each distinct block body and each distinct superblock
// block-id sequence gets a small integer ID, assigned first-seen within a
// single encode session. ID 0 is reserved in both tables for the all-zero
// entry, so zero-filled memory compresses to bare references without ever
// touching the per-frame delta tables.
//
// # Modules
//
// - `encoder` — the growing encode-session index (`DedupIndex::ingest`)
// - `decoder` — the replayed decode-session store (`BlockStore`)

pub mod decoder;
pub mod encoder;

pub use decoder::BlockStore;
pub use encoder::{DedupIndex, IngestDelta};

// ---------------------------------------------------------------------------
// Format constants
// ---------------------------------------------------------------------------

/// Dedup block size in bytes. A format constant; never vary it.
pub const BLOCK_SIZE: usize = 256;

/// Superblock size in bytes. A format constant; never vary it.
pub const SUPER_BLOCK_SIZE: usize = 65_536;

/// Number of block IDs per superblock sequence.
pub const BLOCKS_PER_SUPER: usize = SUPER_BLOCK_SIZE / BLOCK_SIZE;

/// Advisory ceiling on either ID table.
pub const MAX_TABLE_ENTRIES: u32 = 1 << 31;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Which ID namespace an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSpace {
    Block,
    Super,
}

impl std::fmt::Display for IdSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Super => write!(f, "superblock"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupError {
    /// A reference to an ID that no frame has introduced.
    Unknown { space: IdSpace, id: u32 },
    /// A delta redefines an existing ID with different content.
    Duplicate { space: IdSpace, id: u32 },
    /// A delta block body is not exactly `BLOCK_SIZE` bytes.
    BadBlockLen { id: u32, len: usize },
    /// A delta superblock sequence is not exactly `BLOCKS_PER_SUPER` IDs.
    BadSuperLen { id: u32, len: usize },
    /// An ID table grew past `MAX_TABLE_ENTRIES`.
    TableFull { space: IdSpace },
}

impl std::fmt::Display for DedupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown { space, id } => write!(f, "unknown {space} id {id}"),
            Self::Duplicate { space, id } => {
                write!(f, "{space} id {id} redefined with different content")
            }
            Self::BadBlockLen { id, len } => {
                write!(f, "block id {id} carries {len} bytes, expected {BLOCK_SIZE}")
            }
            Self::BadSuperLen { id, len } => write!(
                f,
                "superblock id {id} carries {len} block ids, expected {BLOCKS_PER_SUPER}"
            ),
            Self::TableFull { space } => write!(f, "{space} table exceeded {MAX_TABLE_ENTRIES} entries"),
        }
    }
}

impl std::error::Error for DedupError {}
