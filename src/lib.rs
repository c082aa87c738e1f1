//! Savestream: lossless compression of v86 save-state sequences.
//!
//! The crate provides:
//! - Save-state framing and region-aligned buffer layout (`state`)
//! - A two-level block/superblock deduplication engine (`dedup`)
//! - A structural JSON diff/patch for save-state metadata (`jsondiff`)
//! - The savestream container format and codec operations (`container`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use savestream::container::{decode, encode};
//!
//! // A minimal save state: 16-byte header (info length in bytes 12..16),
//! // compact JSON info block, no buffer.
//! let mut state = vec![0u8; 12];
//! state.extend_from_slice(&2u32.to_le_bytes());
//! state.extend_from_slice(b"{}");
//!
//! let stream = encode(&[&state]).unwrap();
//! let decoded: Vec<_> = decode(&stream).unwrap().collect::<Result<_, _>>().unwrap();
//! assert_eq!(decoded, vec![state]);
//! ```

pub mod container;
pub mod dedup;
pub mod io;
pub mod jsondiff;
pub mod state;

#[cfg(feature = "cli")]
pub mod cli;
