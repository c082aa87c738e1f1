// v86 save-state file format.
//
// A raw save state is laid out as:
//
//   [0..16)   header block; bytes 12..16 hold the info length as LE u32
//   [16..16+L) info block, UTF-8 JSON
//   padding   zero bytes up to the next 4-byte boundary
//   [..end)   buffer block
//
// # Modules
//
// - `framer`  — split/join between raw bytes and (header, info, buffer)
// - `aligner` — region-aligned buffer layout driven by `buffer_infos`

pub mod aligner;
pub mod framer;

pub use aligner::{Region, RegionError, RegionTable};
pub use framer::{join, split, HeaderError, StateParts, HEADER_LEN, INFO_LEN_OFFSET};
