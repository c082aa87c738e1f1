// Region-aligned buffer layout.
//
// The info block's `buffer_infos` array describes where each memory region
// lives inside the buffer block. Aligning pads every region out to a block
// boundary and the whole result out to a superblock boundary, so that the
// dedup engine sees each region at a stable block-grid position. Unaligning
// walks the same descriptors in order and copies each region back to its
// original offset, dropping the padding.

use serde_json::Value;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    /// `buffer_infos` is absent but the buffer block is non-empty.
    MissingBufferInfos,
    /// `buffer_infos` is present but not an array.
    NotAnArray,
    /// A descriptor is not an object with integer `offset` and `length`.
    BadDescriptor { index: usize },
    /// A region addresses bytes outside the buffer block.
    OutOfBounds {
        index: usize,
        offset: usize,
        length: usize,
        buffer_len: usize,
    },
    /// The regions do not cover the buffer block exactly.
    NotCovering { buffer_len: usize },
    /// The aligned buffer ends before the last region's padded extent.
    AlignedTooShort { needed: usize, got: usize },
}

impl std::fmt::Display for RegionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingBufferInfos => write!(f, "info block lacks `buffer_infos`"),
            Self::NotAnArray => write!(f, "`buffer_infos` is not an array"),
            Self::BadDescriptor { index } => {
                write!(f, "buffer_infos[{index}] lacks integer `offset`/`length`")
            }
            Self::OutOfBounds {
                index,
                offset,
                length,
                buffer_len,
            } => write!(
                f,
                "buffer_infos[{index}] spans {offset}..{} past the {buffer_len}-byte buffer",
                offset + length
            ),
            Self::NotCovering { buffer_len } => {
                write!(f, "regions do not cover the {buffer_len}-byte buffer exactly")
            }
            Self::AlignedTooShort { needed, got } => {
                write!(f, "aligned buffer is {got} bytes, regions need {needed}")
            }
        }
    }
}

impl std::error::Error for RegionError {}

// ---------------------------------------------------------------------------
// Region table
// ---------------------------------------------------------------------------

/// One `buffer_infos` descriptor: a contiguous subrange of the buffer block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub offset: usize,
    pub length: usize,
}

/// The ordered region descriptors parsed out of an info object.
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    regions: Vec<Region>,
}

impl RegionTable {
    /// Parse `buffer_infos` from a parsed info object.
    ///
    /// A missing key is accepted as an empty table; whether that is legal
    /// is the caller's call (it is, exactly when the buffer is empty).
    /// All other descriptor fields are opaque and ignored here.
    pub fn from_info(info: &Value) -> Result<Self, RegionError> {
        let infos = match info.get("buffer_infos") {
            None => return Ok(Self::default()),
            Some(Value::Array(infos)) => infos,
            Some(_) => return Err(RegionError::NotAnArray),
        };

        let mut regions = Vec::with_capacity(infos.len());
        for (index, descriptor) in infos.iter().enumerate() {
            let offset = descriptor
                .get("offset")
                .and_then(Value::as_u64)
                .and_then(|v| usize::try_from(v).ok());
            let length = descriptor
                .get("length")
                .and_then(Value::as_u64)
                .and_then(|v| usize::try_from(v).ok());
            match (offset, length) {
                (Some(offset), Some(length)) => regions.push(Region { offset, length }),
                _ => return Err(RegionError::BadDescriptor { index }),
            }
        }
        Ok(Self { regions })
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Total aligned length: each region padded to `block_size`, the sum
    /// padded to `super_block_size`.
    pub fn aligned_len(&self, block_size: usize, super_block_size: usize) -> usize {
        let per_region: usize = self
            .regions
            .iter()
            .map(|r| pad_up(r.length, block_size))
            .sum();
        pad_up(per_region, super_block_size)
    }

    /// Check each region against the buffer bounds.
    fn check_bounds(&self, buffer_len: usize) -> Result<(), RegionError> {
        for (index, r) in self.regions.iter().enumerate() {
            let end = r.offset.checked_add(r.length);
            if end.is_none() || end.unwrap_or(usize::MAX) > buffer_len {
                return Err(RegionError::OutOfBounds {
                    index,
                    offset: r.offset,
                    length: r.length,
                    buffer_len,
                });
            }
        }
        Ok(())
    }

    /// Verify the regions cover `[0, buffer_len)` exactly. Overlaps are
    /// fine; a gap or an uncovered tail would not survive the unalign
    /// round trip, so it is rejected up front.
    pub fn check_coverage(&self, buffer_len: usize) -> Result<(), RegionError> {
        self.check_bounds(buffer_len)?;
        let mut spans: Vec<(usize, usize)> = self
            .regions
            .iter()
            .filter(|r| r.length > 0)
            .map(|r| (r.offset, r.offset + r.length))
            .collect();
        spans.sort_unstable();

        let mut covered = 0usize;
        for (start, end) in spans {
            if start > covered {
                return Err(RegionError::NotCovering { buffer_len });
            }
            covered = covered.max(end);
        }
        if covered != buffer_len {
            return Err(RegionError::NotCovering { buffer_len });
        }
        Ok(())
    }

    /// Expand the packed buffer into its aligned form: per-region padding
    /// to `block_size`, then whole-buffer padding to `super_block_size`.
    pub fn align(
        &self,
        buffer: &[u8],
        block_size: usize,
        super_block_size: usize,
    ) -> Result<Vec<u8>, RegionError> {
        self.check_bounds(buffer.len())?;

        let mut aligned = Vec::with_capacity(self.aligned_len(block_size, super_block_size));
        for r in &self.regions {
            aligned.extend_from_slice(&buffer[r.offset..r.offset + r.length]);
            aligned.resize(pad_up(aligned.len(), block_size), 0);
        }
        aligned.resize(pad_up(aligned.len(), super_block_size), 0);
        Ok(aligned)
    }

    /// Contract an aligned buffer back into its packed form.
    ///
    /// Walks the regions in order, copying `length` bytes from the aligned
    /// cursor to position `offset` of the output, then advancing the
    /// cursor over the region's block padding. The trailing superblock
    /// padding is never read.
    pub fn unalign(&self, aligned: &[u8], block_size: usize) -> Result<Vec<u8>, RegionError> {
        let packed_len = self
            .regions
            .iter()
            .map(|r| r.offset + r.length)
            .max()
            .unwrap_or(0);
        let mut buffer = vec![0u8; packed_len];

        let mut cursor = 0usize;
        for r in &self.regions {
            let end = cursor + r.length;
            if end > aligned.len() {
                return Err(RegionError::AlignedTooShort {
                    needed: end,
                    got: aligned.len(),
                });
            }
            buffer[r.offset..r.offset + r.length].copy_from_slice(&aligned[cursor..end]);
            cursor += pad_up(r.length, block_size);
        }
        Ok(buffer)
    }
}

fn pad_up(len: usize, multiple: usize) -> usize {
    len.div_ceil(multiple) * multiple
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BLOCK: usize = 256;
    const SUPER: usize = 65_536;

    fn table(infos: Value) -> RegionTable {
        RegionTable::from_info(&json!({ "buffer_infos": infos })).unwrap()
    }

    #[test]
    fn missing_buffer_infos_is_empty_table() {
        let t = RegionTable::from_info(&json!({})).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn non_array_buffer_infos_is_rejected() {
        let err = RegionTable::from_info(&json!({ "buffer_infos": 7 })).unwrap_err();
        assert_eq!(err, RegionError::NotAnArray);
    }

    #[test]
    fn bad_descriptor_is_rejected() {
        let err = RegionTable::from_info(&json!({ "buffer_infos": [{ "offset": 0 }] }))
            .unwrap_err();
        assert_eq!(err, RegionError::BadDescriptor { index: 0 });
        let err =
            RegionTable::from_info(&json!({ "buffer_infos": [{ "offset": -1, "length": 4 }] }))
                .unwrap_err();
        assert_eq!(err, RegionError::BadDescriptor { index: 0 });
    }

    #[test]
    fn extra_descriptor_fields_are_ignored() {
        let t = table(json!([{ "offset": 0, "length": 4, "name": "ram" }]));
        assert_eq!(t.regions(), &[Region { offset: 0, length: 4 }]);
    }

    #[test]
    fn align_pads_each_region_and_the_total() {
        let t = table(json!([
            { "offset": 0, "length": 300 },
        ]));
        let buffer = vec![0xAB; 300];
        let aligned = t.align(&buffer, BLOCK, SUPER).unwrap();
        assert_eq!(aligned.len(), SUPER);
        assert!(aligned[..300].iter().all(|&b| b == 0xAB));
        assert!(aligned[300..].iter().all(|&b| b == 0));
    }

    #[test]
    fn align_rejects_out_of_bounds_region() {
        let t = table(json!([{ "offset": 8, "length": 16 }]));
        let err = t.align(&[0u8; 10], BLOCK, SUPER).unwrap_err();
        assert!(matches!(err, RegionError::OutOfBounds { index: 0, .. }));
    }

    #[test]
    fn unalign_inverts_align() {
        let t = table(json!([
            { "offset": 0, "length": 100 },
            { "offset": 100, "length": 700 },
            { "offset": 800, "length": 1 },
        ]));
        let buffer: Vec<u8> = (0..801).map(|i| (i % 251) as u8).collect();
        let aligned = t.align(&buffer, BLOCK, SUPER).unwrap();
        assert_eq!(aligned.len() % SUPER, 0);
        let unaligned = t.unalign(&aligned, BLOCK).unwrap();
        assert_eq!(unaligned, buffer);
    }

    #[test]
    fn align_after_unalign_is_identity() {
        let t = table(json!([
            { "offset": 0, "length": 256 },
            { "offset": 256, "length": 13 },
        ]));
        let buffer: Vec<u8> = (0..269).map(|i| (i * 7 % 256) as u8).collect();
        let aligned = t.align(&buffer, BLOCK, SUPER).unwrap();
        let again = t
            .align(&t.unalign(&aligned, BLOCK).unwrap(), BLOCK, SUPER)
            .unwrap();
        assert_eq!(again, aligned);
    }

    #[test]
    fn unalign_places_regions_by_offset_not_order() {
        // Descriptor order differs from offset order.
        let t = table(json!([
            { "offset": 4, "length": 4 },
            { "offset": 0, "length": 4 },
        ]));
        let aligned = {
            let mut a = Vec::new();
            a.extend_from_slice(b"HIGH");
            a.resize(BLOCK, 0);
            a.extend_from_slice(b"LOW!");
            a.resize(2 * BLOCK, 0);
            a.resize(SUPER, 0);
            a
        };
        let buffer = t.unalign(&aligned, BLOCK).unwrap();
        assert_eq!(&buffer, b"LOW!HIGH");
    }

    #[test]
    fn unalign_rejects_short_aligned_buffer() {
        let t = table(json!([{ "offset": 0, "length": 600 }]));
        let err = t.unalign(&[0u8; 512], BLOCK).unwrap_err();
        assert_eq!(
            err,
            RegionError::AlignedTooShort {
                needed: 600,
                got: 512
            }
        );
    }

    #[test]
    fn coverage_accepts_exact_and_overlapping() {
        let t = table(json!([
            { "offset": 0, "length": 10 },
            { "offset": 10, "length": 6 },
        ]));
        t.check_coverage(16).unwrap();

        let t = table(json!([
            { "offset": 0, "length": 12 },
            { "offset": 8, "length": 8 },
        ]));
        t.check_coverage(16).unwrap();
    }

    #[test]
    fn coverage_rejects_gap_and_tail() {
        let t = table(json!([
            { "offset": 0, "length": 4 },
            { "offset": 8, "length": 8 },
        ]));
        assert_eq!(
            t.check_coverage(16),
            Err(RegionError::NotCovering { buffer_len: 16 })
        );

        let t = table(json!([{ "offset": 0, "length": 12 }]));
        assert_eq!(
            t.check_coverage(16),
            Err(RegionError::NotCovering { buffer_len: 16 })
        );
    }

    #[test]
    fn empty_table_covers_empty_buffer_only() {
        let t = RegionTable::default();
        t.check_coverage(0).unwrap();
        assert!(t.check_coverage(1).is_err());
        assert_eq!(t.align(&[], BLOCK, SUPER).unwrap(), Vec::<u8>::new());
        assert_eq!(t.unalign(&[], BLOCK).unwrap(), Vec::<u8>::new());
    }
}
