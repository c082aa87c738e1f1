// Save-state framing: split a raw state into (header, info, buffer) and
// join the three segments back into raw bytes.
//
// The header's embedded length field is never rewritten by `join`; the
// caller guarantees it already matches the info block it passes in.

// ---------------------------------------------------------------------------
// Format constants
// ---------------------------------------------------------------------------

/// Fixed header length in bytes.
pub const HEADER_LEN: usize = 16;

/// Offset of the LE u32 info-length field inside the header.
pub const INFO_LEN_OFFSET: usize = 12;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// Input shorter than the fixed 16-byte header.
    Truncated { len: usize },
    /// The embedded info length runs past end of input.
    InfoOverrun { info_len: u32, total: usize },
    /// `join` was handed a header that is not exactly 16 bytes.
    BadHeaderLen { len: usize },
}

impl std::fmt::Display for HeaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated { len } => {
                write!(f, "save state is {len} bytes, shorter than the {HEADER_LEN}-byte header")
            }
            Self::InfoOverrun { info_len, total } => {
                write!(f, "info block of {info_len} bytes runs past end of {total}-byte state")
            }
            Self::BadHeaderLen { len } => {
                write!(f, "header block is {len} bytes, expected {HEADER_LEN}")
            }
        }
    }
}

impl std::error::Error for HeaderError {}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

/// Borrowed view of the three segments of a raw save state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateParts<'a> {
    pub header: &'a [u8; HEADER_LEN],
    pub info: &'a [u8],
    pub buffer: &'a [u8],
}

/// Split a raw save state into its header, info, and buffer blocks.
///
/// The buffer block starts at `16 + info_len` rounded up to the next
/// 4-byte boundary. A state that ends right after the info block (the
/// padding itself is absent) yields an empty buffer.
pub fn split(raw: &[u8]) -> Result<StateParts<'_>, HeaderError> {
    if raw.len() < HEADER_LEN {
        return Err(HeaderError::Truncated { len: raw.len() });
    }
    let header: &[u8; HEADER_LEN] = raw[..HEADER_LEN]
        .try_into()
        .map_err(|_| HeaderError::Truncated { len: raw.len() })?;

    let info_len = u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]);
    let info_end = HEADER_LEN as u64 + u64::from(info_len);
    if info_end > raw.len() as u64 {
        return Err(HeaderError::InfoOverrun {
            info_len,
            total: raw.len(),
        });
    }
    let info_end = info_end as usize;
    let info = &raw[HEADER_LEN..info_end];

    // Round up to the 4-byte boundary; clamp when only the padding is missing.
    let buffer_start = (info_end + 3) & !3;
    let buffer = if buffer_start >= raw.len() {
        &[]
    } else {
        &raw[buffer_start..]
    };

    Ok(StateParts {
        header,
        info,
        buffer,
    })
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Join header, info, and buffer blocks back into a raw save state.
///
/// Emits `header || info || pad || buffer` where `pad` is the zero fill to
/// the next 4-byte boundary. The padding is only emitted when a buffer
/// block follows it; a state with an empty buffer ends at the info block.
pub fn join(header: &[u8], info: &[u8], buffer: &[u8]) -> Result<Vec<u8>, HeaderError> {
    if header.len() != HEADER_LEN {
        return Err(HeaderError::BadHeaderLen { len: header.len() });
    }

    let info_end = HEADER_LEN + info.len();
    let pad = if buffer.is_empty() {
        0
    } else {
        (4 - (info_end % 4)) % 4
    };

    let mut out = Vec::with_capacity(info_end + pad + buffer.len());
    out.extend_from_slice(header);
    out.extend_from_slice(info);
    out.resize(info_end + pad, 0);
    out.extend_from_slice(buffer);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_state(header_tail: &[u8; 12], info: &[u8], buffer: &[u8]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(header_tail);
        raw.extend_from_slice(&(info.len() as u32).to_le_bytes());
        raw.extend_from_slice(info);
        if !buffer.is_empty() {
            while raw.len() % 4 != 0 {
                raw.push(0);
            }
            raw.extend_from_slice(buffer);
        }
        raw
    }

    #[test]
    fn split_basic() {
        let raw = make_state(&[7u8; 12], b"{\"a\":1}", b"payload");
        let parts = split(&raw).unwrap();
        assert_eq!(&parts.header[..12], &[7u8; 12]);
        assert_eq!(parts.info, b"{\"a\":1}");
        assert_eq!(parts.buffer, b"payload");
    }

    #[test]
    fn split_rejects_short_input() {
        assert_eq!(split(&[0u8; 15]), Err(HeaderError::Truncated { len: 15 }));
        assert_eq!(split(b""), Err(HeaderError::Truncated { len: 0 }));
    }

    #[test]
    fn split_rejects_info_overrun() {
        let mut raw = vec![0u8; 12];
        raw.extend_from_slice(&100u32.to_le_bytes());
        raw.extend_from_slice(b"{}");
        assert_eq!(
            split(&raw),
            Err(HeaderError::InfoOverrun {
                info_len: 100,
                total: 18
            })
        );
    }

    #[test]
    fn split_huge_info_len_does_not_overflow() {
        let mut raw = vec![0u8; 12];
        raw.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(split(&raw), Err(HeaderError::InfoOverrun { .. })));
    }

    #[test]
    fn split_tolerates_missing_trailing_pad() {
        // 18-byte minimal state: the 4-byte boundary lies past end of input.
        let raw = make_state(&[0u8; 12], b"{}", b"");
        assert_eq!(raw.len(), 18);
        let parts = split(&raw).unwrap();
        assert_eq!(parts.info, b"{}");
        assert!(parts.buffer.is_empty());
    }

    #[test]
    fn join_is_inverse_of_split() {
        for info in [&b"{}"[..], b"{\"buffer_infos\":[]}", b"{\"k\":[1,2,3]}"] {
            for buffer in [&b""[..], b"x", b"0123456789abcdef"] {
                let raw = make_state(&[3u8; 12], info, buffer);
                let parts = split(&raw).unwrap();
                let rejoined = join(parts.header, parts.info, parts.buffer).unwrap();
                assert_eq!(rejoined, raw, "info={info:?} buffer={buffer:?}");
            }
        }
    }

    #[test]
    fn join_skips_padding_for_empty_buffer() {
        let header = [0u8; 16];
        let out = join(&header, b"{}", b"").unwrap();
        assert_eq!(out.len(), 18);
    }

    #[test]
    fn join_pads_before_nonempty_buffer() {
        let mut header = [0u8; 16];
        header[12..16].copy_from_slice(&2u32.to_le_bytes());
        let out = join(&header, b"{}", b"ab").unwrap();
        assert_eq!(&out[16..18], b"{}");
        assert_eq!(&out[18..20], &[0, 0]);
        assert_eq!(&out[20..], b"ab");
    }

    #[test]
    fn join_rejects_bad_header_len() {
        assert_eq!(
            join(&[0u8; 15], b"{}", b""),
            Err(HeaderError::BadHeaderLen { len: 15 })
        );
    }
}
