//! Magic locator: find where the boot header starts in an arbitrary stream.
//!
//! Images are often wrapped (signature blocks, vendor preambles), so the
//! header is searched for rather than assumed at offset 0.  The scan moves
//! one byte at a time from the start of the stream and stops at the first
//! exact `ANDROID!` match starting at or before `limit`.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::UnpackError;
use crate::header::{BOOT_MAGIC, BOOT_MAGIC_SIZE};

/// Default search window in bytes.
pub const DEFAULT_SEARCH_LIMIT: u64 = 65536;

/// Scan `reader` for the boot magic and leave it positioned on the match.
///
/// Returns the absolute offset of the first match.  Candidate start
/// offsets `0..=limit` are examined.
pub fn locate_magic<R: Read + Seek>(reader: &mut R, limit: u64) -> Result<u64, UnpackError> {
    reader.seek(SeekFrom::Start(0))?;

    // One read covers every candidate; a match may straddle `limit`.
    let window = limit.saturating_add(BOOT_MAGIC_SIZE as u64);
    let mut buf = Vec::new();
    reader.by_ref().take(window).read_to_end(&mut buf)?;

    let found = buf
        .windows(BOOT_MAGIC_SIZE)
        .position(|w| w == BOOT_MAGIC)
        .map(|p| p as u64)
        .filter(|&p| p <= limit);

    match found {
        Some(offset) => {
            reader.seek(SeekFrom::Start(offset))?;
            Ok(offset)
        }
        None => Err(UnpackError::MagicNotFound { limit }),
    }
}

/// Convenience for in-memory images.
pub fn find_magic(bytes: &[u8], limit: u64) -> Result<u64, UnpackError> {
    locate_magic(&mut io::Cursor::new(bytes), limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_magic_at(k: usize, total: usize) -> Vec<u8> {
        let mut b = vec![0xA5u8; total];
        b[k..k + BOOT_MAGIC_SIZE].copy_from_slice(BOOT_MAGIC);
        b
    }

    #[test]
    fn finds_magic_at_start() {
        assert_eq!(find_magic(&with_magic_at(0, 64), 16).unwrap(), 0);
    }

    #[test]
    fn finds_magic_at_limit() {
        assert_eq!(find_magic(&with_magic_at(16, 64), 16).unwrap(), 16);
    }

    #[test]
    fn magic_past_limit_is_not_found() {
        let err = find_magic(&with_magic_at(17, 64), 16).unwrap_err();
        assert!(matches!(err, UnpackError::MagicNotFound { limit: 16 }));
    }

    #[test]
    fn short_stream_is_not_found() {
        assert!(matches!(
            find_magic(b"ANDROID", 65536),
            Err(UnpackError::MagicNotFound { .. })
        ));
    }

    #[test]
    fn reader_left_on_magic() {
        let bytes = with_magic_at(5, 64);
        let mut cur = io::Cursor::new(&bytes[..]);
        locate_magic(&mut cur, 100).unwrap();
        assert_eq!(cur.position(), 5);
    }

    #[test]
    fn first_match_wins() {
        let mut bytes = with_magic_at(3, 64);
        bytes[30..38].copy_from_slice(BOOT_MAGIC);
        assert_eq!(find_magic(&bytes, 64).unwrap(), 3);
    }
}
