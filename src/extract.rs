//! Segment extractor.
//!
//! Walks a [`SegmentPlan`] in order.  For every segment except the header
//! it reads exactly the declared length, commits the bytes to the sink, and
//! skips the padding without looking at it.  A segment that runs past the
//! end of the stream stops extraction with [`UnpackError::TruncatedInput`];
//! whatever was committed before stays committed.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::UnpackError;
use crate::layout::{SegmentKind, SegmentPlan};
use crate::sink::SegmentSink;

/// Bytes between the current position and the end of the stream.  The
/// position is left unchanged.
pub fn stream_remaining<R: Seek>(reader: &mut R) -> io::Result<u64> {
    let pos = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(pos))?;
    Ok(end.saturating_sub(pos))
}

/// One committed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Extracted {
    pub kind:   SegmentKind,
    pub offset: u64,
    pub length: u64,
}

/// Extract every non-header segment of `plan` from `reader` into `sink`.
pub fn extract_segments<R, S>(
    reader: &mut R,
    plan:   &SegmentPlan,
    sink:   &mut S,
) -> Result<Vec<Extracted>, UnpackError>
where
    R: Read + Seek,
    S: SegmentSink + ?Sized,
{
    let mut done = Vec::new();
    let mut body = plan.iter().filter(|s| s.kind != SegmentKind::Header).peekable();

    // The decoder stops at the end of its record, not of the header region.
    if let Some(first) = body.peek() {
        reader.seek(SeekFrom::Start(first.offset))?;
    }

    for seg in body {
        let name = seg.kind.name();
        let available = stream_remaining(reader)?;
        if available < seg.length {
            return Err(UnpackError::truncated(name, seg.offset, seg.length, available));
        }

        let mut data = vec![0u8; seg.length as usize];
        reader.read_exact(&mut data)?;
        sink.put_bytes(name, &data)
            .map_err(|source| UnpackError::InvalidOutputTarget { name: name.to_owned(), source })?;
        log::info!("extracted {name}: {} bytes at offset {}", seg.length, seg.offset);

        // The last segment's padding may be cut off.
        let skip = seg.padding().min(available - seg.length);
        reader.seek(SeekFrom::Current(skip as i64))?;

        done.push(Extracted {
            kind:   seg.kind,
            offset: seg.offset,
            length: seg.length,
        });
    }
    Ok(done)
}
