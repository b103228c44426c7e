//! Segment layout planner.
//!
//! Every segment of a boot image starts on a page boundary.  Given a decoded
//! header, [`plan`] lays the segments out in file order:
//!
//! ```text
//! v0-v2:  header | kernel | ramdisk | [second] | [dt]  or  [recovery_dtbo] [dtb]
//! v3:     header | kernel | ramdisk
//! ```
//!
//! The legacy `dt` blob and the recovery DTBO/DTB pair are mutually
//! exclusive; which one applies is decided by the header decoder.  v3 pads
//! to [`V3_PAGE_SIZE`] regardless of any page size override.
//!
//! The planner only does arithmetic.  Checking the plan against the real
//! stream length is left to the extractor, which is the only stage that
//! reads segment data.

use serde::Serialize;

use crate::error::UnpackError;
use crate::header::BootHeader;

/// Fixed alignment of v3 images.
pub const V3_PAGE_SIZE: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Header,
    Kernel,
    Ramdisk,
    Second,
    Dt,
    RecoveryDtbo,
    Dtb,
}

impl SegmentKind {
    /// Name under which the segment is handed to a sink.
    pub fn name(self) -> &'static str {
        match self {
            SegmentKind::Header       => "header",
            SegmentKind::Kernel       => "zImage",
            SegmentKind::Ramdisk      => "ramdisk.gz",
            SegmentKind::Second       => "second",
            SegmentKind::Dt           => "dt",
            SegmentKind::RecoveryDtbo => "recovery_dtbo",
            SegmentKind::Dtb          => "dtb",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub kind:          SegmentKind,
    /// Absolute offset in the source stream.
    pub offset:        u64,
    pub length:        u64,
    /// `length` rounded up to the plan's page size.
    pub padded_length: u64,
}

impl Segment {
    pub fn padding(&self) -> u64 {
        self.padded_length - self.length
    }

    pub fn end(&self) -> u64 {
        self.offset + self.padded_length
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentPlan {
    pub page_size: u32,
    /// Offset of the magic in the source stream.
    pub origin:    u64,
    pub segments:  Vec<Segment>,
}

impl SegmentPlan {
    pub fn get(&self, kind: SegmentKind) -> Option<&Segment> {
        self.segments.iter().find(|s| s.kind == kind)
    }

    /// First byte past the last segment's padding.
    pub fn end(&self) -> u64 {
        self.segments.last().map_or(self.origin, Segment::end)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }
}

/// Round `len` up to the next multiple of `page_size` (a power of two).
#[inline]
pub fn padded(len: u64, page_size: u32) -> u64 {
    len + padding(len, page_size)
}

/// Bytes needed after `len` to reach the next page boundary.  A page size
/// of 0 means no padding.
#[inline]
pub fn padding(len: u64, page_size: u32) -> u64 {
    let Some(mask) = (page_size as u64).checked_sub(1) else {
        return 0;
    };
    (page_size as u64 - (len & mask)) & mask
}

/// Resolve the page size used for padding: a non-zero override wins over
/// the header's own value.
pub fn effective_page_size(header: &BootHeader, page_size: Option<u32>) -> Result<u32, UnpackError> {
    if header.is_v3() {
        return Ok(V3_PAGE_SIZE);
    }
    let page = match page_size {
        Some(p) if p != 0 => p,
        _ => header.page_size().unwrap_or(0),
    };
    if !page.is_power_of_two() {
        return Err(UnpackError::InvalidPageSize(page));
    }
    Ok(page)
}

/// Compute the ordered segment list for `header`, whose magic sits at
/// `origin` in the source stream.
pub fn plan(header: &BootHeader, page_size: Option<u32>, origin: u64) -> Result<SegmentPlan, UnpackError> {
    let page = effective_page_size(header, page_size)?;

    let header_len = match header {
        BootHeader::V3(h) => h.header_size as u64,
        _ => header.encoded_size() as u64,
    };

    let mut sizes = vec![
        (SegmentKind::Header, header_len),
        (SegmentKind::Kernel, header.kernel_size() as u64),
        (SegmentKind::Ramdisk, header.ramdisk_size() as u64),
    ];
    if !header.is_v3() {
        let optional = if header.legacy().is_some_and(|h| h.has_legacy_dt()) {
            vec![
                (SegmentKind::Second, header.second_size()),
                (SegmentKind::Dt, header.dt_size()),
            ]
        } else {
            vec![
                (SegmentKind::Second, header.second_size()),
                (SegmentKind::RecoveryDtbo, header.recovery_dtbo_size()),
                (SegmentKind::Dtb, header.dtb_size()),
            ]
        };
        sizes.extend(
            optional
                .into_iter()
                .filter(|&(_, len)| len > 0)
                .map(|(kind, len)| (kind, len as u64)),
        );
    }

    let mut offset = origin;
    let segments = sizes
        .into_iter()
        .map(|(kind, length)| {
            let seg = Segment {
                kind,
                offset,
                length,
                padded_length: padded(length, page),
            };
            offset = seg.end();
            seg
        })
        .collect();

    Ok(SegmentPlan {
        page_size: page,
        origin,
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_examples() {
        assert_eq!(padded(0, 2048), 0);
        assert_eq!(padded(1, 2048), 2048);
        assert_eq!(padded(2048, 2048), 2048);
        assert_eq!(padded(2049, 2048), 4096);
        assert_eq!(padding(100, 2048), 1948);
        assert_eq!(padding(4096, 2048), 0);
    }

    #[test]
    fn zero_page_size_adds_no_padding() {
        assert_eq!(padding(100, 0), 0);
        assert_eq!(padded(100, 0), 100);
        assert_eq!(padded(0, 0), 0);
    }

    #[test]
    fn segment_padding_and_end() {
        let seg = Segment {
            kind:          SegmentKind::Ramdisk,
            offset:        6144,
            length:        100,
            padded_length: padded(100, 2048),
        };
        assert_eq!(seg.padding(), 1948);
        assert_eq!(seg.end(), 8192);
        assert_eq!(seg.kind.name(), "ramdisk.gz");
    }
}
