//! High-level unpack pipeline — the primary embedding surface.
//!
//! ```no_run
//! use bootunpack::unpack::{unpack_file, UnpackOptions};
//!
//! let report = unpack_file("boot.img", "out", &UnpackOptions::default())?;
//! println!("header version {}", report.inspection.metadata.header_version);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Stages run strictly in order: locate the magic, decode the header,
//! derive metadata and the segment plan, commit metadata, then extract the
//! segments.  A missing magic aborts before anything is committed; a
//! truncated segment aborts after the earlier commits.

use serde::Serialize;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use crate::error::UnpackError;
use crate::extract::{extract_segments, Extracted};
use crate::header::BootHeader;
use crate::layout::{self, SegmentPlan};
use crate::locator::{locate_magic, DEFAULT_SEARCH_LIMIT};
use crate::metadata::DerivedMetadata;
use crate::sink::{DirSink, SegmentSink};

// ── UnpackOptions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackOptions {
    /// Page size override for v0-v2.  `None` or `Some(0)` uses the header's.
    pub page_size:    Option<u32>,
    /// Last offset at which the magic may start.
    pub search_limit: u64,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            page_size:    None,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Everything known about an image before any segment is read.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub magic_offset: u64,
    #[serde(skip)]
    pub header:       BootHeader,
    pub metadata:     DerivedMetadata,
    pub plan:         SegmentPlan,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnpackReport {
    #[serde(flatten)]
    pub inspection: Inspection,
    pub extracted:  Vec<Extracted>,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Locate and decode the header and compute the segment plan.
pub fn inspect<R: Read + Seek>(reader: &mut R, opts: &UnpackOptions) -> Result<Inspection, UnpackError> {
    let magic_offset = locate_magic(reader, opts.search_limit)?;
    let header       = BootHeader::read(reader)?;
    let metadata     = DerivedMetadata::from_header(&header);
    let plan         = layout::plan(&header, opts.page_size, magic_offset)?;
    Ok(Inspection { magic_offset, header, metadata, plan })
}

/// Run the whole pipeline against `sink`.
pub fn unpack<R, S>(reader: &mut R, sink: &mut S, opts: &UnpackOptions) -> Result<UnpackReport, UnpackError>
where
    R: Read + Seek,
    S: SegmentSink + ?Sized,
{
    let inspection = inspect(reader, opts)?;
    let extracted  = commit(reader, &inspection, sink)?;
    Ok(UnpackReport { inspection, extracted })
}

/// Commit the metadata of an inspected image, then its segments.
pub fn commit<R, S>(reader: &mut R, inspection: &Inspection, sink: &mut S) -> Result<Vec<Extracted>, UnpackError>
where
    R: Read + Seek,
    S: SegmentSink + ?Sized,
{
    for (name, value) in inspection.metadata.entries() {
        sink.put_value(name, &value)
            .map_err(|source| UnpackError::InvalidOutputTarget { name: name.to_owned(), source })?;
    }
    extract_segments(reader, &inspection.plan, sink)
}

/// Unpack the image at `path` into `out_dir`, naming outputs
/// `<image file name>-<segment>`.
pub fn unpack_file<P: AsRef<Path>, Q: AsRef<Path>>(
    path:    P,
    out_dir: Q,
    opts:    &UnpackOptions,
) -> Result<UnpackReport, UnpackError> {
    let path = path.as_ref();
    let out_dir = out_dir.as_ref();
    let mut sink = DirSink::for_image(out_dir, path).map_err(|source| UnpackError::InvalidOutputTarget {
        name: out_dir.display().to_string(),
        source,
    })?;
    let mut f = File::open(path)?;
    unpack(&mut f, &mut sink, opts)
}
