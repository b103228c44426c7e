pub mod error;
pub mod header;
pub mod locator;
pub mod os_version;
pub mod hash;
pub mod layout;
pub mod metadata;
pub mod sink;
pub mod extract;
pub mod unpack;

pub use error::UnpackError;
pub use header::{BootHeader, HeaderV0, HeaderV1, HeaderV2, HeaderV3, BOOT_MAGIC};
pub use layout::{Segment, SegmentKind, SegmentPlan};
pub use metadata::DerivedMetadata;
pub use sink::{DirSink, MemorySink, SegmentSink};
pub use unpack::{commit, inspect, unpack, unpack_file, Inspection, UnpackOptions, UnpackReport};
