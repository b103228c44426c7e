//! Boot image header layouts (versions 0-3) and the version dispatcher.
//!
//! All four layouts are packed little-endian records that begin with the
//! 8-byte `ANDROID!` magic.  The `u32` at byte offset 40 is the only field
//! every layout agrees on, and it decides which record follows:
//!
//! | slot value | layout | notes |
//! |------------|--------|-------|
//! | 3          | v3     | no load addresses, 4096-byte alignment |
//! | 0          | v0     | |
//! | 1          | v1     | adds recovery DTBO and `header_size` |
//! | 2, 4       | v2     | adds DTB size and address |
//! | > 4        | v0     | pre-versioning image: the slot is a `dt_size` |
//!
//! Versions 0-2 share one prefix, so they are read incrementally: the v0
//! body first, then whatever the version appends.  Fields a version does
//! not define are never read, which keeps them zero rather than garbage.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read, Seek};

use crate::error::UnpackError;
use crate::extract::stream_remaining;

pub const BOOT_MAGIC: &[u8; 8] = b"ANDROID!";
pub const BOOT_MAGIC_SIZE: usize = 8;
pub const BOOT_NAME_SIZE: usize = 16;
pub const BOOT_ARGS_SIZE: usize = 512;
pub const BOOT_EXTRA_ARGS_SIZE: usize = 1024;
pub const BOOT_ID_WORDS: usize = 8;

pub const HEADER_V0_SIZE: usize = 1632;
pub const HEADER_V1_SIZE: usize = 1648;
pub const HEADER_V2_SIZE: usize = 1660;
pub const HEADER_V3_SIZE: usize = 1580;

/// Byte offset of the `header_version` slot, identical in every layout.
pub const HEADER_VERSION_OFFSET: usize = 40;
/// Largest slot value still read as a header version; anything above is a
/// legacy device-tree size.
pub const HEADER_VERSION_MAX: u32 = 4;

// ── Layouts ──────────────────────────────────────────────────────────────────

/// Version 0 record.  Also the common prefix of versions 1 and 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderV0 {
    pub kernel_size:    u32,
    pub kernel_addr:    u32,
    pub ramdisk_size:   u32,
    pub ramdisk_addr:   u32,
    pub second_size:    u32,
    pub second_addr:    u32,
    pub tags_addr:      u32,
    pub page_size:      u32,
    /// Zero when the slot carried a legacy `dt_size`.
    pub header_version: u32,
    /// Legacy device-tree size; zero unless the slot exceeded
    /// [`HEADER_VERSION_MAX`].
    pub dt_size:        u32,
    pub os_version:     u32,
    pub name:           [u8; BOOT_NAME_SIZE],
    pub cmdline:        Box<[u8; BOOT_ARGS_SIZE]>,
    /// Timestamp / checksum / digest words.
    pub id:             [u32; BOOT_ID_WORDS],
    pub extra_cmdline:  Box<[u8; BOOT_EXTRA_ARGS_SIZE]>,
}

impl HeaderV0 {
    /// Read the record body that follows the magic.
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let kernel_size  = reader.read_u32::<LittleEndian>()?;
        let kernel_addr  = reader.read_u32::<LittleEndian>()?;
        let ramdisk_size = reader.read_u32::<LittleEndian>()?;
        let ramdisk_addr = reader.read_u32::<LittleEndian>()?;
        let second_size  = reader.read_u32::<LittleEndian>()?;
        let second_addr  = reader.read_u32::<LittleEndian>()?;
        let tags_addr    = reader.read_u32::<LittleEndian>()?;
        let page_size    = reader.read_u32::<LittleEndian>()?;

        let slot = reader.read_u32::<LittleEndian>()?;
        let (header_version, dt_size) = if slot > HEADER_VERSION_MAX {
            (0, slot)
        } else {
            (slot, 0)
        };

        let os_version = reader.read_u32::<LittleEndian>()?;
        let mut name = [0u8; BOOT_NAME_SIZE];
        reader.read_exact(&mut name)?;
        let mut cmdline = Box::new([0u8; BOOT_ARGS_SIZE]);
        reader.read_exact(&mut cmdline[..])?;
        let mut id = [0u32; BOOT_ID_WORDS];
        reader.read_u32_into::<LittleEndian>(&mut id)?;
        let mut extra_cmdline = Box::new([0u8; BOOT_EXTRA_ARGS_SIZE]);
        reader.read_exact(&mut extra_cmdline[..])?;

        Ok(Self {
            kernel_size,
            kernel_addr,
            ramdisk_size,
            ramdisk_addr,
            second_size,
            second_addr,
            tags_addr,
            page_size,
            header_version,
            dt_size,
            os_version,
            name,
            cmdline,
            id,
            extra_cmdline,
        })
    }

    /// `true` when the version slot was reinterpreted as a device-tree size.
    pub fn has_legacy_dt(&self) -> bool {
        self.dt_size > HEADER_VERSION_MAX
    }
}

/// Version 1 record: v0 plus the recovery DTBO/ACPIO overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderV1 {
    pub v0:                   HeaderV0,
    pub recovery_dtbo_size:   u32,
    pub recovery_dtbo_offset: u64,
    pub header_size:          u32,
}

impl HeaderV1 {
    fn read_tail<R: Read>(v0: HeaderV0, mut reader: R) -> io::Result<Self> {
        Ok(Self {
            v0,
            recovery_dtbo_size:   reader.read_u32::<LittleEndian>()?,
            recovery_dtbo_offset: reader.read_u64::<LittleEndian>()?,
            header_size:          reader.read_u32::<LittleEndian>()?,
        })
    }
}

/// Version 2 record: v1 plus the DTB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderV2 {
    pub v1:       HeaderV1,
    pub dtb_size: u32,
    pub dtb_addr: u64,
}

impl HeaderV2 {
    fn read_tail<R: Read>(v1: HeaderV1, mut reader: R) -> io::Result<Self> {
        Ok(Self {
            v1,
            dtb_size: reader.read_u32::<LittleEndian>()?,
            dtb_addr: reader.read_u64::<LittleEndian>()?,
        })
    }
}

/// Version 3 record.  Shares nothing with v0-v2 beyond the magic and the
/// position of `header_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderV3 {
    pub kernel_size:    u32,
    pub ramdisk_size:   u32,
    pub os_version:     u32,
    /// Authoritative size of the header region in bytes.
    pub header_size:    u32,
    pub reserved:       [u32; 4],
    pub header_version: u32,
    pub cmdline:        Box<[u8; BOOT_ARGS_SIZE + BOOT_EXTRA_ARGS_SIZE]>,
}

impl HeaderV3 {
    /// Read the record body that follows the magic.
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let kernel_size  = reader.read_u32::<LittleEndian>()?;
        let ramdisk_size = reader.read_u32::<LittleEndian>()?;
        let os_version   = reader.read_u32::<LittleEndian>()?;
        let header_size  = reader.read_u32::<LittleEndian>()?;
        let mut reserved = [0u32; 4];
        reader.read_u32_into::<LittleEndian>(&mut reserved)?;
        let header_version = reader.read_u32::<LittleEndian>()?;
        let mut cmdline = Box::new([0u8; BOOT_ARGS_SIZE + BOOT_EXTRA_ARGS_SIZE]);
        reader.read_exact(&mut cmdline[..])?;
        Ok(Self {
            kernel_size,
            ramdisk_size,
            os_version,
            header_size,
            reserved,
            header_version,
            cmdline,
        })
    }
}

// ── BootHeader ───────────────────────────────────────────────────────────────

/// A decoded header.  Exactly one layout applies per image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootHeader {
    V0(HeaderV0),
    V1(HeaderV1),
    V2(HeaderV2),
    V3(HeaderV3),
}

/// Number of on-disk bytes the layout selected by `slot` occupies.
pub fn layout_size(slot: u32) -> usize {
    match slot {
        3     => HEADER_V3_SIZE,
        1     => HEADER_V1_SIZE,
        2 | 4 => HEADER_V2_SIZE,
        _     => HEADER_V0_SIZE,
    }
}

impl BootHeader {
    /// Decode the header at the reader's current position, which must be
    /// the magic.  Reads exactly the bytes of the selected layout.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, UnpackError> {
        let start     = reader.stream_position()?;
        let available = stream_remaining(reader)?;

        let prefix_len = HEADER_VERSION_OFFSET + 4;
        if available < prefix_len as u64 {
            return Err(UnpackError::truncated("header", start, prefix_len as u64, available));
        }
        let mut buf = vec![0u8; prefix_len];
        reader.read_exact(&mut buf)?;

        let slot = LittleEndian::read_u32(&buf[HEADER_VERSION_OFFSET..]);
        let size = layout_size(slot);
        if available < size as u64 {
            return Err(UnpackError::truncated("header", start, size as u64, available));
        }
        buf.resize(size, 0);
        reader.read_exact(&mut buf[prefix_len..])?;

        Self::parse(&buf)
    }

    /// Decode a header from an in-memory buffer starting at the magic.
    pub fn parse(bytes: &[u8]) -> Result<Self, UnpackError> {
        let prefix_len = HEADER_VERSION_OFFSET + 4;
        if bytes.len() < prefix_len {
            return Err(UnpackError::truncated("header", 0, prefix_len as u64, bytes.len() as u64));
        }
        if &bytes[..BOOT_MAGIC_SIZE] != BOOT_MAGIC {
            return Err(UnpackError::InvalidMagic);
        }

        let slot = LittleEndian::read_u32(&bytes[HEADER_VERSION_OFFSET..]);
        let size = layout_size(slot);
        if bytes.len() < size {
            return Err(UnpackError::truncated("header", 0, size as u64, bytes.len() as u64));
        }

        let mut cursor = Cursor::new(&bytes[BOOT_MAGIC_SIZE..size]);
        if slot == 3 {
            log::debug!("header version 3, using the v3 layout");
            return Ok(BootHeader::V3(HeaderV3::read(&mut cursor)?));
        }

        let v0 = HeaderV0::read(&mut cursor)?;
        if v0.has_legacy_dt() {
            log::debug!("version slot {} is a legacy dt_size, treating as version 0", v0.dt_size);
        }
        let header = match v0.header_version {
            0 => BootHeader::V0(v0),
            1 => BootHeader::V1(HeaderV1::read_tail(v0, &mut cursor)?),
            _ => {
                let v1 = HeaderV1::read_tail(v0, &mut cursor)?;
                BootHeader::V2(HeaderV2::read_tail(v1, &mut cursor)?)
            }
        };
        log::debug!("header version {}", header.header_version());
        Ok(header)
    }

    /// The v0 prefix shared by versions 0-2; `None` for v3.
    pub fn legacy(&self) -> Option<&HeaderV0> {
        match self {
            BootHeader::V0(h) => Some(h),
            BootHeader::V1(h) => Some(&h.v0),
            BootHeader::V2(h) => Some(&h.v1.v0),
            BootHeader::V3(_) => None,
        }
    }

    fn v1(&self) -> Option<&HeaderV1> {
        match self {
            BootHeader::V1(h) => Some(h),
            BootHeader::V2(h) => Some(&h.v1),
            _ => None,
        }
    }

    pub fn is_v3(&self) -> bool {
        matches!(self, BootHeader::V3(_))
    }

    /// Effective header version (0 for legacy dt_size images).
    pub fn header_version(&self) -> u32 {
        match self {
            BootHeader::V3(h) => h.header_version,
            _ => self.legacy().map_or(0, |h| h.header_version),
        }
    }

    /// On-disk size of the decoded layout.
    pub fn encoded_size(&self) -> usize {
        match self {
            BootHeader::V0(_) => HEADER_V0_SIZE,
            BootHeader::V1(_) => HEADER_V1_SIZE,
            BootHeader::V2(_) => HEADER_V2_SIZE,
            BootHeader::V3(_) => HEADER_V3_SIZE,
        }
    }

    pub fn kernel_size(&self) -> u32 {
        match self {
            BootHeader::V3(h) => h.kernel_size,
            _ => self.legacy().map_or(0, |h| h.kernel_size),
        }
    }

    pub fn ramdisk_size(&self) -> u32 {
        match self {
            BootHeader::V3(h) => h.ramdisk_size,
            _ => self.legacy().map_or(0, |h| h.ramdisk_size),
        }
    }

    pub fn second_size(&self) -> u32 {
        self.legacy().map_or(0, |h| h.second_size)
    }

    /// Page size declared by the header; v3 has none.
    pub fn page_size(&self) -> Option<u32> {
        self.legacy().map(|h| h.page_size)
    }

    pub fn os_version(&self) -> u32 {
        match self {
            BootHeader::V3(h) => h.os_version,
            _ => self.legacy().map_or(0, |h| h.os_version),
        }
    }

    pub fn dt_size(&self) -> u32 {
        self.legacy().map_or(0, |h| h.dt_size)
    }

    pub fn recovery_dtbo_size(&self) -> u32 {
        self.v1().map_or(0, |h| h.recovery_dtbo_size)
    }

    pub fn recovery_dtbo_offset(&self) -> u64 {
        self.v1().map_or(0, |h| h.recovery_dtbo_offset)
    }

    /// `header_size` field for v1 and later.
    pub fn header_size(&self) -> Option<u32> {
        match self {
            BootHeader::V3(h) => Some(h.header_size),
            _ => self.v1().map(|h| h.header_size),
        }
    }

    pub fn dtb_size(&self) -> u32 {
        match self {
            BootHeader::V2(h) => h.dtb_size,
            _ => 0,
        }
    }

    pub fn dtb_addr(&self) -> u64 {
        match self {
            BootHeader::V2(h) => h.dtb_addr,
            _ => 0,
        }
    }

    /// Product name up to the first NUL.
    pub fn board(&self) -> Option<String> {
        self.legacy().map(|h| c_string(&h.name))
    }

    /// Kernel command line: `cmdline` followed by `extra_cmdline` for
    /// v0-v2, the combined buffer for v3.
    pub fn cmdline(&self) -> String {
        match self {
            BootHeader::V3(h) => c_string(&h.cmdline[..]),
            _ => match self.legacy() {
                Some(h) => {
                    let mut s = c_string(&h.cmdline[..]);
                    s.push_str(&c_string(&h.extra_cmdline[..]));
                    s
                }
                None => String::new(),
            },
        }
    }
}

/// Decode a fixed-size, NUL-terminated field.  Unterminated fields use
/// the whole buffer.
pub fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
