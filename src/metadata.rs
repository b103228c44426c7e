//! Values derived from a decoded header: load offsets relative to the
//! kernel base, OS version, digest type, and the ordered scalar entries
//! handed to a sink.

use serde::Serialize;

use crate::hash::{id_bytes, HashType};
use crate::header::BootHeader;
use crate::os_version::OsInfo;

/// Distance between the load base and the kernel load address.
pub const KERNEL_BASE_OFFSET: u32 = 0x0000_8000;

/// Load addresses expressed as offsets from `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadOffsets {
    pub base:    u32,
    pub kernel:  u32,
    pub ramdisk: u32,
    pub second:  u32,
    pub tags:    u32,
    /// Only for header version 2 and later.
    pub dtb:     Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedMetadata {
    pub header_version:       u32,
    pub cmdline:              String,
    pub board:                Option<String>,
    pub page_size:            Option<u32>,
    pub offsets:              Option<LoadOffsets>,
    pub os:                   Option<OsInfo>,
    pub hash_type:            Option<HashType>,
    /// Raw `id` field as lowercase hex.
    pub id:                   Option<String>,
    /// Set when the version slot carried a legacy device-tree size.
    pub legacy_dt_size:       Option<u32>,
    /// `header_size` field, v1 and later.
    pub header_size:          Option<u32>,
    pub recovery_dtbo_size:   Option<u32>,
    pub recovery_dtbo_offset: Option<u64>,
    pub dtb_size:             Option<u32>,
}

impl DerivedMetadata {
    pub fn from_header(header: &BootHeader) -> Self {
        let legacy = header.legacy();
        let has_recovery = matches!(header, BootHeader::V1(_) | BootHeader::V2(_));

        let offsets = legacy.map(|h| {
            let base = h.kernel_addr.wrapping_sub(KERNEL_BASE_OFFSET);
            LoadOffsets {
                base,
                kernel:  h.kernel_addr.wrapping_sub(base),
                ramdisk: h.ramdisk_addr.wrapping_sub(base),
                second:  h.second_addr.wrapping_sub(base),
                tags:    h.tags_addr.wrapping_sub(base),
                dtb:     (header.header_version() > 1)
                    .then(|| header.dtb_addr().wrapping_sub(base as u64)),
            }
        });

        Self {
            header_version:       header.header_version(),
            cmdline:              header.cmdline(),
            board:                header.board(),
            page_size:            header.page_size(),
            offsets,
            os:                   OsInfo::decode(header.os_version()),
            hash_type:            legacy.map(|h| HashType::detect(&h.id)),
            id:                   legacy.map(|h| hex::encode(id_bytes(&h.id))),
            legacy_dt_size:       legacy.filter(|h| h.has_legacy_dt()).map(|h| h.dt_size),
            header_size:          header.header_size(),
            recovery_dtbo_size:   has_recovery.then(|| header.recovery_dtbo_size()),
            recovery_dtbo_offset: has_recovery.then(|| header.recovery_dtbo_offset()),
            dtb_size:             matches!(header, BootHeader::V2(_)).then(|| header.dtb_size()),
        }
    }

    /// Scalar values in the order they are committed to a sink.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();

        let Some(offsets) = self.offsets else {
            // v3: no addresses, no page size, no digest.
            self.push_os(&mut out);
            out.push(("header_version", self.header_version.to_string()));
            out.push(("cmdline", self.cmdline.clone()));
            return out;
        };

        out.push(("cmdline", self.cmdline.clone()));
        out.push(("board", self.board.clone().unwrap_or_default()));
        out.push(("base", format!("0x{:08x}", offsets.base)));
        out.push(("pagesize", self.page_size.unwrap_or(0).to_string()));
        out.push(("kernel_offset", format!("0x{:08x}", offsets.kernel)));
        out.push(("ramdisk_offset", format!("0x{:08x}", offsets.ramdisk)));
        out.push(("second_offset", format!("0x{:08x}", offsets.second)));
        out.push(("tags_offset", format!("0x{:08x}", offsets.tags)));
        self.push_os(&mut out);
        if self.legacy_dt_size.is_none() {
            out.push(("header_version", self.header_version.to_string()));
            if let Some(dtb) = offsets.dtb {
                out.push(("dtb_offset", format!("0x{dtb:08x}")));
            }
        }
        if let Some(hash) = self.hash_type {
            out.push(("hashtype", hash.name().to_owned()));
        }
        out
    }

    fn push_os(&self, out: &mut Vec<(&'static str, String)>) {
        if let Some(os) = self.os {
            out.push(("os_version", os.version.to_string()));
            out.push(("os_patch_level", os.patch_level.to_string()));
        }
    }
}
