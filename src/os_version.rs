//! Packed OS version and security patch level.
//!
//! For version `A.B.C` and patch level `Y-M`:
//!
//! ```text
//!  31      25 24     18 17     11 10       4 3    0
//! +----------+---------+---------+----------+------+
//! |    A     |    B    |    C    | Y - 2000 |  M   |
//! +----------+---------+---------+----------+------+
//! ```
//!
//! A field whose bits do not form a plausible date decodes to "absent"
//! rather than an error.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OsVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatchLevel {
    pub year:  u16,
    pub month: u8,
}

impl fmt::Display for PatchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Decoded `os_version` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OsInfo {
    pub version:     OsVersion,
    pub patch_level: PatchLevel,
}

impl OsInfo {
    /// Decode a packed field.  Zero and implausible values yield `None`.
    pub fn decode(raw: u32) -> Option<Self> {
        if raw == 0 {
            return None;
        }
        let os_ver = raw >> 11;
        let patch  = raw & 0x7ff;

        let major = (os_ver >> 14) & 0x7f;
        let minor = (os_ver >> 7) & 0x7f;
        let micro = os_ver & 0x7f;
        let year  = (patch >> 4) + 2000;
        let month = patch & 0xf;

        let plausible = major < 128
            && minor < 128
            && micro < 128
            && (2000..2128).contains(&year)
            && (1..=12).contains(&month);
        if !plausible {
            log::debug!("os_version {raw:#010x} is not a plausible version/date, ignoring");
            return None;
        }

        Some(Self {
            version: OsVersion {
                major: major as u8,
                minor: minor as u8,
                patch: micro as u8,
            },
            patch_level: PatchLevel {
                year:  year as u16,
                month: month as u8,
            },
        })
    }

    /// Pack into the on-disk representation.  Out-of-range components are
    /// truncated to their bit width.
    pub fn encode(&self) -> u32 {
        let v = &self.version;
        let p = &self.patch_level;
        let os_ver = ((v.major as u32 & 0x7f) << 14)
            | ((v.minor as u32 & 0x7f) << 7)
            | (v.patch as u32 & 0x7f);
        let patch = ((p.year.wrapping_sub(2000) as u32 & 0x7f) << 4) | (p.month as u32 & 0xf);
        (os_ver << 11) | patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(major: u8, minor: u8, patch: u8, year: u16, month: u8) -> OsInfo {
        OsInfo {
            version:     OsVersion { major, minor, patch },
            patch_level: PatchLevel { year, month },
        }
    }

    #[test]
    fn decodes_known_value() {
        let i = info(1, 2, 3, 2023, 6);
        let raw = i.encode();
        assert_eq!(raw, (1 << 25) | (2 << 18) | (3 << 11) | (23 << 4) | 6);
        assert_eq!(OsInfo::decode(raw), Some(i));
    }

    #[test]
    fn zero_is_absent() {
        assert_eq!(OsInfo::decode(0), None);
    }

    #[test]
    fn month_out_of_range_is_absent() {
        assert_eq!(OsInfo::decode(info(10, 0, 0, 2020, 0).encode()), None);
        assert_eq!(OsInfo::decode(info(10, 0, 0, 2020, 13).encode()), None);
    }

    #[test]
    fn display_formats() {
        let i = info(11, 0, 0, 2021, 3);
        assert_eq!(i.version.to_string(), "11.0.0");
        assert_eq!(i.patch_level.to_string(), "2021-03");
    }
}
