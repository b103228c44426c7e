mod common;

use bootunpack::hash::HashType;
use bootunpack::header::BOOT_MAGIC;
use bootunpack::layout::{padded, padding};
use bootunpack::locator::find_magic;
use bootunpack::os_version::{OsInfo, OsVersion, PatchLevel};
use bootunpack::{BootHeader, UnpackError};
use common::LegacyImage;
use proptest::prelude::*;

proptest! {
    #[test]
    fn padded_is_next_page_boundary(len in 0u64..=u32::MAX as u64, shift in 0u32..=16) {
        let page = 1u32 << shift;
        let p = padded(len, page);
        prop_assert!(p >= len);
        prop_assert_eq!(p % page as u64, 0);
        prop_assert!(p - len < page as u64);
        if len % page as u64 == 0 {
            prop_assert_eq!(padding(len, page), 0);
        }
    }

    #[test]
    fn os_version_roundtrip(
        major in 0u8..128, minor in 0u8..128, patch in 0u8..128,
        year in 2000u16..2128, month in 1u8..=12
    ) {
        let info = OsInfo {
            version:     OsVersion { major, minor, patch },
            patch_level: PatchLevel { year, month },
        };
        prop_assert_eq!(OsInfo::decode(info.encode()), Some(info));
    }

    #[test]
    fn os_version_bad_month_is_absent(
        high in any::<u32>(),
        month in proptest::sample::select(vec![0u32, 13, 14, 15])
    ) {
        prop_assert_eq!(OsInfo::decode((high & !0xf) | month), None);
    }

    #[test]
    fn sha1_when_tail_is_zero(head in proptest::array::uniform24(any::<u8>())) {
        let mut id = [0u8; 32];
        id[..24].copy_from_slice(&head);
        prop_assert_eq!(HashType::detect_bytes(&id), HashType::Sha1);
    }

    #[test]
    fn sha256_when_any_tail_byte_set(idx in 24usize..32, byte in 1u8..=255) {
        let mut id = [0u8; 32];
        id[idx] = byte;
        prop_assert_eq!(HashType::detect_bytes(&id), HashType::Sha256);
    }

    #[test]
    fn magic_found_at_its_offset(k in 0usize..=4096, tail in 0usize..64) {
        let mut buf = vec![0u8; k + BOOT_MAGIC.len() + tail];
        buf[k..k + 8].copy_from_slice(BOOT_MAGIC);
        prop_assert_eq!(find_magic(&buf, 4096).unwrap(), k as u64);
    }

    #[test]
    fn magic_beyond_limit_not_found(limit in 0u64..2048, extra in 1usize..64) {
        let k = limit as usize + extra;
        let mut buf = vec![0u8; k + 8];
        buf[k..].copy_from_slice(BOOT_MAGIC);
        let found = matches!(find_magic(&buf, limit), Err(UnpackError::MagicNotFound { .. }));
        prop_assert!(found);
    }

    #[test]
    fn version_three_always_selects_v3(noise in proptest::collection::vec(any::<u8>(), 1580)) {
        let mut bytes = noise;
        bytes[..8].copy_from_slice(BOOT_MAGIC);
        bytes[40..44].copy_from_slice(&3u32.to_le_bytes());
        let header = BootHeader::parse(&bytes).unwrap();
        prop_assert!(header.is_v3());
    }

    #[test]
    fn large_version_is_dt_size(slot in 5u32..) {
        let mut bytes = LegacyImage::default().header_bytes();
        bytes[40..44].copy_from_slice(&slot.to_le_bytes());
        let header = BootHeader::parse(&bytes).unwrap();
        prop_assert!(matches!(header, BootHeader::V0(_)));
        prop_assert_eq!(header.header_version(), 0);
        prop_assert_eq!(header.dt_size(), slot);
    }
}
