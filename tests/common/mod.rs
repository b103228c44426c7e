#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

use bootunpack::header::{BOOT_ARGS_SIZE, BOOT_EXTRA_ARGS_SIZE, BOOT_MAGIC, BOOT_NAME_SIZE};

/// Byte used for page padding, so tests notice if padding leaks into a segment.
pub const PAD: u8 = 0xEE;

pub fn pad_to(buf: &mut Vec<u8>, start: usize, page: usize) {
    let len = buf.len() - start;
    let rem = len % page;
    if rem != 0 {
        buf.resize(buf.len() + page - rem, PAD);
    }
}

fn fixed(s: &[u8], n: usize) -> Vec<u8> {
    let mut v = s.to_vec();
    v.resize(n, 0);
    v
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// Builder for v0-v2 images (and legacy dt_size images).
#[derive(Clone)]
pub struct LegacyImage {
    pub prefix:               Vec<u8>,
    /// Header version slot.  Ignored when `dt` is non-empty: the slot then
    /// carries `dt.len()`.
    pub version:              u32,
    pub page_size:            u32,
    pub kernel_addr:          u32,
    pub ramdisk_addr:         u32,
    pub second_addr:          u32,
    pub tags_addr:            u32,
    pub os_version:           u32,
    pub name:                 Vec<u8>,
    pub cmdline:              Vec<u8>,
    pub extra_cmdline:        Vec<u8>,
    pub id:                   [u8; 32],
    pub recovery_dtbo_offset: u64,
    pub header_size:          u32,
    pub dtb_addr:             u64,
    pub kernel:               Vec<u8>,
    pub ramdisk:              Vec<u8>,
    pub second:               Vec<u8>,
    pub dt:                   Vec<u8>,
    pub recovery_dtbo:        Vec<u8>,
    pub dtb:                  Vec<u8>,
}

impl Default for LegacyImage {
    fn default() -> Self {
        Self {
            prefix:               Vec::new(),
            version:              0,
            page_size:            2048,
            kernel_addr:          0x1000_8000,
            ramdisk_addr:         0x1100_0000,
            second_addr:          0x10f0_0000,
            tags_addr:            0x1000_0100,
            os_version:           0,
            name:                 b"testboard".to_vec(),
            cmdline:              b"console=ttyMSM0".to_vec(),
            extra_cmdline:        Vec::new(),
            id:                   [0u8; 32],
            recovery_dtbo_offset: 0,
            header_size:          0,
            dtb_addr:             0,
            kernel:               pattern(4096, 1),
            ramdisk:              pattern(100, 2),
            second:               Vec::new(),
            dt:                   Vec::new(),
            recovery_dtbo:        Vec::new(),
            dtb:                  Vec::new(),
        }
    }
}

impl LegacyImage {
    pub fn slot(&self) -> u32 {
        if self.dt.is_empty() { self.version } else { self.dt.len() as u32 }
    }

    pub fn header_bytes(&self) -> Vec<u8> {
        let mut b = Vec::new();
        b.write_all(BOOT_MAGIC).unwrap();
        for v in [
            self.kernel.len() as u32,
            self.kernel_addr,
            self.ramdisk.len() as u32,
            self.ramdisk_addr,
            self.second.len() as u32,
            self.second_addr,
            self.tags_addr,
            self.page_size,
            self.slot(),
            self.os_version,
        ] {
            b.write_u32::<LittleEndian>(v).unwrap();
        }
        b.write_all(&fixed(&self.name, BOOT_NAME_SIZE)).unwrap();
        b.write_all(&fixed(&self.cmdline, BOOT_ARGS_SIZE)).unwrap();
        b.write_all(&self.id).unwrap();
        b.write_all(&fixed(&self.extra_cmdline, BOOT_EXTRA_ARGS_SIZE)).unwrap();

        let slot = self.slot();
        if matches!(slot, 1 | 2 | 4) {
            b.write_u32::<LittleEndian>(self.recovery_dtbo.len() as u32).unwrap();
            b.write_u64::<LittleEndian>(self.recovery_dtbo_offset).unwrap();
            b.write_u32::<LittleEndian>(self.header_size).unwrap();
        }
        if matches!(slot, 2 | 4) {
            b.write_u32::<LittleEndian>(self.dtb.len() as u32).unwrap();
            b.write_u64::<LittleEndian>(self.dtb_addr).unwrap();
        }
        b
    }

    pub fn build(&self) -> Vec<u8> {
        let page = self.page_size as usize;
        let mut b = self.prefix.clone();
        let start = b.len();
        b.extend(self.header_bytes());
        pad_to(&mut b, start, page);
        for seg in [&self.kernel, &self.ramdisk, &self.second, &self.dt, &self.recovery_dtbo, &self.dtb] {
            b.extend_from_slice(seg);
            pad_to(&mut b, start, page);
        }
        b
    }
}

/// Builder for v3 images.
#[derive(Clone)]
pub struct V3Image {
    pub os_version:  u32,
    pub header_size: u32,
    pub cmdline:     Vec<u8>,
    pub kernel:      Vec<u8>,
    pub ramdisk:     Vec<u8>,
}

impl Default for V3Image {
    fn default() -> Self {
        Self {
            os_version:  0,
            header_size: 1632,
            cmdline:     b"androidboot.hardware=qcom".to_vec(),
            kernel:      pattern(10, 3),
            ramdisk:     pattern(10, 4),
        }
    }
}

impl V3Image {
    pub fn build(&self) -> Vec<u8> {
        let mut b = Vec::new();
        b.write_all(BOOT_MAGIC).unwrap();
        for v in [
            self.kernel.len() as u32,
            self.ramdisk.len() as u32,
            self.os_version,
            self.header_size,
            0, 0, 0, 0,
            3,
        ] {
            b.write_u32::<LittleEndian>(v).unwrap();
        }
        b.write_all(&fixed(&self.cmdline, BOOT_ARGS_SIZE + BOOT_EXTRA_ARGS_SIZE)).unwrap();
        pad_to(&mut b, 0, 4096);
        b.extend_from_slice(&self.kernel);
        pad_to(&mut b, 0, 4096);
        b.extend_from_slice(&self.ramdisk);
        pad_to(&mut b, 0, 4096);
        b
    }
}
