//! Digest algorithm detection for the header `id` field.
//!
//! The field holds up to 32 digest bytes.  SHA-1 leaves bytes 20 and up
//! zero; the check starts 4 bytes later to tolerate header variants with a
//! 20-byte name field.  Nothing is recomputed or verified here.

use serde::Serialize;
use std::fmt;

use crate::header::BOOT_ID_WORDS;

/// First `id` byte that a SHA-1 image always leaves zero.
pub const SHA256_ONLY_OFFSET: usize = 20 + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    Sha1,
    Sha256,
}

impl HashType {
    pub fn name(self) -> &'static str {
        match self {
            HashType::Sha1   => "sha1",
            HashType::Sha256 => "sha256",
        }
    }

    pub fn detect(id: &[u32; BOOT_ID_WORDS]) -> Self {
        Self::detect_bytes(&id_bytes(id))
    }

    pub fn detect_bytes(id: &[u8; BOOT_ID_WORDS * 4]) -> Self {
        if id[SHA256_ONLY_OFFSET..].iter().any(|&b| b != 0) {
            HashType::Sha256
        } else {
            HashType::Sha1
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw digest bytes in on-disk order.
pub fn id_bytes(id: &[u32; BOOT_ID_WORDS]) -> [u8; BOOT_ID_WORDS * 4] {
    let mut out = [0u8; BOOT_ID_WORDS * 4];
    for (chunk, word) in out.chunks_exact_mut(4).zip(id) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    out
}
