//! Sink protocol: where decoded values and segment bytes end up.
//!
//! The core never names files.  It hands each scalar value or byte segment
//! to a [`SegmentSink`] under a symbolic name (`cmdline`, `base`, `zImage`,
//! `ramdisk.gz`, ...) and the sink decides placement.  A commit either
//! completes or fails as a whole; earlier commits are never touched again.

use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub trait SegmentSink {
    /// Commit a printable scalar.
    fn put_value(&mut self, name: &str, value: &str) -> io::Result<()>;
    /// Commit a raw segment.
    fn put_bytes(&mut self, name: &str, data: &[u8]) -> io::Result<()>;
}

impl<S: SegmentSink + ?Sized> SegmentSink for &mut S {
    fn put_value(&mut self, name: &str, value: &str) -> io::Result<()> {
        (**self).put_value(name, value)
    }

    fn put_bytes(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        (**self).put_bytes(name, data)
    }
}

// ── DirSink ──────────────────────────────────────────────────────────────────

/// Writes every commit to `<dir>/<prefix>-<name>`.
///
/// Scalars get a trailing newline.  Each commit goes to a temporary sibling
/// first and is renamed into place, so a failed commit leaves nothing behind.
#[derive(Debug, Clone)]
pub struct DirSink {
    dir:    PathBuf,
    prefix: String,
}

impl DirSink {
    /// `dir` must already exist and be a directory.
    pub fn new<P: AsRef<Path>>(dir: P, prefix: impl Into<String>) -> io::Result<Self> {
        let dir = dir.as_ref().to_owned();
        let meta = fs::metadata(&dir)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", dir.display()),
            ));
        }
        Ok(Self { dir, prefix: prefix.into() })
    }

    /// Sink named after the input image's file name, as `unpackbootimg` does.
    pub fn for_image<P: AsRef<Path>, Q: AsRef<Path>>(dir: P, image: Q) -> io::Result<Self> {
        let prefix = image
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "boot.img".to_owned());
        Self::new(dir, prefix)
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}-{}", self.prefix, name))
    }

    fn commit(&self, name: &str, parts: &[&[u8]]) -> io::Result<()> {
        let target = self.path_for(name);
        let tmp = self.dir.join(format!(".{}-{}.partial", self.prefix, name));
        let result = (|| {
            let mut f = File::create(&tmp)?;
            for part in parts {
                f.write_all(part)?;
            }
            f.sync_all()?;
            fs::rename(&tmp, &target)
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

impl SegmentSink for DirSink {
    fn put_value(&mut self, name: &str, value: &str) -> io::Result<()> {
        self.commit(name, &[value.as_bytes(), b"\n"])
    }

    fn put_bytes(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        self.commit(name, &[data])
    }
}

// ── MemorySink ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Commit {
    Value { name: String, value: String },
    Bytes { name: String, #[serde(with = "hex_bytes")] data: Vec<u8> },
}

/// Records commits in order, in memory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemorySink {
    pub commits: Vec<Commit>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.commits.iter().find_map(|c| match c {
            Commit::Value { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        self.commits.iter().find_map(|c| match c {
            Commit::Bytes { name: n, data } if n == name => Some(data.as_slice()),
            _ => None,
        })
    }

    /// Names in commit order.
    pub fn names(&self) -> Vec<&str> {
        self.commits
            .iter()
            .map(|c| match c {
                Commit::Value { name, .. } | Commit::Bytes { name, .. } => name.as_str(),
            })
            .collect()
    }
}

impl SegmentSink for MemorySink {
    fn put_value(&mut self, name: &str, value: &str) -> io::Result<()> {
        self.commits.push(Commit::Value { name: name.to_owned(), value: value.to_owned() });
        Ok(())
    }

    fn put_bytes(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        self.commits.push(Commit::Bytes { name: name.to_owned(), data: data.to_vec() });
        Ok(())
    }
}

mod hex_bytes {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(data: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(data))
    }
}
