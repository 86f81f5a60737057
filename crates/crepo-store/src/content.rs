//! Caller-supplied object content.
//!
//! A [`ContentSource`] is read exactly once: the engine takes it by value,
//! drains it synchronously while digesting the bytes, and drops it before
//! returning. Nothing keeps a handle on the source past the call.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use bytes::Bytes;
use crepo_crypto::{Checksum, HashingReader};

/// Content type recorded for file content that was given none.
pub const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// Where the bytes of a new object version come from.
pub enum ContentSource {
    /// In-memory bytes.
    Bytes(Bytes),
    /// A file on disk, opened when the source is drained.
    File(PathBuf),
    /// Any reader, consumed to EOF.
    Reader(Box<dyn Read + Send>),
}

/// Drained content together with its digest.
#[derive(Clone, Debug)]
pub struct Content {
    pub bytes: Bytes,
    pub checksum: Checksum,
}

impl Content {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl ContentSource {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        ContentSource::Bytes(bytes.into())
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        ContentSource::File(path.into())
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        ContentSource::Reader(Box::new(reader))
    }

    /// File sources may omit a content type; the others may not.
    pub fn is_file(&self) -> bool {
        matches!(self, ContentSource::File(_))
    }

    /// Read the whole source, consuming it.
    pub fn drain(self) -> io::Result<Content> {
        match self {
            ContentSource::Bytes(bytes) => {
                let checksum = Checksum::of(&bytes);
                Ok(Content { bytes, checksum })
            }
            ContentSource::File(path) => drain_reader(File::open(path)?),
            ContentSource::Reader(reader) => drain_reader(reader),
        }
    }
}

fn drain_reader(reader: impl Read) -> io::Result<Content> {
    let mut hashing = HashingReader::new(reader);
    let mut buf = Vec::new();
    hashing.read_to_end(&mut buf)?;
    Ok(Content {
        checksum: hashing.checksum(),
        bytes: Bytes::from(buf),
    })
}

impl fmt::Debug for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSource::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            ContentSource::File(p) => f.debug_tuple("File").field(p).finish(),
            ContentSource::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<Vec<u8>> for ContentSource {
    fn from(v: Vec<u8>) -> Self {
        ContentSource::Bytes(Bytes::from(v))
    }
}

impl From<&'static [u8]> for ContentSource {
    fn from(v: &'static [u8]) -> Self {
        ContentSource::Bytes(Bytes::from_static(v))
    }
}

impl From<&'static str> for ContentSource {
    fn from(v: &'static str) -> Self {
        ContentSource::Bytes(Bytes::from_static(v.as_bytes()))
    }
}
