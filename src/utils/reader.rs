//! Framing-aware file reader.
//!
//! Export artifacts arrive without a trustworthy file name or content type,
//! so compression is detected from the leading magic bytes instead of the
//! extension.
//!
//! # Supported Formats
//!
//! - Plain newline-delimited JSON
//! - Gzip (`1f 8b`)
//! - Zstandard (`28 b5 2f fd`)
//!
//! # Examples
//!
//! ```no_run
//! use dpod_audit_tools::utils::reader::open_file;
//! use std::io::{BufRead, BufReader};
//!
//! // Same call for plain, gzip or zstd content
//! let reader = open_file("/tmp/audit-export.json").unwrap();
//! for line in BufReader::new(reader).lines() {
//!     let line = line.unwrap();
//!     // Process line...
//! }
//! ```

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Compression framing detected at the start of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Plain,
    Gzip,
    Zstd,
}

impl Framing {
    /// Classify a buffer by its leading bytes.
    pub fn from_magic(head: &[u8]) -> Self {
        if head.starts_with(&GZIP_MAGIC) {
            Self::Gzip
        } else if head.starts_with(&ZSTD_MAGIC) {
            Self::Zstd
        } else {
            Self::Plain
        }
    }

    pub const fn is_compressed(self) -> bool {
        !matches!(self, Self::Plain)
    }
}

/// Read up to four leading bytes of `path` and classify them.
pub fn detect_framing(path: impl AsRef<Path>) -> io::Result<Framing> {
    let mut file = File::open(path)?;
    let head = read_head(&mut file)?;
    Ok(Framing::from_magic(&head))
}

fn read_head(file: &mut File) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(ZSTD_MAGIC.len());
    Read::by_ref(file)
        .take(ZSTD_MAGIC.len() as u64)
        .read_to_end(&mut head)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(head)
}

/// Opens a file, transparently decoding gzip or zstd content.
///
/// # Examples
///
/// ```no_run
/// use dpod_audit_tools::utils::reader::open_file;
/// use std::io::Read;
///
/// let mut reader = open_file("export.json").unwrap();
/// let mut contents = String::new();
/// reader.read_to_string(&mut contents).unwrap();
/// ```
pub fn open_file(path: impl AsRef<Path>) -> io::Result<Box<dyn Read + Send>> {
    let mut file = File::open(path.as_ref())?;
    let head = read_head(&mut file)?;

    match Framing::from_magic(&head) {
        Framing::Gzip => Ok(Box::new(MultiGzDecoder::new(file))),
        Framing::Zstd => Ok(Box::new(zstd::Decoder::new(file)?)),
        Framing::Plain => Ok(Box::new(file)),
    }
}

/// Replace a compressed file at `path` with its decoded content.
///
/// The decoded bytes are streamed into a sibling temp file that is then
/// renamed over `path`, so memory use stays flat regardless of export size.
/// Plain files are left untouched. Returns the framing that was found.
pub fn decompress_in_place(path: impl AsRef<Path>) -> io::Result<Framing> {
    let path = path.as_ref();
    let framing = detect_framing(path)?;
    if !framing.is_compressed() {
        return Ok(framing);
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let staging = tempfile::Builder::new()
        .prefix(".decompress-")
        .tempfile_in(dir)?;

    let written = {
        let mut decoder = open_file(path)?;
        let mut writer = BufWriter::new(staging.as_file());
        let written = io::copy(&mut decoder, &mut writer)?;
        writer.flush()?;
        written
    };

    staging.persist(path).map_err(|e| e.error)?;
    debug!(?framing, bytes = written, path = %path.display(), "decompressed export in place");

    Ok(framing)
}
