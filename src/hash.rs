//! Content fingerprinting.
//!
//! Two independent digests are computed per file:
//!
//! - [`PartialFingerprint`]: xxh3-64 over the first and last
//!   [`PARTIAL_WINDOW`] bytes. Cheap, and only a pre-filter: different
//!   partial fingerprints prove different content, equal ones prove nothing.
//! - [`FullFingerprint`]: BLAKE3 over the whole file, truncated to 128 bits.
//!   This is the duplicate key. Two files with different content sharing a
//!   size and a full fingerprint would be treated as duplicates; at 128 bits
//!   that probability is negligible but not zero.
//!
//! Full-content reads use a buffer of [`buffer_size()`] bytes, a multiple
//! of the OS page size, which the copy executor reuses for its own streams.

use crate::error::HashError;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::OnceLock;

/// Bytes sampled from each end of a file for the partial fingerprint.
pub const PARTIAL_WINDOW: u64 = 64 * 1024;

/// Pages per streaming buffer.
const BUFFER_PAGES: usize = 256;

/// Upper bound for the streaming buffer.
const MAX_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Page size assumed when the OS cannot be queried.
const FALLBACK_PAGE_SIZE: usize = 4096;

/// 64-bit fingerprint of a file's head and tail windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartialFingerprint([u8; 8]);

impl PartialFingerprint {
    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

/// 128-bit fingerprint of a file's entire content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullFingerprint([u8; 16]);

impl FullFingerprint {
    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

impl fmt::Display for PartialFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl fmt::Display for FullFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// The OS memory page size in bytes.
#[cfg(unix)]
pub fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions and only reads system configuration
    let res = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if res > 0 {
        res as usize
    } else {
        FALLBACK_PAGE_SIZE
    }
}

/// The OS memory page size in bytes.
#[cfg(windows)]
pub fn page_size() -> usize {
    use windows::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

    let mut info = SYSTEM_INFO::default();
    // SAFETY: GetSystemInfo only writes into the struct we hand it
    unsafe { GetSystemInfo(&mut info) };
    match info.dwPageSize as usize {
        0 => FALLBACK_PAGE_SIZE,
        n => n,
    }
}

/// The OS memory page size in bytes.
#[cfg(not(any(unix, windows)))]
pub fn page_size() -> usize {
    FALLBACK_PAGE_SIZE
}

/// Streaming buffer size shared by full hashing and copying.
///
/// 256 pages, capped at 8 MiB. Computed once per process.
pub fn buffer_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();
    *SIZE.get_or_init(|| (page_size() * BUFFER_PAGES).min(MAX_BUFFER_SIZE))
}

/// Compute the partial fingerprint of `path`.
///
/// Reads at most [`PARTIAL_WINDOW`] bytes from the start and from the end.
/// For files shorter than two windows the samples overlap.
///
/// # Errors
///
/// Returns [`HashError::Io`] if the file cannot be opened or read.
pub fn partial_fingerprint(path: &Path) -> Result<PartialFingerprint, HashError> {
    let mut file = File::open(path).map_err(|e| io_error(path, e))?;
    let len = file.metadata().map_err(|e| io_error(path, e))?.len();
    partial_from_file(path, &mut file, len)
}

/// Like [`partial_fingerprint`], but fails with [`HashError::SizeChanged`]
/// if the file is no longer `expected` bytes long.
pub fn partial_fingerprint_expecting(
    path: &Path,
    expected: u64,
) -> Result<PartialFingerprint, HashError> {
    let mut file = File::open(path).map_err(|e| io_error(path, e))?;
    let len = file.metadata().map_err(|e| io_error(path, e))?.len();
    if len != expected {
        return Err(HashError::SizeChanged {
            path: path.to_path_buf(),
            expected,
            actual: len,
        });
    }
    partial_from_file(path, &mut file, len)
}

fn partial_from_file(
    path: &Path,
    file: &mut File,
    len: u64,
) -> Result<PartialFingerprint, HashError> {
    let window = PARTIAL_WINDOW as usize;
    let mut buffer = vec![0u8; window * 2];

    let head = read_up_to(file, &mut buffer[..window]).map_err(|e| io_error(path, e))?;

    file.seek(SeekFrom::Start(len.saturating_sub(PARTIAL_WINDOW)))
        .map_err(|e| io_error(path, e))?;
    let tail =
        read_up_to(file, &mut buffer[head..head + window]).map_err(|e| io_error(path, e))?;

    let digest = xxhash_rust::xxh3::xxh3_64(&buffer[..head + tail]);
    Ok(PartialFingerprint(digest.to_le_bytes()))
}

/// Compute the full fingerprint of `path`.
///
/// # Errors
///
/// Returns [`HashError::Io`] if the file cannot be opened or a read fails
/// mid-stream.
pub fn full_fingerprint(path: &Path) -> Result<FullFingerprint, HashError> {
    full_digest(path).map(|(fingerprint, _)| fingerprint)
}

/// Like [`full_fingerprint`], but fails with [`HashError::SizeChanged`]
/// unless exactly `expected` bytes were read.
pub fn full_fingerprint_expecting(
    path: &Path,
    expected: u64,
) -> Result<FullFingerprint, HashError> {
    let (fingerprint, actual) = full_digest(path)?;
    if actual != expected {
        return Err(HashError::SizeChanged {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(fingerprint)
}

fn full_digest(path: &Path) -> Result<(FullFingerprint, u64), HashError> {
    let mut file = File::open(path).map_err(|e| io_error(path, e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; buffer_size()];
    let mut total: u64 = 0;

    loop {
        let n = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_error(path, e)),
        };
        hasher.update(&buffer[..n]);
        total += n as u64;
    }

    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest.as_bytes()[..16]);
    Ok((FullFingerprint(bytes), total))
}

/// Fill `buf` as far as the file allows; short only at EOF.
fn read_up_to(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn io_error(path: &Path, source: io::Error) -> HashError {
    HashError::Io {
        path: path.to_path_buf(),
        source,
    }
}
