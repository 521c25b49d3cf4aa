//! Helpers for the copy executor: byte streaming and attribute transfer.

use crate::hash::buffer_size;
use filetime::{FileTime, set_file_times};
use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::path::Path;

// =============================================================================
// File content copying
// =============================================================================

/// Stream `src` into `dst` through one buffer of [`buffer_size`] bytes.
///
/// Plain read/write calls; no kernel-side copy. Both handles are read and
/// written from their current position. Returns the number of bytes copied.
pub(crate) fn copy_file_contents(mut src: &File, mut dst: &File) -> io::Result<u64> {
    let mut buffer = vec![0u8; buffer_size()];
    let mut total: u64 = 0;

    loop {
        let n = match src.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        dst.write_all(&buffer[..n])?;
        total += n as u64;
    }

    Ok(total)
}

// =============================================================================
// Metadata and timestamp utilities
// =============================================================================

/// Preserve file timestamps (mtime and atime)
pub(crate) fn preserve_timestamps(src_meta: &Metadata, dst: &Path) -> io::Result<()> {
    let mtime = FileTime::from_last_modification_time(src_meta);
    let atime = FileTime::from_last_access_time(src_meta);
    set_file_times(dst, atime, mtime)
}

/// Copy permission bits from the source metadata
pub(crate) fn preserve_permissions(src_meta: &Metadata, dst: &Path) -> io::Result<()> {
    fs::set_permissions(dst, src_meta.permissions())
}

// =============================================================================
// Tests
// =============================================================================
