//! File Service
//!
//! Positional read/write/create/size on named files. Paths are used as
//! given; only the persistence log lives in the data directory. All
//! failures map onto the request taxonomy so a bad filename never
//! escapes the request boundary.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::RequestError;

/// Read up to `buf.len()` bytes from `path` starting at `offset`.
///
/// The offset must lie within the file; a short read near end-of-file
/// returns the number of bytes actually read.
pub fn read_at(path: &Path, offset: u64, buf: &mut [u8]) -> Result<usize, RequestError> {
    let mut file = File::open(path).map_err(RequestError::from_fs)?;
    let len = file.metadata().map_err(RequestError::from_fs)?.len();

    if offset > len {
        return Err(RequestError::InvalidArgument);
    }

    file.seek(SeekFrom::Start(offset))
        .map_err(RequestError::from_fs)?;

    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..]).map_err(RequestError::from_fs)?;
        if n == 0 {
            break;
        }
        total += n;
    }

    Ok(total)
}

/// Write `buf` to `path` at `offset`. The file must already exist.
pub fn write_at(path: &Path, offset: u64, buf: &[u8]) -> Result<usize, RequestError> {
    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(RequestError::from_fs)?;

    file.seek(SeekFrom::Start(offset))
        .map_err(RequestError::from_fs)?;
    file.write_all(buf).map_err(RequestError::from_fs)?;

    Ok(buf.len())
}

/// Create a new empty file; fails if it already exists.
pub fn create(path: &Path) -> Result<(), RequestError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(RequestError::from_fs)?;
    Ok(())
}

/// Size of a file in bytes.
pub fn size(path: &Path) -> Result<u64, RequestError> {
    let meta = std::fs::metadata(path).map_err(RequestError::from_fs)?;
    Ok(meta.len())
}
