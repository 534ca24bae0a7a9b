//! Record file writer

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::codec::{encode_with, Car};
use crate::config::EncodeConfig;
use crate::Result;

/// Write a finished buffer to `path`, replacing any existing file
///
/// # Errors
///
/// Returns error if the file cannot be created, written or synced
pub fn write_buffer(path: &Path, buf: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    file.write_all(buf)?;
    file.sync_all()?;

    debug!("Wrote {} bytes to {}", buf.len(), path.display());
    Ok(())
}

/// Encode `car` and write it to `path`, returning the number of bytes written
///
/// # Errors
///
/// Returns error if encoding fails or the file cannot be written
pub fn write_car(path: &Path, car: &Car, config: &EncodeConfig) -> Result<usize> {
    let buf = encode_with(config, car)?;
    write_buffer(path, &buf)?;
    Ok(buf.len())
}
