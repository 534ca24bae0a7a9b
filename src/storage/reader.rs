//! Record file reader

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::codec::{decode, decode_with_identifier, CarView, FILE_IDENTIFIER_LEN, MIN_BUFFER_SIZE};
use crate::{CarbufError, Result};

/// A memory-mapped record file
///
/// Views returned by [`CarFile::car`] borrow the mapping directly.
pub struct CarFile {
    _file: File,
    mmap: Mmap,
}

impl CarFile {
    /// Open and map an existing record file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or mapped, or is too small
    /// to hold a record
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;

        let len = file.metadata()?.len();
        if len < MIN_BUFFER_SIZE as u64 {
            return Err(CarbufError::MalformedBuffer {
                len: usize::try_from(len).unwrap_or(usize::MAX),
            });
        }

        // SAFETY: the mapping is read-only and owned together with the file handle
        let mmap = unsafe { Mmap::map(&file)? };

        debug!("Mapped {} ({} bytes)", path.display(), mmap.len());

        Ok(Self { _file: file, mmap })
    }

    /// Raw file contents
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// File size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Whether the file is empty (never true for an opened file)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Decode the root car
    ///
    /// # Errors
    ///
    /// Returns any `decode` error
    pub fn car(&self) -> Result<CarView<'_>> {
        decode(&self.mmap)
    }

    /// Decode the root car after checking the file identifier
    ///
    /// # Errors
    ///
    /// Returns `IdentifierMismatch` or any `decode` error
    pub fn car_with_identifier(
        &self,
        expected: [u8; FILE_IDENTIFIER_LEN],
    ) -> Result<CarView<'_>> {
        decode_with_identifier(&self.mmap, expected)
    }
}
