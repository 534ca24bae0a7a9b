//! Bounds-checked table access
//!
//! Every read goes through [`read_bytes`], so a corrupt offset or length is
//! reported as `OffsetOutOfRange` instead of slicing past the buffer.

use super::format::{Scalar, Slot, VTableHeader, SIZE_UOFFSET, SIZE_VOFFSET, VTABLE_HEADER_SIZE};
use crate::{CarbufError, Result};

/// Borrow `len` bytes at `offset`, or fail if they do not fit
///
/// # Errors
///
/// Returns `OffsetOutOfRange` if `offset + len` exceeds the buffer
pub fn read_bytes(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    match offset.checked_add(len) {
        Some(end) if end <= buf.len() => Ok(&buf[offset..end]),
        _ => Err(CarbufError::OffsetOutOfRange {
            offset,
            len,
            buffer_len: buf.len(),
        }),
    }
}

/// Read a little-endian scalar at `offset`
///
/// # Errors
///
/// Returns `OffsetOutOfRange` if the scalar does not fit
pub fn read_scalar<T: Scalar>(buf: &[u8], offset: usize) -> Result<T> {
    read_bytes(buf, offset, T::SIZE).map(T::read_le)
}

/// A table instance inside a buffer, with its vtable already resolved
#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    buf: &'a [u8],
    position: usize,
    vtable: usize,
    header: VTableHeader,
    name: &'static str,
}

impl<'a> Table<'a> {
    /// Resolve the table starting at `position`
    ///
    /// Checks that the soffset, the whole vtable and the inline table body lie
    /// inside the buffer. Field contents are checked when they are read.
    ///
    /// # Errors
    ///
    /// Returns `OffsetOutOfRange` if any of those regions falls outside `buf`
    pub fn at(buf: &'a [u8], position: usize, name: &'static str) -> Result<Self> {
        let soffset: i32 = read_scalar(buf, position)?;
        let vtable = i64::try_from(position)
            .ok()
            .and_then(|p| p.checked_sub(i64::from(soffset)))
            .and_then(|v| usize::try_from(v).ok())
            .ok_or(CarbufError::OffsetOutOfRange {
                offset: position,
                len: VTABLE_HEADER_SIZE,
                buffer_len: buf.len(),
            })?;

        let header = VTableHeader::from_le_slice(read_bytes(buf, vtable, VTABLE_HEADER_SIZE)?);
        read_bytes(buf, vtable, header.vtable_len as usize)?;
        read_bytes(buf, position, header.table_len as usize)?;

        Ok(Self {
            buf,
            position,
            vtable,
            header,
            name,
        })
    }

    /// Table name used in error messages
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Absolute position of the table (its soffset)
    pub fn position(&self) -> usize {
        self.position
    }

    /// Absolute position of the table's vtable
    pub fn vtable_position(&self) -> usize {
        self.vtable
    }

    /// The resolved vtable header
    pub fn header(&self) -> VTableHeader {
        self.header
    }

    /// The whole buffer this table lives in
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Absolute position of a field, or `None` if the writer left it out
    ///
    /// Slots past the end of the vtable come from a newer schema than the
    /// writer knew about and read as absent.
    ///
    /// # Errors
    ///
    /// Returns `OffsetOutOfRange` if the vtable entry cannot be read
    pub fn field_position(&self, slot: Slot) -> Result<Option<usize>> {
        let entry = slot.vtable_entry();
        if entry + SIZE_VOFFSET > self.header.vtable_len as usize {
            return Ok(None);
        }

        let voffset: u16 = read_scalar(self.buf, self.vtable + entry)?;
        if voffset == 0 {
            return Ok(None);
        }

        Ok(Some(self.position + voffset as usize))
    }

    /// Read an inline scalar
    ///
    /// # Errors
    ///
    /// Returns `OffsetOutOfRange` if the field lies outside the buffer
    pub fn scalar<T: Scalar>(&self, slot: Slot) -> Result<Option<T>> {
        match self.field_position(slot)? {
            Some(at) => read_scalar(self.buf, at).map(Some),
            None => Ok(None),
        }
    }

    /// Read an optional inline scalar, falling back to `default` when absent
    ///
    /// # Errors
    ///
    /// Returns `OffsetOutOfRange` if the field lies outside the buffer
    pub fn scalar_or<T: Scalar>(&self, slot: Slot, default: T) -> Result<T> {
        Ok(self.scalar(slot)?.unwrap_or(default))
    }

    /// Read a required inline scalar
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` if absent, `OffsetOutOfRange` if out of bounds
    pub fn required_scalar<T: Scalar>(&self, slot: Slot) -> Result<T> {
        self.scalar(slot)?.ok_or_else(|| self.missing(slot))
    }

    /// Read text bytes without checking UTF-8
    ///
    /// # Errors
    ///
    /// Returns `OffsetOutOfRange` if the offset, length prefix or bytes are out of bounds
    pub fn text_bytes(&self, slot: Slot) -> Result<Option<&'a [u8]>> {
        Ok(self.text_span(slot)?.map(|(_, bytes)| bytes))
    }

    /// Read text and check that it is UTF-8
    ///
    /// # Errors
    ///
    /// Returns `InvalidText` on bad UTF-8, `OffsetOutOfRange` if out of bounds
    pub fn text(&self, slot: Slot) -> Result<Option<&'a str>> {
        match self.text_span(slot)? {
            Some((start, bytes)) => std::str::from_utf8(bytes)
                .map(Some)
                .map_err(|_| CarbufError::InvalidText { offset: start }),
            None => Ok(None),
        }
    }

    /// Read required text bytes without checking UTF-8
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` if absent, `OffsetOutOfRange` if out of bounds
    pub fn required_text_bytes(&self, slot: Slot) -> Result<&'a [u8]> {
        self.text_bytes(slot)?.ok_or_else(|| self.missing(slot))
    }

    /// Read required UTF-8 text
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField`, `InvalidText` or `OffsetOutOfRange`
    pub fn required_text(&self, slot: Slot) -> Result<&'a str> {
        self.text(slot)?.ok_or_else(|| self.missing(slot))
    }

    /// Follow an offset field to a child table
    ///
    /// # Errors
    ///
    /// Returns `OffsetOutOfRange` if the child table does not fit in the buffer
    pub fn table(&self, slot: Slot, name: &'static str) -> Result<Option<Table<'a>>> {
        match self.field_position(slot)? {
            Some(at) => Table::at(self.buf, self.follow(at)?, name).map(Some),
            None => Ok(None),
        }
    }

    /// Follow a required offset field to a child table
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` if absent, `OffsetOutOfRange` if out of bounds
    pub fn required_table(&self, slot: Slot, name: &'static str) -> Result<Table<'a>> {
        self.table(slot, name)?.ok_or_else(|| self.missing(slot))
    }

    /// Position of the text bytes and the bytes themselves
    fn text_span(&self, slot: Slot) -> Result<Option<(usize, &'a [u8])>> {
        let Some(at) = self.field_position(slot)? else {
            return Ok(None);
        };

        let prefix = self.follow(at)?;
        let len: u32 = read_scalar(self.buf, prefix)?;
        let start = prefix + SIZE_UOFFSET;
        let bytes = read_bytes(self.buf, start, len as usize)?;
        Ok(Some((start, bytes)))
    }

    /// Resolve the unsigned offset stored at `at`, relative to `at`
    fn follow(&self, at: usize) -> Result<usize> {
        let relative: u32 = read_scalar(self.buf, at)?;
        at.checked_add(relative as usize)
            .ok_or(CarbufError::OffsetOutOfRange {
                offset: at,
                len: relative as usize,
                buffer_len: self.buf.len(),
            })
    }

    fn missing(&self, slot: Slot) -> CarbufError {
        CarbufError::MissingRequiredField {
            table: self.name,
            field: slot.name,
        }
    }
}
