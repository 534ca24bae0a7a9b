//! Back-to-front buffer builder
//!
//! Children are written before the tables that reference them, so every
//! offset stored in a table points forward to data already in the buffer.
//! Positions are tracked as distances from the end of the buffer while it is
//! being built and only become absolute once `finish` fixes the total length.

use std::marker::PhantomData;

use bytes::Bytes;

use super::format::{
    Scalar, Slot, VTableHeader, FILE_IDENTIFIER_LEN, MAX_TEXT_LEN, ROOT_BASE, SIZE_SOFFSET,
    SIZE_UOFFSET, SIZE_VOFFSET, VTABLE_HEADER_SIZE,
};
use crate::{CarbufError, Result};

/// Default starting capacity of a builder
pub const DEFAULT_CAPACITY: usize = 1024;

/// Largest starting capacity; bigger requests are clamped and the buffer grows on demand
pub const MAX_INITIAL_CAPACITY: usize = 16 * 1024 * 1024; // 16 MB

/// Marker for text written with [`Builder::create_string`]
#[derive(Debug)]
pub enum Text {}

/// Marker for a finished `Manufacturer` table
#[derive(Debug)]
pub enum ManufacturerTable {}

/// Marker for a finished `Car` table
#[derive(Debug)]
pub enum CarTable {}

/// Location of an already-written object, measured from the buffer end
#[derive(Debug)]
pub struct WipOffset<T> {
    value: usize,
    _kind: PhantomData<T>,
}

impl<T> WipOffset<T> {
    fn new(value: usize) -> Self {
        Self {
            value,
            _kind: PhantomData,
        }
    }

    /// Distance from the end of the buffer
    #[must_use]
    pub fn value(self) -> usize {
        self.value
    }
}

impl<T> Clone for WipOffset<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for WipOffset<T> {}

#[derive(Debug, Clone, Copy)]
struct FieldLoc {
    off: usize,
    slot: u16,
}

/// Builds a single record buffer from the back to the front
#[derive(Debug)]
pub struct Builder {
    buf: Vec<u8>,
    head: usize,
    min_align: usize,
    max_text_len: usize,
    fields: Vec<FieldLoc>,
    table_start: Option<usize>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Create a builder with the default capacity
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a builder that starts with `capacity` bytes of room
    ///
    /// The capacity is clamped to `1..=MAX_INITIAL_CAPACITY`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_INITIAL_CAPACITY);
        Self {
            buf: vec![0; capacity],
            head: capacity,
            min_align: 1,
            max_text_len: MAX_TEXT_LEN,
            fields: Vec::new(),
            table_start: None,
        }
    }

    /// Reject text longer than `limit` bytes (capped at the u32 prefix range)
    #[must_use]
    pub fn with_max_text_len(mut self, limit: usize) -> Self {
        self.max_text_len = limit.min(MAX_TEXT_LEN);
        self
    }

    /// Bytes written so far
    #[must_use]
    pub fn used_space(&self) -> usize {
        self.buf.len() - self.head
    }

    /// Write a length-prefixed, zero-terminated UTF-8 string
    ///
    /// # Errors
    ///
    /// Returns `FieldTooLarge` if the text exceeds the length limit
    ///
    /// # Panics
    ///
    /// Panics if called between `start_table` and `end_table`
    pub fn create_string(&mut self, text: &str) -> Result<WipOffset<Text>> {
        self.create_text_bytes(text.as_bytes())
    }

    /// Write raw bytes with the text encoding, without checking UTF-8
    ///
    /// # Errors
    ///
    /// Returns `FieldTooLarge` if the bytes exceed the length limit
    ///
    /// # Panics
    ///
    /// Panics if called between `start_table` and `end_table`
    pub fn create_text_bytes(&mut self, bytes: &[u8]) -> Result<WipOffset<Text>> {
        assert!(
            self.table_start.is_none(),
            "text must be written outside of a table"
        );

        if bytes.len() > self.max_text_len {
            return Err(CarbufError::FieldTooLarge {
                size: bytes.len(),
                limit: self.max_text_len,
            });
        }

        // Terminator and bytes follow the length prefix, which must be aligned
        self.align(bytes.len() + 1, SIZE_UOFFSET);
        self.push(0u8);
        self.push_bytes(bytes);
        let end = self.push(bytes.len() as u32);

        Ok(WipOffset::new(end))
    }

    /// Begin a table; slots pushed until `end_table` belong to it
    ///
    /// # Panics
    ///
    /// Panics if a table is already open
    pub fn start_table(&mut self) {
        assert!(self.table_start.is_none(), "tables cannot be nested");
        self.fields.clear();
        self.table_start = Some(self.used_space());
    }

    /// Write an inline scalar into `slot` of the open table
    ///
    /// # Panics
    ///
    /// Panics if no table is open
    pub fn push_slot<T: Scalar>(&mut self, slot: Slot, value: T) {
        self.assert_in_table();
        self.align(T::SIZE, T::SIZE);
        let off = self.push(value);
        self.fields.push(FieldLoc { off, slot: slot.id });
    }

    /// Write an offset to an already-written object into `slot` of the open table
    ///
    /// # Panics
    ///
    /// Panics if no table is open
    pub fn push_slot_offset<T>(&mut self, slot: Slot, target: WipOffset<T>) {
        self.assert_in_table();
        self.align(SIZE_UOFFSET, SIZE_UOFFSET);
        debug_assert!(target.value <= self.used_space());
        let relative = self.used_space() + SIZE_UOFFSET - target.value;
        let off = self.push(relative as u32);
        self.fields.push(FieldLoc { off, slot: slot.id });
    }

    /// Close the open table and write its vtable in front of it
    ///
    /// # Panics
    ///
    /// Panics if no table is open
    pub fn end_table<T>(&mut self) -> WipOffset<T> {
        let Some(start) = self.table_start.take() else {
            panic!("end_table called without start_table");
        };

        // soffset placeholder, patched once the vtable position is known
        self.align(SIZE_SOFFSET, SIZE_SOFFSET);
        let object = self.push(0i32);
        let table_len = object - start;

        let slot_count = self
            .fields
            .iter()
            .map(|field| field.slot as usize + 1)
            .max()
            .unwrap_or(0);
        let mut entries = vec![0u16; slot_count];
        for field in &self.fields {
            entries[field.slot as usize] = (object - field.off) as u16;
        }

        for entry in entries.iter().rev() {
            self.push(*entry);
        }
        let header = VTableHeader {
            vtable_len: (VTABLE_HEADER_SIZE + slot_count * SIZE_VOFFSET) as u16,
            table_len: table_len as u16,
        };
        self.push_bytes(&header.to_le_bytes());
        let vtable = self.used_space();

        // vtable sits in front of the table: vtable = table - soffset
        let soffset = (vtable - object) as i32;
        let at = self.buf.len() - object;
        soffset.write_le(&mut self.buf[at..]);

        self.fields.clear();
        WipOffset::new(object)
    }

    /// Write the root offset (and optional file identifier) and freeze the buffer
    ///
    /// # Panics
    ///
    /// Panics if a table is still open
    #[must_use]
    pub fn finish<T>(
        mut self,
        root: WipOffset<T>,
        file_identifier: Option<[u8; FILE_IDENTIFIER_LEN]>,
    ) -> Bytes {
        assert!(self.table_start.is_none(), "finish called inside a table");

        let prefix = SIZE_UOFFSET + file_identifier.map_or(0, |_| FILE_IDENTIFIER_LEN);
        self.align(prefix, self.min_align);
        if let Some(identifier) = file_identifier {
            self.push_bytes(&identifier);
        }

        let total = self.used_space() + SIZE_UOFFSET;
        let root_position = total - root.value;
        self.push((root_position - ROOT_BASE) as u32);

        let mut buf = self.buf;
        buf.drain(..self.head);
        Bytes::from(buf)
    }

    fn assert_in_table(&self) {
        assert!(
            self.table_start.is_some(),
            "slots can only be pushed inside a table"
        );
    }

    /// Pad so that after writing `len` more bytes the front is `alignment`-aligned
    fn align(&mut self, len: usize, alignment: usize) {
        self.min_align = self.min_align.max(alignment);
        let padding = (alignment - (self.used_space() + len) % alignment) % alignment;
        let at = self.make_space(padding);
        self.buf[at..at + padding].fill(0);
    }

    fn push<T: Scalar>(&mut self, value: T) -> usize {
        let at = self.make_space(T::SIZE);
        value.write_le(&mut self.buf[at..]);
        self.used_space()
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        let at = self.make_space(bytes.len());
        self.buf[at..at + bytes.len()].copy_from_slice(bytes);
    }

    fn make_space(&mut self, len: usize) -> usize {
        if len > self.head {
            self.grow(len);
        }
        self.head -= len;
        self.head
    }

    fn grow(&mut self, additional: usize) {
        let used = self.used_space();
        let new_len = (self.buf.len() * 2).max(used + additional);
        let mut grown = vec![0u8; new_len];
        grown[new_len - used..].copy_from_slice(&self.buf[self.head..]);
        self.buf = grown;
        self.head = new_len - used;
    }
}
