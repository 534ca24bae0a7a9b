//! Buffer layout: sizes, slot identifiers and the vtable header

use bytemuck::{Pod, Zeroable};

/// Size of an unsigned offset (root offset, table-to-child offsets, text length)
pub const SIZE_UOFFSET: usize = 4;

/// Size of the signed table-to-vtable offset
pub const SIZE_SOFFSET: usize = 4;

/// Size of a single vtable entry
pub const SIZE_VOFFSET: usize = 2;

/// Size of the vtable header (vtable length + table length)
pub const VTABLE_HEADER_SIZE: usize = 4;

/// Position the root offset is measured from (the byte right after it)
pub const ROOT_BASE: usize = SIZE_UOFFSET;

/// Length of the optional file identifier stored after the root offset
pub const FILE_IDENTIFIER_LEN: usize = 4;

/// Smallest buffer that can hold a root offset and one empty table
pub const MIN_BUFFER_SIZE: usize = SIZE_UOFFSET + VTABLE_HEADER_SIZE + SIZE_SOFFSET;

/// Largest text length the u32 length prefix can describe
pub const MAX_TEXT_LEN: usize = u32::MAX as usize;

/// A field's stable identifier within a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    /// Index into the vtable entries
    pub id: u16,
    /// Field name used in error messages
    pub name: &'static str,
}

impl Slot {
    /// Create a slot
    pub const fn new(id: u16, name: &'static str) -> Self {
        Self { id, name }
    }

    /// Byte position of this slot's entry relative to the vtable start
    pub const fn vtable_entry(self) -> usize {
        VTABLE_HEADER_SIZE + self.id as usize * SIZE_VOFFSET
    }
}

/// Slots of the `Car` table
pub mod car {
    use super::Slot;

    /// Table name
    pub const TABLE: &str = "Car";
    /// Offset to the `Manufacturer` table
    pub const MAKE: Slot = Slot::new(0, "make");
    /// Offset to the model text
    pub const MODEL: Slot = Slot::new(1, "model");
    /// Inline u16
    pub const YEAR: Slot = Slot::new(2, "year");
}

/// Slots of the `Manufacturer` table
pub mod manufacturer {
    use super::Slot;

    /// Table name
    pub const TABLE: &str = "Manufacturer";
    /// Offset to the name text
    pub const NAME: Slot = Slot::new(0, "name");
    /// Inline u8
    pub const COOLNESS: Slot = Slot::new(1, "coolness");
}

/// Fixed header at the start of every vtable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct VTableHeader {
    /// Vtable size in bytes, header included
    pub vtable_len: u16,
    /// Inline table size in bytes, soffset included
    pub table_len: u16,
}

static_assertions::const_assert_eq!(std::mem::size_of::<VTableHeader>(), VTABLE_HEADER_SIZE);

impl VTableHeader {
    /// Decode a little-endian header
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is not exactly `VTABLE_HEADER_SIZE` long
    #[must_use]
    pub fn from_le_slice(bytes: &[u8]) -> Self {
        let raw: Self = bytemuck::pod_read_unaligned(bytes);
        Self {
            vtable_len: u16::from_le(raw.vtable_len),
            table_len: u16::from_le(raw.table_len),
        }
    }

    /// Encode as little-endian bytes
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; VTABLE_HEADER_SIZE] {
        let raw = Self {
            vtable_len: self.vtable_len.to_le(),
            table_len: self.table_len.to_le(),
        };
        bytemuck::cast(raw)
    }

    /// Number of slot entries the vtable carries
    #[must_use]
    pub fn slot_count(self) -> usize {
        (self.vtable_len as usize).saturating_sub(VTABLE_HEADER_SIZE) / SIZE_VOFFSET
    }
}

/// Fixed-width little-endian values that can live inline in a table
pub trait Scalar: Copy {
    /// Encoded width in bytes
    const SIZE: usize;

    /// Read from the first `SIZE` bytes of `bytes`
    fn read_le(bytes: &[u8]) -> Self;

    /// Write into the first `SIZE` bytes of `out`
    fn write_le(self, out: &mut [u8]);
}

macro_rules! impl_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_le_bytes(raw)
                }

                fn write_le(self, out: &mut [u8]) {
                    out[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_scalar!(u8, i8, u16, i16, u32, i32, u64, i64);
