//! Zero-copy views over decoded records

use super::format::{car, manufacturer};
use super::record::{Car, Manufacturer};
use super::table::Table;
use crate::Result;

/// Read-only view of a `Car` table
///
/// Accessors resolve their field on each call; text is borrowed from the
/// underlying buffer.
#[derive(Debug, Clone, Copy)]
pub struct CarView<'a> {
    table: Table<'a>,
}

impl<'a> CarView<'a> {
    pub(crate) fn new(table: Table<'a>) -> Self {
        Self { table }
    }

    /// Model name
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField`, `InvalidText` or `OffsetOutOfRange`
    pub fn model(&self) -> Result<&'a str> {
        self.table.required_text(car::MODEL)
    }

    /// Model name as raw bytes, without UTF-8 validation
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` or `OffsetOutOfRange`
    pub fn model_bytes(&self) -> Result<&'a [u8]> {
        self.table.required_text_bytes(car::MODEL)
    }

    /// Model year
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` or `OffsetOutOfRange`
    pub fn year(&self) -> Result<u16> {
        self.table.required_scalar(car::YEAR)
    }

    /// The manufacturer this car references
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` or `OffsetOutOfRange`
    pub fn make(&self) -> Result<ManufacturerView<'a>> {
        self.table
            .required_table(car::MAKE, manufacturer::TABLE)
            .map(ManufacturerView::new)
    }

    /// Underlying table, for layout inspection
    pub fn table(&self) -> &Table<'a> {
        &self.table
    }

    /// Copy every field out into an owned `Car`
    ///
    /// # Errors
    ///
    /// Returns the first error any accessor reports
    pub fn to_car(&self) -> Result<Car> {
        Ok(Car {
            make: self.make()?.to_manufacturer()?,
            model: self.model()?.to_string(),
            year: self.year()?,
        })
    }
}

/// Read-only view of a `Manufacturer` table
#[derive(Debug, Clone, Copy)]
pub struct ManufacturerView<'a> {
    table: Table<'a>,
}

impl<'a> ManufacturerView<'a> {
    pub(crate) fn new(table: Table<'a>) -> Self {
        Self { table }
    }

    /// Manufacturer name
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField`, `InvalidText` or `OffsetOutOfRange`
    pub fn name(&self) -> Result<&'a str> {
        self.table.required_text(manufacturer::NAME)
    }

    /// Manufacturer name as raw bytes, without UTF-8 validation
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` or `OffsetOutOfRange`
    pub fn name_bytes(&self) -> Result<&'a [u8]> {
        self.table.required_text_bytes(manufacturer::NAME)
    }

    /// Coolness rating
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` or `OffsetOutOfRange`
    pub fn coolness(&self) -> Result<u8> {
        self.table.required_scalar(manufacturer::COOLNESS)
    }

    /// Underlying table, for layout inspection
    pub fn table(&self) -> &Table<'a> {
        &self.table
    }

    /// Copy every field out into an owned `Manufacturer`
    ///
    /// # Errors
    ///
    /// Returns the first error any accessor reports
    pub fn to_manufacturer(&self) -> Result<Manufacturer> {
        Ok(Manufacturer {
            name: self.name()?.to_string(),
            coolness: self.coolness()?,
        })
    }
}
