//! Encoder-side record values

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::builder::{Builder, CarTable, ManufacturerTable, Text, WipOffset};
use super::format::{car, manufacturer};
use crate::config::EncodeConfig;
use crate::Result;

/// A manufacturer to be encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manufacturer {
    /// Display name
    pub name: String,
    /// Coolness rating
    pub coolness: u8,
}

/// A car to be encoded; owns its manufacturer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    /// Manufacturer
    pub make: Manufacturer,
    /// Model name
    pub model: String,
    /// Model year
    pub year: u16,
}

/// Write a `Manufacturer` table referencing an already-written name
pub fn create_manufacturer(
    builder: &mut Builder,
    name: WipOffset<Text>,
    coolness: u8,
) -> WipOffset<ManufacturerTable> {
    builder.start_table();
    builder.push_slot_offset(manufacturer::NAME, name);
    builder.push_slot(manufacturer::COOLNESS, coolness);
    builder.end_table()
}

/// Write a `Car` table referencing an already-written manufacturer and model
pub fn create_car(
    builder: &mut Builder,
    make: WipOffset<ManufacturerTable>,
    model: WipOffset<Text>,
    year: u16,
) -> WipOffset<CarTable> {
    builder.start_table();
    builder.push_slot_offset(car::MAKE, make);
    builder.push_slot_offset(car::MODEL, model);
    builder.push_slot(car::YEAR, year);
    builder.end_table()
}

impl Manufacturer {
    /// Create a manufacturer
    pub fn new(name: impl Into<String>, coolness: u8) -> Self {
        Self {
            name: name.into(),
            coolness,
        }
    }

    /// Write the name and the table into `builder`
    ///
    /// # Errors
    ///
    /// Returns `FieldTooLarge` if the name exceeds the builder's text limit
    pub fn write(&self, builder: &mut Builder) -> Result<WipOffset<ManufacturerTable>> {
        let name = builder.create_string(&self.name)?;
        Ok(create_manufacturer(builder, name, self.coolness))
    }
}

impl Car {
    /// Create a car
    pub fn new(make: Manufacturer, model: impl Into<String>, year: u16) -> Self {
        Self {
            make,
            model: model.into(),
            year,
        }
    }

    /// Write the manufacturer, the model and the car table into `builder`
    ///
    /// # Errors
    ///
    /// Returns `FieldTooLarge` if any text exceeds the builder's text limit
    pub fn write(&self, builder: &mut Builder) -> Result<WipOffset<CarTable>> {
        let make = self.make.write(builder)?;
        let model = builder.create_string(&self.model)?;
        Ok(create_car(builder, make, model, self.year))
    }

    /// Encode with default settings
    ///
    /// # Errors
    ///
    /// Returns `FieldTooLarge` if any text exceeds the u32 length range
    pub fn encode(&self) -> Result<Bytes> {
        super::encode_with(&EncodeConfig::default(), self)
    }
}
