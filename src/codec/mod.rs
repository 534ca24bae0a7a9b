//! Binary record codec
//!
//! Layout (little-endian):
//!
//! - bytes `0..4`: u32 root offset, measured from byte 4
//! - bytes `4..8`: optional file identifier
//! - tables: i32 soffset back to the vtable, then inline slots
//! - vtables: u16 vtable length, u16 table length, one u16 offset per slot (0 = absent)
//! - text: u32 length, UTF-8 bytes, one zero byte
//!
//! Offsets stored inside tables are relative to the field that holds them.

mod builder;
pub mod format;
mod record;
mod table;
mod view;

pub use builder::{
    Builder, CarTable, ManufacturerTable, Text, WipOffset, DEFAULT_CAPACITY, MAX_INITIAL_CAPACITY,
};
pub use format::{FILE_IDENTIFIER_LEN, MIN_BUFFER_SIZE, ROOT_BASE};
pub use record::{create_car, create_manufacturer, Car, Manufacturer};
pub use table::{read_bytes, read_scalar, Table};
pub use view::{CarView, ManufacturerView};

use bytes::Bytes;

use crate::config::EncodeConfig;
use crate::{CarbufError, Result};

/// Encode a car and its manufacturer into a new buffer
///
/// # Errors
///
/// Returns `FieldTooLarge` if either text exceeds the u32 length range
pub fn encode(make_name: &str, coolness: u8, model: &str, year: u16) -> Result<Bytes> {
    let mut builder = Builder::new();
    let name = builder.create_string(make_name)?;
    let make = create_manufacturer(&mut builder, name, coolness);
    let model = builder.create_string(model)?;
    let car = create_car(&mut builder, make, model, year);
    Ok(builder.finish(car, None))
}

/// Encode a car using the capacity, text limit and identifier from `config`
///
/// # Errors
///
/// Returns `FieldTooLarge` if any text exceeds the limit, or `ConfigError`
/// if the configured file identifier is not 4 bytes
pub fn encode_with(config: &EncodeConfig, car: &Car) -> Result<Bytes> {
    let identifier = config.identifier()?;
    let mut builder =
        Builder::with_capacity(config.initial_capacity).with_max_text_len(config.max_text_len);
    let root = car.write(&mut builder)?;
    Ok(builder.finish(root, identifier))
}

/// Locate the root `Car` table of `buf`
///
/// Only the root offset and the root table header are checked here; each
/// accessor checks the bytes it reads.
///
/// # Errors
///
/// Returns `MalformedBuffer` if `buf` is shorter than `MIN_BUFFER_SIZE`, or
/// `OffsetOutOfRange` if the root table does not fit
pub fn decode(buf: &[u8]) -> Result<CarView<'_>> {
    if buf.len() < MIN_BUFFER_SIZE {
        return Err(CarbufError::MalformedBuffer { len: buf.len() });
    }

    let root: u32 = read_scalar(buf, 0)?;
    let position = ROOT_BASE
        .checked_add(root as usize)
        .ok_or(CarbufError::OffsetOutOfRange {
            offset: ROOT_BASE,
            len: root as usize,
            buffer_len: buf.len(),
        })?;

    Table::at(buf, position, format::car::TABLE).map(CarView::new)
}

/// Decode after checking the file identifier at bytes 4..8
///
/// # Errors
///
/// Returns `IdentifierMismatch` if the identifier differs, plus any `decode` error
pub fn decode_with_identifier(
    buf: &[u8],
    expected: [u8; FILE_IDENTIFIER_LEN],
) -> Result<CarView<'_>> {
    if buf.len() < MIN_BUFFER_SIZE {
        return Err(CarbufError::MalformedBuffer { len: buf.len() });
    }

    if let Some(found) = buffer_identifier(buf) {
        if found != expected {
            return Err(CarbufError::IdentifierMismatch { expected, found });
        }
    }

    decode(buf)
}

/// The four bytes where a file identifier would be stored
///
/// Buffers written without an identifier hold other data there, so this is
/// only meaningful when the writer is known to use one.
pub fn buffer_identifier(buf: &[u8]) -> Option<[u8; FILE_IDENTIFIER_LEN]> {
    buf.get(ROOT_BASE..ROOT_BASE + FILE_IDENTIFIER_LEN)
        .and_then(|bytes| bytes.try_into().ok())
}

/// Decode and read every field once, strict UTF-8 included
///
/// # Errors
///
/// Returns the first error any field reports
pub fn verify(buf: &[u8]) -> Result<()> {
    let car = decode(buf)?;
    car.model()?;
    car.year()?;
    let make = car.make()?;
    make.name()?;
    make.coolness()?;
    Ok(())
}

/// Decode and read every field once, passing text bytes through unchecked
///
/// Catches every bounds and missing-field error `verify` does, but accepts
/// text that is not valid UTF-8.
///
/// # Errors
///
/// Returns the first error any field reports
pub fn verify_bytes(buf: &[u8]) -> Result<()> {
    let car = decode(buf)?;
    car.model_bytes()?;
    car.year()?;
    let make = car.make()?;
    make.name_bytes()?;
    make.coolness()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::format::{car, manufacturer};
    use super::*;

    #[test]
    fn test_scenario_mccar() {
        let buf = encode("McCar", 22, "Nugget", 2033).unwrap();
        let car = decode(&buf).unwrap();

        assert_eq!(car.model().unwrap(), "Nugget");
        assert_eq!(car.year().unwrap(), 2033);
        let make = car.make().unwrap();
        assert_eq!(make.name().unwrap(), "McCar");
        assert_eq!(make.coolness().unwrap(), 22);
    }

    #[test]
    fn test_scenario_car_king() {
        let buf = encode("Car King", 43, "Flopper", 2032).unwrap();
        let car = decode(&buf).unwrap();

        assert_eq!(car.model().unwrap(), "Flopper");
        assert_eq!(car.year().unwrap(), 2032);
        let make = car.make().unwrap();
        assert_eq!(make.name().unwrap(), "Car King");
        assert_eq!(make.coolness().unwrap(), 43);
    }

    #[test]
    fn test_truncated_to_three_bytes() {
        let buf = encode("McCar", 22, "Nugget", 2033).unwrap();
        assert!(matches!(
            decode(&buf[..3]),
            Err(CarbufError::MalformedBuffer { len: 3 })
        ));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let first = encode("McCar", 22, "Nugget", 2033).unwrap();
        let second = encode("McCar", 22, "Nugget", 2033).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_free_function_matches_value_struct() {
        let car = Car::new(Manufacturer::new("McCar", 22), "Nugget", 2033);
        assert_eq!(
            car.encode().unwrap(),
            encode("McCar", 22, "Nugget", 2033).unwrap()
        );
    }

    #[test]
    fn test_text_is_borrowed_from_buffer() {
        let buf = encode("McCar", 22, "Nugget", 2033).unwrap();
        let model = decode(&buf).unwrap().model().unwrap();

        let start = buf.as_ptr() as usize;
        let at = model.as_ptr() as usize;
        assert!(at >= start && at + model.len() <= start + buf.len());
        // terminator after the text, not counted in its length
        assert_eq!(buf[at - start + model.len()], 0);
    }

    #[test]
    fn test_multibyte_text() {
        let buf = encode("Citroën ☃", 1, "車", 1999).unwrap();
        let car = decode(&buf).unwrap();
        assert_eq!(car.model().unwrap(), "車");
        assert_eq!(car.model_bytes().unwrap(), "車".as_bytes());
        assert_eq!(car.make().unwrap().name().unwrap(), "Citroën ☃");
    }

    #[test]
    fn test_empty_text() {
        let buf = encode("", 0, "", 0).unwrap();
        let car = decode(&buf).unwrap().to_car().unwrap();
        assert_eq!(car, Car::new(Manufacturer::new("", 0), "", 0));
    }

    #[test]
    fn test_missing_year_is_reported() {
        let mut builder = Builder::new();
        let name = builder.create_string("Old Works").unwrap();
        let make = create_manufacturer(&mut builder, name, 5);
        let model = builder.create_string("Relic").unwrap();
        builder.start_table();
        builder.push_slot_offset(car::MAKE, make);
        builder.push_slot_offset(car::MODEL, model);
        let root = builder.end_table::<CarTable>();
        let buf = builder.finish(root, None);

        let car = decode(&buf).unwrap();
        assert_eq!(car.model().unwrap(), "Relic");
        assert!(matches!(
            car.year(),
            Err(CarbufError::MissingRequiredField {
                table: "Car",
                field: "year"
            })
        ));
        assert!(verify(&buf).is_err());
    }

    #[test]
    fn test_newer_writer_with_extra_slot() {
        let mut builder = Builder::new();
        let name = builder.create_string("Future Motors").unwrap();
        builder.start_table();
        builder.push_slot_offset(manufacturer::NAME, name);
        builder.push_slot(manufacturer::COOLNESS, 99u8);
        builder.push_slot(format::Slot::new(2, "founded"), 1901u16);
        let make = builder.end_table::<ManufacturerTable>();
        let model = builder.create_string("Hover").unwrap();
        builder.start_table();
        builder.push_slot(car::YEAR, 2099u16);
        builder.push_slot_offset(car::MODEL, model);
        builder.push_slot_offset(car::MAKE, make);
        builder.push_slot(format::Slot::new(5, "range_km"), 800u32);
        let root = builder.end_table::<CarTable>();
        let buf = builder.finish(root, None);

        let car = decode(&buf).unwrap();
        assert_eq!(car.year().unwrap(), 2099);
        assert_eq!(car.model().unwrap(), "Hover");
        assert_eq!(car.make().unwrap().name().unwrap(), "Future Motors");
        assert_eq!(car.make().unwrap().coolness().unwrap(), 99);
        verify(&buf).unwrap();
    }

    #[test]
    fn test_invalid_utf8_is_strict_and_lenient() {
        let mut builder = Builder::new();
        let name = builder.create_string("Bytes Inc").unwrap();
        let make = create_manufacturer(&mut builder, name, 1);
        let model = builder.create_text_bytes(&[0x66, 0xff, 0x6f]).unwrap();
        let root = create_car(&mut builder, make, model, 2000);
        let buf = builder.finish(root, None);

        let car = decode(&buf).unwrap();
        assert!(matches!(car.model(), Err(CarbufError::InvalidText { .. })));
        assert_eq!(car.model_bytes().unwrap(), &[0x66, 0xff, 0x6f]);
        assert!(matches!(verify(&buf), Err(CarbufError::InvalidText { .. })));
        verify_bytes(&buf).unwrap();
    }

    #[test]
    fn test_verify_bytes_still_checks_bounds() {
        let buf = encode("Car King", 43, "Flopper", 2032).unwrap();
        assert!(matches!(
            verify_bytes(&buf[..buf.len() - 5]),
            Err(CarbufError::OffsetOutOfRange { .. })
        ));
        assert!(matches!(
            verify_bytes(&buf[..3]),
            Err(CarbufError::MalformedBuffer { len: 3 })
        ));
    }

    #[test]
    fn test_every_truncation_fails_cleanly() {
        let buf = encode("Car King", 43, "Flopper", 2032).unwrap();
        let original = decode(&buf).unwrap().to_car().unwrap();

        // trailing terminator and padding are never read, so short cuts can still decode
        for len in 0..buf.len() {
            match decode(&buf[..len]).and_then(|car| car.to_car()) {
                Ok(car) => assert_eq!(car, original, "truncated to {len} bytes"),
                Err(err) => assert!(
                    matches!(
                        err,
                        CarbufError::MalformedBuffer { .. } | CarbufError::OffsetOutOfRange { .. }
                    ),
                    "truncated to {len} bytes: {err}"
                ),
            }
        }

        // cutting into the manufacturer name, the first thing written
        assert!(verify(&buf[..buf.len() - 5]).is_err());
    }

    #[test]
    fn test_corrupt_root_offset() {
        let mut buf = encode("McCar", 22, "Nugget", 2033).unwrap().to_vec();
        buf[..4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            decode(&buf),
            Err(CarbufError::OffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn test_corrupt_text_length() {
        let buf = encode("McCar", 22, "Nugget", 2033).unwrap();
        let model = decode(&buf).unwrap().model().unwrap();
        let start = model.as_ptr() as usize - buf.as_ptr() as usize;

        let mut corrupt = buf.to_vec();
        corrupt[start - 4..start].copy_from_slice(&1_000_000u32.to_le_bytes());
        let car = decode(&corrupt).unwrap();
        assert!(matches!(
            car.model(),
            Err(CarbufError::OffsetOutOfRange { .. })
        ));
        // other fields are unaffected
        assert_eq!(car.year().unwrap(), 2033);
    }

    #[test]
    fn test_file_identifier() {
        let config = EncodeConfig {
            file_identifier: Some("CARS".to_string()),
            ..EncodeConfig::default()
        };
        let car = Car::new(Manufacturer::new("McCar", 22), "Nugget", 2033);
        let buf = encode_with(&config, &car).unwrap();

        assert_eq!(buffer_identifier(&buf), Some(*b"CARS"));
        let view = decode_with_identifier(&buf, *b"CARS").unwrap();
        assert_eq!(view.to_car().unwrap(), car);
        assert!(matches!(
            decode_with_identifier(&buf, *b"VANS"),
            Err(CarbufError::IdentifierMismatch {
                expected: [b'V', b'A', b'N', b'S'],
                found: [b'C', b'A', b'R', b'S'],
            })
        ));
    }

    #[test]
    fn test_text_limit_from_config() {
        let config = EncodeConfig {
            max_text_len: 3,
            ..EncodeConfig::default()
        };
        let car = Car::new(Manufacturer::new("VW", 1), "Beetle", 1938);
        assert!(matches!(
            encode_with(&config, &car),
            Err(CarbufError::FieldTooLarge { size: 6, limit: 3 })
        ));
    }
}
