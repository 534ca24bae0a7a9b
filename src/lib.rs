//! Carbuf - zero-copy binary codec for Car/Manufacturer records
//!
//! Records are written back-to-front into a single self-contained buffer and
//! read through vtable-indexed views that borrow the buffer instead of copying.
//!
//! ```
//! let buf = carbuf::encode("McCar", 22, "Nugget", 2033).unwrap();
//! let car = carbuf::decode(&buf).unwrap();
//! assert_eq!(car.model().unwrap(), "Nugget");
//! assert_eq!(car.make().unwrap().coolness().unwrap(), 22);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::multiple_crate_versions
)]

pub mod codec;
pub mod config;
pub mod error;
pub mod storage;

pub use codec::{
    buffer_identifier, decode, decode_with_identifier, encode, encode_with, verify, verify_bytes,
    Car, CarView, Manufacturer, ManufacturerView,
};
pub use error::{CarbufError, Result};
