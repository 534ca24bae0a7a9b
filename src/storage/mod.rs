//! Record files: one encoded buffer per file

mod reader;
mod writer;

pub use reader::CarFile;
pub use writer::{write_buffer, write_car};
