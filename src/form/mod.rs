//! Incremental form field parsers
//!
//! Each parser is fed the bytes of one multipart part through `execute`,
//! in as many chunks as the tokenizer produces, and its result is read once
//! the caller decides the part has ended. Parsing is lenient: bytes that do
//! not fit the expected shape are skipped, never reported.

pub mod boolean;
pub mod coord;
pub mod form_data;
pub mod numeric;
pub mod string;

pub use boolean::BoolParser;
pub use coord::CoordParser;
pub use form_data::FormDataParser;
pub use numeric::NumericParser;
pub use string::StringParser;
