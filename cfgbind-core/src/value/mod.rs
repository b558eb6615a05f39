pub mod codec;
pub mod coerce;
pub mod field;

pub use codec::{DecodeError, TextDecode};
pub use coerce::{parse_duration, to_text, CastError, Coerce};
pub use field::Field;
