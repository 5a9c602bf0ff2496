pub mod bvalue;
pub mod decode;
pub mod encode;
pub mod error;

pub use bvalue::BValue;
pub use decode::{decode, decode_all};
pub use encode::{encode, to_json};
pub use error::BencodeError;
