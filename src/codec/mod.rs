//! TL-Pack binary encoding format.
//!
//! TL-Pack is a self-describing, constructor-tagged binary presentation
//! format. It uses little-endian byte ordering exclusively and interns map
//! keys and short strings through a shared dictionary.

pub mod decode;
pub mod encode;
pub mod marker;

pub use decode::{DecodeOptions, TlDecoder};
pub use encode::{EncodeOptions, TlEncoder};

use crate::error::TlError;
use crate::types::TlValue;

/// Encodes one value with a fresh encoder and returns owned bytes.
pub fn encode_value(value: &TlValue) -> Result<Vec<u8>, TlError> {
    let mut encoder = TlEncoder::new();
    Ok(encoder.encode(value)?.to_vec())
}

/// Decodes one value from the start of `bytes` with a fresh decoder.
pub fn decode_value(bytes: &[u8]) -> Result<TlValue, TlError> {
    TlDecoder::new(bytes).decode()
}
