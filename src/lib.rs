//! TL-Pack — a compact, self-describing binary serialization format.
//!
//! TL-Pack converts dynamically-typed value trees (booleans, null, integers,
//! floats, dates, byte strings, UTF-8 strings, sequences, and string-keyed
//! maps) into a constructor-tagged little-endian byte stream and back. Beyond
//! the base encoding it interns map keys and short strings through a shared
//! dictionary, collapses immediately-repeated scalars into repeat runs, and
//! can deflate-compress string values as embedded sub-objects.
//!
//! # Architecture
//!
//! - **`codec`** — Binary encoding/decoding (`TlEncoder`, `TlDecoder`)
//! - **`dictionary`** — String interning table shared between the two sides
//! - **`extension`** — Host-registered custom codecs dispatched by token byte
//! - **`frame`** — Async stream framing with partial-frame recovery
//! - **`types`** — The `TlValue` data model
//!
//! # Example
//!
//! ```
//! use tlpack::{decode_value, encode_value, TlValue};
//!
//! let bytes = encode_value(&TlValue::from("hello")).unwrap();
//! assert_eq!(decode_value(&bytes).unwrap(), TlValue::from("hello"));
//! ```

pub mod codec;
pub mod dictionary;
pub mod error;
pub mod extension;
pub mod frame;
pub mod types;

pub use codec::{decode_value, encode_value, DecodeOptions, EncodeOptions, TlDecoder, TlEncoder};
pub use dictionary::TlDictionary;
pub use error::TlError;
pub use extension::{TlExtension, TlExtensions, FALLBACK_TOKEN};
pub use frame::{FrameReader, FrameWriter};
pub use types::{TlCustom, TlMap, TlValue};
