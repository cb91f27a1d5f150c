//! TL-Pack constructor tag bytes and buffer limits.

// Terminator for Map and dynamic Vector; transparent at top level.
pub const NONE: u8 = 0;

// Length-prefixed raw bytes.
pub const BINARY: u8 = 1;

// Boolean (the tag alone carries the value).
pub const BOOL_FALSE: u8 = 2;
pub const BOOL_TRUE: u8 = 3;

pub const NULL: u8 = 4;

// 8-byte little-endian IEEE-754 double, seconds since the Unix epoch.
pub const DATE: u8 = 5;

// Length-prefixed element count, then that many values.
pub const VECTOR: u8 = 6;
// Values until a NONE tag.
pub const VECTOR_DYNAMIC: u8 = 7;

// Integers, little-endian, two's complement for the signed forms.
pub const INT_32: u8 = 8;
pub const INT_16: u8 = 9;
pub const INT_8: u8 = 10;
pub const UINT_32: u8 = 11;
pub const UINT_16: u8 = 12;
pub const UINT_8: u8 = 13;

// IEEE-754, little-endian.
pub const FLOAT_32: u8 = 14;
pub const FLOAT_64: u8 = 15;

// Sequence of (dictionary key, value) pairs until a NONE tag.
pub const MAP: u8 = 16;

// Dictionary wire forms: DICT_VALUE registers a new word, DICT_INDEX refers
// to a previously registered (or seeded) word by 1-based combined index.
pub const DICT_VALUE: u8 = 17;
pub const DICT_INDEX: u8 = 18;

// Length-prefixed UTF-8 bytes.
pub const STRING: u8 = 19;

// Length-prefixed count of additional repetitions of the last scalar.
pub const REPEAT: u8 = 20;

// Codes 21-24 and 26-34 are reserved and rejected on decode.

// Length-prefixed raw-deflate payload that decodes to one complete value.
pub const GZIP: u8 = 25;

// Extension token range. Token -1 marks a fallback extension, which emits no
// token byte at all.
pub const EXTENSION_MIN: u8 = 35;
pub const EXTENSION_MAX: u8 = 254;

/// Strings of at most this many characters are routed through the dictionary.
pub const SHORT_STRING_MAX: usize = 16;

/// Length-prefix sentinel: the next 3 bytes are a little-endian 24-bit length.
pub const LENGTH_EXTENDED: u8 = 254;
/// Reserved length-prefix byte, rejected on decode.
pub const LENGTH_RESERVED: u8 = 255;
/// Largest encodable length (24-bit).
pub const MAX_LENGTH: usize = 0x00FF_FFFF;

/// Initial encoder buffer capacity.
pub const INITIAL_BUFFER_SIZE: usize = 8 * 1024;

/// Headroom reserved ahead of each value write: one tag byte plus the widest
/// fixed payload or length prefix.
pub const WRITE_HEADROOM: usize = 10;

/// Hard ceiling on the encoder buffer.
#[cfg(target_pointer_width = "64")]
pub const MAX_BUFFER_SIZE: usize = 4 * 1024 * 1024 * 1024;
#[cfg(not(target_pointer_width = "64"))]
pub const MAX_BUFFER_SIZE: usize = 0x7FFF_F000;

/// Returns true for tag bytes that no core or extension constructor may use.
pub fn is_reserved(tag: u8) -> bool {
    matches!(tag, 21..=24 | 26..=34 | 255)
}
