//! Error types for TL-Pack encoding, decoding, and framing.

/// Errors that can occur while packing or unpacking TL-Pack data.
#[derive(Debug, thiserror::Error)]
pub enum TlError {
    /// Encode-side: the value matches no core constructor and no registered
    /// extension claimed it.
    #[error("unsupported value: no core constructor or extension matches")]
    UnsupportedValue,

    /// Decode-side: a reserved or unknown constructor tag.
    #[error("invalid constructor 0x{tag:02X} at offset {offset}")]
    InvalidConstructor { tag: u8, offset: usize },

    /// Decode-side underrun: the input ended before the current read. This is
    /// the only error the framing layer treats as "wait for more bytes".
    #[error("incomplete data: need {needed} bytes, {available} remaining")]
    Incomplete { needed: usize, available: usize },

    /// The encoder would have to grow past the maximum buffer size.
    #[error("packed buffer would be larger than maximum buffer size ({required} bytes required)")]
    BufferOverflow { required: usize },

    /// A length prefix beyond the 24-bit wire maximum was requested.
    #[error("length {0} exceeds the 24-bit maximum")]
    LengthOverflow(usize),

    /// An extension was constructed with a reserved or out-of-range token.
    #[error("extension token {0} is reserved or out of range")]
    InvalidToken(i32),

    /// A DictIndex referenced a word not present in the combined dictionary.
    #[error("dictionary index {0} is not present")]
    UnknownDictIndex(usize),

    /// Structurally invalid input: reserved length marker, bad UTF-8, corrupt
    /// deflate payload, or a repeat with nothing to repeat.
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TlError {
    /// True when the failure is short input rather than a grammar error.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_flag_is_exclusive() {
        assert!(TlError::Incomplete { needed: 4, available: 1 }.is_incomplete());
        assert!(!TlError::InvalidConstructor { tag: 21, offset: 0 }.is_incomplete());
        assert!(!TlError::InvalidData("bad".into()).is_incomplete());
        assert!(!TlError::UnsupportedValue.is_incomplete());
    }

    #[test]
    fn display_carries_context() {
        let e = TlError::InvalidConstructor { tag: 0x1C, offset: 7 };
        assert_eq!(e.to_string(), "invalid constructor 0x1C at offset 7");

        let e = TlError::Incomplete { needed: 8, available: 3 };
        assert_eq!(e.to_string(), "incomplete data: need 8 bytes, 3 remaining");
    }
}
