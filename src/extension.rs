//! Host-registered extension codecs.
//!
//! An extension claims values the core grammar cannot express. Its `encode`
//! hook writes arbitrary bytes through the encoder's typed writers; the
//! encoder detects that it produced output and owns the token byte in front of
//! the payload. Its `decode` hook is dispatched by that token byte and reads
//! the payload back. A fallback extension (token `-1`) is tried after all
//! token-carrying extensions and emits no token byte of its own.

use crate::codec::marker;
use crate::codec::{TlDecoder, TlEncoder};
use crate::error::TlError;
use crate::types::TlValue;

type EncodeFn = dyn Fn(&mut TlEncoder, &TlValue) -> Result<(), TlError> + Send + Sync;
type DecodeFn = dyn for<'a> Fn(&mut TlDecoder<'a>) -> Result<TlValue, TlError> + Send + Sync;

/// Token marking a fallback extension.
pub const FALLBACK_TOKEN: i32 = -1;

/// A single extension codec pair keyed by token.
pub struct TlExtension {
    token: i32,
    encode: Box<EncodeFn>,
    decode: Box<DecodeFn>,
}

impl TlExtension {
    /// Creates an extension. `token` must be `-1` (fallback) or fall in the
    /// open token range 35..=254; anything else is rejected.
    pub fn new<E, D>(token: i32, encode: E, decode: D) -> Result<Self, TlError>
    where
        E: Fn(&mut TlEncoder, &TlValue) -> Result<(), TlError> + Send + Sync + 'static,
        D: for<'a> Fn(&mut TlDecoder<'a>) -> Result<TlValue, TlError> + Send + Sync + 'static,
    {
        let in_range = (i32::from(marker::EXTENSION_MIN)..=i32::from(marker::EXTENSION_MAX))
            .contains(&token);
        if token != FALLBACK_TOKEN && !in_range {
            return Err(TlError::InvalidToken(token));
        }
        Ok(Self {
            token,
            encode: Box::new(encode),
            decode: Box::new(decode),
        })
    }

    pub fn token(&self) -> i32 {
        self.token
    }

    pub fn is_fallback(&self) -> bool {
        self.token == FALLBACK_TOKEN
    }

    /// The tag byte this extension writes ahead of its payload. Fallback
    /// extensions have none.
    pub fn token_byte(&self) -> Option<u8> {
        if self.is_fallback() {
            None
        } else {
            Some(self.token as u8)
        }
    }

    pub(crate) fn run_encode(
        &self,
        encoder: &mut TlEncoder,
        value: &TlValue,
    ) -> Result<(), TlError> {
        (self.encode)(encoder, value)
    }

    pub(crate) fn run_decode(&self, decoder: &mut TlDecoder<'_>) -> Result<TlValue, TlError> {
        (self.decode)(decoder)
    }
}

impl std::fmt::Debug for TlExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlExtension")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Registry of extensions in registration order.
#[derive(Debug, Default)]
pub struct TlExtensions {
    entries: Vec<TlExtension>,
}

impl TlExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an extension. Registration order is the encode-side dispatch
    /// order (fallbacks always after token-carrying entries).
    pub fn register(&mut self, ext: TlExtension) {
        self.entries.push(ext);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode-side dispatch: the extension registered for this tag byte.
    pub fn by_token(&self, tag: u8) -> Option<&TlExtension> {
        if tag < marker::EXTENSION_MIN {
            return None;
        }
        let token = i32::from(tag);
        self.entries.iter().find(|e| e.token == token)
    }

    /// Encode-side dispatch order: token-carrying extensions first, then
    /// fallbacks, each tier in registration order.
    pub fn dispatch_order(&self) -> impl Iterator<Item = &TlExtension> {
        let tagged = self.entries.iter().filter(|e| !e.is_fallback());
        let fallbacks = self.entries.iter().filter(|e| e.is_fallback());
        tagged.chain(fallbacks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> TlExtension {
        TlExtension::new(40, |_, _| Ok(()), |_dec: &mut TlDecoder| Ok(TlValue::Null)).unwrap()
    }

    #[test]
    fn rejects_reserved_tokens() {
        for token in [0, 16, 25, 34, 255, 300, -2] {
            let err = TlExtension::new(token, |_, _| Ok(()), |_dec: &mut TlDecoder| Ok(TlValue::Null))
                .err()
                .expect("token must be rejected");
            assert!(matches!(err, TlError::InvalidToken(t) if t == token));
        }
    }

    #[test]
    fn accepts_range_and_fallback() {
        assert!(TlExtension::new(35, |_, _| Ok(()), |_dec: &mut TlDecoder| Ok(TlValue::Null)).is_ok());
        assert!(TlExtension::new(254, |_, _| Ok(()), |_dec: &mut TlDecoder| Ok(TlValue::Null)).is_ok());
        let fb = TlExtension::new(FALLBACK_TOKEN, |_, _| Ok(()), |_dec: &mut TlDecoder| Ok(TlValue::Null)).unwrap();
        assert!(fb.is_fallback());
        assert_eq!(fb.token_byte(), None);
    }

    #[test]
    fn lookup_by_tag_byte() {
        let mut exts = TlExtensions::new();
        exts.register(noop());
        assert_eq!(exts.by_token(40).map(TlExtension::token), Some(40));
        assert!(exts.by_token(41).is_none());
        // Core tags never resolve to extensions.
        assert!(exts.by_token(16).is_none());
    }

    #[test]
    fn fallbacks_dispatch_last() {
        let mut exts = TlExtensions::new();
        exts.register(TlExtension::new(FALLBACK_TOKEN, |_, _| Ok(()), |_dec: &mut TlDecoder| Ok(TlValue::Null)).unwrap());
        exts.register(noop());
        let order: Vec<i32> = exts.dispatch_order().map(TlExtension::token).collect();
        assert_eq!(order, vec![40, FALLBACK_TOKEN]);
    }
}
