//! TL-Pack decoding: bytes → `TlValue`.

use std::io::Read;
use std::sync::Arc;

use flate2::read::DeflateDecoder;

use super::marker;
use crate::dictionary::TlDictionary;
use crate::error::TlError;
use crate::extension::TlExtensions;
use crate::types::{TlMap, TlValue};

/// Options for constructing a `TlDecoder`.
#[derive(Default)]
pub struct DecodeOptions {
    /// Pre-seeded dictionary; must be identical to the encoding peer's.
    pub dictionary: Option<Arc<TlDictionary>>,
    /// Registered extension codecs.
    pub extensions: Option<Arc<TlExtensions>>,
}

/// A draining repeat pool: how many copies of `value` remain to be yielded
/// without consuming input.
struct RepeatPool {
    pool: usize,
    value: TlValue,
}

/// Decodes TL-Pack bytes into `TlValue` trees.
///
/// The decoder borrows its input slice; dictionary state grows as DictValue
/// tags are replayed and persists for the decoder's lifetime.
pub struct TlDecoder<'a> {
    input: &'a [u8],
    offset: usize,
    last: Option<TlValue>,
    repeat: Option<RepeatPool>,
    seed: Option<Arc<TlDictionary>>,
    dict: TlDictionary,
    extensions: Arc<TlExtensions>,
}

impl<'a> TlDecoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_options(input, DecodeOptions::default())
    }

    pub fn with_options(input: &'a [u8], options: DecodeOptions) -> Self {
        let seed = options.dictionary;
        let base = seed.as_ref().map_or(0, |d| d.len());
        Self {
            input,
            offset: 0,
            last: None,
            repeat: None,
            seed,
            dict: TlDictionary::with_base(base),
            extensions: options.extensions.unwrap_or_default(),
        }
    }

    /// Re-assembles a decoder around carried-over dictionary and extension
    /// state; used by compressed sub-objects and the framing layer.
    pub(crate) fn from_parts(
        input: &'a [u8],
        seed: Option<Arc<TlDictionary>>,
        dict: TlDictionary,
        extensions: Arc<TlExtensions>,
    ) -> Self {
        Self {
            input,
            offset: 0,
            last: None,
            repeat: None,
            seed,
            dict,
            extensions,
        }
    }

    pub(crate) fn into_dictionary(self) -> TlDictionary {
        self.dict
    }

    /// Decodes one top-level value from the start of the input. Resets read
    /// position and repeat state first.
    pub fn decode(&mut self) -> Result<TlValue, TlError> {
        self.offset = 0;
        self.last = None;
        self.repeat = None;
        self.read_object()
    }

    /// Reads one tagged value at the current position.
    pub fn read_object(&mut self) -> Result<TlValue, TlError> {
        loop {
            if let Some(run) = &mut self.repeat {
                if run.pool > 0 {
                    run.pool -= 1;
                    return Ok(run.value.clone());
                }
                self.repeat = None;
            }
            let tag = self.read_byte()?;
            if tag == marker::NONE {
                // Stray terminator: transparent at this level.
                continue;
            }
            let extensions = Arc::clone(&self.extensions);
            if let Some(ext) = extensions.by_token(tag) {
                return ext.run_decode(self);
            }
            let value = self.read_core(tag)?;
            self.last = if value.is_scalar() {
                Some(value.clone())
            } else {
                None
            };
            return Ok(value);
        }
    }

    fn read_core(&mut self, tag: u8) -> Result<TlValue, TlError> {
        match tag {
            marker::BINARY => Ok(TlValue::Bytes(self.read_bytes_payload()?)),
            marker::BOOL_FALSE => Ok(TlValue::Bool(false)),
            marker::BOOL_TRUE => Ok(TlValue::Bool(true)),
            marker::NULL => Ok(TlValue::Null),
            marker::DATE => Ok(TlValue::Date(self.read_f64()?)),
            marker::VECTOR => self.read_vector(),
            marker::VECTOR_DYNAMIC => self.read_vector_dynamic(),
            marker::INT_32 => Ok(TlValue::Int(i64::from(self.read_i32()?))),
            marker::INT_16 => Ok(TlValue::Int(i64::from(self.read_i16()?))),
            marker::INT_8 => Ok(TlValue::Int(i64::from(self.read_i8()?))),
            marker::UINT_32 => Ok(TlValue::Int(i64::from(self.read_u32()?))),
            marker::UINT_16 => Ok(TlValue::Int(i64::from(self.read_u16()?))),
            marker::UINT_8 => Ok(TlValue::Int(i64::from(self.read_byte()?))),
            marker::FLOAT_32 => Ok(TlValue::Float(self.read_f32()?)),
            marker::FLOAT_64 => Ok(TlValue::Double(self.read_f64()?)),
            marker::MAP => self.read_map(),
            marker::DICT_VALUE => {
                let word = self.read_string_payload()?;
                self.dict.insert(&word);
                Ok(TlValue::Str(word))
            }
            marker::DICT_INDEX => {
                let index = self.read_length()?;
                self.resolve_word(index).map(TlValue::Str)
            }
            marker::STRING => Ok(TlValue::Str(self.read_string_payload()?)),
            marker::REPEAT => self.read_repeat(),
            marker::GZIP => self.read_gzip(),
            other => Err(TlError::InvalidConstructor {
                tag: other,
                offset: self.offset - 1,
            }),
        }
    }

    /// Reads a Vector payload (after its tag byte): a length prefix followed
    /// by exactly that many values.
    pub fn read_vector(&mut self) -> Result<TlValue, TlError> {
        let len = self.read_length()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.read_object()?);
        }
        Ok(TlValue::List(items))
    }

    /// Reads a dynamic Vector payload: values until the terminator tag.
    pub fn read_vector_dynamic(&mut self) -> Result<TlValue, TlError> {
        let mut items = Vec::new();
        loop {
            // Drain any pending repeat pool before looking at the next tag.
            if self.pending_repeat() {
                items.push(self.read_object()?);
                continue;
            }
            let tag = self.read_byte()?;
            if tag == marker::NONE {
                return Ok(TlValue::List(items));
            }
            self.seek(-1)?;
            items.push(self.read_object()?);
        }
    }

    /// Reads a Map payload: (dictionary key, value) pairs until the
    /// terminator.
    pub fn read_map(&mut self) -> Result<TlValue, TlError> {
        let mut map = TlMap::new();
        while let Some(key) = self.read_dictionary()? {
            let value = self.read_object()?;
            map.insert(key, value);
        }
        Ok(TlValue::Map(map))
    }

    /// Reads one dictionary key. `None` means the terminator was consumed; a
    /// non-dictionary tag is left in place and also ends the key sequence.
    pub fn read_dictionary(&mut self) -> Result<Option<String>, TlError> {
        match self.read_byte()? {
            marker::NONE => Ok(None),
            marker::DICT_INDEX => {
                let index = self.read_length()?;
                self.resolve_word(index).map(Some)
            }
            marker::DICT_VALUE => {
                let word = self.read_string_payload()?;
                self.dict.insert(&word);
                Ok(Some(word))
            }
            _ => {
                self.seek(-1)?;
                Ok(None)
            }
        }
    }

    fn read_repeat(&mut self) -> Result<TlValue, TlError> {
        let count = self.read_length()?;
        let value = self
            .last
            .clone()
            .ok_or_else(|| TlError::InvalidData("repeat with no preceding scalar".into()))?;
        if count > 1 {
            self.repeat = Some(RepeatPool {
                pool: count - 1,
                value: value.clone(),
            });
        }
        Ok(value)
    }

    fn read_gzip(&mut self) -> Result<TlValue, TlError> {
        let len = self.read_length()?;
        let compressed = self.take(len)?;
        let inflated = inflate(compressed)?;
        let mut sub = TlDecoder::from_parts(
            &inflated,
            self.seed.clone(),
            std::mem::take(&mut self.dict),
            Arc::clone(&self.extensions),
        );
        let result = sub.read_object();
        self.dict = sub.into_dictionary();
        match result {
            // The compressed payload was fully present, so a short read inside
            // it is corruption rather than recoverable underrun.
            Err(TlError::Incomplete { .. }) => Err(TlError::InvalidData(
                "truncated value inside compressed sub-object".into(),
            )),
            other => other,
        }
    }

    fn resolve_word(&self, index: usize) -> Result<String, TlError> {
        let word = match &self.seed {
            Some(seed) => seed.word_at(index).or_else(|| self.dict.word_at(index)),
            None => self.dict.word_at(index),
        };
        word.map(str::to_owned)
            .ok_or(TlError::UnknownDictIndex(index))
    }

    fn pending_repeat(&self) -> bool {
        self.repeat.as_ref().is_some_and(|run| run.pool > 0)
    }

    // -- Typed value readers --

    /// Reads a full tagged value and requires it to be a boolean.
    pub fn read_bool(&mut self) -> Result<bool, TlError> {
        match self.read_object()? {
            TlValue::Bool(b) => Ok(b),
            other => Err(TlError::InvalidData(format!("expected bool, got: {other}"))),
        }
    }

    /// Reads a full tagged value and requires it to be a date, returning
    /// seconds since the Unix epoch.
    pub fn read_date(&mut self) -> Result<f64, TlError> {
        match self.read_object()? {
            TlValue::Date(seconds) => Ok(seconds),
            other => Err(TlError::InvalidData(format!("expected date, got: {other}"))),
        }
    }

    /// Reads a full tagged value and requires it to be null.
    pub fn read_null(&mut self) -> Result<(), TlError> {
        match self.read_object()? {
            TlValue::Null => Ok(()),
            other => Err(TlError::InvalidData(format!("expected null, got: {other}"))),
        }
    }

    // -- Length-prefixed payload readers --

    /// Reads a length prefix: one byte below 254, the 254 sentinel plus a
    /// little-endian 24-bit length above, 255 rejected.
    pub fn read_length(&mut self) -> Result<usize, TlError> {
        match self.read_byte()? {
            marker::LENGTH_RESERVED => {
                Err(TlError::InvalidData("reserved length marker 0xFF".into()))
            }
            marker::LENGTH_EXTENDED => {
                let b = self.take_array::<3>()?;
                Ok(usize::from(b[0]) | usize::from(b[1]) << 8 | usize::from(b[2]) << 16)
            }
            byte => Ok(usize::from(byte)),
        }
    }

    pub fn read_string_payload(&mut self) -> Result<String, TlError> {
        let len = self.read_length()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| TlError::InvalidData(format!("invalid UTF-8 string: {e}")))
    }

    pub fn read_bytes_payload(&mut self) -> Result<Vec<u8>, TlError> {
        let len = self.read_length()?;
        Ok(self.take(len)?.to_vec())
    }

    // -- Raw little-endian readers --

    pub fn read_byte(&mut self) -> Result<u8, TlError> {
        self.ensure_remaining(1)?;
        let byte = self.input[self.offset];
        self.offset += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16, TlError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, TlError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i8(&mut self) -> Result<i8, TlError> {
        Ok(self.read_byte()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, TlError> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, TlError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, TlError> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, TlError> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    // -- Positioning --

    pub fn tell_position(&self) -> usize {
        self.offset
    }

    pub fn set_position(&mut self, position: usize) -> Result<(), TlError> {
        if position > self.input.len() {
            return Err(TlError::InvalidData(format!(
                "position {position} past end of input"
            )));
        }
        self.offset = position;
        Ok(())
    }

    pub fn seek(&mut self, delta: isize) -> Result<(), TlError> {
        let target = self.offset as isize + delta;
        if target < 0 || target as usize > self.input.len() {
            return Err(TlError::InvalidData(format!("seek out of bounds: {delta}")));
        }
        self.offset = target as usize;
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.offset
    }

    fn ensure_remaining(&self, needed: usize) -> Result<(), TlError> {
        let available = self.remaining();
        if available < needed {
            Err(TlError::Incomplete { needed, available })
        } else {
            Ok(())
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TlError> {
        self.ensure_remaining(n)?;
        let slice = &self.input[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], TlError> {
        self.ensure_remaining(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.input[self.offset..self.offset + N]);
        self.offset += N;
        Ok(out)
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, TlError> {
    let mut out = Vec::new();
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| TlError::InvalidData(format!("corrupt deflate payload: {e}")))?;
    Ok(out)
}
