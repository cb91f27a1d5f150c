//! TL-Pack encoding: `TlValue` → bytes.

use std::io::Write;
use std::sync::Arc;

use flate2::write::DeflateEncoder;
use flate2::Compression;

use super::marker;
use crate::dictionary::TlDictionary;
use crate::error::TlError;
use crate::extension::TlExtensions;
use crate::types::{TlMap, TlValue};

/// Options for constructing a `TlEncoder`.
#[derive(Default)]
pub struct EncodeOptions {
    /// Compress string values as deflate sub-objects.
    pub gzip: bool,
    /// Pre-seeded dictionary, shared out-of-band with the decoding peer.
    pub dictionary: Option<Arc<TlDictionary>>,
    /// Registered extension codecs.
    pub extensions: Option<Arc<TlExtensions>>,
}

/// An open repeat run: the offset of its count prefix and the current count.
struct RepeatRun {
    at: usize,
    count: usize,
}

/// Encodes `TlValue` trees into TL-Pack bytes.
///
/// The encoder owns a growable buffer that is reused across `encode` calls;
/// the returned slice is valid until the next call. Dictionary state persists
/// for the lifetime of the encoder, so repeated keys and short strings across
/// calls shrink to index references.
pub struct TlEncoder {
    buf: Vec<u8>,
    last: Option<TlValue>,
    repeat: Option<RepeatRun>,
    seed: Option<Arc<TlDictionary>>,
    dict: TlDictionary,
    extensions: Arc<TlExtensions>,
    gzip: bool,
}

impl Default for TlEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TlEncoder {
    pub fn new() -> Self {
        Self::with_options(EncodeOptions::default())
    }

    pub fn with_options(options: EncodeOptions) -> Self {
        let seed = options.dictionary;
        let base = seed.as_ref().map_or(0, |d| d.len());
        Self {
            buf: Vec::with_capacity(marker::INITIAL_BUFFER_SIZE),
            last: None,
            repeat: None,
            seed,
            dict: TlDictionary::with_base(base),
            extensions: options.extensions.unwrap_or_default(),
            gzip: options.gzip,
        }
    }

    /// Encodes one value and returns the written bytes. Resets the buffer and
    /// repeat state first; the slice is valid until the next `encode` call.
    pub fn encode(&mut self, value: &TlValue) -> Result<&[u8], TlError> {
        self.buf.clear();
        self.last = None;
        self.repeat = None;
        self.write_object(value)?;
        Ok(&self.buf)
    }

    /// The bytes written so far. Useful when driving the typed writers
    /// directly rather than through `encode`.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Writes one tagged value, applying repeat collapsing and extension
    /// dispatch.
    pub fn write_object(&mut self, value: &TlValue) -> Result<(), TlError> {
        self.ensure(marker::WRITE_HEADROOM)?;
        if let TlValue::Custom(_) = value {
            return self.write_extension(value);
        }
        if value.is_scalar() && self.last.as_ref() == Some(value) {
            return self.write_repeat();
        }
        self.last = if value.is_scalar() {
            Some(value.clone())
        } else {
            None
        };
        self.repeat = None;
        self.write_core(value)
    }

    fn write_core(&mut self, value: &TlValue) -> Result<(), TlError> {
        match value {
            TlValue::Null => {
                self.write_null();
                Ok(())
            }
            TlValue::Bool(b) => {
                self.write_bool(*b);
                Ok(())
            }
            TlValue::Int(n) => self.write_int(*n),
            TlValue::Float(x) => {
                self.write_float(*x);
                Ok(())
            }
            TlValue::Double(x) => {
                self.write_double(*x);
                Ok(())
            }
            TlValue::Date(secs) => {
                self.write_date(*secs);
                Ok(())
            }
            TlValue::Bytes(data) => self.write_bytes(data),
            TlValue::Str(s) => {
                if self.gzip {
                    self.write_deflate(value)
                } else {
                    self.write_string(s)
                }
            }
            TlValue::List(items) => self.write_vector(items),
            TlValue::Map(map) => self.write_map(map),
            TlValue::Custom(_) => self.write_extension(value),
        }
    }

    // -- Tagged writers --

    pub fn write_null(&mut self) {
        self.write_byte(marker::NULL);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_byte(if value {
            marker::BOOL_TRUE
        } else {
            marker::BOOL_FALSE
        });
    }

    /// Writes an integer using the narrowest constructor, preferring unsigned.
    /// Integers outside the 32-bit ranges travel as Double.
    pub fn write_int(&mut self, value: i64) -> Result<(), TlError> {
        if (0..=0xFF).contains(&value) {
            self.write_byte(marker::UINT_8);
            self.write_byte(value as u8);
        } else if (0..=0xFFFF).contains(&value) {
            self.write_byte(marker::UINT_16);
            self.write_u16(value as u16);
        } else if (0..=0xFFFF_FFFF).contains(&value) {
            self.write_byte(marker::UINT_32);
            self.write_u32(value as u32);
        } else if (i64::from(i8::MIN)..0).contains(&value) {
            self.write_byte(marker::INT_8);
            self.write_byte((value as i8) as u8);
        } else if (i64::from(i16::MIN)..0).contains(&value) {
            self.write_byte(marker::INT_16);
            self.write_i16(value as i16);
        } else if (i64::from(i32::MIN)..0).contains(&value) {
            self.write_byte(marker::INT_32);
            self.write_i32(value as i32);
        } else {
            self.write_double(value as f64);
        }
        Ok(())
    }

    pub fn write_float(&mut self, value: f32) {
        self.write_byte(marker::FLOAT_32);
        self.write_f32(value);
    }

    pub fn write_double(&mut self, value: f64) {
        self.write_byte(marker::FLOAT_64);
        self.write_f64(value);
    }

    /// Writes a date as seconds since the Unix epoch.
    pub fn write_date(&mut self, seconds: f64) {
        self.write_byte(marker::DATE);
        self.write_f64(seconds);
    }

    /// Writes a string. Short strings are routed through the dictionary so a
    /// second occurrence costs one index reference.
    pub fn write_string(&mut self, value: &str) -> Result<(), TlError> {
        if value.chars().count() <= marker::SHORT_STRING_MAX {
            return self.write_dictionary(value);
        }
        self.ensure(value.len() + 5)?;
        self.write_byte(marker::STRING);
        self.write_length(value.len())?;
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), TlError> {
        self.ensure(data.len() + 5)?;
        self.write_byte(marker::BINARY);
        self.write_length(data.len())?;
        self.buf.extend_from_slice(data);
        Ok(())
    }

    pub fn write_vector(&mut self, items: &[TlValue]) -> Result<(), TlError> {
        self.write_byte(marker::VECTOR);
        self.write_length(items.len())?;
        for item in items {
            self.write_object(item)?;
        }
        Ok(())
    }

    pub fn write_map(&mut self, map: &TlMap) -> Result<(), TlError> {
        self.write_byte(marker::MAP);
        for (key, value) in map {
            self.write_dictionary(key)?;
            self.write_object(value)?;
        }
        self.write_byte(marker::NONE);
        Ok(())
    }

    /// Writes a word through the dictionary: DictIndex on a hit in the seed or
    /// extended tier, DictValue (registering the word) on a miss.
    pub fn write_dictionary(&mut self, word: &str) -> Result<(), TlError> {
        // Dictionary bytes land after any open run's count prefix, so the run
        // must close here; an equal scalar after the key opens a fresh run.
        self.repeat = None;
        if let Some(index) = self.lookup_word(word) {
            self.write_byte(marker::DICT_INDEX);
            self.write_length(index)
        } else {
            self.dict.insert(word);
            self.ensure(word.len() + 5)?;
            self.write_byte(marker::DICT_VALUE);
            self.write_length(word.len())?;
            self.buf.extend_from_slice(word.as_bytes());
            Ok(())
        }
    }

    /// Opens a dynamic vector; the caller writes arbitrary objects and closes
    /// it with `end_dynamic_vector`. Nestable.
    pub fn begin_dynamic_vector(&mut self) -> Result<(), TlError> {
        self.ensure(marker::WRITE_HEADROOM)?;
        self.repeat = None;
        self.write_byte(marker::VECTOR_DYNAMIC);
        Ok(())
    }

    pub fn end_dynamic_vector(&mut self) -> Result<(), TlError> {
        self.ensure(1)?;
        self.repeat = None;
        self.write_byte(marker::NONE);
        Ok(())
    }

    /// Writes a length prefix: one byte below 254, otherwise the 254 sentinel
    /// followed by a little-endian 24-bit length.
    pub fn write_length(&mut self, len: usize) -> Result<(), TlError> {
        if len > marker::MAX_LENGTH {
            return Err(TlError::LengthOverflow(len));
        }
        if len < usize::from(marker::LENGTH_EXTENDED) {
            self.write_byte(len as u8);
        } else {
            self.write_byte(marker::LENGTH_EXTENDED);
            let bytes = (len as u32).to_le_bytes();
            self.buf.extend_from_slice(&bytes[..3]);
        }
        Ok(())
    }

    // -- Raw little-endian writers (extension building blocks) --

    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    // -- Repeat runs --

    fn write_repeat(&mut self) -> Result<(), TlError> {
        if let Some(run) = &mut self.repeat {
            run.count += 1;
            let (at, count) = (run.at, run.count);
            // The count prefix sits at the end of the buffer while the run is
            // open, so rewriting it (even 1 -> 4 bytes wide) is a truncate.
            self.buf.truncate(at);
            self.write_length(count)
        } else {
            self.write_byte(marker::REPEAT);
            let at = self.buf.len();
            self.repeat = Some(RepeatRun { at, count: 1 });
            self.write_length(1)
        }
    }

    // -- Extension dispatch --

    fn write_extension(&mut self, value: &TlValue) -> Result<(), TlError> {
        // Close any open repeat run: its count prefix must not be rewritten
        // once extension bytes follow it.
        self.repeat = None;
        let extensions = Arc::clone(&self.extensions);
        for ext in extensions.dispatch_order() {
            let start = self.buf.len();
            if let Some(byte) = ext.token_byte() {
                self.write_byte(byte);
            }
            let mark = self.buf.len();
            ext.run_encode(self, value)?;
            if self.buf.len() > mark {
                return Ok(());
            }
            // Produced nothing: drop the token byte and try the next one.
            self.buf.truncate(start);
        }
        Err(TlError::UnsupportedValue)
    }

    // -- Compressed sub-objects --

    fn write_deflate(&mut self, value: &TlValue) -> Result<(), TlError> {
        // Re-enter on a fresh buffer with compression off; the dictionary and
        // extension registry stay shared, so interning inside the sub-object
        // lands in the same table the decoder replays.
        let parent_buf = std::mem::take(&mut self.buf);
        let parent_last = self.last.take();
        let parent_repeat = self.repeat.take();
        self.gzip = false;

        let written = self.write_object(value);

        let child = std::mem::replace(&mut self.buf, parent_buf);
        self.last = parent_last;
        self.repeat = parent_repeat;
        self.gzip = true;
        written?;

        let compressed = deflate(&child)?;
        self.ensure(compressed.len() + 5)?;
        self.write_byte(marker::GZIP);
        self.write_length(compressed.len())?;
        self.buf.extend_from_slice(&compressed);
        Ok(())
    }

    // -- Capacity management --

    fn ensure(&mut self, additional: usize) -> Result<(), TlError> {
        let required = self.buf.len() + additional;
        if required <= self.buf.capacity() {
            return Ok(());
        }
        if required > marker::MAX_BUFFER_SIZE {
            return Err(TlError::BufferOverflow { required });
        }
        let target = grow_target(required, self.buf.capacity());
        self.buf.reserve_exact(target - self.buf.len());
        Ok(())
    }

    fn lookup_word(&self, word: &str) -> Option<usize> {
        if let Some(seed) = &self.seed {
            if let Some(index) = seed.index_of(word) {
                return Some(index);
            }
        }
        self.dict.index_of(word)
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, TlError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Next buffer capacity for a write requiring `required` bytes in total:
/// page-aligned, over-provisioning small buffers fourfold and large ones by
/// 2x (1.25x past 64 MiB), capped at `MAX_BUFFER_SIZE`.
fn grow_target(required: usize, capacity: usize) -> usize {
    const MIB: usize = 1024 * 1024;
    if required > 16 * MIB {
        let scaled = if required > 64 * MIB {
            required + required / 4
        } else {
            required * 2
        };
        (scaled.max(4 * MIB).div_ceil(4096) * 4096).min(marker::MAX_BUFFER_SIZE)
    } else {
        (((required * 4).max(capacity.saturating_sub(1)) >> 12) + 1) << 12
    }
}
