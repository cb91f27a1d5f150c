//! Reads TL-Pack frames from an async byte stream.

use std::mem;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::codec::{DecodeOptions, TlDecoder};
use crate::dictionary::TlDictionary;
use crate::error::TlError;
use crate::extension::TlExtensions;
use crate::types::TlValue;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Reads TL-Pack frames from an `AsyncRead` stream.
///
/// Bytes accumulate in an internal buffer. Each accumulation step attempts a
/// decode from the buffer start: an incomplete error keeps the bytes and waits
/// for more; success drops exactly the consumed prefix, so several frames
/// arriving in one chunk drain without further I/O. Dictionary state threads
/// through every attempt and so spans the whole stream.
pub struct FrameReader<R> {
    reader: R,
    buf: BytesMut,
    seed: Option<Arc<TlDictionary>>,
    dict: TlDictionary,
    extensions: Arc<TlExtensions>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DecodeOptions::default())
    }

    pub fn with_options(reader: R, options: DecodeOptions) -> Self {
        let seed = options.dictionary;
        let base = seed.as_ref().map_or(0, |d| d.len());
        Self {
            reader,
            buf: BytesMut::with_capacity(READ_BUFFER_SIZE),
            seed,
            dict: TlDictionary::with_base(base),
            extensions: options.extensions.unwrap_or_default(),
            eof: false,
        }
    }

    /// Reads the next value, buffering partial frames across reads. Returns
    /// `None` at a clean end of stream; a stream ending inside a frame
    /// surfaces the incomplete error.
    pub async fn read_value(&mut self) -> Result<Option<TlValue>, TlError> {
        loop {
            if !self.buf.is_empty() {
                match self.try_decode() {
                    Ok(value) => return Ok(Some(value)),
                    Err(e) if e.is_incomplete() && !self.eof => {
                        tracing::trace!(buffered = self.buf.len(), "partial frame, awaiting more bytes");
                    }
                    Err(e) => return Err(e),
                }
            } else if self.eof {
                return Ok(None);
            }
            let n = self.reader.read_buf(&mut self.buf).await?;
            if n == 0 {
                self.eof = true;
            }
        }
    }

    /// One decode attempt from the buffer start. Dictionary insertions from a
    /// failed attempt are harmless: insertion is idempotent and the retry
    /// replays the frame from its first byte.
    fn try_decode(&mut self) -> Result<TlValue, TlError> {
        let dict = mem::take(&mut self.dict);
        let mut decoder =
            TlDecoder::from_parts(&self.buf, self.seed.clone(), dict, Arc::clone(&self.extensions));
        let result = decoder.decode();
        let consumed = decoder.tell_position();
        self.dict = decoder.into_dictionary();
        if result.is_ok() {
            self.buf.advance(consumed);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_value, TlEncoder};
    use crate::types::TlMap;
    use std::io::Cursor;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn read_single_frame() {
        let frame = encode_value(&TlValue::Int(300)).unwrap();
        let mut reader = FrameReader::new(Cursor::new(frame));
        assert_eq!(reader.read_value().await.unwrap(), Some(TlValue::Int(300)));
        assert_eq!(reader.read_value().await.unwrap(), None);
    }

    #[tokio::test]
    async fn read_concatenated_frames_from_one_chunk() {
        let mut data = Vec::new();
        let mut encoder = TlEncoder::new();
        for value in [TlValue::Bool(true), TlValue::from("hello"), TlValue::Null] {
            data.extend_from_slice(encoder.encode(&value).unwrap());
        }
        let mut reader = FrameReader::new(Cursor::new(data));
        assert_eq!(reader.read_value().await.unwrap(), Some(TlValue::Bool(true)));
        assert_eq!(reader.read_value().await.unwrap(), Some(TlValue::from("hello")));
        assert_eq!(reader.read_value().await.unwrap(), Some(TlValue::Null));
        assert_eq!(reader.read_value().await.unwrap(), None);
    }

    #[tokio::test]
    async fn reassembles_frames_split_across_reads() {
        let map = TlMap::from([(
            "body".to_string(),
            TlValue::from("z".repeat(300).as_str()),
        )]);
        let frame = encode_value(&TlValue::Map(map.clone())).unwrap();

        let (mut tx, rx) = tokio::io::duplex(16);
        let writer = tokio::spawn(async move {
            for chunk in frame.chunks(7) {
                tx.write_all(chunk).await.unwrap();
            }
        });

        let mut reader = FrameReader::new(rx);
        assert_eq!(reader.read_value().await.unwrap(), Some(TlValue::Map(map)));
        writer.await.unwrap();
        assert_eq!(reader.read_value().await.unwrap(), None);
    }

    #[tokio::test]
    async fn dictionary_threads_across_frames() {
        let mut data = Vec::new();
        let mut encoder = TlEncoder::new();
        data.extend_from_slice(encoder.encode(&TlValue::from("topic")).unwrap());
        data.extend_from_slice(encoder.encode(&TlValue::from("topic")).unwrap());
        // The second frame is only an index reference.
        assert_eq!(&data[data.len() - 2..], &[0x12, 0x01]);

        let mut reader = FrameReader::new(Cursor::new(data));
        assert_eq!(reader.read_value().await.unwrap(), Some(TlValue::from("topic")));
        assert_eq!(reader.read_value().await.unwrap(), Some(TlValue::from("topic")));
    }

    #[tokio::test]
    async fn empty_stream_is_a_clean_end() {
        let mut reader = FrameReader::new(Cursor::new(Vec::new()));
        assert_eq!(reader.read_value().await.unwrap(), None);
    }

    #[tokio::test]
    async fn truncated_stream_surfaces_incomplete() {
        let frame = encode_value(&TlValue::from("a long enough string here")).unwrap();
        let mut reader = FrameReader::new(Cursor::new(frame[..frame.len() - 3].to_vec()));
        let err = reader.read_value().await.unwrap_err();
        assert!(err.is_incomplete());
    }

    #[tokio::test]
    async fn grammar_errors_propagate_immediately() {
        let mut reader = FrameReader::new(Cursor::new(vec![21u8]));
        let err = reader.read_value().await.unwrap_err();
        assert!(matches!(err, TlError::InvalidConstructor { tag: 21, .. }));
    }
}
