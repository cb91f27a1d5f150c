//! Writes TL-Pack frames to an async byte stream.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::codec::TlEncoder;
use crate::error::TlError;
use crate::types::TlValue;

/// Writes one encoded frame per value to an `AsyncWrite` stream.
///
/// The wrapped encoder persists across frames, so dictionary interning spans
/// the whole stream: a key first seen in frame 1 is an index reference in
/// frame 100.
pub struct FrameWriter<W> {
    writer: W,
    encoder: TlEncoder,
    wrote_frame: bool,
    write_vector_when_empty: bool,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_encoder(writer, TlEncoder::new())
    }

    /// Wraps a pre-configured encoder (seed dictionary, extensions, deflate).
    pub fn with_encoder(writer: W, encoder: TlEncoder) -> Self {
        Self {
            writer,
            encoder,
            wrote_frame: false,
            write_vector_when_empty: false,
        }
    }

    /// Emit a single empty-Vector frame at `finish` if no value was written.
    pub fn write_vector_when_empty(mut self, enabled: bool) -> Self {
        self.write_vector_when_empty = enabled;
        self
    }

    /// Encodes `value` and writes it as one frame.
    pub async fn write_value(&mut self, value: &TlValue) -> Result<(), TlError> {
        let frame = self.encoder.encode(value)?;
        self.writer.write_all(frame).await?;
        tracing::trace!(frame_len = frame.len(), "wrote frame");
        self.wrote_frame = true;
        Ok(())
    }

    /// Flushes the stream, first emitting the empty-Vector frame if configured
    /// and nothing was written.
    pub async fn finish(&mut self) -> Result<(), TlError> {
        if !self.wrote_frame && self.write_vector_when_empty {
            self.write_value(&TlValue::List(Vec::new())).await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Flushes the underlying writer.
    pub async fn flush(&mut self) -> Result<(), TlError> {
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_one_frame_per_value() {
        let mut output = Vec::new();
        let mut writer = FrameWriter::new(&mut output);
        writer.write_value(&TlValue::Bool(true)).await.unwrap();
        writer.write_value(&TlValue::Int(255)).await.unwrap();
        writer.finish().await.unwrap();
        assert_eq!(output, vec![0x03, 0x0D, 0xFF]);
    }

    #[tokio::test]
    async fn empty_stream_with_option_emits_empty_vector() {
        let mut output = Vec::new();
        let mut writer = FrameWriter::new(&mut output).write_vector_when_empty(true);
        writer.finish().await.unwrap();
        assert_eq!(output, vec![0x06, 0x00]);
    }

    #[tokio::test]
    async fn empty_stream_without_option_emits_nothing() {
        let mut output = Vec::new();
        let mut writer = FrameWriter::new(&mut output);
        writer.finish().await.unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn non_empty_stream_skips_the_empty_vector() {
        let mut output = Vec::new();
        let mut writer = FrameWriter::new(&mut output).write_vector_when_empty(true);
        writer.write_value(&TlValue::Null).await.unwrap();
        writer.finish().await.unwrap();
        assert_eq!(output, vec![0x04]);
    }

    #[tokio::test]
    async fn dictionary_interning_spans_frames() {
        let mut output = Vec::new();
        let mut writer = FrameWriter::new(&mut output);
        writer.write_value(&TlValue::from("topic")).await.unwrap();
        writer.write_value(&TlValue::from("topic")).await.unwrap();
        writer.finish().await.unwrap();
        // First frame registers the word, second is a two-byte index.
        assert_eq!(&output[output.len() - 2..], &[0x12, 0x01]);
    }
}
