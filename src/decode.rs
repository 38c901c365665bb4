//! Incremental decoding of a response body into text fragments.
//!
//! The chat endpoint streams raw UTF-8 with no framing, and the transport may split
//! the body anywhere, including in the middle of a multi-byte character.  The
//! [`Utf8Decoder`] carries the unfinished tail of one read into the next so that
//! concatenating every fragment always yields the same text as decoding the whole
//! body at once.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tracing::debug;

use crate::error::Result;
use crate::observability::{STREAM_BYTES, STREAM_CHUNKS, STREAM_ERRORS};

const REPLACEMENT: char = '\u{FFFD}';
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// A UTF-8 decoder that keeps state across chunk boundaries.
///
/// Malformed input never fails: each invalid sequence becomes U+FFFD, and an
/// incomplete sequence still pending at [`finish`](Self::finish) becomes one U+FFFD.
/// A byte order mark at the very start of the input is dropped.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
    bom_checked: bool,
}

impl Utf8Decoder {
    /// Creates a decoder with no pending bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes`, returning all text that is complete so far.
    ///
    /// A trailing partial character is held back until the next call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);
        if !self.bom_checked {
            if input.len() < BOM.len() && BOM.starts_with(&input) {
                self.pending = input;
                return String::new();
            }
            self.bom_checked = true;
            if input.starts_with(BOM) {
                input.drain(..BOM.len());
            }
        }

        let mut text = String::with_capacity(input.len());
        let mut rest = input.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            text.push(REPLACEMENT);
                            rest = &tail[len..];
                        }
                        None => {
                            self.pending = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        text
    }

    /// Flushes the decoder at end of input.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT.to_string()
        }
    }

    /// True while a partial character is buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Turns a stream of body chunks into a stream of decoded text fragments.
///
/// Fragments come out in the order their bytes arrived.  Reads that complete no
/// character yield nothing.  The first error is passed through and ends the stream;
/// the byte stream is dropped at that point or at end of input, whichever comes
/// first, which releases the underlying connection.
pub fn decode_text_stream<S>(byte_stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    stream::unfold(
        (Some(byte_stream), Utf8Decoder::new()),
        |(mut source, mut decoder)| async move {
            loop {
                let byte_stream = source.as_mut()?;
                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        let text = decoder.decode(&bytes);
                        if !text.is_empty() {
                            STREAM_CHUNKS.click();
                            return Some((Ok(text), (source, decoder)));
                        }
                    }
                    Some(Err(err)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(err), (None, decoder)));
                    }
                    None => {
                        if decoder.has_pending() {
                            debug!("body ended inside a multi-byte sequence");
                        }
                        let tail = decoder.finish();
                        if tail.is_empty() {
                            return None;
                        }
                        return Some((Ok(tail), (None, decoder)));
                    }
                }
            }
        },
    )
}
