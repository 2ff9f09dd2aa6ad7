//! Decoding of incrementally delivered response bodies.
//!
//! The chat endpoint answers with a plain byte stream.  This module turns it
//! into UTF-8 text chunks (carrying split multi-byte sequences across network
//! reads) and splits each chunk into visible text and in-band completion
//! markers.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::STREAM_BYTES;
use crate::types::{COMPLETION_SENTINEL, CompletionMarker};
use crate::{Error, Result};

/// Incremental UTF-8 decoder.
///
/// Behaves like a non-fatal streaming text decoder: invalid sequences become
/// U+FFFD and an incomplete sequence at the end of a read is held back until
/// the next read completes it.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Creates a decoder with nothing buffered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes`, returning all text that is complete so far.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut buffer = std::mem::take(&mut self.pending);
        buffer.extend_from_slice(bytes);
        let mut out = String::with_capacity(buffer.len());
        let mut input = &buffer[..];
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&input[..valid]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &input[valid + len..];
                        }
                        None => {
                            self.pending = input[valid..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flushes whatever is still buffered at end of stream.
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }
}

/// Turns a body byte stream into a stream of non-empty text chunks.
///
/// Transport errors are passed through as [`Error::Streaming`] and end the
/// stream from the consumer's point of view.
pub fn decode_chunks<S, E>(byte_stream: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let stream = Box::pin(byte_stream.map(|result| {
        result.map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    }));

    stream::unfold(
        (stream, Utf8ChunkDecoder::new(), false),
        move |(mut stream, mut decoder, finished)| async move {
            if finished {
                return None;
            }
            loop {
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        let text = decoder.decode(&bytes);
                        if !text.is_empty() {
                            return Some((Ok(text), (stream, decoder, false)));
                        }
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, decoder, true)));
                    }
                    None => {
                        let rest = decoder.finish();
                        if rest.is_empty() {
                            return None;
                        }
                        return Some((Ok(rest), (stream, decoder, true)));
                    }
                }
            }
        },
    )
}

/// A piece of a decoded chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Visible answer text.
    Text(String),

    /// A complete completion marker.
    Done(CompletionMarker),

    /// The start of a marker whose JSON continues in the next chunk.
    Partial(String),
}

/// Splits a decoded chunk into text and completion markers.
///
/// Only a chunk that starts with the literal [`COMPLETION_SENTINEL`] (leading
/// whitespace aside) can carry a marker; the sentinel anywhere else is answer
/// text.  Text after a complete marker is split again.  A marker cut off by
/// the end of the chunk is returned as [`Fragment::Partial`].  A chunk that
/// starts with the sentinel but is not a marker is plain text.
pub fn split_chunk(chunk: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut rest = chunk;
    while !rest.is_empty() {
        let candidate = rest.trim_start();
        if !candidate.starts_with(COMPLETION_SENTINEL) {
            fragments.push(Fragment::Text(rest.to_string()));
            break;
        }
        let mut values =
            serde_json::Deserializer::from_str(candidate).into_iter::<CompletionMarker>();
        match values.next() {
            Some(Ok(marker)) => {
                fragments.push(Fragment::Done(marker));
                let tail = &candidate[values.byte_offset()..];
                rest = if tail.trim().is_empty() { "" } else { tail };
            }
            Some(Err(err)) if err.is_eof() => {
                fragments.push(Fragment::Partial(rest.to_string()));
                break;
            }
            Some(Err(err)) => {
                tracing::debug!(error = %err, "sentinel without a completion marker; keeping as text");
                fragments.push(Fragment::Text(rest.to_string()));
                break;
            }
            None => {
                fragments.push(Fragment::Partial(rest.to_string()));
                break;
            }
        }
    }
    fragments
}
