//! Message codec for admin socket framing
//!
//! Each frame is one JSON value. Requests are written as a compact object
//! followed by `\n`. Replies are accepted either newline-terminated or as a
//! bare JSON value (the router may pretty-print its replies across several
//! lines), so the decoder looks for the end of the first complete JSON value
//! rather than for a newline.

use bytes::{Buf, BytesMut};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::{Arguments, Request, Response};

/// Maximum frame size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot encode argument '{key}': {message}")]
    Encoding { key: String, message: String },

    #[error("Malformed frame: {0}")]
    Malformed(serde_json::Error),

    #[error("Frame is not a JSON object (got {found})")]
    NotAnObject { found: &'static str },

    #[error("Frame is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

impl CodecError {
    /// Create an encoding error for the given argument key
    pub fn encoding(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encoding {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Check if this error was raised while building a request
    pub fn is_encoding(&self) -> bool {
        matches!(self, Self::Encoding { .. })
    }
}

/// Encode a request into one newline-terminated frame
pub fn encode(operation: &str, arguments: &Arguments) -> Result<Vec<u8>, CodecError> {
    encode_request(&Request::with_arguments(operation, arguments.clone()))
}

/// Decode exactly one reply frame
///
/// Surrounding whitespace is allowed; anything else after the JSON value is
/// malformed.
pub fn decode(frame: &[u8]) -> Result<Response, CodecError> {
    let value: Value = serde_json::from_slice(frame).map_err(CodecError::Malformed)?;
    Response::from_value(value)
}

fn encode_request(request: &Request) -> Result<Vec<u8>, CodecError> {
    let value = request.to_value()?;
    let mut data = serde_json::to_vec(&value)
        .map_err(|e| CodecError::encoding(request.operation(), e.to_string()))?;
    data.push(b'\n');

    if data.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: data.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(data)
}

/// Codec for Request (encoding) and Response (decoding)
///
/// Used directly with `tokio_util::codec::Framed` by the async session and
/// driven by hand over a `BytesMut` by the blocking session, so both write
/// identical bytes.
///
/// The decoder remembers how far into a partial frame it has scanned, so each
/// byte is examined once no matter how many reads a large reply takes. The
/// frame is parsed only once its end has been found.
#[derive(Debug, Default)]
pub struct JsonLineCodec {
    scan: FrameScan,
}

impl JsonLineCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Progress of the search for the end of the frame at the buffer's start
#[derive(Debug, Default)]
struct FrameScan {
    offset: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl FrameScan {
    /// Length of the first JSON value in `src`, once it is complete
    ///
    /// `src` must start at the value (no leading whitespace). Objects,
    /// arrays and strings end at their closing byte; bare scalars end at the
    /// first whitespace or structural byte. Malformed input still yields an
    /// end so the parser can report it.
    fn find_end(&mut self, src: &[u8]) -> Option<usize> {
        for (i, &b) in src.iter().enumerate().skip(self.offset) {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                    if self.depth == 0 {
                        return Some(i + 1);
                    }
                }
                continue;
            }

            if self.depth == 0 && i > 0 {
                // Bare scalar at the top level
                if b.is_ascii_whitespace() || b"{}[],:\"".contains(&b) {
                    return Some(i);
                }
                continue;
            }

            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' if self.depth == 0 => return Some(1),
                b'}' | b']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        return Some(i + 1);
                    }
                }
                b',' | b':' if self.depth == 0 => return Some(1),
                _ => {}
            }
        }

        self.offset = src.len();
        None
    }
}

impl Decoder for JsonLineCodec {
    type Item = Response;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.scan.offset == 0 {
            // Drop separators left over from a previous frame
            let leading = src.iter().take_while(|b| b.is_ascii_whitespace()).count();
            src.advance(leading);
        }

        if src.is_empty() {
            return Ok(None);
        }

        let end = match self.scan.find_end(src) {
            Some(end) => end,
            None if src.len() > MAX_FRAME_SIZE => {
                self.scan = FrameScan::default();
                return Err(CodecError::FrameTooLarge {
                    size: src.len(),
                    max: MAX_FRAME_SIZE,
                });
            }
            None => return Ok(None),
        };
        self.scan = FrameScan::default();

        if end > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge {
                size: end,
                max: MAX_FRAME_SIZE,
            });
        }

        // Consume the value and its terminator, never anything past it
        let frame = src.split_to(end);
        if src.starts_with(b"\r\n") {
            src.advance(2);
        } else if src.starts_with(b"\n") {
            src.advance(1);
        }

        decode(&frame).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(response) = self.decode(src)? {
            return Ok(Some(response));
        }
        self.scan = FrameScan::default();
        if src.is_empty() {
            return Ok(None);
        }

        // The peer hung up mid-frame: report what is left as a frame
        let rest = src.split();
        decode(&rest).map(Some)
    }
}

impl Encoder<Request> for JsonLineCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let data = encode_request(&item)?;
        dst.extend_from_slice(&data);
        Ok(())
    }
}
