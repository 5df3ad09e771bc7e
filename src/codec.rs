//! Line codec for client connections
//!
//! Wraps `LinesCodec`. An over-long request line is reported as a
//! `Request::TooLong` item instead of a stream error, so the session can
//! answer it and keep reading; `LinesCodec` skips the rest of that line.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

/// One decoded request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Line(String),
    TooLong,
}

#[derive(Debug)]
pub struct LineCodec {
    inner: LinesCodec,
}

impl LineCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
        }
    }
}

fn recover(
    decoded: Result<Option<String>, LinesCodecError>,
) -> Result<Option<Request>, LinesCodecError> {
    match decoded {
        Ok(line) => Ok(line.map(Request::Line)),
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Request::TooLong)),
        Err(e) => Err(e),
    }
}

impl Decoder for LineCodec {
    type Item = Request;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Request>, LinesCodecError> {
        recover(self.inner.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Request>, LinesCodecError> {
        recover(self.inner.decode_eof(buf))
    }
}

impl Encoder<String> for LineCodec {
    type Error = LinesCodecError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), LinesCodecError> {
        self.inner.encode(line, dst)
    }
}
