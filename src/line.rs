//! Line-based codec for tokio.
//!
//! Reads `\n`-terminated lines, trims the terminator and decodes them
//! leniently: invalid bytes become replacement characters and overlong lines
//! are cut to the maximum length. A noisy server never makes reading fail.

#[cfg(feature = "encoding")]
use std::borrow::Cow;
use std::io;

use bytes::BytesMut;
#[cfg(feature = "encoding")]
use encoding::Encoding;
use tokio_util::codec::{Decoder, Encoder};

use crate::util::{LINE_TERMINATOR, MAX_LINE_LEN};

/// Codec for newline-terminated protocol lines.
pub struct LineCodec {
    #[cfg(feature = "encoding")]
    encoding: &'static Encoding,
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
    /// Dropping the tail of an overlong line.
    discarding: bool,
}

impl LineCodec {
    /// Create a codec for the given encoding label (e.g. `"utf-8"`).
    ///
    /// Without the `encoding` feature every stream is read as UTF-8 and the
    /// label is ignored.
    pub fn new(_label: &str) -> io::Result<Self> {
        Ok(Self {
            #[cfg(feature = "encoding")]
            encoding: match Encoding::for_label(_label.as_bytes()) {
                Some(enc) => enc,
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("unknown encoding: {}", _label),
                    ));
                }
            },
            next_index: 0,
            max_len: MAX_LINE_LEN,
            discarding: false,
        })
    }

    /// Create a codec with a custom maximum line length.
    pub fn with_max_len(label: &str, max_len: usize) -> io::Result<Self> {
        let mut codec = Self::new(label)?;
        codec.max_len = max_len.max(1);
        Ok(codec)
    }

    fn decode_line(&self, raw: &[u8]) -> String {
        let end = raw
            .iter()
            .rposition(|&b| b != b'\r' && b != b'\n')
            .map_or(0, |i| i + 1);
        let raw = &raw[..end];

        #[cfg(feature = "encoding")]
        {
            let (cow, _enc, _had_errors) = self.encoding.decode(raw);
            cow.into_owned()
        }

        #[cfg(not(feature = "encoding"))]
        {
            String::from_utf8_lossy(raw).into_owned()
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<String>> {
        loop {
            if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
                let line = src.split_to(self.next_index + offset + 1);
                self.next_index = 0;

                if self.discarding {
                    self.discarding = false;
                    continue;
                }

                let keep = line.len().min(self.max_len);
                return Ok(Some(self.decode_line(&line[..keep])));
            }

            if self.discarding {
                src.clear();
                self.next_index = 0;
                return Ok(None);
            }

            if src.len() > self.max_len {
                // emit what fits, drop the rest up to the next newline
                let line = src.split_to(self.max_len);
                self.next_index = 0;
                self.discarding = true;
                return Ok(Some(self.decode_line(&line)));
            }

            self.next_index = src.len();
            return Ok(None);
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if src.is_empty() || self.discarding {
            src.clear();
            self.discarding = false;
            return Ok(None);
        }
        let rest = src.split();
        Ok(Some(self.decode_line(&rest)))
    }
}

impl Encoder<String> for LineCodec {
    type Error = io::Error;

    /// Write one line. Anything after an embedded line break is dropped and
    /// the terminator is appended.
    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> io::Result<()> {
        let line = msg
            .split(['\r', '\n'])
            .next()
            .unwrap_or_default();

        #[cfg(feature = "encoding")]
        {
            let (cow_bytes, _enc, _had_errors) = self.encoding.encode(line);
            match cow_bytes {
                Cow::Borrowed(b) => dst.extend_from_slice(b),
                Cow::Owned(v) => dst.extend_from_slice(&v),
            }
        }

        #[cfg(not(feature = "encoding"))]
        {
            dst.extend_from_slice(line.as_bytes());
        }

        dst.extend_from_slice(LINE_TERMINATOR.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> LineCodec {
        LineCodec::new("utf-8").unwrap()
    }

    #[test]
    fn test_decode_lines() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"PING :a\r\nPING :b\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :a"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :b"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_partial_line() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"PING :ab"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"c\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :abc"));
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"hi \xff there\r\n"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert!(line.starts_with("hi "));
        assert!(line.ends_with(" there"));
    }

    #[test]
    fn test_overlong_line_truncated() {
        let mut codec = LineCodec::with_max_len("utf-8", 8).unwrap();
        let mut buf = BytesMut::from(&b"0123456789abcdef\r\nnext\r\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("01234567"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("next"));
    }

    #[test]
    fn test_overlong_line_across_reads() {
        let mut codec = LineCodec::with_max_len("utf-8", 8).unwrap();
        let mut buf = BytesMut::from(&b"0123456789"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("01234567"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"more\r\nok\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn test_decode_eof_flushes_partial() {
        let mut codec = codec();
        let mut buf = BytesMut::from(&b"ERROR :bye"[..]);
        assert_eq!(codec.decode_eof(&mut buf).unwrap().as_deref(), Some("ERROR :bye"));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_encode_appends_terminator() {
        let mut codec = codec();
        let mut buf = BytesMut::new();
        codec.encode("NICK bot\r\nQUIT".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"NICK bot\r\n");
    }
}
