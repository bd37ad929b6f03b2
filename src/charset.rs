//! Response text encoding. The brokerage answers in Shift_JIS unless the
//! `Content-Type` header names another charset; everything past the
//! transport works on UTF-8.

use std::io::{self, BufRead, Read};

use encoding_rs::{Encoding, SHIFT_JIS};

/// Encoding named by a `Content-Type` value, Shift_JIS when absent or unknown.
pub fn from_content_type(content_type: Option<&str>) -> &'static Encoding {
    content_type
        .and_then(|value| {
            value.split(';').find_map(|param| {
                let (name, label) = param.split_once('=')?;
                name.trim()
                    .eq_ignore_ascii_case("charset")
                    .then(|| label.trim().trim_matches('"'))
            })
        })
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(SHIFT_JIS)
}

/// Re-encode `body` as UTF-8. Malformed sequences become U+FFFD.
pub fn to_utf8(body: &[u8], encoding: &'static Encoding) -> Vec<u8> {
    let (text, _) = encoding.decode_without_bom_handling(body);
    text.into_owned().into_bytes()
}

/// Line reader that re-encodes each line of `inner` as UTF-8.
///
/// Line feeds and the frame separators are single bytes in Shift_JIS and
/// never occur inside a multi-byte character, so splitting before decoding
/// is safe. A partial line survives a read error and is completed by the
/// next call.
pub struct Utf8Lines<R> {
    inner: R,
    encoding: &'static Encoding,
    raw: Vec<u8>,
    decoded: Vec<u8>,
    pos: usize,
}

impl<R: BufRead> Utf8Lines<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            encoding,
            raw: Vec::new(),
            decoded: Vec::new(),
            pos: 0,
        }
    }
}

impl<R: BufRead> Read for Utf8Lines<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for Utf8Lines<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.decoded.len() {
            self.decoded.clear();
            self.pos = 0;
            self.inner.read_until(b'\n', &mut self.raw)?;
            if !self.raw.is_empty() {
                self.decoded = to_utf8(&self.raw, self.encoding);
                self.raw.clear();
            }
        }
        Ok(&self.decoded[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.decoded.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::OrderListFilter;
    use crate::codec;
    use encoding_rs::UTF_8;
    use std::io::Cursor;

    #[test]
    fn charset_from_header() {
        assert_eq!(from_content_type(None), SHIFT_JIS);
        assert_eq!(from_content_type(Some("text/plain")), SHIFT_JIS);
        assert_eq!(from_content_type(Some("text/plain; charset=UTF-8")), UTF_8);
        assert_eq!(from_content_type(Some("text/plain;Charset=\"Shift_JIS\"")), SHIFT_JIS);
        assert_eq!(from_content_type(Some("text/plain; charset=bogus")), SHIFT_JIS);
    }

    #[test]
    fn shift_jis_rejection_keeps_code_and_text() {
        let body = r#"{"p_errno":"0","sCLMID":"CLMOrderList","sResultCode":"990002","sResultText":"注文は受け付けられません","aOrderList":""}"#;
        let (wire, _, _) = SHIFT_JIS.encode(body);
        assert!(codec::decode::<OrderListFilter>(&wire).is_err());

        let utf8 = to_utf8(&wire, from_content_type(Some("text/plain")));
        let resp = codec::decode::<OrderListFilter>(&utf8).unwrap();
        assert_eq!(resp.status.code, "990002");
        assert_eq!(resp.status.text, "注文は受け付けられません");
    }

    #[test]
    fn lines_are_reencoded_one_at_a_time() {
        let text = "p_cmd\u{2}NS\u{1}p_HDL\u{2}日立製作所\np_cmd\u{2}KP\n";
        let (wire, _, _) = SHIFT_JIS.encode(text);
        let mut lines = Utf8Lines::new(Cursor::new(wire.into_owned()), SHIFT_JIS);

        let mut first = String::new();
        lines.read_line(&mut first).unwrap();
        assert_eq!(first, "p_cmd\u{2}NS\u{1}p_HDL\u{2}日立製作所\n");
        let mut second = String::new();
        lines.read_line(&mut second).unwrap();
        assert_eq!(second, "p_cmd\u{2}KP\n");
        assert_eq!(lines.read_line(&mut String::new()).unwrap(), 0);
    }
}
