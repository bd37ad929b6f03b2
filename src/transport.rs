//! Transport seam: one request/response primitive and one streaming primitive.

use std::io::BufRead;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::Result;

/// Line-oriented reader over an open event stream, yielding UTF-8.
///
/// A reader must not block forever on a silent connection: it returns an
/// `ErrorKind::TimedOut` or `WouldBlock` error after a bounded wait, so the
/// stream worker can notice that its consumer is gone and drop the reader.
pub type FrameReader = Box<dyn BufRead + Send>;

/// Bytes left as-is in a request query. Everything else is percent-encoded.
const QUERY_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Request URL carrying `payload` as its percent-encoded query string.
pub fn request_url(url: &str, payload: &str) -> String {
    format!("{url}?{}", utf8_percent_encode(payload, QUERY_SAFE))
}

/// Moves bytes to and from the brokerage. Implementations do no retrying.
pub trait Transport: Send + Sync {
    /// Send an encoded request to `url` and return the response body.
    fn send(&self, url: &str, payload: &str) -> Result<Vec<u8>>;

    /// Open a long-lived event stream.
    fn open_stream(&self, url: &str, query: &[(&'static str, String)]) -> Result<FrameReader>;
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use std::io::{self, BufReader, ErrorKind, Read};

    use log::debug;
    use reqwest::blocking::{Client, Response};
    use reqwest::header::CONTENT_TYPE;

    use super::{FrameReader, Transport, request_url};
    use crate::charset::{self, Utf8Lines};
    use crate::config::ClientConfig;
    use crate::error::{Error, Result};

    /// Blocking HTTPS transport.
    ///
    /// Requests are GETs with the percent-encoded JSON payload as the query
    /// string. Response bodies and stream lines are re-encoded to UTF-8.
    /// Streams use a second client whose timeout bounds each read rather than
    /// the whole response.
    pub struct HttpTransport {
        client: Client,
        stream_client: Client,
    }

    impl HttpTransport {
        pub fn new(config: &ClientConfig) -> Result<Self> {
            let client = Client::builder()
                .timeout(config.request_timeout)
                .connect_timeout(config.connect_timeout)
                .user_agent(config.user_agent.as_str())
                .build()
                .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

            let stream_client = Client::builder()
                .timeout(config.stream_poll_interval)
                .connect_timeout(config.connect_timeout)
                .user_agent(config.user_agent.as_str())
                .build()
                .map_err(|e| Error::Transport(format!("failed to build stream client: {e}")))?;

            Ok(Self {
                client,
                stream_client,
            })
        }
    }

    impl Transport for HttpTransport {
        fn send(&self, url: &str, payload: &str) -> Result<Vec<u8>> {
            let resp = self
                .client
                .get(request_url(url, payload))
                .send()
                .map_err(|e| Error::Transport(format!("request failed: {e}")))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().unwrap_or_default();
                return Err(Error::Transport(format!("server returned {status}: {body}")));
            }

            let encoding = content_charset(&resp);
            let body = resp
                .bytes()
                .map_err(|e| Error::Transport(format!("failed to read response body: {e}")))?;
            debug!("received {} bytes ({})", body.len(), encoding.name());
            Ok(charset::to_utf8(&body, encoding))
        }

        fn open_stream(&self, url: &str, query: &[(&'static str, String)]) -> Result<FrameReader> {
            let resp = self
                .stream_client
                .get(url)
                .query(query)
                .send()
                .map_err(|e| Error::Transport(format!("stream request failed: {e}")))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().unwrap_or_default();
                return Err(Error::Transport(format!(
                    "stream returned {status}: {body}"
                )));
            }

            let encoding = content_charset(&resp);
            Ok(Box::new(Utf8Lines::new(
                BufReader::new(PollingBody(resp)),
                encoding,
            )))
        }
    }

    fn content_charset(resp: &Response) -> &'static encoding_rs::Encoding {
        charset::from_content_type(
            resp.headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        )
    }

    /// Stream body whose read timeouts surface as `ErrorKind::TimedOut`.
    struct PollingBody(Response);

    impl Read for PollingBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf).map_err(|e| {
                let timed_out = e
                    .get_ref()
                    .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
                    .is_some_and(reqwest::Error::is_timeout);
                if timed_out {
                    io::Error::new(ErrorKind::TimedOut, e)
                } else {
                    e
                }
            })
        }
    }
}
