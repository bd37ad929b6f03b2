//! Scripted transport for tests: canned responses per command, recorded
//! requests, and scripted event streams. No network calls.
//!
//! ```ignore
//! use tachibana::mock::{self, MockTransport};
//!
//! let transport = MockTransport::builder()
//!     .respond("CLMOrderList", mock::response("CLMOrderList", "0", "", serde_json::json!({"aOrderList": ""})))
//!     .stream(vec![mock::frame(&[("p_no", "1"), ("p_cmd", "KP")])])
//!     .build();
//! ```

use std::collections::VecDeque;
use std::io::{self, BufReader, Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::stream::frame::{FIELD_SEPARATOR, VALUE_SEPARATOR};
use crate::transport::{FrameReader, Transport};

/// A request as the mock received it.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub url: String,
    pub fields: Map<String, Value>,
}

impl RecordedRequest {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn command(&self) -> Option<&str> {
        self.field("sCLMID")
    }

    pub fn request_no(&self) -> Option<u64> {
        self.field("p_no").and_then(|n| n.parse().ok())
    }
}

/// A stream opening as the mock received it.
#[derive(Clone, Debug)]
pub struct RecordedStream {
    pub url: String,
    pub query: Vec<(String, String)>,
    closed: Arc<AtomicBool>,
}

impl RecordedStream {
    /// Whether the reader handed out for this stream has been dropped.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug)]
enum Reply {
    Body(String),
    Fail(String),
}

/// How a scripted stream ends after its frames.
#[derive(Clone, Debug)]
pub enum StreamEnd {
    /// Server closes the connection.
    Eof,
    /// Connection breaks with an I/O error.
    Broken(String),
    /// Server keeps the connection open, sending a keep-alive every interval.
    KeepAlive(Duration),
    /// Connection stays open and nothing arrives. Every read times out
    /// after the given wait.
    Silent(Duration),
}

#[derive(Clone, Debug)]
enum StreamScript {
    Frames { lines: Vec<String>, end: StreamEnd },
    RefuseOpen(String),
}

#[derive(Default)]
struct State {
    replies: FxHashMap<String, VecDeque<Reply>>,
    streams: VecDeque<StreamScript>,
    requests: Vec<RecordedRequest>,
    opened_streams: Vec<RecordedStream>,
}

/// Builder for `MockTransport`.
#[derive(Default)]
pub struct MockTransportBuilder {
    state: State,
}

impl MockTransportBuilder {
    /// Queue a response body for the next request with command `command`.
    pub fn respond(mut self, command: &str, body: impl Into<String>) -> Self {
        self.state
            .replies
            .entry(command.to_string())
            .or_default()
            .push_back(Reply::Body(body.into()));
        self
    }

    /// Queue a transport failure for the next request with command `command`.
    pub fn fail(mut self, command: &str, message: &str) -> Self {
        self.state
            .replies
            .entry(command.to_string())
            .or_default()
            .push_back(Reply::Fail(message.to_string()));
        self
    }

    /// Queue a stream that yields `lines` and then closes.
    pub fn stream(self, lines: Vec<String>) -> Self {
        self.stream_ending(lines, StreamEnd::Eof)
    }

    pub fn stream_ending(mut self, lines: Vec<String>, end: StreamEnd) -> Self {
        self.state
            .streams
            .push_back(StreamScript::Frames { lines, end });
        self
    }

    /// Queue a stream whose opening fails.
    pub fn refuse_stream(mut self, message: &str) -> Self {
        self.state
            .streams
            .push_back(StreamScript::RefuseOpen(message.to_string()));
        self
    }

    pub fn build(self) -> MockTransport {
        MockTransport {
            state: Arc::new(Mutex::new(self.state)),
        }
    }
}

/// A transport that replays scripted responses. Clones share state, so a
/// test can keep one clone for assertions after handing another to a client.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the recorded requests.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue another response after construction.
    pub fn push_response(&self, command: &str, body: impl Into<String>) {
        self.lock()
            .replies
            .entry(command.to_string())
            .or_default()
            .push_back(Reply::Body(body.into()));
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Requests received for one command.
    pub fn requests_for(&self, command: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.command() == Some(command))
            .collect()
    }

    pub fn opened_streams(&self) -> Vec<RecordedStream> {
        self.lock().opened_streams.clone()
    }
}

impl Transport for MockTransport {
    fn send(&self, url: &str, payload: &str) -> Result<Vec<u8>> {
        let fields = match serde_json::from_str::<Value>(payload)? {
            Value::Object(map) => map,
            _ => return Err(Error::Transport("mock: payload is not an object".into())),
        };
        let command = fields
            .get("sCLMID")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            url: url.to_string(),
            fields,
        });

        match state.replies.get_mut(&command).and_then(VecDeque::pop_front) {
            Some(Reply::Body(body)) => Ok(body.into_bytes()),
            Some(Reply::Fail(message)) => Err(Error::Transport(format!("mock: {message}"))),
            None => Err(Error::Transport(format!(
                "mock: no response scripted for {command}"
            ))),
        }
    }

    fn open_stream(&self, url: &str, query: &[(&'static str, String)]) -> Result<FrameReader> {
        let closed = Arc::new(AtomicBool::new(false));
        let mut state = self.lock();
        state.opened_streams.push(RecordedStream {
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            closed: Arc::clone(&closed),
        });

        match state.streams.pop_front() {
            Some(StreamScript::Frames { lines, end }) => {
                let mut data = lines.join("\n");
                if !data.is_empty() {
                    data.push('\n');
                }
                Ok(Box::new(BufReader::new(ScriptedReader {
                    data: Cursor::new(data.into_bytes()),
                    end,
                    closed,
                })))
            }
            Some(StreamScript::RefuseOpen(message)) => {
                Err(Error::Transport(format!("mock: {message}")))
            }
            None => Err(Error::Transport("mock: no stream scripted".into())),
        }
    }
}

struct ScriptedReader {
    data: Cursor<Vec<u8>>,
    end: StreamEnd,
    closed: Arc<AtomicBool>,
}

impl Drop for ScriptedReader {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl Read for ScriptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.data.read(buf)?;
        if n > 0 {
            return Ok(n);
        }
        match &self.end {
            StreamEnd::Eof => Ok(0),
            StreamEnd::Broken(message) => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                message.clone(),
            )),
            StreamEnd::KeepAlive(interval) => {
                thread::sleep(*interval);
                let line = format!("{}\n", frame(&[("p_cmd", "KP")]));
                self.data = Cursor::new(line.into_bytes());
                self.data.read(buf)
            }
            StreamEnd::Silent(wait) => {
                thread::sleep(*wait);
                Err(io::Error::new(io::ErrorKind::TimedOut, "mock: no data"))
            }
        }
    }
}

/// Build one stream frame from key/value pairs.
pub fn frame(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}{VALUE_SEPARATOR}{v}"))
        .collect::<Vec<_>>()
        .join(&FIELD_SEPARATOR.to_string())
}

/// Build a response body: envelope, acknowledgement id, status and `fields`.
pub fn response(ack: &str, code: &str, text: &str, fields: Value) -> String {
    let mut map = Map::new();
    map.insert("p_errno".into(), Value::String("0".into()));
    map.insert("p_err".into(), Value::String(String::new()));
    map.insert("sCLMID".into(), Value::String(ack.into()));
    map.insert("sResultCode".into(), Value::String(code.into()));
    map.insert("sResultText".into(), Value::String(text.into()));
    if let Value::Object(extra) = fields {
        map.extend(extra);
    }
    Value::Object(map).to_string()
}
