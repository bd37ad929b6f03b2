//! Event stream: subscription, a reader thread per stream, and the
//! channels that carry events and the terminal error back to the caller.
//!
//! ```ignore
//! let sub = Subscription::quotes(&["6501"], Market::Tokyo).with_columns(&["DPP", "DV"]);
//! for event in client.stream(&session, &sub)? {
//!     match event {
//!         Ok(event) => println!("{} {:?}", event.sequence, event.kind),
//!         Err(e) => eprintln!("stream ended: {e}"),
//!     }
//! }
//! ```

pub mod event;
pub mod frame;

use std::io::{BufRead, ErrorKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

pub use event::{
    EventKind, ExecutionNotice, FrameDecoder, NewsItem, QuoteUpdate, QuoteValue, StreamEvent,
    SystemMessage,
};

use crate::client::Client;
use crate::codes::{EventType, Market, WireCode};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::FrameReader;

/// Request id and board number the event endpoint expects.
const REQUEST_ID: &str = "22";
const BOARD_NO: &str = "1000";

/// What to receive on a stream.
///
/// Empty `columns` means every quote column; empty `event_types` means every
/// data event type. Status and keep-alive frames are always requested so the
/// stream can detect server-side termination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscription {
    pub columns: Vec<String>,
    pub issue_codes: Vec<String>,
    /// One market per issue code, in the same order.
    pub market_codes: Vec<Market>,
    /// Resume after this sequence number. `None` starts from the server's
    /// current position.
    pub start_sequence: Option<u64>,
    pub event_types: Vec<EventType>,
}

impl Subscription {
    /// Quotes for `issues`, all listed on `market`.
    pub fn quotes(issues: &[&str], market: Market) -> Self {
        Self {
            issue_codes: issues.iter().map(|s| s.to_string()).collect(),
            market_codes: vec![market; issues.len()],
            event_types: vec![EventType::Feed],
            ..Self::default()
        }
    }

    /// Execution notices only.
    pub fn executions() -> Self {
        Self {
            event_types: vec![EventType::Execution],
            ..Self::default()
        }
    }

    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_event_types(mut self, types: &[EventType]) -> Self {
        self.event_types = types.to_vec();
        self
    }

    pub fn starting_after(mut self, sequence: u64) -> Self {
        self.start_sequence = Some(sequence);
        self
    }

    /// Query parameters for the event endpoint.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut requested: Vec<EventType> = if self.event_types.is_empty() {
            EventType::ALL.to_vec()
        } else {
            self.event_types.clone()
        };
        for always in [EventType::Status, EventType::KeepAlive] {
            if !requested.contains(&always) {
                requested.insert(0, always);
            }
        }

        let mut query = vec![
            ("p_rid", REQUEST_ID.to_string()),
            ("p_board_no", BOARD_NO.to_string()),
        ];
        if !self.issue_codes.is_empty() {
            let rows: Vec<String> = (1..=self.issue_codes.len()).map(|n| n.to_string()).collect();
            query.push(("p_gyou_no", rows.join(",")));
            query.push(("p_issue_code", self.issue_codes.join(",")));
            query.push(("p_mkt_code", join_codes(&self.market_codes)));
        }
        query.push((
            "p_eno",
            self.start_sequence.unwrap_or_default().to_string(),
        ));
        query.push(("p_evt_cmd", join_codes(&requested)));
        query
    }
}

fn join_codes<C: WireCode>(codes: &[C]) -> String {
    codes
        .iter()
        .map(|c| c.as_code())
        .collect::<Vec<_>>()
        .join(",")
}

impl Client {
    /// Open the event stream for `subscription`.
    ///
    /// Opening happens on the calling thread, so a refused connection is
    /// returned here. After that a reader thread decodes frames into the
    /// returned [`EventStream`] until the server closes the stream, an error
    /// ends it, or the `EventStream` is dropped.
    pub fn stream(&self, session: &Session, subscription: &Subscription) -> Result<EventStream> {
        session.ensure_live()?;

        let query = subscription.query();
        let reader = self
            .transport()
            .open_stream(&session.endpoints().event, &query)?;
        info!(
            "Event stream opened ({} issues, from sequence {})",
            subscription.issue_codes.len(),
            subscription.start_sequence.unwrap_or_default()
        );

        EventStream::spawn(
            reader,
            FrameDecoder::new(subscription),
            self.config().stream_buffer,
            self.config().stream_idle_timeout,
        )
    }
}

/// Consumer side of an open stream.
///
/// Events arrive on [`events`](Self::events). When the stream ends with an
/// error, that single error is queued on [`errors`](Self::errors) before the
/// event channel closes, so draining events first and then checking errors
/// never misses it. A clean close leaves the error channel empty.
///
/// Iterating yields events and then at most one `Err`. Dropping the stream
/// stops the reader thread at its next frame or read timeout, which drops
/// the connection.
pub struct EventStream {
    events: Receiver<StreamEvent>,
    errors: Receiver<Error>,
    dropped: Arc<AtomicBool>,
    finished: bool,
}

impl EventStream {
    fn spawn(
        reader: FrameReader,
        decoder: FrameDecoder,
        buffer: usize,
        idle_timeout: Duration,
    ) -> Result<Self> {
        let (event_tx, events) = mpsc::sync_channel(buffer.max(1));
        let (error_tx, errors) = mpsc::sync_channel(1);
        let dropped = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            reader,
            decoder,
            events: event_tx,
            errors: error_tx,
            dropped: Arc::clone(&dropped),
            idle_timeout,
        };
        thread::Builder::new()
            .name("tachibana-stream".into())
            .spawn(move || worker.run())
            .map_err(|e| Error::Transport(format!("failed to spawn stream reader: {e}")))?;

        Ok(Self {
            events,
            errors,
            dropped,
            finished: false,
        })
    }

    pub fn events(&self) -> &Receiver<StreamEvent> {
        &self.events
    }

    pub fn errors(&self) -> &Receiver<Error> {
        &self.errors
    }

    /// Events followed by at most one error.
    pub fn iter(&mut self) -> &mut Self {
        self
    }
}

impl Iterator for EventStream {
    type Item = Result<StreamEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.events.recv() {
            Ok(event) => Some(Ok(event)),
            Err(_) => {
                self.finished = true;
                self.errors.try_recv().ok().map(Err)
            }
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::Release);
    }
}

struct Worker {
    reader: FrameReader,
    decoder: FrameDecoder,
    events: SyncSender<StreamEvent>,
    errors: SyncSender<Error>,
    dropped: Arc<AtomicBool>,
    idle_timeout: Duration,
}

impl Worker {
    fn run(mut self) {
        match self.pump() {
            Ok(()) => debug!(
                "Event stream finished at sequence {:?}",
                self.decoder.last_sequence()
            ),
            Err(e) => {
                warn!("Event stream failed: {e}");
                // Queue the error while the event sender is still alive.
                let _ = self.errors.try_send(e);
            }
        }
    }

    /// Read until EOF, consumer drop, idle timeout, or the first fatal error.
    fn pump(&mut self) -> Result<()> {
        let mut buf = Vec::new();
        let mut last_bytes = Instant::now();
        loop {
            if self.dropped.load(Ordering::Acquire) {
                debug!("Event stream consumer gone, closing connection");
                return Ok(());
            }

            let before = buf.len();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) if buf.is_empty() => return Ok(()),
                Ok(_) => last_bytes = Instant::now(),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    if buf.len() > before {
                        last_bytes = Instant::now();
                    } else if last_bytes.elapsed() >= self.idle_timeout {
                        return Err(Error::Transport(format!(
                            "event stream silent for {:?}",
                            last_bytes.elapsed()
                        )));
                    }
                    continue;
                }
                Err(e) => return Err(Error::Transport(format!("event stream read failed: {e}"))),
            }

            let line = std::str::from_utf8(&buf)
                .map_err(|_| Error::frame("invalid UTF-8", &String::from_utf8_lossy(&buf)))?;

            if let Some(event) = self.decoder.decode(line)? {
                if self.events.send(event).is_err() {
                    // Receiver gone.
                    return Ok(());
                }
            }
            buf.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_requests_everything() {
        let query = Subscription::default().query();
        let get = |k: &str| query.iter().find(|(q, _)| *q == k).map(|(_, v)| v.as_str());
        assert_eq!(get("p_rid"), Some("22"));
        assert_eq!(get("p_board_no"), Some("1000"));
        assert_eq!(get("p_eno"), Some("0"));
        assert_eq!(get("p_evt_cmd"), Some("ST,KP,FD,EC,NS,SS,US"));
        assert_eq!(get("p_issue_code"), None);
    }

    #[test]
    fn quote_query_lists_rows_and_markets() {
        let sub = Subscription::quotes(&["6501", "7203"], Market::Tokyo).starting_after(41);
        let query = sub.query();
        let get = |k: &str| query.iter().find(|(q, _)| *q == k).map(|(_, v)| v.as_str());
        assert_eq!(get("p_gyou_no"), Some("1,2"));
        assert_eq!(get("p_issue_code"), Some("6501,7203"));
        assert_eq!(get("p_mkt_code"), Some("00,00"));
        assert_eq!(get("p_eno"), Some("41"));
        assert_eq!(get("p_evt_cmd"), Some("KP,ST,FD"));
    }
}
