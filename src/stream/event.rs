//! Typed stream events and the frame decoder.

use log::{debug, warn};
use rust_decimal::Decimal;

use super::frame::Frame;
use super::Subscription;
use crate::codes::{ContractStatus, EventType, OrderStatus, Side, WireCode};
use crate::error::{Error, Result};
use crate::types::{ExecutionDate, OrderKey, OrderNumber};

/// One decoded event from the stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamEvent {
    /// Stream sequence number (`p_no`). Resume with it via
    /// [`Subscription::start_sequence`].
    pub sequence: u64,
    pub sent_at: Option<String>,
    pub kind: EventKind,
}

impl StreamEvent {
    pub fn event_type(&self) -> EventType {
        match self.kind {
            EventKind::Quote(_) => EventType::Feed,
            EventKind::Execution(_) => EventType::Execution,
            EventKind::News(_) => EventType::News,
            EventKind::System(ref msg) => msg.event_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    Quote(QuoteUpdate),
    Execution(ExecutionNotice),
    News(NewsItem),
    System(SystemMessage),
}

/// Quote values keyed by board row and column code (`p_<row>_<column>`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuoteUpdate {
    pub values: Vec<QuoteValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuoteValue {
    pub row: u32,
    pub column: String,
    pub value: String,
}

impl QuoteUpdate {
    pub fn get(&self, row: u32, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.row == row && v.column == column)
            .map(|v| v.value.as_str())
    }

    /// Numeric value of a column. Blank is `None`, garbage is an error.
    pub fn decimal(&self, row: u32, column: &str) -> Result<Option<Decimal>> {
        match self.get(row, column).map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(raw) => raw.parse::<Decimal>().map(Some).map_err(|_| {
                Error::malformed(&format!("p_{row}_{column}"), raw, "not a decimal value")
            }),
        }
    }
}

/// Order or execution notice for one of the account's orders.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionNotice {
    pub key: OrderKey,
    /// Notice kind as sent by the broker (accepted, executed, cancelled...).
    pub notice_type: String,
    pub issue_code: Option<String>,
    pub side: Option<Side>,
    pub order_status: Option<OrderStatus>,
    pub contract_status: Option<ContractStatus>,
    pub executed_quantity: Option<u64>,
    pub executed_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewsItem {
    pub id: String,
    pub headline: String,
    pub categories: Vec<String>,
}

/// System or operation status broadcast. Fields are passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemMessage {
    pub event_type: EventType,
    pub fields: Vec<(String, String)>,
}

/// Turns lines into events, tracking the last delivered sequence number.
///
/// `Ok(None)` means the frame belongs to a class that is dropped without
/// ending the stream: blank lines, keep-alives, healthy status frames,
/// unknown commands, replayed sequence numbers and filtered event types.
/// Everything else that fails to decode is an error that ends the stream.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    event_types: Vec<EventType>,
    columns: Vec<String>,
    last_sequence: Option<u64>,
}

impl FrameDecoder {
    pub fn new(subscription: &Subscription) -> Self {
        Self {
            event_types: subscription.event_types.clone(),
            columns: subscription.columns.clone(),
            last_sequence: None,
        }
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    pub fn decode(&mut self, line: &str) -> Result<Option<StreamEvent>> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }

        let frame = Frame::parse(line)?;
        let Some(command) = frame.present("p_cmd") else {
            return Err(Error::frame("missing p_cmd", line));
        };
        let Some(event_type) = EventType::from_code(command) else {
            warn!("Dropping frame with unknown command {command}");
            return Ok(None);
        };

        match event_type {
            EventType::KeepAlive => return Ok(None),
            EventType::Status => return status_frame(&frame),
            _ => {}
        }

        let sequence = sequence(&frame)?;
        if let Some(last) = self.last_sequence {
            if sequence <= last {
                warn!("Dropping replayed frame {sequence} (last delivered {last})");
                return Ok(None);
            }
        }

        let kind = match event_type {
            EventType::Feed => EventKind::Quote(self.quote(&frame)?),
            EventType::Execution => EventKind::Execution(execution(&frame)?),
            EventType::News => EventKind::News(news(&frame)?),
            _ => EventKind::System(system(&frame, event_type)),
        };
        self.last_sequence = Some(sequence);

        if !self.event_types.is_empty() && !self.event_types.contains(&event_type) {
            debug!("Filtered {event_type} frame {sequence}");
            return Ok(None);
        }

        Ok(Some(StreamEvent {
            sequence,
            sent_at: frame.present("p_date").map(str::to_string),
            kind,
        }))
    }

    fn quote(&self, frame: &Frame<'_>) -> Result<QuoteUpdate> {
        let mut values = Vec::new();
        for (key, value) in frame.iter() {
            let Some((row, column)) = quote_key(key) else {
                continue;
            };
            if !self.columns.is_empty() && !self.columns.iter().any(|c| c == column) {
                continue;
            }
            values.push(QuoteValue {
                row,
                column: column.to_string(),
                value: value.to_string(),
            });
        }
        values.sort_by(|a, b| (a.row, &a.column).cmp(&(b.row, &b.column)));
        Ok(QuoteUpdate { values })
    }
}

/// `p_<row>_<column>` → (row, column).
fn quote_key(key: &str) -> Option<(u32, &str)> {
    let rest = key.strip_prefix("p_")?;
    let (row, column) = rest.split_once('_')?;
    if column.is_empty() {
        return None;
    }
    Some((row.parse().ok()?, column))
}

fn status_frame(frame: &Frame<'_>) -> Result<Option<StreamEvent>> {
    match frame.present("p_errno") {
        None | Some("0") => Ok(None),
        Some(errno) => Err(Error::StreamStatus {
            errno: errno.to_string(),
            message: frame.get("p_err").unwrap_or_default().to_string(),
        }),
    }
}

fn sequence(frame: &Frame<'_>) -> Result<u64> {
    let raw = frame
        .present("p_no")
        .ok_or_else(|| Error::frame("missing p_no", frame.line()))?;
    raw.parse()
        .map_err(|_| Error::frame(format!("bad p_no {raw:?}"), frame.line()))
}

fn required<'a>(frame: &Frame<'a>, key: &str) -> Result<&'a str> {
    frame
        .present(key)
        .ok_or_else(|| Error::frame(format!("missing {key}"), frame.line()))
}

fn code<C: WireCode>(frame: &Frame<'_>, key: &str) -> Result<Option<C>> {
    match frame.present(key) {
        None => Ok(None),
        Some(raw) => C::from_code(raw)
            .map(Some)
            .ok_or_else(|| Error::frame(format!("unknown code {raw:?} in {key}"), frame.line())),
    }
}

fn execution(frame: &Frame<'_>) -> Result<ExecutionNotice> {
    let raw_date = required(frame, "p_ED")?;
    let date = ExecutionDate::parse(raw_date)
        .ok_or_else(|| Error::frame(format!("bad p_ED {raw_date:?}"), frame.line()))?;

    let executed_quantity = match frame.present("p_EXSR") {
        None => None,
        Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
            Error::frame(format!("bad p_EXSR {raw:?}"), frame.line())
        })?),
    };
    let executed_price = match frame.present("p_EXPR") {
        None => None,
        Some(raw) => Some(raw.parse::<Decimal>().map_err(|_| {
            Error::frame(format!("bad p_EXPR {raw:?}"), frame.line())
        })?),
    };

    Ok(ExecutionNotice {
        key: OrderKey {
            number: OrderNumber(required(frame, "p_ON")?.to_string()),
            date,
        },
        notice_type: required(frame, "p_NT")?.to_string(),
        issue_code: frame.present("p_IC").map(str::to_string),
        side: code(frame, "p_BBKB")?,
        order_status: code(frame, "p_OST")?,
        contract_status: code(frame, "p_YST")?,
        executed_quantity,
        executed_price,
    })
}

fn news(frame: &Frame<'_>) -> Result<NewsItem> {
    Ok(NewsItem {
        id: required(frame, "p_ID")?.to_string(),
        headline: frame.get("p_HDL").unwrap_or_default().to_string(),
        categories: frame
            .values("p_CG")
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

fn system(frame: &Frame<'_>, event_type: EventType) -> SystemMessage {
    let mut fields: Vec<(String, String)> = frame
        .iter()
        .filter(|(k, _)| !matches!(*k, "p_no" | "p_cmd" | "p_date"))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    fields.sort();
    SystemMessage { event_type, fields }
}
