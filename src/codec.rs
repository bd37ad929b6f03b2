//! Wire codec: typed requests to JSON payloads, JSON responses to typed results.
//!
//! Requests are flat JSON objects of string values. Every request carries the
//! session request number (`p_no`), the send timestamp (`p_sd_date`), the
//! command id (`sCLMID`) and the output format (`sJsonOfmt`).
//!
//! Responses are decoded in three steps:
//!
//! 1. the envelope (`p_errno` / `p_err`) — a non-zero value means the request
//!    was refused before the command ran;
//! 2. the command id, which must match the acknowledgement the request expects;
//! 3. the result status (`sResultCode` / `sResultText`) and command fields.
//!
//! A non-zero result code is a normal outcome. Decoding still runs over the
//! whole body, and the status is handed to the caller untouched.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::codes::WireCode;
use crate::error::{Error, Result};
use crate::types::{ExecutionDate, Status};

/// Format of `p_sd_date`.
pub const TIMESTAMP_FORMAT: &str = "%Y.%m.%d-%H:%M:%S%.3f";

/// Output format requested from the server.
const JSON_OUTPUT_FORMAT: &str = "5";

/// Envelope error number reported when the session is no longer valid.
pub const SESSION_INVALID_ERRNO: &str = "2";

/// A typed request with a fixed command id and response type.
pub trait Request {
    /// Command id sent as `sCLMID`.
    const COMMAND: &'static str;

    /// Command id the response must carry.
    const ACK: &'static str;

    type Response: Response;

    /// Write the command-specific fields.
    fn encode_fields(&self, payload: &mut Payload);
}

/// A typed response decoded from the wire fields and the result status.
pub trait Response: Sized {
    fn decode(fields: &Fields<'_>, status: Status) -> Result<Self>;
}

/// Command fields of a request under construction.
#[derive(Debug, Default)]
pub struct Payload {
    map: Map<String, Value>,
}

impl Payload {
    pub fn put(&mut self, key: &str, value: impl Into<String>) {
        self.map.insert(key.to_string(), Value::String(value.into()));
    }

    pub fn put_code<C: WireCode>(&mut self, key: &str, code: C) {
        self.put(key, code.as_code());
    }

    /// A list of nested objects, used for the positions of a margin close.
    pub fn put_list(&mut self, key: &str, items: Vec<Payload>) {
        let items = items.into_iter().map(|p| Value::Object(p.map)).collect();
        self.map.insert(key.to_string(), Value::Array(items));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(Value::as_str)
    }
}

/// Encode a request with its envelope. Never fails on a well-typed request.
pub fn encode<R: Request, Tz: TimeZone>(request: &R, request_no: u64, sent_at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut payload = Payload::default();
    payload.put("p_no", request_no.to_string());
    payload.put("p_sd_date", sent_at.format(TIMESTAMP_FORMAT).to_string());
    payload.put("sCLMID", R::COMMAND);
    request.encode_fields(&mut payload);
    payload.put("sJsonOfmt", JSON_OUTPUT_FORMAT);
    Value::Object(payload.map).to_string()
}

/// Decode a response body for request type `R`.
pub fn decode<R: Request>(body: &[u8]) -> Result<R::Response> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Object(map) = value else {
        return Err(Error::malformed("<root>", "", "expected a JSON object"));
    };
    let fields = Fields::new(&map);

    check_envelope(&fields)?;

    let command = fields.required_text("sCLMID")?;
    if command != R::ACK {
        return Err(Error::malformed(
            "sCLMID",
            &command,
            format!("expected {}", R::ACK),
        ));
    }

    let status = Status {
        code: fields.required_text("sResultCode")?,
        text: fields.text("sResultText")?.unwrap_or_default(),
    };

    R::Response::decode(&fields, status)
}

fn check_envelope(fields: &Fields<'_>) -> Result<()> {
    let errno = fields.text("p_errno")?.unwrap_or_default();
    if errno.is_empty() || errno == "0" {
        return Ok(());
    }
    let message = fields.text("p_err")?.unwrap_or_default();
    if errno == SESSION_INVALID_ERRNO {
        return Err(Error::SessionExpired(message));
    }
    Err(Error::Refused { errno, message })
}

/// Read-only view over the fields of a decoded object.
///
/// Optional accessors return `Ok(None)` when a field is missing, empty, or
/// the not-applicable marker `*`. A value that is present but does not parse
/// is always an error naming the field.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    /// Raw scalar value. Numbers are accepted and rendered as text.
    fn scalar(&self, key: &str) -> Result<Option<String>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(if *b { "1" } else { "0" }.to_string())),
            Some(other) => Err(Error::malformed(key, &other.to_string(), "expected a scalar")),
        }
    }

    /// Value with blanks and the not-applicable marker folded into `None`.
    fn present(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .scalar(key)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && s != "*"))
    }

    /// Text field, verbatim. Missing or null is `None`.
    pub fn text(&self, key: &str) -> Result<Option<String>> {
        self.scalar(key)
    }

    pub fn required_text(&self, key: &str) -> Result<String> {
        self.present(key)?
            .ok_or_else(|| Error::malformed(key, "", "required field is missing"))
    }

    /// Required identifier, returned byte for byte. Blank still counts as missing.
    pub fn required_verbatim(&self, key: &str) -> Result<String> {
        self.scalar(key)?
            .filter(|s| !s.trim().is_empty() && s.trim() != "*")
            .ok_or_else(|| Error::malformed(key, "", "required field is missing"))
    }

    pub fn quantity(&self, key: &str) -> Result<Option<u64>> {
        match self.present(key)? {
            None => Ok(None),
            Some(raw) => raw
                .parse::<u64>()
                .map(Some)
                .map_err(|_| Error::malformed(key, &raw, "not a quantity")),
        }
    }

    pub fn required_quantity(&self, key: &str) -> Result<u64> {
        self.quantity(key)?
            .ok_or_else(|| Error::malformed(key, "", "required quantity is missing"))
    }

    pub fn decimal(&self, key: &str) -> Result<Option<Decimal>> {
        match self.present(key)? {
            None => Ok(None),
            Some(raw) => raw
                .parse::<Decimal>()
                .map(Some)
                .map_err(|_| Error::malformed(key, &raw, "not a decimal amount")),
        }
    }

    pub fn required_decimal(&self, key: &str) -> Result<Decimal> {
        self.decimal(key)?
            .ok_or_else(|| Error::malformed(key, "", "required amount is missing"))
    }

    pub fn code<C: WireCode>(&self, key: &str) -> Result<Option<C>> {
        match self.present(key)? {
            None => Ok(None),
            Some(raw) => C::from_code(&raw)
                .map(Some)
                .ok_or_else(|| Error::malformed(key, &raw, "unknown code")),
        }
    }

    pub fn required_code<C: WireCode>(&self, key: &str) -> Result<C> {
        self.code(key)?
            .ok_or_else(|| Error::malformed(key, "", "required code is missing"))
    }

    pub fn date(&self, key: &str) -> Result<Option<ExecutionDate>> {
        match self.present(key)? {
            None => Ok(None),
            Some(raw) => ExecutionDate::parse(&raw)
                .map(Some)
                .ok_or_else(|| Error::malformed(key, &raw, "not a YYYYMMDD date")),
        }
    }

    pub fn required_date(&self, key: &str) -> Result<ExecutionDate> {
        self.date(key)?
            .ok_or_else(|| Error::malformed(key, "", "required date is missing"))
    }

    /// `YYYYMMDDhhmmss` timestamp.
    pub fn timestamp(&self, key: &str) -> Result<Option<NaiveDateTime>> {
        match self.present(key)? {
            None => Ok(None),
            Some(raw) => NaiveDateTime::parse_from_str(&raw, "%Y%m%d%H%M%S")
                .map(Some)
                .map_err(|_| Error::malformed(key, &raw, "not a YYYYMMDDhhmmss timestamp")),
        }
    }

    /// `"0"` / `"1"` flag.
    pub fn flag(&self, key: &str) -> Result<Option<bool>> {
        match self.present(key)?.as_deref() {
            None => Ok(None),
            Some("0") => Ok(Some(false)),
            Some("1") => Ok(Some(true)),
            Some(raw) => Err(Error::malformed(key, raw, "expected 0 or 1")),
        }
    }

    /// Array of objects. The server sends an empty string for an empty list.
    pub fn list(&self, key: &str) -> Result<Vec<Fields<'a>>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(s)) if s.is_empty() => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(map) => Ok(Fields::new(map)),
                    other => Err(Error::malformed(
                        &format!("{key}[{i}]"),
                        &other.to_string(),
                        "expected an object",
                    )),
                })
                .collect(),
            Some(other) => Err(Error::malformed(key, &other.to_string(), "expected a list")),
        }
    }
}
