//! Shared domain types: result status, order identity, snapshots, contracts.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use zeroize::Zeroizing;

use crate::codes::{
    ContractStatus, ExecutionTiming, Market, OrderStatus, Side, StopOrderType, TradeType,
};

/// Result code and text carried by every response.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status {
    pub code: String,
    pub text: String,
}

impl Status {
    pub const SUCCESS: &'static str = "0";

    pub fn new(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            text: text.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Self::SUCCESS
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.text)
        }
    }
}

/// Broker-assigned order number. Kept as the exact wire string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderNumber(pub String);

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Business day an order belongs to (`YYYYMMDD` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionDate(pub NaiveDate);

impl ExecutionDate {
    pub const WIRE_FORMAT: &'static str = "%Y%m%d";

    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(s, Self::WIRE_FORMAT)
            .ok()
            .map(ExecutionDate)
    }

    pub fn to_wire(self) -> String {
        self.0.format(Self::WIRE_FORMAT).to_string()
    }
}

impl fmt::Display for ExecutionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::WIRE_FORMAT))
    }
}

/// The identity of an order: its number is only unique within a business day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderKey {
    pub number: OrderNumber,
    pub date: ExecutionDate,
}

impl OrderKey {
    pub fn new(number: impl Into<String>, date: ExecutionDate) -> Self {
        Self {
            number: OrderNumber(number.into()),
            date,
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.number, self.date)
    }
}

/// Price instruction for an order or a stop leg. Market is `"0"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderPrice {
    Market,
    Limit(Decimal),
}

impl OrderPrice {
    pub fn to_wire(self) -> String {
        match self {
            OrderPrice::Market => "0".to_string(),
            OrderPrice::Limit(p) => p.to_string(),
        }
    }

    pub fn from_decimal(price: Decimal) -> Self {
        if price.is_zero() {
            OrderPrice::Market
        } else {
            OrderPrice::Limit(price)
        }
    }
}

/// Stop leg of a conditional order. Trigger and price always travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StopOrder {
    pub kind: StopKind,
    pub trigger_price: Decimal,
    pub price: OrderPrice,
}

/// Conditional order variants that carry a stop leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopKind {
    Stop,
    Oco,
}

impl StopKind {
    pub fn order_type(self) -> StopOrderType {
        match self {
            StopKind::Stop => StopOrderType::Stop,
            StopKind::Oco => StopOrderType::Oco,
        }
    }
}

/// Second (trading) password required on order entry and cancellation.
#[derive(Clone)]
pub struct SecondPassword(Zeroizing<String>);

impl SecondPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(Zeroizing::new(password.into()))
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SecondPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecondPassword(***)")
    }
}

/// Point-in-time view of one order, as reported by the order list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderSnapshot {
    pub key: OrderKey,
    pub issue_code: String,
    pub market: Option<Market>,
    pub side: Side,
    pub timing: Option<ExecutionTiming>,
    pub trade_type: Option<TradeType>,
    /// `Some(0)` for market orders.
    pub order_price: Option<Decimal>,
    pub requested_quantity: u64,
    pub remaining_quantity: Option<u64>,
    pub contracted_quantity: u64,
    pub average_price: Option<Decimal>,
    pub order_status: OrderStatus,
    /// Status text as worded by the broker.
    pub order_status_text: Option<String>,
    pub contract_status: ContractStatus,
    pub stop_order_type: Option<StopOrderType>,
    pub trigger_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub ordered_at: Option<String>,
    pub expires_on: Option<String>,
}

impl OrderSnapshot {
    /// Contract status has reached done.
    pub fn is_fully_contracted(&self) -> bool {
        self.contract_status == ContractStatus::Done
    }

    /// Fully contracted, or the order can no longer trade.
    pub fn is_finished(&self) -> bool {
        self.is_fully_contracted() || self.order_status.is_final()
    }
}

/// One fill belonging to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contract {
    pub quantity: u64,
    pub price: Decimal,
    pub executed_at: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_date_wire_round_trip() {
        let date = ExecutionDate::parse("20240315").unwrap();
        assert_eq!(date.to_wire(), "20240315");
        assert_eq!(date.0, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn execution_date_rejects_other_shapes() {
        assert!(ExecutionDate::parse("2024-03-15").is_none());
        assert!(ExecutionDate::parse("20241315").is_none());
        assert!(ExecutionDate::parse("+2024031").is_none());
        assert!(ExecutionDate::parse("").is_none());
    }

    #[test]
    fn market_price_is_zero_on_wire() {
        assert_eq!(OrderPrice::Market.to_wire(), "0");
        assert_eq!(OrderPrice::Limit(Decimal::new(15205, 1)).to_wire(), "1520.5");
        assert_eq!(OrderPrice::from_decimal(Decimal::ZERO), OrderPrice::Market);
    }

    #[test]
    fn status_display() {
        assert_eq!(Status::new("0", "").to_string(), "0");
        assert!(Status::new("0", "").is_success());
        assert!(!Status::new("-1", "bad").is_success());
    }

    #[test]
    fn second_password_is_redacted() {
        let pw = SecondPassword::new("hunter2");
        assert_eq!(format!("{pw:?}"), "SecondPassword(***)");
        assert_eq!(pw.expose(), "hunter2");
    }
}
