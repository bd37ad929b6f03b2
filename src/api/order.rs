//! New order and cancel order.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::codec::{Fields, Payload, Request, Response};
use crate::codes::{
    AccountType, ExecutionTiming, ExitPositionType, Market, Side, StopOrderType, TradeType,
};
use crate::error::{Error, Result};
use crate::types::{ExecutionDate, OrderKey, OrderNumber, OrderPrice, SecondPassword, Status, StopOrder};

/// How long an order stays on the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderExpiry {
    #[default]
    Today,
    Until(NaiveDate),
}

impl OrderExpiry {
    pub fn to_wire(self) -> String {
        match self {
            OrderExpiry::Today => "0".to_string(),
            OrderExpiry::Until(date) => date.format("%Y%m%d").to_string(),
        }
    }
}

/// A margin position to close, used with [`ExitPositionType::Specified`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitPosition {
    pub position_id: String,
    pub quantity: u64,
}

/// Order entry.
///
/// Market vs limit is carried by [`OrderPrice`]. Stop parameters live in one
/// optional [`StopOrder`], so trigger and stop price are either both present
/// or both absent. The broker remains the judge of every other combination.
#[derive(Debug, Clone)]
pub struct NewOrderRequest {
    pub account_type: AccountType,
    pub issue_code: String,
    pub market: Market,
    pub side: Side,
    pub timing: ExecutionTiming,
    pub price: OrderPrice,
    pub quantity: u64,
    pub trade_type: TradeType,
    pub expiry: OrderExpiry,
    pub stop: Option<StopOrder>,
    pub exit_position: ExitPositionType,
    pub exit_positions: Vec<ExitPosition>,
    pub second_password: SecondPassword,
}

impl NewOrderRequest {
    /// A day cash order on the Tokyo market in the specific account.
    pub fn cash(
        issue_code: impl Into<String>,
        side: Side,
        price: OrderPrice,
        quantity: u64,
        second_password: SecondPassword,
    ) -> Self {
        Self {
            account_type: AccountType::Specific,
            issue_code: issue_code.into(),
            market: Market::Tokyo,
            side,
            timing: ExecutionTiming::Anytime,
            price,
            quantity,
            trade_type: TradeType::Cash,
            expiry: OrderExpiry::Today,
            stop: None,
            exit_position: ExitPositionType::NotApplicable,
            exit_positions: Vec::new(),
            second_password,
        }
    }

    pub fn with_account_type(mut self, account_type: AccountType) -> Self {
        self.account_type = account_type;
        self
    }

    pub fn with_market(mut self, market: Market) -> Self {
        self.market = market;
        self
    }

    pub fn with_timing(mut self, timing: ExecutionTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_trade_type(mut self, trade_type: TradeType) -> Self {
        self.trade_type = trade_type;
        self
    }

    pub fn with_expiry(mut self, expiry: OrderExpiry) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_stop(mut self, stop: StopOrder) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Close specific margin positions.
    pub fn closing_positions(mut self, positions: Vec<ExitPosition>) -> Self {
        self.exit_position = ExitPositionType::Specified;
        self.exit_positions = positions;
        self
    }

    pub fn with_exit_position(mut self, exit_position: ExitPositionType) -> Self {
        self.exit_position = exit_position;
        self
    }

    pub fn stop_order_type(&self) -> StopOrderType {
        self.stop
            .map(|s| s.kind.order_type())
            .unwrap_or(StopOrderType::Normal)
    }
}

impl Request for NewOrderRequest {
    const COMMAND: &'static str = "CLMKabuNewOrder";
    const ACK: &'static str = "CLMKabuNewOrder";
    type Response = NewOrderResponse;

    fn encode_fields(&self, payload: &mut Payload) {
        payload.put_code("sZyoutoekiKazeiC", self.account_type);
        payload.put("sIssueCode", self.issue_code.as_str());
        payload.put_code("sSizyouC", self.market);
        payload.put_code("sBaibaiKubun", self.side);
        payload.put_code("sCondition", self.timing);
        payload.put("sOrderPrice", self.price.to_wire());
        payload.put("sOrderSuryou", self.quantity.to_string());
        payload.put_code("sGenkinShinyouKubun", self.trade_type);
        payload.put("sOrderExpireDay", self.expiry.to_wire());
        payload.put_code("sGyakusasiOrderType", self.stop_order_type());
        match self.stop {
            Some(stop) => {
                payload.put("sGyakusasiZyouken", stop.trigger_price.to_string());
                payload.put("sGyakusasiPrice", stop.price.to_wire());
            }
            None => {
                payload.put("sGyakusasiZyouken", "0");
                payload.put("sGyakusasiPrice", "*");
            }
        }
        payload.put_code("sTatebiType", self.exit_position);
        if self.exit_position == ExitPositionType::Specified {
            let positions = self
                .exit_positions
                .iter()
                .map(|p| {
                    let mut item = Payload::default();
                    item.put("sTatebiID", p.position_id.as_str());
                    item.put("sTatebiSuryou", p.quantity.to_string());
                    item
                })
                .collect();
            payload.put_list("aCLMKabuHensaiData", positions);
        }
        payload.put("sSecondPassword", self.second_password.expose());
    }
}

/// Outcome of an order entry.
#[derive(Debug, Clone)]
pub struct NewOrderResponse {
    pub status: Status,
    pub order_number: Option<OrderNumber>,
    pub execution_date: Option<ExecutionDate>,
    /// Estimated settlement amount.
    pub settlement_amount: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub ordered_at: Option<String>,
}

impl NewOrderResponse {
    /// The handle for every later lookup of this order. Only available when
    /// the order was accepted.
    pub fn order_key(&self) -> Result<OrderKey> {
        if !self.status.is_success() {
            return Err(Error::Rejected(self.status.clone()));
        }
        match (&self.order_number, self.execution_date) {
            (Some(number), Some(date)) => Ok(OrderKey {
                number: number.clone(),
                date,
            }),
            _ => Err(Error::Rejected(self.status.clone())),
        }
    }
}

impl Response for NewOrderResponse {
    fn decode(fields: &Fields<'_>, status: Status) -> Result<Self> {
        let (order_number, execution_date) = decode_key(fields, &status)?;
        Ok(NewOrderResponse {
            order_number,
            execution_date,
            settlement_amount: fields.decimal("sOrderUkewatasiKingaku")?,
            commission: fields.decimal("sOrderTesuryou")?,
            tax: fields.decimal("sOrderSyouhizei")?,
            ordered_at: fields.text("sOrderDate")?.filter(|s| !s.is_empty()),
            status,
        })
    }
}

/// Order number and business day. Both are required when the call succeeded.
fn decode_key(
    fields: &Fields<'_>,
    status: &Status,
) -> Result<(Option<OrderNumber>, Option<ExecutionDate>)> {
    if status.is_success() {
        let number = fields.required_verbatim("sOrderNumber")?;
        let date = fields.required_date("sEigyouDay")?;
        Ok((Some(OrderNumber(number)), Some(date)))
    } else {
        let number = fields
            .text("sOrderNumber")?
            .filter(|s| !s.trim().is_empty())
            .map(OrderNumber);
        Ok((number, fields.date("sEigyouDay")?))
    }
}

/// Cancel an order identified by its key.
#[derive(Debug, Clone)]
pub struct CancelOrderRequest {
    pub key: OrderKey,
    pub second_password: SecondPassword,
}

impl CancelOrderRequest {
    pub fn new(key: OrderKey, second_password: SecondPassword) -> Self {
        Self {
            key,
            second_password,
        }
    }
}

impl Request for CancelOrderRequest {
    const COMMAND: &'static str = "CLMKabuCancelOrder";
    const ACK: &'static str = "CLMKabuCancelOrder";
    type Response = CancelOrderResponse;

    fn encode_fields(&self, payload: &mut Payload) {
        payload.put("sOrderNumber", self.key.number.as_str());
        payload.put("sEigyouDay", self.key.date.to_wire());
        payload.put("sSecondPassword", self.second_password.expose());
    }
}

#[derive(Debug, Clone)]
pub struct CancelOrderResponse {
    pub status: Status,
    pub order_number: Option<OrderNumber>,
    pub execution_date: Option<ExecutionDate>,
    pub settlement_amount: Option<Decimal>,
    pub cancelled_at: Option<String>,
}

impl Response for CancelOrderResponse {
    fn decode(fields: &Fields<'_>, status: Status) -> Result<Self> {
        let (order_number, execution_date) = decode_key(fields, &status)?;
        Ok(CancelOrderResponse {
            order_number,
            execution_date,
            settlement_amount: fields.decimal("sOrderUkewatasiKingaku")?,
            cancelled_at: fields.text("sOrderDate")?.filter(|s| !s.is_empty()),
            status,
        })
    }
}
