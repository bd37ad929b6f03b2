//! Order list and order detail queries.

use crate::codec::{Fields, Payload, Request, Response};
use crate::codes::{ContractStatus, InquiryStatus, OrderStatus};
use crate::error::Result;
use crate::types::{Contract, ExecutionDate, OrderKey, OrderNumber, OrderSnapshot, Status};

/// Order list query. Every field is optional; the default lists all recent
/// orders of the account.
#[derive(Debug, Clone, Default)]
pub struct OrderListFilter {
    pub issue_code: Option<String>,
    pub execution_date: Option<ExecutionDate>,
    pub inquiry_status: Option<InquiryStatus>,
}

impl OrderListFilter {
    pub fn for_issue(issue_code: impl Into<String>) -> Self {
        Self {
            issue_code: Some(issue_code.into()),
            ..Self::default()
        }
    }
}

impl Request for OrderListFilter {
    const COMMAND: &'static str = "CLMOrderList";
    const ACK: &'static str = "CLMOrderList";
    type Response = OrderListResponse;

    fn encode_fields(&self, payload: &mut Payload) {
        payload.put("sIssueCode", self.issue_code.clone().unwrap_or_default());
        payload.put(
            "sSikkouDay",
            self.execution_date.map(|d| d.to_wire()).unwrap_or_default(),
        );
        payload.put_code(
            "sOrderSyoukaiStatus",
            self.inquiry_status.unwrap_or(InquiryStatus::All),
        );
    }
}

/// Snapshots of the listed orders. Their order is not stable between calls;
/// look orders up by key.
#[derive(Debug, Clone)]
pub struct OrderListResponse {
    pub status: Status,
    pub orders: Vec<OrderSnapshot>,
}

impl OrderListResponse {
    pub fn find(&self, key: &OrderKey) -> Option<&OrderSnapshot> {
        self.orders.iter().find(|o| &o.key == key)
    }
}

impl Response for OrderListResponse {
    fn decode(fields: &Fields<'_>, status: Status) -> Result<Self> {
        let orders = fields
            .list("aOrderList")?
            .iter()
            .map(decode_snapshot)
            .collect::<Result<Vec<_>>>()?;
        Ok(OrderListResponse { status, orders })
    }
}

fn decode_snapshot(f: &Fields<'_>) -> Result<OrderSnapshot> {
    Ok(OrderSnapshot {
        key: OrderKey {
            number: OrderNumber(f.required_verbatim("sOrderOrderNumber")?),
            date: f.required_date("sOrderEigyouDay")?,
        },
        issue_code: f.required_text("sOrderIssueCode")?,
        market: f.code("sOrderSizyouC")?,
        side: f.required_code("sOrderBaibaiKubun")?,
        timing: f.code("sOrderCondition")?,
        trade_type: f.code("sOrderGenkinShinyouKubun")?,
        order_price: f.decimal("sOrderOrderPrice")?,
        requested_quantity: f.required_quantity("sOrderOrderSuryou")?,
        remaining_quantity: f.quantity("sOrderCurrentSuryou")?,
        contracted_quantity: f.required_quantity("sOrderYakuzyouSuryou")?,
        average_price: f.decimal("sOrderYakuzyouPrice")?,
        order_status: f.required_code("sOrderStatusCode")?,
        order_status_text: f.text("sOrderStatus")?.filter(|s| !s.is_empty()),
        contract_status: f.required_code("sOrderYakuzyouStatus")?,
        stop_order_type: f.code("sOrderGyakusasiOrderType")?,
        trigger_price: f.decimal("sOrderGyakusasiZyouken")?,
        stop_price: f.decimal("sOrderGyakusasiPrice")?,
        ordered_at: f.text("sOrderOrderDateTime")?.filter(|s| !s.is_empty()),
        expires_on: f.text("sOrderYukouDay")?.filter(|s| !s.is_empty()),
    })
}

/// Detail query for one order.
#[derive(Debug, Clone)]
pub struct OrderDetailRequest {
    pub key: OrderKey,
}

impl Request for OrderDetailRequest {
    const COMMAND: &'static str = "CLMOrderListDetail";
    const ACK: &'static str = "CLMOrderListDetail";
    type Response = OrderDetailResponse;

    fn encode_fields(&self, payload: &mut Payload) {
        payload.put("sOrderNumber", self.key.number.as_str());
        payload.put("sEigyouDay", self.key.date.to_wire());
    }
}

/// One order with its fills. An unfilled order has an empty contract list.
#[derive(Debug, Clone)]
pub struct OrderDetailResponse {
    pub status: Status,
    pub key: Option<OrderKey>,
    pub issue_code: Option<String>,
    pub requested_quantity: Option<u64>,
    pub contracted_quantity: Option<u64>,
    pub order_status: Option<OrderStatus>,
    pub contract_status: Option<ContractStatus>,
    pub contracts: Vec<Contract>,
}

impl OrderDetailResponse {
    /// Sum of the contracted quantities of all fills.
    pub fn filled_quantity(&self) -> u64 {
        self.contracts.iter().map(|c| c.quantity).sum()
    }
}

impl Response for OrderDetailResponse {
    fn decode(fields: &Fields<'_>, status: Status) -> Result<Self> {
        let contracts = fields
            .list("aYakuzyouSikkouList")?
            .iter()
            .map(|c| {
                Ok(Contract {
                    quantity: c.required_quantity("sYakuzyouSuryou")?,
                    price: c.required_decimal("sYakuzyouPrice")?,
                    executed_at: c.timestamp("sYakuzyouDate")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if !status.is_success() {
            return Ok(OrderDetailResponse {
                key: None,
                issue_code: fields.text("sIssueCode")?.filter(|s| !s.is_empty()),
                requested_quantity: fields.quantity("sOrderSuryou")?,
                contracted_quantity: fields.quantity("sYakuzyouSuryou")?,
                order_status: fields.code("sOrderStatusCode")?,
                contract_status: fields.code("sYakuzyouStatus")?,
                contracts,
                status,
            });
        }

        Ok(OrderDetailResponse {
            key: Some(OrderKey {
                number: OrderNumber(fields.required_verbatim("sOrderNumber")?),
                date: fields.required_date("sEigyouDay")?,
            }),
            issue_code: Some(fields.required_text("sIssueCode")?),
            requested_quantity: Some(fields.required_quantity("sOrderSuryou")?),
            contracted_quantity: Some(fields.required_quantity("sYakuzyouSuryou")?),
            order_status: Some(fields.required_code("sOrderStatusCode")?),
            contract_status: Some(fields.required_code("sYakuzyouStatus")?),
            contracts,
            status,
        })
    }
}
