//! Order service: order entry, cancellation and order queries.
//!
//! Nothing here second-guesses the broker. Cancelling a filled order or
//! sending an odd stop combination is forwarded as is, and the result code
//! says what happened.

use log::{info, warn};

use crate::api::{
    CancelOrderRequest, CancelOrderResponse, NewOrderRequest, NewOrderResponse,
    OrderDetailRequest, OrderDetailResponse, OrderListFilter, OrderListResponse,
};
use crate::client::Client;
use crate::error::Result;
use crate::session::Session;
use crate::types::OrderKey;

impl Client {
    /// Submit an order.
    pub fn new_order(&self, session: &Session, request: &NewOrderRequest) -> Result<NewOrderResponse> {
        info!(
            "New order: {} {} x{} @ {:?} ({})",
            request.side, request.issue_code, request.quantity, request.price, request.trade_type
        );
        let response = self.call(session, request)?;
        match response.order_key() {
            Ok(key) => info!("Order accepted: {key}"),
            Err(_) => warn!("Order rejected: {}", response.status),
        }
        Ok(response)
    }

    /// Cancel the order identified by `request.key`.
    pub fn cancel_order(
        &self,
        session: &Session,
        request: &CancelOrderRequest,
    ) -> Result<CancelOrderResponse> {
        info!("Cancelling order {}", request.key);
        let response = self.call(session, request)?;
        if !response.status.is_success() {
            warn!("Cancel of {} rejected: {}", request.key, response.status);
        }
        Ok(response)
    }

    /// List orders matching `filter`.
    pub fn order_list(&self, session: &Session, filter: &OrderListFilter) -> Result<OrderListResponse> {
        self.call(session, filter)
    }

    /// Fetch one order with its contracts.
    pub fn order_list_detail(&self, session: &Session, key: &OrderKey) -> Result<OrderDetailResponse> {
        self.call(session, &OrderDetailRequest { key: key.clone() })
    }
}
