//! Request and response types for each brokerage command.
//!
//! | Command | Request | Response |
//! |---------|---------|----------|
//! | login | [`LoginRequest`] | [`LoginResponse`] |
//! | logout | [`LogoutRequest`] | [`LogoutResponse`] |
//! | new order | [`NewOrderRequest`] | [`NewOrderResponse`] |
//! | cancel order | [`CancelOrderRequest`] | [`CancelOrderResponse`] |
//! | order list | [`OrderListFilter`] | [`OrderListResponse`] |
//! | order detail | [`OrderDetailRequest`] | [`OrderDetailResponse`] |

pub mod auth;
pub mod order;
pub mod query;

pub use auth::{LoginRequest, LoginResponse, LogoutRequest, LogoutResponse};
pub use order::{
    CancelOrderRequest, CancelOrderResponse, ExitPosition, NewOrderRequest, NewOrderResponse,
    OrderExpiry,
};
pub use query::{OrderDetailRequest, OrderDetailResponse, OrderListFilter, OrderListResponse};
