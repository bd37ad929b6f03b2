//! # tachibana
//!
//! Blocking client for the Tachibana Securities e-shiten trading API.
//!
//! ## Features
//!
//! - **Sessions**: login yields a [`Session`] holding the per-login virtual
//!   URLs and the strictly increasing request counter
//! - **Orders**: new cash, margin and stop orders; cancellation; order list
//!   and order detail queries
//! - **Tracking**: poll one order until a condition holds ([`tracker`])
//! - **Event stream**: quotes, execution notices and news decoded on a reader
//!   thread and delivered over channels ([`stream`])
//! - **Exact prices**: every price and amount is a [`rust_decimal::Decimal`]
//!
//! A response with a non-zero result code is not an error. It comes back in
//! `Ok` with its [`Status`] so the caller sees the broker's own wording.
//!
//! ## Quick Start
//!
//! ```
//! use tachibana::mock::{self, MockTransport};
//! use tachibana::{Client, ClientConfig, Credentials};
//! use serde_json::json;
//!
//! let transport = MockTransport::builder()
//!     .respond(
//!         "CLMAuthLoginRequest",
//!         mock::response("CLMAuthLoginAck", "0", "", json!({
//!             "sKinsyouhouMidokuFlg": "0",
//!             "sUrlRequest": "https://example.test/request/",
//!             "sUrlMaster": "https://example.test/master/",
//!             "sUrlPrice": "https://example.test/price/",
//!             "sUrlEvent": "https://example.test/event/",
//!         })),
//!     )
//!     .respond(
//!         "CLMAuthLogoutRequest",
//!         mock::response("CLMAuthLogoutAck", "0", "", json!({})),
//!     )
//!     .build();
//!
//! let client = Client::with_transport(ClientConfig::default(), transport);
//! let login = client.login(&Credentials::new("user", "secret")).unwrap();
//! let session = login.into_session().unwrap();
//!
//! let logout = client.logout(&session).unwrap();
//! assert!(logout.status.is_success());
//! assert!(session.is_closed());
//! ```
//!
//! ## Placing and Tracking an Order
//!
//! ```no_run
//! use std::time::Duration;
//! use rust_decimal::Decimal;
//! use tachibana::api::NewOrderRequest;
//! use tachibana::tracker::{CancelToken, Tracker};
//! use tachibana::{
//!     Client, ClientConfig, Credentials, OrderPrice, SecondPassword, Side,
//! };
//!
//! # fn main() -> tachibana::Result<()> {
//! let client = Client::new(ClientConfig::default())?;
//! let session = client.login(&Credentials::new("user", "secret"))?.into_session()?;
//!
//! let order = NewOrderRequest::cash(
//!     "6501",
//!     Side::Buy,
//!     OrderPrice::Limit(Decimal::new(4000, 0)),
//!     100,
//!     SecondPassword::new("trade-pin"),
//! );
//! let key = client.new_order(&session, &order)?.order_key()?;
//!
//! let outcome = Tracker::new(&client, &session, key)
//!     .issue_code("6501")
//!     .interval(Duration::from_secs(5))
//!     .run(&CancelToken::new(), |o| println!("{} contracted", o.contracted_quantity))?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod charset;
pub mod client;
pub mod codec;
pub mod codes;
pub mod config;
pub mod error;
pub mod mock;
mod orders;
pub mod session;
pub mod stream;
pub mod tracker;
pub mod transport;
pub mod types;

// Re-export public API
pub use client::Client;
pub use codes::{
    AccountType, ContractStatus, EventType, ExecutionTiming, ExitPositionType, InquiryStatus,
    Market, OrderStatus, Side, StopOrderType, TradeType, WireCode,
};
pub use config::{ApiVersion, ClientConfig, Environment};
pub use error::{Error, Result};
pub use session::{Credentials, Endpoints, Session};
pub use stream::{EventStream, StreamEvent, Subscription};
pub use tracker::{CancelToken, Observation, TrackOutcome, Tracker};
pub use types::{
    Contract, ExecutionDate, OrderKey, OrderNumber, OrderPrice, OrderSnapshot, SecondPassword,
    Status, StopKind, StopOrder,
};
