//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};
use tachibana::mock::{self, MockTransport, MockTransportBuilder};
use tachibana::{Client, ClientConfig, Credentials, ExecutionDate, OrderKey, Session};

pub const DAY: &str = "20240315";

pub fn login_ok(unread_document: bool) -> String {
    mock::response(
        "CLMAuthLoginAck",
        "0",
        "",
        json!({
            "sKinsyouhouMidokuFlg": if unread_document { "1" } else { "0" },
            "sZyoutoekiKazeiC": "3",
            "sSinyouKouzaKubun": "0",
            "sUrlRequest": "https://example.test/request/t0k/",
            "sUrlMaster": "https://example.test/master/t0k/",
            "sUrlPrice": "https://example.test/price/t0k/",
            "sUrlEvent": "https://example.test/event/t0k/",
            "sUrlEventWebSocket": "",
        }),
    )
}

pub fn logout_ok() -> String {
    mock::response("CLMAuthLogoutAck", "0", "", json!({}))
}

/// Builder with a successful login already scripted.
pub fn with_login() -> MockTransportBuilder {
    MockTransport::builder().respond("CLMAuthLoginRequest", login_ok(false))
}

/// Log in through `transport` and return the client and its session.
pub fn logged_in(transport: MockTransport) -> (Client, Session) {
    let client = Client::with_transport(ClientConfig::default(), transport);
    let session = client
        .login(&Credentials::new("user01", "secret"))
        .unwrap()
        .into_session()
        .unwrap();
    (client, session)
}

pub fn key(number: &str) -> OrderKey {
    OrderKey::new(number, ExecutionDate::parse(DAY).unwrap())
}

/// One order-list entry for a Tokyo cash buy of 6501 x100 @ 4000.
pub fn order_entry(number: &str, contracted: u64, status: &str, contract_status: &str) -> Value {
    json!({
        "sOrderOrderNumber": number,
        "sOrderEigyouDay": DAY,
        "sOrderIssueCode": "6501",
        "sOrderSizyouC": "00",
        "sOrderBaibaiKubun": "3",
        "sOrderCondition": "0",
        "sOrderGenkinShinyouKubun": "0",
        "sOrderOrderPrice": "4000",
        "sOrderOrderSuryou": "100",
        "sOrderCurrentSuryou": (100 - contracted).to_string(),
        "sOrderYakuzyouSuryou": contracted.to_string(),
        "sOrderYakuzyouPrice": if contracted > 0 { "3999" } else { "" },
        "sOrderStatusCode": status,
        "sOrderStatus": "",
        "sOrderYakuzyouStatus": contract_status,
        "sOrderGyakusasiOrderType": "0",
        "sOrderGyakusasiZyouken": "0",
        "sOrderGyakusasiPrice": "*",
        "sOrderOrderDateTime": "20240315090001",
        "sOrderYukouDay": DAY,
    })
}

pub fn order_list(entries: Vec<Value>) -> String {
    let list = if entries.is_empty() {
        Value::String(String::new())
    } else {
        Value::Array(entries)
    };
    mock::response("CLMOrderList", "0", "", json!({ "aOrderList": list }))
}
