//! Order entry, cancellation and order queries over the mock transport.

mod common;

use common::{DAY, key, logged_in, order_entry, order_list, with_login};
use rust_decimal::Decimal;
use serde_json::json;
use tachibana::api::{NewOrderRequest, OrderListFilter};
use tachibana::api::CancelOrderRequest;
use tachibana::mock;
use tachibana::{
    ContractStatus, Error, ExecutionTiming, InquiryStatus, Market, OrderPrice, OrderStatus,
    SecondPassword, Side, StopKind, StopOrder, StopOrderType, TradeType,
};

fn limit_buy() -> NewOrderRequest {
    NewOrderRequest::cash(
        "6501",
        Side::Buy,
        OrderPrice::Limit(Decimal::new(4000, 0)),
        100,
        SecondPassword::new("pin"),
    )
}

fn accepted(number: &str) -> String {
    mock::response(
        "CLMKabuNewOrder",
        "0",
        "",
        json!({
            "sOrderNumber": number,
            "sEigyouDay": DAY,
            "sOrderUkewatasiKingaku": "400000",
            "sOrderTesuryou": "0",
            "sOrderSyouhizei": "0",
            "sOrderDate": "20240315090001",
        }),
    )
}

// ============================================================================
// New order
// ============================================================================

#[test]
fn accepted_order_yields_key() {
    let transport = with_login().respond("CLMKabuNewOrder", accepted("12000014")).build();
    let (client, session) = logged_in(transport.clone());

    let resp = client.new_order(&session, &limit_buy()).unwrap();
    assert!(resp.status.is_success());
    assert_eq!(resp.order_key().unwrap(), key("12000014"));
    assert_eq!(resp.settlement_amount, Some(Decimal::new(400000, 0)));

    let sent = &transport.requests_for("CLMKabuNewOrder")[0];
    assert_eq!(sent.field("sIssueCode"), Some("6501"));
    assert_eq!(sent.field("sBaibaiKubun"), Some("3"));
    assert_eq!(sent.field("sOrderPrice"), Some("4000"));
    assert_eq!(sent.field("sOrderSuryou"), Some("100"));
    assert_eq!(sent.field("sSecondPassword"), Some("pin"));
    assert_eq!(sent.url, "https://example.test/request/t0k/");
}

#[test]
fn rejected_order_key_is_guarded() {
    let rejected = mock::response(
        "CLMKabuNewOrder",
        "11104",
        "insufficient buying power",
        json!({ "sOrderNumber": "", "sEigyouDay": "" }),
    );
    let transport = with_login().respond("CLMKabuNewOrder", rejected).build();
    let (client, session) = logged_in(transport);

    let resp = client.new_order(&session, &limit_buy()).unwrap();
    assert!(!resp.status.is_success());
    assert_eq!(resp.status.text, "insufficient buying power");
    assert_eq!(resp.order_number, None);
    assert!(matches!(
        resp.order_key(),
        Err(Error::Rejected(status)) if status.code == "11104"
    ));
}

#[test]
fn accepted_order_without_number_is_malformed() {
    let broken = mock::response("CLMKabuNewOrder", "0", "", json!({ "sEigyouDay": DAY }));
    let transport = with_login().respond("CLMKabuNewOrder", broken).build();
    let (client, session) = logged_in(transport);

    let err = client.new_order(&session, &limit_buy()).unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { ref field, .. } if field == "sOrderNumber"));
}

#[test]
fn market_order_sends_zero_price() {
    let transport = with_login().respond("CLMKabuNewOrder", accepted("1")).build();
    let (client, session) = logged_in(transport.clone());

    let order = NewOrderRequest::cash("7203", Side::Sell, OrderPrice::Market, 200, SecondPassword::new("pin"))
        .with_timing(ExecutionTiming::AtClose);
    client.new_order(&session, &order).unwrap();

    let sent = &transport.requests_for("CLMKabuNewOrder")[0];
    assert_eq!(sent.field("sOrderPrice"), Some("0"));
    assert_eq!(sent.field("sCondition"), Some("4"));
    assert_eq!(sent.field("sBaibaiKubun"), Some("1"));
}

#[test]
fn stop_order_fields_survive_the_order_list() {
    let transport = with_login().respond("CLMKabuNewOrder", accepted("12000020")).build();
    let (client, session) = logged_in(transport.clone());

    let order = limit_buy()
        .with_trade_type(TradeType::MarginOpenGeneral)
        .with_stop(StopOrder {
            kind: StopKind::Stop,
            trigger_price: Decimal::new(41005, 1),
            price: OrderPrice::Limit(Decimal::new(4110, 0)),
        });
    client.new_order(&session, &order).unwrap();

    // Echo what went over the wire back through the order list.
    let sent = transport.requests_for("CLMKabuNewOrder")[0].clone();
    let mut entry = order_entry("12000020", 0, "1", "0");
    for (list_key, sent_key) in [
        ("sOrderBaibaiKubun", "sBaibaiKubun"),
        ("sOrderSizyouC", "sSizyouC"),
        ("sOrderCondition", "sCondition"),
        ("sOrderGenkinShinyouKubun", "sGenkinShinyouKubun"),
        ("sOrderOrderPrice", "sOrderPrice"),
        ("sOrderGyakusasiOrderType", "sGyakusasiOrderType"),
        ("sOrderGyakusasiZyouken", "sGyakusasiZyouken"),
        ("sOrderGyakusasiPrice", "sGyakusasiPrice"),
    ] {
        entry[list_key] = json!(sent.field(sent_key).unwrap());
    }
    transport.push_response("CLMOrderList", order_list(vec![entry]));

    let list = client
        .order_list(&session, &OrderListFilter::for_issue("6501"))
        .unwrap();
    let snapshot = list.find(&key("12000020")).unwrap();
    assert_eq!(snapshot.side, Side::Buy);
    assert_eq!(snapshot.market, Some(Market::Tokyo));
    assert_eq!(snapshot.timing, Some(ExecutionTiming::Anytime));
    assert_eq!(snapshot.trade_type, Some(TradeType::MarginOpenGeneral));
    assert_eq!(snapshot.stop_order_type, Some(StopOrderType::Stop));
    assert_eq!(snapshot.trigger_price, Some(Decimal::new(41005, 1)));
    assert_eq!(snapshot.stop_price, Some(Decimal::new(4110, 0)));
    assert_eq!(snapshot.order_price, Some(Decimal::new(4000, 0)));
}

// ============================================================================
// Cancel
// ============================================================================

#[test]
fn cancel_of_unknown_order_is_a_result_code() {
    let not_found = mock::response(
        "CLMKabuCancelOrder",
        "991036",
        "order not found",
        json!({}),
    );
    let transport = with_login().respond("CLMKabuCancelOrder", not_found).build();
    let (client, session) = logged_in(transport.clone());

    let resp = client
        .cancel_order(&session, &CancelOrderRequest::new(key("99999999"), SecondPassword::new("pin")))
        .unwrap();
    assert_eq!(resp.status.code, "991036");
    assert_eq!(resp.status.text, "order not found");

    let sent = &transport.requests_for("CLMKabuCancelOrder")[0];
    assert_eq!(sent.field("sOrderNumber"), Some("99999999"));
    assert_eq!(sent.field("sEigyouDay"), Some(DAY));
}

#[test]
fn cancel_accepted() {
    let ok = mock::response(
        "CLMKabuCancelOrder",
        "0",
        "",
        json!({ "sOrderNumber": "12000014", "sEigyouDay": DAY, "sOrderDate": "20240315091500" }),
    );
    let transport = with_login().respond("CLMKabuCancelOrder", ok).build();
    let (client, session) = logged_in(transport);

    let resp = client
        .cancel_order(&session, &CancelOrderRequest::new(key("12000014"), SecondPassword::new("pin")))
        .unwrap();
    assert!(resp.status.is_success());
    assert_eq!(resp.execution_date.map(|d| d.to_wire()), Some(DAY.to_string()));
    assert_eq!(resp.cancelled_at.as_deref(), Some("20240315091500"));
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn empty_order_list_is_valid() {
    let transport = with_login().respond("CLMOrderList", order_list(vec![])).build();
    let (client, session) = logged_in(transport);

    let list = client.order_list(&session, &OrderListFilter::default()).unwrap();
    assert!(list.status.is_success());
    assert!(list.orders.is_empty());
}

#[test]
fn order_list_filter_goes_on_the_wire() {
    let transport = with_login().respond("CLMOrderList", order_list(vec![])).build();
    let (client, session) = logged_in(transport.clone());

    let filter = OrderListFilter {
        inquiry_status: Some(InquiryStatus::Unfilled),
        ..OrderListFilter::for_issue("6501")
    };
    client.order_list(&session, &filter).unwrap();

    let sent = &transport.requests_for("CLMOrderList")[0];
    assert_eq!(sent.field("sIssueCode"), Some("6501"));
    assert_eq!(sent.field("sOrderSyoukaiStatus"), Some("1"));
}

#[test]
fn unparseable_quantity_names_the_field() {
    let mut entry = order_entry("1", 0, "1", "0");
    entry["sOrderYakuzyouSuryou"] = json!("1O0");
    let transport = with_login().respond("CLMOrderList", order_list(vec![entry])).build();
    let (client, session) = logged_in(transport);

    let err = client.order_list(&session, &OrderListFilter::default()).unwrap_err();
    assert!(
        matches!(err, Error::MalformedResponse { ref field, .. } if field == "sOrderYakuzyouSuryou")
    );
}

#[test]
fn order_detail_with_contracts() {
    let detail = mock::response(
        "CLMOrderListDetail",
        "0",
        "",
        json!({
            "sOrderNumber": "12000014",
            "sEigyouDay": DAY,
            "sIssueCode": "6501",
            "sOrderSuryou": "300",
            "sYakuzyouSuryou": "300",
            "sOrderStatusCode": "10",
            "sYakuzyouStatus": "2",
            "aYakuzyouSikkouList": [
                { "sYakuzyouSuryou": "100", "sYakuzyouPrice": "3999", "sYakuzyouDate": "20240315090002" },
                { "sYakuzyouSuryou": "200", "sYakuzyouPrice": "4000", "sYakuzyouDate": "20240315090105" },
            ],
        }),
    );
    let transport = with_login().respond("CLMOrderListDetail", detail).build();
    let (client, session) = logged_in(transport);

    let resp = client.order_list_detail(&session, &key("12000014")).unwrap();
    assert_eq!(resp.order_status, Some(OrderStatus::Filled));
    assert_eq!(resp.contract_status, Some(ContractStatus::Done));
    assert_eq!(resp.contracts.len(), 2);
    assert_eq!(resp.filled_quantity(), 300);
    assert_eq!(resp.contracts[1].price, Decimal::new(4000, 0));
}

#[test]
fn order_detail_without_contracts() {
    let detail = mock::response(
        "CLMOrderListDetail",
        "0",
        "",
        json!({
            "sOrderNumber": "12000015",
            "sEigyouDay": DAY,
            "sIssueCode": "6501",
            "sOrderSuryou": "100",
            "sYakuzyouSuryou": "0",
            "sOrderStatusCode": "1",
            "sYakuzyouStatus": "0",
            "aYakuzyouSikkouList": "",
        }),
    );
    let transport = with_login().respond("CLMOrderListDetail", detail).build();
    let (client, session) = logged_in(transport);

    let resp = client.order_list_detail(&session, &key("12000015")).unwrap();
    assert!(resp.contracts.is_empty());
    assert_eq!(resp.filled_quantity(), 0);
}
