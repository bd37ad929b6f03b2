//! Property-based tests for the wire codec and the stream decoder.
//!
//! These tests use proptest to check that decoding never panics and that the
//! stream never delivers a sequence number twice or out of order.

use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tachibana::api::{NewOrderRequest, OrderListFilter};
use tachibana::codec::{self, Request};
use tachibana::mock::frame;
use tachibana::stream::FrameDecoder;
use tachibana::{OrderPrice, SecondPassword, Side, WireCode};

/// Generate a frame line: mostly valid quote frames, some noise
fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (0u64..50, "[0-9]{1,5}").prop_map(|(seq, px)| {
            frame(&[("p_no", seq.to_string().as_str()), ("p_cmd", "FD"), ("p_1_DPP", px.as_str())])
        }),
        1 => Just(frame(&[("p_cmd", "KP")])),
        1 => Just(String::new()),
        1 => (0u64..50).prop_map(|seq| frame(&[("p_no", seq.to_string().as_str()), ("p_cmd", "ZZ")])),
    ]
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop::sample::select(Side::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // ========================================================================
    // STREAM ORDERING
    // ========================================================================

    /// Delivered sequence numbers strictly increase, whatever arrives.
    #[test]
    fn delivered_sequences_strictly_increase(lines in prop::collection::vec(line_strategy(), 0..60)) {
        let mut decoder = FrameDecoder::default();
        let mut delivered = Vec::new();
        for line in &lines {
            if let Some(event) = decoder.decode(line).unwrap() {
                delivered.push(event.sequence);
            }
        }
        for pair in delivered.windows(2) {
            prop_assert!(pair[0] < pair[1], "out of order: {:?}", delivered);
        }
        prop_assert_eq!(decoder.last_sequence(), delivered.last().copied());
    }

    /// Arbitrary input is either decoded, dropped or rejected. Never a panic.
    #[test]
    fn arbitrary_lines_never_panic(line in "\\PC{0,80}") {
        let mut decoder = FrameDecoder::default();
        let _ = decoder.decode(&line);
    }

    // ========================================================================
    // REQUEST ENCODING
    // ========================================================================

    /// Every request field is a string and the envelope is always present.
    #[test]
    fn new_order_payload_is_flat_strings(
        side in side_strategy(),
        qty in 1u64..1_000_000,
        cents in 1i64..100_000_000,
        request_no in 2u64..u64::MAX,
    ) {
        let price = OrderPrice::Limit(Decimal::new(cents, 2));
        let order = NewOrderRequest::cash("6501", side, price, qty, SecondPassword::new("pin"));
        let encoded = codec::encode(&order, request_no, &chrono::Local::now());
        let Value::Object(map) = serde_json::from_str::<Value>(&encoded).unwrap() else {
            panic!("payload is not an object");
        };

        prop_assert!(map.values().all(Value::is_string));
        let no = request_no.to_string();
        prop_assert_eq!(map["p_no"].as_str(), Some(no.as_str()));
        prop_assert_eq!(map["sCLMID"].as_str(), Some(NewOrderRequest::COMMAND));
        prop_assert_eq!(map["sBaibaiKubun"].as_str(), Some(side.as_code()));
        let qty_text = qty.to_string();
        prop_assert_eq!(map["sOrderSuryou"].as_str(), Some(qty_text.as_str()));
    }

    /// Result codes and texts come back exactly as sent.
    #[test]
    fn status_is_preserved(code in "[0-9]{1,6}", text in "\\PC{0,40}") {
        let body = json!({
            "sCLMID": "CLMOrderList",
            "sResultCode": code,
            "sResultText": text,
            "aOrderList": "",
        })
        .to_string();
        let resp = codec::decode::<OrderListFilter>(body.as_bytes()).unwrap();
        prop_assert_eq!(resp.status.code, code.trim().to_string());
        prop_assert_eq!(resp.status.text, text);
    }
}
