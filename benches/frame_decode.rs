//! Decoding benchmarks for the event stream and the response codec.
//!
//! Measures:
//! - Quote frame decoding at several board sizes
//! - Execution notice decoding
//! - Order list response decoding

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::{Value, json};
use tachibana::api::OrderListFilter;
use tachibana::codec;
use tachibana::mock::{self, frame};
use tachibana::stream::FrameDecoder;

const COLUMNS: [&str; 8] = ["DPP", "DV", "DOP", "DHP", "DLP", "GBP1", "GAP1", "DYSS"];

/// One quote frame with `rows` board rows of every column.
fn quote_line(seq: u64, rows: u32) -> String {
    let mut fields: Vec<(String, String)> = vec![
        ("p_no".into(), seq.to_string()),
        ("p_date".into(), "2024.03.15-09:00:01.123".into()),
        ("p_cmd".into(), "FD".into()),
    ];
    for row in 1..=rows {
        for col in COLUMNS {
            fields.push((format!("p_{row}_{col}"), format!("{}", 4000 + row)));
        }
    }
    let pairs: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    frame(&pairs)
}

/// Benchmark: decode quote frames of growing width
fn bench_quote_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("quote_frame");

    for rows in [1u32, 10, 120] {
        let lines: Vec<String> = (1..=1000).map(|seq| quote_line(seq, rows)).collect();
        group.throughput(Throughput::Elements(lines.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &lines, |b, lines| {
            b.iter(|| {
                let mut decoder = FrameDecoder::default();
                for line in lines {
                    black_box(decoder.decode(line).ok());
                }
            });
        });
    }

    group.finish();
}

/// Benchmark: decode execution notices
fn bench_execution_frames(c: &mut Criterion) {
    let lines: Vec<String> = (1..=1000u64)
        .map(|seq| {
            frame(&[
                ("p_no", seq.to_string().as_str()),
                ("p_cmd", "EC"),
                ("p_ON", "12000014"),
                ("p_ED", "20240315"),
                ("p_NT", "2"),
                ("p_IC", "6501"),
                ("p_BBKB", "3"),
                ("p_OST", "9"),
                ("p_YST", "1"),
                ("p_EXSR", "100"),
                ("p_EXPR", "3999.5"),
            ])
        })
        .collect();

    let mut group = c.benchmark_group("execution_frame");
    group.throughput(Throughput::Elements(lines.len() as u64));
    group.bench_function("decode", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::default();
            for line in &lines {
                black_box(decoder.decode(line).ok());
            }
        });
    });
    group.finish();
}

/// Benchmark: decode order list responses of growing length
fn bench_order_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_list");

    for orders in [1usize, 50, 500] {
        let entries: Vec<Value> = (0..orders)
            .map(|i| {
                json!({
                    "sOrderOrderNumber": (12000000 + i).to_string(),
                    "sOrderEigyouDay": "20240315",
                    "sOrderIssueCode": "6501",
                    "sOrderSizyouC": "00",
                    "sOrderBaibaiKubun": "3",
                    "sOrderCondition": "0",
                    "sOrderGenkinShinyouKubun": "0",
                    "sOrderOrderPrice": "4000",
                    "sOrderOrderSuryou": "100",
                    "sOrderCurrentSuryou": "100",
                    "sOrderYakuzyouSuryou": "0",
                    "sOrderYakuzyouPrice": "",
                    "sOrderStatusCode": "1",
                    "sOrderStatus": "",
                    "sOrderYakuzyouStatus": "0",
                    "sOrderGyakusasiOrderType": "0",
                    "sOrderGyakusasiZyouken": "0",
                    "sOrderGyakusasiPrice": "*",
                    "sOrderOrderDateTime": "20240315090001",
                    "sOrderYukouDay": "20240315",
                })
            })
            .collect();
        let body = mock::response("CLMOrderList", "0", "", json!({ "aOrderList": entries }));

        group.throughput(Throughput::Elements(orders as u64));
        group.bench_with_input(BenchmarkId::from_parameter(orders), &body, |b, body| {
            b.iter(|| black_box(codec::decode::<OrderListFilter>(body.as_bytes()).ok()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_quote_frames,
    bench_execution_frames,
    bench_order_list
);
criterion_main!(benches);
