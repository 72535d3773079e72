/// Benchmarks for turning response bodies into attribute-addressable values.
///
/// Covers whole-body materialization of candle responses of increasing size and
/// lazy decoding of a pricing stream with interleaved heartbeats.
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures::TryStreamExt as _;
use oanda_client_sdk::ApiResponse;
use oanda_client_sdk::error::{Method, StatusCode};
use oanda_client_sdk::types::Url;
use oanda_client_sdk::value::Value;
use serde_json::json;

fn candles(count: usize) -> serde_json::Value {
    let candles: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "complete": true,
                "volume": 1000 + i,
                "time": format!("{}.000000000", 1_709_251_200 + i * 300),
                "mid": { "o": "1.08010", "h": "1.08220", "l": "1.07990", "c": "1.08215" }
            })
        })
        .collect();

    json!({ "instrument": "EUR_USD", "granularity": "M5", "candles": candles })
}

fn pricing_stream(prices: usize) -> String {
    (0..prices)
        .flat_map(|i| {
            let price = json!({
                "type": "PRICE",
                "instrument": "EUR_USD",
                "time": format!("{}.000000000", 1_709_251_200 + i),
                "bids": [{ "price": "1.08210", "liquidity": 1_000_000 }],
                "asks": [{ "price": "1.08224", "liquidity": 1_000_000 }],
                "tradeable": true
            });
            let heartbeat = json!({ "type": "HEARTBEAT", "time": "1709251200.000000000" });
            [format!("{price}\n"), format!("{heartbeat}\n")]
        })
        .collect()
}

fn bench_wrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize/wrap");

    for count in [10, 500, 5000] {
        let document = candles(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("candles", count), &document, |b, document| {
            b.iter(|| {
                Value::wrap(std::hint::black_box(document.clone())).expect("wrap should succeed")
            });
        });
    }

    group.finish();
}

fn bench_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize/lines");
    let url = Url::parse("https://stream-fxpractice.oanda.com/v3/accounts/X/pricing/stream")
        .expect("valid url");

    for prices in [100, 1000] {
        let body = pricing_stream(prices);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::new("pricing", prices), &body, |b, body| {
            b.iter(|| {
                let response = ApiResponse::from_bytes(
                    StatusCode::OK,
                    Method::GET,
                    url.clone(),
                    std::hint::black_box(body.clone()),
                );
                let lines: Vec<Value> = futures::executor::block_on(response.lines(false).try_collect())
                    .expect("decoding should succeed");
                assert_eq!(lines.len(), prices, "heartbeats are skipped");
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_wrap, bench_lines);
criterion_main!(benches);
