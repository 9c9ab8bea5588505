//! /metrics exposes the surge series once the exporter is installed.
use airwatch_core::{health_router, init_metrics, serve, SURGE_METRICS};
use opentelemetry::KeyValue;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn metrics_endpoint_contains_surge_series() {
    init_metrics().unwrap();
    init_metrics().unwrap();
    SURGE_METRICS.cycles_total.add(1, &[]);
    SURGE_METRICS.alerts_created_total.add(1, &[KeyValue::new("surge_type", "airlift")]);
    SURGE_METRICS.cycle_latency_ms.record(1.5, &[]);

    let addr = serve(health_router(), 0).await.unwrap();
    let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", addr.port())).await.unwrap();
    stream.write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await.unwrap();
    let mut resp = String::new();
    stream.read_to_string(&mut resp).await.unwrap();

    assert!(resp.starts_with("HTTP/1.1 200"), "unexpected response: {resp}");
    assert!(resp.contains("airwatch_surge_cycles_total"), "missing cycles counter");
    assert!(resp.contains("airwatch_surge_alerts_created_total"), "missing alerts counter");
    assert!(resp.contains("airwatch_surge_cycle_latency"), "missing latency histogram");
}
