//! Response streaming benchmark suite.
//!
//! Measures the cost of pushing body chunks through the mock transport:
//! - Chunk counts: 16, 256, 4096
//! - Chunk sizes: 64 B, 16 KiB
//!
//! Run with: cargo bench --bench push_data
//! Results saved to: target/criterion/

use std::sync::Arc;

use asgi_bridge::{MemoryChannel, MockTransport, Scope};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const CHUNK_COUNTS: &[usize] = &[16, 256, 4096];
const CHUNK_SIZES: &[usize] = &[64, 16 * 1024];

// ============================================================================
// Benchmark: push_data
// ============================================================================

fn bench_push_data(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");

    let mut group = c.benchmark_group("push_data");

    for &size in CHUNK_SIZES {
        for &count in CHUNK_COUNTS {
            group.throughput(Throughput::Bytes((size * count) as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{size}B"), count),
                &(size, count),
                |b, &(size, count)| {
                    b.to_async(&rt).iter(|| stream_response(size, count));
                },
            );
        }
    }

    group.finish();
}

async fn stream_response(size: usize, count: usize) {
    let (channel, mut peer) = MemoryChannel::pair();
    let transport = MockTransport::new(Scope::http("GET", "/"), channel);
    let chunk = vec![0u8; size];

    transport.start_response(200, vec![]).await.expect("start");
    for _ in 0..count {
        transport.push_data(chunk.clone()).await.expect("push");
    }
    transport.complete().await.expect("complete");

    assert_eq!(peer.drain().len(), count + 2);
}

// ============================================================================
// Benchmark: pause/resume handoff
// ============================================================================

fn bench_gate_handoff(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");

    c.bench_function("gate_handoff", |b| {
        b.to_async(&rt).iter(|| async {
            let (channel, _peer) = MemoryChannel::pair();
            let transport = Arc::new(MockTransport::new(Scope::http("GET", "/"), channel));
            transport.pause_writing();

            let writer = {
                let transport = Arc::clone(&transport);
                tokio::spawn(async move { transport.push_data(b"x".to_vec()).await })
            };

            while transport.gate().waiting() == 0 {
                tokio::task::yield_now().await;
            }
            transport.resume_writing();
            writer.await.expect("join").expect("push");
        });
    });
}

criterion_group!(benches, bench_push_data, bench_gate_handoff);
criterion_main!(benches);
