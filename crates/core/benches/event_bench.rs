//! 이벤트 버스 벤치마크
//!
//! 레코드 생성, 발행 팬아웃, 배치 봉인 성능을 측정합니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tailpost_core::codec::{self, SharedKey};
use tailpost_core::event::{EventBus, TOPIC_RECORD_DISCOVERED};
use tailpost_core::types::{HostIdentity, Record};

fn create_record(identity: &HostIdentity) -> Record {
    let mut record = Record::new(
        identity,
        "nginx",
        "/var/log/nginx/access.log",
        r#"10.0.0.1 - - [10/Oct/2026:13:55:36 +0000] "GET /api/v1/users HTTP/1.1" 200"#,
    );
    record.fields.insert("ip".to_owned(), "10.0.0.1".to_owned());
    record.fields.insert("method".to_owned(), "GET".to_owned());
    record.fields.insert("path".to_owned(), "/api/v1/users".to_owned());
    record.fields.insert("status".to_owned(), "200".to_owned());
    record
}

fn bench_record_creation(c: &mut Criterion) {
    let identity = HostIdentity::new("bench", "ws", "host-01");

    let mut group = c.benchmark_group("record_creation");
    group.throughput(Throughput::Elements(1));
    group.bench_function("record_with_fields", |b| {
        b.iter(|| black_box(create_record(black_box(&identity))))
    });
    group.finish();
}

fn bench_publish_fanout(c: &mut Criterion) {
    let identity = HostIdentity::new("bench", "ws", "host-01");
    let record = Arc::new(create_record(&identity));

    let mut group = c.benchmark_group("publish_fanout");
    group.throughput(Throughput::Elements(1));

    for subscribers in [1usize, 2, 8] {
        let bus: EventBus<Record> = EventBus::new();
        let counter = Arc::new(AtomicU64::new(0));
        for i in 0..subscribers {
            let counter = Arc::clone(&counter);
            bus.subscribe(
                TOPIC_RECORD_DISCOVERED,
                i as i32,
                Arc::new(move |_: &str, _: &Arc<Record>| {
                    counter.fetch_add(1, Ordering::Relaxed);
                }),
            );
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| b.iter(|| bus.publish(TOPIC_RECORD_DISCOVERED, Arc::clone(black_box(&record)))),
        );
    }
    group.finish();
}

fn bench_seal_batch(c: &mut Criterion) {
    let identity = HostIdentity::new("bench", "ws", "host-01");
    let key = SharedKey::derive("bench-secret");

    let mut group = c.benchmark_group("seal_batch");
    for size in [100usize, 1_000] {
        let records: Vec<Record> = (0..size).map(|_| create_record(&identity)).collect();
        let payload = serde_json::to_vec(&serde_json::json!({ "records": records }))
            .expect("serialize batch");

        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| codec::seal(black_box(&key), black_box(payload)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_record_creation,
    bench_publish_fanout,
    bench_seal_batch
);
criterion_main!(benches);
