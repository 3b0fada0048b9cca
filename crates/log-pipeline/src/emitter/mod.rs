//! 전송기 -- 레코드 버퍼링과 수집 서버로의 배치 전송
//!
//! [`Emitter`]는 [`TOPIC_RECORD_DISCOVERED`]를 우선순위 20으로 구독하여 모든 레코드를
//! [`PendingBatch`]에 쌓습니다. 전송 주기마다(그리고 정지 시 한 번) 앞에서부터
//! 최대 `batch_size`개를 꺼내 `{"records": [...]}` → gzip → 암호화 후 전송합니다.
//!
//! # 동시성
//! - 버퍼 락(`parking_lot::Mutex`)은 추가/꺼내기/되돌리기 동안만 잡습니다.
//! - 전송 락(`tokio::sync::Mutex`)은 네트워크 호출 동안 잡혀 동시에 하나의 전송만 진행됩니다.
//! - 실패한 배치는 그 사이 추가된 레코드보다 앞에 되돌아갑니다.
//! - 용량 초과로 버린 레코드는 카운터에 즉시 반영하고, 경고 로그는 플러시마다 한 번 남깁니다.

pub mod buffer;
pub mod transport;

pub use buffer::PendingBatch;
pub use transport::{BatchTransport, HttpTransport};

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tailpost_core::codec::{self, SharedKey};
use tailpost_core::error::TailpostError;
use tailpost_core::event::{EventBus, SubscriptionId, TOPIC_RECORD_DISCOVERED};
use tailpost_core::metrics as m;
use tailpost_core::pipeline::{HealthStatus, Pipeline};
use tailpost_core::types::Record;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EmitterSettings;
use crate::error::LogPipelineError;
use crate::state::ComponentState;

/// 전송기의 구독 우선순위
pub const EMITTER_PRIORITY: i32 = 20;

/// 전송 페이로드
#[derive(Serialize)]
struct RecordsPayload<'a> {
    records: Vec<&'a Record>,
}

/// 레코드 배치를 직렬화하고 봉인합니다.
pub fn encode_batch(key: &SharedKey, records: &[Arc<Record>]) -> Result<Vec<u8>, LogPipelineError> {
    let payload = RecordsPayload {
        records: records.iter().map(|r| &**r).collect(),
    };
    let json = serde_json::to_vec(&payload)
        .map_err(|e| LogPipelineError::Codec(tailpost_core::error::CodecError::Serialize(e.to_string())))?;
    Ok(codec::seal(key, &json)?)
}

/// 한 번의 플러시 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// 버퍼가 비어 있음
    Empty,
    /// 전송 성공 (레코드 수)
    Sent(usize),
    /// 전송 실패, 배치를 되돌림 (레코드 수)
    Requeued(usize),
}

struct EmitterShared {
    settings: EmitterSettings,
    key: SharedKey,
    transport: Arc<dyn BatchTransport>,
    buffer: parking_lot::Mutex<PendingBatch<Arc<Record>>>,
    send_lock: tokio::sync::Mutex<()>,
}

impl EmitterShared {
    fn append(&self, record: Arc<Record>) {
        let (dropped, len) = {
            let mut buffer = self.buffer.lock();
            let dropped = buffer.push(record);
            (dropped, buffer.len())
        };
        if dropped > 0 {
            counter!(m::EMITTER_RECORDS_DROPPED_TOTAL).increment(dropped as u64);
        }
        gauge!(m::EMITTER_BUFFER_SIZE).set(len as f64);
    }

    async fn flush(&self) -> FlushOutcome {
        let _sending = self.send_lock.lock().await;

        let (batch, dropped, total_dropped) = {
            let mut buffer = self.buffer.lock();
            let batch = buffer.drain_prefix(self.settings.batch_size);
            (batch, buffer.take_unreported_drops(), buffer.dropped_count())
        };
        if dropped > 0 {
            warn!(
                dropped,
                total_dropped,
                capacity = self.settings.buffer_capacity,
                "emitter buffer full, dropped oldest records"
            );
        }
        if batch.is_empty() {
            return FlushOutcome::Empty;
        }
        let count = batch.len();

        let started = Instant::now();
        let result = match encode_batch(&self.key, &batch) {
            Ok(sealed) => self.transport.send(sealed).await,
            Err(e) => Err(e),
        };
        histogram!(m::EMITTER_SEND_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                counter!(m::EMITTER_BATCHES_SENT_TOTAL).increment(1);
                counter!(m::EMITTER_RECORDS_SENT_TOTAL).increment(count as u64);
                gauge!(m::EMITTER_BUFFER_SIZE).set(self.buffer.lock().len() as f64);
                debug!(records = count, endpoint = self.transport.target(), "batch sent");
                FlushOutcome::Sent(count)
            }
            Err(e) => {
                counter!(m::EMITTER_SEND_FAILURES_TOTAL).increment(1);
                let (dropped, len) = {
                    let mut buffer = self.buffer.lock();
                    let dropped = buffer.prepend(batch);
                    (dropped, buffer.len())
                };
                if dropped > 0 {
                    counter!(m::EMITTER_RECORDS_DROPPED_TOTAL).increment(dropped as u64);
                }
                gauge!(m::EMITTER_BUFFER_SIZE).set(len as f64);
                warn!(
                    records = count,
                    buffered = len,
                    endpoint = self.transport.target(),
                    error = %e,
                    "batch send failed, requeued"
                );
                FlushOutcome::Requeued(count)
            }
        }
    }
}

/// 전송기
pub struct Emitter {
    shared: Arc<EmitterShared>,
    bus: Arc<EventBus<Record>>,
    state: ComponentState,
    cancel: CancellationToken,
    subscription: Option<SubscriptionId>,
    task: Option<JoinHandle<()>>,
}

impl Emitter {
    /// 전송기를 생성합니다.
    pub fn new(
        settings: EmitterSettings,
        transport: Arc<dyn BatchTransport>,
        bus: Arc<EventBus<Record>>,
    ) -> Result<Self, LogPipelineError> {
        settings.validate()?;
        let key = SharedKey::derive(&settings.secret);
        let buffer = PendingBatch::new(settings.buffer_capacity);
        Ok(Self {
            shared: Arc::new(EmitterShared {
                settings,
                key,
                transport,
                buffer: parking_lot::Mutex::new(buffer),
                send_lock: tokio::sync::Mutex::new(()),
            }),
            bus,
            state: ComponentState::Initialized,
            cancel: CancellationToken::new(),
            subscription: None,
            task: None,
        })
    }

    /// 레코드를 버퍼에 추가합니다.
    pub fn append(&self, record: Arc<Record>) {
        self.shared.append(record);
    }

    /// 버퍼 앞부분을 한 번 전송합니다.
    pub async fn flush(&self) -> FlushOutcome {
        self.shared.flush().await
    }

    /// 버퍼의 레코드 수
    pub fn buffered(&self) -> usize {
        self.shared.buffer.lock().len()
    }

    /// 버퍼의 레코드 원본 라인 (앞에서부터)
    pub fn buffered_raw(&self) -> Vec<String> {
        self.shared.buffer.lock().iter().map(|r| r.raw.clone()).collect()
    }

    /// 용량 초과로 버린 레코드 수
    pub fn dropped(&self) -> u64 {
        self.shared.buffer.lock().dropped_count()
    }

    /// 현재 상태 이름
    pub fn state_name(&self) -> &str {
        self.state.name()
    }
}

impl Pipeline for Emitter {
    async fn start(&mut self) -> Result<(), TailpostError> {
        self.state.ensure_startable()?;
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        info!(
            target_url = self.shared.transport.target(),
            batch_size = self.shared.settings.batch_size,
            buffer_capacity = self.shared.settings.buffer_capacity,
            "starting emitter"
        );

        let shared = Arc::clone(&self.shared);
        self.subscription = Some(self.bus.subscribe(
            TOPIC_RECORD_DISCOVERED,
            EMITTER_PRIORITY,
            Arc::new(move |_topic: &str, record: &Arc<Record>| shared.append(Arc::clone(record))),
        ));

        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        self.task = Some(tokio::spawn(async move {
            let period = shared.settings.frequency;
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        shared.flush().await;
                    }
                }
            }
        }));

        self.state = ComponentState::Running;
        info!("emitter started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TailpostError> {
        self.state.ensure_running()?;
        info!("stopping emitter");

        if let Some(id) = self.subscription.take() {
            self.bus.unsubscribe(id);
        }
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }

        let outcome = self.shared.flush().await;
        let remaining = self.buffered();
        if remaining > 0 {
            warn!(remaining, ?outcome, "emitter stopped with unsent records");
        }

        self.state = ComponentState::Stopped;
        info!(?outcome, "emitter stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        self.state.health(|| {
            let utilization = self.shared.buffer.lock().utilization();
            if utilization >= 0.9 {
                HealthStatus::Degraded(format!("buffer {:.0}% full", utilization * 100.0))
            } else {
                HealthStatus::Healthy
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tailpost_core::pipeline::BoxFuture;
    use tailpost_core::types::HostIdentity;

    #[derive(Default)]
    struct Recording {
        sent: parking_lot::Mutex<Vec<Vec<u8>>>,
        fail: AtomicBool,
    }

    impl BatchTransport for Recording {
        fn target(&self) -> &str {
            "memory"
        }

        fn send<'a>(&'a self, sealed: Vec<u8>) -> BoxFuture<'a, Result<(), LogPipelineError>> {
            Box::pin(async move {
                if self.fail.load(Ordering::SeqCst) {
                    return Err(LogPipelineError::Transport("unavailable".to_owned()));
                }
                self.sent.lock().push(sealed);
                Ok(())
            })
        }
    }

    fn settings(batch_size: usize, buffer_capacity: usize) -> EmitterSettings {
        EmitterSettings {
            endpoint: "http://collector:59302/v1/records".to_owned(),
            secret: "s3cret".to_owned(),
            frequency: Duration::from_secs(3600),
            timeout: Duration::from_secs(1),
            batch_size,
            buffer_capacity,
        }
    }

    fn record(raw: &str) -> Arc<Record> {
        Arc::new(Record::new(&HostIdentity::new("app", "", "h"), "p", "/f", raw))
    }

    fn decode(sealed: &[u8]) -> Vec<String> {
        let json = codec::open(&SharedKey::derive("s3cret"), sealed).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        value["records"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["raw"].as_str().unwrap().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn flush_sends_prefix_up_to_batch_size() {
        let transport = Arc::new(Recording::default());
        let emitter = Emitter::new(settings(2, 10), transport.clone(), Arc::new(EventBus::new())).unwrap();
        for raw in ["a", "b", "c"] {
            emitter.append(record(raw));
        }

        assert_eq!(emitter.flush().await, FlushOutcome::Sent(2));
        assert_eq!(emitter.buffered_raw(), vec!["c"]);
        assert_eq!(decode(&transport.sent.lock()[0]), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn empty_flush_sends_nothing() {
        let transport = Arc::new(Recording::default());
        let emitter = Emitter::new(settings(2, 10), transport.clone(), Arc::new(EventBus::new())).unwrap();
        assert_eq!(emitter.flush().await, FlushOutcome::Empty);
        assert!(transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn failed_send_requeues_ahead_of_new_records() {
        let transport = Arc::new(Recording::default());
        let emitter = Emitter::new(settings(10, 10), transport.clone(), Arc::new(EventBus::new())).unwrap();
        emitter.append(record("k1"));
        emitter.append(record("k2"));

        transport.fail.store(true, Ordering::SeqCst);
        assert_eq!(emitter.flush().await, FlushOutcome::Requeued(2));
        emitter.append(record("m1"));
        assert_eq!(emitter.buffered_raw(), vec!["k1", "k2", "m1"]);

        transport.fail.store(false, Ordering::SeqCst);
        assert_eq!(emitter.flush().await, FlushOutcome::Sent(3));
        assert_eq!(decode(&transport.sent.lock()[0]), vec!["k1", "k2", "m1"]);
    }

    /// 전송 중에 멈춰 서서 테스트가 풀어줄 때까지 기다리는 전송 계층
    #[derive(Default)]
    struct Gated {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
        fail: AtomicBool,
    }

    impl BatchTransport for Gated {
        fn target(&self) -> &str {
            "gated"
        }

        fn send<'a>(&'a self, _sealed: Vec<u8>) -> BoxFuture<'a, Result<(), LogPipelineError>> {
            Box::pin(async move {
                self.entered.notify_one();
                self.release.notified().await;
                if self.fail.load(Ordering::SeqCst) {
                    return Err(LogPipelineError::Transport("unavailable".to_owned()));
                }
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn records_appended_during_failed_send_follow_requeued_batch() {
        let transport = Arc::new(Gated::default());
        transport.fail.store(true, Ordering::SeqCst);
        let emitter = Emitter::new(settings(10, 10), transport.clone(), Arc::new(EventBus::new())).unwrap();
        emitter.append(record("k1"));
        emitter.append(record("k2"));

        let (outcome, during) = tokio::join!(emitter.flush(), async {
            transport.entered.notified().await;
            emitter.append(record("m1"));
            emitter.append(record("m2"));
            let during = emitter.buffered_raw();
            transport.release.notify_one();
            during
        });

        assert_eq!(during, vec!["m1", "m2"]);
        assert_eq!(outcome, FlushOutcome::Requeued(2));
        assert_eq!(emitter.buffered_raw(), vec!["k1", "k2", "m1", "m2"]);
    }

    #[tokio::test]
    async fn requeue_onto_full_buffer_respects_capacity() {
        let transport = Arc::new(Gated::default());
        transport.fail.store(true, Ordering::SeqCst);
        let emitter = Emitter::new(settings(2, 3), transport.clone(), Arc::new(EventBus::new())).unwrap();
        emitter.append(record("k1"));
        emitter.append(record("k2"));

        let (outcome, ()) = tokio::join!(emitter.flush(), async {
            transport.entered.notified().await;
            for raw in ["m1", "m2", "m3"] {
                emitter.append(record(raw));
            }
            transport.release.notify_one();
        });

        assert_eq!(outcome, FlushOutcome::Requeued(2));
        assert_eq!(emitter.buffered_raw(), vec!["m1", "m2", "m3"]);
        assert_eq!(emitter.dropped(), 2);
    }

    #[tokio::test]
    async fn overflow_keeps_newest() {
        let transport = Arc::new(Recording::default());
        let emitter = Emitter::new(settings(2, 3), transport, Arc::new(EventBus::new())).unwrap();
        for i in 0..5 {
            emitter.append(record(&i.to_string()));
        }
        assert_eq!(emitter.buffered_raw(), vec!["2", "3", "4"]);
        assert_eq!(emitter.dropped(), 2);
    }

    #[tokio::test]
    async fn stop_flushes_buffered_records() {
        let transport = Arc::new(Recording::default());
        let bus = Arc::new(EventBus::new());
        let mut emitter = Emitter::new(settings(10, 10), transport.clone(), Arc::clone(&bus)).unwrap();

        emitter.start().await.unwrap();
        bus.publish(TOPIC_RECORD_DISCOVERED, record("x"));
        assert_eq!(emitter.buffered(), 1);
        emitter.stop().await.unwrap();

        assert_eq!(emitter.buffered(), 0);
        assert_eq!(bus.subscriber_count(TOPIC_RECORD_DISCOVERED), 0);
        assert_eq!(decode(&transport.sent.lock()[0]), vec!["x"]);
    }

    #[tokio::test]
    async fn missing_secret_is_rejected() {
        let mut bad = settings(1, 1);
        bad.secret.clear();
        let transport: Arc<dyn BatchTransport> = Arc::new(Recording::default());
        assert!(Emitter::new(bad, transport, Arc::new(EventBus::new())).is_err());
    }

    #[tokio::test]
    async fn health_degrades_when_buffer_nearly_full() {
        let transport = Arc::new(Recording::default());
        let mut emitter = Emitter::new(settings(1, 2), transport, Arc::new(EventBus::new())).unwrap();
        emitter.start().await.unwrap();
        assert!(emitter.health_check().await.is_healthy());

        emitter.append(record("a"));
        emitter.append(record("b"));
        assert!(matches!(emitter.health_check().await, HealthStatus::Degraded(_)));
        emitter.stop().await.unwrap();
    }
}
