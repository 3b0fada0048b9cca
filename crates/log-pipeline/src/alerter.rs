//! 알림 엔진 -- 트리거 평가와 주기적 알림 전달
//!
//! [`Alerter`]는 [`TOPIC_RECORD_DISCOVERED`]를 우선순위 10으로 구독합니다.
//! 구독 콜백은 레코드를 유한 큐에 넣기만 하고 즉시 반환하며,
//! 고정 크기 워커 풀이 큐를 비우면서 모든 규칙을 평가합니다.
//!
//! 매칭된 알림은 버퍼에 쌓였다가 플러시 주기마다(그리고 정지 시 한 번)
//! 하나의 [`Notification`]으로 협력자에게 전달됩니다. 전달 실패 시 배치는 버려집니다.
//!
//! # 아키텍처
//! ```text
//! EventBus --try_send--> mpsc(queue_capacity) --> worker x N --> TriggerMatcher --> buffer
//! flush tick --> mem::take(buffer) --> Notifier
//! ```

use std::sync::Arc;

use metrics::{counter, gauge};
use tailpost_core::error::TailpostError;
use tailpost_core::event::{EventBus, Subscriber, SubscriptionId, TOPIC_RECORD_DISCOVERED};
use tailpost_core::metrics as m;
use tailpost_core::pipeline::{HealthStatus, Notification, Notifier, Pipeline};
use tailpost_core::types::{Alert, Record};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AlerterSettings;
use crate::error::LogPipelineError;
use crate::state::ComponentState;
use crate::trigger::TriggerMatcher;

/// 알림 엔진의 구독 우선순위
pub const ALERTER_PRIORITY: i32 = 10;

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Arc<Record>>>>;

/// 워커와 플러시 태스크가 공유하는 상태
struct AlerterShared {
    settings: AlerterSettings,
    matcher: TriggerMatcher,
    notifier: Arc<dyn Notifier>,
    buffer: parking_lot::Mutex<Vec<Alert>>,
}

impl AlerterShared {
    fn evaluate(&self, record: &Record) -> usize {
        let matched = self.matcher.matching(record);
        if matched.is_empty() {
            return 0;
        }

        let alerts: Vec<Alert> = matched
            .iter()
            .map(|name| {
                counter!(m::ALERTER_MATCHES_TOTAL, m::LABEL_TRIGGER => name.to_string()).increment(1);
                Alert::from_record(record, *name)
            })
            .collect();
        let count = alerts.len();

        let pending = {
            let mut buffer = self.buffer.lock();
            buffer.extend(alerts);
            buffer.len()
        };
        gauge!(m::ALERTER_PENDING_ALERTS).set(pending as f64);
        count
    }

    async fn flush(&self) -> usize {
        let alerts = std::mem::take(&mut *self.buffer.lock());
        gauge!(m::ALERTER_PENDING_ALERTS).set(0.0);
        if alerts.is_empty() {
            return 0;
        }

        let notification = Notification::for_alerts(&self.settings.application, &alerts);
        let notifier = self.notifier.name().to_owned();
        match self.notifier.notify(&notification).await {
            Ok(()) => {
                counter!(m::ALERTER_NOTIFICATIONS_TOTAL, m::LABEL_NOTIFIER => notifier, m::LABEL_RESULT => "ok")
                    .increment(1);
                info!(alerts = alerts.len(), "alert notification sent");
            }
            Err(e) => {
                counter!(m::ALERTER_NOTIFICATIONS_TOTAL, m::LABEL_NOTIFIER => notifier, m::LABEL_RESULT => "error")
                    .increment(1);
                warn!(alerts = alerts.len(), error = %e, "alert notification failed, batch discarded");
            }
        }
        alerts.len()
    }
}

/// 버스 구독 콜백 -- 레코드를 평가 큐에 넣기만 합니다.
struct QueueSubscriber {
    tx: mpsc::Sender<Arc<Record>>,
}

impl Subscriber<Record> for QueueSubscriber {
    fn on_event(&self, _topic: &str, payload: &Arc<Record>) {
        match self.tx.try_send(Arc::clone(payload)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(record)) => {
                counter!(m::ALERTER_QUEUE_DROPPED_TOTAL).increment(1);
                warn!(
                    parser = record.metadata.parser.as_str(),
                    "alert queue full, record skipped for alerting"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("alert queue closed, record ignored");
            }
        }
    }
}

/// 알림 엔진
pub struct Alerter {
    shared: Arc<AlerterShared>,
    bus: Arc<EventBus<Record>>,
    state: ComponentState,
    cancel: CancellationToken,
    subscription: Option<SubscriptionId>,
    receiver: Option<SharedReceiver>,
    tasks: Vec<JoinHandle<()>>,
}

impl Alerter {
    /// 알림 엔진을 생성합니다.
    pub fn new(
        settings: AlerterSettings,
        matcher: TriggerMatcher,
        notifier: Arc<dyn Notifier>,
        bus: Arc<EventBus<Record>>,
    ) -> Result<Self, LogPipelineError> {
        settings.validate()?;
        Ok(Self {
            shared: Arc::new(AlerterShared {
                settings,
                matcher,
                notifier,
                buffer: parking_lot::Mutex::new(Vec::new()),
            }),
            bus,
            state: ComponentState::Initialized,
            cancel: CancellationToken::new(),
            subscription: None,
            receiver: None,
            tasks: Vec::new(),
        })
    }

    /// 레코드 하나를 즉시 평가하고 생성된 알림 수를 반환합니다.
    pub fn process(&self, record: &Record) -> usize {
        self.shared.evaluate(record)
    }

    /// 버퍼를 비우고 협력자에게 전달합니다. 전달한 알림 수를 반환합니다.
    pub async fn flush(&self) -> usize {
        self.shared.flush().await
    }

    /// 전달 대기 중인 알림 수
    pub fn pending_alerts(&self) -> usize {
        self.shared.buffer.lock().len()
    }

    /// 규칙 수
    pub fn rule_count(&self) -> usize {
        self.shared.matcher.rule_count()
    }

    /// 현재 상태 이름
    pub fn state_name(&self) -> &str {
        self.state.name()
    }

    fn spawn_worker(&self, id: usize, rx: SharedReceiver) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                let next = {
                    let mut rx = rx.lock().await;
                    tokio::select! {
                        _ = cancel.cancelled() => None,
                        record = rx.recv() => record,
                    }
                };
                match next {
                    Some(record) => {
                        shared.evaluate(&record);
                    }
                    None => break,
                }
            }
            debug!(worker = id, "alert worker stopped");
        })
    }

    fn spawn_flusher(&self) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        let period = shared.settings.frequency;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        shared.flush().await;
                    }
                }
            }
        })
    }
}

impl Pipeline for Alerter {
    async fn start(&mut self) -> Result<(), TailpostError> {
        self.state.ensure_startable()?;
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        let settings = &self.shared.settings;
        info!(
            rules = self.shared.matcher.rule_count(),
            workers = settings.workers,
            queue_capacity = settings.queue_capacity,
            "starting alerter"
        );

        let (tx, rx) = mpsc::channel(settings.queue_capacity);
        let rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));
        for id in 0..settings.workers {
            let worker = self.spawn_worker(id, Arc::clone(&rx));
            self.tasks.push(worker);
        }
        let flusher = self.spawn_flusher();
        self.tasks.push(flusher);
        self.receiver = Some(rx);

        self.subscription = Some(self.bus.subscribe(
            TOPIC_RECORD_DISCOVERED,
            ALERTER_PRIORITY,
            Arc::new(QueueSubscriber { tx }),
        ));

        self.state = ComponentState::Running;
        info!("alerter started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TailpostError> {
        self.state.ensure_running()?;
        info!("stopping alerter");

        if let Some(id) = self.subscription.take() {
            self.bus.unsubscribe(id);
        }
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }

        // 큐에 남은 레코드를 평가한 뒤 마지막 플러시
        if let Some(rx) = self.receiver.take() {
            let mut rx = rx.lock().await;
            while let Ok(record) = rx.try_recv() {
                self.shared.evaluate(&record);
            }
        }
        let flushed = self.shared.flush().await;

        self.state = ComponentState::Stopped;
        info!(flushed, "alerter stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        self.state.health(|| HealthStatus::Healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tailpost_core::config::TriggerOperator;
    use tailpost_core::error::NotifyError;
    use tailpost_core::pipeline::BoxFuture;
    use tailpost_core::types::HostIdentity;

    use crate::trigger::{Condition, TriggerRule};

    #[derive(Default)]
    struct Recording {
        sent: parking_lot::Mutex<Vec<Notification>>,
        fail: bool,
    }

    impl Notifier for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn notify<'a>(&'a self, n: &'a Notification) -> BoxFuture<'a, Result<(), NotifyError>> {
            Box::pin(async move {
                self.sent.lock().push(n.clone());
                if self.fail {
                    return Err(NotifyError::Delivery {
                        notifier: "recording".to_owned(),
                        reason: "down".to_owned(),
                    });
                }
                Ok(())
            })
        }
    }

    fn matcher() -> TriggerMatcher {
        TriggerMatcher::new(vec![TriggerRule {
            name: "errors".to_owned(),
            description: String::new(),
            enabled: true,
            conditions: vec![Condition {
                field: "level".to_owned(),
                operator: TriggerOperator::Is,
                value: "error".to_owned(),
            }],
        }])
        .unwrap()
    }

    fn record(level: &str) -> Record {
        let mut record = Record::new(&HostIdentity::new("billing", "", "h"), "app", "/var/log/app.log", level);
        record.fields.insert("level".to_owned(), level.to_owned());
        record
    }

    fn settings() -> AlerterSettings {
        AlerterSettings {
            application: "billing".to_owned(),
            frequency: Duration::from_secs(3600),
            queue_capacity: 16,
            workers: 2,
        }
    }

    fn alerter(notifier: Arc<Recording>, bus: Arc<EventBus<Record>>) -> Alerter {
        Alerter::new(settings(), matcher(), notifier, bus).unwrap()
    }

    #[tokio::test]
    async fn process_buffers_matching_records() {
        let notifier = Arc::new(Recording::default());
        let a = alerter(Arc::clone(&notifier), Arc::new(EventBus::new()));

        assert_eq!(a.process(&record("ERROR")), 1);
        assert_eq!(a.process(&record("info")), 0);
        assert_eq!(a.pending_alerts(), 1);
    }

    #[tokio::test]
    async fn flush_sends_one_notification_and_clears_buffer() {
        let notifier = Arc::new(Recording::default());
        let a = alerter(Arc::clone(&notifier), Arc::new(EventBus::new()));
        a.process(&record("error"));
        a.process(&record("error"));

        assert_eq!(a.flush().await, 2);
        assert_eq!(a.pending_alerts(), 0);
        let sent = notifier.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "billing - 2 new alert(s)");
        assert_eq!(sent[0].alert_count(), 2);
    }

    #[tokio::test]
    async fn empty_flush_does_not_notify() {
        let notifier = Arc::new(Recording::default());
        let a = alerter(Arc::clone(&notifier), Arc::new(EventBus::new()));
        assert_eq!(a.flush().await, 0);
        assert!(notifier.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn failed_notification_discards_batch() {
        let notifier = Arc::new(Recording {
            fail: true,
            ..Recording::default()
        });
        let a = alerter(Arc::clone(&notifier), Arc::new(EventBus::new()));
        a.process(&record("error"));

        assert_eq!(a.flush().await, 1);
        assert_eq!(a.pending_alerts(), 0);
        assert_eq!(a.flush().await, 0);
        assert_eq!(notifier.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn published_records_flush_on_stop() {
        let notifier = Arc::new(Recording::default());
        let bus = Arc::new(EventBus::new());
        let mut a = alerter(Arc::clone(&notifier), Arc::clone(&bus));

        a.start().await.unwrap();
        assert_eq!(bus.subscriber_count(TOPIC_RECORD_DISCOVERED), 1);
        bus.publish(TOPIC_RECORD_DISCOVERED, Arc::new(record("error")));
        bus.publish(TOPIC_RECORD_DISCOVERED, Arc::new(record("debug")));
        a.stop().await.unwrap();

        assert_eq!(bus.subscriber_count(TOPIC_RECORD_DISCOVERED), 0);
        let sent = notifier.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].alert_count(), 1);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let subscriber = QueueSubscriber { tx };

        subscriber.on_event(TOPIC_RECORD_DISCOVERED, &Arc::new(record("first")));
        subscriber.on_event(TOPIC_RECORD_DISCOVERED, &Arc::new(record("second")));

        assert_eq!(rx.try_recv().unwrap().raw, "first");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn lifecycle_errors() {
        let mut a = alerter(Arc::new(Recording::default()), Arc::new(EventBus::new()));
        assert!(a.stop().await.is_err());
        assert!(a.health_check().await.is_unhealthy());

        a.start().await.unwrap();
        assert!(a.start().await.is_err());
        assert!(a.health_check().await.is_healthy());
        a.stop().await.unwrap();
        assert_eq!(a.state_name(), "stopped");
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let bad = AlerterSettings {
            queue_capacity: 0,
            ..settings()
        };
        let notifier: Arc<dyn Notifier> = Arc::new(Recording::default());
        assert!(Alerter::new(bad, matcher(), notifier, Arc::new(EventBus::new())).is_err());
    }
}
