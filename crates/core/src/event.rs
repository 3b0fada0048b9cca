//! 이벤트 버스 -- 컴포넌트 간 통신의 기본 단위
//!
//! [`EventBus`]는 토픽 이름으로 구분되는 프로세스 내 publish/subscribe 버스입니다.
//! 구독자는 우선순위 그룹으로 묶이며, 발행 시 우선순위 오름차순,
//! 같은 그룹 안에서는 등록 순서로 열거됩니다.
//!
//! # 디스패치 모델
//! 발행자는 구독자 목록의 스냅샷을 떠서 락을 해제한 뒤 각 구독자의
//! [`Subscriber::on_event`]를 동기 호출합니다. 구독자는 블로킹하면 안 되며,
//! 자신의 동시성(워커 풀, 버퍼 등)은 스스로 관리합니다.
//! 덕분에 발행량이 많아도 이벤트마다 태스크가 생성되지 않습니다.
//!
//! # 사용 예시
//! ```
//! use std::sync::Arc;
//! use tailpost_core::event::EventBus;
//!
//! let bus: EventBus<String> = EventBus::new();
//! let id = bus.subscribe("greetings", 0, Arc::new(|_topic: &str, msg: &Arc<String>| {
//!     println!("got {msg}");
//! }));
//! assert_eq!(bus.publish("greetings", Arc::new("hello".to_owned())), 1);
//! assert!(bus.unsubscribe(id));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

// --- 모듈명 상수 ---

/// 파일 감시기 모듈명
pub const MODULE_WATCHER: &str = "watcher";
/// 알림 엔진 모듈명
pub const MODULE_ALERTER: &str = "alerter";
/// 전송기 모듈명
pub const MODULE_EMITTER: &str = "emitter";

// --- 토픽 상수 ---

/// 파싱된 레코드가 발행되는 토픽
pub const TOPIC_RECORD_DISCOVERED: &str = "record.discovered";

/// 이벤트 구독자
///
/// `on_event`는 발행자의 태스크에서 호출되므로 빠르게 반환해야 합니다.
pub trait Subscriber<T>: Send + Sync {
    /// 토픽에 발행된 페이로드를 전달받습니다.
    fn on_event(&self, topic: &str, payload: &Arc<T>);
}

impl<T, F> Subscriber<T> for F
where
    F: Fn(&str, &Arc<T>) + Send + Sync,
{
    fn on_event(&self, topic: &str, payload: &Arc<T>) {
        self(topic, payload)
    }
}

/// 구독 핸들 -- `unsubscribe`에 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Subscription<T> {
    id: SubscriptionId,
    priority: i32,
    subscriber: Arc<dyn Subscriber<T>>,
}

/// 토픽 기반 이벤트 버스
///
/// 구독 테이블은 하나의 `RwLock`으로 보호됩니다.
/// 토픽별 구독 목록은 항상 (priority, 등록 순서)로 정렬된 상태를 유지합니다.
pub struct EventBus<T> {
    topics: RwLock<HashMap<String, Vec<Subscription<T>>>>,
    next_id: AtomicU64,
}

impl<T> EventBus<T> {
    /// 빈 버스를 생성합니다.
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 토픽에 구독자를 등록합니다.
    ///
    /// 낮은 `priority` 값이 먼저 열거됩니다.
    pub fn subscribe(
        &self,
        topic: &str,
        priority: i32,
        subscriber: Arc<dyn Subscriber<T>>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut topics = self.topics.write();
        let subs = topics.entry(topic.to_owned()).or_default();

        // 같은 우선순위 그룹의 마지막 뒤에 삽입하여 등록 순서를 보존
        let pos = subs.partition_point(|s| s.priority <= priority);
        subs.insert(
            pos,
            Subscription {
                id,
                priority,
                subscriber,
            },
        );

        tracing::debug!(topic, priority, subscription = %id, "subscriber registered");
        id
    }

    /// 구독을 해제합니다.
    ///
    /// 해당 핸들의 구독이 존재했으면 `true`를 반환합니다.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut topics = self.topics.write();
        let mut removed = false;

        topics.retain(|topic, subs| {
            if let Some(pos) = subs.iter().position(|s| s.id == id) {
                subs.remove(pos);
                removed = true;
                tracing::debug!(topic = topic.as_str(), subscription = %id, "subscriber removed");
            }
            !subs.is_empty()
        });

        removed
    }

    /// 토픽의 모든 구독자에게 페이로드를 전달합니다.
    ///
    /// 발행 시점의 구독자 스냅샷에 한 번씩 전달하며, 열거한 구독자 수를 반환합니다.
    pub fn publish(&self, topic: &str, payload: Arc<T>) -> usize {
        let snapshot: Vec<Arc<dyn Subscriber<T>>> = {
            let topics = self.topics.read();
            match topics.get(topic) {
                Some(subs) => subs.iter().map(|s| Arc::clone(&s.subscriber)).collect(),
                None => return 0,
            }
        };

        for subscriber in &snapshot {
            subscriber.on_event(topic, &payload);
        }
        snapshot.len()
    }

    /// 토픽의 구독자 수를 반환합니다.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = self.topics.read();
        let mut map = f.debug_map();
        for (topic, subs) in topics.iter() {
            map.entry(topic, &subs.len());
        }
        map.finish()
    }
}
