//! 파일 감시기 -- 로그 파일 탐색, tail 세션 관리, 레코드 발행
//!
//! [`Watcher`]는 core의 [`Pipeline`] trait을 구현합니다. 시작하면 두 개의 주기 태스크가 돕니다.
//! - 탐색: 파서마다 포함/제외 glob을 확장하여 새 파일에 tail 세션을 시작
//! - 정리: 경로가 사라진 세션을 취소하고 테이블에서 제거
//!
//! 각 세션은 완전한 라인을 [`LineParser`]로 파싱하여 성공한 레코드를
//! [`TOPIC_RECORD_DISCOVERED`] 토픽에 발행합니다. 파싱 실패는 로그만 남깁니다.
//!
//! # 아키텍처
//! ```text
//! discovery tick --> SessionTable --spawn--> TailFollower --line--> LineParser --Record--> EventBus
//! cleanup tick   --> SessionTable (vanished paths cancelled)
//! ```

pub mod discovery;
pub mod session;
pub mod tail;

pub use session::SessionKey;
pub use tail::TailFollower;

use std::collections::HashSet;
use std::sync::Arc;

use metrics::{counter, gauge};
use tailpost_core::error::TailpostError;
use tailpost_core::event::{EventBus, TOPIC_RECORD_DISCOVERED};
use tailpost_core::metrics as m;
use tailpost_core::pipeline::{HealthStatus, Pipeline};
use tailpost_core::types::Record;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatcherSettings;
use crate::error::LogPipelineError;
use crate::parser::{LineParser, ParserDefinition};
use crate::state::ComponentState;
use session::SessionTable;

/// 감시기 공유 상태 (주기 태스크와 세션 태스크가 함께 참조)
struct WatcherShared {
    settings: WatcherSettings,
    definitions: Vec<Arc<ParserDefinition>>,
    parser: Arc<LineParser>,
    bus: Arc<EventBus<Record>>,
    sessions: SessionTable,
    /// 열기에 실패한 채 남아 있는 세션 키 (경고는 처음 한 번만)
    open_failures: parking_lot::Mutex<HashSet<SessionKey>>,
}

impl WatcherShared {
    async fn discover(self: &Arc<Self>, root: &CancellationToken) -> Result<usize, LogPipelineError> {
        let definitions = self.definitions.clone();
        let found = tokio::task::spawn_blocking(move || discovery::discover_all(&definitions))
            .await
            .map_err(|e| LogPipelineError::Channel(format!("discovery task failed: {e}")))??;

        let mut started = 0;
        for (def, path) in found {
            let key = SessionKey::new(&def, path);
            let shared = Arc::clone(self);
            let session_key = key.clone();
            let inserted = self.sessions.insert_with(key.clone(), root, move |id, cancel| {
                tokio::spawn(shared.follow(def, session_key, id, cancel))
            });
            if inserted {
                started += 1;
                counter!(m::WATCHER_FILES_DISCOVERED_TOTAL).increment(1);
                info!(path = %key.path.display(), "tail session started");
            }
        }

        gauge!(m::WATCHER_SESSIONS_ACTIVE).set(self.sessions.len() as f64);
        Ok(started)
    }

    /// 열기 실패를 기록하고, 이 키의 첫 실패이면 `true`를 반환합니다.
    fn record_open_failure(&self, key: &SessionKey) -> bool {
        self.open_failures.lock().insert(key.clone())
    }

    async fn forget_vanished_failures(&self) {
        let failing: Vec<SessionKey> = self.open_failures.lock().iter().cloned().collect();
        for key in failing {
            if matches!(tokio::fs::try_exists(&key.path).await, Ok(false)) {
                self.open_failures.lock().remove(&key);
            }
        }
    }

    async fn prune_vanished(&self) -> usize {
        self.forget_vanished_failures().await;

        let mut vanished = Vec::new();
        for key in self.sessions.keys() {
            if matches!(tokio::fs::try_exists(&key.path).await, Ok(false)) {
                vanished.push(key);
            }
        }
        if vanished.is_empty() {
            return 0;
        }

        let removed = self.sessions.take(&vanished);
        let count = removed.len();
        for (key, handle) in removed {
            handle.shutdown().await;
            info!(path = %key.path.display(), "file vanished, tail session stopped");
        }
        gauge!(m::WATCHER_SESSIONS_ACTIVE).set(self.sessions.len() as f64);
        count
    }

    /// 세션 태스크 본체
    async fn follow(
        self: Arc<Self>,
        def: Arc<ParserDefinition>,
        key: SessionKey,
        id: u64,
        cancel: CancellationToken,
    ) {
        let filename = key.path.display().to_string();
        let follower = match TailFollower::open(
            &key.path,
            self.settings.poll_interval,
            self.settings.max_line_length,
        )
        .await
        {
            Ok(follower) => {
                self.open_failures.lock().remove(&key);
                follower
            }
            Err(e) => {
                if self.record_open_failure(&key) {
                    warn!(parser = def.name.as_str(), error = %e, "failed to open file, retrying on next discovery");
                } else {
                    debug!(parser = def.name.as_str(), path = %key.path.display(), error = %e, "file still cannot be opened");
                }
                self.sessions.remove_if(&key, id);
                return;
            }
        };

        let result = follower
            .run(&cancel, |line| self.handle_line(&def, &filename, line))
            .await;

        if let Err(e) = result {
            warn!(parser = def.name.as_str(), error = %e, "tail session failed, retrying on next discovery");
            self.sessions.remove_if(&key, id);
        }
    }

    fn handle_line(&self, def: &ParserDefinition, filename: &str, line: &str) {
        match self.parser.parse(def, filename, line) {
            Ok(parsed) => {
                self.bus
                    .publish(TOPIC_RECORD_DISCOVERED, Arc::new(parsed.record));
            }
            Err(LogPipelineError::NoMatch { .. }) => {
                debug!(parser = def.name.as_str(), filename, "line did not match, dropped");
            }
            Err(e) => {
                warn!(parser = def.name.as_str(), filename, error = %e, "failed to parse line, dropped");
            }
        }
    }
}

/// 파일 감시기
///
/// # 사용 예시
/// ```ignore
/// let mut watcher = Watcher::new(settings, definitions, parser, bus)?;
/// watcher.start().await?;
/// // ...
/// watcher.stop().await?;
/// ```
pub struct Watcher {
    shared: Arc<WatcherShared>,
    state: ComponentState,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Watcher {
    /// 감시기를 생성합니다.
    pub fn new(
        settings: WatcherSettings,
        definitions: Vec<ParserDefinition>,
        parser: Arc<LineParser>,
        bus: Arc<EventBus<Record>>,
    ) -> Result<Self, LogPipelineError> {
        settings.validate()?;
        Ok(Self {
            shared: Arc::new(WatcherShared {
                settings,
                definitions: definitions.into_iter().map(Arc::new).collect(),
                parser,
                bus,
                sessions: SessionTable::new(),
                open_failures: parking_lot::Mutex::new(HashSet::new()),
            }),
            state: ComponentState::Initialized,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        })
    }

    /// 탐색을 한 번 수행하고 새로 시작한 세션 수를 반환합니다.
    ///
    /// 파일 집합이 그대로면 두 번째 호출은 아무 세션도 시작하지 않습니다.
    pub async fn discover_once(&self) -> Result<usize, LogPipelineError> {
        self.shared.discover(&self.cancel).await
    }

    /// 경로가 사라진 세션을 정리하고 정리한 수를 반환합니다.
    pub async fn prune_vanished(&self) -> usize {
        self.shared.prune_vanished().await
    }

    /// 활성 세션 수
    pub fn session_count(&self) -> usize {
        self.shared.sessions.len()
    }

    /// 활성 세션 키 목록
    pub fn session_keys(&self) -> Vec<SessionKey> {
        let mut keys = self.shared.sessions.keys();
        keys.sort();
        keys
    }

    /// 세션 존재 여부
    pub fn has_session(&self, key: &SessionKey) -> bool {
        self.shared.sessions.contains(key)
    }

    /// 등록된 파서 정의 수
    pub fn parser_count(&self) -> usize {
        self.shared.definitions.len()
    }

    /// 현재 상태 이름
    pub fn state_name(&self) -> &str {
        self.state.name()
    }

    async fn shutdown_sessions(&self) {
        for (_, handle) in self.shared.sessions.take_all() {
            handle.shutdown().await;
        }
        gauge!(m::WATCHER_SESSIONS_ACTIVE).set(0.0);
    }
}

impl Pipeline for Watcher {
    async fn start(&mut self) -> Result<(), TailpostError> {
        self.state.ensure_startable()?;
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        info!(parsers = self.shared.definitions.len(), "starting watcher");

        // 탐색 주기 (첫 tick은 즉시)
        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        self.tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(shared.settings.discovery_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = shared.discover(&cancel).await {
                            warn!(error = %e, "file discovery failed");
                        }
                    }
                }
            }
        }));

        // 정리 주기
        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        self.tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(shared.settings.cleanup_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = shared.prune_vanished().await;
                        if removed > 0 {
                            debug!(removed, "pruned vanished files");
                        }
                    }
                }
            }
        }));

        self.state = ComponentState::Running;
        info!("watcher started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TailpostError> {
        self.state.ensure_running()?;
        info!("stopping watcher");

        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        self.shutdown_sessions().await;

        self.state = ComponentState::Stopped;
        info!("watcher stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        self.state.health(|| {
            if self.shared.sessions.len() == 0 && !self.shared.definitions.is_empty() {
                HealthStatus::Degraded("no files matched any parser".to_owned())
            } else {
                HealthStatus::Healthy
            }
        })
    }
}
