//! tail 세션 테이블
//!
//! 키는 (파서 이름 해시, 파일 경로)이며 테이블 안에서 항상 고유합니다.
//! 모든 변경은 하나의 `Mutex`로 직렬화되며, 락은 await 지점을 넘겨 유지되지 않습니다.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::parser::ParserDefinition;

/// 세션 키
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    /// 파서 이름 해시
    pub parser_hash: u64,
    /// 파일 경로
    pub path: PathBuf,
}

impl SessionKey {
    /// 파서 정의와 경로로 키를 만듭니다.
    pub fn new(def: &ParserDefinition, path: PathBuf) -> Self {
        Self {
            parser_hash: def.name_hash(),
            path,
        }
    }
}

/// 실행 중인 세션 핸들
#[derive(Debug)]
pub(crate) struct SessionHandle {
    /// 세션 세대 ID (같은 키로 재시작된 세션 구분)
    pub(crate) id: u64,
    pub(crate) cancel: CancellationToken,
    pub(crate) task: JoinHandle<()>,
}

impl SessionHandle {
    /// 세션을 취소하고 태스크 종료를 기다립니다.
    pub(crate) async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                tracing::error!(error = %e, "tail session panicked");
            }
        }
    }
}

/// 세션 테이블
#[derive(Debug, Default)]
pub(crate) struct SessionTable {
    sessions: Mutex<HashMap<SessionKey, SessionHandle>>,
    next_id: AtomicU64,
}

impl SessionTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 키가 없을 때만 세션을 시작하여 등록합니다.
    ///
    /// `spawn`은 락 안에서 호출되므로, 새 태스크가 자기 자신을 제거하려 해도
    /// 등록이 끝난 뒤에야 락을 얻습니다.
    pub(crate) fn insert_with<F>(&self, key: SessionKey, parent: &CancellationToken, spawn: F) -> bool
    where
        F: FnOnce(u64, CancellationToken) -> JoinHandle<()>,
    {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&key) {
            return false;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = parent.child_token();
        let task = spawn(id, cancel.clone());
        sessions.insert(key, SessionHandle { id, cancel, task });
        true
    }

    /// 같은 세대의 세션일 때만 제거합니다.
    ///
    /// 태스크 자신이 I/O 실패로 종료할 때 사용합니다. 핸들은 버려집니다.
    pub(crate) fn remove_if(&self, key: &SessionKey, id: u64) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get(key) {
            Some(handle) if handle.id == id => {
                sessions.remove(key);
                true
            }
            _ => false,
        }
    }

    /// 주어진 키의 세션을 꺼냅니다.
    pub(crate) fn take(&self, keys: &[SessionKey]) -> Vec<(SessionKey, SessionHandle)> {
        let mut sessions = self.sessions.lock();
        keys.iter()
            .filter_map(|key| sessions.remove_entry(key))
            .collect()
    }

    /// 모든 세션을 꺼냅니다.
    pub(crate) fn take_all(&self) -> Vec<(SessionKey, SessionHandle)> {
        self.sessions.lock().drain().collect()
    }

    pub(crate) fn keys(&self) -> Vec<SessionKey> {
        self.sessions.lock().keys().cloned().collect()
    }

    pub(crate) fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.lock().contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.lock().len()
    }
}
