//! 파일 tail -- `tail -F`와 유사한 새 라인 추적
//!
//! 파일을 끝에서 열어(과거 내용 재생 없음) 폴링 주기마다 새로 추가된 완전한 라인을 읽습니다.
//! 개행이 오지 않은 부분 라인은 개행이 도착할 때까지 보관합니다.
//!
//! # 로테이션 감지
//! EOF에서 경로를 다시 확인합니다.
//! - inode 변경 (logrotate 등): 새 파일을 처음부터 다시 엽니다.
//! - 파일 크기 축소 (truncation): 오프셋 0으로 되돌립니다.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use metrics::counter;
use tailpost_core::metrics as m;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::LogPipelineError;

/// 단일 파일 추적기
#[derive(Debug)]
pub struct TailFollower {
    path: PathBuf,
    reader: BufReader<File>,
    /// 다음에 읽을 바이트 오프셋
    offset: u64,
    inode: Option<u64>,
    /// 개행을 기다리는 부분 라인
    pending: Vec<u8>,
    poll_interval: Duration,
    max_line_length: usize,
}

impl TailFollower {
    /// 파일을 열고 끝으로 이동합니다.
    pub async fn open(
        path: impl AsRef<Path>,
        poll_interval: Duration,
        max_line_length: usize,
    ) -> Result<Self, LogPipelineError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)
            .await
            .map_err(|e| collector_err(&path, "open", &e))?;
        let inode = inode_of(&file.metadata().await.map_err(|e| collector_err(&path, "stat", &e))?);
        let offset = file
            .seek(SeekFrom::End(0))
            .await
            .map_err(|e| collector_err(&path, "seek", &e))?;

        Ok(Self {
            path,
            reader: BufReader::new(file),
            offset,
            inode,
            pending: Vec::new(),
            poll_interval,
            max_line_length,
        })
    }

    /// 현재 읽기 오프셋
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 취소될 때까지 새 라인을 `on_line`에 전달합니다.
    ///
    /// 라인은 파일 순서대로 전달되며 끝의 `\n`, `\r\n`은 제거됩니다. 빈 라인은 건너뜁니다.
    pub async fn run<F>(mut self, cancel: &CancellationToken, mut on_line: F) -> Result<(), LogPipelineError>
    where
        F: FnMut(&str),
    {
        loop {
            self.read_available(cancel, &mut on_line).await?;
            if cancel.is_cancelled() {
                return Ok(());
            }
            self.check_rotation().await?;

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// EOF까지 읽으며 완전한 라인을 전달합니다.
    async fn read_available<F>(&mut self, cancel: &CancellationToken, on_line: &mut F) -> Result<(), LogPipelineError>
    where
        F: FnMut(&str),
    {
        loop {
            let buf = self
                .reader
                .fill_buf()
                .await
                .map_err(|e| collector_err(&self.path, "read", &e))?;
            if buf.is_empty() {
                return Ok(());
            }

            let newline = buf.iter().position(|&b| b == b'\n');
            let (consumed, content) = match newline {
                Some(idx) => (idx + 1, idx),
                None => (buf.len(), buf.len()),
            };

            // 최대 길이를 넘는 부분은 버리되 오프셋은 진행
            let room = self.max_line_length.saturating_sub(self.pending.len());
            self.pending.extend_from_slice(&buf[..content.min(room)]);
            self.reader.consume(consumed);
            self.offset += consumed as u64;

            if newline.is_some() {
                if self.pending.last() == Some(&b'\r') {
                    self.pending.pop();
                }
                if !self.pending.is_empty() {
                    counter!(m::WATCHER_LINES_READ_TOTAL).increment(1);
                    on_line(&String::from_utf8_lossy(&self.pending));
                }
                self.pending.clear();

                if cancel.is_cancelled() {
                    return Ok(());
                }
            }
        }
    }

    /// 경로의 현재 상태와 비교하여 로테이션/잘림을 처리합니다.
    ///
    /// 경로가 사라진 경우는 정리 주기에 맡깁니다.
    async fn check_rotation(&mut self) -> Result<(), LogPipelineError> {
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(collector_err(&self.path, "stat", &e)),
        };

        let current_inode = inode_of(&meta);
        if current_inode != self.inode {
            info!(path = %self.path.display(), "file rotated, reopening from start");
            let file = File::open(&self.path)
                .await
                .map_err(|e| collector_err(&self.path, "reopen", &e))?;
            self.reader = BufReader::new(file);
            self.inode = current_inode;
            self.offset = 0;
            self.pending.clear();
            counter!(m::WATCHER_ROTATIONS_TOTAL).increment(1);
        } else if meta.len() < self.offset {
            info!(
                path = %self.path.display(),
                size = meta.len(),
                offset = self.offset,
                "file truncated, rewinding"
            );
            self.reader
                .seek(SeekFrom::Start(0))
                .await
                .map_err(|e| collector_err(&self.path, "seek", &e))?;
            self.offset = 0;
            self.pending.clear();
            counter!(m::WATCHER_ROTATIONS_TOTAL).increment(1);
        } else {
            debug!(path = %self.path.display(), offset = self.offset, "no new data");
        }
        Ok(())
    }
}

#[cfg(unix)]
fn inode_of(meta: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ino())
}

#[cfg(not(unix))]
fn inode_of(_meta: &std::fs::Metadata) -> Option<u64> {
    None
}

fn collector_err(path: &Path, op: &str, err: &std::io::Error) -> LogPipelineError {
    LogPipelineError::Collector {
        path: path.display().to_string(),
        reason: format!("{op} failed: {err}"),
    }
}
