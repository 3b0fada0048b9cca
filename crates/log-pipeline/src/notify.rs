//! 알림 전달 협력자
//!
//! - [`LogNotifier`]: 알림 배치를 tracing 로그로 기록
//! - [`WebhookNotifier`]: Slack 호환 웹훅에 `{"text": ...}` POST
//! - [`NotifierSet`]: 여러 협력자에게 순서대로 전달 (모두 시도한 뒤 실패 보고)
//!
//! 이메일 수신자는 SMTP 전달을 지원하지 않으므로 로그 협력자로 대체됩니다.

use std::fmt::Write as _;
use std::time::Duration;

use tailpost_core::config::{RecipientConfig, RecipientKind};
use tailpost_core::error::NotifyError;
use tailpost_core::pipeline::{BoxFuture, Notification, Notifier};
use tailpost_core::types::Alert;
use tracing::{info, warn};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// 알림 배치를 로그로 기록하는 협력자
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            info!(
                subject = notification.subject.as_str(),
                alerts = notification.alert_count(),
                body = %render_text(notification),
                "alert notification"
            );
            Ok(())
        })
    }
}

/// Slack 호환 웹훅 협력자
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// 웹훅 URL로 협력자를 만듭니다.
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Delivery {
                notifier: "webhook".to_owned(),
                reason: format!("failed to build http client: {e}"),
            })?;
        Ok(Self { url, client })
    }

    /// 대상 URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            let body = serde_json::json!({ "text": render_text(notification) });
            let fail = |reason: String| NotifyError::Delivery {
                notifier: self.name().to_owned(),
                reason,
            };

            let response = self
                .client
                .post(&self.url)
                .json(&body)
                .send()
                .await
                .map_err(|e| fail(format!("request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(fail(format!("unexpected status {status}")));
            }
            Ok(())
        })
    }
}

/// 여러 협력자에게 순서대로 전달하는 집합
///
/// 한 협력자가 실패해도 나머지는 계속 시도합니다.
#[derive(Default)]
pub struct NotifierSet {
    members: Vec<Box<dyn Notifier>>,
}

impl NotifierSet {
    /// 빈 집합
    pub fn new() -> Self {
        Self::default()
    }

    /// 협력자를 추가합니다.
    pub fn push(&mut self, notifier: impl Notifier + 'static) {
        self.members.push(Box::new(notifier));
    }

    /// 협력자 수
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// 비어 있는지 확인
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// 협력자 이름 목록
    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|n| n.name()).collect()
    }

    /// 수신자 설정으로 집합을 구성합니다.
    ///
    /// 이메일 수신자는 로그 협력자 하나로 합쳐지고 경고를 남깁니다.
    /// 수신자가 없으면 로그 협력자만 등록합니다.
    pub fn from_recipients(recipients: &[RecipientConfig]) -> Result<Self, NotifyError> {
        let mut set = Self::new();
        let mut has_log = false;

        for recipient in recipients {
            match recipient.kind {
                RecipientKind::SlackWebhook => set.push(WebhookNotifier::new(&recipient.recipient)?),
                RecipientKind::Email => {
                    warn!(
                        recipient = recipient.recipient.as_str(),
                        "email delivery is not supported, alerts for this recipient go to the log"
                    );
                    if !has_log {
                        set.push(LogNotifier);
                        has_log = true;
                    }
                }
            }
        }

        if set.is_empty() {
            set.push(LogNotifier);
        }
        Ok(set)
    }
}

impl std::fmt::Debug for NotifierSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierSet").field("members", &self.names()).finish()
    }
}

impl Notifier for NotifierSet {
    fn name(&self) -> &str {
        "set"
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            let mut failures = Vec::new();
            for member in &self.members {
                if let Err(e) = member.notify(notification).await {
                    warn!(notifier = member.name(), error = %e, "notifier failed");
                    failures.push(e.to_string());
                }
            }

            if failures.is_empty() {
                Ok(())
            } else {
                Err(NotifyError::Delivery {
                    notifier: self.name().to_owned(),
                    reason: failures.join("; "),
                })
            }
        })
    }
}

/// 알림 메시지를 사람이 읽을 텍스트로 만듭니다.
pub fn render_text(notification: &Notification) -> String {
    let mut text = notification.subject.clone();
    let alerts: Vec<Alert> = notification
        .data
        .get("Alerts")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    for alert in &alerts {
        let _ = write!(text, "\n{alert}");
    }
    text
}
