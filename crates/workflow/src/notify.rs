#![forbid(unsafe_code)]

use serde::Serialize;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-visible status message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
    pub variant: NoticeVariant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl Notice {
    pub fn new(variant: NoticeVariant, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            variant,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

pub trait NotificationSink {
    fn notify(&mut self, notice: Notice);
}

impl NotificationSink for Vec<Notice> {
    fn notify(&mut self, notice: Notice) {
        self.push(notice);
    }
}

/// Routes notices into the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&mut self, notice: Notice) {
        match notice.variant {
            NoticeVariant::Info | NoticeVariant::Success => {
                tracing::info!(target: "retag", "{}", notice.message)
            }
            NoticeVariant::Warning => tracing::warn!(target: "retag", "{}", notice.message),
            NoticeVariant::Error => tracing::error!(target: "retag", "{}", notice.message),
        }
    }
}
