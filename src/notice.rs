use std::time::Duration;

use tokio::time::Instant;

/// How long a notice stays on screen.
pub const NOTICE_LIFETIME: Duration = Duration::from_millis(3500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A transient user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
    shown_at: Instant,
}

impl Notice {
    pub fn info(text: impl Into<String>, now: Instant) -> Self {
        Self {
            text: text.into(),
            kind: NoticeKind::Info,
            shown_at: now,
        }
    }

    pub fn error(text: impl Into<String>, now: Instant) -> Self {
        Self {
            text: text.into(),
            kind: NoticeKind::Error,
            shown_at: now,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) < NOTICE_LIFETIME
    }

    /// Text colour used by the form message.
    pub fn color(&self) -> &'static str {
        match self.kind {
            NoticeKind::Info => "#2f5d32",
            NoticeKind::Error => "#d33",
        }
    }
}
