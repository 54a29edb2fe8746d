//! User-facing notifications ("toasts").
//!
//! Producers get a [`NotificationSink`] injected. [`BufferedSink`] can be
//! handed out before the real presenter exists: it keeps messages until a
//! sink is attached and then forwards everything in order.

use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastLevel {
    pub fn default_title(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Success => "Success",
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub title: String,
    pub message: String,
}

impl Toast {
    pub fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            title: level.default_title().to_string(),
            message: message.into(),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, toast: Toast);

    fn success(&self, message: &str) {
        self.notify(Toast::new(ToastLevel::Success, message));
    }

    fn info(&self, message: &str) {
        self.notify(Toast::new(ToastLevel::Info, message));
    }

    fn error(&self, message: &str) {
        self.notify(Toast::new(ToastLevel::Error, message));
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _toast: Toast) {}
}

#[derive(Default)]
struct BufferedInner {
    target: Option<Arc<dyn NotificationSink>>,
    pending: Vec<Toast>,
}

/// Buffers toasts until a presenter is attached.
#[derive(Clone, Default)]
pub struct BufferedSink {
    inner: Arc<Mutex<BufferedInner>>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `target` and flushes pending toasts to it, oldest first.
    pub fn attach(&self, target: Arc<dyn NotificationSink>) {
        let pending = {
            let mut inner = match self.inner.lock() {
                Ok(inner) => inner,
                Err(poisoned) => poisoned.into_inner(),
            };
            inner.target = Some(Arc::clone(&target));
            std::mem::take(&mut inner.pending)
        };
        for toast in pending {
            target.notify(toast);
        }
    }

    /// Detaches the current presenter; later toasts are buffered again.
    pub fn detach(&self) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.target = None;
    }

    /// Toasts waiting for a presenter.
    pub fn pending(&self) -> Vec<Toast> {
        match self.inner.lock() {
            Ok(inner) => inner.pending.clone(),
            Err(poisoned) => poisoned.into_inner().pending.clone(),
        }
    }
}

impl NotificationSink for BufferedSink {
    fn notify(&self, toast: Toast) {
        let target = {
            let mut inner = match self.inner.lock() {
                Ok(inner) => inner,
                Err(poisoned) => poisoned.into_inner(),
            };
            match inner.target.clone() {
                Some(target) => target,
                None => {
                    inner.pending.push(toast);
                    return;
                }
            }
        };
        target.notify(toast);
    }
}

/// Collects toasts in memory. Handy as a presenter in tests and scripts.
#[derive(Clone, Default)]
pub struct RecordingSink {
    toasts: Arc<Mutex<Vec<Toast>>>,
}

impl RecordingSink {
    pub fn toasts(&self) -> Vec<Toast> {
        match self.toasts.lock() {
            Ok(toasts) => toasts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, toast: Toast) {
        match self.toasts.lock() {
            Ok(mut toasts) => toasts.push(toast),
            Err(poisoned) => poisoned.into_inner().push(toast),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_until_attached_then_forwards() {
        let sink = BufferedSink::new();
        sink.success("first");
        sink.error("second");
        assert_eq!(sink.pending().len(), 2);

        let presenter = RecordingSink::default();
        sink.attach(Arc::new(presenter.clone()));
        assert!(sink.pending().is_empty());

        sink.info("third");
        let messages: Vec<_> = presenter
            .toasts()
            .into_iter()
            .map(|toast| (toast.level, toast.message))
            .collect();
        assert_eq!(
            messages,
            vec![
                (ToastLevel::Success, "first".to_string()),
                (ToastLevel::Error, "second".to_string()),
                (ToastLevel::Info, "third".to_string()),
            ]
        );
    }

    #[test]
    fn detach_resumes_buffering() {
        let sink = BufferedSink::new();
        let presenter = RecordingSink::default();
        sink.attach(Arc::new(presenter.clone()));
        sink.detach();
        sink.success("later");
        assert!(presenter.toasts().is_empty());
        assert_eq!(sink.pending()[0].title, "Success");
    }
}
