use crate::domain::invoice::InvoiceDetail;
use crate::domain::payment::BearerCredential;
use crate::domain::ports::{Authenticator, CapturePage, Notifier};
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

/// Authenticator backed by a fixed token.
///
/// `unavailable` builds one that always fails, mirroring a device that is
/// not signed in to a merchant account.
#[derive(Clone)]
pub struct StaticAuthenticator {
    token: std::result::Result<String, String>,
}

impl StaticAuthenticator {
    /// Always hands out `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Ok(token.into()),
        }
    }

    /// Fails every authentication with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            token: Err(reason.into()),
        }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self) -> Result<BearerCredential> {
        match &self.token {
            Ok(token) => BearerCredential::new(token.clone()),
            Err(reason) => Err(WorkflowError::Authentication(reason.clone())),
        }
    }
}

/// Notifier that keeps every message, in order.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message shown so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent message.
    pub fn last(&self) -> Option<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Capture page navigator that records handoffs and closes.
#[derive(Default, Clone)]
pub struct RecordingCapturePage {
    opened: Arc<Mutex<Vec<InvoiceDetail>>>,
    closed: Arc<Mutex<Vec<usize>>>,
}

impl RecordingCapturePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots handed to the page, in order.
    pub fn opened(&self) -> Vec<InvoiceDetail> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Positions whose page was closed.
    pub fn closed(&self) -> Vec<usize> {
        self.closed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CapturePage for RecordingCapturePage {
    fn open(&self, detail: InvoiceDetail) {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(detail);
    }

    fn close(&self, position: usize) {
        self.closed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::invoice::default_seed;

    #[tokio::test]
    async fn test_static_authenticator() {
        let credential = StaticAuthenticator::new("abc").authenticate().await.unwrap();
        assert_eq!(credential.header_value(), "Bearer abc");

        let failing = StaticAuthenticator::unavailable("no merchant account");
        assert!(matches!(
            failing.authenticate().await,
            Err(WorkflowError::Authentication(reason)) if reason == "no merchant account"
        ));

        assert!(matches!(
            StaticAuthenticator::new("").authenticate().await,
            Err(WorkflowError::Authentication(_))
        ));
    }

    #[test]
    fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify("first");
        notifier.notify("second");
        assert_eq!(notifier.messages(), vec!["first", "second"]);
        assert_eq!(notifier.last().as_deref(), Some("second"));
    }

    #[test]
    fn test_recording_capture_page() {
        let page = RecordingCapturePage::new();
        let detail = default_seed().remove(0).into_invoice(0).detail();
        page.open(detail.clone());
        page.close(0);
        assert_eq!(page.opened(), vec![detail]);
        assert_eq!(page.closed(), vec![0]);
    }
}
