use crowdfund::campaigns::{EmailMessage, Notifier, NotifyError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Mail transport that writes every message to the log instead of an SMTP relay.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogMailer;

impl Notifier for LogMailer {
    fn deliver(&self, message: EmailMessage) -> Result<(), NotifyError> {
        info!(
            kind = message.kind.label(),
            from = %message.from,
            to = %message.recipient,
            subject = %message.subject,
            "email sent"
        );
        Ok(())
    }
}

/// Swallows messages; used when seeding data without announcing it.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DiscardMailer;

impl Notifier for DiscardMailer {
    fn deliver(&self, _message: EmailMessage) -> Result<(), NotifyError> {
        Ok(())
    }
}
