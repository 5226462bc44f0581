use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{EmailMessage, Notifier, NotifyError};

/// Hands messages to a background task so request handlers never wait on mail delivery.
///
/// The worker drains the queue until every `QueuedNotifier` clone is dropped.
#[derive(Debug, Clone)]
pub struct QueuedNotifier {
    sender: mpsc::UnboundedSender<EmailMessage>,
}

impl QueuedNotifier {
    /// Spawn the delivery worker on the current tokio runtime.
    pub fn spawn<N>(transport: N) -> (Self, JoinHandle<()>)
    where
        N: Notifier + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<EmailMessage>();
        let worker = tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                let kind = message.kind.label();
                let recipient = message.recipient.clone();
                match transport.deliver(message) {
                    Ok(()) => debug!(kind, %recipient, "notification delivered"),
                    Err(err) => warn!(kind, %recipient, error = %err, "notification failed"),
                }
            }
        });

        (Self { sender }, worker)
    }
}

impl Notifier for QueuedNotifier {
    fn deliver(&self, message: EmailMessage) -> Result<(), NotifyError> {
        self.sender
            .send(message)
            .map_err(|_| NotifyError::QueueClosed)
    }
}
