//! Progress reporting for long-running tool calls.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::types::{ProgressParams, ProgressToken};

/// Outbound channel to the client that sent the request.
pub type NotificationSink = mpsc::UnboundedSender<Value>;

/// Sends `notifications/progress` for one request. Inert unless the client
/// supplied a progress token and the transport can push notifications.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    target: Option<(ProgressToken, NotificationSink)>,
}

impl Progress {
    pub fn new(token: Option<ProgressToken>, sink: Option<NotificationSink>) -> Self {
        Self {
            target: token.zip(sink),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn report(&self, progress: usize, total: usize) {
        let Some((token, sink)) = &self.target else {
            return;
        };
        let notification = ProgressParams {
            progress_token: token.clone(),
            progress: progress as f64,
            total: Some(total as f64),
        }
        .into_notification();

        match serde_json::to_value(notification) {
            Ok(value) => {
                if sink.send(value).is_err() {
                    tracing::debug!("Client went away; dropping progress update");
                }
            }
            Err(e) => tracing::warn!("Failed to encode progress notification: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_only_with_token_and_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        Progress::new(None, Some(tx.clone())).report(1, 2);
        Progress::none().report(1, 2);
        assert!(rx.try_recv().is_err());

        Progress::new(Some(ProgressToken::Number(4)), Some(tx)).report(1, 2);
        let sent = rx.try_recv().unwrap();
        assert_eq!(sent["method"], "notifications/progress");
        assert_eq!(sent["params"]["progressToken"], 4);
        assert_eq!(sent["params"]["progress"], 1.0);
        assert_eq!(sent["params"]["total"], 2.0);
    }
}
