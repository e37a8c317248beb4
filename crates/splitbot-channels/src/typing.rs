use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::traits::ReplyTransport;

/// Keeps the typing indicator alive while a reply is being generated.
///
/// Typing is sent once immediately and then every `interval`. The heartbeat
/// stops on [`TypingHeartbeat::stop`] or when the guard is dropped, whichever
/// happens first.
pub struct TypingHeartbeat {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TypingHeartbeat {
    pub fn start(transport: Arc<dyn ReplyTransport>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = transport.send_typing().await {
                            warn!("failed to send typing indicator: {e}");
                        }
                    }
                }
            }
            debug!("typing heartbeat stopped");
        });

        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Stop sending typing indicators. Calling it again has no effect.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for TypingHeartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
