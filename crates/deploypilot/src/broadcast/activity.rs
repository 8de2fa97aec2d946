//! Activity broadcaster: logs every event and streams it to subscribers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::gitops::progress::{ActivityEvent, ActivityReporter};

/// Log target used for activity lines.
pub const ACTIVITY_LOG_TARGET: &str = "deploypilot::activity";

/// An activity event stamped with the time it was reported.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ActivityEvent,
}

impl ActivityEntry {
    pub fn new(event: ActivityEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Production [`ActivityReporter`].
#[derive(Clone)]
pub struct ActivityBroadcaster {
    sender: Arc<broadcast::Sender<ActivityEntry>>,
}

impl ActivityBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Creates a new subscriber for activity entries.
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEntry> {
        self.sender.subscribe()
    }
}

impl Default for ActivityBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ActivityReporter for ActivityBroadcaster {
    fn report(&self, event: ActivityEvent) {
        log::log!(target: ACTIVITY_LOG_TARGET, event.level(), "{}", event.message());
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(ActivityEntry::new(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitops::progress::ReconcileStage;

    #[test]
    fn test_report_without_subscribers() {
        let broadcaster = ActivityBroadcaster::new(4);
        broadcaster.report(ActivityEvent::PollFailed {
            error: "no listeners".to_string(),
        });
    }

    #[test]
    fn test_broadcaster_send_receive() {
        let broadcaster = ActivityBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        broadcaster.report(ActivityEvent::StageStarted {
            stage: ReconcileStage::Execute,
        });

        let received = rx.try_recv().unwrap();
        assert_eq!(
            received.event,
            ActivityEvent::StageStarted {
                stage: ReconcileStage::Execute
            }
        );
    }

    #[test]
    fn test_cloned_broadcaster_shares_channel() {
        let broadcaster = ActivityBroadcaster::default();
        let clone = broadcaster.clone();
        let mut rx = broadcaster.subscribe();

        clone.report(ActivityEvent::FileDecrypted {
            path: "app/secrets.enc.yaml".to_string(),
        });

        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_entry_serialization_flattens_event() {
        let entry = ActivityEntry::new(ActivityEvent::PollFailed {
            error: "503".to_string(),
        });
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"timestamp\""));
        assert!(json.contains("\"type\":\"pollFailed\""));
        assert!(json.contains("\"error\":\"503\""));
    }
}
