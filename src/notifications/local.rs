use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{ChannelConfig, HostResponse, NotificationHost, PermissionStatus};
use crate::db::models::NotificationRequest;

/// In-process notification host.
///
/// Each request becomes a tokio task that sleeps until `trigger_at` and then
/// emits the reminder as a log event. Reminders only live as long as the
/// process; permission is always granted.
#[derive(Clone, Default)]
pub struct TokioNotifier {
    pending: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    next_id: Arc<AtomicU64>,
}

impl TokioNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, JoinHandle<()>>>> {
        self.pending
            .lock()
            .map_err(|_| anyhow!("notifier state poisoned"))
    }

    /// Reminders that have not fired yet.
    pub fn pending_count(&self) -> usize {
        self.pending()
            .map(|p| p.values().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }

    /// Wait until every scheduled reminder has fired (or been cancelled).
    pub async fn wait_all(&self) -> Result<()> {
        let handles: Vec<_> = self.pending()?.drain().map(|(_, h)| h).collect();
        for handle in handles {
            // Aborted tasks report a cancellation error; that is expected.
            let _ = handle.await;
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationHost for TokioNotifier {
    fn name(&self) -> &str {
        "local"
    }

    async fn permission_status(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn register_channel(&self, channel: &ChannelConfig) -> Result<()> {
        debug!(
            "Notification channel '{}' ({}) ready: importance {}, vibration {:?}, light {}",
            channel.id, channel.name, channel.importance, channel.vibration_pattern, channel.light_color
        );
        Ok(())
    }

    async fn schedule_local_notification(&self, request: &NotificationRequest) -> Result<HostResponse> {
        let id = format!("local-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let delay = (request.trigger_at - Utc::now())
            .to_std()
            .unwrap_or_default();

        let title = request.title.clone();
        let body = request.body.clone();
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!(notification = %task_id, "🔔 {} {}", title, body);
        });

        {
            let mut pending = self.pending()?;
            pending.retain(|_, h| !h.is_finished());
            pending.insert(id.clone(), handle);
        }
        Ok(HostResponse::Scheduled(id))
    }

    async fn is_pending(&self, notification_id: &str) -> Result<bool> {
        Ok(self
            .pending()?
            .get(notification_id)
            .is_some_and(|h| !h.is_finished()))
    }

    async fn cancel(&self, notification_id: &str) -> Result<()> {
        let removed = self.pending()?.remove(notification_id);
        if let Some(handle) = removed {
            handle.abort();
            debug!("Cancelled reminder {}", notification_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(offset: Duration) -> NotificationRequest {
        NotificationRequest {
            title: "Match about to start!".into(),
            body: "Arsenal vs Chelsea is coming up. Don't miss it!".into(),
            trigger_at: Utc::now() + offset,
        }
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let n = TokioNotifier::new();
        let a = n.schedule_local_notification(&request(Duration::hours(1))).await.unwrap();
        let b = n.schedule_local_notification(&request(Duration::hours(1))).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(n.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_past_trigger_fires_immediately() {
        let n = TokioNotifier::new();
        n.schedule_local_notification(&request(Duration::seconds(-30))).await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), n.wait_all())
            .await
            .expect("reminder should fire without waiting")
            .unwrap();
        assert_eq!(n.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_removes_pending() {
        let n = TokioNotifier::new();
        let resp = n.schedule_local_notification(&request(Duration::days(1))).await.unwrap();
        let HostResponse::Scheduled(id) = resp else {
            panic!("local host never denies");
        };
        n.cancel(&id).await.unwrap();
        assert_eq!(n.pending_count(), 0);
        // unknown ids are fine
        n.cancel("local-999").await.unwrap();
        n.wait_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_fired_reminders_are_pruned_on_insert() {
        let n = TokioNotifier::new();
        let fired = n.schedule_local_notification(&request(Duration::seconds(-1))).await.unwrap();
        let HostResponse::Scheduled(fired_id) = fired else {
            panic!("local host never denies");
        };
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while n.is_pending(&fired_id).await.unwrap() {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("past reminder should fire");

        n.schedule_local_notification(&request(Duration::hours(1))).await.unwrap();
        assert_eq!(n.pending().unwrap().len(), 1);
        assert!(!n.pending().unwrap().contains_key(&fired_id));
    }

    #[tokio::test]
    async fn test_is_pending_tracks_lifecycle() {
        let n = TokioNotifier::new();
        let HostResponse::Scheduled(id) =
            n.schedule_local_notification(&request(Duration::days(1))).await.unwrap()
        else {
            panic!("local host never denies");
        };
        assert!(n.is_pending(&id).await.unwrap());
        assert!(!n.is_pending("local-999").await.unwrap());
        n.cancel(&id).await.unwrap();
        assert!(!n.is_pending(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_permission_always_granted() {
        let n = TokioNotifier::new();
        assert_eq!(n.request_permission().await.unwrap(), PermissionStatus::Granted);
        assert_eq!(n.permission_status().await.unwrap(), PermissionStatus::Granted);
    }
}
