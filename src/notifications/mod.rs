//! Local kickoff reminders.
//!
//! The operating system's notification subsystem is modelled by
//! [`NotificationHost`]; the core only ever talks to that trait. The
//! [`ReminderScheduler`] turns matches into requests, and [`TokioNotifier`]
//! is the in-process host used by the CLI.

pub mod local;
pub mod scheduler;

pub use local::TokioNotifier;
pub use scheduler::{BatchReport, ReminderScheduler};

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

use crate::db::models::NotificationRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Not asked yet
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionStatus::Granted => f.write_str("granted"),
            PermissionStatus::Denied => f.write_str("denied"),
            PermissionStatus::Undetermined => f.write_str("undetermined"),
        }
    }
}

/// Host answer to a single scheduling request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostResponse {
    /// Accepted; the id can be handed back to `cancel`.
    Scheduled(String),
    Denied,
}

/// Highest channel importance level (heads-up display)
pub const IMPORTANCE_MAX: u8 = 5;

/// Delivery channel for platforms that need one registered before the first
/// notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub id: String,
    pub name: String,
    /// 0 (none) to [`IMPORTANCE_MAX`]
    pub importance: u8,
    /// Alternating off/on durations in milliseconds
    pub vibration_pattern: Vec<u64>,
    pub light_color: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            id: "default".into(),
            name: "default".into(),
            importance: IMPORTANCE_MAX,
            vibration_pattern: vec![0, 250, 250, 250],
            light_color: "#FF231F7C".into(),
        }
    }
}

/// Capability the platform exposes for local notifications.
#[async_trait]
pub trait NotificationHost: Send + Sync {
    /// Current permission without prompting.
    async fn permission_status(&self) -> Result<PermissionStatus>;

    /// Prompt for permission if the platform supports it.
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Hosts without delivery channels keep the no-op default.
    async fn register_channel(&self, _channel: &ChannelConfig) -> Result<()> {
        Ok(())
    }

    async fn schedule_local_notification(&self, request: &NotificationRequest) -> Result<HostResponse>;

    /// Cancelling an unknown id is not an error.
    async fn cancel(&self, notification_id: &str) -> Result<()>;

    /// Whether a notification this host accepted is still waiting to fire.
    /// Hosts whose notifications outlive the process keep the default.
    async fn is_pending(&self, _notification_id: &str) -> Result<bool> {
        Ok(true)
    }

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
