use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{ChannelConfig, HostResponse, NotificationHost, PermissionStatus};
use crate::db::models::{Match, NotificationRequest, ScheduledReminder};
use crate::db::ReminderLedger;
use crate::status::kickoff;

pub const REMINDER_TITLE: &str = "Match about to start!";

pub const PERMISSION_GRANTED_MSG: &str = "Permission granted.";
pub const PERMISSION_DENIED_MSG: &str = "Permission denied.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Both scores are already in
    Finished,
    /// Date or time missing/unparseable
    NoKickoffTime,
    KickoffPassed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled {
        notification_id: String,
        trigger_at: DateTime<Utc>,
    },
    /// An earlier reminder for a different kickoff was cancelled first.
    Replaced {
        notification_id: String,
        trigger_at: DateTime<Utc>,
    },
    AlreadyScheduled {
        trigger_at: DateTime<Utc>,
    },
    Skipped(SkipReason),
}

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("notification permission denied")]
    PermissionDenied,

    #[error("host refused reminder for match {0}")]
    Denied(String),

    #[error("host failed to schedule reminder for match {match_id}: {reason}")]
    Host { match_id: String, reason: String },

    #[error("reminder ledger error for match {match_id}: {reason}")]
    Ledger { match_id: String, reason: String },
}

/// Result of scheduling one batch of matches.
#[derive(Debug)]
pub struct BatchReport {
    pub permission: PermissionStatus,
    /// One entry per match, in the order the matches were given.
    /// Empty when permission was denied.
    pub outcomes: Vec<(String, Result<ScheduleOutcome, SchedulingError>)>,
}

impl BatchReport {
    /// Status line shown to the user.
    pub fn status_message(&self) -> &'static str {
        if self.permission.is_granted() {
            PERMISSION_GRANTED_MSG
        } else {
            PERMISSION_DENIED_MSG
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &SchedulingError)> {
        self.outcomes
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (id.as_str(), e)))
    }

    /// Reminders newly handed to the host in this batch.
    pub fn scheduled_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, r)| {
                matches!(
                    r,
                    Ok(ScheduleOutcome::Scheduled { .. }) | Ok(ScheduleOutcome::Replaced { .. })
                )
            })
            .count()
    }
}

/// Computes reminder trigger times and hands them to the notification host.
///
/// Permission (and channel registration) is settled once per scheduler, on
/// first use. A [`ReminderLedger`] keyed by match id prevents stacking
/// duplicates across runs and replaces reminders whose kickoff moved.
pub struct ReminderScheduler {
    host: Arc<dyn NotificationHost>,
    ledger: Arc<dyn ReminderLedger>,
    lead_time: Duration,
    channel: ChannelConfig,
    parallel: bool,
    permission: OnceCell<PermissionStatus>,
}

impl ReminderScheduler {
    pub fn new(
        host: Arc<dyn NotificationHost>,
        ledger: Arc<dyn ReminderLedger>,
        lead_time: Duration,
    ) -> Self {
        ReminderScheduler {
            host,
            ledger,
            lead_time,
            channel: ChannelConfig::default(),
            parallel: false,
            permission: OnceCell::new(),
        }
    }

    /// Issue the per-match requests of a batch concurrently.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn lead_time(&self) -> Duration {
        self.lead_time
    }

    /// Register the channel and confirm (or request) permission, once.
    pub async fn ensure_permission(&self) -> PermissionStatus {
        *self
            .permission
            .get_or_init(|| async {
                if let Err(e) = self.host.register_channel(&self.channel).await {
                    warn!(
                        "Failed to register notification channel '{}' on {}: {:#}",
                        self.channel.id,
                        self.host.name(),
                        e
                    );
                }

                let existing = match self.host.permission_status().await {
                    Ok(s) => s,
                    Err(e) => {
                        warn!("Could not read notification permission: {:#}", e);
                        PermissionStatus::Undetermined
                    }
                };
                if existing.is_granted() {
                    return existing;
                }

                match self.host.request_permission().await {
                    Ok(s) => s,
                    Err(e) => {
                        warn!("Notification permission request failed: {:#}", e);
                        PermissionStatus::Denied
                    }
                }
            })
            .await
    }

    /// Schedule the reminder for a single match.
    pub async fn schedule_reminder(&self, m: &Match) -> Result<ScheduleOutcome, SchedulingError> {
        if !self.ensure_permission().await.is_granted() {
            return Err(SchedulingError::PermissionDenied);
        }
        self.schedule_reminder_at(m, Utc::now()).await
    }

    /// Schedule reminders for every match. A failure on one match never stops
    /// the others; if permission is denied nothing is attempted.
    pub async fn schedule_batch(&self, matches: &[Match]) -> BatchReport {
        let permission = self.ensure_permission().await;
        if !permission.is_granted() {
            warn!(
                "Notification permission {}; skipping reminders for {} match(es)",
                permission,
                matches.len()
            );
            return BatchReport {
                permission,
                outcomes: vec![],
            };
        }

        let now = Utc::now();
        match self.ledger.purge_expired(now - self.lead_time) {
            Ok(0) => {}
            Ok(n) => debug!("Purged {} expired reminder(s) from ledger", n),
            Err(e) => warn!("Failed to purge reminder ledger: {:#}", e),
        }

        let results = if self.parallel {
            futures_util::future::join_all(matches.iter().map(|m| self.schedule_reminder_at(m, now)))
                .await
        } else {
            let mut results = Vec::with_capacity(matches.len());
            for m in matches {
                results.push(self.schedule_reminder_at(m, now).await);
            }
            results
        };

        let outcomes: Vec<_> = matches
            .iter()
            .map(|m| m.id.clone())
            .zip(results)
            .collect();

        let report = BatchReport {
            permission,
            outcomes,
        };
        for (match_id, e) in report.failures() {
            warn!("Reminder for match {} not scheduled: {}", match_id, e);
        }
        info!(
            "Scheduled {} new reminder(s) for {} match(es)",
            report.scheduled_count(),
            matches.len()
        );
        report
    }

    /// Core scheduling step; assumes permission is already granted.
    pub async fn schedule_reminder_at(
        &self,
        m: &Match,
        now: DateTime<Utc>,
    ) -> Result<ScheduleOutcome, SchedulingError> {
        let planned = match self.planned_trigger(m, now) {
            Ok(t) => t,
            Err(reason) => {
                debug!("No reminder for match {}: {:?}", m.id, reason);
                return Ok(ScheduleOutcome::Skipped(reason));
            }
        };

        let ledger_err = |e: anyhow::Error| SchedulingError::Ledger {
            match_id: m.id.clone(),
            reason: format!("{:#}", e),
        };

        let mut previous = self.ledger.get(&m.id).map_err(ledger_err)?;
        let unchanged = previous.as_ref().filter(|prev| prev.trigger_at == planned).cloned();
        if let Some(prev) = unchanged {
            if planned <= now || self.host_still_holds(&prev).await {
                return Ok(ScheduleOutcome::AlreadyScheduled {
                    trigger_at: planned,
                });
            }
            // The host lost it (e.g. a previous process exited): schedule afresh.
            debug!(
                "Reminder {} for match {} is no longer held by {}",
                prev.notification_id,
                m.id,
                self.host.name()
            );
            previous = None;
        }
        if let Some(prev) = &previous {
            // Kickoff moved: drop the stale reminder before adding the new one.
            if let Err(e) = self.host.cancel(&prev.notification_id).await {
                warn!(
                    "Failed to cancel stale reminder {} for match {}: {:#}",
                    prev.notification_id, m.id, e
                );
            }
            self.ledger.remove(&m.id).map_err(ledger_err)?;
        }

        // Kickoff is close enough that the lead time has already elapsed.
        let fire_at = planned.max(now);
        let request = build_request(m, fire_at);

        let notification_id = match self.host.schedule_local_notification(&request).await {
            Ok(HostResponse::Scheduled(id)) => id,
            Ok(HostResponse::Denied) => return Err(SchedulingError::Denied(m.id.clone())),
            Err(e) => {
                return Err(SchedulingError::Host {
                    match_id: m.id.clone(),
                    reason: format!("{:#}", e),
                })
            }
        };

        // The planned time is stored, not `fire_at`, so reruns compare equal.
        self.ledger
            .record(&ScheduledReminder {
                match_id: m.id.clone(),
                notification_id: notification_id.clone(),
                trigger_at: planned,
                scheduled_at: now,
            })
            .map_err(ledger_err)?;

        debug!(
            "Reminder {} for '{}' fires at {}",
            notification_id, m.title, fire_at
        );

        if previous.is_some() {
            Ok(ScheduleOutcome::Replaced {
                notification_id,
                trigger_at: fire_at,
            })
        } else {
            Ok(ScheduleOutcome::Scheduled {
                notification_id,
                trigger_at: fire_at,
            })
        }
    }

    /// Errors count as "held" so a flaky host never produces duplicates.
    async fn host_still_holds(&self, prev: &ScheduledReminder) -> bool {
        match self.host.is_pending(&prev.notification_id).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(
                    "Could not check reminder {} for match {}: {:#}",
                    prev.notification_id, prev.match_id, e
                );
                true
            }
        }
    }

    /// `kickoff - lead_time`, or why no reminder applies.
    fn planned_trigger(&self, m: &Match, now: DateTime<Utc>) -> Result<DateTime<Utc>, SkipReason> {
        if m.is_concluded() {
            return Err(SkipReason::Finished);
        }
        let kickoff = kickoff(m).ok_or(SkipReason::NoKickoffTime)?;
        if kickoff <= now {
            return Err(SkipReason::KickoffPassed);
        }
        Ok(kickoff - self.lead_time)
    }
}

/// Fixed title, body naming the match.
pub fn build_request(m: &Match, trigger_at: DateTime<Utc>) -> NotificationRequest {
    NotificationRequest {
        title: REMINDER_TITLE.to_string(),
        body: format!("{} is coming up. Don't miss it!", m.title),
        trigger_at,
    }
}
