//! Team → upcoming matches → reminders.
//!
//! This is the only place where "nothing came back" from the remote source is
//! turned into a typed failure for the caller.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::models::{Match, MatchStatus, Team};
use crate::notifications::{BatchReport, ReminderScheduler};
use crate::sports_db::SportsDataSource;
use crate::status::classify;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("Team not found: {0}")]
    TeamNotFound(String),

    #[error("No upcoming matches found for {0}")]
    NoUpcomingMatches(String),
}

/// Outcome of one successful orchestration run.
#[derive(Debug)]
pub struct TeamFeed {
    pub team: Team,
    /// Exactly as received from the source: no filtering, no reordering.
    pub matches: Vec<Match>,
    pub reminders: BatchReport,
}

impl TeamFeed {
    pub fn team_display_name(&self) -> &str {
        &self.team.name
    }

    /// "Permission granted." / "Permission denied."
    pub fn notification_status(&self) -> &'static str {
        self.reminders.status_message()
    }
}

/// Composes the sports data source with the reminder scheduler.
#[derive(Clone)]
pub struct MatchFeed {
    source: Arc<dyn SportsDataSource>,
    scheduler: Arc<ReminderScheduler>,
}

impl MatchFeed {
    pub fn new(source: Arc<dyn SportsDataSource>, scheduler: Arc<ReminderScheduler>) -> Self {
        MatchFeed { source, scheduler }
    }

    /// Resolve `team_name`, fetch its next matches and schedule a reminder
    /// for each of them.
    ///
    /// The first search result is taken as-is: it is the first candidate in
    /// the source's own ranking, no disambiguation is attempted.
    pub async fn fetch_upcoming_for_team(&self, team_name: &str) -> Result<TeamFeed, FeedError> {
        let team = self
            .source
            .search_team_by_name(team_name)
            .await
            .and_then(|teams| teams.into_iter().next())
            .ok_or_else(|| FeedError::TeamNotFound(team_name.to_string()))?;

        info!(
            "Resolved '{}' to {} (id {}) via {}",
            team_name,
            team.name,
            team.id,
            self.source.name()
        );

        let matches = self
            .source
            .get_next_matches_by_team_id(&team.id)
            .await
            .unwrap_or_default();
        if matches.is_empty() {
            return Err(FeedError::NoUpcomingMatches(team.name));
        }

        info!("{} upcoming match(es) for {}", matches.len(), team.name);

        let reminders = self.scheduler.schedule_batch(&matches).await;
        if !reminders.permission.is_granted() {
            warn!("{}", reminders.status_message());
        }

        Ok(TeamFeed {
            team,
            matches,
            reminders,
        })
    }

    /// All matches of `sport` on `date`, each paired with its current status.
    /// A failed lookup is indistinguishable from an empty day.
    pub async fn matches_on(&self, date: NaiveDate, sport: &str) -> Vec<(Match, MatchStatus)> {
        let now = Utc::now();
        self.source
            .get_matches_by_date(date, sport)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|m| {
                let status = classify(&m, now);
                (m, status)
            })
            .collect()
    }
}
