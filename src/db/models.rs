use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A team as returned by the remote team search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// TheSportsDB `idTeam`
    pub id: String,
    pub name: String,
}

/// A scheduled (or concluded) match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// TheSportsDB `idEvent`
    pub id: String,
    /// e.g. "Arsenal vs Chelsea"
    pub title: String,
    pub scheduled_date: Option<NaiveDate>,
    /// Raw `strTime`, e.g. "15:00:00" or "15:00:00+00:00"
    pub scheduled_time: Option<String>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub league: Option<String>,
    pub venue: Option<String>,
}

impl Match {
    /// True once both scores are recorded.
    pub fn is_concluded(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    NotStarted,
    InProgress,
    Finished,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchStatus::NotStarted => "Not Started",
            MatchStatus::InProgress => "In Progress",
            MatchStatus::Finished => "Finished",
        };
        f.write_str(label)
    }
}

/// A local reminder handed to the host notification capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub trigger_at: DateTime<Utc>,
}

/// Ledger row for a reminder that has been accepted by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledReminder {
    pub match_id: String,
    /// Identifier the host returned for the notification (used to cancel it)
    pub notification_id: String,
    pub trigger_at: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
}
