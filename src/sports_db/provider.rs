use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::models::{Match, Team};

/// Read-only source of team and match records.
///
/// Every method fails softly: `None` means the lookup itself failed (network,
/// HTTP status, malformed body) and has already been logged. `Some(vec![])`
/// means the service answered but had nothing. Callers treat both as
/// "nothing found".
#[async_trait]
pub trait SportsDataSource: Send + Sync {
    async fn search_team_by_name(&self, name: &str) -> Option<Vec<Team>>;

    async fn get_next_matches_by_team_id(&self, team_id: &str) -> Option<Vec<Match>>;

    /// `sport` is forwarded verbatim (e.g. "Soccer").
    async fn get_matches_by_date(&self, date: NaiveDate, sport: &str) -> Option<Vec<Match>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
