//! Match lifecycle derivation.
//!
//! Status is never stored; it is recomputed from the recorded scores and the
//! scheduled kickoff each time it is needed. Kickoff fields from TheSportsDB
//! are UTC, so "now" is compared in UTC as well.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::db::models::{Match, MatchStatus};

/// Derive the lifecycle state of `m` relative to `now`.
///
/// Both scores present always means `Finished`, even for a future kickoff.
/// A kickoff equal to `now` is still `NotStarted`; only a strictly later
/// `now` flips the match to `InProgress`. An unparseable kickoff fails
/// closed to `NotStarted`.
pub fn classify(m: &Match, now: DateTime<Utc>) -> MatchStatus {
    if m.is_concluded() {
        return MatchStatus::Finished;
    }

    match kickoff(m) {
        Some(event_instant) if now > event_instant => MatchStatus::InProgress,
        _ => MatchStatus::NotStarted,
    }
}

/// `classify` against the current wall clock.
pub fn classify_now(m: &Match) -> MatchStatus {
    classify(m, Utc::now())
}

/// Combine `scheduled_date` and `scheduled_time` into a UTC instant.
///
/// Times without an offset are UTC. An explicit offset ("+01:00", "-0500",
/// "Z") is honoured and converted.
pub fn kickoff(m: &Match) -> Option<DateTime<Utc>> {
    let date = m.scheduled_date?;
    let time = m.scheduled_time.as_deref()?.trim();
    let time = match time.strip_suffix('Z') {
        Some(clock) => format!("{}+00:00", clock),
        None => time.to_string(),
    };
    let stamp = format!("{} {}", date.format("%Y-%m-%d"), time);

    const WITH_OFFSET: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%:z",
        "%Y-%m-%d %H:%M%:z",
        "%Y-%m-%d %H:%M:%S%z",
        "%Y-%m-%d %H:%M%z",
    ];
    const NAIVE: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

    WITH_OFFSET
        .iter()
        .find_map(|f| DateTime::parse_from_str(&stamp, f).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NAIVE
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(&stamp, f).ok())
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn fixture(date: &str, time: &str, home: Option<i32>, away: Option<i32>) -> Match {
        Match {
            id: "441613".into(),
            title: "Arsenal vs Chelsea".into(),
            scheduled_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            scheduled_time: Some(time.into()),
            home_score: home,
            away_score: away,
            home_team: Some("Arsenal".into()),
            away_team: Some("Chelsea".into()),
            league: Some("English Premier League".into()),
            venue: None,
        }
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_scores_dominate_future_kickoff() {
        let m = fixture("2030-01-01", "15:00:00", Some(2), Some(1));
        assert_eq!(classify(&m, at(2024, 1, 1, 0, 0)), MatchStatus::Finished);
    }

    #[test]
    fn test_zero_zero_is_finished() {
        let m = fixture("2024-03-02", "15:00:00", Some(0), Some(0));
        assert_eq!(classify(&m, at(2024, 3, 2, 16, 0)), MatchStatus::Finished);
    }

    #[test]
    fn test_future_kickoff_not_started() {
        let m = fixture("2024-03-02", "15:00:00", None, None);
        assert_eq!(classify(&m, at(2024, 3, 2, 14, 59)), MatchStatus::NotStarted);
    }

    #[test]
    fn test_past_kickoff_in_progress() {
        let m = fixture("2024-03-02", "15:00:00", None, None);
        assert_eq!(classify(&m, at(2024, 3, 2, 15, 1)), MatchStatus::InProgress);
    }

    #[test]
    fn test_kickoff_equal_to_now_is_not_started() {
        let m = fixture("2024-03-02", "15:00:00", None, None);
        assert_eq!(classify(&m, at(2024, 3, 2, 15, 0)), MatchStatus::NotStarted);
        assert_eq!(
            classify(&m, at(2024, 3, 2, 15, 0) + Duration::seconds(1)),
            MatchStatus::InProgress
        );
    }

    #[test]
    fn test_partial_score_is_not_concluded() {
        let m = fixture("2024-03-02", "15:00:00", Some(1), None);
        assert_eq!(classify(&m, at(2024, 3, 2, 16, 0)), MatchStatus::InProgress);
        let m = fixture("2024-03-02", "15:00:00", None, Some(1));
        assert_eq!(classify(&m, at(2024, 3, 2, 14, 0)), MatchStatus::NotStarted);
    }

    #[test]
    fn test_unparseable_time_fails_closed() {
        let m = fixture("2024-03-02", "TBD", None, None);
        assert_eq!(classify(&m, at(2030, 1, 1, 0, 0)), MatchStatus::NotStarted);

        let mut no_time = fixture("2024-03-02", "15:00:00", None, None);
        no_time.scheduled_time = None;
        assert_eq!(classify(&no_time, at(2030, 1, 1, 0, 0)), MatchStatus::NotStarted);

        let mut no_date = fixture("2024-03-02", "15:00:00", None, None);
        no_date.scheduled_date = None;
        assert_eq!(classify(&no_date, at(2030, 1, 1, 0, 0)), MatchStatus::NotStarted);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let m = fixture("2024-03-02", "15:00:00", None, None);
        let now = at(2024, 3, 2, 15, 30);
        assert_eq!(classify(&m, now), classify(&m, now));

        let future = fixture("2999-01-01", "12:00:00", None, None);
        assert_eq!(classify_now(&future), MatchStatus::NotStarted);
        assert_eq!(classify_now(&future), MatchStatus::NotStarted);
    }

    #[test]
    fn test_kickoff_time_formats() {
        let expected = at(2024, 3, 2, 15, 0);
        for raw in ["15:00:00", "15:00", "15:00:00+00:00", "15:00:00Z", " 15:00:00 "] {
            let m = fixture("2024-03-02", raw, None, None);
            assert_eq!(kickoff(&m), Some(expected), "format {:?}", raw);
        }
    }

    #[test]
    fn test_kickoff_offsets_convert_to_utc() {
        let cases = [
            ("15:00:00+01:00", at(2024, 3, 2, 14, 0)),
            ("15:00:00-05:00", at(2024, 3, 2, 20, 0)),
            ("15:00-0500", at(2024, 3, 2, 20, 0)),
            ("23:30:00-02:00", at(2024, 3, 3, 1, 30)),
        ];
        for (raw, expected) in cases {
            let m = fixture("2024-03-02", raw, None, None);
            assert_eq!(kickoff(&m), Some(expected), "format {:?}", raw);
        }
    }

    #[test]
    fn test_negative_offset_kickoff_not_started_before_utc_instant() {
        // 15:00 at -05:00 is 20:00 UTC; at 16:00 UTC the match has not begun.
        let m = fixture("2024-03-02", "15:00:00-05:00", None, None);
        assert_eq!(classify(&m, at(2024, 3, 2, 16, 0)), MatchStatus::NotStarted);
        assert_eq!(classify(&m, at(2024, 3, 2, 20, 1)), MatchStatus::InProgress);
    }

    #[test]
    fn test_garbage_offset_fails_closed() {
        let m = fixture("2024-03-02", "15:00:00+xx", None, None);
        assert_eq!(kickoff(&m), None);
        assert_eq!(classify(&m, at(2024, 3, 2, 16, 0)), MatchStatus::NotStarted);
    }
}
