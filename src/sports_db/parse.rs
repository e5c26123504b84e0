//! Normalization of TheSportsDB JSON payloads into domain records.
//!
//! The service is loose with types: ids and scores show up as strings or
//! numbers, and "no value" can be `null`, a missing key or `""`.

use chrono::NaiveDate;
use serde_json::Value;

use crate::db::models::{Match, Team};

/// Parse a `searchteams.php` body. `{"teams": null}` yields an empty list.
pub fn parse_teams_response(raw: &Value) -> Vec<Team> {
    let teams = match raw["teams"].as_array() {
        Some(a) => a,
        None => return vec![],
    };

    teams
        .iter()
        .filter_map(|t| {
            let id = text(&t["idTeam"])?;
            let name = text(&t["strTeam"]).unwrap_or_else(|| id.clone());
            Some(Team { id, name })
        })
        .collect()
}

/// Parse an `eventsnext.php` / `eventsday.php` body, preserving order.
pub fn parse_events_response(raw: &Value) -> Vec<Match> {
    let events = match raw["events"].as_array() {
        Some(a) => a,
        None => return vec![],
    };

    events.iter().filter_map(parse_event).collect()
}

fn parse_event(ev: &Value) -> Option<Match> {
    let id = text(&ev["idEvent"])?;
    let home_team = text(&ev["strHomeTeam"]);
    let away_team = text(&ev["strAwayTeam"]);

    let title = text(&ev["strEvent"]).unwrap_or_else(|| match (&home_team, &away_team) {
        (Some(h), Some(a)) => format!("{} vs {}", h, a),
        _ => format!("Event {}", id),
    });

    let scheduled_date = text(&ev["dateEvent"])
        .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());

    Some(Match {
        id,
        title,
        scheduled_date,
        scheduled_time: text(&ev["strTime"]),
        home_score: score(&ev["intHomeScore"]),
        away_score: score(&ev["intAwayScore"]),
        home_team,
        away_team,
        league: text(&ev["strLeague"]),
        venue: text(&ev["strVenue"]),
    })
}

/// Non-empty string value; numbers are stringified.
fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn score(v: &Value) -> Option<i32> {
    v.as_str()
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| v.as_i64().and_then(|n| i32::try_from(n).ok()))
}
