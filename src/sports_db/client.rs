use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use super::parse::{parse_events_response, parse_teams_response};
use super::provider::SportsDataSource;
use crate::db::models::{Match, Team};

pub const DEFAULT_BASE_URL: &str = "https://www.thesportsdb.com/api/v1/json";
/// TheSportsDB's public free-tier key
pub const PUBLIC_API_KEY: &str = "123";

/// Failure of a single outbound read. Never leaves this module: the public
/// lookups log it and return `None`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Team/event lookups against TheSportsDB v1 JSON API.
/// Docs: <https://www.thesportsdb.com/api.php>
#[derive(Clone)]
pub struct TheSportsDb {
    http: Client,
    api_key: String,
    /// Base URL for overriding in tests
    base_url: String,
}

impl TheSportsDb {
    pub fn new(api_key: Option<&str>, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(TheSportsDb {
            http,
            api_key: api_key
                .filter(|k| !k.trim().is_empty())
                .unwrap_or(PUBLIC_API_KEY)
                .to_string(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// `<base>/<key>/<endpoint>?<query>`, with query values URL-encoded.
    fn endpoint(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Url, TransportError> {
        let raw = format!("{}/{}/{}", self.base_url, self.api_key, endpoint);
        Ok(Url::parse_with_params(&raw, query)?)
    }

    async fn get_json(&self, url: Url) -> Result<Value, TransportError> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: resp.status(),
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|source| TransportError::Decode {
                url: url.to_string(),
                source,
            })
    }

    async fn try_search_teams(&self, name: &str) -> Result<Vec<Team>, TransportError> {
        let url = self.endpoint("searchteams.php", &[("t", name)])?;
        let raw = self.get_json(url).await?;
        Ok(parse_teams_response(&raw))
    }

    async fn try_next_matches(&self, team_id: &str) -> Result<Vec<Match>, TransportError> {
        let url = self.endpoint("eventsnext.php", &[("id", team_id)])?;
        let raw = self.get_json(url).await?;
        Ok(parse_events_response(&raw))
    }

    async fn try_matches_by_date(
        &self,
        date: NaiveDate,
        sport: &str,
    ) -> Result<Vec<Match>, TransportError> {
        let day = format_day(date);
        let url = self.endpoint("eventsday.php", &[("d", day.as_str()), ("s", sport)])?;
        let raw = self.get_json(url).await?;
        Ok(parse_events_response(&raw))
    }
}

/// Calendar representation the service expects for `d=`.
pub fn format_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Absorb a transport failure into "no data", keeping it in the logs.
fn soft<T>(what: &str, result: Result<T, TransportError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Error {}: {}", what, e);
            None
        }
    }
}

#[async_trait]
impl SportsDataSource for TheSportsDb {
    fn name(&self) -> &str {
        "TheSportsDB"
    }

    async fn search_team_by_name(&self, name: &str) -> Option<Vec<Team>> {
        soft("searching for team", self.try_search_teams(name).await)
    }

    async fn get_next_matches_by_team_id(&self, team_id: &str) -> Option<Vec<Match>> {
        soft("getting next matches", self.try_next_matches(team_id).await)
    }

    async fn get_matches_by_date(&self, date: NaiveDate, sport: &str) -> Option<Vec<Match>> {
        soft(
            "getting matches by date",
            self.try_matches_by_date(date, sport).await,
        )
    }
}
