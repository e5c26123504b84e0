use clap::{Parser, Subcommand};

/// Upcoming matches from TheSportsDB with kickoff reminders
#[derive(Parser, Debug, Clone)]
#[command(name = "matchday-reminders", version, about)]
pub struct Config {
    /// TheSportsDB API base URL (the key segment is appended)
    #[arg(
        long,
        env = "SPORTSDB_API_URL",
        default_value = "https://www.thesportsdb.com/api/v1/json"
    )]
    pub api_url: String,

    /// TheSportsDB API key (falls back to the public test key)
    #[arg(long, env = "SPORTSDB_API_KEY")]
    pub api_key: Option<String>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "10")]
    pub http_timeout_secs: u64,

    /// How long before kickoff a reminder fires, in minutes
    #[arg(long, env = "REMINDER_LEAD_MINUTES", default_value = "60")]
    pub lead_time_minutes: i64,

    /// SQLite file tracking scheduled reminders (":memory:" to keep nothing)
    #[arg(long, env = "REMINDER_LEDGER_PATH", default_value = "reminders.db")]
    pub ledger_path: String,

    /// Schedule reminders for a batch concurrently instead of one by one
    #[arg(long, env = "PARALLEL_REMINDERS", default_value = "false")]
    pub parallel_reminders: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Next matches for a team, with a reminder before each kickoff
    Team {
        /// Team name as searched on TheSportsDB
        #[arg(default_value = "Arsenal")]
        name: String,

        /// Keep running until every scheduled reminder has fired
        #[arg(long)]
        wait: bool,
    },
    /// All matches of a sport on one day, with their status
    Day {
        /// Day to list, YYYY-MM-DD (defaults to today, UTC)
        #[arg(long)]
        date: Option<chrono::NaiveDate>,

        /// Sport filter, passed through as-is
        #[arg(long, default_value = "Soccer")]
        sport: String,

        /// Maximum number of matches to print
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

/// Longest accepted reminder lead time (one week)
const MAX_LEAD_MINUTES: i64 = 7 * 24 * 60;

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_url.trim().is_empty() {
            anyhow::bail!("api_url must not be empty");
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be positive");
        }
        if !(0..=MAX_LEAD_MINUTES).contains(&self.lead_time_minutes) {
            anyhow::bail!(
                "lead_time_minutes must be between 0 and {}",
                MAX_LEAD_MINUTES
            );
        }
        Ok(())
    }
}
