use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod config;
mod db;
mod feed;
mod notifications;
mod sports_db;
mod status;

use config::{Command, Config};
use db::{Database, MemoryLedger, ReminderLedger};
use feed::MatchFeed;
use notifications::{ReminderScheduler, TokioNotifier};
use sports_db::{SportsDataSource, TheSportsDb};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let source = TheSportsDb::new(
        config.api_key.as_deref(),
        Some(&config.api_url),
        Duration::from_secs(config.http_timeout_secs),
    )?;
    info!("Using {} at {}", source.name(), config.api_url);

    let ledger: Arc<dyn ReminderLedger> = if config.ledger_path == ":memory:" {
        Arc::new(MemoryLedger::new())
    } else {
        let db = Database::open(&config.ledger_path)?;
        info!(
            "Reminder ledger opened: {} ({} tracked)",
            config.ledger_path,
            db.count()?
        );
        Arc::new(db)
    };

    let notifier = TokioNotifier::new();
    let scheduler = ReminderScheduler::new(
        Arc::new(notifier.clone()),
        ledger,
        chrono::Duration::minutes(config.lead_time_minutes),
    )
    .with_parallel(config.parallel_reminders);
    info!(
        "Reminders fire {} minute(s) before kickoff",
        scheduler.lead_time().num_minutes()
    );

    let feed = MatchFeed::new(Arc::new(source), Arc::new(scheduler));

    match config.command {
        Command::Team { name, wait } => {
            let result = match feed.fetch_upcoming_for_team(&name).await {
                Ok(r) => r,
                Err(e) => {
                    error!("{}", e);
                    println!("{}", e);
                    return Ok(());
                }
            };

            println!("{}", result.notification_status());
            println!("Upcoming matches for {}", result.team_display_name());
            for m in &result.matches {
                println!(
                    "- {}  {} {}  [{}]",
                    m.title,
                    m.scheduled_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "TBD".into()),
                    m.scheduled_time.as_deref().unwrap_or(""),
                    status::classify_now(m)
                );
                if let Some(league) = &m.league {
                    println!("    {}{}", league, m.venue.as_deref().map(|v| format!(" @ {}", v)).unwrap_or_default());
                }
            }
            for (match_id, e) in result.reminders.failures() {
                println!("  reminder for {} failed: {}", match_id, e);
            }

            if wait && notifier.pending_count() > 0 {
                info!(
                    "Waiting for {} pending reminder(s); Ctrl-C to quit",
                    notifier.pending_count()
                );
                tokio::select! {
                    res = notifier.wait_all() => res?,
                    _ = tokio::signal::ctrl_c() => info!("Interrupted"),
                }
            }
        }
        Command::Day { date, sport, limit } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let matches = feed.matches_on(date, &sport).await;
            if matches.is_empty() {
                println!("No {} matches found for {}.", sport, date);
                return Ok(());
            }

            println!("{} matches on {}", sport, date);
            for (m, status) in matches.iter().take(limit) {
                println!("- {}  [{}]", m.title, status);
            }
        }
    }

    Ok(())
}
