use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::ScheduledReminder;

/// Record of reminders already handed to the host, keyed by match id.
///
/// The scheduler consults it before every request so that re-running a feed
/// does not stack duplicate reminders for the same match.
pub trait ReminderLedger: Send + Sync {
    fn get(&self, match_id: &str) -> Result<Option<ScheduledReminder>>;

    /// Insert or replace the entry for `reminder.match_id`.
    fn record(&self, reminder: &ScheduledReminder) -> Result<()>;

    fn remove(&self, match_id: &str) -> Result<()>;

    /// Drop entries whose trigger time is before `cutoff`. Returns how many were removed.
    fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open reminder ledger at {}", path))?;
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("reminder ledger connection poisoned"))
    }

    /// Number of reminders currently tracked
    pub fn count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM scheduled_reminders", [], |r| r.get(0))?;
        Ok(n)
    }
}

impl ReminderLedger for Database {
    fn get(&self, match_id: &str) -> Result<Option<ScheduledReminder>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT match_id, notification_id, trigger_at, scheduled_at
                 FROM scheduled_reminders WHERE match_id = ?1",
                params![match_id],
                map_reminder,
            )
            .optional()?;
        Ok(row)
    }

    fn record(&self, reminder: &ScheduledReminder) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO scheduled_reminders (match_id, notification_id, trigger_at, scheduled_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(match_id) DO UPDATE SET
                notification_id=excluded.notification_id,
                trigger_at=excluded.trigger_at,
                scheduled_at=excluded.scheduled_at",
            params![
                reminder.match_id,
                reminder.notification_id,
                reminder.trigger_at,
                reminder.scheduled_at,
            ],
        )?;
        Ok(())
    }

    fn remove(&self, match_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM scheduled_reminders WHERE match_id = ?1",
            params![match_id],
        )?;
        Ok(())
    }

    fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM scheduled_reminders WHERE trigger_at < ?1",
            params![cutoff],
        )?;
        Ok(removed)
    }
}

/// Process-local ledger, used when no ledger file is wanted.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    entries: Arc<Mutex<HashMap<String, ScheduledReminder>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, ScheduledReminder>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("reminder ledger poisoned"))
    }
}

impl ReminderLedger for MemoryLedger {
    fn get(&self, match_id: &str) -> Result<Option<ScheduledReminder>> {
        Ok(self.entries()?.get(match_id).cloned())
    }

    fn record(&self, reminder: &ScheduledReminder) -> Result<()> {
        self.entries()?
            .insert(reminder.match_id.clone(), reminder.clone());
        Ok(())
    }

    fn remove(&self, match_id: &str) -> Result<()> {
        self.entries()?.remove(match_id);
        Ok(())
    }

    fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|_, r| r.trigger_at >= cutoff);
        Ok(before - entries.len())
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_reminder(row: &rusqlite::Row) -> rusqlite::Result<ScheduledReminder> {
    Ok(ScheduledReminder {
        match_id: row.get(0)?,
        notification_id: row.get(1)?,
        trigger_at: row.get(2)?,
        scheduled_at: row.get(3)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS scheduled_reminders (
    match_id        TEXT    PRIMARY KEY,
    notification_id TEXT    NOT NULL,
    trigger_at      TEXT    NOT NULL,
    scheduled_at    TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reminders_trigger ON scheduled_reminders(trigger_at);
"#;
