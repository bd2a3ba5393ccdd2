// Poetry Engine — Agent Store
// Durable state in SQLite via rusqlite: particles, poems, feedback,
// references, interests, critiques, voice-principle versions and the
// append-only agent log.
//
// Module layout:
//   schema      — idempotent migrations
//   particles   — particle insert/query, decay update, consumption marking
//   poems       — poem insert/query/paging, ratings, poem counts
//   feedback    — feedback notes
//   references  — user-supplied reference texts
//   interests   — research topics and their notes
//   critiques   — self-critiques
//   voice       — voice-principle versions
//   events      — agent log (the scheduler's clock)
//
// The connection lives behind a parking_lot Mutex. Every method takes the
// lock for the duration of one synchronous call; no lock is ever held across
// an `.await`, so manual generation and the tick loop interleave safely.

use crate::atoms::error::EngineResult;
use log::info;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

mod critiques;
mod events;
mod feedback;
mod interests;
mod particles;
mod poems;
mod references;
mod schema;
mod voice;

pub use particles::DecayOutcome;

/// Thread-safe database wrapper.
pub struct AgentStore {
    pub(crate) conn: Mutex<Connection>,
}

impl AgentStore {
    /// Open (or create) the agent database at `path` and run migrations.
    pub fn open(path: &Path) -> EngineResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("[store] Opening agent store at {:?}", path);

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        schema::run_migrations(&conn)?;

        Ok(AgentStore { conn: Mutex::new(conn) })
    }

    /// Fresh in-memory store with the full schema. Used by tests and dry runs.
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::run_migrations(&conn)?;
        Ok(AgentStore { conn: Mutex::new(conn) })
    }
}

/// Current UTC time as a fixed-width RFC 3339 string (millisecond precision),
/// so that lexical order on the TEXT columns equals chronological order.
pub fn now_timestamp() -> String {
    format_timestamp(chrono::Utc::now())
}

pub fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn parse_timestamp(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_sort_lexically() {
        let a = chrono::DateTime::parse_from_rfc3339("2025-01-01T09:00:00Z").unwrap();
        let b = chrono::DateTime::parse_from_rfc3339("2025-01-01T10:00:00.5Z").unwrap();
        let sa = format_timestamp(a.with_timezone(&chrono::Utc));
        let sb = format_timestamp(b.with_timezone(&chrono::Utc));
        assert_eq!(sa, "2025-01-01T09:00:00.000Z");
        assert!(sa < sb);
        assert_eq!(parse_timestamp(&sb).unwrap(), b);
    }

    #[test]
    fn open_creates_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("poetry-bot-test-{}", std::process::id()));
        let path = dir.join("nested").join("agent.db");
        let store = AgentStore::open(&path).unwrap();
        drop(store);
        assert!(path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
