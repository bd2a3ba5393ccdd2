// Agent log: append-only, and the only clock the scheduler reads.
// `last_event` is the "time since X" primitive: one indexed lookup by type,
// newest first, limit 1.

use super::{format_timestamp, now_timestamp, AgentStore};
use crate::atoms::error::EngineResult;
use crate::atoms::types::AgentEvent;
use rusqlite::{params, OptionalExtension};

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentEvent> {
    let detail: String = row.get(2)?;
    Ok(AgentEvent {
        id: row.get(0)?,
        event_type: row.get(1)?,
        detail: serde_json::from_str(&detail).unwrap_or(serde_json::Value::Null),
        created_at: row.get(3)?,
    })
}

impl AgentStore {
    pub fn log_event(&self, event_type: &str, detail: serde_json::Value) -> EngineResult<i64> {
        self.insert_event(event_type, &detail, &now_timestamp())
    }

    /// Append an event with an explicit timestamp. Used to seed history.
    pub fn log_event_at(
        &self,
        event_type: &str,
        detail: serde_json::Value,
        at: chrono::DateTime<chrono::Utc>,
    ) -> EngineResult<i64> {
        self.insert_event(event_type, &detail, &format_timestamp(at))
    }

    fn insert_event(&self, event_type: &str, detail: &serde_json::Value, at: &str) -> EngineResult<i64> {
        let detail = serde_json::to_string(detail)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO agent_log (event_type, detail, created_at) VALUES (?1, ?2, ?3)",
            params![event_type, detail, at],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn last_event(&self, event_type: &str) -> EngineResult<Option<AgentEvent>> {
        let conn = self.conn.lock();
        let event = conn
            .query_row(
                "SELECT id, event_type, detail, created_at FROM agent_log
                 WHERE event_type = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![event_type],
                event_from_row,
            )
            .optional()?;
        Ok(event)
    }

    pub fn recent_events(&self, limit: usize) -> EngineResult<Vec<AgentEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, event_type, detail, created_at FROM agent_log
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let events = stmt.query_map(params![limit as i64], event_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(events)
    }

    pub fn count_events(&self, event_type: &str) -> EngineResult<i64> {
        let conn = self.conn.lock();
        let n = conn.query_row(
            "SELECT COUNT(*) FROM agent_log WHERE event_type = ?1",
            params![event_type],
            |r| r.get(0),
        )?;
        Ok(n)
    }
}
