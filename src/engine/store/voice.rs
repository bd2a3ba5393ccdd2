use super::{now_timestamp, AgentStore};
use crate::atoms::error::EngineResult;
use crate::atoms::types::VoicePrinciples;
use rusqlite::{params, OptionalExtension};

const VOICE_COLUMNS: &str = "id, principles, poem_count, source_poem_ids, supersedes_id, created_at";

fn voice_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VoicePrinciples> {
    let sources: String = row.get(3)?;
    Ok(VoicePrinciples {
        id: row.get(0)?,
        principles: row.get(1)?,
        poem_count: row.get(2)?,
        source_poem_ids: serde_json::from_str(&sources).unwrap_or_default(),
        supersedes_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl AgentStore {
    pub fn insert_voice_principles(
        &self,
        principles: &str,
        poem_count: i64,
        source_poem_ids: &[i64],
        supersedes_id: Option<i64>,
    ) -> EngineResult<i64> {
        let sources = serde_json::to_string(source_poem_ids)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO voice_principles (principles, poem_count, source_poem_ids, supersedes_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![principles, poem_count, sources, supersedes_id, now_timestamp()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The current version: latest by creation time.
    pub fn current_voice_principles(&self) -> EngineResult<Option<VoicePrinciples>> {
        let conn = self.conn.lock();
        let current = conn
            .query_row(
                &format!(
                    "SELECT {} FROM voice_principles ORDER BY created_at DESC, id DESC LIMIT 1",
                    VOICE_COLUMNS
                ),
                [],
                voice_from_row,
            )
            .optional()?;
        Ok(current)
    }

    /// Every version, newest first.
    pub fn voice_history(&self, limit: usize) -> EngineResult<Vec<VoicePrinciples>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM voice_principles ORDER BY created_at DESC, id DESC LIMIT ?1",
            VOICE_COLUMNS
        ))?;
        let versions = stmt.query_map(params![limit as i64], voice_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(versions)
    }
}
