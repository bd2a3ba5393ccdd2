use super::{now_timestamp, AgentStore};
use crate::atoms::error::EngineResult;
use crate::atoms::types::{Reference, ReferenceKind};
use rusqlite::params;

impl AgentStore {
    pub fn insert_reference(&self, title: &str, body: &str, kind: ReferenceKind) -> EngineResult<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO references_ (title, body, source_type, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![title, body, kind.as_str(), now_timestamp()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_references(&self, limit: usize) -> EngineResult<Vec<Reference>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, body, source_type, created_at FROM references_
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let refs = stmt
            .query_map(params![limit as i64], |row| {
                let kind: String = row.get(3)?;
                Ok(Reference {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    body: row.get(2)?,
                    source_type: kind.parse().unwrap_or(ReferenceKind::Other),
                    created_at: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(refs)
    }
}
