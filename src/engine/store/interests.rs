use super::{now_timestamp, AgentStore};
use crate::atoms::error::EngineResult;
use crate::atoms::types::Interest;
use rusqlite::params;

impl AgentStore {
    pub fn insert_interest(&self, topic: &str, origin: &str, strength: f64) -> EngineResult<i64> {
        let now = now_timestamp();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO interests (topic, origin, strength, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![topic, origin, strength, now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Interests with positive strength, strongest (then newest) first.
    pub fn active_interests(&self) -> EngineResult<Vec<Interest>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, topic, origin, research_notes, strength, created_at, updated_at
             FROM interests WHERE strength > 0
             ORDER BY strength DESC, created_at DESC, id DESC",
        )?;
        let interests = stmt
            .query_map([], |row| {
                Ok(Interest {
                    id: row.get(0)?,
                    topic: row.get(1)?,
                    origin: row.get(2)?,
                    research_notes: row.get(3)?,
                    strength: row.get(4)?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(interests)
    }

    pub fn update_interest_research(&self, id: i64, notes: &str) -> EngineResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE interests SET research_notes = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, notes, now_timestamp()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn research_notes_start_null() {
        let store = AgentStore::open_in_memory().unwrap();
        let id = store.insert_interest("tide pools", "particles", 1.0).unwrap();
        let interests = store.active_interests().unwrap();
        assert_eq!(interests.len(), 1);
        assert!(interests[0].research_notes.is_none());

        store.update_interest_research(id, "anemones close at low tide").unwrap();
        let interests = store.active_interests().unwrap();
        assert_eq!(interests[0].research_notes.as_deref(), Some("anemones close at low tide"));
    }

    #[test]
    fn zero_strength_interests_are_inactive() {
        let store = AgentStore::open_in_memory().unwrap();
        store.insert_interest("faded", "particles", 0.0).unwrap();
        store.insert_interest("vivid", "particles", 0.5).unwrap();
        let interests = store.active_interests().unwrap();
        assert_eq!(interests.len(), 1);
        assert_eq!(interests[0].topic, "vivid");
    }
}
