use super::{now_timestamp, AgentStore};
use crate::atoms::error::EngineResult;
use crate::atoms::types::Feedback;
use rusqlite::params;

fn feedback_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Feedback> {
    Ok(Feedback {
        id: row.get(0)?,
        poem_id: row.get(1)?,
        note: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl AgentStore {
    pub fn insert_feedback(&self, poem_id: i64, note: &str) -> EngineResult<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO feedback (poem_id, note, created_at) VALUES (?1, ?2, ?3)",
            params![poem_id, note, now_timestamp()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Notes attached to one poem, oldest first.
    pub fn feedback_for_poem(&self, poem_id: i64) -> EngineResult<Vec<Feedback>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, poem_id, note, created_at FROM feedback
             WHERE poem_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let notes = stmt.query_map(params![poem_id], feedback_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(notes)
    }

    /// Most recent notes across all poems, newest first.
    pub fn recent_feedback(&self, limit: usize) -> EngineResult<Vec<Feedback>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, poem_id, note, created_at FROM feedback
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let notes = stmt.query_map(params![limit as i64], feedback_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{NewPoem, TriggerKind};

    fn poem(store: &AgentStore) -> i64 {
        store
            .insert_poem(&NewPoem {
                title: "t".into(),
                body: "b".into(),
                thinking: vec![],
                particles: vec![],
                triggered_by: TriggerKind::Manual,
                weather_context: None,
                season: None,
                time_of_day: None,
            })
            .unwrap()
    }

    #[test]
    fn notes_attach_to_their_poem() {
        let store = AgentStore::open_in_memory().unwrap();
        let a = poem(&store);
        let b = poem(&store);
        store.insert_feedback(a, "too long").unwrap();
        store.insert_feedback(a, "lovely ending").unwrap();
        store.insert_feedback(b, "more rain").unwrap();

        let for_a = store.feedback_for_poem(a).unwrap();
        assert_eq!(for_a.len(), 2);
        assert_eq!(for_a[0].note, "too long");

        let recent = store.recent_feedback(2).unwrap();
        assert_eq!(recent[0].note, "more rain");
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn feedback_requires_existing_poem() {
        let store = AgentStore::open_in_memory().unwrap();
        assert!(store.insert_feedback(99, "orphan").is_err());
    }
}
