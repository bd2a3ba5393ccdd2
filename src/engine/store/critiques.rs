use super::{now_timestamp, AgentStore};
use crate::atoms::error::EngineResult;
use crate::atoms::types::{Critique, CritiqueSections};
use rusqlite::params;

const CRITIQUE_COLUMNS: &str =
    "id, poem_id, strengths, weaknesses, suggestions, overall_assessment, created_at";

fn critique_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Critique> {
    Ok(Critique {
        id: row.get(0)?,
        poem_id: row.get(1)?,
        strengths: row.get(2)?,
        weaknesses: row.get(3)?,
        suggestions: row.get(4)?,
        overall_assessment: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl AgentStore {
    pub fn insert_critique(&self, poem_id: i64, sections: &CritiqueSections) -> EngineResult<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO critiques (poem_id, strengths, weaknesses, suggestions, overall_assessment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                poem_id,
                sections.strengths,
                sections.weaknesses,
                sections.suggestions,
                sections.overall_assessment,
                now_timestamp(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn critiques_for_poem(&self, poem_id: i64) -> EngineResult<Vec<Critique>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM critiques WHERE poem_id = ?1 ORDER BY created_at DESC, id DESC",
            CRITIQUE_COLUMNS
        ))?;
        let critiques = stmt.query_map(params![poem_id], critique_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(critiques)
    }

    pub fn recent_critiques(&self, limit: usize) -> EngineResult<Vec<Critique>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM critiques ORDER BY created_at DESC, id DESC LIMIT ?1",
            CRITIQUE_COLUMNS
        ))?;
        let critiques = stmt.query_map(params![limit as i64], critique_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(critiques)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{NewPoem, TriggerKind};

    #[test]
    fn critique_round_trip() {
        let store = AgentStore::open_in_memory().unwrap();
        let poem_id = store
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
            .unwrap();
        let sections = CritiqueSections {
            strengths: "clear images".into(),
            weaknesses: "flat ending".into(),
            suggestions: "- cut the last line".into(),
            overall_assessment: "promising".into(),
        };
        store.insert_critique(poem_id, &sections).unwrap();

        let for_poem = store.critiques_for_poem(poem_id).unwrap();
        assert_eq!(for_poem.len(), 1);
        assert_eq!(for_poem[0].weaknesses, "flat ending");
        assert_eq!(store.recent_critiques(5).unwrap().len(), 1);
        assert!(store.critiques_for_poem(poem_id + 1).unwrap().is_empty());
    }
}
