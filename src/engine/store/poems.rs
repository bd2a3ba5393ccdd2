use super::{now_timestamp, AgentStore};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{NewPoem, Poem, Rating, TriggerKind};
use rusqlite::{params, OptionalExtension};

const POEM_COLUMNS: &str = "id, title, body, chain_of_thought, particle_snapshot, triggered_by,
     weather_context, season, time_of_day, rating, created_at, updated_at";

impl Poem {
    /// Map a row selected with `POEM_COLUMNS` → Poem.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let thinking: String = row.get(3)?;
        let snapshot: String = row.get(4)?;
        let trigger: String = row.get(5)?;
        let rating: Option<String> = row.get(9)?;
        Ok(Poem {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            thinking: serde_json::from_str(&thinking).unwrap_or_default(),
            particles: serde_json::from_str(&snapshot).unwrap_or_default(),
            triggered_by: trigger.parse().unwrap_or(TriggerKind::Manual),
            weather_context: row.get(6)?,
            season: row.get(7)?,
            time_of_day: row.get(8)?,
            rating: rating.and_then(|r| Rating::parse_choice(&r).ok().flatten()),
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl AgentStore {
    // ── Poem CRUD ──────────────────────────────────────────────────────

    pub fn insert_poem(&self, poem: &NewPoem) -> EngineResult<i64> {
        let thinking = serde_json::to_string(&poem.thinking)?;
        let snapshot = serde_json::to_string(&poem.particles)?;
        let now = now_timestamp();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO poems (title, body, chain_of_thought, particle_snapshot, triggered_by,
                                weather_context, season, time_of_day, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                poem.title,
                poem.body,
                thinking,
                snapshot,
                poem.triggered_by.as_str(),
                poem.weather_context,
                poem.season,
                poem.time_of_day,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_poem(&self, id: i64) -> EngineResult<Option<Poem>> {
        let conn = self.conn.lock();
        let poem = conn
            .query_row(
                &format!("SELECT {} FROM poems WHERE id = ?1", POEM_COLUMNS),
                params![id],
                Poem::from_row,
            )
            .optional()?;
        Ok(poem)
    }

    /// Poems newest first, paged.
    pub fn list_poems(&self, limit: usize, offset: usize) -> EngineResult<Vec<Poem>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM poems ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            POEM_COLUMNS
        ))?;
        let poems = stmt.query_map(params![limit as i64, offset as i64], Poem::from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(poems)
    }

    /// Most recent poems that carry a rating (reader-preference input).
    pub fn recent_rated_poems(&self, limit: usize) -> EngineResult<Vec<Poem>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM poems WHERE rating IS NOT NULL
             ORDER BY updated_at DESC, id DESC LIMIT ?1",
            POEM_COLUMNS
        ))?;
        let poems = stmt.query_map(params![limit as i64], Poem::from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(poems)
    }

    /// Apply a rating with toggle semantics: requesting the rating the poem
    /// already holds clears it. Returns the rating now in effect.
    pub fn set_poem_rating(&self, id: i64, requested: Option<Rating>) -> EngineResult<Option<Rating>> {
        let conn = self.conn.lock();
        let current: Option<Option<String>> = conn
            .query_row("SELECT rating FROM poems WHERE id = ?1", params![id], |r| r.get(0))
            .optional()?;
        let current = match current {
            Some(r) => r.and_then(|s| Rating::parse_choice(&s).ok().flatten()),
            None => return Err(EngineError::not_found(format!("poem {}", id))),
        };

        let effective = if requested.is_some() && requested == current { None } else { requested };
        conn.execute(
            "UPDATE poems SET rating = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, effective.map(|r| r.as_str()), now_timestamp()],
        )?;
        Ok(effective)
    }

    pub fn count_poems(&self) -> EngineResult<i64> {
        let conn = self.conn.lock();
        let n = conn.query_row("SELECT COUNT(*) FROM poems", [], |r| r.get(0))?;
        Ok(n)
    }

    /// Poems created strictly after `since`; all poems when `since` is None.
    pub fn count_poems_since(&self, since: Option<&str>) -> EngineResult<i64> {
        let conn = self.conn.lock();
        let n = match since {
            Some(ts) => conn.query_row(
                "SELECT COUNT(*) FROM poems WHERE created_at > ?1",
                params![ts],
                |r| r.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM poems", [], |r| r.get(0))?,
        };
        Ok(n)
    }
}
