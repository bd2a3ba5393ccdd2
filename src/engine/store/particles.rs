use super::{now_timestamp, AgentStore};
use crate::atoms::error::EngineResult;
use crate::atoms::types::{NewParticle, Particle, ParticleCategory, ParticleLink};
use rusqlite::{params, OptionalExtension};

const PARTICLE_COLUMNS: &str =
    "id, label, category, content, strength, source, connections, used_in_poem_id, created_at, updated_at";

/// Decode a stored connection snapshot. Older rows stored bare id arrays;
/// those read back as unit-weight links. Unparsable snapshots read as empty.
fn decode_links(raw: &str) -> Vec<ParticleLink> {
    if let Ok(links) = serde_json::from_str::<Vec<ParticleLink>>(raw) {
        return links;
    }
    serde_json::from_str::<Vec<i64>>(raw)
        .map(|ids| ids.into_iter().map(|id| ParticleLink { id, weight: 1.0 }).collect())
        .unwrap_or_default()
}

pub(crate) fn parse_category(idx: usize, raw: String) -> rusqlite::Result<ParticleCategory> {
    raw.parse::<ParticleCategory>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

impl Particle {
    /// Map a row selected with `PARTICLE_COLUMNS` → Particle.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let connections: String = row.get(6)?;
        Ok(Particle {
            id: row.get(0)?,
            label: row.get(1)?,
            category: parse_category(2, row.get(2)?)?,
            content: row.get(3)?,
            strength: row.get(4)?,
            source: row.get(5)?,
            connections: decode_links(&connections),
            consumed_by: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

/// What one decay pass did to the particle table.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct DecayOutcome {
    /// Active particles whose strength was multiplied by the decay factor.
    pub decayed: usize,
    /// Particles deleted for falling to or below the strength floor.
    pub pruned: usize,
    /// Weakest particles deleted to bring the population under the cap.
    pub capped: usize,
}

impl AgentStore {
    // ── Particle CRUD ──────────────────────────────────────────────────

    /// Insert a particle with its (already computed) connection snapshot.
    pub fn insert_particle(&self, p: &NewParticle, connections: &[ParticleLink]) -> EngineResult<i64> {
        let links = serde_json::to_string(connections)?;
        let now = now_timestamp();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO particles (label, category, content, strength, source, connections, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![p.label, p.category.as_str(), p.content, p.strength, p.source, links, now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All unconsumed particles with positive strength, strongest first.
    pub fn active_particles(&self) -> EngineResult<Vec<Particle>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM particles
             WHERE used_in_poem_id IS NULL AND strength > 0
             ORDER BY strength DESC, id DESC",
            PARTICLE_COLUMNS
        ))?;
        let particles = stmt.query_map([], Particle::from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(particles)
    }

    pub fn count_active_particles(&self) -> EngineResult<usize> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM particles WHERE used_in_poem_id IS NULL AND strength > 0",
            [],
            |r| r.get(0),
        )?;
        Ok(n as usize)
    }

    pub fn get_particle(&self, id: i64) -> EngineResult<Option<Particle>> {
        let conn = self.conn.lock();
        let particle = conn
            .query_row(
                &format!("SELECT {} FROM particles WHERE id = ?1", PARTICLE_COLUMNS),
                params![id],
                Particle::from_row,
            )
            .optional()?;
        Ok(particle)
    }

    /// Particles consumed by a given poem (its source material).
    pub fn particles_for_poem(&self, poem_id: i64) -> EngineResult<Vec<Particle>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM particles WHERE used_in_poem_id = ?1 ORDER BY strength DESC",
            PARTICLE_COLUMNS
        ))?;
        let particles = stmt.query_map(params![poem_id], Particle::from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(particles)
    }

    /// Mark a batch of particles as consumed by `poem_id`, in one transaction.
    /// Rows already consumed are left untouched, so a particle can never end
    /// up attributed to two poems. Returns the number of rows marked.
    pub fn mark_particles_consumed(&self, ids: &[i64], poem_id: i64) -> EngineResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = now_timestamp();
        let mut marked = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE particles SET used_in_poem_id = ?1, updated_at = ?2
                 WHERE id = ?3 AND used_in_poem_id IS NULL",
            )?;
            for id in ids {
                marked += stmt.execute(params![poem_id, now, id])?;
            }
        }
        tx.commit()?;
        Ok(marked)
    }

    /// One atomic decay pass: multiply every active strength by `factor`,
    /// delete everything at or below `floor`, then trim the weakest excess
    /// above `max_count`.
    pub fn decay_particles(&self, factor: f64, floor: f64, max_count: usize) -> EngineResult<DecayOutcome> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = now_timestamp();

        let decayed = tx.execute(
            "UPDATE particles SET strength = strength * ?1, updated_at = ?2
             WHERE used_in_poem_id IS NULL",
            params![factor, now],
        )?;
        let pruned = tx.execute(
            "DELETE FROM particles WHERE used_in_poem_id IS NULL AND strength <= ?1",
            params![floor],
        )?;
        let capped = tx.execute(
            "DELETE FROM particles WHERE id IN (
                SELECT id FROM particles WHERE used_in_poem_id IS NULL
                ORDER BY strength DESC, id DESC
                LIMIT -1 OFFSET ?1
             )",
            params![max_count as i64],
        )?;

        tx.commit()?;
        Ok(DecayOutcome { decayed, pruned, capped })
    }
}
