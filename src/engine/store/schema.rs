// Database schema and migrations for the agent store.
// Called once by AgentStore::open() after WAL is enabled.
// Adding a new table or column: append an idempotent CREATE TABLE IF NOT EXISTS
// or ALTER TABLE … ADD COLUMN (errors are silently swallowed) at the end of
// run_migrations() — never modify existing SQL to keep upgrade paths clean.

use crate::atoms::error::EngineResult;
use rusqlite::Connection;

pub(crate) fn run_migrations(conn: &Connection) -> EngineResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS poems (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL DEFAULT '',
            chain_of_thought TEXT NOT NULL DEFAULT '[]',
            particle_snapshot TEXT NOT NULL DEFAULT '[]',
            triggered_by TEXT NOT NULL DEFAULT 'manual',
            weather_context TEXT,
            season TEXT,
            time_of_day TEXT,
            rating TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_poems_created ON poems(created_at DESC);

        CREATE TABLE IF NOT EXISTS feedback (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            poem_id INTEGER NOT NULL REFERENCES poems(id) ON DELETE CASCADE,
            note TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_feedback_poem ON feedback(poem_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS references_ (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL,
            source_type TEXT NOT NULL DEFAULT 'other',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS particles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL,
            category TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            strength REAL NOT NULL DEFAULT 1.0,
            source TEXT NOT NULL DEFAULT '',
            connections TEXT NOT NULL DEFAULT '[]',
            used_in_poem_id INTEGER REFERENCES poems(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_particles_active
            ON particles(used_in_poem_id, strength DESC);

        CREATE TABLE IF NOT EXISTS interests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            topic TEXT NOT NULL,
            origin TEXT NOT NULL DEFAULT '',
            research_notes TEXT,
            strength REAL NOT NULL DEFAULT 1.0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS critiques (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            poem_id INTEGER NOT NULL REFERENCES poems(id) ON DELETE CASCADE,
            strengths TEXT NOT NULL DEFAULT '',
            weaknesses TEXT NOT NULL DEFAULT '',
            suggestions TEXT NOT NULL DEFAULT '',
            overall_assessment TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_critiques_poem ON critiques(poem_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS voice_principles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            principles TEXT NOT NULL,
            poem_count INTEGER NOT NULL DEFAULT 0,
            source_poem_ids TEXT NOT NULL DEFAULT '[]',
            supersedes_id INTEGER REFERENCES voice_principles(id),
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS agent_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_type TEXT NOT NULL,
            detail TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_agent_log_type
            ON agent_log(event_type, created_at DESC, id DESC);
        ",
    )?;

    Ok(())
}
