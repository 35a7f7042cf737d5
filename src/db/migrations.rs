use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            email           TEXT NOT NULL UNIQUE,
            sap_id          TEXT UNIQUE,
            practice_handle TEXT UNIQUE,
            password_hash   TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS completions (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            day           INTEGER NOT NULL CHECK(day >= 1),
            completed_at  TEXT NOT NULL,
            UNIQUE(user_id, day)
        );

        CREATE INDEX IF NOT EXISTS idx_completions_user ON completions(user_id);
    ")
}
