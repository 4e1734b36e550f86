//! Session store database schema.

/// SQL to create the session tables. Safe to run on every start.
pub const CREATE_SESSION_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS session_seed (
    id       INTEGER PRIMARY KEY CHECK (id = 1),
    scenario TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS history_entries (
    entry_index INTEGER PRIMARY KEY,
    role        TEXT NOT NULL,
    text        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS participants (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    identity     TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    joined_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS proposals (
    seq                  INTEGER PRIMARY KEY AUTOINCREMENT,
    round_number         INTEGER NOT NULL,
    participant_identity TEXT NOT NULL,
    text                 TEXT NOT NULL,
    UNIQUE (round_number, participant_identity)
);

CREATE INDEX IF NOT EXISTS idx_proposals_round_number
    ON proposals (round_number, seq);
";
