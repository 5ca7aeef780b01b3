use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id              TEXT PRIMARY KEY,
            display_name    TEXT NOT NULL,
            gender          TEXT NOT NULL,
            kind            TEXT NOT NULL DEFAULT 'standard',
            city            TEXT NOT NULL,
            country         TEXT NOT NULL,
            verified        INTEGER NOT NULL DEFAULT 0,
            age             INTEGER,
            occupation      TEXT,
            photo_url       TEXT,
            extended        TEXT,
            privacy         TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS marriage_requests (
            id              TEXT PRIMARY KEY,
            sender_id       TEXT NOT NULL REFERENCES profiles(id),
            receiver_id     TEXT NOT NULL REFERENCES profiles(id),
            message         TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'pending',
            sent_at         TEXT NOT NULL,
            responded_at    TEXT,
            note            TEXT
        );

        -- At most one pending request per ordered (sender, receiver) pair.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_requests_pending
            ON marriage_requests(sender_id, receiver_id)
            WHERE status = 'pending';

        CREATE INDEX IF NOT EXISTS idx_requests_receiver
            ON marriage_requests(receiver_id, status);

        CREATE TABLE IF NOT EXISTS chat_rooms (
            id              TEXT PRIMARY KEY,
            request_id      TEXT NOT NULL UNIQUE REFERENCES marriage_requests(id),
            participant_a   TEXT NOT NULL REFERENCES profiles(id),
            participant_b   TEXT NOT NULL REFERENCES profiles(id),
            status          TEXT NOT NULL DEFAULT 'active',
            created_at      TEXT NOT NULL,
            expires_at      TEXT NOT NULL,
            reported_by     TEXT,
            report_reason   TEXT
        );

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            chat_room_id    TEXT NOT NULL REFERENCES chat_rooms(id),
            sender_id       TEXT NOT NULL REFERENCES profiles(id),
            content         TEXT NOT NULL,
            status          TEXT NOT NULL,
            flagged_terms   TEXT NOT NULL DEFAULT '[]',
            severity        TEXT NOT NULL DEFAULT 'none',
            created_at      TEXT NOT NULL,
            reviewed_by     TEXT,
            reviewed_at     TEXT,
            review_note     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_messages_pending
            ON messages(status, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_room
            ON messages(chat_room_id, created_at);

        -- Rate-limit window scans: per sender per room, newest first.
        CREATE INDEX IF NOT EXISTS idx_messages_sender_window
            ON messages(chat_room_id, sender_id, created_at);

        CREATE TABLE IF NOT EXISTS banned_terms (
            term        TEXT PRIMARY KEY,
            severity    TEXT NOT NULL DEFAULT 'low'
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
