//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `users`, `listings`, `reviews`, `chats`,
//! and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,              -- Argon2id PHC string
    role          TEXT NOT NULL,              -- 'user' | 'owner' | 'admin'
    phone         TEXT NOT NULL,
    profile_image TEXT,
    is_verified   INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    is_blocked    INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL               -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Listings
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS listings (
    id             TEXT PRIMARY KEY NOT NULL, -- UUID v4
    owner_id       TEXT NOT NULL,             -- FK -> users(id)
    title          TEXT NOT NULL,
    description    TEXT NOT NULL,
    street         TEXT NOT NULL,
    city           TEXT NOT NULL,
    state          TEXT NOT NULL DEFAULT '',
    zip_code       TEXT,
    latitude       REAL NOT NULL,
    longitude      REAL NOT NULL,
    monthly        INTEGER NOT NULL,          -- monthly rent
    deposit        INTEGER NOT NULL,
    gender         TEXT NOT NULL,             -- 'male' | 'female'
    facilities     TEXT NOT NULL DEFAULT '[]',-- JSON array of tag strings
    room_types     TEXT NOT NULL DEFAULT '[]',-- JSON array of objects
    images         TEXT NOT NULL DEFAULT '[]',-- JSON array of objects
    rules          TEXT NOT NULL DEFAULT '[]',-- JSON array of strings
    is_available   INTEGER NOT NULL DEFAULT 1,
    is_verified    INTEGER NOT NULL DEFAULT 0,
    average_rating REAL NOT NULL DEFAULT 0,   -- denormalized review mean
    review_count   INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL,

    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_listings_city_gender ON listings(city, gender);
CREATE INDEX IF NOT EXISTS idx_listings_owner_id ON listings(owner_id);
CREATE INDEX IF NOT EXISTS idx_listings_created ON listings(created_at DESC, id DESC);

-- ----------------------------------------------------------------
-- Reviews
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS reviews (
    id              TEXT PRIMARY KEY NOT NULL, -- UUID v4
    listing_id      TEXT NOT NULL,             -- FK -> listings(id)
    user_id         TEXT NOT NULL,             -- FK -> users(id)
    rating          INTEGER NOT NULL,          -- 1..=5
    title           TEXT NOT NULL,
    comment         TEXT NOT NULL,
    facilities      INTEGER,                   -- optional sub-ratings, 1..=5
    location        INTEGER,
    value           INTEGER,
    created_at      TEXT NOT NULL,

    FOREIGN KEY (listing_id) REFERENCES listings(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- One review per (user, listing) pair.
CREATE UNIQUE INDEX IF NOT EXISTS idx_reviews_listing_user
    ON reviews(listing_id, user_id);
CREATE INDEX IF NOT EXISTS idx_reviews_listing_created
    ON reviews(listing_id, created_at DESC);

-- ----------------------------------------------------------------
-- Chats
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chats (
    id           TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    listing_id   TEXT NOT NULL,              -- FK -> listings(id)
    owner_id     TEXT NOT NULL,              -- participant tagged 'owner'
    tenant_id    TEXT NOT NULL,              -- participant tagged 'tenant'
    last_message TEXT,                       -- JSON copy of the latest message
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,

    FOREIGN KEY (listing_id) REFERENCES listings(id) ON DELETE CASCADE,
    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (tenant_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chats_listing_id ON chats(listing_id);
CREATE INDEX IF NOT EXISTS idx_chats_owner_id ON chats(owner_id);
CREATE INDEX IF NOT EXISTS idx_chats_tenant_id ON chats(tenant_id);

-- ----------------------------------------------------------------
-- Messages (append-only, keyed by chat)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id           TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    chat_id      TEXT NOT NULL,              -- FK -> chats(id)
    sender_id    TEXT NOT NULL,              -- FK -> users(id)
    content      TEXT NOT NULL,
    message_type TEXT NOT NULL DEFAULT 'text', -- 'text' | 'image' | 'file'
    file_url     TEXT,
    is_read      INTEGER NOT NULL DEFAULT 0,
    read_at      TEXT,
    created_at   TEXT NOT NULL,

    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE,
    FOREIGN KEY (sender_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_chat_created
    ON messages(chat_id, created_at);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
