// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Peron", "peron"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("peron.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    open_at(&path)
}

/// Open (creating if needed) the database at an explicit path. Used by the
/// global `--db` flag and by tests that want a file-backed store.
pub fn open_at(path: &Path) -> Result<Connection> {
    let conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    // Writers queue behind each other instead of failing fast.
    conn.busy_timeout(Duration::from_secs(5))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS companies(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS users(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        gender TEXT CHECK(gender IN ('male','female')),
        credit_cents INTEGER NOT NULL DEFAULT 0 CHECK(credit_cents >= 0),
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS trips(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        company_id INTEGER NOT NULL,
        origin TEXT NOT NULL,
        destination TEXT NOT NULL,
        departure_at TEXT NOT NULL,
        price_cents INTEGER NOT NULL CHECK(price_cents > 0),
        seat_count INTEGER NOT NULL CHECK(seat_count > 0),
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(company_id) REFERENCES companies(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_trips_departure ON trips(departure_at);

    CREATE TABLE IF NOT EXISTS coupons(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        percent INTEGER NOT NULL CHECK(percent BETWEEN 1 AND 100),
        usage_limit INTEGER NOT NULL CHECK(usage_limit > 0),
        used_count INTEGER NOT NULL DEFAULT 0 CHECK(used_count <= usage_limit),
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS tickets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        trip_id INTEGER NOT NULL,
        seat_number INTEGER NOT NULL,
        price_paid_cents INTEGER NOT NULL CHECK(price_paid_cents >= 0),
        coupon_id INTEGER,
        status TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active','cancelled')),
        passenger_gender TEXT CHECK(passenger_gender IN ('male','female')),
        pnr TEXT NOT NULL UNIQUE,
        purchased_at TEXT NOT NULL,
        cancelled_at TEXT,
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY(trip_id) REFERENCES trips(id) ON DELETE CASCADE,
        FOREIGN KEY(coupon_id) REFERENCES coupons(id) ON DELETE SET NULL
    );
    -- one active ticket per seat; cancelled rows stay behind as history
    CREATE UNIQUE INDEX IF NOT EXISTS idx_tickets_active_seat
        ON tickets(trip_id, seat_number) WHERE status = 'active';
    CREATE INDEX IF NOT EXISTS idx_tickets_user ON tickets(user_id);

    CREATE TABLE IF NOT EXISTS coupon_redemptions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        coupon_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        redeemed_at TEXT NOT NULL,
        UNIQUE(coupon_id, user_id),
        FOREIGN KEY(coupon_id) REFERENCES coupons(id) ON DELETE CASCADE,
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS wallet_transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('topup','charge','refund')),
        amount_cents INTEGER NOT NULL,
        meta TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_wallet_tx_user ON wallet_transactions(user_id);

    CREATE TABLE IF NOT EXISTS payment_cards(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        holder TEXT NOT NULL,
        masked_pan TEXT NOT NULL,
        brand TEXT NOT NULL,
        exp_month INTEGER NOT NULL,
        exp_year INTEGER NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS notifications(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL CHECK(kind IN ('email','sms')),
        recipient TEXT NOT NULL,
        subject TEXT NOT NULL,
        body TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'sent',
        sent_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    )?;
    Ok(())
}
