// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rusqlite::{params, Connection};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::Gender;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Departure timestamps are entered in UTC, either as RFC 3339 or as a plain
/// 'YYYY-MM-DD HH:MM' wall clock.
pub fn parse_departure(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    anyhow::bail!(
        "Invalid departure time '{}', expected 'YYYY-MM-DD HH:MM' (UTC) or RFC 3339",
        s
    )
}

/// Parse a lira amount like '850' or '850.50' into cents.
pub fn parse_amount_cents(s: &str) -> Result<i64> {
    let d = s
        .parse::<Decimal>()
        .with_context(|| format!("Invalid amount '{}'", s))?;
    (d * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .with_context(|| format!("Amount '{}' out of range", s))
}

pub fn parse_gender(s: &str) -> Result<Gender> {
    Gender::parse(s).with_context(|| format!("Invalid gender '{}', expected male|female", s))
}

pub fn fmt_money(cents: i64) -> String {
    format!("{} TL", Decimal::new(cents, 2))
}

pub fn fmt_ts(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn id_for_company(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM companies WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Company '{}' not found", name))?;
    Ok(id)
}

pub fn id_for_user(conn: &Connection, email: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM users WHERE email=?1")?;
    let id: i64 = stmt
        .query_row(params![email], |r| r.get(0))
        .with_context(|| format!("User '{}' not found", email))?;
    Ok(id)
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}
