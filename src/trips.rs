// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;

use crate::error::BookingError;
use crate::models::Trip;

fn map_trip(r: &rusqlite::Row) -> rusqlite::Result<Trip> {
    Ok(Trip {
        id: r.get(0)?,
        company_id: r.get(1)?,
        origin: r.get(2)?,
        destination: r.get(3)?,
        departure_at: r.get(4)?,
        price_cents: r.get(5)?,
        seat_count: r.get(6)?,
    })
}

const TRIP_COLS: &str = "id, company_id, origin, destination, departure_at, price_cents, seat_count";

pub fn get(conn: &Connection, trip_id: i64) -> Result<Option<Trip>, BookingError> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM trips WHERE id=?1", TRIP_COLS))?;
    Ok(stmt.query_row(params![trip_id], map_trip).optional()?)
}

pub fn list_by_company(conn: &Connection, company_id: i64) -> Result<Vec<Trip>, BookingError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM trips WHERE company_id=?1 ORDER BY departure_at",
        TRIP_COLS
    ))?;
    let rows = stmt.query_map(params![company_id], map_trip)?;
    let mut out = Vec::new();
    for t in rows {
        out.push(t?);
    }
    Ok(out)
}

fn validate(
    origin: &str,
    destination: &str,
    departure_at: DateTime<Utc>,
    price_cents: i64,
    seat_count: i64,
) -> Result<(), BookingError> {
    if origin.is_empty() || destination.is_empty() {
        return Err(BookingError::InvalidInput(
            "Origin and destination must not be empty".into(),
        ));
    }
    if price_cents <= 0 {
        return Err(BookingError::InvalidInput("Price must be positive".into()));
    }
    if seat_count <= 0 {
        return Err(BookingError::InvalidInput(
            "Seat count must be positive".into(),
        ));
    }
    if departure_at <= Utc::now() {
        return Err(BookingError::InvalidInput(
            "Departure must be in the future".into(),
        ));
    }
    Ok(())
}

pub fn create(
    conn: &Connection,
    company_id: i64,
    origin: &str,
    destination: &str,
    departure_at: DateTime<Utc>,
    price_cents: i64,
    seat_count: i64,
) -> Result<i64, BookingError> {
    let origin = origin.trim();
    let destination = destination.trim();
    validate(origin, destination, departure_at, price_cents, seat_count)?;
    let company: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM companies WHERE id=?1",
            params![company_id],
            |r| r.get(0),
        )
        .optional()?;
    if company.is_none() {
        return Err(BookingError::InvalidInput(format!(
            "Company {} not found",
            company_id
        )));
    }
    conn.execute(
        "INSERT INTO trips(company_id, origin, destination, departure_at, price_cents, seat_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![company_id, origin, destination, departure_at, price_cents, seat_count],
    )?;
    Ok(conn.last_insert_rowid())
}

fn active_ticket_count(conn: &Connection, trip_id: i64) -> Result<i64, BookingError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM tickets WHERE trip_id=?1 AND status='active'",
        params![trip_id],
        |r| r.get(0),
    )?)
}

/// Trips are immutable once seats are sold.
pub fn update(
    conn: &mut Connection,
    trip_id: i64,
    origin: &str,
    destination: &str,
    departure_at: DateTime<Utc>,
    price_cents: i64,
    seat_count: i64,
) -> Result<(), BookingError> {
    let origin = origin.trim();
    let destination = destination.trim();
    validate(origin, destination, departure_at, price_cents, seat_count)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    get(&tx, trip_id)?.ok_or(BookingError::TripNotFound(trip_id))?;
    if active_ticket_count(&tx, trip_id)? > 0 {
        return Err(BookingError::TripInUse);
    }
    tx.execute(
        "UPDATE trips SET origin=?2, destination=?3, departure_at=?4, price_cents=?5, seat_count=?6
         WHERE id=?1",
        params![trip_id, origin, destination, departure_at, price_cents, seat_count],
    )?;
    tx.commit()?;
    Ok(())
}

/// Deleting a trip with only cancelled history cascades those ticket rows
/// away; the wallet ledger keeps the financial audit trail.
pub fn delete(conn: &mut Connection, trip_id: i64) -> Result<(), BookingError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    get(&tx, trip_id)?.ok_or(BookingError::TripNotFound(trip_id))?;
    if active_ticket_count(&tx, trip_id)? > 0 {
        return Err(BookingError::TripInUse);
    }
    tx.execute("DELETE FROM trips WHERE id=?1", params![trip_id])?;
    tx.commit()?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct TripSummary {
    pub id: i64,
    pub company: String,
    pub origin: String,
    pub destination: String,
    pub departure_at: DateTime<Utc>,
    pub price_cents: i64,
    pub seats_total: i64,
    pub seats_free: i64,
}

#[derive(Debug, Default)]
pub struct TripFilter {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Search upcoming departures. Substring filters on the route ends, an
/// optional day filter, capped at 100 rows.
pub fn search(conn: &Connection, filter: &TripFilter) -> Result<Vec<TripSummary>, BookingError> {
    let now = Utc::now();
    let mut sql = String::from(
        "SELECT t.id, c.name, t.origin, t.destination, t.departure_at, t.price_cents, t.seat_count,
                (SELECT COUNT(*) FROM tickets k WHERE k.trip_id=t.id AND k.status='active')
         FROM trips t JOIN companies c ON t.company_id=c.id
         WHERE t.departure_at > ?",
    );
    let mut params_vec: Vec<String> = vec![now.format("%Y-%m-%d %H:%M:%S").to_string()];
    if let Some(origin) = &filter.origin {
        sql.push_str(" AND t.origin LIKE ?");
        params_vec.push(format!("%{}%", origin.trim()));
    }
    if let Some(destination) = &filter.destination {
        sql.push_str(" AND t.destination LIKE ?");
        params_vec.push(format!("%{}%", destination.trim()));
    }
    if let Some(date) = filter.date {
        sql.push_str(" AND substr(t.departure_at, 1, 10) = ?");
        params_vec.push(date.to_string());
    }
    sql.push_str(" ORDER BY t.departure_at ASC LIMIT 100");

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let taken: i64 = r.get(7)?;
        let summary = TripSummary {
            id: r.get(0)?,
            company: r.get(1)?,
            origin: r.get(2)?,
            destination: r.get(3)?,
            departure_at: r.get(4)?,
            price_cents: r.get(5)?,
            seats_total: r.get(6)?,
            seats_free: r.get::<_, i64>(6)? - taken,
        };
        // stored timestamps carry an offset suffix; re-check the cutoff here
        if summary.departure_at > now {
            out.push(summary);
        }
    }
    Ok(out)
}
