// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::BookingError;
use crate::models::Gender;

/// Partner seat in the 2+2 cabin layout: an odd seat pairs with the seat to
/// its right, an even seat with the seat to its left. A partner falling
/// outside 1..=seat_count means the seat has none.
pub fn adjacent_seat(seat: i64, seat_count: i64) -> Option<i64> {
    let partner = if seat % 2 == 1 { seat + 1 } else { seat - 1 };
    if partner >= 1 && partner <= seat_count {
        Some(partner)
    } else {
        None
    }
}

fn seat_count(conn: &Connection, trip_id: i64) -> Result<i64, BookingError> {
    conn.query_row(
        "SELECT seat_count FROM trips WHERE id=?1",
        params![trip_id],
        |r| r.get(0),
    )
    .optional()?
    .ok_or(BookingError::TripNotFound(trip_id))
}

pub fn occupied_seats(conn: &Connection, trip_id: i64) -> Result<Vec<i64>, BookingError> {
    let mut stmt = conn.prepare(
        "SELECT seat_number FROM tickets WHERE trip_id=?1 AND status='active' ORDER BY seat_number",
    )?;
    let rows = stmt.query_map(params![trip_id], |r| r.get(0))?;
    let mut seats = Vec::new();
    for s in rows {
        seats.push(s?);
    }
    Ok(seats)
}

pub fn available_seats(conn: &Connection, trip_id: i64) -> Result<Vec<i64>, BookingError> {
    let count = seat_count(conn, trip_id)?;
    let taken = occupied_seats(conn, trip_id)?;
    Ok((1..=count).filter(|s| !taken.contains(s)).collect())
}

pub fn is_seat_free(conn: &Connection, trip_id: i64, seat: i64) -> Result<bool, BookingError> {
    let count = seat_count(conn, trip_id)?;
    if seat < 1 || seat > count {
        return Err(BookingError::InvalidSeat {
            seat,
            seat_count: count,
        });
    }
    let held: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM tickets WHERE trip_id=?1 AND seat_number=?2 AND status='active'",
            params![trip_id, seat],
            |r| r.get(0),
        )
        .optional()?;
    Ok(held.is_none())
}

/// Gender of the active ticket on the partner seat, when it differs from
/// `candidate`. The comparison runs against the gender snapshotted on the
/// ticket at purchase time; neighbors with no recorded gender never conflict.
pub fn adjacency_conflict(
    conn: &Connection,
    trip_id: i64,
    seat: i64,
    candidate: Gender,
) -> Result<Option<Gender>, BookingError> {
    let count = seat_count(conn, trip_id)?;
    let partner = match adjacent_seat(seat, count) {
        Some(p) => p,
        None => return Ok(None),
    };
    let neighbor: Option<Option<Gender>> = conn
        .query_row(
            "SELECT passenger_gender FROM tickets
             WHERE trip_id=?1 AND seat_number=?2 AND status='active'",
            params![trip_id, partner],
            |r| r.get(0),
        )
        .optional()?;
    Ok(neighbor.flatten().filter(|g| *g != candidate))
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SeatState {
    pub seat: i64,
    pub taken: bool,
    pub gender: Option<Gender>,
}

pub fn seat_states(conn: &Connection, trip_id: i64) -> Result<Vec<SeatState>, BookingError> {
    let count = seat_count(conn, trip_id)?;
    let mut stmt = conn.prepare(
        "SELECT seat_number, passenger_gender FROM tickets WHERE trip_id=?1 AND status='active'",
    )?;
    let rows = stmt.query_map(params![trip_id], |r| {
        Ok((r.get::<_, i64>(0)?, r.get::<_, Option<Gender>>(1)?))
    })?;
    let mut held: HashMap<i64, Option<Gender>> = HashMap::new();
    for row in rows {
        let (seat, gender) = row?;
        held.insert(seat, gender);
    }
    Ok((1..=count)
        .map(|seat| SeatState {
            seat,
            taken: held.contains_key(&seat),
            gender: held.get(&seat).copied().flatten(),
        })
        .collect())
}
