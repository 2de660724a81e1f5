// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::info;

use crate::coupons;
use crate::error::{is_unique_violation, BookingError};
use crate::models::{Gender, Ticket, TicketStatus, TxKind};
use crate::seats;
use crate::trips;
use crate::wallet::{self, TxMeta};

/// A ticket joined with its route, carrier, and owner, for display,
/// notification, and export.
#[derive(Debug, Clone, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub origin: String,
    pub destination: String,
    pub departure_at: DateTime<Utc>,
    pub company: String,
    pub user_email: String,
}

fn new_pnr() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Buy one seat on a trip as a single atomic unit: availability and
/// adjacency checks, coupon pricing, ticket issuance, wallet debit, and
/// coupon redemption all commit together or not at all. A failure leaves
/// no observable change.
pub fn purchase(
    conn: &mut Connection,
    user_id: i64,
    trip_id: i64,
    seat_number: i64,
    coupon_code: Option<&str>,
) -> Result<Ticket, BookingError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let ticket = purchase_in_tx(&tx, user_id, trip_id, seat_number, coupon_code)?;
    tx.commit()?;
    info!(
        "Ticket {} issued: user {} trip {} seat {} paid {}",
        ticket.pnr, user_id, trip_id, seat_number, ticket.price_paid_cents
    );
    Ok(ticket)
}

fn purchase_in_tx(
    tx: &Connection,
    user_id: i64,
    trip_id: i64,
    seat_number: i64,
    coupon_code: Option<&str>,
) -> Result<Ticket, BookingError> {
    let trip = trips::get(tx, trip_id)?.ok_or(BookingError::TripNotFound(trip_id))?;
    if seat_number < 1 || seat_number > trip.seat_count {
        return Err(BookingError::InvalidSeat {
            seat: seat_number,
            seat_count: trip.seat_count,
        });
    }
    let held: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM tickets WHERE trip_id=?1 AND seat_number=?2 AND status='active'",
            params![trip_id, seat_number],
            |r| r.get(0),
        )
        .optional()?;
    if held.is_some() {
        return Err(BookingError::SeatTaken(seat_number));
    }

    let gender: Option<Gender> = tx
        .query_row(
            "SELECT gender FROM users WHERE id=?1",
            params![user_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or(BookingError::UserNotFound(user_id))?;
    if let Some(g) = gender {
        if let Some(other) = seats::adjacency_conflict(tx, trip_id, seat_number, g)? {
            return Err(BookingError::GenderConflict(other));
        }
    }

    let pricing = coupons::price_with_coupon(tx, user_id, trip.price_cents, coupon_code)?;

    let purchased_at = Utc::now();
    let pnr = new_pnr();
    let inserted = tx.execute(
        "INSERT INTO tickets(user_id, trip_id, seat_number, price_paid_cents, coupon_id,
                             status, passenger_gender, pnr, purchased_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'active', ?6, ?7, ?8)",
        params![
            user_id,
            trip_id,
            seat_number,
            pricing.final_price_cents,
            pricing.coupon_id,
            gender,
            pnr,
            purchased_at
        ],
    );
    if let Err(e) = inserted {
        // the active-seat unique index is the real guarantee; a concurrent
        // winner surfaces here
        if is_unique_violation(&e) {
            return Err(BookingError::SeatTaken(seat_number));
        }
        return Err(e.into());
    }
    let ticket_id = tx.last_insert_rowid();

    let meta = TxMeta {
        ticket_id: Some(ticket_id),
        trip_id: Some(trip_id),
        coupon_id: pricing.coupon_id,
        note: None,
    };
    wallet::debit(tx, user_id, pricing.final_price_cents, &meta)?;

    if let Some(coupon_id) = pricing.coupon_id {
        coupons::redeem(tx, coupon_id, user_id)?;
    }

    Ok(Ticket {
        id: ticket_id,
        user_id,
        trip_id,
        seat_number,
        price_paid_cents: pricing.final_price_cents,
        coupon_id: pricing.coupon_id,
        status: TicketStatus::Active,
        passenger_gender: gender,
        pnr,
        purchased_at,
        cancelled_at: None,
    })
}

/// Cancel an active ticket owned by `user_id`, refunding the full paid
/// price to the wallet. Allowed until one hour before departure. Coupon
/// consumption is not reversed.
pub fn cancel(
    conn: &mut Connection,
    ticket_id: i64,
    user_id: i64,
) -> Result<Ticket, BookingError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let ticket = cancel_in_tx(&tx, ticket_id, user_id)?;
    tx.commit()?;
    info!(
        "Ticket {} cancelled: user {} refunded {}",
        ticket.pnr, user_id, ticket.price_paid_cents
    );
    Ok(ticket)
}

fn cancel_in_tx(tx: &Connection, ticket_id: i64, user_id: i64) -> Result<Ticket, BookingError> {
    // scoped to owner and active status; absent, foreign, and already
    // cancelled tickets are indistinguishable to the caller
    let found: Option<(Ticket, DateTime<Utc>)> = tx
        .query_row(
            "SELECT t.id, t.user_id, t.trip_id, t.seat_number, t.price_paid_cents, t.coupon_id,
                    t.passenger_gender, t.pnr, t.purchased_at, r.departure_at
             FROM tickets t JOIN trips r ON t.trip_id=r.id
             WHERE t.id=?1 AND t.user_id=?2 AND t.status='active'",
            params![ticket_id, user_id],
            |r| {
                Ok((
                    Ticket {
                        id: r.get(0)?,
                        user_id: r.get(1)?,
                        trip_id: r.get(2)?,
                        seat_number: r.get(3)?,
                        price_paid_cents: r.get(4)?,
                        coupon_id: r.get(5)?,
                        status: TicketStatus::Active,
                        passenger_gender: r.get(6)?,
                        pnr: r.get(7)?,
                        purchased_at: r.get(8)?,
                        cancelled_at: None,
                    },
                    r.get(9)?,
                ))
            },
        )
        .optional()?;
    let (mut ticket, departure_at) = found.ok_or(BookingError::TicketNotFound)?;

    let now = Utc::now();
    if departure_at - now < Duration::hours(1) {
        return Err(BookingError::CancellationWindowClosed);
    }

    tx.execute(
        "UPDATE tickets SET status='cancelled', cancelled_at=?2 WHERE id=?1",
        params![ticket_id, now],
    )?;
    let meta = TxMeta {
        ticket_id: Some(ticket_id),
        trip_id: Some(ticket.trip_id),
        coupon_id: None,
        note: None,
    };
    wallet::credit(tx, user_id, ticket.price_paid_cents, TxKind::Refund, &meta)?;

    ticket.status = TicketStatus::Cancelled;
    ticket.cancelled_at = Some(now);
    Ok(ticket)
}

const DETAIL_COLS: &str = "t.id, t.user_id, t.trip_id, t.seat_number, t.price_paid_cents,
        t.coupon_id, t.status, t.passenger_gender, t.pnr, t.purchased_at, t.cancelled_at,
        r.origin, r.destination, r.departure_at, c.name, u.email
 FROM tickets t
 JOIN trips r ON t.trip_id=r.id
 JOIN companies c ON r.company_id=c.id
 JOIN users u ON t.user_id=u.id";

fn map_detail(r: &rusqlite::Row) -> rusqlite::Result<TicketDetail> {
    Ok(TicketDetail {
        ticket: Ticket {
            id: r.get(0)?,
            user_id: r.get(1)?,
            trip_id: r.get(2)?,
            seat_number: r.get(3)?,
            price_paid_cents: r.get(4)?,
            coupon_id: r.get(5)?,
            status: r.get(6)?,
            passenger_gender: r.get(7)?,
            pnr: r.get(8)?,
            purchased_at: r.get(9)?,
            cancelled_at: r.get(10)?,
        },
        origin: r.get(11)?,
        destination: r.get(12)?,
        departure_at: r.get(13)?,
        company: r.get(14)?,
        user_email: r.get(15)?,
    })
}

pub fn get_detail(conn: &Connection, ticket_id: i64) -> Result<Option<TicketDetail>, BookingError> {
    let sql = format!("SELECT {} WHERE t.id=?1", DETAIL_COLS);
    let mut stmt = conn.prepare(&sql)?;
    Ok(stmt.query_row(params![ticket_id], map_detail).optional()?)
}

/// PNR lookup, scoped to the owning user.
pub fn find_by_pnr(
    conn: &Connection,
    pnr: &str,
    user_id: i64,
) -> Result<Option<TicketDetail>, BookingError> {
    let sql = format!("SELECT {} WHERE t.pnr=?1 AND t.user_id=?2", DETAIL_COLS);
    let mut stmt = conn.prepare(&sql)?;
    Ok(stmt
        .query_row(params![pnr.trim().to_lowercase(), user_id], map_detail)
        .optional()?)
}

pub fn list_by_user(conn: &Connection, user_id: i64) -> Result<Vec<TicketDetail>, BookingError> {
    let sql = format!("SELECT {} WHERE t.user_id=?1 ORDER BY t.id DESC", DETAIL_COLS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], map_detail)?;
    let mut out = Vec::new();
    for d in rows {
        out.push(d?);
    }
    Ok(out)
}
