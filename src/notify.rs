// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{params, Connection};

use crate::booking::TicketDetail;
use crate::error::BookingError;
use crate::utils::{fmt_money, fmt_ts};

// Delivery is simulated: notifications land in the notifications table and
// nothing leaves the process. Callers fire these after the booking unit has
// committed and treat a failure as log-only.

pub fn ticket_purchased(conn: &Connection, detail: &TicketDetail) -> Result<i64, BookingError> {
    let subject = format!("Ticket confirmed: {} -> {}", detail.origin, detail.destination);
    let body = format!(
        "Your ticket is confirmed. {} -> {} on {} with {}, seat {}, PNR {}. Amount charged: {}.",
        detail.origin,
        detail.destination,
        fmt_ts(&detail.departure_at),
        detail.company,
        detail.ticket.seat_number,
        detail.ticket.pnr,
        fmt_money(detail.ticket.price_paid_cents)
    );
    record(conn, "email", &detail.user_email, &subject, &body)
}

pub fn ticket_cancelled(conn: &Connection, detail: &TicketDetail) -> Result<i64, BookingError> {
    let subject = format!("Ticket cancelled: {} -> {}", detail.origin, detail.destination);
    let body = format!(
        "Your ticket {} ({} -> {} on {}) was cancelled. {} was refunded to your wallet.",
        detail.ticket.pnr,
        detail.origin,
        detail.destination,
        fmt_ts(&detail.departure_at),
        fmt_money(detail.ticket.price_paid_cents)
    );
    record(conn, "email", &detail.user_email, &subject, &body)
}

fn record(
    conn: &Connection,
    kind: &str,
    recipient: &str,
    subject: &str,
    body: &str,
) -> Result<i64, BookingError> {
    conn.execute(
        "INSERT INTO notifications(kind, recipient, subject, body, status)
         VALUES (?1, ?2, ?3, ?4, 'sent')",
        params![kind, recipient, subject, body],
    )?;
    Ok(conn.last_insert_rowid())
}
