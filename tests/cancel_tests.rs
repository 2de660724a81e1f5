// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, Utc};
use peron::error::{BookingError, ErrorKind};
use peron::models::TicketStatus;
use peron::{booking, db, seats, wallet};
use rusqlite::{params, Connection};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute("INSERT INTO companies(name) VALUES ('Testline')", [])
        .unwrap();
    conn
}

fn mk_user(conn: &mut Connection, email: &str, cents: i64) -> i64 {
    conn.execute("INSERT INTO users(email) VALUES (?1)", params![email])
        .unwrap();
    let id = conn.last_insert_rowid();
    wallet::topup(conn, id, cents, None).unwrap();
    id
}

fn mk_trip_departing_in(conn: &Connection, minutes: i64) -> i64 {
    conn.execute(
        "INSERT INTO trips(company_id, origin, destination, departure_at, price_cents, seat_count)
         VALUES (1, 'Istanbul', 'Ankara', ?1, 10000, 4)",
        params![Utc::now() + Duration::minutes(minutes)],
    )
    .unwrap();
    conn.last_insert_rowid()
}

#[test]
fn cancel_refunds_and_releases_the_seat() {
    let mut conn = setup();
    let user = mk_user(&mut conn, "a@example.com", 10_000);
    let trip = mk_trip_departing_in(&conn, 24 * 60);

    let ticket = booking::purchase(&mut conn, user, trip, 1, None).unwrap();
    assert_eq!(wallet::balance(&conn, user).unwrap(), 0);

    let cancelled = booking::cancel(&mut conn, ticket.id, user).unwrap();
    assert_eq!(cancelled.status, TicketStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(wallet::balance(&conn, user).unwrap(), 10_000);

    // refund row matches the paid price
    let (kind, amount): (String, i64) = conn
        .query_row(
            "SELECT kind, amount_cents FROM wallet_transactions ORDER BY id DESC",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(kind, "refund");
    assert_eq!(amount, 10_000);

    // seat is sellable again
    assert!(seats::is_seat_free(&conn, trip, 1).unwrap());
    booking::purchase(&mut conn, user, trip, 1, None).unwrap();
}

#[test]
fn window_closes_under_one_hour() {
    let mut conn = setup();
    let user = mk_user(&mut conn, "a@example.com", 10_000);
    let trip = mk_trip_departing_in(&conn, 59);

    let ticket = booking::purchase(&mut conn, user, trip, 1, None).unwrap();
    let err = booking::cancel(&mut conn, ticket.id, user).unwrap_err();
    assert!(matches!(err, BookingError::CancellationWindowClosed));
    assert_eq!(err.kind(), ErrorKind::WindowClosed);

    // the rejection changed nothing
    assert_eq!(wallet::balance(&conn, user).unwrap(), 0);
    let status: String = conn
        .query_row(
            "SELECT status FROM tickets WHERE id=?1",
            params![ticket.id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(status, "active");
}

#[test]
fn window_open_just_over_one_hour() {
    let mut conn = setup();
    let user = mk_user(&mut conn, "a@example.com", 10_000);
    let trip = mk_trip_departing_in(&conn, 61);

    let ticket = booking::purchase(&mut conn, user, trip, 1, None).unwrap();
    let cancelled = booking::cancel(&mut conn, ticket.id, user).unwrap();
    assert_eq!(cancelled.price_paid_cents, 10_000);
    assert_eq!(wallet::balance(&conn, user).unwrap(), 10_000);
}

#[test]
fn second_cancel_finds_nothing() {
    let mut conn = setup();
    let user = mk_user(&mut conn, "a@example.com", 10_000);
    let trip = mk_trip_departing_in(&conn, 24 * 60);

    let ticket = booking::purchase(&mut conn, user, trip, 1, None).unwrap();
    booking::cancel(&mut conn, ticket.id, user).unwrap();
    let err = booking::cancel(&mut conn, ticket.id, user).unwrap_err();
    assert!(matches!(err, BookingError::TicketNotFound));

    // no double refund
    assert_eq!(wallet::balance(&conn, user).unwrap(), 10_000);
}

#[test]
fn foreign_ticket_is_indistinguishable_from_absent() {
    let mut conn = setup();
    let a = mk_user(&mut conn, "a@example.com", 10_000);
    let b = mk_user(&mut conn, "b@example.com", 10_000);
    let trip = mk_trip_departing_in(&conn, 24 * 60);

    let ticket = booking::purchase(&mut conn, a, trip, 1, None).unwrap();
    let foreign = booking::cancel(&mut conn, ticket.id, b).unwrap_err();
    let absent = booking::cancel(&mut conn, 9999, b).unwrap_err();
    assert_eq!(foreign.to_string(), absent.to_string());
}

#[test]
fn cancellation_keeps_the_coupon_consumed() {
    let mut conn = setup();
    let user = mk_user(&mut conn, "a@example.com", 10_000);
    let trip = mk_trip_departing_in(&conn, 24 * 60);
    conn.execute(
        "INSERT INTO coupons(code, percent, usage_limit, expires_at) VALUES ('HALF', 50, 1, ?1)",
        params![Utc::now() + Duration::days(7)],
    )
    .unwrap();

    let ticket = booking::purchase(&mut conn, user, trip, 1, Some("HALF")).unwrap();
    assert_eq!(ticket.price_paid_cents, 5_000);
    booking::cancel(&mut conn, ticket.id, user).unwrap();

    // the refund covers what was paid, not the base price, and the
    // redemption stays on the books
    assert_eq!(wallet::balance(&conn, user).unwrap(), 10_000);
    let (used, redemptions): (i64, i64) = conn
        .query_row(
            "SELECT used_count, (SELECT COUNT(*) FROM coupon_redemptions) FROM coupons",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(used, 1);
    assert_eq!(redemptions, 1);

    let err = booking::purchase(&mut conn, user, trip, 2, Some("HALF")).unwrap_err();
    assert!(matches!(err, BookingError::CouponAlreadyUsed));
}
