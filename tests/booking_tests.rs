// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, Utc};
use peron::error::{BookingError, ErrorKind};
use peron::models::{Gender, TicketStatus};
use peron::{booking, db, notify, wallet};
use rusqlite::{params, Connection};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute("INSERT INTO companies(name) VALUES ('Testline')", [])
        .unwrap();
    conn
}

fn mk_user(conn: &Connection, email: &str, gender: Option<Gender>) -> i64 {
    conn.execute(
        "INSERT INTO users(email, gender) VALUES (?1, ?2)",
        params![email, gender],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn fund(conn: &mut Connection, user_id: i64, cents: i64) {
    wallet::topup(conn, user_id, cents, None).unwrap();
}

fn mk_trip(conn: &Connection, price_cents: i64, seat_count: i64) -> i64 {
    conn.execute(
        "INSERT INTO trips(company_id, origin, destination, departure_at, price_cents, seat_count)
         VALUES (1, 'Istanbul', 'Ankara', ?1, ?2, ?3)",
        params![Utc::now() + Duration::days(1), price_cents, seat_count],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn mk_coupon(conn: &Connection, code: &str, percent: i64, limit: i64) -> i64 {
    conn.execute(
        "INSERT INTO coupons(code, percent, usage_limit, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![code, percent, limit, Utc::now() + Duration::days(7)],
    )
    .unwrap();
    conn.last_insert_rowid()
}

#[test]
fn purchase_issues_ticket_and_debits_wallet() {
    let mut conn = setup();
    let user = mk_user(&conn, "a@example.com", Some(Gender::Female));
    fund(&mut conn, user, 50_000);
    let trip = mk_trip(&conn, 45_000, 40);

    let ticket = booking::purchase(&mut conn, user, trip, 7, None).unwrap();
    assert_eq!(ticket.status, TicketStatus::Active);
    assert_eq!(ticket.price_paid_cents, 45_000);
    assert_eq!(ticket.seat_number, 7);
    assert_eq!(ticket.passenger_gender, Some(Gender::Female));
    assert_eq!(ticket.pnr.len(), 16);
    assert!(ticket.pnr.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(wallet::balance(&conn, user).unwrap(), 5_000);

    // one charge row for the exact amount
    let (kind, amount): (String, i64) = conn
        .query_row(
            "SELECT kind, amount_cents FROM wallet_transactions WHERE user_id=?1 ORDER BY id DESC",
            params![user],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(kind, "charge");
    assert_eq!(amount, -45_000);
}

#[test]
fn purchase_unknown_trip_fails() {
    let mut conn = setup();
    let user = mk_user(&conn, "a@example.com", None);
    let err = booking::purchase(&mut conn, user, 999, 1, None).unwrap_err();
    assert!(matches!(err, BookingError::TripNotFound(999)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn purchase_unknown_user_fails() {
    let mut conn = setup();
    let trip = mk_trip(&conn, 10_000, 4);
    let err = booking::purchase(&mut conn, 999, trip, 1, None).unwrap_err();
    assert!(matches!(err, BookingError::UserNotFound(999)));
}

#[test]
fn seat_out_of_range_is_invalid_not_taken() {
    let mut conn = setup();
    let user = mk_user(&conn, "a@example.com", None);
    fund(&mut conn, user, 20_000);
    let trip = mk_trip(&conn, 10_000, 4);
    for seat in [0, 5, -3] {
        let err = booking::purchase(&mut conn, user, trip, seat, None).unwrap_err();
        assert!(matches!(err, BookingError::InvalidSeat { seat_count: 4, .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}

#[test]
fn second_buyer_of_same_seat_is_rejected() {
    let mut conn = setup();
    let a = mk_user(&conn, "a@example.com", None);
    let b = mk_user(&conn, "b@example.com", None);
    fund(&mut conn, a, 20_000);
    fund(&mut conn, b, 20_000);
    let trip = mk_trip(&conn, 10_000, 4);

    booking::purchase(&mut conn, a, trip, 2, None).unwrap();
    let err = booking::purchase(&mut conn, b, trip, 2, None).unwrap_err();
    assert!(matches!(err, BookingError::SeatTaken(2)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn insufficient_balance_rejects_and_rolls_back() {
    let mut conn = setup();
    let user = mk_user(&conn, "a@example.com", None);
    fund(&mut conn, user, 9_999);
    let trip = mk_trip(&conn, 10_000, 4);

    let err = booking::purchase(&mut conn, user, trip, 1, None).unwrap_err();
    assert!(matches!(
        err,
        BookingError::InsufficientBalance {
            need_cents: 10_000,
            have_cents: 9_999
        }
    ));

    // nothing stuck behind: no ticket, no charge row, balance intact
    let tickets: i64 = conn
        .query_row("SELECT COUNT(*) FROM tickets", [], |r| r.get(0))
        .unwrap();
    assert_eq!(tickets, 0);
    let charges: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM wallet_transactions WHERE kind='charge'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(charges, 0);
    assert_eq!(wallet::balance(&conn, user).unwrap(), 9_999);
}

#[test]
fn failed_purchase_does_not_consume_coupon() {
    let mut conn = setup();
    let user = mk_user(&conn, "a@example.com", None);
    fund(&mut conn, user, 1_000);
    let trip = mk_trip(&conn, 10_000, 4);
    let coupon = mk_coupon(&conn, "HALF", 50, 1);

    // coupon prices to 5000 but the wallet holds 1000; the debit fails and
    // the whole unit rolls back, redemption included
    let err = booking::purchase(&mut conn, user, trip, 1, Some("HALF")).unwrap_err();
    assert!(matches!(err, BookingError::InsufficientBalance { .. }));

    let used: i64 = conn
        .query_row(
            "SELECT used_count FROM coupons WHERE id=?1",
            params![coupon],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(used, 0);
    let redemptions: i64 = conn
        .query_row("SELECT COUNT(*) FROM coupon_redemptions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(redemptions, 0);
}

#[test]
fn gender_conflict_on_adjacent_seat() {
    let mut conn = setup();
    let f = mk_user(&conn, "f@example.com", Some(Gender::Female));
    let m = mk_user(&conn, "m@example.com", Some(Gender::Male));
    let f2 = mk_user(&conn, "f2@example.com", Some(Gender::Female));
    let n = mk_user(&conn, "n@example.com", None);
    fund(&mut conn, f, 50_000);
    fund(&mut conn, m, 50_000);
    fund(&mut conn, f2, 50_000);
    fund(&mut conn, n, 50_000);
    let trip = mk_trip(&conn, 10_000, 4);

    // seat 3 (odd) pairs with seat 4
    booking::purchase(&mut conn, f, trip, 3, None).unwrap();

    let err = booking::purchase(&mut conn, m, trip, 4, None).unwrap_err();
    assert!(matches!(err, BookingError::GenderConflict(Gender::Female)));
    assert!(err.to_string().contains("female"));

    // same gender sits fine
    let t = booking::purchase(&mut conn, f2, trip, 4, None).unwrap();
    booking::cancel(&mut conn, t.id, f2).unwrap();

    // no recorded gender skips the check entirely
    booking::purchase(&mut conn, n, trip, 4, None).unwrap();
}

#[test]
fn genderless_neighbor_imposes_no_constraint() {
    let mut conn = setup();
    let n = mk_user(&conn, "n@example.com", None);
    let m = mk_user(&conn, "m@example.com", Some(Gender::Male));
    fund(&mut conn, n, 20_000);
    fund(&mut conn, m, 20_000);
    let trip = mk_trip(&conn, 10_000, 4);

    booking::purchase(&mut conn, n, trip, 1, None).unwrap();
    booking::purchase(&mut conn, m, trip, 2, None).unwrap();
}

#[test]
fn half_coupon_scenario() {
    let mut conn = setup();
    let a = mk_user(&conn, "a@example.com", None);
    let b = mk_user(&conn, "b@example.com", None);
    fund(&mut conn, a, 10_000);
    fund(&mut conn, b, 10_000);
    let trip = mk_trip(&conn, 10_000, 4);
    let coupon = mk_coupon(&conn, "HALF", 50, 1);

    let ticket = booking::purchase(&mut conn, a, trip, 1, Some("HALF")).unwrap();
    assert_eq!(ticket.price_paid_cents, 5_000);
    assert_eq!(ticket.coupon_id, Some(coupon));
    assert_eq!(wallet::balance(&conn, a).unwrap(), 5_000);
    let used: i64 = conn
        .query_row(
            "SELECT used_count FROM coupons WHERE id=?1",
            params![coupon],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(used, 1);

    let err = booking::purchase(&mut conn, b, trip, 1, Some("ANY")).unwrap_err();
    assert!(matches!(err, BookingError::SeatTaken(1)));

    // A retries the code on another seat; redemption is per user
    let err = booking::purchase(&mut conn, a, trip, 2, Some("HALF")).unwrap_err();
    assert!(matches!(err, BookingError::CouponAlreadyUsed));
}

#[test]
fn invalid_coupon_code_hard_fails_the_purchase() {
    let mut conn = setup();
    let user = mk_user(&conn, "a@example.com", None);
    fund(&mut conn, user, 20_000);
    let trip = mk_trip(&conn, 10_000, 4);

    let err = booking::purchase(&mut conn, user, trip, 1, Some("NOPE")).unwrap_err();
    assert!(matches!(err, BookingError::CouponInvalid));
    // the seat was not sold at base price behind the user's back
    let tickets: i64 = conn
        .query_row("SELECT COUNT(*) FROM tickets", [], |r| r.get(0))
        .unwrap();
    assert_eq!(tickets, 0);
}

#[test]
fn blank_coupon_code_prices_at_base() {
    let mut conn = setup();
    let user = mk_user(&conn, "a@example.com", None);
    fund(&mut conn, user, 20_000);
    let trip = mk_trip(&conn, 10_000, 4);

    let ticket = booking::purchase(&mut conn, user, trip, 1, Some("  ")).unwrap();
    assert_eq!(ticket.price_paid_cents, 10_000);
    assert_eq!(ticket.coupon_id, None);
}

#[test]
fn full_discount_still_writes_a_zero_charge() {
    let mut conn = setup();
    let user = mk_user(&conn, "a@example.com", None);
    fund(&mut conn, user, 1_000);
    let trip = mk_trip(&conn, 10_000, 4);
    mk_coupon(&conn, "FREE", 100, 5);

    let ticket = booking::purchase(&mut conn, user, trip, 1, Some("FREE")).unwrap();
    assert_eq!(ticket.price_paid_cents, 0);
    assert_eq!(wallet::balance(&conn, user).unwrap(), 1_000);
    let amount: i64 = conn
        .query_row(
            "SELECT amount_cents FROM wallet_transactions WHERE kind='charge'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(amount, 0);
}

#[test]
fn pnr_lookup_is_scoped_to_the_owner() {
    let mut conn = setup();
    let a = mk_user(&conn, "a@example.com", None);
    let b = mk_user(&conn, "b@example.com", None);
    fund(&mut conn, a, 20_000);
    let trip = mk_trip(&conn, 10_000, 4);

    let ticket = booking::purchase(&mut conn, a, trip, 1, None).unwrap();
    let found = booking::find_by_pnr(&conn, &ticket.pnr, a).unwrap().unwrap();
    assert_eq!(found.ticket.id, ticket.id);
    assert_eq!(found.origin, "Istanbul");
    assert_eq!(found.company, "Testline");
    assert_eq!(found.user_email, "a@example.com");

    assert!(booking::find_by_pnr(&conn, &ticket.pnr, b).unwrap().is_none());
    // lookup tolerates case and padding
    let padded = format!("  {}  ", ticket.pnr.to_uppercase());
    assert!(booking::find_by_pnr(&conn, &padded, a).unwrap().is_some());
}

#[test]
fn list_by_user_newest_first() {
    let mut conn = setup();
    let user = mk_user(&conn, "a@example.com", None);
    fund(&mut conn, user, 50_000);
    let trip = mk_trip(&conn, 10_000, 4);

    let t1 = booking::purchase(&mut conn, user, trip, 1, None).unwrap();
    let t2 = booking::purchase(&mut conn, user, trip, 2, None).unwrap();
    let all = booking::list_by_user(&conn, user).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].ticket.id, t2.id);
    assert_eq!(all[1].ticket.id, t1.id);
}

#[test]
fn notification_rows_describe_the_ticket() {
    let mut conn = setup();
    let user = mk_user(&conn, "a@example.com", None);
    fund(&mut conn, user, 20_000);
    let trip = mk_trip(&conn, 10_000, 4);

    let ticket = booking::purchase(&mut conn, user, trip, 1, None).unwrap();
    let detail = booking::get_detail(&conn, ticket.id).unwrap().unwrap();
    notify::ticket_purchased(&conn, &detail).unwrap();

    let (recipient, body): (String, String) = conn
        .query_row(
            "SELECT recipient, body FROM notifications ORDER BY id DESC",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(recipient, "a@example.com");
    assert!(body.contains(&ticket.pnr));
    assert!(body.contains("Istanbul"));
}
