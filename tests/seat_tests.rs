// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, Utc};
use peron::error::BookingError;
use peron::models::Gender;
use peron::{db, seats};
use rusqlite::{params, Connection};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute("INSERT INTO companies(name) VALUES ('Testline')", [])
        .unwrap();
    conn.execute("INSERT INTO users(email) VALUES ('a@example.com')", [])
        .unwrap();
    conn
}

fn mk_trip(conn: &Connection, seat_count: i64) -> i64 {
    conn.execute(
        "INSERT INTO trips(company_id, origin, destination, departure_at, price_cents, seat_count)
         VALUES (1, 'Istanbul', 'Ankara', ?1, 10000, ?2)",
        params![Utc::now() + Duration::days(1), seat_count],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn mk_ticket(conn: &Connection, trip: i64, seat: i64, gender: Option<Gender>, status: &str) {
    conn.execute(
        "INSERT INTO tickets(user_id, trip_id, seat_number, price_paid_cents, status,
                             passenger_gender, pnr, purchased_at)
         VALUES (1, ?1, ?2, 10000, ?3, ?4, ?5, ?6)",
        params![
            trip,
            seat,
            status,
            gender,
            format!("pnr{}{}{}", trip, seat, status),
            Utc::now()
        ],
    )
    .unwrap();
}

#[test]
fn pairing_follows_the_two_plus_two_layout() {
    assert_eq!(seats::adjacent_seat(1, 40), Some(2));
    assert_eq!(seats::adjacent_seat(2, 40), Some(1));
    assert_eq!(seats::adjacent_seat(39, 40), Some(40));
    assert_eq!(seats::adjacent_seat(40, 40), Some(39));
    // an odd tail seat has no partner on a bus with an odd seat count
    assert_eq!(seats::adjacent_seat(5, 5), None);
    assert_eq!(seats::adjacent_seat(5, 6), Some(6));
}

#[test]
fn available_seats_skip_active_tickets_only() {
    let conn = setup();
    let trip = mk_trip(&conn, 4);
    mk_ticket(&conn, trip, 2, None, "active");
    mk_ticket(&conn, trip, 3, None, "cancelled");

    assert_eq!(seats::available_seats(&conn, trip).unwrap(), vec![1, 3, 4]);
    assert_eq!(seats::occupied_seats(&conn, trip).unwrap(), vec![2]);
}

#[test]
fn missing_trip_is_an_error_even_when_the_answer_would_be_empty() {
    let conn = setup();
    let err = seats::available_seats(&conn, 42).unwrap_err();
    assert!(matches!(err, BookingError::TripNotFound(42)));
    let err = seats::is_seat_free(&conn, 42, 1).unwrap_err();
    assert!(matches!(err, BookingError::TripNotFound(42)));
}

#[test]
fn out_of_range_seat_is_an_error_not_false() {
    let conn = setup();
    let trip = mk_trip(&conn, 4);
    for seat in [0, 5] {
        let err = seats::is_seat_free(&conn, trip, seat).unwrap_err();
        assert!(matches!(err, BookingError::InvalidSeat { seat_count: 4, .. }));
    }
    assert!(seats::is_seat_free(&conn, trip, 4).unwrap());
}

#[test]
fn conflict_only_against_a_differing_active_snapshot() {
    let conn = setup();
    let trip = mk_trip(&conn, 4);
    mk_ticket(&conn, trip, 3, Some(Gender::Female), "active");

    assert_eq!(
        seats::adjacency_conflict(&conn, trip, 4, Gender::Male).unwrap(),
        Some(Gender::Female)
    );
    assert_eq!(
        seats::adjacency_conflict(&conn, trip, 4, Gender::Female).unwrap(),
        None
    );
    // the held seat itself queries against its own partner, seat 4, which
    // is empty
    assert_eq!(
        seats::adjacency_conflict(&conn, trip, 3, Gender::Male).unwrap(),
        None
    );
}

#[test]
fn cancelled_neighbor_does_not_conflict() {
    let conn = setup();
    let trip = mk_trip(&conn, 4);
    mk_ticket(&conn, trip, 1, Some(Gender::Female), "cancelled");
    assert_eq!(
        seats::adjacency_conflict(&conn, trip, 2, Gender::Male).unwrap(),
        None
    );
}

#[test]
fn genderless_neighbor_never_conflicts() {
    let conn = setup();
    let trip = mk_trip(&conn, 4);
    mk_ticket(&conn, trip, 1, None, "active");
    assert_eq!(
        seats::adjacency_conflict(&conn, trip, 2, Gender::Male).unwrap(),
        None
    );
    assert_eq!(
        seats::adjacency_conflict(&conn, trip, 2, Gender::Female).unwrap(),
        None
    );
}

#[test]
fn edge_seat_has_no_conflict() {
    let conn = setup();
    let trip = mk_trip(&conn, 5);
    mk_ticket(&conn, trip, 4, Some(Gender::Female), "active");
    // seat 5 is the odd tail; its would-be partner 6 does not exist
    assert_eq!(
        seats::adjacency_conflict(&conn, trip, 5, Gender::Male).unwrap(),
        None
    );
}

#[test]
fn seat_states_cover_the_whole_bus() {
    let conn = setup();
    let trip = mk_trip(&conn, 4);
    mk_ticket(&conn, trip, 2, Some(Gender::Male), "active");
    mk_ticket(&conn, trip, 4, None, "active");

    let states = seats::seat_states(&conn, trip).unwrap();
    assert_eq!(states.len(), 4);
    assert!(!states[0].taken);
    assert!(states[1].taken);
    assert_eq!(states[1].gender, Some(Gender::Male));
    assert!(states[3].taken);
    assert_eq!(states[3].gender, None);
}

#[test]
fn duplicate_active_seat_is_rejected_by_the_store() {
    let conn = setup();
    let trip = mk_trip(&conn, 4);
    mk_ticket(&conn, trip, 1, None, "active");
    let dup = conn.execute(
        "INSERT INTO tickets(user_id, trip_id, seat_number, price_paid_cents, status, pnr, purchased_at)
         VALUES (1, ?1, 1, 10000, 'active', 'pnrdup', ?2)",
        params![trip, Utc::now()],
    );
    assert!(dup.is_err());
    // a cancelled row on the same seat is history, not a conflict
    mk_ticket(&conn, trip, 1, None, "cancelled");
}
