// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use peron::commands::{doctor, seeder};
use peron::db;
use rusqlite::Connection;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

#[test]
fn seed_loads_a_consistent_demo_fleet() {
    let mut conn = setup();
    seeder::handle(&mut conn).unwrap();

    let companies: i64 = conn
        .query_row("SELECT COUNT(*) FROM companies", [], |r| r.get(0))
        .unwrap();
    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
        .unwrap();
    let trips: i64 = conn
        .query_row("SELECT COUNT(*) FROM trips", [], |r| r.get(0))
        .unwrap();
    let coupons: i64 = conn
        .query_row("SELECT COUNT(*) FROM coupons", [], |r| r.get(0))
        .unwrap();
    assert_eq!(companies, 2);
    assert_eq!(users, 3);
    assert_eq!(trips, 8);
    assert_eq!(coupons, 1);

    // seeded wallets are funded through the ledger, so balances agree
    let drifted: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM users u WHERE u.credit_cents !=
             COALESCE((SELECT SUM(w.amount_cents) FROM wallet_transactions w WHERE w.user_id=u.id), 0)",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(drifted, 0);

    doctor::handle(&conn).unwrap();
}

#[test]
fn seed_can_run_twice_without_duplicating() {
    let mut conn = setup();
    seeder::handle(&mut conn).unwrap();
    seeder::handle(&mut conn).unwrap();

    let companies: i64 = conn
        .query_row("SELECT COUNT(*) FROM companies", [], |r| r.get(0))
        .unwrap();
    let trips: i64 = conn
        .query_row("SELECT COUNT(*) FROM trips", [], |r| r.get(0))
        .unwrap();
    let coupons: i64 = conn
        .query_row("SELECT COUNT(*) FROM coupons", [], |r| r.get(0))
        .unwrap();
    assert_eq!(companies, 2);
    assert_eq!(trips, 8);
    assert_eq!(coupons, 1);
}

#[test]
fn doctor_tolerates_manufactured_drift() {
    let mut conn = setup();
    seeder::handle(&mut conn).unwrap();

    // force a balance that disagrees with the ledger; the audit reports
    // findings but never fails
    conn.execute(
        "UPDATE users SET credit_cents = credit_cents + 1 WHERE id=1",
        [],
    )
    .unwrap();
    doctor::handle(&conn).unwrap();
}

#[test]
fn doctor_runs_on_an_empty_store() {
    let conn = setup();
    doctor::handle(&conn).unwrap();
}
