// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{fmt_money, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    // 1) Wallet balances that disagree with the ledger
    let mut stmt = conn.prepare(
        "SELECT u.email, u.credit_cents,
                COALESCE((SELECT SUM(w.amount_cents) FROM wallet_transactions w WHERE w.user_id=u.id), 0)
         FROM users u",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let email: String = r.get(0)?;
        let credit: i64 = r.get(1)?;
        let ledger: i64 = r.get(2)?;
        if credit != ledger {
            rows.push(vec![
                "wallet_drift".into(),
                format!("{}: balance {} vs ledger {}", email, fmt_money(credit), fmt_money(ledger)),
            ]);
        }
    }

    // 2) Two active tickets on the same seat
    let mut stmt2 = conn.prepare(
        "SELECT trip_id, seat_number, COUNT(*) FROM tickets
         WHERE status='active' GROUP BY trip_id, seat_number HAVING COUNT(*) > 1",
    )?;
    let mut cur2 = stmt2.query([])?;
    while let Some(r) = cur2.next()? {
        let trip: i64 = r.get(0)?;
        let seat: i64 = r.get(1)?;
        let n: i64 = r.get(2)?;
        rows.push(vec![
            "double_booked_seat".into(),
            format!("trip {} seat {} held {} times", trip, seat, n),
        ]);
    }

    // 3) Coupon counters that disagree with the redemption log
    let mut stmt3 = conn.prepare(
        "SELECT c.code, c.used_count, c.usage_limit,
                (SELECT COUNT(*) FROM coupon_redemptions r WHERE r.coupon_id=c.id)
         FROM coupons c",
    )?;
    let mut cur3 = stmt3.query([])?;
    while let Some(r) = cur3.next()? {
        let code: String = r.get(0)?;
        let used: i64 = r.get(1)?;
        let limit: i64 = r.get(2)?;
        let redeemed: i64 = r.get(3)?;
        if used != redeemed {
            rows.push(vec![
                "coupon_count_drift".into(),
                format!("{}: used_count {} vs {} redemptions", code, used, redeemed),
            ]);
        }
        if used > limit {
            rows.push(vec![
                "coupon_over_limit".into(),
                format!("{}: used {} of {}", code, used, limit),
            ]);
        }
    }

    // 4) Active tickets on seats the bus does not have
    let mut stmt4 = conn.prepare(
        "SELECT t.id, t.seat_number, r.seat_count FROM tickets t
         JOIN trips r ON t.trip_id=r.id
         WHERE t.status='active' AND (t.seat_number < 1 OR t.seat_number > r.seat_count)",
    )?;
    let mut cur4 = stmt4.query([])?;
    while let Some(r) = cur4.next()? {
        let id: i64 = r.get(0)?;
        let seat: i64 = r.get(1)?;
        let count: i64 = r.get(2)?;
        rows.push(vec![
            "seat_out_of_range".into(),
            format!("ticket {} seat {} of {}", id, seat, count),
        ]);
    }

    // 5) Tickets pointing at users or trips that no longer exist.
    //    Foreign keys are enforced per connection, so a writer that
    //    skipped the pragma can leave these behind.
    let mut stmt5 = conn.prepare(
        "SELECT t.id FROM tickets t
         LEFT JOIN users u ON t.user_id=u.id
         LEFT JOIN trips r ON t.trip_id=r.id
         WHERE u.id IS NULL OR r.id IS NULL",
    )?;
    let mut cur5 = stmt5.query([])?;
    while let Some(r) = cur5.next()? {
        let id: i64 = r.get(0)?;
        rows.push(vec!["orphan_ticket".into(), format!("ticket {}", id)]);
    }

    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
