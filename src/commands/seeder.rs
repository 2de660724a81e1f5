// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::coupons;
use crate::models::Gender;
use crate::trips;
use crate::utils::id_for_company;
use crate::wallet;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use rusqlite::{params, Connection};

/// Loads a small demo fleet: two carriers, three riders with funded
/// wallets, a week of trips, and one discount code. Safe to run more
/// than once; existing rows are left alone.
pub fn handle(conn: &mut Connection) -> Result<()> {
    let now = Utc::now();

    let mut companies_added = 0;
    for name in ["Yavuzlar Turizm", "Anadolu Ekspres"] {
        companies_added += conn.execute(
            "INSERT OR IGNORE INTO companies(name) VALUES (?1)",
            params![name],
        )?;
    }

    let riders: [(&str, Option<Gender>); 3] = [
        ("ayse@example.com", Some(Gender::Female)),
        ("mehmet@example.com", Some(Gender::Male)),
        ("deniz@example.com", None),
    ];
    let mut users_added = 0;
    for (email, gender) in riders {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users(email, gender) VALUES (?1, ?2)",
            params![email, gender],
        )?;
        if inserted == 1 {
            let user_id = conn.last_insert_rowid();
            wallet::topup(conn, user_id, 150_000, Some("demo seed"))?;
            users_added += 1;
        }
    }

    let trip_count: i64 = conn.query_row("SELECT COUNT(*) FROM trips", [], |r| r.get(0))?;
    let mut trips_added = 0;
    if trip_count == 0 {
        let yavuzlar = id_for_company(conn, "Yavuzlar Turizm")?;
        let anadolu = id_for_company(conn, "Anadolu Ekspres")?;
        let schedule: [(i64, &str, &str, i64, u32, i64, i64); 8] = [
            (yavuzlar, "Istanbul", "Ankara", 1, 10, 45_000, 40),
            (yavuzlar, "Ankara", "Istanbul", 1, 18, 45_000, 40),
            (yavuzlar, "Istanbul", "Izmir", 2, 9, 52_500, 36),
            (yavuzlar, "Izmir", "Istanbul", 2, 21, 52_500, 36),
            (anadolu, "Ankara", "Antalya", 3, 8, 60_000, 44),
            (anadolu, "Antalya", "Ankara", 3, 20, 60_000, 44),
            (anadolu, "Istanbul", "Trabzon", 4, 12, 87_500, 40),
            (anadolu, "Trabzon", "Istanbul", 5, 12, 87_500, 40),
        ];
        for (company_id, origin, destination, days, hour, price, seats) in schedule {
            let departure = (now + Duration::days(days))
                .date_naive()
                .and_hms_opt(hour, 0, 0)
                .context("Invalid seed departure time")?
                .and_utc();
            trips::create(conn, company_id, origin, destination, departure, price, seats)?;
            trips_added += 1;
        }
    }

    let mut coupons_added = 0;
    if coupons::find_by_code(conn, "INDIRIM10")?.is_none() {
        coupons::create(conn, "INDIRIM10", 10, 100, now + Duration::days(30))?;
        coupons_added += 1;
    }

    println!(
        "Seeded {} companies, {} users, {} trips, {} coupons",
        companies_added, users_added, trips_added, coupons_added
    );
    Ok(())
}
