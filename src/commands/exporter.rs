// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("tickets", sub)) => export_tickets(conn, sub),
        Some(("wallet", sub)) => export_wallet(conn, sub),
        _ => Ok(()),
    }
}

fn export_tickets(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let mut stmt = conn.prepare(
        "SELECT t.pnr, u.email, c.name as company, r.origin, r.destination, r.departure_at,
                t.seat_number, t.price_paid_cents, t.status, t.purchased_at
         FROM tickets t
         JOIN trips r ON t.trip_id=r.id
         JOIN companies c ON r.company_id=c.id
         JOIN users u ON t.user_id=u.id
         ORDER BY t.id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, i64>(6)?,
            r.get::<_, i64>(7)?,
            r.get::<_, String>(8)?,
            r.get::<_, String>(9)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "pnr",
                "user",
                "company",
                "origin",
                "destination",
                "departure",
                "seat",
                "price",
                "status",
                "purchased",
            ])?;
            for row in rows {
                let (pnr, user, company, origin, dest, dep, seat, price, status, bought) = row?;
                wtr.write_record([
                    pnr,
                    user,
                    company,
                    origin,
                    dest,
                    dep,
                    seat.to_string(),
                    Decimal::new(price, 2).to_string(),
                    status,
                    bought,
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (pnr, user, company, origin, dest, dep, seat, price, status, bought) = row?;
                items.push(json!({
                    "pnr": pnr, "user": user, "company": company, "origin": origin,
                    "destination": dest, "departure": dep, "seat": seat,
                    "price": Decimal::new(price, 2).to_string(), "status": status, "purchased": bought
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
        }
    }
    println!("Exported tickets to {}", out);
    Ok(())
}

fn export_wallet(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let mut sql = String::from(
        "SELECT u.email, w.kind, w.amount_cents, w.meta, w.created_at
         FROM wallet_transactions w
         JOIN users u ON w.user_id=u.id",
    );
    let mut params_vec: Vec<String> = Vec::new();
    if let Some(user) = sub.get_one::<String>("user") {
        sql.push_str(" WHERE u.email=?");
        params_vec.push(user.trim().to_lowercase());
    }
    sql.push_str(" ORDER BY w.id");

    let mut stmt = conn.prepare(&sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let rows = stmt.query_map(rusqlite::params_from_iter(bound), |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, i64>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record(["user", "kind", "amount", "meta", "created"])?;
            for row in rows {
                let (user, kind, amount, meta, created) = row?;
                wtr.write_record([
                    user,
                    kind,
                    Decimal::new(amount, 2).to_string(),
                    meta.unwrap_or_default(),
                    created,
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (user, kind, amount, meta, created) = row?;
                items.push(json!({
                    "user": user, "kind": kind,
                    "amount": Decimal::new(amount, 2).to_string(),
                    "meta": meta, "created": created
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
        }
    }
    println!("Exported wallet ledger to {}", out);
    Ok(())
}
