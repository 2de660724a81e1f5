// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Gender;
use crate::seats;
use crate::trips::{self, TripFilter};
use crate::utils::{
    fmt_money, fmt_ts, id_for_company, maybe_print_json, parse_amount_cents, parse_date,
    parse_departure, pretty_table,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("update", sub)) => update(conn, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            trips::delete(conn, id)?;
            println!("Deleted trip {}", id);
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("search", sub)) => search(conn, sub)?,
        Some(("seats", sub)) => seat_map(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let company = sub.get_one::<String>("company").unwrap();
    let origin = sub.get_one::<String>("from").unwrap();
    let destination = sub.get_one::<String>("to").unwrap();
    let departure = parse_departure(sub.get_one::<String>("departure").unwrap())?;
    let price = parse_amount_cents(sub.get_one::<String>("price").unwrap())?;
    let seats = *sub.get_one::<i64>("seats").unwrap();

    let company_id = id_for_company(conn, company)?;
    let id = trips::create(conn, company_id, origin, destination, departure, price, seats)?;
    println!(
        "Scheduled trip {}: {} -> {} on {} ({}, {} seats)",
        id,
        origin,
        destination,
        fmt_ts(&departure),
        fmt_money(price),
        seats
    );
    Ok(())
}

fn update(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let current = trips::get(conn, id)?.with_context(|| format!("Trip {} not found", id))?;

    let origin = sub
        .get_one::<String>("from")
        .cloned()
        .unwrap_or(current.origin);
    let destination = sub
        .get_one::<String>("to")
        .cloned()
        .unwrap_or(current.destination);
    let departure = match sub.get_one::<String>("departure") {
        Some(s) => parse_departure(s)?,
        None => current.departure_at,
    };
    let price = match sub.get_one::<String>("price") {
        Some(s) => parse_amount_cents(s)?,
        None => current.price_cents,
    };
    let seats = sub
        .get_one::<i64>("seats")
        .copied()
        .unwrap_or(current.seat_count);

    trips::update(conn, id, &origin, &destination, departure, price, seats)?;
    println!("Updated trip {}", id);
    Ok(())
}

#[derive(Serialize)]
struct TripRow {
    id: i64,
    company: String,
    origin: String,
    destination: String,
    departure: String,
    price: String,
    seats_free: i64,
    seats_total: i64,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut sql = String::from(
        "SELECT t.id, c.name, t.origin, t.destination, t.departure_at, t.price_cents, t.seat_count,
                (SELECT COUNT(*) FROM tickets k WHERE k.trip_id=t.id AND k.status='active')
         FROM trips t JOIN companies c ON t.company_id=c.id",
    );
    let mut params_vec: Vec<String> = Vec::new();
    if let Some(company) = sub.get_one::<String>("company") {
        sql.push_str(" WHERE c.name=?");
        params_vec.push(company.clone());
    }
    sql.push_str(" ORDER BY t.departure_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(bound))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let total: i64 = r.get(6)?;
        let taken: i64 = r.get(7)?;
        data.push(TripRow {
            id: r.get(0)?,
            company: r.get(1)?,
            origin: r.get(2)?,
            destination: r.get(3)?,
            departure: fmt_ts(&r.get(4)?),
            price: fmt_money(r.get(5)?),
            seats_free: total - taken,
            seats_total: total,
        });
    }
    print_trip_rows(sub, data)
}

fn search(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let filter = TripFilter {
        origin: sub.get_one::<String>("from").cloned(),
        destination: sub.get_one::<String>("to").cloned(),
        date: sub
            .get_one::<String>("date")
            .map(|s| parse_date(s))
            .transpose()?,
    };
    let found = trips::search(conn, &filter)?;
    let data: Vec<TripRow> = found
        .into_iter()
        .map(|t| TripRow {
            id: t.id,
            company: t.company,
            origin: t.origin,
            destination: t.destination,
            departure: fmt_ts(&t.departure_at),
            price: fmt_money(t.price_cents),
            seats_free: t.seats_free,
            seats_total: t.seats_total,
        })
        .collect();
    print_trip_rows(sub, data)
}

fn print_trip_rows(sub: &clap::ArgMatches, data: Vec<TripRow>) -> Result<()> {
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|t| {
                vec![
                    t.id.to_string(),
                    t.company.clone(),
                    format!("{} -> {}", t.origin, t.destination),
                    t.departure.clone(),
                    t.price.clone(),
                    format!("{}/{}", t.seats_free, t.seats_total),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Company", "Route", "Departure", "Price", "Free"],
                rows,
            )
        );
    }
    Ok(())
}

fn seat_map(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let states = seats::seat_states(conn, id)?;
    let free = states.iter().filter(|s| !s.taken).count();
    let rows: Vec<Vec<String>> = states
        .iter()
        .map(|s| {
            let status = match (s.taken, s.gender) {
                (false, _) => "free".to_string(),
                (true, Some(Gender::Male)) => "taken (male)".to_string(),
                (true, Some(Gender::Female)) => "taken (female)".to_string(),
                (true, None) => "taken".to_string(),
            };
            vec![s.seat.to_string(), status]
        })
        .collect();
    println!("{}", pretty_table(&["Seat", "Status"], rows));
    println!("{} of {} seats free", free, states.len());
    Ok(())
}
