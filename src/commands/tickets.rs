// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::booking;
use crate::error::BookingError;
use crate::notify;
use crate::utils::{fmt_money, fmt_ts, id_for_user, maybe_print_json, pretty_table};
use crate::wallet;
use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::warn;

/// Retries a booking closure a couple of times when the database
/// reports a transient storage error. Business rejections are final
/// and pass straight through.
fn retry_busy<T>(mut f: impl FnMut() -> Result<T, BookingError>) -> Result<T, BookingError> {
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if e.is_retryable() && attempts < 2 => {
                attempts += 1;
                warn!("Storage busy, retrying ({}/2): {}", attempts, e);
            }
            other => return other,
        }
    }
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("buy", sub)) => buy(conn, sub)?,
        Some(("cancel", sub)) => cancel(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn buy(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let trip_id = *sub.get_one::<i64>("trip").unwrap();
    let seat = *sub.get_one::<i64>("seat").unwrap();
    let coupon = sub.get_one::<String>("coupon").map(|s| s.as_str());

    let ticket = retry_busy(|| booking::purchase(conn, user_id, trip_id, seat, coupon))?;
    let detail = booking::get_detail(conn, ticket.id)?
        .context("Ticket record disappeared after purchase")?;
    if let Err(e) = notify::ticket_purchased(conn, &detail) {
        warn!("Could not record purchase notification: {}", e);
    }

    println!(
        "Ticket {} issued: {} -> {} on {} with {}, seat {}",
        ticket.id,
        detail.origin,
        detail.destination,
        fmt_ts(&detail.departure_at),
        detail.company,
        ticket.seat_number
    );
    println!("PNR: {}", ticket.pnr);
    println!(
        "Paid {}. Wallet balance: {}",
        fmt_money(ticket.price_paid_cents),
        fmt_money(wallet::balance(conn, user_id)?)
    );
    Ok(())
}

fn cancel(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let ticket_id = *sub.get_one::<i64>("ticket").unwrap();

    let ticket = retry_busy(|| booking::cancel(conn, ticket_id, user_id))?;
    let detail = booking::get_detail(conn, ticket.id)?
        .context("Ticket record disappeared after cancellation")?;
    if let Err(e) = notify::ticket_cancelled(conn, &detail) {
        warn!("Could not record cancellation notification: {}", e);
    }

    println!(
        "Ticket {} cancelled. {} refunded to the wallet.",
        ticket.id,
        fmt_money(ticket.price_paid_cents)
    );
    println!(
        "Wallet balance: {}",
        fmt_money(wallet::balance(conn, user_id)?)
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let details = booking::list_by_user(conn, user_id)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &details)? {
        let rows: Vec<Vec<String>> = details
            .iter()
            .map(|d| {
                vec![
                    d.ticket.id.to_string(),
                    format!("{} -> {}", d.origin, d.destination),
                    fmt_ts(&d.departure_at),
                    d.ticket.seat_number.to_string(),
                    fmt_money(d.ticket.price_paid_cents),
                    d.ticket.status.as_str().to_string(),
                    d.ticket.pnr.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Route", "Departure", "Seat", "Paid", "Status", "PNR"],
                rows,
            )
        );
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let pnr = sub.get_one::<String>("pnr").unwrap();
    let detail = booking::find_by_pnr(conn, pnr, user_id)?
        .with_context(|| format!("No ticket with PNR '{}'", pnr))?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &detail)? {
        println!(
            "Ticket:    {} ({})",
            detail.ticket.id,
            detail.ticket.status.as_str()
        );
        println!("Route:     {} -> {}", detail.origin, detail.destination);
        println!("Departure: {}", fmt_ts(&detail.departure_at));
        println!("Company:   {}", detail.company);
        println!("Seat:      {}", detail.ticket.seat_number);
        println!("Paid:      {}", fmt_money(detail.ticket.price_paid_cents));
        println!("PNR:       {}", detail.ticket.pnr);
        println!("Purchased: {}", fmt_ts(&detail.ticket.purchased_at));
        if let Some(cancelled) = detail.ticket.cancelled_at {
            println!("Cancelled: {}", fmt_ts(&cancelled));
        }
    }
    Ok(())
}
