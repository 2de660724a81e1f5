// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Gender;
use crate::utils::{fmt_money, id_for_user, maybe_print_json, parse_gender, pretty_table};
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let email = sub.get_one::<String>("email").unwrap();
            let gender = sub
                .get_one::<String>("gender")
                .map(|s| parse_gender(s))
                .transpose()?;
            let id = create(conn, email, gender)?;
            println!("Registered user '{}' (id {})", email, id);
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        _ => {}
    }
    Ok(())
}

pub fn create(conn: &Connection, email: &str, gender: Option<Gender>) -> Result<i64> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        bail!("Invalid email '{}'", email);
    }
    conn.execute(
        "INSERT INTO users(email, gender) VALUES (?1, ?2)",
        params![email, gender],
    )
    .with_context(|| format!("Could not register '{}' (already taken?)", email))?;
    Ok(conn.last_insert_rowid())
}

#[derive(Serialize)]
struct UserRow {
    email: String,
    gender: String,
    balance: String,
    created: String,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT email, gender, credit_cents, created_at FROM users ORDER BY email",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(UserRow {
            email: r.get(0)?,
            gender: r
                .get::<_, Option<String>>(1)?
                .unwrap_or_else(|| "-".into()),
            balance: fmt_money(r.get(2)?),
            created: r.get(3)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let table_rows: Vec<Vec<String>> = data
            .iter()
            .map(|u| {
                vec![
                    u.email.clone(),
                    u.gender.clone(),
                    u.balance.clone(),
                    u.created.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Email", "Gender", "Balance", "Created"], table_rows)
        );
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let email = sub.get_one::<String>("email").unwrap();
    let user_id = id_for_user(conn, email)?;
    let (gender, credit): (Option<String>, i64) = conn.query_row(
        "SELECT gender, credit_cents FROM users WHERE id=?1",
        params![user_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let tickets: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tickets WHERE user_id=?1 AND status='active'",
        params![user_id],
        |r| r.get(0),
    )?;
    let cards: i64 = conn.query_row(
        "SELECT COUNT(*) FROM payment_cards WHERE user_id=?1",
        params![user_id],
        |r| r.get(0),
    )?;
    println!("User: {}", email);
    println!("Gender: {}", gender.unwrap_or_else(|| "-".into()));
    println!("Balance: {}", fmt_money(credit));
    println!("Active tickets: {}", tickets);
    println!("Stored cards: {}", cards);
    Ok(())
}
