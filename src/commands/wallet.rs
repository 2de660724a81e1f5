// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{fmt_money, fmt_ts, id_for_user, maybe_print_json, parse_amount_cents, pretty_table};
use crate::wallet;
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("topup", sub)) => topup(conn, sub)?,
        Some(("balance", sub)) => {
            let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
            println!("{}", fmt_money(wallet::balance(conn, user_id)?));
        }
        Some(("history", sub)) => history(conn, sub)?,
        Some(("add-card", sub)) => add_card(conn, sub)?,
        Some(("cards", sub)) => cards(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn topup(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let amount = parse_amount_cents(sub.get_one::<String>("amount").unwrap())?;
    let note = sub.get_one::<String>("note").map(|s| s.as_str());
    let balance = wallet::topup(conn, user_id, amount, note)?;
    println!("Added {}. New balance: {}", fmt_money(amount), fmt_money(balance));
    Ok(())
}

#[derive(Serialize)]
struct TxRow {
    id: i64,
    kind: String,
    amount: String,
    meta: Option<String>,
    created: String,
}

fn history(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let txs = wallet::history(conn, user_id)?;
    let data: Vec<TxRow> = txs
        .iter()
        .map(|t| TxRow {
            id: t.id,
            kind: t.kind.clone(),
            amount: fmt_money(t.amount_cents),
            meta: t.meta.clone(),
            created: fmt_ts(&t.created_at),
        })
        .collect();
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|t| {
                vec![
                    t.id.to_string(),
                    t.kind.clone(),
                    t.amount.clone(),
                    t.meta.clone().unwrap_or_default(),
                    t.created.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Id", "Kind", "Amount", "Meta", "Created"], rows)
        );
        println!("Balance: {}", fmt_money(wallet::balance(conn, user_id)?));
    }
    Ok(())
}

fn add_card(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let holder = sub.get_one::<String>("holder").unwrap();
    let pan = sub.get_one::<String>("pan").unwrap();
    let month = *sub.get_one::<i64>("month").unwrap();
    let year = *sub.get_one::<i64>("year").unwrap();
    let card = wallet::add_card(conn, user_id, holder, pan, month, year)?;
    println!(
        "Stored {} card {} for {}",
        card.brand, card.masked_pan, card.holder
    );
    Ok(())
}

fn cards(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let all = wallet::list_cards(conn, user_id)?;
    let rows: Vec<Vec<String>> = all
        .iter()
        .map(|c| {
            vec![
                c.holder.clone(),
                c.masked_pan.clone(),
                c.brand.clone(),
                format!("{:02}/{}", c.exp_month, c.exp_year),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Holder", "Card", "Brand", "Expires"], rows));
    Ok(())
}
