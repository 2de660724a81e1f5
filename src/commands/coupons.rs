// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::coupons;
use crate::utils::{fmt_ts, maybe_print_json, parse_departure, pretty_table};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("update", sub)) => update(conn, sub)?,
        Some(("rm", sub)) => {
            let code = sub.get_one::<String>("code").unwrap();
            let coupon = coupons::find_by_code(conn, code)?
                .with_context(|| format!("Coupon '{}' not found", code))?;
            coupons::delete(conn, coupon.id)?;
            println!("Deleted coupon '{}'", coupon.code);
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub.get_one::<String>("code").unwrap();
    let percent = *sub.get_one::<i64>("percent").unwrap();
    let limit = *sub.get_one::<i64>("limit").unwrap();
    let expires = parse_departure(sub.get_one::<String>("expires").unwrap())?;

    coupons::create(conn, code, percent, limit, expires)?;
    println!(
        "Added coupon '{}': {}% off, {} uses, expires {}",
        coupons::normalize_code(code),
        percent,
        limit,
        fmt_ts(&expires)
    );
    Ok(())
}

fn update(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub.get_one::<String>("code").unwrap();
    let current = coupons::find_by_code(conn, code)?
        .with_context(|| format!("Coupon '{}' not found", code))?;

    let percent = sub
        .get_one::<i64>("percent")
        .copied()
        .unwrap_or(current.percent);
    let limit = sub
        .get_one::<i64>("limit")
        .copied()
        .unwrap_or(current.usage_limit);
    let expires = match sub.get_one::<String>("expires") {
        Some(s) => parse_departure(s)?,
        None => current.expires_at,
    };

    coupons::update(conn, current.id, percent, limit, expires)?;
    println!("Updated coupon '{}'", current.code);
    Ok(())
}

#[derive(Serialize)]
struct CouponRow {
    code: String,
    percent: i64,
    used: i64,
    limit: i64,
    expires: String,
    status: String,
}

fn status_of(c: &crate::models::Coupon) -> &'static str {
    if Utc::now() >= c.expires_at {
        "expired"
    } else if c.used_count >= c.usage_limit {
        "exhausted"
    } else {
        "active"
    }
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let all = coupons::list(conn)?;
    let data: Vec<CouponRow> = all
        .iter()
        .map(|c| CouponRow {
            code: c.code.clone(),
            percent: c.percent,
            used: c.used_count,
            limit: c.usage_limit,
            expires: fmt_ts(&c.expires_at),
            status: status_of(c).to_string(),
        })
        .collect();
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|c| {
                vec![
                    c.code.clone(),
                    format!("{}%", c.percent),
                    format!("{}/{}", c.used, c.limit),
                    c.expires.clone(),
                    c.status.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Code", "Discount", "Used", "Expires", "Status"], rows)
        );
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub.get_one::<String>("code").unwrap();
    let coupon = coupons::find_by_code(conn, code)?
        .with_context(|| format!("Coupon '{}' not found", code))?;
    println!("Coupon:    {}", coupon.code);
    println!("Discount:  {}%", coupon.percent);
    println!("Used:      {} of {}", coupon.used_count, coupon.usage_limit);
    println!("Remaining: {}", coupon.usage_limit - coupon.used_count);
    println!("Expires:   {}", fmt_ts(&coupon.expires_at));
    println!("Status:    {}", status_of(&coupon));
    Ok(())
}
