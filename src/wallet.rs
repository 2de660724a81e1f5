// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;

use crate::error::BookingError;
use crate::models::{PaymentCard, TxKind, WalletTransaction};

/// Context serialized into a ledger row's meta column, linking the money
/// movement back to the booking objects that caused it.
#[derive(Debug, Default, Clone, Serialize)]
pub struct TxMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TxMeta {
    pub fn note(s: &str) -> Self {
        TxMeta {
            note: Some(s.to_string()),
            ..Default::default()
        }
    }
}

pub fn balance(conn: &Connection, user_id: i64) -> Result<i64, BookingError> {
    conn.query_row(
        "SELECT credit_cents FROM users WHERE id=?1",
        params![user_id],
        |r| r.get(0),
    )
    .optional()?
    .ok_or(BookingError::UserNotFound(user_id))
}

fn append(
    conn: &Connection,
    user_id: i64,
    kind: TxKind,
    amount_cents: i64,
    meta: &TxMeta,
) -> Result<(), BookingError> {
    conn.execute(
        "INSERT INTO wallet_transactions(user_id, kind, amount_cents, meta, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id,
            kind.as_str(),
            amount_cents,
            serde_json::to_string(meta)?,
            Utc::now()
        ],
    )?;
    Ok(())
}

/// Atomically take `amount_cents` from the user's balance and append the
/// matching charge row. The conditional update is the overdraft guard;
/// callers run this inside their own transaction to tie it to the rest of
/// the unit.
pub fn debit(
    conn: &Connection,
    user_id: i64,
    amount_cents: i64,
    meta: &TxMeta,
) -> Result<(), BookingError> {
    if amount_cents < 0 {
        return Err(BookingError::InvalidInput(
            "Debit amount must not be negative".into(),
        ));
    }
    let updated = conn.execute(
        "UPDATE users SET credit_cents = credit_cents - ?2 WHERE id=?1 AND credit_cents >= ?2",
        params![user_id, amount_cents],
    )?;
    if updated == 0 {
        // distinguishes a missing user from a short wallet
        let have = balance(conn, user_id)?;
        return Err(BookingError::InsufficientBalance {
            need_cents: amount_cents,
            have_cents: have,
        });
    }
    append(conn, user_id, TxKind::Charge, -amount_cents, meta)
}

/// Add `amount_cents` to the user's balance with a topup or refund row.
pub fn credit(
    conn: &Connection,
    user_id: i64,
    amount_cents: i64,
    kind: TxKind,
    meta: &TxMeta,
) -> Result<(), BookingError> {
    if amount_cents < 0 {
        return Err(BookingError::InvalidInput(
            "Credit amount must not be negative".into(),
        ));
    }
    if kind == TxKind::Charge {
        return Err(BookingError::InvalidInput(
            "Charges go through debit".into(),
        ));
    }
    let updated = conn.execute(
        "UPDATE users SET credit_cents = credit_cents + ?2 WHERE id=?1",
        params![user_id, amount_cents],
    )?;
    if updated == 0 {
        return Err(BookingError::UserNotFound(user_id));
    }
    append(conn, user_id, kind, amount_cents, meta)
}

/// Standalone top-up, its own atomic unit. Returns the new balance.
pub fn topup(
    conn: &mut Connection,
    user_id: i64,
    amount_cents: i64,
    note: Option<&str>,
) -> Result<i64, BookingError> {
    if amount_cents <= 0 {
        return Err(BookingError::InvalidInput(
            "Top-up amount must be positive".into(),
        ));
    }
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let meta = match note {
        Some(n) => TxMeta::note(n),
        None => TxMeta::default(),
    };
    credit(&tx, user_id, amount_cents, TxKind::Topup, &meta)?;
    let new_balance = balance(&tx, user_id)?;
    tx.commit()?;
    Ok(new_balance)
}

pub fn history(conn: &Connection, user_id: i64) -> Result<Vec<WalletTransaction>, BookingError> {
    balance(conn, user_id)?;
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, amount_cents, meta, created_at FROM wallet_transactions
         WHERE user_id=?1 ORDER BY id DESC",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok(WalletTransaction {
            id: r.get(0)?,
            user_id: r.get(1)?,
            kind: r.get(2)?,
            amount_cents: r.get(3)?,
            meta: r.get(4)?,
            created_at: r.get(5)?,
        })
    })?;
    let mut out = Vec::new();
    for t in rows {
        out.push(t?);
    }
    Ok(out)
}

static VISA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^4\d{12,18}$").expect("static pattern"));
static MASTERCARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(5[1-5]|2(2[2-9]|[3-6]\d|7[01]|720))\d{14}$").expect("static pattern")
});

pub fn detect_brand(pan: &str) -> &'static str {
    if VISA.is_match(pan) {
        "VISA"
    } else if MASTERCARD.is_match(pan) {
        "MASTERCARD"
    } else {
        "CARD"
    }
}

pub fn mask_pan(pan: &str) -> String {
    let tail: String = pan
        .chars()
        .skip(pan.chars().count().saturating_sub(4))
        .collect();
    format!("**** **** **** {}", tail)
}

/// Cards are kept for display only; the full PAN is never persisted.
pub fn add_card(
    conn: &Connection,
    user_id: i64,
    holder: &str,
    pan: &str,
    exp_month: i64,
    exp_year: i64,
) -> Result<PaymentCard, BookingError> {
    balance(conn, user_id)?;
    let holder = holder.trim();
    if holder.is_empty() {
        return Err(BookingError::InvalidInput(
            "Card holder must not be empty".into(),
        ));
    }
    let digits: String = pan.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 12 || digits.len() > 19 {
        return Err(BookingError::InvalidInput(
            "Card number must be 12-19 digits".into(),
        ));
    }
    if !(1..=12).contains(&exp_month) {
        return Err(BookingError::InvalidInput(
            "Expiry month must be between 1 and 12".into(),
        ));
    }
    let now = Utc::now();
    if exp_year < i64::from(now.year())
        || (exp_year == i64::from(now.year()) && exp_month < i64::from(now.month()))
    {
        return Err(BookingError::InvalidInput("Card is expired".into()));
    }
    let masked = mask_pan(&digits);
    let brand = detect_brand(&digits);
    conn.execute(
        "INSERT INTO payment_cards(user_id, holder, masked_pan, brand, exp_month, exp_year)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![user_id, holder, masked, brand, exp_month, exp_year],
    )?;
    Ok(PaymentCard {
        id: conn.last_insert_rowid(),
        user_id,
        holder: holder.to_string(),
        masked_pan: masked,
        brand: brand.to_string(),
        exp_month,
        exp_year,
    })
}

pub fn list_cards(conn: &Connection, user_id: i64) -> Result<Vec<PaymentCard>, BookingError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, holder, masked_pan, brand, exp_month, exp_year
         FROM payment_cards WHERE user_id=?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok(PaymentCard {
            id: r.get(0)?,
            user_id: r.get(1)?,
            holder: r.get(2)?,
            masked_pan: r.get(3)?,
            brand: r.get(4)?,
            exp_month: r.get(5)?,
            exp_year: r.get(6)?,
        })
    })?;
    let mut out = Vec::new();
    for c in rows {
        out.push(c?);
    }
    Ok(out)
}
