// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{is_unique_violation, BookingError};
use crate::models::Coupon;

/// Outcome of pricing a purchase: the amount to charge and the coupon that
/// produced it, if any.
#[derive(Debug, Clone, Copy)]
pub struct Pricing {
    pub final_price_cents: i64,
    pub coupon_id: Option<i64>,
}

/// Codes are stored and matched trimmed and uppercased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn map_coupon(r: &rusqlite::Row) -> rusqlite::Result<Coupon> {
    Ok(Coupon {
        id: r.get(0)?,
        code: r.get(1)?,
        percent: r.get(2)?,
        usage_limit: r.get(3)?,
        used_count: r.get(4)?,
        expires_at: r.get(5)?,
    })
}

const COUPON_COLS: &str = "id, code, percent, usage_limit, used_count, expires_at";

pub fn find_by_code(conn: &Connection, code: &str) -> Result<Option<Coupon>, BookingError> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM coupons WHERE code=?1", COUPON_COLS))?;
    Ok(stmt
        .query_row(params![normalize_code(code)], map_coupon)
        .optional()?)
}

pub fn list(conn: &Connection) -> Result<Vec<Coupon>, BookingError> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM coupons ORDER BY code", COUPON_COLS))?;
    let rows = stmt.query_map([], map_coupon)?;
    let mut out = Vec::new();
    for c in rows {
        out.push(c?);
    }
    Ok(out)
}

/// Whether the coupon can still be applied at all (ignoring per-user state).
pub fn is_redeemable(coupon: &Coupon, now: DateTime<Utc>) -> bool {
    now < coupon.expires_at && coupon.used_count < coupon.usage_limit
}

/// Discounted price in cents, rounded half-up.
fn discounted(base_price_cents: i64, percent: i64) -> Result<i64, BookingError> {
    let price = Decimal::from(base_price_cents) * Decimal::from(100 - percent) / Decimal::from(100);
    price
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| BookingError::InvalidInput(format!("Price {} out of range", price)))
}

/// Price a purchase of `base_price_cents` for `user_id` under an optional
/// coupon code. A missing or blank code prices at base and is not an error.
/// A supplied code that cannot be applied is a hard failure; the purchase
/// must not silently proceed at base price.
pub fn price_with_coupon(
    conn: &Connection,
    user_id: i64,
    base_price_cents: i64,
    code: Option<&str>,
) -> Result<Pricing, BookingError> {
    let code = match code {
        Some(c) if !c.trim().is_empty() => normalize_code(c),
        _ => {
            return Ok(Pricing {
                final_price_cents: base_price_cents,
                coupon_id: None,
            });
        }
    };
    let coupon = find_by_code(conn, &code)?.ok_or(BookingError::CouponInvalid)?;
    if !is_redeemable(&coupon, Utc::now()) {
        return Err(BookingError::CouponInvalid);
    }
    let redeemed: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM coupon_redemptions WHERE coupon_id=?1 AND user_id=?2",
            params![coupon.id, user_id],
            |r| r.get(0),
        )
        .optional()?;
    if redeemed.is_some() {
        return Err(BookingError::CouponAlreadyUsed);
    }
    Ok(Pricing {
        final_price_cents: discounted(base_price_cents, coupon.percent)?,
        coupon_id: Some(coupon.id),
    })
}

/// Consume one use of the coupon for this user. Must run inside the same
/// transaction as the purchase it pays for. The conditional increment holds
/// the global cap and the redemption row's uniqueness holds the per-user cap,
/// independently of what `price_with_coupon` read earlier.
pub fn redeem(conn: &Connection, coupon_id: i64, user_id: i64) -> Result<(), BookingError> {
    let bumped = conn.execute(
        "UPDATE coupons SET used_count = used_count + 1 WHERE id=?1 AND used_count < usage_limit",
        params![coupon_id],
    )?;
    if bumped == 0 {
        return Err(BookingError::CouponExhausted);
    }
    match conn.execute(
        "INSERT INTO coupon_redemptions(coupon_id, user_id, redeemed_at) VALUES (?1, ?2, ?3)",
        params![coupon_id, user_id, Utc::now()],
    ) {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(BookingError::CouponAlreadyUsed),
        Err(e) => Err(e.into()),
    }
}

fn validate(percent: i64, usage_limit: i64) -> Result<(), BookingError> {
    if !(1..=100).contains(&percent) {
        return Err(BookingError::InvalidInput(
            "Discount percent must be between 1 and 100".into(),
        ));
    }
    if usage_limit < 1 {
        return Err(BookingError::InvalidInput(
            "Usage limit must be at least 1".into(),
        ));
    }
    Ok(())
}

pub fn create(
    conn: &Connection,
    code: &str,
    percent: i64,
    usage_limit: i64,
    expires_at: DateTime<Utc>,
) -> Result<i64, BookingError> {
    let code = normalize_code(code);
    if code.is_empty() {
        return Err(BookingError::InvalidInput(
            "Coupon code must not be empty".into(),
        ));
    }
    validate(percent, usage_limit)?;
    if expires_at <= Utc::now() {
        return Err(BookingError::InvalidInput(
            "Expiry must be in the future".into(),
        ));
    }
    match conn.execute(
        "INSERT INTO coupons(code, percent, usage_limit, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![code, percent, usage_limit, expires_at],
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => Err(BookingError::InvalidInput(format!(
            "Coupon code '{}' already exists",
            code
        ))),
        Err(e) => Err(e.into()),
    }
}

pub fn update(
    conn: &Connection,
    coupon_id: i64,
    percent: i64,
    usage_limit: i64,
    expires_at: DateTime<Utc>,
) -> Result<(), BookingError> {
    validate(percent, usage_limit)?;
    let used: i64 = conn
        .query_row(
            "SELECT used_count FROM coupons WHERE id=?1",
            params![coupon_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| BookingError::InvalidInput(format!("Coupon {} not found", coupon_id)))?;
    if usage_limit < used {
        return Err(BookingError::InvalidInput(format!(
            "Usage limit cannot drop below the current used count ({})",
            used
        )));
    }
    conn.execute(
        "UPDATE coupons SET percent=?2, usage_limit=?3, expires_at=?4 WHERE id=?1",
        params![coupon_id, percent, usage_limit, expires_at],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, coupon_id: i64) -> Result<(), BookingError> {
    let removed = conn.execute("DELETE FROM coupons WHERE id=?1", params![coupon_id])?;
    if removed == 0 {
        return Err(BookingError::InvalidInput(format!(
            "Coupon {} not found",
            coupon_id
        )));
    }
    Ok(())
}
