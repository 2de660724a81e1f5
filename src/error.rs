// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Gender;
use thiserror::Error;

/// Failure modes of the booking core. Every variant carries a message fit to
/// show the end user; `kind()` classifies variants for callers that branch on
/// category instead.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Trip {0} not found")]
    TripNotFound(i64),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Ticket not found or not cancellable")]
    TicketNotFound,

    #[error("Seat {seat} is out of range (this trip has seats 1-{seat_count})")]
    InvalidSeat { seat: i64, seat_count: i64 },

    #[error("Seat {0} is already taken")]
    SeatTaken(i64),

    #[error("The adjacent seat is held by a {0} passenger; please pick another seat")]
    GenderConflict(Gender),

    #[error("Coupon code is invalid, expired, or exhausted")]
    CouponInvalid,

    #[error("This coupon has already been used on this account")]
    CouponAlreadyUsed,

    #[error("Coupon usage limit has been reached")]
    CouponExhausted,

    #[error(
        "Insufficient balance: the ticket costs {} but the wallet holds {}",
        crate::utils::fmt_money(*.need_cents),
        crate::utils::fmt_money(*.have_cents)
    )]
    InsufficientBalance { need_cents: i64, have_cents: i64 },

    #[error("Less than one hour to departure; this ticket can no longer be cancelled")]
    CancellationWindowClosed,

    #[error("Trip has active tickets")]
    TripInUse,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Conflict,
    InsufficientBalance,
    WindowClosed,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::WindowClosed => "window_closed",
            ErrorKind::Storage => "storage",
        }
    }
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::TripNotFound(_)
            | BookingError::UserNotFound(_)
            | BookingError::TicketNotFound => ErrorKind::NotFound,
            BookingError::InvalidSeat { .. }
            | BookingError::CouponInvalid
            | BookingError::InvalidInput(_) => ErrorKind::InvalidInput,
            BookingError::SeatTaken(_)
            | BookingError::GenderConflict(_)
            | BookingError::CouponAlreadyUsed
            | BookingError::CouponExhausted
            | BookingError::TripInUse => ErrorKind::Conflict,
            BookingError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            BookingError::CancellationWindowClosed => ErrorKind::WindowClosed,
            BookingError::Storage(_) | BookingError::Json(_) => ErrorKind::Storage,
        }
    }

    /// Whether the failed unit may be retried as-is. Only storage-level
    /// failures qualify; business rejections are deterministic.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }
}

/// True for UNIQUE and PRIMARY KEY constraint violations, so callers can map
/// them to their business meaning instead of surfacing a raw storage error.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
