// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod booking;
pub mod cli;
pub mod commands;
pub mod coupons;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod seats;
pub mod trips;
pub mod utils;
pub mod wallet;
