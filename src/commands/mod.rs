// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod companies;
pub mod users;
pub mod trips;
pub mod coupons;
pub mod wallet;
pub mod tickets;
pub mod exporter;
pub mod seeder;
pub mod doctor;
