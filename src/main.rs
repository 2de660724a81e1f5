// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use peron::{cli, commands, db};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("peron=info")),
        )
        .with_target(false)
        .init();

    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let db_override: Option<PathBuf> = matches
        .get_one::<String>("db")
        .map(|p| Path::new(p).to_path_buf());
    let mut conn = match &db_override {
        Some(path) => db::open_at(path)?,
        None => db::open_or_init()?,
    };

    match matches.subcommand() {
        Some(("init", _)) => {
            let shown = match &db_override {
                Some(path) => path.clone(),
                None => db::db_path()?,
            };
            println!("Database initialized at {}", shown.display());
        }
        Some(("company", sub)) => commands::companies::handle(&conn, sub)?,
        Some(("user", sub)) => commands::users::handle(&conn, sub)?,
        Some(("trip", sub)) => commands::trips::handle(&mut conn, sub)?,
        Some(("coupon", sub)) => commands::coupons::handle(&conn, sub)?,
        Some(("wallet", sub)) => commands::wallet::handle(&mut conn, sub)?,
        Some(("ticket", sub)) => commands::tickets::handle(&mut conn, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, sub)?,
        Some(("seed", _)) => commands::seeder::handle(&mut conn)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
