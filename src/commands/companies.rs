// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{id_for_company, pretty_table};
use anyhow::{bail, Result};
use rusqlite::{params, Connection};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim().to_string();
            if name.is_empty() {
                bail!("Company name must not be empty");
            }
            conn.execute("INSERT INTO companies(name) VALUES (?1)", params![name])?;
            println!("Added company '{}'", name);
        }
        Some(("list", _)) => {
            let mut stmt = conn.prepare(
                "SELECT c.name, c.created_at,
                        (SELECT COUNT(*) FROM trips t WHERE t.company_id=c.id)
                 FROM companies c ORDER BY c.name",
            )?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, i64>(2)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (name, created, trips) = row?;
                data.push(vec![name, trips.to_string(), created]);
            }
            println!("{}", pretty_table(&["Name", "Trips", "Created"], data));
        }
        Some(("rename", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let to = sub.get_one::<String>("to").unwrap().trim().to_string();
            if to.is_empty() {
                bail!("Company name must not be empty");
            }
            let id = id_for_company(conn, name)?;
            conn.execute(
                "UPDATE companies SET name=?2 WHERE id=?1",
                params![id, to],
            )?;
            println!("Renamed company '{}' to '{}'", name, to);
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = id_for_company(conn, name)?;
            let active: i64 = conn.query_row(
                "SELECT COUNT(*) FROM tickets t JOIN trips r ON t.trip_id=r.id
                 WHERE r.company_id=?1 AND t.status='active'",
                params![id],
                |r| r.get(0),
            )?;
            if active > 0 {
                bail!("Company '{}' has trips with active tickets", name);
            }
            conn.execute("DELETE FROM companies WHERE id=?1", params![id])?;
            println!("Removed company '{}'", name);
        }
        _ => {}
    }
    Ok(())
}
