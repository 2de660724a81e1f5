// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{crate_version, value_parser, Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

fn user_arg() -> Arg {
    Arg::new("user")
        .long("user")
        .value_name("EMAIL")
        .required(true)
        .help("User email")
}

pub fn build_cli() -> Command {
    Command::new("peron")
        .about("Intercity bus seat booking, prepaid wallet, and ticketing")
        .version(crate_version!())
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .value_name("PATH")
                .help("SQLite database path (defaults to the platform data dir)"),
        )
        .subcommand(Command::new("init").about("Create the database and schema"))
        .subcommand(company_cmd())
        .subcommand(user_cmd())
        .subcommand(trip_cmd())
        .subcommand(coupon_cmd())
        .subcommand(wallet_cmd())
        .subcommand(ticket_cmd())
        .subcommand(export_cmd())
        .subcommand(Command::new("seed").about("Load demo companies, trips, users, and a coupon"))
        .subcommand(Command::new("doctor").about("Audit stored data against the core invariants"))
}

fn company_cmd() -> Command {
    Command::new("company")
        .about("Manage bus companies")
        .subcommand(
            Command::new("add").about("Add a company").arg(
                Arg::new("name")
                    .long("name")
                    .required(true)
                    .help("Company name"),
            ),
        )
        .subcommand(Command::new("list").about("List companies"))
        .subcommand(
            Command::new("rename")
                .about("Rename a company")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("to").long("to").required(true).help("New name")),
        )
        .subcommand(
            Command::new("rm")
                .about("Remove a company and its trips")
                .arg(Arg::new("name").long("name").required(true)),
        )
}

fn user_cmd() -> Command {
    Command::new("user")
        .about("Manage passenger accounts")
        .subcommand(
            Command::new("add")
                .about("Register a user")
                .arg(
                    Arg::new("email")
                        .long("email")
                        .required(true)
                        .help("Unique email"),
                )
                .arg(
                    Arg::new("gender")
                        .long("gender")
                        .value_name("male|female")
                        .help("Optional; used for the seat-adjacency rule"),
                ),
        )
        .subcommand(json_flags(Command::new("list").about("List users")))
        .subcommand(
            Command::new("show")
                .about("Show one user")
                .arg(Arg::new("email").long("email").required(true)),
        )
}

fn trip_cmd() -> Command {
    Command::new("trip")
        .about("Manage and search trips")
        .subcommand(
            Command::new("add")
                .about("Schedule a trip")
                .arg(
                    Arg::new("company")
                        .long("company")
                        .required(true)
                        .help("Operating company name"),
                )
                .arg(Arg::new("from").long("from").required(true).help("Origin"))
                .arg(
                    Arg::new("to")
                        .long("to")
                        .required(true)
                        .help("Destination"),
                )
                .arg(
                    Arg::new("departure")
                        .long("departure")
                        .required(true)
                        .help("Departure time, 'YYYY-MM-DD HH:MM' (UTC)"),
                )
                .arg(
                    Arg::new("price")
                        .long("price")
                        .required(true)
                        .help("Seat price in lira, e.g. 850.00"),
                )
                .arg(
                    Arg::new("seats")
                        .long("seats")
                        .required(true)
                        .value_parser(value_parser!(i64))
                        .help("Seat count"),
                ),
        )
        .subcommand(
            Command::new("update")
                .about("Edit a trip that has no active tickets")
                .arg(
                    Arg::new("id")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                )
                .arg(Arg::new("from").long("from"))
                .arg(Arg::new("to").long("to"))
                .arg(Arg::new("departure").long("departure"))
                .arg(Arg::new("price").long("price"))
                .arg(
                    Arg::new("seats")
                        .long("seats")
                        .value_parser(value_parser!(i64)),
                ),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a trip that has no active tickets")
                .arg(
                    Arg::new("id")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                ),
        )
        .subcommand(json_flags(
            Command::new("list")
                .about("List trips")
                .arg(Arg::new("company").long("company").help("Filter by company name")),
        ))
        .subcommand(json_flags(
            Command::new("search")
                .about("Search upcoming departures")
                .arg(Arg::new("from").long("from").help("Origin substring"))
                .arg(Arg::new("to").long("to").help("Destination substring"))
                .arg(Arg::new("date").long("date").help("Departure day, YYYY-MM-DD")),
        ))
        .subcommand(
            Command::new("seats")
                .about("Show the seat map of a trip")
                .arg(
                    Arg::new("id")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                ),
        )
}

fn coupon_cmd() -> Command {
    Command::new("coupon")
        .about("Manage discount coupons")
        .subcommand(
            Command::new("add")
                .about("Create a coupon")
                .arg(Arg::new("code").long("code").required(true))
                .arg(
                    Arg::new("percent")
                        .long("percent")
                        .required(true)
                        .value_parser(value_parser!(i64))
                        .help("Discount percent, 1-100"),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .required(true)
                        .value_parser(value_parser!(i64))
                        .help("Total redemptions allowed"),
                )
                .arg(
                    Arg::new("expires")
                        .long("expires")
                        .required(true)
                        .help("Expiry time, 'YYYY-MM-DD HH:MM' (UTC)"),
                ),
        )
        .subcommand(
            Command::new("update")
                .about("Edit a coupon")
                .arg(Arg::new("code").long("code").required(true))
                .arg(
                    Arg::new("percent")
                        .long("percent")
                        .value_parser(value_parser!(i64)),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(i64)),
                )
                .arg(Arg::new("expires").long("expires")),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a coupon")
                .arg(Arg::new("code").long("code").required(true)),
        )
        .subcommand(json_flags(Command::new("list").about("List coupons")))
        .subcommand(
            Command::new("show")
                .about("Show one coupon and its remaining uses")
                .arg(Arg::new("code").long("code").required(true)),
        )
}

fn wallet_cmd() -> Command {
    Command::new("wallet")
        .about("Prepaid wallet: balance, top-ups, history, cards")
        .subcommand(
            Command::new("topup")
                .about("Add funds")
                .arg(user_arg())
                .arg(
                    Arg::new("amount")
                        .long("amount")
                        .required(true)
                        .help("Amount in lira, e.g. 850.00"),
                )
                .arg(Arg::new("note").long("note")),
        )
        .subcommand(Command::new("balance").about("Show the balance").arg(user_arg()))
        .subcommand(json_flags(
            Command::new("history")
                .about("Show the ledger, newest first")
                .arg(user_arg()),
        ))
        .subcommand(
            Command::new("add-card")
                .about("Store a card for display (the full number is never kept)")
                .arg(user_arg())
                .arg(Arg::new("holder").long("holder").required(true))
                .arg(Arg::new("pan").long("pan").required(true).help("Card number"))
                .arg(
                    Arg::new("month")
                        .long("month")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                )
                .arg(
                    Arg::new("year")
                        .long("year")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                ),
        )
        .subcommand(Command::new("cards").about("List stored cards").arg(user_arg()))
}

fn ticket_cmd() -> Command {
    Command::new("ticket")
        .about("Buy, cancel, and inspect tickets")
        .subcommand(
            Command::new("buy")
                .about("Purchase a seat on a trip")
                .arg(user_arg())
                .arg(
                    Arg::new("trip")
                        .long("trip")
                        .required(true)
                        .value_parser(value_parser!(i64))
                        .help("Trip id"),
                )
                .arg(
                    Arg::new("seat")
                        .long("seat")
                        .required(true)
                        .value_parser(value_parser!(i64))
                        .help("Seat number"),
                )
                .arg(Arg::new("coupon").long("coupon").help("Optional coupon code")),
        )
        .subcommand(
            Command::new("cancel")
                .about("Cancel an active ticket (up to one hour before departure)")
                .arg(user_arg())
                .arg(
                    Arg::new("ticket")
                        .long("ticket")
                        .required(true)
                        .value_parser(value_parser!(i64))
                        .help("Ticket id"),
                ),
        )
        .subcommand(json_flags(
            Command::new("list").about("List a user's tickets").arg(user_arg()),
        ))
        .subcommand(json_flags(
            Command::new("show")
                .about("Look a ticket up by PNR")
                .arg(user_arg())
                .arg(Arg::new("pnr").long("pnr").required(true)),
        ))
}

fn export_cmd() -> Command {
    Command::new("export")
        .about("Export data to CSV or JSON")
        .subcommand(
            Command::new("tickets")
                .about("Export all tickets")
                .arg(
                    Arg::new("format")
                        .long("format")
                        .required(true)
                        .help("csv|json"),
                )
                .arg(Arg::new("out").long("out").required(true).help("Output path")),
        )
        .subcommand(
            Command::new("wallet")
                .about("Export wallet ledgers")
                .arg(
                    Arg::new("format")
                        .long("format")
                        .required(true)
                        .help("csv|json"),
                )
                .arg(Arg::new("out").long("out").required(true).help("Output path"))
                .arg(
                    Arg::new("user")
                        .long("user")
                        .value_name("EMAIL")
                        .help("Limit to one user"),
                ),
        )
}
