//! CLI smoke entry point.
//!
//! Usage: `habitcal_cli [DB_PATH] [YYYY-MM]`
//!
//! Opens (or creates) a calendar database and prints the overview of one
//! month. Without a path an empty in-memory database is used.
//! Set `HABITCAL_LOG_DIR` to an absolute directory to enable file logs.

use chrono::{Datelike, Local};
use habitcal_core::{
    default_log_level, init_logging, CalendarMonth, CalendarService, DayCell, LoggingConfig,
    SqliteHabitStore,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Some(log_dir) = std::env::var_os("HABITCAL_LOG_DIR") {
        let started = LoggingConfig::new(default_log_level(), log_dir)
            .and_then(|config| init_logging(&config));
        if let Err(err) = started {
            eprintln!("logging disabled: {err}");
        }
    }

    let mut args = std::env::args().skip(1);
    let db_path = args.next();
    let month = match args.next() {
        Some(text) => match CalendarMonth::parse(&text) {
            Some(month) => month,
            None => {
                eprintln!("invalid month `{text}`, expected YYYY-MM");
                return ExitCode::FAILURE;
            }
        },
        None => CalendarMonth::of(Local::now().date_naive()),
    };

    let opened = match db_path.as_deref() {
        Some(path) => SqliteHabitStore::open(path),
        None => SqliteHabitStore::open_in_memory(),
    };
    let store = match opened {
        Ok(store) => store,
        Err(err) => {
            eprintln!("failed to open database: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut service = match CalendarService::new(store) {
        Ok(service) => service,
        Err(err) => {
            eprintln!("failed to load tags: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("habitcal_core version={}", habitcal_core::core_version());
    println!("month={month} tags={}", service.tags().len());

    for (date, cell) in service.render_month(month, None) {
        if !month.contains(date) {
            continue;
        }
        match cell {
            DayCell::Overview {
                indicators,
                overflow,
            } => {
                let markers = indicators
                    .iter()
                    .map(|indicator| indicator.color.to_hex())
                    .collect::<Vec<_>>()
                    .join(" ");
                if overflow > 0 {
                    println!("{:02} {markers} +{overflow}", date.day());
                } else {
                    println!("{:02} {markers}", date.day());
                }
            }
            DayCell::Empty | DayCell::Heat { .. } | DayCell::Marked { .. } => {
                println!("{:02} -", date.day());
            }
        }
    }

    ExitCode::SUCCESS
}
