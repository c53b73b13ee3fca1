use std::{fs, path::PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use roster::{
    calendar::{
        clock::{Clock, FixedClock, SystemClock},
        window::{format_birthday, Horizon},
    },
    consts::consts::EntityId,
    diagnostics::{log_sink, LogSink},
    import::importer::{import_rows, parse_iso_date, rows_from_json, ImportError, ImportMode},
    model::employee::NewEmployee,
    store::{
        options::StoreOptions,
        store::{RosterStore, StoreResponse},
    },
};

/// 🎂 Birthday roster, keeps track of employee birthdays and who is celebrating soon
#[derive(Parser, Debug)]
struct Cli {
    /// Location of the roster. Reads / writes to this directory. Note: Does not support shell paths, e.g. ~
    #[clap(short, long, default_value = "data", global = true)]
    data: PathBuf,

    /// Overrides today's date, YYYY-MM-DD
    #[clap(long, global = true, value_parser = parse_date)]
    today: Option<NaiveDate>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Adds an employee to the roster
    Add {
        name: String,
        /// YYYY-MM-DD
        #[clap(value_parser = parse_date)]
        birthday: NaiveDate,
    },
    /// Removes an employee by id, unknown ids are ignored
    Remove { id: String },
    /// Lists the roster in the order employees were added
    List,
    /// Shows whose birthday is today
    Today,
    /// Shows birthdays coming up, one month ahead unless told otherwise
    Upcoming {
        #[clap(long, conflicts_with = "months")]
        days: Option<u32>,

        #[clap(long)]
        months: Option<u32>,
    },
    /// Imports rows exported from a spreadsheet as a JSON array of objects
    Import {
        file: PathBuf,

        /// Overwrite the roster instead of adding to it
        #[clap(long)]
        replace: bool,
    },
    /// Removes every employee and the persisted data
    Reset,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    parse_iso_date(value).map_err(|e| e.to_string())
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Cli::parse();

    log::debug!("Command: {:?}", args.command);

    let clock: Box<dyn Clock> = match args.today {
        Some(date) => Box::new(FixedClock(date)),
        None => Box::new(SystemClock),
    };

    let today = clock.today();

    let options = StoreOptions::default().set_data_directory(args.data);

    let mut store = RosterStore::open(options, log_sink());

    match args.command {
        Command::Add { name, birthday } => {
            let response = store.add(NewEmployee::new(name, birthday))?;
            let employee = report_warning(response);

            println!("Added {} ({})", employee.name, employee.id);
        }
        Command::Remove { id } => {
            match report_warning(store.remove(&EntityId(id.clone()))) {
                Some(employee) => println!("Removed {} ({})", employee.name, employee.id),
                None => println!("No employee with id {}", id),
            }
        }
        Command::List => {
            for employee in store.employees() {
                println!(
                    "{}  {}  {}",
                    employee.id,
                    employee.birthday.format("%Y-%m-%d"),
                    employee.name
                );
            }
        }
        Command::Today => {
            let todays = store.todays_birthdays(today);

            let leap_day = store
                .upcoming_birthdays(today, Horizon::Days(0))
                .into_iter()
                .filter(|birthday| birthday.is_leap_day_fallback())
                .map(|birthday| birthday.employee)
                .collect::<Vec<_>>();

            if todays.is_empty() && leap_day.is_empty() {
                println!("No birthdays today");
            }

            for employee in todays {
                println!("🎉 {}", employee.name);
            }

            // Feb 29 birthdays are observed on Feb 28 in non-leap years
            for employee in leap_day {
                println!("🎉 {} (born on Feb 29)", employee.name);
            }
        }
        Command::Upcoming { days, months } => {
            let horizon = match (days, months) {
                (Some(days), _) => Horizon::Days(days),
                (None, Some(months)) => Horizon::Months(months),
                (None, None) => Horizon::default(),
            };

            let upcoming = store.upcoming_birthdays(today, horizon);

            if upcoming.is_empty() {
                println!("No upcoming birthdays");
            }

            for birthday in upcoming {
                let when = match birthday.days_until {
                    0 if birthday.is_leap_day_fallback() => "today, born on Feb 29".to_string(),
                    0 => "today".to_string(),
                    1 => "tomorrow".to_string(),
                    n => format!("in {} days", n),
                };

                println!(
                    "{}  {}  ({})",
                    format_birthday(birthday.next_occurrence),
                    birthday.employee.name,
                    when
                );
            }
        }
        Command::Import { file, replace } => {
            let contents = fs::read_to_string(&file)
                .with_context(|| format!("Unable to read {}", file.display()))?;

            let value: serde_json::Value = serde_json::from_str(&contents)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;

            let rows = rows_from_json(&value)?;

            let report = match import_rows(&rows, &LogSink) {
                Ok(report) => report,
                // Nothing usable in the file, the roster is left alone
                Err(err @ ImportError::NoValidRecords { .. }) => {
                    eprintln!("{}", err);
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            let dropped = report.dropped_count();

            let mode = match replace {
                true => ImportMode::Replace,
                false => ImportMode::Append,
            };

            let imported = report_warning(store.import(report, mode)?);

            println!("Imported {} employees, skipped {} rows", imported, dropped);
        }
        Command::Reset => {
            report_warning(store.reset());

            println!("Roster cleared");
        }
    }

    Ok(())
}

/// Persistence problems never fail a command, the user is told and we carry on
fn report_warning<T>(response: StoreResponse<T>) -> T {
    if let Some(warning) = &response.warning {
        eprintln!("warning: {}", warning);
    }

    response.result
}
