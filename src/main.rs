//! `meetup`: preview page behaviors without a browser.
//!
//! Shows what the countdown displays at a given moment, checks a
//! registration field value the way the page does, and prints the JSON
//! Schema of the page options.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use meetup::countdown::{self, Cadence};
use meetup::form::{validate, FieldKind};
use meetup::{MeetupError, PageOptions};

#[derive(Parser)]
#[command(name = "meetup")]
#[command(version, about = "Preview the meetup page behaviors")]
struct Cli {
    /// Options file (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    options: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the countdown text and refresh cadence
    Countdown {
        /// Moment to evaluate (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Validate one registration field value
    Validate {
        /// Field name (`email`, `firstName`, `lastName`, ...)
        name: String,
        /// Value as typed
        value: String,
        /// Treat the field as optional
        #[arg(long)]
        optional: bool,
    },
    /// Print the options JSON Schema
    Schema,
}

fn run(cli: Cli) -> Result<bool, MeetupError> {
    let options = match &cli.options {
        Some(path) => PageOptions::load(path)?,
        None => PageOptions::default(),
    };
    let mut out = io::stdout().lock();

    match cli.command {
        Command::Countdown { at } => {
            let now = at.unwrap_or_else(Utc::now);
            let opts = &options.countdown;
            writeln!(out, "{}", countdown::render(opts, now))?;
            if let Ok(left) = (opts.target.with_timezone(&Utc) - now).to_std() {
                let cadence = Cadence::for_remaining(left, opts);
                let period = cadence.period(opts).as_secs();
                writeln!(out, "refresh: every {period}s ({cadence:?})")?;
            }
            Ok(true)
        }
        Command::Validate {
            name,
            value,
            optional,
        } => {
            let kind = FieldKind::from_name(Some(name.as_str()));
            match validate(&value, kind, !optional) {
                Ok(()) => {
                    writeln!(out, "ok")?;
                    Ok(true)
                }
                Err(e) => {
                    writeln!(out, "{}", e.message(&options.form.messages))?;
                    Ok(false)
                }
            }
        }
        Command::Schema => {
            let schema = PageOptions::json_schema();
            let json = serde_json::to_string_pretty(&schema)
                .map_err(|e| MeetupError::OptionsParse(e.to_string()))?;
            writeln!(out, "{json}")?;
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(2)
        }
    }
}
