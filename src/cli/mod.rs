use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants;

/// A journal kept as per-date calendar files
#[derive(Parser, Debug)]
#[clap(name = "daybook", about = "A journal kept as per-date calendar files")]
#[clap(author, version, long_about = None)]
pub struct CliArgs {
    /// Data directory (defaults to DAYBOOK_DIR, then ~/Documents/daybook)
    #[clap(short = 'd', long, value_name = "DIR", global = true)]
    pub dir: Option<PathBuf>,

    /// Fail a file's load on the first malformed record instead of skipping it
    #[clap(long, global = true)]
    pub strict: bool,

    /// Create new entry files encrypted rather than plaintext
    #[clap(long, global = true)]
    pub encrypt: bool,

    /// Print verbose output
    #[clap(short = 'v', long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List entries, optionally narrowed to a year or a month
    List {
        /// Only entries from this year
        #[clap(long)]
        year: Option<i32>,
        /// Only entries from this month (requires --year)
        #[clap(long, requires = "year")]
        month: Option<u32>,
    },

    /// Print the years that have entries, newest first
    Years,

    /// Print every category in use
    Categories,

    /// Add a new entry
    Add {
        /// Filing date (YYYY-MM-DD or YYYYMMDD; defaults to today)
        #[clap(long)]
        date: Option<String>,
        /// Subject line
        #[clap(long)]
        summary: String,
        /// Entry body
        #[clap(long, default_value = "")]
        description: String,
        /// Category tag; may be repeated
        #[clap(long = "category")]
        categories: Vec<String>,
    },

    /// Delete the entry with the given uid
    Delete {
        /// Uid as shown by `list`
        uid: String,
    },

    /// Export entries to a single plaintext calendar file
    Export {
        /// Output file; `.ics` is appended when no extension is given
        #[clap(short = 'o', long)]
        output: PathBuf,
        /// Only export entries from this year
        #[clap(long)]
        year: Option<i32>,
    },

    /// Change the passphrase protecting the data directory
    Passwd,
}

/// Parse a date in YYYY-MM-DD or YYYYMMDD form.
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str, constants::DATE_FORMAT_ISO)
        .or_else(|_| NaiveDate::parse_from_str(date_str, constants::DATE_FORMAT_COMPACT))
}
