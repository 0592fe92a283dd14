use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    aggregate::{Dimension, Flag},
    config::{MalformedPolicy, SourceConfig, parse_delimiter},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Segment customer transactions and summarise churn risk", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print headline counts, averages and the predicted churn rate
    Summary(SummaryArgs),
    /// Print every dashboard aggregate for the selected segment
    Report(ReportArgs),
    /// Count customers across two segment dimensions
    Crosstab(CrosstabArgs),
    /// Percentage of customers with a flag set, per group
    Rates(RatesArgs),
    /// Export customers predicted to churn as CSV
    HighRisk(HighRiskArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Semicolon-delimited transaction export to load
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML file with delimiter/encoding/malformed settings
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|'; defaults to ';')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// How to treat rows whose CustomerID or 0/1 flags cannot be parsed
    #[arg(long, value_enum)]
    pub malformed: Option<MalformedPolicy>,
}

impl SourceArgs {
    pub fn overrides(&self) -> SourceConfig {
        SourceConfig {
            delimiter: self.delimiter.map(|d| (d as char).to_string()),
            encoding: self.input_encoding.clone(),
            malformed: self.malformed,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Country to include (repeat for several); omit for all, pass an empty
    /// value to select none. Names are taken whole, commas included.
    #[arg(long = "country", action = clap::ArgAction::Append)]
    pub countries: Option<Vec<String>>,
    /// Age groups to include (e.g. `18-30,>71`)
    #[arg(long = "age-group", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub age_groups: Option<Vec<String>>,
    /// Risk categories to include (`High Risk`, `Low Risk`)
    #[arg(long = "risk", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub risk_categories: Option<Vec<String>>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Emit JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CrosstabArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Dimension listed down the rows
    #[arg(long = "rows", value_enum, default_value = "age-group")]
    pub rows: Dimension,
    /// Dimension listed across the columns
    #[arg(long = "cols", value_enum, default_value = "gender")]
    pub cols: Dimension,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RatesArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Dimension to group by
    #[arg(long = "by", value_enum, default_value = "age-group")]
    pub by: Dimension,
    /// Flag whose rate is reported
    #[arg(long, value_enum, default_value = "predicted-churn")]
    pub flag: Flag,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct HighRiskArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output CSV file (stdout if omitted or `-`)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Render TotalPrice as currency text (`$1,234.50`)
    #[arg(long)]
    pub currency: bool,
}
