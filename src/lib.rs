pub mod aggregate;
pub mod binning;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod filter;
pub mod io_utils;
pub mod normalize;
pub mod segments;
pub mod table;

use std::{
    env,
    sync::{Arc, OnceLock},
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    aggregate::{GroupRate, ScalarSummary},
    cache::TableCache,
    cli::{Cli, Commands, FilterArgs, SourceArgs},
    config::SourceConfig,
    dashboard::{Snapshot, format_count, format_currency, format_pct},
    export::PriceFormat,
    filter::{SegmentFilter, parse_facet},
    segments::NormalizedTable,
};

pub use crate::{
    aggregate::{
        cross_tab, distribution, group_rate, high_risk_list, scalar_summary, top_risk_group,
    },
    error::PipelineError,
    filter::Segment,
    normalize::{load_path, normalize},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("churn_segments", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Summary(args) => {
            let table = load_table(&args.source)?;
            let filter = build_filter(&args.filters)?;
            let segment = filter.apply(&table);
            let summary = aggregate::scalar_summary(&segment);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
            Ok(())
        }
        Commands::Report(args) => {
            let table = load_table(&args.source)?;
            let filter = build_filter(&args.filters)?;
            let snapshot = Snapshot::compute(&filter.apply(&table));
            if args.json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_report(&snapshot);
            }
            Ok(())
        }
        Commands::Crosstab(args) => {
            let table = load_table(&args.source)?;
            let filter = build_filter(&args.filters)?;
            let crosstab = aggregate::cross_tab(&filter.apply(&table), args.rows, args.cols);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&crosstab)?);
            } else {
                print_crosstab(&crosstab);
            }
            Ok(())
        }
        Commands::Rates(args) => {
            let table = load_table(&args.source)?;
            let filter = build_filter(&args.filters)?;
            let rates = aggregate::group_rate(&filter.apply(&table), args.by, args.flag);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rates)?);
            } else {
                print_rates(&args.by.to_string(), &rates);
                if let Some(top) = aggregate::top_risk_group(&rates) {
                    println!("Top group: {} ({})", top.group, format_pct(top.rate_pct));
                }
            }
            Ok(())
        }
        Commands::HighRisk(args) => {
            let table = load_table(&args.source)?;
            let filter = build_filter(&args.filters)?;
            let entries = aggregate::high_risk_list(&filter.apply(&table));
            let price_format = if args.currency {
                PriceFormat::Currency
            } else {
                PriceFormat::Numeric
            };
            let writer = io_utils::open_output(args.output.as_deref())?;
            export::write_high_risk_csv(&entries, writer, price_format)?;
            info!("Exported {} high-risk customer(s)", entries.len());
            Ok(())
        }
    }
}

fn load_table(args: &SourceArgs) -> Result<Arc<NormalizedTable>> {
    let file_config = match &args.config {
        Some(path) => SourceConfig::load(path)?,
        None => SourceConfig::default(),
    };
    let options = file_config
        .merge(args.overrides())
        .resolve()
        .context("Resolving source options")?;
    info!(
        "Reading '{}' with delimiter '{}' ({})",
        args.input.display(),
        printable_delimiter(options.delimiter),
        options.encoding.name()
    );
    let table = TableCache::global().load(&args.input, &options)?;
    debug!("Load report: {:?}", table.report());
    Ok(table)
}

fn build_filter(args: &FilterArgs) -> Result<SegmentFilter> {
    Ok(SegmentFilter {
        countries: parse_facet(args.countries.as_deref())?,
        age_groups: parse_facet(args.age_groups.as_deref()).context("Parsing --age-group")?,
        risk_categories: parse_facet(args.risk_categories.as_deref())
            .context("Parsing --risk")?,
    })
}

fn print_summary(summary: &ScalarSummary) {
    let headers = vec!["Metric".to_string(), "Value".to_string()];
    let rows = [
        ("Total clients", format_count(summary.count)),
        ("Male", format_count(summary.male_count)),
        ("Female", format_count(summary.female_count)),
        ("Avg total price", format_currency(summary.avg_total_price)),
        ("Avg recency (days)", format!("{:.0}", summary.avg_recency)),
        (
            "Predicted high risk",
            format_count(summary.predicted_high_risk_count),
        ),
        (
            "Predicted churn rate",
            format_pct(summary.predicted_churn_rate_pct),
        ),
    ]
    .into_iter()
    .map(|(label, value)| vec![label.to_string(), value])
    .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
}

fn print_crosstab(crosstab: &aggregate::CrossTab) {
    let mut headers = vec![crosstab.row_dimension.to_string()];
    headers.extend(crosstab.columns.iter().cloned());
    let rows = crosstab
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![row.value.clone()];
            cells.extend(row.counts.iter().map(|c| c.to_string()));
            cells
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
}

fn print_rates(group_header: &str, rates: &[GroupRate]) {
    let headers = vec![
        group_header.to_string(),
        "Members".to_string(),
        "Rate".to_string(),
    ];
    let rows = rates
        .iter()
        .map(|rate| {
            vec![
                rate.group.clone(),
                rate.members.to_string(),
                format_pct(rate.rate_pct),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
}

fn print_shares(header: &str, shares: &[aggregate::Share]) {
    let headers = vec![header.to_string(), "Count".to_string(), "Share".to_string()];
    let rows = shares
        .iter()
        .map(|share| {
            vec![
                share.value.clone(),
                share.count.to_string(),
                format_pct(share.pct),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
}

fn print_report(snapshot: &Snapshot) {
    print_summary(&snapshot.summary);
    println!();
    print_crosstab(&snapshot.age_by_gender);
    println!();
    print_shares("Income_Group", &snapshot.income_distribution);
    println!();
    print_shares("Credit_Score", &snapshot.credit_distribution);
    println!();
    print_shares("Risk_Category", &snapshot.risk_distribution);
    println!();
    print_rates("Age_Group", &snapshot.churn_by_age);
    println!();
    print_rates("Income_Group", &snapshot.churn_by_income);
    println!();
    for line in snapshot.insights() {
        println!("{line}");
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
