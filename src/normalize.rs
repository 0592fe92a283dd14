//! Loader and normaliser: raw export rows to an immutable segmented table.
//!
//! The pipeline runs in a fixed order because later steps depend on earlier
//! ones:
//!
//! 1. Headers are trimmed and checked for the required columns.
//! 2. Each row must match the header width and decode in the configured
//!    encoding. It is then coerced: `CustomerID`, `Churn` and
//!    `Predicted_Churn` must parse, while the numeric measures fall back to
//!    "missing" when they do not.
//! 3. Rows without a usable `Recency` are dropped.
//! 4. Age edges are derived from the remaining `Recency` maximum and rows
//!    outside them are dropped.
//! 5. Income and credit bins are fitted once over what is left.
//!
//! Every exclusion is counted in the [`LoadReport`] and logged.

use std::{collections::HashSet, io::Read, path::Path};

use encoding_rs::Encoding;
use log::{debug, info, warn};

use crate::{
    binning::{AgeEdges, EQUAL_WIDTH_BINS, EqualWidthBins},
    config::{MalformedPolicy, SourceOptions},
    error::PipelineError,
    io_utils,
    segments::{Gender, LoadReport, NormalizedRecord, NormalizedTable, RawRecord, RiskCategory},
};

pub const CUSTOMER_ID: &str = "CustomerID";
pub const COUNTRY: &str = "Country";
pub const TOTAL_PRICE: &str = "TotalPrice";
pub const UNIT_PRICE: &str = "UnitPrice";
pub const QUANTITY: &str = "Quantity";
pub const RECENCY: &str = "Recency";
pub const CHURN: &str = "Churn";
pub const PREDICTED_CHURN: &str = "Predicted_Churn";

pub const REQUIRED_COLUMNS: [&str; 8] = [
    CUSTOMER_ID,
    COUNTRY,
    TOTAL_PRICE,
    UNIT_PRICE,
    QUANTITY,
    RECENCY,
    CHURN,
    PREDICTED_CHURN,
];

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    customer_id: usize,
    country: usize,
    total_price: usize,
    unit_price: usize,
    quantity: usize,
    recency: usize,
    churn: usize,
    predicted_churn: usize,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Result<Self, PipelineError> {
        let position = |name: &str| headers.iter().position(|h| h == name);
        let missing = REQUIRED_COLUMNS
            .iter()
            .filter(|name| position(name).is_none())
            .map(|name| name.to_string())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(PipelineError::SchemaMismatch {
                missing,
                found: headers.to_vec(),
            });
        }
        let index = |name: &str| position(name).unwrap_or_default();
        Ok(Self {
            customer_id: index(CUSTOMER_ID),
            country: index(COUNTRY),
            total_price: index(TOTAL_PRICE),
            unit_price: index(UNIT_PRICE),
            quantity: index(QUANTITY),
            recency: index(RECENCY),
            churn: index(CHURN),
            predicted_churn: index(PREDICTED_CHURN),
        })
    }
}

/// Rows that survived coercion together with the counts gathered so far.
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    pub records: Vec<RawRecord>,
    pub report: LoadReport,
}

pub fn load_path(path: &Path, options: &SourceOptions) -> Result<NormalizedTable, PipelineError> {
    let bytes = io_utils::read_source(path)?;
    info!("Loading {} byte(s) from {:?}", bytes.len(), path);
    normalize_reader(bytes.as_slice(), options)
}

pub fn normalize_reader<R: Read>(
    reader: R,
    options: &SourceOptions,
) -> Result<NormalizedTable, PipelineError> {
    let batch = read_raw_records(reader, options)?;
    Ok(normalize_with_report(batch.records, batch.report))
}

pub fn read_raw_records<R: Read>(
    reader: R,
    options: &SourceOptions,
) -> Result<RawBatch, PipelineError> {
    let mut reader = io_utils::open_csv_reader(reader, options.delimiter);
    let headers = io_utils::reader_headers(&mut reader, options.encoding)?;
    let columns = ColumnMap::resolve(&headers)?;
    debug!("Resolved source headers: {headers:?}");

    let mut batch = RawBatch::default();
    let mut seen_ids = HashSet::new();
    let mut last_line = 1;
    for record in reader.byte_records() {
        let record = match record {
            Ok(record) => record,
            Err(source) => {
                let row = source.position().map_or(last_line + 1, |pos| pos.line() as usize);
                return Err(PipelineError::Csv { row, source });
            }
        };
        let row = record.position().map_or(last_line + 1, |pos| pos.line() as usize);
        last_line = row;
        batch.report.rows_read += 1;
        match parse_row(&columns, headers.len(), &record, options.encoding, row) {
            Ok(raw) => {
                if !seen_ids.insert(raw.customer_id) {
                    batch.report.duplicate_customer_ids += 1;
                }
                batch.records.push(raw);
            }
            Err(err) if err.is_row_level() && options.malformed == MalformedPolicy::Skip => {
                warn!("Skipping malformed row: {err}");
                batch.report.skipped_malformed += 1;
            }
            Err(err) => return Err(err),
        }
    }

    if batch.report.skipped_malformed > 0 {
        warn!(
            "Skipped {} malformed row(s) out of {}",
            batch.report.skipped_malformed, batch.report.rows_read
        );
    }
    if batch.report.duplicate_customer_ids > 0 {
        warn!(
            "{} row(s) repeat an earlier {CUSTOMER_ID}",
            batch.report.duplicate_customer_ids
        );
    }
    Ok(batch)
}

/// Derives every segment label from already-coerced rows.
pub fn normalize(raw_rows: Vec<RawRecord>) -> NormalizedTable {
    let report = LoadReport {
        rows_read: raw_rows.len(),
        ..LoadReport::default()
    };
    normalize_with_report(raw_rows, report)
}

fn normalize_with_report(raw_rows: Vec<RawRecord>, mut report: LoadReport) -> NormalizedTable {
    let mut with_recency = Vec::with_capacity(raw_rows.len());
    for raw in raw_rows {
        match raw.recency {
            Some(recency) => with_recency.push((recency, raw)),
            None => report.dropped_missing_recency += 1,
        }
    }
    if report.dropped_missing_recency > 0 {
        warn!(
            "Dropped {} row(s) with missing or non-numeric {RECENCY}",
            report.dropped_missing_recency
        );
    }

    let age_edges = with_recency
        .iter()
        .map(|(recency, _)| *recency)
        .reduce(f64::max)
        .map(AgeEdges::from_max);

    let mut bucketed = Vec::with_capacity(with_recency.len());
    if let Some(edges) = &age_edges {
        for (recency, raw) in with_recency {
            match edges.assign(recency) {
                Some(age_group) => bucketed.push((recency, age_group, raw)),
                None => report.dropped_out_of_range_age += 1,
            }
        }
    }
    if report.dropped_out_of_range_age > 0 {
        warn!(
            "Dropped {} row(s) whose {RECENCY} falls outside every age bucket",
            report.dropped_out_of_range_age
        );
    }

    let income_bins = EqualWidthBins::fit(
        bucketed.iter().filter_map(|(_, _, raw)| raw.total_price),
        EQUAL_WIDTH_BINS,
    );
    let credit_bins = EqualWidthBins::fit(
        bucketed.iter().filter_map(|(_, _, raw)| raw.quantity),
        EQUAL_WIDTH_BINS,
    );

    let records = bucketed
        .into_iter()
        .map(|(recency, age_group, raw)| NormalizedRecord {
            income_group: income_bins
                .as_ref()
                .and_then(|bins| bins.assign(raw.total_price)),
            credit_score: credit_bins
                .as_ref()
                .and_then(|bins| bins.assign(raw.quantity)),
            gender: Gender::from_churn(raw.churn),
            risk_category: RiskCategory::from_predicted_churn(raw.predicted_churn),
            age_group,
            recency,
            customer_id: raw.customer_id,
            country: raw.country,
            total_price: raw.total_price,
            unit_price: raw.unit_price,
            quantity: raw.quantity,
            churn: raw.churn,
            predicted_churn: raw.predicted_churn,
        })
        .collect::<Vec<_>>();

    report.rows_kept = records.len();
    info!(
        "Normalized {} of {} row(s) ({} excluded)",
        report.rows_kept,
        report.rows_read,
        report.rows_excluded()
    );
    NormalizedTable::new(records, age_edges, income_bins, credit_bins, report)
}

fn parse_row(
    columns: &ColumnMap,
    width: usize,
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
    row: usize,
) -> Result<RawRecord, PipelineError> {
    if record.len() != width {
        return Err(PipelineError::FieldCount {
            row,
            expected: width,
            found: record.len(),
        });
    }
    let decoded = io_utils::decode_record(record, encoding, row)?;
    coerce_row(columns, &decoded, row)
}

fn coerce_row(
    columns: &ColumnMap,
    row: &[String],
    line: usize,
) -> Result<RawRecord, PipelineError> {
    let field = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");
    Ok(RawRecord {
        customer_id: parse_customer_id(field(columns.customer_id), line)?,
        country: field(columns.country).to_string(),
        total_price: parse_measure(field(columns.total_price)),
        unit_price: parse_measure(field(columns.unit_price)),
        quantity: parse_measure(field(columns.quantity)),
        recency: parse_measure(field(columns.recency)),
        churn: parse_flag(field(columns.churn), CHURN, line)?,
        predicted_churn: parse_flag(field(columns.predicted_churn), PREDICTED_CHURN, line)?,
    })
}

/// Unparsable or non-finite measures become missing instead of failing.
pub fn parse_measure(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

pub fn parse_customer_id(value: &str, row: usize) -> Result<i64, PipelineError> {
    let trimmed = value.trim();
    if let Ok(id) = trimmed.parse::<i64>() {
        return Ok(id);
    }
    // Exports written from float columns carry ids such as `12347.0`.
    match trimmed.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed.fract() == 0.0 && parsed.abs() < 9.0e15 => {
            Ok(parsed as i64)
        }
        _ => Err(PipelineError::MalformedRecord {
            row,
            column: CUSTOMER_ID,
            value: trimmed.to_string(),
            reason: "is not an integer",
        }),
    }
}

pub fn parse_flag(value: &str, column: &'static str, row: usize) -> Result<bool, PipelineError> {
    match parse_measure(value) {
        Some(v) if v == 1.0 => Ok(true),
        Some(v) if v == 0.0 => Ok(false),
        _ => Err(PipelineError::MalformedRecord {
            row,
            column,
            value: value.trim().to_string(),
            reason: "is not a 0/1 flag",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_ids_accept_integral_floats() {
        assert_eq!(parse_customer_id("12347", 2).expect("id"), 12347);
        assert_eq!(parse_customer_id(" 12347.0 ", 2).expect("id"), 12347);
        let err = parse_customer_id("12347.5", 9).expect_err("fractional id");
        assert!(matches!(err, PipelineError::MalformedRecord { row: 9, .. }));
    }

    #[test]
    fn measures_coerce_to_missing() {
        assert_eq!(parse_measure("12.5"), Some(12.5));
        assert_eq!(parse_measure(""), None);
        assert_eq!(parse_measure("n/a"), None);
        assert_eq!(parse_measure("NaN"), None);
    }

    #[test]
    fn flags_must_be_zero_or_one() {
        assert!(parse_flag("1", CHURN, 2).expect("flag"));
        assert!(!parse_flag("0.0", CHURN, 2).expect("flag"));
        assert!(parse_flag("2", CHURN, 2).is_err());
        assert!(parse_flag("", PREDICTED_CHURN, 2).is_err());
    }
}
