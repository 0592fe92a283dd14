use std::io::{Read, Write};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::{
    aggregate::HighRiskEntry,
    dashboard::format_currency,
    io_utils,
    segments::{AgeGroup, Category, RiskCategory},
};

pub const HIGH_RISK_HEADERS: [&str; 6] = [
    "CustomerID",
    "Country",
    "Age_Group",
    "TotalPrice",
    "Recency",
    "Risk_Category",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceFormat {
    #[default]
    Numeric,
    Currency,
}

pub fn write_high_risk_csv<W: Write>(
    entries: &[HighRiskEntry],
    writer: W,
    price_format: PriceFormat,
) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(writer);
    writer
        .write_record(HIGH_RISK_HEADERS)
        .context("Writing high-risk header")?;
    for entry in entries {
        let price = match (entry.total_price, price_format) {
            (None, _) => String::new(),
            (Some(value), PriceFormat::Numeric) => value.to_string(),
            (Some(value), PriceFormat::Currency) => format_currency(value),
        };
        writer
            .write_record([
                entry.customer_id.to_string(),
                entry.country.clone(),
                entry.age_group.label().to_string(),
                price,
                entry.recency.to_string(),
                entry.risk_category.label().to_string(),
            ])
            .with_context(|| format!("Writing high-risk row for customer {}", entry.customer_id))?;
    }
    writer.flush().context("Flushing high-risk export")?;
    Ok(())
}

pub fn high_risk_csv_string(
    entries: &[HighRiskEntry],
    price_format: PriceFormat,
) -> Result<String> {
    let mut buffer = Vec::new();
    write_high_risk_csv(entries, &mut buffer, price_format)?;
    String::from_utf8(buffer).context("High-risk export is not UTF-8")
}

#[derive(Debug, Deserialize)]
struct ExportedRow {
    #[serde(rename = "CustomerID")]
    customer_id: i64,
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "Age_Group")]
    age_group: AgeGroup,
    #[serde(rename = "TotalPrice")]
    total_price: String,
    #[serde(rename = "Recency")]
    recency: f64,
    #[serde(rename = "Risk_Category")]
    risk_category: RiskCategory,
}

/// Parses an export produced by [`write_high_risk_csv`] in either price format.
pub fn read_high_risk_csv<R: Read>(reader: R) -> Result<Vec<HighRiskEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(io_utils::EXPORT_DELIMITER)
        .from_reader(reader);
    reader
        .deserialize::<ExportedRow>()
        .enumerate()
        .map(|(idx, row)| {
            let row = row.with_context(|| format!("Reading export row {}", idx + 2))?;
            Ok(HighRiskEntry {
                total_price: parse_price(&row.total_price)
                    .with_context(|| format!("Export row {}", idx + 2))?,
                customer_id: row.customer_id,
                country: row.country,
                age_group: row.age_group,
                recency: row.recency,
                risk_category: row.risk_category,
            })
        })
        .collect()
}

fn parse_price(raw: &str) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let cleaned = trimmed.replace(['$', ','], "");
    cleaned
        .parse::<f64>()
        .map(Some)
        .map_err(|_| anyhow!("Invalid TotalPrice '{trimmed}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_price_accepts_currency_text() {
        assert_eq!(parse_price("$1,234.50").expect("price"), Some(1234.5));
        assert_eq!(parse_price("-$12.00").expect("price"), Some(-12.0));
        assert_eq!(parse_price(" 18.2 ").expect("price"), Some(18.2));
        assert_eq!(parse_price("").expect("price"), None);
        assert!(parse_price("lots").is_err());
    }
}
