use anyhow::{Context, Result};
use bigdecimal::{BigDecimal, Zero};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::models::SalesRecord;

/// One ledger row as it appears in the file. Both the English column names
/// and the legacy export headers are accepted.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Magazin")]
    store: String,
    #[serde(alias = "Datasales", alias = "date")]
    sale_date: String,
    #[serde(alias = "Art")]
    product_id: String,
    #[serde(alias = "Describe", default)]
    description: String,
    #[serde(alias = "Model")]
    model: String,
    #[serde(alias = "Segment")]
    segment: String,
    #[serde(alias = "Price")]
    unit_price: String,
    #[serde(alias = "Qty")]
    quantity: String,
    #[serde(alias = "Sum")]
    amount: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// Valid records, sorted by date
    pub records: Vec<SalesRecord>,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub errors: Vec<String>,
}

const DATE_FORMATS: [&str; 4] = ["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

/// Day-first dates, with or without a time part, and ISO dates
pub fn parse_sale_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(s, format).ok().or_else(|| {
            NaiveDateTime::parse_from_str(s, &format!("{} %H:%M:%S", format))
                .ok()
                .map(|dt| dt.date())
        })
    })
}

/// Parses amounts such as `$1,234.50`, `1 234,50 ₽` or `-`.
///
/// A lone comma followed by one or two digits is read as the decimal mark;
/// any other comma is a thousands separator.
pub fn parse_money_string(s: &str) -> Result<BigDecimal> {
    let mut cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(*c, '.' | ',' | '-'))
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return Ok(BigDecimal::zero());
    }

    let decimal_comma = !cleaned.contains('.')
        && cleaned.matches(',').count() == 1
        && cleaned
            .rsplit(',')
            .next()
            .map_or(false, |tail| (1..=2).contains(&tail.len()));

    cleaned = if decimal_comma {
        cleaned.replace(',', ".")
    } else {
        cleaned.replace(',', "")
    };

    BigDecimal::from_str(&cleaned).with_context(|| format!("Failed to parse money string: {}", s))
}

/// Whole-unit quantities; `3.0` is accepted, `2.5` is not
fn parse_quantity(s: &str) -> Result<i64> {
    let trimmed = s.trim();
    if let Ok(q) = trimmed.parse::<i64>() {
        return Ok(q);
    }

    let value = trimmed
        .replace(',', ".")
        .parse::<f64>()
        .with_context(|| format!("Failed to parse quantity: {}", s))?;
    if value.fract() != 0.0 {
        anyhow::bail!("Quantity is not a whole number: {}", s);
    }
    Ok(value as i64)
}

/// Outcome of checking one row
enum RowOutcome {
    Valid(SalesRecord),
    Dropped(&'static str),
}

fn process_row(row: CsvRow) -> Result<RowOutcome> {
    let Some(date) = parse_sale_date(&row.sale_date) else {
        return Ok(RowOutcome::Dropped("unparseable date"));
    };

    let quantity = parse_quantity(&row.quantity)?;
    let unit_price = parse_money_string(&row.unit_price)?;
    let amount = parse_money_string(&row.amount)?;

    if quantity < 0 {
        return Ok(RowOutcome::Dropped("negative quantity"));
    }
    if unit_price <= BigDecimal::zero() {
        return Ok(RowOutcome::Dropped("non-positive price"));
    }

    Ok(RowOutcome::Valid(SalesRecord {
        store: row.store.trim().to_string(),
        date,
        product_id: row.product_id.trim().to_string(),
        description: row.description.trim().to_string(),
        model: row.model.trim().to_string(),
        segment: row.segment.trim().to_string(),
        unit_price,
        quantity,
        amount,
    }))
}

/// Semicolon-separated exports are common; pick whichever separator the
/// header uses.
fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// Reads and validates a sales ledger.
///
/// Rows with an unparseable date, a negative quantity or a non-positive
/// price are dropped. Rows that cannot be read at all are dropped and
/// reported in `errors` with their line number.
pub fn parse_sales_csv<R: Read>(mut source: R) -> Result<ImportResult> {
    let mut content = String::new();
    source
        .read_to_string(&mut content)
        .context("Failed to read CSV content")?;
    let content = content.trim_start_matches('\u{feff}');

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(detect_delimiter(content))
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let mut result = ImportResult::default();

    for (line_num, row) in reader.deserialize::<CsvRow>().enumerate() {
        result.rows_read += 1;

        let outcome = row
            .context("Failed to parse CSV row")
            .and_then(process_row);

        match outcome {
            Ok(RowOutcome::Valid(record)) => result.records.push(record),
            Ok(RowOutcome::Dropped(reason)) => {
                debug!("Dropping line {}: {}", line_num + 2, reason);
                result.rows_dropped += 1;
            }
            Err(e) => {
                result.rows_dropped += 1;
                result.errors.push(format!("Line {}: {:#}", line_num + 2, e));
            }
        }
    }

    result.records.sort_by_key(|r| r.date);

    if !result.errors.is_empty() {
        warn!("{} rows could not be read", result.errors.len());
    }

    Ok(result)
}

pub fn load_sales_csv(path: &Path) -> Result<ImportResult> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {:?}", path))?;
    let result = parse_sales_csv(file).with_context(|| format!("Failed to import {:?}", path))?;

    info!(
        "Imported {} records from {:?} ({} rows read, {} dropped)",
        result.records.len(),
        path,
        result.rows_read,
        result.rows_dropped
    );

    Ok(result)
}

/// CSV files directly inside `dir`, sorted by name
pub fn list_csv_files(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {:?}", dir))?;

    let mut files: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
        })
        .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .collect();

    files.sort();
    Ok(files)
}
