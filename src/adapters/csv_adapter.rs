//! CSV tick feed adapter.
//!
//! Expected header: `timestamp,price,volume` with optional `high,low`
//! columns, in any order. Timestamps are epoch milliseconds or RFC 3339.

use crate::domain::error::EngineError;
use crate::domain::tick::Tick;
use chrono::{DateTime, Utc};
use csv::{StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
struct Columns {
    timestamp: usize,
    price: usize,
    volume: usize,
    high: Option<usize>,
    low: Option<usize>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Result<Self, EngineError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| EngineError::Feed {
                line: 1,
                reason: format!("missing {name} column"),
            })
        };
        Ok(Columns {
            timestamp: required("timestamp")?,
            price: required("price")?,
            volume: required("volume")?,
            high: find("high"),
            low: find("low"),
        })
    }
}

/// Streams validated ticks from CSV, yielding [`EngineError::Feed`] for rows
/// the engine must not see.
pub struct CsvTickSource<R: Read> {
    records: StringRecordsIntoIter<R>,
    columns: Columns,
    last_timestamp: Option<DateTime<Utc>>,
}

impl CsvTickSource<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

impl<R: Read> CsvTickSource<R> {
    pub fn from_reader(reader: R) -> Result<Self, EngineError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let header = rdr.headers().map_err(feed_error)?.clone();
        let columns = Columns::from_header(&header)?;
        Ok(Self {
            records: rdr.into_records(),
            columns,
            last_timestamp: None,
        })
    }

    fn parse(&self, record: &StringRecord, line: u64) -> Result<Tick, EngineError> {
        let fault = |reason: String| EngineError::Feed { line, reason };
        let field = |idx: usize, name: &str| {
            record
                .get(idx)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| fault(format!("missing {name} value")))
        };
        let number = |idx: usize, name: &str| -> Result<f64, EngineError> {
            let raw = field(idx, name)?;
            raw.parse::<f64>()
                .map_err(|e| fault(format!("invalid {name} value '{raw}': {e}")))
        };
        let optional = |idx: Option<usize>, name: &str| -> Result<Option<f64>, EngineError> {
            match idx.and_then(|i| record.get(i)).filter(|v| !v.is_empty()) {
                None => Ok(None),
                Some(raw) => raw
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|e| fault(format!("invalid {name} value '{raw}': {e}"))),
            }
        };

        let timestamp = parse_timestamp(field(self.columns.timestamp, "timestamp")?)
            .map_err(fault)?;
        let price = number(self.columns.price, "price")?;
        let volume = number(self.columns.volume, "volume")?;
        let high = optional(self.columns.high, "high")?;
        let low = optional(self.columns.low, "low")?;

        if !price.is_finite() || price <= 0.0 {
            return Err(fault(format!("price {price} must be a positive number")));
        }
        if !volume.is_finite() || volume < 0.0 {
            return Err(fault(format!("volume {volume} must be non-negative")));
        }
        for (name, bound) in [("high", high), ("low", low)] {
            if let Some(v) = bound.filter(|v| !v.is_finite() || *v <= 0.0) {
                return Err(fault(format!("{name} {v} must be a positive number")));
            }
        }
        if let (Some(h), Some(l)) = (high, low) {
            if l > h {
                return Err(fault(format!("low {l} is above high {h}")));
            }
        }
        if let Some(last) = self.last_timestamp {
            if timestamp < last {
                return Err(fault(format!(
                    "timestamp {timestamp} is earlier than previous tick {last}"
                )));
            }
        }

        Ok(Tick {
            timestamp,
            price,
            volume,
            high,
            low,
        })
    }
}

impl<R: Read> Iterator for CsvTickSource<R> {
    type Item = Result<Tick, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(feed_error(e))),
        };
        let line = record.position().map_or(0, |p| p.line());
        let result = self.parse(&record, line);
        if let Ok(tick) = &result {
            self.last_timestamp = Some(tick.timestamp);
        }
        Some(result)
    }
}

fn feed_error(e: csv::Error) -> EngineError {
    EngineError::Feed {
        line: e.position().map_or(0, |p| p.line()),
        reason: e.to_string(),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| format!("timestamp {millis} is out of range"));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
}
