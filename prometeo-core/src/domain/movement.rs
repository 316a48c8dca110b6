//! Movement (transaction) domain model and date-range rules

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Date format used by the API and shown to the user
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Length of the default trailing window, in days
pub const DEFAULT_DAY_INTERVAL: i64 = 30;

/// Ranges this long (or longer) need an explicit confirmation
pub const MIN_WARNING_INTERVAL: i64 = 31;

/// Parse a `dd/mm/YYYY` date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| Error::validation(format!("'{}' is not a dd/mm/yyyy date", s.trim())))
}

/// Format a date as `dd/mm/YYYY`
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// A single account or card movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: String,
    pub reference: String,
    pub date: NaiveDate,
    pub detail: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

/// Inclusive date range for a movements request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::validation(format!(
                "start date {} is after end date {}",
                format_date(start),
                format_date(end)
            )));
        }
        Ok(Self { start, end })
    }

    /// Default window: the last `DEFAULT_DAY_INTERVAL` days up to `today`
    pub fn trailing(today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(DEFAULT_DAY_INTERVAL),
            end: today,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Days between start and end
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Broad ranges put load on the upstream banks
    pub fn is_broad(&self) -> bool {
        self.days() >= MIN_WARNING_INTERVAL
    }
}

/// Parameters of a movements request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementQuery {
    /// Account or card number
    pub number: String,
    pub currency: String,
    pub range: DateRange,
}

impl MovementQuery {
    pub fn new(number: impl Into<String>, currency: impl Into<String>, range: DateRange) -> Self {
        Self {
            number: number.into(),
            currency: currency.into(),
            range,
        }
    }
}
