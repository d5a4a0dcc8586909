//! The cast output type produced by a pattern registry entry, plus the
//! small hand-rolled calendar date used by the `ymd` built-in.
//!
//! A real date/time crate (`chrono`) is not part of the corpus this
//! crate draws its stack from, so `Date` here is a minimal
//! `YYYY-MM-DD` value sufficient for the `ymd` built-in's cast and
//! equality needs — see DESIGN.md.

use std::fmt;

/// A calendar date, as produced by the `ymd` built-in pattern's cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl Date {
    /// Parses a strict `YYYY-MM-DD` string, validating month/day ranges
    /// and days-in-month (including leap years).
    pub fn parse(s: &str) -> Result<Self, String> {
        let bytes = s.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(format!("'{s}' is not in YYYY-MM-DD form"));
        }
        let year: i32 = s[0..4].parse().map_err(|_| format!("invalid year in '{s}'"))?;
        let month: u32 = s[5..7].parse().map_err(|_| format!("invalid month in '{s}'"))?;
        let day: u32 = s[8..10].parse().map_err(|_| format!("invalid day in '{s}'"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in '{s}'"));
        }
        let max_day = days_in_month(year, month);
        if day < 1 || day > max_day {
            return Err(format!("day out of range in '{s}'"));
        }
        Ok(Date { year, month, day })
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// The domain value a pattern registry cast produces for a captured
/// segment. Handler code matches on this to recover a typed parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Uuid(uuid::Uuid),
    Date(Date),
    /// The raw, possibly delimiter-spanning remainder captured by a
    /// `path` parameter.
    Path(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Path(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Path(s) => write!(f, "{s}"),
        }
    }
}
