use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use tracing::debug;

use crate::error::ExtractError;

/// A named field read from text: pattern, post-processing of the captures,
/// and the error reported when either finds nothing.
pub struct FieldRule<T> {
    pub field: &'static str,
    pattern: Regex,
    convert: fn(&Captures) -> Option<T>,
    missing: ExtractError,
}

impl<T> FieldRule<T> {
    fn new(
        field: &'static str,
        pattern: &str,
        convert: fn(&Captures) -> Option<T>,
        missing: ExtractError,
    ) -> Self {
        Self {
            field,
            pattern: Regex::new(pattern).unwrap(),
            convert,
            missing,
        }
    }

    pub fn apply(&self, text: &str) -> Result<T, ExtractError> {
        self.pattern
            .captures(text)
            .and_then(|c| (self.convert)(&c))
            .ok_or_else(|| {
                debug!("No {} in block text", self.field);
                self.missing.clone()
            })
    }
}

fn count(caps: &Captures) -> Option<u64> {
    caps.get(1).and_then(|m| parse_count(m.as_str()))
}

/// "4 500 cas COVID-19": groups of three digits may be separated by any
/// whitespace, non-breaking spaces included. The number must not follow a
/// digit or a `/`, so a date in front of it is never merged in.
pub static INFECTED: LazyLock<FieldRule<u64>> = LazyLock::new(|| {
    FieldRule::new(
        "infected count",
        r"(?:^|[^\d/])(\d{1,3}(?:\s\d{3})+|\d+)\s*cas COVID-19",
        count,
        ExtractError::InfectedNotFound,
    )
});

pub static DECEASED: LazyLock<FieldRule<u64>> = LazyLock::new(|| {
    FieldRule::new(
        "deceased count",
        r"incluant\s+(\d{1,3}(?:\s\d{3})+|\d+)\s*décès",
        count,
        ExtractError::DeceasedNotFound,
    )
});

/// "14/3/2020 à 15h" as local wall-clock time, minutes and below zeroed.
/// An impossible date counts as missing.
pub static UPDATED_AT: LazyLock<FieldRule<NaiveDateTime>> = LazyLock::new(|| {
    FieldRule::new(
        "source update time",
        r"(\d{1,2})/(\d{1,2})/(\d{4})\s*à\s*(\d{1,2})\s*h",
        wall_clock,
        ExtractError::UpdatedAtNotFound,
    )
});

fn wall_clock(caps: &Captures) -> Option<NaiveDateTime> {
    let num = |i: usize| caps[i].parse::<u32>().ok();
    let year = caps[3].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, num(2)?, num(1)?)?.and_hms_opt(num(4)?, 0, 0)
}

/// Strip all whitespace and parse.
pub fn parse_count(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    digits.parse().ok()
}

/// Keep only ASCII digits of OCR output and parse.
pub fn parse_recognized(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
