//! "Next change" countdown parsing.

use chrono::{DateTime, TimeDelta, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref COUNTDOWN: Regex =
        Regex::new(r"(\d+)\s+days?,\s+(\d+)h\s+(\d+)m\s+(\d+)s").expect("countdown pattern");
}

/// When a category may next be refreshed from the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextRefresh {
    /// No countdown known; refresh whenever asked.
    #[default]
    #[serde(rename = "NA")]
    Anytime,
    At(DateTime<Utc>),
}

impl NextRefresh {
    /// Whether a refresh is allowed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self {
            NextRefresh::Anytime => true,
            NextRefresh::At(at) => now >= *at,
        }
    }

    pub fn at(&self) -> Option<DateTime<Utc>> {
        match self {
            NextRefresh::Anytime => None,
            NextRefresh::At(at) => Some(*at),
        }
    }
}

impl fmt::Display for NextRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextRefresh::Anytime => write!(f, "NA"),
            NextRefresh::At(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Parse `"<d> days, <h>h <m>m <s>s"` (anywhere in `text`) as an offset from
/// `now`. Anything else, including a missing countdown, yields
/// [`NextRefresh::Anytime`].
pub fn parse_countdown(text: Option<&str>, now: DateTime<Utc>) -> NextRefresh {
    text.and_then(countdown_delta)
        .and_then(|delta| now.checked_add_signed(delta))
        .map_or(NextRefresh::Anytime, NextRefresh::At)
}

fn countdown_delta(text: &str) -> Option<TimeDelta> {
    let caps = COUNTDOWN.captures(text)?;
    let field = |i: usize| caps.get(i)?.as_str().parse::<i64>().ok();

    let days = TimeDelta::try_days(field(1)?)?;
    let hours = TimeDelta::try_hours(field(2)?)?;
    let minutes = TimeDelta::try_minutes(field(3)?)?;
    let seconds = TimeDelta::try_seconds(field(4)?)?;

    days.checked_add(&hours)?
        .checked_add(&minutes)?
        .checked_add(&seconds)
}
