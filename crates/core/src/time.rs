use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpanwatchError};

/// Symbolic lookback accepted by every windowed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[default]
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    TwentyFourHours,
}

impl TimeRange {
    /// Length of the range in whole seconds, the denominator for request rates.
    pub fn seconds(self) -> i64 {
        match self {
            Self::FifteenMinutes => 900,
            Self::OneHour => 3_600,
            Self::TwentyFourHours => 86_400,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::TwentyFourHours => "24h",
        }
    }

    /// Parses an optional token, falling back to the default range when absent.
    pub fn parse_or_default(token: Option<&str>) -> Result<Self> {
        token.map(Self::from_str).transpose().map(Option::unwrap_or_default)
    }

    pub fn current(self, now: DateTime<Utc>) -> Window {
        Window::nth_back(self, now, 0)
    }

    pub fn baseline(self, now: DateTime<Utc>) -> Window {
        Window::nth_back(self, now, 1)
    }
}

impl FromStr for TimeRange {
    type Err = SpanwatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "15m" => Ok(Self::FifteenMinutes),
            "1h" => Ok(Self::OneHour),
            "24h" => Ok(Self::TwentyFourHours),
            other => Err(SpanwatchError::InvalidArgument(format!(
                "unknown time range {other:?}, expected one of 15m, 1h, 24h"
            ))),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub seconds: i64,
}

impl Window {
    fn nth_back(range: TimeRange, now: DateTime<Utc>, k: i32) -> Self {
        let len = TimeDelta::seconds(range.seconds());
        let end = now - len * k;
        Self {
            start: end - len,
            end,
            seconds: range.seconds(),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// Truncates a timestamp to the start of its minute.
pub fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::minutes(1)).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn resolves_known_tokens() {
        assert_eq!(TimeRange::from_str("15m").unwrap().seconds(), 900);
        assert_eq!(TimeRange::from_str("1h").unwrap().seconds(), 3_600);
        assert_eq!(TimeRange::from_str("24h").unwrap().seconds(), 86_400);
    }

    #[test]
    fn rejects_unknown_tokens() {
        for token in ["", "1d", "60m", "1H", " 1h"] {
            let err = TimeRange::from_str(token).unwrap_err();
            assert!(matches!(err, SpanwatchError::InvalidArgument(_)), "{token}");
        }
    }

    #[test]
    fn missing_token_defaults_to_one_hour() {
        assert_eq!(TimeRange::parse_or_default(None).unwrap(), TimeRange::OneHour);
        assert!(TimeRange::parse_or_default(Some("2h")).is_err());
    }

    #[test]
    fn baseline_immediately_precedes_current() {
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        let current = TimeRange::FifteenMinutes.current(now);
        let baseline = TimeRange::FifteenMinutes.baseline(now);

        assert_eq!(current.end, now);
        assert_eq!(current.start, Utc.with_ymd_and_hms(2026, 2, 1, 11, 45, 0).unwrap());
        assert_eq!(baseline.end, current.start);
        assert_eq!(baseline.start, Utc.with_ymd_and_hms(2026, 2, 1, 11, 30, 0).unwrap());
        assert!(current.contains(current.start));
        assert!(!current.contains(now));
        assert!(!baseline.contains(current.start));
    }

    #[test]
    fn truncates_to_minute() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 1, 12, 3, 59).unwrap()
            + TimeDelta::milliseconds(250);
        assert_eq!(
            truncate_to_minute(ts),
            Utc.with_ymd_and_hms(2026, 2, 1, 12, 3, 0).unwrap()
        );
    }

    #[test]
    fn serializes_as_token() {
        let json = serde_json::to_string(&TimeRange::TwentyFourHours).unwrap();
        assert_eq!(json, "\"24h\"");
        let back: TimeRange = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(back, TimeRange::FifteenMinutes);
    }
}
