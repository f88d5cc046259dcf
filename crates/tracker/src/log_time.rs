#![forbid(unsafe_code)]

use crate::error::Error;
use std::{
    cmp::Ordering,
    fmt,
    ops::{Add, Sub},
    str::FromStr,
};

const MS_PER_SEC: u64 = 1000;
const MS_PER_MIN: u64 = 60 * MS_PER_SEC;

/// Duration of an encounter, split the way logs display it.
///
/// The sign is kept apart from the magnitude so that differences between two
/// kill times (personal-best deltas) can be negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LogTime {
    pub mins: u64,
    pub secs: u64,
    pub ms: u64,
    pub negative: bool,
}

impl LogTime {
    pub const ZERO: Self = Self {
        mins: 0,
        secs: 0,
        ms: 0,
        negative: false,
    };

    pub fn from_ms(ms: i64) -> Self {
        let negative = ms < 0;
        let magnitude = ms.unsigned_abs();

        let mins = magnitude / MS_PER_MIN;
        let rest = magnitude % MS_PER_MIN;

        Self {
            mins,
            secs: rest / MS_PER_SEC,
            ms: rest % MS_PER_SEC,
            negative,
        }
    }

    /// Magnitude in milliseconds, ignoring the sign.
    pub fn magnitude_ms(&self) -> u64 {
        self.mins * MS_PER_MIN + self.secs * MS_PER_SEC + self.ms
    }

    pub fn as_ms(&self) -> i64 {
        let magnitude = i64::try_from(self.magnitude_ms()).unwrap_or(i64::MAX);
        if self.negative { -magnitude } else { magnitude }
    }

    /// A strictly negative delta: the compared time beat the reference.
    pub fn is_negative(&self) -> bool {
        self.negative && self.magnitude_ms() > 0
    }
}

impl Ord for LogTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_ms().cmp(&other.as_ms())
    }
}

impl PartialOrd for LogTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for LogTime {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::from_ms(self.as_ms().saturating_add(other.as_ms()))
    }
}

impl Sub for LogTime {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::from_ms(self.as_ms().saturating_sub(other.as_ms()))
    }
}

/// `M:SS.mmm`, prefixed with `-` when negative.
impl fmt::Display for LogTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{sign}{}:{:02}.{:03}", self.mins, self.secs, self.ms)
    }
}

/// Parses the duration layout of the detail payload, `"02m 05s 123ms"`,
/// optionally led by an hour field (`"1h 02m 05s 123ms"`).
impl FromStr for LogTime {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidDuration(text.to_owned());
        let mut total: u64 = 0;
        let mut seen = 0;

        for token in text.split_whitespace() {
            let (digits, unit) = token
                .find(|c: char| !c.is_ascii_digit())
                .map(|idx| token.split_at(idx))
                .ok_or_else(invalid)?;
            let value: u64 = digits.parse().map_err(|_| invalid())?;
            let scale = match unit {
                "h" => 60 * MS_PER_MIN,
                "m" => MS_PER_MIN,
                "s" => MS_PER_SEC,
                "ms" => 1,
                _ => return Err(invalid()),
            };
            total = value
                .checked_mul(scale)
                .and_then(|v| total.checked_add(v))
                .ok_or_else(invalid)?;
            seen += 1;
        }

        if seen == 0 {
            return Err(invalid());
        }
        let total = i64::try_from(total).map_err(|_| invalid())?;
        Ok(Self::from_ms(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn display_pads_seconds_and_millis() {
        assert_eq!(LogTime::from_ms(125_000).to_string(), "2:05.000");
        assert_eq!(LogTime::from_ms(-5_007).to_string(), "-0:05.007");
        assert_eq!(LogTime::ZERO.to_string(), "0:00.000");
    }

    #[test]
    fn parses_detail_duration() {
        let time: LogTime = "02m 05s 123ms".parse().unwrap();
        assert_eq!(time, LogTime { mins: 2, secs: 5, ms: 123, negative: false });

        let time: LogTime = "1h 02m 05s 000ms".parse().unwrap();
        assert_eq!(time.as_ms(), 3_725_000);
        assert_eq!(time.mins, 62);
    }

    #[test]
    fn rejects_garbage_durations() {
        for text in ["", "abc", "05x", "m 05s", "12"] {
            assert!(text.parse::<LogTime>().is_err(), "{text:?} parsed");
        }
    }

    #[test]
    fn subtraction_keeps_sign() {
        let best = LogTime::from_ms(125_000);
        let candidate = LogTime::from_ms(120_000);
        let delta = candidate - best;
        assert!(delta.is_negative());
        assert_eq!(delta.to_string(), "-0:05.000");
        assert!(!(best - candidate).is_negative());
        assert_eq!(best + (candidate - best), candidate);
    }

    proptest! {
        #[test]
        fn ms_round_trip(ms in 0i64..i64::MAX / 2) {
            let time = LogTime::from_ms(ms);
            prop_assert!(!time.negative);
            prop_assert!(time.secs < 60 && time.ms < 1000);
            prop_assert_eq!(time.as_ms(), ms);
        }

        #[test]
        fn negative_keeps_sign_and_magnitude(ms in 1i64..i64::MAX / 2) {
            let time = LogTime::from_ms(-ms);
            prop_assert!(time.negative);
            prop_assert_eq!(time.magnitude_ms(), ms as u64);
            prop_assert_eq!(time.as_ms(), -ms);
        }

        #[test]
        fn display_parses_back(ms in 0i64..10_000_000) {
            let time = LogTime::from_ms(ms);
            let text = format!("{:02}m {:02}s {:03}ms", time.mins, time.secs, time.ms);
            prop_assert_eq!(text.parse::<LogTime>().unwrap(), time);
        }
    }
}
