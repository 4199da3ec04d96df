use std::{fmt, ops::Deref, str::FromStr, time::Duration};

use crate::error::DurationError;

/// A non-negative time span written in Go-style notation (`"1.5s"`, `"1m30s"`, `"250ms"`).
///
/// A bare number is accepted as seconds, but the parser reports it back
/// as a [`DurationError::WithoutSuffix`] warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    pub const ZERO: Self = Self(Duration::ZERO);

    pub const fn new(d: Duration) -> Self {
        Self(d)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub const fn get(self) -> Duration {
        self.0
    }

    /// Parses `s` and returns the value together with an optional warning.
    pub fn parse(s: &str) -> Result<(Self, Option<DurationError>), DurationError> {
        let bad_syntax = || DurationError::BadSyntax(s.to_owned());

        let text = s.trim();
        let (negative, body) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        if body.is_empty() {
            return Err(bad_syntax());
        }
        if body == "0" {
            return Ok((Self::ZERO, None));
        }

        let is_bare_number = body.chars().all(|c| c.is_ascii_digit() || c == '.');
        let (d, warning) = if is_bare_number {
            let secs = parse_decimal(body).ok_or_else(bad_syntax)?;
            let d = nanos_to_duration(secs * 1e9).ok_or_else(bad_syntax)?;
            (d, Some(DurationError::WithoutSuffix))
        } else {
            (parse_components(body).ok_or_else(bad_syntax)?, None)
        };

        if negative && !d.is_zero() {
            return Err(DurationError::Negative);
        }
        Ok((Self(d), warning))
    }
}

fn parse_decimal(num: &str) -> Option<f64> {
    if !num.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    num.parse().ok()
}

fn nanos_to_duration(nanos: f64) -> Option<Duration> {
    if !nanos.is_finite() || nanos < 0.0 || nanos > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos.round() as u64))
}

/// Parses a sequence like `1h2m3.5s`. Every number must carry a unit.
fn parse_components(mut rest: &str) -> Option<Duration> {
    let is_num_char = |c: char| c.is_ascii_digit() || c == '.';
    let mut total = Duration::ZERO;

    while !rest.is_empty() {
        let num_len = rest.find(|c| !is_num_char(c)).unwrap_or(rest.len());
        let (num, tail) = rest.split_at(num_len);
        let value = parse_decimal(num)?;

        let unit_len = tail.find(is_num_char).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };

        total = total.checked_add(nanos_to_duration(value * scale)?)?;
        rest = tail;
    }
    Some(total)
}

impl FromStr for PositiveDuration {
    type Err = DurationError;

    /// Same as [`PositiveDuration::parse`] with the warning discarded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).map(|(d, _)| d)
    }
}

impl Deref for PositiveDuration {
    type Target = Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Duration> for PositiveDuration {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl From<PositiveDuration> for Duration {
    fn from(d: PositiveDuration) -> Self {
        d.0
    }
}

impl fmt::Display for PositiveDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.0;
        let nanos = d.as_nanos();
        if nanos == 0 {
            return write!(f, "0s");
        }
        if nanos < 1_000 {
            return write!(f, "{}ns", nanos);
        }
        if nanos < 1_000_000 {
            return write!(f, "{}µs", nanos as f64 / 1e3);
        }
        if nanos < 1_000_000_000 {
            return write!(f, "{}ms", nanos as f64 / 1e6);
        }

        let secs = d.as_secs();
        let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
        if h > 0 {
            write!(f, "{}h", h)?;
        }
        if h > 0 || m > 0 {
            write!(f, "{}m", m)?;
        }
        write!(f, "{}s", s as f64 + d.subsec_nanos() as f64 / 1e9)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_with_suffix() {
        let cases = [
            ("1s", Duration::from_secs(1)),
            ("+1s", Duration::from_secs(1)),
            ("500ms", Duration::from_millis(500)),
            ("1.5s", Duration::from_millis(1500)),
            ("1m30s", Duration::from_secs(90)),
            ("2h", Duration::from_secs(7200)),
            ("10us", Duration::from_micros(10)),
            ("10µs", Duration::from_micros(10)),
            ("7ns", Duration::from_nanos(7)),
            ("-0s", Duration::ZERO),
        ];
        for (input, want) in cases {
            assert_eq!(
                PositiveDuration::parse(input),
                Ok((PositiveDuration::new(want), None)),
                "input={:?}",
                input
            );
        }
    }

    #[test]
    fn test_parse_zero_without_warning() {
        assert_eq!(
            PositiveDuration::parse("0"),
            Ok((PositiveDuration::ZERO, None))
        );
    }

    #[test]
    fn test_parse_bare_number_warns() {
        assert_eq!(
            PositiveDuration::parse("2"),
            Ok((
                PositiveDuration::from_secs(2),
                Some(DurationError::WithoutSuffix)
            ))
        );
        assert_eq!(
            PositiveDuration::parse("0.5"),
            Ok((
                PositiveDuration::new(Duration::from_millis(500)),
                Some(DurationError::WithoutSuffix)
            ))
        );
        assert!(DurationError::WithoutSuffix.is_warning());
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!(PositiveDuration::parse("-1s"), Err(DurationError::Negative));
        assert_eq!(PositiveDuration::parse("-5"), Err(DurationError::Negative));
        assert!(!DurationError::Negative.is_warning());
    }

    #[test]
    fn test_parse_bad_syntax() {
        for input in ["", "abc", "1x", "s", "1..2s", "-", ".s"] {
            assert_eq!(
                PositiveDuration::parse(input),
                Err(DurationError::BadSyntax(input.to_owned())),
                "input={:?}",
                input
            );
        }
    }

    #[test]
    fn test_from_str_drops_warning() {
        assert_eq!("3".parse(), Ok(PositiveDuration::from_secs(3)));
    }

    #[test]
    fn test_display() {
        let cases = [
            (Duration::ZERO, "0s"),
            (Duration::from_secs(6), "6s"),
            (Duration::from_millis(1500), "1.5s"),
            (Duration::from_secs(90), "1m30s"),
            (Duration::from_secs(3600), "1h0m0s"),
            (Duration::from_millis(250), "250ms"),
            (Duration::from_nanos(42), "42ns"),
        ];
        for (d, want) in cases {
            let d = PositiveDuration::new(d);
            assert_eq!(d.to_string(), want);
            assert_eq!(want.parse(), Ok(d));
        }
    }
}
