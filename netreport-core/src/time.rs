use logos::{Lexer, Logos};
use std::{fmt, ops::Sub, str::FromStr, time};
use thiserror::Error;

/// A point in simulated time, in seconds since the start of the run.
///
/// The simulation engine owns the clock. This crate only ever receives
/// the current [`SimTime`] as an argument of a callback, there is no
/// global clock.
///
/// ```
/// # use netreport_core::SimTime;
/// let t0 = SimTime::from_secs(2.0);
/// let t1 = SimTime::from_secs(12.5);
/// assert_eq!(t1 - t0, 10.5);
/// assert!(t0 < t1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct SimTime(f64);

impl SimTime {
    /// the start of the simulation
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    #[inline]
    pub const fn as_secs(self) -> f64 {
        self.0
    }

    /// seconds elapsed since `earlier`. Negative if `earlier` is in the
    /// future.
    #[inline]
    pub fn elapsed_since(self, earlier: SimTime) -> f64 {
        self.0 - earlier.0
    }
}

impl Sub for SimTime {
    type Output = f64;

    fn sub(self, rhs: Self) -> Self::Output {
        self.elapsed_since(rhs)
    }
}

impl From<f64> for SimTime {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A simulated-time span read from configuration.
///
/// Accepts a bare number of seconds (`"3600"`) as the simulator settings
/// files do, or a sum of unit-suffixed values (`"1h 30m"`, `"250ms"`).
/// Negative values are rejected at parse time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Duration(time::Duration);

impl Duration {
    pub const ZERO: Self = Self(time::Duration::ZERO);

    pub const fn from_secs(secs: u64) -> Self {
        Self(time::Duration::from_secs(secs))
    }

    pub const fn new(dur: time::Duration) -> Self {
        Self(dur)
    }

    #[inline]
    pub fn into_duration(self) -> time::Duration {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <time::Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

/// Error returned when a [`Duration`] setting cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,
    #[error("unexpected input in `{input}'")]
    Unexpected { input: String },
    #[error("expecting a number before `{unit}' in `{input}'")]
    MissingValue { input: String, unit: String },
    #[error("value out of range in `{input}'")]
    Overflow { input: String },
}

impl FromStr for Duration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<Token>::new(s);
        let mut total = time::Duration::ZERO;
        let mut pending: Option<u64> = None;

        while let Some(next) = lex.next() {
            let token = next.map_err(|()| DurationParseError::Unexpected {
                input: s.to_owned(),
            })?;

            if token == Token::Value {
                if pending.is_some() {
                    return Err(DurationParseError::Unexpected {
                        input: s.to_owned(),
                    });
                }
                let number = lex.slice().parse().map_err(|_| DurationParseError::Overflow {
                    input: s.to_owned(),
                })?;
                pending = Some(number);
                continue;
            }

            let Some(number) = pending.take() else {
                return Err(DurationParseError::MissingValue {
                    input: s.to_owned(),
                    unit: lex.slice().to_owned(),
                });
            };
            let duration = match token {
                Token::NanoSeconds => time::Duration::from_nanos(number),
                Token::MicroSeconds => time::Duration::from_micros(number),
                Token::MilliSeconds => time::Duration::from_millis(number),
                Token::Seconds => time::Duration::from_secs(number),
                Token::Minutes => scaled_secs(number, 60, s)?,
                Token::Hours => scaled_secs(number, 3_600, s)?,
                Token::Value => unreachable!("values are consumed above"),
            };
            total = total
                .checked_add(duration)
                .ok_or_else(|| DurationParseError::Overflow {
                    input: s.to_owned(),
                })?;
        }

        // a trailing number without unit is a number of seconds
        if let Some(number) = pending {
            total = total
                .checked_add(time::Duration::from_secs(number))
                .ok_or_else(|| DurationParseError::Overflow {
                    input: s.to_owned(),
                })?;
        } else if s.trim().is_empty() {
            return Err(DurationParseError::Empty);
        }

        Ok(Self(total))
    }
}

fn scaled_secs(number: u64, factor: u64, input: &str) -> Result<time::Duration, DurationParseError> {
    number
        .checked_mul(factor)
        .map(time::Duration::from_secs)
        .ok_or_else(|| DurationParseError::Overflow {
            input: input.to_owned(),
        })
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum Token {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|μs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,
    #[token("h")]
    Hours,

    #[regex("[0-9]+")]
    Value,
}
