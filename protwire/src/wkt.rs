//! The well-known `google.protobuf.Timestamp` and `google.protobuf.Duration` types.
//!
//! Both are carried on the wire as a nested message of `{ seconds: int64 = 1, nanos: int32 = 2 }`.
//! In JSON a timestamp is an RFC 3339 string and a duration is a decimal number of seconds with an
//! `s` suffix.
//!
//! # Rounding
//!
//! The wire format has nanosecond resolution. Conversions to and from milliseconds
//! ([`Timestamp::to_unix_millis`], [`Duration::to_millis`]) drop the sub-millisecond remainder,
//! rounding toward zero: `-1.5ms` becomes `-1ms`, not `-2ms`. Values with sub-millisecond precision
//! therefore do not survive a trip through milliseconds. Conversions to `chrono` types are exact.

use crate::io::{read, CodedReader, CodedWriter, FieldNumber, Tag, WireType};
use crate::raw;
use alloc::format;
use alloc::string::{String, ToString};
use chrono::{DateTime, TimeDelta, Utc};
use core::convert::TryFrom;
use thiserror::Error;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MILLI: i64 = 1_000_000;

const SECONDS_NUMBER: FieldNumber = unsafe { FieldNumber::new_unchecked(1) };
const NANOS_NUMBER: FieldNumber = unsafe { FieldNumber::new_unchecked(2) };

/// The error type for well-known type conversions
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The value is outside the range the target type supports
    #[error("the value is out of range")]
    OutOfRange,
    /// A string couldn't be parsed
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// How many fractional digits a timestamp keeps when written to JSON
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimestampPrecision {
    /// Always three digits, truncated toward zero, like `2020-01-01T00:00:00.000Z`.
    /// Sub-millisecond parts are lost.
    Millis,
    /// As few of 0, 3, 6 or 9 digits as represent the value exactly
    Nanos,
}

impl Default for TimestampPrecision {
    fn default() -> Self {
        TimestampPrecision::Nanos
    }
}

/// A point in time independent of any time zone, as seconds and nanoseconds since the unix epoch.
///
/// A normalized timestamp has `0 <= nanos < 1_000_000_000`; negative instants have negative seconds
/// and positive nanos.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    /// Seconds since 1970-01-01T00:00:00Z
    pub seconds: i64,
    /// Non-negative fractions of a second at nanosecond resolution
    pub nanos: i32,
}

impl Timestamp {
    /// The earliest timestamp representable in JSON, 0001-01-01T00:00:00Z
    pub const MIN_SECONDS: i64 = -62_135_596_800;
    /// The latest timestamp representable in JSON, 9999-12-31T23:59:59Z
    pub const MAX_SECONDS: i64 = 253_402_300_799;

    /// Creates a normalized timestamp, carrying excess or negative nanos into the seconds
    pub fn new(seconds: i64, nanos: i32) -> Timestamp {
        let total = i128::from(seconds) * i128::from(NANOS_PER_SECOND) + i128::from(nanos);
        Timestamp::from_total_nanos(total)
    }

    fn from_total_nanos(total: i128) -> Timestamp {
        let per = i128::from(NANOS_PER_SECOND);
        let seconds = total.div_euclid(per);
        Timestamp {
            seconds: i64::try_from(seconds).unwrap_or(if seconds < 0 { i64::MIN } else { i64::MAX }),
            nanos: total.rem_euclid(per) as i32,
        }
    }

    fn total_nanos(&self) -> i128 {
        i128::from(self.seconds) * i128::from(NANOS_PER_SECOND) + i128::from(self.nanos)
    }

    /// Creates a timestamp from milliseconds since the unix epoch. This is exact.
    pub fn from_unix_millis(millis: i64) -> Timestamp {
        Timestamp::from_total_nanos(i128::from(millis) * i128::from(NANOS_PER_MILLI))
    }

    /// Gets the milliseconds since the unix epoch, rounding toward zero.
    /// Saturates at the bounds of `i64`.
    pub fn to_unix_millis(&self) -> i64 {
        let millis = self.total_nanos() / i128::from(NANOS_PER_MILLI);
        i64::try_from(millis).unwrap_or(if millis < 0 { i64::MIN } else { i64::MAX })
    }

    /// Drops the sub-millisecond part of the timestamp, rounding toward zero
    pub fn truncate_to_millis(self) -> Timestamp {
        Timestamp::from_unix_millis(self.to_unix_millis())
    }

    /// Converts a `chrono` date time to a timestamp. This is exact.
    pub fn from_datetime(dt: &DateTime<Utc>) -> Timestamp {
        // leap seconds are reported as nanos past one billion
        let nanos = dt.timestamp_subsec_nanos().min(999_999_999);
        Timestamp { seconds: dt.timestamp(), nanos: nanos as i32 }
    }

    /// Converts the timestamp to a `chrono` date time, failing if `chrono` can't represent it
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, Error> {
        let normal = Timestamp::new(self.seconds, self.nanos);
        DateTime::<Utc>::from_timestamp(normal.seconds, normal.nanos as u32).ok_or(Error::OutOfRange)
    }

    /// Formats the timestamp as an RFC 3339 string in UTC
    ///
    /// ```
    /// use protwire::wkt::{Timestamp, TimestampPrecision};
    ///
    /// let ts = Timestamp { seconds: 1_577_836_800, nanos: 123_456_789 };
    /// assert_eq!(ts.to_rfc3339(TimestampPrecision::Millis).unwrap(), "2020-01-01T00:00:00.123Z");
    /// assert_eq!(ts.to_rfc3339(TimestampPrecision::Nanos).unwrap(), "2020-01-01T00:00:00.123456789Z");
    /// ```
    pub fn to_rfc3339(&self, precision: TimestampPrecision) -> Result<String, Error> {
        let value = match precision {
            TimestampPrecision::Millis => self.truncate_to_millis(),
            TimestampPrecision::Nanos => Timestamp::new(self.seconds, self.nanos),
        };
        if !(Self::MIN_SECONDS..=Self::MAX_SECONDS).contains(&value.seconds) {
            return Err(Error::OutOfRange);
        }
        let dt = value.to_datetime()?;
        let format = match precision {
            TimestampPrecision::Millis => "%Y-%m-%dT%H:%M:%S%.3fZ",
            TimestampPrecision::Nanos => match value.nanos {
                0 => "%Y-%m-%dT%H:%M:%SZ",
                n if n % 1_000_000 == 0 => "%Y-%m-%dT%H:%M:%S%.3fZ",
                n if n % 1_000 == 0 => "%Y-%m-%dT%H:%M:%S%.6fZ",
                _ => "%Y-%m-%dT%H:%M:%S%.9fZ",
            },
        };
        Ok(dt.format(format).to_string())
    }

    /// Parses an RFC 3339 string with any offset
    pub fn parse_rfc3339(s: &str) -> Result<Timestamp, Error> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| Error::InvalidFormat(e.to_string()))?;
        let value = Timestamp::from_datetime(&dt.with_timezone(&Utc));
        if !(Self::MIN_SECONDS..=Self::MAX_SECONDS).contains(&value.seconds) {
            return Err(Error::OutOfRange);
        }
        Ok(value)
    }

    pub(crate) fn write_to(&self, output: &mut CodedWriter) {
        write_seconds_nanos(self.seconds, self.nanos, output)
    }

    pub(crate) fn read_from(input: &mut CodedReader<'_>) -> read::Result<Timestamp> {
        read_seconds_nanos(input).map(|(seconds, nanos)| Timestamp { seconds, nanos })
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Timestamp {
        Timestamp::from_datetime(&dt)
    }
}

impl TryFrom<Timestamp> for DateTime<Utc> {
    type Error = Error;

    fn try_from(ts: Timestamp) -> Result<DateTime<Utc>, Error> {
        ts.to_datetime()
    }
}

/// A signed, fixed-length span of time at nanosecond resolution.
///
/// A normalized duration has `seconds` and `nanos` of the same sign and `|nanos| < 1_000_000_000`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Duration {
    /// Signed seconds of the span
    pub seconds: i64,
    /// Signed fractions of a second, with the same sign as `seconds`
    pub nanos: i32,
}

impl Duration {
    /// The largest magnitude of seconds a duration can have, about 10,000 years
    pub const MAX_SECONDS: i64 = 315_576_000_000;

    /// Creates a normalized duration
    pub fn new(seconds: i64, nanos: i32) -> Duration {
        let total = i128::from(seconds) * i128::from(NANOS_PER_SECOND) + i128::from(nanos);
        Duration::from_total_nanos(total)
    }

    fn from_total_nanos(total: i128) -> Duration {
        let per = i128::from(NANOS_PER_SECOND);
        // truncating division keeps both parts on the same side of zero
        let seconds = total / per;
        Duration {
            seconds: i64::try_from(seconds).unwrap_or(if seconds < 0 { i64::MIN } else { i64::MAX }),
            nanos: (total % per) as i32,
        }
    }

    fn total_nanos(&self) -> i128 {
        i128::from(self.seconds) * i128::from(NANOS_PER_SECOND) + i128::from(self.nanos)
    }

    /// Creates a duration from milliseconds. This is exact.
    pub fn from_millis(millis: i64) -> Duration {
        Duration::from_total_nanos(i128::from(millis) * i128::from(NANOS_PER_MILLI))
    }

    /// Gets the length of the duration in milliseconds, rounding toward zero.
    /// Saturates at the bounds of `i64`.
    pub fn to_millis(&self) -> i64 {
        let millis = self.total_nanos() / i128::from(NANOS_PER_MILLI);
        i64::try_from(millis).unwrap_or(if millis < 0 { i64::MIN } else { i64::MAX })
    }

    /// Converts the duration to a `chrono` time delta, failing if it's out of range
    pub fn to_time_delta(&self) -> Result<TimeDelta, Error> {
        let normal = Duration::new(self.seconds, self.nanos);
        TimeDelta::try_seconds(normal.seconds)
            .and_then(|d| d.checked_add(&TimeDelta::nanoseconds(i64::from(normal.nanos))))
            .ok_or(Error::OutOfRange)
    }

    /// Formats the duration as JSON does: decimal seconds with 0, 3, 6 or 9 fractional digits and an `s` suffix
    ///
    /// ```
    /// use protwire::wkt::Duration;
    ///
    /// assert_eq!(Duration::new(5, 0).to_json_string().unwrap(), "5s");
    /// assert_eq!(Duration::new(-1, -500_000_000).to_json_string().unwrap(), "-1.500s");
    /// assert_eq!(Duration::new(0, 1).to_json_string().unwrap(), "0.000000001s");
    /// ```
    pub fn to_json_string(&self) -> Result<String, Error> {
        let value = Duration::new(self.seconds, self.nanos);
        if value.seconds.unsigned_abs() > Self::MAX_SECONDS as u64 {
            return Err(Error::OutOfRange);
        }
        let sign = if value.seconds < 0 || value.nanos < 0 { "-" } else { "" };
        let seconds = value.seconds.unsigned_abs();
        let nanos = value.nanos.unsigned_abs();
        let out = match nanos {
            0 => format!("{}{}s", sign, seconds),
            n if n % 1_000_000 == 0 => format!("{}{}.{:03}s", sign, seconds, n / 1_000_000),
            n if n % 1_000 == 0 => format!("{}{}.{:06}s", sign, seconds, n / 1_000),
            n => format!("{}{}.{:09}s", sign, seconds, n),
        };
        Ok(out)
    }

    /// Parses a JSON duration string like `"1.5s"` or `"-0.000001s"`
    pub fn parse_json_string(s: &str) -> Result<Duration, Error> {
        let invalid = || Error::InvalidFormat(format!("`{}` is not a duration", s));

        let body = s.strip_suffix('s').ok_or_else(invalid)?;
        let (negative, body) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        let (whole, frac) = match body.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (body, ""),
        };
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(whole) || (body.contains('.') && !digits(frac)) || frac.len() > 9 {
            return Err(invalid());
        }

        let seconds: i64 = whole.parse().map_err(|_| Error::OutOfRange)?;
        if seconds > Self::MAX_SECONDS {
            return Err(Error::OutOfRange);
        }
        let nanos = if frac.is_empty() {
            0
        } else {
            // pad to nine digits so "5" means 500,000,000 nanos
            let padded = format!("{:0<9}", frac);
            padded.parse::<i32>().map_err(|_| invalid())?
        };
        Ok(if negative {
            Duration { seconds: -seconds, nanos: -nanos }
        } else {
            Duration { seconds, nanos }
        })
    }

    pub(crate) fn write_to(&self, output: &mut CodedWriter) {
        write_seconds_nanos(self.seconds, self.nanos, output)
    }

    pub(crate) fn read_from(input: &mut CodedReader<'_>) -> read::Result<Duration> {
        read_seconds_nanos(input).map(|(seconds, nanos)| Duration { seconds, nanos })
    }
}

impl From<TimeDelta> for Duration {
    fn from(delta: TimeDelta) -> Duration {
        Duration { seconds: delta.num_seconds(), nanos: delta.subsec_nanos() }
    }
}

impl TryFrom<Duration> for TimeDelta {
    type Error = Error;

    fn try_from(duration: Duration) -> Result<TimeDelta, Error> {
        duration.to_time_delta()
    }
}

impl TryFrom<core::time::Duration> for Duration {
    type Error = Error;

    fn try_from(duration: core::time::Duration) -> Result<Duration, Error> {
        let seconds = i64::try_from(duration.as_secs()).map_err(|_| Error::OutOfRange)?;
        Ok(Duration { seconds, nanos: duration.subsec_nanos() as i32 })
    }
}

impl TryFrom<Duration> for core::time::Duration {
    type Error = Error;

    fn try_from(duration: Duration) -> Result<core::time::Duration, Error> {
        let normal = Duration::new(duration.seconds, duration.nanos);
        if normal.seconds < 0 || normal.nanos < 0 {
            return Err(Error::OutOfRange);
        }
        Ok(core::time::Duration::new(normal.seconds as u64, normal.nanos as u32))
    }
}

fn write_seconds_nanos(seconds: i64, nanos: i32, output: &mut CodedWriter) {
    if seconds != 0 {
        output.write_field::<raw::Int64>(SECONDS_NUMBER, &seconds);
    }
    if nanos != 0 {
        output.write_field::<raw::Int32>(NANOS_NUMBER, &nanos);
    }
}

fn read_seconds_nanos(input: &mut CodedReader<'_>) -> read::Result<(i64, i32)> {
    const SECONDS_TAG: u32 = Tag::new(SECONDS_NUMBER, WireType::Varint).get();
    const NANOS_TAG: u32 = Tag::new(NANOS_NUMBER, WireType::Varint).get();

    let mut seconds = 0;
    let mut nanos = 0;
    while let Some(tag) = input.read_tag()? {
        match tag.get() {
            SECONDS_TAG => seconds = input.read_value::<raw::Int64>()?,
            NANOS_TAG => nanos = input.read_value::<raw::Int32>()?,
            _ if tag.wire_type() == WireType::EndGroup => return Err(read::Error::InvalidTag(tag.get())),
            _ => input.skip_field(tag)?,
        }
    }
    Ok((seconds, nanos))
}
