use {
    anyhow::Context,
    bstr::{BStr, ByteSlice},
    jiff::{
        Zoned, civil, fmt,
        tz::{self, Offset},
    },
};

use crate::{
    NOW, TZ,
    args::Usage,
    parse::{BytesExt, FromBytes},
};

static TEMPORAL_PARSER: fmt::temporal::DateTimeParser =
    fmt::temporal::DateTimeParser::new();
static RFC2822_PARSER: fmt::rfc2822::DateTimeParser =
    fmt::rfc2822::DateTimeParser::new();

/// Represents a datetime parsed from user input.
///
/// Everything comes down to a zoned datetime. The time zone is whatever the
/// input carries. When the input has no time zone or offset (like
/// `2025-03-15`), then it is interpreted in the system time zone, which users
/// can change by setting the `TZ` environment variable.
///
/// The time zone matters: occurrences are computed on the calendar of the
/// datetime's time zone.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct DateTime {
    zdt: Zoned,
}

impl DateTime {
    pub const ARG_OR_STDIN: Usage = Usage::arg(
        "<datetime>",
        "A datetime string, e.g., `now` or `2025-03-15T00:00Z`.",
        r#"
A datetime string.

Datetimes can either be passed as positional arguments or as line delimited
data on stdin, but not both. That is, datetimes will only be read from stdin
when there are no datetimes provided as positional arguments.

The following formats are accepted:

RFC 9557, e.g., `2025-03-15T10:23:00-04:00[America/New_York]`

RFC 3339, e.g., `2025-03-15T10:23:00-04:00`

RFC 2822, e.g., `Sat, 15 Mar 2025 10:23:00 -0400`

A subset of ISO 8601 without an offset, e.g., `2025-03-15` or
`2025-03-15T10:23`. When a time is missing, the first instant of the
corresponding day is used. The datetime is interpreted as a local time in your
system's configured time zone (which may be overridden by the `TZ` environment
variable).

`now` refers to the current datetime. The current datetime is computed once
when timetable starts, or if the `TIMETABLE_NOW` environment variable is set,
that time is used instead.

`today`, `yesterday` and `tomorrow` refer to the first instant of the current,
previous and next day, respectively.
"#,
    );

    pub const ARG_START: Usage = Usage::arg(
        "<start>",
        "The inclusive start of the range, e.g., `today`.",
        r#"
The inclusive start of the range.

This accepts the same formats as datetimes given to other commands, e.g.,
`now`, `today`, `2025-03-15` or `2025-03-15T10:23:00-04:00[America/New_York]`.

Occurrences are computed in the time zone of this datetime.
"#,
    );

    pub const ARG_END: Usage = Usage::arg(
        "<end>",
        "The exclusive end of the range, e.g., `2026-01-01`.",
        r#"
The exclusive end of the range.

This accepts the same formats as `<start>`. If it is in a different time zone
than `<start>`, then it is converted to the time zone of `<start>` first. The
end of the range must not come before its start.
"#,
    );

    /// Get the underlying Jiff zoned datetime.
    pub fn get(&self) -> &Zoned {
        &self.zdt
    }

    /// Consume this datetime and return the underlying zoned datetime.
    pub fn into_zoned(self) -> Zoned {
        self.zdt
    }

    /// Returns this same instant in the time zone of `other`.
    pub fn in_tz_of(&self, other: &DateTime) -> DateTime {
        let tz = other.zdt.time_zone().clone();
        DateTime { zdt: self.zdt.with_time_zone(tz) }
    }
}

impl From<Zoned> for DateTime {
    fn from(zdt: Zoned) -> DateTime {
        DateTime { zdt }
    }
}

impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.zdt, f)
    }
}

impl std::str::FromStr for DateTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<DateTime> {
        s.as_bytes().parse()
    }
}

impl FromBytes for DateTime {
    type Err = anyhow::Error;

    fn from_bytes(s: &[u8]) -> anyhow::Result<DateTime> {
        if let Some(zdt) = parse_named(&NOW, s.as_bstr())? {
            return Ok(DateTime::from(zdt));
        }
        // We attempt the most specific thing first: an RFC 9557
        // timestamp with a time zone annotation.
        //
        // We do keep the error for this around, since if we later
        // find out that we did have a time zone annotation but
        // something else about it was invalid, then we'll want to
        // return this error.
        let temporal_parse_err = match TEMPORAL_PARSER.parse_zoned(s) {
            Err(err) => err,
            Ok(zdt) => return Ok(DateTime::from(zdt)),
        };
        if let Ok(pieces) = fmt::temporal::Pieces::parse(s) {
            // If we parsed a time zone annotation, that means
            // the RFC 9557 parse failed for exciting reasons.
            // Like perhaps, an offset inconsistent with the
            // time zone. Or an invalid time zone name. So we
            // should just return the error that we got above.
            if pieces.time_zone_annotation().is_some() {
                return Err(temporal_parse_err.into());
            }
            let date = pieces.date();
            let time = pieces.time().unwrap_or(civil::Time::midnight());
            let dt = date.to_datetime(time);
            let zdt = match pieces.offset() {
                None if pieces.time().is_none() => {
                    date.to_zoned(TZ.clone()).with_context(|| {
                        format!("failed to find start of {date}")
                    })?
                }
                None => dt.to_zoned(TZ.clone())?,
                Some(fmt::temporal::PiecesOffset::Zulu) => {
                    dt.to_zoned(tz::TimeZone::UTC)?
                }
                Some(fmt::temporal::PiecesOffset::Numeric(ref off)) => {
                    if off.offset() == Offset::UTC {
                        dt.to_zoned(tz::TimeZone::UTC)?
                    } else {
                        dt.to_zoned(tz::TimeZone::fixed(off.offset()))?
                    }
                }
                Some(unk) => {
                    anyhow::bail!("unrecognized parsed offset: {unk:?}")
                }
            };
            return Ok(DateTime::from(zdt));
        }
        // N.B. This also includes RFC 9110.
        if let Ok(zdt) = RFC2822_PARSER.parse_zoned(s) {
            return Ok(DateTime::from(zdt));
        }
        anyhow::bail!("unrecognized datetime `{s}`", s = BStr::new(s))
    }
}

/// Parses one of the named datetimes relative to the one given.
///
/// If `s` isn't one of the names, then `None` is returned.
fn parse_named(relative: &Zoned, s: &BStr) -> anyhow::Result<Option<Zoned>> {
    let zdt = match &*s.to_ascii_lowercase() {
        b"now" => relative.clone(),
        b"today" => relative.start_of_day()?,
        b"yesterday" => relative.yesterday()?.start_of_day()?,
        b"tomorrow" => relative.tomorrow()?.start_of_day()?,
        _ => return Ok(None),
    };
    Ok(Some(zdt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> String {
        s.parse::<DateTime>().unwrap().to_string()
    }

    #[test]
    fn formats() {
        assert_eq!(
            parse("2024-03-10T01:30[America/New_York]"),
            "2024-03-10T01:30:00-05:00[America/New_York]",
        );
        assert_eq!(
            parse("2024-03-10T12:00[America/New_York]"),
            "2024-03-10T12:00:00-04:00[America/New_York]",
        );
        assert_eq!(
            parse("2024-03-10T12:00:00Z"),
            "2024-03-10T12:00:00+00:00[UTC]",
        );
        assert_eq!(
            parse("2024-03-10T12:00:00+05:30"),
            "2024-03-10T12:00:00+05:30[+05:30]",
        );
        assert_eq!(
            parse("Sun, 10 Mar 2024 12:00:00 +0530"),
            "2024-03-10T12:00:00+05:30[+05:30]",
        );
    }

    #[test]
    fn named() {
        let relative: Zoned =
            "2024-07-20T16:30:55[America/New_York]".parse().unwrap();
        let named = |s: &str| {
            parse_named(&relative, s.into()).unwrap().map(|z| z.to_string())
        };
        assert_eq!(
            named("now").as_deref(),
            Some("2024-07-20T16:30:55-04:00[America/New_York]"),
        );
        assert_eq!(
            named("today").as_deref(),
            Some("2024-07-20T00:00:00-04:00[America/New_York]"),
        );
        assert_eq!(
            named("Tomorrow").as_deref(),
            Some("2024-07-21T00:00:00-04:00[America/New_York]"),
        );
        assert_eq!(
            named("yesterday").as_deref(),
            Some("2024-07-19T00:00:00-04:00[America/New_York]"),
        );
        assert_eq!(named("later"), None);
    }

    #[test]
    fn invalid() {
        let err = "2024-13-01".parse::<DateTime>().unwrap_err();
        assert!(format!("{err:#}").contains("2024-13-01"), "{err:#}");
        let err = "whenever".parse::<DateTime>().unwrap_err();
        insta::assert_snapshot!(err, @"unrecognized datetime `whenever`");
    }
}
