//! Timestamp normalization shared by the filter compiler and row decoding.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Formats an instant as UTC with millisecond precision, e.g.
/// `2016-01-01T10:00:00.000Z`.
pub fn to_iso8601(instant: OffsetDateTime) -> Option<String> {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");
    instant.to_offset(UtcOffset::UTC).format(&format).ok()
}

/// Parses an RFC 3339 timestamp and re-renders it with [`to_iso8601`].
///
/// Returns `None` when `input` is not a valid RFC 3339 timestamp.
pub fn normalize_timestamp(input: &str) -> Option<String> {
    let parsed = OffsetDateTime::parse(input.trim(), &Rfc3339).ok()?;
    to_iso8601(parsed)
}

fn parse_postgres_bound(bound: &str) -> Option<OffsetDateTime> {
    let bound = bound.trim().trim_matches('"');
    let with_offset = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]][offset_hour sign:mandatory][optional [:[offset_minute]]]"
    );
    if let Ok(parsed) = OffsetDateTime::parse(bound, &with_offset) {
        return Some(parsed);
    }
    let naive = format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]");
    PrimitiveDateTime::parse(bound, &naive)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
        .or_else(|| OffsetDateTime::parse(bound, &Rfc3339).ok())
}

/// Converts the text form of a PostgreSQL `tstzrange` into an ISO 8601
/// interval.
///
/// `["2014-03-01 13:00:00+00","2015-05-11 15:30:00+00")` becomes
/// `2014-03-01T13:00:00.000Z/2015-05-11T15:30:00.000Z`. Input that does not
/// look like a range is returned unchanged.
pub fn postgres_range_to_iso8601(range: &str) -> String {
    let inner = range
        .trim()
        .trim_start_matches(['[', '('])
        .trim_end_matches([']', ')']);
    let Some((start, end)) = inner.split_once(',') else {
        return range.to_owned();
    };
    match (
        parse_postgres_bound(start).and_then(to_iso8601),
        parse_postgres_bound(end).and_then(to_iso8601),
    ) {
        (Some(start), Some(end)) => format!("{start}/{end}"),
        _ => range.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_offsets_to_utc_millis() {
        assert_eq!(
            normalize_timestamp("2016-01-01T12:00:00+02:00").as_deref(),
            Some("2016-01-01T10:00:00.000Z")
        );
        assert_eq!(
            normalize_timestamp("2009-11-10T23:00:00.123456Z").as_deref(),
            Some("2009-11-10T23:00:00.123Z")
        );
        assert!(normalize_timestamp("yesterday").is_none());
    }

    #[test]
    fn converts_quoted_postgres_range() {
        assert_eq!(
            postgres_range_to_iso8601(r#"["2014-03-01 13:00:00+00","2015-05-11 15:30:00+00"]"#),
            "2014-03-01T13:00:00.000Z/2015-05-11T15:30:00.000Z"
        );
    }

    #[test]
    fn converts_half_open_range_with_offset() {
        assert_eq!(
            postgres_range_to_iso8601("[2014-03-01 15:00:00.5+02,2014-03-02 00:00:00+00)"),
            "2014-03-01T13:00:00.500Z/2014-03-02T00:00:00.000Z"
        );
    }

    #[test]
    fn leaves_non_ranges_untouched() {
        assert_eq!(postgres_range_to_iso8601("empty"), "empty");
        assert_eq!(postgres_range_to_iso8601("[a,b]"), "[a,b]");
    }
}
