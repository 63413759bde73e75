use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_instant(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .or_else(|| parse_day(raw).map(|d| d.midnight().assume_utc()))
}

pub fn parse_day(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_both_forms() {
        assert_eq!(
            parse_instant("2024-03-05T10:30:00Z"),
            Some(datetime!(2024-03-05 10:30 UTC))
        );
        assert_eq!(parse_instant("2024-03-05"), Some(datetime!(2024-03-05 0:00 UTC)));
        assert_eq!(parse_instant("next tuesday"), None);
        assert_eq!(parse_day("2024-13-01"), None);
    }
}
