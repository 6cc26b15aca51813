use regex::Regex;

pub struct DurationHelper {}

impl DurationHelper {
    /// # parse a lap time string
    /// parse a human readable lap time of the shape `M:SS.fff` into an
    /// exact amount of milliseconds. the minutes part can have any
    /// number of digits and a leading zero is insignificant. whitespace
    /// anywhere in the string is ignored, timing sheets tend to smuggle
    /// spaces into the middle of a time.
    ///
    /// ## Arguments
    /// * `text` - the lap time text to parse
    ///
    /// ## Returns
    /// * `Option<i64>` - the lap time in milliseconds, or `None` when
    ///   the text does not conform. malformed lap times are dropped by
    ///   the caller instead of aborting ingestion.
    pub fn parse_laptime(text: &str) -> Option<i64> {
        let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();

        let re = Regex::new(r"^(\d+):(\d{2})\.(\d{3})$").unwrap();
        let captures = re.captures(&cleaned)?;

        let minutes: i64 = captures[1].parse().ok()?;
        let seconds: i64 = captures[2].parse().ok()?;
        let millis: i64 = captures[3].parse().ok()?;

        Some(minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// # format a lap time
    /// format milliseconds back into the canonical `M:SS.fff` form,
    /// minutes unpadded. an absent or non positive duration formats as
    /// `None`, never as the string "0:00.000".
    ///
    /// ## Arguments
    /// * `duration` - the duration in milliseconds, if any
    ///
    /// ## Returns
    /// * `Option<String>` - the canonical text, or `None`
    pub fn format_laptime(duration: Option<i64>) -> Option<String> {
        let millis = duration?;
        if millis <= 0 {
            return None;
        }

        let minutes = millis / 60_000;
        let seconds = (millis / 1_000) % 60;
        let remainder = millis % 1_000;

        Some(format!("{}:{:02}.{:03}", minutes, seconds, remainder))
    }
}

#[cfg(test)]
mod tests {
    use super::DurationHelper;

    #[test]
    fn parses_canonical_times() {
        assert_eq!(DurationHelper::parse_laptime("0:36.776"), Some(36_776));
        assert_eq!(DurationHelper::parse_laptime("1:23.854"), Some(83_854));
        assert_eq!(DurationHelper::parse_laptime("12:34.567"), Some(754_567));
    }

    #[test]
    fn leading_zero_on_minutes_is_insignificant() {
        assert_eq!(
            DurationHelper::parse_laptime("01:23.456"),
            DurationHelper::parse_laptime("1:23.456"),
        );
    }

    #[test]
    fn tolerates_whitespace() {
        assert_eq!(DurationHelper::parse_laptime("  0:36.776 "), Some(36_776));
        assert_eq!(DurationHelper::parse_laptime("0: 36.776"), Some(36_776));
    }

    #[test]
    fn rejects_malformed_text() {
        assert_eq!(DurationHelper::parse_laptime(""), None);
        assert_eq!(DurationHelper::parse_laptime("garbled"), None);
        assert_eq!(DurationHelper::parse_laptime("36.776"), None);
        assert_eq!(DurationHelper::parse_laptime("0:36"), None);
        assert_eq!(DurationHelper::parse_laptime("0:36.77"), None);
        assert_eq!(DurationHelper::parse_laptime("0:36.7761"), None);
        assert_eq!(DurationHelper::parse_laptime("0:6.776"), None);
        assert_eq!(DurationHelper::parse_laptime("a:36.776"), None);
        assert_eq!(DurationHelper::parse_laptime("0:36,776"), None);
    }

    #[test]
    fn formats_canonically() {
        assert_eq!(
            DurationHelper::format_laptime(Some(36_776)),
            Some("0:36.776".to_string()),
        );
        assert_eq!(
            DurationHelper::format_laptime(Some(754_567)),
            Some("12:34.567".to_string()),
        );
        // sub second remainder is truncated, not rounded
        assert_eq!(
            DurationHelper::format_laptime(Some(59_999)),
            Some("0:59.999".to_string()),
        );
    }

    #[test]
    fn absent_duration_formats_as_none() {
        assert_eq!(DurationHelper::format_laptime(None), None);
        assert_eq!(DurationHelper::format_laptime(Some(0)), None);
        assert_eq!(DurationHelper::format_laptime(Some(-5)), None);
    }

    #[test]
    fn format_then_parse_roundtrips() {
        for millis in [1, 999, 1_000, 36_776, 60_000, 83_854, 600_000, 754_567] {
            let text = DurationHelper::format_laptime(Some(millis)).unwrap();
            assert_eq!(DurationHelper::parse_laptime(&text), Some(millis));
        }
    }

    #[test]
    fn parse_accepts_non_canonical_seconds() {
        // no range check on the seconds group, two digits is two digits
        assert_eq!(DurationHelper::parse_laptime("1:75.000"), Some(135_000));
    }
}
