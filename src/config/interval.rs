/// Longest accepted interval, one year.
pub const MAX_INTERVAL_SECS: u64 = 365 * 86400;

/// Parse an interval like "90s", "2m", "1h" or "1d" into seconds.
/// A bare number is taken as seconds.
pub fn parse_interval(s: &str) -> Result<u64, String> {
    let s = s.trim().to_lowercase();

    let (digits, unit) = match s.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&s[..idx], c),
        _ => (s.as_str(), 's'),
    };

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86400,
        other => {
            return Err(format!(
                "Invalid interval unit '{}' in {:?}. Use format like '90s', '2m', '1h'",
                other, s
            ))
        }
    };

    let value = digits
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("Invalid interval: {:?}. Use format like '90s', '2m', '1h'", s))?;

    if value == 0 {
        return Err("Interval must be greater than zero".to_string());
    }

    value
        .checked_mul(multiplier)
        .filter(|&secs| secs <= MAX_INTERVAL_SECS)
        .ok_or_else(|| {
            format!(
                "Invalid interval: {:?} is longer than {}",
                s,
                format_interval(MAX_INTERVAL_SECS)
            )
        })
}

/// Format seconds using the largest whole unit.
pub fn format_interval(secs: u64) -> String {
    if secs >= 86400 && secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("2m").unwrap(), 120);
        assert_eq!(parse_interval("90s").unwrap(), 90);
        assert_eq!(parse_interval("1h").unwrap(), 3600);
        assert_eq!(parse_interval("1d").unwrap(), 86400);
        assert_eq!(parse_interval("45").unwrap(), 45);
        assert_eq!(parse_interval(" 3M ").unwrap(), 180);
        assert!(parse_interval("0m").is_err());
        assert!(parse_interval("2w").is_err());
        assert!(parse_interval("soon").is_err());
    }

    #[test]
    fn test_parse_interval_rejects_overflow() {
        let err = parse_interval("999999999999999999d").unwrap_err();
        assert!(err.contains("longer than 365d"));
        assert!(parse_interval("18446744073709551615").is_err());
        assert!(parse_interval("366d").is_err());
        assert_eq!(parse_interval("365d").unwrap(), MAX_INTERVAL_SECS);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(120), "2m");
        assert_eq!(format_interval(90), "90s");
        assert_eq!(format_interval(7200), "2h");
        assert_eq!(format_interval(86400), "1d");
    }
}
