use std::time::Duration;

/// Reads one variable through `lookup`, dropping blank values.
pub(crate) fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

pub(crate) fn parse_var<F, T>(lookup: &F, name: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    non_empty(lookup, name).and_then(|raw| raw.parse().ok())
}

pub(crate) fn parse_duration(raw: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(raw.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_ignored() {
        let lookup = |name: &str| match name {
            "BLANK" => Some("   ".to_string()),
            "NUM" => Some(" 12 ".to_string()),
            "BAD" => Some("twelve".to_string()),
            _ => None,
        };

        assert_eq!(non_empty(&lookup, "BLANK"), None);
        assert_eq!(parse_var::<_, usize>(&lookup, "NUM"), Some(12));
        assert_eq!(parse_var::<_, usize>(&lookup, "BAD"), None);
        assert_eq!(parse_var::<_, usize>(&lookup, "MISSING"), None);
    }

    #[test]
    fn durations_use_humantime_syntax() {
        assert_eq!(parse_duration("30s").expect("parse"), Duration::from_secs(30));
        assert_eq!(
            parse_duration("1m 30s").expect("parse"),
            Duration::from_secs(90)
        );
        assert!(parse_duration("soon").is_err());
    }
}
