//! Pure helpers for tailing and filtering log lines.

use crate::config::LogConfig;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

/// Filter applied before the tail cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Case-insensitive substring.
    pub search: Option<String>,
    /// First day included, from 00:00:00.
    pub start: Option<NaiveDate>,
    /// Last day included, through 23:59:59.
    pub end: Option<NaiveDate>,
}

impl LogFilter {
    /// Build from raw query strings. Empty values and dates that are not
    /// `YYYY-MM-DD` are ignored.
    pub fn from_query(search: Option<&str>, start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            start: start.and_then(parse_date),
            end: end.and_then(parse_date),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.start.is_none() && self.end.is_none()
    }

    fn start_bound(&self) -> Option<NaiveDateTime> {
        self.start.map(|d| d.and_time(NaiveTime::MIN))
    }

    fn end_bound(&self) -> Option<NaiveDateTime> {
        self.end
            .and_then(|d| d.and_hms_opt(23, 59, 59))
    }

    /// Whether `line` passes the filter.
    pub fn accepts(&self, line: &str) -> bool {
        if let Some(search) = &self.search {
            if !line.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }

        if self.start.is_none() && self.end.is_none() {
            return true;
        }

        // Lines without a leading timestamp are kept.
        let Some(ts) = parse_line_timestamp(line) else {
            return true;
        };
        if self.start_bound().is_some_and(|start| ts < start) {
            return false;
        }
        if self.end_bound().is_some_and(|end| ts > end) {
            return false;
        }
        true
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, LogConfig::DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            debug!("Ignoring invalid date filter {:?}: {}", raw, e);
            None
        }
    }
}

/// Parse a leading `[YYYY-MM-DD HH:MM:SS]`.
pub fn parse_line_timestamp(line: &str) -> Option<NaiveDateTime> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    NaiveDateTime::parse_from_str(&rest[..end], LogConfig::TIMESTAMP_FORMAT).ok()
}

/// Lines accepted by `filter`, in original order.
pub fn filter_lines(lines: Vec<String>, filter: &LogFilter) -> Vec<String> {
    if filter.is_empty() {
        return lines;
    }
    lines.into_iter().filter(|l| filter.accepts(l)).collect()
}

/// The last `limit` lines, in original order.
pub fn tail_lines(mut lines: Vec<String>, limit: usize) -> Vec<String> {
    if lines.len() > limit {
        lines.drain(..lines.len() - limit);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<String> {
        vec![
            "[2024-03-01 08:00:00] Update state (0x3) reconfiguring".to_string(),
            "[2024-03-02 12:30:00] Success! App '376030' fully installed.".to_string(),
            "Loading Steam API...OK".to_string(),
            "[2024-03-03 23:59:59] ERROR! Failed to install app".to_string(),
        ]
    }

    #[test]
    fn test_tail_lines() {
        assert_eq!(tail_lines(sample(), 10), sample());
        let last_two = tail_lines(sample(), 2);
        assert_eq!(last_two, sample()[2..].to_vec());
        assert!(tail_lines(sample(), 0).is_empty());
    }

    #[test]
    fn test_search_absent_and_universal() {
        let none = LogFilter::from_query(Some("nothing-like-this"), None, None);
        assert!(filter_lines(sample(), &none).is_empty());

        let all: Vec<String> = sample().iter().map(|l| format!("{} [ark]", l)).collect();
        let every = LogFilter::from_query(Some("[ARK]"), None, None);
        assert_eq!(filter_lines(all.clone(), &every), all);
    }

    #[test]
    fn test_date_filter_is_inclusive_and_keeps_unparseable() {
        let filter = LogFilter::from_query(None, Some("2024-03-02"), Some("2024-03-03"));
        let kept = filter_lines(sample(), &filter);
        assert_eq!(kept, sample()[1..].to_vec());
    }

    #[test]
    fn test_search_applies_before_dates() {
        let filter = LogFilter::from_query(Some("error"), Some("2024-03-01"), None);
        assert_eq!(filter_lines(sample(), &filter), vec![sample()[3].clone()]);
    }

    #[test]
    fn test_invalid_dates_are_ignored() {
        let filter = LogFilter::from_query(Some("  "), Some("03/01/2024"), Some(""));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_parse_line_timestamp() {
        assert!(parse_line_timestamp("[2024-03-01 08:00:00] x").is_some());
        assert!(parse_line_timestamp("[SERVER_1] x").is_none());
        assert!(parse_line_timestamp("no bracket").is_none());
    }
}
