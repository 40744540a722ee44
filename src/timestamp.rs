//! RFC-822 publish timestamps.
//!
//! A [`PublishTime`] is created once per feed entry.  Both the item's
//! `<pubDate>` and the channel's `<lastBuildDate>` are copied from the same
//! value, so the two strings are always byte-identical.

use chrono::{DateTime, Utc};

/// The one format used for every timestamp written into the feed.
pub const RFC822_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// Format an instant as `Mon, 01 Jan 2024 00:00:00 +0000` (always UTC).
pub fn format_rfc822(instant: DateTime<Utc>) -> String {
    instant.format(RFC822_FORMAT).to_string()
}

/// Parse a feed timestamp back into UTC.  Accepts any RFC-2822 offset.
pub fn parse_rfc822(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(text.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A publish instant together with its canonical rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTime {
    instant: DateTime<Utc>,
    rendered: String,
}

impl PublishTime {
    pub fn new(instant: DateTime<Utc>) -> Self {
        // Sub-second precision is not representable in the feed; drop it so
        // the instant and the string agree.
        let instant = DateTime::from_timestamp(instant.timestamp(), 0).unwrap_or(instant);
        Self {
            rendered: format_rfc822(instant),
            instant,
        }
    }

    /// Publish at `now`, but never earlier than the feed's previous build.
    pub fn not_before(now: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> Self {
        match previous {
            Some(prev) if prev > now => Self::new(prev),
            _ => Self::new(now),
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_with_fixed_offset() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_rfc822(ts), "Mon, 01 Jan 2024 00:00:00 +0000");

        let ts = Utc.with_ymd_and_hms(2025, 10, 5, 17, 4, 9).unwrap();
        assert_eq!(format_rfc822(ts), "Sun, 05 Oct 2025 17:04:09 +0000");
    }

    #[test]
    fn parse_round_trips_formatted_value() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 15, 12, 30, 0).unwrap();
        assert_eq!(parse_rfc822(&format_rfc822(ts)), Some(ts));
    }

    #[test]
    fn parse_normalises_other_offsets() {
        let parsed = parse_rfc822("Mon, 01 Jan 2024 02:00:00 +0200").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_rfc822("not-a-real-date").is_none());
    }

    #[test]
    fn publish_time_drops_subseconds() {
        let ts = Utc.timestamp_opt(1_700_000_000, 750_000_000).unwrap();
        let pt = PublishTime::new(ts);
        assert_eq!(pt.instant().timestamp_subsec_nanos(), 0);
        assert_eq!(parse_rfc822(pt.as_str()), Some(pt.instant()));
    }

    #[test]
    fn not_before_keeps_build_date_monotonic() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        assert_eq!(PublishTime::not_before(later, Some(earlier)).instant(), later);
        assert_eq!(PublishTime::not_before(earlier, Some(later)).instant(), later);
        assert_eq!(PublishTime::not_before(earlier, None).instant(), earlier);
    }
}
