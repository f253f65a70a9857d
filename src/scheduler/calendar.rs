//! Venue trading calendar

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Daily session window plus closed weekdays, all in the venue timezone.
///
/// Sessions that cross midnight (`close < open`) wrap into the next day.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    timezone: Tz,
    open_minutes: u32,
    close_minutes: u32,
    closed_weekdays: Vec<Weekday>,
}

impl TradingCalendar {
    pub fn new(
        timezone: Tz,
        open_hour: u32,
        open_minute: u32,
        close_hour: u32,
        close_minute: u32,
        closed_weekdays: Vec<Weekday>,
    ) -> Self {
        Self {
            timezone,
            open_minutes: open_hour * 60 + open_minute,
            close_minutes: close_hour * 60 + close_minute,
            closed_weekdays,
        }
    }

    /// A calendar that never closes, for venues quoted around the clock
    pub fn always_open(timezone: Tz) -> Self {
        Self {
            timezone,
            open_minutes: 0,
            close_minutes: 24 * 60,
            closed_weekdays: vec![],
        }
    }

    /// Whether the venue is quoting at the given instant
    pub fn is_open(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.timezone);
        if self.closed_weekdays.contains(&local.weekday()) {
            return false;
        }

        let minutes = local.hour() * 60 + local.minute();
        if self.open_minutes <= self.close_minutes {
            minutes >= self.open_minutes && minutes < self.close_minutes
        } else {
            // Overnight session
            minutes >= self.open_minutes || minutes < self.close_minutes
        }
    }
}

/// Parse a weekday name from configuration ("mon".."sun", full names ok)
pub fn parse_weekday(raw: &str) -> anyhow::Result<Weekday> {
    match raw.to_ascii_lowercase().as_str() {
        "mon" | "monday" => Ok(Weekday::Mon),
        "tue" | "tuesday" => Ok(Weekday::Tue),
        "wed" | "wednesday" => Ok(Weekday::Wed),
        "thu" | "thursday" => Ok(Weekday::Thu),
        "fri" | "friday" => Ok(Weekday::Fri),
        "sat" | "saturday" => Ok(Weekday::Sat),
        "sun" | "sunday" => Ok(Weekday::Sun),
        other => anyhow::bail!("unknown weekday: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn ny(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        New_York
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn equities_calendar() -> TradingCalendar {
        TradingCalendar::new(
            New_York,
            9,
            30,
            16,
            0,
            vec![Weekday::Sat, Weekday::Sun],
        )
    }

    #[test]
    fn test_open_during_session() {
        let calendar = equities_calendar();
        // Wednesday 2025-03-12
        assert!(calendar.is_open(ny(2025, 3, 12, 9, 30)));
        assert!(calendar.is_open(ny(2025, 3, 12, 12, 0)));
        assert!(!calendar.is_open(ny(2025, 3, 12, 16, 0)));
        assert!(!calendar.is_open(ny(2025, 3, 12, 8, 0)));
    }

    #[test]
    fn test_closed_on_weekend() {
        let calendar = equities_calendar();
        // Saturday 2025-03-15
        assert!(!calendar.is_open(ny(2025, 3, 15, 12, 0)));
    }

    #[test]
    fn test_overnight_session_wraps() {
        let calendar = TradingCalendar::new(New_York, 22, 0, 6, 0, vec![]);
        assert!(calendar.is_open(ny(2025, 3, 12, 23, 0)));
        assert!(calendar.is_open(ny(2025, 3, 12, 3, 0)));
        assert!(!calendar.is_open(ny(2025, 3, 12, 12, 0)));
    }

    #[test]
    fn test_always_open() {
        let calendar = TradingCalendar::always_open(New_York);
        assert!(calendar.is_open(ny(2025, 3, 15, 3, 0)));
        assert!(calendar.is_open(ny(2025, 3, 16, 23, 59)));
    }

    #[test]
    fn test_parse_weekday() {
        assert_eq!(parse_weekday("sat").unwrap(), Weekday::Sat);
        assert_eq!(parse_weekday("Sunday").unwrap(), Weekday::Sun);
        assert!(parse_weekday("noday").is_err());
    }
}
