//! In-game calendar and compact duration strings for log lines.

use serde::{Deserialize, Serialize};

/// Six-hour day of the stock home world.
pub const DEFAULT_DAY_SECONDS: f64 = 21_600.0;

/// Days in a stock home-world year.
pub const DEFAULT_YEAR_DAYS: f64 = 426.0;

/// Seconds in a minute.
pub const MINUTE_SECONDS: f64 = 60.0;

/// Seconds in an hour; hours are the same length on every calendar.
pub const HOUR_SECONDS: f64 = 3_600.0;

/// Day and year length used for "days" rounding and for formatting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub day_seconds: f64,
    pub year_days: f64,
}

impl Calendar {
    /// 24-hour days, 365-day years.
    pub fn earth() -> Self {
        Self {
            day_seconds: 86_400.0,
            year_days: 365.0,
        }
    }

    pub fn year_seconds(&self) -> f64 {
        self.day_seconds * self.year_days
    }

    pub fn days_to_seconds(&self, days: f64) -> f64 {
        days * self.day_seconds
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            day_seconds: DEFAULT_DAY_SECONDS,
            year_days: DEFAULT_YEAR_DAYS,
        }
    }
}

/// Format a duration as e.g. `"2 d 3 h 15 m 59 s"`, hiding leading zero
/// units. Once a larger unit is shown, every smaller unit down to minutes is
/// shown too; seconds only when non-zero or when the whole value is under a
/// minute.
pub fn format_duration(seconds: f64, calendar: &Calendar) -> String {
    if seconds.is_nan() || seconds == 0.0 {
        return "—".to_string();
    }
    if seconds < 0.0 {
        return format!("-{}", format_duration(-seconds, calendar));
    }
    let year = calendar.year_seconds();
    if seconds > year * 10.0 {
        return "10y+".to_string();
    }

    let day = calendar.day_seconds;
    let mut t = seconds;
    let mut parts: Vec<String> = Vec::new();
    let mut show_zero = false;

    if t >= year {
        let y = (t / year).floor();
        t -= y * year;
        parts.push(format!("{} y", y));
        show_zero = true;
    }
    if t >= day || (show_zero && t >= 1.0) {
        let d = (t / day).floor();
        t -= d * day;
        parts.push(format!("{} d", d));
        show_zero = true;
    }
    if t >= HOUR_SECONDS || show_zero {
        let h = (t / HOUR_SECONDS).floor();
        t -= h * HOUR_SECONDS;
        parts.push(format!("{} h", h));
        show_zero = true;
    }
    if t >= MINUTE_SECONDS || show_zero {
        let m = (t / MINUTE_SECONDS).floor();
        t -= m * MINUTE_SECONDS;
        parts.push(format!("{} m", m));
    }
    if seconds < MINUTE_SECONDS || t.floor() > 0.0 {
        parts.push(format!("{:.0} s", t));
    }

    parts.join(" ")
}
