//! Working-day calendar for the digest.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A named holiday spanning `start..=end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayPeriod {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl HolidayPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkCalendar {
    holidays: Vec<HolidayPeriod>,
    adjusted_workdays: Vec<NaiveDate>,
}

impl WorkCalendar {
    pub fn new(holidays: Vec<HolidayPeriod>, adjusted_workdays: Vec<NaiveDate>) -> Self {
        Self {
            holidays,
            adjusted_workdays,
        }
    }

    /// Adjusted working days win over holidays, holidays over weekends.
    pub fn is_workday(&self, date: NaiveDate) -> bool {
        if self.adjusted_workdays.contains(&date) {
            return true;
        }
        if self.holiday_on(date).is_some() {
            return false;
        }
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn holiday_on(&self, date: NaiveDate) -> Option<&HolidayPeriod> {
        self.holidays.iter().find(|h| h.contains(date))
    }

    /// The holiday whose first day is `date`.
    pub fn holiday_starting(&self, date: NaiveDate) -> Option<&HolidayPeriod> {
        self.holidays.iter().find(|h| h.start == date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn calendar() -> WorkCalendar {
        WorkCalendar::new(
            vec![HolidayPeriod {
                name: "National Day".into(),
                start: d(2026, 10, 1),
                end: d(2026, 10, 7),
            }],
            vec![d(2026, 10, 10)],
        )
    }

    #[test]
    fn test_weekdays_and_weekends() {
        let cal = calendar();
        assert!(cal.is_workday(d(2026, 9, 30)));
        assert!(!cal.is_workday(d(2026, 9, 27)));
    }

    #[test]
    fn test_holidays_and_adjusted_days() {
        let cal = calendar();
        assert!(!cal.is_workday(d(2026, 10, 5)));
        // Saturday made a working day
        assert!(cal.is_workday(d(2026, 10, 10)));
        assert_eq!(cal.holiday_starting(d(2026, 10, 1)).map(|h| h.name.as_str()), Some("National Day"));
        assert!(cal.holiday_starting(d(2026, 10, 2)).is_none());
        assert!(cal.holiday_on(d(2026, 10, 2)).is_some());
    }
}
