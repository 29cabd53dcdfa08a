use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};
use utility::id::HasId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAvailability {
    Available,
    Unavailable,
}

impl ServiceAvailability {
    pub fn from_bool(value: bool) -> Self {
        if value {
            Self::Available
        } else {
            Self::Unavailable
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn or(self, other: ServiceAvailability) -> ServiceAvailability {
        if self.is_available() {
            self
        } else {
            other
        }
    }
}

#[derive(Debug, Clone)]
pub struct Service {
    pub windows: Vec<CalendarWindow>,
    pub dates: Vec<CalendarDate>,
}

impl Service {
    pub fn check_availability(&self, date: NaiveDate) -> ServiceAvailability {
        ServiceAvailability::from_bool(
            self.windows
                .iter()
                .any(|entry| entry.check_availability(date).is_available())
                || self.dates.iter().any(|entry| {
                    entry.date == date
                        && entry.exception_type == ServiceExceptionType::Added
                }),
        )
    }

    /// Returns a sorted vec of all days, at which the service is available
    /// within an optionally specified range.
    pub fn available_days(
        &self,
        earliest: Option<NaiveDate>,
        latest: Option<NaiveDate>,
    ) -> Vec<NaiveDate> {
        let mut days = self
            .windows
            .iter()
            .flat_map(|window| window.available_days(earliest, latest))
            .collect::<HashSet<_>>();

        for date in self.dates.iter() {
            let is_in_range = match (earliest, latest) {
                (Some(earliest), Some(latest)) => {
                    date.date >= earliest && date.date <= latest
                }
                (Some(earliest), None) => date.date >= earliest,
                (None, Some(latest)) => date.date <= latest,
                _ => true,
            };

            if !is_in_range {
                continue;
            }

            if date.exception_type == ServiceExceptionType::Added {
                days.insert(date.date);
            } else {
                days.remove(&date.date);
            }
        }

        let mut days = days.into_iter().collect::<Vec<_>>();
        days.sort();
        days
    }
}

impl HasId for Service {
    type IdType = i32;
}

#[derive(Debug, Clone)]
pub struct CalendarWindow {
    pub monday: ServiceAvailability,
    pub tuesday: ServiceAvailability,
    pub wednesday: ServiceAvailability,
    pub thursday: ServiceAvailability,
    pub friday: ServiceAvailability,
    pub saturday: ServiceAvailability,
    pub sunday: ServiceAvailability,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl CalendarWindow {
    pub fn check_availability(&self, date: NaiveDate) -> ServiceAvailability {
        if date < self.start_date || date > self.end_date {
            return ServiceAvailability::Unavailable;
        }
        match date.weekday() {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    /// Returns a sorted vec of all days, at which the service is available
    /// within an optionally specified range.
    pub fn available_days(
        &self,
        earliest: Option<NaiveDate>,
        latest: Option<NaiveDate>,
    ) -> Vec<NaiveDate> {
        let start = earliest
            .filter(|earliest| *earliest > self.start_date)
            .unwrap_or(self.start_date);
        let end = latest
            .filter(|latest| *latest < self.end_date)
            .unwrap_or(self.end_date);

        let mut days = vec![];
        for day in start.iter_days() {
            if day > end {
                break;
            }
            if self.check_availability(day).is_available() {
                days.push(day);
            }
        }
        days
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceExceptionType {
    Added,
    Removed,
}

#[derive(Debug, Clone)]
pub struct CalendarDate {
    pub date: NaiveDate,
    pub exception_type: ServiceExceptionType,
}
