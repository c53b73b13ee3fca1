use std::cmp::Ordering;

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::model::employee::Employee;

/// Forward looking window used to decide whether a birthday is "upcoming".
/// Both ends are inclusive: `[today, today + horizon]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Days(u32),
    /// Calendar months, clamped to the end of the target month
    Months(u32),
}

impl Horizon {
    /// Last date that still counts as upcoming, saturating at the last representable date
    pub fn end_from(&self, today: NaiveDate) -> NaiveDate {
        let end = match self {
            Horizon::Days(days) => today.checked_add_days(Days::new(u64::from(*days))),
            Horizon::Months(months) => today.checked_add_months(Months::new(*months)),
        };

        end.unwrap_or(NaiveDate::MAX)
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Horizon::Months(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingBirthday<'a> {
    pub employee: &'a Employee,
    /// Birthday projected onto today's year, or next year when already passed
    pub next_occurrence: NaiveDate,
    pub days_until: i64,
}

impl UpcomingBirthday<'_> {
    /// Feb 29 birthday observed on Feb 28 because the projected year is not a leap year
    pub fn is_leap_day_fallback(&self) -> bool {
        self.employee.birthday.month() == 2
            && self.employee.birthday.day() == 29
            && self.next_occurrence.day() == 28
    }
}

/// Month and day match, the birth year is ignored
pub fn is_birthday_today(birthday: NaiveDate, today: NaiveDate) -> bool {
    birthday.month() == today.month() && birthday.day() == today.day()
}

/// Re-anchors a birthday onto `year`. Feb 29 falls back to Feb 28 in non-leap years.
pub fn anniversary_in(birthday: NaiveDate, year: i32) -> Option<NaiveDate> {
    match NaiveDate::from_ymd_opt(year, birthday.month(), birthday.day()) {
        Some(date) => Some(date),
        None if birthday.month() == 2 && birthday.day() == 29 => {
            NaiveDate::from_ymd_opt(year, 2, 28)
        }
        None => None,
    }
}

/// First anniversary on or after `today`
pub fn next_occurrence(birthday: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = anniversary_in(birthday, today.year())?;

    if this_year >= today {
        return Some(this_year);
    }

    anniversary_in(birthday, today.year() + 1)
}

pub fn days_until(birthday: NaiveDate, today: NaiveDate) -> Option<i64> {
    next_occurrence(birthday, today).map(|date| date.signed_duration_since(today).num_days())
}

pub fn is_upcoming(birthday: NaiveDate, today: NaiveDate, horizon: Horizon) -> bool {
    match next_occurrence(birthday, today) {
        Some(next) => today <= next && next <= horizon.end_from(today),
        None => false,
    }
}

/// Employees with a birthday today, in roster order
pub fn todays_birthdays<'a, I>(employees: I, today: NaiveDate) -> Vec<&'a Employee>
where
    I: IntoIterator<Item = &'a Employee>,
{
    employees
        .into_iter()
        .filter(|employee| is_birthday_today(employee.birthday, today))
        .collect()
}

/// Employees whose next birthday falls inside the horizon, soonest first.
/// Ties are broken by name and then id so the order is deterministic.
pub fn upcoming_birthdays<'a, I>(
    employees: I,
    today: NaiveDate,
    horizon: Horizon,
) -> Vec<UpcomingBirthday<'a>>
where
    I: IntoIterator<Item = &'a Employee>,
{
    let end = horizon.end_from(today);

    let mut upcoming: Vec<UpcomingBirthday<'a>> = employees
        .into_iter()
        .filter_map(|employee| {
            let next = next_occurrence(employee.birthday, today)?;

            if next > end {
                return None;
            }

            Some(UpcomingBirthday {
                employee,
                next_occurrence: next,
                days_until: next.signed_duration_since(today).num_days(),
            })
        })
        .collect();

    upcoming.sort_by(compare_upcoming);

    upcoming
}

fn compare_upcoming(a: &UpcomingBirthday, b: &UpcomingBirthday) -> Ordering {
    a.next_occurrence
        .cmp(&b.next_occurrence)
        .then_with(|| a.employee.name.cmp(&b.employee.name))
        .then_with(|| a.employee.id.cmp(&b.employee.id))
}

/// Display form, e.g. `January 01`
pub fn format_birthday(date: NaiveDate) -> String {
    date.format("%B %d").to_string()
}
