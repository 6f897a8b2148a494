//! Date-reference detection and resolution.
//!
//! Messages mention dates loosely ("this Sunday", "Dec 15", "next week").
//! Detection finds the raw reference; resolution turns it into a concrete
//! date relative to a caller-supplied "today" so everything is testable.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DATE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\b(?:this|next|last)\s+(?:sunday|monday|tuesday|wednesday|thursday|friday|saturday|week|weekend|month)\b").unwrap(),
        Regex::new(r"\b(?:sunday|monday|tuesday|wednesday|thursday|friday|saturday|weekend)\b").unwrap(),
        Regex::new(r"\b(?:tomorrow|today|yesterday)\b").unwrap(),
        Regex::new(r"\b(?:easter|christmas\s+eve|christmas|thanksgiving|new\s+year'?s)\b").unwrap(),
        Regex::new(r"\b(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}(?:st|nd|rd|th)?(?:,?\s*\d{4})?\b").unwrap(),
        Regex::new(r"\b\d{1,2}/\d{1,2}(?:/\d{2,4})?\b").unwrap(),
    ];
}

/// The first date-like phrase in a message, lowercased. Patterns are
/// ordered most-specific first so "next Sunday" is not split into
/// "next" + "sunday".
pub fn extract_date_reference(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    DATE_PATTERNS
        .iter()
        .find_map(|p| p.find(&lower))
        .map(|m| m.as_str().to_string())
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name {
        "sunday" => Some(Weekday::Sun),
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        _ => None,
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    let months = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    months.iter().position(|m| *m == name).map(|i| i as u32 + 1)
}

/// Next occurrence of a weekday, today included.
fn upcoming_weekday(today: NaiveDate, target: Weekday) -> NaiveDate {
    let diff = (target.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    today + Days::new(diff as u64)
}

/// Previous occurrence of a weekday, strictly before today.
fn previous_weekday(today: NaiveDate, target: Weekday) -> NaiveDate {
    let diff = (today.weekday().num_days_from_monday() as i64
        - target.num_days_from_monday() as i64)
        .rem_euclid(7);
    let diff = if diff == 0 { 7 } else { diff };
    today - Days::new(diff as u64)
}

/// Gregorian Easter (anonymous computus).
fn easter(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Fourth Thursday of November.
fn thanksgiving(year: i32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, 11, 1)?;
    let offset = (Weekday::Thu.num_days_from_monday() as i64
        - first.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    Some(first + Days::new(offset as u64 + 21))
}

/// The next occurrence of a fixed-date holiday, this year or next.
fn upcoming_fixed(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year >= today {
        Some(this_year)
    } else {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    }
}

/// Resolve an extracted reference to a concrete date. Weekends resolve
/// to the upcoming Sunday (services are on Sundays). Month-day
/// references without a year pick this year unless that date is more
/// than six months gone, then next year.
pub fn parse_date_reference(reference: &str, today: NaiveDate) -> Option<NaiveDate> {
    let reference = reference.trim().to_lowercase();

    match reference.as_str() {
        "today" => return Some(today),
        "tomorrow" => return today.checked_add_days(Days::new(1)),
        "yesterday" => return today.checked_sub_days(Days::new(1)),
        "this week" => return Some(today),
        "next week" => return today.checked_add_days(Days::new(7)),
        "last week" => return today.checked_sub_days(Days::new(7)),
        "this month" => return Some(today),
        "next month" => return today.checked_add_months(Months::new(1)),
        "last month" => return today.checked_sub_months(Months::new(1)),
        "weekend" | "this weekend" => return Some(upcoming_weekday(today, Weekday::Sun)),
        "next weekend" => {
            return Some(upcoming_weekday(today, Weekday::Sun) + Days::new(7));
        }
        "last weekend" => return Some(previous_weekday(today, Weekday::Sun)),
        "easter" => {
            let this_year = easter(today.year())?;
            return if this_year >= today {
                Some(this_year)
            } else {
                easter(today.year() + 1)
            };
        }
        "christmas" => return upcoming_fixed(today, 12, 25),
        "christmas eve" => return upcoming_fixed(today, 12, 24),
        "thanksgiving" => {
            let this_year = thanksgiving(today.year())?;
            return if this_year >= today {
                Some(this_year)
            } else {
                thanksgiving(today.year() + 1)
            };
        }
        "new year's" | "new years" => return upcoming_fixed(today, 1, 1),
        _ => {}
    }

    // "(this|next|last) <weekday>" and bare weekday
    if let Some(rest) = reference.strip_prefix("this ") {
        if let Some(target) = weekday_from_name(rest) {
            return Some(upcoming_weekday(today, target));
        }
    }
    if let Some(rest) = reference.strip_prefix("next ") {
        if let Some(target) = weekday_from_name(rest) {
            let date = upcoming_weekday(today, target);
            return Some(if date == today { date + Days::new(7) } else { date });
        }
    }
    if let Some(rest) = reference.strip_prefix("last ") {
        if let Some(target) = weekday_from_name(rest) {
            return Some(previous_weekday(today, target));
        }
    }
    if let Some(target) = weekday_from_name(&reference) {
        return Some(upcoming_weekday(today, target));
    }

    // "december 15", "december 15th, 2024"
    lazy_static! {
        static ref MONTH_DAY: Regex = Regex::new(
            r"^([a-z]+)\s+(\d{1,2})(?:st|nd|rd|th)?(?:,?\s*(\d{4}))?$"
        )
        .unwrap();
        static ref NUMERIC: Regex =
            Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?$").unwrap();
    }

    if let Some(caps) = MONTH_DAY.captures(&reference) {
        let month = month_from_name(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        if let Some(year) = caps.get(3) {
            return NaiveDate::from_ymd_opt(year.as_str().parse().ok()?, month, day);
        }
        return resolve_yearless(today, month, day);
    }

    if let Some(caps) = NUMERIC.captures(&reference) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        if let Some(year) = caps.get(3) {
            let mut year: i32 = year.as_str().parse().ok()?;
            if year < 100 {
                year += 2000;
            }
            return NaiveDate::from_ymd_opt(year, month, day);
        }
        return resolve_yearless(today, month, day);
    }

    None
}

fn resolve_yearless(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let candidate = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if (today - candidate).num_days() > 180 {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A Wednesday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 11).unwrap()
    }

    #[test]
    fn extracts_relative_references() {
        assert_eq!(
            extract_date_reference("Who's playing this Sunday?"),
            Some("this sunday".to_string())
        );
        assert_eq!(
            extract_date_reference("What songs are on for next week?"),
            Some("next week".to_string())
        );
        assert_eq!(
            extract_date_reference("Is Sarah free tomorrow?"),
            Some("tomorrow".to_string())
        );
        assert_eq!(extract_date_reference("What key is Oceans in?"), None);
    }

    #[test]
    fn extracts_explicit_dates() {
        assert_eq!(
            extract_date_reference("Show me the setlist for December 15th"),
            Some("december 15th".to_string())
        );
        assert_eq!(
            extract_date_reference("Who served on 12/8?"),
            Some("12/8".to_string())
        );
        assert_eq!(
            extract_date_reference("the plan for March 2, 2025 please"),
            Some("march 2, 2025".to_string())
        );
    }

    #[test]
    fn extraction_is_repeatable() {
        for message in [
            "Who's playing this Sunday?",
            "Show me the setlist for December 15th",
            "Who served on 12/8?",
            "What key is Oceans in?",
        ] {
            assert_eq!(
                extract_date_reference(message),
                extract_date_reference(message),
                "extraction changed between calls for {message:?}"
            );
        }
    }

    #[test]
    fn longer_reference_wins_over_bare_weekday() {
        assert_eq!(
            extract_date_reference("maybe next sunday works"),
            Some("next sunday".to_string())
        );
    }

    #[test]
    fn resolves_weekdays() {
        // Dec 11 2024 is a Wednesday; the coming Sunday is Dec 15.
        let sunday = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        assert_eq!(parse_date_reference("this sunday", today()), Some(sunday));
        assert_eq!(parse_date_reference("sunday", today()), Some(sunday));
        assert_eq!(parse_date_reference("next sunday", today()), Some(sunday));
        assert_eq!(
            parse_date_reference("last sunday", today()),
            NaiveDate::from_ymd_opt(2024, 12, 8)
        );
    }

    #[test]
    fn this_weekday_can_be_today() {
        let wednesday = today();
        assert_eq!(
            parse_date_reference("this wednesday", wednesday),
            Some(wednesday)
        );
        assert_eq!(
            parse_date_reference("next wednesday", wednesday),
            wednesday.checked_add_days(Days::new(7))
        );
    }

    #[test]
    fn weekend_means_upcoming_sunday() {
        assert_eq!(
            parse_date_reference("this weekend", today()),
            NaiveDate::from_ymd_opt(2024, 12, 15)
        );
    }

    #[test]
    fn resolves_simple_relatives() {
        assert_eq!(parse_date_reference("today", today()), Some(today()));
        assert_eq!(
            parse_date_reference("tomorrow", today()),
            NaiveDate::from_ymd_opt(2024, 12, 12)
        );
        assert_eq!(
            parse_date_reference("yesterday", today()),
            NaiveDate::from_ymd_opt(2024, 12, 10)
        );
    }

    #[test]
    fn resolves_explicit_dates() {
        assert_eq!(
            parse_date_reference("december 15th", today()),
            NaiveDate::from_ymd_opt(2024, 12, 15)
        );
        assert_eq!(
            parse_date_reference("december 15th, 2025", today()),
            NaiveDate::from_ymd_opt(2025, 12, 15)
        );
        assert_eq!(
            parse_date_reference("12/8", today()),
            NaiveDate::from_ymd_opt(2024, 12, 8)
        );
        assert_eq!(
            parse_date_reference("3/2/25", today()),
            NaiveDate::from_ymd_opt(2025, 3, 2)
        );
    }

    #[test]
    fn yearless_date_long_past_rolls_forward() {
        // In December, "march 2" means next March.
        assert_eq!(
            parse_date_reference("march 2", today()),
            NaiveDate::from_ymd_opt(2025, 3, 2)
        );
        // A date within the last six months stays in this year.
        assert_eq!(
            parse_date_reference("october 6", today()),
            NaiveDate::from_ymd_opt(2024, 10, 6)
        );
    }

    #[test]
    fn resolves_holidays() {
        assert_eq!(
            parse_date_reference("christmas", today()),
            NaiveDate::from_ymd_opt(2024, 12, 25)
        );
        assert_eq!(
            parse_date_reference("christmas eve", today()),
            NaiveDate::from_ymd_opt(2024, 12, 24)
        );
        // Thanksgiving 2024 already passed; next is Nov 27 2025.
        assert_eq!(
            parse_date_reference("thanksgiving", today()),
            NaiveDate::from_ymd_opt(2025, 11, 27)
        );
        // Easter 2025 is April 20.
        assert_eq!(
            parse_date_reference("easter", today()),
            NaiveDate::from_ymd_opt(2025, 4, 20)
        );
    }

    #[test]
    fn unparseable_reference_is_none() {
        assert_eq!(parse_date_reference("whenever", today()), None);
    }
}
