//! Recurrence rules for repeating tasks.
//!
//! A rule is validated once from loosely-typed input ([`RuleInput`], what a
//! form or JSON body submits) into a [`RecurrenceRule`]. [`compute_next`]
//! derives the next due date from the date the last occurrence was due, and
//! applies the rule's termination policy.
//!
//! `by_day` is carried for display only: weekly and weekday rules step by
//! fixed day counts and never consult it.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Calendar date format used for input and storage
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rejected recurrence input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("frequency is required")]
    MissingFrequency,

    #[error("unknown frequency '{0}' (expected daily|weekly|biweekly|monthly|yearly|weekday|custom)")]
    UnknownFrequency(String),

    #[error("unknown interval unit '{0}' (expected days|weeks|months|years)")]
    UnknownUnit(String),

    #[error("interval must be a positive integer, got {0}")]
    InvalidInterval(i64),

    #[error("unknown weekday '{0}'")]
    InvalidWeekday(String),

    #[error("day of month must be between 1 and 31, got {0}")]
    InvalidMonthDay(i64),

    #[error("unknown end type '{0}' (expected never|after|on)")]
    UnknownEndType(String),

    #[error("after_occurrences is required when the rule ends after a count")]
    MissingOccurrences,

    #[error("after_occurrences must be positive, got {0}")]
    InvalidOccurrences(i64),

    #[error("an end date is required when the rule ends on a date")]
    MissingEndDate,

    #[error("'{0}' is not a calendar date (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// How often a task repeats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Yearly,
    Weekday,
    Custom,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
            Frequency::Weekday => "weekday",
            Frequency::Custom => "custom",
        }
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" => Ok(Frequency::Biweekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            "weekday" | "weekdays" => Ok(Frequency::Weekday),
            "custom" => Ok(Frequency::Custom),
            "" => Err(ValidationError::MissingFrequency),
            _ => Err(ValidationError::UnknownFrequency(raw.trim().to_string())),
        }
    }
}

/// Step unit for custom rules
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl IntervalUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            IntervalUnit::Days => "days",
            IntervalUnit::Weeks => "weeks",
            IntervalUnit::Months => "months",
            IntervalUnit::Years => "years",
        }
    }
}

impl FromStr for IntervalUnit {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(IntervalUnit::Days),
            "week" | "weeks" => Ok(IntervalUnit::Weeks),
            "month" | "months" => Ok(IntervalUnit::Months),
            "year" | "years" => Ok(IntervalUnit::Years),
            _ => Err(ValidationError::UnknownUnit(raw.trim().to_string())),
        }
    }
}

/// Weekday code used by `by_day`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DayCode {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DayCode::Mon => "mon",
            DayCode::Tue => "tue",
            DayCode::Wed => "wed",
            DayCode::Thu => "thu",
            DayCode::Fri => "fri",
            DayCode::Sat => "sat",
            DayCode::Sun => "sun",
        }
    }

    fn label(self) -> &'static str {
        match self {
            DayCode::Mon => "Mon",
            DayCode::Tue => "Tue",
            DayCode::Wed => "Wed",
            DayCode::Thu => "Thu",
            DayCode::Fri => "Fri",
            DayCode::Sat => "Sat",
            DayCode::Sun => "Sun",
        }
    }
}

impl From<DayCode> for Weekday {
    fn from(code: DayCode) -> Self {
        match code {
            DayCode::Mon => Weekday::Mon,
            DayCode::Tue => Weekday::Tue,
            DayCode::Wed => Weekday::Wed,
            DayCode::Thu => Weekday::Thu,
            DayCode::Fri => Weekday::Fri,
            DayCode::Sat => Weekday::Sat,
            DayCode::Sun => Weekday::Sun,
        }
    }
}

impl FromStr for DayCode {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mo" | "mon" | "monday" => Ok(DayCode::Mon),
            "tu" | "tue" | "tuesday" => Ok(DayCode::Tue),
            "we" | "wed" | "wednesday" => Ok(DayCode::Wed),
            "th" | "thu" | "thursday" => Ok(DayCode::Thu),
            "fr" | "fri" | "friday" => Ok(DayCode::Fri),
            "sa" | "sat" | "saturday" => Ok(DayCode::Sat),
            "su" | "sun" | "sunday" => Ok(DayCode::Sun),
            _ => Err(ValidationError::InvalidWeekday(raw.trim().to_string())),
        }
    }
}

/// When a rule stops generating occurrences
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceEnd {
    Never,
    After { count: u32 },
    On { date: NaiveDate },
}

impl RecurrenceEnd {
    pub fn kind(&self) -> &'static str {
        match self {
            RecurrenceEnd::Never => "never",
            RecurrenceEnd::After { .. } => "after",
            RecurrenceEnd::On { .. } => "on",
        }
    }
}

/// A validated recurrence rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Step count; always 1 unless `frequency` is `Custom`
    pub interval: u32,
    /// Step unit; only set for `Custom`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<IntervalUnit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub by_day: Vec<DayCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_month_day: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    pub end: RecurrenceEnd,
    /// Occurrences still to generate for `RecurrenceEnd::After`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
}

impl RecurrenceRule {
    /// A rule that repeats at `frequency` forever.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            unit: None,
            by_day: Vec::new(),
            by_month_day: None,
            start_date: None,
            end: RecurrenceEnd::Never,
            remaining: None,
        }
    }

    /// Replace the end condition, resetting the remaining count to match.
    pub fn with_end(mut self, end: RecurrenceEnd) -> Self {
        self.remaining = match end {
            RecurrenceEnd::After { count } => Some(count),
            _ => None,
        };
        self.end = end;
        self
    }

    /// Human-readable summary such as "every week on Mon, Thu, 3 more times".
    pub fn describe(&self) -> String {
        let mut text = match self.frequency {
            Frequency::Daily => "every day".to_string(),
            Frequency::Weekday => "every weekday".to_string(),
            Frequency::Weekly => "every week".to_string(),
            Frequency::Biweekly => "every 2 weeks".to_string(),
            Frequency::Monthly => match self.by_month_day {
                Some(day) => format!("every month on day {day}"),
                None => "every month".to_string(),
            },
            Frequency::Yearly => "every year".to_string(),
            Frequency::Custom => {
                let unit = self.unit.unwrap_or(IntervalUnit::Days).as_str();
                if self.interval == 1 {
                    format!("every {}", unit.trim_end_matches('s'))
                } else {
                    format!("every {} {unit}", self.interval)
                }
            }
        };

        if matches!(self.frequency, Frequency::Weekly | Frequency::Biweekly)
            && !self.by_day.is_empty()
        {
            let days: Vec<&str> = self.by_day.iter().map(|day| day.label()).collect();
            text.push_str(&format!(" on {}", days.join(", ")));
        }

        match self.end {
            RecurrenceEnd::Never => {}
            RecurrenceEnd::After { count } => {
                let remaining = self.remaining.unwrap_or(count);
                text.push_str(&format!(", {remaining} more of {count}"));
            }
            RecurrenceEnd::On { date } => {
                text.push_str(&format!(", until {}", date.format(DATE_FORMAT)));
            }
        }

        text
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Loosely-typed rule as submitted by a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleInput {
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub by_day: Vec<String>,
    #[serde(default)]
    pub by_month_day: Option<i64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end: Option<EndInput>,
}

/// Loosely-typed end condition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndInput {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub after_occurrences: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Validate submitted rule input. Never corrects input; the first problem
/// found is returned.
pub fn validate(input: &RuleInput) -> Result<RecurrenceRule, ValidationError> {
    let frequency: Frequency = input
        .frequency
        .as_deref()
        .ok_or(ValidationError::MissingFrequency)?
        .parse()?;

    let interval = match input.interval {
        Some(value) if value <= 0 || value > i64::from(u32::MAX) => {
            return Err(ValidationError::InvalidInterval(value));
        }
        Some(value) => value as u32,
        None => 1,
    };

    let (interval, unit) = if frequency == Frequency::Custom {
        let unit = match input.unit.as_deref() {
            Some(raw) => raw.parse()?,
            None => IntervalUnit::Days,
        };
        (interval, Some(unit))
    } else {
        (1, None)
    };

    let mut by_day = input
        .by_day
        .iter()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| raw.parse::<DayCode>())
        .collect::<Result<Vec<_>, _>>()?;
    by_day.sort();
    by_day.dedup();

    let by_month_day = match input.by_month_day {
        Some(day) if !(1..=31).contains(&day) => {
            return Err(ValidationError::InvalidMonthDay(day));
        }
        Some(day) => Some(day as u8),
        None => None,
    };

    let start_date = input.start_date.as_deref().map(parse_date).transpose()?;
    let end = validate_end(input.end.as_ref())?;

    Ok(RecurrenceRule {
        frequency,
        interval,
        unit,
        by_day,
        by_month_day,
        start_date,
        end,
        remaining: None,
    }
    .with_end(end))
}

fn validate_end(input: Option<&EndInput>) -> Result<RecurrenceEnd, ValidationError> {
    let Some(input) = input else {
        return Ok(RecurrenceEnd::Never);
    };

    let kind = input
        .kind
        .as_deref()
        .map(|raw| raw.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "never".to_string());

    match kind.as_str() {
        "" | "never" => Ok(RecurrenceEnd::Never),
        "after" => match input.after_occurrences {
            None => Err(ValidationError::MissingOccurrences),
            Some(count) if count <= 0 || count > i64::from(u32::MAX) => {
                Err(ValidationError::InvalidOccurrences(count))
            }
            Some(count) => Ok(RecurrenceEnd::After {
                count: count as u32,
            }),
        },
        "on" => {
            let raw = input
                .date
                .as_deref()
                .filter(|raw| !raw.trim().is_empty())
                .ok_or(ValidationError::MissingEndDate)?;
            Ok(RecurrenceEnd::On {
                date: parse_date(raw)?,
            })
        }
        other => Err(ValidationError::UnknownEndType(other.to_string())),
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// Compute the occurrence after `last_due`, or `None` once the rule has
/// terminated.
///
/// For `RecurrenceEnd::After` this consumes one unit of `rule.remaining`;
/// the caller must persist the rule afterwards. A rule whose remaining count
/// is already zero yields `None` without changing.
pub fn compute_next(rule: &mut RecurrenceRule, last_due: NaiveDate) -> Option<NaiveDate> {
    let candidate = advance(rule, last_due)?;

    match rule.end {
        RecurrenceEnd::Never => Some(candidate),
        RecurrenceEnd::On { date } => (candidate <= date).then_some(candidate),
        RecurrenceEnd::After { count } => {
            let remaining = rule.remaining.get_or_insert(count);
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
            Some(candidate)
        }
    }
}

/// [`compute_next`] for a due date still in its stored text form.
pub fn compute_next_from_text(
    rule: &mut RecurrenceRule,
    last_due: &str,
) -> Result<Option<NaiveDate>, ValidationError> {
    let last_due = parse_date(last_due)?;
    Ok(compute_next(rule, last_due))
}

fn advance(rule: &RecurrenceRule, last: NaiveDate) -> Option<NaiveDate> {
    let next = match rule.frequency {
        Frequency::Daily => last.checked_add_days(Days::new(1)),
        Frequency::Weekday => next_weekday(last),
        Frequency::Weekly => last.checked_add_days(Days::new(7)),
        Frequency::Biweekly => last.checked_add_days(Days::new(14)),
        Frequency::Monthly => add_months(last, 1, rule.by_month_day),
        Frequency::Yearly => add_months(last, 12, None),
        Frequency::Custom => {
            let n = rule.interval;
            match rule.unit.unwrap_or(IntervalUnit::Days) {
                IntervalUnit::Days => last.checked_add_days(Days::new(u64::from(n))),
                IntervalUnit::Weeks => last.checked_add_days(Days::new(u64::from(n) * 7)),
                IntervalUnit::Months => add_months(last, n, None),
                IntervalUnit::Years => n.checked_mul(12).and_then(|months| add_months(last, months, None)),
            }
        }
    };

    if next.is_none() {
        tracing::warn!(
            frequency = rule.frequency.as_str(),
            last = %last,
            "recurrence arithmetic left the supported calendar range"
        );
    }
    next
}

fn next_weekday(last: NaiveDate) -> Option<NaiveDate> {
    let mut next = last.succ_opt()?;
    while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
        next = next.succ_opt()?;
    }
    Some(next)
}

/// Shift by whole months. Without an anchor the day of month is kept,
/// clamped to the target month's length. With an anchor the result's day
/// is the anchor, clamped the same way.
fn add_months(date: NaiveDate, months: u32, anchor_day: Option<u8>) -> Option<NaiveDate> {
    let shifted = date.checked_add_months(Months::new(months))?;
    let Some(anchor) = anchor_day else {
        return Some(shifted);
    };
    let last = last_day_of_month(shifted.year(), shifted.month())?;
    NaiveDate::from_ymd_opt(shifted.year(), shifted.month(), u32::from(anchor).min(last))
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = first.checked_add_months(Months::new(1))?;
    Some(next_first.pred_opt()?.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    fn input(frequency: &str) -> RuleInput {
        RuleInput {
            frequency: Some(frequency.to_string()),
            ..RuleInput::default()
        }
    }

    #[test]
    fn daily_adds_exactly_one_day() {
        let mut rule = RecurrenceRule::new(Frequency::Daily);
        let mut last = date("2023-12-25");
        for _ in 0..800 {
            let next = compute_next(&mut rule, last).unwrap();
            assert_eq!(next, last.succ_opt().unwrap());
            last = next;
        }
    }

    #[test]
    fn weekday_skips_weekends_and_always_advances() {
        let mut rule = RecurrenceRule::new(Frequency::Weekday);
        let start = date("2024-03-01");
        for offset in 0..28 {
            let last = start + Days::new(offset);
            let next = compute_next(&mut rule, last).unwrap();
            assert!(next > last);
            assert!(!matches!(next.weekday(), Weekday::Sat | Weekday::Sun));
        }

        // Friday -> Monday, Saturday -> Monday, Monday -> Tuesday
        assert_eq!(compute_next(&mut rule, date("2024-03-01")), Some(date("2024-03-04")));
        assert_eq!(compute_next(&mut rule, date("2024-03-02")), Some(date("2024-03-04")));
        assert_eq!(compute_next(&mut rule, date("2024-03-04")), Some(date("2024-03-05")));
    }

    #[test]
    fn weekly_and_biweekly_ignore_by_day() {
        let mut weekly = RecurrenceRule::new(Frequency::Weekly);
        weekly.by_day = vec![DayCode::Wed, DayCode::Fri];
        assert_eq!(compute_next(&mut weekly, date("2024-01-01")), Some(date("2024-01-08")));

        let mut biweekly = RecurrenceRule::new(Frequency::Biweekly);
        assert_eq!(compute_next(&mut biweekly, date("2024-12-25")), Some(date("2025-01-08")));
    }

    #[test]
    fn monthly_keeps_day_and_clamps_short_months() {
        let mut rule = RecurrenceRule::new(Frequency::Monthly);
        assert_eq!(compute_next(&mut rule, date("2024-01-15")), Some(date("2024-02-15")));
        assert_eq!(compute_next(&mut rule, date("2024-01-31")), Some(date("2024-02-29")));
        assert_eq!(compute_next(&mut rule, date("2023-01-31")), Some(date("2023-02-28")));
    }

    #[test]
    fn monthly_anchor_day_clamps_to_target_month() {
        let mut rule = RecurrenceRule::new(Frequency::Monthly);
        rule.by_month_day = Some(31);

        // February -> March restores the anchor
        assert_eq!(compute_next(&mut rule, date("2024-02-29")), Some(date("2024-03-31")));
        // March -> April clamps to 30
        assert_eq!(compute_next(&mut rule, date("2024-03-31")), Some(date("2024-04-30")));
        // January -> February clamps to the leap day
        assert_eq!(compute_next(&mut rule, date("2024-01-31")), Some(date("2024-02-29")));

        rule.by_month_day = Some(10);
        assert_eq!(compute_next(&mut rule, date("2024-05-27")), Some(date("2024-06-10")));
    }

    #[test]
    fn yearly_clamps_leap_day() {
        let mut rule = RecurrenceRule::new(Frequency::Yearly);
        assert_eq!(compute_next(&mut rule, date("2024-02-29")), Some(date("2025-02-28")));
        assert_eq!(compute_next(&mut rule, date("2024-07-04")), Some(date("2025-07-04")));
    }

    #[test]
    fn custom_uses_interval_and_unit() {
        let cases = [
            ("days", 3, "2024-01-30", "2024-02-02"),
            ("weeks", 2, "2024-01-01", "2024-01-15"),
            ("months", 3, "2024-11-30", "2025-02-28"),
            ("years", 2, "2024-02-29", "2026-02-28"),
        ];
        for (unit, interval, last, expected) in cases {
            let mut rule = validate(&RuleInput {
                frequency: Some("custom".to_string()),
                interval: Some(interval),
                unit: Some(unit.to_string()),
                ..RuleInput::default()
            })
            .unwrap();
            assert_eq!(compute_next(&mut rule, date(last)), Some(date(expected)), "{unit}");
        }
    }

    #[test]
    fn after_one_yields_once_then_stops() {
        let mut rule = RecurrenceRule::new(Frequency::Daily).with_end(RecurrenceEnd::After { count: 1 });

        assert_eq!(compute_next(&mut rule, date("2024-01-01")), Some(date("2024-01-02")));
        assert_eq!(rule.remaining, Some(0));
        assert_eq!(compute_next(&mut rule, date("2024-01-02")), None);
        assert_eq!(rule.remaining, Some(0));
    }

    #[test]
    fn on_date_is_inclusive() {
        let mut rule = RecurrenceRule::new(Frequency::Weekly).with_end(RecurrenceEnd::On {
            date: date("2024-01-15"),
        });

        assert_eq!(compute_next(&mut rule, date("2024-01-01")), Some(date("2024-01-08")));
        assert_eq!(compute_next(&mut rule, date("2024-01-08")), Some(date("2024-01-15")));
        assert_eq!(compute_next(&mut rule, date("2024-01-15")), None);
    }

    #[test]
    fn unparsable_last_due_is_rejected() {
        let mut rule = RecurrenceRule::new(Frequency::Daily);
        let err = compute_next_from_text(&mut rule, "2024-02-30").unwrap_err();
        assert_eq!(err, ValidationError::InvalidDate("2024-02-30".to_string()));
        assert!(compute_next_from_text(&mut rule, "next tuesday").is_err());
        assert_eq!(
            compute_next_from_text(&mut rule, "2024-02-28").unwrap(),
            Some(date("2024-02-29"))
        );
    }

    #[test]
    fn validate_requires_known_frequency() {
        assert_eq!(
            validate(&RuleInput::default()).unwrap_err(),
            ValidationError::MissingFrequency
        );
        assert_eq!(
            validate(&input("fortnightly")).unwrap_err(),
            ValidationError::UnknownFrequency("fortnightly".to_string())
        );
        assert_eq!(validate(&input("Weekly")).unwrap().frequency, Frequency::Weekly);
    }

    #[test]
    fn validate_after_requires_positive_count() {
        let mut rule = input("daily");
        rule.end = Some(EndInput {
            kind: Some("after".to_string()),
            ..EndInput::default()
        });
        assert_eq!(validate(&rule).unwrap_err(), ValidationError::MissingOccurrences);

        rule.end.as_mut().unwrap().after_occurrences = Some(0);
        assert_eq!(validate(&rule).unwrap_err(), ValidationError::InvalidOccurrences(0));

        rule.end.as_mut().unwrap().after_occurrences = Some(4);
        let valid = validate(&rule).unwrap();
        assert_eq!(valid.end, RecurrenceEnd::After { count: 4 });
        assert_eq!(valid.remaining, Some(4));
    }

    #[test]
    fn validate_on_requires_parsable_date() {
        let mut rule = input("monthly");
        rule.end = Some(EndInput {
            kind: Some("on".to_string()),
            ..EndInput::default()
        });
        assert_eq!(validate(&rule).unwrap_err(), ValidationError::MissingEndDate);

        rule.end.as_mut().unwrap().date = Some("31/12/2024".to_string());
        assert!(matches!(validate(&rule).unwrap_err(), ValidationError::InvalidDate(_)));

        rule.end.as_mut().unwrap().date = Some("2024-12-31".to_string());
        assert_eq!(
            validate(&rule).unwrap().end,
            RecurrenceEnd::On { date: date("2024-12-31") }
        );
    }

    #[test]
    fn validate_normalizes_interval_and_days() {
        let mut raw = input("weekly");
        raw.interval = Some(5);
        raw.by_day = vec!["fri".to_string(), "Monday".to_string(), "fr".to_string()];
        let rule = validate(&raw).unwrap();
        assert_eq!(rule.interval, 1);
        assert_eq!(rule.unit, None);
        assert_eq!(rule.by_day, vec![DayCode::Mon, DayCode::Fri]);

        raw.interval = Some(0);
        assert_eq!(validate(&raw).unwrap_err(), ValidationError::InvalidInterval(0));

        let mut raw = input("custom");
        raw.unit = Some("fortnights".to_string());
        assert!(matches!(validate(&raw).unwrap_err(), ValidationError::UnknownUnit(_)));

        let mut raw = input("monthly");
        raw.by_month_day = Some(32);
        assert_eq!(validate(&raw).unwrap_err(), ValidationError::InvalidMonthDay(32));
    }

    #[test]
    fn weekly_task_stops_after_count() {
        let mut rule = RecurrenceRule::new(Frequency::Weekly).with_end(RecurrenceEnd::After { count: 3 });
        let mut due = date("2024-01-01");
        let mut generated = Vec::new();
        while let Some(next) = compute_next(&mut rule, due) {
            generated.push(next);
            due = next;
        }
        assert_eq!(
            generated,
            vec![date("2024-01-08"), date("2024-01-15"), date("2024-01-22")]
        );
        assert_eq!(rule.remaining, Some(0));
    }

    #[test]
    fn describe_mentions_days_and_end() {
        let mut rule = RecurrenceRule::new(Frequency::Weekly).with_end(RecurrenceEnd::After { count: 3 });
        rule.by_day = vec![DayCode::Mon, DayCode::Thu];
        assert_eq!(rule.describe(), "every week on Mon, Thu, 3 more of 3");

        let mut custom = RecurrenceRule::new(Frequency::Custom);
        custom.interval = 10;
        custom.unit = Some(IntervalUnit::Days);
        assert_eq!(custom.to_string(), "every 10 days");
    }
}
