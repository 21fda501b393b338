//! homedo repeat command implementations.

use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;

use crate::cli::{load_context, GlobalOptions, Publisher};
use crate::error::{Error, Result};
use crate::output::{emit, Report, Status};
use crate::recurrence::{self, EndInput, RecurrenceRule, RuleInput, DATE_FORMAT};

/// Rule options shared by `task add --repeat` and `repeat set|next`
#[derive(Args, Debug, Clone, Default)]
pub struct RuleArgs {
    /// Step count for custom rules
    #[arg(long)]
    pub interval: Option<i64>,

    /// Step unit for custom rules: days, weeks, months, years
    #[arg(long)]
    pub unit: Option<String>,

    /// Weekdays for weekly rules, comma separated (mon,thu)
    #[arg(long, value_delimiter = ',')]
    pub on: Vec<String>,

    /// Day of month for monthly rules (1-31)
    #[arg(long)]
    pub month_day: Option<i64>,

    /// First occurrence (YYYY-MM-DD)
    #[arg(long)]
    pub starts: Option<String>,

    /// Stop after this many occurrences
    #[arg(long, conflicts_with = "until")]
    pub count: Option<i64>,

    /// Stop after this date (YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<String>,
}

impl RuleArgs {
    pub fn to_input(&self, frequency: &str) -> RuleInput {
        let end = match (&self.count, &self.until) {
            (Some(count), _) => Some(EndInput {
                kind: Some("after".to_string()),
                after_occurrences: Some(*count),
                date: None,
            }),
            (None, Some(date)) => Some(EndInput {
                kind: Some("on".to_string()),
                after_occurrences: None,
                date: Some(date.clone()),
            }),
            (None, None) => None,
        };

        RuleInput {
            frequency: Some(frequency.to_string()),
            interval: self.interval,
            unit: self.unit.clone(),
            by_day: self.on.clone(),
            by_month_day: self.month_day,
            start_date: self.starts.clone(),
            end,
        }
    }
}

pub struct SetOptions {
    pub id: String,
    pub frequency: String,
    pub rule: RuleArgs,
    pub global: GlobalOptions,
}

pub struct ClearOptions {
    pub id: String,
    pub global: GlobalOptions,
}

pub struct NextOptions {
    pub frequency: String,
    pub from: String,
    pub times: usize,
    pub rule: RuleArgs,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct RuleSetOutput {
    task_id: String,
    rule: RecurrenceRule,
    summary: String,
}

#[derive(Serialize)]
struct RuleClearOutput {
    task_id: String,
    cleared: bool,
}

#[derive(Serialize)]
struct NextOutput {
    from: NaiveDate,
    rule: RecurrenceRule,
    occurrences: Vec<NaiveDate>,
    exhausted: bool,
}

pub fn run_set(options: SetOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let publisher = Publisher::start(&ctx, &options.global)?;
    let input = options.rule.to_input(&options.frequency);
    let rule = ctx.service().set_recurrence(&options.id, &input)?;
    publisher.trigger();
    let publish_errors = publisher.finish();

    let mut report = Report::new("Recurrence set");
    report
        .field("task", options.id.clone())
        .field("repeats", rule.describe())
        .publish_errors(publish_errors);

    let output = RuleSetOutput {
        task_id: options.id,
        summary: rule.describe(),
        rule,
    };
    emit(
        options.global.output(Some(&ctx.config)),
        "repeat set",
        Status::Success,
        &output,
        &report,
    )
}

pub fn run_clear(options: ClearOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let publisher = Publisher::start(&ctx, &options.global)?;
    let cleared = ctx.service().clear_recurrence(&options.id)?;
    if cleared {
        publisher.trigger();
    }
    let publish_errors = publisher.finish();

    let header = if cleared {
        "Recurrence cleared"
    } else {
        "Task was not recurring"
    };
    let mut report = Report::new(header);
    report.field("task", options.id.clone()).publish_errors(publish_errors);

    emit(
        options.global.output(Some(&ctx.config)),
        "repeat clear",
        Status::Success,
        &RuleClearOutput {
            task_id: options.id,
            cleared,
        },
        &report,
    )
}

pub fn run_next(options: NextOptions) -> Result<()> {
    if options.times == 0 {
        return Err(Error::InvalidArgument("--times must be at least 1".to_string()));
    }
    let mut rule = recurrence::validate(&options.rule.to_input(&options.frequency))?;
    let from = recurrence::parse_date(&options.from)?;
    let described = rule.clone();

    let mut occurrences = Vec::new();
    let mut last = from;
    while occurrences.len() < options.times {
        match recurrence::compute_next(&mut rule, last) {
            Some(next) => {
                occurrences.push(next);
                last = next;
            }
            None => break,
        }
    }
    let exhausted = occurrences.len() < options.times;

    let mut report = Report::new(format!("Next occurrences ({})", described.describe()));
    report.field("from", from.format(DATE_FORMAT).to_string());
    for date in &occurrences {
        report.line(date.format("%a %Y-%m-%d").to_string());
    }
    if exhausted {
        report.line("(rule ends here)");
    }

    emit(
        options.global.output(None),
        "repeat next",
        Status::Success,
        &NextOutput {
            from,
            rule: described,
            occurrences,
            exhausted,
        },
        &report,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_becomes_after_end() {
        let args = RuleArgs {
            count: Some(3),
            on: vec!["mon".to_string(), "thu".to_string()],
            ..RuleArgs::default()
        };
        let input = args.to_input("weekly");
        let end = input.end.unwrap();
        assert_eq!(end.kind.as_deref(), Some("after"));
        assert_eq!(end.after_occurrences, Some(3));
        assert_eq!(input.by_day, vec!["mon", "thu"]);
    }

    #[test]
    fn until_becomes_on_end() {
        let args = RuleArgs {
            until: Some("2024-12-31".to_string()),
            ..RuleArgs::default()
        };
        let end = args.to_input("daily").end.unwrap();
        assert_eq!(end.kind.as_deref(), Some("on"));
        assert_eq!(end.date.as_deref(), Some("2024-12-31"));
        assert!(RuleArgs::default().to_input("daily").end.is_none());
    }
}
