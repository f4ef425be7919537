//! Workflow schedules and the periodic schedule <-> cron mapping.

use std::fmt;

use jiff::civil::Weekday;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{Error, Result};
use crate::id::WorkflowId;

/// What starts a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriggerType {
    /// Runs only when triggered explicitly.
    #[default]
    Manual,
    /// Runs on a cron schedule.
    Periodic,
    /// Runs after another workflow completes.
    Cascade,
}

/// Schedule metadata attached to a workflow DAG.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schedule {
    /// Trigger kind.
    #[serde(default)]
    pub trigger: TriggerType,
    /// Cron expression, meaningful for periodic triggers.
    #[serde(default)]
    pub cron_schedule: String,
    /// Whether manual runs are rejected.
    #[serde(default)]
    pub disable_manual_trigger: bool,
    /// Whether scheduled runs are paused.
    #[serde(default)]
    pub paused: bool,
    /// Upstream workflow for cascade triggers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<WorkflowId>,
}

impl Schedule {
    /// Creates a manual schedule.
    pub fn manual() -> Self {
        Self::default()
    }

    /// Creates a periodic schedule from a UI period.
    pub fn periodic(period: &PeriodicSchedule) -> Self {
        Self {
            trigger: TriggerType::Periodic,
            cron_schedule: period.to_cron(),
            ..Self::default()
        }
    }

    /// Creates a schedule that runs after `source` completes.
    pub fn cascade(source: WorkflowId) -> Self {
        Self {
            trigger: TriggerType::Cascade,
            source_id: Some(source),
            ..Self::default()
        }
    }

    /// Returns the periodic schedule this cron expression encodes, if any.
    pub fn period(&self) -> Option<PeriodicSchedule> {
        if self.trigger != TriggerType::Periodic {
            return None;
        }
        PeriodicSchedule::from_cron(&self.cron_schedule).ok()
    }
}

/// Unit a periodic schedule repeats on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PeriodUnit {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

/// A schedule expressed the way a user picks it: a period plus the time fields
/// that period needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicSchedule {
    /// Repeat unit.
    pub unit: PeriodUnit,
    /// Minute of the hour, 0-59.
    pub minute: u8,
    /// Hour of the day, 0-23. Ignored for hourly schedules.
    pub hour: u8,
    /// Day of the week. Used by weekly schedules.
    pub weekday: Weekday,
    /// Day of the month, 1-31. Used by monthly schedules.
    pub day_of_month: u8,
}

impl PeriodicSchedule {
    /// Creates a schedule for `unit` at 00:00, Sunday, first of the month.
    pub fn new(unit: PeriodUnit) -> Self {
        Self {
            unit,
            minute: 0,
            hour: 0,
            weekday: Weekday::Sunday,
            day_of_month: 1,
        }
    }

    /// Sets the time of day.
    pub fn at(mut self, hour: u8, minute: u8) -> Self {
        self.hour = hour;
        self.minute = minute;
        self
    }

    /// Sets the weekday.
    pub fn on_weekday(mut self, weekday: Weekday) -> Self {
        self.weekday = weekday;
        self
    }

    /// Sets the day of the month.
    pub fn on_day(mut self, day_of_month: u8) -> Self {
        self.day_of_month = day_of_month;
        self
    }

    /// Checks that every field used by the unit is within range.
    pub fn validate(&self) -> Result<()> {
        if self.minute > 59 {
            return Err(Error::invalid_input().with_message(format!(
                "minute {} is out of range 0-59",
                self.minute
            )));
        }
        if self.unit != PeriodUnit::Hourly && self.hour > 23 {
            return Err(Error::invalid_input()
                .with_message(format!("hour {} is out of range 0-23", self.hour)));
        }
        if self.unit == PeriodUnit::Monthly && !(1..=31).contains(&self.day_of_month) {
            return Err(Error::invalid_input().with_message(format!(
                "day of month {} is out of range 1-31",
                self.day_of_month
            )));
        }
        Ok(())
    }

    /// Renders the five-field cron expression for this schedule.
    pub fn to_cron(&self) -> String {
        let Self {
            minute,
            hour,
            day_of_month,
            ..
        } = *self;
        let weekday = self.weekday.to_sunday_zero_offset();

        match self.unit {
            PeriodUnit::Hourly => format!("{minute} * * * *"),
            PeriodUnit::Daily => format!("{minute} {hour} * * *"),
            PeriodUnit::Weekly => format!("{minute} {hour} * * {weekday}"),
            PeriodUnit::Monthly => format!("{minute} {hour} {day_of_month} * *"),
        }
    }

    /// Parses a cron expression produced by [`PeriodicSchedule::to_cron`].
    ///
    /// Expressions that use ranges, steps, lists or month restrictions have no
    /// periodic equivalent and are rejected.
    pub fn from_cron(expr: &str) -> Result<Self> {
        let unsupported =
            || Error::invalid_input().with_message(format!("unsupported cron expression '{expr}'"));

        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = fields.as_slice() else {
            return Err(unsupported());
        };
        if *month != "*" {
            return Err(unsupported());
        }

        let number = |field: &str| field.parse::<u8>().map_err(|_| unsupported());
        let minute = number(minute)?;

        let schedule = match (*hour, *dom, *dow) {
            ("*", "*", "*") => Self::new(PeriodUnit::Hourly).at(0, minute),
            (hour, "*", "*") => Self::new(PeriodUnit::Daily).at(number(hour)?, minute),
            (hour, "*", dow) => {
                let offset = dow.parse::<i8>().map_err(|_| unsupported())?;
                let weekday = Weekday::from_sunday_zero_offset(offset)
                    .map_err(|e| unsupported().with_source(e))?;
                Self::new(PeriodUnit::Weekly)
                    .at(number(hour)?, minute)
                    .on_weekday(weekday)
            }
            (hour, dom, "*") => Self::new(PeriodUnit::Monthly)
                .at(number(hour)?, minute)
                .on_day(number(dom)?),
            _ => return Err(unsupported()),
        };

        schedule.validate()?;
        Ok(schedule)
    }
}

impl fmt::Display for PeriodicSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hour, minute) = (self.hour, self.minute);
        match self.unit {
            PeriodUnit::Hourly => write!(f, "every hour at minute {minute}"),
            PeriodUnit::Daily => write!(f, "every day at {hour:02}:{minute:02}"),
            PeriodUnit::Weekly => {
                write!(f, "every {:?} at {hour:02}:{minute:02}", self.weekday)
            }
            PeriodUnit::Monthly => write!(
                f,
                "day {} of every month at {hour:02}:{minute:02}",
                self.day_of_month
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cron() {
        assert_eq!(
            PeriodicSchedule::new(PeriodUnit::Hourly).at(0, 15).to_cron(),
            "15 * * * *"
        );
        assert_eq!(
            PeriodicSchedule::new(PeriodUnit::Daily).at(9, 30).to_cron(),
            "30 9 * * *"
        );
        assert_eq!(
            PeriodicSchedule::new(PeriodUnit::Weekly)
                .at(8, 0)
                .on_weekday(Weekday::Monday)
                .to_cron(),
            "0 8 * * 1"
        );
        assert_eq!(
            PeriodicSchedule::new(PeriodUnit::Monthly)
                .at(23, 59)
                .on_day(28)
                .to_cron(),
            "59 23 28 * *"
        );
    }

    #[test]
    fn test_from_cron_weekly() {
        let schedule = PeriodicSchedule::from_cron("45 6 * * 5").unwrap();
        assert_eq!(schedule.unit, PeriodUnit::Weekly);
        assert_eq!(schedule.weekday, Weekday::Friday);
        assert_eq!((schedule.hour, schedule.minute), (6, 45));
    }

    #[test]
    fn test_from_cron_rejects_custom_expressions() {
        assert!(PeriodicSchedule::from_cron("*/5 * * * *").is_err());
        assert!(PeriodicSchedule::from_cron("0 0 1 1 *").is_err());
        assert!(PeriodicSchedule::from_cron("0 0 1 * 1").is_err());
        assert!(PeriodicSchedule::from_cron("0 0 * *").is_err());
        assert!(PeriodicSchedule::from_cron("61 * * * *").is_err());
        assert!(PeriodicSchedule::from_cron("0 0 * * 9").is_err());
    }

    #[test]
    fn test_schedule_period() {
        let period = PeriodicSchedule::new(PeriodUnit::Daily).at(12, 0);
        let schedule = Schedule::periodic(&period);
        assert_eq!(schedule.period(), Some(period));
        assert_eq!(Schedule::manual().period(), None);
    }

    #[test]
    fn test_display() {
        let period = PeriodicSchedule::new(PeriodUnit::Daily).at(7, 5);
        assert_eq!(period.to_string(), "every day at 07:05");
    }
}
