//! Blocking cron/interval scheduler for repeated sampling cycles.
//!
//! Jobs run inline on the calling thread, so at most one cycle is ever in
//! flight. A fire that starts later than the misfire grace allows is skipped
//! rather than run late. Without a grace every fire runs, however late.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use log::{debug, error, info, warn};

use crate::error::{Result, SampleError};
use crate::sampler::{POLL, sleep_while_running};

/// Days searched ahead for the next cron match before giving up.
const CRON_SEARCH_DAYS: i64 = 366 * 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Cron,
    Interval,
}

impl FromStr for JobKind {
    type Err = SampleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cron" => Ok(Self::Cron),
            "interval" => Ok(Self::Interval),
            other => Err(SampleError::schedule(format!(
                "unknown job type '{other}', expected cron or interval"
            ))),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cron => write!(f, "cron"),
            Self::Interval => write!(f, "interval"),
        }
    }
}

/// Raw schedule fields as given on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerFields {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub week: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
}

/// Resolved calendar constraints; `None` matches any value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CronFields {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    /// ISO week number.
    pub week: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
}

impl CronFields {
    /// Fix the given fields, default the ones finer than the finest given
    /// field to their minimum, and leave coarser ones as wildcards.
    ///
    /// The week is never defaulted, so `--month 3` fires on March 1st.
    pub fn resolve(fields: &TriggerFields) -> Result<Self> {
        check_range("month", fields.month, 1, 12)?;
        check_range("week", fields.week, 1, 53)?;
        check_range("day", fields.day, 1, 31)?;
        check_range("hour", fields.hour, 0, 23)?;
        check_range("minute", fields.minute, 0, 59)?;
        check_range("second", fields.second, 0, 59)?;
        if let Some(year) = fields.year
            && !(1970..=9999).contains(&year)
        {
            return Err(SampleError::schedule(format!(
                "year {year} is outside 1970..=9999"
            )));
        }

        // Significance order: year, month, day, week, hour, minute, second.
        let given = [
            fields.year.is_some(),
            fields.month.is_some(),
            fields.day.is_some(),
            fields.week.is_some(),
            fields.hour.is_some(),
            fields.minute.is_some(),
            fields.second.is_some(),
        ];
        let Some(finest) = given.iter().rposition(|&g| g) else {
            return Err(SampleError::schedule(
                "a cron schedule needs at least one of year, month, week, day, hour, minute, second",
            ));
        };
        let default = |idx: usize, value: Option<u32>, min: u32| {
            value.or((idx > finest).then_some(min))
        };

        Ok(Self {
            year: fields.year,
            month: default(1, fields.month, 1),
            day: default(2, fields.day, 1),
            week: fields.week,
            hour: default(4, fields.hour, 0),
            minute: default(5, fields.minute, 0),
            second: default(6, fields.second, 0),
        })
    }

    fn matches_date(&self, date: NaiveDate) -> bool {
        self.year.is_none_or(|y| date.year() == y)
            && self.month.is_none_or(|m| date.month() == m)
            && self.day.is_none_or(|d| date.day() == d)
            && self.week.is_none_or(|w| date.iso_week().week() == w)
    }

    /// Earliest matching time of day strictly after `floor`.
    fn first_time(&self, floor: Option<NaiveTime>) -> Option<NaiveTime> {
        let pick = |fixed: Option<u32>, max: u32| match fixed {
            Some(v) => v..=v,
            None => 0..=max,
        };
        for hour in pick(self.hour, 23) {
            for minute in pick(self.minute, 59) {
                for second in pick(self.second, 59) {
                    let candidate = NaiveTime::from_hms_opt(hour, minute, second)?;
                    if floor.is_none_or(|f| candidate > f) {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// Next matching instant strictly after `after`, if any within reach.
    pub fn next_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let mut date = after.date();
        let mut floor = Some(after.time());
        for _ in 0..CRON_SEARCH_DAYS {
            if self.year.is_some_and(|y| date.year() > y) {
                return None;
            }
            if self.matches_date(date)
                && let Some(time) = self.first_time(floor)
            {
                return Some(date.and_time(time));
            }
            date = date.succ_opt()?;
            floor = None;
        }
        None
    }
}

fn check_range(name: &str, value: Option<u32>, min: u32, max: u32) -> Result<()> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(SampleError::schedule(format!(
            "{name} {v} is outside {min}..={max}"
        ))),
        _ => Ok(()),
    }
}

/// When the scheduler fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Cron(CronFields),
    Interval(Duration),
}

impl Trigger {
    pub fn from_fields(kind: JobKind, fields: &TriggerFields) -> Result<Self> {
        match kind {
            JobKind::Cron => Ok(Self::Cron(CronFields::resolve(fields)?)),
            JobKind::Interval => {
                if fields.year.is_some() || fields.month.is_some() {
                    warn!("interval schedules ignore --year and --month");
                }
                let seconds = u64::from(fields.week.unwrap_or(0)) * 7 * 86_400
                    + u64::from(fields.day.unwrap_or(0)) * 86_400
                    + u64::from(fields.hour.unwrap_or(0)) * 3_600
                    + u64::from(fields.minute.unwrap_or(0)) * 60
                    + u64::from(fields.second.unwrap_or(0));
                if seconds == 0 {
                    return Err(SampleError::schedule(
                        "an interval schedule needs a non-zero period",
                    ));
                }
                let period = Duration::from_secs(seconds);
                TimeDelta::from_std(period)
                    .map_err(|_| SampleError::schedule("interval period is too large"))?;
                Ok(Self::Interval(period))
            }
        }
    }

    /// Next fire time strictly after `after`.
    pub fn next_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Cron(fields) => fields.next_after(after),
            Self::Interval(period) => {
                after.checked_add_signed(TimeDelta::from_std(*period).ok()?)
            }
        }
    }
}

/// Settings of one scheduled run.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub trigger: Trigger,
    /// Lateness a fire may have before it is skipped; `None` never skips.
    pub misfire_grace: Option<Duration>,
    /// Ask for the thermal warm-up on the first cycle only.
    pub warmup_first: bool,
}

impl ScheduleConfig {
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            misfire_grace: None,
            warmup_first: true,
        }
    }
}

pub struct Scheduler {
    config: ScheduleConfig,
}

impl Scheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    /// Fire `job` at every trigger time until `running` is cleared.
    ///
    /// `job` receives `true` when it should warm up before reading
    /// temperatures. Failures are logged and the next trigger is awaited;
    /// run-fatal failures end the loop and are returned. A cleared flag ends
    /// the loop with [`SampleError::Interrupted`]. Returns `Ok` once the
    /// trigger has no further fire times.
    pub fn run<F>(&self, running: &AtomicBool, mut job: F) -> Result<()>
    where
        F: FnMut(bool) -> Result<()>,
    {
        let limit = lateness_limit(self.config.misfire_grace);
        let mut first = true;
        let mut next = self.config.trigger.next_after(now());

        while let Some(fire_at) = next {
            info!("next cycle at {fire_at}");
            if let Ok(wait) = (fire_at - now()).to_std()
                && !sleep_while_running(wait, running)
            {
                return Err(SampleError::Interrupted);
            }
            if !running.load(Ordering::SeqCst) {
                return Err(SampleError::Interrupted);
            }

            let late = now() - fire_at;
            if late > limit {
                warn!(
                    "skipping cycle scheduled for {fire_at}: {:.1}s late",
                    late.num_milliseconds() as f64 / 1000.0
                );
            } else {
                let warmup = first && self.config.warmup_first;
                first = false;
                match job(warmup) {
                    Ok(()) => debug!("cycle for {fire_at} done"),
                    Err(e) if e.is_fatal_for_run() => return Err(e),
                    Err(e) => error!("cycle for {fire_at} failed: {e}"),
                }
            }

            let (following, skipped) = catch_up(&self.config.trigger, fire_at, limit, now());
            if skipped > 0 {
                warn!("skipped {skipped} misfired cycles while the previous one ran");
            }
            next = following;
        }

        info!("schedule has no further fire times");
        Ok(())
    }
}

/// Largest lateness still run. Waking from the sleep overshoots the fire
/// time slightly, so one poll period is never counted against the grace.
fn lateness_limit(grace: Option<Duration>) -> TimeDelta {
    grace
        .and_then(|g| TimeDelta::from_std(g.saturating_add(POLL)).ok())
        .unwrap_or(TimeDelta::MAX)
}

/// Next fire after `fired` that is still within `limit` at `current`,
/// together with the number of fires passed over on the way.
fn catch_up(
    trigger: &Trigger,
    fired: NaiveDateTime,
    limit: TimeDelta,
    current: NaiveDateTime,
) -> (Option<NaiveDateTime>, u64) {
    let mut skipped = 0;
    let mut next = trigger.next_after(fired);
    while let Some(at) = next
        && current - at > limit
    {
        skipped += 1;
        next = trigger.next_after(at);
    }
    (next, skipped)
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
