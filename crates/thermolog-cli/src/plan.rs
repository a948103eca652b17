//! Validate the flag surface into one run plan before doing any work.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;
use thermolog_core::{
    Grouping, JobKind, Measurement, Result, SampleError, SamplerConfig, ScheduleConfig,
    SystemPaths, Trigger, TriggerFields, parse_user_time,
};

use crate::Cli;

/// Everything a single invocation will do, in execution order.
#[derive(Debug)]
pub struct RunPlan {
    pub database: PathBuf,
    pub create_database: bool,
    /// One immediate sample.
    pub log: Option<SamplerConfig>,
    pub schedule: Option<ScheduledLog>,
    pub view: Option<ViewRequest>,
}

#[derive(Debug)]
pub struct ScheduledLog {
    pub sampler: SamplerConfig,
    pub schedule: ScheduleConfig,
    /// Warm-up used on cycles the schedule asks to warm up.
    pub warmup: Option<Duration>,
}

#[derive(Debug)]
pub struct ViewRequest {
    /// `None` views this machine.
    pub host: Option<String>,
    pub measurement: Measurement,
    pub grouping: Grouping,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub this_session: bool,
    pub output: Option<PathBuf>,
}

impl RunPlan {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.create_database && (cli.log || cli.schedule || cli.view) {
            return Err(SampleError::conflict(
                "--create_database cannot be combined with --log, --schedule or --view",
            ));
        }
        if cli.schedule && cli.view {
            return Err(SampleError::conflict(
                "can not handle both --view and --schedule at the same time",
            ));
        }
        if !(cli.create_database || cli.log || cli.schedule || cli.view) {
            return Err(SampleError::NoModeSelected);
        }

        let interval = seconds("--interval", cli.interval)?;
        if interval.is_zero() {
            return Err(SampleError::conflict("--interval must be greater than zero"));
        }
        let warmup = Some(seconds("--warmup", cli.warmup)?).filter(|d| !d.is_zero());
        let sampler = |warmup| SamplerConfig {
            paths: SystemPaths::default(),
            interval,
            warmup,
        };

        let log = cli.log.then(|| sampler(warmup));

        let schedule = if cli.schedule {
            let kind: JobKind = cli
                .job_type
                .as_deref()
                .ok_or_else(|| SampleError::schedule("--schedule needs --job_type cron|interval"))?
                .parse()?;
            let trigger = Trigger::from_fields(kind, &trigger_fields(cli))?;
            Some(ScheduledLog {
                sampler: sampler(None),
                schedule: ScheduleConfig {
                    trigger,
                    misfire_grace: cli
                        .misfire
                        .map(|value| seconds("--misfire", value))
                        .transpose()?,
                    // A preceding --log already absorbed the start-up heat.
                    warmup_first: !cli.log,
                },
                warmup,
            })
        } else {
            None
        };

        let view = if cli.view {
            let measurement = cli
                .measurement
                .parse::<Measurement>()
                .map_err(SampleError::conflict)?;
            Some(ViewRequest {
                host: cli.host.clone(),
                measurement,
                grouping: if cli.core {
                    Grouping::Core
                } else {
                    Grouping::Processor
                },
                from: cli.start_time.as_deref().map(parse_user_time).transpose()?,
                to: cli.end_time.as_deref().map(parse_user_time).transpose()?,
                this_session: cli.this_session,
                output: cli.output.clone(),
            })
        } else {
            None
        };

        Ok(Self {
            database: cli.database.clone(),
            create_database: cli.create_database,
            log,
            schedule,
            view,
        })
    }
}

fn trigger_fields(cli: &Cli) -> TriggerFields {
    TriggerFields {
        year: cli.year,
        month: cli.month,
        week: cli.week,
        day: cli.day,
        hour: cli.hour,
        minute: cli.minute,
        second: cli.second,
    }
}

fn seconds(flag: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        SampleError::conflict(format!(
            "{flag} must be a non-negative number of seconds, got {value}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn plan(args: &[&str]) -> Result<RunPlan> {
        let mut argv = vec!["thermolog"];
        argv.extend_from_slice(args);
        RunPlan::from_cli(&Cli::try_parse_from(argv).unwrap())
    }

    fn plan_err(args: &[&str]) -> SampleError {
        plan(args).unwrap_err()
    }

    #[test]
    fn no_mode_is_nothing_to_do() {
        assert!(matches!(plan(&[]), Err(SampleError::NoModeSelected)));
    }

    #[test]
    fn schedule_and_view_conflict() {
        let err = plan(&["--schedule", "--view", "--job_type", "interval", "--seconds", "5"])
            .unwrap_err();
        assert!(matches!(err, SampleError::ArgumentConflict { .. }));
    }

    #[test]
    fn create_database_stands_alone() {
        assert!(matches!(
            plan(&["--create_database", "--log"]),
            Err(SampleError::ArgumentConflict { .. })
        ));
        let ok = plan(&["--create_database"]).unwrap();
        assert!(ok.create_database && ok.log.is_none());
    }

    #[test]
    fn log_combines_with_view() {
        let plan = plan(&["--log", "--view", "--interval", "0.5"]).unwrap();
        let log = plan.log.unwrap();
        assert_eq!(log.interval, Duration::from_millis(500));
        assert_eq!(log.warmup, Some(Duration::from_secs(1)));
        assert!(plan.view.is_some());
    }

    #[test]
    fn log_before_schedule_skips_first_warmup() {
        let plan = plan(&["--log", "--schedule", "--job_type", "cron", "--minute", "0"]).unwrap();
        let scheduled = plan.schedule.unwrap();
        assert!(!scheduled.schedule.warmup_first);
        assert_eq!(scheduled.sampler.warmup, None);
        assert_eq!(scheduled.schedule.misfire_grace, None);
    }

    #[test]
    fn zero_misfire_is_accepted() {
        let plan = plan(&[
            "--schedule",
            "--job_type",
            "interval",
            "--seconds",
            "5",
            "--misfire",
            "0",
        ])
        .unwrap();
        assert_eq!(
            plan.schedule.unwrap().schedule.misfire_grace,
            Some(Duration::ZERO)
        );
        assert!(matches!(
            plan_err(&["--schedule", "--job_type", "cron", "--hour", "1", "--misfire=-2"]),
            SampleError::ArgumentConflict { .. }
        ));
    }

    #[test]
    fn schedule_needs_job_type() {
        let err = plan(&["--schedule", "--seconds", "10"]).unwrap_err();
        assert!(matches!(err, SampleError::InvalidSchedule { .. }));
    }

    #[test]
    fn plural_aliases_and_misfire() {
        let plan = plan(&[
            "--schedule",
            "--job_type",
            "interval",
            "--minutes",
            "2",
            "--misfire",
            "5",
        ])
        .unwrap();
        let scheduled = plan.schedule.unwrap();
        assert_eq!(
            scheduled.schedule.trigger,
            Trigger::Interval(Duration::from_secs(120))
        );
        assert_eq!(
            scheduled.schedule.misfire_grace,
            Some(Duration::from_secs(5))
        );
        assert!(scheduled.schedule.warmup_first);
    }

    #[test]
    fn bad_view_time_fails_before_work() {
        let err = plan(&["--view", "--start_time", "last tuesday"]).unwrap_err();
        assert!(matches!(err, SampleError::BadTimeFormat { .. }));
    }

    #[test]
    fn view_request_carries_options() {
        let plan = plan(&[
            "--view",
            "--host",
            "lab-3",
            "--measurement",
            "usage",
            "--core",
            "--start_time",
            "24/03/01",
            "--this_session",
        ])
        .unwrap();
        let view = plan.view.unwrap();
        assert_eq!(view.host.as_deref(), Some("lab-3"));
        assert_eq!(view.measurement, Measurement::Usage);
        assert_eq!(view.grouping, Grouping::Core);
        assert!(view.from.is_some() && view.to.is_none());
        assert!(view.this_session);
    }

    #[test]
    fn unknown_measurement_is_rejected() {
        assert!(matches!(
            plan(&["--view", "--measurement", "fan"]),
            Err(SampleError::ArgumentConflict { .. })
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(plan(&["--log", "--interval", "0"]).is_err());
        assert!(plan(&["--log", "--warmup=-1"]).is_err());
    }
}
