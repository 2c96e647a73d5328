//! Run selection flags shared by the run-based reports

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use clap::Args;
use freshlens_analyzer::service::RunSelection;
use freshlens_core::domain::job::JobType;
use freshlens_core::domain::run::RunStatus;

#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Analyze a single job instead of the whole environment
    #[arg(long)]
    pub job_id: Option<i64>,

    /// Keep only jobs of these types (ci, merge, scheduled, other)
    #[arg(long = "type", value_delimiter = ',')]
    pub job_types: Vec<JobType>,

    /// Run statuses to include
    #[arg(long, value_delimiter = ',', default_values_t = [RunStatus::Success, RunStatus::Error])]
    pub status: Vec<RunStatus>,

    /// Most recent runs to analyze across all selected jobs
    #[arg(long, default_value_t = 10)]
    pub max_runs: usize,

    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<NaiveDate>,
}

impl SelectionArgs {
    pub fn to_selection(&self, environment_id: Option<i64>) -> Result<RunSelection> {
        if self.max_runs == 0 {
            bail!("--max-runs must be greater than 0");
        }

        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                bail!("--since ({}) is after --until ({})", since, until);
            }
        }

        if self.job_id.is_none() {
            environment_id
                .context("Select runs with --job-id or an environment id (--environment-id)")?;
        }

        Ok(RunSelection {
            environment_id,
            job_id: self.job_id,
            job_types: self.job_types.clone(),
            statuses: self.status.clone(),
            max_runs: self.max_runs,
            since: self.since.map(start_of_day),
            until: self.until.map(end_of_day),
        })
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Exclusive end of `date`: midnight of the following day
fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        selection: SelectionArgs,
    }

    fn parse(args: &[&str]) -> SelectionArgs {
        let mut argv = vec!["test"];
        argv.extend_from_slice(args);
        Harness::try_parse_from(argv).unwrap().selection
    }

    #[test]
    fn test_defaults() {
        let selection = parse(&[]).to_selection(Some(5)).unwrap();
        assert_eq!(selection.environment_id, Some(5));
        assert_eq!(selection.statuses, vec![RunStatus::Success, RunStatus::Error]);
        assert_eq!(selection.max_runs, 10);
        assert!(selection.job_types.is_empty());
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let selection = parse(&["--since", "2025-05-01", "--until", "2025-05-02", "--type", "ci,merge"])
            .to_selection(Some(5))
            .unwrap();

        assert_eq!(selection.since, Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()));
        assert_eq!(selection.until, Some(Utc.with_ymd_and_hms(2025, 5, 3, 0, 0, 0).unwrap()));
        assert_eq!(selection.job_types, vec![JobType::Ci, JobType::Merge]);
    }

    #[test]
    fn test_last_instant_of_until_day_is_covered() {
        let selection = parse(&["--until", "2025-05-02"]).to_selection(Some(5)).unwrap();
        let until = selection.until.unwrap();

        let last_half_second =
            Utc.with_ymd_and_hms(2025, 5, 2, 23, 59, 59).unwrap() + Duration::milliseconds(500);
        assert!(last_half_second < until);
        assert!(Utc.with_ymd_and_hms(2025, 5, 3, 0, 0, 0).unwrap() >= until);
    }

    #[test]
    fn test_rejects_inverted_range() {
        let args = parse(&["--since", "2025-05-03", "--until", "2025-05-02"]);
        assert!(args.to_selection(Some(5)).is_err());
    }

    #[test]
    fn test_requires_scope() {
        assert!(parse(&[]).to_selection(None).is_err());
        assert!(parse(&["--job-id", "42"]).to_selection(None).is_ok());
    }

    #[test]
    fn test_rejects_unknown_status() {
        assert!(Harness::try_parse_from(["test", "--status", "finished"]).is_err());
    }
}
