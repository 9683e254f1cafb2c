//! Recurrence expansion: rolls recurring job templates forward into
//! concrete dated jobs inside a window.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{parse_calendar_date, Job, JobStatus, Recurrence};
use crate::services::new_id;

impl Recurrence {
    pub fn is_recurring(self) -> bool {
        self != Recurrence::None
    }

    fn step_days(self) -> Option<u64> {
        match self {
            Recurrence::Daily => Some(1),
            Recurrence::Weekly => Some(7),
            Recurrence::Biweekly => Some(14),
            Recurrence::None | Recurrence::Monthly => None,
        }
    }

    /// The `n`th occurrence of a series anchored at `anchor` (`n = 0` is the
    /// anchor itself). `None` for non-recurring series or past the calendar's
    /// range.
    ///
    /// Monthly occurrences are counted from the anchor, so a series on the
    /// 31st lands on the last day of shorter months and returns to the 31st
    /// afterwards. This intentionally differs from stepping a rolling cursor
    /// one month at a time, which would drift (Jan 31 to Mar 2 to Apr 2).
    pub fn nth_occurrence(self, anchor: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self {
            Recurrence::None => None,
            Recurrence::Monthly => anchor.checked_add_months(Months::new(n)),
            other => {
                let step = other.step_days()?;
                anchor.checked_add_days(Days::new(step.checked_mul(u64::from(n))?))
            }
        }
    }

    /// Index of the first occurrence on or after `start`.
    fn first_index_on_or_after(self, anchor: NaiveDate, start: NaiveDate) -> Option<u32> {
        if anchor >= start {
            return Some(0);
        }
        let mut n = match self {
            Recurrence::None => return None,
            Recurrence::Monthly => {
                let months = (start.year() - anchor.year()) * 12 + start.month() as i32
                    - anchor.month() as i32;
                u32::try_from(months.max(0)).ok()?
            }
            other => {
                let step = other.step_days()? as i64;
                let gap = (start - anchor).num_days();
                u32::try_from((gap + step - 1) / step).ok()?
            }
        };
        while self.nth_occurrence(anchor, n)? < start {
            n = n.checked_add(1)?;
        }
        Some(n)
    }
}

/// Inclusive date range for recurrence expansion. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl RecurrenceWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::validation(
                "startDate must be on or before endDate",
            ));
        }
        Ok(Self { start, end })
    }

    /// Builds a window from raw request values.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, AppError> {
        let (Some(start), Some(end)) = (start, end) else {
            return Err(AppError::validation("Start and end dates are required"));
        };
        let start = parse_calendar_date(start)
            .ok_or_else(|| AppError::validation(format!("Invalid startDate '{start}'")))?;
        let end = parse_calendar_date(end)
            .ok_or_else(|| AppError::validation(format!("Invalid endDate '{end}'")))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Result of one expansion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOutcome {
    pub message: String,
    pub count: usize,
    pub jobs: Vec<Job>,
}

impl GenerateOutcome {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            message: format!("Generated {} recurring jobs", jobs.len()),
            count: jobs.len(),
            jobs,
        }
    }
}

/// Expands every recurring job dated before the window into new jobs inside it.
///
/// A date is skipped when any job (stored, or generated earlier in this run)
/// already has the same customer, title and date. Returns only the new jobs,
/// in template order then date order.
pub fn expand_recurring(jobs: &[Job], window: RecurrenceWindow, now: DateTime<Utc>) -> Vec<Job> {
    let mut taken: HashSet<(&str, &str, NaiveDate)> = jobs
        .iter()
        .map(|j| (j.customer_id.as_str(), j.title.as_str(), j.scheduled_date))
        .collect();
    let mut generated = Vec::new();

    let templates = jobs
        .iter()
        .filter(|j| j.recurrence.is_recurring() && j.scheduled_date < window.start);

    for template in templates {
        let anchor = template.scheduled_date;
        let Some(mut n) = template.recurrence.first_index_on_or_after(anchor, window.start)
        else {
            continue;
        };

        while let Some(date) = template.recurrence.nth_occurrence(anchor, n) {
            if date > window.end {
                break;
            }
            let key = (template.customer_id.as_str(), template.title.as_str(), date);
            if taken.insert(key) {
                generated.push(occurrence_of(template, date, now));
            }
            match n.checked_add(1) {
                Some(next) => n = next,
                None => break,
            }
        }
    }

    generated
}

fn occurrence_of(template: &Job, date: NaiveDate, now: DateTime<Utc>) -> Job {
    Job {
        id: new_id(),
        customer_id: template.customer_id.clone(),
        round_id: template.round_id.clone(),
        title: template.title.clone(),
        description: template.description.clone(),
        scheduled_date: date,
        scheduled_time: template.scheduled_time,
        duration: template.duration,
        status: JobStatus::Scheduled,
        recurrence: template.recurrence,
        price: template.price,
        notes: template.notes.clone(),
        completion_notes: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewJob;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn window(start: &str, end: &str) -> RecurrenceWindow {
        RecurrenceWindow::new(date(start), date(end)).unwrap()
    }

    fn template(customer: &str, title: &str, on: &str, recurrence: Recurrence) -> Job {
        NewJob {
            recurrence: Some(recurrence),
            price: Some(15.0),
            round_id: Some("r-1".into()),
            status: Some(JobStatus::Completed),
            ..NewJob::new(customer, title, date(on))
        }
        .into_record(new_id(), Utc::now())
    }

    fn dates(jobs: &[Job]) -> Vec<String> {
        jobs.iter().map(|j| j.scheduled_date.to_string()).collect()
    }

    #[test]
    fn test_weekly_february_scenario() {
        let jobs = vec![template("c", "Windows", "2024-01-01", Recurrence::Weekly)];
        let out = expand_recurring(&jobs, window("2024-02-01", "2024-02-29"), Utc::now());
        assert_eq!(
            dates(&out),
            vec!["2024-02-05", "2024-02-12", "2024-02-19", "2024-02-26"]
        );
    }

    #[test]
    fn test_generated_jobs_copy_template_fields() {
        let jobs = vec![template("c", "Windows", "2024-01-01", Recurrence::Weekly)];
        let out = expand_recurring(&jobs, window("2024-01-08", "2024-01-08"), Utc::now());
        assert_eq!(out.len(), 1);
        let j = &out[0];
        assert_ne!(j.id, jobs[0].id);
        assert_eq!(j.customer_id, "c");
        assert_eq!(j.round_id.as_deref(), Some("r-1"));
        assert_eq!(j.price, Some(15.0));
        assert_eq!(j.recurrence, Recurrence::Weekly);
        assert_eq!(j.status, JobStatus::Scheduled);
        assert_eq!(j.created_at, j.updated_at);
    }

    #[test]
    fn test_daily_and_biweekly_steps() {
        let daily = vec![template("c", "Bins", "2024-03-01", Recurrence::Daily)];
        let out = expand_recurring(&daily, window("2024-03-10", "2024-03-12"), Utc::now());
        assert_eq!(dates(&out), vec!["2024-03-10", "2024-03-11", "2024-03-12"]);

        let biweekly = vec![template("c", "Gutters", "2024-01-01", Recurrence::Biweekly)];
        let out = expand_recurring(&biweekly, window("2024-01-02", "2024-02-15"), Utc::now());
        assert_eq!(dates(&out), vec!["2024-01-15", "2024-01-29", "2024-02-12"]);
    }

    #[test]
    fn test_monthly_clamps_to_month_end_and_recovers() {
        let jobs = vec![template("c", "Conservatory", "2024-01-31", Recurrence::Monthly)];
        let out = expand_recurring(&jobs, window("2024-02-01", "2024-04-30"), Utc::now());
        assert_eq!(dates(&out), vec!["2024-02-29", "2024-03-31", "2024-04-30"]);
    }

    #[test]
    fn test_monthly_skips_to_first_on_or_after_start() {
        let jobs = vec![template("c", "Fascias", "2023-11-20", Recurrence::Monthly)];
        let out = expand_recurring(&jobs, window("2024-02-21", "2024-04-01"), Utc::now());
        assert_eq!(dates(&out), vec!["2024-03-20"]);
    }

    #[test]
    fn test_only_templates_before_window_expand() {
        let jobs = vec![
            template("c", "Inside", "2024-02-10", Recurrence::Weekly),
            template("c", "After", "2024-03-10", Recurrence::Weekly),
            template("c", "Once", "2024-01-01", Recurrence::None),
        ];
        let out = expand_recurring(&jobs, window("2024-02-01", "2024-02-29"), Utc::now());
        assert!(out.is_empty());
    }

    #[test]
    fn test_existing_job_on_date_is_not_duplicated() {
        let mut existing = template("c", "Windows", "2024-02-12", Recurrence::None);
        existing.status = JobStatus::Scheduled;
        let jobs = vec![
            template("c", "Windows", "2024-01-01", Recurrence::Weekly),
            existing,
        ];
        let out = expand_recurring(&jobs, window("2024-02-01", "2024-02-29"), Utc::now());
        assert_eq!(dates(&out), vec!["2024-02-05", "2024-02-19", "2024-02-26"]);
    }

    #[test]
    fn test_rerun_over_result_generates_nothing() {
        let mut jobs = vec![
            template("c1", "Windows", "2024-01-01", Recurrence::Weekly),
            template("c2", "Gutters", "2023-12-15", Recurrence::Monthly),
        ];
        let w = window("2024-02-01", "2024-03-31");
        let first = expand_recurring(&jobs, w, Utc::now());
        assert!(!first.is_empty());
        jobs.extend(first);
        assert!(expand_recurring(&jobs, w, Utc::now()).is_empty());
    }

    #[test]
    fn test_same_customer_and_title_templates_share_dates() {
        // Dedup key is (customer, title, date); round and time are ignored.
        let mut other_round = template("c", "Windows", "2024-01-01", Recurrence::Weekly);
        other_round.round_id = Some("r-2".into());
        let jobs = vec![
            template("c", "Windows", "2024-01-01", Recurrence::Weekly),
            other_round,
        ];
        let out = expand_recurring(&jobs, window("2024-01-08", "2024-01-14"), Utc::now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].round_id.as_deref(), Some("r-1"));
    }

    #[test]
    fn test_all_generated_dates_fall_in_window() {
        let jobs = vec![
            template("a", "t", "2020-02-29", Recurrence::Daily),
            template("b", "t", "2020-02-29", Recurrence::Weekly),
            template("c", "t", "2020-02-29", Recurrence::Biweekly),
            template("d", "t", "2020-02-29", Recurrence::Monthly),
        ];
        let w = window("2024-02-03", "2024-06-17");
        let out = expand_recurring(&jobs, w, Utc::now());
        assert!(!out.is_empty());
        assert!(out.iter().all(|j| w.contains(j.scheduled_date)));
    }

    #[test]
    fn test_single_day_window_with_no_occurrence() {
        let jobs = vec![template("c", "Windows", "2024-01-01", Recurrence::Weekly)];
        let out = expand_recurring(&jobs, window("2024-01-09", "2024-01-09"), Utc::now());
        assert!(out.is_empty());
    }

    #[test]
    fn test_window_validation() {
        assert!(RecurrenceWindow::new(date("2024-02-02"), date("2024-02-01")).is_err());
        assert!(RecurrenceWindow::parse(Some("2024-02-01"), None).is_err());
        assert!(RecurrenceWindow::parse(Some("yesterday"), Some("2024-02-01")).is_err());
        let w = RecurrenceWindow::parse(Some("2024-02-01T00:00:00.000Z"), Some("2024-02-29"))
            .unwrap();
        assert_eq!(w.start(), date("2024-02-01"));
    }

    #[test]
    fn test_nth_occurrence() {
        let anchor = date("2024-01-31");
        assert_eq!(Recurrence::None.nth_occurrence(anchor, 1), None);
        assert_eq!(Recurrence::Daily.nth_occurrence(anchor, 1), Some(date("2024-02-01")));
        assert_eq!(Recurrence::Monthly.nth_occurrence(anchor, 0), Some(anchor));
        assert_eq!(Recurrence::Monthly.nth_occurrence(anchor, 13), Some(date("2025-02-28")));
    }
}
