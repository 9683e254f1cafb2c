use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::IgnoredAny, Deserialize, Serialize};

use super::{require_non_blank, ClockTime, Patch};
use crate::errors::AppError;

pub const DEFAULT_DURATION_MINUTES: u32 = 60;

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

/// Lifecycle state of a job. Any value may follow any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Skipped,
}

/// How often a job repeats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scheduled_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<ClockTime>,
    /// Minutes.
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewJob {
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scheduled_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_notes: Option<String>,
    /// Server-assigned; accepted and ignored.
    #[serde(default, skip_serializing)]
    pub id: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<IgnoredAny>,
}

impl NewJob {
    pub fn new(
        customer_id: impl Into<String>,
        title: impl Into<String>,
        scheduled_date: NaiveDate,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            round_id: None,
            title: title.into(),
            description: None,
            scheduled_date,
            scheduled_time: None,
            duration: None,
            status: None,
            recurrence: None,
            price: None,
            notes: None,
            completion_notes: None,
            id: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Field-level checks. The customer reference is checked by the service.
    pub fn validate(&self) -> Result<(), AppError> {
        require_non_blank("customerId", &self.customer_id)?;
        require_non_blank("title", &self.title)?;
        if let Some(duration) = self.duration {
            check_duration(duration)?;
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        Ok(())
    }

    pub fn into_record(self, id: String, now: DateTime<Utc>) -> Job {
        Job {
            id,
            customer_id: self.customer_id,
            round_id: self.round_id,
            title: self.title,
            description: self.description,
            scheduled_date: self.scheduled_date,
            scheduled_time: self.scheduled_time,
            duration: self.duration.unwrap_or(DEFAULT_DURATION_MINUTES),
            status: self.status.unwrap_or_default(),
            recurrence: self.recurrence.unwrap_or_default(),
            price: self.price,
            notes: self.notes,
            completion_notes: self.completion_notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `PUT /api/jobs/:id`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub customer_id: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub round_id: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub title: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub scheduled_date: Patch<NaiveDate>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub scheduled_time: Patch<ClockTime>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub duration: Patch<u32>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub status: Patch<JobStatus>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub recurrence: Patch<Recurrence>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub price: Patch<f64>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub notes: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub completion_notes: Patch<String>,
    #[serde(default, skip_serializing)]
    pub id: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<IgnoredAny>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<IgnoredAny>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Patch::Value(status),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(customer_id) = self.customer_id.value() {
            require_non_blank("customerId", customer_id)?;
        }
        if let Some(title) = self.title.value() {
            require_non_blank("title", title)?;
        }
        if let Some(&duration) = self.duration.value() {
            check_duration(duration)?;
        }
        if let Some(&price) = self.price.value() {
            check_price(price)?;
        }
        Ok(())
    }
}

impl Job {
    /// Merges `patch` over this record. Does not touch `updated_at`.
    /// On error the record is left unchanged.
    pub fn apply(&mut self, patch: JobPatch) -> Result<(), AppError> {
        patch.validate()?;
        let mut next = self.clone();
        patch.customer_id.apply_required("customerId", &mut next.customer_id)?;
        patch.title.apply_required("title", &mut next.title)?;
        patch
            .scheduled_date
            .apply_required("scheduledDate", &mut next.scheduled_date)?;
        patch.duration.apply_required("duration", &mut next.duration)?;
        patch.status.apply_required("status", &mut next.status)?;
        patch.recurrence.apply_required("recurrence", &mut next.recurrence)?;
        patch.round_id.apply(&mut next.round_id);
        patch.description.apply(&mut next.description);
        patch.scheduled_time.apply(&mut next.scheduled_time);
        patch.price.apply(&mut next.price);
        patch.notes.apply(&mut next.notes);
        patch.completion_notes.apply(&mut next.completion_notes);
        *self = next;
        Ok(())
    }
}

/// Body of `PUT /api/jobs/:id/status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: Option<JobStatus>,
}

fn check_duration(duration: u32) -> Result<(), AppError> {
    if duration == 0 {
        return Err(AppError::validation("duration must be greater than 0"));
    }
    Ok(())
}

fn check_price(price: f64) -> Result<(), AppError> {
    if price.is_nan() || price < 0.0 {
        return Err(AppError::validation("price must not be negative"));
    }
    Ok(())
}
