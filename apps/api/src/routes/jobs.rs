use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{
    de::{value::StrDeserializer, IntoDeserializer},
    Deserialize, Serialize,
};

use crate::errors::AppError;
use crate::models::{parse_calendar_date, Job, JobPatch, JobStatus, NewJob, StatusUpdate};
use crate::routes::{ApiJson, ApiQuery, MessageResponse};
use crate::services::{GenerateOutcome, JobFilter, RecurrenceWindow};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

/// Query string of `GET /api/jobs`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl JobListQuery {
    /// Picks the first filter present, in order: date range (needs both
    /// ends), customer, round, status. Empty values count as absent.
    pub fn into_filter(self) -> Result<Option<JobFilter>, AppError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let (Some(start), Some(end)) = (present(self.start_date), present(self.end_date)) {
            let start = parse_calendar_date(&start)
                .ok_or_else(|| AppError::validation(format!("Invalid startDate '{start}'")))?;
            let end = parse_calendar_date(&end)
                .ok_or_else(|| AppError::validation(format!("Invalid endDate '{end}'")))?;
            return Ok(Some(JobFilter::DateRange { start, end }));
        }
        if let Some(customer_id) = present(self.customer_id) {
            return Ok(Some(JobFilter::Customer(customer_id)));
        }
        if let Some(round_id) = present(self.round_id) {
            return Ok(Some(JobFilter::Round(round_id)));
        }
        if let Some(status) = present(self.status) {
            let de: StrDeserializer<'_, serde::de::value::Error> =
                status.as_str().into_deserializer();
            let parsed = JobStatus::deserialize(de)
                .map_err(|_| AppError::validation(format!("Invalid status '{status}'")))?;
            return Ok(Some(JobFilter::Status(parsed)));
        }
        Ok(None)
    }
}

/// Body of `POST /api/jobs/generate-recurring`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/jobs
pub async fn handle_list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<JobListQuery>,
) -> Result<Json<Vec<Job>>, AppError> {
    let filter = query.into_filter()?;
    Ok(Json(state.jobs.list(filter.as_ref()).await?))
}

/// POST /api/jobs
pub async fn handle_create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewJob>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let job = state.jobs.create(input).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/jobs/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, AppError> {
    Ok(Json(state.jobs.get(&id).await?))
}

/// PUT /api/jobs/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<JobPatch>,
) -> Result<Json<Job>, AppError> {
    Ok(Json(state.jobs.update(&id, patch).await?))
}

/// PUT /api/jobs/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<Job>, AppError> {
    Ok(Json(state.jobs.update_status(&id, update).await?))
}

/// DELETE /api/jobs/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.jobs.delete(&id).await?;
    Ok(Json(MessageResponse::new("Job deleted successfully")))
}

/// POST /api/jobs/generate-recurring
pub async fn handle_generate_recurring(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GenerateRequest>,
) -> Result<Json<GenerateOutcome>, AppError> {
    let window = RecurrenceWindow::parse(req.start_date.as_deref(), req.end_date.as_deref())?;
    Ok(Json(state.jobs.generate_recurring(window).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn query(pairs: &[(&str, &str)]) -> JobListQuery {
        let mut q = JobListQuery::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "startDate" => q.start_date = v,
                "endDate" => q.end_date = v,
                "customerId" => q.customer_id = v,
                "roundId" => q.round_id = v,
                "status" => q.status = v,
                _ => unreachable!(),
            }
        }
        q
    }

    #[test]
    fn test_date_range_takes_precedence() {
        let f = query(&[
            ("status", "completed"),
            ("customerId", "c"),
            ("startDate", "2024-01-01"),
            ("endDate", "2024-01-31"),
        ])
        .into_filter()
        .unwrap();
        assert_eq!(
            f,
            Some(JobFilter::DateRange {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            })
        );
    }

    #[test]
    fn test_half_a_range_falls_through() {
        let f = query(&[("startDate", "2024-01-01"), ("roundId", "r")])
            .into_filter()
            .unwrap();
        assert_eq!(f, Some(JobFilter::Round("r".into())));
    }

    #[test]
    fn test_customer_before_round_before_status() {
        let f = query(&[("roundId", "r"), ("customerId", "c"), ("status", "skipped")])
            .into_filter()
            .unwrap();
        assert_eq!(f, Some(JobFilter::Customer("c".into())));

        let f = query(&[("status", "in_progress")]).into_filter().unwrap();
        assert_eq!(f, Some(JobFilter::Status(JobStatus::InProgress)));
    }

    #[test]
    fn test_empty_values_are_ignored() {
        assert_eq!(query(&[("customerId", "")]).into_filter().unwrap(), None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(query(&[("status", "done")]).into_filter().is_err());
        assert!(query(&[("startDate", "soon"), ("endDate", "2024-01-01")])
            .into_filter()
            .is_err());
    }
}
