//! Typed HTTP client for the API with an in-memory cache of each collection.
//!
//! The cache changes only after the server acknowledges a call. Failures are
//! returned to the caller with the cache left as it was, so a presentation
//! layer can decide between stale data, an error state or a retry.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::models::{
    Customer, CustomerPatch, Job, JobPatch, JobStatus, NewCustomer, NewJob, NewRound, Patch,
    Round, RoundPatch, StatusUpdate,
};
use crate::routes::jobs::{GenerateRequest, JobListQuery};
use crate::routes::MessageResponse;
use crate::services::{GenerateOutcome, Record};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    /// HTTP status of an error response, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Result of `ApiClient::complete_job`.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub job: Job,
    /// The following occurrence, created when the job recurs.
    pub next: Option<Job>,
}

/// Last acknowledged state of each collection.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    pub customers: Vec<Customer>,
    pub jobs: Vec<Job>,
    pub rounds: Vec<Round>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    cache: Arc<RwLock<Cache>>,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:5000`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(format!("{base_url} cannot carry a path")));
        }
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url,
            cache: Arc::new(RwLock::new(Cache::default())),
        })
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &[&str]) -> Result<T, ClientError> {
        self.send(self.client.get(self.endpoint(path)?)).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &[&str],
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.client.post(self.endpoint(path)?).json(body))
            .await
    }

    async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &[&str],
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.client.put(self.endpoint(path)?).json(body))
            .await
    }

    async fn delete(&self, path: &[&str]) -> Result<MessageResponse, ClientError> {
        self.send(self.client.delete(self.endpoint(path)?)).await
    }

    // ── Snapshots ───────────────────────────────────────────────────────────

    pub async fn snapshot(&self) -> Cache {
        self.cache.read().await.clone()
    }

    pub async fn customers(&self) -> Vec<Customer> {
        self.cache.read().await.customers.clone()
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.cache.read().await.jobs.clone()
    }

    pub async fn rounds(&self) -> Vec<Round> {
        self.cache.read().await.rounds.clone()
    }

    // ── Customers ───────────────────────────────────────────────────────────

    pub async fn fetch_customers(&self) -> Result<Vec<Customer>, ClientError> {
        let customers: Vec<Customer> = self.get(&["api", "customers"]).await?;
        debug!("Fetched {} customers", customers.len());
        self.cache.write().await.customers = customers.clone();
        Ok(customers)
    }

    pub async fn create_customer(&self, input: &NewCustomer) -> Result<Customer, ClientError> {
        let customer: Customer = self.post(&["api", "customers"], input).await?;
        self.cache.write().await.customers.push(customer.clone());
        Ok(customer)
    }

    pub async fn update_customer(
        &self,
        id: &str,
        patch: &CustomerPatch,
    ) -> Result<Customer, ClientError> {
        let customer: Customer = self.put(&["api", "customers", id], patch).await?;
        replace(&mut self.cache.write().await.customers, customer.clone());
        Ok(customer)
    }

    /// Deletes the customer and drops its jobs from the cache. The server
    /// keeps those jobs.
    pub async fn delete_customer(&self, id: &str) -> Result<(), ClientError> {
        self.delete(&["api", "customers", id]).await?;
        let mut cache = self.cache.write().await;
        cache.customers.retain(|c| c.id != id);
        cache.jobs.retain(|j| j.customer_id != id);
        Ok(())
    }

    // ── Jobs ────────────────────────────────────────────────────────────────

    pub async fn fetch_jobs(&self) -> Result<Vec<Job>, ClientError> {
        let jobs: Vec<Job> = self.get(&["api", "jobs"]).await?;
        debug!("Fetched {} jobs", jobs.len());
        self.cache.write().await.jobs = jobs.clone();
        Ok(jobs)
    }

    /// Filtered listing. The result is not cached.
    pub async fn query_jobs(&self, query: &JobListQuery) -> Result<Vec<Job>, ClientError> {
        self.send(self.client.get(self.endpoint(&["api", "jobs"])?).query(query))
            .await
    }

    pub async fn create_job(&self, input: &NewJob) -> Result<Job, ClientError> {
        let job: Job = self.post(&["api", "jobs"], input).await?;
        self.cache.write().await.jobs.push(job.clone());
        Ok(job)
    }

    pub async fn update_job(&self, id: &str, patch: &JobPatch) -> Result<Job, ClientError> {
        let job: Job = self.put(&["api", "jobs", id], patch).await?;
        replace(&mut self.cache.write().await.jobs, job.clone());
        Ok(job)
    }

    pub async fn update_job_status(&self, id: &str, status: JobStatus) -> Result<Job, ClientError> {
        let body = StatusUpdate {
            status: Some(status),
        };
        let job: Job = self.put(&["api", "jobs", id, "status"], &body).await?;
        replace(&mut self.cache.write().await.jobs, job.clone());
        Ok(job)
    }

    /// Marks the job completed with optional notes. A recurring job gets its
    /// next occurrence created as a fresh scheduled job.
    ///
    /// Each call updates the cache once acknowledged, so if creating the
    /// follow-up fails the completed job is still cached.
    pub async fn complete_job(
        &self,
        id: &str,
        notes: Option<String>,
    ) -> Result<Completion, ClientError> {
        let patch = JobPatch {
            status: Patch::Value(JobStatus::Completed),
            completion_notes: notes.map_or(Patch::Absent, Patch::Value),
            ..Default::default()
        };
        let job = self.update_job(id, &patch).await?;

        let next = match job.recurrence.nth_occurrence(job.scheduled_date, 1) {
            Some(date) => Some(self.create_job(&follow_up(&job, date)).await?),
            None => None,
        };
        if let Some(next) = &next {
            info!("Completed job {}, next on {}", job.id, next.scheduled_date);
        }
        Ok(Completion { job, next })
    }

    pub async fn delete_job(&self, id: &str) -> Result<(), ClientError> {
        self.delete(&["api", "jobs", id]).await?;
        self.cache.write().await.jobs.retain(|j| j.id != id);
        Ok(())
    }

    /// `start` and `end` are `YYYY-MM-DD`.
    pub async fn generate_recurring(
        &self,
        start: &str,
        end: &str,
    ) -> Result<GenerateOutcome, ClientError> {
        let body = GenerateRequest {
            start_date: Some(start.to_string()),
            end_date: Some(end.to_string()),
        };
        let outcome: GenerateOutcome = self.post(&["api", "jobs", "generate-recurring"], &body).await?;
        self.cache
            .write()
            .await
            .jobs
            .extend(outcome.jobs.iter().cloned());
        Ok(outcome)
    }

    // ── Rounds ──────────────────────────────────────────────────────────────

    pub async fn fetch_rounds(&self) -> Result<Vec<Round>, ClientError> {
        let rounds: Vec<Round> = self.get(&["api", "rounds"]).await?;
        debug!("Fetched {} rounds", rounds.len());
        self.cache.write().await.rounds = rounds.clone();
        Ok(rounds)
    }

    pub async fn create_round(&self, input: &NewRound) -> Result<Round, ClientError> {
        let round: Round = self.post(&["api", "rounds"], input).await?;
        self.cache.write().await.rounds.push(round.clone());
        Ok(round)
    }

    pub async fn update_round(&self, id: &str, patch: &RoundPatch) -> Result<Round, ClientError> {
        let round: Round = self.put(&["api", "rounds", id], patch).await?;
        replace(&mut self.cache.write().await.rounds, round.clone());
        Ok(round)
    }

    pub async fn delete_round(&self, id: &str) -> Result<(), ClientError> {
        self.delete(&["api", "rounds", id]).await?;
        self.cache.write().await.rounds.retain(|r| r.id != id);
        Ok(())
    }
}

/// A scheduled copy of `job` on `date`, without completion notes.
fn follow_up(job: &Job, date: NaiveDate) -> NewJob {
    let mut next = NewJob::new(job.customer_id.clone(), job.title.clone(), date);
    next.round_id = job.round_id.clone();
    next.description = job.description.clone();
    next.scheduled_time = job.scheduled_time;
    next.duration = Some(job.duration);
    next.recurrence = Some(job.recurrence);
    next.price = job.price;
    next.notes = job.notes.clone();
    next
}

/// Swaps in the acknowledged record, or appends it if the cache never saw it.
fn replace<R: Record>(records: &mut Vec<R>, record: R) {
    match records.iter_mut().find(|r| r.id() == record.id()) {
        Some(slot) => *slot = record,
        None => records.push(record),
    }
}
