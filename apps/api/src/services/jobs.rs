use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::errors::AppError;
use crate::models::{Job, JobPatch, JobStatus, NewJob, StatusUpdate};
use crate::services::recurrence::{expand_recurring, GenerateOutcome, RecurrenceWindow};
use crate::services::{CustomerService, Record, Resource};
use crate::store::Store;

/// One narrowing applied to a job listing. Only a single dimension is
/// honoured per call.
#[derive(Debug, Clone, PartialEq)]
pub enum JobFilter {
    /// Inclusive on both ends.
    DateRange { start: NaiveDate, end: NaiveDate },
    Customer(String),
    Round(String),
    Status(JobStatus),
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        match self {
            JobFilter::DateRange { start, end } => {
                *start <= job.scheduled_date && job.scheduled_date <= *end
            }
            JobFilter::Customer(id) => job.customer_id == *id,
            JobFilter::Round(id) => job.round_id.as_deref() == Some(id.as_str()),
            JobFilter::Status(status) => job.status == *status,
        }
    }
}

#[derive(Clone)]
pub struct JobService {
    resource: Resource<Job>,
    customers: CustomerService,
}

impl JobService {
    pub fn new(store: Store) -> Self {
        Self {
            customers: CustomerService::new(store.clone()),
            resource: Resource::new(store),
        }
    }

    /// All jobs in stored order, optionally narrowed by `filter`.
    pub async fn list(&self, filter: Option<&JobFilter>) -> Result<Vec<Job>, AppError> {
        let jobs = self.resource.list().await?;
        Ok(match filter {
            Some(filter) => jobs.into_iter().filter(|j| filter.matches(j)).collect(),
            None => jobs,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Job, AppError> {
        self.resource.get(id).await
    }

    pub async fn create(&self, input: NewJob) -> Result<Job, AppError> {
        input.validate()?;
        if !self.customers.exists(&input.customer_id).await? {
            return Err(AppError::validation("Customer not found"));
        }
        self.resource
            .insert(|id, now| input.into_record(id, now))
            .await
    }

    /// Merges `patch` over the job. A changed `customerId` must reference an
    /// existing customer.
    pub async fn update(&self, id: &str, patch: JobPatch) -> Result<Job, AppError> {
        let new_customer_known = match patch.customer_id.value() {
            Some(customer_id) => self.customers.exists(customer_id).await?,
            None => true,
        };

        self.resource
            .modify(id, |job| {
                if let Some(customer_id) = patch.customer_id.value() {
                    if *customer_id != job.customer_id && !new_customer_known {
                        return Err(AppError::validation("Customer not found"));
                    }
                }
                job.apply(patch)
            })
            .await
    }

    pub async fn update_status(&self, id: &str, update: StatusUpdate) -> Result<Job, AppError> {
        self.resource
            .modify(id, |job| {
                let status = update
                    .status
                    .ok_or_else(|| AppError::validation("Status is required"))?;
                job.apply(JobPatch::status(status))
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.resource.delete(id).await
    }

    /// Materialises recurring jobs inside `window` and appends them in one save.
    pub async fn generate_recurring(
        &self,
        window: RecurrenceWindow,
    ) -> Result<GenerateOutcome, AppError> {
        let store = self.resource.store();
        let _guard = store.lock(Job::COLLECTION).await;
        let mut jobs: Vec<Job> = store.load(Job::COLLECTION).await?;

        let generated = expand_recurring(&jobs, window, Utc::now());
        if !generated.is_empty() {
            jobs.extend(generated.iter().cloned());
            store.save(Job::COLLECTION, &jobs).await?;
        }

        info!(
            "Generated {} recurring jobs for {}..{}",
            generated.len(),
            window.start(),
            window.end()
        );
        Ok(GenerateOutcome::new(generated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCustomer, Patch, Recurrence};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn setup() -> (JobService, CustomerService, String) {
        let store = Store::in_memory();
        let customers = CustomerService::new(store.clone());
        let c = customers
            .create(NewCustomer::new("Ada", "1 High St"))
            .await
            .unwrap();
        (JobService::new(store), customers, c.id)
    }

    #[tokio::test]
    async fn test_create_requires_existing_customer() {
        let (jobs, _, _) = setup().await;
        let err = jobs
            .create(NewJob::new("ghost", "Windows", date("2024-01-01")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Customer not found"));
        assert!(jobs.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_update_changes_only_status() {
        let (jobs, _, cid) = setup().await;
        let job = jobs
            .create(NewJob {
                price: Some(12.5),
                ..NewJob::new(&cid, "Windows", date("2024-01-01"))
            })
            .await
            .unwrap();

        let updated = jobs
            .update(&job.id, JobPatch::status(JobStatus::Completed))
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::Completed);
        assert!(updated.updated_at > job.updated_at);
        assert_eq!(
            Job {
                status: job.status,
                updated_at: job.updated_at,
                ..updated
            },
            job
        );
    }

    #[tokio::test]
    async fn test_update_status_requires_status() {
        let (jobs, _, cid) = setup().await;
        let job = jobs
            .create(NewJob::new(&cid, "Windows", date("2024-01-01")))
            .await
            .unwrap();
        let err = jobs
            .update_status(&job.id, StatusUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = jobs
            .update_status(
                "missing",
                StatusUpdate {
                    status: Some(JobStatus::Skipped),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_new_customer() {
        let (jobs, _, cid) = setup().await;
        let job = jobs
            .create(NewJob::new(&cid, "Windows", date("2024-01-01")))
            .await
            .unwrap();
        let patch = JobPatch {
            customer_id: Patch::Value("ghost".into()),
            ..Default::default()
        };
        assert!(matches!(
            jobs.update(&job.id, patch).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_deleting_customer_leaves_dangling_job() {
        let (jobs, customers, cid) = setup().await;
        let job = jobs
            .create(NewJob::new(&cid, "Windows", date("2024-01-01")))
            .await
            .unwrap();
        customers.delete(&cid).await.unwrap();

        let still_there = jobs.get(&job.id).await.unwrap();
        assert_eq!(still_there.customer_id, cid);

        // Re-sending the unchanged customer id is not a change.
        let patch = JobPatch {
            customer_id: Patch::Value(cid.clone()),
            title: Patch::Value("Windows + frames".into()),
            ..Default::default()
        };
        assert_eq!(
            jobs.update(&job.id, patch).await.unwrap().title,
            "Windows + frames"
        );
    }

    #[tokio::test]
    async fn test_filters() {
        let (jobs, customers, cid) = setup().await;
        let other = customers
            .create(NewCustomer::new("Bob", "2 Low St"))
            .await
            .unwrap();

        let a = jobs
            .create(NewJob::new(&cid, "A", date("2024-01-01")))
            .await
            .unwrap();
        let b = jobs
            .create(NewJob {
                round_id: Some("r-1".into()),
                status: Some(JobStatus::Completed),
                ..NewJob::new(&other.id, "B", date("2024-01-15"))
            })
            .await
            .unwrap();
        let c = jobs
            .create(NewJob {
                status: Some(JobStatus::Completed),
                ..NewJob::new(&cid, "C", date("2024-01-31"))
            })
            .await
            .unwrap();

        let range = JobFilter::DateRange {
            start: date("2024-01-01"),
            end: date("2024-01-15"),
        };
        assert_eq!(jobs.list(Some(&range)).await.unwrap(), vec![a.clone(), b.clone()]);

        let by_customer = JobFilter::Customer(cid.clone());
        assert_eq!(
            jobs.list(Some(&by_customer)).await.unwrap(),
            vec![a.clone(), c.clone()]
        );

        let by_round = JobFilter::Round("r-1".into());
        assert_eq!(jobs.list(Some(&by_round)).await.unwrap(), vec![b.clone()]);

        let completed = JobFilter::Status(JobStatus::Completed);
        assert_eq!(jobs.list(Some(&completed)).await.unwrap(), vec![b, c]);
    }

    #[tokio::test]
    async fn test_generate_recurring_persists_once_and_is_idempotent() {
        let (jobs, _, cid) = setup().await;
        jobs.create(NewJob {
            recurrence: Some(Recurrence::Weekly),
            ..NewJob::new(&cid, "Windows", date("2024-01-01"))
        })
        .await
        .unwrap();

        let window = RecurrenceWindow::new(date("2024-02-01"), date("2024-02-29")).unwrap();
        let first = jobs.generate_recurring(window).await.unwrap();
        assert_eq!(first.count, 4);
        assert_eq!(first.message, "Generated 4 recurring jobs");
        assert_eq!(jobs.list(None).await.unwrap().len(), 5);

        let second = jobs.generate_recurring(window).await.unwrap();
        assert_eq!(second.count, 0);
        assert!(second.jobs.is_empty());
        assert_eq!(jobs.list(None).await.unwrap().len(), 5);
    }
}
