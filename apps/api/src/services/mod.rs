//! Resource services: CRUD over one collection each.
//!
//! Every operation reloads the whole collection from the `Store`; mutations
//! hold the collection's write guard from load to save, so concurrent
//! requests cannot lose each other's updates.

use std::marker::PhantomData;

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Customer, Job, Round};
use crate::store::{Collection, Store};

pub mod customers;
pub mod jobs;
pub mod recurrence;
pub mod rounds;

pub use customers::CustomerService;
pub use jobs::{JobFilter, JobService};
pub use recurrence::{expand_recurring, GenerateOutcome, RecurrenceWindow};
pub use rounds::RoundService;

/// A record type persisted as one collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;
    /// Human-readable entity name used in messages, e.g. "Customer".
    const ENTITY: &'static str;

    fn id(&self) -> &str;
    fn updated_at(&self) -> DateTime<Utc>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);
}

macro_rules! impl_record {
    ($ty:ty, $collection:expr, $entity:literal) => {
        impl Record for $ty {
            const COLLECTION: Collection = $collection;
            const ENTITY: &'static str = $entity;

            fn id(&self) -> &str {
                &self.id
            }

            fn updated_at(&self) -> DateTime<Utc> {
                self.updated_at
            }

            fn set_updated_at(&mut self, at: DateTime<Utc>) {
                self.updated_at = at;
            }
        }
    };
}

impl_record!(Customer, Collection::Customers, "Customer");
impl_record!(Job, Collection::Jobs, "Job");
impl_record!(Round, Collection::Rounds, "Round");

/// Fresh unique record identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A modification timestamp strictly later than `previous`.
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Generic CRUD over the collection of `R`.
pub struct Resource<R> {
    store: Store,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Resource<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Resource<R> {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn list(&self) -> Result<Vec<R>, AppError> {
        Ok(self.store.load(R::COLLECTION).await?)
    }

    pub async fn get(&self, id: &str) -> Result<R, AppError> {
        self.list()
            .await?
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| AppError::not_found(R::ENTITY))
    }

    /// Appends a new record built from a fresh id and creation time.
    pub async fn insert<F>(&self, build: F) -> Result<R, AppError>
    where
        F: FnOnce(String, DateTime<Utc>) -> R,
    {
        let _guard = self.store.lock(R::COLLECTION).await;
        let mut records: Vec<R> = self.store.load(R::COLLECTION).await?;
        let record = build(new_id(), Utc::now());
        records.push(record.clone());
        self.store.save(R::COLLECTION, &records).await?;

        info!("Created {} {}", R::ENTITY.to_lowercase(), record.id());
        Ok(record)
    }

    /// Applies `change` to the record with `id` and refreshes its `updatedAt`.
    /// Nothing is saved if `change` fails.
    pub async fn modify<F>(&self, id: &str, change: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut R) -> Result<(), AppError>,
    {
        let _guard = self.store.lock(R::COLLECTION).await;
        let mut records: Vec<R> = self.store.load(R::COLLECTION).await?;
        let record = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| AppError::not_found(R::ENTITY))?;

        change(record)?;
        record.set_updated_at(next_timestamp(record.updated_at()));
        let updated = record.clone();

        self.store.save(R::COLLECTION, &records).await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let _guard = self.store.lock(R::COLLECTION).await;
        let mut records: Vec<R> = self.store.load(R::COLLECTION).await?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Err(AppError::not_found(R::ENTITY));
        }
        self.store.save(R::COLLECTION, &records).await?;

        info!("Deleted {} {id}", R::ENTITY.to_lowercase());
        Ok(())
    }
}
