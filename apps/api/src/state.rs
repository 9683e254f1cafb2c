use std::sync::Arc;

use crate::geocoding::Geocoder;
use crate::services::{CustomerService, JobService, RoundService};
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub customers: CustomerService,
    pub jobs: JobService,
    pub rounds: RoundService,
    /// Pluggable geocoder. `DisabledGeocoder` when no token is configured.
    pub geocoder: Arc<dyn Geocoder>,
    /// Minimum relevance for a verified address.
    pub geocode_threshold: f64,
}

impl AppState {
    pub fn new(store: Store, geocoder: Arc<dyn Geocoder>, geocode_threshold: f64) -> Self {
        Self {
            customers: CustomerService::new(store.clone()),
            jobs: JobService::new(store.clone()),
            rounds: RoundService::new(store),
            geocoder,
            geocode_threshold,
        }
    }
}
