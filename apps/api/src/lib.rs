//! Customers, scheduled jobs and rounds for a residential cleaning service,
//! served over a JSON REST API and persisted as one JSON document per
//! collection.

pub mod client;
pub mod config;
pub mod errors;
pub mod geocoding;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
