//! Address autocomplete and verification against an external geocoder.
//!
//! Provider failures never surface to callers of `suggest` or `verify`: they
//! degrade to "no suggestions" and "not verified" respectively.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub mod mapbox;

pub use mapbox::MapboxGeocoder;

pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;
pub const MAX_SUGGESTION_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geocoder returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Geocoder gave up after {retries} attempts")]
    Exhausted { retries: u32 },
}

/// One ranked match for a free-text query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceCandidate {
    pub id: String,
    pub display_name: String,
    /// 0.0 – 1.0
    pub relevance: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Outcome of checking a full address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedAddress {
    pub verified: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl VerifiedAddress {
    fn unverified(message: impl Into<String>) -> Self {
        Self {
            verified: false,
            message: message.into(),
            address: None,
            latitude: None,
            longitude: None,
        }
    }
}

/// A geocoding provider. Candidates come back best first.
///
/// Carried in `AppState` as `Arc<dyn Geocoder>`.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PlaceCandidate>, GeocodeError>;
}

/// Used when no provider token is configured.
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn search(
        &self,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<PlaceCandidate>, GeocodeError> {
        Err(GeocodeError::NotConfigured)
    }
}

/// Matches a UK outward code such as `BN1`, `W1A` or `SW19`.
pub fn is_partial_postcode(text: &str) -> bool {
    let bytes = text.as_bytes();
    let letters = bytes
        .iter()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    if !(1..=2).contains(&letters) {
        return false;
    }
    let rest = &bytes[letters..];
    match rest {
        [d] => d.is_ascii_digit(),
        [d, x] => d.is_ascii_digit() && x.is_ascii_alphanumeric(),
        _ => false,
    }
}

/// Autocomplete suggestions for a partially typed address.
///
/// Very short queries are answered locally with no suggestions unless they
/// look like the start of a postcode.
pub async fn suggest(geocoder: &dyn Geocoder, query: &str, limit: usize) -> Vec<PlaceCandidate> {
    let query = query.trim();
    if query.chars().count() < 2 && !is_partial_postcode(query) {
        return Vec::new();
    }
    let limit = limit.clamp(1, MAX_SUGGESTION_LIMIT);

    match geocoder.search(query, limit).await {
        Ok(mut candidates) => {
            candidates.truncate(limit);
            candidates
        }
        Err(e) => {
            warn!("Address suggestions unavailable: {e}");
            Vec::new()
        }
    }
}

/// Verifies a full address: the best candidate must reach `threshold`.
pub async fn verify(geocoder: &dyn Geocoder, address: &str, threshold: f64) -> VerifiedAddress {
    let address = address.trim();
    if address.is_empty() {
        return VerifiedAddress::unverified("An address is required");
    }

    let candidates = match geocoder.search(address, 1).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!("Address verification degraded to unverified: {e}");
            return VerifiedAddress::unverified(
                "Unable to verify this address right now. Please try again later.",
            );
        }
    };

    let best = candidates
        .into_iter()
        .max_by(|a, b| a.relevance.total_cmp(&b.relevance));

    match best {
        None => VerifiedAddress::unverified("No matching address found"),
        Some(best) if best.relevance < threshold => VerifiedAddress::unverified(format!(
            "Address match confidence {:.2} is below {:.2}. Please check and try again.",
            best.relevance, threshold
        )),
        Some(best) => VerifiedAddress {
            verified: true,
            message: "Address verified".to_string(),
            address: Some(best.display_name),
            latitude: Some(best.latitude),
            longitude: Some(best.longitude),
        },
    }
}
