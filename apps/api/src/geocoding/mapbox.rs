use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{GeocodeError, Geocoder, PlaceCandidate};

const MAPBOX_PLACES_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places/";
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    id: String,
    place_name: String,
    #[serde(default)]
    relevance: f64,
    /// `[longitude, latitude]`
    center: [f64; 2],
}

impl From<Feature> for PlaceCandidate {
    fn from(f: Feature) -> Self {
        PlaceCandidate {
            id: f.id,
            display_name: f.place_name,
            relevance: f.relevance,
            latitude: f.center[1],
            longitude: f.center[0],
        }
    }
}

#[derive(Debug, Deserialize)]
struct MapboxError {
    message: String,
}

/// Forward geocoding via the Mapbox Places API, restricted to addresses in
/// one country. Retries transport errors, 429 and 5xx with exponential backoff.
#[derive(Clone)]
pub struct MapboxGeocoder {
    client: Client,
    token: String,
    country: String,
    base_url: Url,
}

impl MapboxGeocoder {
    pub fn new(token: String, country: String) -> Result<Self, GeocodeError> {
        let base_url = Url::parse(MAPBOX_PLACES_URL).map_err(|e| GeocodeError::Api {
            status: 0,
            message: e.to_string(),
        })?;
        Self::with_base_url(token, country, base_url)
    }

    /// Points the client at a different Places endpoint (ends with `/`).
    pub fn with_base_url(
        token: String,
        country: String,
        base_url: Url,
    ) -> Result<Self, GeocodeError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            token,
            country,
            base_url,
        })
    }

    fn request_url(&self, query: &str, limit: usize) -> Result<Url, GeocodeError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GeocodeError::Api {
                status: 0,
                message: "geocoder base URL cannot carry a path".into(),
            })?
            .pop_if_empty()
            .push(&format!("{query}.json"));
        url.query_pairs_mut()
            .append_pair("access_token", &self.token)
            .append_pair("country", &self.country)
            .append_pair("types", "address")
            .append_pair("autocomplete", "true")
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PlaceCandidate>, GeocodeError> {
        let url = self.request_url(query, limit)?;
        let mut last_error: Option<GeocodeError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 250ms, 500ms
                let delay = Duration::from_millis(250 * (1 << (attempt - 1)));
                warn!(
                    "Geocoder attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.get(url.clone()).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(GeocodeError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(GeocodeError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<MapboxError>(&body)
                    .map(|e| e.message)
                    .unwrap_or(body);
                return Err(GeocodeError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let places: PlacesResponse = response.json().await?;
            debug!("Geocoder returned {} candidates", places.features.len());
            return Ok(places.features.into_iter().map(PlaceCandidate::from).collect());
        }

        Err(last_error.unwrap_or(GeocodeError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }
}
