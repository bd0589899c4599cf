//! Outbound routing lookups with a transparent read-through cache.

pub mod error;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::cache::DirectionsCache;

pub use error::DirectionsError;

const DIRECTIONS_BASE_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Distance and duration of the first leg of a routed trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_meters: i64,
    pub duration_seconds: i64,
}

/// The routing capability the scheduler consumes. `None` means the provider
/// answered but found no route.
#[async_trait]
pub trait Directions: Send + Sync {
    async fn get_direction(
        &self,
        from: &str,
        to: &str,
        departure_at: DateTime<Utc>,
    ) -> Result<Option<RouteSummary>, DirectionsError>;
}

/// HTTP client for the Google Directions API.
pub struct GoogleDirectionsClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl GoogleDirectionsClient {
    pub fn new(api_token: String) -> Result<Self, DirectionsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: DIRECTIONS_BASE_URL.to_string(),
            api_token,
        })
    }

    pub async fn route(
        &self,
        from: &str,
        to: &str,
        departure_at: DateTime<Utc>,
    ) -> Result<Option<RouteSummary>, DirectionsError> {
        let mut url = format!(
            "{}?origin={}&destination={}&key={}",
            self.base_url,
            urlencoding::encode(from),
            urlencoding::encode(to),
            urlencoding::encode(&self.api_token)
        );
        // The provider rejects departure times in the past, so the
        // parameter is only sent for future departures.
        if let Some(departure_time) = departure_time_param(departure_at, Utc::now()) {
            url.push_str(&format!("&departure_time={departure_time}"));
        }

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(DirectionsError::Unavailable {
                status: response.status().to_string(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: DirectionsResponse = response.json().await?;
        extract_route(body)
    }
}

/// Unix seconds for the `departure_time` query parameter, rounded up to the
/// next whole second; `None` when the departure is not in the future.
fn departure_time_param(departure_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<i64> {
    if departure_at <= now {
        return None;
    }
    let mut secs = departure_at.timestamp();
    if departure_at.timestamp_subsec_nanos() > 0 {
        secs += 1;
    }
    Some(secs)
}

fn extract_route(body: DirectionsResponse) -> Result<Option<RouteSummary>, DirectionsError> {
    if body.status != "OK" {
        return Err(DirectionsError::Unavailable {
            status: body.status,
            message: body.error_message.unwrap_or_default(),
        });
    }
    let Some(leg) = body.routes.first().and_then(|route| route.legs.first()) else {
        return Ok(None);
    };
    Ok(Some(RouteSummary {
        distance_meters: leg.distance.value,
        duration_seconds: leg.duration.value,
    }))
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<Route>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    distance: ValueField,
    duration: ValueField,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: i64,
}

/// Read-through wrapper: cache first, provider on miss, best-effort write
/// back. The cache key is the address pair; departure time is deliberately
/// not part of it.
pub struct DirectionsService {
    client: GoogleDirectionsClient,
    cache: Option<Arc<dyn DirectionsCache>>,
}

impl DirectionsService {
    pub fn new(client: GoogleDirectionsClient, cache: Option<Arc<dyn DirectionsCache>>) -> Self {
        Self { client, cache }
    }

    fn cache_key(from: &str, to: &str) -> String {
        format!("{from}|{to}")
    }
}

#[async_trait]
impl Directions for DirectionsService {
    async fn get_direction(
        &self,
        from: &str,
        to: &str,
        departure_at: DateTime<Utc>,
    ) -> Result<Option<RouteSummary>, DirectionsError> {
        let key = Self::cache_key(from, to);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                tracing::debug!(key, "Directions cache hit");
                return Ok(Some(hit));
            }
        }

        let summary = self.client.route(from, to, departure_at).await?;
        if let (Some(cache), Some(summary)) = (&self.cache, &summary) {
            cache.put(&key, summary).await;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use std::num::NonZeroUsize;

    #[test]
    fn departure_time_omitted_when_not_in_future() {
        let now = Utc::now();
        assert_eq!(departure_time_param(now, now), None);
        assert_eq!(
            departure_time_param(now - chrono::Duration::minutes(5), now),
            None
        );
    }

    #[test]
    fn departure_time_rounds_up() {
        let now = DateTime::parse_from_rfc3339("2025-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let departure = DateTime::parse_from_rfc3339("2025-01-15T14:00:00.250Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            departure_time_param(departure, now),
            Some(departure.timestamp() + 1)
        );

        let whole = DateTime::parse_from_rfc3339("2025-01-15T14:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(departure_time_param(whole, now), Some(whole.timestamp()));
    }

    #[test]
    fn extract_route_reads_first_leg() {
        let body: DirectionsResponse = serde_json::from_value(serde_json::json!({
            "status": "OK",
            "routes": [
                {"legs": [
                    {"distance": {"value": 10000}, "duration": {"value": 900}},
                    {"distance": {"value": 1}, "duration": {"value": 1}}
                ]},
                {"legs": [{"distance": {"value": 2}, "duration": {"value": 2}}]}
            ]
        }))
        .unwrap();
        let summary = extract_route(body).unwrap().unwrap();
        assert_eq!(summary.distance_meters, 10_000);
        assert_eq!(summary.duration_seconds, 900);
    }

    #[test]
    fn extract_route_empty_routes_is_none() {
        let body: DirectionsResponse =
            serde_json::from_value(serde_json::json!({"status": "OK", "routes": []})).unwrap();
        assert!(extract_route(body).unwrap().is_none());

        let body: DirectionsResponse = serde_json::from_value(
            serde_json::json!({"status": "OK", "routes": [{"legs": []}]}),
        )
        .unwrap();
        assert!(extract_route(body).unwrap().is_none());
    }

    #[test]
    fn extract_route_surfaces_provider_errors() {
        let body: DirectionsResponse = serde_json::from_value(serde_json::json!({
            "status": "OVER_QUERY_LIMIT",
            "error_message": "quota exceeded"
        }))
        .unwrap();
        let err = extract_route(body).unwrap_err();
        assert!(err.to_string().contains("OVER_QUERY_LIMIT"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn cache_hit_skips_the_provider() {
        let cache = Arc::new(MemoryCache::new(
            NonZeroUsize::new(4).unwrap(),
            Duration::ZERO,
        ));
        let summary = RouteSummary {
            distance_meters: 5000,
            duration_seconds: 600,
        };
        cache.put("A|B", summary.clone()).await;

        // Unroutable base URL: any miss would fail, so a success proves the
        // hit came from the cache.
        let mut client = GoogleDirectionsClient::new(String::new()).unwrap();
        client.base_url = "http://127.0.0.1:9/directions".to_string();
        let service = DirectionsService::new(client, Some(cache));

        let result = service
            .get_direction("A", "B", Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, summary);
    }
}
