use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::domain::TripService;
use crate::domain::repository::TripResponse;
use crate::domain::value_object::GeoPoint;
use crate::error::{FleetError, FleetResult};

/// OSRM 兼容的行程服务客户端（`/trip/v1/{profile}/{coordinates}`）
pub struct OsrmTripClient {
    client: Client,
    base_url: String,
    profile: String,
}

impl OsrmTripClient {
    pub const DEFAULT_PROFILE: &'static str = "driving";

    pub fn new(base_url: impl Into<String>, profile: Option<String>, timeout: Duration) -> FleetResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FleetError::Config(format!("failed to build http client: {}", err)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            profile: profile.unwrap_or_else(|| Self::DEFAULT_PROFILE.to_string()),
        })
    }

    /// 行程请求 URL；起点固定为首个坐标，不回到起点
    pub fn trip_url(&self, coordinates: &[GeoPoint]) -> String {
        let coordinates = coordinates
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/trip/v1/{}/{}?source=first&destination=any&roundtrip=false&geometries=geojson&overview=full&steps=false",
            self.base_url, self.profile, coordinates
        )
    }
}

#[async_trait]
impl TripService for OsrmTripClient {
    async fn plan_trip(&self, coordinates: &[GeoPoint]) -> FleetResult<TripResponse> {
        let url = self.trip_url(coordinates);
        debug!(url = %url, "Requesting trip");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| FleetError::route_failed(format!("trip service request failed: {}", err)))?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            FleetError::route_failed(format!("failed to read trip service response: {}", err))
        })?;

        // OSRM 在 4xx 时同样返回带 code 的 JSON
        match serde_json::from_str::<TripResponse>(&body) {
            Ok(trip) => Ok(trip),
            Err(_) if !status.is_success() => Err(FleetError::route_failed(format!(
                "trip service returned HTTP {}",
                status
            ))),
            Err(err) => Err(FleetError::route_failed(format!(
                "invalid trip service response: {}",
                err
            ))),
        }
    }
}
