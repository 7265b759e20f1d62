//! Forward geocoding over HTTP.
//!
//! Requests follow the Mapbox places API shape:
//! `{base}/geocoding/v5/mapbox.places/{address}.json?access_token=..&proximity=lng,lat&bbox=..`.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::ViewerConfig;
use crate::geo::{BoundingBox, LngLat};
use crate::retry::{is_retryable_http_error, is_retryable_network_error, retry_async, RetryConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeMatch {
    pub center: LngLat,
    pub place_name: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Matches for `address`, best first. An empty list means no match.
    async fn lookup(&self, address: &str) -> Result<Vec<GeocodeMatch>>;
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder returned HTTP {0}")]
    Status(u16),
    #[error("geocoder request failed: {0}")]
    Transport(reqwest::Error),
}

/// The request URL carries the access token, so it never travels with the error.
impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        GeocodeError::Transport(e.without_url())
    }
}

impl GeocodeError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GeocodeError::Status(s) => is_retryable_http_error(*s),
            GeocodeError::Transport(e) => is_retryable_network_error(e),
        }
    }
}

#[derive(Deserialize, Debug)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<PlaceFeature>,
}

#[derive(Deserialize, Debug)]
struct PlaceFeature {
    center: [f64; 2],
    #[serde(default)]
    place_name: String,
}

pub fn parse_places(body: &str) -> Result<Vec<GeocodeMatch>> {
    let resp: PlacesResponse = serde_json::from_str(body).context("malformed geocoder response")?;
    Ok(resp
        .features
        .into_iter()
        .map(|f| GeocodeMatch {
            center: LngLat {
                lng: f.center[0],
                lat: f.center[1],
            },
            place_name: f.place_name,
        })
        .filter(|m| m.center.is_valid())
        .collect())
}

pub struct MapboxGeocoder {
    client: Client,
    base: Url,
    token: String,
    proximity: LngLat,
    bbox: BoundingBox,
    retry: RetryConfig,
}

impl MapboxGeocoder {
    pub fn new(cfg: &ViewerConfig) -> Result<Self> {
        let token = cfg
            .mapbox_token
            .clone()
            .ok_or_else(|| anyhow!("MAPBOX_TOKEN is not set"))?;
        let base = Url::parse(&cfg.geocode_base)
            .with_context(|| format!("invalid GEOCODE_BASE {}", cfg.geocode_base))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            base,
            token,
            proximity: cfg.initial_center,
            bbox: cfg.search_bbox,
            retry: RetryConfig::with_retries(cfg.geocode_retries),
        })
    }

    pub fn request_url(&self, address: &str) -> Result<Url> {
        let file = format!("{}.json", address);
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("geocode base {} cannot carry a path", self.base))?
            .pop_if_empty()
            .extend(&["geocoding", "v5", "mapbox.places", file.as_str()]);
        url.query_pairs_mut()
            .append_pair("access_token", &self.token)
            .append_pair(
                "proximity",
                &format!("{},{}", self.proximity.lng, self.proximity.lat),
            )
            .append_pair("bbox", &self.bbox.to_string());
        Ok(url)
    }

    async fn fetch(&self, url: Url) -> std::result::Result<String, GeocodeError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn lookup(&self, address: &str) -> Result<Vec<GeocodeMatch>> {
        let url = self.request_url(address)?;
        let body = retry_async(
            &self.retry,
            "geocode",
            |e| {
                e.downcast_ref::<GeocodeError>()
                    .map(GeocodeError::is_retryable)
                    .unwrap_or(false)
            },
            || {
                let url = url.clone();
                async move { self.fetch(url).await.map_err(anyhow::Error::from) }
            },
        )
        .await?;
        parse_places(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geocoder() -> MapboxGeocoder {
        let cfg = ViewerConfig {
            mapbox_token: Some("pk.test".to_string()),
            ..ViewerConfig::default()
        };
        MapboxGeocoder::new(&cfg).unwrap()
    }

    #[test]
    fn test_request_url_shape() {
        let url = geocoder().request_url("100 E Pine St, Orlando").unwrap();
        assert_eq!(url.host_str(), Some("api.mapbox.com"));
        assert_eq!(
            url.path(),
            "/geocoding/v5/mapbox.places/100%20E%20Pine%20St,%20Orlando.json"
        );
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("access_token".into(), "pk.test".into())));
        assert!(pairs.contains(&("proximity".into(), "-81.6,28.6".into())));
        assert!(pairs.contains(&("bbox".into(), "-82.5,27.5,-80.5,29.5".into())));
    }

    #[test]
    fn test_slash_in_address_stays_in_one_segment() {
        let url = geocoder().request_url("Apt 4/B").unwrap();
        assert_eq!(url.path_segments().unwrap().count(), 4);
    }

    #[test]
    fn test_requires_token() {
        assert!(MapboxGeocoder::new(&ViewerConfig::default()).is_err());
    }

    #[test]
    fn test_parse_places() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [
                {"center": [-81.3792, 28.5383], "place_name": "Orlando, Florida, United States"},
                {"center": [-81.2, 28.6], "place_name": "Oviedo, Florida"}
            ]
        }"#;
        let matches = parse_places(body).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].center, LngLat { lng: -81.3792, lat: 28.5383 });
        assert_eq!(matches[0].place_name, "Orlando, Florida, United States");

        assert!(parse_places(r#"{"features": []}"#).unwrap().is_empty());
        assert!(parse_places("not json").is_err());
    }

    #[tokio::test]
    async fn test_transport_error_hides_token() {
        let cfg = ViewerConfig {
            mapbox_token: Some("pk.SECRET123".to_string()),
            geocode_base: "http://127.0.0.1:1".to_string(),
            geocode_retries: 0,
            ..ViewerConfig::default()
        };
        let g = MapboxGeocoder::new(&cfg).unwrap();
        let err = g.lookup("Orlando").await.unwrap_err();
        assert!(err.downcast_ref::<GeocodeError>().is_some());
        let text = format!("{:#} {:?}", err, err);
        assert!(!text.contains("pk.SECRET123"), "{}", text);
        assert!(!text.contains("access_token"), "{}", text);

        match crate::search::run_search(&g, "Orlando").await {
            Some(crate::search::SearchOutcome::Failed { error, .. }) => {
                assert!(!error.contains("pk.SECRET123"), "{}", error);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_classification() {
        assert!(GeocodeError::Status(503).is_retryable());
        assert!(GeocodeError::Status(429).is_retryable());
        assert!(!GeocodeError::Status(401).is_retryable());
    }
}
