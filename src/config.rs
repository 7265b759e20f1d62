use std::time::Duration;

use crate::geo::{BoundingBox, LngLat};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::style::is_valid_color;

/// Fill layer carrying the metric choropleth.
pub const METRIC_LAYER: &str = "cbg-layer";
/// Pattern layer carrying the demographic overlay.
pub const OVERLAY_LAYER: &str = "cbg-olayer";

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub catalog_path: String,
    pub initial_center: LngLat,
    pub initial_zoom: f64,
    pub search_zoom: f64,
    pub marker_ttl_secs: u64,
    pub search_bbox: BoundingBox,
    pub geocode_base: String,
    pub mapbox_token: Option<String>,
    pub no_data_color: String,
    pub address_search: bool,
    pub hospitals: bool,
    pub geocode_retries: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            catalog_path: "data/catalog.json".to_string(),
            initial_center: LngLat { lng: -81.6, lat: 28.6 },
            initial_zoom: 9.5,
            search_zoom: 15.0,
            marker_ttl_secs: 10,
            search_bbox: BoundingBox::CENTRAL_FLORIDA,
            geocode_base: "https://api.mapbox.com".to_string(),
            mapbox_token: None,
            no_data_color: "darkgrey".to_string(),
            address_search: true,
            hospitals: true,
            geocode_retries: 2,
        }
    }
}

impl ViewerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            catalog_path: std::env::var("CATALOG_PATH").unwrap_or(d.catalog_path),
            initial_center: LngLat {
                lng: std::env::var("INITIAL_LNG").ok().and_then(|v| v.parse().ok()).unwrap_or(d.initial_center.lng),
                lat: std::env::var("INITIAL_LAT").ok().and_then(|v| v.parse().ok()).unwrap_or(d.initial_center.lat),
            },
            initial_zoom: std::env::var("INITIAL_ZOOM").ok().and_then(|v| v.parse().ok()).unwrap_or(d.initial_zoom),
            search_zoom: std::env::var("SEARCH_ZOOM").ok().and_then(|v| v.parse().ok()).unwrap_or(d.search_zoom),
            marker_ttl_secs: std::env::var("MARKER_TTL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.marker_ttl_secs),
            search_bbox: std::env::var("SEARCH_BBOX").ok().and_then(|v| v.parse().ok()).unwrap_or(d.search_bbox),
            geocode_base: std::env::var("GEOCODE_BASE").unwrap_or(d.geocode_base),
            mapbox_token: std::env::var("MAPBOX_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            no_data_color: no_data_color(std::env::var("NO_DATA_COLOR").ok(), d.no_data_color),
            address_search: std::env::var("ADDRESS_SEARCH").map(|v| flag(&v)).unwrap_or(d.address_search),
            hospitals: std::env::var("HOSPITALS").map(|v| flag(&v)).unwrap_or(d.hospitals),
            geocode_retries: std::env::var("GEOCODE_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(d.geocode_retries),
        }
    }

    pub fn marker_ttl(&self) -> Duration {
        Duration::from_secs(self.marker_ttl_secs)
    }

    /// Search needs both the feature switch and a token.
    pub fn search_enabled(&self) -> bool {
        self.address_search && self.mapbox_token.is_some()
    }
}

/// A bad color falls back to `default`, the same way catalog colors are checked.
fn no_data_color(raw: Option<String>, default: String) -> String {
    match raw {
        Some(c) if is_valid_color(c.trim()) => c.trim().to_string(),
        Some(c) => {
            log(
                Level::Warn,
                Domain::System,
                "config_rejected",
                obj(&[
                    ("key", v_str("NO_DATA_COLOR")),
                    ("value", v_str(&c)),
                    ("msg", v_str("not a valid color, using default")),
                ]),
            );
            default
        }
        None => default,
    }
}

fn flag(v: &str) -> bool {
    matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_center_on_central_florida() {
        let cfg = ViewerConfig::default();
        assert_eq!(cfg.initial_center, LngLat { lng: -81.6, lat: 28.6 });
        assert_eq!(cfg.initial_zoom, 9.5);
        assert_eq!(cfg.marker_ttl(), Duration::from_secs(10));
        assert_eq!(cfg.search_bbox, BoundingBox::CENTRAL_FLORIDA);
    }

    #[test]
    fn test_search_requires_token() {
        let mut cfg = ViewerConfig::default();
        assert!(!cfg.search_enabled());
        cfg.mapbox_token = Some("pk.test".to_string());
        assert!(cfg.search_enabled());
        cfg.address_search = false;
        assert!(!cfg.search_enabled());
    }

    #[test]
    fn test_no_data_color_validated() {
        let d = || "darkgrey".to_string();
        assert_eq!(no_data_color(None, d()), "darkgrey");
        assert_eq!(no_data_color(Some("#999999".into()), d()), "#999999");
        assert_eq!(no_data_color(Some(" lightgray ".into()), d()), "lightgray");
        assert_eq!(no_data_color(Some("rgb(1,2,3)".into()), d()), "darkgrey");
        assert_eq!(no_data_color(Some("#12345".into()), d()), "darkgrey");
        assert_eq!(no_data_color(Some("".into()), d()), "darkgrey");
    }

    #[test]
    fn test_flag_parsing() {
        assert!(flag("1"));
        assert!(flag("TRUE"));
        assert!(flag(" on "));
        assert!(!flag("0"));
        assert!(!flag("nope"));
    }
}
