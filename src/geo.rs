use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Geographic position, serialized as `[lng, lat]` like the renderer expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

impl From<[f64; 2]> for LngLat {
    fn from(pair: [f64; 2]) -> Self {
        Self { lng: pair[0], lat: pair[1] }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(p: LngLat) -> Self {
        [p.lng, p.lat]
    }
}

/// West, south, east, north.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub const CENTRAL_FLORIDA: BoundingBox = BoundingBox {
        min_lng: -82.5,
        min_lat: 27.5,
        max_lng: -80.5,
        max_lat: 29.5,
    };

    pub fn contains(&self, p: LngLat) -> bool {
        p.lng >= self.min_lng && p.lng <= self.max_lng && p.lat >= self.min_lat && p.lat <= self.max_lat
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.min_lng, self.min_lat, self.max_lng, self.max_lat)
    }
}

impl FromStr for BoundingBox {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>().map_err(|e| format!("bad bbox component {:?}: {}", p, e)))
            .collect::<Result<_, _>>()?;
        if parts.len() != 4 {
            return Err(format!("bbox needs 4 components, got {}", parts.len()));
        }
        let bbox = BoundingBox {
            min_lng: parts[0],
            min_lat: parts[1],
            max_lng: parts[2],
            max_lat: parts[3],
        };
        if bbox.min_lng >= bbox.max_lng || bbox.min_lat >= bbox.max_lat {
            return Err(format!("degenerate bbox {}", bbox));
        }
        Ok(bbox)
    }
}
