//! Static viewer catalog: metric descriptors, overlay descriptors and
//! hospital sites. Loaded once at startup, validated, immutable afterwards.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::geo::LngLat;
use crate::logging::{log_catalog_loaded, v_str, ProfileScope};
use crate::popup::{PopupLine, PopupTemplates};
use crate::style::is_valid_color;

/// Overlay id meaning "no overlay".
pub const SENTINEL_OVERLAY_ID: u32 = 1;

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Parse(String),
    #[error("catalog has no metrics")]
    NoMetrics,
    #[error("duplicate metric id {0}")]
    DuplicateMetricId(u32),
    #[error("metric {metric_id}: `{field}` must not be empty")]
    EmptyField { metric_id: u32, field: &'static str },
    #[error("metric {metric_id}: breakpoint t{index} is not finite")]
    NonFiniteBreakpoint { metric_id: u32, index: usize },
    #[error("metric {metric_id}: breakpoints must increase strictly (t{index} = {prev} >= t{next_index} = {next})")]
    BreakpointsNotIncreasing {
        metric_id: u32,
        index: usize,
        next_index: usize,
        prev: f64,
        next: f64,
    },
    #[error("metric {metric_id}: invalid color {color:?}")]
    InvalidColor { metric_id: u32, color: String },
    #[error("metric {0}: popup template must have 1 to 5 lines")]
    BadPopupTemplate(u32),
    #[error("duplicate overlay id {0}")]
    DuplicateOverlayId(u32),
    #[error("overlay list lacks the \"no overlay\" entry (id 1)")]
    MissingSentinel,
    #[error("the \"no overlay\" entry must not name a property")]
    SentinelWithProperty,
    #[error("overlay {0} has no flag property")]
    OverlayWithoutProperty(u32),
    #[error("hospital {0:?} has invalid coordinates")]
    InvalidHospital(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDescriptor {
    pub id: u32,
    pub field: String,
    pub title: String,
    pub description: String,
    pub labels: [String; 5],
    pub breakpoints: [f64; 5],
    pub colors: [String; 5],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup: Option<Vec<PopupLine>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayDescriptor {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

impl OverlayDescriptor {
    pub fn is_sentinel(&self) -> bool {
        self.id == SENTINEL_OVERLAY_ID
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalSite {
    pub name: String,
    pub coordinates: LngLat,
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
}

/// One metric entry as it appears in the asset. Accepts both the lowercase
/// keys and the capitalized `Metric`/`Field`/`Description` spelling.
#[derive(Debug, Deserialize)]
struct RawMetric {
    #[serde(default)]
    id: Option<u32>,
    #[serde(alias = "Field")]
    field: String,
    #[serde(alias = "Metric")]
    title: String,
    #[serde(default, alias = "Description")]
    description: String,
    #[serde(default)]
    l1: String,
    #[serde(default)]
    l2: String,
    #[serde(default)]
    l3: String,
    #[serde(default)]
    l4: String,
    #[serde(default)]
    l5: String,
    t1: f64,
    t2: f64,
    t3: f64,
    t4: f64,
    t5: f64,
    c1: String,
    c2: String,
    c3: String,
    c4: String,
    c5: String,
    #[serde(default)]
    popup: Option<Vec<PopupLine>>,
}

impl RawMetric {
    fn into_descriptor(self, position: usize) -> MetricDescriptor {
        MetricDescriptor {
            id: self.id.unwrap_or(position as u32),
            field: self.field,
            title: self.title,
            description: self.description,
            labels: [self.l1, self.l2, self.l3, self.l4, self.l5],
            breakpoints: [self.t1, self.t2, self.t3, self.t4, self.t5],
            colors: [self.c1, self.c2, self.c3, self.c4, self.c5],
            popup: self.popup,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Full {
        metrics: Vec<RawMetric>,
        #[serde(default)]
        overlays: Option<Vec<OverlayDescriptor>>,
        #[serde(default)]
        hospitals: Vec<HospitalSite>,
    },
    MetricsOnly(Vec<RawMetric>),
}

#[derive(Debug, Clone)]
pub struct Catalog {
    metrics: Vec<MetricDescriptor>,
    overlays: Vec<OverlayDescriptor>,
    hospitals: Vec<HospitalSite>,
    popups: PopupTemplates,
}

impl Catalog {
    /// Validate and assemble a catalog. Every configuration error surfaces here.
    pub fn new(
        metrics: Vec<MetricDescriptor>,
        overlays: Vec<OverlayDescriptor>,
        hospitals: Vec<HospitalSite>,
    ) -> Result<Self, CatalogError> {
        if metrics.is_empty() {
            return Err(CatalogError::NoMetrics);
        }
        let mut seen = HashSet::new();
        for m in &metrics {
            if !seen.insert(m.id) {
                return Err(CatalogError::DuplicateMetricId(m.id));
            }
            validate_metric(m)?;
        }
        validate_overlays(&overlays)?;
        for h in &hospitals {
            if h.name.trim().is_empty() || !h.coordinates.is_valid() {
                return Err(CatalogError::InvalidHospital(h.name.clone()));
            }
        }

        let mut popups = PopupTemplates::standard();
        for m in &metrics {
            if let Some(lines) = &m.popup {
                popups.insert(m.id, lines.clone());
            }
        }

        Ok(Self {
            metrics,
            overlays,
            hospitals,
            popups,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
        let (raw, overlays, hospitals) = match file {
            CatalogFile::Full {
                metrics,
                overlays,
                hospitals,
            } => (metrics, overlays.unwrap_or_else(default_overlays), hospitals),
            CatalogFile::MetricsOnly(metrics) => (metrics, default_overlays(), Vec::new()),
        };
        let metrics = raw
            .into_iter()
            .enumerate()
            .map(|(i, m)| m.into_descriptor(i))
            .collect();
        Self::new(metrics, overlays, hospitals)
    }

    /// Read, fingerprint and validate a catalog asset.
    pub fn load(path: &Path) -> Result<Self> {
        let _scope = ProfileScope::with_context("catalog_load", &[("path", v_str(&path.to_string_lossy()))]);
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let catalog = Self::from_json(&text)
            .with_context(|| format!("invalid catalog {}", path.display()))?;
        log_catalog_loaded(
            &path.to_string_lossy(),
            &sha256_hex(text.as_bytes()),
            catalog.metrics.len(),
            catalog.overlays.len(),
            catalog.hospitals.len(),
        );
        Ok(catalog)
    }

    pub fn metrics(&self) -> &[MetricDescriptor] {
        &self.metrics
    }

    pub fn overlays(&self) -> &[OverlayDescriptor] {
        &self.overlays
    }

    pub fn hospitals(&self) -> &[HospitalSite] {
        &self.hospitals
    }

    pub fn popups(&self) -> &PopupTemplates {
        &self.popups
    }

    pub fn metric(&self, id: u32) -> Option<&MetricDescriptor> {
        self.metrics.iter().find(|m| m.id == id)
    }

    pub fn overlay(&self, id: u32) -> Option<&OverlayDescriptor> {
        self.overlays.iter().find(|o| o.id == id)
    }

    /// The metric shown before any selection.
    pub fn initial_metric(&self) -> &MetricDescriptor {
        &self.metrics[0]
    }
}

fn validate_metric(m: &MetricDescriptor) -> Result<(), CatalogError> {
    if m.field.trim().is_empty() {
        return Err(CatalogError::EmptyField { metric_id: m.id, field: "field" });
    }
    if m.title.trim().is_empty() {
        return Err(CatalogError::EmptyField { metric_id: m.id, field: "title" });
    }
    for (i, t) in m.breakpoints.iter().enumerate() {
        if !t.is_finite() {
            return Err(CatalogError::NonFiniteBreakpoint { metric_id: m.id, index: i + 1 });
        }
    }
    for (i, pair) in m.breakpoints.windows(2).enumerate() {
        if pair[0] >= pair[1] {
            return Err(CatalogError::BreakpointsNotIncreasing {
                metric_id: m.id,
                index: i + 1,
                next_index: i + 2,
                prev: pair[0],
                next: pair[1],
            });
        }
    }
    if let Some(bad) = m.colors.iter().find(|c| !is_valid_color(c)) {
        return Err(CatalogError::InvalidColor { metric_id: m.id, color: bad.clone() });
    }
    if let Some(lines) = &m.popup {
        if lines.is_empty() || lines.len() > 5 {
            return Err(CatalogError::BadPopupTemplate(m.id));
        }
    }
    Ok(())
}

fn validate_overlays(overlays: &[OverlayDescriptor]) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for o in overlays {
        if !seen.insert(o.id) {
            return Err(CatalogError::DuplicateOverlayId(o.id));
        }
        let has_property = o.property.as_deref().map(|p| !p.trim().is_empty()).unwrap_or(false);
        if o.is_sentinel() && has_property {
            return Err(CatalogError::SentinelWithProperty);
        }
        if !o.is_sentinel() && !has_property {
            return Err(CatalogError::OverlayWithoutProperty(o.id));
        }
    }
    if !seen.contains(&SENTINEL_OVERLAY_ID) {
        return Err(CatalogError::MissingSentinel);
    }
    Ok(())
}

/// Overlay set used when the asset does not list its own.
pub fn default_overlays() -> Vec<OverlayDescriptor> {
    let entry = |id: u32, name: &str, property: Option<&str>| OverlayDescriptor {
        id,
        name: name.to_string(),
        property: property.map(str::to_string),
    };
    vec![
        entry(SENTINEL_OVERLAY_ID, "No Overlay", None),
        entry(2, "Poverty: 20%+ of households below the federal poverty level", Some("PovFlag")),
        entry(4, "Seniors: 20%+ of population is 65 or older", Some("SenFlag")),
        entry(5, "Youth:  25% of population aged 18 or younger", Some("ChildFlag")),
        entry(6, "Walkability: score is 14+ out of 20 (high)", Some("WalkFlag")),
    ]
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
