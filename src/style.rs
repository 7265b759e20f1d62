//! Metric style resolution: descriptor -> piecewise-constant color ramp.
//!
//! Bands are left-open, right-closed: `[0, t1] -> c1`, `(t1, t2] -> c2`, ...
//! `(t4, t5] -> c5`. Values above `t5` clamp to `c5`, values below zero clamp
//! to `c1`, and missing or non-numeric values get the no-data color. Only
//! JSON numbers are colored by band; a numeric string is no data here, the
//! same as in the renderer expression.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::MetricDescriptor;

pub const NO_POPULATION_LABEL: &str = "No residential population";

/// Policy knobs that are not part of a metric descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct StylePolicy {
    pub no_data_color: String,
}

impl Default for StylePolicy {
    fn default() -> Self {
        Self {
            no_data_color: "darkgrey".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    /// Inclusive upper bound of the band.
    pub upper: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRamp {
    pub field: String,
    pub stops: Vec<ColorStop>,
    pub no_data_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

/// Build the ramp for a metric. Pure: same descriptor and policy, same ramp.
pub fn resolve_ramp(metric: &MetricDescriptor, policy: &StylePolicy) -> ColorRamp {
    let stops = metric
        .breakpoints
        .iter()
        .zip(metric.colors.iter())
        .map(|(upper, color)| ColorStop {
            upper: *upper,
            color: color.clone(),
        })
        .collect();
    ColorRamp {
        field: metric.field.clone(),
        stops,
        no_data_color: policy.no_data_color.clone(),
    }
}

impl ColorRamp {
    /// Color for an attribute value. `None` and NaN are "no data".
    pub fn color_for(&self, value: Option<f64>) -> &str {
        let v = match value {
            Some(v) if !v.is_nan() => v,
            _ => return &self.no_data_color,
        };
        for stop in &self.stops {
            if v <= stop.upper {
                return &stop.color;
            }
        }
        match self.stops.last() {
            Some(top) => &top.color,
            None => &self.no_data_color,
        }
    }

    /// Color for a raw feature attribute. Anything but a JSON number is no data.
    pub fn color_for_value(&self, value: Option<&Value>) -> &str {
        self.color_for(value.and_then(Value::as_f64))
    }

    /// Declarative `case` expression with the same band semantics, for
    /// renderers that evaluate style expressions themselves.
    pub fn to_expression(&self) -> Value {
        let get = json!(["get", self.field]);
        let mut bands = vec![json!("case")];
        bands.push(json!(["!", ["has", self.field]]));
        bands.push(json!(self.no_data_color));
        bands.push(json!(["!=", ["typeof", ["get", self.field]], "number"]));
        bands.push(json!(self.no_data_color));
        for stop in self.stops.iter().take(self.stops.len().saturating_sub(1)) {
            bands.push(json!(["<=", get.clone(), stop.upper]));
            bands.push(json!(stop.color));
        }
        match self.stops.last() {
            Some(top) => bands.push(json!(top.color)),
            None => bands.push(json!(self.no_data_color)),
        }
        Value::Array(bands)
    }
}

/// Legend rows for a metric: five bands plus the no-population swatch.
pub fn legend(metric: &MetricDescriptor, policy: &StylePolicy) -> Vec<LegendEntry> {
    let mut rows: Vec<LegendEntry> = metric
        .labels
        .iter()
        .zip(metric.colors.iter())
        .map(|(label, color)| LegendEntry {
            label: label.clone(),
            color: color.clone(),
        })
        .collect();
    rows.push(LegendEntry {
        label: NO_POPULATION_LABEL.to_string(),
        color: policy.no_data_color.clone(),
    });
    rows
}

/// `#rgb`, `#rrggbb`, or an alphabetic CSS color name.
pub fn is_valid_color(color: &str) -> bool {
    if let Some(hex) = color.strip_prefix('#') {
        (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else {
        !color.is_empty() && color.chars().all(|c| c.is_ascii_alphabetic())
    }
}
