//! Popup content for a clicked region.
//!
//! Every metric id maps to one fixed template of labelled lines, followed by a
//! constant demographic footer. Missing or non-numeric attributes render as
//! [`MISSING`] instead of failing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};


/// Placeholder for attributes that are absent or not numeric.
pub const MISSING: &str = "N/A";
pub const NO_DETAILS: &str = "No specific details available for this metric.";

/// Attribute map attached to one rendered region.
pub type FeatureRecord = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    /// Stored as a fraction, shown as `value*100` with a `%`.
    Percent,
    /// `$value`
    Currency,
    /// `value Minutes`
    Minutes,
    /// Raw value.
    Score,
}

impl FieldFormat {
    pub fn render(&self, value: Option<f64>) -> String {
        let v = match value {
            Some(v) => v,
            None => return MISSING.to_string(),
        };
        match self {
            FieldFormat::Percent => format!("{:.1}%", v * 100.0),
            FieldFormat::Currency => format!("${:.1}", v),
            FieldFormat::Minutes => format!("{:.1} Minutes", v),
            FieldFormat::Score => format!("{:.1}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupLine {
    pub label: String,
    pub attribute: String,
    pub format: FieldFormat,
}

impl PopupLine {
    fn new(label: &str, attribute: &str, format: FieldFormat) -> Self {
        Self {
            label: label.to_string(),
            attribute: attribute.to_string(),
            format,
        }
    }

    pub fn render(&self, feature: &FeatureRecord) -> String {
        let value = feature.get(&self.attribute).and_then(numeric);
        format!("{}: {}", self.label, self.format.render(value))
    }
}

/// Templates keyed by metric id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopupTemplates {
    by_metric: BTreeMap<u32, Vec<PopupLine>>,
}

impl PopupTemplates {
    /// The per-metric table shipped with the viewer.
    pub fn standard() -> Self {
        use FieldFormat::*;
        let mut t = Self::default();
        t.insert(0, vec![
            PopupLine::new("Smokers", "A_Smokers", Percent),
            PopupLine::new("Binge Drinkers", "A_BingeDrink", Percent),
            PopupLine::new("No Physical Activity", "A_NoPhysAct", Percent),
        ]);
        t.insert(1, vec![
            PopupLine::new("Cancer", "A_Cancer", Percent),
            PopupLine::new("Heart Disease", "A_CHD", Percent),
            PopupLine::new("Diabetes", "A_DIA", Percent),
            PopupLine::new("Obesity", "A_BMI30", Percent),
            PopupLine::new("Asthma", "A_Asthma", Percent),
        ]);
        t.insert(2, vec![
            PopupLine::new("Depression", "A_Depression", Percent),
            PopupLine::new("Distress", "A_Distress", Percent),
        ]);
        t.insert(3, vec![
            PopupLine::new("Social Isolation", "A_SocIso", Percent),
            PopupLine::new("Adults Living Alone", "P_AdultAlone", Percent),
            PopupLine::new("Seniors Living Alone", "P_SeniorAlone", Percent),
        ]);
        t.insert(4, vec![PopupLine::new("Walkability Score (out of 20)", "NWI", Score)]);
        t.insert(5, vec![PopupLine::new("Travel Time by Car to Acute Care", "HospitalTT", Minutes)]);
        t.insert(6, vec![PopupLine::new("Travel Time by Car to Trauma Center", "TraumaTT", Minutes)]);
        t.insert(7, vec![PopupLine::new("Estimated Adult BMI > 30", "A_NPHAM_Obese", Percent)]);
        t.insert(8, vec![PopupLine::new("Estimated Type 2 Diabetes", "A_NPHAM_T2DIA", Percent)]);
        t.insert(9, vec![PopupLine::new("Estimated Heart Disease", "A_NPHAM_CHD", Percent)]);
        t.insert(10, vec![PopupLine::new("Average Cost of Illness", "A_NPHAM_MeanCOI", Currency)]);
        t
    }

    /// Replaces any existing template for `metric_id`.
    pub fn insert(&mut self, metric_id: u32, lines: Vec<PopupLine>) {
        self.by_metric.insert(metric_id, lines);
    }

    pub fn get(&self, metric_id: u32) -> Option<&[PopupLine]> {
        self.by_metric.get(&metric_id).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupContent {
    pub title: String,
    pub lines: Vec<String>,
    pub footer: Vec<String>,
}

impl PopupContent {
    pub fn to_text(&self) -> String {
        let mut out = vec![self.title.clone()];
        out.extend(self.lines.iter().cloned());
        out.push("---".to_string());
        out.extend(self.footer.iter().cloned());
        out.join("\n")
    }

    pub fn to_html(&self) -> String {
        let mut html = format!("<h3>{}</h3>", escape_html(&self.title));
        for line in &self.lines {
            html.push_str(&format!("<p>{}</p>", escape_html(line)));
        }
        html.push_str("<hr>");
        for line in &self.footer {
            html.push_str(&format!("<p>{}</p>", escape_html(line)));
        }
        html
    }
}

pub fn resolve_popup(
    templates: &PopupTemplates,
    metric_id: u32,
    title: &str,
    feature: &FeatureRecord,
) -> PopupContent {
    let lines = match templates.get(metric_id) {
        Some(template) => template.iter().map(|line| line.render(feature)).collect(),
        None => vec![NO_DETAILS.to_string()],
    };
    PopupContent {
        title: title.to_string(),
        lines,
        footer: footer(feature),
    }
}

fn footer(feature: &FeatureRecord) -> Vec<String> {
    vec![
        format!("Population: {}", count(feature, &["Population", "TotalPop"])),
        format!("Households: {}", count(feature, &["Households", "TotalHH"])),
    ]
}

/// First present spelling wins. Integral values print without decimals.
fn count(feature: &FeatureRecord, keys: &[&str]) -> String {
    let value = keys.iter().find_map(|k| feature.get(*k).and_then(numeric));
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => format!("{}", v),
        None => MISSING.to_string(),
    }
}

/// Numbers pass through; strings are parsed; everything else is missing.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
