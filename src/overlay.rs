//! Overlay filter resolution.
//!
//! The filter always compares the overlay's flag property against
//! [`FLAG_SET`]. The overlay's own id is never the comparison value.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::OverlayDescriptor;

/// Value a flag attribute carries when the demographic condition holds.
pub const FLAG_SET: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagFilter {
    pub property: String,
    pub equals: i64,
}

impl FlagFilter {
    pub fn flag_set(property: &str) -> Self {
        Self {
            property: property.to_string(),
            equals: FLAG_SET,
        }
    }

    pub fn matches(&self, feature: &serde_json::Map<String, Value>) -> bool {
        match feature.get(&self.property) {
            Some(Value::Number(n)) => n.as_f64() == Some(self.equals as f64),
            Some(Value::Bool(b)) => *b == (self.equals == FLAG_SET),
            _ => false,
        }
    }

    pub fn to_expression(&self) -> Value {
        json!(["==", self.property, self.equals])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    #[serde(rename = "none")]
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OverlayInstruction {
    SetFilter(FlagFilter),
    ClearFilter,
    Show,
    Hide,
}

/// Instructions that bring the overlay layer in line with `overlay`.
///
/// The sentinel clears any previous filter and hides the layer. A flag
/// overlay installs its filter before showing the layer.
pub fn resolve_overlay(overlay: &OverlayDescriptor) -> Vec<OverlayInstruction> {
    match (&overlay.property, overlay.is_sentinel()) {
        (Some(property), false) => vec![
            OverlayInstruction::SetFilter(FlagFilter::flag_set(property)),
            OverlayInstruction::Show,
        ],
        _ => vec![OverlayInstruction::ClearFilter, OverlayInstruction::Hide],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(id: u32, property: Option<&str>) -> OverlayDescriptor {
        OverlayDescriptor {
            id,
            name: format!("overlay {}", id),
            property: property.map(String::from),
        }
    }

    #[test]
    fn test_sentinel_hides_without_filter() {
        let out = resolve_overlay(&overlay(1, None));
        assert!(out.contains(&OverlayInstruction::Hide));
        assert!(!out.iter().any(|i| matches!(i, OverlayInstruction::SetFilter(_))));
        assert!(!out.contains(&OverlayInstruction::Show));
    }

    #[test]
    fn test_flag_overlay_filters_on_flag_set() {
        let out = resolve_overlay(&overlay(4, Some("SenFlag")));
        assert_eq!(
            out,
            vec![
                OverlayInstruction::SetFilter(FlagFilter {
                    property: "SenFlag".to_string(),
                    equals: 1,
                }),
                OverlayInstruction::Show,
            ]
        );
    }

    #[test]
    fn test_filter_value_never_uses_overlay_id() {
        for id in [2u32, 4, 5, 6, 99] {
            let out = resolve_overlay(&overlay(id, Some("SenFlag")));
            match &out[0] {
                OverlayInstruction::SetFilter(f) => {
                    assert_eq!(f.equals, FLAG_SET);
                    assert_ne!(f.equals, id as i64);
                    assert_eq!(f.to_expression(), json!(["==", "SenFlag", 1]));
                }
                other => panic!("expected filter, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_filter_matches_flagged_features() {
        let f = FlagFilter::flag_set("PovFlag");
        let flagged = json!({"PovFlag": 1}).as_object().cloned().unwrap();
        let as_float = json!({"PovFlag": 1.0}).as_object().cloned().unwrap();
        let unflagged = json!({"PovFlag": 0}).as_object().cloned().unwrap();
        let id_valued = json!({"PovFlag": 2}).as_object().cloned().unwrap();
        let absent = json!({"SenFlag": 1}).as_object().cloned().unwrap();
        assert!(f.matches(&flagged));
        assert!(f.matches(&as_float));
        assert!(!f.matches(&unflagged));
        assert!(!f.matches(&id_valued));
        assert!(!f.matches(&absent));
    }
}
