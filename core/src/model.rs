use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// One detected quantity+unit pair in the recipe text.
///
/// `id` addresses the matching `<span id="...">` in the annotated HTML and is
/// unique across every group of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOccurrence {
    pub id: String,
    /// Source value as detected (e.g. `2` for "2 cups")
    pub value: f64,
    /// Source unit label as written in the recipe (e.g. "cup")
    pub unit_text: String,
    /// Matched text fragment, used for selector labels (e.g. "2 cups")
    #[serde(default)]
    pub term: String,
    /// Selected target unit code, only set on conversion requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_value: Option<f64>,
}

/// Detected occurrences sharing a measurement category (mass, volume, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitGroup {
    pub name: String,
    #[serde(rename = "type", default)]
    pub category: String,
    #[serde(rename = "unitList", default)]
    pub units: Vec<UnitOccurrence>,
    /// Target unit codes offered for this group, in display order
    #[serde(rename = "conversion", default)]
    pub available_targets: Vec<String>,
}

impl UnitGroup {
    pub fn supports_target(&self, target: &str) -> bool {
        self.available_targets.iter().any(|t| t == target)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseRequest {
    pub recipe: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResponse {
    #[serde(rename = "unitGroup", default)]
    pub unit_groups: Vec<UnitGroup>,
    #[serde(rename = "parsedRecipe", default)]
    pub parsed_recipe: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertRequest {
    #[serde(rename = "unitGroup")]
    pub unit_groups: Vec<UnitGroup>,
    #[serde(rename = "parsedRecipe")]
    pub parsed_recipe: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub recipe: String,
}

/// Working state of one parse-through-conversion cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeSession {
    pub raw_text: String,
    /// Sanitized annotated HTML returned by the parse service
    pub annotated_html: Option<String>,
    pub unit_groups: Vec<UnitGroup>,
    pub created_at: DateTime<Utc>,
}

impl RecipeSession {
    pub fn occurrence_ids(&self) -> impl Iterator<Item = &str> {
        self.unit_groups
            .iter()
            .flat_map(|group| group.units.iter().map(|unit| unit.id.as_str()))
    }
}

/// Converted recipe text shown on the result view.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalRecipe {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Check that group names and occurrence ids are unique across a session.
pub fn validate_unit_groups(groups: &[UnitGroup]) -> Result<(), ModelError> {
    let mut names = HashSet::new();
    let mut ids = HashSet::new();
    for group in groups {
        if !names.insert(group.name.as_str()) {
            return Err(ModelError::DuplicateGroupName(group.name.clone()));
        }
        for unit in &group.units {
            if !ids.insert(unit.id.as_str()) {
                return Err(ModelError::DuplicateOccurrenceId(unit.id.clone()));
            }
        }
    }
    Ok(())
}

/// Capitalise the first character, for selector labels ("Volume to").
pub fn upper_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{UnitGroup, UnitOccurrence};

    pub fn occurrence(id: &str, value: f64, unit_text: &str, term: &str) -> UnitOccurrence {
        UnitOccurrence {
            id: id.to_string(),
            value,
            unit_text: unit_text.to_string(),
            term: term.to_string(),
            to: None,
            converted_value: None,
        }
    }

    pub fn group(name: &str, units: Vec<UnitOccurrence>, targets: &[&str]) -> UnitGroup {
        UnitGroup {
            name: name.to_string(),
            category: name.to_string(),
            units,
            available_targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// "Add 2 cups of flour and 100 g of sugar, then 1 cup of milk"
    pub fn flour_groups() -> Vec<UnitGroup> {
        vec![
            group(
                "volume",
                vec![
                    occurrence("u1", 2.0, "cup", "2 cups"),
                    occurrence("u3", 1.0, "cup", "1 cup"),
                ],
                &["milliliter", "liter"],
            ),
            group(
                "mass",
                vec![occurrence("u2", 100.0, "g", "100 g")],
                &["ounce", "pound"],
            ),
        ]
    }

    pub const FLOUR_HTML: &str = "Add <span class=\"unit\" id=\"u1\">2 cups</span> of flour and \
        <span class=\"unit\" id=\"u2\">100 g</span> of sugar, then \
        <span class=\"unit\" id=\"u3\">1 cup</span> of milk";
}
