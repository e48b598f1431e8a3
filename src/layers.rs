//! Boundary layers and their district label formatters.
//!
//! Every boundary layer (ward map, police jurisdiction, pincode areas, ...)
//! labels its districts differently in the officials dataset. The registry
//! maps a layer id to the formatter that turns a district id from the map
//! into that label.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// Built-in civic layers: (id, display name used in the source spreadsheet).
pub const BUILTIN_LAYERS: &[(&str, &str)] = &[
    ("admin_district", "Administrative (District)"),
    ("admin_taluk", "Administrative (Taluk)"),
    ("bbmp_wards", "BBMP (Ward)"),
    ("bbmp_zone", "BBMP (Zone)"),
    ("bescom_division", "BESCOM (Division)"),
    ("bescom_subdivision", "BESCOM (Subdivision)"),
    ("bwssb_division", "BWSSB (Division)"),
    ("election_ac", "Elections (Assembly Constituency)"),
    ("election_pc", "Elections (Parliamentary Constituency)"),
    ("pincode", "Pincode"),
    ("police_city", "City Police"),
    ("police_traffic", "Traffic Police"),
    ("stamps_sro", "Stamps (SRO)"),
    ("stamps_dro", "Stamps (DRO)"),
];

/// How a layer renders a district id as a label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistrictFormat {
    /// The district id is the label.
    #[default]
    Verbatim,
    /// Substitute the district id for every `{}` in the template.
    Template { template: String },
    Uppercase,
    /// Capitalise the first letter of each whitespace-separated word.
    TitleCase,
}

impl DistrictFormat {
    pub fn apply(&self, district_id: &str) -> String {
        match self {
            DistrictFormat::Verbatim => district_id.to_string(),
            DistrictFormat::Template { template } => template.replace("{}", district_id),
            DistrictFormat::Uppercase => district_id.to_uppercase(),
            DistrictFormat::TitleCase => title_case(district_id),
        }
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// A boundary layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub format: DistrictFormat,
}

impl Layer {
    pub fn format_district(&self, district_id: &str) -> String {
        self.format.apply(district_id)
    }
}

/// Layer overrides as they appear in a config file, keyed by layer id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DistrictFormat>,
}

/// Layer id to layer mapping.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    layers: BTreeMap<String, Layer>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in civic layers, all verbatim.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (id, name) in BUILTIN_LAYERS {
            registry.insert(Layer {
                id: id.to_string(),
                name: name.to_string(),
                format: DistrictFormat::Verbatim,
            });
        }
        registry
    }

    pub fn insert(&mut self, layer: Layer) {
        self.layers.insert(layer.id.clone(), layer);
    }

    /// Apply config overrides. Unknown ids add new layers.
    pub fn apply_config(&mut self, overrides: &BTreeMap<String, LayerConfig>) {
        for (id, cfg) in overrides {
            let layer = self.layers.entry(id.clone()).or_insert_with(|| Layer {
                id: id.clone(),
                name: id.clone(),
                format: DistrictFormat::Verbatim,
            });
            if let Some(ref name) = cfg.name {
                layer.name = name.clone();
            }
            if let Some(ref format) = cfg.format {
                layer.format = format.clone();
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Format a district label for a layer.
    ///
    /// Layer ids are matched exactly; an unknown layer is an error rather
    /// than a silent non-match so callers decide how to surface it.
    pub fn format_district(&self, layer_id: &str, district_id: &str) -> Result<String, LookupError> {
        self.get(layer_id)
            .map(|layer| layer.format_district(district_id))
            .ok_or_else(|| LookupError::UnknownLayer(layer_id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Map a spreadsheet department name ("BBMP (Ward)") to its layer id.
///
/// Names that are not in the built-in table come back unchanged.
pub fn normalize_department(name: &str) -> &str {
    let trimmed = name.trim();
    BUILTIN_LAYERS
        .iter()
        .find(|(_, display)| *display == trimmed)
        .map(|(id, _)| *id)
        .unwrap_or(name)
}
