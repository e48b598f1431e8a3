//! Officials dataset and lookup.
//!
//! The dataset is a JSON array exported from the master spreadsheet: one
//! object per official, every column a string. Only `Department` and
//! `Area` take part in lookups; the remaining columns are carried as-is
//! for display.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{LookupError, OfficialsError};
use crate::layers::{normalize_department, LayerRegistry};

/// One row of the officials dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Official {
    #[serde(rename = "Department")]
    pub department: String,
    #[serde(rename = "Area")]
    pub area: String,
    /// Every other column (name, designation, phone, ...).
    #[serde(flatten)]
    pub details: BTreeMap<String, JsonValue>,
}

impl Official {
    pub fn new(department: &str, area: &str) -> Self {
        Self {
            department: department.to_string(),
            area: area.to_string(),
            details: BTreeMap::new(),
        }
    }

    /// String value of an extra column.
    pub fn detail(&self, column: &str) -> Option<&str> {
        self.details.get(column).and_then(JsonValue::as_str)
    }
}

/// The full, immutable officials dataset in declaration order.
#[derive(Debug, Clone, Default)]
pub struct OfficialDirectory {
    records: Vec<Official>,
}

impl OfficialDirectory {
    /// Build a directory, normalising spreadsheet department names to
    /// layer ids.
    pub fn new(records: Vec<Official>) -> Self {
        let records = records
            .into_iter()
            .map(|mut record| {
                let normalized = normalize_department(&record.department);
                if normalized != record.department {
                    record.department = normalized.to_string();
                }
                record
            })
            .collect();
        Self { records }
    }

    pub fn from_json_str(json: &str) -> Result<Self, OfficialsError> {
        let records: Vec<Official> = serde_json::from_str(json)?;
        Ok(Self::new(records))
    }

    /// Load the dataset from a JSON file.
    pub async fn load(path: &Path) -> Result<Self, OfficialsError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let directory = Self::from_json_str(&contents)?;
        tracing::debug!(
            "Loaded {} official(s) from {}",
            directory.len(),
            path.display()
        );
        Ok(directory)
    }

    pub fn records(&self) -> &[Official] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find the official for a boundary layer and district.
    ///
    /// Returns `Ok(None)` without searching when either id is missing or
    /// empty. The district id is rendered through the layer's formatter,
    /// then the first record (in dataset order) whose department and area
    /// both match, ignoring case, wins.
    pub fn find(
        &self,
        layers: &LayerRegistry,
        boundary_id: Option<&str>,
        district_id: Option<&str>,
    ) -> Result<Option<&Official>, LookupError> {
        let (Some(boundary_id), Some(district_id)) = (
            boundary_id.filter(|s| !s.is_empty()),
            district_id.filter(|s| !s.is_empty()),
        ) else {
            return Ok(None);
        };

        let area = layers.format_district(boundary_id, district_id)?;
        let department = boundary_id.to_lowercase();
        let area = area.to_lowercase();

        Ok(self.records.iter().find(|official| {
            official.department.to_lowercase() == department
                && official.area.to_lowercase() == area
        }))
    }
}
