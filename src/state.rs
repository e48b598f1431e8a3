//! Application state shared by the map UI.
//!
//! Each field is an independent observable cell. Nothing ties the cells
//! together: a selected district may refer to a layer that is no longer
//! selected, and consumers are expected to cope with any cell being empty.

use std::sync::Arc;

use geojson::feature::Id;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::layers::LayerRegistry;
use crate::location::{InitialState, LngLat};
use crate::officials::{Official, OfficialDirectory};
use crate::store::Writable;

/// Identifier of a map feature. GeoJSON allows either strings or numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureKey {
    Number(serde_json::Number),
    Text(String),
}

impl From<Id> for FeatureKey {
    fn from(id: Id) -> Self {
        match id {
            Id::Number(n) => FeatureKey::Number(n),
            Id::String(s) => FeatureKey::Text(s),
        }
    }
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKey::Number(n) => write!(f, "{}", n),
            FeatureKey::Text(s) => f.write_str(s),
        }
    }
}

/// A pin placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: LngLat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Marker {
    pub fn at(position: LngLat) -> Self {
        Self {
            position,
            label: None,
        }
    }
}

/// Viewport of the map widget once it exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: LngLat,
    pub zoom: f64,
}

/// All observable UI state.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub selected_boundary_map: Writable<Option<String>>,
    pub selected_district: Writable<Option<String>>,
    pub hovered_district_id: Writable<Option<FeatureKey>>,
    pub address_marker: Writable<Option<Marker>>,
    pub selected_coordinates: Writable<Option<LngLat>>,
    pub coordinates_marker: Writable<Option<Marker>>,
    pub map_view: Writable<Option<MapView>>,
    pub map_ready: Writable<bool>,
}

impl AppState {
    /// Seed the cells from the URL captured at startup.
    pub fn new(initial: InitialState) -> Self {
        Self {
            selected_boundary_map: Writable::new(initial.boundary_map),
            selected_district: Writable::new(initial.district),
            selected_coordinates: Writable::new(initial.coordinates),
            ..Self::default()
        }
    }

    pub fn shared(initial: InitialState) -> Arc<Self> {
        Arc::new(Self::new(initial))
    }

    /// Select a district on a layer.
    pub fn select_district(&self, boundary_id: &str, district_id: &str) {
        self.selected_boundary_map
            .set(Some(boundary_id.to_string()));
        self.selected_district.set(Some(district_id.to_string()));
    }

    /// Drop the district selection, keeping the layer.
    pub fn clear_district(&self) {
        self.selected_district.set(None);
    }

    /// Look up the official for the current selection.
    pub fn official_details<'a>(
        &self,
        directory: &'a OfficialDirectory,
        layers: &LayerRegistry,
    ) -> Result<Option<&'a Official>, LookupError> {
        let boundary = self.selected_boundary_map.get();
        let district = self.selected_district.get();
        directory.find(layers, boundary.as_deref(), district.as_deref())
    }

    /// Snapshot of the state that can be deep-linked.
    pub fn to_initial_state(&self) -> InitialState {
        InitialState {
            boundary_map: self.selected_boundary_map.get(),
            district: self.selected_district.get(),
            coordinates: self.selected_coordinates.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_initial_state_seeds_cells() {
        let state = AppState::new(InitialState::from_query(
            "map=bbmp_wards&dist=12&lng=77.6&lat=12.9",
        ));

        assert_eq!(state.selected_boundary_map.get().as_deref(), Some("bbmp_wards"));
        assert_eq!(state.selected_district.get().as_deref(), Some("12"));
        assert_eq!(state.selected_coordinates.get(), Some(LngLat::new(77.6, 12.9)));
        assert_eq!(state.hovered_district_id.get(), None);
        assert!(state.address_marker.get().is_none());
        assert!(state.map_view.get().is_none());
        assert!(!state.map_ready.get());
    }

    #[test]
    fn test_shared_state_is_visible_through_clones() {
        let state = AppState::shared(InitialState::default());
        let ui = Arc::clone(&state);

        ui.map_ready.set(true);
        ui.hovered_district_id.set(Some(FeatureKey::Number(4u64.into())));
        ui.coordinates_marker
            .set(Some(Marker::at(LngLat::new(77.5, 12.9))));

        assert!(state.map_ready.get());
        assert_eq!(state.hovered_district_id.get(), Some(FeatureKey::Number(4u64.into())));
        assert_eq!(
            state.coordinates_marker.get().map(|m| m.position),
            Some(LngLat::new(77.5, 12.9))
        );
    }

    #[test]
    fn test_official_details_follows_selection() {
        let directory = OfficialDirectory::new(vec![
            Official::new("pincode", "560001"),
            Official::new("bbmp_wards", "Shanti Nagar"),
        ]);
        let layers = LayerRegistry::builtin();
        let state = AppState::default();

        assert_eq!(state.official_details(&directory, &layers), Ok(None));

        state.select_district("bbmp_wards", "shanti nagar");
        let found = state.official_details(&directory, &layers).unwrap().unwrap();
        assert_eq!(found.area, "Shanti Nagar");

        state.clear_district();
        assert_eq!(state.official_details(&directory, &layers), Ok(None));
    }

    #[test]
    fn test_selection_changes_are_observable() {
        let state = AppState::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = state
            .selected_district
            .subscribe(move |d| sink.lock().unwrap().push(d.clone()));

        state.select_district("pincode", "560001");

        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("560001".to_string())]
        );
    }

    #[test]
    fn test_feature_key_accepts_numbers_and_strings() {
        let keys: Vec<FeatureKey> = serde_json::from_str(r#"[3, "ward-3", 3.5]"#).unwrap();
        assert_eq!(
            keys,
            vec![
                FeatureKey::Number(3u64.into()),
                FeatureKey::Text("ward-3".to_string()),
                FeatureKey::Number(serde_json::Number::from_f64(3.5).unwrap()),
            ]
        );
        assert_eq!(keys[2].to_string(), "3.5");
        assert_eq!(keys[1].to_string(), "ward-3");
    }

    #[test]
    fn test_feature_key_from_geojson_id() {
        let hovered = FeatureKey::from(Id::Number(serde_json::Number::from_f64(3.5).unwrap()));
        assert_eq!(hovered.to_string(), "3.5");
        assert_eq!(
            FeatureKey::from(Id::String("ward-3".to_string())),
            FeatureKey::Text("ward-3".to_string())
        );
    }

    #[test]
    fn test_round_trips_to_initial_state() {
        let initial = InitialState::from_query("map=pincode&dist=560001&lng=1.5&lat=2.5");
        let state = AppState::new(initial.clone());
        assert_eq!(state.to_initial_state(), initial);
    }
}
