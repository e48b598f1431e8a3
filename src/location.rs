//! Initial map state read from the page URL.
//!
//! The hosting page can deep-link a selection with four query parameters:
//! `map` (boundary layer id), `dist` (district id), and `lng`/`lat`
//! (a selected point). Parsing never fails: anything malformed is simply
//! treated as absent.

use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

/// Query parameter carrying the selected boundary layer.
pub const PARAM_MAP: &str = "map";
/// Query parameter carrying the selected district.
pub const PARAM_DISTRICT: &str = "dist";
/// Query parameter carrying the selected longitude.
pub const PARAM_LNG: &str = "lng";
/// Query parameter carrying the selected latitude.
pub const PARAM_LAT: &str = "lat";

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Build a point from raw query values.
    ///
    /// Both values must be present and parse as finite numbers; a lone
    /// coordinate never produces a point.
    pub fn from_params(lng: Option<&str>, lat: Option<&str>) -> Option<Self> {
        let lng = parse_coordinate(lng?)?;
        let lat = parse_coordinate(lat?)?;
        Some(Self { lng, lat })
    }
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Selection captured from the URL at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub boundary_map: Option<String>,
    pub district: Option<String>,
    pub coordinates: Option<LngLat>,
}

impl InitialState {
    /// Parse a query string, with or without the leading `?`.
    ///
    /// When a parameter repeats, the first occurrence wins.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut boundary_map = None;
        let mut district = None;
        let mut lng = None;
        let mut lat = None;

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                PARAM_MAP => &mut boundary_map,
                PARAM_DISTRICT => &mut district,
                PARAM_LNG => &mut lng,
                PARAM_LAT => &mut lat,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        Self {
            coordinates: LngLat::from_params(lng.as_deref(), lat.as_deref()),
            boundary_map,
            district,
        }
    }

    /// Parse the query component of an absolute URL.
    pub fn from_url(url: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(url)?;
        Ok(Self::from_query(url.query().unwrap_or_default()))
    }
}
