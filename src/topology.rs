//! TopoJSON documents and their conversion to GeoJSON.
//!
//! A topology stores every shared boundary segment ("arc") once; geometries
//! reference arcs by index, with negative indices (`!i`) meaning arc `i`
//! traversed backwards. Quantised topologies additionally delta-encode arc
//! positions and carry a `transform` to map integers back to coordinates.

use std::collections::BTreeMap;

use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::TopologyError;

/// A single coordinate tuple (x, y, and any extra dimensions).
pub type Position = Vec<f64>;

/// Quantisation transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

impl Transform {
    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.scale[0] + self.translate[0],
            y * self.scale[1] + self.translate[1],
        )
    }
}

/// A TopoJSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    pub objects: BTreeMap<String, TopoObject>,
    #[serde(default)]
    pub arcs: Vec<Vec<Position>>,
}

/// A named geometry object with its feature metadata.
///
/// `geometry` is `None` for objects whose `type` is null.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawObject")]
pub struct TopoObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(flatten)]
    pub geometry: Option<TopoGeometry>,
}

impl TopoObject {
    /// Number of features a conversion of this object yields.
    pub fn geometry_count(&self) -> usize {
        match &self.geometry {
            Some(TopoGeometry::GeometryCollection { geometries }) => geometries.len(),
            _ => 1,
        }
    }
}

#[derive(Deserialize)]
struct RawObject {
    #[serde(default)]
    id: Option<JsonValue>,
    #[serde(default)]
    properties: Option<JsonObject>,
    #[serde(default)]
    bbox: Option<Vec<f64>>,
    #[serde(flatten)]
    rest: JsonObject,
}

impl TryFrom<RawObject> for TopoObject {
    type Error = serde_json::Error;

    fn try_from(raw: RawObject) -> Result<Self, Self::Error> {
        let geometry = match raw.rest.get("type") {
            Some(JsonValue::Null) => None,
            _ => Some(serde_json::from_value(JsonValue::Object(raw.rest))?),
        };
        Ok(Self {
            id: raw.id,
            properties: raw.properties,
            bbox: raw.bbox,
            geometry,
        })
    }
}

/// Geometry of a topology object. Line and area types reference arcs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TopoGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { arcs: Vec<i64> },
    MultiLineString { arcs: Vec<Vec<i64>> },
    Polygon { arcs: Vec<Vec<i64>> },
    MultiPolygon { arcs: Vec<Vec<Vec<i64>>> },
    GeometryCollection { geometries: Vec<TopoObject> },
}

impl Topology {
    /// Parse a TopoJSON document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn object(&self, name: &str) -> Option<&TopoObject> {
        self.objects.get(name)
    }

    /// Convert the named object to a feature collection.
    ///
    /// A `GeometryCollection` yields one feature per member; any other
    /// geometry yields a collection holding a single feature.
    pub fn feature_collection(&self, name: &str) -> Result<FeatureCollection, TopologyError> {
        let object = self
            .object(name)
            .ok_or_else(|| TopologyError::MissingObject(name.to_string()))?;
        let decoder = Decoder::new(self);

        let features = match &object.geometry {
            Some(TopoGeometry::GeometryCollection { geometries }) => geometries
                .iter()
                .map(|member| decoder.feature(member))
                .collect::<Result<Vec<_>, _>>()?,
            _ => vec![decoder.feature(object)?],
        };

        Ok(FeatureCollection {
            bbox: object.bbox.clone(),
            features,
            foreign_members: None,
        })
    }
}

/// Resolves arc references against the decoded arcs of one topology.
struct Decoder<'a> {
    arcs: Vec<Vec<Position>>,
    transform: Option<&'a Transform>,
}

impl<'a> Decoder<'a> {
    fn new(topology: &'a Topology) -> Self {
        let transform = topology.transform.as_ref();
        let arcs = match transform {
            Some(t) => topology.arcs.iter().map(|arc| decode_arc(arc, t)).collect(),
            None => topology.arcs.clone(),
        };
        Self { arcs, transform }
    }

    /// Transform a standalone (non-delta) position.
    fn position(&self, p: &[f64]) -> Position {
        match self.transform {
            Some(t) => {
                let (x, y) = t.apply(coord(p, 0), coord(p, 1));
                with_extra_dims(x, y, p)
            }
            None => p.to_vec(),
        }
    }

    fn extend_arc(&self, points: &mut Vec<Position>, index: i64) -> Result<(), TopologyError> {
        // Consecutive arcs share their junction point.
        points.pop();

        let (arc_index, reversed) = if index < 0 {
            (!index, true)
        } else {
            (index, false)
        };
        let arc = usize::try_from(arc_index)
            .ok()
            .and_then(|i| self.arcs.get(i))
            .ok_or(TopologyError::ArcOutOfRange {
                index,
                available: self.arcs.len(),
            })?;

        if reversed {
            points.extend(arc.iter().rev().cloned());
        } else {
            points.extend(arc.iter().cloned());
        }
        Ok(())
    }

    fn line(&self, arcs: &[i64]) -> Result<Vec<Position>, TopologyError> {
        let mut points = Vec::new();
        for &index in arcs {
            self.extend_arc(&mut points, index)?;
        }
        if points.len() == 1 {
            points.push(points[0].clone());
        }
        Ok(points)
    }

    fn ring(&self, arcs: &[i64]) -> Result<Vec<Position>, TopologyError> {
        let mut points = self.line(arcs)?;
        if let Some(first) = points.first().cloned() {
            while points.len() < 4 {
                points.push(first.clone());
            }
        }
        Ok(points)
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Vec<Vec<Position>>, TopologyError> {
        rings.iter().map(|r| self.ring(r)).collect()
    }

    fn geometry(&self, geometry: &TopoGeometry) -> Result<Geometry, TopologyError> {
        let value = match geometry {
            TopoGeometry::Point { coordinates } => Value::Point(self.position(coordinates)),
            TopoGeometry::MultiPoint { coordinates } => {
                Value::MultiPoint(coordinates.iter().map(|p| self.position(p)).collect())
            }
            TopoGeometry::LineString { arcs } => Value::LineString(self.line(arcs)?),
            TopoGeometry::MultiLineString { arcs } => Value::MultiLineString(
                arcs.iter()
                    .map(|l| self.line(l))
                    .collect::<Result<_, _>>()?,
            ),
            TopoGeometry::Polygon { arcs } => Value::Polygon(self.polygon(arcs)?),
            TopoGeometry::MultiPolygon { arcs } => Value::MultiPolygon(
                arcs.iter()
                    .map(|p| self.polygon(p))
                    .collect::<Result<_, _>>()?,
            ),
            TopoGeometry::GeometryCollection { geometries } => Value::GeometryCollection(
                geometries
                    .iter()
                    .filter_map(|g| g.geometry.as_ref())
                    .map(|g| self.geometry(g))
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(Geometry::new(value))
    }

    fn feature(&self, object: &TopoObject) -> Result<Feature, TopologyError> {
        Ok(Feature {
            bbox: object.bbox.clone(),
            geometry: object
                .geometry
                .as_ref()
                .map(|g| self.geometry(g))
                .transpose()?,
            id: object.id.as_ref().and_then(feature_id),
            properties: Some(object.properties.clone().unwrap_or_default()),
            foreign_members: None,
        })
    }
}

fn coord(p: &[f64], i: usize) -> f64 {
    p.get(i).copied().unwrap_or(0.0)
}

fn with_extra_dims(x: f64, y: f64, source: &[f64]) -> Position {
    let mut out = vec![x, y];
    out.extend_from_slice(source.get(2..).unwrap_or_default());
    out
}

/// Undo delta encoding and quantisation for one arc.
fn decode_arc(arc: &[Position], transform: &Transform) -> Vec<Position> {
    let (mut x, mut y) = (0.0, 0.0);
    arc.iter()
        .map(|p| {
            x += coord(p, 0);
            y += coord(p, 1);
            let (tx, ty) = transform.apply(x, y);
            with_extra_dims(tx, ty, p)
        })
        .collect()
}

fn feature_id(id: &JsonValue) -> Option<Id> {
    match id {
        JsonValue::String(s) => Some(Id::String(s.clone())),
        JsonValue::Number(n) => Some(Id::Number(n.clone())),
        _ => None,
    }
}
