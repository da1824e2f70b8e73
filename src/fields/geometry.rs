//! GeoJSON geometry validation
//!
//! Structural validation only: the validator checks the discriminating
//! `type`, the nesting depth of `coordinates` and that every position holds
//! at least two numbers. Ring closure, winding order and coordinate ranges
//! are not checked.
//!
//! See: https://datatracker.ietf.org/doc/html/rfc7946#section-3.1

use crate::error::{Result, SchemaViolation};
use crate::limits::Limits;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};
use std::fmt;

/// Minimum number of numbers in a position
pub const MIN_POSITION_LEN: usize = 2;
/// Minimum number of positions in a LineString
pub const MIN_LINE_POSITIONS: usize = 2;
/// Minimum number of positions in a linear ring
pub const MIN_RING_POSITIONS: usize = 4;

/// A position: longitude, latitude and optional further ordinates
///
/// Numbers are kept as written so a validated geometry serializes back to
/// the payload it came from.
pub type Position = Vec<Number>;

/// A structurally valid GeoJSON geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A single position
    Point {
        /// The position
        coordinates: Position,
    },
    /// Two or more positions
    LineString {
        /// The positions
        coordinates: Vec<Position>,
    },
    /// A sequence of linear rings
    Polygon {
        /// The rings
        coordinates: Vec<Vec<Position>>,
    },
    /// A sequence of positions
    MultiPoint {
        /// The positions
        coordinates: Vec<Position>,
    },
    /// A sequence of line strings
    MultiLineString {
        /// The line strings
        coordinates: Vec<Vec<Position>>,
    },
    /// A sequence of polygons
    MultiPolygon {
        /// The polygons
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    /// A flat sequence of non-collection geometries
    GeometryCollection {
        /// The member geometries
        geometries: Vec<Geometry>,
    },
}

impl Geometry {
    /// The GeoJSON type of this geometry
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point { .. } => GeometryKind::Point,
            Geometry::LineString { .. } => GeometryKind::LineString,
            Geometry::Polygon { .. } => GeometryKind::Polygon,
            Geometry::MultiPoint { .. } => GeometryKind::MultiPoint,
            Geometry::MultiLineString { .. } => GeometryKind::MultiLineString,
            Geometry::MultiPolygon { .. } => GeometryKind::MultiPolygon,
            Geometry::GeometryCollection { .. } => GeometryKind::GeometryCollection,
        }
    }

    /// Total number of positions, including collection members
    pub fn position_count(&self) -> usize {
        match self {
            Geometry::Point { .. } => 1,
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                coordinates.len()
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                coordinates.iter().map(Vec::len).sum()
            }
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .flat_map(|polygon| polygon.iter())
                .map(Vec::len)
                .sum(),
            Geometry::GeometryCollection { geometries } => {
                geometries.iter().map(Geometry::position_count).sum()
            }
        }
    }

    /// Convert back into a GeoJSON value
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

/// The seven GeoJSON geometry type names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeometryKind {
    /// Point
    Point,
    /// MultiPoint
    MultiPoint,
    /// LineString
    LineString,
    /// MultiLineString
    MultiLineString,
    /// Polygon
    Polygon,
    /// MultiPolygon
    MultiPolygon,
    /// GeometryCollection
    GeometryCollection,
}

impl GeometryKind {
    /// All geometry kinds
    pub const ALL: [GeometryKind; 7] = [
        GeometryKind::Point,
        GeometryKind::MultiPoint,
        GeometryKind::LineString,
        GeometryKind::MultiLineString,
        GeometryKind::Polygon,
        GeometryKind::MultiPolygon,
        GeometryKind::GeometryCollection,
    ];

    /// The GeoJSON `type` string
    pub fn geojson_name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::LineString => "LineString",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.geojson_name())
    }
}

/// Shapes a geometry editor field lets the user draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeometryEditorKind {
    /// Points only
    Point,
    /// Line strings only
    LineString,
    /// Polygons only
    Polygon,
    /// Any of the simple shapes
    Any,
}

impl GeometryEditorKind {
    /// Whether a geometry of `kind` can be produced by this editor
    pub fn accepts(&self, kind: GeometryKind) -> bool {
        match self {
            GeometryEditorKind::Point => kind == GeometryKind::Point,
            GeometryEditorKind::LineString => kind == GeometryKind::LineString,
            GeometryEditorKind::Polygon => kind == GeometryKind::Polygon,
            GeometryEditorKind::Any => matches!(
                kind,
                GeometryKind::Point | GeometryKind::LineString | GeometryKind::Polygon
            ),
        }
    }
}

/// Validate a raw payload as a GeoJSON geometry
pub fn validate(payload: &JsonValue) -> std::result::Result<Geometry, SchemaViolation> {
    geometry_at(payload, "", true)
}

/// Validate a raw payload and enforce size limits
pub fn validate_with_limits(payload: &JsonValue, limits: &Limits) -> Result<Geometry> {
    let geometry = validate(payload)?;
    if let Geometry::GeometryCollection { ref geometries } = geometry {
        limits.check_collection_geometries(geometries.len())?;
    }
    limits.check_geometry_positions(geometry.position_count())?;
    Ok(geometry)
}

type Checked<T> = std::result::Result<T, SchemaViolation>;

fn child(path: &str, segment: impl fmt::Display) -> String {
    format!("{}/{}", path, segment)
}

fn geometry_at(value: &JsonValue, path: &str, allow_collection: bool) -> Checked<Geometry> {
    let object = value
        .as_object()
        .ok_or_else(|| SchemaViolation::new(path, "geometry object"))?;

    let type_path = child(path, "type");
    let type_name = object
        .get("type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| SchemaViolation::new(&type_path, "geometry type string"))?;

    if type_name == "GeometryCollection" {
        if !allow_collection {
            return Err(SchemaViolation::new(type_path, "non-collection geometry type")
                .with_message("GeometryCollection may not be nested"));
        }
        let geometries_path = child(path, "geometries");
        let members = array(object.get("geometries"), &geometries_path, "array of geometries")?;
        let geometries = members
            .iter()
            .enumerate()
            .map(|(i, member)| geometry_at(member, &child(&geometries_path, i), false))
            .collect::<Checked<Vec<_>>>()?;
        return Ok(Geometry::GeometryCollection { geometries });
    }

    let coords_path = child(path, "coordinates");
    let coords = object.get("coordinates");

    let geometry = match type_name {
        "Point" => Geometry::Point {
            coordinates: position(coords, &coords_path)?,
        },
        "LineString" => Geometry::LineString {
            coordinates: line(coords, &coords_path)?,
        },
        "Polygon" => Geometry::Polygon {
            coordinates: polygon(coords, &coords_path)?,
        },
        "MultiPoint" => Geometry::MultiPoint {
            coordinates: each(coords, &coords_path, "array of positions", position)?,
        },
        "MultiLineString" => Geometry::MultiLineString {
            coordinates: each(coords, &coords_path, "array of line strings", line)?,
        },
        "MultiPolygon" => Geometry::MultiPolygon {
            coordinates: each(coords, &coords_path, "array of polygons", polygon)?,
        },
        other => {
            return Err(SchemaViolation::new(
                type_path,
                "one of Point, LineString, Polygon, MultiPoint, MultiLineString, MultiPolygon, GeometryCollection",
            )
            .with_message(format!("unknown geometry type '{}'", other)))
        }
    };

    Ok(geometry)
}

fn array<'a>(value: Option<&'a JsonValue>, path: &str, expected: &str) -> Checked<&'a Vec<JsonValue>> {
    value
        .and_then(JsonValue::as_array)
        .ok_or_else(|| SchemaViolation::new(path, expected))
}

fn each<T>(
    value: Option<&JsonValue>,
    path: &str,
    expected: &str,
    element: fn(Option<&JsonValue>, &str) -> Checked<T>,
) -> Checked<Vec<T>> {
    array(value, path, expected)?
        .iter()
        .enumerate()
        .map(|(i, v)| element(Some(v), &child(path, i)))
        .collect()
}

fn position(value: Option<&JsonValue>, path: &str) -> Checked<Position> {
    let numbers = array(value, path, "position")?;
    if numbers.len() < MIN_POSITION_LEN {
        return Err(SchemaViolation::new(path, "position").with_message(format!(
            "a position needs at least {} numbers, found {}",
            MIN_POSITION_LEN,
            numbers.len()
        )));
    }
    numbers
        .iter()
        .enumerate()
        .map(|(i, n)| match n {
            JsonValue::Number(number) => Ok(number.clone()),
            _ => Err(SchemaViolation::new(child(path, i), "number")),
        })
        .collect()
}

fn positions(value: Option<&JsonValue>, path: &str, min: usize, expected: &str) -> Checked<Vec<Position>> {
    let list = each(value, path, expected, position)?;
    if list.len() < min {
        return Err(SchemaViolation::new(path, expected).with_message(format!(
            "found {} position(s)",
            list.len()
        )));
    }
    Ok(list)
}

fn line(value: Option<&JsonValue>, path: &str) -> Checked<Vec<Position>> {
    positions(value, path, MIN_LINE_POSITIONS, "line string of at least 2 positions")
}

fn ring(value: Option<&JsonValue>, path: &str) -> Checked<Vec<Position>> {
    positions(value, path, MIN_RING_POSITIONS, "linear ring of at least 4 positions")
}

fn polygon(value: Option<&JsonValue>, path: &str) -> Checked<Vec<Vec<Position>>> {
    each(value, path, "array of linear rings", ring)
}
