use geo::Geometry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Stable identity of a real-world feature across tiles.
///
/// Only used to recognize repeated sightings of the same feature; it plays no
/// part in spatial lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Int(i64),
    Str(String),
}

impl FeatureId {
    /// Interpret a JSON property value as an identity.
    ///
    /// Integral numbers (including floats without a fractional part, which is
    /// how some encoders store ids) and non-empty strings are accepted.
    ///
    /// ```
    /// use serde_json::json;
    /// use tileprobe_types::feature::FeatureId;
    ///
    /// assert_eq!(FeatureId::from_json(&json!(42)), Some(FeatureId::Int(42)));
    /// assert_eq!(FeatureId::from_json(&json!(42.0)), Some(FeatureId::Int(42)));
    /// assert_eq!(FeatureId::from_json(&json!("w12")), Some(FeatureId::Str("w12".into())));
    /// assert_eq!(FeatureId::from_json(&json!(null)), None);
    /// ```
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(FeatureId::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Some(FeatureId::Str(u.to_string()))
                } else {
                    n.as_f64()
                        .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| FeatureId::Int(f as i64))
                }
            }
            Value::String(s) if !s.is_empty() => Some(FeatureId::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Int(i) => write!(f, "{}", i),
            FeatureId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FeatureId {
    fn from(value: i64) -> Self {
        FeatureId::Int(value)
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        FeatureId::Str(value.to_string())
    }
}

/// A decoded feature in geographic coordinates (x = longitude, y = latitude).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Name of the tile layer the feature was read from.
    pub layer: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(layer: impl Into<String>, geometry: Geometry, properties: Map<String, Value>) -> Self {
        Self {
            layer: layer.into(),
            geometry,
            properties,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// GeoJSON-style name of the geometry type.
    pub fn geometry_type(&self) -> &'static str {
        geometry_type_name(&self.geometry)
    }
}

fn geometry_type_name(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;
    use serde_json::json;

    #[test]
    fn test_feature_id_rejects_fractional_and_empty() {
        assert_eq!(FeatureId::from_json(&json!(1.5)), None);
        assert_eq!(FeatureId::from_json(&json!("")), None);
        assert_eq!(FeatureId::from_json(&json!([1])), None);
    }

    #[test]
    fn test_feature_id_large_unsigned() {
        let id = FeatureId::from_json(&json!(u64::MAX)).unwrap();
        assert_eq!(id, FeatureId::Str(u64::MAX.to_string()));
    }

    #[test]
    fn test_feature_geometry_type() {
        let mut props = Map::new();
        props.insert("name".into(), json!("cafe"));
        let feature = Feature::new("poi_label", point!(x: 11.9, y: 57.7).into(), props);
        assert_eq!(feature.geometry_type(), "Point");
        assert_eq!(feature.property("name"), Some(&json!("cafe")));
        assert_eq!(feature.property("missing"), None);
    }
}
