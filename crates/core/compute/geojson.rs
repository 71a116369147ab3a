//! GeoJSON conversion for features.

use crate::error::{Result, TileProbeError};
use crate::index::QueryHit;
use geojson::{Feature as GeoJsonFeature, FeatureCollection, GeoJson, Geometry, Value};
use serde_json::Map;
use tileprobe_types::feature::{Feature, FeatureId};

/// Converts a feature into a GeoJSON `Feature`.
///
/// The identity, when given, becomes the GeoJSON `id`; the layer name is kept
/// as a foreign member so consumers can tell layers apart.
pub fn feature_to_geojson(feature: &Feature, id: Option<&FeatureId>) -> GeoJsonFeature {
    let mut foreign = Map::new();
    foreign.insert(
        "layer".to_string(),
        serde_json::Value::String(feature.layer.clone()),
    );

    GeoJsonFeature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(&feature.geometry))),
        id: id.map(|id| match id {
            FeatureId::Int(i) => geojson::feature::Id::Number((*i).into()),
            FeatureId::Str(s) => geojson::feature::Id::String(s.clone()),
        }),
        properties: Some(feature.properties.clone()),
        foreign_members: Some(foreign),
    }
}

/// Converts ranked query hits into a GeoJSON `FeatureCollection`, nearest
/// first, each feature carrying its identity as `id`.
pub fn hits_to_collection(hits: &[QueryHit]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: hits
            .iter()
            .map(|hit| feature_to_geojson(&hit.feature, hit.id.as_ref()))
            .collect(),
        foreign_members: None,
    }
}

/// Builds a [`Feature`] from a GeoJSON feature. Features without geometry
/// are rejected.
pub fn feature_from_geojson(layer: &str, feature: GeoJsonFeature) -> Result<Feature> {
    let geometry = feature.geometry.ok_or_else(|| {
        TileProbeError::InvalidGeoJson("feature has no geometry".to_string())
    })?;
    let geometry: geo::Geometry = geometry.value.try_into().map_err(|e: geojson::Error| {
        TileProbeError::InvalidGeoJson(format!("unsupported geometry: {}", e))
    })?;

    let mut properties = feature.properties.unwrap_or_default();
    // Carry a top-level id into the properties so identity extractors see it.
    if let Some(id) = feature.id {
        let value = match id {
            geojson::feature::Id::String(s) => serde_json::Value::String(s),
            geojson::feature::Id::Number(n) => serde_json::Value::Number(n),
        };
        properties.entry("id".to_string()).or_insert(value);
    }

    Ok(Feature::new(layer, geometry, properties))
}

/// Parses a GeoJSON document (a FeatureCollection, a Feature or a bare
/// Geometry) into features of `layer`.
pub fn features_from_geojson(layer: &str, geojson: GeoJson) -> Result<Vec<Feature>> {
    match geojson {
        GeoJson::FeatureCollection(fc) => fc
            .features
            .into_iter()
            .map(|f| feature_from_geojson(layer, f))
            .collect(),
        GeoJson::Feature(f) => Ok(vec![feature_from_geojson(layer, f)?]),
        GeoJson::Geometry(g) => Ok(vec![feature_from_geojson(
            layer,
            GeoJsonFeature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            },
        )?]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;
    use serde_json::json;

    #[test]
    fn test_feature_to_geojson() {
        let mut props = Map::new();
        props.insert("name".into(), json!("Haga"));
        let feature = Feature::new("poi_label", point!(x: 11.95, y: 57.7).into(), props);

        let gj = feature_to_geojson(&feature, Some(&FeatureId::Int(5)));
        let value = serde_json::to_value(&gj).unwrap();
        assert_eq!(value["geometry"]["type"], "Point");
        assert_eq!(value["geometry"]["coordinates"], json!([11.95, 57.7]));
        assert_eq!(value["properties"]["name"], "Haga");
        assert_eq!(value["id"], 5);
        assert_eq!(value["layer"], "poi_label");
    }

    #[test]
    fn test_features_from_collection() {
        let doc: GeoJson = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": 12,
                 "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                 "properties": {"name": "a"}},
                {"type": "Feature",
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]},
                 "properties": {"osm_id": 3}}
            ]
        }"#
        .parse()
        .unwrap();

        let features = features_from_geojson("mixed", doc).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].property("id"), Some(&json!(12)));
        assert_eq!(features[1].geometry_type(), "Polygon");
        assert_eq!(features[1].layer, "mixed");
    }

    #[test]
    fn test_feature_without_geometry_rejected() {
        let doc: GeoJson = r#"{"type": "Feature", "geometry": null, "properties": {}}"#
            .parse()
            .unwrap();
        assert!(features_from_geojson("x", doc).is_err());
    }

    #[test]
    fn test_hits_keep_order_and_identity() {
        let hit = |id: Option<FeatureId>, x: f64| QueryHit {
            id,
            feature: std::sync::Arc::new(Feature::new("poi", point!(x: x, y: 0.0).into(), Map::new())),
            distance_sq: x * x,
        };
        let hits = vec![hit(Some(FeatureId::Str("n7".into())), 1.0), hit(None, 2.0)];

        let value = serde_json::to_value(hits_to_collection(&hits)).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["id"], "n7");
        assert_eq!(value["features"][0]["geometry"]["coordinates"], json!([1.0, 0.0]));
        assert!(value["features"][1].get("id").is_none());
    }
}
