mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use geo::{Geometry, Point};
    use tileprobe::compute::spatial::ring_count;
    use tileprobe::{FeatureId, FeatureMode, IndexEvent, QueryOptions};

    #[tokio::test]
    async fn test_dedup_across_tiles() {
        let fetcher = MemoryFetcher::new();
        // The same POI rendered into both tiles it sits near.
        fetcher.put(key(0, 0), vec![point(Some(7), 63.0, 10.0)]);
        fetcher.put(key(1, 0), vec![point(Some(7), 63.0, 10.0)]);
        let index = index(&fetcher, config());

        let hits = index
            .query(Point::new(64.0, 10.0), Some(20.0), QueryOptions::new())
            .await
            .unwrap();

        assert_eq!(ids(&hits), vec![7]);
        let stats = index.stats();
        assert_eq!(stats.features, 1);
        assert_eq!(stats.identities, 1);
    }

    #[tokio::test]
    async fn test_identity_less_features_never_deduplicated() {
        let fetcher = MemoryFetcher::new();
        fetcher.put(key(0, 0), vec![point(None, 10.0, 10.0)]);
        fetcher.put(key(1, 0), vec![point(None, 10.0, 10.0)]);
        let index = index(&fetcher, config());

        let hits = index
            .query(Point::new(64.0, 10.0), Some(60.0), QueryOptions::new())
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.id.is_none()));
        assert_eq!(index.stats().identities, 0);
    }

    #[tokio::test]
    async fn test_join_polygon_split_across_tiles() {
        let fetcher = MemoryFetcher::new();
        fetcher.put(key(0, 0), vec![rect(Some(5), 50.0, 0.0, 64.0, 10.0)]);
        fetcher.put(key(1, 0), vec![rect(Some(5), 64.0, 0.0, 80.0, 10.0)]);
        let index = index(&fetcher, config().with_feature_mode(FeatureMode::Join));
        let mut events = index.subscribe();

        let hits = index
            .query(Point::new(64.0, 5.0), Some(20.0), QueryOptions::new())
            .await
            .unwrap();

        assert_eq!(ids(&hits), vec![5]);
        let geometry = &hits[0].feature.geometry;
        assert!(matches!(geometry, Geometry::MultiPolygon(_)));
        assert_eq!(ring_count(geometry), 2);
        assert_eq!(index.stats().features, 1);

        // Merged box (50..80, 0..10) centered at (65, 5).
        assert_eq!(hits[0].distance_sq, 1.0);

        let added = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, IndexEvent::FeatureAdded { .. }))
            .count();
        assert_eq!(added, 2);
    }

    #[tokio::test]
    async fn test_join_point_into_polygon_fails() {
        let fetcher = MemoryFetcher::new();
        fetcher.put(key(0, 0), vec![rect(Some(5), 20.0, 0.0, 40.0, 10.0)]);
        fetcher.put(key(1, 0), vec![point(Some(5), 70.0, 5.0)]);
        // One fetch at a time, so the closer polygon tile is ingested first.
        let config = config()
            .with_feature_mode(FeatureMode::Join)
            .with_max_concurrent_fetches(1);
        let index = index(&fetcher, config);
        let mut events = index.subscribe();

        let hits = index
            .query(Point::new(30.0, 5.0), Some(40.0), QueryOptions::new())
            .await
            .unwrap();

        assert_eq!(ids(&hits), vec![5]);
        assert!(matches!(hits[0].feature.geometry, Geometry::Polygon(_)));
        assert_eq!(index.stats().features, 1);

        let failures: Vec<_> = drain(&mut events)
            .into_iter()
            .filter_map(|e| match e {
                IndexEvent::FeatureJoinError {
                    identity,
                    geometry_types,
                } => Some((identity, geometry_types)),
                _ => None,
            })
            .collect();
        assert_eq!(failures, vec![(FeatureId::Int(5), ("Polygon", "Point"))]);
    }

    #[tokio::test]
    async fn test_dedup_mode_ignores_fragments() {
        let fetcher = MemoryFetcher::new();
        fetcher.put(key(0, 0), vec![rect(Some(5), 50.0, 0.0, 64.0, 10.0)]);
        fetcher.put(key(1, 0), vec![rect(Some(5), 64.0, 0.0, 80.0, 10.0)]);
        let index = index(&fetcher, config());

        let hits = index
            .query(Point::new(64.0, 5.0), Some(20.0), QueryOptions::new())
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(ring_count(&hits[0].feature.geometry), 1);
    }

    #[tokio::test]
    async fn test_custom_identity_and_filter() {
        let fetcher = MemoryFetcher::new();
        fetcher.put(
            key(0, 0),
            vec![
                point(Some(1), 1.0, 1.0),
                point(Some(2), 2.0, 2.0),
                point(None, 3.0, 3.0),
            ],
        );
        let index = tileprobe::TileIndex::builder()
            .config(config())
            .fetcher(fetcher.clone())
            .decoder(tileprobe::source::GeoJsonDecoder)
            .projection(Planar)
            .url_template("{z}/{x}/{y}")
            .identity(|feature| {
                feature
                    .property("name")
                    .and_then(|name| name.as_str())
                    .map(|name| FeatureId::Str(name.to_string()))
            })
            .filter(|feature| feature.property("osm_id") != Some(&serde_json::json!(2)))
            .build()
            .unwrap();

        let hits = index
            .query(Point::new(0.0, 0.0), Some(10.0), QueryOptions::new())
            .await
            .unwrap();

        let names: Vec<_> = hits
            .iter()
            .map(|hit| hit.id.clone().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["feature 1", "anonymous"]);
    }
}
