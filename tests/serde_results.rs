//! Serialisation of configs and query results.
//!
//! Tests are run with `cargo test --features serde`.

#![cfg(feature = "serde")]

use gestalt_core::{
    Category, Cluster, EngineConfig, GestaltEngine, GestaltField, GraphConfig, LargeStrategy,
    ShapeEncoding, SignatureEncoder, SimilarityMetric,
};

#[test]
fn test_config_json_roundtrip_and_validation() {
    let mut config = EngineConfig::default();
    config.cache.large_strategy = LargeStrategy::Wheel;
    config.graph.metric = SimilarityMetric::SignatureEdit;

    let json = serde_json::to_string(&config).unwrap();
    let back: EngineConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
    assert!(back.validate().is_ok());

    let bad = GraphConfig {
        edge_threshold: 0.9,
        ..GraphConfig::default()
    };
    let json = serde_json::to_string(&bad).unwrap();
    let back: GraphConfig = serde_json::from_str(&json).unwrap();
    assert!(back.validate().is_err());
}

#[test]
fn test_category_serialises_lowercase() {
    assert_eq!(serde_json::to_string(&Category::Tensor).unwrap(), "\"tensor\"");
    let c: Category = serde_json::from_str("\"vector\"").unwrap();
    assert_eq!(c, Category::Vector);
}

#[test]
fn test_encoding_survives_json() {
    let e = SignatureEncoder::new().encode(&[3, 224, 224]).unwrap();
    let json = serde_json::to_string(&e).unwrap();
    assert!(json.contains("tensor_p3:c2*2*2*2*2*7:c2*2*2*2*2*7"));
    let back: ShapeEncoding = serde_json::from_str(&json).unwrap();
    assert_eq!(back, e);
}

#[test]
fn test_inconsistent_encoding_is_rejected() {
    let e = SignatureEncoder::new().encode(&[4, 6]).unwrap();
    let good = serde_json::to_value(&e).unwrap();

    let mut forged = good.clone();
    forged["signature"] = serde_json::json!("matrix_p2:p3");
    let err = serde_json::from_value::<ShapeEncoding>(forged).unwrap_err();
    assert!(err.to_string().contains("invalid encoding"), "{err}");

    let mut wrong_factors = good.clone();
    wrong_factors["factors"] = serde_json::json!([[2, 2], [6]]);
    assert!(serde_json::from_value::<ShapeEncoding>(wrong_factors).is_err());

    let mut zero_dim = good.clone();
    zero_dim["shape"] = serde_json::json!([4, 0]);
    assert!(serde_json::from_value::<ShapeEncoding>(zero_dim).is_err());

    // a rule-assigned category is accepted as long as the signature agrees
    let mut relabelled = good;
    relabelled["category"] = serde_json::json!("tensor");
    relabelled["signature"] = serde_json::json!("tensor_c2*2:c2*3");
    let back: ShapeEncoding = serde_json::from_value(relabelled).unwrap();
    assert_eq!(back.category(), Category::Tensor);
}

#[test]
fn test_clusters_and_field_serialise() {
    let mut engine: GestaltEngine<String> = GestaltEngine::new();
    engine.register_shape("w1".to_string(), &[128, 64], 0.5).unwrap();
    engine.register_shape("w2".to_string(), &[128, 64], 0.5).unwrap();

    let clusters = engine.get_clusters();
    let json = serde_json::to_value(&clusters).unwrap();
    assert_eq!(json[0]["members"], serde_json::json!(["w1", "w2"]));
    assert_eq!(json[0]["dominant_category"], "matrix");
    let back: Vec<Cluster<String>> = serde_json::from_value(json).unwrap();
    assert_eq!(back, clusters);

    let field = engine.synthesize_registered().unwrap();
    let json = serde_json::to_string(&field).unwrap();
    let back: GestaltField<String> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.components.len(), 2);
    assert_eq!(back.coherence, 1.0);
}
