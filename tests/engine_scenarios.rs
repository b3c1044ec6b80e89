//! End-to-end scenarios for the signature engine.
//!
//! Tests are run with `cargo test`. Everything here goes through the public
//! API only, with `u32` or `&str` node ids.

use gestalt_core::{
    similarity, CacheConfig, Category, EngineConfig, GestaltEngine, GestaltError, GraphConfig,
    LargeStrategy, SignatureEncoder, SimilarityMetric, COMMON_DIMENSIONS,
};

// ─── helpers ─────────────────────────────────────────────────────────────────

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

/// Small deterministic LCG so shape sweeps are reproducible without a rand dep.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn shape(&mut self) -> Vec<usize> {
        let rank = 1 + (self.next() % 4) as usize;
        (0..rank).map(|_| 1 + (self.next() % 64) as usize).collect()
    }
}

// ─── factorization ───────────────────────────────────────────────────────────

#[test]
fn test_factorization_properties_hold_across_strategies() {
    for strategy in [
        LargeStrategy::PollardRho,
        LargeStrategy::Wheel,
        LargeStrategy::TrialDivision,
    ] {
        let mut engine: GestaltEngine<u32> = GestaltEngine::try_new(EngineConfig {
            cache: CacheConfig {
                capacity: 128,
                large_threshold: 1_000,
                large_strategy: strategy,
                use_static_table: false,
            },
            graph: GraphConfig::default(),
        })
        .unwrap();

        for n in (0u64..20_000).step_by(7).chain([1_000_003, 999_999_937, 4_294_967_297]) {
            let f = engine.factorize(n);
            if n <= 1 {
                assert!(f.is_empty());
                continue;
            }
            assert_eq!(f.iter().product::<u64>(), n, "{strategy:?} product of {n}");
            assert!(f.windows(2).all(|w| w[0] <= w[1]), "{strategy:?} order of {n}");
            assert!(f.iter().all(|&p| is_prime(p)), "{strategy:?} primality of {n}");
        }
    }
}

#[test]
fn test_clearing_cache_does_not_change_answers() {
    let mut engine: GestaltEngine<u32> = GestaltEngine::new();
    let values: Vec<u64> = (2..500).chain([65_536, 1_000_003, 600_851_475_143]).collect();
    let first = engine.batch_factorize(&values);
    engine.clear_cache();
    assert_eq!(engine.cache_stats().size, 0);
    let second = engine.batch_factorize(&values);
    assert_eq!(first, second);
}

#[test]
fn test_precompute_common_dimensions() {
    let mut engine: GestaltEngine<u32> = GestaltEngine::new();
    let size = engine.precompute(&COMMON_DIMENSIONS);
    // every common dimension except 1 is stored
    assert_eq!(size, COMMON_DIMENSIONS.len() - 1);
}

#[test]
fn test_concrete_factorizations() {
    let mut engine: GestaltEngine<u32> = GestaltEngine::new();
    assert_eq!(engine.factorize(12), [2, 2, 3]);
    assert_eq!(engine.factorize(17), [17]);
    assert!(engine.factorize(1).is_empty());
    assert!(engine.factorize_signed(-12).is_empty());
}

// ─── encoding & similarity ───────────────────────────────────────────────────

#[test]
fn test_matrix_of_primes_encoding() {
    let mut engine: GestaltEngine<u32> = GestaltEngine::new();
    let e = engine.encode_shape(&[2, 3], &0).unwrap();
    assert_eq!(e.category(), Category::Matrix);
    assert_eq!(e.tokens().collect::<Vec<_>>(), ["p2", "p3"]);
}

#[test]
fn test_signature_equal_iff_shape_equal() {
    let mut rng = Lcg(42);
    let mut encoder = SignatureEncoder::new();
    let shapes: Vec<Vec<usize>> = (0..120).map(|_| rng.shape()).collect();
    let encs: Vec<_> = shapes.iter().map(|s| encoder.encode(s).unwrap()).collect();
    for i in 0..shapes.len() {
        for j in 0..shapes.len() {
            assert_eq!(
                encs[i].signature() == encs[j].signature(),
                shapes[i] == shapes[j],
                "{:?} vs {:?}",
                shapes[i],
                shapes[j]
            );
        }
    }
}

#[test]
fn test_similarity_reflexive_and_symmetric_on_random_shapes() {
    let mut rng = Lcg(7);
    let mut encoder = SignatureEncoder::new();
    let encs: Vec<_> = (0..60).map(|_| encoder.encode(&rng.shape()).unwrap()).collect();
    for a in &encs {
        assert_eq!(similarity(a, a), 1.0);
        for b in &encs {
            assert_eq!(similarity(a, b), similarity(b, a));
            let s = SimilarityMetric::SignatureEdit.score(a, b);
            assert_eq!(s, SimilarityMetric::SignatureEdit.score(b, a));
        }
    }
}

#[test]
fn test_four_four_versus_eight_two() {
    let mut encoder = SignatureEncoder::new();
    let a = encoder.encode(&[4, 4]).unwrap();
    let b = encoder.encode(&[8, 2]).unwrap();
    let sim = similarity(&a, &b);
    assert!((sim - 31.0 / 60.0).abs() < 1e-12, "sim={sim}");
}

#[test]
fn test_invalid_shapes() {
    let mut encoder = SignatureEncoder::new();
    assert!(encoder.encode(&[]).is_none());
    assert!(encoder.encode(&[4, 0, 4]).is_none());
    assert_eq!(encoder.try_encode(&[]), Err(GestaltError::EmptyShape));
    assert_eq!(
        encoder.try_encode_signed(&[3, -2]),
        Err(GestaltError::NegativeDimension { index: 1, value: -2 })
    );
}

// ─── graph & clusters ────────────────────────────────────────────────────────

#[test]
fn test_three_identical_and_one_outlier() {
    let mut engine: GestaltEngine<&str> = GestaltEngine::new();
    for id in ["a", "b", "c"] {
        engine.register_shape(id, &[2, 2], 1.0).unwrap();
    }
    engine.register_shape("odd", &[3, 5], 1.0).unwrap();

    let clusters = engine.get_clusters();
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].size(), 3);
    assert_eq!(clusters[0].coherence, 1.0);
    assert_eq!(clusters[0].center, "a");
    assert!(clusters[1].is_singleton());
    assert_eq!(clusters[1].members, ["odd"]);
    assert_eq!(clusters[1].coherence, 1.0);
}

#[test]
fn test_clustering_is_idempotent_on_random_graph() {
    let mut rng = Lcg(2024);
    let mut engine: GestaltEngine<u32> = GestaltEngine::new();
    for id in 0..80 {
        let shape = rng.shape();
        engine.register_shape(id, &shape, (id % 5) as f64).unwrap();
    }
    let first = engine.get_clusters();
    let second = engine.get_clusters();
    assert_eq!(first, second);

    let total: usize = first.iter().map(|c| c.size()).sum();
    assert_eq!(total, 80);
    for c in &first {
        assert!(c.members.contains(&c.center));
        assert!((0.0..=1.0).contains(&c.coherence));
    }
    assert!(engine.graph().check_consistency().is_ok());
}

#[test]
fn test_reinserting_same_encodings_keeps_edge_count() {
    let mut engine: GestaltEngine<u32> = GestaltEngine::new();
    let shapes: [&[usize]; 4] = [&[2, 2], &[2, 3], &[2, 2], &[7]];
    for (id, s) in shapes.iter().enumerate() {
        engine.register_shape(id as u32, s, 1.0).unwrap();
    }
    let edges = engine.graph().edge_count();
    for (id, s) in shapes.iter().enumerate() {
        engine.register_shape(id as u32, s, 2.0).unwrap();
    }
    assert_eq!(engine.graph().edge_count(), edges);
    assert_eq!(engine.graph().node_count(), 4);
}

#[test]
fn test_remove_then_recluster() {
    let mut engine: GestaltEngine<u32> = GestaltEngine::new();
    engine.register_shape(1, &[16, 16], 1.0).unwrap();
    engine.register_shape(2, &[16, 16], 1.0).unwrap();
    engine.register_shape(3, &[16, 16], 1.0).unwrap();
    assert_eq!(engine.get_clusters().len(), 1);

    engine.remove_node(&2).unwrap();
    let clusters = engine.get_clusters();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].members, [1, 3]);
    assert!(engine.remove_node(&2).is_none());
}

#[test]
fn test_strict_insert_and_missing_activity_target() {
    let mut engine: GestaltEngine<u32> = GestaltEngine::new();
    let e = engine.encode_shape(&[5], &1).unwrap();
    engine.insert_node(1, e.clone(), 1.0).unwrap();
    assert!(matches!(
        engine.insert_node(1, e, 1.0),
        Err(GestaltError::DuplicateNode(_))
    ));
    assert!(matches!(
        engine.set_activity(&9, 1.0),
        Err(GestaltError::NodeNotFound(_))
    ));
}

#[test]
fn test_grammar_rule_changes_category_and_clusters() {
    let mut engine: GestaltEngine<u32> = GestaltEngine::new();
    engine
        .add_grammar_rule("conv-kernel", |s: &[usize]| -> Option<Category> {
            (s.len() == 4 && s[2] == s[3] && s[2] <= 7).then_some(Category::Matrix)
        })
        .unwrap();
    let e = engine.encode_shape(&[64, 3, 3, 3], &0).unwrap();
    assert_eq!(e.category(), Category::Matrix);
    assert!(e.signature().starts_with("matrix_"));
    let plain = engine.encode_shape(&[64, 3, 9, 9], &1).unwrap();
    assert_eq!(plain.category(), Category::Tensor);
}

// ─── gestalt field ───────────────────────────────────────────────────────────

#[test]
fn test_equal_activity_field_is_coherent() {
    let mut engine: GestaltEngine<&str> = GestaltEngine::new();
    engine.register_shape("x", &[8, 8], 0.0).unwrap();
    engine.register_shape("y", &[3, 5], 0.0).unwrap();
    let field = engine.synthesize_field([("x", 0.6), ("y", 0.6)]).unwrap();
    assert_eq!(field.coherence, 1.0);
    assert_eq!(field.components.len(), 2);
    // two distinct signatures over two nodes
    assert!((field.normalized_entropy() - 1.0).abs() < 1e-9);

    let expected = 0.6 * (9f64.ln() * 9f64.ln()) + 0.6 * (4f64.ln() * 6f64.ln());
    assert!((field.total_energy - expected).abs() < 1e-9);
}

#[test]
fn test_empty_engine_has_no_field() {
    let engine: GestaltEngine<u32> = GestaltEngine::new();
    assert!(engine.synthesize_registered().is_none());
    assert!(engine.synthesize_field(Vec::new()).is_none());
    assert!(engine.get_clusters().is_empty());
}

#[test]
fn test_signature_edit_metric_engine() {
    let mut engine: GestaltEngine<u32> = GestaltEngine::try_new(EngineConfig {
        graph: GraphConfig {
            metric: SimilarityMetric::SignatureEdit,
            ..GraphConfig::default()
        },
        ..EngineConfig::default()
    })
    .unwrap();
    engine.register_shape(1, &[32, 32], 1.0).unwrap();
    engine.register_shape(2, &[32, 32], 1.0).unwrap();
    engine.register_shape(3, &[7], 1.0).unwrap();
    let clusters = engine.get_clusters();
    assert_eq!(clusters[0].members, [1, 2]);
    assert_eq!(clusters[0].coherence, 1.0);
}
