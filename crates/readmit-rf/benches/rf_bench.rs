//! Criterion benchmarks for readmit-rf: Random Forest training and prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use readmit_rf::{FeatureKind, RandomForestConfig};

/// Binary dataset with a 3:1 class ratio; the last quarter of columns are indicators.
fn make_classification(
    n_samples: usize,
    n_features: usize,
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<usize>, Vec<FeatureKind>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n_indicators = n_features / 4;
    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let label = usize::from(i % 4 == 0);
        labels.push(label);
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                if f >= n_features - n_indicators {
                    f64::from(u8::from(rng.gen_bool(0.3)))
                } else {
                    let base = if f < 3 { label as f64 * 2.0 } else { 0.0 };
                    base + rng.r#gen::<f64>()
                }
            })
            .collect();
        features.push(row);
    }
    let mut kinds = vec![FeatureKind::Continuous; n_features - n_indicators];
    kinds.extend(std::iter::repeat_n(FeatureKind::Indicator, n_indicators));
    (features, labels, kinds)
}

fn bench_rf_train(c: &mut Criterion) {
    let (features, labels, kinds) = make_classification(1000, 40, 42);
    let cfg = RandomForestConfig::new(50).unwrap().with_seed(42);

    c.bench_function("rf_train_1000x40_50trees", |b| {
        b.iter(|| cfg.fit(&features, &labels, &kinds).unwrap());
    });
}

fn bench_rf_predict_batch(c: &mut Criterion) {
    let (features, labels, kinds) = make_classification(1000, 40, 42);
    let cfg = RandomForestConfig::new(50).unwrap().with_seed(42);
    let forest = cfg.fit(&features, &labels, &kinds).unwrap().into_forest();

    c.bench_function("rf_predict_proba_batch_1000x40_50trees", |b| {
        b.iter(|| forest.predict_proba_batch(&features).unwrap());
    });
}

fn bench_single_tree(c: &mut Criterion) {
    // Proxy for split-finding: train a single-tree forest.
    let (features, labels, kinds) = make_classification(1000, 40, 42);
    let cfg = RandomForestConfig::new(1).unwrap().with_seed(42);

    c.bench_function("rf_single_tree_1000x40", |b| {
        b.iter(|| cfg.fit(&features, &labels, &kinds).unwrap());
    });
}

criterion_group!(benches, bench_rf_train, bench_rf_predict_batch, bench_single_tree);
criterion_main!(benches);
