use crate::dataset::Dataset;
use oxiclass_core::validation::{seeded_rng, standard_normal};
use oxiclass_core::{MlError, MlResult, Tensor};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Parameters of [`make_classification`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSpec {
    pub n_samples: usize,
    pub n_features: usize,
    /// Features that carry the class signal.
    pub n_informative: usize,
    /// Random linear combinations of the informative features.
    pub n_redundant: usize,
    pub n_classes: usize,
    pub n_clusters_per_class: usize,
    /// Half the edge length of the hypercube the clusters sit on.
    pub class_sep: f64,
    /// Fraction of labels replaced by a random class.
    pub flip_y: f64,
    pub shuffle: bool,
}

impl Default for ClassificationSpec {
    fn default() -> Self {
        ClassificationSpec {
            n_samples: 100,
            n_features: 20,
            n_informative: 2,
            n_redundant: 2,
            n_classes: 2,
            n_clusters_per_class: 2,
            class_sep: 1.0,
            flip_y: 0.01,
            shuffle: true,
        }
    }
}

impl ClassificationSpec {
    fn validate(&self) -> MlResult<()> {
        let invalid = |name: &'static str, reason: String| -> MlResult<()> {
            Err(MlError::InvalidParameter { name, reason })
        };
        if self.n_classes < 2 {
            return invalid("n_classes", "need at least two classes".into());
        }
        if self.n_informative == 0 || self.n_informative > 30 {
            return invalid("n_informative", format!("{} not in 1..=30", self.n_informative));
        }
        if self.n_informative + self.n_redundant > self.n_features {
            return invalid(
                "n_features",
                format!(
                    "{} informative + {} redundant exceed {} features",
                    self.n_informative, self.n_redundant, self.n_features
                ),
            );
        }
        let clusters = self.n_classes * self.n_clusters_per_class.max(1);
        if clusters > 1usize << self.n_informative {
            return invalid(
                "n_informative",
                format!(
                    "{} classes x {} clusters need more than 2^{} hypercube vertices",
                    self.n_classes, self.n_clusters_per_class, self.n_informative
                ),
            );
        }
        if self.n_samples < clusters {
            return invalid(
                "n_samples",
                format!("{} samples for {} clusters", self.n_samples, clusters),
            );
        }
        if !(0.0..=1.0).contains(&self.flip_y) {
            return invalid("flip_y", format!("{} not in [0, 1]", self.flip_y));
        }
        Ok(())
    }
}

/// Random n-class classification problem.
///
/// Each class is made of `n_clusters_per_class` Gaussian clusters centred on
/// distinct vertices of a hypercube with side `2 * class_sep` in the
/// informative subspace. Informative features are mixed by a random linear
/// map, redundant features are random combinations of them, and the rest
/// are pure noise. Classes are balanced before `flip_y` noise is applied.
pub fn make_classification(spec: &ClassificationSpec, seed: Option<u64>) -> MlResult<Dataset> {
    spec.validate()?;
    let mut rng = seeded_rng(seed);
    let n_inf = spec.n_informative;
    let n_clusters = spec.n_classes * spec.n_clusters_per_class.max(1);

    // Distinct hypercube vertices, one per cluster.
    let mut codes = HashSet::with_capacity(n_clusters);
    let mut vertices = Vec::with_capacity(n_clusters);
    while vertices.len() < n_clusters {
        let code: u64 = rng.gen_range(0..(1u64 << n_inf));
        if codes.insert(code) {
            vertices.push(code);
        }
    }
    let centroids: Vec<Vec<f64>> = vertices
        .iter()
        .map(|&code| {
            (0..n_inf)
                .map(|b| {
                    if (code >> b) & 1 == 1 {
                        spec.class_sep
                    } else {
                        -spec.class_sep
                    }
                })
                .collect()
        })
        .collect();

    let per_cluster = spec.n_samples / n_clusters;
    let remainder = spec.n_samples % n_clusters;

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(spec.n_samples);
    let mut labels: Vec<usize> = Vec::with_capacity(spec.n_samples);
    for (k, centroid) in centroids.iter().enumerate() {
        let count = per_cluster + usize::from(k < remainder);
        // Per-cluster covariance via a random mixing matrix.
        let mixing: Vec<f64> = (0..n_inf * n_inf).map(|_| rng.gen::<f64>() * 2.0 - 1.0).collect();
        for _ in 0..count {
            let z: Vec<f64> = (0..n_inf).map(|_| standard_normal(&mut rng)).collect();
            let point: Vec<f64> = (0..n_inf)
                .map(|j| {
                    let mixed: f64 = (0..n_inf).map(|i| z[i] * mixing[i * n_inf + j]).sum();
                    mixed + centroid[j]
                })
                .collect();
            rows.push(point);
            labels.push(k % spec.n_classes);
        }
    }

    let redundant: Vec<f64> = (0..n_inf * spec.n_redundant)
        .map(|_| rng.gen::<f64>() * 2.0 - 1.0)
        .collect();
    let n_noise = spec.n_features - n_inf - spec.n_redundant;
    for row in rows.iter_mut() {
        let informative = row.clone();
        for r in 0..spec.n_redundant {
            let v: f64 = (0..n_inf)
                .map(|i| informative[i] * redundant[i * spec.n_redundant + r])
                .sum();
            row.push(v);
        }
        for _ in 0..n_noise {
            row.push(standard_normal(&mut rng));
        }
    }

    let mut flipped = 0usize;
    for label in labels.iter_mut() {
        if spec.flip_y > 0.0 && rng.gen::<f64>() < spec.flip_y {
            *label = rng.gen_range(0..spec.n_classes);
            flipped += 1;
        }
    }

    let mut order: Vec<usize> = (0..rows.len()).collect();
    if spec.shuffle {
        order.shuffle(&mut rng);
    }
    let mut data = Vec::with_capacity(spec.n_samples * spec.n_features);
    let mut y = Vec::with_capacity(spec.n_samples);
    for &i in &order {
        data.extend_from_slice(&rows[i]);
        y.push(labels[i]);
    }

    debug!(
        n_samples = spec.n_samples,
        n_features = spec.n_features,
        n_classes = spec.n_classes,
        flipped,
        "generated classification problem"
    );
    let x = Tensor::new(data, vec![spec.n_samples, spec.n_features])?;
    Dataset::with_default_names(x, y, spec.n_classes)
}

/// Isotropic Gaussian blobs, one per center, centers uniform in `[-10, 10]`.
pub fn make_blobs(
    n_samples: usize,
    n_features: usize,
    n_centers: usize,
    cluster_std: f64,
    seed: Option<u64>,
) -> MlResult<Dataset> {
    if n_centers == 0 || n_features == 0 {
        return Err(MlError::InvalidParameter {
            name: "n_centers",
            reason: "need at least one center and one feature".into(),
        });
    }
    let mut rng = seeded_rng(seed);
    let centers: Vec<f64> = (0..n_centers * n_features)
        .map(|_| rng.gen_range(-10.0..10.0))
        .collect();

    let mut data = Vec::with_capacity(n_samples * n_features);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        // Round-robin keeps the class counts within one of each other.
        let c = i % n_centers;
        for f in 0..n_features {
            data.push(centers[c * n_features + f] + standard_normal(&mut rng) * cluster_std);
        }
        labels.push(c);
    }

    let x = Tensor::new(data, vec![n_samples, n_features])?;
    Dataset::with_default_names(x, labels, n_centers)
}

/// Two interleaving half circles in 2-D.
pub fn make_moons(n_samples: usize, noise: f64, seed: Option<u64>) -> MlResult<Dataset> {
    let mut rng = seeded_rng(seed);
    let n_outer = n_samples / 2;
    let n_inner = n_samples - n_outer;

    let mut data = Vec::with_capacity(n_samples * 2);
    let mut labels = Vec::with_capacity(n_samples);
    for (count, class) in [(n_outer, 0usize), (n_inner, 1usize)] {
        for i in 0..count {
            let t = if count > 1 {
                std::f64::consts::PI * i as f64 / (count - 1) as f64
            } else {
                0.0
            };
            let (x0, x1) = if class == 0 {
                (t.cos(), t.sin())
            } else {
                (1.0 - t.cos(), 0.5 - t.sin())
            };
            data.push(x0 + noise * standard_normal(&mut rng));
            data.push(x1 + noise * standard_normal(&mut rng));
            labels.push(class);
        }
    }

    let x = Tensor::new(data, vec![n_samples, 2])?;
    Dataset::with_default_names(x, labels, 2)
}

/// A large circle (class 0) containing a smaller one (class 1) in 2-D.
/// `factor` is the inner radius relative to the outer one.
pub fn make_circles(
    n_samples: usize,
    factor: f64,
    noise: f64,
    seed: Option<u64>,
) -> MlResult<Dataset> {
    if !(0.0..1.0).contains(&factor) {
        return Err(MlError::InvalidParameter {
            name: "factor",
            reason: format!("{} not in [0, 1)", factor),
        });
    }
    let mut rng = seeded_rng(seed);
    let n_outer = n_samples / 2;
    let n_inner = n_samples - n_outer;

    let mut data = Vec::with_capacity(n_samples * 2);
    let mut labels = Vec::with_capacity(n_samples);
    for (count, radius, class) in [(n_outer, 1.0, 0usize), (n_inner, factor, 1usize)] {
        for i in 0..count {
            let t = 2.0 * std::f64::consts::PI * i as f64 / count.max(1) as f64;
            data.push(radius * t.cos() + noise * standard_normal(&mut rng));
            data.push(radius * t.sin() + noise * standard_normal(&mut rng));
            labels.push(class);
        }
    }

    let x = Tensor::new(data, vec![n_samples, 2])?;
    Dataset::with_default_names(x, labels, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_make_classification_shape_and_balance() {
        let spec = ClassificationSpec {
            n_samples: 200,
            n_features: 6,
            n_informative: 3,
            n_redundant: 1,
            n_classes: 3,
            n_clusters_per_class: 1,
            flip_y: 0.0,
            ..Default::default()
        };
        let ds = make_classification(&spec, Some(0)).unwrap();
        assert_eq!(ds.x.shape_vec(), vec![200, 6]);
        assert_eq!(ds.n_classes(), 3);
        let counts: Vec<usize> = ds.class_counts().iter().map(|c| c.count).collect();
        assert_eq!(counts.iter().sum::<usize>(), 200);
        assert!(counts.iter().all(|&c| c == 66 || c == 67));
    }

    #[test]
    fn test_make_classification_is_reproducible() {
        let spec = ClassificationSpec::default();
        let a = make_classification(&spec, Some(42)).unwrap();
        let b = make_classification(&spec, Some(42)).unwrap();
        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
    }

    #[test]
    fn test_make_classification_rejects_bad_spec() {
        let too_many = ClassificationSpec {
            n_features: 3,
            n_informative: 2,
            n_redundant: 2,
            ..Default::default()
        };
        assert!(make_classification(&too_many, Some(1)).is_err());

        let not_enough_vertices = ClassificationSpec {
            n_informative: 1,
            n_redundant: 0,
            n_classes: 3,
            n_clusters_per_class: 1,
            ..Default::default()
        };
        assert!(make_classification(&not_enough_vertices, Some(1)).is_err());
    }

    #[test]
    fn test_redundant_features_are_combinations() {
        // With no noise features and one informative column, the redundant
        // column is a fixed multiple of the informative one.
        let spec = ClassificationSpec {
            n_samples: 20,
            n_features: 2,
            n_informative: 1,
            n_redundant: 1,
            n_classes: 2,
            n_clusters_per_class: 1,
            flip_y: 0.0,
            ..Default::default()
        };
        let ds = make_classification(&spec, Some(3)).unwrap();
        let ratio = ds.x.get(&[0, 1]).unwrap() / ds.x.get(&[0, 0]).unwrap();
        for row in ds.x.rows().unwrap() {
            assert_abs_diff_eq!(row[1], row[0] * ratio, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_make_blobs() {
        let ds = make_blobs(90, 2, 3, 0.5, Some(42)).unwrap();
        assert_eq!(ds.x.shape_vec(), vec![90, 2]);
        let counts: Vec<usize> = ds.class_counts().iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![30, 30, 30]);
    }

    #[test]
    fn test_make_moons_without_noise_lies_on_arcs() {
        let ds = make_moons(40, 0.0, Some(1)).unwrap();
        assert_eq!(ds.x.shape_vec(), vec![40, 2]);
        for (row, &label) in ds.x.rows().unwrap().zip(&ds.y) {
            let (cx, cy) = if label == 0 { (0.0, 0.0) } else { (1.0, 0.5) };
            let r = ((row[0] - cx).powi(2) + (row[1] - cy).powi(2)).sqrt();
            assert_abs_diff_eq!(r, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_make_circles_radii() {
        let ds = make_circles(50, 0.4, 0.0, Some(1)).unwrap();
        for (row, &label) in ds.x.rows().unwrap().zip(&ds.y) {
            let r = (row[0].powi(2) + row[1].powi(2)).sqrt();
            let expected = if label == 0 { 1.0 } else { 0.4 };
            assert_abs_diff_eq!(r, expected, epsilon = 1e-9);
        }
        assert!(make_circles(10, 1.5, 0.0, None).is_err());
    }
}
