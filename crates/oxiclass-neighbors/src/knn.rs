use oxiclass_core::validation::{argmax, check_n_features, check_xy, n_classes_of, normalize_rows};
use oxiclass_core::{Classifier, MlError, MlResult, Tensor};
use serde::{Deserialize, Serialize};

/// Distance metric for KNN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
}

impl DistanceMetric {
    pub fn distance(self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
        }
    }
}

/// How neighbour votes are weighted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weights {
    #[default]
    Uniform,
    /// Weight `1 / d`; an exact match (d = 0) takes the whole vote.
    Distance,
}

/// K-nearest neighbours classifier.
///
/// Fitting only stores the training set. Distance ties are broken by
/// training row order, vote ties by the lowest class index.
#[derive(Debug, Clone)]
pub struct KNeighborsClassifier {
    pub k: usize,
    pub metric: DistanceMetric,
    pub weights: Weights,
    x_train: Option<Tensor<f64>>,
    y_train: Vec<usize>,
    n_classes: usize,
}

impl Default for KNeighborsClassifier {
    fn default() -> Self {
        KNeighborsClassifier::new(5, DistanceMetric::Euclidean)
    }
}

impl KNeighborsClassifier {
    pub fn new(k: usize, metric: DistanceMetric) -> Self {
        KNeighborsClassifier {
            k,
            metric,
            weights: Weights::Uniform,
            x_train: None,
            y_train: Vec::new(),
            n_classes: 0,
        }
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    /// Indices and distances of the `k` nearest training rows to each query
    /// row, nearest first.
    pub fn kneighbors(&self, x: &Tensor<f64>) -> MlResult<Vec<Vec<(usize, f64)>>> {
        let train = self
            .x_train
            .as_ref()
            .ok_or(MlError::NotFitted("KNeighborsClassifier"))?;
        check_n_features(x, train.n_cols()?)?;
        let n_train = train.n_rows()?;
        if self.k == 0 || self.k > n_train {
            return Err(MlError::InvalidParameter {
                name: "k",
                reason: format!(
                    "{} neighbours requested from {} training samples",
                    self.k, n_train
                ),
            });
        }

        x.rows()?
            .map(|query| -> MlResult<Vec<(usize, f64)>> {
                let mut dists: Vec<(usize, f64)> = train
                    .rows()?
                    .enumerate()
                    .map(|(j, row)| (j, self.metric.distance(query, row)))
                    .collect();
                // stable sort keeps training order among equal distances
                dists.sort_by(|a, b| a.1.total_cmp(&b.1));
                dists.truncate(self.k);
                Ok(dists)
            })
            .collect()
    }

    fn votes(&self, x: &Tensor<f64>) -> MlResult<Vec<f64>> {
        let neighbours = self.kneighbors(x)?;
        let k = self.n_classes;
        let mut votes = vec![0.0; neighbours.len() * k];
        for (row, nn) in votes.chunks_mut(k).zip(&neighbours) {
            let exact: Vec<usize> = nn.iter().filter(|(_, d)| *d == 0.0).map(|&(j, _)| j).collect();
            match self.weights {
                Weights::Distance if !exact.is_empty() => {
                    for j in exact {
                        row[self.y_train[j]] += 1.0;
                    }
                }
                Weights::Distance => {
                    for &(j, d) in nn {
                        row[self.y_train[j]] += 1.0 / d;
                    }
                }
                Weights::Uniform => {
                    for &(j, _) in nn {
                        row[self.y_train[j]] += 1.0;
                    }
                }
            }
        }
        Ok(votes)
    }
}

impl Classifier for KNeighborsClassifier {
    fn name(&self) -> &str {
        "K-Nearest Neighbors"
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &[usize]) -> MlResult<()> {
        check_xy(x, y)?;
        if self.k == 0 {
            return Err(MlError::InvalidParameter {
                name: "k",
                reason: "must be at least 1".into(),
            });
        }
        self.x_train = Some(x.clone());
        self.y_train = y.to_vec();
        self.n_classes = n_classes_of(y);
        Ok(())
    }

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Vec<usize>> {
        let votes = self.votes(x)?;
        Ok(votes.chunks(self.n_classes).map(argmax).collect())
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let mut votes = self.votes(x)?;
        normalize_rows(&mut votes, self.n_classes);
        let n = x.n_rows()?;
        Tensor::new(votes, vec![n, self.n_classes])
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn clusters() -> (Tensor<f64>, Vec<usize>) {
        let x = Tensor::from_vec2d(&[
            vec![0.0, 0.0],
            vec![0.5, 0.5],
            vec![1.0, 1.0],
            vec![5.0, 5.0],
            vec![5.5, 5.5],
            vec![6.0, 6.0],
        ])
        .unwrap();
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_knn_classifier() {
        let (x, y) = clusters();
        let mut knn = KNeighborsClassifier::new(3, DistanceMetric::Euclidean);
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&x).unwrap(), y);
        assert_eq!(knn.score(&x, &y).unwrap(), 1.0);
    }

    #[test]
    fn test_predict_proba_counts_votes() {
        let (x, y) = clusters();
        let mut knn = KNeighborsClassifier::new(4, DistanceMetric::Manhattan);
        knn.fit(&x, &y).unwrap();
        let query = Tensor::from_vec2d(&[vec![0.2, 0.2]]).unwrap();
        let proba = knn.predict_proba(&query).unwrap();
        // three class-0 neighbours and the nearest class-1 point
        assert_abs_diff_eq!(proba.get(&[0, 0]).unwrap(), 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(proba.get(&[0, 1]).unwrap(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_distance_weighting() {
        let x = Tensor::from_vec2d(&[vec![0.0], vec![10.0], vec![11.0]]).unwrap();
        let y = vec![0, 1, 1];
        let query = Tensor::from_vec2d(&[vec![1.0]]).unwrap();

        let mut uniform = KNeighborsClassifier::new(3, DistanceMetric::Euclidean);
        uniform.fit(&x, &y).unwrap();
        assert_eq!(uniform.predict(&query).unwrap(), vec![1]);

        let mut weighted = uniform.clone().with_weights(Weights::Distance);
        weighted.fit(&x, &y).unwrap();
        assert_eq!(weighted.predict(&query).unwrap(), vec![0]);

        // exact match owns the vote
        let on_point = Tensor::from_vec2d(&[vec![10.0]]).unwrap();
        let proba = weighted.predict_proba(&on_point).unwrap();
        assert_eq!(proba.data(), &[0.0, 1.0]);
    }

    #[test]
    fn test_kneighbors_order() {
        let (x, y) = clusters();
        let mut knn = KNeighborsClassifier::new(2, DistanceMetric::Euclidean);
        knn.fit(&x, &y).unwrap();
        let nn = knn.kneighbors(&Tensor::from_vec2d(&[vec![5.4, 5.4]]).unwrap()).unwrap();
        assert_eq!(nn[0].iter().map(|&(j, _)| j).collect::<Vec<_>>(), vec![4, 3]);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let (x, y) = clusters();
        let mut knn = KNeighborsClassifier::new(7, DistanceMetric::Euclidean);
        knn.fit(&x, &y).unwrap();
        assert!(matches!(
            knn.predict(&x),
            Err(MlError::InvalidParameter { name: "k", .. })
        ));
        let unfitted = KNeighborsClassifier::default();
        assert!(matches!(unfitted.predict(&x), Err(MlError::NotFitted(_))));
    }
}
