use oxiclass_core::{Classifier, MlError, MlResult, Tensor, Transformer};
use tracing::debug;

/// A machine learning pipeline: chain transformers + final classifier.
///
/// Transformers are fitted only inside [`Pipeline::fit`], on the training
/// matrix; prediction reuses them unchanged, so test data never influences
/// the fitted statistics.
pub struct Pipeline {
    transformers: Vec<Box<dyn Transformer>>,
    classifier: Option<Box<dyn Classifier>>,
    fitted: bool,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline {
            transformers: Vec::new(),
            classifier: None,
            fitted: false,
        }
    }

    /// Add a transformer step.
    pub fn add_transformer(mut self, transformer: Box<dyn Transformer>) -> Self {
        self.transformers.push(transformer);
        self.fitted = false;
        self
    }

    /// Set the final classifier.
    pub fn set_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self.fitted = false;
        self
    }

    pub fn n_steps(&self) -> usize {
        self.transformers.len() + usize::from(self.classifier.is_some())
    }

    pub fn classifier(&self) -> Option<&dyn Classifier> {
        self.classifier.as_deref()
    }

    /// Run `x` through the fitted transformers.
    pub fn transform(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        if !self.fitted {
            return Err(MlError::NotFitted("Pipeline"));
        }
        let mut current = x.clone();
        for t in &self.transformers {
            current = t.transform(&current)?;
        }
        Ok(current)
    }

    fn fitted_classifier(&self) -> MlResult<&dyn Classifier> {
        self.classifier
            .as_deref()
            .ok_or_else(|| MlError::InvalidOperation("pipeline has no classifier".into()))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for Pipeline {
    fn name(&self) -> &str {
        self.classifier.as_deref().map_or("Pipeline", |c| c.name())
    }

    /// Fit all transformers and the classifier.
    fn fit(&mut self, x: &Tensor<f64>, y: &[usize]) -> MlResult<()> {
        let classifier = self
            .classifier
            .as_mut()
            .ok_or_else(|| MlError::InvalidOperation("pipeline has no classifier".into()))?;

        let mut current = x.clone();
        for t in &mut self.transformers {
            current = t.fit_transform(&current)?;
        }
        classifier.fit(&current, y)?;
        self.fitted = true;
        debug!(steps = self.transformers.len() + 1, model = classifier.name(), "pipeline fitted");
        Ok(())
    }

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Vec<usize>> {
        let classifier = self.fitted_classifier()?;
        classifier.predict(&self.transform(x)?)
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let classifier = self.fitted_classifier()?;
        classifier.predict_proba(&self.transform(x)?)
    }

    fn n_classes(&self) -> usize {
        self.classifier.as_deref().map_or(0, |c| c.n_classes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiclass_neighbors::{DistanceMetric, KNeighborsClassifier};
    use oxiclass_preprocessing::{MinMaxScaler, StandardScaler};

    fn data() -> (Tensor<f64>, Vec<usize>) {
        // second column dominates raw distances but carries no signal
        let x = Tensor::from_vec2d(&[
            vec![0.0, 100.0],
            vec![0.1, 900.0],
            vec![0.2, 500.0],
            vec![1.0, 120.0],
            vec![1.1, 880.0],
            vec![1.2, 480.0],
        ])
        .unwrap();
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_pipeline_scales_then_classifies() {
        let (x, y) = data();
        let mut pipe = Pipeline::new()
            .add_transformer(Box::new(MinMaxScaler::with_range(-1.0, 1.0).unwrap()))
            .add_transformer(Box::new(StandardScaler::new()))
            .set_classifier(Box::new(KNeighborsClassifier::new(1, DistanceMetric::Euclidean)));
        assert_eq!(pipe.n_steps(), 3);
        pipe.fit(&x, &y).unwrap();
        assert_eq!(pipe.name(), "K-Nearest Neighbors");
        assert_eq!(pipe.n_classes(), 2);
        assert_eq!(pipe.score(&x, &y).unwrap(), 1.0);
        assert_eq!(pipe.predict_proba(&x).unwrap().shape_vec(), vec![6, 2]);

        // MinMax then Standard: every training column has mean 0
        let t = pipe.transform(&x).unwrap();
        for m in t.mean_axis0().unwrap() {
            assert!(m.abs() < 1e-10);
        }
    }

    #[test]
    fn test_pipeline_requires_fit_and_classifier() {
        let (x, y) = data();
        let unfitted = Pipeline::new()
            .set_classifier(Box::new(KNeighborsClassifier::new(1, DistanceMetric::Euclidean)));
        assert_eq!(unfitted.predict(&x).unwrap_err(), MlError::NotFitted("Pipeline"));

        let mut empty = Pipeline::default().add_transformer(Box::new(StandardScaler::new()));
        assert!(matches!(empty.fit(&x, &y), Err(MlError::InvalidOperation(_))));
    }
}
