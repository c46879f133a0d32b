use oxiclass_core::validation::{
    argmax, check_n_features, check_xy, n_classes_of, normalize_rows, seeded_rng,
};
use oxiclass_core::{Classifier, MlError, MlResult, Tensor};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Kernel coefficient for the RBF and polynomial kernels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gamma {
    /// `1 / (n_features * var(X))`, computed from the training matrix.
    #[default]
    Scale,
    Value(f64),
}

impl Gamma {
    fn resolve(self, x: &Tensor<f64>) -> MlResult<f64> {
        match self {
            Gamma::Value(g) if g > 0.0 => Ok(g),
            Gamma::Value(g) => Err(MlError::InvalidParameter {
                name: "gamma",
                reason: format!("{} must be positive", g),
            }),
            Gamma::Scale => {
                let p = x.n_cols()? as f64;
                let mean = x.mean_all()?;
                let var =
                    x.data().iter().map(|v| (v - mean).powi(2)).sum::<f64>() / x.numel() as f64;
                Ok(if var > 0.0 { 1.0 / (p * var) } else { 1.0 })
            }
        }
    }
}

/// Kernel type for SVM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Rbf { gamma: Gamma },
    Polynomial {
        degree: u32,
        gamma: Gamma,
        coef0: f64,
    },
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::Rbf {
            gamma: Gamma::Scale,
        }
    }
}

/// A kernel with its gamma resolved against the training data.
#[derive(Debug, Clone, Copy)]
enum FittedKernel {
    Linear,
    Rbf(f64),
    Polynomial { degree: u32, gamma: f64, coef0: f64 },
}

impl FittedKernel {
    fn eval(self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            FittedKernel::Linear => dot(a, b),
            FittedKernel::Rbf(gamma) => {
                let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * sq).exp()
            }
            FittedKernel::Polynomial { degree, gamma, coef0 } => {
                (gamma * dot(a, b) + coef0).powi(degree as i32)
            }
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// One binary machine of the one-vs-one ensemble.
///
/// Class `positive` is +1, class `negative` is -1.
#[derive(Debug, Clone)]
struct BinaryMachine {
    negative: usize,
    positive: usize,
    /// Rows of the training matrix with non-zero alpha.
    support: Vec<usize>,
    /// `alpha_i * y_i` for each support vector.
    dual_coef: Vec<f64>,
    bias: f64,
}

impl BinaryMachine {
    fn decision(&self, kernel: FittedKernel, train: &Tensor<f64>, row: &[f64]) -> MlResult<f64> {
        let mut f = self.bias;
        for (&s, &coef) in self.support.iter().zip(&self.dual_coef) {
            f += coef * kernel.eval(train.row(s)?, row);
        }
        Ok(f)
    }
}

/// Simplified SMO over a precomputed kernel matrix.
struct Smo<'a> {
    k: &'a [f64],
    n: usize,
    labels: &'a [f64],
    c: f64,
    tol: f64,
    max_iter: usize,
}

impl Smo<'_> {
    fn kij(&self, i: usize, j: usize) -> f64 {
        self.k[i * self.n + j]
    }

    /// Returns `(alphas, bias, passes)`.
    fn solve(&self, rng: &mut StdRng) -> (Vec<f64>, f64, usize) {
        let n = self.n;
        let y = self.labels;
        let mut alphas = vec![0.0; n];
        let mut b = 0.0;
        // f[i] = decision value at training row i
        let mut f = vec![0.0; n];

        let mut quiet_passes = 0;
        let mut iter = 0;
        while quiet_passes < 5 && iter < self.max_iter {
            iter += 1;
            let mut changed = 0;
            for i in 0..n {
                let ei = f[i] - y[i];
                let violates = (y[i] * ei < -self.tol && alphas[i] < self.c)
                    || (y[i] * ei > self.tol && alphas[i] > 0.0);
                if !violates {
                    continue;
                }

                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                let ej = f[j] - y[j];
                let (ai_old, aj_old) = (alphas[i], alphas[j]);

                let (lo, hi) = if y[i] != y[j] {
                    ((aj_old - ai_old).max(0.0), (self.c + aj_old - ai_old).min(self.c))
                } else {
                    ((ai_old + aj_old - self.c).max(0.0), (ai_old + aj_old).min(self.c))
                };
                if hi - lo < 1e-12 {
                    continue;
                }

                let eta = 2.0 * self.kij(i, j) - self.kij(i, i) - self.kij(j, j);
                if eta >= 0.0 {
                    continue;
                }

                let aj = (aj_old - y[j] * (ei - ej) / eta).clamp(lo, hi);
                if (aj - aj_old).abs() < 1e-7 {
                    continue;
                }
                let ai = ai_old + y[i] * y[j] * (aj_old - aj);

                let di = y[i] * (ai - ai_old);
                let dj = y[j] * (aj - aj_old);
                let b1 = b - ei - di * self.kij(i, i) - dj * self.kij(i, j);
                let b2 = b - ej - di * self.kij(i, j) - dj * self.kij(j, j);
                let b_new = if ai > 0.0 && ai < self.c {
                    b1
                } else if aj > 0.0 && aj < self.c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                for (t, ft) in f.iter_mut().enumerate() {
                    *ft += di * self.kij(i, t) + dj * self.kij(j, t) + (b_new - b);
                }
                alphas[i] = ai;
                alphas[j] = aj;
                b = b_new;
                changed += 1;
            }
            if changed == 0 {
                quiet_passes += 1;
            } else {
                quiet_passes = 0;
            }
        }
        (alphas, b, iter)
    }
}

/// Support vector classifier.
///
/// Each pair of classes gets a binary soft-margin machine trained with
/// simplified SMO; multiclass prediction is a one-vs-one vote.
#[derive(Debug, Clone)]
pub struct SVC {
    pub c: f64,
    pub kernel: Kernel,
    /// Cap on SMO sweeps over the training rows, per binary machine.
    pub max_iter: usize,
    pub tol: f64,
    pub seed: Option<u64>,
    fitted_kernel: Option<FittedKernel>,
    machines: Vec<BinaryMachine>,
    x_train: Option<Tensor<f64>>,
    n_classes: usize,
}

impl Default for SVC {
    fn default() -> Self {
        SVC::new(1.0, Kernel::default())
    }
}

impl SVC {
    pub fn new(c: f64, kernel: Kernel) -> Self {
        SVC {
            c,
            kernel,
            max_iter: 200,
            tol: 1e-3,
            seed: Some(0),
            fitted_kernel: None,
            machines: Vec::new(),
            x_train: None,
            n_classes: 0,
        }
    }

    fn fitted(&self) -> MlResult<(FittedKernel, &Tensor<f64>)> {
        match (self.fitted_kernel, &self.x_train) {
            (Some(k), Some(x)) => Ok((k, x)),
            _ => Err(MlError::NotFitted("SVC")),
        }
    }

    pub fn n_support(&self) -> usize {
        let mut rows: Vec<usize> = self
            .machines
            .iter()
            .flat_map(|m| m.support.iter().copied())
            .collect();
        rows.sort_unstable();
        rows.dedup();
        rows.len()
    }

    /// Signed distance-like score for a binary problem; positive means class 1.
    pub fn decision_function(&self, x: &Tensor<f64>) -> MlResult<Vec<f64>> {
        let (kernel, train) = self.fitted()?;
        if self.n_classes != 2 {
            return Err(MlError::InvalidOperation(format!(
                "decision_function needs a binary problem, model has {} classes",
                self.n_classes
            )));
        }
        check_n_features(x, train.n_cols()?)?;
        let machine = &self.machines[0];
        x.rows()?.map(|row| machine.decision(kernel, train, row)).collect()
    }

    /// One-vs-one votes, `[n_samples * n_classes]` row-major.
    fn votes(&self, x: &Tensor<f64>) -> MlResult<Vec<f64>> {
        let (kernel, train) = self.fitted()?;
        let n = check_n_features(x, train.n_cols()?)?;
        let k = self.n_classes;
        let mut votes = vec![0.0; n * k];
        for (row, counts) in x.rows()?.zip(votes.chunks_mut(k)) {
            for m in &self.machines {
                let winner = if m.decision(kernel, train, row)? > 0.0 {
                    m.positive
                } else {
                    m.negative
                };
                counts[winner] += 1.0;
            }
        }
        Ok(votes)
    }

    fn train_pair(
        &self,
        kernel: FittedKernel,
        x: &Tensor<f64>,
        y: &[usize],
        negative: usize,
        positive: usize,
        rng: &mut StdRng,
    ) -> MlResult<BinaryMachine> {
        let rows: Vec<usize> = (0..y.len())
            .filter(|&i| y[i] == negative || y[i] == positive)
            .collect();
        let labels: Vec<f64> = rows
            .iter()
            .map(|&i| if y[i] == positive { 1.0 } else { -1.0 })
            .collect();

        let has_both = labels.iter().any(|&l| l > 0.0) && labels.iter().any(|&l| l < 0.0);
        if !has_both {
            // one class absent from the training data: constant vote
            let bias = labels.first().copied().unwrap_or(-1.0);
            return Ok(BinaryMachine {
                negative,
                positive,
                support: Vec::new(),
                dual_coef: Vec::new(),
                bias,
            });
        }

        let m = rows.len();
        let mut gram = vec![0.0; m * m];
        for a in 0..m {
            let ra = x.row(rows[a])?;
            for b in a..m {
                let v = kernel.eval(ra, x.row(rows[b])?);
                gram[a * m + b] = v;
                gram[b * m + a] = v;
            }
        }

        let smo = Smo {
            k: &gram,
            n: m,
            labels: &labels,
            c: self.c,
            tol: self.tol,
            max_iter: self.max_iter,
        };
        let (alphas, bias, passes) = smo.solve(rng);

        let mut support = Vec::new();
        let mut dual_coef = Vec::new();
        for (t, &a) in alphas.iter().enumerate() {
            if a > 1e-8 {
                support.push(rows[t]);
                dual_coef.push(a * labels[t]);
            }
        }
        debug!(negative, positive, passes, support = support.len(), "svm machine trained");
        Ok(BinaryMachine {
            negative,
            positive,
            support,
            dual_coef,
            bias,
        })
    }
}

impl Classifier for SVC {
    fn name(&self) -> &str {
        "Support Vector Machine"
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &[usize]) -> MlResult<()> {
        if !(self.c > 0.0) {
            return Err(MlError::InvalidParameter {
                name: "c",
                reason: format!("{} must be positive", self.c),
            });
        }
        let (n, _) = check_xy(x, y)?;
        if n < 2 {
            return Err(MlError::InvalidParameter {
                name: "x",
                reason: "SVC needs at least two training samples".into(),
            });
        }
        let kernel = match self.kernel {
            Kernel::Linear => FittedKernel::Linear,
            Kernel::Rbf { gamma } => FittedKernel::Rbf(gamma.resolve(x)?),
            Kernel::Polynomial {
                degree,
                gamma,
                coef0,
            } => FittedKernel::Polynomial {
                degree,
                gamma: gamma.resolve(x)?,
                coef0,
            },
        };

        let k = n_classes_of(y).max(2);
        let mut rng = seeded_rng(self.seed);
        let mut machines = Vec::with_capacity(k * (k - 1) / 2);
        for a in 0..k {
            for b in a + 1..k {
                machines.push(self.train_pair(kernel, x, y, a, b, &mut rng)?);
            }
        }

        self.fitted_kernel = Some(kernel);
        self.machines = machines;
        self.x_train = Some(x.clone());
        self.n_classes = k;
        Ok(())
    }

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Vec<usize>> {
        let votes = self.votes(x)?;
        Ok(votes.chunks(self.n_classes).map(argmax).collect())
    }

    /// Normalised one-vs-one vote shares.
    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let mut votes = self.votes(x)?;
        normalize_rows(&mut votes, self.n_classes);
        Tensor::new(votes, vec![x.n_rows()?, self.n_classes])
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}
