use super::{
    gaussian::GaussianPosterior,
    layer::{FcProbForward, Module},
};
use crate::{
    af_helpers::{dims_of, tile_rows},
    error::Error,
    net::bayes_cfg::BayesCfg,
};
use arrayfire::{dim4, matmul, random_normal, sqrt, Array, MatProp, RandomEngine};
use rand_chacha::ChaCha20Rng;

const VARIANCE_EPS: f32 = 1e-8;

/// Fully connected layer with factorised gaussian posteriors over
/// weights and biases. Inputs are `[batch, in_features]`.
pub struct BayesLinear {
    in_features: usize,
    out_features: usize,
    // [in_features, out_features]
    weights: GaussianPosterior,
    // [1, out_features]
    biases: GaussianPosterior,
}

impl BayesLinear {
    pub fn new(
        in_features: usize,
        out_features: usize,
        cfg: &BayesCfg,
        rng: &mut ChaCha20Rng,
    ) -> Self {
        let weights = GaussianPosterior::init(
            dim4!(in_features as u64, out_features as u64, 1, 1),
            in_features,
            cfg,
            rng,
        );
        let biases =
            GaussianPosterior::init(dim4!(1, out_features as u64, 1, 1), in_features, cfg, rng);
        Self::from_posteriors(in_features, out_features, weights, biases)
    }

    pub fn from_posteriors(
        in_features: usize,
        out_features: usize,
        weights: GaussianPosterior,
        biases: GaussianPosterior,
    ) -> Self {
        Self {
            in_features,
            out_features,
            weights,
            biases,
        }
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn kl(&self) -> f32 {
        self.weights.kl() + self.biases.kl()
    }

    fn check_input(&self, x: &Array<f32>) -> Result<u64, Error> {
        let [n, f, d2, d3] = dims_of(x);
        if f as usize != self.in_features || d2 != 1 || d3 != 1 {
            return Err(Error::shape_mismatch(
                &self.name(),
                format!("[batch, {}]", self.in_features),
                format!("[{}, {}, {}, {}]", n, f, d2, d3),
            ));
        }
        Ok(n)
    }

    fn affine(&self, x: &Array<f32>, w: &Array<f32>, b: &Array<f32>, n: u64) -> Array<f32> {
        matmul(x, w, MatProp::NONE, MatProp::NONE) + tile_rows(b, n)
    }
}

impl FcProbForward for BayesLinear {
    /// Samples pre-activations with the local reparameterization trick.
    fn fc_prob_forward(
        &self,
        x: &Array<f32>,
        engine: &RandomEngine,
    ) -> Result<(Array<f32>, f32), Error> {
        let n = self.check_input(x)?;
        let mean = self.affine(x, self.weights.mu(), self.biases.mu(), n);
        let var = self.affine(
            &(x * x),
            &self.weights.variance(),
            &self.biases.variance(),
            n,
        );
        let eps = random_normal::<f32>(mean.dims(), engine);
        let y = mean + sqrt(&(var + VARIANCE_EPS)) * eps;
        Ok((y, self.kl()))
    }
}

impl Module for BayesLinear {
    fn name(&self) -> String {
        format!("BayesLinear({}, {})", self.in_features, self.out_features)
    }

    fn forward(&self, x: &Array<f32>, _engine: &RandomEngine) -> Result<Array<f32>, Error> {
        let n = self.check_input(x)?;
        Ok(self.affine(x, self.weights.mu(), self.biases.mu(), n))
    }

    fn num_params(&self) -> usize {
        self.weights.num_params() + self.biases.num_params()
    }

    fn as_fc_prob(&self) -> Option<&dyn FcProbForward> {
        Some(self)
    }
}
