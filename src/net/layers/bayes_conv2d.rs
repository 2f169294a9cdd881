use super::{
    gaussian::GaussianPosterior,
    layer::{ConvProbForward, Module},
    window::{conv2d, Window},
};
use crate::{af_helpers::dims_of, error::Error, net::bayes_cfg::BayesCfg};
use arrayfire::{dim4, moddims, random_normal, sqrt, tile, Array, RandomEngine};
use rand_chacha::ChaCha20Rng;

const VARIANCE_EPS: f32 = 1e-8;

/// 2d convolution with gaussian posteriors over kernel weights and biases.
pub struct BayesConv2d {
    in_channels: usize,
    out_channels: usize,
    window: Window,
    // [k * k * in_channels, out_channels]
    weights: GaussianPosterior,
    // [1, out_channels]
    biases: GaussianPosterior,
}

impl BayesConv2d {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        window: Window,
        cfg: &BayesCfg,
        rng: &mut ChaCha20Rng,
    ) -> Self {
        let fan_in = in_channels * window.kernel_size * window.kernel_size;
        let weights = GaussianPosterior::init(
            dim4!(fan_in as u64, out_channels as u64, 1, 1),
            fan_in,
            cfg,
            rng,
        );
        let biases = GaussianPosterior::init(dim4!(1, out_channels as u64, 1, 1), fan_in, cfg, rng);
        Self::from_posteriors(in_channels, out_channels, window, weights, biases)
    }

    pub fn from_posteriors(
        in_channels: usize,
        out_channels: usize,
        window: Window,
        weights: GaussianPosterior,
        biases: GaussianPosterior,
    ) -> Self {
        Self {
            in_channels,
            out_channels,
            window,
            weights,
            biases,
        }
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn kl(&self) -> f32 {
        self.weights.kl() + self.biases.kl()
    }

    fn output_dims(&self, x: &Array<f32>) -> Result<(u64, u64), Error> {
        let [_, _, c, _] = dims_of(x);
        if c as usize != self.in_channels {
            return Err(Error::shape_mismatch(
                &self.name(),
                format!("{} input channels", self.in_channels),
                format!("{} input channels", c),
            ));
        }
        self.window.output_dims(&self.name(), x)
    }

    /// Broadcast a `[1, c_out]` bias row to `[oh, ow, c_out, n]`.
    fn bias_map(&self, b: &Array<f32>, (oh, ow): (u64, u64), n: u64) -> Array<f32> {
        let b = moddims(b, dim4!(1, 1, self.out_channels as u64, 1));
        tile(&b, dim4!(oh, ow, 1, n))
    }
}

impl ConvProbForward for BayesConv2d {
    /// Samples pre-activations with the local reparameterization trick.
    fn conv_prob_forward(
        &self,
        x: &Array<f32>,
        engine: &RandomEngine,
    ) -> Result<(Array<f32>, f32), Error> {
        let out_dims = self.output_dims(x)?;
        let n = dims_of(x)[3];
        let mean = conv2d(x, self.weights.mu(), &self.window, out_dims)
            + self.bias_map(self.biases.mu(), out_dims, n);
        let var = conv2d(&(x * x), &self.weights.variance(), &self.window, out_dims)
            + self.bias_map(&self.biases.variance(), out_dims, n);
        let eps = random_normal::<f32>(mean.dims(), engine);
        let y = mean + sqrt(&(var + VARIANCE_EPS)) * eps;
        Ok((y, self.kl()))
    }
}

impl Module for BayesConv2d {
    fn name(&self) -> String {
        format!(
            "BayesConv2d({}, {}, {})",
            self.in_channels, self.out_channels, self.window
        )
    }

    fn forward(&self, x: &Array<f32>, _engine: &RandomEngine) -> Result<Array<f32>, Error> {
        let out_dims = self.output_dims(x)?;
        let n = dims_of(x)[3];
        Ok(conv2d(x, self.weights.mu(), &self.window, out_dims)
            + self.bias_map(self.biases.mu(), out_dims, n))
    }

    fn num_params(&self) -> usize {
        self.weights.num_params() + self.biases.num_params()
    }

    fn as_conv_prob(&self) -> Option<&dyn ConvProbForward> {
        Some(self)
    }
}
